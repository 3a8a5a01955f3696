// Copyright (c) 2025, The Amqpio Authors
// MIT License
// All rights reserved.

//! # Exchange Handles and Message Publishing
//!
//! This module provides the exchange side of the facade: the exchange kind
//! and declaration flags, and the `Exchange` handle through which messages
//! are published. Routing keys given to `send_message` are subroutes; the
//! handle resolves them against the instance namespace before they reach
//! the broker client.

use crate::{
    errors::AmqpError,
    message::{header_table, HeaderValue, Payload, PublishFlags},
    namespace::Namespace,
};
use lapin::{
    options::ExchangeDeclareOptions, publisher_confirm::Confirmation, types::ShortString,
    BasicProperties, Channel,
};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, error};
use uuid::Uuid;

/// Name of the broker's predeclared direct exchange
pub const AMQP_EXCHANGE_DIRECT: &str = "amq.direct";
/// Name of the broker's predeclared topic exchange
pub const AMQP_EXCHANGE_TOPIC: &str = "amq.topic";
/// Name of the broker's predeclared fanout exchange
pub const AMQP_EXCHANGE_FANOUT: &str = "amq.fanout";

/// Represents the kinds of exchanges the facade declares.
///
/// - Direct: routes messages to queues on an exact routing key match
/// - Fanout: broadcasts messages to all bound queues
/// - Topic: routes messages on wildcard pattern matching of routing keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExchangeKind {
    #[default]
    Direct,
    Fanout,
    Topic,
}

impl From<ExchangeKind> for lapin::ExchangeKind {
    fn from(kind: ExchangeKind) -> lapin::ExchangeKind {
        match kind {
            ExchangeKind::Direct => lapin::ExchangeKind::Direct,
            ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
            ExchangeKind::Topic => lapin::ExchangeKind::Topic,
        }
    }
}

/// Declaration flags for an exchange.
///
/// This struct implements the builder pattern. Exchanges are durable by
/// default; use `transient` to opt out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeFlags {
    pub(crate) durable: bool,
    pub(crate) delete: bool,
    pub(crate) passive: bool,
    pub(crate) internal: bool,
    pub(crate) no_wait: bool,
}

impl Default for ExchangeFlags {
    fn default() -> ExchangeFlags {
        ExchangeFlags {
            durable: true,
            delete: false,
            passive: false,
            internal: false,
            no_wait: false,
        }
    }
}

impl ExchangeFlags {
    pub fn new() -> ExchangeFlags {
        ExchangeFlags::default()
    }

    /// Makes the exchange transient, dropping the default durability.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn transient(mut self) -> Self {
        self.durable = false;
        self
    }

    /// Sets the exchange to auto-delete when no longer used.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn delete(mut self) -> Self {
        self.delete = true;
        self
    }

    /// Makes the declaration passive, checking for existence without creating.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn passive(mut self) -> Self {
        self.passive = true;
        self
    }

    /// Makes the exchange internal, preventing direct publishing.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    /// Sets the no_wait flag, making the declaration non-blocking.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn no_wait(mut self) -> Self {
        self.no_wait = true;
        self
    }

    pub(crate) fn declare_options(&self) -> ExchangeDeclareOptions {
        ExchangeDeclareOptions {
            passive: self.passive,
            durable: self.durable,
            auto_delete: self.delete,
            internal: self.internal,
            nowait: self.no_wait,
        }
    }
}

/// A handle to a declared exchange, used for publishing.
///
/// Handles are created by the client's exchange registry and shared through
/// Arc; the registry returns the same handle for the same exchange name.
pub struct Exchange {
    channel: Arc<Channel>,
    name: String,
    namespace: Namespace,
}

impl Exchange {
    pub(crate) fn new(channel: Arc<Channel>, name: String, namespace: Namespace) -> Exchange {
        Exchange {
            channel,
            name,
            namespace,
        }
    }

    /// The broker-side exchange name this handle publishes to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Publishes a message under the resolved routing key with default flags
    /// and no attributes.
    ///
    /// # Parameters
    /// * `data` - The payload; structured values are JSON-encoded before
    ///   transmission, text and binary pass through unchanged
    /// * `subroute` - The routing key, resolved against the instance namespace
    ///
    /// # Returns
    /// Ok(()) on success or AmqpError on failure
    pub async fn send_message(
        &self,
        data: impl Into<Payload>,
        subroute: &str,
    ) -> Result<(), AmqpError> {
        self.send_message_with(data, subroute, PublishFlags::default(), &HashMap::new())
            .await
    }

    /// Publishes a message under the resolved routing key.
    ///
    /// A failed publish reported by the broker is never silently dropped: it
    /// surfaces as `PublishingError`. Payload serialization failure surfaces
    /// immediately, before anything reaches the wire.
    ///
    /// # Parameters
    /// * `data` - The payload
    /// * `subroute` - The routing key, resolved against the instance namespace
    /// * `flags` - Publish flag bits (mandatory/immediate)
    /// * `attributes` - Attribute map carried as AMQP headers
    ///
    /// # Returns
    /// Ok(()) on success or AmqpError on failure
    pub async fn send_message_with(
        &self,
        data: impl Into<Payload>,
        subroute: &str,
        flags: PublishFlags,
        attributes: &HashMap<String, HeaderValue>,
    ) -> Result<(), AmqpError> {
        let (body, content_type) = data.into().into_parts()?;
        let routing_key = self.namespace.route_name(subroute);

        let mut properties = BasicProperties::default()
            .with_message_id(ShortString::from(Uuid::new_v4().to_string()))
            .with_headers(header_table(attributes));
        if let Some(content_type) = content_type {
            properties = properties.with_content_type(ShortString::from(content_type));
        }

        debug!(
            "publishing to exchange: {} with the key: {}",
            self.name, routing_key
        );

        let confirm = match self
            .channel
            .basic_publish(&self.name, &routing_key, flags.options(), &body, properties)
            .await
        {
            Ok(confirm) => Ok(confirm),
            Err(err) => {
                error!(error = err.to_string(), "error publishing message");
                Err(AmqpError::PublishingError(Some(err)))
            }
        }?;

        match confirm.await {
            Ok(Confirmation::Nack(_)) => {
                error!("broker refused the published message");
                Err(AmqpError::PublishingError(None))
            }
            Ok(_) => Ok(()),
            Err(err) => {
                error!(error = err.to_string(), "error awaiting publish confirm");
                Err(AmqpError::PublishingError(Some(err)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_kinds_map_to_their_broker_client_counterparts() {
        assert!(matches!(
            lapin::ExchangeKind::from(ExchangeKind::Direct),
            lapin::ExchangeKind::Direct
        ));
        assert!(matches!(
            lapin::ExchangeKind::from(ExchangeKind::Fanout),
            lapin::ExchangeKind::Fanout
        ));
        assert!(matches!(
            lapin::ExchangeKind::from(ExchangeKind::Topic),
            lapin::ExchangeKind::Topic
        ));
    }

    #[test]
    fn exchange_flags_are_durable_by_default() {
        let options = ExchangeFlags::default().declare_options();

        assert!(options.durable);
        assert!(!options.passive);
        assert!(!options.auto_delete);
        assert!(!options.internal);
        assert!(!options.nowait);
    }

    #[test]
    fn exchange_flag_builders_set_their_bits() {
        let options = ExchangeFlags::new()
            .transient()
            .delete()
            .passive()
            .internal()
            .no_wait()
            .declare_options();

        assert!(!options.durable);
        assert!(options.auto_delete);
        assert!(options.passive);
        assert!(options.internal);
        assert!(options.nowait);
    }
}
