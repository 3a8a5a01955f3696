// Copyright (c) 2025, The Amqpio Authors
// MIT License
// All rights reserved.

//! # The AMQP Facade Client
//!
//! This module provides `AmqpIo`, the entry point of the crate. It owns at
//! most one broker connection with a single channel, connects lazily on
//! first use, declares queues and exchanges through that channel, and caches
//! one exchange handle per exchange name.
//!
//! The client is constructed explicitly from an instance name and a
//! `ConnectionOptions` value; callers hold and pass the handle. Entry points
//! that may connect or touch the registry take `&mut self`: the single
//! shared channel is not thread safe, and exclusive access encodes that
//! convention without introducing any locking.

use crate::{
    channel::new_amqp_channel,
    errors::AmqpError,
    exchange::{
        Exchange, ExchangeFlags, ExchangeKind, AMQP_EXCHANGE_DIRECT, AMQP_EXCHANGE_FANOUT,
        AMQP_EXCHANGE_TOPIC,
    },
    namespace::Namespace,
    options::ConnectionOptions,
    queue::{Queue, QueueFlags},
};
use lapin::{types::FieldTable, Channel, Connection};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, error};

/// Names under this prefix are predeclared by the broker and reserved; a
/// non-passive declare against them is refused.
const AMQP_RESERVED_NAMESPACE: &str = "amq.";

/// AMQP reply code sent when closing the connection normally
const REPLY_SUCCESS: u16 = 200;

/// The facade over the broker client.
///
/// Every queue name and routing key produced through this client is prefixed
/// with the instance name given at construction. The connection is
/// established lazily by the first operation that needs it; `connect` and
/// `disconnect` are both idempotent.
pub struct AmqpIo {
    namespace: Namespace,
    options: ConnectionOptions,
    connection: Option<Arc<Connection>>,
    channel: Option<Arc<Channel>>,
    exchanges: HashMap<String, Arc<Exchange>>,
}

impl AmqpIo {
    /// Creates a new client. No connection is made until first use.
    ///
    /// # Parameters
    /// * `instance_name` - The instance identity prefixing all names
    /// * `options` - Broker connection configuration
    pub fn new(instance_name: impl Into<String>, options: ConnectionOptions) -> AmqpIo {
        AmqpIo {
            namespace: Namespace::new(instance_name),
            options,
            connection: None,
            channel: None,
            exchanges: HashMap::default(),
        }
    }

    /// The instance identity this client namespaces under.
    pub fn instance_name(&self) -> &str {
        self.namespace.instance()
    }

    /// Resolves a subroute into the broker-visible routing key.
    pub fn route_name(&self, subroute: &str) -> String {
        self.namespace.route_name(subroute)
    }

    /// Resolves a logical queue name into the broker-visible queue name.
    pub fn queue_name(&self, name: &str) -> String {
        self.namespace.queue_name(name)
    }

    /// Whether a live connection to the broker currently exists.
    ///
    /// Reflects the broker client's live connection status, not a cached
    /// flag.
    pub fn is_connected(&self) -> bool {
        match &self.connection {
            Some(connection) => connection.status().connected(),
            None => false,
        }
    }

    /// Connects to the broker. No-op when already connected.
    ///
    /// Connection failures from the broker client propagate unchanged as the
    /// error source; no retry or backoff is performed.
    pub async fn connect(&mut self) -> Result<(), AmqpError> {
        self.ensure_channel().await.map(|_| ())
    }

    /// Closes the connection. No-op when not connected.
    ///
    /// Cached exchange handles are dropped with the connection: they hold
    /// the closed channel and cannot outlive it.
    pub async fn disconnect(&mut self) {
        self.channel = None;
        self.exchanges.clear();

        if let Some(connection) = self.connection.take() {
            if connection.status().connected() {
                debug!("closing amqp connection...");
                if let Err(err) = connection.close(REPLY_SUCCESS, "client disconnect").await {
                    error!(error = err.to_string(), "error closing the connection");
                }
            }
        }
    }

    /// Declares a queue under the resolved name and returns a handle to it.
    ///
    /// Repeated calls with the same logical name each declare again,
    /// relying on the broker's idempotent declaration semantics; handles are
    /// not cached or deduplicated.
    ///
    /// # Parameters
    /// * `name` - The logical queue name, resolved against the instance
    ///   namespace
    /// * `flags` - Queue declaration flags
    ///
    /// # Returns
    /// A new queue handle, or AmqpError on failure
    pub async fn init_queue(&mut self, name: &str, flags: QueueFlags) -> Result<Queue, AmqpError> {
        let channel = self.ensure_channel().await?;
        let queue_name = self.namespace.queue_name(name);

        debug!("creating queue: {}", queue_name);

        match channel
            .queue_declare(&queue_name, flags.declare_options(), FieldTable::default())
            .await
        {
            Err(err) => {
                error!(
                    error = err.to_string(),
                    name = queue_name.as_str(),
                    "error to declare the queue"
                );
                Err(AmqpError::DeclareQueueError(queue_name, err))
            }
            _ => {
                debug!("queue: {} was created", queue_name);
                Ok(Queue::new(channel, queue_name, self.namespace.clone()))
            }
        }
    }

    /// Returns the exchange handle for the given name, declaring it first
    /// when the name has not been seen before.
    ///
    /// Handles are cached per name and shared; a second call with the same
    /// name returns the identical handle regardless of the kind and flags
    /// passed (first-write-wins). Names in the reserved `amq.` namespace are
    /// predeclared by the broker, so no declaration is attempted for them.
    ///
    /// # Parameters
    /// * `name` - The exchange name (not namespaced; exchanges are shared
    ///   between instances, routing keys are not)
    /// * `kind` - The exchange kind, used on first declaration
    /// * `flags` - Declaration flags, used on first declaration
    ///
    /// # Returns
    /// The shared exchange handle, or AmqpError on failure
    pub async fn get_exchange(
        &mut self,
        name: &str,
        kind: ExchangeKind,
        flags: ExchangeFlags,
    ) -> Result<Arc<Exchange>, AmqpError> {
        let channel = self.ensure_channel().await?;

        if let Some(exchange) = self.exchanges.get(name) {
            return Ok(exchange.clone());
        }

        if !name.starts_with(AMQP_RESERVED_NAMESPACE) {
            debug!("creating exchange: {}", name);

            match channel
                .exchange_declare(
                    name,
                    kind.into(),
                    flags.declare_options(),
                    FieldTable::default(),
                )
                .await
            {
                Err(err) => {
                    error!(
                        error = err.to_string(),
                        name = name,
                        "error to declare the exchange"
                    );
                    Err(AmqpError::DeclareExchangeError(name.to_owned(), err))
                }
                _ => {
                    debug!("exchange: {} was created", name);
                    Ok(())
                }
            }?;
        }

        let exchange = Arc::new(Exchange::new(
            channel,
            name.to_owned(),
            self.namespace.clone(),
        ));
        self.exchanges.insert(name.to_owned(), exchange.clone());

        Ok(exchange)
    }

    /// Returns the handle for the broker's predeclared direct exchange.
    pub async fn get_exchange_direct(&mut self) -> Result<Arc<Exchange>, AmqpError> {
        self.get_exchange(
            AMQP_EXCHANGE_DIRECT,
            ExchangeKind::Direct,
            ExchangeFlags::default(),
        )
        .await
    }

    /// Returns the handle for the broker's predeclared topic exchange.
    pub async fn get_exchange_topic(&mut self) -> Result<Arc<Exchange>, AmqpError> {
        self.get_exchange(
            AMQP_EXCHANGE_TOPIC,
            ExchangeKind::Topic,
            ExchangeFlags::default(),
        )
        .await
    }

    /// Returns the handle for the broker's predeclared fanout exchange.
    pub async fn get_exchange_fanout(&mut self) -> Result<Arc<Exchange>, AmqpError> {
        self.get_exchange(
            AMQP_EXCHANGE_FANOUT,
            ExchangeKind::Fanout,
            ExchangeFlags::default(),
        )
        .await
    }

    async fn ensure_channel(&mut self) -> Result<Arc<Channel>, AmqpError> {
        if let Some(channel) = &self.channel {
            if self.is_connected() {
                return Ok(channel.clone());
            }
        }

        // Opening a fresh channel invalidates every handle produced from the
        // old one, whether the connection ended via disconnect or died.
        self.channel = None;
        self.exchanges.clear();

        let (connection, channel) =
            new_amqp_channel(self.namespace.instance(), &self.options).await?;

        self.connection = Some(connection);
        self.channel = Some(channel.clone());

        Ok(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_new_client_is_not_connected() {
        let client = AmqpIo::new("svc-A", ConnectionOptions::default());

        assert!(!client.is_connected());
    }

    #[test]
    fn client_resolves_names_under_its_instance() {
        let client = AmqpIo::new("svc-A", ConnectionOptions::default());

        assert_eq!(client.instance_name(), "svc-A");
        assert_eq!(client.route_name("created"), "svc-A.created");
        assert_eq!(client.queue_name("orders"), "svc-A.orders");
    }

    #[tokio::test]
    #[ignore] // requires a running RabbitMQ instance
    async fn reconnect_invalidates_cached_exchange_handles() {
        let mut client = AmqpIo::new("amqpio-it", ConnectionOptions::default());

        let first = client.get_exchange_direct().await.expect("direct exchange");

        // The broker dropping the connection underneath the client.
        client
            .connection
            .as_ref()
            .expect("live connection")
            .close(REPLY_SUCCESS, "simulated drop")
            .await
            .expect("close connection");
        assert!(!client.is_connected());

        let second = client
            .get_exchange_direct()
            .await
            .expect("exchange after reconnect");

        assert!(!Arc::ptr_eq(&first, &second));

        // The fresh handle publishes over the new channel.
        second
            .send_message("ping", "reconnect-check")
            .await
            .expect("publish after reconnect");

        client.disconnect().await;
    }
}
