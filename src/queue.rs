// Copyright (c) 2025, The Amqpio Authors
// MIT License
// All rights reserved.

//! # Queue Handles and Consumption
//!
//! This module provides the queue side of the facade: declaration flags, the
//! `Queue` handle with its fluent binding methods, and delegation to the
//! broker client's native consume loop. Binding subroutes are resolved
//! against the instance namespace before they reach the broker.

use crate::{
    errors::AmqpError,
    exchange::{AMQP_EXCHANGE_DIRECT, AMQP_EXCHANGE_FANOUT, AMQP_EXCHANGE_TOPIC},
    namespace::Namespace,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::{
    message::Delivery,
    options::{BasicConsumeOptions, QueueBindOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel,
};
use std::sync::Arc;
use tracing::{debug, error};

/// Declaration flags for a queue.
///
/// This struct implements the builder pattern. All flags default to off,
/// matching a no-parameter declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFlags {
    pub(crate) durable: bool,
    pub(crate) delete: bool,
    pub(crate) exclusive: bool,
    pub(crate) passive: bool,
    pub(crate) no_wait: bool,
}

impl QueueFlags {
    pub fn new() -> QueueFlags {
        QueueFlags::default()
    }

    /// Makes the queue durable, persisting across broker restarts.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    /// Sets the queue to auto-delete when no longer used.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn delete(mut self) -> Self {
        self.delete = true;
        self
    }

    /// Makes the queue exclusive to the connection.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
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

    /// Sets the no_wait flag, making the declaration non-blocking.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn no_wait(mut self) -> Self {
        self.no_wait = true;
        self
    }

    pub(crate) fn declare_options(&self) -> QueueDeclareOptions {
        QueueDeclareOptions {
            passive: self.passive,
            durable: self.durable,
            exclusive: self.exclusive,
            auto_delete: self.delete,
            nowait: self.no_wait,
        }
    }
}

/// Handler invoked once per delivered message.
///
/// The handler owns the delivery and is responsible for acknowledging it.
/// Returning false stops the consume loop.
#[async_trait]
pub trait DeliveryHandler: Send + Sync {
    async fn handle(&self, delivery: Delivery, queue: &Queue) -> bool;
}

/// A handle to a declared queue.
///
/// Created by the client's `init_queue`; each call produces an independent
/// handle and an independent declaration against the broker. Binding methods
/// consume the handle and return it, so bindings chain fluently.
#[derive(Clone)]
pub struct Queue {
    channel: Arc<Channel>,
    name: String,
    namespace: Namespace,
}

impl Queue {
    pub(crate) fn new(channel: Arc<Channel>, name: String, namespace: Namespace) -> Queue {
        Queue {
            channel,
            name,
            namespace,
        }
    }

    /// The broker-side queue name this handle was declared under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Binds the queue to an exchange under the resolved routing key.
    ///
    /// # Parameters
    /// * `exchange_name` - The exchange to bind to
    /// * `subroute` - The routing key, resolved against the instance namespace
    ///
    /// # Returns
    /// The queue handle for further chaining, or AmqpError on failure
    pub async fn bind(self, exchange_name: &str, subroute: &str) -> Result<Queue, AmqpError> {
        let routing_key = self.namespace.route_name(subroute);

        debug!(
            "binding queue: {} to the exchange: {} with the key: {}",
            self.name, exchange_name, routing_key
        );

        match self
            .channel
            .queue_bind(
                &self.name,
                exchange_name,
                &routing_key,
                QueueBindOptions { nowait: false },
                FieldTable::default(),
            )
            .await
        {
            Err(err) => {
                error!(error = err.to_string(), "error to bind queue to exchange");
                Err(AmqpError::BindingError(
                    exchange_name.to_owned(),
                    self.name.clone(),
                    err,
                ))
            }
            _ => Ok(self),
        }
    }

    /// Binds the queue to the predeclared direct exchange.
    pub async fn bind_direct(self, subroute: &str) -> Result<Queue, AmqpError> {
        self.bind(AMQP_EXCHANGE_DIRECT, subroute).await
    }

    /// Binds the queue to the predeclared topic exchange.
    pub async fn bind_topic(self, subroute: &str) -> Result<Queue, AmqpError> {
        self.bind(AMQP_EXCHANGE_TOPIC, subroute).await
    }

    /// Binds the queue to the predeclared fanout exchange.
    pub async fn bind_fanout(self, subroute: &str) -> Result<Queue, AmqpError> {
        self.bind(AMQP_EXCHANGE_FANOUT, subroute).await
    }

    /// Consumes deliveries from the queue, blocking the calling task.
    ///
    /// Deliveries are handed to the handler one at a time; the handler acks
    /// and returns false to stop. Acknowledgement mode is manual, matching
    /// the broker client's native consume semantics. No cancellation or
    /// timeout semantics are added here.
    ///
    /// # Parameters
    /// * `consumer_tag` - The consumer tag registered with the broker
    /// * `handler` - Handler invoked per delivery
    ///
    /// # Returns
    /// Ok(()) when the handler stops the loop or the stream ends, or
    /// AmqpError on failure to start the consumer
    pub async fn consume(
        &self,
        consumer_tag: &str,
        handler: Arc<dyn DeliveryHandler>,
    ) -> Result<(), AmqpError> {
        let mut consumer = match self
            .channel
            .basic_consume(
                &self.name,
                consumer_tag,
                BasicConsumeOptions {
                    no_local: false,
                    no_ack: false,
                    exclusive: false,
                    nowait: false,
                },
                FieldTable::default(),
            )
            .await
        {
            Err(err) => {
                error!(error = err.to_string(), "error to create the consumer");
                Err(AmqpError::ConsumerError(self.name.clone()))
            }
            Ok(c) => Ok(c),
        }?;

        let queue = self.clone();

        let spawned = tokio::spawn({
            async move {
                while let Some(result) = consumer.next().await {
                    match result {
                        Ok(delivery) => {
                            if !handler.handle(delivery, &queue).await {
                                break;
                            }
                        }

                        Err(err) => error!(error = err.to_string(), "error receiving delivery"),
                    }
                }
            }
        })
        .await;

        if spawned.is_err() {
            return Err(AmqpError::ConsumerError(self.name.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_flags_default_to_no_parameters() {
        let options = QueueFlags::default().declare_options();

        assert!(!options.durable);
        assert!(!options.exclusive);
        assert!(!options.auto_delete);
        assert!(!options.passive);
        assert!(!options.nowait);
    }

    #[test]
    fn queue_flag_builders_set_their_bits() {
        let options = QueueFlags::new()
            .durable()
            .delete()
            .exclusive()
            .passive()
            .no_wait()
            .declare_options();

        assert!(options.durable);
        assert!(options.auto_delete);
        assert!(options.exclusive);
        assert!(options.passive);
        assert!(options.nowait);
    }
}
