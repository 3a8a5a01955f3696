// Copyright (c) 2025, The Amqpio Authors
// MIT License
// All rights reserved.

//! # Error Types for the AMQP Facade
//!
//! This module provides the error taxonomy for every operation the facade
//! exposes. Failures reported by the broker client are carried verbatim as
//! the error source; the facade performs no recovery or retry anywhere, and
//! the locally raised kinds (publishing, serialization) are always fatal to
//! the calling operation.

use thiserror::Error;

/// Represents errors that can occur during AMQP operations.
///
/// Connection, channel, declaration and binding variants wrap the underlying
/// broker client error unchanged. `PublishingError` and `SerializationError`
/// are raised locally by the facade itself.
#[derive(Error, Debug)]
pub enum AmqpError {
    /// Error establishing a connection to the broker
    #[error("failure to connect")]
    ConnectionError(#[source] lapin::Error),

    /// Error creating a channel from an established connection
    #[error("failure to create a channel")]
    ChannelError(#[source] lapin::Error),

    /// Error declaring an exchange with the given name
    #[error("failure to declare an exchange `{0}`")]
    DeclareExchangeError(String, #[source] lapin::Error),

    /// Error declaring a queue with the given name
    #[error("failure to declare a queue `{0}`")]
    DeclareQueueError(String, #[source] lapin::Error),

    /// Error binding a queue to an exchange
    #[error("failure to bind queue `{1}` to exchange `{0}`")]
    BindingError(String, String, #[source] lapin::Error),

    /// The broker reported a failed publish; the message was not accepted.
    /// Carries the transport error when there is one; a negative publisher
    /// confirm has no underlying error and leaves it empty.
    #[error("cannot publish a message into AMQP exchange")]
    PublishingError(#[source] Option<lapin::Error>),

    /// Error encoding a structured payload to its JSON text form
    #[error("failure to serialize message payload")]
    SerializationError(#[from] serde_json::Error),

    /// Error creating or running a consumer on the given queue
    #[error("failure to consume from queue `{0}`")]
    ConsumerError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn publishing_error_exposes_the_transport_error_as_its_source() {
        let transport = AmqpError::PublishingError(Some(lapin::Error::InvalidConnectionState(
            lapin::ConnectionState::Closed,
        )));

        assert!(transport.source().is_some());
    }

    #[test]
    fn a_negative_publisher_confirm_has_no_source() {
        let refused = AmqpError::PublishingError(None);

        assert!(refused.source().is_none());
    }
}
