// Copyright (c) 2025, The Amqpio Authors
// MIT License
// All rights reserved.

//! # AMQP Channel Establishment
//!
//! This module handles the creation of the AMQP connection and its single
//! channel. The connection is opened with the instance identity as the
//! connection name, so the instance is recognizable in the broker's
//! management UI. Connection failures are surfaced unchanged; there is no
//! retry or reconnection logic here.

use crate::{errors::AmqpError, options::ConnectionOptions};
use lapin::{types::LongString, Channel, Connection, ConnectionProperties};
use std::sync::Arc;
use tracing::{debug, error};

/// Opens a connection to the broker and creates a channel on it.
///
/// Both the connection and channel are wrapped in Arc so the exchange and
/// queue handles produced from them can share the channel.
///
/// # Parameters
/// * `instance` - The instance identity, used as the AMQP connection name
/// * `options` - Connection details like host, port, credentials and timeouts
///
/// # Returns
/// * `Result<(Arc<Connection>, Arc<Channel>), AmqpError>` -
///   A tuple containing the connection and channel on success, or an error on failure.
pub(crate) async fn new_amqp_channel(
    instance: &str,
    options: &ConnectionOptions,
) -> Result<(Arc<Connection>, Arc<Channel>), AmqpError> {
    debug!("creating amqp connection...");
    let properties =
        ConnectionProperties::default().with_connection_name(LongString::from(instance));

    let conn = match Connection::connect(&options.uri(), properties).await {
        Ok(c) => Ok(c),
        Err(err) => {
            error!(error = err.to_string(), "failure to connect");
            Err(AmqpError::ConnectionError(err))
        }
    }?;
    debug!("amqp connected");

    debug!("creating amqp channel...");
    match conn.create_channel().await {
        Ok(c) => {
            debug!("channel created");
            Ok((Arc::new(conn), Arc::new(c)))
        }
        Err(err) => {
            error!(error = err.to_string(), "error to create the channel");
            Err(AmqpError::ChannelError(err))
        }
    }
}
