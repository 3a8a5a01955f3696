// Copyright (c) 2025, The Amqpio Authors
// MIT License
// All rights reserved.

mod channel;
mod namespace;

pub mod client;
pub mod errors;
pub mod exchange;
pub mod message;
pub mod options;
pub mod queue;
