// Copyright (c) 2025, The Amqpio Authors
// MIT License
// All rights reserved.

//! # Message Payloads, Flags and Attributes
//!
//! This module models what a published message is made of: the payload
//! (text and binary pass through byte-for-byte, structured values are
//! encoded to JSON text), the publish flag bits, and the attribute map that
//! becomes AMQP headers on the wire.

use crate::errors::AmqpError;
use lapin::{
    options::BasicPublishOptions,
    types::{AMQPValue, FieldTable, LongInt, LongLongInt, LongString, LongUInt, ShortInt, ShortString},
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Content type stamped on messages whose payload was JSON-encoded
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// The body of a message to publish.
///
/// Text and binary payloads are transmitted unchanged. A `Json` payload is
/// encoded to its canonical JSON text form at publish time; encoding failure
/// is fatal to the publish operation and never swallowed.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
    Json(serde_json::Value),
}

impl Payload {
    /// Builds a structured payload from any serializable value.
    ///
    /// # Returns
    /// The payload, or `SerializationError` when the value cannot be
    /// represented as JSON.
    pub fn json<T: Serialize>(value: &T) -> Result<Payload, AmqpError> {
        Ok(Payload::Json(serde_json::to_value(value)?))
    }

    /// Renders the payload into wire bytes and the content type to stamp.
    pub(crate) fn into_parts(self) -> Result<(Vec<u8>, Option<&'static str>), AmqpError> {
        match self {
            Payload::Text(text) => Ok((text.into_bytes(), None)),
            Payload::Binary(bytes) => Ok((bytes, None)),
            Payload::Json(value) => Ok((serde_json::to_vec(&value)?, Some(JSON_CONTENT_TYPE))),
        }
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Payload {
        Payload::Text(value.to_owned())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Payload {
        Payload::Text(value)
    }
}

impl From<&[u8]> for Payload {
    fn from(value: &[u8]) -> Payload {
        Payload::Binary(value.to_vec())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Payload {
        Payload::Binary(value)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Payload {
        Payload::Json(value)
    }
}

/// Flags controlling how the broker routes a published message.
///
/// Both default to false, matching a no-parameter publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishFlags {
    pub(crate) mandatory: bool,
    pub(crate) immediate: bool,
}

impl PublishFlags {
    pub fn new() -> PublishFlags {
        PublishFlags::default()
    }

    /// Asks the broker to return the message when it is unroutable.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Asks the broker to return the message when no consumer is ready.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    pub(crate) fn options(&self) -> BasicPublishOptions {
        BasicPublishOptions {
            mandatory: self.mandatory,
            immediate: self.immediate,
        }
    }
}

/// A value carried in the message attribute map.
///
/// Attributes become AMQP headers; each variant maps to the matching AMQP
/// field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    ShortString(String),
    LongString(String),
    Int(i16),
    LongInt(i32),
    LongLongInt(i64),
    Uint(u32),
    LongUint(u32),
    LongLongUint(u64),
}

/// Converts the attribute map into the AMQP header table.
pub(crate) fn header_table(attributes: &HashMap<String, HeaderValue>) -> FieldTable {
    let mut btree = BTreeMap::<ShortString, AMQPValue>::default();

    for (key, value) in attributes.clone() {
        let amqp_value = match value {
            HeaderValue::ShortString(v) => AMQPValue::ShortString(ShortString::from(v)),
            HeaderValue::LongString(v) => AMQPValue::LongString(LongString::from(v)),
            HeaderValue::Int(v) => AMQPValue::ShortInt(ShortInt::from(v)),
            HeaderValue::LongInt(v) => AMQPValue::LongInt(LongInt::from(v)),
            HeaderValue::LongLongInt(v) => AMQPValue::LongLongInt(LongLongInt::from(v)),
            HeaderValue::Uint(v) => AMQPValue::LongUInt(LongUInt::from(v)),
            HeaderValue::LongUint(v) => AMQPValue::LongUInt(LongUInt::from(v)),
            HeaderValue::LongLongUint(v) => AMQPValue::Timestamp(v),
        };

        btree.insert(ShortString::from(key), amqp_value);
    }

    FieldTable::from(btree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AmqpError;
    use serde_json::json;

    #[test]
    fn structured_payload_encodes_to_the_same_json_as_encoding_directly() {
        let value = json!({"id": 1});
        let (bytes, content_type) = Payload::from(value.clone()).into_parts().unwrap();

        assert_eq!(bytes, serde_json::to_vec(&value).unwrap());
        assert_eq!(content_type, Some(JSON_CONTENT_TYPE));
    }

    #[test]
    fn plain_string_payload_is_left_unchanged() {
        let (bytes, content_type) = Payload::from("example-data").into_parts().unwrap();

        assert_eq!(bytes, b"example-data".to_vec());
        assert_eq!(content_type, None);
    }

    #[test]
    fn binary_payload_is_left_unchanged() {
        let raw = vec![0u8, 159, 146, 150];
        let (bytes, content_type) = Payload::from(raw.clone()).into_parts().unwrap();

        assert_eq!(bytes, raw);
        assert_eq!(content_type, None);
    }

    #[test]
    fn json_constructor_encodes_serializable_records() {
        #[derive(Serialize)]
        struct Order {
            id: u64,
        }

        let payload = Payload::json(&Order { id: 1 }).unwrap();

        assert_eq!(payload, Payload::Json(json!({"id": 1})));
    }

    #[test]
    fn json_constructor_surfaces_serialization_failure() {
        let unencodable = std::collections::HashMap::from([((1, 2), "pair-keyed")]);

        let result = Payload::json(&unencodable);

        assert!(matches!(result, Err(AmqpError::SerializationError(_))));
    }

    #[test]
    fn publish_flags_default_to_no_parameters() {
        let options = PublishFlags::default().options();

        assert!(!options.mandatory);
        assert!(!options.immediate);
    }

    #[test]
    fn publish_flags_builders_set_their_bits() {
        let options = PublishFlags::new().mandatory().immediate().options();

        assert!(options.mandatory);
        assert!(options.immediate);
    }

    #[test]
    fn u64_attributes_convert_without_truncation() {
        let attributes = HashMap::from([(
            "offset".to_owned(),
            HeaderValue::LongLongUint(u64::from(u32::MAX) + 1),
        )]);

        let table = header_table(&attributes);

        // The 64-bit AMQP field type; the value must not wrap to 0.
        assert_eq!(
            table.inner().get(&ShortString::from("offset")),
            Some(&AMQPValue::Timestamp(4_294_967_296))
        );
    }

    #[test]
    fn attributes_convert_to_amqp_header_fields() {
        let attributes = HashMap::from([
            ("origin".to_owned(), HeaderValue::LongString("svc-A".to_owned())),
            ("attempt".to_owned(), HeaderValue::LongInt(3)),
        ]);

        let table = header_table(&attributes);
        let inner = table.inner();

        assert_eq!(
            inner.get(&ShortString::from("origin")),
            Some(&AMQPValue::LongString(LongString::from("svc-A")))
        );
        assert_eq!(
            inner.get(&ShortString::from("attempt")),
            Some(&AMQPValue::LongInt(LongInt::from(3)))
        );
    }
}
