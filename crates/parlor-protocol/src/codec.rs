//! Codec trait and the JSON implementation.
//!
//! A codec converts between Rust types and the text frames that travel on
//! the wire. The rest of the stack doesn't care how — it just needs
//! something implementing [`Codec`], so a binary codec could be swapped in
//! without touching the engine or gateway.

use serde::{de::DeserializeOwned, Serialize};

use crate::{ActionPayload, ProtocolError};

/// Encodes Rust types to text frames and decodes frames back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a single newline-free text frame.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a text frame back into a value.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// Compact JSON output contains no newlines, which keeps every message a
/// single text frame. Human-readable, so messages can be inspected in
/// browser dev tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}

/// Decodes the captured fields of an `action` frame into a ruleset's own
/// action type.
pub fn decode_action<A: DeserializeOwned>(
    payload: ActionPayload,
) -> Result<A, ProtocolError> {
    serde_json::from_value(serde_json::Value::Object(payload))
        .map_err(ProtocolError::Decode)
}
