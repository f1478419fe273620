//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes could not be turned into an
//! event (or back). It never describes a room outcome; those live in the
//! room crate and travel to clients as ordinary events.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown event name, or a
    /// payload missing a required field.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The event decoded but cannot be routed, e.g. an opaque relay payload
    /// without a string `roomCode`.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
