//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
///
/// Each crate in Roomball defines its own error enum. A `ProtocolError`
/// always means the problem is in (de)serialization or in the shape of an
/// incoming message, never in the room engine itself.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization of an outbound item failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization of bytes into an outbound item failed.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The input is not one of the eight directional codes.
    #[error("unknown input code: {0:?}")]
    UnknownInputCode(String),

    /// The message passes parsing but violates the message grammar.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
