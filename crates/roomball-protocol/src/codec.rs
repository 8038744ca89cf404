//! Codec trait and implementations for serializing outbound items.
//!
//! The room engine never serializes anything itself: it hands typed
//! [`Outbound`](crate::Outbound) items to a sink, and the sink picks a
//! codec. [`JsonCodec`] is the only implementation today; a compact binary
//! codec can be added without touching the engine.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because sinks live inside the publish consumer
/// task and may be moved across runtime worker threads.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented
    /// in this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do
    /// not match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use roomball_protocol::{Codec, Command, JsonCodec, Outbound, RoomEvent};
///
/// let codec = JsonCodec;
/// let event = RoomEvent::new("Bob", Command::Add, false).with_field("posX", "12");
/// let bytes = codec.encode(&Outbound::Event(event.clone())).unwrap();
///
/// let decoded: Outbound = codec.decode(&bytes).unwrap();
/// assert_eq!(decoded, Outbound::Event(event));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{BandwidthUpdate, Command, Outbound, RoomEvent};

    #[test]
    fn test_event_encodes_as_tagged_object() {
        let event = RoomEvent::new("Ball-1", Command::Update, false)
            .with_field("posX", "500")
            .with_field("posY", "17");
        let bytes = JsonCodec.encode(&Outbound::Event(event)).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["type"], "Event");
        assert_eq!(json["key"], "Ball-1");
        assert_eq!(json["command"], "UPDATE");
        assert_eq!(json["snapshot"], false);
        assert_eq!(json["fields"]["posY"], "17");
    }

    #[test]
    fn test_end_of_snapshot_encodes_without_payload() {
        let bytes = JsonCodec.encode(&Outbound::EndOfSnapshot).unwrap();
        assert_eq!(bytes, br#"{"type":"EndOfSnapshot"}"#);
    }

    #[test]
    fn test_decode_bandwidth_update() {
        let raw = br#"{"type":"Bandwidth","user":"Bob","current_bandwidth":"3.14"}"#;
        let decoded: Outbound = JsonCodec.decode(raw).unwrap();
        assert_eq!(
            decoded,
            Outbound::Bandwidth(BandwidthUpdate {
                user: "Bob".into(),
                current_bandwidth: "3.14".into(),
            })
        );
    }

    #[test]
    fn test_decode_garbage_is_an_error() {
        let result: Result<Outbound, _> = JsonCodec.decode(b"{not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
