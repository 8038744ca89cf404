//! Unified error type for the Roomball facade.

use roomball_protocol::ProtocolError;
use roomball_room::{RoomError, SinkError};

/// Why a join request was refused before reaching the room.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinRejection {
    #[error("room is full ({max} players)")]
    RoomFull { max: usize },

    #[error("player name is empty")]
    EmptyName,

    #[error("numeric player names are not allowed: {0}")]
    NumericName(String),

    #[error("player names may not start with the ball prefix: {0}")]
    BallName(String),
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RoomballError {
    /// A protocol-level error (encode, decode, unknown input code).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (capacity, placement, room gone).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A sink failed to deliver an item.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// A join request was refused.
    #[error(transparent)]
    Rejected(#[from] JoinRejection),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::UnknownInputCode("x".into());
        let err: RoomballError = err.into();
        assert!(matches!(err, RoomballError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err: RoomballError = RoomError::Capacity { max: 2 }.into();
        assert!(matches!(err, RoomballError::Room(RoomError::Capacity { max: 2 })));
    }

    #[test]
    fn test_rejection_message_names_the_offender() {
        let err: RoomballError = JoinRejection::BallName("Ball-7".into()).into();
        assert!(err.to_string().contains("Ball-7"));
    }
}
