//! Error types for the room layer.

use roomball_physics::PhysicsError;
use roomball_protocol::ProtocolError;

/// Errors surfaced by room operations.
///
/// Only `add_player` can fail for a reason other than the room being
/// gone; every other operation treats bad input as a logged no-op.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room already holds its maximum number of players.
    #[error("room is full ({max} players)")]
    Capacity { max: usize },

    /// The physics world found no free spot for the new player.
    #[error("player placement failed: {0}")]
    Placement(#[from] PhysicsError),

    /// The room actor has shut down.
    #[error("room {0} is unavailable")]
    Unavailable(String),
}

/// Errors reported by an [`EventSink`](crate::EventSink).
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink closed")]
    Closed,

    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Encode(#[from] ProtocolError),
}

/// A bandwidth sample could not be taken.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("bandwidth source unavailable: {0}")]
    Unavailable(String),

    #[error("invalid bandwidth value {0}")]
    Invalid(f64),
}
