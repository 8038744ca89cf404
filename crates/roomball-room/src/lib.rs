//! The Roomball room engine.
//!
//! A room is a continuously simulated physical space holding players and
//! one ball. It runs as an isolated Tokio task (actor model) that owns
//! all entity state, steps the physics world at a fixed interval and
//! streams minimal, ordered diff events to a sink.
//!
//! # Key types
//!
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomState`]: entity map, ball and physics world; the only mutator
//! - [`Publisher`] / [`EventSink`]: the order-preserving publish pipeline
//! - [`compose`]: entity → diff event
//! - [`StatisticsSampler`] / [`BandwidthRegistry`]: bandwidth reporting
//! - [`RoomConfig`]: tick interval, capacity, world bounds, ...

mod compose;
mod config;
mod entity;
mod error;
mod impulse;
pub mod names;
mod publish;
mod room;
mod state;
mod stats;

pub use compose::{compose, compose_snapshot};
pub use config::{EngineState, RoomConfig};
pub use entity::{Ball, Coordinate, EntityBase, EntityRef, MAX_MESSAGE_CHARS, POSITION_EPSILON, Player};
pub use error::{RoomError, SampleError, SinkError};
pub use impulse::Impulse;
pub use publish::{ChannelSink, EventSink, NullSink, Publisher};
pub use room::{RoomHandle, RoomInfo, spawn_room, spawn_room_task};
pub use state::RoomState;
pub use stats::{
    BandwidthPoller, BandwidthRegistry, BandwidthStats, StatisticsSampler, StatsConfig, format_kbps,
};
