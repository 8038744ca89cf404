//! # Roomball
//!
//! A multi-player room engine: players and one ball share a walled 2D
//! arena, the room steps physics at a fixed interval and streams minimal,
//! ordered diff events to a sink.
//!
//! This facade crate ties the layers together for a hosting push server:
//! [`RoomballHost`] tracks sessions and routes their messages, the sinks in
//! [`sinks`] serialize what the room publishes, and [`RoomballError`]
//! unifies the sub-crate errors.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roomball::prelude::*;
//!
//! # async fn run() -> Result<(), RoomballError> {
//! let (host, _publish_task) = RoomballHost::builder()
//!     .config(RoomConfig::default())
//!     .spawn_arena(JsonLinesSink::stdout());
//!
//! host.subscribe(ITEM_PLAYERS_LIST).await?;
//! host.open_session("s1", Some("Firefox"), "127.0.0.1").await;
//! host.handle_message("s1", "n|Bob").await?;
//! host.handle_message("s1", "39").await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod host;
pub mod sinks;

pub use error::{JoinRejection, RoomballError};
pub use host::{
    BandwidthSource, ITEM_BANDWIDTH_PREFIX, ITEM_PLAYERS_LIST, MessageOutcome, RoomballHost,
    RoomballHostBuilder, UNKNOWN_USER_AGENT,
};

pub use roomball_physics as physics;
pub use roomball_protocol as protocol;
pub use roomball_room as room;
pub use roomball_tick as tick;

pub mod prelude {
    pub use crate::sinks::{JsonLinesSink, TracingSink};
    pub use crate::{
        BandwidthSource, ITEM_BANDWIDTH_PREFIX, ITEM_PLAYERS_LIST, JoinRejection, MessageOutcome,
        RoomballError, RoomballHost,
    };
    pub use roomball_physics::{ArenaConfig, ArenaWorld, PhysicsWorld};
    pub use roomball_protocol::{Command, InputCode, Outbound, RoomEvent};
    pub use roomball_room::{
        BandwidthPoller, ChannelSink, EventSink, NullSink, RoomConfig, RoomHandle, RoomInfo,
        SampleError,
    };
    pub use roomball_tick::{TickConfig, TickPolicy};
}
