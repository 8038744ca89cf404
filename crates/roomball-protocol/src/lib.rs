//! Wire vocabulary for Roomball.
//!
//! This crate defines what leaves the room engine and what enters it:
//!
//! - **Events** ([`RoomEvent`], [`Command`], [`Outbound`]): the minimal
//!   diff events published to the external sink, plus the end-of-snapshot
//!   marker and the bandwidth/statistics reports.
//! - **Input** ([`InputCode`], [`UserMessage`]): the directional codes and
//!   the `n|` / `m|` message grammar used by the hosting push server.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how outbound items are
//!   turned into bytes at the sink boundary.
//!
//! ```text
//! host message → UserMessage → room engine → RoomEvent → Outbound → sink
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    BandwidthUpdate, Command, InputCode, Outbound, RoomEvent, StatisticsReport,
    UserMessage, FIELD_COMMAND, FIELD_KEY, FIELD_MSG, FIELD_POS_X, FIELD_POS_Y,
    FIELD_USER_AGENT,
};
