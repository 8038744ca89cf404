//! Core protocol types for Roomball.
//!
//! Every type here crosses a boundary: events leave the room engine for the
//! external sink, input codes and user messages arrive from the hosting
//! push server.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Field names
// ---------------------------------------------------------------------------

/// Item key (the entity name).
pub const FIELD_KEY: &str = "key";
/// Command of the event (`ADD`, `UPDATE`, `DELETE`).
pub const FIELD_COMMAND: &str = "command";
/// Horizontal position, rounded to an integer.
pub const FIELD_POS_X: &str = "posX";
/// Vertical position, rounded to an integer.
pub const FIELD_POS_Y: &str = "posY";
/// Last chat message of a player.
pub const FIELD_MSG: &str = "msg";
/// Display string of the player's user agent.
pub const FIELD_USER_AGENT: &str = "userAgent";

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// What an event does to the subscriber's view of the entity list.
///
/// Serialized in upper case (`"ADD"`, `"UPDATE"`, `"DELETE"`), which is
/// what push-server command-mode items expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Command {
    Add,
    Update,
    Delete,
}

impl Command {
    /// The wire spelling of this command.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RoomEvent
// ---------------------------------------------------------------------------

/// A single diff event for one entity.
///
/// `fields` only carries the data fields (`posX`, `posY`, `msg`,
/// `userAgent`) that the composer decided to include. `key` and `command`
/// are always present and are merged back in by [`RoomEvent::item_map`]
/// for sinks that want the flat field map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomEvent {
    /// Entity name; unique among live entities.
    pub key: String,
    /// What this event does to the entity.
    pub command: Command,
    /// `true` for events that are part of a snapshot burst.
    pub snapshot: bool,
    /// Field name → string-encoded value.
    pub fields: BTreeMap<String, String>,
}

impl RoomEvent {
    /// Creates an event with no data fields.
    pub fn new(key: impl Into<String>, command: Command, snapshot: bool) -> Self {
        Self {
            key: key.into(),
            command,
            snapshot,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion.
    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Returns the value of a data field, if the event carries it.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Returns `true` if the event carries the given data field.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The flat field map, `key` and `command` included.
    pub fn item_map(&self) -> BTreeMap<String, String> {
        let mut map = self.fields.clone();
        map.insert(FIELD_KEY.to_string(), self.key.clone());
        map.insert(FIELD_COMMAND.to_string(), self.command.to_string());
        map
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Periodic bandwidth value for one user, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandwidthUpdate {
    pub user: String,
    /// Kbps with at most two decimals, e.g. `"12.5"` or `"3.14"`.
    pub current_bandwidth: String,
}

/// Aggregated overall-bandwidth statistic, emitted when the sampler flushes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    /// Number of samples aggregated since the previous flush.
    pub samples: u64,
    pub min_kbps: f64,
    pub max_kbps: f64,
    pub mean_kbps: f64,
    pub last_kbps: f64,
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// One entry of the publish queue.
///
/// The end-of-snapshot marker is its own variant rather than a flag on a
/// regular event, so a sink sees it strictly after every event that was
/// queued before it.
///
/// Internally tagged: `{"type": "Event", "key": "Bob", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Outbound {
    /// A diff event for one entity.
    Event(RoomEvent),
    /// The snapshot burst that started with `touchAll` is complete.
    EndOfSnapshot,
    /// Per-user bandwidth value.
    Bandwidth(BandwidthUpdate),
    /// Overall bandwidth statistic.
    Statistics(StatisticsReport),
}

impl Outbound {
    /// Returns the wrapped event, if this is an event entry.
    pub fn as_event(&self) -> Option<&RoomEvent> {
        match self {
            Self::Event(event) => Some(event),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// InputCode
// ---------------------------------------------------------------------------

/// The eight directional codes a player can send.
///
/// The four plain codes are browser key codes (arrow keys, "pressed"); the
/// `*0` codes are their "released" counterparts and push the opposite way,
/// cancelling a pending press under the impulse summation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputCode {
    Left,
    Up,
    Right,
    Down,
    LeftReleased,
    UpReleased,
    RightReleased,
    DownReleased,
}

impl InputCode {
    /// Maps a numeric code to an input, `None` for anything unrecognized.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            37 => Some(Self::Left),
            38 => Some(Self::Up),
            39 => Some(Self::Right),
            40 => Some(Self::Down),
            370 => Some(Self::LeftReleased),
            380 => Some(Self::UpReleased),
            390 => Some(Self::RightReleased),
            400 => Some(Self::DownReleased),
            _ => None,
        }
    }

    /// The numeric code of this input.
    pub fn code(&self) -> u32 {
        match self {
            Self::Left => 37,
            Self::Up => 38,
            Self::Right => 39,
            Self::Down => 40,
            Self::LeftReleased => 370,
            Self::UpReleased => 380,
            Self::RightReleased => 390,
            Self::DownReleased => 400,
        }
    }

    /// Unit direction `(x, y)` of the impulse, y growing downward.
    pub fn direction(&self) -> (i32, i32) {
        match self {
            Self::Left | Self::RightReleased => (-1, 0),
            Self::Right | Self::LeftReleased => (1, 0),
            Self::Up | Self::DownReleased => (0, -1),
            Self::Down | Self::UpReleased => (0, 1),
        }
    }
}

impl TryFrom<u32> for InputCode {
    type Error = ProtocolError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| ProtocolError::UnknownInputCode(code.to_string()))
    }
}

impl FromStr for InputCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::from_code)
            .ok_or_else(|| ProtocolError::UnknownInputCode(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// UserMessage
// ---------------------------------------------------------------------------

/// A message sent by a client session through the hosting push server.
///
/// Grammar:
///
/// ```text
/// n|<name>    join the room with a proposed name
/// m|<text>    set the player's chat message
/// <anything>  a directional input code, parsed later
/// ```
///
/// Only the segment between the first and second `|` is the payload; a
/// missing segment is an empty payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserMessage {
    Join(String),
    Chat(String),
    Input(String),
}

impl UserMessage {
    const JOIN_PREFIX: &'static str = "n|";
    const CHAT_PREFIX: &'static str = "m|";

    /// Classifies a raw message. Never fails: unknown shapes are `Input`
    /// and get rejected when the code is parsed.
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with(Self::JOIN_PREFIX) {
            Self::Join(payload(raw))
        } else if raw.starts_with(Self::CHAT_PREFIX) {
            Self::Chat(payload(raw))
        } else {
            Self::Input(raw.to_string())
        }
    }
}

fn payload(raw: &str) -> String {
    raw.split('|').nth(1).unwrap_or_default().to_string()
}
