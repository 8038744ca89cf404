//! `RoomballHost`: the adapter between a push server and the room.
//!
//! The push server owns connections and subscriptions; the host only sees
//! their lifecycle. It keeps one record per session, turns `n|` / `m|` /
//! code messages into room commands, and maps item subscriptions onto
//! engine start/stop and bandwidth pollers.

use std::collections::HashMap;
use std::sync::Arc;

use roomball_physics::{ArenaWorld, PhysicsWorld};
use roomball_protocol::{InputCode, UserMessage};
use roomball_room::{
    names, spawn_room, BandwidthPoller, EventSink, Publisher, RoomConfig, RoomHandle,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::{JoinRejection, RoomballError};

/// Item carrying the player list and positions.
pub const ITEM_PLAYERS_LIST: &str = "Players_list";

/// Prefix of the per-user bandwidth items, `My_Band_<user>`.
pub const ITEM_BANDWIDTH_PREFIX: &str = "My_Band_";

/// User agent recorded when the session did not report one.
pub const UNKNOWN_USER_AGENT: &str = "undetected";

/// Supplies the bandwidth poller for a user's `My_Band_` item.
pub trait BandwidthSource: Send + Sync + 'static {
    fn poller_for(&self, user: &str) -> Option<Arc<dyn BandwidthPoller>>;
}

/// What a handled message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// The session joined under the name it proposed.
    Joined(String),
    /// The session joined, or already was in, under a different name.
    Renamed(String),
    /// A chat message or input code was forwarded to the room.
    Accepted,
    /// Nothing happened; the reason has been logged.
    Ignored,
}

#[derive(Debug)]
struct Session {
    user_agent: String,
    remote_ip: String,
    player: Option<String>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for a [`RoomballHost`] and the room behind it.
///
/// # Example
///
/// ```rust,ignore
/// use roomball::prelude::*;
///
/// let (host, _publish_task) = RoomballHost::builder()
///     .config(RoomConfig::default())
///     .spawn_arena(JsonLinesSink::stdout());
/// host.subscribe(ITEM_PLAYERS_LIST).await?;
/// ```
pub struct RoomballHostBuilder {
    config: RoomConfig,
    bandwidth: Option<Arc<dyn BandwidthSource>>,
}

impl RoomballHostBuilder {
    pub fn new() -> Self {
        Self {
            config: RoomConfig::default(),
            bandwidth: None,
        }
    }

    pub fn config(mut self, config: RoomConfig) -> Self {
        self.config = config;
        self
    }

    /// Where `My_Band_` subscriptions get their pollers. Without one those
    /// subscriptions are ignored.
    pub fn bandwidth_source(mut self, source: impl BandwidthSource) -> Self {
        self.bandwidth = Some(Arc::new(source));
        self
    }

    /// Spawns the publish consumer and a room over `world`.
    pub fn spawn<W: PhysicsWorld, S: EventSink>(
        self,
        world: W,
        sink: S,
    ) -> (RoomballHost, JoinHandle<()>) {
        let (publisher, task) = Publisher::spawn(sink);
        let room = spawn_room(self.config.clone(), world, publisher);
        (RoomballHost::with_room(room, self.config.max_players, self.bandwidth), task)
    }

    /// Spawns over the default arena built from the configured bounds.
    pub fn spawn_arena<S: EventSink>(self, sink: S) -> (RoomballHost, JoinHandle<()>) {
        let world = ArenaWorld::new(self.config.arena.clone());
        self.spawn(world, sink)
    }
}

impl Default for RoomballHostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// Session-facing adapter over one room.
pub struct RoomballHost {
    room: RoomHandle,
    max_players: usize,
    bandwidth: Option<Arc<dyn BandwidthSource>>,
    /// Held across the room round trip of a join, so joins are serialized.
    sessions: Mutex<HashMap<String, Session>>,
}

impl RoomballHost {
    pub fn builder() -> RoomballHostBuilder {
        RoomballHostBuilder::new()
    }

    /// Wraps an already spawned room.
    pub fn with_room(
        room: RoomHandle,
        max_players: usize,
        bandwidth: Option<Arc<dyn BandwidthSource>>,
    ) -> Self {
        Self {
            room,
            max_players: max_players.max(1),
            bandwidth,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn room(&self) -> &RoomHandle {
        &self.room
    }

    /// Records a new session. Reopening an id replaces its record.
    pub async fn open_session(&self, session_id: &str, user_agent: Option<&str>, remote_ip: &str) {
        let session = Session {
            user_agent: user_agent.unwrap_or(UNKNOWN_USER_AGENT).to_string(),
            remote_ip: remote_ip.to_string(),
            player: None,
        };
        tracing::debug!(%session_id, user_agent = %session.user_agent, %remote_ip, "session opened");
        self.sessions.lock().await.insert(session_id.to_string(), session);
    }

    /// Forgets a session and removes its player, if it had one.
    pub async fn close_session(&self, session_id: &str) -> Result<(), RoomballError> {
        let session = self.sessions.lock().await.remove(session_id);
        match session.and_then(|s| s.player) {
            Some(name) => {
                tracing::info!(%session_id, player = %name, "session closed, removing player");
                self.room.remove_player(name).await?;
            }
            None => tracing::debug!(%session_id, "session closed without a player"),
        }
        Ok(())
    }

    /// The player name bound to a session.
    pub async fn player_of(&self, session_id: &str) -> Option<String> {
        self.sessions.lock().await.get(session_id).and_then(|s| s.player.clone())
    }

    /// Number of sessions that have joined as players.
    pub async fn player_count(&self) -> usize {
        self.sessions.lock().await.values().filter(|s| s.player.is_some()).count()
    }

    /// Handles one raw message from a session.
    pub async fn handle_message(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<MessageOutcome, RoomballError> {
        match UserMessage::parse(text) {
            UserMessage::Join(name) => self.join(session_id, &name).await,
            UserMessage::Chat(message) => {
                let Some(player) = self.player_for_message(session_id).await else {
                    return Ok(MessageOutcome::Ignored);
                };
                self.room.update_message(player, message).await?;
                Ok(MessageOutcome::Accepted)
            }
            UserMessage::Input(raw) => {
                let Some(player) = self.player_for_message(session_id).await else {
                    return Ok(MessageOutcome::Ignored);
                };
                match raw.trim().parse::<InputCode>() {
                    Ok(code) => {
                        self.room.dispatch_command(player, code.code()).await?;
                        Ok(MessageOutcome::Accepted)
                    }
                    Err(e) => {
                        tracing::warn!(%session_id, error = %e, "ignoring malformed input");
                        Ok(MessageOutcome::Ignored)
                    }
                }
            }
        }
    }

    /// Subscribes a data item. `Players_list` starts the engine and pushes
    /// a full snapshot; `My_Band_<user>` starts that user's poller.
    pub async fn subscribe(&self, item: &str) -> Result<(), RoomballError> {
        if item.starts_with(ITEM_PLAYERS_LIST) {
            tracing::debug!(%item, "players list subscribed");
            self.room.start().await?;
            self.room.touch_all().await?;
        } else if let Some(user) = item.strip_prefix(ITEM_BANDWIDTH_PREFIX) {
            match self.bandwidth.as_ref().and_then(|source| source.poller_for(user)) {
                Some(poller) => self.room.add_bandwidth_poller(item, user, poller),
                None => tracing::warn!(%item, %user, "no bandwidth poller available"),
            }
        } else {
            tracing::debug!(%item, "ignoring subscription to unknown item");
        }
        Ok(())
    }

    /// Reverses [`subscribe`](Self::subscribe).
    pub async fn unsubscribe(&self, item: &str) -> Result<(), RoomballError> {
        if item.starts_with(ITEM_PLAYERS_LIST) {
            tracing::debug!(%item, "players list unsubscribed");
            self.room.stop().await?;
        } else if item.starts_with(ITEM_BANDWIDTH_PREFIX) && !self.room.kill_bandwidth_poller(item) {
            tracing::debug!(%item, "no bandwidth poller to kill");
        }
        Ok(())
    }

    async fn join(&self, session_id: &str, proposed: &str) -> Result<MessageOutcome, RoomballError> {
        let mut sessions = self.sessions.lock().await;

        let joined = sessions.values().filter(|s| s.player.is_some()).count();
        if joined >= self.max_players {
            return Err(JoinRejection::RoomFull {
                max: self.max_players,
            }
            .into());
        }
        check_name(proposed)?;

        let Some(session) = sessions.get_mut(session_id) else {
            tracing::warn!(%session_id, "join from unknown session, ignoring");
            return Ok(MessageOutcome::Ignored);
        };

        if let Some(current) = &session.player {
            // Repeated join: report the name already held.
            return Ok(if current.eq_ignore_ascii_case(proposed) {
                MessageOutcome::Joined(current.clone())
            } else {
                MessageOutcome::Renamed(current.clone())
            });
        }

        let assigned = self.room.add_player(proposed, session.user_agent.as_str()).await?;
        tracing::info!(
            %session_id,
            player = %assigned,
            remote_ip = %session.remote_ip,
            "player joined"
        );
        session.player = Some(assigned.clone());

        if assigned.eq_ignore_ascii_case(proposed) {
            Ok(MessageOutcome::Joined(assigned))
        } else {
            Ok(MessageOutcome::Renamed(assigned))
        }
    }

    async fn player_for_message(&self, session_id: &str) -> Option<String> {
        let player = self.player_of(session_id).await;
        if player.is_none() {
            tracing::warn!(%session_id, "message from a session without a player, ignoring");
        }
        player
    }
}

/// Name checks made before the room sees a join.
fn check_name(proposed: &str) -> Result<(), JoinRejection> {
    if proposed.is_empty() {
        return Err(JoinRejection::EmptyName);
    }
    if is_numeric(proposed) {
        return Err(JoinRejection::NumericName(proposed.to_string()));
    }
    if proposed.starts_with(names::BALL_PREFIX) {
        return Err(JoinRejection::BallName(proposed.to_string()));
    }
    Ok(())
}

/// Digits only, with an optional leading minus. A lone `-` counts.
fn is_numeric(name: &str) -> bool {
    let digits = name.strip_prefix('-').unwrap_or(name);
    digits.chars().all(|c| c.is_ascii_digit())
}
