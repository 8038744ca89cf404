//! Room actor: the game loop and the single serialization domain.
//!
//! One Tokio task owns the [`RoomState`] and the tick scheduler. Commands
//! arrive over an mpsc channel and are handled one at a time between
//! ticks, so a mutation and the events it enqueues can never interleave
//! with another mutation or with a flush.

use std::sync::Arc;
use std::time::Duration;

use roomball_physics::PhysicsWorld;
use roomball_tick::{TickMetrics, TickScheduler};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::{
    BandwidthPoller, BandwidthRegistry, EngineState, Publisher, RoomConfig, RoomError, RoomState,
    StatisticsSampler,
};

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Start,
    Stop,
    AddPlayer {
        name: String,
        user_agent: String,
        reply: oneshot::Sender<Result<String, RoomError>>,
    },
    RemovePlayer {
        name: String,
    },
    DispatchCommand {
        name: String,
        code: u32,
    },
    UpdateMessage {
        name: String,
        text: String,
    },
    TouchAll,
    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },
    Shutdown,
}

/// A snapshot of room metadata.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub name: String,
    pub state: EngineState,
    /// Ticks run since the room was spawned.
    pub tick_count: u64,
    pub player_count: usize,
    pub max_players: usize,
    /// Live player names, sorted.
    pub players: Vec<String>,
    pub metrics: TickMetrics,
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Clone)]
pub struct RoomHandle {
    name: Arc<str>,
    sender: mpsc::Sender<RoomCommand>,
    bandwidth: BandwidthRegistry,
}

impl RoomHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Starts ticking. No-op when already running.
    pub async fn start(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Start).await
    }

    /// Stops ticking. Commands keep being served while stopped.
    pub async fn stop(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Stop).await
    }

    /// Adds a player; returns the name actually assigned.
    pub async fn add_player(
        &self,
        name: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Result<String, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::AddPlayer {
            name: name.into(),
            user_agent: user_agent.into(),
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn remove_player(&self, name: impl Into<String>) -> Result<(), RoomError> {
        self.send(RoomCommand::RemovePlayer { name: name.into() }).await
    }

    /// Queues a directional code for a player (fire-and-forget).
    pub async fn dispatch_command(&self, name: impl Into<String>, code: u32) -> Result<(), RoomError> {
        self.send(RoomCommand::DispatchCommand {
            name: name.into(),
            code,
        })
        .await
    }

    pub async fn update_message(
        &self,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::UpdateMessage {
            name: name.into(),
            text: text.into(),
        })
        .await
    }

    /// Publishes a full snapshot followed by an end-of-snapshot marker.
    pub async fn touch_all(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::TouchAll).await
    }

    /// Current room metadata. Also a barrier: every command sent before
    /// it has been applied once it returns.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the room to shut down. Pending commands are still applied.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    /// Starts posting a user's bandwidth under `item`.
    pub fn add_bandwidth_poller(&self, item: &str, user: &str, poller: Arc<dyn BandwidthPoller>) {
        self.bandwidth.add_poller(item, user, poller);
    }

    pub fn kill_bandwidth_poller(&self, item: &str) -> bool {
        self.bandwidth.kill_poller(item)
    }

    pub fn bandwidth(&self) -> &BandwidthRegistry {
        &self.bandwidth
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender.send(cmd).await.map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.name.to_string())
    }
}

/// The internal actor state. Runs inside a Tokio task.
struct RoomActor<W: PhysicsWorld> {
    state: RoomState<W>,
    engine: EngineState,
    scheduler: TickScheduler,
    sampler: StatisticsSampler,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl<W: PhysicsWorld> RoomActor<W> {
    async fn run(mut self) {
        let room = self.state.config().name.clone();
        tracing::info!(%room, "room actor started");

        loop {
            tokio::select! {
                // A due tick goes first; commands run between deadlines.
                biased;

                _tick = self.scheduler.wait_for_tick() => {
                    self.state.tick();
                    self.sampler.on_tick(self.state.publisher());
                    self.scheduler.record_tick_end();
                }
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle(cmd) {
                        break;
                    }
                }
            }
        }

        self.sampler.registry().kill_all();
        tracing::info!(%room, ticks = self.scheduler.tick_count(), "room actor stopped");
    }

    /// Applies one command. Returns `false` on shutdown.
    fn handle(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Start => self.start(),
            RoomCommand::Stop => self.stop(),
            RoomCommand::AddPlayer {
                name,
                user_agent,
                reply,
            } => {
                let result = self.state.add_player(&name, &user_agent);
                let _ = reply.send(result);
            }
            RoomCommand::RemovePlayer { name } => {
                self.state.remove_player(&name);
            }
            RoomCommand::DispatchCommand { name, code } => {
                self.state.dispatch_command(&name, code);
            }
            RoomCommand::UpdateMessage { name, text } => {
                self.state.update_message(&name, &text);
            }
            RoomCommand::TouchAll => self.state.touch_all(),
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => {
                tracing::info!(room = %self.state.config().name, "room shutting down");
                self.stop();
                return false;
            }
        }
        true
    }

    fn start(&mut self) {
        if self.engine.is_running() {
            return;
        }
        self.engine = EngineState::Running;
        self.scheduler.resume();
        tracing::info!(room = %self.state.config().name, "engine started");
    }

    fn stop(&mut self) {
        if !self.engine.is_running() {
            return;
        }
        self.engine = EngineState::Stopped;
        self.scheduler.pause();
        tracing::info!(room = %self.state.config().name, "engine stopped");
    }

    fn info(&self) -> RoomInfo {
        let config = self.state.config();
        RoomInfo {
            name: config.name.clone(),
            state: self.engine,
            tick_count: self.scheduler.tick_count(),
            player_count: self.state.player_count(),
            max_players: config.max_players,
            players: self.state.player_names(),
            metrics: self.scheduler.metrics().clone(),
        }
    }
}

/// Spawns a room actor over `world` and returns a handle to it.
///
/// The room starts `Stopped`; call [`RoomHandle::start`] to tick.
pub fn spawn_room<W: PhysicsWorld>(config: RoomConfig, world: W, publisher: Publisher) -> RoomHandle {
    spawn_room_task(config, world, publisher).0
}

/// Like [`spawn_room`], also returning the actor's task handle.
pub fn spawn_room_task<W: PhysicsWorld>(
    config: RoomConfig,
    world: W,
    publisher: Publisher,
) -> (RoomHandle, JoinHandle<()>) {
    let config = config.validated();
    let (tx, rx) = mpsc::channel(config.channel_size);

    let bandwidth = BandwidthRegistry::new(
        publisher.clone(),
        Duration::from_millis(config.stats.poll_interval_ms),
    );
    let sampler = StatisticsSampler::new(bandwidth.clone(), &config.stats, config.tick_interval_ms);
    let scheduler = TickScheduler::paused(config.tick_config());
    let name: Arc<str> = Arc::from(config.name.as_str());

    let actor = RoomActor {
        state: RoomState::new(config, world, publisher),
        engine: EngineState::Stopped,
        scheduler,
        sampler,
        receiver: rx,
    };
    let task = tokio::spawn(actor.run());

    let handle = RoomHandle {
        name,
        sender: tx,
        bandwidth,
    };
    (handle, task)
}

