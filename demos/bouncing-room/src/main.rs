//! A room with a few bot players pushing the ball around.
//!
//! Room events go to stdout as JSON lines, logs go to stderr. Set
//! `RUST_LOG` to tune logging and `ROOMBALL_DEMO_SECS` to change how long
//! the demo runs.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use roomball::prelude::*;
use tracing_subscriber::EnvFilter;

const BOTS: [&str; 4] = ["Ada", "Grace", "Linus", "Ada"];
const DEFAULT_SECS: u64 = 5;

// ---------------------------------------------------------------------------
// Bandwidth
// ---------------------------------------------------------------------------

/// Pretends every user streams somewhere between 5 and 40 kbps.
struct SimulatedBandwidth;

impl BandwidthSource for SimulatedBandwidth {
    fn poller_for(&self, _user: &str) -> Option<Arc<dyn BandwidthPoller>> {
        Some(Arc::new(|| Ok::<f64, SampleError>(rand::rng().random_range(5.0..40.0))))
    }
}

// ---------------------------------------------------------------------------
// Bots
// ---------------------------------------------------------------------------

const KEYS: [InputCode; 4] = [InputCode::Left, InputCode::Up, InputCode::Right, InputCode::Down];

async fn run_bot(host: Arc<RoomballHost>, session: String, proposed: &'static str) {
    host.open_session(&session, Some("demo-bot/1.0"), "127.0.0.1").await;

    let name = match host.handle_message(&session, &format!("n|{proposed}")).await {
        Ok(MessageOutcome::Joined(name) | MessageOutcome::Renamed(name)) => name,
        Ok(other) => {
            tracing::warn!(%session, ?other, "bot did not join");
            return;
        }
        Err(e) => {
            tracing::warn!(%session, error = %e, "bot join rejected");
            return;
        }
    };
    tracing::info!(%session, %name, "bot joined");

    if let Err(e) = host.subscribe(&format!("{ITEM_BANDWIDTH_PREFIX}{name}")).await {
        tracing::warn!(%name, error = %e, "bandwidth subscription failed");
    }

    let mut interval = tokio::time::interval(Duration::from_millis(250));
    for round in 0u32.. {
        interval.tick().await;

        let (key, chat) = {
            let mut rng = rand::rng();
            let key = KEYS[rng.random_range(0..KEYS.len())];
            let chat = rng.random_bool(0.05);
            (key, chat)
        };

        let message = if chat {
            format!("m|round {round}, here I come")
        } else {
            key.code().to_string()
        };
        if host.handle_message(&session, &message).await.is_err() {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), RoomballError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let secs = std::env::var("ROOMBALL_DEMO_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_SECS);

    let config = RoomConfig {
        name: "bouncing-room".into(),
        max_players: 8,
        ..RoomConfig::default()
    };
    let (host, publish_task) = RoomballHost::builder()
        .config(config)
        .bandwidth_source(SimulatedBandwidth)
        .spawn_arena(JsonLinesSink::stdout());
    let host = Arc::new(host);

    host.subscribe(ITEM_PLAYERS_LIST).await?;

    let bots: Vec<_> = BOTS
        .into_iter()
        .enumerate()
        .map(|(i, name)| tokio::spawn(run_bot(Arc::clone(&host), format!("bot-{i}"), name)))
        .collect();

    tracing::info!(secs, bots = bots.len(), "demo running");
    tokio::time::sleep(Duration::from_secs(secs)).await;

    for bot in &bots {
        bot.abort();
    }
    for i in 0..bots.len() {
        host.close_session(&format!("bot-{i}")).await?;
    }
    host.unsubscribe(ITEM_PLAYERS_LIST).await?;

    let info = host.room().info().await?;
    tracing::info!(
        ticks = info.tick_count,
        avg_tick = ?info.metrics.avg_tick_time,
        overruns = info.metrics.total_overruns,
        "demo finished"
    );

    host.room().shutdown().await?;
    drop(host);
    // Aborted bots may still hold a publisher clone for a moment.
    let _ = tokio::time::timeout(Duration::from_secs(1), publish_task).await;
    Ok(())
}
