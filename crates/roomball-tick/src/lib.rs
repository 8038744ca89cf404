//! Fixed-interval tick scheduling for Roomball rooms.
//!
//! A [`TickScheduler`] lives inside a room actor and is awaited in the same
//! `select!` as the actor's command channel. Pausing the scheduler is how a
//! room stops: `wait_for_tick` then never completes, while commands keep
//! flowing through the other branch.
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = commands.recv() => handle(cmd),
//!         tick = scheduler.wait_for_tick() => {
//!             world.step(tick.dt);
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```
//!
//! [`Cadence`] counts ticks for work that runs every N of them.

mod cadence;
mod config;
mod metrics;

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

pub use cadence::Cadence;
pub use config::{TickConfig, TickPolicy};
pub use metrics::TickMetrics;

/// What [`TickScheduler::wait_for_tick`] hands back for a fired tick.
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// 1 for the first tick, then counting up.
    pub tick: u64,
    /// Simulation step: the configured interval, whatever the wall clock did.
    pub dt: Duration,
    /// Fired more than a tenth of an interval late.
    pub overrun: bool,
    /// Deadlines dropped before this one (`FixedRate`).
    pub ticks_skipped: u64,
}

/// Paces one room's loop.
pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    deadline: TokioInstant,
    /// Wall-clock start of the tick body, taken by `record_tick_end`.
    work_started: Option<Instant>,
    paused: bool,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// A running scheduler whose first tick is one interval away, plus the
    /// configured jitter.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let deadline = TokioInstant::now() + config.interval + first_tick_jitter(&config);

        debug!(
            interval_ms = config.interval.as_secs_f64() * 1000.0,
            policy = ?config.policy,
            "tick scheduler ready"
        );

        Self {
            config,
            tick_count: 0,
            deadline,
            work_started: None,
            paused: false,
            metrics: TickMetrics::default(),
        }
    }

    /// Like [`new`](Self::new), but nothing fires until [`resume`](Self::resume).
    pub fn paused(config: TickConfig) -> Self {
        Self {
            paused: true,
            ..Self::new(config)
        }
    }

    pub fn with_interval_ms(ms: u64) -> Self {
        Self::new(TickConfig::with_interval_ms(ms))
    }

    /// Resolves when the next tick is due. Pends forever while paused.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        if self.paused {
            std::future::pending::<()>().await;
        }

        let due = self.deadline;
        let interval = self.config.interval;
        time::sleep_until(due).await;

        let fired_at = TokioInstant::now();
        let late_by = fired_at.saturating_duration_since(due);
        let overrun = late_by > interval / 10;

        self.tick_count += 1;
        self.work_started = Some(Instant::now());

        let ticks_skipped = match self.config.policy {
            TickPolicy::FixedDelay => {
                // Provisional; `record_tick_end` re-arms from the end of the body.
                self.deadline = fired_at + interval;
                0
            }
            TickPolicy::FixedRate => {
                let missed =
                    u64::try_from(late_by.as_nanos() / interval.as_nanos()).unwrap_or(u64::MAX);
                if missed > 0 {
                    warn!(
                        tick = self.tick_count,
                        missed,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "fell behind, dropping missed ticks"
                    );
                }
                self.deadline = fixed_rate_deadline(due, interval, missed, fired_at);
                missed
            }
        };

        self.metrics.on_fire(overrun, ticks_skipped);
        trace!(tick = self.tick_count, overrun, "tick");

        TickInfo {
            tick: self.tick_count,
            dt: interval,
            overrun,
            ticks_skipped,
        }
    }

    /// Marks the end of the current tick body.
    ///
    /// Updates metrics and logs slow ticks. Under `FixedDelay` the next
    /// deadline becomes one interval from now. Without a pending tick this
    /// does nothing.
    pub fn record_tick_end(&mut self) {
        let Some(started) = self.work_started.take() else {
            return;
        };
        let elapsed = started.elapsed();
        let budget = self.config.interval;

        if self.config.policy == TickPolicy::FixedDelay {
            self.deadline = TokioInstant::now() + budget;
        }

        let utilization = self
            .metrics
            .on_work(elapsed, budget, self.config.metrics_enabled);
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;

        if utilization >= self.config.budget_critical_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms,
                budget_ms = budget.as_secs_f64() * 1000.0,
                "tick overran its budget"
            );
        } else if utilization >= self.config.budget_warn_threshold {
            debug!(
                tick = self.tick_count,
                elapsed_ms,
                utilization = format!("{:.0}%", utilization * 100.0),
                "tick close to its budget"
            );
        }
    }

    /// Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "ticking paused");
        }
    }

    /// Idempotent. The next tick is a full interval away, so a long pause
    /// never turns into a burst.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.deadline = TokioInstant::now() + self.config.interval;
            debug!(tick = self.tick_count, "ticking resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }
}

fn first_tick_jitter(config: &TickConfig) -> Duration {
    match config.initial_jitter_us {
        0 => Duration::ZERO,
        max => Duration::from_micros(rand::rng().random_range(0..max)),
    }
}

/// The deadline `missed + 1` intervals after `due`. Falls back to one
/// interval after `fired_at`, then to `fired_at` itself, when the sum is
/// not representable.
fn fixed_rate_deadline(
    due: TokioInstant,
    interval: Duration,
    missed: u64,
    fired_at: TokioInstant,
) -> TokioInstant {
    let steps = u32::try_from(missed).unwrap_or(u32::MAX).saturating_add(1);
    interval
        .checked_mul(steps)
        .and_then(|ahead| due.checked_add(ahead))
        .or_else(|| fired_at.checked_add(interval))
        .unwrap_or(fired_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_rate_deadline_skips_whole_intervals() {
        let due = TokioInstant::now();
        let interval = Duration::from_millis(10);
        let next = fixed_rate_deadline(due, interval, 2, due + Duration::from_millis(25));
        assert_eq!(next, due + Duration::from_millis(30));
    }

    #[test]
    fn test_fixed_rate_deadline_saturates_huge_miss_counts() {
        let due = TokioInstant::now();
        let interval = Duration::from_millis(10);
        let fired_at = due + Duration::from_secs(1);

        // Past u32: the step count saturates instead of wrapping to a tiny value.
        let next = fixed_rate_deadline(due, interval, u64::from(u32::MAX) + 5, fired_at);
        assert!(next > fired_at);

        // No representable deadline at all.
        let next = fixed_rate_deadline(due, Duration::MAX, 3, fired_at);
        assert_eq!(next, fired_at);
    }
}
