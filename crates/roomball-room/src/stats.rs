//! Bandwidth statistics.
//!
//! Two independent flows share the same poller registry:
//!
//! - every registered poller posts its own user's bandwidth on a timer
//!   ([`Outbound::Bandwidth`]);
//! - the room's tick loop samples the sum of all pollers every few ticks,
//!   aggregates the samples and periodically flushes them as a report
//!   ([`Outbound::Statistics`]).
//!
//! The registry is a concurrent map living outside the room actor, so a
//! poller of a just-removed player may post once or twice more before it
//! is killed. That staleness is accepted.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use roomball_protocol::{BandwidthUpdate, Outbound, StatisticsReport};
use roomball_tick::Cadence;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{Publisher, SampleError};

/// Delay before a new poller posts for the first time.
const FIRST_POLL_DELAY: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Wall time between two overall-bandwidth samples, converted to a
    /// tick count using the room's tick interval.
    pub sample_interval_ms: u64,
    /// Samples aggregated before a report is flushed.
    pub flush_every_samples: u64,
    /// Period of each per-user bandwidth post.
    pub poll_interval_ms: u64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 2000,
            flush_every_samples: 1780,
            poll_interval_ms: 2000,
        }
    }
}

// ---------------------------------------------------------------------------
// Pollers
// ---------------------------------------------------------------------------

/// Source of one session's current outbound bandwidth.
pub trait BandwidthPoller: Send + Sync + 'static {
    fn current_bandwidth_kbps(&self) -> Result<f64, SampleError>;
}

impl<F> BandwidthPoller for F
where
    F: Fn() -> Result<f64, SampleError> + Send + Sync + 'static,
{
    fn current_bandwidth_kbps(&self) -> Result<f64, SampleError> {
        self()
    }
}

struct PollerEntry {
    user: String,
    poller: Arc<dyn BandwidthPoller>,
    task: JoinHandle<()>,
}

/// Active bandwidth pollers, keyed by item name (`My_Band_<user>`).
#[derive(Clone)]
pub struct BandwidthRegistry {
    pollers: Arc<DashMap<String, PollerEntry>>,
    publisher: Publisher,
    poll_interval: Duration,
}

impl BandwidthRegistry {
    pub fn new(publisher: Publisher, poll_interval: Duration) -> Self {
        Self {
            pollers: Arc::new(DashMap::new()),
            publisher,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    /// Registers a poller and starts its posting task. A poller already
    /// registered under `item` is replaced and its task stopped.
    pub fn add_poller(&self, item: &str, user: &str, poller: Arc<dyn BandwidthPoller>) {
        let task = tokio::spawn(post_bandwidth(
            user.to_string(),
            Arc::clone(&poller),
            self.publisher.clone(),
            self.poll_interval,
        ));
        let entry = PollerEntry {
            user: user.to_string(),
            poller,
            task,
        };
        if let Some(previous) = self.pollers.insert(item.to_string(), entry) {
            previous.task.abort();
        }
        debug!(%item, %user, pollers = self.pollers.len(), "bandwidth poller added");
    }

    /// Stops and removes a poller. Returns `false` if none was registered.
    pub fn kill_poller(&self, item: &str) -> bool {
        match self.pollers.remove(item) {
            Some((_, entry)) => {
                entry.task.abort();
                debug!(%item, user = %entry.user, "bandwidth poller killed");
                true
            }
            None => false,
        }
    }

    /// Stops every poller.
    pub fn kill_all(&self) {
        self.pollers.retain(|_, entry| {
            entry.task.abort();
            false
        });
    }

    /// Sum of every poller's current bandwidth.
    pub fn total_kbps(&self) -> Result<f64, SampleError> {
        let mut total = 0.0;
        for entry in self.pollers.iter() {
            total += entry.poller.current_bandwidth_kbps()?;
        }
        Ok(total)
    }

    pub fn len(&self) -> usize {
        self.pollers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pollers.is_empty()
    }

    pub fn contains(&self, item: &str) -> bool {
        self.pollers.contains_key(item)
    }
}

async fn post_bandwidth(
    user: String,
    poller: Arc<dyn BandwidthPoller>,
    publisher: Publisher,
    period: Duration,
) {
    let mut ticker = time::interval_at(Instant::now() + FIRST_POLL_DELAY, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match poller.current_bandwidth_kbps() {
            Ok(kbps) => {
                debug!(%user, kbps, "current bandwidth");
                let update = BandwidthUpdate {
                    user: user.clone(),
                    current_bandwidth: format_kbps(kbps),
                };
                if !publisher.enqueue(Outbound::Bandwidth(update)) {
                    return;
                }
            }
            Err(e) => debug!(%user, error = %e, "bandwidth poll skipped"),
        }
    }
}

/// Formats a kbps value with at most two decimals (`12.5`, `3.14`, `7`).
pub fn format_kbps(kbps: f64) -> String {
    let fixed = format!("{kbps:.2}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Running min/max/mean over bandwidth samples.
#[derive(Debug, Clone, Default)]
pub struct BandwidthStats {
    samples: u64,
    min: f64,
    max: f64,
    sum: f64,
    last: f64,
}

impl BandwidthStats {
    pub fn feed(&mut self, kbps: f64) {
        if self.samples == 0 {
            self.min = kbps;
            self.max = kbps;
        } else {
            self.min = self.min.min(kbps);
            self.max = self.max.max(kbps);
        }
        self.samples += 1;
        self.sum += kbps;
        self.last = kbps;
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// `None` until at least one sample was fed.
    pub fn report(&self) -> Option<StatisticsReport> {
        (self.samples > 0).then(|| StatisticsReport {
            samples: self.samples,
            min_kbps: self.min,
            max_kbps: self.max,
            mean_kbps: self.sum / self.samples as f64,
            last_kbps: self.last,
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Tick-driven sampler for the overall bandwidth.
pub struct StatisticsSampler {
    registry: BandwidthRegistry,
    cadence: Cadence,
    flush_every: u64,
    stats: BandwidthStats,
}

impl StatisticsSampler {
    pub fn new(registry: BandwidthRegistry, config: &StatsConfig, tick_interval_ms: u64) -> Self {
        Self {
            registry,
            cadence: Cadence::every_ms(config.sample_interval_ms, tick_interval_ms),
            flush_every: config.flush_every_samples.max(1),
            stats: BandwidthStats::default(),
        }
    }

    /// Counts one tick; samples when the cadence fires and flushes once
    /// enough samples were taken. A failed sample is logged and skipped.
    pub fn on_tick(&mut self, publisher: &Publisher) {
        if !self.cadence.fire() {
            return;
        }

        match self.registry.total_kbps() {
            Ok(total) => self.stats.feed(total),
            Err(e) => {
                warn!(error = %e, "overall bandwidth sample failed");
                return;
            }
        }

        if self.stats.samples() >= self.flush_every {
            self.flush(publisher);
        }
    }

    /// Logs and publishes the current aggregate, then starts over.
    pub fn flush(&mut self, publisher: &Publisher) {
        if let Some(report) = self.stats.report() {
            info!(
                samples = report.samples,
                min_kbps = report.min_kbps,
                max_kbps = report.max_kbps,
                mean_kbps = report.mean_kbps,
                last_kbps = report.last_kbps,
                "bandwidth statistics"
            );
            publisher.enqueue(Outbound::Statistics(report));
        }
        self.stats.reset();
    }

    pub fn stats(&self) -> &BandwidthStats {
        &self.stats
    }

    pub fn registry(&self) -> &BandwidthRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(kbps: f64) -> Arc<dyn BandwidthPoller> {
        Arc::new(move || Ok::<f64, SampleError>(kbps))
    }

    #[test]
    fn test_format_kbps() {
        assert_eq!(format_kbps(12.5), "12.5");
        assert_eq!(format_kbps(3.14159), "3.14");
        assert_eq!(format_kbps(7.0), "7");
        assert_eq!(format_kbps(0.004), "0");
    }

    #[test]
    fn test_stats_aggregate() {
        let mut stats = BandwidthStats::default();
        assert!(stats.report().is_none());
        for v in [4.0, 1.0, 7.0] {
            stats.feed(v);
        }
        let report = stats.report().unwrap();
        assert_eq!(report.samples, 3);
        assert_eq!(report.min_kbps, 1.0);
        assert_eq!(report.max_kbps, 7.0);
        assert_eq!(report.mean_kbps, 4.0);
        assert_eq!(report.last_kbps, 7.0);
        stats.reset();
        assert_eq!(stats.samples(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_totals_and_kill() {
        let (publisher, _rx) = Publisher::channel();
        let registry = BandwidthRegistry::new(publisher, Duration::from_secs(2));
        registry.add_poller("My_Band_a", "a", fixed(1.5));
        registry.add_poller("My_Band_b", "b", fixed(2.0));
        assert_eq!(registry.total_kbps().unwrap(), 3.5);

        assert!(registry.kill_poller("My_Band_a"));
        assert!(!registry.kill_poller("My_Band_a"));
        assert_eq!(registry.total_kbps().unwrap(), 2.0);

        registry.kill_all();
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_posts_formatted_bandwidth() {
        let (publisher, mut rx) = Publisher::channel();
        let registry = BandwidthRegistry::new(publisher, Duration::from_secs(2));
        registry.add_poller("My_Band_bob", "bob", fixed(12.346));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        let expected = Outbound::Bandwidth(BandwidthUpdate {
            user: "bob".into(),
            current_bandwidth: "12.35".into(),
        });
        assert_eq!(first, expected);
        assert_eq!(second, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampler_flushes_report_and_survives_failures() {
        let (publisher, mut rx) = Publisher::channel();
        let registry = BandwidthRegistry::new(publisher.clone(), Duration::from_secs(3600));
        let config = StatsConfig {
            sample_interval_ms: 20,
            flush_every_samples: 2,
            poll_interval_ms: 3_600_000,
        };
        let mut sampler = StatisticsSampler::new(registry.clone(), &config, 10);

        registry.add_poller("My_Band_x", "x", Arc::new(|| Err::<f64, _>(SampleError::Invalid(f64::NAN))));
        for _ in 0..4 {
            sampler.on_tick(&publisher);
        }
        assert_eq!(sampler.stats().samples(), 0, "failed samples are skipped");

        registry.kill_poller("My_Band_x");
        registry.add_poller("My_Band_y", "y", fixed(5.0));
        for _ in 0..4 {
            sampler.on_tick(&publisher);
        }

        let report = loop {
            match rx.recv().await.unwrap() {
                Outbound::Statistics(report) => break report,
                _ => continue,
            }
        };
        assert_eq!(report.samples, 2);
        assert_eq!(report.mean_kbps, 5.0);
        assert_eq!(sampler.stats().samples(), 0);
    }
}
