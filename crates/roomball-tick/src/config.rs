//! Scheduler configuration.

use std::time::Duration;

use tracing::warn;

/// How the next deadline is computed after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// One interval after the tick body finished. A slow tick pushes every
    /// later tick back; nothing is skipped.
    #[default]
    FixedDelay,
    /// One interval after the previous deadline. Deadlines missed by more
    /// than a full interval are dropped rather than fired back to back.
    FixedRate,
}

#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks; also every tick's simulation step.
    pub interval: Duration,
    pub policy: TickPolicy,
    /// Fraction of `interval` at which a slow tick is logged at debug.
    pub budget_warn_threshold: f64,
    /// Fraction of `interval` at which a slow tick is logged as a warning.
    pub budget_critical_threshold: f64,
    /// Track average and max work time.
    pub metrics_enabled: bool,
    /// Upper bound (µs) of a random delay added before the first tick.
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(10),
            policy: TickPolicy::FixedDelay,
            budget_warn_threshold: 0.8,
            budget_critical_threshold: 1.0,
            metrics_enabled: true,
            initial_jitter_us: 0,
        }
    }
}

impl TickConfig {
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

    pub fn with_interval_ms(ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(ms),
            ..Self::default()
        }
    }

    /// Brings every field into range: the interval is at least
    /// [`Self::MIN_INTERVAL`], both thresholds lie in `0.0..=1.0` and the
    /// warning threshold never exceeds the critical one.
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                requested_us = self.interval.as_micros() as u64,
                min_ms = 1,
                "tick interval too short, using the minimum"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        let critical = self.budget_critical_threshold.clamp(0.0, 1.0);
        self.budget_critical_threshold = critical;
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, critical);
        self
    }
}
