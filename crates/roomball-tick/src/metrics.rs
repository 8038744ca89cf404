//! Per-scheduler timing statistics.

use std::time::Duration;

/// Smoothing factor of the average tick time.
const EMA_ALPHA: f64 = 0.1;

/// Counters and timings, updated as ticks fire and finish.
///
/// Work times come from [`TickScheduler::record_tick_end`](crate::TickScheduler::record_tick_end);
/// ticks that never report an end only count towards `total_ticks`.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub total_ticks: u64,
    /// Ticks that fired more than a tenth of an interval late.
    pub total_overruns: u64,
    /// Deadlines dropped under `FixedRate`.
    pub total_skipped: u64,
    /// Exponential moving average of the tick body's duration.
    pub avg_tick_time: Duration,
    pub max_tick_time: Duration,
    /// Last tick body over the interval; above 1.0 the tick overran.
    pub budget_utilization: f64,
}

impl TickMetrics {
    pub(crate) fn on_fire(&mut self, overrun: bool, skipped: u64) {
        self.total_ticks += 1;
        self.total_skipped += skipped;
        if overrun {
            self.total_overruns += 1;
        }
    }

    pub(crate) fn on_work(&mut self, elapsed: Duration, budget: Duration, timings: bool) -> f64 {
        let utilization = elapsed.as_secs_f64() / budget.as_secs_f64();
        self.budget_utilization = utilization;

        if timings {
            self.max_tick_time = self.max_tick_time.max(elapsed);
            let avg = self.avg_tick_time.as_secs_f64();
            self.avg_tick_time =
                Duration::from_secs_f64(avg + EMA_ALPHA * (elapsed.as_secs_f64() - avg));
        }
        utilization
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_moves_a_tenth_towards_sample() {
        let mut m = TickMetrics::default();
        m.on_work(Duration::from_millis(10), Duration::from_millis(10), true);
        let off = m.avg_tick_time.abs_diff(Duration::from_millis(1));
        assert!(off < Duration::from_micros(1), "avg {:?}", m.avg_tick_time);
        assert_eq!(m.max_tick_time, Duration::from_millis(10));
        assert!((m.budget_utilization - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_timings_off_only_tracks_utilization() {
        let mut m = TickMetrics::default();
        let u = m.on_work(Duration::from_millis(5), Duration::from_millis(10), false);
        assert!((u - 0.5).abs() < 1e-9);
        assert_eq!(m.max_tick_time, Duration::ZERO);
    }

    #[test]
    fn test_fire_counts() {
        let mut m = TickMetrics::default();
        m.on_fire(false, 0);
        m.on_fire(true, 3);
        assert_eq!((m.total_ticks, m.total_overruns, m.total_skipped), (2, 1, 3));
    }
}
