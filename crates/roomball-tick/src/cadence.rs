//! Every-N-ticks counters.

/// Fires on every `period`-th call to [`fire`](Cadence::fire).
///
/// A period of 0 or 1 fires on every call.
#[derive(Debug, Clone)]
pub struct Cadence {
    period: u64,
    counter: u64,
}

impl Cadence {
    pub fn every(period: u64) -> Self {
        Self {
            period: period.max(1),
            counter: 0,
        }
    }

    /// Period for `target_ms` of wall time at `interval_ms` per tick,
    /// rounded down, never below 1.
    pub fn every_ms(target_ms: u64, interval_ms: u64) -> Self {
        Self::every(target_ms / interval_ms.max(1))
    }

    /// Counts one tick; `true` when this tick completes a period.
    pub fn fire(&mut self) -> bool {
        self.counter += 1;
        if self.counter >= self.period {
            self.counter = 0;
            return true;
        }
        false
    }

    pub fn period(&self) -> u64 {
        self.period
    }
}
