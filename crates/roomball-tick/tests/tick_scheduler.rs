//! Scheduler behaviour under tokio's paused clock.
//!
//! With `start_paused = true` the runtime jumps the clock forward whenever
//! every task is idle, so elapsed tokio time can be asserted exactly.

use std::time::Duration;

use roomball_tick::{Cadence, TickConfig, TickPolicy, TickScheduler};
use tokio::time::{Instant, advance, timeout};

const INTERVAL: Duration = Duration::from_millis(20);

fn scheduler(policy: TickPolicy) -> TickScheduler {
    TickScheduler::new(TickConfig {
        interval: INTERVAL,
        policy,
        ..TickConfig::default()
    })
}

// =========================================================================
// Configuration
// =========================================================================

#[test]
fn test_defaults_match_room_cadence() {
    let config = TickConfig::default();
    assert_eq!(config.interval, Duration::from_millis(10));
    assert_eq!(config.policy, TickPolicy::FixedDelay);
    assert_eq!(config.initial_jitter_us, 0);
}

#[test]
fn test_sub_millisecond_interval_is_raised() {
    let config = TickConfig {
        interval: Duration::from_micros(300),
        ..TickConfig::default()
    }
    .validated();
    assert_eq!(config.interval, TickConfig::MIN_INTERVAL);
}

#[test]
fn test_warn_threshold_never_exceeds_critical() {
    let config = TickConfig {
        budget_warn_threshold: 1.5,
        budget_critical_threshold: 0.5,
        ..TickConfig::default()
    }
    .validated();
    assert_eq!(config.budget_critical_threshold, 0.5);
    assert_eq!(config.budget_warn_threshold, 0.5);
}

// =========================================================================
// Firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_first_tick_after_one_interval() {
    let mut s = scheduler(TickPolicy::FixedDelay);
    let t0 = Instant::now();

    let tick = s.wait_for_tick().await;
    assert_eq!(t0.elapsed(), INTERVAL);
    assert_eq!(tick.tick, 1);
    assert_eq!(tick.dt, INTERVAL);
    assert!(!tick.overrun);
}

#[tokio::test(start_paused = true)]
async fn test_dt_is_fixed_and_ticks_count_up() {
    let mut s = TickScheduler::with_interval_ms(10);
    for n in 1..=4 {
        let tick = s.wait_for_tick().await;
        s.record_tick_end();
        assert_eq!((tick.tick, tick.dt), (n, Duration::from_millis(10)));
    }
    assert_eq!(s.tick_count(), 4);
    assert_eq!(s.metrics().total_ticks, 4);
}

#[tokio::test(start_paused = true)]
async fn test_fixed_delay_measures_from_end_of_body() {
    let mut s = scheduler(TickPolicy::FixedDelay);
    s.wait_for_tick().await;
    advance(Duration::from_millis(70)).await;
    s.record_tick_end();

    let t0 = Instant::now();
    let tick = s.wait_for_tick().await;
    assert_eq!(t0.elapsed(), INTERVAL);
    assert_eq!(tick.ticks_skipped, 0);
}

#[tokio::test(start_paused = true)]
async fn test_fixed_rate_drops_missed_deadlines() {
    let mut s = scheduler(TickPolicy::FixedRate);
    s.wait_for_tick().await;

    // Deadline was t=40; arriving at t=70 is 1.5 intervals late.
    advance(Duration::from_millis(50)).await;
    let tick = s.wait_for_tick().await;
    assert!(tick.overrun);
    assert_eq!(tick.ticks_skipped, 1);
    assert_eq!(s.metrics().total_skipped, 1);
    assert_eq!(s.metrics().total_overruns, 1);
}

// =========================================================================
// Pausing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_paused_scheduler_never_fires() {
    let mut s = scheduler(TickPolicy::FixedDelay);
    s.wait_for_tick().await;
    s.pause();

    assert!(timeout(Duration::from_secs(5), s.wait_for_tick()).await.is_err());
    assert_eq!(s.tick_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_starts_paused_until_resumed() {
    let mut s = TickScheduler::paused(TickConfig::with_interval_ms(20));
    assert!(s.is_paused());
    assert!(timeout(Duration::from_millis(300), s.wait_for_tick()).await.is_err());

    s.resume();
    assert_eq!(s.wait_for_tick().await.tick, 1);
}

#[tokio::test(start_paused = true)]
async fn test_resume_waits_a_full_interval() {
    let mut s = scheduler(TickPolicy::FixedRate);
    s.wait_for_tick().await;
    s.pause();
    advance(Duration::from_secs(3)).await;
    s.resume();

    let t0 = Instant::now();
    let tick = s.wait_for_tick().await;
    assert_eq!(t0.elapsed(), INTERVAL);
    assert_eq!(tick.ticks_skipped, 0);
}

#[tokio::test]
async fn test_pause_and_resume_are_idempotent() {
    let mut s = scheduler(TickPolicy::FixedDelay);
    s.pause();
    s.pause();
    assert!(s.is_paused());
    s.resume();
    s.resume();
    assert!(!s.is_paused());
}

// =========================================================================
// Metrics
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_end_without_tick_changes_nothing() {
    let mut s = scheduler(TickPolicy::FixedDelay);
    s.record_tick_end();
    assert_eq!(s.metrics().total_ticks, 0);
    assert_eq!(s.metrics().budget_utilization, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_work_time_is_wall_clock() {
    let mut s = scheduler(TickPolicy::FixedDelay);
    s.wait_for_tick().await;
    // The paused tokio clock does not move here; the real one does.
    std::thread::sleep(Duration::from_micros(200));
    s.record_tick_end();

    let m = s.metrics();
    assert!(m.max_tick_time >= Duration::from_micros(200));
    assert!(m.budget_utilization > 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_metrics_keep_timings_at_zero() {
    let mut s = TickScheduler::new(TickConfig {
        metrics_enabled: false,
        ..TickConfig::with_interval_ms(20)
    });
    s.wait_for_tick().await;
    s.record_tick_end();

    assert_eq!(s.metrics().max_tick_time, Duration::ZERO);
    assert_eq!(s.metrics().avg_tick_time, Duration::ZERO);
    assert_eq!(s.metrics().total_ticks, 1);
}

// =========================================================================
// Inside a select! loop, the way a room drives it
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_commands_and_ticks_share_one_loop() {
    let mut s = TickScheduler::with_interval_ms(10);
    let mut flush = Cadence::every(4);
    let (tx, mut rx) = tokio::sync::mpsc::channel::<u32>(8);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(55)).await;
        tx.send(1).await.ok(); // stop ticking
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(0).await.ok(); // quit
    });

    let (mut ticks, mut flushes) = (0u64, 0u64);
    loop {
        tokio::select! {
            Some(cmd) = rx.recv() => match cmd {
                0 => break,
                _ => s.pause(),
            },
            tick = s.wait_for_tick() => {
                ticks += 1;
                assert_eq!(tick.tick, ticks);
                if flush.fire() {
                    flushes += 1;
                }
                s.record_tick_end();
            }
        }
    }

    assert_eq!(ticks, 5, "ticks at 10..=50ms, none while paused");
    assert_eq!(flushes, 1);
}
