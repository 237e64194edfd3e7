//! Countdown scheduler — 1 Hz ticks over the 30-second code window.
//!
//! Split in two layers: [`Countdown`] is the pure window-tracking state
//! machine (fully deterministic, tested with explicit timestamps), and
//! [`CountdownScheduler`] drives it from a spawned tokio task. Rollover is
//! reported exactly once per window, on the first tick that lands in a new
//! time step.

use std::sync::Arc;

use crate::authenticator::engine;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Clock
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Wall-clock capability, injected so tests can drive time explicitly.
pub trait Clock: Send + Sync {
    /// Current unix timestamp in seconds.
    fn now_unix(&self) -> u64;
}

/// The process wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Pure countdown core
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One observed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// The timestamp this tick was computed from.
    pub now: u64,
    /// Seconds left in the current window, in [1, period].
    pub seconds_remaining: u32,
    /// `true` on the first tick of a new window; the code must be
    /// regenerated with this tick's `now`.
    pub rolled_over: bool,
}

/// Window-tracking state. The first observation primes the tracker and
/// never reports a rollover; after that, a rollover is reported once per
/// time-step change, however many seconds the clock jumped.
#[derive(Debug, Clone)]
pub struct Countdown {
    period: u32,
    last_step: Option<u64>,
}

impl Countdown {
    pub fn new(period: u32) -> Self {
        Self {
            period,
            last_step: None,
        }
    }

    /// Observe the clock at `now` and produce the tick for it.
    pub fn observe(&mut self, now: u64) -> Tick {
        let step = engine::time_step_at(now, self.period);
        let rolled_over = self.last_step.is_some_and(|last| step != last);
        self.last_step = Some(step);
        Tick {
            now,
            seconds_remaining: engine::seconds_remaining_at(now, self.period),
            rolled_over,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Scheduler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Idle/Running ticker. `start` spawns a task that observes the clock once
/// per second and hands each [`Tick`] to the callback; ticks are strictly
/// serialized (the callback runs to completion before the next tick is
/// awaited). `stop` is idempotent, and dropping the scheduler releases the
/// task as well.
pub struct CountdownScheduler {
    clock: Arc<dyn Clock>,
    period: u32,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl CountdownScheduler {
    pub fn new(clock: Arc<dyn Clock>, period: u32) -> Self {
        Self {
            clock,
            period,
            task: None,
        }
    }

    /// Scheduler over the process wall clock and the backend's 30 s window.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock), engine::PERIOD)
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Transition Idle → Running. The priming tick (the countdown position
    /// at start time) is delivered to the callback synchronously so the
    /// caller renders immediately, and also returned. `None` if the
    /// scheduler was already running.
    pub fn start<F>(&mut self, mut on_tick: F) -> Option<Tick>
    where
        F: FnMut(Tick) + Send + 'static,
    {
        if self.task.is_some() {
            return None;
        }

        let mut countdown = Countdown::new(self.period);
        let initial = countdown.observe(self.clock.now_unix());
        log::debug!(
            "countdown started, {} s left in current window",
            initial.seconds_remaining
        );
        on_tick(initial);

        let clock = Arc::clone(&self.clock);
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
            // the first interval tick completes immediately; the priming
            // observation already covered it
            ticker.tick().await;
            loop {
                ticker.tick().await;
                on_tick(countdown.observe(clock.now_unix()));
            }
        }));

        Some(initial)
    }

    /// Transition Running → Idle. No-op while Idle.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            log::debug!("countdown stopped");
        }
    }
}

impl Drop for CountdownScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    // ── Pure countdown ───────────────────────────────────────────

    #[test]
    fn initial_observation_primes_without_rollover() {
        let mut countdown = Countdown::new(30);
        let tick = countdown.observe(5);
        assert_eq!(tick.seconds_remaining, 25);
        assert!(!tick.rolled_over);
    }

    #[test]
    fn decrements_by_one_per_second() {
        let mut countdown = Countdown::new(30);
        countdown.observe(5);
        for now in 6..30 {
            let tick = countdown.observe(now);
            assert_eq!(tick.seconds_remaining, (30 - now % 30) as u32);
            assert!(!tick.rolled_over, "early rollover at {}", now);
        }
    }

    #[test]
    fn rolls_over_exactly_at_boundary() {
        let mut countdown = Countdown::new(30);
        countdown.observe(29);
        let tick = countdown.observe(30);
        assert!(tick.rolled_over);
        assert_eq!(tick.seconds_remaining, 30);
    }

    #[test]
    fn at_most_one_rollover_per_window() {
        let mut countdown = Countdown::new(30);
        countdown.observe(29);
        assert!(countdown.observe(30).rolled_over);
        for now in 31..60 {
            assert!(!countdown.observe(now).rolled_over, "double rollover at {}", now);
        }
        assert!(countdown.observe(60).rolled_over);
    }

    #[test]
    fn clock_jump_rolls_over_once() {
        let mut countdown = Countdown::new(30);
        countdown.observe(5);
        // process was suspended across two whole windows
        let tick = countdown.observe(95);
        assert!(tick.rolled_over);
        assert_eq!(tick.seconds_remaining, 25);
        assert!(!countdown.observe(96).rolled_over);
    }

    #[test]
    fn boundary_start_shows_full_window() {
        let mut countdown = Countdown::new(30);
        let tick = countdown.observe(60);
        assert_eq!(tick.seconds_remaining, 30);
    }

    // ── Scheduler ────────────────────────────────────────────────

    /// Clock that advances one second per observation.
    struct SteppingClock(AtomicU64);

    impl Clock for SteppingClock {
        fn now_unix(&self) -> u64 {
            self.0.fetch_add(1, Ordering::SeqCst)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_ticks_and_rolls_over() {
        // first observation lands on 27 → 3 s remaining
        let clock = Arc::new(SteppingClock(AtomicU64::new(27)));
        let ticks: Arc<Mutex<Vec<Tick>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&ticks);

        let mut scheduler = CountdownScheduler::new(clock, 30);
        let initial = scheduler
            .start(move |tick| sink.lock().unwrap().push(tick))
            .unwrap();
        assert_eq!(initial.seconds_remaining, 3);
        assert!(!initial.rolled_over);

        tokio::time::sleep(std::time::Duration::from_millis(3_100)).await;
        scheduler.stop();

        let ticks = ticks.lock().unwrap();
        // priming tick at 27, then 28, 29, 30 → rollover at 30
        assert_eq!(ticks[0].seconds_remaining, 3);
        assert_eq!(ticks[1].seconds_remaining, 2);
        assert_eq!(ticks[2].seconds_remaining, 1);
        assert!(ticks[3].rolled_over);
        assert_eq!(ticks[3].seconds_remaining, 30);
        assert_eq!(ticks.iter().filter(|t| t.rolled_over).count(), 1);
    }

    #[tokio::test]
    async fn start_is_exclusive_and_stop_idempotent() {
        let mut scheduler = CountdownScheduler::new(Arc::new(SystemClock), 30);
        assert!(!scheduler.is_running());

        assert!(scheduler.start(|_| {}).is_some());
        assert!(scheduler.is_running());
        // second start while Running is refused
        assert!(scheduler.start(|_| {}).is_none());

        scheduler.stop();
        assert!(!scheduler.is_running());
        scheduler.stop(); // no-op, not an error
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn restart_after_stop() {
        let mut scheduler = CountdownScheduler::new(Arc::new(SystemClock), 30);
        assert!(scheduler.start(|_| {}).is_some());
        scheduler.stop();
        assert!(scheduler.start(|_| {}).is_some());
        assert!(scheduler.is_running());
    }
}
