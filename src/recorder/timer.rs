//! Recording and playback clock.
//!
//! `CountdownTimer` counts up from zero while recording and down from the
//! artifact length while playing. It is driven by a `Cadence`, a one-second
//! schedule that the UI loop polls between frames, the same way the recording
//! view samples volume on a fixed interval.

use std::fmt;
use std::time::{Duration, Instant};

/// Interval between timer ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Repeating schedule that reports how many periods have elapsed.
///
/// Every elapsed period is reported exactly once, even if the caller polls
/// late, so slow frames never drop or duplicate ticks.
#[derive(Debug, Clone)]
pub struct Cadence {
    period: Duration,
    next_due: Option<Instant>,
}

impl Cadence {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            next_due: None,
        }
    }

    /// Schedules the first tick one period after `now`, replacing any pending schedule.
    pub fn arm(&mut self, now: Instant) {
        self.next_due = Some(now + self.period);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    /// Returns the number of ticks due at `now` and advances the schedule past them.
    pub fn due_ticks(&mut self, now: Instant) -> u32 {
        let Some(mut due) = self.next_due else {
            return 0;
        };

        let mut ticks = 0;
        while now >= due {
            ticks += 1;
            due += self.period;
        }
        self.next_due = Some(due);
        ticks
    }
}

impl Default for Cadence {
    fn default() -> Self {
        Self::new(TICK_INTERVAL)
    }
}

/// Direction the timer moves in, derived from its start value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// `start == 0`: elapsed time while recording
    CountUp,
    /// `start > 0`: remaining time while playing
    CountDown,
}

/// Result of applying one cadence tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The cadence is not armed; nothing changed
    Idle,
    /// The value moved to the contained number of seconds
    Advanced(u64),
    /// The countdown reached zero and the cadence stopped
    Finished,
}

/// One-second clock that counts up from zero or down from `start`.
pub struct CountdownTimer {
    start: u64,
    value: u64,
    running: bool,
    cadence: Cadence,
    on_finish: Option<Box<dyn FnMut()>>,
}

impl CountdownTimer {
    /// Creates a stopped timer showing `start`.
    pub fn new(start: u64) -> Self {
        Self::with_cadence(start, Cadence::default())
    }

    pub fn with_cadence(start: u64, cadence: Cadence) -> Self {
        Self {
            start,
            value: start,
            running: false,
            cadence,
            on_finish: None,
        }
    }

    /// Registers the callback invoked once when a countdown reaches zero.
    pub fn with_on_finish(mut self, on_finish: impl FnMut() + 'static) -> Self {
        self.on_finish = Some(Box::new(on_finish));
        self
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// The externally requested running flag.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether the cadence is live. False after completion even if still running.
    pub fn is_ticking(&self) -> bool {
        self.cadence.is_armed()
    }

    pub fn mode(&self) -> TimerMode {
        if self.start > 0 {
            TimerMode::CountDown
        } else {
            TimerMode::CountUp
        }
    }

    /// Changes the start value. A different value resets the display immediately
    /// and re-arms the cadence if running; the same value is a no-op.
    pub fn set_start(&mut self, start: u64, now: Instant) {
        if start == self.start {
            return;
        }
        self.restart_from(start, now);
    }

    /// Resets the display to `start` unconditionally, re-arming if running.
    pub fn restart_from(&mut self, start: u64, now: Instant) {
        self.start = start;
        self.value = start;
        if self.running {
            self.cadence.arm(now);
        }
    }

    /// Starts or stops the cadence. Stopping never changes the value and never
    /// calls `on_finish`.
    pub fn set_running(&mut self, running: bool, now: Instant) {
        if running == self.running {
            return;
        }
        self.running = running;
        if running {
            self.cadence.arm(now);
        } else {
            self.cadence.cancel();
        }
    }

    /// Applies a single cadence tick.
    pub fn tick(&mut self) -> Tick {
        if !self.cadence.is_armed() {
            return Tick::Idle;
        }

        match self.mode() {
            TimerMode::CountUp => {
                self.value += 1;
                Tick::Advanced(self.value)
            }
            TimerMode::CountDown if self.value <= 1 => {
                self.value = 0;
                self.cadence.cancel();
                if let Some(on_finish) = self.on_finish.as_mut() {
                    on_finish();
                }
                Tick::Finished
            }
            TimerMode::CountDown => {
                self.value -= 1;
                Tick::Advanced(self.value)
            }
        }
    }

    /// Applies every tick that is due at `now` and returns the last outcome.
    pub fn poll(&mut self, now: Instant) -> Tick {
        let due = self.cadence.due_ticks(now);
        let mut outcome = Tick::Idle;
        for _ in 0..due {
            match self.tick() {
                Tick::Idle => break,
                Tick::Finished => return Tick::Finished,
                advanced => outcome = advanced,
            }
        }
        outcome
    }

    /// Current value as `m:ss`.
    pub fn display(&self) -> String {
        format_time(self.value)
    }
}

impl fmt::Debug for CountdownTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountdownTimer")
            .field("start", &self.start)
            .field("value", &self.value)
            .field("running", &self.running)
            .field("ticking", &self.is_ticking())
            .finish()
    }
}

/// Formats whole seconds as `m:ss`.
pub fn format_time(seconds: u64) -> String {
    let minutes = seconds / 60;
    let secs = seconds % 60;
    format!("{minutes}:{secs:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn finish_counter() -> (Rc<Cell<u32>>, impl FnMut() + 'static) {
        let count = Rc::new(Cell::new(0));
        let handle = Rc::clone(&count);
        (count, move || handle.set(handle.get() + 1))
    }

    #[test]
    fn test_counts_up_from_zero() {
        let (finished, on_finish) = finish_counter();
        let mut timer = CountdownTimer::new(0).with_on_finish(on_finish);
        timer.set_running(true, Instant::now());

        for _ in 0..5 {
            timer.tick();
        }

        assert_eq!(timer.value(), 5);
        assert_eq!(timer.mode(), TimerMode::CountUp);
        assert_eq!(finished.get(), 0);
    }

    #[test]
    fn test_counts_down_and_finishes_once() {
        let (finished, on_finish) = finish_counter();
        let mut timer = CountdownTimer::new(3).with_on_finish(on_finish);
        timer.set_running(true, Instant::now());

        let mut seen = vec![timer.value()];
        for _ in 0..3 {
            timer.tick();
            seen.push(timer.value());
        }
        assert_eq!(seen, vec![3, 2, 1, 0]);
        assert_eq!(finished.get(), 1);
        assert!(!timer.is_ticking());

        assert_eq!(timer.tick(), Tick::Idle);
        assert_eq!(timer.tick(), Tick::Idle);
        assert_eq!(timer.value(), 0);
        assert_eq!(finished.get(), 1);
    }

    #[test]
    fn test_stopping_is_not_finishing() {
        let (finished, on_finish) = finish_counter();
        let mut timer = CountdownTimer::new(5).with_on_finish(on_finish);
        let now = Instant::now();
        timer.set_running(true, now);
        timer.tick();
        timer.tick();
        timer.tick();
        assert_eq!(timer.value(), 2);

        timer.set_running(false, now);
        assert!(!timer.is_ticking());
        assert_eq!(timer.tick(), Tick::Idle);
        assert_eq!(timer.poll(now + Duration::from_secs(10)), Tick::Idle);
        assert_eq!(timer.value(), 2);
        assert_eq!(finished.get(), 0);
    }

    #[test]
    fn test_start_change_resets_value_while_stopped() {
        let mut timer = CountdownTimer::new(10);
        timer.set_start(6, Instant::now());
        assert_eq!(timer.value(), 6);
        assert!(!timer.is_ticking());
    }

    #[test]
    fn test_same_start_keeps_progress() {
        let mut timer = CountdownTimer::new(10);
        let now = Instant::now();
        timer.set_running(true, now);
        timer.tick();
        timer.tick();
        timer.set_start(10, now);
        assert_eq!(timer.value(), 8);

        timer.restart_from(10, now);
        assert_eq!(timer.value(), 10);
        assert!(timer.is_ticking());
    }

    #[test]
    fn test_poll_applies_each_elapsed_second_once() {
        let mut timer = CountdownTimer::new(0);
        let t0 = Instant::now();
        timer.set_running(true, t0);

        assert_eq!(timer.poll(t0 + Duration::from_millis(999)), Tick::Idle);
        assert_eq!(timer.poll(t0 + Duration::from_millis(3_500)), Tick::Advanced(3));
        assert_eq!(timer.poll(t0 + Duration::from_millis(3_900)), Tick::Idle);
        assert_eq!(timer.poll(t0 + Duration::from_secs(4)), Tick::Advanced(4));
    }

    #[test]
    fn test_poll_stops_at_completion() {
        let (finished, on_finish) = finish_counter();
        let mut timer = CountdownTimer::new(2).with_on_finish(on_finish);
        let t0 = Instant::now();
        timer.set_running(true, t0);

        assert_eq!(timer.poll(t0 + Duration::from_secs(30)), Tick::Finished);
        assert_eq!(timer.value(), 0);
        assert_eq!(finished.get(), 1);
        assert_eq!(timer.poll(t0 + Duration::from_secs(60)), Tick::Idle);
    }

    #[test]
    fn test_cadence_rearm_replaces_schedule() {
        let mut cadence = Cadence::new(Duration::from_secs(1));
        let t0 = Instant::now();
        cadence.arm(t0);
        cadence.arm(t0 + Duration::from_millis(800));
        assert_eq!(cadence.due_ticks(t0 + Duration::from_millis(1_500)), 0);
        assert_eq!(cadence.due_ticks(t0 + Duration::from_millis(1_800)), 1);
        cadence.cancel();
        assert_eq!(cadence.due_ticks(t0 + Duration::from_secs(60)), 0);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "0:00");
        assert_eq!(format_time(5), "0:05");
        assert_eq!(format_time(62), "1:02");
        assert_eq!(format_time(600), "10:00");
    }
}
