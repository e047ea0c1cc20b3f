//! Frequency-driven callback scheduler.
//!
//! A [`Clock`] invokes a set of registered callbacks at a target rate.
//! One instance paces the fetch-decode-execute cycle, a second fixed
//! 60 Hz instance drives the countdown timers.
//!
//! The clock is designed to work with the yielding cooperative pattern
//! of the machine loop. The platform only has to promise "I can be told
//! to run again later": each wake-up calls [`Clock::tick`] with the
//! current time, and the clock decides from the accumulated elapsed
//! time whether a period has passed.
use std::time::{Duration, Instant};

/// Action a callback reports back to the clock that invoked it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockControl {
    /// Stay registered for the next tick.
    Keep,
    /// Remove this callback after the current tick.
    ///
    /// Returning this is how a callback unregisters itself without
    /// re-entering the clock while it is mid-iteration.
    Unregister,
}

pub type Callback = Box<dyn FnMut() -> ClockControl>;

/// Identity token for a registered callback.
///
/// Closures have no useful notion of equality, so removal goes through
/// the token handed out at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackHandle(u64);

/// Clock frequency, in hertz (per second).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(crate::constants::NANOS_IN_SECOND / freq.0)
        }
    }
}

pub struct Clock {
    /// Time between two ticks, derived from the configured frequency.
    period: Duration,
    callbacks: Vec<(CallbackHandle, Callback)>,
    next_handle: u64,
    /// Wall-clock time of the previous wake-up. `None` until the first.
    last: Option<Instant>,
    /// Elapsed time accumulated towards the next period.
    accumulator: Duration,
}

impl Clock {
    pub fn new(frequency: Hz) -> Self {
        Clock {
            period: frequency.into(),
            callbacks: Vec::new(),
            next_handle: 0,
            last: None,
            accumulator: Duration::ZERO,
        }
    }

    /// Adds a callback to the active set and returns its removal token.
    pub fn register(&mut self, callback: Callback) -> CallbackHandle {
        let handle = CallbackHandle(self.next_handle);
        self.next_handle += 1;
        self.callbacks.push((handle, callback));
        handle
    }

    /// Removes a callback by its token. Unknown tokens are ignored.
    pub fn unregister(&mut self, handle: CallbackHandle) {
        self.callbacks.retain(|(h, _)| *h != handle);
    }

    /// Whether no callbacks are registered. An idle clock schedules no work.
    pub fn is_idle(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.len()
    }

    /// Wall-clock entry point, called on every platform wake-up.
    ///
    /// Elapsed time is measured against the previous wake-up; on the very
    /// first tick exactly one period is assumed to have passed. Returns
    /// whether the callback set is still non-empty, so the caller knows
    /// to schedule the next wake-up.
    pub fn tick(&mut self, now: Instant) -> bool {
        let elapsed = match self.last {
            Some(last) => now.saturating_duration_since(last),
            None => self.period,
        };
        self.last = Some(now);
        self.advance(elapsed);
        !self.callbacks.is_empty()
    }

    /// Accumulates elapsed time and fires the callbacks if a full period
    /// has passed. Returns whether the callbacks fired.
    ///
    /// Missed periods are dropped, not replayed: after a stall the
    /// accumulator resets to zero rather than queueing a burst of
    /// catch-up ticks.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        self.accumulator += elapsed;
        if self.accumulator < self.period {
            return false;
        }

        if !self.period.is_zero() && self.accumulator >= self.period * 2 {
            log::debug!(
                "clock stalled; dropping {:?} of missed time",
                self.accumulator - self.period
            );
        }
        self.accumulator = Duration::ZERO;

        self.callbacks
            .retain_mut(|(_, callback)| callback() == ClockControl::Keep);
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{cell::Cell, rc::Rc};

    fn counter() -> (Rc<Cell<u32>>, Callback) {
        let count = Rc::new(Cell::new(0));
        let inner = Rc::clone(&count);
        let callback = Box::new(move || {
            inner.set(inner.get() + 1);
            ClockControl::Keep
        });
        (count, callback)
    }

    #[test]
    fn test_hz_period() {
        let period: Duration = Hz(60).into();
        assert_eq!(period.as_millis(), 16);

        let period: Duration = Hz(1000).into();
        assert_eq!(period.as_millis(), 1);
    }

    #[test]
    fn test_fires_once_per_period() {
        let mut clock = Clock::new(Hz(60));
        let (count, callback) = counter();
        clock.register(callback);

        assert!(clock.advance(Hz(60).into()));
        assert_eq!(count.get(), 1);

        // The accumulator was reset; a partial period fires nothing.
        assert!(!clock.advance(Duration::from_millis(1)));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_partial_period_fires_nothing() {
        let mut clock = Clock::new(Hz(60));
        let (count, callback) = counter();
        clock.register(callback);

        assert!(!clock.advance(Duration::from_millis(10)));
        assert_eq!(count.get(), 0);

        // Partial periods accumulate until a full one has passed.
        assert!(clock.advance(Duration::from_millis(10)));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_missed_time_is_dropped() {
        let mut clock = Clock::new(Hz(60));
        let (count, callback) = counter();
        clock.register(callback);

        // Five periods elapse in one wake-up; only one tick fires.
        clock.advance(Duration::from_millis(5 * 17));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_first_tick_assumes_one_period() {
        let mut clock = Clock::new(Hz(60));
        let (count, callback) = counter();
        clock.register(callback);

        clock.tick(Instant::now());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_unregister_by_handle() {
        let mut clock = Clock::new(Hz(60));
        let (first, callback) = counter();
        let handle = clock.register(callback);
        let (second, callback) = counter();
        clock.register(callback);

        clock.unregister(handle);
        assert_eq!(clock.callback_count(), 1);

        clock.advance(Hz(60).into());
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn test_callback_self_removal() {
        let mut clock = Clock::new(Hz(60));
        clock.register(Box::new(|| ClockControl::Unregister));

        clock.advance(Hz(60).into());
        assert!(clock.is_idle());
    }

    #[test]
    fn test_tick_reports_idle() {
        let mut clock = Clock::new(Hz(60));
        assert!(!clock.tick(Instant::now()));

        let (_, callback) = counter();
        clock.register(callback);
        assert!(clock.tick(Instant::now()));
    }
}
