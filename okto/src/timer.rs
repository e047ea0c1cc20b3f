//! Countdown timers driven by the 60 Hz clock.
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::clock::{Clock, ClockControl};

/// Audio/visual collaborator toggled at a timer's idle/active edges.
///
/// The sound timer starts the alert when it leaves idle and stops it
/// when the countdown reaches zero. What "alert" means (a square-wave
/// tone, a flashing border) is the host's concern.
pub trait Alert {
    fn start_alert(&self);
    fn stop_alert(&self);
}

/// An 8-bit value that counts down once per clock tick while non-zero.
///
/// The timer owns its clock registration: leaving idle registers the
/// decrement callback, reaching zero removes it again. An idle timer
/// costs the clock nothing.
///
/// The alert side effects are composed in rather than subclassed on;
/// a timer without an alert is the delay timer, a timer with one is
/// the sound timer.
pub struct Timer {
    clock: Rc<RefCell<Clock>>,
    value: Rc<Cell<u8>>,
    /// Whether the decrement callback is currently registered. Shared
    /// with the callback so self-removal is observable here.
    registered: Rc<Cell<bool>>,
    alert: Option<Rc<dyn Alert>>,
}

impl Timer {
    pub fn new(clock: Rc<RefCell<Clock>>) -> Self {
        Timer {
            clock,
            value: Rc::new(Cell::new(0)),
            registered: Rc::new(Cell::new(false)),
            alert: None,
        }
    }

    pub fn with_alert(clock: Rc<RefCell<Clock>>, alert: Rc<dyn Alert>) -> Self {
        Timer {
            alert: Some(alert),
            ..Timer::new(clock)
        }
    }

    /// Current countdown value. No side effects.
    pub fn get(&self) -> u8 {
        self.value.get()
    }

    /// Assigns a new countdown value.
    ///
    /// On the idle-to-active edge the decrement callback is registered
    /// with the clock and the alert (if any) is started. Setting zero on
    /// an idle timer registers nothing.
    pub fn set(&self, value: u8) {
        if self.value.get() == 0 && value > 0 {
            if let Some(alert) = &self.alert {
                alert.start_alert();
            }
            if !self.registered.get() {
                self.registered.set(true);
                self.clock.borrow_mut().register(self.decrement());
            }
        }
        self.value.set(value);
    }

    /// Builds the per-tick decrement callback.
    fn decrement(&self) -> Box<dyn FnMut() -> ClockControl> {
        let value = Rc::clone(&self.value);
        let registered = Rc::clone(&self.registered);
        let alert = self.alert.clone();

        Box::new(move || {
            let t = value.get().saturating_sub(1);
            value.set(t);

            if t == 0 {
                if let Some(alert) = &alert {
                    alert.stop_alert();
                }
                registered.set(false);
                ClockControl::Unregister
            } else {
                ClockControl::Keep
            }
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clock::Hz;
    use std::time::Duration;

    fn sixty_hz() -> Rc<RefCell<Clock>> {
        Rc::new(RefCell::new(Clock::new(Hz(60))))
    }

    fn one_period() -> Duration {
        Hz(60).into()
    }

    #[test]
    fn test_set_from_idle_registers() {
        let clock = sixty_hz();
        let timer = Timer::new(Rc::clone(&clock));
        assert!(clock.borrow().is_idle());

        timer.set(5);
        assert_eq!(clock.borrow().callback_count(), 1);
    }

    #[test]
    fn test_set_zero_while_idle_registers_nothing() {
        let clock = sixty_hz();
        let timer = Timer::new(Rc::clone(&clock));

        timer.set(0);
        assert!(clock.borrow().is_idle());
    }

    #[test]
    fn test_counts_down_to_zero_and_unregisters() {
        let clock = sixty_hz();
        let timer = Timer::new(Rc::clone(&clock));

        timer.set(5);
        for expected in (0..5).rev() {
            clock.borrow_mut().advance(one_period());
            assert_eq!(timer.get(), expected);
        }
        assert!(clock.borrow().is_idle());

        // Further ticks change nothing.
        clock.borrow_mut().advance(one_period());
        assert_eq!(timer.get(), 0);
    }

    #[test]
    fn test_set_while_active_does_not_register_twice() {
        let clock = sixty_hz();
        let timer = Timer::new(Rc::clone(&clock));

        timer.set(2);
        clock.borrow_mut().advance(one_period());
        timer.set(0);
        timer.set(5);
        assert_eq!(clock.borrow().callback_count(), 1);

        clock.borrow_mut().advance(one_period());
        assert_eq!(timer.get(), 4);
    }

    #[derive(Default)]
    struct AlertSpy {
        started: Cell<u32>,
        stopped: Cell<u32>,
    }

    impl Alert for AlertSpy {
        fn start_alert(&self) {
            self.started.set(self.started.get() + 1);
        }

        fn stop_alert(&self) {
            self.stopped.set(self.stopped.get() + 1);
        }
    }

    #[test]
    fn test_alert_fires_on_edges() {
        let clock = sixty_hz();
        let spy = Rc::new(AlertSpy::default());
        let timer = Timer::with_alert(Rc::clone(&clock), Rc::clone(&spy) as Rc<dyn Alert>);

        timer.set(2);
        assert_eq!(spy.started.get(), 1);
        assert_eq!(spy.stopped.get(), 0);

        // Replacing the value while active is not a new edge.
        timer.set(3);
        assert_eq!(spy.started.get(), 1);

        clock.borrow_mut().advance(one_period());
        clock.borrow_mut().advance(one_period());
        assert_eq!(spy.stopped.get(), 0);

        clock.borrow_mut().advance(one_period());
        assert_eq!(timer.get(), 0);
        assert_eq!(spy.stopped.get(), 1);
        assert!(clock.borrow().is_idle());
    }
}
