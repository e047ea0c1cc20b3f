//! Cooperative wiring of the clocks, timers and interpreter.
use std::{
    cell::RefCell,
    fmt,
    rc::Rc,
    thread,
    time::{Duration, Instant},
};

use crate::{
    clock::{Clock, ClockControl, Hz},
    constants::*,
    error::{OktoError, OktoResult},
    interp::Interpreter,
    keypad::{KeyCode, KeyInput, Keypad},
    rom,
    screen::{Present, Screen},
    timer::{Alert, Timer},
};

/// Machine configuration parameters.
#[derive(Default, Clone)]
pub struct MachineConf {
    /// Rate of the fetch-decode-execute cycle. Defaults to 1 kHz.
    pub cpu_frequency: Option<Hz>,
}

/// Optional host collaborators injected into the machine.
#[derive(Default)]
pub struct Devices {
    /// Output surface for the pixel grid.
    pub presenter: Option<Rc<dyn Present>>,
    /// Sound/visual alert gated by the sound timer.
    pub alert: Option<Rc<dyn Alert>>,
}

/// A complete CHIP-8 machine.
///
/// Two clocks run cooperatively on one thread: the CPU clock paces the
/// interpreter at the configured frequency, and a fixed 60 Hz clock
/// drives the delay and sound timers. All shared state lives behind
/// `Rc`; nothing here is thread-safe, and nothing needs to be.
pub struct Machine {
    cpu_clock: Rc<RefCell<Clock>>,
    timer_clock: Rc<RefCell<Clock>>,
    interp: Rc<RefCell<Interpreter>>,
    keypad: Rc<Keypad>,
    /// First fatal fault, if any. Set once; the CPU callback has
    /// unregistered itself by the time this is readable.
    halt: Rc<RefCell<Option<OktoError>>>,
}

impl Machine {
    pub fn new(conf: MachineConf) -> Self {
        Machine::with_devices(conf, Devices::default())
    }

    pub fn with_devices(conf: MachineConf, devices: Devices) -> Self {
        let cpu_clock = Rc::new(RefCell::new(Clock::new(
            conf.cpu_frequency.unwrap_or(Hz(CPU_FREQUENCY)),
        )));
        let timer_clock = Rc::new(RefCell::new(Clock::new(Hz(TIMER_FREQUENCY))));

        let screen = match devices.presenter {
            Some(presenter) => Screen::with_presenter(presenter),
            None => Screen::new(),
        };
        let keypad = Rc::new(Keypad::new());

        let delay = Timer::new(Rc::clone(&timer_clock));
        let sound = match devices.alert {
            Some(alert) => Timer::with_alert(Rc::clone(&timer_clock), alert),
            None => Timer::new(Rc::clone(&timer_clock)),
        };

        let interp = Rc::new(RefCell::new(Interpreter::new(
            screen,
            Rc::clone(&keypad) as Rc<dyn KeyInput>,
            delay,
            sound,
        )));
        let halt = Rc::new(RefCell::new(None));

        // The step callback is the machine's error boundary: a fatal
        // fault is logged, recorded for the caller, and stops the
        // fetch-execute cadence by unregistering. The timers and the
        // display buffer are left exactly as the last completed
        // instruction left them.
        {
            let interp = Rc::clone(&interp);
            let halt = Rc::clone(&halt);
            cpu_clock.borrow_mut().register(Box::new(move || {
                match interp.borrow_mut().step() {
                    Ok(()) => ClockControl::Keep,
                    Err(err) => {
                        log::error!("machine halted: {err}");
                        *halt.borrow_mut() = Some(err);
                        ClockControl::Unregister
                    }
                }
            }));
        }

        Machine {
            cpu_clock,
            timer_clock,
            interp,
            keypad,
            halt,
        }
    }

    /// Loads a raw ROM at the default program start address.
    pub fn load_rom(&self, bytes: &[u8]) -> OktoResult<()> {
        self.interp.borrow_mut().load(bytes)
    }

    /// Loads a raw ROM at `offset`.
    pub fn load_rom_at(&self, bytes: &[u8], offset: usize) -> OktoResult<()> {
        self.interp.borrow_mut().load_at(bytes, offset)
    }

    /// Decodes a base64-encoded ROM and loads it at the program start.
    pub fn load_rom_base64(&self, encoded: &str) -> OktoResult<()> {
        let bytes = rom::decode_base64(encoded)?;
        self.load_rom(&bytes)
    }

    /// Drives both clocks from wall-clock time. Returns whether any
    /// callback is still scheduled.
    pub fn tick(&self, now: Instant) -> bool {
        let cpu_live = self.cpu_clock.borrow_mut().tick(now);
        let timers_live = self.timer_clock.borrow_mut().tick(now);
        cpu_live || timers_live
    }

    /// Drives both clocks with simulated elapsed time.
    pub fn advance(&self, elapsed: Duration) -> bool {
        self.cpu_clock.borrow_mut().advance(elapsed);
        self.timer_clock.borrow_mut().advance(elapsed);
        !self.cpu_clock.borrow().is_idle() || !self.timer_clock.borrow().is_idle()
    }

    /// Runs the machine for at most `duration` of wall-clock time,
    /// returning early once nothing is scheduled anymore.
    pub fn run_for(&self, duration: Duration) {
        let deadline = Instant::now() + duration;

        while Instant::now() < deadline {
            if !self.tick(Instant::now()) {
                break;
            }
            // Sleep does not have enough resolution for a kilohertz
            // clock; yielding in a loop is the usable alternative.
            thread::yield_now();
        }
    }

    pub fn press(&self, key: KeyCode) {
        self.keypad.press(key);
    }

    pub fn release(&self, key: KeyCode) {
        self.keypad.release(key);
    }

    /// The fault that stopped the machine, if it has stopped.
    pub fn halt_reason(&self) -> Option<OktoError> {
        self.halt.borrow().clone()
    }

    /// Whether the fetch-execute cycle is still scheduled.
    pub fn is_running(&self) -> bool {
        !self.cpu_clock.borrow().is_idle()
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.interp.borrow().screen().pixel(x, y)
    }

    /// Returns the display contents as a human readable string.
    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        self.interp.borrow().screen().dump()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cpu_period() -> Duration {
        Hz(CPU_FREQUENCY).into()
    }

    #[test]
    fn test_steps_at_cpu_rate() {
        let machine = Machine::new(MachineConf::default());
        machine.load_rom(&[0x6A, 0x3C]).unwrap();

        machine.advance(cpu_period());
        assert_eq!(machine.interp.borrow().registers()[0xA], 0x3C);
    }

    #[test]
    fn test_halts_on_fatal_opcode() {
        let machine = Machine::new(MachineConf::default());
        machine.load_rom(&[0xFF, 0xFF]).unwrap();

        assert!(machine.is_running());
        machine.advance(cpu_period());

        assert!(!machine.is_running());
        assert_eq!(machine.halt_reason(), Some(OktoError::UnknownOpcode(0xFFFF)));

        // Halted machines stay halted.
        machine.advance(cpu_period());
        assert!(!machine.is_running());
    }

    #[test]
    fn test_display_survives_halt() {
        let machine = Machine::new(MachineConf::default());
        // LD I, font; DRW V0, V1, 5; then an unknown opcode.
        machine
            .load_rom(&[0xA0, 0x50, 0xD0, 0x15, 0xFF, 0xFF])
            .unwrap();

        for _ in 0..3 {
            machine.advance(cpu_period());
        }

        assert!(machine.halt_reason().is_some());
        assert!(machine.pixel(0, 0));
    }

    #[test]
    fn test_timers_run_independently_of_cpu() {
        let machine = Machine::new(MachineConf {
            cpu_frequency: Some(Hz(1000)),
        });
        // LD V0, 2; LD DT, V0; then spin: JP 0x204.
        machine
            .load_rom(&[0x60, 0x02, 0xF0, 0x15, 0x12, 0x04])
            .unwrap();

        machine.advance(cpu_period());
        machine.advance(cpu_period());
        assert_eq!(machine.interp.borrow().delay_timer().get(), 2);

        // One 60 Hz period passes while the CPU spins.
        machine.advance(Hz(TIMER_FREQUENCY).into());
        assert_eq!(machine.interp.borrow().delay_timer().get(), 1);
    }

    #[test]
    fn test_load_base64_rom() {
        let machine = Machine::new(MachineConf::default());
        // 0x6A3C encoded.
        machine.load_rom_base64("ajw=").unwrap();

        machine.advance(cpu_period());
        assert_eq!(machine.interp.borrow().registers()[0xA], 0x3C);
    }
}
