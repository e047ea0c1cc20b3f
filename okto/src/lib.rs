//! A CHIP-8 virtual machine.
//!
//! The core of the crate is the [`interp::Interpreter`] fetch-decode-execute
//! cycle, the [`screen::Screen`] XOR-sprite display buffer, and the
//! [`clock::Clock`] scheduler that paces both the CPU and the 60 Hz
//! countdown timers. Host concerns (windowing, audio, key events) stay
//! outside, reaching the core only through the injected collaborator
//! traits.
mod clock;
pub mod constants;
mod error;
mod interp;
mod keypad;
mod machine;
pub mod rom;
mod screen;
mod timer;

pub use self::clock::Hz;

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        clock::{CallbackHandle, Clock, ClockControl, Hz},
        error::{OktoError, OktoResult},
        interp::{decode, Decoded, Interpreter},
        keypad::{keymap, KeyCode, KeyInput, Keypad},
        machine::{Devices, Machine, MachineConf},
        screen::{Present, Screen},
        timer::{Alert, Timer},
    };
}
