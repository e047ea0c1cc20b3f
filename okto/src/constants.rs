//! Constant values of the CHIP-8 architecture.

/// Number of general purpose registers.
pub const REGISTER_COUNT: usize = 0x10; // 16

/// Size of the addressable memory space in bytes.
pub const MEM_SIZE: usize = 0x1000; // 4096

/// Default load address for programs.
///
/// The lower memory space was historically used for the interpreter
/// itself, and now holds only the builtin font.
pub const PROGRAM_START: u16 = 0x200; // 512

/// Start of the builtin font sprites.
pub const FONT_START: u16 = 0x050;

/// Height in bytes of a single font glyph.
pub const FONT_HEIGHT: u16 = 5;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;
pub const DISPLAY_BUFFER_SIZE: usize = DISPLAY_WIDTH * DISPLAY_HEIGHT;
pub const DISPLAY_WIDTH_MASK: usize = DISPLAY_WIDTH - 1;
pub const DISPLAY_HEIGHT_MASK: usize = DISPLAY_HEIGHT - 1;

/// Rate at which the delay and sound timers count down.
pub const TIMER_FREQUENCY: u64 = 60;

/// Default rate of the fetch-decode-execute cycle.
pub const CPU_FREQUENCY: u64 = 1000;

/// Number of keys on the keypad (0x0-0xF).
pub const KEY_COUNT: u8 = 16;

/// Number of nanoseconds in a second.
#[doc(hidden)]
pub const NANOS_IN_SECOND: u64 = 1_000_000_000;

/// Type for storing the 12-bit memory addresses.
pub type Address = u16;

/// The builtin font sprites: 16 glyphs for the hex digits 0-F,
/// 5 bytes each, packed together without padding.
#[rustfmt::skip]
pub const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
