//! Hexadecimal keypad input.
use std::cell::Cell;

/// Key-state observer used by the skip-if-pressed instructions.
///
/// The interpreter only ever asks one question: which key, if any, is
/// down right now. How the host feeds key events in is its own business,
/// which keeps the core testable without any host environment.
pub trait KeyInput {
    /// The currently pressed key as a nibble value, or `None`.
    fn pressed_key(&self) -> Option<u8>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KeyCode {
    Key0 = 0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF = 0xF,
}

impl KeyCode {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for KeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let key_id = self.as_u8();
        write!(f, "k{key_id:x}")
    }
}

impl From<KeyCode> for u8 {
    fn from(keycode: KeyCode) -> Self {
        keycode.as_u8()
    }
}

impl TryFrom<u8> for KeyCode {
    type Error = InvalidKeyCode;

    fn try_from(key_id: u8) -> Result<Self, Self::Error> {
        match key_id {
            0 => Ok(Self::Key0),
            1 => Ok(Self::Key1),
            2 => Ok(Self::Key2),
            3 => Ok(Self::Key3),
            4 => Ok(Self::Key4),
            5 => Ok(Self::Key5),
            6 => Ok(Self::Key6),
            7 => Ok(Self::Key7),
            8 => Ok(Self::Key8),
            9 => Ok(Self::Key9),
            10 => Ok(Self::KeyA),
            11 => Ok(Self::KeyB),
            12 => Ok(Self::KeyC),
            13 => Ok(Self::KeyD),
            14 => Ok(Self::KeyE),
            15 => Ok(Self::KeyF),
            _ => Err(InvalidKeyCode),
        }
    }
}

#[derive(Debug)]
pub struct InvalidKeyCode;

impl std::error::Error for InvalidKeyCode {}

impl std::fmt::Display for InvalidKeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "keycode must be in range 0 <= keycode < 16")
    }
}

/// Maps a host keyboard character to the hexadecimal keypad.
///
/// The original 4x4 layout is mapped to the left alphanumeric columns:
/// ```text
/// |1|2|3|C|      |1|2|3|4|
/// |4|5|6|D|  ->  |Q|W|E|R|
/// |7|8|9|E|  ->  |A|S|D|F|
/// |A|0|B|F|      |Z|X|C|V|
/// ```
pub fn keymap(key: char) -> Option<KeyCode> {
    use KeyCode::*;

    match key.to_ascii_lowercase() {
        'x' => Some(Key0),
        '1' => Some(Key1),
        '2' => Some(Key2),
        '3' => Some(Key3),
        'q' => Some(Key4),
        'w' => Some(Key5),
        'e' => Some(Key6),
        'a' => Some(Key7),
        's' => Some(Key8),
        'd' => Some(Key9),
        'z' => Some(KeyA),
        'c' => Some(KeyB),
        '4' => Some(KeyC),
        'r' => Some(KeyD),
        'f' => Some(KeyE),
        'v' => Some(KeyF),
        _ => None,
    }
}

/// Single-pressed-key keypad state, fed by host key up/down events.
///
/// Only one key is tracked at a time; a release clears the state only
/// when it matches the held key, so interleaved press/release pairs of
/// different keys behave like the last press wins.
#[derive(Default)]
pub struct Keypad {
    pressed: Cell<Option<u8>>,
}

impl Keypad {
    pub fn new() -> Self {
        Keypad::default()
    }

    pub fn press(&self, key: KeyCode) {
        self.pressed.set(Some(key.as_u8()));
    }

    pub fn release(&self, key: KeyCode) {
        if self.pressed.get() == Some(key.as_u8()) {
            self.pressed.set(None);
        }
    }
}

impl KeyInput for Keypad {
    fn pressed_key(&self) -> Option<u8> {
        self.pressed.get()
    }
}
