//! Result and errors.
use std::fmt::{self, Display, Formatter};

pub type OktoResult<T> = std::result::Result<T, OktoError>;

/// Fatal machine faults.
///
/// None of these are transient: a fault means the program is malformed
/// or ran off the rails, and the fetch-execute cycle must stop. No
/// instruction is partially applied before a fault is raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OktoError {
    /// Opcode or sub-opcode with no entry in the instruction table.
    UnknownOpcode(u16),
    /// RET executed with no return address on the call stack.
    StackUnderflow { opcode: u16 },
    /// Program counter left addressable memory during fetch.
    PcOutOfBounds(u16),
    /// Indexed memory access outside the 4096-byte address space.
    AddressOutOfBounds { opcode: u16, addr: u16 },
    /// Attempt to load a ROM that can't fit in memory from the load offset.
    RomTooLarge { len: usize, offset: usize },
    /// Malformed ROM encoding.
    Rom(String),
}

impl Display for OktoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOpcode(opcode) => {
                write!(f, "unknown opcode {opcode:04X}")
            }
            Self::StackUnderflow { opcode } => {
                write!(f, "opcode {opcode:04X}: return with empty call stack")
            }
            Self::PcOutOfBounds(pc) => {
                write!(f, "program counter {pc:04X} outside addressable memory")
            }
            Self::AddressOutOfBounds { opcode, addr } => {
                write!(f, "opcode {opcode:04X}: address {addr:04X} outside addressable memory")
            }
            Self::RomTooLarge { len, offset } => {
                write!(f, "ROM of {len} bytes does not fit in memory at offset {offset:#05X}")
            }
            Self::Rom(msg) => write!(f, "malformed ROM: {msg}"),
        }
    }
}

impl std::error::Error for OktoError {}
