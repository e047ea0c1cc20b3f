//! Fetch-decode-execute interpreter.
use std::rc::Rc;

use rand::prelude::*;

use crate::{
    constants::*,
    error::{OktoError, OktoResult},
    keypad::KeyInput,
    screen::Screen,
    timer::Timer,
};

#[cfg(feature = "op_trace")]
macro_rules! op_trace {
    ($mnemonic:expr, $interp:expr) => {
        println!("{:04X}: {}", $interp.pc.wrapping_sub(2), $mnemonic)
    };
}

#[cfg(not(feature = "op_trace"))]
macro_rules! op_trace {
    ($mnemonic:expr, $interp:expr) => {};
}

/// Operand fields extracted from a 16-bit opcode.
///
/// Extraction is total: every 16-bit value decodes to something, and
/// whether the combination names an instruction is decided at execute
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    /// The opcode as fetched.
    pub opcode: u16,
    /// Instruction nibble, bits 15-12.
    pub code: u8,
    /// Register index X, bits 11-8.
    pub x: u8,
    /// Register index Y, bits 7-4.
    pub y: u8,
    /// Immediate nibble, bits 3-0.
    pub n: u8,
    /// Immediate byte, bits 7-0.
    pub nn: u8,
    /// Immediate address, bits 11-0.
    pub nnn: u16,
}

/// Extracts the fixed operand fields of an opcode. Pure; no side effects.
pub fn decode(opcode: u16) -> Decoded {
    Decoded {
        opcode,
        code: (opcode >> 12) as u8,
        x: ((opcode >> 8) & 0xF) as u8,
        y: ((opcode >> 4) & 0xF) as u8,
        n: (opcode & 0xF) as u8,
        nn: (opcode & 0xFF) as u8,
        nnn: opcode & 0xFFF,
    }
}

/// The CHIP-8 machine state and its instruction cycle.
///
/// One call to [`step`](Interpreter::step) performs exactly one
/// fetch-decode-execute cycle; repetition is the clock's job. The
/// display, timers and key input are injected so the interpreter can
/// run without any host environment.
pub struct Interpreter {
    ram: Box<[u8; MEM_SIZE]>,
    registers: [u8; REGISTER_COUNT],
    /// Index register I, used for memory addressing.
    address: Address,
    pc: u16,
    /// Return addresses, pushed by CALL and popped by RET.
    stack: Vec<u16>,
    screen: Screen,
    delay: Timer,
    sound: Timer,
    keypad: Rc<dyn KeyInput>,
}

impl Interpreter {
    pub fn new(screen: Screen, keypad: Rc<dyn KeyInput>, delay: Timer, sound: Timer) -> Self {
        let mut ram = Box::new([0u8; MEM_SIZE]);
        let font_start = FONT_START as usize;
        ram[font_start..font_start + FONT.len()].copy_from_slice(&FONT);

        Interpreter {
            ram,
            registers: [0; REGISTER_COUNT],
            address: 0,
            pc: PROGRAM_START,
            stack: Vec::new(),
            screen,
            delay,
            sound,
            keypad,
        }
    }

    /// Copies a ROM into memory at the default program start address.
    pub fn load(&mut self, rom: &[u8]) -> OktoResult<()> {
        self.load_at(rom, PROGRAM_START as usize)
    }

    /// Copies a ROM into memory at `offset`.
    ///
    /// A ROM that does not fit is rejected before any byte is written.
    pub fn load_at(&mut self, rom: &[u8], offset: usize) -> OktoResult<()> {
        if offset + rom.len() > MEM_SIZE {
            return Err(OktoError::RomTooLarge {
                len: rom.len(),
                offset,
            });
        }
        self.ram[offset..offset + rom.len()].copy_from_slice(rom);
        Ok(())
    }

    /// Runs one fetch-decode-execute cycle.
    pub fn step(&mut self) -> OktoResult<()> {
        let opcode = self.fetch()?;
        self.execute(decode(opcode))
    }

    /// Reads the two bytes at PC big-endian and advances PC by 2.
    fn fetch(&mut self) -> OktoResult<u16> {
        let pc = self.pc as usize;
        if pc + 1 >= MEM_SIZE {
            return Err(OktoError::PcOutOfBounds(self.pc));
        }

        let opcode = (self.ram[pc] as u16) << 8 | self.ram[pc + 1] as u16;
        self.pc += 2;
        Ok(opcode)
    }

    /// Dispatches on the instruction nibble, then on the secondary
    /// fields for the 0x0, 0x8, 0xE and 0xF families.
    fn execute(&mut self, instr: Decoded) -> OktoResult<()> {
        let Decoded {
            opcode,
            code,
            x,
            y,
            n,
            nn,
            nnn,
        } = instr;
        let vx = self.registers[x as usize];
        let vy = self.registers[y as usize];

        match code {
            0x0 => match opcode {
                // 00E0 (CLS)
                //
                // Clear the display.
                0x00E0 => {
                    op_trace!("CLS", self);
                    self.screen.clear();
                }
                // 00EE (RET)
                //
                // Return from a subroutine: pop the return address into PC.
                0x00EE => {
                    op_trace!("RET", self);
                    match self.stack.pop() {
                        Some(addr) => self.pc = addr,
                        None => return Err(OktoError::StackUnderflow { opcode }),
                    }
                }
                // Machine routines other than CLS/RET are not supported.
                _ => return Err(OktoError::UnknownOpcode(opcode)),
            },
            // 1NNN (JP addr)
            0x1 => {
                op_trace!("JP", self);
                self.pc = nnn;
            }
            // 2NNN (CALL addr)
            //
            // Push the address of the next instruction, jump to NNN.
            0x2 => {
                op_trace!("CALL", self);
                self.stack.push(self.pc);
                self.pc = nnn;
            }
            // 3XNN (SE Vx, byte)
            0x3 => {
                op_trace!("SE", self);
                if vx == nn {
                    self.pc += 2;
                }
            }
            // 4XNN (SNE Vx, byte)
            0x4 => {
                op_trace!("SNE", self);
                if vx != nn {
                    self.pc += 2;
                }
            }
            // 5XY0 (SE Vx, Vy)
            0x5 => {
                op_trace!("SE", self);
                if vx == vy {
                    self.pc += 2;
                }
            }
            // 6XNN (LD Vx, byte)
            0x6 => {
                op_trace!("LD", self);
                self.registers[x as usize] = nn;
            }
            // 7XNN (ADD Vx, byte)
            //
            // Carry flag is not touched.
            0x7 => {
                op_trace!("ADD", self);
                self.registers[x as usize] = vx.wrapping_add(nn);
            }
            0x8 => return self.exec_math(instr, vx, vy),
            // 9XY0 (SNE Vx, Vy)
            0x9 => {
                op_trace!("SNE", self);
                if vx != vy {
                    self.pc += 2;
                }
            }
            // ANNN (LD I, addr)
            0xA => {
                op_trace!("LD I", self);
                self.address = nnn;
            }
            // BNNN (JP V0, addr)
            0xB => {
                op_trace!("JP V0", self);
                self.pc = nnn + self.registers[0] as u16;
            }
            // CXNN (RND Vx, byte)
            //
            // Uniform random byte ANDed with the immediate mask.
            0xC => {
                op_trace!("RND", self);
                self.registers[x as usize] = thread_rng().gen::<u8>() & nn;
            }
            // DXYN (DRW Vx, Vy, nibble)
            //
            // XOR-blit the N-row sprite at memory[I] to (Vx, Vy).
            // VF reports whether any lit pixel was erased.
            0xD => {
                op_trace!("DRW", self);

                let start = self.address as usize;
                let end = start + n as usize;
                if end > MEM_SIZE {
                    return Err(OktoError::AddressOutOfBounds {
                        opcode,
                        addr: self.address,
                    });
                }

                let collision = self.screen.draw(&self.ram[start..end], vx as usize, vy as usize);
                self.registers[0xF] = collision as u8;
            }
            0xE => match nn {
                // EX9E (SKP Vx)
                0x9E => {
                    op_trace!("SKP", self);
                    if self.keypad.pressed_key() == Some(vx) {
                        self.pc += 2;
                    }
                }
                // EXA1 (SKNP Vx)
                //
                // Also skips when no key at all is pressed.
                0xA1 => {
                    op_trace!("SKNP", self);
                    if self.keypad.pressed_key() != Some(vx) {
                        self.pc += 2;
                    }
                }
                _ => return Err(OktoError::UnknownOpcode(opcode)),
            },
            0xF => return self.exec_misc(instr, vx),
            // The instruction nibble is 4 bits; all values are covered above.
            _ => return Err(OktoError::UnknownOpcode(opcode)),
        }

        Ok(())
    }

    /// The 8XYN register arithmetic family, sub-dispatched on N.
    fn exec_math(&mut self, instr: Decoded, vx: u8, vy: u8) -> OktoResult<()> {
        let Decoded { opcode, x, n, .. } = instr;

        match n {
            // 8XY0 (LD Vx, Vy)
            0x0 => {
                op_trace!("LD", self);
                self.registers[x as usize] = vy;
            }
            // 8XY1 (OR Vx, Vy)
            0x1 => {
                op_trace!("OR", self);
                self.registers[x as usize] = vx | vy;
            }
            // 8XY2 (AND Vx, Vy)
            0x2 => {
                op_trace!("AND", self);
                self.registers[x as usize] = vx & vy;
            }
            // 8XY3 (XOR Vx, Vy)
            0x3 => {
                op_trace!("XOR", self);
                self.registers[x as usize] = vx ^ vy;
            }
            // 8XY4 (ADD Vx, Vy)
            //
            // VF is set when the unclamped sum exceeds 255. The flag
            // write comes last so it wins when X is itself 0xF.
            0x4 => {
                op_trace!("ADD", self);
                let sum = vx as u16 + vy as u16;
                self.registers[x as usize] = vx.wrapping_add(vy);
                self.registers[0xF] = (sum > 0xFF) as u8;
            }
            // 8XY5 (SUB Vx, Vy)
            //
            // VF is set when the difference is strictly positive; equal
            // operands leave VF at 0. This preserves the historical
            // behaviour of this machine even though most references
            // document VF=1 for "no borrow" including equality.
            0x5 => {
                op_trace!("SUB", self);
                let diff = vx as i16 - vy as i16;
                self.registers[x as usize] = vx.wrapping_sub(vy);
                self.registers[0xF] = (diff > 0) as u8;
            }
            // 8XY6 (SHR Vx, Vy)
            //
            // Shift VY right into VX; VF takes the shifted-out bit.
            0x6 => {
                op_trace!("SHR", self);
                let bit = vy & 1;
                self.registers[x as usize] = vy >> 1;
                self.registers[0xF] = bit;
            }
            // 8XY7 (SUBN Vx, Vy)
            //
            // Vy - Vx, same strict-positive flag convention as SUB.
            0x7 => {
                op_trace!("SUBN", self);
                let diff = vy as i16 - vx as i16;
                self.registers[x as usize] = vy.wrapping_sub(vx);
                self.registers[0xF] = (diff > 0) as u8;
            }
            // 8XYE (SHL Vx, Vy)
            //
            // Shift VY left into VX; VF takes the shifted-out bit.
            0xE => {
                op_trace!("SHL", self);
                let bit = vy >> 7;
                self.registers[x as usize] = vy << 1;
                self.registers[0xF] = bit;
            }
            _ => return Err(OktoError::UnknownOpcode(opcode)),
        }

        Ok(())
    }

    /// The FXNN family, sub-dispatched on NN.
    fn exec_misc(&mut self, instr: Decoded, vx: u8) -> OktoResult<()> {
        let Decoded { opcode, x, .. } = instr;

        match instr.nn {
            // FX07 (LD Vx, DT)
            0x07 => {
                op_trace!("LD DT", self);
                self.registers[x as usize] = self.delay.get();
            }
            // FX0A (LD Vx, K)
            //
            // Wait for a keypress. The PC rewinds over this instruction
            // until a key is down, stalling the machine without
            // blocking the thread.
            0x0A => {
                op_trace!("LD K", self);
                match self.keypad.pressed_key() {
                    Some(key) => self.registers[x as usize] = key,
                    None => self.pc -= 2,
                }
            }
            // FX15 (LD DT, Vx)
            0x15 => {
                op_trace!("LD DT", self);
                self.delay.set(vx);
            }
            // FX18 (LD ST, Vx)
            0x18 => {
                op_trace!("LD ST", self);
                self.sound.set(vx);
            }
            // FX1E (ADD I, Vx)
            0x1E => {
                op_trace!("ADD I", self);
                self.address = self.address.wrapping_add(vx as u16);
            }
            // FX29 (LD F, Vx)
            //
            // Point I at the font glyph for the digit in Vx.
            0x29 => {
                op_trace!("LD F", self);
                self.address = FONT_START + (vx & 0xF) as u16 * FONT_HEIGHT;
            }
            // FX33 (LD B, Vx)
            //
            // Binary-coded decimal of Vx into memory[I..I+3].
            #[rustfmt::skip]
            0x33 => {
                op_trace!("LD B", self);
                let addr = self.checked_span(opcode, 3)?;
                self.ram[addr + 2] = vx       % 10;
                self.ram[addr + 1] = vx / 10  % 10;
                self.ram[addr]     = vx / 100 % 10;
            }
            // FX55 (LD [I], Vx)
            //
            // Store V0..=Vx into memory starting at I. I is unchanged.
            0x55 => {
                op_trace!("LD [I]", self);
                let addr = self.checked_span(opcode, x as usize + 1)?;
                self.ram[addr..=addr + x as usize].copy_from_slice(&self.registers[..=x as usize]);
            }
            // FX65 (LD Vx, [I])
            //
            // Read V0..=Vx from memory starting at I. I is unchanged.
            0x65 => {
                op_trace!("LD [I]", self);
                let addr = self.checked_span(opcode, x as usize + 1)?;
                self.registers[..=x as usize].copy_from_slice(&self.ram[addr..=addr + x as usize]);
            }
            _ => return Err(OktoError::UnknownOpcode(opcode)),
        }

        Ok(())
    }

    /// Bounds-checks a `len`-byte access at the index register.
    fn checked_span(&self, opcode: u16, len: usize) -> OktoResult<usize> {
        let addr = self.address as usize;
        if addr + len > MEM_SIZE {
            Err(OktoError::AddressOutOfBounds {
                opcode,
                addr: self.address,
            })
        } else {
            Ok(addr)
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    /// The index register I.
    pub fn index(&self) -> u16 {
        self.address
    }

    pub fn delay_timer(&self) -> &Timer {
        &self.delay
    }

    pub fn sound_timer(&self) -> &Timer {
        &self.sound
    }
}
