//! 64x32 monochrome display buffer.
use std::fmt::{self, Write};
use std::rc::Rc;

use crate::constants::*;

/// Presentation collaborator.
///
/// Receives the logical pixel grid after every draw. Scaling, colour
/// mapping and the output surface are entirely its concern; the core
/// contract is only the on/off bit grid.
pub trait Present {
    fn present(&self, pixels: &[bool; DISPLAY_BUFFER_SIZE]);
}

/// The display buffer.
///
/// Sprites are blitted by XOR only; there is no direct "set" operation.
/// Coordinates wrap around both axes, per pixel. Both dimensions are
/// powers of two, so wrapping is a mask.
pub struct Screen {
    pixels: Box<[bool; DISPLAY_BUFFER_SIZE]>,
    presenter: Option<Rc<dyn Present>>,
}

impl Screen {
    pub fn new() -> Self {
        Screen {
            pixels: Box::new([false; DISPLAY_BUFFER_SIZE]),
            presenter: None,
        }
    }

    pub fn with_presenter(presenter: Rc<dyn Present>) -> Self {
        Screen {
            presenter: Some(presenter),
            ..Screen::new()
        }
    }

    /// Sets every pixel to off. Always succeeds.
    pub fn clear(&mut self) {
        self.pixels.fill(false);
        if let Some(presenter) = &self.presenter {
            presenter.present(&self.pixels);
        }
    }

    /// XOR-blits a sprite at `(x, y)` and reports collisions.
    ///
    /// Each byte of `sprite` is one row of 8 pixels, bit 7 leftmost.
    /// Returns true if any target pixel was lit and its sprite bit was
    /// set (tested before the XOR turns it off). The flag is the sole
    /// channel back to the interpreter for the DRW instruction's VF
    /// convention.
    pub fn draw(&mut self, sprite: &[u8], x: usize, y: usize) -> bool {
        let mut collision = false;

        for (r, row) in sprite.iter().enumerate() {
            for c in 0..8 {
                let px = (x + c) & DISPLAY_WIDTH_MASK;
                let py = (y + r) & DISPLAY_HEIGHT_MASK;
                let d = px + py * DISPLAY_WIDTH;

                let sprite_bit = (row >> (7 - c)) & 1 != 0;
                collision |= self.pixels[d] && sprite_bit;
                self.pixels[d] ^= sprite_bit;
            }
        }

        if let Some(presenter) = &self.presenter {
            presenter.present(&self.pixels);
        }

        collision
    }

    /// Pixel state at `(x, y)`, with wraparound addressing.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[(x & DISPLAY_WIDTH_MASK) + (y & DISPLAY_HEIGHT_MASK) * DISPLAY_WIDTH]
    }

    pub fn buffer(&self) -> &[bool; DISPLAY_BUFFER_SIZE] {
        &self.pixels
    }

    /// Returns the contents of the buffer as a human readable string.
    pub fn dump(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                if self.pixels[x + y * DISPLAY_WIDTH] {
                    write!(buf, "#")?;
                } else {
                    write!(buf, ".")?;
                }
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }
}

impl Default for Screen {
    fn default() -> Self {
        Screen::new()
    }
}
