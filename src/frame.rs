//! Transmit-ready frame: one 16-bit GPIO word per WS2812 bit-time.
//!
//! There is no RGB frame buffer. `set_pixel` writes straight into the words the
//! DMA will shift out, bit `row` of each word being that strip's lane:
//!
//! ```text
//! word  column*24 + 0 ..  7   green, MSB first
//! word  column*24 + 8 .. 15   red,   MSB first
//! word  column*24 + 16.. 23   blue,  MSB first
//! ```

use embedded_dma::ReadTarget;
use embedded_graphics::{
    pixelcolor::{Rgb888, RgbColor},
    prelude::{DrawTarget, OriginDimensions, Pixel, Size},
};
use smart_leds::RGB8;

use crate::{Error, Result};

/// Physical LED strips, one GPIO pin each.
pub const ROWS: usize = 7;
/// LEDs per strip.
pub const COLS: usize = 17;
pub const BITS_PER_PIXEL: usize = 24;
pub const FRAME_WORDS: usize = COLS * BITS_PER_PIXEL;
/// GPIO bits driven by the strips.
pub const LANE_MASK: u16 = ((1u32 << ROWS) - 1) as u16;

const _: () = assert!(ROWS <= u16::BITS as usize, "one lane per bit of a GPIO word");

const GREEN: usize = 0;
const RED: usize = 8;
const BLUE: usize = 16;

/// Strip index, `< ROWS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Row(u8);

impl Row {
    pub fn new(row: usize) -> Result<Self> {
        if row < ROWS {
            Ok(Row(row as u8))
        } else {
            Err(Error::OutOfRange)
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    fn lane(self) -> u16 {
        1 << self.0
    }

    pub fn all() -> impl Iterator<Item = Row> {
        (0..ROWS as u8).map(Row)
    }
}

impl TryFrom<i32> for Row {
    type Error = Error;

    fn try_from(row: i32) -> Result<Self> {
        usize::try_from(row)
            .map_err(|_| Error::OutOfRange)
            .and_then(Row::new)
    }
}

/// LED position along a strip, `< COLS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Column(u8);

impl Column {
    pub fn new(column: usize) -> Result<Self> {
        if column < COLS {
            Ok(Column(column as u8))
        } else {
            Err(Error::OutOfRange)
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    fn offset(self) -> usize {
        self.index() * BITS_PER_PIXEL
    }

    pub fn all() -> impl Iterator<Item = Column> {
        (0..COLS as u8).map(Column)
    }
}

impl TryFrom<i32> for Column {
    type Error = Error;

    fn try_from(column: i32) -> Result<Self> {
        usize::try_from(column)
            .map_err(|_| Error::OutOfRange)
            .and_then(Column::new)
    }
}

/// Pixel grid encoded for the parallel GPIO output.
#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct EncodedFrame([u16; FRAME_WORDS]);

impl EncodedFrame {
    pub const fn new() -> Self {
        EncodedFrame([0; FRAME_WORDS])
    }

    /// Writes the 24 lane bits of one pixel. Other lanes are left untouched.
    pub fn set_pixel(&mut self, row: Row, column: Column, color: RGB8) {
        let slot = &mut self.0[column.offset()..column.offset() + BITS_PER_PIXEL];
        for (base, byte) in [(GREEN, color.g), (RED, color.r), (BLUE, color.b)] {
            for i in 0..8 {
                let bit = ((byte >> (7 - i)) & 1) as u16;
                let word = &mut slot[base + i];
                *word = (*word & !row.lane()) | (bit << row.index());
            }
        }
    }

    /// Reads one pixel back out of its lane.
    pub fn pixel(&self, row: Row, column: Column) -> RGB8 {
        let slot = &self.0[column.offset()..column.offset() + BITS_PER_PIXEL];
        let byte = |base: usize| {
            slot[base..base + 8]
                .iter()
                .fold(0u8, |acc, w| (acc << 1) | ((w >> row.index()) & 1) as u8)
        };
        RGB8::new(byte(RED), byte(GREEN), byte(BLUE))
    }

    /// All pixels off.
    pub fn clear(&mut self) {
        // only lane bits are ever set, so zeroed words are all-black pixels
        self.0.iter_mut().for_each(|w| *w = 0);
    }

    /// Every pixel the same colour.
    pub fn fill(&mut self, color: RGB8) {
        for row in Row::all() {
            for column in Column::all() {
                self.set_pixel(row, column, color);
            }
        }
    }

    pub fn words(&self) -> &[u16] {
        &self.0
    }
}

impl Default for EncodedFrame {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: `EncodedFrame` is a transparent wrapper around `[u16; FRAME_WORDS]`.
unsafe impl ReadTarget for EncodedFrame {
    type Word = u16;
}

impl OriginDimensions for EncodedFrame {
    fn size(&self) -> Size {
        Size::new(COLS as u32, ROWS as u32)
    }
}

impl DrawTarget for EncodedFrame {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let (Ok(row), Ok(column)) = (Row::try_from(point.y), Column::try_from(point.x)) {
                self.set_pixel(row, column, RGB8::new(color.r(), color.g(), color.b()));
            }
        }
        Ok(())
    }
}
