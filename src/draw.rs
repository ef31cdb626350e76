//! Text, glyph and line helpers on top of [`EncodedFrame::set_pixel`].
//!
//! Coordinates are signed so glyphs can sit partly off the matrix while they
//! scroll or roll in; anything outside is skipped.

use bresenham::Bresenham;
use heapless::String;
use rgb::ComponentMap;
use smart_leds::RGB8;

use crate::font::{self, Glyph};
use crate::frame::{Column, EncodedFrame, Row, COLS};
use crate::{Error, Result};

/// Horizontal advance for text glyphs.
const LETTER_ADVANCE: i32 = 4;
/// Advance after `m` / `w`, which use all five columns.
const WIDE_ADVANCE: i32 = 6;

pub const SCROLL_FIRST_MS: u32 = 500;
pub const SCROLL_STEP_MS: u32 = 30;
pub const SCROLL_HOLD_MS: u32 = 500;
/// Longest text a [`Marquee`] holds.
pub const MARQUEE_CAPACITY: usize = 32;

/// Brightens or dims a base colour by the ambient light factor.
pub fn scale(color: RGB8, factor: u8) -> RGB8 {
    color.map(|c: u8| c.saturating_mul(factor))
}

fn put(frame: &mut EncodedFrame, x: i32, y: i32, color: RGB8) {
    if let (Ok(row), Ok(column)) = (Row::try_from(y), Column::try_from(x)) {
        frame.set_pixel(row, column, color);
    }
}

pub fn draw_glyph(frame: &mut EncodedFrame, glyph: Glyph, x: i32, y: i32, color: RGB8) {
    for (dx, dy) in glyph.pixels() {
        put(frame, x + dx as i32, y + dy as i32, color);
    }
}

pub fn draw_number(frame: &mut EncodedFrame, c: char, x: i32, y: i32, color: RGB8) {
    draw_glyph(frame, font::number(c), x, y, color)
}

pub fn draw_letter(frame: &mut EncodedFrame, c: char, x: i32, y: i32, color: RGB8) {
    draw_glyph(frame, font::letter(c), x, y, color)
}

fn is_wide(c: char) -> bool {
    matches!(c, 'm' | 'w')
}

/// Each character of `text` with its x offset from the start of the string.
///
/// A letter followed by `m`/`w` advances 4 columns, `m`/`w` themselves 6.
pub fn layout(text: &str) -> impl Iterator<Item = (char, i32)> + '_ {
    let mut chars = text.chars().peekable();
    let mut x = 0;
    core::iter::from_fn(move || {
        let c = chars.next()?;
        let at = x;
        x += match chars.peek() {
            Some(&next) if is_wide(next) => LETTER_ADVANCE,
            _ if is_wide(c) => WIDE_ADVANCE,
            _ => LETTER_ADVANCE,
        };
        Some((c, at))
    })
}

/// Draws `text` starting at (x, y) without clearing the frame.
pub fn draw_string(frame: &mut EncodedFrame, text: &str, x: i32, y: i32, color: RGB8) {
    for (c, dx) in layout(text) {
        draw_letter(frame, c, x + dx, y, color);
    }
}

/// Straight line between two cells, both ends included.
pub fn set_line(frame: &mut EncodedFrame, from: (i32, i32), to: (i32, i32), color: RGB8) {
    let (start, end) = (
        (from.0 as isize, from.1 as isize),
        (to.0 as isize, to.1 as isize),
    );
    for (x, y) in Bresenham::new(start, end).chain(core::iter::once(end)) {
        put(frame, x as i32, y as i32, color);
    }
}

/// Text that scrolls through the matrix one column per frame when it does not
/// fit, or is shown once when it does.
#[derive(Debug, Clone)]
pub struct Marquee {
    text: String<MARQUEE_CAPACITY>,
    x: i32,
    y: i32,
    step: i32,
    end: i32,
}

impl Marquee {
    pub fn new(text: &str, x: i32, y: i32) -> Result<Self> {
        let mut owned = String::new();
        owned.push_str(text).map_err(|_| Error::TextTooLong)?;
        let len = text.chars().count() as i32;
        let end = if LETTER_ADVANCE * len > COLS as i32 {
            let extra = text.chars().skip(1).filter(|&c| is_wide(c)).count() as i32 * 2;
            COLS as i32 - LETTER_ADVANCE * len - extra
        } else {
            -1
        };
        Ok(Marquee {
            text: owned,
            x,
            y,
            step: 0,
            end,
        })
    }

    /// Frames left to show.
    pub fn remaining(&self) -> usize {
        (self.step - self.end).max(0) as usize
    }

    /// Clears the frame and draws the next scroll position.
    ///
    /// Returns how long the frame should stay on, or `None` when done.
    pub fn next_frame(&mut self, frame: &mut EncodedFrame, color: RGB8) -> Option<u32> {
        if self.step <= self.end {
            return None;
        }
        frame.clear();
        draw_string(frame, &self.text, self.x + self.step, self.y, color);
        let first = self.step == 0;
        self.step -= 1;
        Some(match (first, self.step <= self.end) {
            // static text has no scroll step to add
            (true, true) => SCROLL_HOLD_MS,
            (false, true) => SCROLL_STEP_MS + SCROLL_HOLD_MS,
            (true, false) => SCROLL_FIRST_MS,
            (false, false) => SCROLL_STEP_MS,
        })
    }
}
