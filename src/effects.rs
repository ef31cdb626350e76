//! Full-matrix animations.
//!
//! Every effect is stepped once per frame by the render task: `next_frame`
//! draws into the frame and returns how long to wait before the next step, or
//! `None` once it has finished or was stopped.

use oorandom::Rand32;
use smart_leds::RGB8;

use crate::frame::{Column, EncodedFrame, Row, COLS, ROWS};

pub trait Effect {
    /// Draws the next step. `None` means the effect is over.
    fn next_frame(&mut self, frame: &mut EncodedFrame) -> Option<u32>;

    /// Ends the effect before its next step.
    fn stop(&mut self);
}

/// One step around the colour wheel, red → green → blue → red.
pub fn wheel_plus(c: RGB8) -> RGB8 {
    let RGB8 { r, g, b } = c;
    if g == 0 && r < 0xff {
        RGB8::new(r.wrapping_add(1), 0, b.wrapping_sub(1))
    } else if g < 0xff && b == 0 {
        RGB8::new(r.wrapping_sub(1), g.wrapping_add(1), 0)
    } else if r == 0 && b < 0xff {
        RGB8::new(0, g.wrapping_sub(1), b.wrapping_add(1))
    } else {
        c
    }
}

/// One step back around the colour wheel, red → blue → green → red.
pub fn wheel_minus(c: RGB8) -> RGB8 {
    let RGB8 { r, g, b } = c;
    if g == 0 && b < 0xff {
        RGB8::new(r.wrapping_sub(1), 0, b.wrapping_add(1))
    } else if r < 0xff && b == 0 {
        RGB8::new(r.wrapping_add(1), g.wrapping_sub(1), 0)
    } else if g < 0xff && r == 0 {
        RGB8::new(0, g.wrapping_add(1), b.wrapping_sub(1))
    } else {
        c
    }
}

fn wheel_steps(c: RGB8, n: usize) -> RGB8 {
    (0..n).fold(c, |c, _| wheel_plus(c))
}

/// RGB scratch grid the animations work in before it is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Background([[RGB8; COLS]; ROWS]);

impl Background {
    pub const fn new() -> Self {
        Background([[RGB8 { r: 0, g: 0, b: 0 }; COLS]; ROWS])
    }

    pub fn get(&self, row: Row, column: Column) -> RGB8 {
        self.0[row.index()][column.index()]
    }

    pub fn fill_row(&mut self, row: Row, color: RGB8) {
        self.0[row.index()] = [color; COLS];
    }

    pub fn set(&mut self, row: Row, column: Column, color: RGB8) {
        self.0[row.index()][column.index()] = color;
    }

    /// Moves every row up by one; the bottom row is filled with `color`.
    pub fn shift_up(&mut self, color: RGB8) {
        self.0.rotate_left(1);
        self.0[ROWS - 1] = [color; COLS];
    }

    /// Moves every row down by one; the top row turns black.
    pub fn shift_down(&mut self) {
        self.0.rotate_right(1);
        self.0[0] = [RGB8::default(); COLS];
    }

    pub fn render(&self, frame: &mut EncodedFrame) {
        for row in Row::all() {
            for column in Column::all() {
                frame.set_pixel(row, column, self.get(row, column));
            }
        }
    }
}

impl Default for Background {
    fn default() -> Self {
        Self::new()
    }
}

/// Wheel steps between two rows of the first frame.
const FIRST_FRAME_STEPS: usize = 20;
/// Wheel steps for each new bottom row.
const ROW_STEPS: usize = 15;
const FALL_STEP_MS: u32 = 10;

/// Rainbow rows rising through the matrix.
#[derive(Debug, Clone)]
pub struct Colorfall {
    background: Background,
    color: RGB8,
    frame: u16,
    frames: u16,
    stopped: bool,
}

impl Colorfall {
    /// Short intro shown at power-up.
    pub fn new() -> Self {
        Self::with_frames(20)
    }

    /// Long run that walks every LED through the whole wheel.
    pub fn led_test() -> Self {
        Self::with_frames(380)
    }

    fn with_frames(frames: u16) -> Self {
        Colorfall {
            background: Background::new(),
            color: RGB8::new(0xff, 0, 0),
            frame: 0,
            frames,
            stopped: false,
        }
    }
}

impl Default for Colorfall {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Colorfall {
    fn next_frame(&mut self, frame: &mut EncodedFrame) -> Option<u32> {
        if self.stopped || self.frame >= self.frames {
            return None;
        }
        if self.frame == 0 {
            for row in Row::all() {
                self.color = wheel_steps(self.color, FIRST_FRAME_STEPS);
                self.background.fill_row(row, self.color);
            }
        } else {
            self.color = wheel_steps(self.color, ROW_STEPS);
            self.background.shift_up(self.color);
        }
        self.frame += 1;
        self.background.render(frame);
        Some(FALL_STEP_MS)
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

const DROPS: usize = 3;
const RAIN_STEP_MS: u32 = 120;

/// Green drops falling from the top row; runs until stopped.
#[derive(Debug, Clone)]
pub struct MatrixRain {
    background: Background,
    rng: Rand32,
    stopped: bool,
}

impl MatrixRain {
    pub fn new(seed: u64) -> Self {
        MatrixRain {
            background: Background::new(),
            rng: Rand32::new(seed),
            stopped: false,
        }
    }
}

impl Effect for MatrixRain {
    fn next_frame(&mut self, frame: &mut EncodedFrame) -> Option<u32> {
        if self.stopped {
            return None;
        }
        self.background.shift_down();
        let top = Row::all().next()?;
        for _ in 0..DROPS {
            let column = Column::new(self.rng.rand_range(0..COLS as u32) as usize).ok()?;
            let green = (self.rng.rand_u32() & 0x33) as u8;
            self.background.set(top, column, RGB8::new(0, green, 0));
        }
        self.background.render(frame);
        Some(RAIN_STEP_MS)
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

/// Whole matrix blinking white `count` times.
#[derive(Debug, Clone)]
pub struct Flash {
    half_period_ms: u32,
    toggles: u16,
    stopped: bool,
}

impl Flash {
    pub fn new(speed_ms: u32, count: u8) -> Self {
        Flash {
            half_period_ms: speed_ms >> 2,
            toggles: u16::from(count) * 2,
            stopped: false,
        }
    }
}

impl Effect for Flash {
    fn next_frame(&mut self, frame: &mut EncodedFrame) -> Option<u32> {
        if self.stopped || self.toggles == 0 {
            return None;
        }
        if self.toggles % 2 == 0 {
            frame.fill(RGB8::new(0xff, 0xff, 0xff));
        } else {
            frame.clear();
        }
        self.toggles -= 1;
        Some(self.half_period_ms)
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}
