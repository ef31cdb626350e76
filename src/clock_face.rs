//! HH:MM face. A digit that changes drops in from above the matrix, one row
//! per render tick.

use smart_leds::RGB8;
use time::Time;

use crate::draw::draw_number;
use crate::frame::EncodedFrame;

/// Left edge of the four digits.
const DIGIT_X: [i32; 4] = [0, 4, 10, 14];
const COLON_X: i32 = 7;
/// Where a new digit starts, one row above its first visible position.
const ROLL_START: i32 = -8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockFace {
    digits: Option<[char; 4]>,
    y: [i32; 4],
}

fn digits(time: Time) -> [char; 4] {
    let (h, m) = (u32::from(time.hour()), u32::from(time.minute()));
    [h / 10, h % 10, m / 10, m % 10].map(|d| char::from_digit(d, 10).unwrap_or('0'))
}

impl ClockFace {
    pub const fn new() -> Self {
        ClockFace {
            digits: None,
            y: [ROLL_START; 4],
        }
    }

    /// Draws `time` into a cleared frame and advances any running roll-in.
    ///
    /// Returns `true` while a digit is still moving.
    pub fn render(&mut self, frame: &mut EncodedFrame, time: Time, color: RGB8) -> bool {
        let next = digits(time);
        let previous = self.digits.replace(next);
        for (i, d) in next.iter().enumerate() {
            if previous.map_or(true, |p| p[i] != *d) {
                self.y[i] = ROLL_START;
            }
        }

        frame.clear();
        draw_number(frame, ':', COLON_X, 0, color);
        for ((d, x), y) in next.iter().zip(DIGIT_X).zip(self.y.iter_mut()) {
            if *y < 0 {
                *y += 1;
            }
            draw_number(frame, *d, x, *y, color);
        }
        self.is_rolling()
    }

    pub fn is_rolling(&self) -> bool {
        self.y.iter().any(|y| *y < 0)
    }
}

impl Default for ClockFace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::time;

    const C: RGB8 = RGB8 { r: 0, g: 9, b: 0 };

    fn settled(t: Time) -> EncodedFrame {
        let mut frame = EncodedFrame::new();
        draw_number(&mut frame, ':', COLON_X, 0, C);
        for (d, x) in digits(t).iter().zip(DIGIT_X) {
            draw_number(&mut frame, *d, x, 0, C);
        }
        frame
    }

    #[test]
    fn splits_hours_and_minutes() {
        assert_eq!(digits(time!(09:41)), ['0', '9', '4', '1']);
        assert_eq!(digits(time!(23:05)), ['2', '3', '0', '5']);
    }

    #[test]
    fn digits_roll_in_over_eight_ticks() {
        let mut face = ClockFace::new();
        let mut frame = EncodedFrame::new();
        let t = time!(12:34);
        assert!(face.render(&mut frame, t, C));
        // the first tick draws everything above the matrix except the colon
        let mut colon = EncodedFrame::new();
        draw_number(&mut colon, ':', COLON_X, 0, C);
        assert_eq!(frame, colon);

        for _ in 0..6 {
            assert!(face.render(&mut frame, t, C));
        }
        assert!(!face.render(&mut frame, t, C));
        assert_eq!(frame, settled(t));
    }

    #[test]
    fn only_changed_digit_moves() {
        let mut face = ClockFace::new();
        let mut frame = EncodedFrame::new();
        while face.render(&mut frame, time!(12:34), C) {}

        assert!(face.render(&mut frame, time!(12:35), C));
        assert_eq!(face.y, [0, 0, 0, ROLL_START + 1]);
        while face.render(&mut frame, time!(12:35), C) {}
        assert_eq!(frame, settled(time!(12:35)));
    }
}
