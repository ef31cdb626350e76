//! 7 pixel high glyphs: 3 wide clock digits and 5 wide letters for text.
//!
//! Each row is a bit pattern, leftmost pixel in the highest used bit.

pub const GLYPH_HEIGHT: usize = 7;
pub const NUMBER_WIDTH: usize = 3;
pub const LETTER_WIDTH: usize = 5;

#[rustfmt::skip]
static NUMBERS: [(char, [u8; GLYPH_HEIGHT]); 11] = [
    ('0', [0b111,
           0b101,
           0b101,
           0b101,
           0b101,
           0b101,
           0b111]),
    ('1', [0b001,
           0b001,
           0b001,
           0b001,
           0b001,
           0b001,
           0b001]),
    ('2', [0b111,
           0b001,
           0b001,
           0b111,
           0b100,
           0b100,
           0b111]),
    ('3', [0b111,
           0b001,
           0b001,
           0b111,
           0b001,
           0b001,
           0b111]),
    ('4', [0b101,
           0b101,
           0b101,
           0b111,
           0b001,
           0b001,
           0b001]),
    ('5', [0b111,
           0b100,
           0b100,
           0b111,
           0b001,
           0b001,
           0b111]),
    ('6', [0b111,
           0b100,
           0b100,
           0b111,
           0b101,
           0b101,
           0b111]),
    ('7', [0b111,
           0b001,
           0b001,
           0b001,
           0b001,
           0b001,
           0b001]),
    ('8', [0b111,
           0b101,
           0b101,
           0b111,
           0b101,
           0b101,
           0b111]),
    ('9', [0b111,
           0b101,
           0b101,
           0b111,
           0b001,
           0b001,
           0b111]),
    (':', [0b000,
           0b000,
           0b010,
           0b000,
           0b010,
           0b000,
           0b000]),
];

#[rustfmt::skip]
static LETTERS: [(char, [u8; GLYPH_HEIGHT]); 31] = [
    ('a', [0b00000, 0b01000, 0b10100, 0b11100, 0b10100, 0b10100, 0b00000]),
    ('c', [0b00000, 0b01100, 0b10000, 0b10000, 0b10000, 0b01100, 0b00000]),
    ('d', [0b00000, 0b11000, 0b10100, 0b10100, 0b10100, 0b11000, 0b00000]),
    ('e', [0b00000, 0b11100, 0b10000, 0b11000, 0b10000, 0b11100, 0b00000]),
    ('f', [0b00000, 0b11100, 0b10000, 0b11100, 0b10000, 0b10000, 0b00000]),
    ('h', [0b00000, 0b10100, 0b10100, 0b11100, 0b10100, 0b10100, 0b00000]),
    ('i', [0b00000, 0b11100, 0b01000, 0b01000, 0b01000, 0b11100, 0b00000]),
    ('k', [0b00000, 0b10100, 0b10100, 0b11000, 0b10100, 0b10100, 0b00000]),
    ('l', [0b00000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11100, 0b00000]),
    ('m', [0b00000, 0b11010, 0b10101, 0b10101, 0b10101, 0b10101, 0b00000]),
    ('n', [0b00000, 0b11000, 0b10100, 0b10100, 0b10100, 0b10100, 0b00000]),
    ('o', [0b00000, 0b01000, 0b10100, 0b10100, 0b10100, 0b01100, 0b00000]),
    ('p', [0b00000, 0b11000, 0b10100, 0b11000, 0b10000, 0b10000, 0b00000]),
    ('r', [0b00000, 0b11000, 0b10100, 0b11000, 0b10100, 0b10100, 0b00000]),
    ('s', [0b00000, 0b01100, 0b10000, 0b01000, 0b00100, 0b11000, 0b00000]),
    ('t', [0b00000, 0b11100, 0b01000, 0b01000, 0b01000, 0b01000, 0b00000]),
    ('u', [0b00000, 0b10100, 0b10100, 0b10100, 0b10100, 0b01100, 0b00000]),
    ('w', [0b00000, 0b10101, 0b10101, 0b10101, 0b10101, 0b01010, 0b00000]),
    ('x', [0b00000, 0b10100, 0b10100, 0b01000, 0b10100, 0b10100, 0b00000]),
    ('z', [0b00000, 0b11100, 0b00100, 0b01000, 0b10000, 0b11100, 0b00000]),
    (' ', [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000]),
    ('0', [0b00000, 0b11100, 0b10100, 0b10100, 0b10100, 0b11100, 0b00000]),
    ('1', [0b00000, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000]),
    ('2', [0b00000, 0b11100, 0b00100, 0b11100, 0b10000, 0b11100, 0b00000]),
    ('3', [0b00000, 0b11100, 0b00100, 0b11100, 0b00100, 0b11100, 0b00000]),
    ('4', [0b00000, 0b10100, 0b10100, 0b11100, 0b00100, 0b00100, 0b00000]),
    ('5', [0b00000, 0b11100, 0b10000, 0b11100, 0b00100, 0b11100, 0b00000]),
    ('6', [0b00000, 0b11100, 0b10000, 0b11100, 0b10100, 0b11100, 0b00000]),
    ('7', [0b00000, 0b11100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000]),
    ('8', [0b00000, 0b11100, 0b10100, 0b11100, 0b10100, 0b11100, 0b00000]),
    ('9', [0b00000, 0b11100, 0b10100, 0b11100, 0b00100, 0b11100, 0b00000]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    width: usize,
    rows: &'static [u8; GLYPH_HEIGHT],
}

impl Glyph {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        x < self.width && y < GLYPH_HEIGHT && self.rows[y] & (1 << (self.width - 1 - x)) != 0
    }

    /// Lit pixels as `(x, y)` offsets from the top-left corner.
    pub fn pixels(self) -> impl Iterator<Item = (usize, usize)> {
        (0..GLYPH_HEIGHT)
            .flat_map(move |y| (0..self.width).map(move |x| (x, y)))
            .filter(move |&(x, y)| self.is_set(x, y))
    }
}

fn lookup(
    table: &'static [(char, [u8; GLYPH_HEIGHT])],
    c: char,
) -> Option<&'static [u8; GLYPH_HEIGHT]> {
    table.iter().find(|(k, _)| *k == c).map(|(_, rows)| rows)
}

/// Full height clock digit, `0-9` and `:`. Anything else draws as `0`.
pub fn number(c: char) -> Glyph {
    Glyph {
        width: NUMBER_WIDTH,
        rows: lookup(&NUMBERS, c).unwrap_or(&NUMBERS[0].1),
    }
}

/// Text glyph. Unknown characters draw as `a`.
pub fn letter(c: char) -> Glyph {
    Glyph {
        width: LETTER_WIDTH,
        rows: lookup(&LETTERS, c.to_ascii_lowercase()).unwrap_or(&LETTERS[0].1),
    }
}
