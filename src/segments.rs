//! 4-digit 14-segment frame buffer.
//!
//! One `u16` per digit, laid out the way the HT16K33 backpack expects
//! (bit 14 is the decimal point). Text is right-justified, as the HAT's own
//! driver does.

pub const DIGITS: usize = 4;

/// decimal point bit of a digit
pub const DP: u16 = 0x4000;

/// shown when a number does not fit
const OVERFLOW: &str = "----";

/// glyph for one character; unknown characters render blank
pub fn glyph(ch: char) -> u16 {
    match ch.to_ascii_uppercase() {
        '0' => 0x0C3F,
        '1' => 0x0006,
        '2' => 0x00DB,
        '3' => 0x008F,
        '4' => 0x00E6,
        '5' => 0x2069,
        '6' => 0x00FD,
        '7' => 0x0007,
        '8' => 0x00FF,
        '9' => 0x00EF,
        'A' => 0x00F7,
        'B' => 0x128F,
        'C' => 0x0039,
        'D' => 0x120F,
        'E' => 0x00F9,
        'F' => 0x0071,
        'G' => 0x00BD,
        'H' => 0x00F6,
        'I' => 0x1200,
        'J' => 0x001E,
        'K' => 0x2470,
        'L' => 0x0038,
        'M' => 0x0536,
        'N' => 0x2136,
        'O' => 0x003F,
        'P' => 0x00F3,
        'Q' => 0x203F,
        'R' => 0x20F3,
        'S' => 0x00ED,
        'T' => 0x1201,
        'U' => 0x003E,
        'V' => 0x0C30,
        'W' => 0x2836,
        'X' => 0x2D00,
        'Y' => 0x1500,
        'Z' => 0x0C09,
        '-' => 0x00C0,
        '_' => 0x0008,
        '*' => 0x3FC0,
        '+' => 0x12C0,
        '/' => 0x0C00,
        _ => 0,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentBuffer {
    digits: [u16; DIGITS],
}

impl SegmentBuffer {
    pub fn clear(&mut self) {
        self.digits = [0; DIGITS];
    }

    #[cfg(test)]
    pub fn digits(&self) -> [u16; DIGITS] {
        self.digits
    }

    pub fn set_decimal(&mut self, index: usize, on: bool) {
        let Some(digit) = self.digits.get_mut(index) else {
            return;
        };
        if on {
            *digit |= DP;
        } else {
            *digit &= !DP;
        }
    }

    /// plain text; anything past four characters is cut off
    pub fn print_str(&mut self, text: &str) {
        let chars: Vec<char> = text.chars().take(DIGITS).collect();
        let start = DIGITS - chars.len();
        for (i, ch) in chars.into_iter().enumerate() {
            self.set_digit(start + i, ch);
        }
    }

    /// numeric text where each '.' lights the decimal point of the digit before it
    pub fn print_number_str(&mut self, text: &str) {
        let width = text.chars().filter(|&c| c != '.').count();
        if width > DIGITS {
            self.print_str(OVERFLOW);
            return;
        }

        let mut pos = DIGITS - width;
        for ch in text.chars() {
            if ch == '.' {
                if let Some(prev) = pos.checked_sub(1) {
                    self.set_decimal(prev, true);
                }
            } else {
                self.set_digit(pos, ch);
                pos += 1;
            }
        }
    }

    /// keeps the digit's decimal point as it was
    fn set_digit(&mut self, index: usize, ch: char) {
        if let Some(digit) = self.digits.get_mut(index) {
            *digit = (*digit & DP) | glyph(ch);
        }
    }

    /// HT16K33 display RAM image: low byte then high byte per digit
    pub fn to_ram(&self) -> [u8; DIGITS * 2] {
        let mut ram = [0u8; DIGITS * 2];
        for (i, digit) in self.digits.iter().enumerate() {
            let [lo, hi] = digit.to_le_bytes();
            ram[i * 2] = lo;
            ram[i * 2 + 1] = hi;
        }
        ram
    }
}
