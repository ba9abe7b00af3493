//! A collection of utility functions used throughout the library.

use itertools::Itertools;
use std::io::{self, Write};

use crate::error::{A52Error, Result};

/// Calculates the modulo 2 sum of the bits in the input. Taken from
/// [here](http://www.graphics.stanford.edu/~seander/bithacks.html#ParityMultiply).
#[inline(always)]
pub fn parity(input: u32) -> u32 {
    let mut y = input;

    y ^= y >> 1;
    y ^= y >> 2;
    y = (y & 0x1111_1111).wrapping_mul(0x1111_1111);
    (y >> 28) & 1
}

/// Returns the value held by at least two of the three inputs.
#[inline(always)]
pub fn majority(a: bool, b: bool, c: bool) -> bool {
    (a & b) | (b & c) | (a & c)
}

/// Returns bit `i` of `x` as a bool.
#[inline(always)]
pub fn bit(x: u32, i: usize) -> bool {
    (x >> i) & 1 == 1
}

/// Formats bits as a string of `0` and `1`, first bit first.
pub fn bits_to_string(bits: &[bool]) -> String {
    bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

/// Parses a string of `0` and `1`. Whitespace and `_` separators are ignored.
pub fn bits_from_str(s: &str) -> Result<Vec<bool>> {
    s.chars()
     .filter(|c| !c.is_whitespace() && *c != '_')
     .map(|c| match c {
         '0' => Ok(false),
         '1' => Ok(true),
         _   => Err(A52Error::InvalidInput(format!("'{}' is not a bit", c))),
     })
     .collect()
}

/// Packs bits into bytes, first bit in the MSB of the first byte, which is the layout of the
/// GSM reference vectors. The last byte is padded with zeros.
pub fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk.iter()
                 .enumerate()
                 .fold(0u8, |acc, (i, &b)| acc | ((b as u8) << (7 - i)))
        })
        .collect()
}

/// Formats bits as packed hex, see `bits_to_bytes`.
pub fn bits_to_hex(bits: &[bool]) -> String {
    bits_to_bytes(bits).iter().map(|b| format!("{:02x}", b)).join("")
}

/// Parses a decimal or `0x`-prefixed hexadecimal number.
pub fn parse_number(s: &str) -> Result<u64> {
    let parsed = if let Some(hex) = s.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else {
        s.parse::<u64>()
    };

    parsed.map_err(|_| A52Error::InvalidInput(format!("'{}' is not a number", s)))
}

/// A struct representing a progress bar for progress printing on the command line.
pub struct ProgressBar {
    current_items: f64,
    item_size: f64,
    used: bool,
}

impl ProgressBar {
    /// Creates a new progress for tracking progress of `num_items` steps.
    pub fn new(num_items: usize) -> ProgressBar {
        let item_size = 100.0 / (num_items.max(1) as f64);

        ProgressBar {
            current_items: 0.0,
            item_size,
            used: false,
        }
    }

    /// Increment the current progress of the bar. The progress bar prints if
    /// a new step was reached.
    #[inline(always)]
    pub fn increment(&mut self) {
        self.current_items += self.item_size;

        while self.current_items >= 1.0 {
            eprint!("=");
            let _ = io::stderr().flush();
            self.current_items -= 1.0;
        }

        self.used = true;
    }
}

impl Drop for ProgressBar {
    fn drop(&mut self) {
        if self.used {
            eprintln!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_test() {
        assert_eq!(0, parity(0));
        assert_eq!(1, parity(0x072000 & 0x010000));
        assert_eq!(0, parity(0x072000));
        assert_eq!(1, parity(0x8000_0000));
        assert_eq!(1, parity(0xffff_fffe));
    }

    #[test]
    fn majority_test() {
        assert!(!majority(false, false, true));
        assert!(majority(true, false, true));
        assert!(majority(true, true, true));
        assert!(!majority(false, false, false));
    }

    #[test]
    fn hex_packing_test() {
        let bits = bits_from_str("1111_0100 0101_0001 01").unwrap();

        assert_eq!("f45140", bits_to_hex(&bits));
        assert_eq!(vec![0xf4, 0x51, 0x40], bits_to_bytes(&bits));
        assert_eq!("", bits_to_hex(&[]));
        assert_eq!("111101000101000101", bits_to_string(&bits));
    }

    #[test]
    fn bad_input_test() {
        assert!(bits_from_str("0102").is_err());
        assert!(bits_from_str("0\u{e9}1").is_err());
        assert_eq!(33, parse_number("0x21").unwrap());
        assert_eq!(33, parse_number("33").unwrap());
        assert!(parse_number("x").is_err());
        assert!(parse_number("0x\u{e9}").is_err());
    }
}
