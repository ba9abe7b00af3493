//! Fixed parameters of the four A5/2 shift registers.

use crate::utility::parity;

/// The feedback taps of a register. Bit `i` of `mask` is set when position `i` is tapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedbackPolynomial {
    pub taps: &'static [usize],
    pub mask: u32,
}

/// The positions combined into the output bit by one of R1, R2 or R3: the top bit is added
/// linearly, the three `majority` positions go through a majority function with the bit at
/// `complemented` inverted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputTaps {
    pub top: usize,
    pub majority: [usize; 3],
    pub complemented: usize,
}

/// A description of one LFSR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterSpec {
    pub name: &'static str,
    pub width: usize,
    pub feedback: FeedbackPolynomial,
    /// Position set to 1 at the end of the key setup.
    pub force_bit: usize,
}

impl RegisterSpec {
    /// Returns a mask of the meaningful bits of the register.
    #[inline(always)]
    pub const fn mask(&self) -> u32 {
        (1 << self.width) - 1
    }

    /// Shifts the register one position towards the top. The parity of the tapped bits enters
    /// at position 0.
    #[inline(always)]
    pub fn clock(&self, value: u32) -> u32 {
        ((value << 1) & self.mask()) | parity(value & self.feedback.mask)
    }
}

/// R1, feedback polynomial x^19 + x^5 + x^2 + x + 1.
pub const R1: RegisterSpec = RegisterSpec {
    name: "R1",
    width: 19,
    feedback: FeedbackPolynomial { taps: &[13, 16, 17, 18], mask: 0x07_2000 },
    force_bit: 15,
};

/// R2, feedback polynomial x^22 + x + 1.
pub const R2: RegisterSpec = RegisterSpec {
    name: "R2",
    width: 22,
    feedback: FeedbackPolynomial { taps: &[20, 21], mask: 0x30_0000 },
    force_bit: 16,
};

/// R3, feedback polynomial x^23 + x^15 + x^2 + x + 1.
pub const R3: RegisterSpec = RegisterSpec {
    name: "R3",
    width: 23,
    feedback: FeedbackPolynomial { taps: &[7, 20, 21, 22], mask: 0x70_0080 },
    force_bit: 18,
};

/// R4, the clock-control register, feedback polynomial x^17 + x^5 + 1.
pub const R4: RegisterSpec = RegisterSpec {
    name: "R4",
    width: 17,
    feedback: FeedbackPolynomial { taps: &[11, 16], mask: 0x01_0800 },
    force_bit: 10,
};

/// All four registers, in state order.
pub const REGISTERS: [RegisterSpec; 4] = [R1, R2, R3, R4];

/// The bits of R4 deciding whether R1, R2 and R3 clock.
pub const CLOCK_TAPS: [usize; 3] = [10, 3, 7];

/// Output taps of R1, R2 and R3.
pub const OUTPUT_TAPS: [OutputTaps; 3] = [
    OutputTaps { top: 18, majority: [12, 14, 15], complemented: 14 },
    OutputTaps { top: 21, majority: [9, 13, 16], complemented: 16 },
    OutputTaps { top: 22, majority: [13, 16, 18], complemented: 13 },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_masks_match_taps() {
        for spec in REGISTERS.iter() {
            let mask = spec.feedback.taps.iter().fold(0, |m, &t| m | (1 << t));
            assert_eq!(mask, spec.feedback.mask, "{}", spec.name);
            assert!(spec.feedback.taps.contains(&(spec.width - 1)), "{}", spec.name);
            assert!(spec.force_bit < spec.width);
        }
    }

    #[test]
    fn clock_stays_within_width() {
        for spec in REGISTERS.iter() {
            let mut value = spec.mask();

            for _ in 0..100 {
                value = spec.clock(value);
                assert_eq!(0, value & !spec.mask());
            }
        }
    }
}
