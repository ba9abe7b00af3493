//! The A5/2 keystream generator.
//!
//! The cipher state is a plain `Copy` value. Every transition takes a state and returns the
//! next one, so callers own the state explicitly and nothing is hidden between calls.

use std::fmt;

use crate::error::{A52Error, Result};
use crate::utility::{bit, majority};

pub mod register;

pub use self::register::{FeedbackPolynomial, OutputTaps, RegisterSpec,
                         CLOCK_TAPS, OUTPUT_TAPS, R1, R2, R3, R4, REGISTERS};

/// Number of key bits.
pub const KEY_BITS: usize = 64;

/// Number of significant bits in a frame number.
pub const FRAME_BITS: usize = 22;

/// Largest valid frame number.
pub const MAX_FRAME: u32 = (1 << FRAME_BITS) - 1;

/// The decision of the clocking unit for one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockControl {
    pub r1: bool,
    pub r2: bool,
    pub r3: bool,
}

impl ClockControl {
    /// Returns true if the `i`'th of R1, R2, R3 clocks.
    #[inline(always)]
    pub fn clocks(&self, i: usize) -> bool {
        match i {
            0 => self.r1,
            1 => self.r2,
            2 => self.r3,
            _ => panic!("only R1, R2 and R3 are clock controlled"),
        }
    }

    /// Returns the number of controlled registers that clock.
    pub fn count(&self) -> usize {
        self.r1 as usize + self.r2 as usize + self.r3 as usize
    }

    /// Derives the decision from the current value of R4.
    #[inline(always)]
    pub fn from_r4(r4: u32) -> ClockControl {
        let c1 = bit(r4, CLOCK_TAPS[0]);
        let c2 = bit(r4, CLOCK_TAPS[1]);
        let c3 = bit(r4, CLOCK_TAPS[2]);
        let m = majority(c1, c2, c3);

        ClockControl {
            r1: c1 == m,
            r2: c2 == m,
            r3: c3 == m,
        }
    }
}

/**
The content of the four registers together with the number of clock steps applied since the
key setup.

registers   R1, R2, R3 and R4. Bits above the width of each register are always zero.
steps       Number of transitions since `initialize` returned.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CipherState {
    registers: [u32; 4],
    steps: u64,
}

impl CipherState {
    /// Creates a state from raw register values, rejecting values wider than their register.
    pub fn from_registers(registers: [u32; 4]) -> Result<CipherState> {
        for (spec, &value) in REGISTERS.iter().zip(registers.iter()) {
            if value & !spec.mask() != 0 {
                return Err(A52Error::InvalidInput(
                    format!("{} value {:#x} exceeds {} bits", spec.name, value, spec.width)));
            }
        }

        Ok(CipherState { registers, steps: 0 })
    }

    /// Returns the four registers.
    pub fn registers(&self) -> [u32; 4] {
        self.registers
    }

    /// Returns register `i`, counting R1 as 0.
    pub fn register(&self, i: usize) -> u32 {
        self.registers[i]
    }

    /// Returns the number of transitions applied since the key setup.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Clocks all four registers.
    pub fn clock_regular(self) -> CipherState {
        let mut registers = self.registers;

        for (spec, value) in REGISTERS.iter().zip(registers.iter_mut()) {
            *value = spec.clock(*value);
        }

        CipherState { registers, steps: self.steps + 1 }
    }

    /// Returns which of R1, R2 and R3 clock in the next irregular step.
    #[inline(always)]
    pub fn derive_clock_control_bits(&self) -> ClockControl {
        ClockControl::from_r4(self.registers[3])
    }

    /// Clocks R4 and the registers selected by the clocking unit. The decision is taken before
    /// R4 moves.
    pub fn clock_irregular(self) -> CipherState {
        let control = self.derive_clock_control_bits();
        let mut registers = self.registers;

        for (i, spec) in REGISTERS.iter().take(3).enumerate() {
            if control.clocks(i) {
                registers[i] = spec.clock(registers[i]);
            }
        }

        registers[3] = R4.clock(registers[3]);

        CipherState { registers, steps: self.steps + 1 }
    }

    /// Computes the output bit of the current state.
    pub fn output_bit(&self) -> bool {
        self.registers
            .iter()
            .zip(OUTPUT_TAPS.iter())
            .fold(false, |acc, (&value, taps)| {
                let m = majority(bit(value, taps.majority[0]) ^ (taps.majority[0] == taps.complemented),
                                 bit(value, taps.majority[1]) ^ (taps.majority[1] == taps.complemented),
                                 bit(value, taps.majority[2]) ^ (taps.majority[2] == taps.complemented));

                acc ^ bit(value, taps.top) ^ m
            })
    }

    /// XORs a difference into the registers. The step counter is kept.
    pub fn with_difference(self, difference: &[u32; 4]) -> CipherState {
        let mut registers = self.registers;

        for (value, d) in registers.iter_mut().zip(difference.iter()) {
            *value ^= d;
        }

        CipherState { registers, steps: self.steps }
    }

    /// Clocks all registers once and adds `input` to position 0 of each register. This is one
    /// step of the key setup.
    fn load_bit(self, input: bool) -> CipherState {
        let mut state = self.clock_regular();

        for value in state.registers.iter_mut() {
            *value ^= input as u32;
        }

        state
    }
}

impl fmt::Display for CipherState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "R1={:05x} R2={:06x} R3={:06x} R4={:05x}",
               self.registers[0], self.registers[1], self.registers[2], self.registers[3])
    }
}

/// Checks that a frame number fits in 22 bits.
pub fn check_frame(frame: u32) -> Result<u32> {
    if frame > MAX_FRAME {
        Err(A52Error::InvalidInput(format!("frame number {:#x} exceeds {} bits", frame, FRAME_BITS)))
    } else {
        Ok(frame)
    }
}

/// Returns the frame number `n` frames after `frame`, wrapping around at 22 bits.
pub fn frame_after(frame: u32, n: u32) -> u32 {
    frame.wrapping_add(n) & MAX_FRAME
}

/**
Performs the key setup: loads the key (bit 0 first) and then the frame number (bit 0 first),
clocking every register once per bit, and finally sets the force bit of each register.

key     The 64-bit session key. Bit i is the i'th key bit loaded.
frame   The 22-bit frame number.
*/
pub fn initialize(key: u64, frame: u32) -> Result<CipherState> {
    Ok(key_setup(key, check_frame(frame)?))
}

/// The key setup for a frame number already known to fit in 22 bits.
pub(crate) fn key_setup(key: u64, frame: u32) -> CipherState {
    let mut state = CipherState { registers: [0; 4], steps: 0 };

    for i in 0..KEY_BITS {
        state = state.load_bit((key >> i) & 1 == 1);
    }

    for i in 0..FRAME_BITS {
        state = state.load_bit((frame >> i) & 1 == 1);
    }

    for (spec, value) in REGISTERS.iter().zip(state.registers.iter_mut()) {
        *value |= 1 << spec.force_bit;
    }

    state.steps = 0;
    state
}

/// Performs the key setup with a key given as 8 bytes, the first byte holding key bits 0..8
/// (least significant bit first). This is the layout of the GSM reference implementation.
pub fn initialize_bytes(key: &[u8], frame: u32) -> Result<CipherState> {
    if key.len() * 8 != KEY_BITS {
        return Err(A52Error::InvalidInput(format!("key must be 8 bytes, got {}", key.len())));
    }

    let key = key.iter().rev().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));

    initialize(key, frame)
}

/// Returns the difference between the states produced by the key setup for two frame numbers
/// under the same key. The key setup is linear in key and frame, so the difference does not
/// depend on the key. Force bits are identical in both states and are left out.
pub fn frame_difference(frame_a: u32, frame_b: u32) -> Result<[u32; 4]> {
    let state = initialize(0, check_frame(frame_a)? ^ check_frame(frame_b)?)?;
    let mut difference = state.registers();

    for (spec, value) in REGISTERS.iter().zip(difference.iter_mut()) {
        *value &= !(1 << spec.force_bit);
    }

    Ok(difference)
}

#[cfg(test)]
mod tests;
