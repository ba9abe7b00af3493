//! Captured keystream segments fed to the attack.

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use crate::cipher::check_frame;
use crate::error::{A52Error, Result};
use crate::keystream::KeystreamSession;
use crate::utility::{bits_from_str, bits_to_string, parse_number};

/// Largest keystream position, counted after the mixing phase, a sample may extend to.
pub const MAX_SAMPLE_END: usize = 1 << 16;

/// Checks that `len` bits starting at `offset` end within `MAX_SAMPLE_END`.
fn check_span(offset: usize, len: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= MAX_SAMPLE_END => Ok(()),
        _ => Err(A52Error::InvalidInput(
            format!("{} bits at offset {} extend past keystream bit {}", len, offset, MAX_SAMPLE_END))),
    }
}

/**
A segment of keystream observed for one frame.

frame   The 22-bit frame number the keystream was generated for.
offset  Position of the first captured bit in the frame keystream, counted after the mixing
        phase. 0 for the downlink burst, 114 for the uplink burst.
bits    The captured keystream bits.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClockControlSample {
    frame: u32,
    offset: usize,
    bits: Vec<bool>,
}

impl ClockControlSample {
    /// Creates a sample, rejecting frame numbers wider than 22 bits, empty captures and captures
    /// reaching past `MAX_SAMPLE_END`.
    pub fn new(frame: u32, offset: usize, bits: Vec<bool>) -> Result<ClockControlSample> {
        let frame = check_frame(frame)?;

        if bits.is_empty() {
            return Err(A52Error::InvalidInput("sample contains no keystream bits".to_string()));
        }

        check_span(offset, bits.len())?;

        Ok(ClockControlSample { frame, offset, bits })
    }

    /// Generates a sample from a known key. Used to produce test material.
    pub fn capture(key: u64, frame: u32, offset: usize, len: usize) -> Result<ClockControlSample> {
        check_span(offset, len)?;

        let session = KeystreamSession::for_frame(key, frame)?;

        ClockControlSample::new(frame, offset, session.keystream_at(offset, len))
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Number of captured bits.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Returns true if the keystream of `session` matches the captured bits.
    pub fn matches(&self, session: &KeystreamSession) -> bool {
        session.keystream_at(self.offset, self.bits.len()) == self.bits
    }
}

/// Total number of captured bits in a set of samples.
pub fn total_bits(samples: &[ClockControlSample]) -> usize {
    samples.iter().map(|s| s.len()).sum()
}

impl FromStr for ClockControlSample {
    type Err = A52Error;

    /// Parses `<frame>:<offset>:<bits>`.
    fn from_str(s: &str) -> Result<ClockControlSample> {
        let fields: Vec<_> = s.trim().splitn(3, ':').collect();

        if fields.len() != 3 {
            return Err(A52Error::InvalidInput(
                format!("expected <frame>:<offset>:<bits>, got '{}'", s)));
        }

        let frame = parse_number(fields[0])?;
        let frame = u32::try_from(frame)
            .map_err(|_| A52Error::InvalidInput(format!("frame number {} out of range", frame)))?;
        let offset = fields[1].parse::<usize>()
            .map_err(|_| A52Error::InvalidInput(format!("'{}' is not an offset", fields[1])))?;

        ClockControlSample::new(frame, offset, bits_from_str(fields[2])?)
    }
}

impl fmt::Display for ClockControlSample {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}:{}:{}", self.frame, self.offset, bits_to_string(&self.bits))
    }
}
