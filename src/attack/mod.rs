//! The clock-control attack on A5/2.
//!
//! The clocking of R1, R2 and R3 depends only on R4. For a guessed R4 the clocking is known,
//! every keystream bit becomes a quadratic equation in the unknown bits of R1, R2 and R3, and
//! after linearization the equations are solved by Gaussian elimination. A guess is accepted
//! only if the solved state regenerates the captured keystream.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::cipher::{frame_difference, CipherState, R4};
use crate::error::{A52Error, Result};
use crate::gf2::Insertion;
use crate::keystream::{KeystreamSession, MIXING_CLOCKS};
use crate::sample::{total_bits, ClockControlSample};

pub mod equations;
pub mod keysetup;
pub mod search;
pub mod symbolic;

use self::equations::LinearEquationSystem;
use self::symbolic::{SymbolicState, COLUMNS};

pub use self::keysetup::recover_key;
pub use self::symbolic::{NUM_LINEAR, NUM_VARIABLES};

/// Number of R4 hypotheses. Bit 10 of R4 is forced to 1 by the key setup.
pub const NUM_HYPOTHESES: usize = 1 << 16;

/// Fewest keystream bits the attack accepts: three bursts.
pub const MIN_KEYSTREAM_BITS: usize = 3 * 114;

/// Returns the R4 value of hypothesis `index`: the 16 bits of the index with a 1 inserted at
/// bit 10.
#[inline(always)]
pub fn hypothesis_to_r4(index: usize) -> u32 {
    let index = index as u32;

    (index & 0x3ff) | (1 << R4.force_bit) | ((index >> 10) << 11)
}

/// Inverse of `hypothesis_to_r4`. Returns `None` if the force bit of `r4` is clear.
pub fn r4_to_hypothesis(r4: u32) -> Option<usize> {
    if r4 & !R4.mask() != 0 || (r4 >> R4.force_bit) & 1 == 0 {
        return None;
    }

    Some(((r4 & 0x3ff) | ((r4 >> 11) << 10)) as usize)
}

/**
A recovered key.

key         The session key, or `None` if no key produces `state`.
state       The post-setup state for `frame`.
frame       The frame number of the first sample.
hypothesis  Index of the R4 hypothesis that produced the candidate.
validated   True if the candidate regenerates every sample.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyCandidate {
    pub key: Option<u64>,
    pub state: CipherState,
    pub frame: u32,
    pub hypothesis: usize,
    pub validated: bool,
}

impl fmt::Display for KeyCandidate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.key {
            Some(key) => write!(f, "key {:016x}", key)?,
            None => write!(f, "key unknown")?,
        }

        write!(f, " (frame {:#x}, {}, hypothesis {})", self.frame, self.state, self.hypothesis)
    }
}

/// The fate of one R4 hypothesis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HypothesisOutcome {
    /// The equations contradict each other.
    Inconsistent,
    /// The equations leave some register bits free.
    Underdetermined { rank: usize },
    /// The solved state does not regenerate the samples.
    Rejected,
    /// The solved state regenerates every sample.
    Validated(CipherState),
}

/// How several samples are combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// One equation system over all samples.
    Joint,
    /// One attack per sample; the recovered keys must agree.
    Independent,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "joint"       => Ok(Strategy::Joint),
            "independent" => Ok(Strategy::Independent),
            _             => Err(String::from("Unknown strategy.")),
        }
    }
}

/**
Parameters of the hypothesis search.

hypotheses      R4 hypotheses to try. Clamped to `0..NUM_HYPOTHESES`.
threads         Number of worker threads, 0 for one per CPU.
stop_at_first   Stop all workers once a hypothesis validates.
strategy        How several samples are combined.
progress        Print a progress bar to stderr.
*/
#[derive(Clone, Debug)]
pub struct AttackConfig {
    pub hypotheses: Range<usize>,
    pub threads: usize,
    pub stop_at_first: bool,
    pub strategy: Strategy,
    pub progress: bool,
}

impl Default for AttackConfig {
    fn default() -> AttackConfig {
        AttackConfig {
            hypotheses: 0..NUM_HYPOTHESES,
            threads: 0,
            stop_at_first: false,
            strategy: Strategy::Joint,
            progress: false,
        }
    }
}

/// The result of a search. `candidates` is ordered by hypothesis index.
#[derive(Clone, Debug, Default)]
pub struct AttackReport {
    pub candidates: Vec<KeyCandidate>,
    pub searched: usize,
    pub inconsistent: usize,
    pub underdetermined: usize,
    pub rejected: usize,
    pub elapsed: f64,
}

impl AttackReport {
    /// Returns true if hypotheses were searched and none of them gave enough equations.
    pub fn all_underdetermined(&self) -> bool {
        self.searched > 0 && self.underdetermined == self.searched
    }
}

/**
An attack on a set of samples generated under one key.

samples     The captured keystream. The first sample fixes the reference frame.
differences For each sample, the difference between its post-setup state and the post-setup
            state of the reference frame.
*/
#[derive(Clone, Debug)]
pub struct ClockControlAttack {
    samples: Vec<ClockControlSample>,
    differences: Vec<[u32; 4]>,
}

impl ClockControlAttack {
    /// Prepares an attack, rejecting an empty sample set or one with fewer than
    /// `MIN_KEYSTREAM_BITS` bits.
    pub fn new(samples: Vec<ClockControlSample>) -> Result<ClockControlAttack> {
        let reference = samples.first()
                               .ok_or_else(|| A52Error::InvalidInput("no samples".to_string()))?
                               .frame();
        let available = total_bits(&samples);

        if available < MIN_KEYSTREAM_BITS {
            return Err(A52Error::InsufficientData { available, required: MIN_KEYSTREAM_BITS });
        }

        let differences = samples.iter()
                                 .map(|s| frame_difference(reference, s.frame()))
                                 .collect::<Result<Vec<_>>>()?;

        Ok(ClockControlAttack { samples, differences })
    }

    pub fn samples(&self) -> &[ClockControlSample] {
        &self.samples
    }

    /// The frame number of the first sample. Recovered states belong to this frame.
    pub fn reference_frame(&self) -> u32 {
        self.samples[0].frame()
    }

    /// Builds the equation system for R4 hypothesis `hypothesis`. Returns `None` as soon as an
    /// equation contradicts the previous ones.
    pub fn equations(&self, hypothesis: usize) -> Option<LinearEquationSystem> {
        let r4 = hypothesis_to_r4(hypothesis);
        let layout = &*COLUMNS;
        let mut system = LinearEquationSystem::new();

        for (sample, difference) in self.samples.iter().zip(self.differences.iter()) {
            let mut state = SymbolicState::new(difference, r4 ^ difference[3]);

            for _ in 0..MIXING_CLOCKS + sample.offset() {
                state.clock();
            }

            for &z in sample.bits() {
                state.clock();

                let (row, constant) = state.output_equation(layout);

                if system.add(row, z ^ constant) == Insertion::Inconsistent {
                    trace!(hypothesis, equations = system.num_equations(), "inconsistent");
                    return None;
                }
            }
        }

        Some(system)
    }

    /// Evaluates one R4 hypothesis.
    pub fn evaluate(&self, hypothesis: usize) -> HypothesisOutcome {
        let system = match self.equations(hypothesis) {
            Some(system) => system,
            None => return HypothesisOutcome::Inconsistent,
        };

        let registers = match system.registers() {
            Some(registers) => registers,
            None => return HypothesisOutcome::Underdetermined { rank: system.rank() },
        };

        let state = match CipherState::from_registers([registers[0],
                                                       registers[1],
                                                       registers[2],
                                                       hypothesis_to_r4(hypothesis)]) {
            Ok(state) => state,
            Err(_) => return HypothesisOutcome::Rejected,
        };

        if self.validate(&state) {
            debug!(hypothesis, %state, "hypothesis validated");
            HypothesisOutcome::Validated(state)
        } else {
            HypothesisOutcome::Rejected
        }
    }

    /// Returns true if `state`, taken as the post-setup state of the reference frame,
    /// regenerates every sample.
    pub fn validate(&self, state: &CipherState) -> bool {
        self.samples
            .iter()
            .zip(self.differences.iter())
            .all(|(sample, difference)| {
                sample.matches(&KeystreamSession::new(state.with_difference(difference)))
            })
    }

    /// Turns a validated state into a key candidate by reversing the key setup.
    pub fn candidate(&self, hypothesis: usize, state: CipherState) -> KeyCandidate {
        let frame = self.reference_frame();

        KeyCandidate {
            key: recover_key(&state, frame),
            state,
            frame,
            hypothesis,
            validated: true,
        }
    }

    /// Searches the hypotheses of `config` in parallel.
    pub fn run(&self, config: &AttackConfig) -> AttackReport {
        search::search(self, config)
    }
}
