//! Runs the attack over a set of samples and turns the search result into a single key.

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::attack::{r4_to_hypothesis, recover_key, AttackConfig, AttackReport,
                    ClockControlAttack, Strategy, NUM_VARIABLES};
use crate::cipher::frame_difference;
use crate::error::{A52Error, Result};
use crate::keystream::KeystreamSession;
use crate::sample::{total_bits, ClockControlSample};

pub use crate::attack::KeyCandidate;

/// Drives `ClockControlAttack` according to an `AttackConfig`.
#[derive(Clone, Debug, Default)]
pub struct AttackOrchestrator {
    config: AttackConfig,
}

impl AttackOrchestrator {
    pub fn new(config: AttackConfig) -> AttackOrchestrator {
        AttackOrchestrator { config }
    }

    pub fn config(&self) -> &AttackConfig {
        &self.config
    }

    /**
    Recovers the key used to generate `samples`. All samples must come from the same key. The
    returned candidate describes the frame of the first sample and has been checked against
    every sample.

    samples     Captured keystream, one or more frames.
    */
    pub fn recover_key(&self, samples: &[ClockControlSample]) -> Result<KeyCandidate> {
        if samples.is_empty() {
            return Err(A52Error::InvalidInput("no samples".to_string()));
        }

        let candidate = match self.config.strategy {
            Strategy::Joint => self.recover_joint(samples)?,
            Strategy::Independent => self.recover_independent(samples)?,
        };

        match candidate.key {
            Some(key) => info!(key = %format!("{:016x}", key), "key recovered"),
            None => warn!(state = %candidate.state, "state recovered but no key produces it"),
        }

        Ok(candidate)
    }

    /// Solves one equation system over all samples.
    fn recover_joint(&self, samples: &[ClockControlSample]) -> Result<KeyCandidate> {
        let attack = ClockControlAttack::new(samples.to_vec())?;
        let mut candidate = conclude(attack.run(&self.config), total_bits(samples))?;

        candidate.validated = reproduces_all(&candidate, samples)?;

        if candidate.validated {
            Ok(candidate)
        } else {
            warn!(%candidate, "candidate does not survive re-validation");
            Err(A52Error::NoSolutionFound { hypotheses: 1 })
        }
    }

    /// Attacks every sample on its own and requires the results to agree.
    fn recover_independent(&self, samples: &[ClockControlSample]) -> Result<KeyCandidate> {
        let reference = samples[0].frame();
        let mut candidates = vec![];

        for sample in samples {
            let attack = ClockControlAttack::new(vec![sample.clone()])?;
            let candidate = conclude(attack.run(&self.config), sample.len())?;

            candidates.push(to_frame(candidate, reference)?);
        }

        merge(candidates, samples)
    }
}

/// Interprets a search report: exactly one validated candidate is a success.
pub fn conclude(report: AttackReport, available: usize) -> Result<KeyCandidate> {
    let mut candidates = report.candidates;

    match candidates.len() {
        0 if report.searched > 0 && report.underdetermined == report.searched => {
            Err(A52Error::InsufficientData { available, required: NUM_VARIABLES })
        }
        0 => Err(A52Error::NoSolutionFound { hypotheses: report.searched }),
        1 => Ok(candidates.remove(0)),
        _ => {
            warn!(candidates = candidates.len(), "several hypotheses validate");
            Err(A52Error::AmbiguousSolution(candidates))
        }
    }
}

/// Moves a candidate to another frame of the same key.
fn to_frame(candidate: KeyCandidate, frame: u32) -> Result<KeyCandidate> {
    let state = candidate.state.with_difference(&frame_difference(candidate.frame, frame)?);

    Ok(KeyCandidate {
        key: recover_key(&state, frame),
        state,
        frame,
        hypothesis: r4_to_hypothesis(state.register(3)).unwrap_or(candidate.hypothesis),
        validated: candidate.validated,
    })
}

/// Returns true if the candidate regenerates the keystream of every sample. The key is used
/// when known, otherwise the recovered state is moved to each frame.
fn reproduces_all(candidate: &KeyCandidate, samples: &[ClockControlSample]) -> Result<bool> {
    for sample in samples {
        let session = match candidate.key {
            Some(key) => KeystreamSession::for_frame(key, sample.frame())?,
            None => {
                let difference = frame_difference(candidate.frame, sample.frame())?;
                KeystreamSession::new(candidate.state.with_difference(&difference))
            }
        };

        if !sample.matches(&session) {
            return Ok(false);
        }
    }

    Ok(true)
}

/**
Combines candidates recovered from single samples. All candidates must describe the same frame.
Identical states are merged; if more than one distinct state remains the result is ambiguous,
with each candidate's `validated` flag telling whether it reproduces every sample.

candidates  One candidate per sample.
samples     All samples.
*/
pub fn merge(candidates: Vec<KeyCandidate>, samples: &[ClockControlSample]) -> Result<KeyCandidate> {
    let mut distinct = IndexMap::new();

    for candidate in candidates {
        distinct.entry(candidate.state.registers()).or_insert(candidate);
    }

    let mut distinct: Vec<_> = distinct.into_iter().map(|(_, c)| c).collect();

    for candidate in distinct.iter_mut() {
        candidate.validated = reproduces_all(candidate, samples)?;
    }

    match distinct.len() {
        0 => Err(A52Error::NoSolutionFound { hypotheses: 0 }),
        1 if distinct[0].validated => Ok(distinct.remove(0)),
        1 => Err(A52Error::NoSolutionFound { hypotheses: 1 }),
        _ => {
            distinct.sort_by_key(|c| c.hypothesis);
            warn!(candidates = distinct.len(), "samples disagree on the key");
            Err(A52Error::AmbiguousSolution(distinct))
        }
    }
}
