//! Error type shared by the cipher, the attack and the command line.

use thiserror::Error;

use crate::attack::KeyCandidate;

/// Failures reported by the library.
#[derive(Debug, Error)]
pub enum A52Error {
    /// A key, frame number or sample that does not have the required shape.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Too little keystream to make the linearized system determined.
    #[error("insufficient keystream: {available} bits available, at least {required} needed")]
    InsufficientData { available: usize, required: usize },

    /// No R4 hypothesis survived validation. Usually a corrupted capture.
    #[error("no solution found after {hypotheses} hypotheses")]
    NoSolutionFound { hypotheses: usize },

    /// More than one candidate reproduces the captured keystream.
    #[error("{} candidates reproduce the captured keystream", .0.len())]
    AmbiguousSolution(Vec<KeyCandidate>),

    /// Reading a sample file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, A52Error>;
