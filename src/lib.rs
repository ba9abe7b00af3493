//! The GSM A5/2 keystream generator and a key-recovery attack exploiting its clock control.
//!
//! `cipher` and `keystream` implement the generator. `attack` guesses the clock-control
//! register R4, solves a linearized equation system for the other three registers and reverses
//! the key setup. `orchestrator` runs the attack over one or more captured frames.

#[macro_use]
extern crate lazy_static;

pub mod attack;
pub mod cipher;
pub mod error;
pub mod gf2;
pub mod keystream;
pub mod orchestrator;
pub mod sample;
pub mod utility;

pub use crate::attack::{AttackConfig, AttackReport, ClockControlAttack, HypothesisOutcome,
                        KeyCandidate, Strategy};
pub use crate::cipher::{initialize, initialize_bytes, CipherState};
pub use crate::error::{A52Error, Result};
pub use crate::keystream::{generate, KeystreamSession};
pub use crate::orchestrator::AttackOrchestrator;
pub use crate::sample::ClockControlSample;
