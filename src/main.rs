use rand::Rng;
use std::fs;
use std::process;
use structopt::StructOpt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use a52crack::attack::{r4_to_hypothesis, AttackConfig, Strategy, NUM_HYPOTHESES};
use a52crack::cipher::{frame_after, initialize, MAX_FRAME};
use a52crack::keystream::KeystreamSession;
use a52crack::utility::{bits_from_str, bits_to_hex, bits_to_string};
use a52crack::{A52Error, AttackOrchestrator, ClockControlSample, Result};

mod options;

use crate::options::A52Options;

/// Keystream of key 0xfffffffffffffc00 and frame 0x21 from the GSM reference implementation.
const REFERENCE_DOWNLINK: &str = "f4512cac13593764460b722dadd500";
const REFERENCE_UPLINK: &str = "4800d4328e16a14dcd7b97222651";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let result = match A52Options::from_args() {
        A52Options::Keystream { key, frame, count, offset, hex } => {
            keystream(key, frame, count, offset, hex)
        },
        A52Options::Encrypt { key, frame, data } => encrypt(key, frame, &data),
        A52Options::Capture { key, frame, frames, bits, offset } => {
            capture(key, frame, frames, bits, offset)
        },
        A52Options::Attack { samples,
                             input,
                             strategy,
                             threads,
                             start,
                             end,
                             stop_at_first,
                             progress } => {
            let config = AttackConfig {
                hypotheses: start..end,
                threads,
                stop_at_first,
                strategy,
                progress,
            };

            read_samples(samples, input).and_then(|samples| attack(&samples, config))
        },
        A52Options::Selftest { window, threads } => selftest(window, threads),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            if let A52Error::AmbiguousSolution(ref candidates) = e {
                for candidate in candidates {
                    println!("candidate: {}", candidate);
                }
            }

            error!("{}", e);
            process::exit(1);
        }
    }
}

fn keystream(key: u64, frame: u32, count: usize, offset: usize, hex: bool) -> Result<bool> {
    let bits = KeystreamSession::for_frame(key, frame)?.keystream_at(offset, count);

    if hex {
        println!("{}", bits_to_hex(&bits));
    } else {
        println!("{}", bits_to_string(&bits));
    }

    Ok(true)
}

fn encrypt(key: u64, frame: u32, data: &str) -> Result<bool> {
    let mut bits = bits_from_str(data)?;

    KeystreamSession::for_frame(key, frame)?.apply(&mut bits);
    println!("{}", bits_to_string(&bits));

    Ok(true)
}

fn capture(key: Option<u64>,
           frame: Option<u32>,
           frames: u32,
           bits: usize,
           offset: usize)
           -> Result<bool> {
    let mut rng = rand::thread_rng();
    let key = key.unwrap_or_else(|| rng.gen());
    let first = frame.unwrap_or_else(|| rng.gen_range(0..=MAX_FRAME));

    info!(key = %format!("{:016x}", key), first, frames, "capturing samples");

    for i in 0..frames {
        let sample = ClockControlSample::capture(key, frame_after(first, i), offset, bits)?;
        println!("{}", sample);
    }

    Ok(true)
}

/// Collects samples from the command line and from an optional input file.
fn read_samples(samples: Vec<String>, input: Option<std::path::PathBuf>)
                -> Result<Vec<ClockControlSample>> {
    let mut lines = samples;

    if let Some(path) = input {
        let content = fs::read_to_string(&path)?;

        lines.extend(content.lines()
                            .map(str::trim)
                            .filter(|l| !l.is_empty() && !l.starts_with('#'))
                            .map(String::from));
    }

    lines.iter().map(|l| l.parse()).collect()
}

fn attack(samples: &[ClockControlSample], config: AttackConfig) -> Result<bool> {
    let candidate = AttackOrchestrator::new(config).recover_key(samples)?;

    match candidate.key {
        Some(key) => println!("key: {:016x}", key),
        None => println!("key: not reachable by the key setup"),
    }

    println!("state: {} (frame {:#x})", candidate.state, candidate.frame);

    Ok(true)
}

/// Checks the reference keystream and attacks a random key.
fn selftest(window: usize, threads: usize) -> Result<bool> {
    let session = KeystreamSession::for_frame(0xffff_ffff_ffff_fc00, 0x21)?;
    let (downlink, uplink) = session.bursts();
    let vectors = bits_to_hex(&downlink) == REFERENCE_DOWNLINK
                  && bits_to_hex(&uplink).starts_with(REFERENCE_UPLINK);

    println!("reference keystream: {}", if vectors { "ok" } else { "FAILED" });

    let mut rng = rand::thread_rng();
    let key = rng.gen::<u64>();
    let first = rng.gen_range(0..=MAX_FRAME - 3);
    let samples = (0..4).map(|i| ClockControlSample::capture(key, first + i, 0, 114))
                        .collect::<Result<Vec<_>>>()?;

    // Search only near the correct hypothesis
    let hypothesis = r4_to_hypothesis(initialize(key, first)?.register(3)).unwrap_or(0);
    let low = hypothesis.saturating_sub(window / 2);
    let config = AttackConfig {
        hypotheses: low..(low + window.max(1)).min(NUM_HYPOTHESES),
        threads,
        strategy: Strategy::Joint,
        ..AttackConfig::default()
    };

    let recovered = AttackOrchestrator::new(config).recover_key(&samples)?;
    let attack = recovered.key == Some(key);

    println!("key recovery: {} (key {:016x}, frames {:#x}..{:#x})",
             if attack { "ok" } else { "FAILED" }, key, first, first + 3);

    Ok(vectors && attack)
}
