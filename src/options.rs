use std::path::PathBuf;
use structopt::StructOpt;

use a52crack::attack::Strategy;
use a52crack::cipher::check_frame;
use a52crack::utility::parse_number;
use a52crack::Result;

/// Parses a frame number, decimal or `0x` hex, of at most 22 bits.
fn parse_frame(s: &str) -> Result<u32> {
    let frame = parse_number(s)?;

    check_frame(frame.min(u64::from(u32::MAX)) as u32)
}

#[derive(Clone, StructOpt)]
#[structopt(name = "a52crack", about = "Generate GSM A5/2 keystream and recover keys from it.")]
pub enum A52Options {
    #[structopt(name = "keystream")]
    Keystream {
        #[structopt(short = "k", long = "key", parse(try_from_str = parse_number))]
        /**
        The 64-bit session key, decimal or 0x-prefixed hex. Key bit 0 is loaded first.
        */
        key: u64,

        #[structopt(short = "f", long = "frame", parse(try_from_str = parse_frame))]
        /**
        The 22-bit frame number.
        */
        frame: u32,

        #[structopt(short = "n", long = "count", default_value = "228")]
        /**
        Number of keystream bits to print. The first 114 bits encrypt the downlink, the next 114 the uplink.
        */
        count: usize,

        #[structopt(short = "o", long = "offset", default_value = "0")]
        /**
        Number of keystream bits to skip.
        */
        offset: usize,

        #[structopt(short = "x", long = "hex")]
        /**
        Print the keystream as packed hex, first bit in the most significant bit of each byte.
        */
        hex: bool,
    },

    #[structopt(name = "encrypt")]
    Encrypt {
        #[structopt(short = "k", long = "key", parse(try_from_str = parse_number))]
        /**
        The 64-bit session key.
        */
        key: u64,

        #[structopt(short = "f", long = "frame", parse(try_from_str = parse_frame))]
        /**
        The 22-bit frame number.
        */
        frame: u32,

        /**
        The bits to encrypt or decrypt, as a string of 0 and 1.
        */
        data: String,
    },

    #[structopt(name = "capture")]
    Capture {
        #[structopt(short = "k", long = "key", parse(try_from_str = parse_number))]
        /**
        The key to generate samples for. A random key is used if none is given.
        */
        key: Option<u64>,

        #[structopt(short = "f", long = "frame", parse(try_from_str = parse_frame))]
        /**
        Frame number of the first sample. Subsequent samples use the following frames. Random if not given.
        */
        frame: Option<u32>,

        #[structopt(short = "n", long = "frames", default_value = "4")]
        /**
        Number of frames to capture.
        */
        frames: u32,

        #[structopt(short = "b", long = "bits", default_value = "114")]
        /**
        Number of keystream bits captured per frame.
        */
        bits: usize,

        #[structopt(short = "o", long = "offset", default_value = "0")]
        /**
        Position of the first captured bit in each frame keystream.
        */
        offset: usize,
    },

    #[structopt(name = "attack")]
    Attack {
        /**
        Captured samples, each as <frame>:<offset>:<bits>. All samples must come from the same key.
        */
        samples: Vec<String>,

        #[structopt(short = "i", long = "input", parse(from_os_str))]
        /**
        File with one sample per line, in addition to the samples given as arguments. Empty lines and lines starting with # are skipped.
        */
        input: Option<PathBuf>,

        #[structopt(short = "s", long = "strategy", default_value = "joint")]
        /**
        How several samples are combined. Currently supported are:
        joint, independent
        */
        strategy: Strategy,

        #[structopt(short = "t", long = "threads", default_value = "0")]
        /**
        Number of worker threads. 0 uses one thread per CPU.
        */
        threads: usize,

        #[structopt(long = "start", default_value = "0")]
        /**
        First R4 hypothesis to try.
        */
        start: usize,

        #[structopt(long = "end", default_value = "65536")]
        /**
        One past the last R4 hypothesis to try.
        */
        end: usize,

        #[structopt(long = "first")]
        /**
        Stop as soon as one hypothesis reproduces the keystream, instead of searching all of them.
        */
        stop_at_first: bool,

        #[structopt(short = "p", long = "progress")]
        /**
        Print a progress bar.
        */
        progress: bool,
    },

    #[structopt(name = "selftest")]
    Selftest {
        #[structopt(short = "w", long = "window", default_value = "64")]
        /**
        Number of R4 hypotheses searched around the correct one when attacking a random key.
        */
        window: usize,

        #[structopt(short = "t", long = "threads", default_value = "0")]
        /**
        Number of worker threads. 0 uses one thread per CPU.
        */
        threads: usize,
    },
}
