//! Keystream generation on top of the cipher engine.

use crate::cipher::{self, CipherState};
use crate::error::Result;

/// Number of irregular clocks after the key setup whose output is discarded.
pub const MIXING_CLOCKS: usize = 99;

/// Number of keystream bits produced per frame.
pub const FRAME_KEYSTREAM_BITS: usize = 228;

/// Number of keystream bits per burst. The first burst encrypts the downlink, the second the
/// uplink.
pub const BURST_BITS: usize = 114;

/// A lazy, finite sequence of keystream bits. Each item clocks the state irregularly and then
/// reads the output bit. Cloning the iterator restarts from the same point.
#[derive(Clone, Debug)]
pub struct Keystream {
    state: CipherState,
    remaining: usize,
}

impl Keystream {
    /// Returns the state after the bits produced so far.
    pub fn state(&self) -> CipherState {
        self.state
    }
}

impl Iterator for Keystream {
    type Item = bool;

    #[inline(always)]
    fn next(&mut self) -> Option<bool> {
        if self.remaining == 0 {
            return None;
        }

        self.remaining -= 1;
        self.state = self.state.clock_irregular();
        Some(self.state.output_bit())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Keystream {}

/// Produces `count` keystream bits starting from `state`.
pub fn generate(state: CipherState, count: usize) -> Keystream {
    Keystream { state, remaining: count }
}

/// Applies `count` irregular clocks, discarding the output.
pub fn advance(state: CipherState, count: usize) -> CipherState {
    (0..count).fold(state, |s, _| s.clock_irregular())
}

/**
The keystream of one frame, positioned right after the mixing phase.

start   The state after the key setup and the 99 mixing clocks. Bit `i` of the frame keystream
        is the output after `i + 1` further irregular clocks.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeystreamSession {
    start: CipherState,
}

impl KeystreamSession {
    /// Runs the mixing phase on a state freshly returned by the key setup.
    pub fn new(state: CipherState) -> KeystreamSession {
        KeystreamSession {
            start: advance(state, MIXING_CLOCKS),
        }
    }

    /// Runs the key setup and the mixing phase for `key` and `frame`.
    pub fn for_frame(key: u64, frame: u32) -> Result<KeystreamSession> {
        Ok(KeystreamSession::new(cipher::initialize(key, frame)?))
    }

    /// Returns the state after the mixing phase.
    pub fn start(&self) -> CipherState {
        self.start
    }

    /// Returns the first `count` keystream bits.
    pub fn keystream(&self, count: usize) -> Vec<bool> {
        generate(self.start, count).collect()
    }

    /// Returns `count` keystream bits starting at bit `offset`.
    pub fn keystream_at(&self, offset: usize, count: usize) -> Vec<bool> {
        generate(advance(self.start, offset), count).collect()
    }

    /// Returns the downlink and uplink bursts of the frame.
    pub fn bursts(&self) -> (Vec<bool>, Vec<bool>) {
        let mut downlink = self.keystream(FRAME_KEYSTREAM_BITS);
        let uplink = downlink.split_off(BURST_BITS);

        (downlink, uplink)
    }

    /// Encrypts or decrypts `data` in place by adding keystream bits from the start of the
    /// frame keystream.
    pub fn apply(&self, data: &mut [bool]) {
        let len = data.len();

        for (d, k) in data.iter_mut().zip(generate(self.start, len)) {
            *d ^= k;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utility::{bits_from_str, bits_to_hex, bits_to_string};
    use proptest::prelude::*;

    const KEY: u64 = 0xffff_ffff_ffff_fc00;
    const FRAME: u32 = 0x21;

    const DOWNLINK: &str = "111101000101000100101100101011000001001101011001001101110110010001000110\
                            000010110111001000101101101011011101010100";

    #[test]
    fn reference_downlink() {
        let session = KeystreamSession::for_frame(KEY, FRAME).unwrap();
        let (downlink, uplink) = session.bursts();

        assert_eq!(BURST_BITS, downlink.len());
        assert_eq!(BURST_BITS, uplink.len());
        assert_eq!(DOWNLINK, bits_to_string(&downlink));
        assert_eq!("f4512cac13593764460b722dadd500", bits_to_hex(&downlink));
    }

    #[test]
    fn reference_uplink() {
        let session = KeystreamSession::for_frame(KEY, FRAME).unwrap();
        let uplink = session.keystream_at(BURST_BITS, BURST_BITS);

        assert_eq!("4800d4328e16a14dcd7b97222651", &bits_to_hex(&uplink)[..28]);
        assert_eq!(uplink, session.bursts().1);
    }

    #[test]
    fn apply_is_involution() {
        let session = KeystreamSession::for_frame(KEY, FRAME).unwrap();
        let plain = bits_from_str("0000000000111111111101010101").unwrap();
        let mut data = plain.clone();

        session.apply(&mut data);
        assert_ne!(plain, data);

        // Encrypting zeros exposes the keystream
        let zeros: Vec<_> = data.iter().zip(plain.iter()).map(|(a, b)| a ^ b).collect();
        assert_eq!(&bits_from_str(DOWNLINK).unwrap()[..plain.len()], &zeros[..]);

        session.apply(&mut data);
        assert_eq!(plain, data);
    }

    #[test]
    fn apply_covers_whole_slice() {
        let session = KeystreamSession::for_frame(KEY, FRAME).unwrap();
        let mut data = vec![false; FRAME_KEYSTREAM_BITS];

        session.apply(&mut data);
        assert_eq!(session.keystream(FRAME_KEYSTREAM_BITS), data);

        let mut empty: Vec<bool> = vec![];
        session.apply(&mut empty);
        assert!(empty.is_empty());
    }

    #[test]
    fn generator_is_restartable() {
        let state = cipher::initialize(KEY, FRAME).unwrap();
        let keystream = generate(state, 50);
        let first: Vec<_> = keystream.clone().collect();
        let second: Vec<_> = keystream.collect();

        assert_eq!(50, first.len());
        assert_eq!(first, second);
        assert_eq!(0, generate(state, 0).count());
    }

    #[test]
    fn generator_tracks_steps() {
        let state = cipher::initialize(KEY, FRAME).unwrap();
        let mut keystream = generate(state, 10);

        keystream.by_ref().for_each(drop);
        assert_eq!(10, keystream.state().steps());
        assert_eq!(MIXING_CLOCKS as u64, KeystreamSession::new(state).start().steps());
    }

    proptest! {
        #[test]
        fn keystream_is_deterministic(key in any::<u64>(), frame in 0..=cipher::MAX_FRAME) {
            let a = KeystreamSession::for_frame(key, frame).unwrap();
            let b = KeystreamSession::for_frame(key, frame).unwrap();

            prop_assert_eq!(a.keystream(FRAME_KEYSTREAM_BITS), b.keystream(FRAME_KEYSTREAM_BITS));
        }

        #[test]
        fn offsets_are_consistent(key in any::<u64>(), offset in 0usize..200, count in 0usize..64) {
            let session = KeystreamSession::for_frame(key, 7).unwrap();
            let full = session.keystream(offset + count);

            prop_assert_eq!(&full[offset..], &session.keystream_at(offset, count)[..]);
        }
    }
}
