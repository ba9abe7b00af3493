//! Reversal of the key setup.
//!
//! Without the force bits the key setup is linear in the key and the frame number, so the
//! post-setup state is `M * key + S(frame)` for a fixed 77 x 64 matrix `M`. `M` has full column
//! rank, so a state determines at most one key.

use crate::cipher::{key_setup, CipherState, KEY_BITS, REGISTERS};
use crate::gf2::{BitMatrix, BitVector, Solution};

lazy_static! {
    /// Column `k` holds the post-setup state bits produced by key bit `k` alone.
    static ref KEY_SETUP: BitMatrix = key_setup_matrix();
}

/// Lists the non-force bits of the four registers, R1 first.
fn state_bits(registers: &[u32; 4]) -> Vec<bool> {
    REGISTERS.iter()
             .zip(registers.iter())
             .flat_map(|(spec, &value)| {
                 (0..spec.width).filter(move |&p| p != spec.force_bit)
                                .map(move |p| (value >> p) & 1 == 1)
             })
             .collect()
}

fn key_setup_matrix() -> BitMatrix {
    let columns: Vec<_> = (0..KEY_BITS).map(|k| state_bits(&key_setup(1 << k, 0).registers()))
                                       .collect();
    let mut matrix = BitMatrix::zeros(columns[0].len(), KEY_BITS);

    for (k, column) in columns.iter().enumerate() {
        for (i, &b) in column.iter().enumerate() {
            matrix.set(i, k, b);
        }
    }

    matrix
}

/// Returns the rank of the linear map from key to post-setup state.
pub fn key_setup_rank() -> usize {
    KEY_SETUP.rank()
}

/**
Finds the key whose key setup for `frame` produces `state`. Returns `None` if no key does.

state   A post-setup state. The step counter is ignored.
frame   The frame number of the state. Must fit in 22 bits.
*/
pub fn recover_key(state: &CipherState, frame: u32) -> Option<u64> {
    let frame_part = key_setup(0, frame).registers();
    let mut target = state.registers();

    for (t, f) in target.iter_mut().zip(frame_part.iter()) {
        *t ^= f;
    }

    let target = BitVector::from_bits(&state_bits(&target));
    let x = match KEY_SETUP.solve(&target) {
        Solution::Unique(x) => x,
        _ => return None,
    };

    if KEY_SETUP.mul_vec(&x) != target {
        return None;
    }

    let key = (0..KEY_BITS).fold(0u64, |acc, k| acc | ((x.get(k) as u64) << k));

    // The force bits are not covered by the equations
    if key_setup(key, frame).registers() == state.registers() {
        Some(key)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{initialize, MAX_FRAME};
    use proptest::prelude::*;

    #[test]
    fn key_setup_is_injective() {
        assert_eq!(77, KEY_SETUP.num_rows());
        assert_eq!(KEY_BITS, key_setup_rank());
    }

    #[test]
    fn key_setup_matrix_maps_key_to_state() {
        let key = 0x0123_4567_89ab_cdef_u64;
        let x = BitVector::from_bits(&(0..KEY_BITS).map(|k| (key >> k) & 1 == 1).collect::<Vec<_>>());
        let expected = state_bits(&key_setup(key, 0).registers());

        assert_eq!(BitVector::from_bits(&expected), KEY_SETUP.mul_vec(&x));
    }

    #[test]
    fn reference_state() {
        let state = CipherState::from_registers([0x6ff45, 0x211400, 0x750232, 0x006ef]).unwrap();

        assert_eq!(Some(0xffff_ffff_ffff_fc00), recover_key(&state, 0x21));
    }

    #[test]
    fn unreachable_state() {
        // The reference state with a single bit of R4 flipped
        let state = CipherState::from_registers([0x6ff45, 0x211400, 0x750232, 0x006ee]).unwrap();

        assert_eq!(None, recover_key(&state, 0x21));
    }

    #[test]
    fn recover_key_inverts_key_setup() {
        let config = ProptestConfig {
            cases: 64,
            .. ProptestConfig::default()
        };

        proptest!(config, |(key in any::<u64>(), frame in 0..=MAX_FRAME)| {
            let state = initialize(key, frame).unwrap();

            prop_assert_eq!(Some(key), recover_key(&state, frame));
        })
    }
}
