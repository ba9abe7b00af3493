use proptest::prelude::*;

use super::*;
use crate::error::A52Error;

/// Key and frame of the GSM reference vector.
const REFERENCE_KEY: u64 = 0xffff_ffff_ffff_fc00;
const REFERENCE_FRAME: u32 = 0x21;

/// Generates arbitrary states respecting the register widths.
fn arbitrary_state() -> impl Strategy<Value = CipherState> {
    (any::<u32>(), any::<u32>(), any::<u32>(), any::<u32>()).prop_map(|(a, b, c, d)| {
        CipherState::from_registers([a & R1.mask(), b & R2.mask(), c & R3.mask(), d & R4.mask()])
            .unwrap()
    })
}

#[test]
fn reference_key_setup() {
    let state = initialize(REFERENCE_KEY, REFERENCE_FRAME).unwrap();

    assert_eq!([0x6ff45, 0x211400, 0x750232, 0x006ef], state.registers());
    assert_eq!(0, state.steps());
}

#[test]
fn byte_key_matches_integer_key() {
    let key = [0x00, 0xfc, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];

    assert_eq!(initialize(REFERENCE_KEY, REFERENCE_FRAME).unwrap(),
               initialize_bytes(&key, REFERENCE_FRAME).unwrap());
}

#[test]
fn malformed_input_is_rejected() {
    match initialize(0, 1 << 22) {
        Err(A52Error::InvalidInput(_)) => {}
        other => panic!("unexpected result {:?}", other),
    }

    assert!(initialize(0, MAX_FRAME).is_ok());
    assert!(initialize_bytes(&[0; 7], 0).is_err());
    assert!(initialize_bytes(&[0; 9], 0).is_err());
    assert!(CipherState::from_registers([1 << 19, 0, 0, 0]).is_err());
    assert!(CipherState::from_registers([0, 0, 0, 1 << 17]).is_err());
}

#[test]
fn force_bits_are_set() {
    for &(key, frame) in &[(0, 0), (REFERENCE_KEY, REFERENCE_FRAME), (!0, MAX_FRAME)] {
        let state = initialize(key, frame).unwrap();

        for (i, spec) in REGISTERS.iter().enumerate() {
            assert!(bit(state.register(i), spec.force_bit), "{} force bit", spec.name);
        }
    }
}

#[test]
fn clock_control_follows_r4_majority() {
    // R4 bits 10, 3, 7 = 1, 0, 0: majority 0, so R2 and R3 clock
    let control = ClockControl::from_r4(1 << 10);
    assert_eq!(ClockControl { r1: false, r2: true, r3: true }, control);

    // all equal: everything clocks
    let control = ClockControl::from_r4((1 << 10) | (1 << 3) | (1 << 7));
    assert_eq!(3, control.count());
}

#[test]
fn irregular_clock_moves_only_selected_registers() {
    let state = CipherState::from_registers([0x12345, 0x2abcde, 0x7fedcb, 1 << 3]).unwrap();
    let control = state.derive_clock_control_bits();
    let next = state.clock_irregular();

    assert_eq!(ClockControl { r1: true, r2: false, r3: true }, control);
    assert_eq!(R1.clock(0x12345), next.register(0));
    assert_eq!(0x2abcde, next.register(1));
    assert_eq!(R3.clock(0x7fedcb), next.register(2));
    assert_eq!(R4.clock(1 << 3), next.register(3));
    assert_eq!(1, next.steps());
}

#[test]
fn frame_difference_is_key_independent() {
    let difference = frame_difference(0x21, 0x1234).unwrap();

    for &key in &[0, REFERENCE_KEY, 0x0123_4567_89ab_cdef] {
        let a = initialize(key, 0x21).unwrap();
        let b = initialize(key, 0x1234).unwrap();

        assert_eq!(b, a.with_difference(&difference));
    }
}

#[test]
fn frame_numbers_wrap() {
    assert_eq!(0x22, frame_after(0x21, 1));
    assert_eq!(0, frame_after(MAX_FRAME, 1));
    assert_eq!(MAX_FRAME - 1, frame_after(MAX_FRAME, u32::MAX));
    assert_eq!(0x20, frame_after(0x21, u32::MAX));
}

proptest! {
    #[test]
    fn majority_clocking_invariant(state in arbitrary_state()) {
        let control = state.derive_clock_control_bits();
        let next = state.clock_irregular();

        prop_assert!(control.count() >= 2);
        prop_assert_eq!(next.register(3), R4.clock(state.register(3)));

        for i in 0..3 {
            if !control.clocks(i) {
                prop_assert_eq!(next.register(i), state.register(i));
            }
        }
    }

    #[test]
    fn transitions_respect_register_widths(state in arbitrary_state(), steps in 1usize..200) {
        let mut state = state;

        for _ in 0..steps {
            state = state.clock_irregular();

            for (i, spec) in REGISTERS.iter().enumerate() {
                prop_assert_eq!(0, state.register(i) & !spec.mask());
            }
        }

        prop_assert_eq!(steps as u64, state.steps());
    }

    #[test]
    fn key_setup_is_deterministic(key in any::<u64>(), frame in 0..=MAX_FRAME) {
        let a = initialize(key, frame).unwrap();
        let b = initialize(key, frame).unwrap();

        prop_assert_eq!(a, b);
        prop_assert_eq!(a.output_bit(), b.output_bit());
    }

    #[test]
    fn key_setup_is_linear_in_frame(key in any::<u64>(), frame_a in 0..=MAX_FRAME, frame_b in 0..=MAX_FRAME) {
        let a = initialize(key, frame_a).unwrap();
        let b = initialize(key, frame_b).unwrap();
        let difference = frame_difference(frame_a, frame_b).unwrap();

        prop_assert_eq!(b, a.with_difference(&difference));
    }
}
