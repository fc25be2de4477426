//! Property tests for the frame check byte.

use proptest::prelude::*;

use scanhead_control::crc8;

proptest! {
    /// Recomputing the check byte over a frame body always matches the
    /// trailer appended to it.
    #[test]
    fn crc_trailer_round_trip(body in proptest::collection::vec(any::<u8>(), 0..64)) {
        let crc = crc8(&body, 0);
        let mut frame = body;
        frame.push(crc);

        let trailer = frame[frame.len() - 1];
        prop_assert_eq!(crc8(&frame[..frame.len() - 1], 0), trailer);
    }

    /// Any single-bit corruption changes the check byte.
    #[test]
    fn crc_detects_single_bit_flips(
        body in proptest::collection::vec(any::<u8>(), 1..32),
        index in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let index = index.index(body.len());
        let reference = crc8(&body, 0);

        let mut corrupted = body;
        corrupted[index] ^= 1 << bit;
        prop_assert_ne!(crc8(&corrupted, 0), reference);
    }

    /// The seed parameter chains partial computations.
    #[test]
    fn crc_seed_chains_partial_frames(
        head in proptest::collection::vec(any::<u8>(), 0..32),
        tail in proptest::collection::vec(any::<u8>(), 0..32),
    ) {
        let mut whole = head.clone();
        whole.extend_from_slice(&tail);

        prop_assert_eq!(crc8(&whole, 0), crc8(&tail, crc8(&head, 0)));
    }
}
