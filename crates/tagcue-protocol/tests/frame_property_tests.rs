//! Property-based tests for link frame encoding and decoding.
//!
//! These tests use proptest to generate arbitrary command payloads and
//! verify the framing invariants hold across the full parameter space.

use proptest::prelude::*;
use tagcue_core::constants::{DIRECTION_HOST_TO_READER, DIRECTION_READER_TO_HOST, FRAME_OVERHEAD};
use tagcue_protocol::{Command, build_frame, frame, parse_frame};

/// Strategy for generating response payloads up to the largest listing size.
fn arbitrary_payload() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=32)
}

/// Strategy for generating the modeled command set.
fn arbitrary_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::GetFirmwareVersion),
        Just(Command::SamConfiguration),
        Just(Command::InListPassiveTarget),
    ]
}

proptest! {
    /// Property: any payload survives a build/parse round trip intact.
    #[test]
    fn prop_frame_round_trip(payload in arbitrary_payload(), code in any::<u8>()) {
        let mut body = vec![DIRECTION_READER_TO_HOST, code];
        body.extend_from_slice(&payload);

        let wire = build_frame(&body);
        prop_assert_eq!(wire.len(), body.len() + FRAME_OVERHEAD);

        let parsed = parse_frame(&wire).unwrap();
        prop_assert_eq!(parsed.direction, DIRECTION_READER_TO_HOST);
        prop_assert_eq!(parsed.code, code);
        prop_assert_eq!(parsed.payload.as_ref(), payload.as_slice());
    }

    /// Property: the length and data checksums always cancel their sums
    /// mod 256, whatever the payload.
    #[test]
    fn prop_checksums_cancel(payload in arbitrary_payload()) {
        let mut body = vec![DIRECTION_HOST_TO_READER, 0x4A];
        body.extend_from_slice(&payload);
        let wire = build_frame(&body);

        // LEN at index 3, LCS at 4.
        let len_sum = wire[3] as u32 + wire[4] as u32;
        prop_assert_eq!(len_sum & 0xFF, 0);

        // Body plus DCS sums to zero.
        let body_end = 5 + body.len();
        let data_sum: u32 = wire[5..=body_end].iter().map(|&b| b as u32).sum();
        prop_assert_eq!(data_sum & 0xFF, 0);
    }

    /// Property: command frames always carry the host direction byte and
    /// the command's wire code.
    #[test]
    fn prop_command_frame_structure(
        command in arbitrary_command(),
        params in prop::collection::vec(any::<u8>(), 0..=8),
    ) {
        let wire = frame::build_command_frame(command, &params);
        let parsed = parse_frame(&wire).unwrap();

        prop_assert_eq!(parsed.direction, DIRECTION_HOST_TO_READER);
        prop_assert_eq!(parsed.code, command.code());
        prop_assert_eq!(parsed.payload.as_ref(), params.as_slice());
    }

    /// Property: flipping any single byte of a frame never yields a parse
    /// that silently changes the payload. A flip either still parses to the
    /// same body (flips in ignored trailing bytes) or fails.
    #[test]
    fn prop_corruption_detected(
        payload in prop::collection::vec(any::<u8>(), 0..=16),
        flip_index in any::<prop::sample::Index>(),
        flip_bit in 0u8..8,
    ) {
        let mut body = vec![DIRECTION_READER_TO_HOST, 0x4B];
        body.extend_from_slice(&payload);
        let wire = build_frame(&body);

        let mut corrupted = wire.to_vec();
        let index = flip_index.index(corrupted.len());
        corrupted[index] ^= 1 << flip_bit;

        if let Ok(parsed) = parse_frame(&corrupted) {
            prop_assert_eq!(parsed.payload.as_ref(), payload.as_slice());
            prop_assert_eq!(parsed.code, 0x4B);
        }
    }
}
