//! Round-trip properties of the stream codec
//!
//! The encoder is greedy, so the error bound only holds while the signal moves
//! no faster than the largest step at the chosen gain.

use proptest::prelude::*;
use spana_codec::{Decoder, Encoder, FRAME_SAMPLES, MAX_GAIN, STEP_MAX};

/// Random walk whose per-sample slew never exceeds `limit`
fn bounded_walk(limit: i32) -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(-limit..=limit, 1..300).prop_map(|deltas| {
        deltas
            .into_iter()
            .scan(0i32, |level, delta| {
                *level += delta;
                Some(*level)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn fixed_gain_error_is_within_half_a_step(
        (gain, samples) in (0..=MAX_GAIN).prop_flat_map(|gain| {
            (Just(gain), bounded_walk(STEP_MAX as i32 * (1 << gain)))
        })
    ) {
        let encoded = Encoder::new().encode_fully(&samples, Some(gain)).unwrap();
        let decoded = Decoder::new().decode_fully(&encoded);

        prop_assert_eq!(decoded.len(), samples.len().div_ceil(FRAME_SAMPLES) * FRAME_SAMPLES);

        let bound = (1 << gain) / 2;
        for (i, (original, reconstructed)) in samples.iter().zip(&decoded).enumerate() {
            prop_assert!(
                (i64::from(*original) - reconstructed).abs() <= bound,
                "sample {} off by {} at gain {}",
                i,
                i64::from(*original) - reconstructed,
                gain
            );
        }
    }

    #[test]
    fn slow_signals_reconstruct_exactly(
        samples in bounded_walk(STEP_MAX as i32)
            .prop_filter("needs one whole frame", |s| s.len() >= FRAME_SAMPLES)
            .prop_map(|mut s| {
                // zero padding of a partial frame could pull the gain choice away from 0
                s.truncate(s.len() / FRAME_SAMPLES * FRAME_SAMPLES);
                s
            })
    ) {
        let encoded = Encoder::new().encode_fully(&samples, None).unwrap();
        let decoded = Decoder::new().decode_fully(&encoded);

        let expected: Vec<i64> = samples.iter().copied().map(i64::from).collect();
        prop_assert_eq!(&decoded[..samples.len()], &expected[..]);
    }

    #[test]
    fn encoder_and_decoder_agree_on_continuity(samples in bounded_walk(300)) {
        let mut encoder = Encoder::new();
        let encoded = encoder.encode_fully(&samples, None).unwrap();

        let mut decoder = Decoder::new();
        let decoded = decoder.decode_fully(&encoded);

        prop_assert_eq!(decoded.last().copied(), Some(encoder.state()));
        prop_assert_eq!(decoder.continuity(), encoder.state());
    }
}

#[test]
fn test_two_streams_do_not_interfere() {
    let a: Vec<i32> = (0..120).map(|i| (i * 9) % 250 - 125).collect();
    let b: Vec<i32> = (0..120).map(|i| 200 - (i * 4) % 400).collect();

    let mut enc_a = Encoder::new();
    let mut enc_b = Encoder::new();

    // Interleave frame by frame; each encoder only sees its own state
    let mut interleaved_a = Vec::new();
    let mut interleaved_b = Vec::new();
    for (chunk_a, chunk_b) in a.chunks(FRAME_SAMPLES).zip(b.chunks(FRAME_SAMPLES)) {
        interleaved_a.extend(enc_a.encode_frame(chunk_a, None).unwrap().bytes);
        interleaved_b.extend(enc_b.encode_frame(chunk_b, None).unwrap().bytes);
    }

    assert_eq!(interleaved_a, Encoder::new().encode_fully(&a, None).unwrap());
    assert_eq!(interleaved_b, Encoder::new().encode_fully(&b, None).unwrap());
}
