//! Spana codec: adaptive delta speech codec for the talking-toy flash format
//!
//! **This is a pure codec** - it converts PCM samples to and from the frame
//! bitstream and nothing else. Where a sound lives inside a flash image is the
//! business of `spana-image`'s offset table.
//!
//! # Frame Format
//!
//! ```text
//! 12 bytes per frame, 23 samples per frame, 4 bits per sample
//!
//! byte 0 high nibble: step[0]
//! byte 0 low nibble:  header = reverse3(gain) << 1 | keep_going
//! bytes 1..11:        steps 1..22, two per byte, pair swapped on bytes 2/5/8/11
//! ```
//!
//! Each step is a signed 4-bit value in `-8..=7`. The decoder reconstructs
//! `cur += step << gain` with `cur` carried across frames, starting at 0.
//! Input samples are `i32`; reconstructed samples are `i64`.
//!
//! | Gain exponent | Step size | Notes |
//! |---------------|-----------|-------|
//! | 0..=6         | `2^g`     | chosen per frame by the encoder |
//! | 7             | 1         | reserved sentinel, decode only |
//!
//! # Compression
//!
//! 23 samples in 12 bytes: about 3.8:1 against 16-bit PCM.
//!
//! # Usage
//!
//! ```
//! use spana_codec::{Decoder, Encoder};
//!
//! let samples: Vec<i32> = (0..100).map(|i| (i % 20) * 10 - 100).collect();
//! let encoded = Encoder::new().encode_fully(&samples, None).unwrap();
//! assert_eq!(encoded.len(), 5 * 12);
//!
//! let decoded = Decoder::new().decode_fully(&encoded);
//! assert_eq!(decoded.len(), 5 * 23);
//! ```

mod decode;
mod encode;
mod frame;
mod nibble;

pub use decode::{
    DecodeFrames, Decoder, DecoderState, STOP_RUN_AFTER_SPEECH, STOP_RUN_WITHOUT_SPEECH, decode,
};
pub use encode::{EncodeFrames, Encoder, encode};
pub use frame::{
    EncodedFrame, FrameFields, decode_frame, encode_frame_at_gain, extract_frame_fields,
    pack_frame,
};
pub use nibble::{
    header_bits, nibble_to_signed, pack_nibbles, parse_header_bits, reverse_3_bits,
    signed_to_nibble, split_byte,
};

// =============================================================================
// Constants
// =============================================================================

/// Samples per frame
pub const FRAME_SAMPLES: usize = 23;

/// Bytes per frame
pub const FRAME_BYTES: usize = 12;

/// Largest gain exponent the encoder will choose
pub const MAX_GAIN: u8 = 6;

/// Reserved gain exponent, decoded as gain 0
pub const RESERVED_GAIN: u8 = 7;

/// Smallest quantized step
pub const STEP_MIN: i8 = -8;

/// Largest quantized step
pub const STEP_MAX: i8 = 7;

/// Absolute peak that source audio is scaled to before encoding
pub const ENCODE_PEAK: i32 = 450;

// =============================================================================
// Error Type
// =============================================================================

/// Precondition violations. These signal integration bugs, not bad data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Gain exponent outside the encodable range 0-6
    #[error("invalid gain exponent {0} (must be 0-6)")]
    InvalidGain(u8),
    /// More samples than fit in one frame
    #[error("frame holds at most 23 samples, got {0}")]
    FrameTooLong(usize),
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Prepare source PCM for encoding
///
/// Prepends one zero sample (the stream starts from a continuity state of 0)
/// and rescales so the absolute peak equals `peak`, rounding half to even.
/// Silent input is returned as zeros.
pub fn normalize_peak(samples: &[i32], peak: i32) -> Vec<i32> {
    let max_abs = samples.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);

    let mut output = Vec::with_capacity(samples.len() + 1);
    output.push(0);

    if max_abs == 0 {
        output.resize(samples.len() + 1, 0);
        return output;
    }

    let scale = peak as f64 / max_abs as f64;
    output.extend(
        samples
            .iter()
            .map(|&s| (s as f64 * scale).round_ties_even() as i32),
    );
    output
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_sine(freq: f32, sample_rate: u32, duration_sec: f32) -> Vec<i32> {
        let num_samples = (sample_rate as f32 * duration_sec) as usize;
        (0..num_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (f32::sin(t * freq * std::f32::consts::TAU) * 400.0) as i32
            })
            .collect()
    }

    #[test]
    fn test_roundtrip_sine() {
        let original = generate_sine(440.0, 10_000, 1.0);
        let encoded = encode(&original, None).unwrap();
        let decoded = decode(&encoded);

        assert_eq!(decoded.len(), original.len().div_ceil(FRAME_SAMPLES) * FRAME_SAMPLES);

        let max_error = original
            .iter()
            .zip(&decoded)
            .map(|(&a, &b)| (i64::from(a) - b).abs())
            .max()
            .unwrap_or(0);
        assert!(max_error <= 32, "Sine max error too high: {}", max_error);
    }

    #[test]
    fn test_roundtrip_silence() {
        let original = vec![0i32; 10_000];
        let decoded = decode(&encode(&original, None).unwrap());

        assert!(decoded.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_roundtrip_preserves_length() {
        for len in [
            1,
            22,
            FRAME_SAMPLES,
            FRAME_SAMPLES + 1,
            FRAME_SAMPLES * 2,
            1000,
        ] {
            let original: Vec<i32> = (0..len).map(|i| (i as i32 * 7) % 100).collect();
            let decoded = decode(&encode(&original, None).unwrap());

            assert_eq!(
                decoded.len(),
                len.div_ceil(FRAME_SAMPLES) * FRAME_SAMPLES,
                "Length mismatch for {} samples",
                len
            );
        }
    }

    #[test]
    fn test_compression_ratio() {
        let original = generate_sine(440.0, 10_000, 10.0);
        let encoded = encode(&original, None).unwrap();

        let pcm_size = original.len() * 2;
        let ratio = pcm_size as f64 / encoded.len() as f64;

        assert!(
            (3.7..3.9).contains(&ratio),
            "Compression ratio off: {:.2}:1 (expected ~3.83:1)",
            ratio
        );
    }

    #[test]
    fn test_normalize_peak() {
        let normalized = normalize_peak(&[100, -200, 50], ENCODE_PEAK);
        assert_eq!(normalized, vec![0, 225, -450, 112]);
    }

    #[test]
    fn test_normalize_silence() {
        assert_eq!(normalize_peak(&[0, 0], ENCODE_PEAK), vec![0, 0, 0]);
        assert_eq!(normalize_peak(&[], ENCODE_PEAK), vec![0]);
    }
}
