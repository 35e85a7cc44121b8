//! Single-frame encode/decode
//!
//! # Frame layout (12 bytes, 23 steps)
//!
//! ```text
//! byte 0:      step[0] (high nibble) | header (low nibble)
//! bytes 1..11: two steps each, in stream order
//!              normal bytes:       (step[2i] << 4) | step[2i-1]
//!              bytes 2, 5, 8, 11:  (step[2i-1] << 4) | step[2i]
//! header:      bit-reversed gain exponent in bits 1..3, keep-going in bit 0
//! ```
//!
//! Every third body byte (`i % 3 == 2`) swaps its nibble pair. The hardware reads
//! the body bit-serially and this is the order it expects.

use crate::nibble::{
    header_bits, header_nibble, nibble_to_signed, pack_nibbles, parse_header_bits, split_byte,
};
use crate::{CodecError, FRAME_BYTES, FRAME_SAMPLES, RESERVED_GAIN, STEP_MAX, STEP_MIN};

/// Fields recovered from one 12-byte frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFields {
    /// Quantized steps in sample order
    pub steps: [i8; FRAME_SAMPLES],
    /// Gain exponent as stored (may be the reserved value 7)
    pub gain: u8,
    /// Whether the stream continues past this frame
    pub keep_going: bool,
}

impl FrameFields {
    /// Gain exponent actually applied when decoding
    ///
    /// The reserved value 7 marks special/silent frames and decodes as gain 0.
    #[inline]
    pub const fn effective_gain(&self) -> u8 {
        if self.gain == RESERVED_GAIN { 0 } else { self.gain }
    }
}

/// Result of quantizing one frame at a particular gain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Packed frame bytes
    pub bytes: [u8; FRAME_BYTES],
    /// Sum of squared reconstruction errors over the frame
    pub squared_error: i128,
    /// Reconstructed value after the last sample (next frame's initial state)
    pub final_state: i64,
    /// Quantized steps in sample order
    pub steps: [i8; FRAME_SAMPLES],
    /// Gain exponent used
    pub gain: u8,
}

/// Quantize 23 samples with a fixed gain exponent
///
/// Greedy per-sample delta quantization: each step is
/// `round((sample - cur) / 2^gain)` clamped to `-8..=7`, rounding half to even.
/// The running reconstruction `cur` starts at `initial_state` and is carried
/// in 64 bits, so inputs anywhere in the `i32` range cannot overflow it.
///
/// # Errors
/// Returns [`CodecError::InvalidGain`] if `gain` is not an encodable gain.
pub fn encode_frame_at_gain(
    samples: &[i32; FRAME_SAMPLES],
    gain: u8,
    initial_state: i64,
) -> Result<EncodedFrame, CodecError> {
    header_bits(gain, true)?;
    Ok(quantize(samples, gain, initial_state))
}

/// Unchecked [`encode_frame_at_gain`]. Callers guarantee `gain <= MAX_GAIN`.
pub(crate) fn quantize(samples: &[i32; FRAME_SAMPLES], gain: u8, initial_state: i64) -> EncodedFrame {
    let scale = 1i64 << gain;
    let mut cur = initial_state;
    let mut steps = [0i8; FRAME_SAMPLES];
    let mut squared_error = 0i128;

    for (step_out, &sample) in steps.iter_mut().zip(samples) {
        let delta = (i64::from(sample) - cur) as f64 / scale as f64;
        let step = (delta.round_ties_even() as i64).clamp(STEP_MIN.into(), STEP_MAX.into());

        cur += step * scale;
        *step_out = step as i8;

        let error = i128::from(i64::from(sample) - cur);
        squared_error += error * error;
    }

    EncodedFrame {
        bytes: pack_frame(&steps, header_nibble(gain, true)),
        squared_error,
        final_state: cur,
        steps,
        gain,
    }
}

/// Lay 23 steps and a header nibble out as a 12-byte frame
pub fn pack_frame(steps: &[i8; FRAME_SAMPLES], header: u8) -> [u8; FRAME_BYTES] {
    let mut bytes = [0u8; FRAME_BYTES];
    bytes[0] = (pack_nibbles(steps[0], 0) & 0xF0) | (header & 0xF);

    for (i, byte) in bytes.iter_mut().enumerate().skip(1) {
        let first = steps[2 * i - 1];
        let second = steps[2 * i];
        *byte = if i % 3 == 2 {
            pack_nibbles(first, second)
        } else {
            pack_nibbles(second, first)
        };
    }

    bytes
}

/// Unpack a 12-byte frame into its header fields and 23 steps
pub fn extract_frame_fields(frame: &[u8; FRAME_BYTES]) -> FrameFields {
    let mut steps = [0i8; FRAME_SAMPLES];

    let (step0, header) = split_byte(frame[0]);
    steps[0] = nibble_to_signed(step0);
    let (gain, keep_going) = parse_header_bits(header);

    for (i, &byte) in frame.iter().enumerate().skip(1) {
        let (high, low) = split_byte(byte);
        let (high, low) = (nibble_to_signed(high), nibble_to_signed(low));

        let (first, second) = if i % 3 == 2 { (high, low) } else { (low, high) };
        steps[2 * i - 1] = first;
        steps[2 * i] = second;
    }

    FrameFields {
        steps,
        gain,
        keep_going,
    }
}

/// Reconstruct 23 samples from frame fields
///
/// Values are never clamped; the reconstruction is integer accumulation in 64
/// bits starting from `initial_state`, saturating at the `i64` bounds. The last
/// returned value is the next frame's initial state.
pub fn decode_frame(fields: &FrameFields, initial_state: i64) -> [i64; FRAME_SAMPLES] {
    let scale = 1i64 << fields.effective_gain();
    let mut cur = initial_state;
    let mut samples = [0i64; FRAME_SAMPLES];

    for (out, &step) in samples.iter_mut().zip(&fields.steps) {
        cur = cur.saturating_add(i64::from(step) * scale);
        *out = cur;
    }

    samples
}
