//! Stream encoder
//!
//! Drives the frame quantizer across a whole sample sequence. The encoder owns
//! the continuity state, so each independent stream needs its own [`Encoder`].

use crate::frame::{EncodedFrame, quantize};
use crate::nibble::header_bits;
use crate::{CodecError, FRAME_BYTES, FRAME_SAMPLES, MAX_GAIN};

/// Stateful stream encoder
///
/// The continuity state starts at 0 and is carried from frame to frame.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    state: i64,
}

impl Encoder {
    /// Create an encoder at the start of a stream
    #[must_use]
    pub fn new() -> Self {
        Self { state: 0 }
    }

    /// Current continuity state (last reconstructed sample)
    #[inline]
    pub fn state(&self) -> i64 {
        self.state
    }

    /// Encode one frame of up to 23 samples
    ///
    /// Short frames are padded with zero samples. With `fixed_gain = None` every
    /// gain in `0..=6` is tried and the smallest squared error wins; ties go to
    /// the lowest gain. The winner's final reconstruction becomes the state for
    /// the next frame.
    ///
    /// # Errors
    /// [`CodecError::FrameTooLong`] for more than 23 samples,
    /// [`CodecError::InvalidGain`] for a fixed gain above 6.
    pub fn encode_frame(
        &mut self,
        samples: &[i32],
        fixed_gain: Option<u8>,
    ) -> Result<EncodedFrame, CodecError> {
        if samples.len() > FRAME_SAMPLES {
            return Err(CodecError::FrameTooLong(samples.len()));
        }
        if let Some(gain) = fixed_gain {
            header_bits(gain, true)?;
        }
        Ok(self.encode_window(&pad_frame(samples), fixed_gain))
    }

    /// Lazily encode a sample sequence into 12-byte frames
    ///
    /// The input is treated as padded with zeros to a multiple of 23. The
    /// iterator borrows the encoder, so the continuity state advances as frames
    /// are pulled.
    ///
    /// # Errors
    /// [`CodecError::InvalidGain`] for a fixed gain above 6.
    pub fn frames<'a>(
        &'a mut self,
        samples: &'a [i32],
        fixed_gain: Option<u8>,
    ) -> Result<EncodeFrames<'a>, CodecError> {
        if let Some(gain) = fixed_gain {
            header_bits(gain, true)?;
        }
        Ok(EncodeFrames {
            encoder: self,
            chunks: samples.chunks(FRAME_SAMPLES),
            fixed_gain,
        })
    }

    /// Encode a whole sample sequence into one byte stream
    ///
    /// # Errors
    /// [`CodecError::InvalidGain`] for a fixed gain above 6.
    pub fn encode_fully(
        &mut self,
        samples: &[i32],
        fixed_gain: Option<u8>,
    ) -> Result<Vec<u8>, CodecError> {
        let frame_count = samples.len().div_ceil(FRAME_SAMPLES);
        let mut output = Vec::with_capacity(frame_count * FRAME_BYTES);
        for frame in self.frames(samples, fixed_gain)? {
            output.extend_from_slice(&frame);
        }
        Ok(output)
    }

    /// Encode one padded window. `fixed_gain` has already been validated.
    fn encode_window(&mut self, window: &[i32; FRAME_SAMPLES], fixed_gain: Option<u8>) -> EncodedFrame {
        let best = match fixed_gain {
            Some(gain) => quantize(window, gain, self.state),
            None => {
                let mut best = quantize(window, 0, self.state);
                for gain in 1..=MAX_GAIN {
                    let candidate = quantize(window, gain, self.state);
                    if candidate.squared_error < best.squared_error {
                        best = candidate;
                    }
                }
                best
            }
        };

        tracing::trace!(
            gain = best.gain,
            squared_error = best.squared_error,
            state = best.final_state,
            "encoded frame"
        );

        self.state = best.final_state;
        best
    }
}

/// Lazy frame iterator returned by [`Encoder::frames`]
pub struct EncodeFrames<'a> {
    encoder: &'a mut Encoder,
    chunks: std::slice::Chunks<'a, i32>,
    fixed_gain: Option<u8>,
}

impl Iterator for EncodeFrames<'_> {
    type Item = [u8; FRAME_BYTES];

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.chunks.next()?;
        let frame = self.encoder.encode_window(&pad_frame(chunk), self.fixed_gain);
        Some(frame.bytes)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for EncodeFrames<'_> {}

/// Encode a sample sequence with a fresh encoder
///
/// # Errors
/// [`CodecError::InvalidGain`] for a fixed gain above 6.
pub fn encode(samples: &[i32], fixed_gain: Option<u8>) -> Result<Vec<u8>, CodecError> {
    Encoder::new().encode_fully(samples, fixed_gain)
}

/// Zero-pad up to 23 samples into a full frame window
fn pad_frame(samples: &[i32]) -> [i32; FRAME_SAMPLES] {
    let mut window = [0i32; FRAME_SAMPLES];
    window[..samples.len()].copy_from_slice(samples);
    window
}
