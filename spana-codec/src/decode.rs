//! Stream decoder
//!
//! Reads 12-byte frames, skips non-continuing frames and decides when the
//! stream has ended. There is no container framing: a decoder can be pointed
//! straight at a byte range sliced out of a flash image.
//!
//! # Termination
//!
//! A frame with the keep-going bit clear is never decoded. Short runs of them
//! are tolerated mid-stream, but the stream ends when
//! - 3 consecutive non-continuing frames follow at least one continuing frame, or
//! - more than 4 consecutive non-continuing frames are seen at all, or
//! - fewer than 12 bytes remain.
//!
//! # Sample width
//!
//! Reconstruction is unclamped and carried as `i64`, so a stream read from an
//! arbitrary source can climb past the `i32` range without wrapping. It
//! saturates at the `i64` bounds.

use std::io::{self, Read};

use crate::frame::{decode_frame, extract_frame_fields};
use crate::{FRAME_BYTES, FRAME_SAMPLES};

/// Non-continuing run length that ends a stream once speech has been seen
pub const STOP_RUN_AFTER_SPEECH: u32 = 3;

/// Non-continuing run length that must be exceeded to end a stream without speech
pub const STOP_RUN_WITHOUT_SPEECH: u32 = 4;

/// Decoder state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// No samples emitted since the last non-continuing frame (or stream start)
    AwaitingFrame,
    /// The last frame read was decoded and emitted
    Emitting,
    /// The stream has ended; further frames are ignored
    Terminated,
}

/// Stateful stream decoder
#[derive(Debug, Clone)]
pub struct Decoder {
    cur: i64,
    stop_run: u32,
    seen_continuing: bool,
    state: DecoderState,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Create a decoder at the start of a stream
    #[must_use]
    pub fn new() -> Self {
        Self {
            cur: 0,
            stop_run: 0,
            seen_continuing: false,
            state: DecoderState::AwaitingFrame,
        }
    }

    /// Current state machine position
    #[inline]
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Current continuity state (last emitted sample)
    #[inline]
    pub fn continuity(&self) -> i64 {
        self.cur
    }

    /// Whether the stream has ended
    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.state == DecoderState::Terminated
    }

    /// Feed one frame through the state machine
    ///
    /// Returns the 23 decoded samples for a continuing frame, `None` for a
    /// skipped frame or once the stream has terminated.
    pub fn push_frame(&mut self, frame: &[u8; FRAME_BYTES]) -> Option<[i64; FRAME_SAMPLES]> {
        if self.is_terminated() {
            return None;
        }

        let fields = extract_frame_fields(frame);

        if fields.keep_going {
            self.seen_continuing = true;
            self.stop_run = 0;
        } else {
            self.stop_run += 1;
        }

        if (self.stop_run >= STOP_RUN_AFTER_SPEECH && self.seen_continuing)
            || self.stop_run > STOP_RUN_WITHOUT_SPEECH
        {
            tracing::debug!(
                stop_run = self.stop_run,
                seen_continuing = self.seen_continuing,
                "stream terminated"
            );
            self.state = DecoderState::Terminated;
            return None;
        }

        if !fields.keep_going {
            self.state = DecoderState::AwaitingFrame;
            return None;
        }

        let samples = decode_frame(&fields, self.cur);
        self.cur = samples[FRAME_SAMPLES - 1];
        self.state = DecoderState::Emitting;
        Some(samples)
    }

    /// Signal end of data (fewer than 12 bytes left)
    pub fn finish(&mut self) {
        self.state = DecoderState::Terminated;
    }

    /// Pull-based iteration over decoded 23-sample runs of an in-memory stream
    pub fn frames<'a>(&'a mut self, data: &'a [u8]) -> DecodeFrames<'a> {
        DecodeFrames {
            decoder: self,
            chunks: data.chunks(FRAME_BYTES),
        }
    }

    /// Decode an in-memory stream to completion
    pub fn decode_fully(&mut self, data: &[u8]) -> Vec<i64> {
        let mut output = Vec::with_capacity(data.len() / FRAME_BYTES * FRAME_SAMPLES);
        for samples in self.frames(data) {
            output.extend_from_slice(&samples);
        }
        output
    }

    /// Decode a stream read from any byte source to completion
    ///
    /// A trailing partial frame is treated as a clean end of data.
    ///
    /// # Errors
    /// Propagates I/O errors other than a short final read.
    pub fn decode_reader<R: Read>(&mut self, mut reader: R) -> io::Result<Vec<i64>> {
        let mut output = Vec::new();
        let mut frame = [0u8; FRAME_BYTES];

        while !self.is_terminated() {
            match reader.read_exact(&mut frame) {
                Ok(()) => {
                    if let Some(samples) = self.push_frame(&frame) {
                        output.extend_from_slice(&samples);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => self.finish(),
                Err(e) => return Err(e),
            }
        }

        Ok(output)
    }
}

/// Pull-based iterator returned by [`Decoder::frames`]
///
/// Yields one 23-sample run per emitted frame; skipped frames yield nothing.
pub struct DecodeFrames<'a> {
    decoder: &'a mut Decoder,
    chunks: std::slice::Chunks<'a, u8>,
}

impl Iterator for DecodeFrames<'_> {
    type Item = [i64; FRAME_SAMPLES];

    fn next(&mut self) -> Option<Self::Item> {
        while !self.decoder.is_terminated() {
            let Some(frame) = self.chunks.next().and_then(|c| <&[u8; FRAME_BYTES]>::try_from(c).ok())
            else {
                self.decoder.finish();
                break;
            };
            if let Some(samples) = self.decoder.push_frame(frame) {
                return Some(samples);
            }
        }
        None
    }
}

/// Decode an in-memory stream with a fresh decoder
pub fn decode(data: &[u8]) -> Vec<i64> {
    Decoder::new().decode_fully(data)
}
