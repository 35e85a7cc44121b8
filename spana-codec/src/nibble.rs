//! Nibble-level packing primitives
//!
//! Every quantized step is a signed 4-bit value and every frame header is a
//! 4-bit field, so the whole bitstream is built from nibbles. These helpers are
//! pure and stateless.

use crate::{CodecError, MAX_GAIN};

/// Split a byte into `(high_nibble, low_nibble)`
#[inline]
pub const fn split_byte(b: u8) -> (u8, u8) {
    ((b >> 4) & 0xF, b & 0xF)
}

/// Interpret a nibble as a 4-bit two's-complement value
///
/// `0..=7` map to themselves, `8..=15` map to `n - 16`. Bits above the low
/// nibble are ignored.
#[inline]
pub const fn nibble_to_signed(n: u8) -> i8 {
    let n = (n & 0xF) as i8;
    if n > 7 { n - 16 } else { n }
}

/// Convert a step in `-8..=7` to its 4-bit two's-complement nibble
///
/// Masks to 4 bits rather than casting, so `-1` becomes `0xF`.
#[inline]
pub const fn signed_to_nibble(step: i8) -> u8 {
    (step as u8) & 0xF
}

/// Pack two signed steps into one byte as `(high << 4) | low`
#[inline]
pub const fn pack_nibbles(high: i8, low: i8) -> u8 {
    (signed_to_nibble(high) << 4) | signed_to_nibble(low)
}

/// Reverse the order of the low 3 bits (`0b001` <-> `0b100`)
#[inline]
pub const fn reverse_3_bits(v: u8) -> u8 {
    ((v & 0b001) << 2) | (v & 0b010) | ((v & 0b100) >> 2)
}

/// Unchecked header nibble. Callers guarantee `gain <= 7`.
#[inline]
pub(crate) const fn header_nibble(gain: u8, keep_going: bool) -> u8 {
    (reverse_3_bits(gain) << 1) | keep_going as u8
}

/// Build the 4-bit frame header for gain exponent `gain`
///
/// The 3-bit gain is stored bit-reversed in bits 1..=3 and the keep-going flag
/// in bit 0.
///
/// # Errors
/// Returns [`CodecError::InvalidGain`] for anything above [`MAX_GAIN`]. The
/// value 7 is the decoder's silent-frame sentinel and is never written.
pub fn header_bits(gain: u8, keep_going: bool) -> Result<u8, CodecError> {
    if gain > MAX_GAIN {
        return Err(CodecError::InvalidGain(gain));
    }
    Ok(header_nibble(gain, keep_going))
}

/// Inverse of [`header_nibble`]: recover `(gain, keep_going)` from a header
///
/// Any 3-bit gain can come back out, including the reserved value 7.
#[inline]
pub const fn parse_header_bits(header: u8) -> (u8, bool) {
    let gain = reverse_3_bits((header >> 1) & 0b111);
    (gain, header & 1 != 0)
}
