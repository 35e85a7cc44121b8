//! `spana decode`: decode every entry of an image to WAV files

use anyhow::{Context, Result};
use spana_codec::{Decoder, FRAME_BYTES, FRAME_SAMPLES};
use spana_image::OffsetTableDb;
use std::path::{Path, PathBuf};

use super::file_name_label;
use crate::audio::write_wav_normalized;

/// Default output directory
pub const DEFAULT_OUTPUT_DIR: &str = "decoded_sounds";

/// One decoded entry
#[derive(Debug, Clone)]
pub struct DecodedEntry {
    pub index: u8,
    pub path: PathBuf,
    pub encoded_bytes: usize,
    pub samples: usize,
}

impl DecodedEntry {
    /// 16-bit PCM size over encoded size
    pub fn compression_ratio(&self) -> f64 {
        if self.encoded_bytes == 0 {
            0.0
        } else {
            (self.samples * 2) as f64 / self.encoded_bytes as f64
        }
    }
}

/// Decode each valid entry to `ss_{idx:03}_{label}.wav` at its own sample rate
///
/// Entries with a zero rate divider are skipped with a warning. An entry whose
/// inferred range is empty (the next entry starts at or before it) is decoded
/// from its start until the stream's own stop frames end it.
pub fn decode_all(image: &[u8], db: &OffsetTableDb, out_dir: &Path) -> Result<Vec<DecodedEntry>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let mut decoded = Vec::new();
    for entry in db {
        let Some(range) = db.byte_range(entry.index as usize, image.len()) else {
            continue;
        };
        let Some(sample_rate) = entry.sample_rate_hz() else {
            tracing::warn!(index = entry.index, "entry has no sample rate, skipping");
            continue;
        };

        let unbounded = range.is_empty() && range.start >= db.serialized_len();
        let (samples, encoded_bytes) = if unbounded {
            tracing::warn!(
                index = entry.index,
                start = range.start,
                "next entry starts at or before this one, decoding until the stream stops"
            );
            let samples = Decoder::new().decode_fully(&image[range.start..]);
            let emitted = samples.len() / FRAME_SAMPLES * FRAME_BYTES;
            (samples, emitted)
        } else {
            (Decoder::new().decode_fully(&image[range.clone()]), range.len())
        };
        let path = out_dir.join(format!(
            "ss_{:03}_{}.wav",
            entry.index,
            file_name_label(entry.display_label())
        ));
        write_wav_normalized(&path, &samples, sample_rate)?;

        let result = DecodedEntry {
            index: entry.index,
            path,
            encoded_bytes,
            samples: samples.len(),
        };
        tracing::info!(
            "  wrote {}, enc size: {:5}, pcm size: {}, CR: {:.2}",
            result.path.display(),
            result.encoded_bytes,
            result.samples * 2,
            result.compression_ratio()
        );
        decoded.push(result);
    }

    Ok(decoded)
}
