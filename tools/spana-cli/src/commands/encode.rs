//! `spana encode`: encode one WAV file to a raw frame stream

use anyhow::{Context, Result};
use spana_codec::{ENCODE_PEAK, Encoder, normalize_peak};
use std::path::Path;

use crate::audio::read_wav;

/// Normalize, encode and write `input` to `output`, returning the encoded bytes
pub fn encode_wav(input: &Path, output: &Path, gain: Option<u8>) -> Result<Vec<u8>> {
    let pcm = read_wav(input)?;
    let samples = normalize_peak(&pcm.samples, ENCODE_PEAK);
    let encoded = Encoder::new().encode_fully(&samples, gain)?;

    std::fs::write(output, &encoded)
        .with_context(|| format!("Failed to write output: {}", output.display()))?;

    tracing::info!(
        "Encoded {} samples at {}Hz into {} bytes ({:.2}:1 vs 16-bit PCM)",
        samples.len(),
        pcm.sample_rate,
        encoded.len(),
        (samples.len() * 2) as f64 / encoded.len().max(1) as f64
    );
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spana_codec::{FRAME_BYTES, FRAME_SAMPLES, decode};

    fn write_sine(path: &Path, len: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 10_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..len {
            let s = (8000.0 * (i as f64 * 0.05).sin()) as i16;
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_encode_wav() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tone.wav");
        let output = dir.path().join("tone.bin");
        write_sine(&input, 229);

        let encoded = encode_wav(&input, &output, None).unwrap();
        // one leading zero sample: 230 samples = 10 frames
        assert_eq!(encoded.len(), 10 * FRAME_BYTES);
        assert_eq!(std::fs::read(&output).unwrap(), encoded);

        let decoded = decode(&encoded);
        assert_eq!(decoded.len(), 10 * FRAME_SAMPLES);
        assert!(decoded.iter().all(|s| s.abs() <= i64::from(ENCODE_PEAK + 16)));
    }

    #[test]
    fn test_encode_rejects_bad_gain() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tone.wav");
        write_sine(&input, 23);
        assert!(encode_wav(&input, &dir.path().join("out.bin"), Some(7)).is_err());
    }
}
