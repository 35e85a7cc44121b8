//! WAV reading and writing

use anyhow::{Context, Result, bail};
use std::path::Path;

/// Mono PCM samples plus their rate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pcm {
    pub samples: Vec<i32>,
    pub sample_rate: u32,
}

/// Load a WAV file as mono samples at 16-bit scale
///
/// Multi-channel files are averaged down to one channel.
pub fn read_wav(path: &Path) -> Result<Pcm> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to load WAV: {}", path.display()))?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Int => match spec.bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|s| s.map(|s| (s as i32) << 8))
                .collect::<Result<Vec<i32>, _>>(),
            16 => reader
                .samples::<i16>()
                .map(|s| s.map(i32::from))
                .collect::<Result<Vec<i32>, _>>(),
            24 | 32 => reader
                .samples::<i32>()
                .map(|s| s.map(|s| s >> (spec.bits_per_sample - 16)))
                .collect::<Result<Vec<i32>, _>>(),
            _ => bail!("Unsupported bit depth: {}", spec.bits_per_sample),
        },
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|s| (s * 32767.0) as i32))
            .collect::<Result<Vec<i32>, _>>(),
    }
    .with_context(|| format!("Failed to read samples from {}", path.display()))?;

    let samples = match spec.channels {
        0 => bail!("WAV file has no channels: {}", path.display()),
        1 => samples,
        channels => {
            let n = channels as i32;
            samples
                .chunks(channels as usize)
                .map(|frame| frame.iter().sum::<i32>() / n)
                .collect()
        }
    };

    Ok(Pcm {
        samples,
        sample_rate: spec.sample_rate,
    })
}

/// Write mono 16-bit PCM, scaled so the absolute peak hits full scale
///
/// Silence is written as zeros.
pub fn write_wav_normalized(path: &Path, samples: &[i64], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV: {}", path.display()))?;

    let peak = samples.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
    for &sample in samples {
        let scaled = if peak == 0 {
            0
        } else {
            (sample as f64 / peak as f64 * i16::MAX as f64).round() as i16
        };
        writer.write_sample(scaled)?;
    }

    writer
        .finalize()
        .with_context(|| format!("Failed to finish WAV: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(path: &Path, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 10_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_read_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_fixture(&path, 1, &[0, 100, -100, 32767]);

        let pcm = read_wav(&path).unwrap();
        assert_eq!(pcm.sample_rate, 10_000);
        assert_eq!(pcm.samples, vec![0, 100, -100, 32767]);
    }

    #[test]
    fn test_read_stereo_is_averaged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_fixture(&path, 2, &[100, 300, -50, -150]);

        assert_eq!(read_wav(&path).unwrap().samples, vec![200, -100]);
    }

    #[test]
    fn test_write_normalizes_to_full_scale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        write_wav_normalized(&path, &[0, 225, -450], 8_000).unwrap();

        let pcm = read_wav(&path).unwrap();
        assert_eq!(pcm.sample_rate, 8_000);
        assert_eq!(pcm.samples, vec![0, 16384, -32767]);
    }

    #[test]
    fn test_write_silence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silence.wav");
        write_wav_normalized(&path, &[0, 0, 0], 10_000).unwrap();
        assert_eq!(read_wav(&path).unwrap().samples, vec![0, 0, 0]);
    }

    #[test]
    fn test_missing_file() {
        assert!(read_wav(Path::new("/nonexistent/input.wav")).is_err());
    }
}
