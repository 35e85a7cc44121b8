//! voice_pack.toml manifest parsing
//!
//! ```toml
//! [pack]
//! wav_dir = "wavs"
//! output = "custom_voice_pack.bin"
//! sample_rate = 10000
//! jobs = 6
//!
//! [[alias]]
//! index = 220
//! same_as = 217
//! ```
//!
//! Relative paths are resolved against the manifest's directory. Leaving out
//! `[[alias]]` entirely keeps the default aliases; listing any replaces them.

use anyhow::{Context, Result};
use serde::Deserialize;
use spana_image::{DEFAULT_ALIASES, DEFAULT_SAMPLE_RATE_HZ};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

/// Default manifest file name
pub const MANIFEST_FILE: &str = "voice_pack.toml";

/// Default compiled image name
pub const DEFAULT_OUTPUT: &str = "custom_voice_pack.bin";

/// voice_pack.toml manifest structure
#[derive(Debug, Clone, Deserialize)]
pub struct VoicePackManifest {
    #[serde(default)]
    pub pack: PackSection,
    #[serde(default = "default_aliases")]
    pub alias: Vec<AliasConfig>,
}

/// `[pack]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PackSection {
    /// Directory searched for one WAV per table index
    pub wav_dir: PathBuf,
    /// Where the compiled image is written
    pub output: PathBuf,
    /// Playback rate written into every entry
    pub sample_rate: u32,
    /// Worker threads for encoding (default: all cores)
    pub jobs: Option<usize>,
    /// Encode at one gain instead of searching per frame
    pub gain: Option<u8>,
}

impl Default for PackSection {
    fn default() -> Self {
        Self {
            wav_dir: PathBuf::from("."),
            output: PathBuf::from(DEFAULT_OUTPUT),
            sample_rate: DEFAULT_SAMPLE_RATE_HZ,
            jobs: None,
            gain: None,
        }
    }
}

/// `[[alias]]` entry: `index` plays the same audio as `same_as`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AliasConfig {
    pub index: usize,
    pub same_as: usize,
}

fn default_aliases() -> Vec<AliasConfig> {
    DEFAULT_ALIASES
        .iter()
        .map(|&(index, same_as)| AliasConfig { index, same_as })
        .collect()
}

impl Default for VoicePackManifest {
    fn default() -> Self {
        Self {
            pack: PackSection::default(),
            alias: default_aliases(),
        }
    }
}

impl VoicePackManifest {
    /// Load manifest from file, resolving its paths against its directory
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let mut manifest = Self::parse(&content)?;

        if let Some(base) = path.parent() {
            manifest.pack.wav_dir = base.join(&manifest.pack.wav_dir);
            manifest.pack.output = base.join(&manifest.pack.output);
        }
        Ok(manifest)
    }

    /// Load `path` if given, else `voice_pack.toml` when present, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(MANIFEST_FILE).exists() => Self::load(Path::new(MANIFEST_FILE)),
            None => Ok(Self::default()),
        }
    }

    /// Parse manifest from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse voice_pack.toml")
    }

    /// Sample rate as a divider-safe value
    pub fn sample_rate(&self) -> Result<NonZeroU32> {
        NonZeroU32::new(self.pack.sample_rate).context("sample_rate must be greater than zero")
    }

    /// Aliases as `(index, same_as)` pairs
    pub fn aliases(&self) -> Vec<(usize, usize)> {
        self.alias.iter().map(|a| (a.index, a.same_as)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = VoicePackManifest::parse(
            r#"
[pack]
wav_dir = "wavs"
output = "out.bin"
sample_rate = 8000
jobs = 2

[[alias]]
index = 5
same_as = 3
"#,
        )
        .unwrap();

        assert_eq!(manifest.pack.wav_dir, PathBuf::from("wavs"));
        assert_eq!(manifest.pack.sample_rate, 8000);
        assert_eq!(manifest.pack.jobs, Some(2));
        assert_eq!(manifest.pack.gain, None);
        assert_eq!(manifest.aliases(), vec![(5, 3)]);
    }

    #[test]
    fn test_defaults() {
        let manifest = VoicePackManifest::parse("").unwrap();
        assert_eq!(manifest.pack.sample_rate, DEFAULT_SAMPLE_RATE_HZ);
        assert_eq!(manifest.pack.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(manifest.aliases(), vec![(220, 217)]);
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let manifest = VoicePackManifest::parse("[pack]\nsample_rate = 0\n").unwrap();
        assert!(manifest.sample_rate().is_err());
    }

    #[test]
    fn test_unknown_type_is_error() {
        assert!(VoicePackManifest::parse("[pack]\nsample_rate = \"fast\"\n").is_err());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"[pack]\nwav_dir = \"wavs\"\n").unwrap();

        let manifest = VoicePackManifest::load(&path).unwrap();
        assert_eq!(manifest.pack.wav_dir, dir.path().join("wavs"));
        assert_eq!(manifest.pack.output, dir.path().join(DEFAULT_OUTPUT));
    }
}
