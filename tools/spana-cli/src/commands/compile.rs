//! `spana compile`: build a voice-pack image from a directory of WAV files
//!
//! Every table index needs exactly one WAV whose name contains the index as
//! three digits (e.g. `042_angel.wav`). Aliased indices reuse another index's
//! audio and need no file of their own.

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use spana_codec::{ENCODE_PEAK, normalize_peak};
use spana_image::{CompiledPack, GlobPattern, VoicePack};
use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use crate::audio::read_wav;
use crate::manifest::VoicePackManifest;

/// Resolved compile settings
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub wav_dir: PathBuf,
    pub output: PathBuf,
    pub sample_rate: NonZeroU32,
    pub jobs: Option<usize>,
    pub gain: Option<u8>,
    pub aliases: Vec<(usize, usize)>,
}

impl CompileOptions {
    pub fn from_manifest(manifest: &VoicePackManifest) -> Result<Self> {
        Ok(Self {
            wav_dir: manifest.pack.wav_dir.clone(),
            output: manifest.pack.output.clone(),
            sample_rate: manifest.sample_rate()?,
            jobs: manifest.pack.jobs,
            gain: manifest.pack.gain,
            aliases: manifest.aliases(),
        })
    }
}

/// Build the image on a pool of `options.jobs` threads and write it out
pub fn compile(options: &CompileOptions) -> Result<CompiledPack<PathBuf>> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = options.jobs {
        builder = builder.num_threads(jobs);
    }
    let pool = builder.build().context("Failed to start encoder threads")?;

    let compiled = pool.install(|| build(options))?;

    std::fs::write(&options.output, &compiled.image)
        .with_context(|| format!("Failed to write image: {}", options.output.display()))?;
    tracing::info!(
        "Wrote {} ({} bytes, {} unique sounds)",
        options.output.display(),
        compiled.image.len(),
        compiled.addresses.len()
    );
    Ok(compiled)
}

fn build(options: &CompileOptions) -> Result<CompiledPack<PathBuf>> {
    let names = list_wav_names(&options.wav_dir)?;
    let aliased: BTreeSet<usize> = options.aliases.iter().map(|&(index, _)| index).collect();

    let mut pack = VoicePack::new(options.sample_rate).with_fixed_gain(options.gain);
    for index in 0..pack.len() {
        if aliased.contains(&index) {
            continue;
        }
        let name = find_source(&names, index)?;
        pack.assign(index, options.wav_dir.join(name))?;
    }
    for &(index, same_as) in &options.aliases {
        pack.alias(index, same_as)
            .with_context(|| format!("Invalid alias {index} -> {same_as}"))?;
    }

    let unique = pack.unique_sources();
    tracing::info!("Loading {} WAV files", unique.len());
    let sources = unique
        .into_par_iter()
        .map(|path| {
            let pcm = read_wav(path)?;
            if pcm.sample_rate != options.sample_rate.get() {
                tracing::warn!(
                    "{} is {}Hz but the pack plays at {}Hz",
                    path.display(),
                    pcm.sample_rate,
                    options.sample_rate
                );
            }
            Ok((path.clone(), normalize_peak(&pcm.samples, ENCODE_PEAK)))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;

    Ok(pack.compile(&sources)?)
}

/// File names ending in `.wav` directly inside `dir`, sorted
pub fn list_wav_names(dir: &Path) -> Result<Vec<String>> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read WAV directory: {}", dir.display()))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| name.ends_with(".wav"))
        .collect();
    names.sort();
    Ok(names)
}

/// The single name matching `*{index:03}*.wav`
pub fn find_source(names: &[String], index: usize) -> Result<&str> {
    let glob = GlobPattern::new(&format!("*{index:03}*.wav"))?;
    let matches: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| glob.matches(name))
        .collect();

    match matches.as_slice() {
        [name] => Ok(*name),
        [] => bail!("pattern {} gives no matches", glob.as_str()),
        many => bail!("pattern {} gives multiple matches: {many:?}", glob.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_find_source() {
        let files = names(&["000_intro.wav", "001_angel.wav", "002_a.wav", "002_b.wav"]);
        assert_eq!(find_source(&files, 1).unwrap(), "001_angel.wav");

        let err = find_source(&files, 2).unwrap_err().to_string();
        assert!(err.contains("*002*.wav gives multiple matches"), "{err}");
        let err = find_source(&files, 3).unwrap_err().to_string();
        assert!(err.contains("*003*.wav gives no matches"), "{err}");
    }

    #[test]
    fn test_list_wav_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.wav"), b"").unwrap();
        std::fs::write(dir.path().join("a.wav"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        std::fs::create_dir(dir.path().join("dir.wav")).unwrap();

        assert_eq!(list_wav_names(dir.path()).unwrap(), names(&["a.wav", "b.wav"]));
    }

    #[test]
    fn test_options_from_manifest() {
        let manifest = VoicePackManifest::parse("[pack]\nsample_rate = 8000\njobs = 1\n").unwrap();
        let options = CompileOptions::from_manifest(&manifest).unwrap();
        assert_eq!(options.sample_rate.get(), 8000);
        assert_eq!(options.jobs, Some(1));
        assert_eq!(options.aliases, vec![(220, 217)]);
    }
}
