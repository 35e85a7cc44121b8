//! spana library
//!
//! Audio file I/O, the voice-pack manifest and the command implementations
//! behind the `spana` binary.

pub mod audio;
pub mod commands;
pub mod manifest;

pub use audio::{Pcm, read_wav, write_wav_normalized};
pub use manifest::{AliasConfig, PackSection, VoicePackManifest};
