//! Index -> label lookup table
//!
//! Labels are diagnostics only: they never affect the image bytes. They are
//! kept in a TOML file:
//!
//! ```toml
//! [[phrase]]
//! index = 42
//! label = "Angel"
//!
//! [[phrase]]
//! index = 43
//! label = "Another"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Errors loading a label table
#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("failed to read label table {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse label table: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize)]
struct LabelFile {
    #[serde(default)]
    phrase: Vec<PhraseEntry>,
}

#[derive(Debug, Deserialize)]
struct PhraseEntry {
    index: u8,
    /// Unknown phrases may be listed without a label
    #[serde(default)]
    label: Option<String>,
}

/// Externally supplied index -> label mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    labels: BTreeMap<u8, String>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML label table
    ///
    /// Entries without a label are skipped. If an index is listed twice the
    /// later label wins.
    pub fn from_toml_str(text: &str) -> Result<Self, LabelError> {
        let file: LabelFile = toml::from_str(text)?;
        let mut table = Self::new();
        for phrase in file.phrase {
            if let Some(label) = phrase.label {
                if let Some(previous) = table.insert(phrase.index, label) {
                    tracing::warn!(index = phrase.index, previous = %previous, "label listed twice");
                }
            }
        }
        Ok(table)
    }

    /// Load a TOML label table from disk
    pub fn load(path: &Path) -> Result<Self, LabelError> {
        let text = std::fs::read_to_string(path).map_err(|source| LabelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Set a label, returning the one it replaced
    pub fn insert(&mut self, index: u8, label: String) -> Option<String> {
        self.labels.insert(index, label)
    }

    pub fn get(&self, index: u8) -> Option<&str> {
        self.labels.get(&index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> {
        self.labels.iter().map(|(&index, label)| (index, label.as_str()))
    }
}

impl FromIterator<(u8, String)> for LabelTable {
    fn from_iter<I: IntoIterator<Item = (u8, String)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}
