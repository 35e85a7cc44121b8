//! `spana extract`: dump raw payloads of entries matching a label pattern

use anyhow::{Context, Result};
use spana_image::{LookupError, OffsetTableDb};
use std::path::{Path, PathBuf};

use super::file_name_label;

/// Write `sound_data_{idx:03}_{label}.bin` for every entry whose label matches
///
/// Fails if the pattern matches nothing.
pub fn extract_matching(
    image: &[u8],
    db: &OffsetTableDb,
    pattern: &str,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let matches = db.lookup_by_label(pattern)?;
    if matches.is_empty() {
        return Err(LookupError::NoMatch {
            pattern: pattern.to_string(),
        }
        .into());
    }

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let mut written = Vec::with_capacity(matches.len());
    for entry in matches {
        let Some(bytes) = db.sound_bytes(entry.index as usize, image) else {
            tracing::warn!(index = entry.index, "entry is invalid, nothing to extract");
            continue;
        };
        let path = out_dir.join(format!(
            "sound_data_{:03}_{}.bin",
            entry.index,
            file_name_label(entry.label.as_deref().unwrap_or_default())
        ));
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("  wrote {} ({} bytes)", path.display(), bytes.len());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spana_image::{LabelTable, OffsetTableEntry};

    fn labelled_table() -> OffsetTableDb {
        let mut db = OffsetTableDb::from_entries(vec![
            OffsetTableEntry::new(0, 200, 4),
            OffsetTableEntry::new(1, 200, 8),
            OffsetTableEntry::new(2, 200, 10),
        ])
        .unwrap()
        .value;
        let labels: LabelTable = [(0, "Low Beep"), (1, "High Beep"), (2, "Angel")]
            .into_iter()
            .map(|(i, l)| (i, l.to_string()))
            .collect();
        db.apply_labels(&labels);
        db
    }

    #[test]
    fn test_extract_matching() {
        let image: Vec<u8> = (0..16).collect();
        let dir = tempfile::tempdir().unwrap();

        let written = extract_matching(&image, &labelled_table(), "*Beep*", dir.path()).unwrap();
        assert_eq!(written.len(), 2);

        let low = std::fs::read(dir.path().join("sound_data_000_Low Beep.bin")).unwrap();
        assert_eq!(low, vec![4, 5, 6, 7]);
        let high = std::fs::read(dir.path().join("sound_data_001_High Beep.bin")).unwrap();
        assert_eq!(high, vec![8, 9]);
    }

    #[test]
    fn test_extract_no_match_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = extract_matching(&[0; 16], &labelled_table(), "Nothing", dir.path());
        assert!(result.is_err());
    }
}
