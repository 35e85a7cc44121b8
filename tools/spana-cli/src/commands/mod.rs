//! Command implementations

pub mod compile;
pub mod decode;
pub mod encode;
pub mod extract;
pub mod patch;
pub mod table;

use anyhow::Result;
use spana_image::{LabelTable, OffsetTableDb, Parsed, default_image_path, load_image};
use std::path::{Path, PathBuf};

/// A loaded flash image and its parsed table
pub struct LoadedImage {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub table: Parsed<OffsetTableDb>,
}

/// Load an image (default location if `path` is `None`) and parse its table,
/// optionally joining labels
pub fn load_image_and_table(path: Option<&Path>, labels: Option<&Path>) -> Result<LoadedImage> {
    let path = path.map_or_else(default_image_path, Path::to_path_buf);
    tracing::info!("Loading image {}", path.display());
    let bytes = load_image(&path)?;

    let mut table = OffsetTableDb::parse(&bytes);
    if let Some(labels) = labels {
        let labels = LabelTable::load(labels)?;
        table.value.apply_labels(&labels);
    }

    Ok(LoadedImage { path, bytes, table })
}

/// Make a label safe to use inside a file name
pub(crate) fn file_name_label(label: &str) -> String {
    label
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_label() {
        assert_eq!(file_name_label("Angel"), "Angel");
        assert_eq!(file_name_label("A/B"), "A_B");
        assert_eq!(file_name_label("???"), "???");
    }

    #[test]
    fn test_missing_image_is_descriptive() {
        let err = load_image_and_table(Some(Path::new("/nonexistent/flash.bin")), None)
            .err()
            .unwrap();
        assert!(err.to_string().contains("/nonexistent/flash.bin"));
    }
}
