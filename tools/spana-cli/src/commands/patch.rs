//! `spana patch`: targeted structural edit of one table entry

use anyhow::{Context, Result, bail};
use spana_image::{FormatWarning, OffsetTableDb};
use std::num::NonZeroU32;
use std::path::Path;

/// A single-entry edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchEdit {
    /// Move the payload start address
    Start(u32),
    /// Share another entry's payload
    SameAs(usize),
    /// Change the playback rate
    Rate(NonZeroU32),
}

impl PatchEdit {
    /// Exactly one of the three flags must be given
    pub fn from_flags(
        start: Option<u32>,
        same_as: Option<usize>,
        rate: Option<NonZeroU32>,
    ) -> Result<Self> {
        match (start, same_as, rate) {
            (Some(address), None, None) => Ok(Self::Start(address)),
            (None, Some(index), None) => Ok(Self::SameAs(index)),
            (None, None, Some(hz)) => Ok(Self::Rate(hz)),
            (None, None, None) => bail!("one of --start, --same-as or --rate is required"),
            _ => bail!("--start, --same-as and --rate are mutually exclusive"),
        }
    }
}

/// Apply `edit` to entry `index`, returning the warnings the edit produced
pub fn apply(db: &mut OffsetTableDb, index: usize, edit: PatchEdit) -> Result<Vec<FormatWarning>> {
    let warnings = match edit {
        PatchEdit::Start(address) => db.set_start_addr(index, address)?,
        PatchEdit::SameAs(same_as) => db.alias(index, same_as)?,
        PatchEdit::Rate(hz) => {
            let len = db.len();
            db.get_mut(index)
                .with_context(|| format!("entry {index} does not exist (table has {len} entries)"))?
                .set_sample_rate_hz(hz);
            Vec::new()
        }
    };

    for warning in &warnings {
        tracing::warn!("after patch: {warning}");
    }
    Ok(warnings)
}

/// Patch a copy of `image` and write it to `output`
///
/// Only the header region changes; payload bytes are copied through.
pub fn patch_image(image: &[u8], index: usize, edit: PatchEdit, output: &Path) -> Result<Vec<u8>> {
    let mut db = OffsetTableDb::parse(image).into_value();
    apply(&mut db, index, edit)?;
    let patched = db.graft(image);

    std::fs::write(output, &patched)
        .with_context(|| format!("Failed to write image: {}", output.display()))?;
    tracing::info!("Patched entry {} -> {}", index, output.display());
    Ok(patched)
}

/// Parse a decimal or `0x`-prefixed hexadecimal address
pub fn parse_address(text: &str) -> Result<u32, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => text.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("invalid address {text:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use spana_image::OffsetTableEntry;

    fn image() -> Vec<u8> {
        let db = OffsetTableDb::from_entries(vec![
            OffsetTableEntry::new(0, 200, 0x470),
            OffsetTableEntry::new(1, 200, 0x500),
        ])
        .unwrap()
        .value;
        db.graft(&[0x5A; 0x600])
    }

    #[test]
    fn test_from_flags() {
        assert_eq!(
            PatchEdit::from_flags(Some(0x10), None, None).unwrap(),
            PatchEdit::Start(0x10)
        );
        assert!(PatchEdit::from_flags(None, None, None).is_err());
        assert!(PatchEdit::from_flags(Some(1), Some(2), None).is_err());
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x470"), Ok(0x470));
        assert_eq!(parse_address("0X0F_0000"), Ok(0xF_0000));
        assert_eq!(parse_address("1136"), Ok(1136));
        assert!(parse_address("0xZZ").is_err());
    }

    #[test]
    fn test_apply_rate() {
        let mut db = OffsetTableDb::parse_with_length(&image(), 2).into_value();
        apply(&mut db, 1, PatchEdit::Rate(NonZeroU32::new(8000).unwrap())).unwrap();
        assert_eq!(db[1].rate_divider, 250);
        assert!(apply(&mut db, 9, PatchEdit::Rate(NonZeroU32::new(8000).unwrap())).is_err());
    }

    #[test]
    fn test_apply_same_as() {
        let mut db = OffsetTableDb::parse_with_length(&image(), 2).into_value();
        let warnings = apply(&mut db, 1, PatchEdit::SameAs(0)).unwrap();
        assert_eq!(db[1].sound_data_start_addr, 0x470);
        assert_eq!(warnings.len(), 1);
    }
}
