//! Voice-pack assembly: build a complete flash image from audio sources
//!
//! Every table index is assigned a source identity. Several indices may share
//! one source, in which case they point at the same payload. Unique sources are
//! encoded concurrently, each with its own [`Encoder`], and placed into the
//! sound section only after every encode has finished.
//!
//! # Image Layout
//! ```text
//! 0x000: header + offset table (zero padded)
//! 0x470: sound section, per unique source in key order:
//!          LEAD_IN (one non-continuing frame)
//!          encoded frames
//!          TRAILER x 2 (non-continuing run that stops the decoder)
//! ...:   zero padding up to FLASH_SIZE
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::num::NonZeroU32;

use rayon::prelude::*;
use spana_codec::{CodecError, Encoder};

use crate::offset_table::{OffsetTableDb, OffsetTableEntry, TableError, rate_divider_for};
use crate::{FLASH_SIZE, FormatWarning, MAX_ADDRESS, MAX_TABLE_LENGTH, TABLE_LENGTH};

/// Start of the sound section
pub const SOUND_SECTION_START: u32 = 0x470;

/// Sample rate every entry of a compiled pack plays at by default
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 10_000;

/// Non-continuing frame placed before each payload
pub const LEAD_IN: [u8; 12] = [
    0x00, 0x88, 0x00, 0x00, 0x88, 0x00, 0x00, 0x88, 0x00, 0x00, 0x88, 0x00,
];

/// Placed twice after each payload; together the copies form three
/// non-continuing frames
pub const TRAILER: [u8; 18] = [
    0x00, 0x88, 0x00, 0x00, 0x88, 0x00, 0x00, 0x88, 0x00, 0x00, 0x88, 0x00, 0x00, 0x88, 0x01,
    0x00, 0x00, 0x00,
];

/// Default index aliases: `(index, same_as)`
pub const DEFAULT_ALIASES: &[(usize, usize)] = &[(220, 217)];

/// Errors building a voice pack
#[derive(Debug, thiserror::Error)]
pub enum VoicePackError {
    #[error("entry {index} is outside the {len}-entry table")]
    NoSuchEntry { index: usize, len: usize },
    #[error("entry {index} refers to source {key} but no samples were supplied for it")]
    MissingSource { index: usize, key: String },
    #[error("header and table need {needed} bytes but the sound section starts at 0x470")]
    HeaderOverflow { needed: usize },
    #[error("sound data at 0x{address:X} does not fit a 24-bit address")]
    AddressOverflow { address: u32 },
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A compiled flash image plus the table that describes it
#[derive(Debug, Clone)]
pub struct CompiledPack<K> {
    /// Complete image bytes
    pub image: Vec<u8>,
    /// Offset table written into the image
    pub table: OffsetTableDb,
    /// Payload start address per source
    pub addresses: BTreeMap<K, u32>,
    /// Table anomalies (aliases and unassigned entries are not ascending)
    pub warnings: Vec<FormatWarning>,
}

/// Builder mapping table indices to audio sources
#[derive(Debug, Clone)]
pub struct VoicePack<K> {
    slots: Vec<Option<K>>,
    sample_rate: NonZeroU32,
    fixed_gain: Option<u8>,
}

impl<K> VoicePack<K>
where
    K: Ord + Clone + Debug + Send + Sync,
{
    /// Empty pack with [`TABLE_LENGTH`] entries
    pub fn new(sample_rate: NonZeroU32) -> Self {
        Self::with_length(TABLE_LENGTH as usize, sample_rate)
    }

    /// Empty pack with an explicit entry count
    pub fn with_length(len: usize, sample_rate: NonZeroU32) -> Self {
        Self {
            slots: vec![None; len],
            sample_rate,
            fixed_gain: None,
        }
    }

    /// Encode every source at one gain instead of searching per frame
    pub fn with_fixed_gain(mut self, gain: Option<u8>) -> Self {
        self.fixed_gain = gain;
        self
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Assign a source to an entry
    pub fn assign(&mut self, index: usize, source: K) -> Result<(), VoicePackError> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(VoicePackError::NoSuchEntry { index, len })?;
        *slot = Some(source);
        Ok(())
    }

    /// Give `index` the same source as `same_as`
    pub fn alias(&mut self, index: usize, same_as: usize) -> Result<(), VoicePackError> {
        let len = self.slots.len();
        let source = self
            .slots
            .get(same_as)
            .ok_or(VoicePackError::NoSuchEntry { index: same_as, len })?
            .clone();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(VoicePackError::NoSuchEntry { index, len })?;
        *slot = source;
        Ok(())
    }

    /// Source assigned to an entry
    pub fn source(&self, index: usize) -> Option<&K> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Distinct sources referenced by any entry
    pub fn unique_sources(&self) -> BTreeSet<&K> {
        self.slots.iter().flatten().collect()
    }

    /// Encode the referenced sources and lay out a complete image
    ///
    /// Sources not referenced by any entry are ignored.
    ///
    /// # Errors
    /// Fails before encoding if the table is longer than 256 entries or a
    /// referenced source has no samples.
    pub fn compile(&self, sources: &BTreeMap<K, Vec<i32>>) -> Result<CompiledPack<K>, VoicePackError> {
        let len = self.slots.len();
        if len > MAX_TABLE_LENGTH {
            return Err(TableError::TooManyEntries { len }.into());
        }

        let mut needed = BTreeMap::new();
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(key) = slot {
                let samples = sources.get(key).ok_or_else(|| VoicePackError::MissingSource {
                    index,
                    key: format!("{key:?}"),
                })?;
                needed.insert(key.clone(), samples.as_slice());
            }
        }

        tracing::info!("Encoding {} unique sources", needed.len());
        let encoded = encode_sources(&needed, self.fixed_gain)?;

        tracing::info!("Allocating sound section");
        let mut section = Vec::new();
        let mut addresses = BTreeMap::new();
        for (key, bytes) in &encoded {
            let address = SOUND_SECTION_START + section.len() as u32;
            if address > MAX_ADDRESS {
                return Err(VoicePackError::AddressOverflow { address });
            }
            addresses.insert(key.clone(), address);

            section.extend_from_slice(&LEAD_IN);
            section.extend_from_slice(bytes);
            section.extend_from_slice(&TRAILER);
            section.extend_from_slice(&TRAILER);
        }

        tracing::info!("Relocating {} entries", self.slots.len());
        let divider = rate_divider_for(self.sample_rate);
        let entries = (0..=u8::MAX)
            .zip(&self.slots)
            .map(|(index, slot)| {
                let start = slot
                    .as_ref()
                    .and_then(|key| addresses.get(key).copied())
                    .unwrap_or(0);
                OffsetTableEntry::new(index, divider, start)
            })
            .collect();
        let parsed = OffsetTableDb::from_entries(entries)?;
        for warning in &parsed.warnings {
            tracing::debug!("voice pack table: {warning}");
        }

        let mut image = parsed.value.serialize();
        if image.len() > SOUND_SECTION_START as usize {
            return Err(VoicePackError::HeaderOverflow { needed: image.len() });
        }
        image.resize(SOUND_SECTION_START as usize, 0);
        image.extend_from_slice(&section);

        if image.len() <= FLASH_SIZE as usize {
            image.resize(FLASH_SIZE as usize, 0);
        } else {
            tracing::warn!(
                "voice pack is {} bytes, larger than the {} byte flash",
                image.len(),
                FLASH_SIZE
            );
        }

        Ok(CompiledPack {
            image,
            table: parsed.value,
            addresses,
            warnings: parsed.warnings,
        })
    }
}

/// Encode independent sources concurrently, one encoder per source
///
/// Results are keyed by source identity, so output order never depends on
/// scheduling.
pub fn encode_sources<K, S>(
    sources: &BTreeMap<K, S>,
    fixed_gain: Option<u8>,
) -> Result<BTreeMap<K, Vec<u8>>, CodecError>
where
    K: Ord + Clone + Send + Sync,
    S: AsRef<[i32]> + Sync,
{
    sources
        .par_iter()
        .map(|(key, samples)| {
            let bytes = Encoder::new().encode_fully(samples.as_ref(), fixed_gain)?;
            Ok((key.clone(), bytes))
        })
        .collect()
}
