//! Offset table: the sound directory at the start of a flash image
//!
//! # Layout
//! ```text
//! 0x00: magic u16 BE              (0x00E0)
//! 0x02: table base u24 BE          (0x00000B)
//! 0x05: table end u24 BE          (0x0B + 5*(len+1))
//! 0x08: secondary pointer u24 BE   (unused, same value)
//! 0x0B + 5*i: rate divider u16 BE, sound data start u24 BE
//! ```
//!
//! The two pointers are kept as read and written back unchanged, so a parsed
//! table grafts onto its own image byte for byte.
//!
//! Only start addresses are stored. End addresses are inferred from the next
//! entry's start, which assumes the payloads are laid out in table order.

use std::num::NonZeroU32;
use std::ops::{Index, IndexMut, Range};

use crate::labels::LabelTable;
use crate::pattern::GlobPattern;
use crate::{
    ENTRY_SIZE, EXPECTED_MAGIC, EXPECTED_TABLE_BASE, FLASH_SIZE, FormatWarning, HEADER_SIZE,
    MAX_ADDRESS, MAX_TABLE_LENGTH, Parsed, RATE_CLOCK_HZ, TABLE_LENGTH,
};

/// Errors from label lookups
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// No labelled entry matched
    #[error("no match for pattern: \"{pattern}\"")]
    NoMatch { pattern: String },
    /// More than one labelled entry matched where exactly one was required
    #[error("multiple matches for pattern: \"{pattern}\": entries {indices:?}")]
    MultipleMatches { pattern: String, indices: Vec<u8> },
    /// The pattern could not be compiled
    #[error("invalid pattern \"{pattern}\": {error}")]
    InvalidPattern {
        pattern: String,
        error: regex::Error,
    },
}

/// Errors from structural table edits
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// No entry with this index
    #[error("entry {index} does not exist (table has {len} entries)")]
    NoSuchEntry { index: usize, len: usize },
    /// Address does not fit the 24-bit field
    #[error("address 0x{address:X} does not fit in 24 bits")]
    AddressTooLarge { address: u32 },
    /// More entries than an 8-bit index can number
    #[error("{len} entries do not fit a table of at most 256")]
    TooManyEntries { len: usize },
}

/// One sound directory record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetTableEntry {
    /// Position in the table
    pub index: u8,
    /// Playback clock divider (`sample rate = 2 MHz / divider`)
    pub rate_divider: u16,
    /// First payload byte (inclusive)
    pub sound_data_start_addr: u32,
    /// One past the last payload byte, when known
    pub sound_data_end_addr: Option<u32>,
    /// Human-readable label from an external label table
    pub label: Option<String>,
    /// False when the start address points past the end of flash
    pub valid: bool,
}

impl OffsetTableEntry {
    /// Create a valid, unlabelled entry with an unknown end
    pub fn new(index: u8, rate_divider: u16, sound_data_start_addr: u32) -> Self {
        Self {
            index,
            rate_divider,
            sound_data_start_addr,
            sound_data_end_addr: None,
            label: None,
            valid: sound_data_start_addr < FLASH_SIZE,
        }
    }

    /// Playback sample rate, `None` for a zero divider
    pub fn sample_rate_hz(&self) -> Option<u32> {
        (self.rate_divider != 0).then(|| RATE_CLOCK_HZ / self.rate_divider as u32)
    }

    /// Set the divider for the closest achievable sample rate
    ///
    /// Rounds half to even and saturates at the largest divider.
    pub fn set_sample_rate_hz(&mut self, hz: NonZeroU32) {
        self.rate_divider = rate_divider_for(hz);
    }

    /// Whether `address` falls inside this entry's payload range
    pub fn contains(&self, address: u32) -> bool {
        self.valid
            && self.sound_data_start_addr <= address
            && self.sound_data_end_addr.is_none_or(|end| address < end)
    }

    /// Label or a placeholder, for file names and listings
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or("???")
    }

    /// The 5-byte on-image record
    pub fn to_bytes(&self) -> [u8; ENTRY_SIZE] {
        let mut bytes = [0u8; ENTRY_SIZE];
        bytes[0..2].copy_from_slice(&self.rate_divider.to_be_bytes());
        bytes[2..5].copy_from_slice(&self.sound_data_start_addr.to_be_bytes()[1..]);
        bytes
    }
}

/// Divider for a sample rate, rounding half to even
pub fn rate_divider_for(hz: NonZeroU32) -> u16 {
    let divider = (RATE_CLOCK_HZ as f64 / hz.get() as f64).round_ties_even();
    divider.min(u16::MAX as f64) as u16
}

/// Table end pointer for a table of `len` entries
pub fn table_end_for(len: usize) -> u32 {
    (HEADER_SIZE + ENTRY_SIZE * (len + 1)) as u32
}

/// The complete offset table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetTableDb {
    entries: Vec<OffsetTableEntry>,
    table_end: u32,
    secondary_pointer: u32,
}

impl OffsetTableDb {
    /// Parse the table from the start of an image, assuming [`TABLE_LENGTH`] entries
    ///
    /// Never fails: anomalies come back as warnings alongside the best-effort
    /// table, and each is logged.
    pub fn parse(image: &[u8]) -> Parsed<Self> {
        Self::parse_with_length(image, TABLE_LENGTH)
    }

    /// Parse with an explicit entry count
    pub fn parse_with_length(image: &[u8], table_length: u8) -> Parsed<Self> {
        let mut warnings = Vec::new();

        let required = HEADER_SIZE + ENTRY_SIZE * table_length as usize;
        if image.len() < required {
            warnings.push(FormatWarning::Truncated {
                length: image.len(),
                required,
            });
        }

        let magic = read_be(image, 0, 2);
        if magic != EXPECTED_MAGIC {
            warnings.push(FormatWarning::UnexpectedField {
                field: "initial header",
                expected: EXPECTED_MAGIC,
                observed: magic,
            });
        }
        let base = read_be(image, 2, 3);
        if base != EXPECTED_TABLE_BASE {
            warnings.push(FormatWarning::UnexpectedField {
                field: "offset table base address",
                expected: EXPECTED_TABLE_BASE,
                observed: base,
            });
        }
        let expected_end = table_end_for(table_length as usize);
        let table_end = read_be(image, 5, 3);
        let secondary_pointer = read_be(image, 8, 3);
        for (field, observed) in [
            ("offset table end address", table_end),
            ("secondary pointer", secondary_pointer),
        ] {
            if observed != expected_end {
                warnings.push(FormatWarning::UnexpectedField {
                    field,
                    expected: expected_end,
                    observed,
                });
            }
        }

        let mut entries = Vec::with_capacity(table_length as usize);
        for index in 0..table_length {
            let offset = HEADER_SIZE + ENTRY_SIZE * index as usize;
            let rate_divider = read_be(image, offset, 2) as u16;
            let start = read_be(image, offset + 2, 3);

            let entry = OffsetTableEntry::new(index, rate_divider, start);
            if !entry.valid {
                warnings.push(FormatWarning::AddressOutOfRange {
                    index,
                    address: start,
                });
            }
            tracing::debug!(index, rate_divider, start, "parsed entry");
            entries.push(entry);
        }

        let mut db = Self {
            entries,
            table_end,
            secondary_pointer,
        };
        warnings.extend(db.recompute_end_addresses());

        for warning in &warnings {
            tracing::warn!("offset table parse warning: {warning}");
        }

        Parsed {
            value: db,
            warnings,
        }
    }

    /// Build a table from entries, inferring end addresses
    ///
    /// Entry indices are renumbered to their position and the header pointers
    /// are derived from the entry count.
    ///
    /// # Errors
    /// [`TableError::TooManyEntries`] for more than 256 entries.
    pub fn from_entries(entries: Vec<OffsetTableEntry>) -> Result<Parsed<Self>, TableError> {
        let len = entries.len();
        if len > MAX_TABLE_LENGTH {
            return Err(TableError::TooManyEntries { len });
        }

        let mut db = Self::with_entries(entries);
        for (index, entry) in (0..=u8::MAX).zip(db.entries.iter_mut()) {
            entry.index = index;
            entry.valid = entry.sound_data_start_addr < FLASH_SIZE;
        }
        let warnings = db.recompute_end_addresses();
        Ok(Parsed {
            value: db,
            warnings,
        })
    }

    /// [`TABLE_LENGTH`] zeroed entries, for building an image from scratch
    pub fn blank() -> Self {
        Self::with_entries(
            (0..TABLE_LENGTH)
                .map(|index| OffsetTableEntry::new(index, 0, 0))
                .collect(),
        )
    }

    fn with_entries(entries: Vec<OffsetTableEntry>) -> Self {
        let table_end = table_end_for(entries.len());
        Self {
            entries,
            table_end,
            secondary_pointer: table_end,
        }
    }

    /// Re-run end address inference after edits
    ///
    /// Each valid entry ends where the next valid entry starts; the last valid
    /// entry's end is unknown. Invalid entries are skipped and get no end.
    /// Returns a warning for every pair that is not strictly ascending.
    pub fn recompute_end_addresses(&mut self) -> Vec<FormatWarning> {
        let mut warnings = Vec::new();
        let mut previous: Option<usize> = None;

        for i in 0..self.entries.len() {
            self.entries[i].sound_data_end_addr = None;
            if !self.entries[i].valid {
                continue;
            }

            if let Some(p) = previous {
                let start = self.entries[i].sound_data_start_addr;
                let prev_start = self.entries[p].sound_data_start_addr;
                if prev_start >= start {
                    warnings.push(FormatWarning::NotAscending {
                        index: self.entries[i].index,
                        previous: prev_start,
                        address: start,
                    });
                }
                self.entries[p].sound_data_end_addr = Some(start);
            }
            previous = Some(i);
        }

        warnings
    }

    /// Join labels from an external index -> label table
    pub fn apply_labels(&mut self, labels: &LabelTable) {
        for entry in &mut self.entries {
            entry.label = labels.get(entry.index).map(str::to_string);
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Table end pointer from the header
    pub fn table_end(&self) -> u32 {
        self.table_end
    }

    /// Secondary pointer from the header
    pub fn secondary_pointer(&self) -> u32 {
        self.secondary_pointer
    }

    /// All entries in table order
    pub fn entries(&self) -> &[OffsetTableEntry] {
        &self.entries
    }

    /// Iterate entries in table order
    pub fn iter(&self) -> std::slice::Iter<'_, OffsetTableEntry> {
        self.entries.iter()
    }

    /// Entry by index
    pub fn get(&self, index: usize) -> Option<&OffsetTableEntry> {
        self.entries.get(index)
    }

    /// Mutable entry by index
    ///
    /// Call [`recompute_end_addresses`](Self::recompute_end_addresses) after
    /// moving start addresses if end addresses matter.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut OffsetTableEntry> {
        self.entries.get_mut(index)
    }

    /// Move an entry's payload start and re-infer end addresses
    ///
    /// # Errors
    /// [`TableError::NoSuchEntry`] or [`TableError::AddressTooLarge`].
    pub fn set_start_addr(&mut self, index: usize, address: u32) -> Result<Vec<FormatWarning>, TableError> {
        if address > MAX_ADDRESS {
            return Err(TableError::AddressTooLarge { address });
        }
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(TableError::NoSuchEntry { index, len })?;
        entry.sound_data_start_addr = address;
        entry.valid = address < FLASH_SIZE;
        Ok(self.recompute_end_addresses())
    }

    /// Point `index` at the same payload as `same_as` (shared audio)
    ///
    /// # Errors
    /// [`TableError::NoSuchEntry`] if either index is missing.
    pub fn alias(&mut self, index: usize, same_as: usize) -> Result<Vec<FormatWarning>, TableError> {
        let len = self.entries.len();
        let address = self
            .entries
            .get(same_as)
            .ok_or(TableError::NoSuchEntry { index: same_as, len })?
            .sound_data_start_addr;
        self.set_start_addr(index, address)
    }

    /// Header and table bytes exactly as they appear on the image
    ///
    /// The magic and table base are fixed. The table end and secondary
    /// pointers are written as parsed, or as `0x0B + 5 * (len + 1)` for a table
    /// built from entries.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.serialized_len());
        bytes.extend_from_slice(&(EXPECTED_MAGIC as u16).to_be_bytes());
        bytes.extend_from_slice(&EXPECTED_TABLE_BASE.to_be_bytes()[1..]);
        bytes.extend_from_slice(&self.table_end.to_be_bytes()[1..]);
        bytes.extend_from_slice(&self.secondary_pointer.to_be_bytes()[1..]);

        for entry in &self.entries {
            bytes.extend_from_slice(&entry.to_bytes());
        }
        bytes
    }

    /// Length of [`serialize`](Self::serialize) output
    pub fn serialized_len(&self) -> usize {
        HEADER_SIZE + ENTRY_SIZE * self.entries.len()
    }

    /// Overwrite the header and table region of a copy of `image`
    ///
    /// Bytes past the table are untouched. An image shorter than the table is
    /// extended to hold it.
    pub fn graft(&self, image: &[u8]) -> Vec<u8> {
        let header = self.serialize();
        let mut out = image.to_vec();
        if out.len() < header.len() {
            out.resize(header.len(), 0);
        }
        out[..header.len()].copy_from_slice(&header);
        out
    }

    /// First valid entry whose `[start, end)` range contains `address`
    pub fn lookup_by_address(&self, address: u32) -> Option<&OffsetTableEntry> {
        self.entries.iter().find(|entry| entry.contains(address))
    }

    /// All labelled entries whose label matches a glob pattern
    ///
    /// # Errors
    /// [`LookupError::InvalidPattern`] if the pattern does not compile.
    pub fn lookup_by_label(&self, pattern: &str) -> Result<Vec<&OffsetTableEntry>, LookupError> {
        let glob = GlobPattern::new(pattern).map_err(|error| LookupError::InvalidPattern {
            pattern: pattern.to_string(),
            error,
        })?;

        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.label.as_deref().is_some_and(|label| glob.matches(label)))
            .collect())
    }

    /// The single labelled entry matching a glob pattern
    ///
    /// # Errors
    /// [`LookupError::NoMatch`] or [`LookupError::MultipleMatches`] unless
    /// exactly one entry matches.
    pub fn lookup_single_by_label(&self, pattern: &str) -> Result<&OffsetTableEntry, LookupError> {
        let matches = self.lookup_by_label(pattern)?;
        match matches.as_slice() {
            [] => Err(LookupError::NoMatch {
                pattern: pattern.to_string(),
            }),
            [entry] => Ok(entry),
            many => Err(LookupError::MultipleMatches {
                pattern: pattern.to_string(),
                indices: many.iter().map(|entry| entry.index).collect(),
            }),
        }
    }

    /// Payload byte range of an entry within an image of `image_len` bytes
    ///
    /// The last valid entry runs to the end of the image. `None` for invalid
    /// or missing entries.
    pub fn byte_range(&self, index: usize, image_len: usize) -> Option<Range<usize>> {
        let entry = self.entries.get(index).filter(|entry| entry.valid)?;
        let start = (entry.sound_data_start_addr as usize).min(image_len);
        let end = entry
            .sound_data_end_addr
            .map_or(image_len, |end| end as usize)
            .clamp(start, image_len);
        Some(start..end)
    }

    /// Payload bytes of an entry
    pub fn sound_bytes<'a>(&self, index: usize, image: &'a [u8]) -> Option<&'a [u8]> {
        self.byte_range(index, image.len()).map(|range| &image[range])
    }
}

impl Index<usize> for OffsetTableDb {
    type Output = OffsetTableEntry;

    fn index(&self, index: usize) -> &Self::Output {
        &self.entries[index]
    }
}

impl IndexMut<usize> for OffsetTableDb {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.entries[index]
    }
}

impl<'a> IntoIterator for &'a OffsetTableDb {
    type Item = &'a OffsetTableEntry;
    type IntoIter = std::slice::Iter<'a, OffsetTableEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Read a big-endian field, treating bytes past the end of the image as zero
fn read_be(image: &[u8], offset: usize, len: usize) -> u32 {
    (offset..offset + len).fold(0u32, |acc, i| (acc << 8) | *image.get(i).unwrap_or(&0) as u32)
}
