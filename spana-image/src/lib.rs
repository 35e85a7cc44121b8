//! Flash image structures for the talking toy's SPI flash
//!
//! A 1 MiB image starts with a fixed header and an offset table of 223
//! five-byte records. Each record holds a playback clock divider and the start
//! address of a sound payload encoded with [`spana_codec`].
//!
//! - [`OffsetTableDb`] parses, edits and re-serializes the table
//! - [`LabelTable`] joins human-readable labels onto entries
//! - [`VoicePack`] assembles a complete image from audio sources
//!
//! Parsing never fails on odd input. Anomalies are returned as
//! [`FormatWarning`]s inside a [`Parsed`] result and logged through `tracing`.

mod image;
mod labels;
mod offset_table;
mod pattern;
mod voice_pack;

pub use image::{
    DEFAULT_IMAGE_PATH, IMAGE_PATH_ENV, ImageError, default_image_path, load_default_image,
    load_image,
};
pub use labels::{LabelError, LabelTable};
pub use offset_table::{
    LookupError, OffsetTableDb, OffsetTableEntry, TableError, rate_divider_for, table_end_for,
};
pub use pattern::GlobPattern;
pub use voice_pack::{
    CompiledPack, DEFAULT_ALIASES, DEFAULT_SAMPLE_RATE_HZ, LEAD_IN, SOUND_SECTION_START, TRAILER,
    VoicePack, VoicePackError, encode_sources,
};

// ============================================================================
// Constants
// ============================================================================

/// First header field of every known image
pub const EXPECTED_MAGIC: u32 = 0x00E0;

/// Byte offset of the first table record, as stored in the header
pub const EXPECTED_TABLE_BASE: u32 = 0x0B;

/// Bytes before the first table record
pub const HEADER_SIZE: usize = 0x0B;

/// Bytes per table record
pub const ENTRY_SIZE: usize = 5;

/// Number of table records
pub const TABLE_LENGTH: u8 = 223;

/// Most records an 8-bit entry index can address
pub const MAX_TABLE_LENGTH: usize = u8::MAX as usize + 1;

/// Flash capacity (1 MiB)
pub const FLASH_SIZE: u32 = 1 << 20;

/// Largest value a 24-bit address field holds
pub const MAX_ADDRESS: u32 = 0xFF_FFFF;

/// Playback clock the rate divider is applied to
pub const RATE_CLOCK_HZ: u32 = 2_000_000;

// ============================================================================
// Warnings
// ============================================================================

/// Non-fatal anomaly found while reading or rebuilding a table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatWarning {
    /// A header field holds an unexpected value
    #[error("unexpected {field}: expected 0x{expected:X}, observed 0x{observed:X}")]
    UnexpectedField {
        field: &'static str,
        expected: u32,
        observed: u32,
    },
    /// An entry starts past the end of flash and is marked invalid
    #[error("entry {index} starts at 0x{address:X}, outside the flash")]
    AddressOutOfRange { index: u8, address: u32 },
    /// An entry does not start after the previous valid entry
    #[error("entry {index} starts at 0x{address:X}, not after the previous entry at 0x{previous:X}")]
    NotAscending { index: u8, previous: u32, address: u32 },
    /// The image is too short for the full table; missing bytes read as zero
    #[error("image is {length} bytes, the table needs {required}")]
    Truncated { length: usize, required: usize },
}

/// A value plus the warnings produced while building it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    pub value: T,
    pub warnings: Vec<FormatWarning>,
}

impl<T> Parsed<T> {
    /// Whether no warnings were produced
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Drop the warnings
    pub fn into_value(self) -> T {
        self.value
    }
}
