//! Loading base flash images

use std::io;
use std::path::{Path, PathBuf};

/// Where the original flash dump is expected when no path is given
pub const DEFAULT_IMAGE_PATH: &str = "flash_images/ORIGINAL_FLASH_IMAGE";

/// Environment variable overriding [`DEFAULT_IMAGE_PATH`]
pub const IMAGE_PATH_ENV: &str = "SPANA_IMAGE";

/// Errors loading a flash image
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// The image file does not exist. There is no synthetic fallback.
    #[error(
        "no flash image found at {}\n  This action needs a dump of the toy's SPI flash.\n  \
         Extract one from the device, place it at that path or point SPANA_IMAGE at it, and try again.",
        .path.display()
    )]
    NotFound { path: PathBuf },
    #[error("failed to read flash image {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Image path from `SPANA_IMAGE`, else [`DEFAULT_IMAGE_PATH`]
pub fn default_image_path() -> PathBuf {
    std::env::var_os(IMAGE_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGE_PATH))
}

/// Read a whole flash image into memory
pub fn load_image(path: &Path) -> Result<Vec<u8>, ImageError> {
    std::fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ImageError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ImageError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Read the image at [`default_image_path`]
pub fn load_default_image() -> Result<Vec<u8>, ImageError> {
    load_image(&default_image_path())
}
