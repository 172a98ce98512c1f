//! Asset loading error types.

use studio_core::AssetError;
use thiserror::Error;

/// Result type for asset loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors that can occur while resolving an asset.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source does not name an existing file.
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// A data URI could not be parsed.
    #[error("Invalid data URI: {0}")]
    DataUri(String),

    /// The bytes are not a decodable image.
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Reading the file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No font file exists for the family.
    #[error("Font unavailable: {0}")]
    Font(String),
}

impl From<LoadError> for AssetError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::NotFound(src) => Self::NotFound(src),
            LoadError::DataUri(reason) => Self::Decode(reason),
            LoadError::Decode(e) => Self::Decode(e.to_string()),
            LoadError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::NotFound(e.to_string())
            }
            LoadError::Io(e) => Self::Io(e.to_string()),
            LoadError::Font(family) => Self::FontUnavailable(family),
        }
    }
}
