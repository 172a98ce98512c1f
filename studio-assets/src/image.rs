//! Image metadata decoding.
//!
//! Only the natural dimensions matter to the engine, so images are probed
//! from their header without decoding pixel data. Sources may be raw bytes
//! or `data:` URIs (base64 or percent-encoded).

use std::io::Cursor;

use base64::Engine;
use image::ImageReader;
use studio_core::ImageAsset;

use crate::error::{LoadError, LoadResult};

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// WebP (alpha support).
    WebP,
    /// GIF.
    Gif,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "webp" => Self::WebP,
            "gif" => Self::Gif,
            _ => Self::Unknown,
        }
    }

    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            Self::Png
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Self::Jpeg
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Self::WebP
        } else if data.starts_with(b"GIF8") {
            Self::Gif
        } else {
            Self::Unknown
        }
    }
}

/// Whether a source string is an inline data URI.
#[must_use]
pub fn is_data_uri(src: &str) -> bool {
    src.starts_with("data:")
}

/// Read the natural size of an encoded image.
///
/// # Errors
///
/// Returns an error if the format cannot be recognised or the header is
/// malformed.
pub fn probe_bytes(data: &[u8]) -> LoadResult<ImageAsset> {
    let (width, height) = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .into_dimensions()?;
    tracing::trace!(
        "Probed {:?} image {width}x{height}",
        ImageFormat::from_magic_bytes(data)
    );
    Ok(ImageAsset::new(width, height))
}

/// Decode the payload of a data URI.
///
/// Supports `data:image/png;base64,...` and percent-encoded payloads.
///
/// # Errors
///
/// Returns an error if the URI is malformed.
pub fn decode_data_uri(uri: &str) -> LoadResult<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| LoadError::DataUri("not a data URI".to_string()))?;
    let (metadata, payload) = rest
        .split_once(',')
        .ok_or_else(|| LoadError::DataUri("missing comma".to_string()))?;

    if metadata.split(';').any(|part| part == "base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| LoadError::DataUri(format!("bad base64: {e}")))
    } else {
        percent_decode(payload)
    }
}

/// Read the natural size of an image embedded in a data URI.
///
/// # Errors
///
/// Returns an error if the URI is malformed or the image cannot be probed.
pub fn probe_data_uri(uri: &str) -> LoadResult<ImageAsset> {
    probe_bytes(&decode_data_uri(uri)?)
}

fn percent_decode(input: &str) -> LoadResult<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = bytes
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| LoadError::DataUri("invalid percent encoding".to_string()))?;
            result.push(byte);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }
    Ok(result)
}
