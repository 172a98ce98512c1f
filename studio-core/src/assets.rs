//! Asset resolution seam.
//!
//! The reconciler never fetches bytes itself. Image and font resolution is
//! delegated to an [`AssetLoader`] supplied by the host; failures are reported
//! back as [`AssetError`] and the affected item is left out of that pass.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pixel dimensions of a resolved asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Dimensions {
    /// Create dimensions.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A decoded image, as far as geometry is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    /// Natural (intrinsic) size of the image.
    pub natural: Dimensions,
}

impl ImageAsset {
    /// Create an image asset from its natural size in pixels.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            natural: Dimensions::new(f64::from(width), f64::from(height)),
        }
    }
}

/// Errors reported by asset loaders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    /// The asset reference does not resolve to anything.
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// The asset was found but could not be decoded.
    #[error("Failed to decode asset: {0}")]
    Decode(String),

    /// Reading the asset failed.
    #[error("IO error: {0}")]
    Io(String),

    /// The font family is not available.
    #[error("Font unavailable: {0}")]
    FontUnavailable(String),
}

/// Resolves images and fonts for the reconciler.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// Resolve an image reference to its natural size.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be found or decoded.
    async fn load_image(&self, src: &str) -> Result<ImageAsset, AssetError>;

    /// Make a font family available for text objects.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::FontUnavailable`] if the family cannot be loaded.
    async fn load_font(&self, family: &str) -> Result<(), AssetError>;
}

#[async_trait]
impl<L: AssetLoader + ?Sized> AssetLoader for Arc<L> {
    async fn load_image(&self, src: &str) -> Result<ImageAsset, AssetError> {
        (**self).load_image(src).await
    }

    async fn load_font(&self, family: &str) -> Result<(), AssetError> {
        (**self).load_font(family).await
    }
}

/// In-memory loader with a fixed set of known images and fonts.
///
/// Fonts are all available unless explicitly marked missing.
#[derive(Debug, Clone, Default)]
pub struct StaticAssets {
    images: HashMap<String, ImageAsset>,
    missing_fonts: HashSet<String>,
}

impl StaticAssets {
    /// Create an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image with its natural size.
    #[must_use]
    pub fn with_image(mut self, src: impl Into<String>, width: u32, height: u32) -> Self {
        self.images.insert(src.into(), ImageAsset::new(width, height));
        self
    }

    /// Mark a font family as unavailable.
    #[must_use]
    pub fn without_font(mut self, family: impl Into<String>) -> Self {
        self.missing_fonts.insert(family.into());
        self
    }
}

#[async_trait]
impl AssetLoader for StaticAssets {
    async fn load_image(&self, src: &str) -> Result<ImageAsset, AssetError> {
        self.images
            .get(src)
            .copied()
            .ok_or_else(|| AssetError::NotFound(src.to_string()))
    }

    async fn load_font(&self, family: &str) -> Result<(), AssetError> {
        if self.missing_fonts.contains(family) {
            Err(AssetError::FontUnavailable(family.to_string()))
        } else {
            Ok(())
        }
    }
}

/// Family used when a font key is not in the table.
pub const FALLBACK_FONT_FAMILY: &str = "Roboto";

/// Fixed lookup table from item font keys to font families.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontTable {
    families: HashMap<String, String>,
    fallback: String,
}

impl FontTable {
    /// Resolve a font key to a family, falling back for unknown keys.
    #[must_use]
    pub fn resolve(&self, key: &str) -> &str {
        self.families.get(key).map_or(self.fallback.as_str(), String::as_str)
    }

    /// Whether the key has its own entry.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.families.contains_key(key)
    }
}

impl Default for FontTable {
    fn default() -> Self {
        let families = [
            ("sans", "Roboto"),
            ("serif", "Playfair Display"),
            ("mono", "Roboto Mono"),
            ("script", "Pacifico"),
            ("display", "Bebas Neue"),
            ("handwriting", "Caveat"),
            ("rounded", "Nunito"),
            ("condensed", "Oswald"),
        ]
        .into_iter()
        .map(|(key, family)| (key.to_string(), family.to_string()))
        .collect();
        Self {
            families,
            fallback: FALLBACK_FONT_FAMILY.to_string(),
        }
    }
}
