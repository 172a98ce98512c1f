//! Filesystem-backed [`AssetLoader`].
//!
//! Image sources are either inline `data:` URIs or paths relative to an
//! assets root. Fonts are looked up as `<fonts_dir>/<family>.ttf` or `.otf`;
//! without a fonts directory every family is assumed to be available.

use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use studio_core::{AssetError, AssetLoader, ImageAsset};
use tracing::{debug, warn};

use crate::cache::{AssetCache, AssetCacheConfig, CacheStats};
use crate::error::{LoadError, LoadResult};
use crate::image::{is_data_uri, probe_bytes, probe_data_uri};

const FONT_EXTENSIONS: [&str; 2] = ["ttf", "otf"];

/// Loads images from disk or data URIs, caching probed dimensions.
#[derive(Debug)]
pub struct FsAssetLoader {
    root: PathBuf,
    fonts_dir: Option<PathBuf>,
    cache: Mutex<AssetCache>,
}

impl FsAssetLoader {
    /// Create a loader resolving relative sources against `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fonts_dir: None,
            cache: Mutex::new(AssetCache::new()),
        }
    }

    /// Require fonts to exist as files in `dir`.
    #[must_use]
    pub fn with_fonts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fonts_dir = Some(dir.into());
        self
    }

    /// Replace the cache configuration.
    #[must_use]
    pub fn with_cache_config(mut self, config: AssetCacheConfig) -> Self {
        self.cache = Mutex::new(AssetCache::with_config(config));
        self
    }

    /// The directory relative sources resolve against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache statistics so far.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stats()
    }

    /// Resolve a source to a path under the root.
    ///
    /// Absolute paths and `..` components are rejected so documents cannot
    /// reach outside the assets root.
    fn resolve_path(&self, src: &str) -> LoadResult<PathBuf> {
        let relative = Path::new(src);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(LoadError::NotFound(src.to_string()));
        }
        Ok(self.root.join(relative))
    }

    async fn probe(&self, src: &str) -> LoadResult<ImageAsset> {
        if is_data_uri(src) {
            return probe_data_uri(src);
        }
        let path = self.resolve_path(src)?;
        let bytes = tokio::fs::read(&path).await?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        probe_bytes(&bytes)
    }

    fn cached(&self, src: &str) -> Option<ImageAsset> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(src)
    }

    fn remember(&self, src: &str, asset: ImageAsset) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(src, asset);
    }
}

#[async_trait]
impl AssetLoader for FsAssetLoader {
    async fn load_image(&self, src: &str) -> Result<ImageAsset, AssetError> {
        if let Some(asset) = self.cached(src) {
            return Ok(asset);
        }
        match self.probe(src).await {
            Ok(asset) => {
                self.remember(src, asset);
                Ok(asset)
            }
            Err(e) => {
                warn!("Failed to load image {}: {}", short(src), e);
                Err(e.into())
            }
        }
    }

    async fn load_font(&self, family: &str) -> Result<(), AssetError> {
        let Some(dir) = &self.fonts_dir else {
            return Ok(());
        };
        for ext in FONT_EXTENSIONS {
            let candidate = dir.join(format!("{family}.{ext}"));
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                debug!("Font {family} found at {}", candidate.display());
                return Ok(());
            }
        }
        Err(LoadError::Font(family.to_string()).into())
    }
}

/// Data URIs can be huge; keep log lines readable.
fn short(src: &str) -> &str {
    if is_data_uri(src) {
        src.split_once(',').map_or(src, |(meta, _)| meta)
    } else {
        src
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rejects_escaping_paths() {
        let loader = FsAssetLoader::new("/assets");
        assert_eq!(
            loader.resolve_path("shirts/tee.png").expect("inside root"),
            PathBuf::from("/assets/shirts/tee.png")
        );
        assert!(loader.resolve_path("../secret.png").is_err());
        assert!(loader.resolve_path("/etc/passwd").is_err());
    }

    #[test]
    fn test_short_hides_payload() {
        assert_eq!(short("data:image/png;base64,AAAA"), "data:image/png;base64");
        assert_eq!(short("logo.png"), "logo.png");
    }
}
