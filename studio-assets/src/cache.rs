//! Metadata cache for resolved images.
//!
//! Every reconciliation pass re-resolves every image, so probed dimensions
//! are cached by source to avoid repeated reads and header parsing.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use studio_core::ImageAsset;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    asset: ImageAsset,
    last_accessed: Instant,
}

/// Configuration for the asset cache.
#[derive(Debug, Clone, Copy)]
pub struct AssetCacheConfig {
    /// Maximum number of entries.
    pub max_entries: usize,
    /// Maximum age before eviction (if not accessed).
    pub max_age: Duration,
}

impl Default for AssetCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 512,
            max_age: Duration::from_secs(300), // 5 minutes
        }
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of evictions.
    pub evictions: u64,
}

/// LRU cache of image metadata keyed by source.
#[derive(Debug)]
pub struct AssetCache {
    entries: HashMap<String, CacheEntry>,
    config: AssetCacheConfig,
    stats: CacheStats,
}

impl AssetCache {
    /// Create a cache with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(AssetCacheConfig::default())
    }

    /// Create a cache with custom configuration.
    #[must_use]
    pub fn with_config(config: AssetCacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            config,
            stats: CacheStats::default(),
        }
    }

    /// Look up an asset, refreshing its access time.
    ///
    /// Entries older than the max age count as misses and are dropped.
    pub fn get(&mut self, key: &str) -> Option<ImageAsset> {
        let now = Instant::now();
        let max_age = self.config.max_age;
        match self.entries.get_mut(key) {
            Some(entry) if now.duration_since(entry.last_accessed) <= max_age => {
                entry.last_accessed = now;
                self.stats.hits += 1;
                Some(entry.asset)
            }
            Some(_) => {
                self.entries.remove(key);
                self.stats.evictions += 1;
                self.stats.misses += 1;
                None
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Insert an asset, evicting as needed to stay within limits.
    pub fn insert(&mut self, key: impl Into<String>, asset: ImageAsset) {
        let key = key.into();
        if !self.entries.contains_key(&key) {
            self.evict_if_needed();
        }
        self.entries.insert(
            key,
            CacheEntry {
                asset,
                last_accessed: Instant::now(),
            },
        );
    }

    /// Remove an entry.
    pub fn remove(&mut self, key: &str) -> Option<ImageAsset> {
        self.entries.remove(key).map(|entry| entry.asset)
    }

    /// Check if an entry is cached.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Clear all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Get the current number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get cache statistics.
    #[must_use]
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drop expired entries (call periodically).
    pub fn maintenance(&mut self) {
        self.evict_expired();
    }

    fn evict_if_needed(&mut self) {
        self.evict_expired();
        while self.entries.len() >= self.config.max_entries && !self.entries.is_empty() {
            self.evict_lru();
        }
    }

    fn evict_lru(&mut self) {
        let oldest_key = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest_key {
            if self.entries.remove(&key).is_some() {
                self.stats.evictions += 1;
            }
        }
    }

    fn evict_expired(&mut self) {
        let now = Instant::now();
        let max_age = self.config.max_age;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.duration_since(entry.last_accessed) <= max_age);
        self.stats.evictions += (before - self.entries.len()) as u64;
    }
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new()
    }
}
