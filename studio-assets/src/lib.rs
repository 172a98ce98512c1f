//! # Studio Assets
//!
//! Asset resolution for the design surface engine.
//!
//! ```text
//! ┌──────────────┐   load_image / load_font   ┌────────────────┐
//! │  Reconciler  │ ─────────────────────────► │ FsAssetLoader  │
//! └──────────────┘                            ├───────┬────────┤
//!                                             │ cache │ probe  │
//!                                             └───────┴────────┘
//!                                              data: URI │ file
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod error;
pub mod image;
pub mod loader;

pub use cache::{AssetCache, AssetCacheConfig, CacheStats};
pub use error::{LoadError, LoadResult};
pub use loader::FsAssetLoader;
