//! Error types for design surface operations.

use thiserror::Error;

use crate::assets::AssetError;
use crate::item::ItemId;

/// Result type for design surface operations.
pub type DesignResult<T> = Result<T, DesignError>;

/// Errors that can occur in design surface operations.
#[derive(Debug, Error)]
pub enum DesignError {
    /// Item not found in the item list.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// An asset could not be resolved.
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Document serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Undo was requested with no earlier snapshot.
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Redo was requested with no later snapshot.
    #[error("Nothing to redo")]
    NothingToRedo,
}
