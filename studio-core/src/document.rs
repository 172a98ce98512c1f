//! Serialized design document.
//!
//! A document is the durable form of a design: the item list, render state
//! for every item, the background, the product and the selection. Fields
//! added by later revisions default when absent, so older documents load
//! with scale and flip backfilled.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::DesignResult;
use crate::item::{ItemId, ItemList};
use crate::product::{Background, Product};
use crate::render_state::RenderState;

/// Current document format version.
pub const DOCUMENT_VERSION: u32 = 2;

/// A complete design.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignDocument {
    /// Format version the document was written with.
    #[serde(default = "DesignDocument::default_version")]
    pub version: u32,
    /// Items in z-order, bottom first.
    #[serde(default)]
    pub items: ItemList,
    /// Render state keyed by item id.
    #[serde(default)]
    pub render_state: BTreeMap<ItemId, RenderState>,
    /// Background image, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,
    /// Product being designed on.
    #[serde(default)]
    pub product: Product,
    /// Selected item, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<ItemId>,
}

impl DesignDocument {
    const fn default_version() -> u32 {
        1
    }

    /// Create an empty document for a product.
    #[must_use]
    pub fn new(product: Product) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            product,
            ..Self::default()
        }
    }

    /// Parse a document from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> DesignResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the document to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> DesignResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render state as the store holds it.
    #[must_use]
    pub fn render_map(&self) -> HashMap<ItemId, RenderState> {
        self.render_state
            .iter()
            .map(|(id, state)| (*id, *state))
            .collect()
    }
}
