//! Per-item render state: the durable geometry that survives scene rebuilds.
//!
//! The [`RenderStateStore`] is shared between the defaulting pass, the
//! transform façade and the gesture feedback listener. Every mutation is a
//! read-merge-write against the latest value held by the store, expressed as
//! a [`RenderStatePatch`].

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::item::{Item, ItemId, ItemKind};

/// Default size for newly placed images, in surface pixels.
pub const DEFAULT_IMAGE_SIZE: f64 = 60.0;

/// Default font size for newly placed text.
pub const DEFAULT_TEXT_SIZE: f64 = 32.0;

/// Normalize an angle in degrees into `[0, 360)`.
#[must_use]
pub fn normalize_degrees(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Explicit per-axis scale. A missing axis reads back as 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    /// Horizontal scale factor.
    #[serde(default = "Scale::unit")]
    pub x: f64,
    /// Vertical scale factor.
    #[serde(default = "Scale::unit")]
    pub y: f64,
}

impl Scale {
    /// Create a scale.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    const fn unit() -> f64 {
        1.0
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

/// Geometric and interaction state for one item.
///
/// Fields added by later schema revisions deserialize to their type default
/// when absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct RenderState {
    /// Center x on the surface.
    pub x: f64,
    /// Center y on the surface.
    pub y: f64,
    /// Nominal size: target edge length for images, font size for text.
    pub size: f64,
    /// Explicit per-axis scale; `None` derives scale from `size`.
    #[serde(default)]
    pub scale: Option<Scale>,
    /// Rotation in degrees, normalized to `[0, 360)`.
    #[serde(default)]
    pub rotation: f64,
    /// Locked items cannot be moved, resized, rotated or edited.
    #[serde(default)]
    pub locked: bool,
    /// Hidden items are left out of the scene.
    #[serde(default = "RenderState::default_visible")]
    pub visible: bool,
    /// Horizontal mirror.
    #[serde(default)]
    pub flip_x: bool,
}

impl RenderState {
    /// Default state for a freshly observed item.
    #[must_use]
    pub fn for_item(item: &Item, defaults: &StateDefaults) -> Self {
        let origin = item.origin();
        Self {
            x: origin.x,
            y: origin.y,
            size: defaults.size_for(item.kind()),
            scale: None,
            rotation: 0.0,
            locked: false,
            visible: true,
            flip_x: false,
        }
    }

    const fn default_visible() -> bool {
        true
    }

    /// Apply a sparse update. Only present fields change.
    pub fn apply(&mut self, patch: &RenderStatePatch) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(size) = patch.size {
            self.size = size;
        }
        if let Some(scale) = patch.scale {
            self.scale = Some(scale);
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = normalize_degrees(rotation);
        }
        if let Some(locked) = patch.locked {
            self.locked = locked;
        }
        if let Some(visible) = patch.visible {
            self.visible = visible;
        }
        if let Some(flip_x) = patch.flip_x {
            self.flip_x = flip_x;
        }
    }
}

/// Sparse update for a render state entry. Only present fields are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderStatePatch {
    /// New center x.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// New center y.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// New nominal size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    /// New explicit scale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<Scale>,
    /// New rotation in degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    /// New lock flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    /// New visibility flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    /// New flip flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flip_x: Option<bool>,
}

/// Default sizes used when an item is first observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateDefaults {
    /// Default image size.
    pub image_size: f64,
    /// Default text font size.
    pub text_size: f64,
}

impl StateDefaults {
    /// Default size for the given item kind.
    #[must_use]
    pub const fn size_for(&self, kind: ItemKind) -> f64 {
        match kind {
            ItemKind::Image => self.image_size,
            ItemKind::Text => self.text_size,
        }
    }
}

impl Default for StateDefaults {
    fn default() -> Self {
        Self {
            image_size: DEFAULT_IMAGE_SIZE,
            text_size: DEFAULT_TEXT_SIZE,
        }
    }
}

/// Shared render-state storage keyed by item id.
///
/// Cloning the store yields another handle onto the same entries.
#[derive(Debug, Clone, Default)]
pub struct RenderStateStore {
    entries: Arc<RwLock<HashMap<ItemId, RenderState>>>,
    defaults: StateDefaults,
}

impl RenderStateStore {
    /// Create an empty store with the standard defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::with_defaults(StateDefaults::default())
    }

    /// Create an empty store with custom defaults.
    #[must_use]
    pub fn with_defaults(defaults: StateDefaults) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            defaults,
        }
    }

    /// The defaults used for new entries.
    #[must_use]
    pub const fn defaults(&self) -> StateDefaults {
        self.defaults
    }

    /// Insert a default entry for every item that has none.
    ///
    /// Existing entries are never touched, so running this twice is the same
    /// as running it once. Returns the ids that received a new entry.
    pub fn ensure_defaults<'a>(&self, items: impl IntoIterator<Item = &'a Item>) -> Vec<ItemId> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut inserted = Vec::new();
        for item in items {
            entries.entry(item.id()).or_insert_with(|| {
                inserted.push(item.id());
                RenderState::for_item(item, &self.defaults)
            });
        }
        if !inserted.is_empty() {
            tracing::debug!("Defaulted render state for {} item(s)", inserted.len());
        }
        inserted
    }

    /// Latest state for an item.
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<RenderState> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .copied()
    }

    /// Whether an entry exists.
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    /// Merge a patch into the latest entry for `id`.
    ///
    /// Returns the merged state, or `None` if the item has no entry.
    pub fn merge(&self, id: ItemId, patch: &RenderStatePatch) -> Option<RenderState> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let state = entries.get_mut(&id)?;
        state.apply(patch);
        Some(*state)
    }

    /// Insert or overwrite an entry.
    pub fn insert(&self, id: ItemId, state: RenderState) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, state);
    }

    /// Remove an entry (item deletion).
    pub fn remove(&self, id: ItemId) -> Option<RenderState> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    /// Copy of all entries.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<ItemId, RenderState> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace every entry at once.
    ///
    /// Only used to restore a consistent (items, render state) snapshot.
    pub fn restore(&self, snapshot: HashMap<ItemId, RenderState>) {
        *self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
