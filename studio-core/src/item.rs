//! Design items - the images and text placed on the product.
//!
//! An [`Item`] says *what* is placed and where it nominally goes when first
//! created. Its live geometry lives in the render-state store, keyed by
//! [`ItemId`]. The order of an [`ItemList`] is the authoritative z-order:
//! index 0 is bottom-most, the last index is top-most.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Last id handed out by [`ItemId::next`].
static LAST_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identifier for an item.
///
/// Generated from the creation timestamp in milliseconds, bumped when two
/// items are created within the same millisecond so ids stay strictly
/// increasing for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    /// Generate a fresh id.
    #[must_use]
    pub fn next() -> Self {
        let now = current_timestamp_ms();
        let mut last = LAST_ID.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match LAST_ID.compare_exchange_weak(last, candidate, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return Self(candidate),
                Err(actual) => last = actual,
            }
        }
    }

    /// Wrap a raw id, e.g. one read back from a document.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw integer value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ItemId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// A point on the design surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate in surface pixels.
    pub x: f64,
    /// Vertical coordinate in surface pixels.
    pub y: f64,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An image placed on the product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageItem {
    /// Item identity.
    pub id: ItemId,
    /// Image asset reference (URL, path or data URI).
    pub src: String,
    /// Nominal position at creation time.
    pub origin: Point,
}

/// A text label placed on the product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextItem {
    /// Item identity.
    pub id: ItemId,
    /// Literal text content.
    pub text: String,
    /// Font selector, resolved through the font table.
    pub font: String,
    /// Fill color as a CSS color string.
    pub fill: String,
    /// Nominal position at creation time.
    pub origin: Point,
}

/// Which variant an item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// An image item.
    Image,
    /// A text item.
    Text,
}

/// A placed design element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Item {
    /// An image.
    Image(ImageItem),
    /// A text label.
    Text(TextItem),
}

impl Item {
    /// Create an image item with a fresh id.
    #[must_use]
    pub fn image(src: impl Into<String>, origin: Point) -> Self {
        Self::Image(ImageItem {
            id: ItemId::next(),
            src: src.into(),
            origin,
        })
    }

    /// Create a text item with a fresh id.
    #[must_use]
    pub fn text(
        text: impl Into<String>,
        font: impl Into<String>,
        fill: impl Into<String>,
        origin: Point,
    ) -> Self {
        Self::Text(TextItem {
            id: ItemId::next(),
            text: text.into(),
            font: font.into(),
            fill: fill.into(),
            origin,
        })
    }

    /// The item's identity.
    #[must_use]
    pub const fn id(&self) -> ItemId {
        match self {
            Self::Image(image) => image.id,
            Self::Text(text) => text.id,
        }
    }

    /// The item's nominal creation position.
    #[must_use]
    pub const fn origin(&self) -> Point {
        match self {
            Self::Image(image) => image.origin,
            Self::Text(text) => text.origin,
        }
    }

    /// Which variant this item is.
    #[must_use]
    pub const fn kind(&self) -> ItemKind {
        match self {
            Self::Image(_) => ItemKind::Image,
            Self::Text(_) => ItemKind::Text,
        }
    }

    /// The image record, if this is an image.
    #[must_use]
    pub const fn as_image(&self) -> Option<&ImageItem> {
        match self {
            Self::Image(image) => Some(image),
            Self::Text(_) => None,
        }
    }

    /// The text record, if this is a text label.
    #[must_use]
    pub const fn as_text(&self) -> Option<&TextItem> {
        match self {
            Self::Text(text) => Some(text),
            Self::Image(_) => None,
        }
    }
}

/// Ordered item collection; list order is z-order (bottom first).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemList {
    items: Vec<Item>,
}

impl ItemList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item on top of the stack.
    pub fn push(&mut self, item: Item) -> ItemId {
        let id = item.id();
        self.items.push(item);
        id
    }

    /// Remove an item, returning it if it was present.
    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        let index = self.position(id)?;
        Some(self.items.remove(index))
    }

    /// Look up an item by id.
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Replace an item with a new revision carrying the same id.
    ///
    /// Returns `false` if no item with that id exists.
    pub fn replace(&mut self, item: Item) -> bool {
        match self.position(item.id()) {
            Some(index) => {
                self.items[index] = item;
                true
            }
            None => false,
        }
    }

    /// Overwrite the text content of a text item.
    ///
    /// Returns `false` if the id is unknown or names an image.
    pub fn set_text(&mut self, id: ItemId, text: &str) -> bool {
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(Item::Text(item)) => {
                item.text = text.to_string();
                true
            }
            _ => false,
        }
    }

    /// List index of an item (0 = bottom).
    #[must_use]
    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    /// Move an item to the given list index, clamped to the list bounds.
    pub fn move_to(&mut self, id: ItemId, index: usize) -> bool {
        let Some(from) = self.position(id) else {
            return false;
        };
        let item = self.items.remove(from);
        let to = index.min(self.items.len());
        self.items.insert(to, item);
        true
    }

    /// Move an item one step up the stack.
    pub fn bring_forward(&mut self, id: ItemId) -> bool {
        match self.position(id) {
            Some(index) if index + 1 < self.items.len() => {
                self.items.swap(index, index + 1);
                true
            }
            _ => false,
        }
    }

    /// Move an item one step down the stack.
    pub fn send_backward(&mut self, id: ItemId) -> bool {
        match self.position(id) {
            Some(index) if index > 0 => {
                self.items.swap(index, index - 1);
                true
            }
            _ => false,
        }
    }

    /// Move an item to the top of the stack.
    pub fn bring_to_front(&mut self, id: ItemId) -> bool {
        let top = self.items.len();
        self.move_to(id, top)
    }

    /// Move an item to the bottom of the stack.
    pub fn send_to_back(&mut self, id: ItemId) -> bool {
        self.move_to(id, 0)
    }

    /// Item ids as a layers panel shows them: top-most first.
    #[must_use]
    pub fn layers(&self) -> Vec<ItemId> {
        self.items.iter().rev().map(Item::id).collect()
    }

    /// Move a layer using layers-panel indices (0 = top-most).
    pub fn move_layer(&mut self, from: usize, to: usize) -> bool {
        let len = self.items.len();
        if from >= len || to >= len {
            return false;
        }
        let id = self.items[len - 1 - from].id();
        self.move_to(id, len - 1 - to)
    }

    /// Iterate bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    /// Items as a slice, bottom first.
    #[must_use]
    pub fn as_slice(&self) -> &[Item] {
        &self.items
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<Vec<Item>> for ItemList {
    fn from(items: Vec<Item>) -> Self {
        Self { items }
    }
}

#[allow(clippy::cast_possible_truncation)] // Milliseconds fit in u64 for billions of years
fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
