//! Rendering surface abstraction.
//!
//! The surface is a retained scene graph owned by the host (a browser canvas,
//! a native view, or [`crate::memory::MemorySurface`] in tests). The engine
//! drives it through the [`Surface`] trait and hears back from it through
//! [`SurfaceEvent`]s.
//!
//! Scene objects carry no item identity. The reconciler owns an explicit
//! [`SceneIndex`] mapping handles to item ids, kept next to the surface in a
//! [`Stage`] so both are always swapped and cleared together.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::assets::Dimensions;
use crate::item::ItemId;

/// Average glyph advance as a fraction of the font size.
pub const TEXT_CHAR_WIDTH: f64 = 0.6;

/// Line height as a multiple of the font size.
pub const TEXT_LINE_HEIGHT: f64 = 1.16;

/// Opaque handle to an object on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectHandle(u64);

impl ObjectHandle {
    /// Wrap a raw handle value. Surfaces allocate these.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw handle value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a scene object draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SceneContent {
    /// The product background image.
    Background {
        /// Image asset reference.
        src: String,
        /// Natural image size.
        natural: Dimensions,
    },
    /// A placed image.
    Image {
        /// Image asset reference.
        src: String,
        /// Natural image size.
        natural: Dimensions,
    },
    /// An editable text label.
    Text {
        /// Current text content.
        text: String,
        /// Resolved font family.
        font_family: String,
        /// Fill color.
        fill: String,
        /// Font size in pixels.
        font_size: f64,
    },
}

/// Which manipulation handles are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
    /// The four corner resize handles.
    pub corners: bool,
    /// The four edge (single-axis) resize handles.
    pub edges: bool,
    /// The rotation handle.
    pub rotation: bool,
}

impl Controls {
    /// Corner and rotation handles; edge handles suppressed.
    pub const CORNERS_ONLY: Self = Self {
        corners: true,
        edges: false,
        rotation: true,
    };

    /// No handles at all.
    pub const NONE: Self = Self {
        corners: false,
        edges: false,
        rotation: false,
    };
}

/// Interaction flags for a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Interaction {
    /// Can become the active object.
    pub selectable: bool,
    /// Can be dragged.
    pub movable: bool,
    /// Can be resized with handles.
    pub scalable: bool,
    /// Can be rotated with the rotation handle.
    pub rotatable: bool,
    /// Text can be edited inline.
    pub editable: bool,
    /// Whether any handles are drawn.
    pub has_controls: bool,
    /// Which handles are drawn when `has_controls` is set.
    pub controls: Controls,
}

impl Interaction {
    /// Completely inert: not selectable, no handles.
    pub const INERT: Self = Self {
        selectable: false,
        movable: false,
        scalable: false,
        rotatable: false,
        editable: false,
        has_controls: false,
        controls: Controls::NONE,
    };
}

/// One object in the retained scene.
///
/// Objects are positioned by their center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// What the object draws.
    pub content: SceneContent,
    /// Center x.
    pub x: f64,
    /// Center y.
    pub y: f64,
    /// Horizontal scale.
    pub scale_x: f64,
    /// Vertical scale.
    pub scale_y: f64,
    /// Rotation in degrees.
    pub angle: f64,
    /// Horizontal mirror.
    pub flip_x: bool,
    /// Interaction flags.
    pub interaction: Interaction,
}

impl SceneObject {
    /// Whether this is a text object.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self.content, SceneContent::Text { .. })
    }

    /// Whether this is the background.
    #[must_use]
    pub const fn is_background(&self) -> bool {
        matches!(self.content, SceneContent::Background { .. })
    }

    /// Font size, for text objects.
    #[must_use]
    pub const fn font_size(&self) -> Option<f64> {
        match self.content {
            SceneContent::Text { font_size, .. } => Some(font_size),
            _ => None,
        }
    }

    /// Text content, for text objects.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            SceneContent::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Unscaled size of the object.
    ///
    /// Text is measured with a fixed average glyph advance and line height.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Line and character counts are small
    pub fn natural_size(&self) -> Dimensions {
        match &self.content {
            SceneContent::Background { natural, .. } | SceneContent::Image { natural, .. } => {
                *natural
            }
            SceneContent::Text {
                text, font_size, ..
            } => {
                let lines = text.lines().count().max(1);
                let widest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
                Dimensions::new(
                    widest as f64 * font_size * TEXT_CHAR_WIDTH,
                    lines as f64 * font_size * TEXT_LINE_HEIGHT,
                )
            }
        }
    }

    /// Size as drawn: natural size times absolute scale.
    #[must_use]
    pub fn rendered_size(&self) -> Dimensions {
        let natural = self.natural_size();
        Dimensions::new(
            natural.width * self.scale_x.abs(),
            natural.height * self.scale_y.abs(),
        )
    }
}

/// Native events reported by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// A gesture made an object active.
    SelectionCreated(ObjectHandle),
    /// A gesture switched the active object.
    SelectionUpdated(ObjectHandle),
    /// The active object was cleared.
    SelectionCleared,
    /// A drag, scale or rotate gesture ended.
    ObjectModified(ObjectHandle),
    /// An inline text editing session ended.
    TextEditingExited(ObjectHandle),
    /// An object was double-clicked or double-tapped.
    DoubleActivated(ObjectHandle),
}

/// A retained scene graph the engine can drive.
pub trait Surface: Send {
    /// Remove every object.
    fn clear(&mut self);

    /// Set the fill behind all objects; `None` is transparent.
    fn set_background_color(&mut self, color: Option<&str>);

    /// Size the surface to the product's editable area.
    fn set_dimensions(&mut self, width: f64, height: f64);

    /// Append an object on top of the stack.
    fn add(&mut self, object: SceneObject) -> ObjectHandle;

    /// Move an object to the bottom of the stack.
    fn send_to_back(&mut self, handle: ObjectHandle);

    /// Look up an object.
    fn object(&self, handle: ObjectHandle) -> Option<&SceneObject>;

    /// Look up an object for mutation.
    fn object_mut(&mut self, handle: ObjectHandle) -> Option<&mut SceneObject>;

    /// Handles bottom to top.
    fn order(&self) -> Vec<ObjectHandle>;

    /// Make an object active, or clear the active object.
    fn set_active(&mut self, handle: Option<ObjectHandle>);

    /// The active object.
    fn active(&self) -> Option<ObjectHandle>;

    /// Reset zoom and pan to identity.
    fn reset_viewport(&mut self);

    /// Redraw now.
    fn request_render(&mut self);

    /// Whether the surface has been torn down.
    fn is_disposed(&self) -> bool;

    /// Tear the surface down. Later writes are ignored by the engine.
    fn dispose(&mut self);
}

/// Bidirectional map between scene object handles and item ids.
#[derive(Debug, Clone, Default)]
pub struct SceneIndex {
    by_item: HashMap<ItemId, ObjectHandle>,
    by_handle: HashMap<ObjectHandle, ItemId>,
    background: Option<ObjectHandle>,
}

impl SceneIndex {
    /// Record that `handle` draws item `id`.
    pub fn insert(&mut self, id: ItemId, handle: ObjectHandle) {
        if let Some(old) = self.by_item.insert(id, handle) {
            self.by_handle.remove(&old);
        }
        self.by_handle.insert(handle, id);
    }

    /// Handle drawing an item.
    #[must_use]
    pub fn handle_of(&self, id: ItemId) -> Option<ObjectHandle> {
        self.by_item.get(&id).copied()
    }

    /// Item drawn by a handle.
    #[must_use]
    pub fn item_of(&self, handle: ObjectHandle) -> Option<ItemId> {
        self.by_handle.get(&handle).copied()
    }

    /// Drop the mapping for an item. Returns the handle it had.
    pub fn remove(&mut self, id: ItemId) -> Option<ObjectHandle> {
        let handle = self.by_item.remove(&id)?;
        self.by_handle.remove(&handle);
        Some(handle)
    }

    /// Keep only the mappings whose item passes `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(ItemId) -> bool) {
        self.by_item.retain(|id, _| keep(*id));
        let by_item = &self.by_item;
        self.by_handle.retain(|_, id| by_item.contains_key(id));
    }

    /// Record the background handle.
    pub fn set_background(&mut self, handle: ObjectHandle) {
        self.background = Some(handle);
    }

    /// The background handle, if placed.
    #[must_use]
    pub const fn background(&self) -> Option<ObjectHandle> {
        self.background
    }

    /// Forget every mapping.
    pub fn clear(&mut self) {
        self.by_item.clear();
        self.by_handle.clear();
        self.background = None;
    }

    /// Number of mapped items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_item.len()
    }

    /// Whether no items are mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_item.is_empty()
    }
}

/// Identifies one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassToken(u64);

#[derive(Debug)]
struct StageInner<S> {
    surface: S,
    index: SceneIndex,
    generation: u64,
}

/// Shared handle to the current surface and its scene index.
///
/// Cloning the stage yields another handle onto the same surface.
#[derive(Debug)]
pub struct Stage<S> {
    inner: Arc<Mutex<StageInner<S>>>,
}

impl<S> Clone for Stage<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Surface> Stage<S> {
    /// Wrap a surface.
    #[must_use]
    pub fn new(surface: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StageInner {
                surface,
                index: SceneIndex::default(),
                generation: 0,
            })),
        }
    }

    /// Run `f` with mutable access to the surface and index.
    pub fn with<R>(&self, f: impl FnOnce(&mut S, &mut SceneIndex) -> R) -> R {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let StageInner { surface, index, .. } = &mut *inner;
        f(surface, index)
    }

    /// Run `f` with shared access to the surface and index.
    pub fn read<R>(&self, f: impl FnOnce(&S, &SceneIndex) -> R) -> R {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&inner.surface, &inner.index)
    }

    /// Swap in a new surface, disposing the old one.
    ///
    /// Any pass still running against the old surface becomes inert.
    pub fn replace_surface(&self, surface: S) -> S {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let mut old = std::mem::replace(&mut inner.surface, surface);
        old.dispose();
        inner.index.clear();
        inner.generation += 1;
        tracing::debug!("Surface replaced (generation {})", inner.generation);
        old
    }

    /// Start a new pass: clears the surface and index and supersedes every
    /// earlier pass.
    pub fn begin_pass(&self) -> PassToken {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.generation += 1;
        inner.surface.clear();
        inner.surface.set_background_color(None);
        inner.index.clear();
        PassToken(inner.generation)
    }

    /// Run `f` only if `token` is still the current pass and the surface is
    /// live. Returns `None` for a stale pass.
    pub fn commit<R>(
        &self,
        token: PassToken,
        f: impl FnOnce(&mut S, &mut SceneIndex) -> R,
    ) -> Option<R> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.generation != token.0 || inner.surface.is_disposed() {
            return None;
        }
        let StageInner { surface, index, .. } = &mut *inner;
        Some(f(surface, index))
    }

    /// Whether `token` is still the current pass.
    #[must_use]
    pub fn is_current(&self, token: PassToken) -> bool {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.generation == token.0 && !inner.surface.is_disposed()
    }

    /// Handle currently drawing an item.
    #[must_use]
    pub fn handle_of(&self, id: ItemId) -> Option<ObjectHandle> {
        self.read(|_, index| index.handle_of(id))
    }

    /// Item drawn by a handle.
    #[must_use]
    pub fn item_of(&self, handle: ObjectHandle) -> Option<ItemId> {
        self.read(|_, index| index.item_of(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySurface;

    fn image_object(x: f64) -> SceneObject {
        SceneObject {
            content: SceneContent::Image {
                src: "a.png".to_string(),
                natural: Dimensions::new(100.0, 50.0),
            },
            x,
            y: 0.0,
            scale_x: 0.5,
            scale_y: -2.0,
            angle: 0.0,
            flip_x: false,
            interaction: Interaction::INERT,
        }
    }

    #[test]
    fn test_rendered_size_uses_absolute_scale() {
        let size = image_object(0.0).rendered_size();
        assert!((size.width - 50.0).abs() < f64::EPSILON);
        assert!((size.height - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_text_natural_size() {
        let object = SceneObject {
            content: SceneContent::Text {
                text: "abcd\nab".to_string(),
                font_family: "Roboto".to_string(),
                fill: "#000".to_string(),
                font_size: 10.0,
            },
            ..image_object(0.0)
        };
        let natural = object.natural_size();
        assert!((natural.width - 24.0).abs() < 1e-9);
        assert!((natural.height - 23.2).abs() < 1e-9);
    }

    #[test]
    fn test_index_is_bidirectional() {
        let mut index = SceneIndex::default();
        let id = ItemId::next();
        index.insert(id, ObjectHandle::new(1));
        assert_eq!(index.handle_of(id), Some(ObjectHandle::new(1)));
        assert_eq!(index.item_of(ObjectHandle::new(1)), Some(id));

        // Re-pointing an item forgets the old handle
        index.insert(id, ObjectHandle::new(2));
        assert_eq!(index.item_of(ObjectHandle::new(1)), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_index_remove_and_retain() {
        let mut index = SceneIndex::default();
        let (a, b) = (ItemId::next(), ItemId::next());
        index.insert(a, ObjectHandle::new(1));
        index.insert(b, ObjectHandle::new(2));

        assert_eq!(index.remove(a), Some(ObjectHandle::new(1)));
        assert_eq!(index.remove(a), None);
        assert_eq!(index.item_of(ObjectHandle::new(1)), None);

        index.retain(|id| id != b);
        assert!(index.is_empty());
        assert_eq!(index.item_of(ObjectHandle::new(2)), None);
    }

    #[test]
    fn test_stale_pass_cannot_commit() {
        let stage = Stage::new(MemorySurface::new(200.0, 200.0));
        let first = stage.begin_pass();
        let second = stage.begin_pass();

        assert!(!stage.is_current(first));
        assert!(stage.commit(first, |s, _| s.add(image_object(1.0))).is_none());
        assert!(stage.commit(second, |s, _| s.add(image_object(2.0))).is_some());
        assert_eq!(stage.read(|s, _| s.order().len()), 1);
    }

    #[test]
    fn test_replace_surface_disposes_old_and_fences_passes() {
        let stage = Stage::new(MemorySurface::new(200.0, 200.0));
        let token = stage.begin_pass();
        let old = stage.replace_surface(MemorySurface::new(200.0, 200.0));

        assert!(old.is_disposed());
        assert!(stage.commit(token, |s, _| s.add(image_object(1.0))).is_none());
        assert!(stage.read(|s, _| s.order().is_empty()));
    }
}
