//! Selection bridge between the application and the surface's active object.
//!
//! The application owns the selected item id. The surface owns its active
//! object. A change on either side is mirrored onto the other exactly once:
//! a surface-originated change sets a one-shot origin flag, and the next
//! [`SelectionBridge::sync`] consumes it instead of echoing a redundant
//! "set active" command back at the surface.

use crate::item::ItemId;
use crate::render_state::RenderStateStore;
use crate::surface::{ObjectHandle, Stage, Surface};

/// What a [`SelectionBridge::sync`] did to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The change came from the surface; nothing was sent back.
    Suppressed,
    /// The selected item's object was made active.
    Activated(ObjectHandle),
    /// The active object was cleared.
    Cleared,
}

/// Application-side selection plus the origin flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionBridge {
    selected: Option<ItemId>,
    from_surface: bool,
}

impl SelectionBridge {
    /// Create a bridge with nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently selected item.
    #[must_use]
    pub const fn selected(&self) -> Option<ItemId> {
        self.selected
    }

    /// Whether the pending change came from the surface.
    #[must_use]
    pub const fn is_from_surface(&self) -> bool {
        self.from_surface
    }

    /// Record a selection made by the application UI.
    ///
    /// Returns `true` if the selection changed.
    pub fn select_from_ui(&mut self, id: Option<ItemId>) -> bool {
        self.from_surface = false;
        self.replace(id)
    }

    /// Record a selection created or switched by a surface gesture.
    ///
    /// Returns `true` if the selection changed. Only an effective change arms
    /// the origin flag, since an unchanged selection triggers no sync.
    pub fn on_surface_selected(&mut self, id: ItemId) -> bool {
        let changed = self.replace(Some(id));
        if changed {
            self.from_surface = true;
        }
        changed
    }

    /// Record that the surface cleared its active object.
    ///
    /// Returns `true` if something was selected.
    pub fn on_surface_cleared(&mut self) -> bool {
        self.replace(None)
    }

    /// Drop the selection if it points at `id`. Returns `true` if it did.
    pub fn forget(&mut self, id: ItemId) -> bool {
        if self.selected == Some(id) {
            self.selected = None;
            self.from_surface = false;
            true
        } else {
            false
        }
    }

    fn replace(&mut self, id: Option<ItemId>) -> bool {
        if self.selected == id {
            return false;
        }
        self.selected = id;
        true
    }

    /// Mirror the application selection onto the surface.
    ///
    /// Consumes the origin flag. Otherwise the selected item's object gets
    /// its flip resynced from render state and is made active; with no live
    /// object (or in read-only mode) the active object is cleared.
    pub fn sync<S: Surface>(
        &mut self,
        stage: &Stage<S>,
        render: &RenderStateStore,
        read_only: bool,
    ) -> SyncOutcome {
        if std::mem::take(&mut self.from_surface) {
            return SyncOutcome::Suppressed;
        }
        let selected = if read_only { None } else { self.selected };
        stage.with(|surface, index| {
            let target = selected.and_then(|id| index.handle_of(id).map(|handle| (id, handle)));
            let Some((id, handle)) = target else {
                surface.set_active(None);
                surface.request_render();
                return SyncOutcome::Cleared;
            };
            if let (Some(object), Some(state)) = (surface.object_mut(handle), render.get(id)) {
                object.flip_x = state.flip_x;
            }
            surface.set_active(Some(handle));
            surface.request_render();
            SyncOutcome::Activated(handle)
        })
    }
}
