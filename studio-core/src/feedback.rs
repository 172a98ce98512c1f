//! Gesture feedback: fold committed surface gestures back into state.
//!
//! This is the only path from the surface back into the model. Geometry
//! lands in the render-state store as a sparse merge, so lock and visibility
//! flags set elsewhere are never clobbered. Ended text edits write the live
//! text back into the item list.

use crate::item::{ItemId, ItemList};
use crate::render_state::{RenderStatePatch, RenderStateStore, Scale};
use crate::surface::{ObjectHandle, Stage, Surface};

/// What a committed manipulation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Committed {
    /// Geometry of an image item.
    Object(ItemId),
    /// Geometry and font size of a text item.
    Text(ItemId),
}

impl Committed {
    /// The affected item.
    #[must_use]
    pub const fn id(self) -> ItemId {
        match self {
            Self::Object(id) | Self::Text(id) => id,
        }
    }
}

/// Capture the object's position, scale, angle and flip into render state.
///
/// Text objects also contribute their font size as the item's size.
/// Returns `None` for the background or an unknown handle.
pub fn on_manipulation_committed<S: Surface>(
    stage: &Stage<S>,
    render: &RenderStateStore,
    handle: ObjectHandle,
) -> Option<Committed> {
    stage.read(|surface, index| {
        let id = index.item_of(handle)?;
        let object = surface.object(handle)?;
        let patch = RenderStatePatch {
            x: Some(object.x),
            y: Some(object.y),
            size: object.font_size(),
            scale: Some(Scale::new(object.scale_x, object.scale_y)),
            rotation: Some(object.angle),
            flip_x: Some(object.flip_x),
            ..Default::default()
        };
        if render.merge(id, &patch).is_none() {
            tracing::error!("Gesture committed on item {id} without render state");
            return None;
        }
        tracing::debug!("Gesture committed on item {id}");
        Some(if object.is_text() {
            Committed::Text(id)
        } else {
            Committed::Object(id)
        })
    })
}

/// Write the live text of an edited object back into the item list.
///
/// Returns the item id if the text item was updated.
pub fn on_text_edit_ended<S: Surface>(
    stage: &Stage<S>,
    items: &mut ItemList,
    handle: ObjectHandle,
) -> Option<ItemId> {
    let (id, text) = stage.read(|surface, index| {
        let id = index.item_of(handle)?;
        let text = surface.object(handle)?.text()?.to_string();
        Some((id, text))
    })?;
    items.set_text(id, &text).then_some(id)
}
