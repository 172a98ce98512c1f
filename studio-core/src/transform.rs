//! Imperative transform operations: rotate, resize, align and flip.
//!
//! Each operation needs a live scene object for the item. It updates the
//! object and the item's render state under one stage lock, then requests a
//! render. Item records are never touched. A missing object makes the call a
//! no-op returning `None`.

use crate::item::{ItemId, Point};
use crate::product::{Anchor, HorizontalEdge, Product, VerticalEdge};
use crate::render_state::{normalize_degrees, RenderStatePatch, RenderStateStore, Scale};
use crate::surface::{SceneContent, SceneObject, Stage, Surface};

/// Smallest size a shrinking resize can reach.
pub const MIN_SIZE: f64 = 10.0;

/// Rotation delta that resets the angle to zero instead of adding.
///
/// A plain `0.0` delta converts to [`Rotation::Reset`], so "rotate by zero"
/// returns the item to 0 degrees rather than leaving it unchanged.
pub const ROTATION_RESET: f64 = 0.0;

/// A rotation request.
///
/// Built from an `f64` delta, where [`ROTATION_RESET`] maps to
/// [`Rotation::Reset`] and every other value to [`Rotation::By`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rotation {
    /// Add a delta in degrees.
    By(f64),
    /// Return to exactly 0 degrees.
    Reset,
}

impl From<f64> for Rotation {
    #[allow(clippy::float_cmp)] // Exact sentinel match
    fn from(delta: f64) -> Self {
        if delta == ROTATION_RESET {
            Self::Reset
        } else {
            Self::By(delta)
        }
    }
}

/// Transform façade over the stage and render-state store.
#[derive(Debug)]
pub struct Transformer<S> {
    stage: Stage<S>,
    render: RenderStateStore,
    min_size: f64,
}

impl<S> Clone for Transformer<S> {
    fn clone(&self) -> Self {
        Self {
            stage: self.stage.clone(),
            render: self.render.clone(),
            min_size: self.min_size,
        }
    }
}

impl<S: Surface> Transformer<S> {
    /// Create a façade with the standard minimum size.
    #[must_use]
    pub fn new(stage: Stage<S>, render: RenderStateStore) -> Self {
        Self::with_min_size(stage, render, MIN_SIZE)
    }

    /// Create a façade with a custom minimum size.
    #[must_use]
    pub fn with_min_size(stage: Stage<S>, render: RenderStateStore, min_size: f64) -> Self {
        Self {
            stage,
            render,
            min_size,
        }
    }

    /// The minimum size a resize can shrink to.
    #[must_use]
    pub const fn min_size(&self) -> f64 {
        self.min_size
    }

    /// Run `f` on the item's live object, merge the patch it returns and
    /// request a render.
    fn apply<R>(
        &self,
        id: ItemId,
        f: impl FnOnce(&mut SceneObject, &RenderStateStore) -> Option<(RenderStatePatch, R)>,
    ) -> Option<R> {
        self.stage.with(|surface, index| {
            let handle = index.handle_of(id)?;
            if !self.render.contains(id) {
                tracing::debug!("Ignoring transform on removed item {id}");
                return None;
            }
            let object = surface.object_mut(handle)?;
            let (patch, result) = f(object, &self.render)?;
            self.render.merge(id, &patch)?;
            surface.request_render();
            Some(result)
        })
    }

    /// Rotate an item. Returns the new angle.
    pub fn rotate(&self, id: ItemId, rotation: impl Into<Rotation>) -> Option<f64> {
        let rotation = rotation.into();
        self.apply(id, |object, _| {
            let angle = match rotation {
                Rotation::By(delta) => normalize_degrees(object.angle + delta),
                Rotation::Reset => 0.0,
            };
            object.angle = angle;
            let patch = RenderStatePatch {
                rotation: Some(angle),
                ..Default::default()
            };
            Some((patch, angle))
        })
    }

    /// Multiply an item's size by `factor`. Returns the new size.
    ///
    /// Growing is unbounded; shrinking stops at the minimum size. Images get
    /// a per-axis scale of `size / natural`; text takes the size as its font
    /// size.
    pub fn resize(&self, id: ItemId, factor: f64) -> Option<f64> {
        let min_size = self.min_size;
        self.apply(id, |object, render| {
            let current = render.get(id)?.size;
            let size = if factor > 1.0 {
                current * factor
            } else {
                (current * factor).max(min_size)
            };
            let mut patch = RenderStatePatch {
                size: Some(size),
                ..Default::default()
            };
            match &mut object.content {
                SceneContent::Text { font_size, .. } => *font_size = size,
                SceneContent::Image { natural, .. } | SceneContent::Background { natural, .. } => {
                    let scale = Scale::new(
                        axis_scale(size, natural.width),
                        axis_scale(size, natural.height),
                    );
                    object.scale_x = scale.x;
                    object.scale_y = scale.y;
                    patch.scale = Some(scale);
                }
            }
            Some((patch, size))
        })
    }

    /// Move an item against one of the nine anchors of the editable area.
    /// Returns the new center.
    pub fn align(&self, id: ItemId, anchor: Anchor, product: &Product) -> Option<Point> {
        self.apply(id, |object, _| {
            let center = anchored_center(object, anchor, product);
            object.x = center.x;
            object.y = center.y;
            let patch = RenderStatePatch {
                x: Some(center.x),
                y: Some(center.y),
                ..Default::default()
            };
            Some((patch, center))
        })
    }

    /// Toggle an item's horizontal mirror. Returns the new flag.
    pub fn flip(&self, id: ItemId) -> Option<bool> {
        self.apply(id, |object, _| {
            object.flip_x = !object.flip_x;
            let patch = RenderStatePatch {
                flip_x: Some(object.flip_x),
                ..Default::default()
            };
            Some((patch, object.flip_x))
        })
    }
}

fn axis_scale(size: f64, natural: f64) -> f64 {
    if natural > 0.0 {
        size / natural
    } else {
        1.0
    }
}

/// Center an object must take to sit against `anchor` within the editable
/// area, given its current rendered size.
#[must_use]
pub fn anchored_center(object: &SceneObject, anchor: Anchor, product: &Product) -> Point {
    let size = object.rendered_size();
    let (area_w, area_h) = (product.editable_width, product.editable_height);
    let x = match anchor.horizontal() {
        HorizontalEdge::Left => size.width / 2.0,
        HorizontalEdge::Right => area_w - size.width / 2.0,
        HorizontalEdge::Center => area_w / 2.0,
    };
    let y = match anchor.vertical() {
        VerticalEdge::Top => size.height / 2.0,
        VerticalEdge::Bottom => area_h - size.height / 2.0,
        VerticalEdge::Middle => area_h / 2.0,
    };
    Point::new(x, y)
}
