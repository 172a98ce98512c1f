//! Headless in-memory surface.
//!
//! [`MemorySurface`] implements [`Surface`] and also simulates the
//! surface-native behaviour hosts rely on: pointer selection, drag / scale /
//! rotate gestures that commit on release, and double activation into inline
//! text editing with the whole content selected. Gesture methods return the
//! [`SurfaceEvent`]s a real surface would fire so callers can route them to
//! the engine.

use std::ops::Range;

use serde::Serialize;

use crate::surface::{ObjectHandle, SceneContent, SceneObject, Surface, SurfaceEvent};

/// Zoom and pan of the surface itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    /// Zoom factor (1.0 = identity).
    pub zoom: f64,
    /// Horizontal pan.
    pub pan_x: f64,
    /// Vertical pan.
    pub pan_y: f64,
}

impl Viewport {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        zoom: 1.0,
        pan_x: 0.0,
        pan_y: 0.0,
    };
}

/// Counters for commands the surface received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SurfaceStats {
    /// Number of `request_render` calls.
    pub renders: u64,
    /// Number of `set_active(Some(_))` commands.
    pub activations: u64,
    /// Number of `clear` calls.
    pub clears: u64,
}

/// An inline text editing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEditing {
    /// Object being edited.
    pub handle: ObjectHandle,
    /// Selected character range.
    pub selection: Range<usize>,
}

/// In-memory retained scene.
#[derive(Debug)]
pub struct MemorySurface {
    width: f64,
    height: f64,
    objects: Vec<(ObjectHandle, SceneObject)>,
    next_handle: u64,
    active: Option<ObjectHandle>,
    background_color: Option<String>,
    viewport: Viewport,
    editing: Option<TextEditing>,
    disposed: bool,
    stats: SurfaceStats,
}

impl MemorySurface {
    /// Create an empty surface of the given size.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            objects: Vec::new(),
            next_handle: 1,
            active: None,
            background_color: Some("#ffffff".to_string()),
            viewport: Viewport::IDENTITY,
            editing: None,
            disposed: false,
            stats: SurfaceStats::default(),
        }
    }

    /// Surface width.
    #[must_use]
    pub const fn width(&self) -> f64 {
        self.width
    }

    /// Surface height.
    #[must_use]
    pub const fn height(&self) -> f64 {
        self.height
    }

    /// Objects bottom to top.
    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().map(|(_, object)| object)
    }

    /// Owned copy of all objects bottom to top.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SceneObject> {
        self.objects().cloned().collect()
    }

    /// Number of objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the surface has no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Command counters.
    #[must_use]
    pub const fn stats(&self) -> SurfaceStats {
        self.stats
    }

    /// Current zoom / pan.
    #[must_use]
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Zoom or pan the surface directly.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Fill behind all objects.
    #[must_use]
    pub fn background_color(&self) -> Option<&str> {
        self.background_color.as_deref()
    }

    /// The active inline editing session.
    #[must_use]
    pub const fn editing(&self) -> Option<&TextEditing> {
        self.editing.as_ref()
    }

    fn position(&self, handle: ObjectHandle) -> Option<usize> {
        self.objects.iter().position(|(h, _)| *h == handle)
    }

    fn exit_editing_event(&mut self) -> Option<SurfaceEvent> {
        self.editing
            .take()
            .map(|session| SurfaceEvent::TextEditingExited(session.handle))
    }

    /// Pointer press on an object.
    ///
    /// Ends any editing session on another object, then activates the
    /// object if it is selectable.
    pub fn click(&mut self, handle: ObjectHandle) -> Vec<SurfaceEvent> {
        let mut events = Vec::new();
        if self.disposed {
            return events;
        }
        if self.editing.as_ref().is_some_and(|e| e.handle != handle) {
            events.extend(self.exit_editing_event());
        }
        let selectable = self
            .object(handle)
            .is_some_and(|object| object.interaction.selectable);
        if !selectable || self.active == Some(handle) {
            return events;
        }
        let event = if self.active.is_some() {
            SurfaceEvent::SelectionUpdated(handle)
        } else {
            SurfaceEvent::SelectionCreated(handle)
        };
        self.active = Some(handle);
        events.push(event);
        events
    }

    /// Pointer press on empty space.
    pub fn click_empty(&mut self) -> Vec<SurfaceEvent> {
        let mut events = Vec::new();
        if self.disposed {
            return events;
        }
        events.extend(self.exit_editing_event());
        if self.active.take().is_some() {
            events.push(SurfaceEvent::SelectionCleared);
        }
        events
    }

    /// Drag an object by an offset and release.
    pub fn drag(&mut self, handle: ObjectHandle, dx: f64, dy: f64) -> Option<SurfaceEvent> {
        let object = self.live_object_mut(handle)?;
        if !object.interaction.movable {
            return None;
        }
        object.x += dx;
        object.y += dy;
        Some(SurfaceEvent::ObjectModified(handle))
    }

    /// Drag a corner handle, multiplying the scale, and release.
    pub fn scale_by(&mut self, handle: ObjectHandle, fx: f64, fy: f64) -> Option<SurfaceEvent> {
        let object = self.live_object_mut(handle)?;
        if !object.interaction.scalable {
            return None;
        }
        object.scale_x *= fx;
        object.scale_y *= fy;
        Some(SurfaceEvent::ObjectModified(handle))
    }

    /// Drag the rotation handle to an absolute angle and release.
    pub fn rotate_to(&mut self, handle: ObjectHandle, angle: f64) -> Option<SurfaceEvent> {
        let object = self.live_object_mut(handle)?;
        if !object.interaction.rotatable {
            return None;
        }
        object.angle = angle;
        Some(SurfaceEvent::ObjectModified(handle))
    }

    /// Double-click or double-tap an object.
    ///
    /// Editable text enters inline editing with its full content selected.
    pub fn double_activate(&mut self, handle: ObjectHandle) -> Vec<SurfaceEvent> {
        let mut events = self.click(handle);
        let Some(object) = self.object(handle) else {
            return events;
        };
        events.push(SurfaceEvent::DoubleActivated(handle));
        if let (true, Some(text)) = (object.interaction.editable, object.text()) {
            let len = text.chars().count();
            self.editing = Some(TextEditing {
                handle,
                selection: 0..len,
            });
        }
        events
    }

    /// Type into the active editing session, replacing the selection.
    ///
    /// Returns `false` when no session is active.
    pub fn type_text(&mut self, input: &str) -> bool {
        let Some(session) = self.editing.clone() else {
            return false;
        };
        let Some(object) = self.object_mut(session.handle) else {
            return false;
        };
        let SceneContent::Text { text, .. } = &mut object.content else {
            return false;
        };
        let chars: Vec<char> = text.chars().collect();
        let start = session.selection.start.min(chars.len());
        let end = session.selection.end.min(chars.len());
        let mut updated: String = chars[..start].iter().collect();
        updated.push_str(input);
        updated.extend(&chars[end..]);
        *text = updated;
        let caret = start + input.chars().count();
        self.editing = Some(TextEditing {
            handle: session.handle,
            selection: caret..caret,
        });
        true
    }

    /// End the active editing session.
    pub fn exit_editing(&mut self) -> Option<SurfaceEvent> {
        self.exit_editing_event()
    }

    fn live_object_mut(&mut self, handle: ObjectHandle) -> Option<&mut SceneObject> {
        if self.disposed {
            return None;
        }
        self.object_mut(handle)
    }
}

impl Surface for MemorySurface {
    fn clear(&mut self) {
        self.objects.clear();
        self.active = None;
        self.editing = None;
        self.stats.clears += 1;
    }

    fn set_background_color(&mut self, color: Option<&str>) {
        self.background_color = color.map(str::to_string);
    }

    fn set_dimensions(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    fn add(&mut self, object: SceneObject) -> ObjectHandle {
        let handle = ObjectHandle::new(self.next_handle);
        self.next_handle += 1;
        self.objects.push((handle, object));
        handle
    }

    fn send_to_back(&mut self, handle: ObjectHandle) {
        if let Some(index) = self.position(handle) {
            let entry = self.objects.remove(index);
            self.objects.insert(0, entry);
        }
    }

    fn object(&self, handle: ObjectHandle) -> Option<&SceneObject> {
        self.objects
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, object)| object)
    }

    fn object_mut(&mut self, handle: ObjectHandle) -> Option<&mut SceneObject> {
        self.objects
            .iter_mut()
            .find(|(h, _)| *h == handle)
            .map(|(_, object)| object)
    }

    fn order(&self) -> Vec<ObjectHandle> {
        self.objects.iter().map(|(handle, _)| *handle).collect()
    }

    fn set_active(&mut self, handle: Option<ObjectHandle>) {
        match handle {
            Some(handle) if self.position(handle).is_some() => {
                self.stats.activations += 1;
                self.active = Some(handle);
            }
            _ => self.active = None,
        }
    }

    fn active(&self) -> Option<ObjectHandle> {
        self.active
    }

    fn reset_viewport(&mut self) {
        self.viewport = Viewport::IDENTITY;
    }

    fn request_render(&mut self) {
        self.stats.renders += 1;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.objects.clear();
        self.active = None;
        self.editing = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Dimensions;
    use crate::surface::{Controls, Interaction};

    fn interactive() -> Interaction {
        Interaction {
            selectable: true,
            movable: true,
            scalable: true,
            rotatable: true,
            editable: true,
            has_controls: true,
            controls: Controls::CORNERS_ONLY,
        }
    }

    fn text_object(text: &str) -> SceneObject {
        SceneObject {
            content: SceneContent::Text {
                text: text.to_string(),
                font_family: "Roboto".to_string(),
                fill: "#000".to_string(),
                font_size: 20.0,
            },
            x: 50.0,
            y: 50.0,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            flip_x: false,
            interaction: interactive(),
        }
    }

    fn image_object() -> SceneObject {
        SceneObject {
            content: SceneContent::Image {
                src: "a.png".to_string(),
                natural: Dimensions::new(10.0, 10.0),
            },
            ..text_object("")
        }
    }

    #[test]
    fn test_click_creates_then_updates_selection() {
        let mut surface = MemorySurface::new(100.0, 100.0);
        let a = surface.add(image_object());
        let b = surface.add(image_object());

        assert_eq!(surface.click(a), vec![SurfaceEvent::SelectionCreated(a)]);
        assert_eq!(surface.click(a), vec![]);
        assert_eq!(surface.click(b), vec![SurfaceEvent::SelectionUpdated(b)]);
        assert_eq!(surface.click_empty(), vec![SurfaceEvent::SelectionCleared]);
        assert_eq!(surface.active(), None);
        // Native clicks are not activation commands
        assert_eq!(surface.stats().activations, 0);
    }

    #[test]
    fn test_unselectable_objects_ignore_clicks() {
        let mut surface = MemorySurface::new(100.0, 100.0);
        let mut object = image_object();
        object.interaction = Interaction::INERT;
        let handle = surface.add(object);
        assert!(surface.click(handle).is_empty());
        assert!(surface.drag(handle, 5.0, 5.0).is_none());
    }

    #[test]
    fn test_gestures_respect_flags() {
        let mut surface = MemorySurface::new(100.0, 100.0);
        let mut object = image_object();
        object.interaction.movable = false;
        let handle = surface.add(object);

        assert!(surface.drag(handle, 5.0, 5.0).is_none());
        assert_eq!(
            surface.scale_by(handle, 2.0, 3.0),
            Some(SurfaceEvent::ObjectModified(handle))
        );
        let scaled = surface.object(handle).expect("object");
        assert!((scaled.scale_x - 2.0).abs() < f64::EPSILON);
        assert!((scaled.scale_y - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_double_activation_edits_text_with_full_selection() {
        let mut surface = MemorySurface::new(100.0, 100.0);
        let handle = surface.add(text_object("Hello"));

        let events = surface.double_activate(handle);
        assert!(events.contains(&SurfaceEvent::DoubleActivated(handle)));
        let session = surface.editing().expect("editing");
        assert_eq!(session.selection, 0..5);

        assert!(surface.type_text("Bye"));
        assert_eq!(
            surface.object(handle).and_then(SceneObject::text),
            Some("Bye")
        );
        assert_eq!(
            surface.exit_editing(),
            Some(SurfaceEvent::TextEditingExited(handle))
        );
        assert!(!surface.type_text("more"));
    }

    #[test]
    fn test_double_activation_on_image_does_not_edit() {
        let mut surface = MemorySurface::new(100.0, 100.0);
        let handle = surface.add(image_object());
        surface.double_activate(handle);
        assert!(surface.editing().is_none());
    }

    #[test]
    fn test_send_to_back_and_reset_viewport() {
        let mut surface = MemorySurface::new(100.0, 100.0);
        let a = surface.add(image_object());
        let b = surface.add(image_object());
        surface.send_to_back(b);
        assert_eq!(surface.order(), vec![b, a]);

        surface.set_viewport(Viewport {
            zoom: 2.0,
            pan_x: 10.0,
            pan_y: -4.0,
        });
        surface.reset_viewport();
        assert_eq!(surface.viewport(), Viewport::IDENTITY);
    }

    #[test]
    fn test_disposed_surface_ignores_gestures() {
        let mut surface = MemorySurface::new(100.0, 100.0);
        let handle = surface.add(image_object());
        surface.dispose();
        assert!(surface.is_disposed());
        assert!(surface.is_empty());
        assert!(surface.click(handle).is_empty());
        assert!(surface.rotate_to(handle, 45.0).is_none());
    }
}
