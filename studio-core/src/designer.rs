//! The host-facing design engine.
//!
//! [`Designer`] owns the item list and wires the render-state store, the
//! stage, the reconciler, the selection bridge, the transform façade and the
//! gesture feedback listener together. Hosts drive it with UI operations and
//! surface events, call [`Designer::render`] whenever a reconciliation input
//! changed, and drain [`HostEvent`]s with [`Designer::take_events`].

use serde::{Deserialize, Serialize};

use crate::assets::AssetLoader;
use crate::document::{DesignDocument, DOCUMENT_VERSION};
use crate::error::{DesignError, DesignResult};
use crate::feedback::{self, Committed};
use crate::history::{History, Snapshot, DEFAULT_HISTORY_LIMIT};
use crate::item::{Item, ItemId, ItemList, Point};
use crate::product::{Anchor, Background, Product};
use crate::reconciler::{ReconcileInput, ReconcileReport, Reconciler};
use crate::render_state::{
    RenderStatePatch, RenderStateStore, StateDefaults, DEFAULT_IMAGE_SIZE, DEFAULT_TEXT_SIZE,
};
use crate::selection::SelectionBridge;
use crate::surface::{Stage, Surface, SurfaceEvent};
use crate::transform::{Rotation, Transformer, MIN_SIZE};

/// Notifications for the host application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum HostEvent {
    /// The selected item changed.
    SelectionChanged(Option<ItemId>),
    /// Item records changed (text content or font size feedback, undo/redo).
    ItemsChanged(Vec<Item>),
    /// An item's flip flag changed.
    FlipChanged {
        /// The flipped item.
        id: ItemId,
        /// New flag value.
        flip_x: bool,
    },
}

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignerConfig {
    /// Size given to new images.
    pub image_size: f64,
    /// Font size given to new text.
    pub text_size: f64,
    /// Floor for shrinking resizes.
    pub min_size: f64,
    /// Snapshots kept for undo.
    pub history_limit: usize,
    /// Start in read-only mode.
    pub read_only: bool,
}

impl Default for DesignerConfig {
    fn default() -> Self {
        Self {
            image_size: DEFAULT_IMAGE_SIZE,
            text_size: DEFAULT_TEXT_SIZE,
            min_size: MIN_SIZE,
            history_limit: DEFAULT_HISTORY_LIMIT,
            read_only: false,
        }
    }
}

/// The design engine for one surface.
pub struct Designer<S, L> {
    items: ItemList,
    render: RenderStateStore,
    stage: Stage<S>,
    reconciler: Reconciler<L>,
    transformer: Transformer<S>,
    selection: SelectionBridge,
    background: Option<Background>,
    product: Product,
    read_only: bool,
    history: History,
    outbox: Vec<HostEvent>,
}

impl<S, L> std::fmt::Debug for Designer<S, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Designer")
            .field("items", &self.items.len())
            .field("selected", &self.selection.selected())
            .field("background", &self.background)
            .field("product", &self.product)
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

impl<S: Surface, L: AssetLoader> Designer<S, L> {
    /// Create an engine with the default configuration.
    #[must_use]
    pub fn new(surface: S, loader: L) -> Self {
        Self::with_config(surface, loader, DesignerConfig::default())
    }

    /// Create an engine with a custom configuration.
    #[must_use]
    pub fn with_config(surface: S, loader: L, config: DesignerConfig) -> Self {
        let render = RenderStateStore::with_defaults(StateDefaults {
            image_size: config.image_size,
            text_size: config.text_size,
        });
        let stage = Stage::new(surface);
        let transformer =
            Transformer::with_min_size(stage.clone(), render.clone(), config.min_size);
        let mut designer = Self {
            items: ItemList::new(),
            render,
            stage,
            reconciler: Reconciler::new(loader),
            transformer,
            selection: SelectionBridge::new(),
            background: None,
            product: Product::default(),
            read_only: config.read_only,
            history: History::with_limit(config.history_limit),
            outbox: Vec::new(),
        };
        designer.checkpoint();
        designer
    }

    /// Create an engine holding a saved document.
    #[must_use]
    pub fn from_document(
        surface: S,
        loader: L,
        config: DesignerConfig,
        doc: DesignDocument,
    ) -> Self {
        let mut designer = Self::with_config(surface, loader, config);
        designer.load_document(doc);
        designer
    }

    /// The shared stage.
    #[must_use]
    pub const fn stage(&self) -> &Stage<S> {
        &self.stage
    }

    /// The shared render-state store.
    #[must_use]
    pub const fn render_state(&self) -> &RenderStateStore {
        &self.render
    }

    /// Items in z-order, bottom first.
    #[must_use]
    pub const fn items(&self) -> &ItemList {
        &self.items
    }

    /// The reconciler.
    #[must_use]
    pub const fn reconciler(&self) -> &Reconciler<L> {
        &self.reconciler
    }

    /// The current product.
    #[must_use]
    pub const fn product(&self) -> &Product {
        &self.product
    }

    /// The current background.
    #[must_use]
    pub const fn background(&self) -> Option<&Background> {
        self.background.as_ref()
    }

    /// Whether the surface is read-only.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Swap in a new surface. Passes in flight against the old one go inert.
    pub fn replace_surface(&self, surface: S) -> S {
        self.stage.replace_surface(surface)
    }

    fn checkpoint(&mut self) {
        let step = self.history.capture(&self.items, self.render.snapshot());
        tracing::trace!("History step {step}");
    }

    fn emit(&mut self, event: HostEvent) {
        self.outbox.push(event);
    }

    fn emit_items(&mut self) {
        let items = self.items.as_slice().to_vec();
        self.emit(HostEvent::ItemsChanged(items));
    }

    fn add(&mut self, item: Item) -> ItemId {
        self.render.ensure_defaults([&item]);
        let id = self.items.push(item);
        tracing::debug!("Added item {id}");
        self.checkpoint();
        id
    }

    /// Place a new image on top of the stack.
    pub fn add_image(&mut self, src: impl Into<String>, origin: Point) -> ItemId {
        self.add(Item::image(src, origin))
    }

    /// Place a new text label on top of the stack.
    pub fn add_text(
        &mut self,
        text: impl Into<String>,
        font: impl Into<String>,
        fill: impl Into<String>,
        origin: Point,
    ) -> ItemId {
        self.add(Item::text(text, font, fill, origin))
    }

    /// Delete an item along with its render state.
    ///
    /// Clears the selection if it pointed at the item. The scene object
    /// disappears on the next [`Designer::render`]; until then it is no
    /// longer mapped, so transforms and surface events ignore it.
    ///
    /// # Errors
    ///
    /// Returns [`DesignError::ItemNotFound`] if the item does not exist.
    pub fn delete(&mut self, id: ItemId) -> DesignResult<Item> {
        let item = self.items.remove(id).ok_or(DesignError::ItemNotFound(id))?;
        self.render.remove(id);
        self.stage.with(|_, index| index.remove(id));
        if self.selection.forget(id) {
            self.emit(HostEvent::SelectionChanged(None));
        }
        tracing::debug!("Deleted item {id}");
        self.checkpoint();
        Ok(item)
    }

    /// Swap in a new revision of an item (font, fill or content change).
    ///
    /// # Errors
    ///
    /// Returns [`DesignError::ItemNotFound`] if no item has the same id.
    pub fn replace_item(&mut self, item: Item) -> DesignResult<()> {
        let id = item.id();
        if !self.items.replace(item) {
            return Err(DesignError::ItemNotFound(id));
        }
        self.checkpoint();
        Ok(())
    }

    fn patch(&mut self, id: ItemId, patch: &RenderStatePatch) -> DesignResult<()> {
        if self.items.get(id).is_none() {
            return Err(DesignError::ItemNotFound(id));
        }
        self.render.ensure_defaults(self.items.get(id));
        self.render
            .merge(id, patch)
            .ok_or(DesignError::ItemNotFound(id))?;
        self.checkpoint();
        Ok(())
    }

    /// Show or hide an item. Takes effect on the next render.
    ///
    /// # Errors
    ///
    /// Returns [`DesignError::ItemNotFound`] if the item does not exist.
    pub fn set_visible(&mut self, id: ItemId, visible: bool) -> DesignResult<()> {
        self.patch(
            id,
            &RenderStatePatch {
                visible: Some(visible),
                ..Default::default()
            },
        )
    }

    /// Lock or unlock an item. Takes effect on the next render.
    ///
    /// # Errors
    ///
    /// Returns [`DesignError::ItemNotFound`] if the item does not exist.
    pub fn set_locked(&mut self, id: ItemId, locked: bool) -> DesignResult<()> {
        self.patch(
            id,
            &RenderStatePatch {
                locked: Some(locked),
                ..Default::default()
            },
        )
    }

    fn reorder(&mut self, changed: bool) -> bool {
        if changed {
            self.checkpoint();
        }
        changed
    }

    /// Move an item one step up. Returns `false` if nothing moved.
    pub fn bring_forward(&mut self, id: ItemId) -> bool {
        let changed = self.items.bring_forward(id);
        self.reorder(changed)
    }

    /// Move an item one step down. Returns `false` if nothing moved.
    pub fn send_backward(&mut self, id: ItemId) -> bool {
        let changed = self.items.send_backward(id);
        self.reorder(changed)
    }

    /// Move an item to the top.
    pub fn bring_to_front(&mut self, id: ItemId) -> bool {
        let changed = self.items.bring_to_front(id);
        self.reorder(changed)
    }

    /// Move an item to the bottom.
    pub fn send_to_back(&mut self, id: ItemId) -> bool {
        let changed = self.items.send_to_back(id);
        self.reorder(changed)
    }

    /// Item ids top-most first, as a layers panel lists them.
    #[must_use]
    pub fn layers(&self) -> Vec<ItemId> {
        self.items.layers()
    }

    /// Drag a layer within the layers panel (indices are top-most first).
    pub fn move_layer(&mut self, from: usize, to: usize) -> bool {
        let changed = self.items.move_layer(from, to);
        self.reorder(changed)
    }

    /// Set or clear the background image.
    pub fn set_background(&mut self, background: Option<Background>) {
        self.background = background;
    }

    /// Change the product.
    pub fn set_product(&mut self, product: Product) {
        self.product = product;
    }

    /// Enter or leave read-only mode. Takes effect on the next render.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// The selected item.
    #[must_use]
    pub const fn selected(&self) -> Option<ItemId> {
        self.selection.selected()
    }

    /// Select an item from the application UI and mirror it onto the surface.
    pub fn select(&mut self, id: Option<ItemId>) {
        if self.selection.select_from_ui(id) {
            self.emit(HostEvent::SelectionChanged(id));
            self.selection.sync(&self.stage, &self.render, self.read_only);
        }
    }

    /// Whether an item takes part in reconciliation.
    #[must_use]
    pub fn is_visible(&self, id: ItemId) -> bool {
        self.render.get(id).is_none_or(|state| state.visible)
    }

    /// Rotate an item by a delta, or reset it. Returns the new angle.
    pub fn rotate(&mut self, id: ItemId, rotation: impl Into<Rotation>) -> Option<f64> {
        if self.read_only {
            return None;
        }
        let angle = self.transformer.rotate(id, rotation)?;
        self.checkpoint();
        Some(angle)
    }

    /// Scale an item's size by `factor`. Returns the new size.
    pub fn resize(&mut self, id: ItemId, factor: f64) -> Option<f64> {
        if self.read_only {
            return None;
        }
        let size = self.transformer.resize(id, factor)?;
        self.checkpoint();
        Some(size)
    }

    /// Snap an item against an anchor of the product's editable area.
    pub fn align(&mut self, id: ItemId, anchor: Anchor) -> Option<Point> {
        if self.read_only {
            return None;
        }
        let center = self.transformer.align(id, anchor, &self.product)?;
        self.checkpoint();
        Some(center)
    }

    /// Toggle an item's horizontal mirror. Returns the new flag.
    pub fn flip(&mut self, id: ItemId) -> Option<bool> {
        if self.read_only {
            return None;
        }
        let flip_x = self.transformer.flip(id)?;
        self.emit(HostEvent::FlipChanged { id, flip_x });
        self.checkpoint();
        Some(flip_x)
    }

    /// Route a native surface event.
    pub fn handle_surface_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::SelectionCreated(handle) | SurfaceEvent::SelectionUpdated(handle) => {
                let Some(id) = self.stage.item_of(handle) else {
                    return;
                };
                if self.items.get(id).is_none() {
                    tracing::debug!("Ignoring selection of removed item {id}");
                    return;
                }
                if self.selection.on_surface_selected(id) {
                    self.emit(HostEvent::SelectionChanged(Some(id)));
                    self.selection.sync(&self.stage, &self.render, self.read_only);
                }
            }
            SurfaceEvent::SelectionCleared => {
                if self.selection.on_surface_cleared() {
                    self.emit(HostEvent::SelectionChanged(None));
                }
            }
            SurfaceEvent::ObjectModified(handle) => {
                let Some(committed) =
                    feedback::on_manipulation_committed(&self.stage, &self.render, handle)
                else {
                    return;
                };
                if let Committed::Text(_) = committed {
                    self.emit_items();
                }
                self.checkpoint();
            }
            SurfaceEvent::TextEditingExited(handle) => {
                if feedback::on_text_edit_ended(&self.stage, &mut self.items, handle).is_some() {
                    self.emit_items();
                    self.checkpoint();
                }
            }
            SurfaceEvent::DoubleActivated(handle) => {
                tracing::trace!("Double activation on {handle}");
            }
        }
    }

    /// Rebuild the scene from the current state.
    pub async fn render(&self) -> ReconcileReport {
        let render = &self.render;
        let visibility = |id: ItemId| render.get(id).is_none_or(|state| state.visible);
        let input = ReconcileInput {
            items: self.items.as_slice(),
            render,
            background: self.background.as_ref(),
            product: &self.product,
            visibility: &visibility,
            selected: self.selection.selected(),
            read_only: self.read_only,
        };
        self.reconciler.reconcile(&self.stage, input).await
    }

    /// Drain pending host events.
    pub fn take_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Whether [`Designer::undo`] would succeed.
    #[must_use]
    pub const fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether [`Designer::redo`] would succeed.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Restore the previous snapshot. Call [`Designer::render`] afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`DesignError::NothingToUndo`] at the start of history.
    pub fn undo(&mut self) -> DesignResult<()> {
        let snapshot = self
            .history
            .undo()
            .cloned()
            .ok_or(DesignError::NothingToUndo)?;
        self.restore(snapshot);
        Ok(())
    }

    /// Restore the next snapshot. Call [`Designer::render`] afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`DesignError::NothingToRedo`] at the end of history.
    pub fn redo(&mut self) -> DesignResult<()> {
        let snapshot = self
            .history
            .redo()
            .cloned()
            .ok_or(DesignError::NothingToRedo)?;
        self.restore(snapshot);
        Ok(())
    }

    fn restore(&mut self, snapshot: Snapshot) {
        tracing::debug!("Restoring history step {}", snapshot.step);
        self.items = snapshot.items;
        self.render.restore(snapshot.render);
        let items = &self.items;
        self.stage
            .with(|_, index| index.retain(|id| items.get(id).is_some()));
        if let Some(id) = self.selection.selected() {
            if self.items.get(id).is_none() && self.selection.forget(id) {
                self.emit(HostEvent::SelectionChanged(None));
            }
        }
        self.emit_items();
    }

    /// Capture the design as a document.
    #[must_use]
    pub fn to_document(&self) -> DesignDocument {
        DesignDocument {
            version: DOCUMENT_VERSION,
            items: self.items.clone(),
            render_state: self.render.snapshot().into_iter().collect(),
            background: self.background.clone(),
            product: self.product,
            selected: self.selection.selected(),
        }
    }

    /// Replace the whole design with a document. History starts over.
    pub fn load_document(&mut self, doc: DesignDocument) {
        let render = doc.render_map();
        self.items = doc.items;
        self.render.restore(render);
        self.render.ensure_defaults(self.items.iter());
        self.background = doc.background;
        self.product = doc.product;
        let selected = doc.selected.filter(|id| self.items.get(*id).is_some());
        self.selection = SelectionBridge::new();
        self.selection.select_from_ui(selected);
        self.history.clear();
        self.checkpoint();
        tracing::debug!("Loaded document with {} item(s)", self.items.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::StaticAssets;
    use crate::memory::MemorySurface;

    fn designer() -> Designer<MemorySurface, StaticAssets> {
        let assets = StaticAssets::new()
            .with_image("logo.png", 60, 60)
            .with_image("wide.png", 120, 60);
        let mut designer = Designer::new(MemorySurface::new(1.0, 1.0), assets);
        designer.set_product(Product::new(200.0, 200.0));
        designer
    }

    #[tokio::test]
    async fn test_add_and_render() {
        let mut designer = designer();
        let id = designer.add_image("logo.png", Point::new(50.0, 50.0));
        let report = designer.render().await;
        assert_eq!(report.placed, vec![id]);
        assert!(designer.stage().handle_of(id).is_some());
    }

    #[tokio::test]
    async fn test_delete_cleans_state_and_selection() {
        let mut designer = designer();
        let id = designer.add_image("logo.png", Point::new(50.0, 50.0));
        designer.render().await;
        designer.select(Some(id));
        designer.take_events();

        let removed = designer.delete(id).expect("delete");
        assert_eq!(removed.id(), id);
        assert!(designer.items().get(id).is_none());
        assert!(!designer.render_state().contains(id));
        assert_eq!(designer.selected(), None);
        assert_eq!(
            designer.take_events(),
            vec![HostEvent::SelectionChanged(None)]
        );
        assert!(matches!(
            designer.delete(id),
            Err(DesignError::ItemNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_transforms_on_deleted_item_are_noops() {
        let mut designer = designer();
        let id = designer.add_image("logo.png", Point::new(50.0, 50.0));
        designer.render().await;
        let handle = designer.stage().handle_of(id).expect("placed");
        designer.delete(id).expect("delete");
        designer.take_events();

        assert_eq!(designer.rotate(id, 45.0), None);
        assert_eq!(designer.resize(id, 2.0), None);
        assert_eq!(designer.align(id, Anchor::Center), None);
        assert_eq!(designer.flip(id), None);
        assert!(designer.take_events().is_empty());
        assert!(!designer.render_state().contains(id));
        assert!(!designer.can_redo());

        let object = designer
            .stage()
            .read(|surface, _| surface.object(handle).cloned())
            .expect("object stays until the next render");
        assert!(object.angle.abs() < f64::EPSILON);
        assert!(!object.flip_x);
    }

    #[tokio::test]
    async fn test_transforms_after_undo_of_add_are_noops() {
        let mut designer = designer();
        let id = designer.add_image("logo.png", Point::new(50.0, 50.0));
        designer.render().await;
        designer.undo().expect("undo add");
        designer.take_events();

        assert!(designer.stage().handle_of(id).is_none());
        assert_eq!(designer.rotate(id, 30.0), None);
        assert_eq!(designer.flip(id), None);
        assert!(designer.take_events().is_empty());
        assert!(!designer.render_state().contains(id));

        designer.redo().expect("redo add");
        designer.render().await;
        assert_eq!(designer.rotate(id, 30.0), Some(30.0));
    }

    #[tokio::test]
    async fn test_surface_click_on_deleted_item_is_ignored() {
        let mut designer = designer();
        let id = designer.add_image("logo.png", Point::new(50.0, 50.0));
        designer.render().await;
        let handle = designer.stage().handle_of(id).expect("placed");
        designer.delete(id).expect("delete");
        designer.take_events();

        let events = designer.stage().with(|surface, _| surface.click(handle));
        for event in events {
            designer.handle_surface_event(event);
        }
        assert_eq!(designer.selected(), None);
        assert!(designer.take_events().is_empty());
    }

    #[tokio::test]
    async fn test_flip_emits_event() {
        let mut designer = designer();
        let id = designer.add_image("logo.png", Point::new(50.0, 50.0));
        designer.render().await;

        assert_eq!(designer.flip(id), Some(true));
        assert_eq!(
            designer.take_events(),
            vec![HostEvent::FlipChanged { id, flip_x: true }]
        );
    }

    #[tokio::test]
    async fn test_read_only_blocks_transforms() {
        let mut designer = designer();
        let id = designer.add_image("logo.png", Point::new(50.0, 50.0));
        designer.set_read_only(true);
        designer.render().await;
        assert_eq!(designer.rotate(id, 45.0), None);
        assert_eq!(designer.flip(id), None);
        let state = designer.render_state().get(id).expect("state");
        assert!(state.rotation.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_transforms_before_render_are_noops() {
        let mut designer = designer();
        let id = designer.add_image("logo.png", Point::new(50.0, 50.0));
        assert_eq!(designer.resize(id, 2.0), None);
        assert!(!designer.can_redo());
    }

    #[tokio::test]
    async fn test_undo_redo_round_trip() {
        let mut designer = designer();
        let id = designer.add_image("logo.png", Point::new(50.0, 50.0));
        designer.render().await;
        designer.rotate(id, 90.0);

        designer.undo().expect("undo rotate");
        let state = designer.render_state().get(id).expect("state");
        assert!(state.rotation.abs() < f64::EPSILON);
        designer.undo().expect("undo add");
        assert!(designer.items().is_empty());
        assert!(designer.render_state().is_empty());
        assert!(matches!(designer.undo(), Err(DesignError::NothingToUndo)));

        designer.redo().expect("redo add");
        designer.redo().expect("redo rotate");
        let state = designer.render_state().get(id).expect("state");
        assert!((state.rotation - 90.0).abs() < 1e-9);
        assert!(matches!(designer.redo(), Err(DesignError::NothingToRedo)));
    }

    #[tokio::test]
    async fn test_hidden_item_not_placed() {
        let mut designer = designer();
        let id = designer.add_image("logo.png", Point::new(50.0, 50.0));
        designer.set_visible(id, false).expect("hide");
        assert!(!designer.is_visible(id));

        let report = designer.render().await;
        assert_eq!(report.hidden, vec![id]);
        assert!(designer.stage().handle_of(id).is_none());
        assert!(designer.render_state().contains(id));
    }

    #[test]
    fn test_layers_are_top_first() {
        let mut designer = designer();
        let a = designer.add_image("logo.png", Point::default());
        let b = designer.add_image("wide.png", Point::default());
        let c = designer.add_text("Hi", "sans", "#000", Point::default());
        assert_eq!(designer.layers(), vec![c, b, a]);

        assert!(designer.move_layer(0, 2));
        assert_eq!(designer.layers(), vec![b, a, c]);
        assert!(designer.bring_to_front(c));
        assert!(!designer.bring_forward(c));
        assert!(designer.send_backward(c));
        assert_eq!(designer.layers(), vec![b, c, a]);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: DesignerConfig =
            serde_json::from_str(r#"{"min_size": 4, "read_only": true}"#).expect("parse");
        assert!((config.min_size - 4.0).abs() < f64::EPSILON);
        assert!(config.read_only);
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
    }
}
