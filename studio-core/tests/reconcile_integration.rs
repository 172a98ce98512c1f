//! Reconciliation Integration Tests
//!
//! Tests the complete design flow including:
//! - Item lifecycle and transforms through the designer
//! - Deterministic scene rebuilds
//! - Racing asset loads and superseded passes
//! - Selection, gesture and text-edit feedback from the surface

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use studio_core::{
    Anchor, AssetError, AssetLoader, Background, DesignDocument, Designer, DesignerConfig,
    HostEvent, ImageAsset, Item, ItemId, MemorySurface, Point, Product, ReconcileInput,
    Reconciler, RenderStateStore, SceneObject, Stage, StaticAssets, Surface,
};

/// Static assets with an optional per-image load delay.
#[derive(Debug, Clone, Default)]
struct DelayedAssets {
    inner: StaticAssets,
    delays: HashMap<String, Duration>,
}

impl DelayedAssets {
    fn new() -> Self {
        Self {
            inner: StaticAssets::new()
                .with_image("logo.png", 60, 60)
                .with_image("wide.png", 120, 60)
                .with_image("slow.png", 30, 30)
                .with_image("tee.png", 400, 500),
            delays: HashMap::new(),
        }
    }

    fn delay(mut self, src: &str, millis: u64) -> Self {
        self.delays
            .insert(src.to_string(), Duration::from_millis(millis));
        self
    }
}

#[async_trait]
impl AssetLoader for DelayedAssets {
    async fn load_image(&self, src: &str) -> Result<ImageAsset, AssetError> {
        if let Some(delay) = self.delays.get(src) {
            tokio::time::sleep(*delay).await;
        }
        self.inner.load_image(src).await
    }

    async fn load_font(&self, family: &str) -> Result<(), AssetError> {
        self.inner.load_font(family).await
    }
}

fn designer() -> Designer<MemorySurface, DelayedAssets> {
    let mut designer = Designer::new(MemorySurface::new(1.0, 1.0), DelayedAssets::new());
    designer.set_product(Product::new(200.0, 200.0));
    designer
}

fn scene(designer: &Designer<MemorySurface, DelayedAssets>) -> Vec<SceneObject> {
    designer.stage().read(|surface, _| surface.snapshot())
}

fn all_visible(_: ItemId) -> bool {
    true
}

// ============================================================================
// End-to-End Scenario
// ============================================================================

#[tokio::test]
async fn test_create_resize_rotate_flip_delete() {
    let mut designer = designer();
    let a = designer.add_image("logo.png", Point::new(100.0, 100.0));
    designer.render().await;
    let state = designer.render_state().get(a).expect("state");
    assert!((state.size - 60.0).abs() < f64::EPSILON);

    let size = designer.resize(a, 1.15).expect("resize");
    assert!((size - 69.0).abs() < 1e-9);
    assert!((designer.render_state().get(a).expect("state").size - 69.0).abs() < 1e-9);

    assert_eq!(designer.rotate(a, 90.0), Some(90.0));
    assert!((designer.render_state().get(a).expect("state").rotation - 90.0).abs() < 1e-9);

    assert_eq!(designer.flip(a), Some(true));
    assert!(designer.render_state().get(a).expect("state").flip_x);

    designer.delete(a).expect("delete");
    assert!(designer.items().get(a).is_none());
    assert!(!designer.render_state().contains(a));
    // Still drawn until the next pass
    assert!(designer.stage().handle_of(a).is_some());

    let report = designer.render().await;
    assert!(report.placed.is_empty());
    assert!(designer.stage().handle_of(a).is_none());
    assert!(scene(&designer).is_empty());
}

#[tokio::test]
async fn test_rerender_reproduces_transformed_geometry() {
    let mut designer = designer();
    let a = designer.add_image("wide.png", Point::new(50.0, 50.0));
    designer.render().await;
    designer.resize(a, 2.0);
    designer.rotate(a, 45.0);
    designer.align(a, Anchor::BottomRight);
    let before = scene(&designer);

    designer.render().await;
    assert_eq!(scene(&designer), before);
}

// ============================================================================
// Determinism and Ordering
// ============================================================================

#[tokio::test]
async fn test_reconciliation_is_deterministic() {
    let mut designer = designer();
    designer.set_background(Some(Background::new("tee.png")));
    designer.add_image("logo.png", Point::new(10.0, 20.0));
    designer.add_text("Team", "script", "#fff", Point::new(30.0, 40.0));
    designer.add_image("wide.png", Point::new(50.0, 60.0));

    designer.render().await;
    let first = scene(&designer);
    designer.render().await;
    let second = scene(&designer);

    assert_eq!(first.len(), 4);
    assert_eq!(first, second);
    assert!(first[0].is_background());
}

#[tokio::test]
async fn test_racing_loads_keep_list_order() {
    let assets = DelayedAssets::new()
        .delay("slow.png", 30)
        .delay("tee.png", 50);
    let mut designer = Designer::new(MemorySurface::new(1.0, 1.0), assets);
    designer.set_background(Some(Background::new("tee.png")));
    let slow = designer.add_image("slow.png", Point::default());
    let fast = designer.add_image("logo.png", Point::default());

    let report = designer.render().await;
    assert_eq!(report.placed, vec![slow, fast]);

    designer.stage().read(|surface, index| {
        let order = surface.order();
        // Background finished last but still sits at the bottom
        assert_eq!(Some(order[0]), index.background());
        assert_eq!(index.handle_of(slow), Some(order[1]));
        assert_eq!(index.handle_of(fast), Some(order[2]));
    });
}

// ============================================================================
// Superseded Passes
// ============================================================================

#[tokio::test]
async fn test_newer_pass_fences_stale_loads() {
    let stage = Stage::new(MemorySurface::new(200.0, 200.0));
    let render = RenderStateStore::new();
    let reconciler = Reconciler::new(DelayedAssets::new().delay("slow.png", 40));
    let product = Product::new(200.0, 200.0);
    let old_items = vec![
        Item::image("slow.png", Point::default()),
        Item::image("logo.png", Point::default()),
    ];
    let new_items = vec![Item::image("wide.png", Point::default())];

    let (stale, fresh) = futures::join!(
        reconciler.reconcile(
            &stage,
            ReconcileInput {
                items: &old_items,
                render: &render,
                background: None,
                product: &product,
                visibility: &all_visible,
                selected: None,
                read_only: false,
            },
        ),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            reconciler
                .reconcile(
                    &stage,
                    ReconcileInput {
                        items: &new_items,
                        render: &render,
                        background: None,
                        product: &product,
                        visibility: &all_visible,
                        selected: None,
                        read_only: false,
                    },
                )
                .await
        }
    );

    assert!(stale.superseded);
    assert!(stale.placed.is_empty());
    assert!(!fresh.superseded);
    assert_eq!(fresh.placed, vec![new_items[0].id()]);
    assert_eq!(stage.read(|surface, _| surface.len()), 1);
}

#[tokio::test]
async fn test_replaced_surface_is_never_written() {
    let stage = Stage::new(MemorySurface::new(200.0, 200.0));
    let render = RenderStateStore::new();
    let reconciler = Reconciler::new(DelayedAssets::new().delay("slow.png", 40));
    let product = Product::new(200.0, 200.0);
    let items = vec![Item::image("slow.png", Point::default())];

    let (report, old) = futures::join!(
        reconciler.reconcile(
            &stage,
            ReconcileInput {
                items: &items,
                render: &render,
                background: None,
                product: &product,
                visibility: &all_visible,
                selected: None,
                read_only: false,
            },
        ),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            stage.replace_surface(MemorySurface::new(200.0, 200.0))
        }
    );

    assert!(report.superseded);
    assert!(old.is_disposed());
    assert!(old.is_empty());
    assert!(stage.read(|surface, _| surface.is_empty()));
}

// ============================================================================
// Surface Feedback
// ============================================================================

#[tokio::test]
async fn test_surface_selection_is_not_echoed() {
    let mut designer = designer();
    let a = designer.add_image("logo.png", Point::new(50.0, 50.0));
    designer.render().await;
    let handle = designer.stage().handle_of(a).expect("placed");
    let before = designer.stage().read(|surface, _| surface.stats().activations);

    let events = designer.stage().with(|surface, _| surface.click(handle));
    for event in events {
        designer.handle_surface_event(event);
    }

    assert_eq!(designer.selected(), Some(a));
    assert_eq!(
        designer.take_events(),
        vec![HostEvent::SelectionChanged(Some(a))]
    );
    let after = designer.stage().read(|surface, _| surface.stats().activations);
    assert_eq!(before, after);

    let events = designer.stage().with(|surface, _| surface.click_empty());
    for event in events {
        designer.handle_surface_event(event);
    }
    assert_eq!(designer.selected(), None);
}

#[tokio::test]
async fn test_ui_selection_survives_rebuild() {
    let mut designer = designer();
    let a = designer.add_image("logo.png", Point::new(50.0, 50.0));
    let b = designer.add_image("wide.png", Point::new(80.0, 80.0));
    designer.render().await;
    designer.select(Some(b));
    assert_eq!(
        designer.stage().read(|surface, _| surface.active()),
        designer.stage().handle_of(b)
    );

    designer.render().await;
    assert_eq!(
        designer.stage().read(|surface, _| surface.active()),
        designer.stage().handle_of(b)
    );
    assert_ne!(designer.stage().handle_of(a), designer.stage().handle_of(b));
}

#[tokio::test]
async fn test_drag_is_folded_back_and_survives_rebuild() {
    let mut designer = designer();
    let a = designer.add_image("logo.png", Point::new(50.0, 50.0));
    designer.set_locked(a, false).expect("unlock");
    designer.render().await;
    let handle = designer.stage().handle_of(a).expect("placed");

    let event = designer
        .stage()
        .with(|surface, _| surface.drag(handle, 30.0, -10.0))
        .expect("movable");
    designer.handle_surface_event(event);

    let state = designer.render_state().get(a).expect("state");
    assert!((state.x - 80.0).abs() < f64::EPSILON);
    assert!((state.y - 40.0).abs() < f64::EPSILON);
    // Image gestures do not touch the item list
    assert!(designer.take_events().is_empty());

    designer.render().await;
    let handle = designer.stage().handle_of(a).expect("placed");
    let object = designer
        .stage()
        .read(|surface, _| surface.object(handle).cloned())
        .expect("object");
    assert!((object.x - 80.0).abs() < f64::EPSILON);
    assert!((object.y - 40.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_locked_item_ignores_gestures() {
    let mut designer = designer();
    let a = designer.add_image("logo.png", Point::new(50.0, 50.0));
    designer.set_locked(a, true).expect("lock");
    designer.render().await;
    let handle = designer.stage().handle_of(a).expect("placed");

    let moved = designer
        .stage()
        .with(|surface, _| surface.drag(handle, 30.0, 30.0));
    assert!(moved.is_none());
    // Still selectable so it can be unlocked
    let events = designer.stage().with(|surface, _| surface.click(handle));
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn test_text_edit_updates_item_and_notifies() {
    let mut designer = designer();
    let t = designer.add_text("Hello", "serif", "#000", Point::new(100.0, 100.0));
    designer.render().await;
    let handle = designer.stage().handle_of(t).expect("placed");

    let mut events = designer
        .stage()
        .with(|surface, _| surface.double_activate(handle));
    designer.stage().with(|surface, _| surface.type_text("Goodbye"));
    events.extend(designer.stage().with(|surface, _| surface.exit_editing()));
    for event in events {
        designer.handle_surface_event(event);
    }

    let text = designer
        .items()
        .get(t)
        .and_then(Item::as_text)
        .map(|item| item.text.clone());
    assert_eq!(text.as_deref(), Some("Goodbye"));
    let events = designer.take_events();
    assert!(events.contains(&HostEvent::SelectionChanged(Some(t))));
    assert!(events
        .iter()
        .any(|event| matches!(event, HostEvent::ItemsChanged(items) if items.len() == 1)));

    designer.render().await;
    let handle = designer.stage().handle_of(t).expect("placed");
    let shown = designer.stage().read(|surface, _| {
        surface
            .object(handle)
            .and_then(|object| object.text().map(str::to_string))
    });
    assert_eq!(shown.as_deref(), Some("Goodbye"));
}

#[tokio::test]
async fn test_text_scale_gesture_reports_items_changed() {
    let mut designer = designer();
    let t = designer.add_text("Hi", "sans", "#000", Point::new(100.0, 100.0));
    designer.render().await;
    let handle = designer.stage().handle_of(t).expect("placed");

    let event = designer
        .stage()
        .with(|surface, _| surface.rotate_to(handle, 15.0))
        .expect("rotatable");
    designer.handle_surface_event(event);

    assert!(matches!(
        designer.take_events().as_slice(),
        [HostEvent::ItemsChanged(_)]
    ));
    let state = designer.render_state().get(t).expect("state");
    assert!((state.rotation - 15.0).abs() < f64::EPSILON);
    assert!((state.size - 32.0).abs() < f64::EPSILON);
}

// ============================================================================
// Read-Only Mode
// ============================================================================

#[tokio::test]
async fn test_read_only_scene_is_inert() {
    let config = DesignerConfig {
        read_only: true,
        ..DesignerConfig::default()
    };
    let mut designer =
        Designer::with_config(MemorySurface::new(1.0, 1.0), DelayedAssets::new(), config);
    let a = designer.add_image("logo.png", Point::new(50.0, 50.0));
    designer.select(Some(a));
    designer.render().await;

    designer.stage().read(|surface, _| {
        assert_eq!(surface.active(), None);
        assert!(surface.objects().all(|object| {
            !object.interaction.selectable && !object.interaction.has_controls
        }));
    });
}

// ============================================================================
// Documents
// ============================================================================

#[tokio::test]
async fn test_document_round_trip_through_designer() {
    let mut designer = designer();
    designer.set_background(Some(Background::new("tee.png")));
    let a = designer.add_image("logo.png", Point::new(40.0, 40.0));
    designer.add_text("Hi", "mono", "#333", Point::new(90.0, 90.0));
    designer.render().await;
    designer.rotate(a, 30.0);
    designer.select(Some(a));

    let json = designer.to_document().to_json().expect("serialize");
    let doc = DesignDocument::from_json(&json).expect("parse");
    let restored = Designer::from_document(
        MemorySurface::new(1.0, 1.0),
        DelayedAssets::new(),
        DesignerConfig::default(),
        doc,
    );
    restored.render().await;
    designer.render().await;

    assert_eq!(restored.selected(), Some(a));
    assert_eq!(
        restored.stage().read(|surface, _| surface.snapshot()),
        scene(&designer)
    );
    assert!(!restored.can_undo());
}
