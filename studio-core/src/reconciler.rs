//! Scene reconciliation: project items and render state onto the surface.
//!
//! A pass clears the surface and rebuilds it from scratch:
//!
//! ```text
//! ensure_defaults ─► begin_pass ─┬─► background (load, stretch, send to back)
//!                                └─► items, one at a time in list order
//!                                      visible? ─► render state ─► asset ─► append
//!                 ◄── join ──────┘
//! re-assert background at bottom ─► activate selection ─► reset viewport ─► render
//! ```
//!
//! Asset loads are the only suspension points. Every insertion after an await
//! goes through [`Stage::commit`], so a pass that has been superseded by a
//! newer one (or whose surface was replaced) stops writing.

use futures::join;

use crate::assets::{AssetError, AssetLoader, Dimensions, FontTable, ImageAsset};
use crate::item::{ImageItem, Item, ItemId, TextItem};
use crate::product::{Background, Product};
use crate::render_state::{RenderState, RenderStateStore, Scale};
use crate::surface::{
    Controls, Interaction, PassToken, SceneContent, SceneIndex, SceneObject, Stage, Surface,
};

/// Everything a pass reads.
pub struct ReconcileInput<'a> {
    /// Items in z-order, bottom first.
    pub items: &'a [Item],
    /// Render-state store; defaults are filled in before the pass.
    pub render: &'a RenderStateStore,
    /// Background image, if one is selected.
    pub background: Option<&'a Background>,
    /// Product whose editable area sizes the surface.
    pub product: &'a Product,
    /// Whether an item should appear in the scene.
    pub visibility: &'a (dyn Fn(ItemId) -> bool + Sync),
    /// Item to activate once everything is placed.
    pub selected: Option<ItemId>,
    /// Disables selection, manipulation and controls.
    pub read_only: bool,
}

impl std::fmt::Debug for ReconcileInput<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileInput")
            .field("items", &self.items.len())
            .field("background", &self.background)
            .field("product", &self.product)
            .field("selected", &self.selected)
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

/// What happened to the background in a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BackgroundOutcome {
    /// No background was requested.
    #[default]
    None,
    /// The background was placed at the bottom of the stack.
    Placed,
    /// The background image failed to load.
    Failed(AssetError),
}

impl BackgroundOutcome {
    /// Whether the background ended up on the surface.
    #[must_use]
    pub const fn is_placed(&self) -> bool {
        matches!(self, Self::Placed)
    }
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Items placed, in stacking order.
    pub placed: Vec<ItemId>,
    /// Items left out by the visibility predicate.
    pub hidden: Vec<ItemId>,
    /// Items left out because an asset failed to resolve.
    pub failed: Vec<(ItemId, AssetError)>,
    /// Items with no render state after defaulting.
    pub missing_state: Vec<ItemId>,
    /// Background result.
    pub background: BackgroundOutcome,
    /// A newer pass or surface took over before this one finished.
    pub superseded: bool,
}

/// Rebuilds the surface from the declarative item list.
#[derive(Debug)]
pub struct Reconciler<L> {
    loader: L,
    fonts: FontTable,
}

enum Resolved {
    Image(ImageAsset),
    Font(String),
}

impl<L: AssetLoader> Reconciler<L> {
    /// Create a reconciler with the standard font table.
    #[must_use]
    pub fn new(loader: L) -> Self {
        Self::with_fonts(loader, FontTable::default())
    }

    /// Create a reconciler with a custom font table.
    #[must_use]
    pub fn with_fonts(loader: L, fonts: FontTable) -> Self {
        Self { loader, fonts }
    }

    /// The asset loader.
    #[must_use]
    pub const fn loader(&self) -> &L {
        &self.loader
    }

    /// The font table.
    #[must_use]
    pub const fn fonts(&self) -> &FontTable {
        &self.fonts
    }

    /// Run one full pass against the stage's current surface.
    pub async fn reconcile<S: Surface>(
        &self,
        stage: &Stage<S>,
        input: ReconcileInput<'_>,
    ) -> ReconcileReport {
        input.render.ensure_defaults(input.items);

        let token = stage.begin_pass();
        let product = *input.product;
        if stage
            .commit(token, |surface, _| {
                surface.set_dimensions(product.editable_width, product.editable_height);
            })
            .is_none()
        {
            return superseded(ReconcileReport::default());
        }

        let (background, mut report) = join!(
            self.place_background(stage, token, input.background, &product),
            self.place_items(stage, token, &input),
        );

        let Some(background) = background else {
            return superseded(report);
        };
        report.background = background;
        if report.superseded {
            return report;
        }

        let selected = if input.read_only { None } else { input.selected };
        let finished = stage.commit(token, |surface, index| {
            if let Some(handle) = index.background() {
                surface.send_to_back(handle);
            }
            surface.set_active(selected.and_then(|id| index.handle_of(id)));
            surface.reset_viewport();
            surface.request_render();
        });
        if finished.is_none() {
            return superseded(report);
        }

        tracing::debug!(
            placed = report.placed.len(),
            hidden = report.hidden.len(),
            failed = report.failed.len(),
            "Reconciliation pass complete"
        );
        report
    }

    /// Returns `None` if the pass was superseded.
    async fn place_background<S: Surface>(
        &self,
        stage: &Stage<S>,
        token: PassToken,
        background: Option<&Background>,
        product: &Product,
    ) -> Option<BackgroundOutcome> {
        let Some(background) = background else {
            return Some(BackgroundOutcome::None);
        };
        let asset = match self.loader.load_image(&background.url).await {
            Ok(asset) => asset,
            Err(e) => {
                tracing::warn!("Background {} failed to load: {e}", background.url);
                return Some(BackgroundOutcome::Failed(e));
            }
        };
        stage.commit(token, |surface, index| {
            let handle = surface.add(background_object(background, &asset, product));
            surface.send_to_back(handle);
            index.set_background(handle);
            BackgroundOutcome::Placed
        })
    }

    async fn place_items<S: Surface>(
        &self,
        stage: &Stage<S>,
        token: PassToken,
        input: &ReconcileInput<'_>,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        for item in input.items {
            let id = item.id();
            if !(input.visibility)(id) {
                report.hidden.push(id);
                continue;
            }
            if !input.render.contains(id) {
                tracing::error!("Item {id} has no render state after defaulting");
                report.missing_state.push(id);
                continue;
            }

            let resolved = match self.resolve(item).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    tracing::warn!("Item {id} omitted from pass: {e}");
                    report.failed.push((id, e));
                    continue;
                }
            };

            let placed = stage.commit(token, |surface, index| {
                place(surface, index, item, input.render, &resolved, input.read_only)
            });
            match placed {
                None => return superseded(report),
                Some(true) => report.placed.push(id),
                Some(false) => {
                    tracing::error!("Render state for item {id} vanished mid-pass");
                    report.missing_state.push(id);
                }
            }
        }
        report
    }

    async fn resolve(&self, item: &Item) -> Result<Resolved, AssetError> {
        match item {
            Item::Image(image) => self.loader.load_image(&image.src).await.map(Resolved::Image),
            Item::Text(text) => {
                let family = self.fonts.resolve(&text.font).to_string();
                self.loader.load_font(&family).await?;
                Ok(Resolved::Font(family))
            }
        }
    }
}

fn superseded(mut report: ReconcileReport) -> ReconcileReport {
    tracing::debug!("Reconciliation pass superseded");
    report.superseded = true;
    report
}

/// Append one item using the latest render state. Returns `false` if the
/// state disappeared.
fn place<S: Surface>(
    surface: &mut S,
    index: &mut SceneIndex,
    item: &Item,
    render: &RenderStateStore,
    resolved: &Resolved,
    read_only: bool,
) -> bool {
    let Some(state) = render.get(item.id()) else {
        return false;
    };
    let object = match (item, resolved) {
        (Item::Image(image), Resolved::Image(asset)) => {
            image_object(image, &state, asset, read_only)
        }
        (Item::Text(text), Resolved::Font(family)) => {
            text_object(text, &state, family, read_only)
        }
        _ => return false,
    };
    let handle = surface.add(object);
    index.insert(item.id(), handle);
    true
}

/// Interaction flags for an item object.
///
/// Read-only mode makes everything inert and hides controls. A locked item
/// stays selectable but cannot be moved, resized, rotated or edited.
#[must_use]
pub fn interaction_for(locked: bool, is_text: bool, read_only: bool) -> Interaction {
    if read_only {
        return Interaction::INERT;
    }
    let live = !locked;
    Interaction {
        selectable: true,
        movable: live,
        scalable: live,
        rotatable: live,
        editable: is_text && live,
        has_controls: live,
        controls: Controls::CORNERS_ONLY,
    }
}

fn axis_scale(size: f64, natural: f64) -> f64 {
    if natural > 0.0 {
        size / natural
    } else {
        1.0
    }
}

/// Scale for an image: the stored explicit scale, or `size / natural` per axis.
#[must_use]
pub fn image_scale(state: &RenderState, natural: Dimensions) -> Scale {
    state.scale.unwrap_or_else(|| {
        Scale::new(
            axis_scale(state.size, natural.width),
            axis_scale(state.size, natural.height),
        )
    })
}

/// Build the scene object for an image item.
#[must_use]
pub fn image_object(
    item: &ImageItem,
    state: &RenderState,
    asset: &ImageAsset,
    read_only: bool,
) -> SceneObject {
    let scale = image_scale(state, asset.natural);
    SceneObject {
        content: SceneContent::Image {
            src: item.src.clone(),
            natural: asset.natural,
        },
        x: state.x,
        y: state.y,
        scale_x: scale.x,
        scale_y: scale.y,
        angle: state.rotation,
        flip_x: state.flip_x,
        interaction: interaction_for(state.locked, false, read_only),
    }
}

/// Build the scene object for a text item.
#[must_use]
pub fn text_object(
    item: &TextItem,
    state: &RenderState,
    font_family: &str,
    read_only: bool,
) -> SceneObject {
    let scale = state.scale.unwrap_or_default();
    SceneObject {
        content: SceneContent::Text {
            text: item.text.clone(),
            font_family: font_family.to_string(),
            fill: item.fill.clone(),
            font_size: state.size,
        },
        x: state.x,
        y: state.y,
        scale_x: scale.x,
        scale_y: scale.y,
        angle: state.rotation,
        flip_x: state.flip_x,
        interaction: interaction_for(state.locked, true, read_only),
    }
}

/// Build the background object, stretched to exactly fill the editable area.
#[must_use]
pub fn background_object(
    background: &Background,
    asset: &ImageAsset,
    product: &Product,
) -> SceneObject {
    SceneObject {
        content: SceneContent::Background {
            src: background.url.clone(),
            natural: asset.natural,
        },
        x: product.editable_width / 2.0,
        y: product.editable_height / 2.0,
        scale_x: axis_scale(product.editable_width, asset.natural.width),
        scale_y: axis_scale(product.editable_height, asset.natural.height),
        angle: 0.0,
        flip_x: false,
        interaction: Interaction::INERT,
    }
}
