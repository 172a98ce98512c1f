//! # Studio Core
//!
//! Scene reconciliation and transform engine for a 2D product design surface.
//! Images and text are arranged over a product silhouette; the engine keeps
//! the declarative item list and per-item render state in sync with a
//! retained, mutable scene graph in both directions.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Designer                          │
//! ├──────────────────────────────────────────────────────────┤
//! │  Item Model          │  Render-State Store               │
//! │  - Image / Text      │  - Position, size, scale          │
//! │  - Z-order           │  - Rotation, flip, lock, visible  │
//! ├──────────────────────────────────────────────────────────┤
//! │  Scene Reconciler  ──────────────►  Surface (Stage)      │
//! │  Transform Façade  ──────────────►  - Scene objects      │
//! │  Selection Bridge  ◄─────────────►  - Active object      │
//! │  Gesture Feedback  ◄──────────────  - Native gestures    │
//! ├──────────────────────────────────────────────────────────┤
//! │  History (undo/redo) │  Document (JSON)                  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! State flows one way into the surface through the reconciler. The only way
//! back is the narrow feedback channel for committed gestures and text edits.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assets;
pub mod designer;
pub mod document;
pub mod error;
pub mod feedback;
pub mod history;
pub mod item;
pub mod memory;
pub mod product;
pub mod reconciler;
pub mod render_state;
pub mod selection;
pub mod surface;
pub mod transform;

pub use assets::{
    AssetError, AssetLoader, Dimensions, FontTable, ImageAsset, StaticAssets,
    FALLBACK_FONT_FAMILY,
};
pub use designer::{Designer, DesignerConfig, HostEvent};
pub use document::{DesignDocument, DOCUMENT_VERSION};
pub use error::{DesignError, DesignResult};
pub use feedback::Committed;
pub use history::{History, Snapshot};
pub use item::{ImageItem, Item, ItemId, ItemKind, ItemList, Point, TextItem};
pub use memory::{MemorySurface, SurfaceStats, TextEditing, Viewport};
pub use product::{Anchor, Background, HorizontalEdge, ParseAnchorError, Product, VerticalEdge};
pub use reconciler::{BackgroundOutcome, ReconcileInput, ReconcileReport, Reconciler};
pub use render_state::{RenderState, RenderStatePatch, RenderStateStore, Scale, StateDefaults};
pub use selection::{SelectionBridge, SyncOutcome};
pub use surface::{
    Controls, Interaction, ObjectHandle, PassToken, SceneContent, SceneIndex, SceneObject, Stage,
    Surface, SurfaceEvent,
};
pub use transform::{Rotation, Transformer, MIN_SIZE, ROTATION_RESET};

/// Studio core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
