//! Command execution against a headless surface.

use anyhow::Context;
use serde::Serialize;
use studio_assets::FsAssetLoader;
use studio_core::{
    DesignDocument, Designer, HostEvent, ItemId, MemorySurface, ReconcileReport, SceneObject,
};

use crate::{CliConfig, Command};

/// An item that could not be placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    /// The item.
    pub id: ItemId,
    /// Why its asset failed to resolve.
    pub error: String,
}

/// What the surface looks like after the command ran.
#[derive(Debug, Clone, Serialize)]
pub struct SceneSummary {
    /// Whether the command changed the design.
    pub applied: bool,
    /// Whether the updated document was written back.
    pub written: bool,
    /// Items on the surface, bottom first.
    pub placed: Vec<ItemId>,
    /// Items hidden by visibility.
    pub hidden: Vec<ItemId>,
    /// Items whose assets failed to load.
    pub failed: Vec<FailedItem>,
    /// Whether the background was placed.
    pub background: bool,
    /// Scene objects bottom to top, background included.
    pub objects: Vec<SceneObject>,
    /// Notifications the engine raised.
    pub events: Vec<HostEvent>,
}

type HeadlessDesigner = Designer<MemorySurface, FsAssetLoader>;

/// Run one command end to end.
///
/// # Errors
///
/// Returns an error if the document cannot be read or parsed, if a delete
/// names an unknown item, or if writing the document back fails.
pub async fn run(config: &CliConfig, command: &Command) -> anyhow::Result<SceneSummary> {
    let path = command.doc();
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let doc = DesignDocument::from_json(&json)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::info!(
        "Loaded {} (version {}, {} item(s))",
        path.display(),
        doc.version,
        doc.items.len()
    );

    let mut loader = FsAssetLoader::new(&config.assets_root);
    if let Some(dir) = &config.fonts_dir {
        loader = loader.with_fonts_dir(dir);
    }
    let surface = MemorySurface::new(doc.product.editable_width, doc.product.editable_height);
    let mut designer = Designer::from_document(surface, loader, config.designer, doc);

    // Transforms act on placed objects, so the scene is built first
    let first = designer.render().await;
    log_report(&first);

    let applied = apply(&mut designer, command)?;
    let report = if applied {
        let report = designer.render().await;
        log_report(&report);
        report
    } else {
        first
    };

    let written = if applied && config.write {
        let json = designer.to_document().to_json()?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Wrote {}", path.display());
        true
    } else {
        false
    };

    Ok(summarize(&mut designer, report, applied, written))
}

fn apply(designer: &mut HeadlessDesigner, command: &Command) -> anyhow::Result<bool> {
    let applied = match *command {
        Command::Render { .. } => false,
        Command::Rotate { id, degrees, .. } => designer.rotate(id, degrees).is_some(),
        Command::Resize { id, factor, .. } => designer.resize(id, factor).is_some(),
        Command::Align { id, anchor, .. } => designer.align(id, anchor).is_some(),
        Command::Flip { id, .. } => designer.flip(id).is_some(),
        Command::Delete { id, .. } => {
            designer.delete(id)?;
            true
        }
    };
    if command.mutates() && !applied {
        tracing::warn!("Command had no effect (read-only design or item not on the surface)");
    }
    Ok(applied)
}

fn log_report(report: &ReconcileReport) {
    tracing::debug!(
        "Reconciled: {} placed, {} hidden, {} failed",
        report.placed.len(),
        report.hidden.len(),
        report.failed.len()
    );
    for (id, error) in &report.failed {
        tracing::warn!("Item {id} left out: {error}");
    }
}

fn summarize(
    designer: &mut HeadlessDesigner,
    report: ReconcileReport,
    applied: bool,
    written: bool,
) -> SceneSummary {
    let objects = designer.stage().read(|surface, _| surface.snapshot());
    SceneSummary {
        applied,
        written,
        placed: report.placed,
        hidden: report.hidden,
        failed: report
            .failed
            .into_iter()
            .map(|(id, error)| FailedItem {
                id,
                error: error.to_string(),
            })
            .collect(),
        background: report.background.is_placed(),
        objects,
        events: designer.take_events(),
    }
}
