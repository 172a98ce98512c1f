//! # Studio CLI
//!
//! Headless host for the design surface engine.
//!
//! Loads a design document, reconciles it onto an in-memory surface with
//! assets resolved from disk, optionally applies one transform, and prints
//! a JSON summary of the resulting scene.
//!
//! ## Usage
//!
//! ```bash
//! studio render design.json
//! studio --assets-root ./assets rotate design.json 1718000000000 -- -15
//! studio --write align design.json 1718000000000 top-right
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

mod runner;

pub use runner::{run, FailedItem, SceneSummary};

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use studio_core::{Anchor, DesignerConfig, ItemId};

/// Command-line arguments for the studio host.
#[derive(Debug, Clone, Parser)]
#[command(name = "studio")]
#[command(about = "Reconcile and transform product design documents")]
#[command(version)]
pub struct CliArgs {
    /// Directory relative image sources resolve against
    #[arg(long, env = "STUDIO_ASSETS_ROOT", default_value = ".")]
    pub assets_root: PathBuf,

    /// Directory holding `<family>.ttf` / `.otf` font files
    #[arg(long, env = "STUDIO_FONTS_DIR")]
    pub fonts_dir: Option<PathBuf>,

    /// Open the design read-only (transforms become no-ops)
    #[arg(long)]
    pub read_only: bool,

    /// Write the updated document back after a transform
    #[arg(long)]
    pub write: bool,

    /// Operation to run
    #[command(subcommand)]
    pub command: Command,
}

/// Operations on a design document.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Reconcile the document and print the scene
    Render {
        /// Path to the design document
        doc: PathBuf,
    },
    /// Rotate an item by a number of degrees (0 resets)
    Rotate {
        /// Path to the design document
        doc: PathBuf,
        /// Item to rotate
        id: ItemId,
        /// Degrees to add to the current angle
        #[arg(allow_negative_numbers = true)]
        degrees: f64,
    },
    /// Scale an item's size by a factor
    Resize {
        /// Path to the design document
        doc: PathBuf,
        /// Item to resize
        id: ItemId,
        /// Multiplier for the current size
        factor: f64,
    },
    /// Move an item to one of the nine anchors of the editable area
    Align {
        /// Path to the design document
        doc: PathBuf,
        /// Item to move
        id: ItemId,
        /// Anchor name, e.g. `top-left` or `center`
        anchor: Anchor,
    },
    /// Mirror an item horizontally
    Flip {
        /// Path to the design document
        doc: PathBuf,
        /// Item to flip
        id: ItemId,
    },
    /// Remove an item from the design
    Delete {
        /// Path to the design document
        doc: PathBuf,
        /// Item to remove
        id: ItemId,
    },
}

impl Command {
    /// The document the command operates on.
    #[must_use]
    pub fn doc(&self) -> &PathBuf {
        match self {
            Self::Render { doc }
            | Self::Rotate { doc, .. }
            | Self::Resize { doc, .. }
            | Self::Align { doc, .. }
            | Self::Flip { doc, .. }
            | Self::Delete { doc, .. } => doc,
        }
    }

    /// Whether the command can change the document.
    #[must_use]
    pub const fn mutates(&self) -> bool {
        !matches!(self, Self::Render { .. })
    }
}

/// Host configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Assets root directory.
    pub assets_root: PathBuf,
    /// Fonts directory, if fonts must exist on disk.
    pub fonts_dir: Option<PathBuf>,
    /// Write the document back after a change.
    pub write: bool,
    /// Engine configuration.
    pub designer: DesignerConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            assets_root: PathBuf::from("."),
            fonts_dir: None,
            write: false,
            designer: DesignerConfig::default(),
        }
    }
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        Self {
            assets_root: args.assets_root.clone(),
            fonts_dir: args.fonts_dir.clone(),
            write: args.write,
            designer: DesignerConfig {
                read_only: args.read_only,
                ..DesignerConfig::default()
            },
        }
    }
}
