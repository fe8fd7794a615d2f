//! # Planboard
//!
//! A zoomable planning board. Cards (tasks, notes, timers, links to nested
//! pages and more) are placed freely on pages and arranged into numbered
//! task lists by stacking them vertically.
//!
//! ## Features
//! - Grid-backed spatial index for fast hit tests and neighbor lookups
//! - Multi-card selection with box selection
//! - Snapshot-based undo/redo that batches each frame's changes
//! - Nested sub-pages with per-page camera
//! - JSON project files

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod camera;
pub mod card;
pub mod config;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod page;
pub mod project;
pub mod selection;
pub mod undo;

mod constants;
mod ui;

pub use camera::Camera;
pub use card::{Card, CardContent, CardId, CardKind, Record};
pub use config::BoardConfig;
pub use error::{BoardError, Result};
pub use geometry::{Point, Rect};
pub use grid::{CellRange, Grid, GridCell, GridSelection};
pub use page::{Page, PageId};
pub use project::{Action, Project, FORMAT_VERSION};
pub use selection::Selection;
pub use undo::{HistoryState, UndoHistory, UndoState, UndoTarget};
use ui::PlanboardApp;

/// Runs the planning board with default settings.
///
/// UI preferences saved by a previous session are restored from eframe
/// storage when available.
///
/// # Example
///
/// ```no_run
/// use planboard::run_app;
///
/// fn main() -> Result<(), eframe::Error> {
///     run_app()
/// }
/// ```
pub fn run_app() -> std::result::Result<(), eframe::Error> {
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Planboard",
        options,
        Box::new(|cc| Ok(Box::new(PlanboardApp::restore(cc.storage)))),
    )
}
