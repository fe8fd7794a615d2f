//! Application state management structures.
//!
//! This module contains the state that tracks the board UI: canvas display
//! options, in-progress pointer interactions, the context menu and file
//! operations. The board itself lives in [`Project`].

use crate::card::{CardContent, CardId};
use crate::geometry::Point;
use crate::project::Project;
use eframe::egui;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Canvas display options.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasState {
    /// Whether grid lines are drawn behind the cards
    pub show_grid: bool,
    /// Screen-space center of the canvas in the last frame
    #[serde(skip)]
    pub screen_center: egui::Pos2,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            show_grid: true,
            screen_center: egui::Pos2::ZERO,
        }
    }
}

/// A card drag in progress.
#[derive(Debug, Clone)]
pub struct DragState {
    /// Cards moving together
    pub cards: Vec<CardId>,
    /// World position of the pointer in the previous frame
    pub last_world: Point,
}

/// Pointer interactions in progress and per-card edit buffers.
#[derive(Default)]
pub struct InteractionState {
    /// Cards being dragged, if any
    pub dragging: Option<DragState>,
    /// Whether the user is currently panning the canvas
    pub is_panning: bool,
    /// Last pointer position during panning
    pub last_pan_pos: Option<egui::Pos2>,
    /// Edit buffer for the single selected card, committed on focus loss
    pub draft: Option<(CardId, CardContent)>,
    /// Screen position where the current box selection started
    pub box_origin: Option<egui::Pos2>,
    /// Whether the current box selection has moved past the drag threshold
    pub box_dragged: bool,
}

/// Right-click menu for creating cards.
#[derive(Default)]
pub struct ContextMenuState {
    /// Whether the context menu is currently visible
    pub show: bool,
    /// Screen position where the menu appears
    pub screen_pos: egui::Pos2,
    /// World position where new cards are centered
    pub world_pos: Point,
    /// Prevents the opening click from closing the menu again
    pub just_opened: bool,
}

/// File operations and unsaved-changes tracking.
pub struct FileState {
    /// Pending dialog-driven save
    pub pending_save_operation: Option<PendingSaveOperation>,
    /// Pending dialog-driven load
    pub pending_load_operation: Option<PendingLoadOperation>,
    /// Channel for results coming back from dialog tasks
    pub file_operation_sender: Sender<FileOperationResult>,
    /// Receiving end polled once per frame
    pub file_operation_receiver: Receiver<FileOperationResult>,
    /// Whether to show an unsaved-changes confirmation dialog
    pub show_unsaved_dialog: bool,
    /// The action waiting on that confirmation
    pub pending_confirm_action: Option<PendingConfirmAction>,
    /// One-shot flag letting the next close request through after confirmation
    pub allow_close_on_next_request: bool,
    /// Last file status message, shown in the toolbar
    pub status: Option<String>,
}

impl Default for FileState {
    fn default() -> Self {
        let (sender, receiver) = channel();
        Self {
            pending_save_operation: None,
            pending_load_operation: None,
            file_operation_sender: sender,
            file_operation_receiver: receiver,
            show_unsaved_dialog: false,
            pending_confirm_action: None,
            allow_close_on_next_request: false,
            status: None,
        }
    }
}

/// Represents a pending save operation type.
#[derive(Debug)]
pub enum PendingSaveOperation {
    /// Save with a new file path (show file picker)
    SaveAs,
    /// Save to the existing file path
    Save,
}

/// Represents a pending load operation type.
#[derive(Debug)]
pub enum PendingLoadOperation {
    /// Load from a file (show file picker)
    Load,
}

/// Messages sent from file tasks back to the app.
#[derive(Debug)]
pub enum FileOperationResult {
    /// The project was written to the given path
    SaveCompleted(PathBuf),
    /// A file was read; its contents still need to be parsed
    LoadCompleted(PathBuf, String),
    /// Operation failed with an error message
    OperationFailed(String),
}

/// Actions that discard unsaved changes and need confirmation first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingConfirmAction {
    /// Start a new project
    New,
    /// Open a project through the file dialog
    Open,
    /// Open a project from the recent files list
    OpenRecent(usize),
    /// Quit the application
    Quit,
}

/// The main application structure.
///
/// Only UI preferences are serialized; they are persisted through eframe
/// storage under the `app_state` key.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct PlanboardApp {
    /// The board being edited
    #[serde(skip)]
    pub project: Project,
    /// Canvas display options
    pub canvas: CanvasState,
    /// Pointer interaction state
    #[serde(skip)]
    pub interaction: InteractionState,
    /// Context menu state
    #[serde(skip)]
    pub context_menu: ContextMenuState,
    /// File operation state
    #[serde(skip)]
    pub file: FileState,
    /// Number of cards selected on the current page, kept current by a
    /// selection observer
    #[serde(skip)]
    pub selected_count: Rc<Cell<usize>>,
    /// Whether dark mode visuals are enabled
    pub dark_mode: bool,
    /// Remembered width of the properties panel across sessions
    pub properties_panel_width: f32,
    /// Recently opened or saved project files, newest first
    pub recent_files: Vec<PathBuf>,
}

impl Default for PlanboardApp {
    fn default() -> Self {
        Self {
            project: Project::default(),
            canvas: CanvasState::default(),
            interaction: InteractionState::default(),
            context_menu: ContextMenuState::default(),
            file: FileState::default(),
            selected_count: Rc::new(Cell::new(0)),
            dark_mode: true,
            properties_panel_width: 280.0,
            recent_files: Vec::new(),
        }
    }
}

impl PlanboardApp {
    /// Serializes the UI preferences to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Restores UI preferences from JSON, starting with an empty project.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Builds the app from eframe storage, falling back to defaults when
    /// nothing was stored or the stored state cannot be read.
    pub fn restore(storage: Option<&dyn eframe::Storage>) -> Self {
        let Some(json) = storage.and_then(|s| s.get_string("app_state")) else {
            return Self::default();
        };
        Self::from_json(&json).unwrap_or_else(|err| {
            log::warn!("ignoring stored app state: {err}");
            Self::default()
        })
    }

    /// Moves `path` to the front of the recent files list.
    pub fn remember_recent(&mut self, path: PathBuf) {
        self.recent_files.retain(|p| *p != path);
        self.recent_files.insert(0, path);
        self.recent_files.truncate(crate::constants::MAX_RECENT_FILES);
    }

    /// Registers the selection observer on the current page if it has none
    /// yet, and resyncs the selected-card count.
    pub fn watch_selection(&mut self) {
        let count = self.selected_count.clone();
        let selection = &mut self.project.current_page_mut().selection;
        if !selection.has_observer() {
            let sink = count.clone();
            selection.set_observer(Box::new(move |cards| sink.set(cards.len())));
        }
        count.set(selection.len());
    }
}
