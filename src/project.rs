//! The project: every page, the camera, the clipboard and the undo history.
//!
//! All card mutations that should be undoable go through [`Project`] so that
//! each one is captured into the history. The UI calls
//! [`Project::begin_frame`] and [`Project::end_frame`] around each frame so
//! that everything changed in one frame undoes together.

use crate::camera::Camera;
use crate::card::{Card, CardContent, CardId, CardKind, Record};
use crate::config::BoardConfig;
use crate::error::{BoardError, Result};
use crate::geometry::{Point, Rect};
use crate::page::{Page, PageId};
use crate::undo::{UndoHistory, UndoState, UndoTarget};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Version written into project files. Files with any other version are
/// rejected on load.
pub const FORMAT_VERSION: u32 = 1;

/// High-level commands, usually bound to keyboard shortcuts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Step back one history frame
    Undo,
    /// Step forward one history frame
    Redo,
    /// Create a card of this kind at the center of the view
    NewCard(CardKind),
    /// Delete every selected card
    DeleteSelected,
    /// Select every card on the current page
    SelectAll,
    /// Clear the selection
    DeselectAll,
    /// Copy the selected cards to the clipboard
    Copy,
    /// Paste the clipboard, offset from the copied positions
    Paste,
    /// Zoom in one step
    ZoomIn,
    /// Zoom out one step
    ZoomOut,
    /// Jump straight to a zoom level
    ZoomLevel(f32),
    /// Pan by a screen-space delta
    Pan {
        /// Horizontal delta in screen pixels
        dx: f32,
        /// Vertical delta in screen pixels
        dy: f32,
    },
    /// Center the view on the world origin
    ReturnToOrigin,
    /// Center the view on the selected cards
    FocusSelection,
    /// Flip completion on the selected checkboxes
    ToggleCompletion,
    /// Leave a sub-page for the page that links to it
    GoUp,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProjectFile {
    version: u32,
    pan: Point,
    zoom: f32,
    pages: Vec<PageFile>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PageFile {
    id: PageId,
    name: String,
    #[serde(default)]
    upward_page: Option<PageId>,
    pan: Point,
    zoom: f32,
    cards: Vec<Record>,
}

/// A planning board made of linked pages.
#[derive(Debug)]
pub struct Project {
    /// Board constants shared by every page
    pub config: BoardConfig,
    /// View onto the current page
    pub camera: Camera,
    /// Undo/redo log covering every page
    pub history: UndoHistory,
    /// Where the project was last saved or loaded from
    pub filepath: Option<PathBuf>,
    /// Whether there are changes since the last save or load
    pub modified: bool,
    pages: IndexMap<PageId, Page>,
    current: PageId,
    next_card_id: CardId,
    next_page_id: PageId,
    clipboard: Vec<Card>,
}

impl Default for Project {
    fn default() -> Self {
        Self::new(BoardConfig::default())
    }
}

impl Project {
    /// Creates a project holding a single empty root page.
    pub fn new(config: BoardConfig) -> Self {
        let root = Page::new(0, "Root", &config);
        let mut pages = IndexMap::new();
        pages.insert(root.id, root);
        Self {
            camera: Camera::new(&config),
            config,
            history: UndoHistory::new(),
            filepath: None,
            modified: false,
            pages,
            current: 0,
            next_card_id: 1,
            next_page_id: 1,
            clipboard: Vec::new(),
        }
    }

    // ----- pages -----

    /// Adds an empty page and returns its id. The current page is unchanged.
    pub fn add_page(&mut self, name: &str, upward_page: Option<PageId>) -> PageId {
        let id = self.next_page_id;
        self.next_page_id += 1;
        let mut page = Page::new(id, name, &self.config);
        page.upward_page = upward_page;
        self.pages.insert(id, page);
        id
    }

    /// Looks up a page by id.
    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.get(&id)
    }

    /// Mutable lookup of a page by id.
    pub fn page_mut(&mut self, id: PageId) -> Option<&mut Page> {
        self.pages.get_mut(&id)
    }

    /// Every page, in creation order.
    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }

    /// Id of the page being viewed.
    pub fn current_page_id(&self) -> PageId {
        self.current
    }

    /// The page being viewed.
    pub fn current_page(&self) -> &Page {
        &self.pages[&self.current]
    }

    /// Mutable access to the page being viewed.
    pub fn current_page_mut(&mut self) -> &mut Page {
        let current = self.current;
        self.pages
            .get_mut(&current)
            .unwrap_or_else(|| unreachable!("current page {current} missing"))
    }

    /// Switches to another page, remembering the camera for the one being
    /// left and restoring the one stored on the target.
    pub fn set_page(&mut self, id: PageId) -> Result<()> {
        if !self.pages.contains_key(&id) {
            return Err(BoardError::UnknownPage(id));
        }
        if id == self.current {
            return Ok(());
        }
        let camera = self.camera;
        let leaving = self.current_page_mut();
        leaving.pan = camera.pan;
        leaving.zoom = camera.zoom;
        self.current = id;
        let (pan, zoom) = (self.pages[&id].pan, self.pages[&id].zoom);
        self.camera.jump_to(pan, zoom);
        Ok(())
    }

    /// Returns to the page that links to the current one. Returns false on a
    /// top-level page.
    pub fn go_up(&mut self) -> bool {
        match self.current_page().upward_page {
            Some(up) => self.set_page(up).is_ok(),
            None => false,
        }
    }

    /// Follows a sub-page card on the current page.
    pub fn open_subpage(&mut self, card: CardId) -> Result<()> {
        let target = match self.current_page().card(card).map(|c| &c.content) {
            Some(CardContent::Subpage { target, .. }) => *target,
            Some(_) => return Ok(()),
            None => return Err(BoardError::UnknownCard(card)),
        };
        self.set_page(target)
    }

    // ----- frame hooks -----

    /// Opens the per-frame undo batch.
    pub fn begin_frame(&mut self) {
        self.history.begin_batch();
    }

    /// Recomputes derived card state and commits the frame's captures as one
    /// undo step.
    pub fn end_frame(&mut self) {
        for page in self.pages.values_mut() {
            page.update_numbering();
        }
        self.history.update();
    }

    // ----- cards -----

    /// Creates a card centered on `center` (snapped to the grid) on the
    /// current page and selects it. Sub-page cards get a fresh linked page.
    pub fn create_card(&mut self, kind: CardKind, center: Point) -> CardId {
        let id = self.next_card_id;
        self.next_card_id += 1;
        let content = match kind {
            CardKind::Subpage => {
                let name = format!("Sub-Page {id}");
                let linked = self.add_page(&name, Some(self.current));
                CardContent::subpage(linked, &name)
            }
            _ => CardContent::new(kind),
        };
        let (w, h) = self.config.card_size;
        let rect = Rect::new(
            self.config.lock(center.x - w / 2.0),
            self.config.lock(center.y - h / 2.0),
            w,
            h,
        );
        let page = self.current;
        let current = self.current_page_mut();
        current.insert_card(Card::new(id, page, rect, content));
        current.selection.replace([id]);
        self.capture(page, id);
        self.modified = true;
        log::debug!("created {:?} card {id} on page {page}", kind);
        id
    }

    /// Deletes cards from the current page as a single undo step. Unknown ids
    /// are skipped.
    pub fn delete_cards(&mut self, ids: &[CardId]) {
        let page = self.current;
        self.history.begin_batch();
        for &id in ids {
            let Some(card) = self.current_page_mut().remove_card(id) else {
                continue;
            };
            match card.to_record() {
                Ok(record) => self
                    .history
                    .capture(UndoState::deleted(id, page, record)),
                Err(err) => log::error!("failed to snapshot deleted card {id}: {err}"),
            }
            self.modified = true;
        }
        self.history.end_batch();
    }

    /// Moves cards by a world-space delta, recording the move.
    pub fn move_cards(&mut self, ids: &[CardId], dx: f32, dy: f32) {
        self.drag_cards(ids, dx, dy);
        self.capture_all(ids);
    }

    /// Moves cards without recording. Used while a drag is in progress; the
    /// [`Project::lock_to_grid`] that ends the drag records the result.
    pub fn drag_cards(&mut self, ids: &[CardId], dx: f32, dy: f32) {
        let page = self.current_page_mut();
        for &id in ids {
            if let Some(rect) = page.card(id).map(|c| c.rect) {
                page.set_rect(id, rect.translated(dx, dy));
            }
        }
        self.modified = true;
    }

    /// Snaps cards to the nearest grid lines, recording the result.
    pub fn lock_to_grid(&mut self, ids: &[CardId]) {
        let config = self.config;
        let page = self.current_page_mut();
        for &id in ids {
            page.lock_to_grid(id, &config);
        }
        self.capture_all(ids);
    }

    /// Resizes a card, rounding both sides up to whole cells.
    pub fn resize_card(&mut self, id: CardId, w: f32, h: f32) -> Result<()> {
        let rect = self
            .current_page()
            .card(id)
            .map(|c| c.rect)
            .ok_or(BoardError::UnknownCard(id))?;
        let size = (self.config.ceil_to_grid(w), self.config.ceil_to_grid(h));
        self.current_page_mut()
            .set_rect(id, Rect::new(rect.x, rect.y, size.0, size.1));
        self.capture(self.current, id);
        self.modified = true;
        Ok(())
    }

    /// Replaces a card's content, recording the change.
    pub fn set_content(&mut self, id: CardId, content: CardContent) -> Result<()> {
        let slot = self
            .current_page_mut()
            .content_mut(id)
            .ok_or(BoardError::UnknownCard(id))?;
        if *slot == content {
            return Ok(());
        }
        *slot = content;
        self.capture(self.current, id);
        self.modified = true;
        Ok(())
    }

    /// Toggles completion on every given card of the current page.
    pub fn toggle_completion(&mut self, ids: &[CardId]) {
        for &id in ids {
            if let Some(content) = self.current_page_mut().content_mut(id) {
                content.toggle_completion();
                self.modified = true;
            }
        }
        self.capture_all(ids);
    }

    /// Advances running timers on every page. Returns the cards whose timer
    /// ran out during this call.
    pub fn tick_timers(&mut self, dt: f32) -> Vec<CardId> {
        let mut finished = Vec::new();
        for page in self.pages.values_mut() {
            let ids: Vec<CardId> = page.cards().map(|c| c.id).collect();
            for id in ids {
                if page.content_mut(id).is_some_and(|c| c.tick(dt)) {
                    log::info!("timer on card {id} finished");
                    finished.push(id);
                }
            }
        }
        finished
    }

    // ----- clipboard -----

    /// Copies the current selection. Returns the number of cards copied.
    pub fn copy_selected(&mut self) -> usize {
        let page = self.current_page();
        self.clipboard = page
            .selection
            .as_slice()
            .iter()
            .filter_map(|id| page.card(*id).cloned())
            .collect();
        self.clipboard.len()
    }

    /// Pastes the clipboard onto the current page, shifted by `offset`, and
    /// selects the copies.
    pub fn paste(&mut self, offset: Point) -> Vec<CardId> {
        if self.clipboard.is_empty() {
            return Vec::new();
        }
        let page = self.current;
        let mut pasted = Vec::with_capacity(self.clipboard.len());
        self.history.begin_batch();
        for source in self.clipboard.clone() {
            let id = self.next_card_id;
            self.next_card_id += 1;
            let mut card = source;
            card.id = id;
            card.numbering = None;
            card.rect = card.rect.translated(offset.x, offset.y);
            self.current_page_mut().insert_card(card);
            self.capture(page, id);
            pasted.push(id);
        }
        self.history.end_batch();
        self.current_page_mut().selection.replace(pasted.iter().copied());
        self.modified = true;
        pasted
    }

    // ----- actions -----

    /// Runs a high-level command against the current page.
    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::Undo => {
                self.undo();
            }
            Action::Redo => {
                self.redo();
            }
            Action::NewCard(kind) => {
                self.create_card(kind, self.camera.pan);
            }
            Action::DeleteSelected => {
                let ids = self.current_page().selection.as_slice().to_vec();
                self.delete_cards(&ids);
            }
            Action::SelectAll => self.current_page_mut().select_all(),
            Action::DeselectAll => self.current_page_mut().selection.clear(),
            Action::Copy => {
                self.copy_selected();
            }
            Action::Paste => {
                let (cx, cy) = self.config.paste_offset;
                let unit = self.config.grid_size;
                self.paste(Point::new(cx as f32 * unit, cy as f32 * unit));
            }
            Action::ZoomIn => self.camera.add_zoom(1.0),
            Action::ZoomOut => self.camera.add_zoom(-1.0),
            Action::ZoomLevel(level) => self.camera.set_zoom(level),
            Action::Pan { dx, dy } => self.camera.pan_by(dx, dy),
            Action::ReturnToOrigin => self.camera.return_to_origin(),
            Action::FocusSelection => {
                let page = self.current_page();
                let rects: Vec<Rect> = page
                    .selection
                    .as_slice()
                    .iter()
                    .filter_map(|id| page.card(*id).map(|c| c.rect))
                    .collect();
                self.camera.focus_on(&rects);
            }
            Action::ToggleCompletion => {
                let ids = self.current_page().selection.as_slice().to_vec();
                self.toggle_completion(&ids);
            }
            Action::GoUp => {
                self.go_up();
            }
        }
    }

    /// Steps the history back. Returns false at the floor.
    pub fn undo(&mut self) -> bool {
        let mut history = std::mem::take(&mut self.history);
        let undone = history.undo(self);
        self.history = history;
        undone
    }

    /// Steps the history forward. Returns false at the end of the log.
    pub fn redo(&mut self) -> bool {
        let mut history = std::mem::take(&mut self.history);
        let redone = history.redo(self);
        self.history = history;
        redone
    }

    fn capture(&mut self, page: PageId, id: CardId) {
        let Some(card) = self.pages.get(&page).and_then(|p| p.card(id)) else {
            return;
        };
        match card.to_record() {
            Ok(record) => self.history.capture(UndoState::new(id, page, record)),
            Err(err) => log::error!("failed to snapshot card {id}: {err}"),
        }
    }

    fn capture_all(&mut self, ids: &[CardId]) {
        let page = self.current;
        self.history.begin_batch();
        for &id in ids {
            self.capture(page, id);
        }
        self.history.end_batch();
    }

    // ----- persistence -----

    /// Serializes the project to the JSON file format.
    pub fn to_json(&self) -> Result<String> {
        let mut pages = Vec::with_capacity(self.pages.len());
        for page in self.pages.values() {
            let (pan, zoom) = if page.id == self.current {
                (self.camera.pan, self.camera.zoom)
            } else {
                (page.pan, page.zoom)
            };
            pages.push(PageFile {
                id: page.id,
                name: page.name.clone(),
                upward_page: page.upward_page,
                pan,
                zoom,
                cards: page.cards().map(Card::to_record).collect::<Result<_>>()?,
            });
        }
        let file = ProjectFile {
            version: FORMAT_VERSION,
            pan: self.camera.pan,
            zoom: self.camera.zoom,
            pages,
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Rebuilds a project from the JSON file format.
    ///
    /// The loaded cards form the first history frame, which is also the undo
    /// floor, so loading itself cannot be undone.
    pub fn from_json(json: &str, config: BoardConfig) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let version = value
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        if version != u64::from(FORMAT_VERSION) {
            return Err(BoardError::UnsupportedVersion {
                found: version,
                expected: FORMAT_VERSION,
            });
        }
        let file: ProjectFile = serde_json::from_value(value)?;

        let mut project = Project::new(config);
        project.history.set_on(false);
        project.pages.clear();
        for page_file in &file.pages {
            let mut page = Page::new(page_file.id, page_file.name.clone(), &config);
            page.upward_page = page_file.upward_page;
            page.pan = page_file.pan;
            page.zoom = page_file.zoom;
            for record in &page_file.cards {
                let card = Card::from_record(record)?;
                project.next_card_id = project.next_card_id.max(card.id + 1);
                page.insert_card(card);
            }
            project.next_page_id = project.next_page_id.max(page.id + 1);
            project.pages.insert(page.id, page);
        }
        let Some(first) = project.pages.first().map(|(id, page)| (*id, page.pan, page.zoom))
        else {
            let mut empty = Project::new(config);
            empty.camera.jump_to(file.pan, file.zoom);
            return Ok(empty);
        };
        project.current = first.0;
        project.camera.jump_to(first.1, first.2);
        project.history.set_on(true);

        project.history.begin_batch();
        let placed: Vec<(PageId, CardId)> = project
            .pages
            .values()
            .flat_map(|p| p.cards().map(move |c| (p.id, c.id)))
            .collect();
        for (page, id) in placed {
            project.capture(page, id);
        }
        project.history.end_batch();
        project.history.mark_loaded();
        project.end_frame();
        Ok(project)
    }

    /// Writes the project to `path` and remembers it as the save location.
    pub fn save_to(&mut self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|err| {
            log::error!("failed to write {}: {err}", path.display());
            BoardError::from(err)
        })?;
        self.filepath = Some(path.to_path_buf());
        self.modified = false;
        log::info!("saved project to {}", path.display());
        Ok(())
    }

    /// Reads a project from `path`.
    pub fn load_from(path: &Path, config: BoardConfig) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|err| {
            log::error!("failed to read {}: {err}", path.display());
            BoardError::from(err)
        })?;
        let mut project = Self::from_json(&json, config).inspect_err(|err| {
            log::warn!("rejected project file {}: {err}", path.display());
        })?;
        project.filepath = Some(path.to_path_buf());
        log::info!(
            "loaded project from {} ({} pages)",
            path.display(),
            project.pages.len()
        );
        Ok(project)
    }
}

impl UndoTarget for Project {
    fn restore(&mut self, state: &UndoState) {
        let Some(page) = self.pages.get_mut(&state.page) else {
            log::warn!("undo state for card {} names missing page {}", state.card, state.page);
            return;
        };
        self.modified = true;
        if state.deleted {
            page.remove_card(state.card);
            return;
        }
        let result = match page.apply_record(state.card, &state.record) {
            Ok(true) => Ok(()),
            Ok(false) => Card::from_record(&state.record).map(|card| page.insert_card(card)),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            log::error!("failed to restore card {}: {err}", state.card);
        }
    }

    fn discard(&mut self, page: PageId, card: CardId) {
        if let Some(page) = self.pages.get_mut(&page) {
            page.remove_card(card);
            self.modified = true;
        }
    }
}
