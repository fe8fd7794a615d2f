//! User interface for the planning board.
//!
//! # Module Organization
//!
//! - `state` - Application state structures and the main PlanboardApp
//! - `file_ops` - Dialog-driven save/load and recent files
//! - `canvas` - Canvas navigation, selection and card dragging
//! - `rendering` - Drawing the grid, cards and selection box

mod canvas;
mod file_ops;
mod rendering;
mod state;

pub use state::PlanboardApp;

use self::state::PendingConfirmAction;
use crate::camera::ZOOM_LEVELS;
use crate::card::{CardContent, CardId, CardKind};
use crate::constants::{KEY_PAN_SPEED, MAX_TIMER_MINUTES};
use crate::geometry::Point;
use crate::project::Action;
use eframe::egui;

/// Keys that create a card of the matching kind, in [`CardKind::ALL`] order.
const NEW_CARD_KEYS: [egui::Key; 7] = [
    egui::Key::Num1,
    egui::Key::Num2,
    egui::Key::Num3,
    egui::Key::Num4,
    egui::Key::Num5,
    egui::Key::Num6,
    egui::Key::Num7,
];

impl eframe::App for PlanboardApp {
    /// Persist UI preferences between restarts.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        match self.to_json() {
            Ok(json) => storage.set_string("app_state", json),
            Err(err) => log::error!("failed to serialize app state: {err}"),
        }
    }

    /// Runs one frame: input, panels, timers, then the history flush.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(if self.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        });

        self.watch_selection();
        self.handle_pending_operations(ctx);
        self.project.begin_frame();

        self.handle_keyboard(ctx);
        self.handle_file_shortcuts(ctx);
        self.handle_close_request(ctx);

        egui::TopBottomPanel::top("top_toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui);
        });

        let viewport_width = ctx.input(|i| i.screen_rect().width());
        let max_width = (viewport_width * 0.9).max(180.0);
        egui::SidePanel::right("properties_panel")
            .resizable(true)
            .default_width(self.properties_panel_width.clamp(180.0, max_width))
            .show(ctx, |ui| {
                self.properties_panel_width = ui.available_width().clamp(180.0, max_width);
                self.draw_properties_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_canvas(ui);
        });

        self.draw_unsaved_dialog(ctx);

        let dt = ctx.input(|i| i.stable_dt);
        for id in self.project.tick_timers(dt) {
            self.file.status = Some(format!("Timer on card {id} finished"));
        }
        if self
            .project
            .pages()
            .flat_map(|p| p.cards())
            .any(|c| matches!(c.content, CardContent::Timer { running: true, .. }))
        {
            ctx.request_repaint();
        }

        self.project.end_frame();
    }
}

impl PlanboardApp {
    /// Translates this frame's key presses into board actions and runs them.
    /// Nothing is handled while a text field has keyboard focus.
    pub fn handle_keyboard(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        for action in keyboard_actions(ctx) {
            self.project.dispatch(action);
        }
    }

    /// New, Open, Save, Save As and Quit shortcuts.
    fn handle_file_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (save, save_as, open, new, quit) = ctx.input(|i| {
            let cmd = i.modifiers.command;
            let shift = i.modifiers.shift;
            (
                cmd && !shift && i.key_pressed(egui::Key::S),
                cmd && shift && i.key_pressed(egui::Key::S),
                cmd && i.key_pressed(egui::Key::O),
                cmd && i.key_pressed(egui::Key::N),
                cmd && i.key_pressed(egui::Key::Q),
            )
        });
        if save {
            self.save_project();
        } else if save_as {
            self.save_as_project();
        }
        if open {
            self.confirm_or_run(PendingConfirmAction::Open, ctx);
        }
        if new {
            self.confirm_or_run(PendingConfirmAction::New, ctx);
        }
        if quit {
            self.confirm_or_run(PendingConfirmAction::Quit, ctx);
        }
    }

    /// Intercepts window close requests while there are unsaved changes.
    fn handle_close_request(&mut self, ctx: &egui::Context) {
        if !ctx.input(|i| i.viewport().close_requested()) {
            return;
        }
        if self.project.modified && !self.file.allow_close_on_next_request {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.file.show_unsaved_dialog = true;
            self.file.pending_confirm_action = Some(PendingConfirmAction::Quit);
        } else {
            self.file.allow_close_on_next_request = false;
        }
    }

    /// Runs `action` right away, or asks first if it would discard changes.
    fn confirm_or_run(&mut self, action: PendingConfirmAction, ctx: &egui::Context) {
        if self.project.modified {
            self.file.show_unsaved_dialog = true;
            self.file.pending_confirm_action = Some(action);
        } else {
            self.run_confirmed(action, ctx);
        }
    }

    fn run_confirmed(&mut self, action: PendingConfirmAction, ctx: &egui::Context) {
        match action {
            PendingConfirmAction::New => self.new_project(),
            PendingConfirmAction::Open => self.load_project(),
            PendingConfirmAction::OpenRecent(index) => self.open_recent(index),
            PendingConfirmAction::Quit => {
                self.file.allow_close_on_next_request = true;
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
    }

    fn draw_unsaved_dialog(&mut self, ctx: &egui::Context) {
        if !self.file.show_unsaved_dialog {
            return;
        }
        let (title, confirm_label) = match self.file.pending_confirm_action {
            Some(PendingConfirmAction::Quit) => ("Unsaved changes: Quit?", "Discard and Quit"),
            Some(PendingConfirmAction::New) => ("Unsaved changes: New?", "Discard and Create New"),
            Some(PendingConfirmAction::Open | PendingConfirmAction::OpenRecent(_)) => {
                ("Unsaved changes: Open?", "Discard and Open")
            }
            None => ("Unsaved changes", "Discard"),
        };
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label("You have unsaved changes. Are you sure you want to continue?");
                ui.horizontal(|ui| {
                    if ui.button(confirm_label).clicked() {
                        if let Some(action) = self.file.pending_confirm_action.take() {
                            self.run_confirmed(action, ctx);
                        }
                        self.file.show_unsaved_dialog = false;
                    }
                    if ui.button("Cancel").clicked() {
                        self.file.show_unsaved_dialog = false;
                        self.file.pending_confirm_action = None;
                    }
                });
            });
    }

    /// Renders the toolbar with file operations, history, navigation and
    /// view options.
    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        let ctx = ui.ctx().clone();
        ui.horizontal(|ui| {
            if ui.button("New").clicked() {
                self.confirm_or_run(PendingConfirmAction::New, &ctx);
            }
            if ui.button("Open").clicked() {
                self.confirm_or_run(PendingConfirmAction::Open, &ctx);
            }
            ui.add_enabled_ui(!self.recent_files.is_empty(), |ui| {
                ui.menu_button("Recent", |ui| {
                    let mut chosen = None;
                    for (index, path) in self.recent_files.iter().enumerate() {
                        if ui.button(path.display().to_string()).clicked() {
                            chosen = Some(index);
                        }
                    }
                    if let Some(index) = chosen {
                        self.confirm_or_run(PendingConfirmAction::OpenRecent(index), &ctx);
                        ui.close();
                    }
                });
            });
            if ui.button("Save").clicked() {
                self.save_project();
            }
            if ui.button("Save As").clicked() {
                self.save_as_project();
            }

            ui.separator();

            ui.add_enabled_ui(self.project.history.can_undo(), |ui| {
                if ui.button("⟲ Undo").clicked() {
                    self.project.dispatch(Action::Undo);
                }
            });
            ui.add_enabled_ui(self.project.history.can_redo(), |ui| {
                if ui.button("⟳ Redo").clicked() {
                    self.project.dispatch(Action::Redo);
                }
            });

            ui.separator();

            let has_parent = self.project.current_page().upward_page.is_some();
            ui.add_enabled_ui(has_parent, |ui| {
                if ui.button("⬆ Up").clicked() {
                    self.project.dispatch(Action::GoUp);
                }
            });
            ui.label(format!("Page: {}", self.project.current_page().name));

            ui.separator();

            ui.checkbox(&mut self.canvas.show_grid, "Show Grid");
            ui.checkbox(&mut self.dark_mode, "Dark Mode");

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let name = self
                    .project
                    .filepath
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "Untitled".to_string());
                let marker = if self.project.modified { "*" } else { "" };
                ui.label(format!("{name}{marker}"));
                ui.label(format!("Zoom: {:.0}%", self.project.camera.zoom * 100.0));
                if let Some(status) = &self.file.status {
                    ui.label(status);
                }
            });
        });
    }

    /// Shows the editor for a single selected card, bulk actions for a
    /// multi-selection, or page details when nothing is selected.
    fn draw_properties_panel(&mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical().show(ui, |ui| {
            let selected = self.project.current_page().selection.as_slice().to_vec();
            match selected.as_slice() {
                [] => self.draw_page_info(ui),
                [id] => self.draw_card_editor(ui, *id),
                many => {
                    ui.heading(format!("{} cards selected", many.len()));
                    ui.separator();
                    if ui.button("Toggle completion").clicked() {
                        self.project.dispatch(Action::ToggleCompletion);
                    }
                    if ui.button("Focus").clicked() {
                        self.project.dispatch(Action::FocusSelection);
                    }
                    if ui.button("Delete").clicked() {
                        self.project.dispatch(Action::DeleteSelected);
                    }
                }
            }
        });
    }

    fn draw_page_info(&mut self, ui: &mut egui::Ui) {
        ui.heading("Page");
        let page = self.project.current_page_mut();
        if ui.text_edit_singleline(&mut page.name).changed() {
            self.project.modified = true;
        }
        ui.label(format!("{} cards", self.project.current_page().len()));
        ui.separator();
        ui.label("Right-click on the canvas to create cards");
        ui.label("Keys 1-7 create cards at the view center");
        ui.label("Drag on empty canvas to box select");
        ui.label("Middle-click and drag to pan");
        ui.label("Double-click a sub-page card to open it");
    }

    /// Edits a card through a draft copy of its content. Toggles and number
    /// fields commit immediately, text fields when they lose focus.
    fn draw_card_editor(&mut self, ui: &mut egui::Ui, id: crate::card::CardId) {
        let Some(card) = self.project.current_page().card(id) else {
            return;
        };
        let (rect, current) = (card.rect, card.content.clone());
        // A draft only outlives the frame while a field is being edited, so
        // undo and canvas changes show up as soon as focus leaves.
        let editing = ui.ctx().memory(|m| m.focused().is_some());
        let mut draft = match self.interaction.draft.take() {
            Some((draft_id, content)) if draft_id == id && editing => content,
            _ => current.clone(),
        };

        ui.heading(draft.kind().label());
        ui.separator();

        let mut commit = false;
        let mut open_subpage = false;
        match &mut draft {
            CardContent::Checkbox {
                description,
                checked,
            } => {
                commit |= ui.text_edit_multiline(description).lost_focus();
                commit |= ui.checkbox(checked, "Done").changed();
            }
            CardContent::Numbered {
                description,
                current,
                max,
            } => {
                commit |= ui.text_edit_multiline(description).lost_focus();
                ui.horizontal(|ui| {
                    commit |= ui.add(egui::DragValue::new(current).range(0..=*max)).changed();
                    ui.label("/");
                    commit |= ui.add(egui::DragValue::new(max)).changed();
                });
            }
            CardContent::Note { text } => {
                commit |= ui.text_edit_multiline(text).lost_focus();
            }
            CardContent::Image { path, .. } | CardContent::Sound { path } => {
                let mut text = path.clone().unwrap_or_default();
                ui.label("File");
                if ui.text_edit_singleline(&mut text).lost_focus() {
                    *path = (!text.is_empty()).then_some(text);
                    commit = true;
                }
            }
            CardContent::Timer {
                name,
                minutes,
                seconds,
                elapsed,
                running,
            } => {
                commit |= ui.text_edit_singleline(name).lost_focus();
                ui.horizontal(|ui| {
                    commit |= ui
                        .add(
                            egui::DragValue::new(minutes)
                                .range(0..=MAX_TIMER_MINUTES)
                                .suffix("m"),
                        )
                        .changed();
                    commit |= ui
                        .add(egui::DragValue::new(seconds).range(0..=59).suffix("s"))
                        .changed();
                });
                ui.horizontal(|ui| {
                    let label = if *running { "Pause" } else { "Start" };
                    if ui.button(label).clicked() {
                        *running = !*running;
                        commit = true;
                    }
                    if ui.button("Reset").clicked() {
                        *elapsed = 0.0;
                        *running = false;
                        commit = true;
                    }
                });
            }
            CardContent::Subpage { name, .. } => {
                commit |= ui.text_edit_singleline(name).lost_focus();
                open_subpage = ui.button("Open").clicked();
            }
        }

        if commit && draft != current {
            if let Err(err) = self.project.set_content(id, draft.clone()) {
                log::warn!("cannot edit card {id}: {err}");
            }
        }
        if open_subpage {
            if let Err(err) = self.project.open_subpage(id) {
                log::warn!("cannot open sub-page: {err}");
            }
            return;
        }
        self.interaction.draft = Some((id, draft));

        ui.separator();
        let unit = self.project.config.grid_size;
        ui.horizontal(|ui| {
            ui.label(format!("Size: {:.0} x {:.0}", rect.w, rect.h));
        });
        let mut resize = None;
        ui.horizontal(|ui| {
            if ui.button("Wider").clicked() {
                resize = Some((rect.w + unit, rect.h));
            }
            if ui.button("Narrower").clicked() {
                resize = Some((rect.w - unit, rect.h));
            }
            if ui.button("Taller").clicked() {
                resize = Some((rect.w, rect.h + unit));
            }
            if ui.button("Shorter").clicked() {
                resize = Some((rect.w, rect.h - unit));
            }
        });
        if let Some((w, h)) = resize {
            self.resize_card(id, w, h);
        }
        if ui.button("Delete").clicked() {
            self.project.dispatch(Action::DeleteSelected);
        }
    }

    /// Resizes a card from the properties panel, reporting failures in the
    /// status line.
    fn resize_card(&mut self, id: CardId, w: f32, h: f32) {
        if let Err(err) = self.project.resize_card(id, w, h) {
            log::warn!("cannot resize card {id}: {err}");
            self.file.status = Some(format!("Cannot resize card {id}"));
        }
    }

    /// Renders the right-click context menu for creating and managing cards.
    fn draw_context_menu(&mut self, ui: &mut egui::Ui) {
        let selected = self.selected_count.get();
        let area_response = egui::Area::new(egui::Id::new("context_menu"))
            .fixed_pos(self.context_menu.screen_pos)
            .show(ui.ctx(), |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.vertical(|ui| {
                        ui.label("New card:");
                        ui.separator();
                        for kind in CardKind::ALL {
                            if ui.button(kind.label()).clicked() {
                                self.create_card_from_menu(kind);
                            }
                        }
                        ui.separator();
                        ui.add_enabled_ui(selected > 0, |ui| {
                            if ui.button("Copy").clicked() {
                                self.project.dispatch(Action::Copy);
                                self.context_menu.show = false;
                            }
                            if ui.button(format!("Delete ({selected})")).clicked() {
                                self.project.dispatch(Action::DeleteSelected);
                                self.context_menu.show = false;
                            }
                        });
                        if ui.button("Paste").clicked() {
                            self.project.dispatch(Action::Paste);
                            self.context_menu.show = false;
                        }
                        ui.separator();
                        if ui.button("Cancel").clicked() {
                            self.context_menu.show = false;
                        }
                    });
                })
            });

        if !self.context_menu.just_opened && ui.input(|i| i.pointer.primary_clicked()) {
            if let Some(click_pos) = ui.input(|i| i.pointer.interact_pos()) {
                if !area_response.response.rect.contains(click_pos) {
                    self.context_menu.show = false;
                }
            }
        }
        self.context_menu.just_opened = false;
    }

    /// Creates a card centered where the context menu was opened.
    fn create_card_from_menu(&mut self, kind: CardKind) {
        self.project.create_card(kind, self.context_menu.world_pos);
        self.context_menu.show = false;
    }
}

/// Maps this frame's input to board actions.
fn keyboard_actions(ctx: &egui::Context) -> Vec<Action> {
    ctx.input(|i| {
        let mut actions = Vec::new();
        let cmd = i.modifiers.command;
        let shift = i.modifiers.shift;
        let alt = i.modifiers.alt;

        if cmd && i.key_pressed(egui::Key::Z) {
            actions.push(if shift { Action::Redo } else { Action::Undo });
        } else if cmd && i.key_pressed(egui::Key::Y) {
            actions.push(Action::Redo);
        }
        if cmd && i.key_pressed(egui::Key::A) {
            actions.push(if shift {
                Action::DeselectAll
            } else {
                Action::SelectAll
            });
        }
        if cmd && i.key_pressed(egui::Key::C) {
            actions.push(Action::Copy);
        }
        if cmd && i.key_pressed(egui::Key::V) {
            actions.push(Action::Paste);
        }
        if cmd {
            return actions;
        }

        if i.key_pressed(egui::Key::Delete) {
            actions.push(Action::DeleteSelected);
        }
        if i.key_pressed(egui::Key::Backspace) {
            actions.push(Action::GoUp);
        }
        if i.key_pressed(egui::Key::Enter) {
            actions.push(Action::ToggleCompletion);
        }
        if i.key_pressed(egui::Key::F) {
            actions.push(Action::FocusSelection);
        }
        if i.key_pressed(egui::Key::Home) {
            actions.push(Action::ReturnToOrigin);
        }
        if i.key_pressed(egui::Key::Plus) || i.key_pressed(egui::Key::Equals) {
            actions.push(Action::ZoomIn);
        }
        if i.key_pressed(egui::Key::Minus) {
            actions.push(Action::ZoomOut);
        }

        for (key, index) in NEW_CARD_KEYS.iter().zip(0..) {
            if !i.key_pressed(*key) {
                continue;
            }
            if alt {
                if let Some(level) = ZOOM_LEVELS.get(index) {
                    actions.push(Action::ZoomLevel(*level));
                }
            } else {
                actions.push(Action::NewCard(CardKind::ALL[index]));
            }
        }

        let speed = KEY_PAN_SPEED * i.stable_dt * if shift { 2.0 } else { 1.0 };
        let mut pan = Point::ZERO;
        if i.key_down(egui::Key::ArrowLeft) {
            pan.x -= speed;
        }
        if i.key_down(egui::Key::ArrowRight) {
            pan.x += speed;
        }
        if i.key_down(egui::Key::ArrowUp) {
            pan.y -= speed;
        }
        if i.key_down(egui::Key::ArrowDown) {
            pan.y += speed;
        }
        if pan != Point::ZERO {
            actions.push(Action::Pan {
                dx: pan.x,
                dy: pan.y,
            });
        }
        actions
    })
}

#[cfg(test)]
mod tests;
