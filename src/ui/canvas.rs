//! Canvas interaction and navigation functionality.
//!
//! This module handles canvas panning, zooming, card dragging, box selection
//! and coordinate transformations between screen and world space.

use super::state::{DragState, PlanboardApp};
use crate::card::CardContent;
use crate::constants::BOX_DRAG_THRESHOLD;
use crate::geometry::Point;
use eframe::egui;

impl PlanboardApp {
    /// Converts screen coordinates to world coordinates accounting for zoom and pan.
    pub fn screen_to_world(&self, screen_pos: egui::Pos2) -> Point {
        self.project
            .camera
            .screen_to_world(screen_pos.into(), self.canvas.screen_center.into())
    }

    /// Converts world coordinates to screen coordinates accounting for zoom and pan.
    pub fn world_to_screen(&self, world_pos: Point) -> egui::Pos2 {
        self.project
            .camera
            .world_to_screen(world_pos, self.canvas.screen_center.into())
            .into()
    }

    /// Renders the board canvas and handles pointer input on it.
    pub fn draw_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        self.canvas.screen_center = response.rect.center();

        self.handle_canvas_panning(ui, &response);
        self.handle_canvas_zoom(ui, &response);
        self.handle_canvas_pointer(ui, &response);

        self.render_board(&painter, response.rect);

        if self.context_menu.show {
            self.draw_context_menu(ui);
        }
    }

    /// Handles middle-click or Cmd/Ctrl+left-click canvas panning.
    pub fn handle_canvas_panning(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        let should_pan = ui.input(|i| {
            i.pointer.middle_down() || (i.pointer.primary_down() && i.modifiers.command)
        });

        if should_pan {
            if let Some(current_pos) = response.interact_pointer_pos() {
                if !self.interaction.is_panning {
                    self.interaction.is_panning = true;
                    self.interaction.last_pan_pos = Some(current_pos);
                } else if let Some(last_pos) = self.interaction.last_pan_pos {
                    let delta = current_pos - last_pos;
                    self.project.camera.pan_by(-delta.x, -delta.y);
                    self.interaction.last_pan_pos = Some(current_pos);
                }
            }
        } else {
            self.interaction.is_panning = false;
            self.interaction.last_pan_pos = None;
        }
    }

    /// Handles scroll wheel zooming, keeping the world point under the
    /// cursor fixed.
    pub fn handle_canvas_zoom(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        let scroll_delta = ui.input(|i| i.smooth_scroll_delta.y);
        if scroll_delta == 0.0 {
            return;
        }
        let Some(mouse_pos) = ui.input(|i| i.pointer.hover_pos()) else {
            return;
        };
        if !response.rect.contains(mouse_pos) {
            return;
        }

        let before = self.screen_to_world(mouse_pos);
        self.project
            .camera
            .add_zoom(if scroll_delta > 0.0 { 1.0 } else { -1.0 });
        let after = self.screen_to_world(mouse_pos);
        self.project.camera.pan.x += before.x - after.x;
        self.project.camera.pan.y += before.y - after.y;
    }

    /// Selection, dragging, box selection and the context menu.
    pub fn handle_canvas_pointer(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        if self.interaction.is_panning {
            return;
        }
        let (pressed, released, down, shift, pointer) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.primary_down(),
                i.modifiers.shift,
                i.pointer.interact_pos(),
            )
        });
        let Some(pointer) = pointer else {
            return;
        };
        let world = self.screen_to_world(pointer);

        if ui.input(|i| i.key_pressed(egui::Key::Escape))
            && self.project.current_page().selection.is_box_selecting()
        {
            self.project.current_page_mut().selection.cancel_box();
        }

        if response.secondary_clicked() {
            self.context_menu.show = true;
            self.context_menu.just_opened = true;
            self.context_menu.screen_pos = pointer;
            self.context_menu.world_pos = world;
            return;
        }

        if response.double_clicked() {
            if let Some(id) = self.project.current_page().card_at(world) {
                if let Some(CardContent::Subpage { .. }) =
                    self.project.current_page().card(id).map(|c| &c.content)
                {
                    if let Err(err) = self.project.open_subpage(id) {
                        log::warn!("cannot open sub-page: {err}");
                    }
                    return;
                }
            }
        }

        if pressed && response.rect.contains(pointer) && !self.context_menu.show {
            self.begin_pointer_press(world, shift);
            if self.project.current_page().selection.is_box_selecting() {
                self.interaction.box_origin = Some(pointer);
                self.interaction.box_dragged = false;
            }
        } else if down {
            if let Some(drag) = self.interaction.dragging.as_mut() {
                let (dx, dy) = (world.x - drag.last_world.x, world.y - drag.last_world.y);
                drag.last_world = world;
                let cards = drag.cards.clone();
                if dx != 0.0 || dy != 0.0 {
                    self.project.drag_cards(&cards, dx, dy);
                }
            } else if self.project.current_page().selection.is_box_selecting() {
                if self
                    .interaction
                    .box_origin
                    .is_some_and(|origin| origin.distance(pointer) > BOX_DRAG_THRESHOLD)
                {
                    self.interaction.box_dragged = true;
                }
                self.project.current_page_mut().update_box_selection(world);
            }
        }

        if released {
            if let Some(drag) = self.interaction.dragging.take() {
                self.project.lock_to_grid(&drag.cards);
            }
            self.finish_box_selection(shift);
        }
    }

    /// Ends a box selection on release. A plain release before the box
    /// became a drag reverts to the selection from before the press; a Shift
    /// release keeps whatever the box added.
    fn finish_box_selection(&mut self, shift: bool) {
        let dragged = std::mem::take(&mut self.interaction.box_dragged);
        self.interaction.box_origin = None;
        let selection = &mut self.project.current_page_mut().selection;
        if dragged || shift {
            selection.finish_box();
        } else {
            selection.cancel_box();
        }
    }

    /// Primary press: select or start dragging the card under the pointer,
    /// or start a box selection on empty canvas.
    fn begin_pointer_press(&mut self, world: Point, shift: bool) {
        let page = self.project.current_page_mut();
        match page.card_at(world) {
            Some(id) => {
                if shift {
                    page.selection.toggle(id);
                } else if !page.selection.contains(id) {
                    page.selection.replace([id]);
                }
                if page.selection.contains(id) {
                    page.raise(id);
                    self.interaction.dragging = Some(DragState {
                        cards: page.selection.as_slice().to_vec(),
                        last_world: world,
                    });
                }
            }
            None => {
                page.selection.begin_box(world, shift);
            }
        }
    }
}
