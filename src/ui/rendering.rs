//! Canvas rendering for the grid, cards and the selection box.

use super::state::PlanboardApp;
use crate::card::{Card, CardContent};
use crate::constants::{CARD_CORNER_RADIUS, CARD_FONT_SIZE, CARD_TEXT_PADDING, MIN_VISIBLE_GRID};
use crate::geometry::{Point, Rect};
use eframe::egui;
use eframe::epaint::StrokeKind;

impl PlanboardApp {
    /// Renders the current page: grid first, then the cards under the
    /// canvas in draw order, then the box selection rectangle on top.
    pub fn render_board(&self, painter: &egui::Painter, canvas_rect: egui::Rect) {
        if self.canvas.show_grid {
            self.draw_grid(painter, canvas_rect);
        }

        let page = self.project.current_page();
        let view = Rect::from_corners(
            self.screen_to_world(canvas_rect.min),
            self.screen_to_world(canvas_rect.max),
        );
        for card in page.cards_in_view(&view) {
            let selected = page.selection.contains(card.id);
            self.draw_card(painter, card, selected);
        }

        if let Some(world) = page.selection.box_rect() {
            let min = self.world_to_screen(Point::new(world.x, world.y));
            let max = self.world_to_screen(Point::new(world.right(), world.bottom()));
            let rect = egui::Rect::from_min_max(min, max);
            painter.rect_filled(
                rect,
                0.0,
                egui::Color32::from_rgba_unmultiplied(100, 150, 255, 32),
            );
            painter.rect_stroke(
                rect,
                0.0,
                egui::Stroke::new(1.0, egui::Color32::from_rgb(100, 150, 255)),
                StrokeKind::Inside,
            );
        }
    }

    /// Draws grid lines at the board's cell size. Skipped when zoomed out so
    /// far that cells would be only a few pixels wide.
    pub fn draw_grid(&self, painter: &egui::Painter, canvas_rect: egui::Rect) {
        let grid_size = self.project.config.grid_size;
        let screen_grid_size = grid_size * self.project.camera.zoom;
        if screen_grid_size < MIN_VISIBLE_GRID {
            return;
        }
        let stroke = egui::Stroke::new(
            1.0,
            egui::Color32::from_rgba_unmultiplied(128, 128, 128, 32),
        );

        let top_left = self.screen_to_world(canvas_rect.min);
        let bottom_right = self.screen_to_world(canvas_rect.max);

        let mut x = (top_left.x / grid_size).floor() * grid_size;
        while x <= bottom_right.x {
            let screen_x = self.world_to_screen(Point::new(x, 0.0)).x;
            painter.line_segment(
                [
                    egui::pos2(screen_x, canvas_rect.min.y),
                    egui::pos2(screen_x, canvas_rect.max.y),
                ],
                stroke,
            );
            x += grid_size;
        }

        let mut y = (top_left.y / grid_size).floor() * grid_size;
        while y <= bottom_right.y {
            let screen_y = self.world_to_screen(Point::new(0.0, y)).y;
            painter.line_segment(
                [
                    egui::pos2(canvas_rect.min.x, screen_y),
                    egui::pos2(canvas_rect.max.x, screen_y),
                ],
                stroke,
            );
            y += grid_size;
        }
    }

    /// Draws one card with its completion state and label.
    pub fn draw_card(&self, painter: &egui::Painter, card: &Card, selected: bool) {
        let zoom = self.project.camera.zoom;
        let min = self.world_to_screen(Point::new(card.rect.x, card.rect.y));
        let rect = egui::Rect::from_min_size(min, egui::vec2(card.rect.w, card.rect.h) * zoom);

        let fill = card_color(&card.content, self.dark_mode);
        painter.rect_filled(rect, CARD_CORNER_RADIUS, fill);

        if let CardContent::Numbered { current, max, .. } = card.content {
            if max > 0 {
                let ratio = (current.min(max) as f32) / max as f32;
                let mut bar = rect;
                bar.set_width(rect.width() * ratio);
                painter.rect_filled(
                    bar,
                    CARD_CORNER_RADIUS,
                    egui::Color32::from_rgba_unmultiplied(80, 200, 120, 60),
                );
            }
        }

        let (stroke_color, stroke_width) = if selected {
            (egui::Color32::YELLOW, 2.0)
        } else if card.content.is_complete() {
            (egui::Color32::from_rgb(80, 200, 120), 1.5)
        } else {
            (egui::Color32::from_gray(20), 1.0)
        };
        painter.rect_stroke(
            rect,
            CARD_CORNER_RADIUS,
            egui::Stroke::new(stroke_width, stroke_color),
            StrokeKind::Outside,
        );

        let padding = CARD_TEXT_PADDING * zoom;
        let mut text_x = rect.min.x + padding;
        if card.content.is_completable() {
            let side = (rect.height() - 2.0 * padding).clamp(4.0, 24.0 * zoom);
            let check = egui::Rect::from_min_size(
                egui::pos2(text_x, rect.center().y - side / 2.0),
                egui::vec2(side, side),
            );
            painter.rect_stroke(
                check,
                2.0,
                egui::Stroke::new(1.0, egui::Color32::from_gray(30)),
                StrokeKind::Inside,
            );
            if card.content.is_complete() {
                painter.rect_filled(check.shrink(side * 0.2), 1.0, egui::Color32::from_gray(30));
            }
            text_x = check.max.x + padding;
        }

        let font = egui::FontId::proportional((CARD_FONT_SIZE * zoom).clamp(6.0, 48.0));
        let text_rect = egui::Rect::from_min_max(
            egui::pos2(text_x, rect.min.y),
            egui::pos2(rect.max.x - padding, rect.max.y),
        );
        painter.with_clip_rect(text_rect).text(
            egui::pos2(text_x, rect.center().y),
            egui::Align2::LEFT_CENTER,
            card.display_text(),
            font,
            egui::Color32::from_gray(20),
        );
    }
}

/// Fill color per content kind.
fn card_color(content: &CardContent, dark_mode: bool) -> egui::Color32 {
    let base = match content {
        CardContent::Checkbox { .. } | CardContent::Numbered { .. } => {
            egui::Color32::from_rgb(200, 215, 235)
        }
        CardContent::Note { .. } => egui::Color32::from_rgb(240, 225, 150),
        CardContent::Image { .. } => egui::Color32::from_rgb(210, 210, 210),
        CardContent::Sound { .. } => egui::Color32::from_rgb(200, 235, 210),
        CardContent::Timer { .. } => egui::Color32::from_rgb(235, 205, 200),
        CardContent::Subpage { .. } => egui::Color32::from_rgb(215, 200, 235),
    };
    if dark_mode {
        base.gamma_multiply(0.85)
    } else {
        base
    }
}
