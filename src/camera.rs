//! View transform between world space and the screen.

use crate::config::BoardConfig;
use crate::geometry::{Point, Rect};

/// Preset zoom levels reachable by shortcut.
pub const ZOOM_LEVELS: [f32; 6] = [0.25, 0.5, 1.0, 2.0, 4.0, 10.0];

/// Camera looking at a page. `pan` is the world point shown at the center of
/// the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World point at the viewport center
    pub pan: Point,
    /// Screen pixels per world unit
    pub zoom: f32,
    min_zoom: f32,
    max_zoom: f32,
    zoom_step: f32,
}

impl Camera {
    /// A camera at the origin with zoom 1, bounded by `config`.
    pub fn new(config: &BoardConfig) -> Self {
        Self {
            pan: Point::ZERO,
            zoom: 1.0,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            zoom_step: config.zoom_step,
        }
    }

    /// Moves the view by a screen-space delta.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan.x += dx / self.zoom;
        self.pan.y += dy / self.zoom;
    }

    /// Sets the zoom, clamped to the configured bounds.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Zooms in (positive) or out (negative) by whole steps, each relative to
    /// the current zoom.
    pub fn add_zoom(&mut self, steps: f32) {
        self.set_zoom(self.zoom + self.zoom * self.zoom_step * steps);
    }

    /// Places the camera without animation.
    pub fn jump_to(&mut self, pan: Point, zoom: f32) {
        self.pan = pan;
        self.set_zoom(zoom);
    }

    /// Centers the view on the union of `rects`. Does nothing for an empty
    /// slice.
    pub fn focus_on(&mut self, rects: &[Rect]) {
        let Some(first) = rects.first() else {
            return;
        };
        let bounds = rects.iter().skip(1).fold(*first, |acc, r| acc.union(r));
        self.pan = bounds.center();
    }

    /// Recenters on the world origin, keeping the zoom.
    pub fn return_to_origin(&mut self) {
        self.pan = Point::ZERO;
    }

    /// Converts a world point to screen space for a viewport centered at
    /// `screen_center`.
    pub fn world_to_screen(&self, world: Point, screen_center: Point) -> Point {
        Point::new(
            (world.x - self.pan.x) * self.zoom + screen_center.x,
            (world.y - self.pan.y) * self.zoom + screen_center.y,
        )
    }

    /// Inverse of [`Camera::world_to_screen`].
    pub fn screen_to_world(&self, screen: Point, screen_center: Point) -> Point {
        Point::new(
            (screen.x - screen_center.x) / self.zoom + self.pan.x,
            (screen.y - screen_center.y) / self.zoom + self.pan.y,
        )
    }
}
