//! Board-wide configuration.
//!
//! A [`BoardConfig`] is built once and handed to every component that needs
//! grid or camera constants, so nothing reads process-wide settings.

use serde::{Deserialize, Serialize};

/// Immutable configuration shared by the grid, pages, camera and project.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Side length of one grid cell in world units.
    pub grid_size: f32,
    /// Number of cells along each axis of a page's spatial grid.
    pub grid_cells: usize,
    /// Lower zoom bound.
    pub min_zoom: f32,
    /// Upper zoom bound.
    pub max_zoom: f32,
    /// Relative zoom change applied per zoom step (0.05 = 5%).
    pub zoom_step: f32,
    /// Default size of a freshly created card, in world units.
    pub card_size: (f32, f32),
    /// Offset applied to pasted cards, in grid cells.
    pub paste_offset: (i32, i32),
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            grid_size: 32.0,
            grid_cells: 1000,
            min_zoom: 0.25,
            max_zoom: 10.0,
            zoom_step: 0.05,
            card_size: (192.0, 32.0),
            paste_offset: (1, 1),
        }
    }
}

impl BoardConfig {
    /// Snaps a single world coordinate down to the grid.
    pub fn lock(&self, value: f32) -> f32 {
        (value / self.grid_size).floor() * self.grid_size
    }

    /// Rounds a single world coordinate to the nearest grid line.
    pub fn round(&self, value: f32) -> f32 {
        (value / self.grid_size).round() * self.grid_size
    }

    /// Rounds a length up to a whole number of cells (at least one).
    pub fn ceil_to_grid(&self, value: f32) -> f32 {
        ((value / self.grid_size).ceil() * self.grid_size).max(self.grid_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BoardConfig::default();
        assert_eq!(config.grid_cells, 1000);
        assert_eq!(config.grid_size, 32.0);
    }

    #[test]
    fn test_grid_snapping() {
        let config = BoardConfig {
            grid_size: 16.0,
            ..Default::default()
        };
        assert_eq!(config.lock(20.0), 16.0);
        assert_eq!(config.lock(-1.0), -16.0);
        assert_eq!(config.round(25.0), 32.0);
        assert_eq!(config.ceil_to_grid(17.0), 32.0);
        assert_eq!(config.ceil_to_grid(0.0), 16.0);
    }

    #[test]
    fn test_config_deserializes_with_missing_fields() {
        let config: BoardConfig = serde_json::from_str(r#"{"grid_size": 8.0}"#).unwrap();
        assert_eq!(config.grid_size, 8.0);
        assert_eq!(config.grid_cells, 1000);
    }
}
