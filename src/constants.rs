//! Shared constants.
//! Centralizes tweakable values used by canvas rendering, interactions and history.

// Cards
/// Corner radius for card rectangles (in screen pixels).
pub const CARD_CORNER_RADIUS: f32 = 4.0;
/// Base font size for card text before zoom scaling.
pub const CARD_FONT_SIZE: f32 = 14.0;
/// Horizontal padding between a card's edge and its text, in world units.
pub const CARD_TEXT_PADDING: f32 = 6.0;
/// Upper bound for a timer's minutes in the card editor (one week).
pub const MAX_TIMER_MINUTES: u32 = 7 * 24 * 60;

// Grid
/// Minimum on-screen cell size at which grid lines are still drawn.
pub const MIN_VISIBLE_GRID: f32 = 4.0;

// Canvas interactions
/// Pan speed for keyboard panning, in screen pixels per second.
pub const KEY_PAN_SPEED: f32 = 960.0;
/// Screen distance a box selection must travel before a plain release commits it.
pub const BOX_DRAG_THRESHOLD: f32 = 6.0;

// History
/// Maximum number of undo frames kept in memory.
pub const MAX_UNDO_HISTORY: usize = 100;

// Files
/// Number of recently opened project files remembered across sessions.
pub const MAX_RECENT_FILES: usize = 10;
/// File extension used for project files.
pub const PROJECT_EXTENSION: &str = "plan";
