//! Uniform-bucket spatial index for cards on a page.
//!
//! The grid is a dense array of [`GridCell`]s addressed by integer cell
//! coordinates whose origin sits at the middle of the array, so negative world
//! positions map to valid indices. Cards are referenced by [`CardId`] only; the
//! grid remembers the [`CellRange`] each card was last added to so that it can
//! be removed again without consulting the card.

use crate::card::CardId;
use crate::config::BoardConfig;
use crate::geometry::Rect;
use std::collections::{HashMap, HashSet};

/// A half-open rectangle of cell coordinates, `[start, end)` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    /// Inclusive top-left cell.
    pub start: (i32, i32),
    /// Exclusive bottom-right cell.
    pub end: (i32, i32),
}

impl CellRange {
    /// Creates a range from inclusive start and exclusive end cell coordinates.
    pub fn new(start: (i32, i32), end: (i32, i32)) -> Self {
        Self { start, end }
    }

    /// Width of the range in cells.
    pub fn width(&self) -> i32 {
        (self.end.0 - self.start.0).max(0)
    }

    /// Height of the range in cells.
    pub fn height(&self) -> i32 {
        (self.end.1 - self.start.1).max(0)
    }

    /// True when the range covers no cells.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// True when the cell `(x, y)` lies inside the range.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.start.0 && x < self.end.0 && y >= self.start.1 && y < self.end.1
    }
}

/// One bucket of the grid: the cards overlapping a single cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridCell {
    cards: Vec<CardId>,
}

impl GridCell {
    /// True if the card is present in this cell.
    pub fn contains(&self, card: CardId) -> bool {
        self.cards.contains(&card)
    }

    /// Adds a card; adding a card already present is ignored.
    pub fn add(&mut self, card: CardId) {
        if !self.contains(card) {
            self.cards.push(card);
        }
    }

    /// Removes a card if present.
    pub fn remove(&mut self, card: CardId) {
        if let Some(pos) = self.cards.iter().position(|c| *c == card) {
            self.cards.remove(pos);
        }
    }

    /// Cards in this cell in insertion order.
    pub fn cards(&self) -> &[CardId] {
        &self.cards
    }

    /// True when no card overlaps this cell.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// A rectangular range of cells tied to the grid it was computed from.
///
/// A selection without a grid is invalid; asking it for cells is a sequencing
/// bug in the caller and panics.
#[derive(Debug, Clone, Copy)]
pub struct GridSelection<'g> {
    range: CellRange,
    grid: Option<&'g Grid>,
}

impl<'g> GridSelection<'g> {
    /// Creates a selection over `range` backed by `grid`.
    pub fn new(range: CellRange, grid: &'g Grid) -> Self {
        Self {
            range,
            grid: Some(grid),
        }
    }

    /// Creates a selection that is not backed by any grid.
    pub fn detached(range: CellRange) -> Self {
        Self { range, grid: None }
    }

    /// True while the selection is backed by a grid.
    pub fn is_valid(&self) -> bool {
        self.grid.is_some()
    }

    /// The cell range covered by this selection.
    pub fn range(&self) -> CellRange {
        self.range
    }

    /// Every cell in the range, row-major (y outer, x inner).
    ///
    /// # Panics
    ///
    /// Panics if the selection is not backed by a grid.
    pub fn cells(&self) -> Vec<&'g GridCell> {
        let Some(grid) = self.grid else {
            panic!("cells() called on a GridSelection with no grid");
        };
        grid.cell_indices(self.range)
            .into_iter()
            .map(|index| &grid.cells[index])
            .collect()
    }

    /// Distinct cards found in the selection's cells, in first-seen order.
    pub fn cards(&self) -> Vec<CardId> {
        let mut seen = HashSet::new();
        let mut cards = Vec::new();
        for cell in self.cells() {
            for card in cell.cards() {
                if seen.insert(*card) {
                    cards.push(*card);
                }
            }
        }
        cards
    }
}

/// Dense spatial index mapping grid cells to the cards overlapping them.
#[derive(Debug, Clone)]
pub struct Grid {
    unit: f32,
    width: usize,
    height: usize,
    cells: Vec<GridCell>,
    extents: HashMap<CardId, CellRange>,
}

impl Grid {
    /// Creates a grid sized and scaled according to `config`.
    pub fn new(config: &BoardConfig) -> Self {
        let mut grid = Self {
            unit: config.grid_size,
            width: 0,
            height: 0,
            cells: Vec::new(),
            extents: HashMap::new(),
        };
        grid.resize(config.grid_cells, config.grid_cells);
        grid
    }

    /// Reinitializes the cell array. All placements are dropped and must be
    /// re-inserted by the caller.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.cells = vec![GridCell::default(); width * height];
        self.extents.clear();
    }

    /// World size of one cell.
    pub fn unit(&self) -> f32 {
        self.unit
    }

    /// Array dimensions as `(width, height)` in cells.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Number of cards currently placed in the grid.
    pub fn card_count(&self) -> usize {
        self.extents.len()
    }

    /// The range a card was last added to, if it is placed.
    pub fn extents(&self, card: CardId) -> Option<CellRange> {
        self.extents.get(&card).copied()
    }

    /// Translates a world rectangle into the cell range covering it.
    ///
    /// Both corners are floor-divided by the cell size; the far edge rounds up
    /// so a rectangle always covers at least one cell on each axis.
    pub fn range_for(&self, rect: &Rect) -> CellRange {
        // The start stays below i32::MAX so the range is never empty.
        let sx = ((rect.x / self.unit).floor() as i32).min(i32::MAX - 1);
        let sy = ((rect.y / self.unit).floor() as i32).min(i32::MAX - 1);
        let ex = ((rect.right() / self.unit).ceil() as i32).max(sx.saturating_add(1));
        let ey = ((rect.bottom() / self.unit).ceil() as i32).max(sy.saturating_add(1));
        CellRange::new((sx, sy), (ex, ey))
    }

    /// Selection covering the cells under `rect`.
    pub fn select(&self, rect: &Rect) -> GridSelection<'_> {
        GridSelection::new(self.range_for(rect), self)
    }

    /// Places a card, first clearing it from wherever it was before.
    pub fn put(&mut self, card: CardId, rect: &Rect) -> CellRange {
        self.remove(card);
        let range = self.range_for(rect);
        self.add_to(range, card);
        self.extents.insert(card, range);
        range
    }

    /// Clears a card from its last recorded extents. Unknown cards are ignored.
    pub fn remove(&mut self, card: CardId) {
        if let Some(range) = self.extents.remove(&card) {
            self.remove_from(range, card);
        }
    }

    /// Adds `card` to every cell in `range`.
    pub fn add_to(&mut self, range: CellRange, card: CardId) {
        for index in self.cell_indices(range) {
            self.cells[index].add(card);
        }
    }

    /// Removes `card` from every cell in `range`.
    pub fn remove_from(&mut self, range: CellRange, card: CardId) {
        for index in self.cell_indices(range) {
            self.cells[index].remove(card);
        }
    }

    /// The cell at world cell coordinate `(x, y)`, if it lies inside the array.
    pub fn cell(&self, x: i32, y: i32) -> Option<&GridCell> {
        let ix = x + (self.width / 2) as i32;
        let iy = y + (self.height / 2) as i32;
        if ix < 0 || iy < 0 || ix as usize >= self.width || iy as usize >= self.height {
            return None;
        }
        self.cells.get(iy as usize * self.width + ix as usize)
    }

    /// Distinct cards overlapping the cells under `rect`.
    pub fn cards_in(&self, rect: &Rect) -> Vec<CardId> {
        self.select(rect).cards()
    }

    /// Cards in the one-cell strip directly above `rect`, excluding `card`.
    pub fn cards_above(&self, card: CardId, rect: &Rect) -> Vec<CardId> {
        let strip = Rect::new(rect.x, rect.y - self.unit, rect.w, self.unit);
        self.neighbors_in(card, &strip)
    }

    /// Cards in the one-cell strip directly below `rect`, excluding `card`.
    pub fn cards_below(&self, card: CardId, rect: &Rect) -> Vec<CardId> {
        let strip = Rect::new(rect.x, rect.bottom(), rect.w, self.unit);
        self.neighbors_in(card, &strip)
    }

    fn neighbors_in(&self, card: CardId, strip: &Rect) -> Vec<CardId> {
        self.select(strip)
            .cards()
            .into_iter()
            .filter(|c| *c != card)
            .collect()
    }

    /// Array indices for `range`, row-major.
    ///
    /// Ranges reaching past the array edge saturate onto the border cells
    /// instead of indexing out of bounds.
    fn cell_indices(&self, range: CellRange) -> Vec<usize> {
        if self.width == 0 || self.height == 0 || range.is_empty() {
            return Vec::new();
        }
        let (x0, x1) = Self::clamp_axis(range.start.0, range.end.0, self.width);
        let (y0, y1) = Self::clamp_axis(range.start.1, range.end.1, self.height);
        if (x0, x1, y0, y1) != Self::unclamped(range, self.width, self.height) {
            log::debug!("cell range {:?} clamped to grid bounds", range);
        }
        let mut indices = Vec::with_capacity((x1 - x0) * (y1 - y0));
        for y in y0..y1 {
            for x in x0..x1 {
                indices.push(y * self.width + x);
            }
        }
        indices
    }

    fn clamp_axis(start: i32, end: i32, len: usize) -> (usize, usize) {
        let offset = (len / 2) as i64;
        let last = len as i64 - 1;
        let lo = (start as i64 + offset).clamp(0, last);
        let hi = (end as i64 + offset).clamp(lo + 1, len as i64);
        (lo as usize, hi as usize)
    }

    fn unclamped(range: CellRange, width: usize, height: usize) -> (usize, usize, usize, usize) {
        let ox = (width / 2) as i64;
        let oy = (height / 2) as i64;
        let to_usize = |v: i64| v.max(0) as usize;
        (
            to_usize(range.start.0 as i64 + ox),
            to_usize(range.end.0 as i64 + ox),
            to_usize(range.start.1 as i64 + oy),
            to_usize(range.end.1 as i64 + oy),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_grid(unit: f32) -> Grid {
        Grid::new(&BoardConfig {
            grid_size: unit,
            grid_cells: 64,
            ..Default::default()
        })
    }

    fn occupied_cells(grid: &Grid, card: CardId) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        for y in -32..32 {
            for x in -32..32 {
                if grid.cell(x, y).is_some_and(|c| c.contains(card)) {
                    out.push((x, y));
                }
            }
        }
        out
    }

    #[test]
    fn test_new_grid_uses_configured_size() {
        let grid = Grid::new(&BoardConfig::default());
        assert_eq!(grid.dimensions(), (1000, 1000));
        assert_eq!(grid.card_count(), 0);
    }

    #[test]
    fn test_select_small_rect_maps_to_single_cell() {
        let grid = small_grid(16.0);
        let selection = grid.select(&Rect::new(20.0, 20.0, 10.0, 10.0));
        assert_eq!(selection.range(), CellRange::new((1, 1), (2, 2)));
        assert_eq!(selection.cells().len(), 1);
    }

    #[test]
    fn test_aligned_rect_covers_exactly_its_cells() {
        let grid = small_grid(16.0);
        let range = grid.range_for(&Rect::new(0.0, 32.0, 32.0, 16.0));
        assert_eq!(range, CellRange::new((0, 2), (2, 3)));
    }

    #[test]
    fn test_negative_coordinates_map_inside_array() {
        let mut grid = small_grid(16.0);
        grid.put(1, &Rect::new(-40.0, -8.0, 16.0, 16.0));
        assert_eq!(occupied_cells(&grid, 1), vec![(-3, -1), (-2, -1), (-3, 0), (-2, 0)]);
    }

    #[test]
    fn test_put_moves_card_between_cells() {
        let mut grid = small_grid(16.0);
        grid.put(7, &Rect::new(0.0, 0.0, 32.0, 16.0));
        assert_eq!(occupied_cells(&grid, 7), vec![(0, 0), (1, 0)]);

        grid.put(7, &Rect::new(16.0, 32.0, 16.0, 32.0));
        assert_eq!(occupied_cells(&grid, 7), vec![(1, 2), (1, 3)]);
        assert!(!grid.cell(0, 0).unwrap().contains(7));
        assert_eq!(grid.extents(7), Some(CellRange::new((1, 2), (2, 4))));
    }

    #[test]
    fn test_put_is_idempotent() {
        let mut grid = small_grid(16.0);
        let rect = Rect::new(8.0, 8.0, 40.0, 20.0);
        grid.put(3, &rect);
        let before = grid.cells.clone();
        grid.put(3, &rect);
        assert_eq!(grid.cells, before);
        assert_eq!(grid.card_count(), 1);
    }

    #[test]
    fn test_remove_absent_card_is_noop() {
        let mut grid = small_grid(16.0);
        grid.put(1, &Rect::new(0.0, 0.0, 16.0, 16.0));
        grid.remove(2);
        assert!(grid.cell(0, 0).unwrap().contains(1));
        grid.remove(1);
        grid.remove(1);
        assert!(grid.cell(0, 0).unwrap().is_empty());
        assert_eq!(grid.extents(1), None);
    }

    #[test]
    fn test_selection_cards_are_deduplicated_in_first_seen_order() {
        let mut grid = small_grid(16.0);
        grid.put(10, &Rect::new(0.0, 0.0, 48.0, 48.0));
        grid.put(20, &Rect::new(16.0, 0.0, 16.0, 16.0));
        grid.put(30, &Rect::new(0.0, 32.0, 16.0, 16.0));
        let cards = grid.cards_in(&Rect::new(0.0, 0.0, 48.0, 48.0));
        assert_eq!(cards, vec![10, 20, 30]);
    }

    #[test]
    fn test_cards_above_queries_strip_directly_above() {
        let mut grid = small_grid(16.0);
        let card = Rect::new(0.0, 32.0, 16.0, 16.0);
        grid.put(1, &card);
        grid.put(2, &Rect::new(0.0, 16.0, 16.0, 16.0));
        grid.put(3, &Rect::new(0.0, 0.0, 16.0, 16.0));
        grid.put(4, &Rect::new(16.0, 32.0, 16.0, 16.0));
        assert_eq!(grid.cards_above(1, &card), vec![2]);
        assert!(grid.cards_below(1, &card).is_empty());
        assert_eq!(grid.cards_below(2, &Rect::new(0.0, 16.0, 16.0, 16.0)), vec![1]);
    }

    #[test]
    fn test_out_of_range_rect_saturates_onto_border() {
        let mut grid = small_grid(16.0);
        grid.put(5, &Rect::new(10_000.0, 0.0, 16.0, 16.0));
        assert!(grid.cell(31, 0).unwrap().contains(5));
        grid.remove(5);
        assert!(grid.cell(31, 0).unwrap().is_empty());
    }

    #[test]
    fn test_far_away_rect_lands_on_the_last_cell() {
        let mut grid = small_grid(16.0);
        let far = Rect::new(1.0e12, 1.0e12, 32.0, 32.0);
        grid.put(7, &far);
        assert!(grid.cell(31, 31).unwrap().contains(7));
        assert_eq!(grid.cards_in(&far), vec![7]);
    }

    #[test]
    fn test_resize_drops_placements() {
        let mut grid = small_grid(16.0);
        grid.put(1, &Rect::new(0.0, 0.0, 16.0, 16.0));
        grid.resize(8, 8);
        assert_eq!(grid.card_count(), 0);
        assert!(grid.cell(0, 0).unwrap().is_empty());
        assert!(grid.cell(4, 0).is_none());
    }

    #[test]
    fn test_broadcast_add_and_remove() {
        let mut grid = small_grid(16.0);
        let range = CellRange::new((0, 0), (2, 2));
        grid.add_to(range, 9);
        grid.add_to(range, 9);
        assert_eq!(grid.cell(1, 1).unwrap().cards(), &[9]);
        grid.remove_from(range, 9);
        assert!(grid.cell(1, 1).unwrap().is_empty());
    }

    #[test]
    #[should_panic(expected = "no grid")]
    fn test_detached_selection_panics_on_cells() {
        let selection = GridSelection::detached(CellRange::new((0, 0), (1, 1)));
        assert!(!selection.is_valid());
        let _ = selection.cells();
    }
}
