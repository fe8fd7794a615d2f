//! Pages: one board surface holding cards, their spatial grid and the
//! current selection.

use crate::card::{Card, CardContent, CardId, Record};
use crate::config::BoardConfig;
use crate::error::Result;
use crate::geometry::{Point, Rect};
use crate::grid::Grid;
use crate::selection::Selection;
use indexmap::IndexMap;

/// Unique identifier for pages within a project.
pub type PageId = u64;

/// A single board surface.
///
/// Card insertion order doubles as draw order: later cards are drawn on top
/// and win hit tests.
#[derive(Debug)]
pub struct Page {
    /// Unique identifier for this page
    pub id: PageId,
    /// Display name, shown in the breadcrumb
    pub name: String,
    /// The page holding the sub-page card that links here, if any
    pub upward_page: Option<PageId>,
    /// Camera position last used on this page
    pub pan: Point,
    /// Camera zoom last used on this page
    pub zoom: f32,
    /// Cards selected on this page
    pub selection: Selection,
    cards: IndexMap<CardId, Card>,
    grid: Grid,
}

impl Page {
    /// Creates an empty page.
    pub fn new(id: PageId, name: impl Into<String>, config: &BoardConfig) -> Self {
        Self {
            id,
            name: name.into(),
            upward_page: None,
            pan: Point::ZERO,
            zoom: 1.0,
            selection: Selection::new(),
            cards: IndexMap::new(),
            grid: Grid::new(config),
        }
    }

    /// Cards in draw order.
    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    /// Looks up a card on this page.
    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.get(&id)
    }

    /// Mutable access to a card's content. Geometry changes must go through
    /// [`Page::set_rect`] so the grid stays in sync.
    pub fn content_mut(&mut self, id: CardId) -> Option<&mut CardContent> {
        self.cards.get_mut(&id).map(|c| &mut c.content)
    }

    /// Whether the card is on this page.
    pub fn contains(&self, id: CardId) -> bool {
        self.cards.contains_key(&id)
    }

    /// Number of cards on the page.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// True when the page holds no cards.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Cards whose grid cells overlap `view`, in draw order.
    ///
    /// Only the cells under `view` are visited, so the cost follows the size
    /// of the view rather than the number of cards on the page.
    pub fn cards_in_view(&self, view: &Rect) -> Vec<&Card> {
        let mut visible: Vec<(usize, &Card)> = self
            .grid
            .cards_in(view)
            .into_iter()
            .filter_map(|id| self.cards.get_full(&id).map(|(index, _, card)| (index, card)))
            .collect();
        visible.sort_by_key(|(index, _)| *index);
        visible.into_iter().map(|(_, card)| card).collect()
    }

    /// The page's spatial index.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Adds a card on top of the others and places it in the grid. A card
    /// with the same id is replaced in place.
    pub fn insert_card(&mut self, mut card: Card) {
        card.page = self.id;
        self.grid.put(card.id, &card.rect);
        self.cards.insert(card.id, card);
    }

    /// Removes a card from the page, its grid cells and the selection.
    pub fn remove_card(&mut self, id: CardId) -> Option<Card> {
        let card = self.cards.shift_remove(&id)?;
        self.grid.remove(id);
        self.selection.remove(id);
        Some(card)
    }

    /// Moves or resizes a card and re-places it in the grid.
    pub fn set_rect(&mut self, id: CardId, rect: Rect) -> bool {
        let Some(card) = self.cards.get_mut(&id) else {
            return false;
        };
        card.rect = rect;
        self.grid.put(id, &rect);
        true
    }

    /// Overwrites a card's fields from an undo record and re-places it.
    /// Returns false if the card is not on this page.
    pub fn apply_record(&mut self, id: CardId, record: &Record) -> Result<bool> {
        let Some(card) = self.cards.get_mut(&id) else {
            return Ok(false);
        };
        card.apply_record(record)?;
        self.grid.put(id, &card.rect);
        Ok(true)
    }

    /// Snaps a card's position to the nearest grid lines.
    pub fn lock_to_grid(&mut self, id: CardId, config: &BoardConfig) -> bool {
        let Some(rect) = self.card(id).map(|c| c.rect) else {
            return false;
        };
        let snapped = Rect::new(config.round(rect.x), config.round(rect.y), rect.w, rect.h);
        self.set_rect(id, snapped)
    }

    /// Moves a card to the top of the draw order.
    pub fn raise(&mut self, id: CardId) {
        if let Some(index) = self.cards.get_index_of(&id) {
            let last = self.cards.len() - 1;
            self.cards.move_index(index, last);
        }
    }

    /// Topmost card whose rectangle contains `point`.
    pub fn card_at(&self, point: Point) -> Option<CardId> {
        let point_rect = Rect::new(point.x, point.y, 0.0, 0.0);
        let candidates = self.grid.cards_in(&point_rect);
        self.cards
            .values()
            .rev()
            .find(|c| candidates.contains(&c.id) && c.rect.contains(point))
            .map(|c| c.id)
    }

    /// Selects every selectable card on the page.
    pub fn select_all(&mut self) {
        let ids: Vec<CardId> = self
            .cards
            .values()
            .filter(|c| c.content.is_selectable())
            .map(|c| c.id)
            .collect();
        self.selection.replace(ids);
    }

    /// Moves the free corner of an in-progress box selection.
    pub fn update_box_selection(&mut self, current: Point) {
        let cards = &self.cards;
        self.selection.update_box(current, &self.grid, |id, rect| {
            cards
                .get(&id)
                .is_some_and(|c| c.content.is_selectable() && c.rect.intersects(rect))
        });
    }

    /// Recomputes the numbering prefix of every card from its vertical
    /// neighbors.
    ///
    /// A card directly below another continues its count. Indenting by one
    /// or more cells opens a sub-level, outdenting drops back one level per
    /// cell. The first card of a chain starts at 1; lone cards get none.
    pub fn update_numbering(&mut self) {
        let unit = self.grid.unit();
        let mut order: Vec<CardId> = self.cards.keys().copied().collect();
        order.sort_by(|a, b| {
            let (ra, rb) = (self.cards[a].rect, self.cards[b].rect);
            ra.y.total_cmp(&rb.y).then(ra.x.total_cmp(&rb.x))
        });

        for id in order {
            let card = &self.cards[&id];
            if !card.content.can_have_neighbors() {
                self.cards[&id].numbering = None;
                continue;
            }
            let rect = card.rect;
            let above = self.neighbor(id, self.grid.cards_above(id, &rect));
            let numbering = match above {
                Some(above_id) => {
                    let above = &self.cards[&above_id];
                    let mut prefix = above.numbering.clone().unwrap_or_else(|| vec![0]);
                    if above.rect.x < rect.x {
                        prefix.push(0);
                    } else if above.rect.x > rect.x {
                        let levels = ((above.rect.x - rect.x) / unit) as usize;
                        prefix.truncate(prefix.len().saturating_sub(levels).max(1));
                    }
                    if let Some(last) = prefix.last_mut() {
                        *last += 1;
                    }
                    Some(prefix)
                }
                None if self.neighbor(id, self.grid.cards_below(id, &rect)).is_some() => {
                    Some(vec![1])
                }
                None => None,
            };
            self.cards[&id].numbering = numbering;
        }
    }

    /// First candidate that can take part in a numbering chain.
    fn neighbor(&self, id: CardId, candidates: Vec<CardId>) -> Option<CardId> {
        candidates.into_iter().find(|other| {
            *other != id
                && self
                    .cards
                    .get(other)
                    .is_some_and(|c| c.content.can_have_neighbors())
        })
    }
}
