//! Multi-card selection with box (marquee) selection support.

use crate::card::CardId;
use crate::geometry::{Point, Rect};
use crate::grid::Grid;
use std::fmt;

/// Callback invoked with the new contents whenever the selection changes.
pub type SelectionObserver = Box<dyn FnMut(&[CardId])>;

#[derive(Debug, Clone)]
struct BoxSelect {
    origin: Point,
    current: Point,
    additive: bool,
    before: Vec<CardId>,
}

/// The set of currently selected cards on a page.
///
/// Contents are kept in insertion order so iteration is deterministic.
#[derive(Default)]
pub struct Selection {
    cards: Vec<CardId>,
    box_select: Option<BoxSelect>,
    observer: Option<SelectionObserver>,
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("cards", &self.cards)
            .field("box_select", &self.box_select)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Selection {
    /// Creates an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the callback notified after each change.
    pub fn set_observer(&mut self, observer: SelectionObserver) {
        self.observer = Some(observer);
    }

    /// Whether a change callback is registered.
    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    /// Adds a card. Returns false if it was already selected.
    pub fn add(&mut self, card: CardId) -> bool {
        if self.cards.contains(&card) {
            return false;
        }
        self.cards.push(card);
        self.notify();
        true
    }

    /// Removes a card. Returns false if it was not selected.
    pub fn remove(&mut self, card: CardId) -> bool {
        let Some(pos) = self.cards.iter().position(|c| *c == card) else {
            return false;
        };
        self.cards.remove(pos);
        self.notify();
        true
    }

    /// Adds the card if absent, removes it otherwise.
    pub fn toggle(&mut self, card: CardId) {
        if !self.remove(card) {
            self.add(card);
        }
    }

    /// Deselects everything.
    pub fn clear(&mut self) {
        self.replace(Vec::new());
    }

    /// Replaces the whole selection, dropping duplicates.
    pub fn replace(&mut self, cards: impl IntoIterator<Item = CardId>) {
        let mut next: Vec<CardId> = Vec::new();
        for card in cards {
            if !next.contains(&card) {
                next.push(card);
            }
        }
        if next != self.cards {
            self.cards = next;
            self.notify();
        }
    }

    /// Keeps only the cards for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(CardId) -> bool) {
        let next: Vec<CardId> = self.cards.iter().copied().filter(|c| keep(*c)).collect();
        self.replace(next);
    }

    /// True if the card is selected.
    pub fn contains(&self, card: CardId) -> bool {
        self.cards.contains(&card)
    }

    /// Selected cards in the order they were selected.
    pub fn as_slice(&self) -> &[CardId] {
        &self.cards
    }

    /// Number of selected cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// True when nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Starts a box selection at `origin` (world space). With `additive`, the
    /// cards under the box are added to the current selection instead of
    /// replacing it.
    pub fn begin_box(&mut self, origin: Point, additive: bool) {
        self.box_select = Some(BoxSelect {
            origin,
            current: origin,
            additive,
            before: self.cards.clone(),
        });
    }

    /// Moves the free corner of the box and recomputes the selection from the
    /// cards the grid reports under it. Cards rejected by `selectable`, which
    /// also receives the box rectangle, are skipped.
    pub fn update_box(
        &mut self,
        current: Point,
        grid: &Grid,
        mut selectable: impl FnMut(CardId, &Rect) -> bool,
    ) {
        let Some(state) = self.box_select.as_mut() else {
            return;
        };
        state.current = current;
        let rect = Rect::from_corners(state.origin, state.current);
        let base = if state.additive {
            state.before.clone()
        } else {
            Vec::new()
        };
        let hits = grid
            .cards_in(&rect)
            .into_iter()
            .filter(|card| selectable(*card, &rect));
        self.replace(base.into_iter().chain(hits));
    }

    /// Ends the box selection, keeping its result.
    pub fn finish_box(&mut self) {
        self.box_select = None;
    }

    /// Aborts the box selection and restores the selection from before it began.
    pub fn cancel_box(&mut self) {
        if let Some(state) = self.box_select.take() {
            self.replace(state.before);
        }
    }

    /// True while a box selection is in progress.
    pub fn is_box_selecting(&self) -> bool {
        self.box_select.is_some()
    }

    /// The current box in world space, if a box selection is in progress.
    pub fn box_rect(&self) -> Option<Rect> {
        self.box_select
            .as_ref()
            .map(|s| Rect::from_corners(s.origin, s.current))
    }

    fn notify(&mut self) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&self.cards);
        }
    }
}
