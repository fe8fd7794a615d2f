//! Snapshot-based undo/redo history.
//!
//! Every change to a card is recorded as an [`UndoState`]: the card's full
//! record at that moment. States are grouped into frames, one frame per user
//! action. Undoing a frame restores, for each card in it, the most recent
//! earlier state of that card; a card with no earlier state did not exist yet
//! and is discarded.
//!
//! The log is linear. Any capture flushed after an undo drops every frame
//! past the cursor, even one that turns out to change nothing. The log keeps
//! at most [`MAX_UNDO_HISTORY`] frames; older frames are folded into a base
//! snapshot per card so that undo still finds each card's earlier state.

use crate::card::{CardId, Record};
pub use crate::constants::MAX_UNDO_HISTORY;
use crate::page::PageId;
use std::collections::HashMap;

/// Immutable snapshot of one card at a point in history.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoState {
    /// The card this snapshot belongs to
    pub card: CardId,
    /// The page the card lives on
    pub page: PageId,
    /// The card's serialized fields
    pub record: Record,
    /// Whether the card was deleted at this point
    pub deleted: bool,
}

impl UndoState {
    /// Snapshot of a live card.
    pub fn new(card: CardId, page: PageId, record: Record) -> Self {
        Self {
            card,
            page,
            record,
            deleted: false,
        }
    }

    /// Snapshot marking a card as deleted. The record is kept so the card can
    /// be brought back.
    pub fn deleted(card: CardId, page: PageId, record: Record) -> Self {
        Self {
            card,
            page,
            record,
            deleted: true,
        }
    }

    fn same_content(&self, other: &UndoState) -> bool {
        self.deleted == other.deleted && self.page == other.page && self.record == other.record
    }
}

/// Anything undo/redo can write snapshots back into.
pub trait UndoTarget {
    /// Makes the live card match `state`, creating or deleting it as needed.
    fn restore(&mut self, state: &UndoState);

    /// Removes a card that had not been created yet at the restored point.
    fn discard(&mut self, page: PageId, card: CardId);
}

/// What the history is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    /// Nothing in progress
    Idle,
    /// A batch is open and collecting captures
    Recording,
    /// Restoring an earlier frame
    Undoing,
    /// Re-applying a later frame
    Redoing,
}

/// Linear undo/redo log of card snapshots.
#[derive(Debug, Clone)]
pub struct UndoHistory {
    frames: Vec<Vec<UndoState>>,
    cursor: usize,
    pending: Vec<UndoState>,
    batch_depth: usize,
    minimum_frame: usize,
    on: bool,
    state: HistoryState,
    /// Latest state of each card from frames trimmed off the front
    base: HashMap<CardId, UndoState>,
    limit: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoHistory {
    /// Creates an empty history that records captures and keeps up to
    /// [`MAX_UNDO_HISTORY`] frames.
    pub fn new() -> Self {
        Self::with_limit(MAX_UNDO_HISTORY)
    }

    /// Creates an empty history keeping at most `limit` frames (at least one).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            frames: Vec::new(),
            cursor: 0,
            pending: Vec::new(),
            batch_depth: 0,
            minimum_frame: 0,
            on: true,
            state: HistoryState::Idle,
            base: HashMap::new(),
            limit: limit.max(1),
        }
    }

    /// Maximum number of frames kept.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Enables or suppresses capturing. Used while loading a project so that
    /// deserialization does not pollute the log.
    pub fn set_on(&mut self, on: bool) {
        self.on = on;
    }

    /// Whether captures are currently recorded.
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Current activity.
    pub fn state(&self) -> HistoryState {
        self.state
    }

    /// Number of frames currently applied.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Total number of frames in the log, including undone ones.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when the log holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The states committed in frame `index`.
    pub fn frame(&self, index: usize) -> Option<&[UndoState]> {
        self.frames.get(index).map(Vec::as_slice)
    }

    /// The earliest cursor position undo may return to.
    pub fn minimum_frame(&self) -> usize {
        self.minimum_frame
    }

    /// Sets the undo floor explicitly.
    pub fn set_minimum_frame(&mut self, frame: usize) {
        self.minimum_frame = frame;
    }

    /// Fixes the undo floor at the current cursor, so that everything done so
    /// far (typically loading a project) can no longer be undone.
    pub fn mark_loaded(&mut self) {
        self.flush();
        self.minimum_frame = self.cursor;
    }

    /// Whether `undo` would do anything.
    pub fn can_undo(&self) -> bool {
        self.cursor > self.minimum_frame
    }

    /// Whether `redo` would do anything.
    pub fn can_redo(&self) -> bool {
        self.cursor < self.frames.len()
    }

    /// Records a snapshot.
    ///
    /// Inside a batch the state joins the pending frame, replacing any earlier
    /// pending state of the same card. Outside a batch it is committed as its
    /// own frame immediately.
    pub fn capture(&mut self, state: UndoState) {
        if !self.on || matches!(self.state, HistoryState::Undoing | HistoryState::Redoing) {
            return;
        }
        match self.pending.iter_mut().find(|s| s.card == state.card) {
            Some(existing) => *existing = state,
            None => self.pending.push(state),
        }
        if self.batch_depth == 0 {
            self.flush();
        }
    }

    /// Opens a batch. Batches nest; only the outermost `end_batch` commits.
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
        self.state = HistoryState::Recording;
    }

    /// Closes a batch, committing its captures as a single frame when it was
    /// the outermost one.
    pub fn end_batch(&mut self) {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth == 0 {
            self.flush();
        }
    }

    /// Per-frame flush: closes any batch left open and commits its captures.
    pub fn update(&mut self) {
        self.batch_depth = 0;
        self.flush();
    }

    /// Steps back one frame. Returns false, changing nothing, at the floor.
    pub fn undo(&mut self, target: &mut impl UndoTarget) -> bool {
        self.update();
        if !self.can_undo() {
            return false;
        }
        self.state = HistoryState::Undoing;
        let undone = self.cursor - 1;
        for state in &self.frames[undone] {
            match self.latest_before(undone, state.card) {
                Some(previous) => target.restore(previous),
                None => target.discard(state.page, state.card),
            }
        }
        self.cursor = undone;
        self.state = HistoryState::Idle;
        log::debug!("undo to frame {} of {}", self.cursor, self.frames.len());
        true
    }

    /// Re-applies the next frame. Returns false, changing nothing, at the end
    /// of the log.
    pub fn redo(&mut self, target: &mut impl UndoTarget) -> bool {
        self.update();
        if !self.can_redo() {
            return false;
        }
        self.state = HistoryState::Redoing;
        for state in &self.frames[self.cursor] {
            target.restore(state);
        }
        self.cursor += 1;
        self.state = HistoryState::Idle;
        log::debug!("redo to frame {} of {}", self.cursor, self.frames.len());
        true
    }

    /// Drops every frame and resets the floor.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.pending.clear();
        self.base.clear();
        self.cursor = 0;
        self.batch_depth = 0;
        self.minimum_frame = 0;
        self.state = HistoryState::Idle;
    }

    fn flush(&mut self) {
        self.state = if self.batch_depth > 0 {
            HistoryState::Recording
        } else {
            HistoryState::Idle
        };
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        if self.cursor < self.frames.len() {
            log::debug!(
                "dropping {} undone frame(s)",
                self.frames.len() - self.cursor
            );
            self.frames.truncate(self.cursor);
        }
        let changed: Vec<UndoState> = pending
            .into_iter()
            .filter(|state| {
                self.latest_before(self.cursor, state.card)
                    .map_or(true, |previous| !previous.same_content(state))
            })
            .collect();
        if changed.is_empty() {
            return;
        }
        self.frames.push(changed);
        self.cursor = self.frames.len();
        self.trim();
    }

    /// Folds the oldest frames into `base` until the log fits its limit.
    fn trim(&mut self) {
        while self.frames.len() > self.limit {
            let oldest = self.frames.remove(0);
            for state in oldest {
                self.base.insert(state.card, state);
            }
            self.cursor = self.cursor.saturating_sub(1);
            self.minimum_frame = self.minimum_frame.saturating_sub(1);
        }
    }

    /// The newest state of `card` in frames `[0, end)`, falling back to the
    /// trimmed base.
    fn latest_before(&self, end: usize, card: CardId) -> Option<&UndoState> {
        self.frames[..end]
            .iter()
            .rev()
            .find_map(|frame| frame.iter().find(|s| s.card == card))
            .or_else(|| self.base.get(&card))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Minimal live store: card id -> (value, deleted).
    #[derive(Default)]
    struct Store {
        cards: HashMap<CardId, i64>,
    }

    impl UndoTarget for Store {
        fn restore(&mut self, state: &UndoState) {
            if state.deleted {
                self.cards.remove(&state.card);
            } else {
                let value = state.record["value"].as_i64().unwrap_or_default();
                self.cards.insert(state.card, value);
            }
        }

        fn discard(&mut self, _page: PageId, card: CardId) {
            self.cards.remove(&card);
        }
    }

    fn snap(card: CardId, value: i64) -> UndoState {
        let mut record = Record::new();
        record.insert("value".into(), serde_json::json!(value));
        UndoState::new(card, 0, record)
    }

    fn values(history: &UndoHistory) -> Vec<Vec<i64>> {
        (0..history.len())
            .map(|i| {
                history
                    .frame(i)
                    .unwrap()
                    .iter()
                    .map(|s| s.record["value"].as_i64().unwrap())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_capture_undo_redo_round_trip() {
        let mut store = Store::default();
        let mut history = UndoHistory::new();

        store.cards.insert(1, 10);
        history.capture(snap(1, 10));
        store.cards.insert(1, 20);
        history.capture(snap(1, 20));

        assert!(history.undo(&mut store));
        assert_eq!(store.cards[&1], 10);
        assert!(history.redo(&mut store));
        assert_eq!(store.cards[&1], 20);
    }

    #[test]
    fn test_undo_of_first_state_discards_card() {
        let mut store = Store::default();
        let mut history = UndoHistory::new();
        store.cards.insert(1, 5);
        history.capture(snap(1, 5));

        assert!(history.undo(&mut store));
        assert!(store.cards.is_empty());
        assert!(history.redo(&mut store));
        assert_eq!(store.cards[&1], 5);
    }

    #[test]
    fn test_undo_at_minimum_frame_is_noop() {
        let mut store = Store::default();
        let mut history = UndoHistory::new();
        history.capture(snap(1, 1));
        history.mark_loaded();
        assert_eq!(history.minimum_frame(), 1);

        assert!(!history.undo(&mut store));
        assert_eq!(history.cursor(), 1);
        assert_eq!(history.len(), 1);
        assert!(store.cards.is_empty(), "target untouched");
    }

    #[test]
    fn test_redo_at_end_is_noop() {
        let mut store = Store::default();
        let mut history = UndoHistory::new();
        history.capture(snap(1, 1));
        assert!(!history.redo(&mut store));
        assert_eq!(history.cursor(), 1);
    }

    #[test]
    fn test_new_capture_after_undo_truncates_future() {
        let mut store = Store::default();
        let mut history = UndoHistory::new();
        history.capture(snap(1, 1));
        history.capture(snap(1, 2));
        history.undo(&mut store);
        history.capture(snap(1, 3));

        assert_eq!(values(&history), vec![vec![1], vec![3]]);
        assert!(!history.redo(&mut store));
        history.undo(&mut store);
        assert_eq!(store.cards[&1], 1);
    }

    #[test]
    fn test_capture_matching_earlier_state_after_undo_still_drops_redo() {
        let mut store = Store::default();
        let mut history = UndoHistory::new();
        store.cards.insert(1, 1);
        history.capture(snap(1, 1));
        store.cards.insert(1, 2);
        history.capture(snap(1, 2));
        assert!(history.undo(&mut store));

        history.capture(snap(1, 1));

        assert_eq!(values(&history), vec![vec![1]]);
        assert_eq!(history.cursor(), 1);
        assert!(!history.can_redo());
        assert!(!history.redo(&mut store));
        assert_eq!(store.cards[&1], 1);
    }

    #[test]
    fn test_oldest_frames_are_trimmed_past_limit() {
        let mut store = Store::default();
        let mut history = UndoHistory::with_limit(3);
        for value in 0..4 {
            store.cards.insert(1, value);
            history.capture(snap(1, value));
        }
        store.cards.insert(2, 9);
        history.capture(snap(2, 9));

        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), 3);
        assert_eq!(values(&history), vec![vec![2], vec![3], vec![9]]);

        assert!(history.undo(&mut store));
        assert!(!store.cards.contains_key(&2));
        assert!(history.undo(&mut store));
        assert_eq!(store.cards[&1], 2);
        assert!(history.undo(&mut store));
        assert_eq!(store.cards[&1], 1, "restored from the trimmed base");
        assert!(!history.undo(&mut store));
    }

    #[test]
    fn test_trimming_lowers_minimum_frame() {
        let mut history = UndoHistory::with_limit(2);
        history.capture(snap(1, 0));
        history.mark_loaded();
        history.capture(snap(1, 1));
        history.capture(snap(1, 2));

        assert_eq!(history.len(), 2);
        assert_eq!(history.minimum_frame(), 0);
        assert!(history.can_undo());
    }

    #[test]
    fn test_batch_collapses_into_one_frame() {
        let mut store = Store::default();
        let mut history = UndoHistory::new();
        history.capture(snap(1, 0));
        history.capture(snap(2, 0));

        history.begin_batch();
        assert_eq!(history.state(), HistoryState::Recording);
        history.capture(snap(1, 1));
        history.capture(snap(1, 2));
        history.begin_batch();
        history.capture(snap(2, 7));
        history.end_batch();
        assert_eq!(history.len(), 2, "inner end_batch does not commit");
        history.end_batch();

        assert_eq!(history.state(), HistoryState::Idle);
        assert_eq!(values(&history), vec![vec![0], vec![0], vec![2, 7]]);

        store.cards.insert(1, 2);
        store.cards.insert(2, 7);
        history.undo(&mut store);
        assert_eq!(store.cards[&1], 0);
        assert_eq!(store.cards[&2], 0);
    }

    #[test]
    fn test_update_flushes_open_batch() {
        let mut history = UndoHistory::new();
        history.begin_batch();
        history.capture(snap(1, 1));
        assert_eq!(history.len(), 0);
        history.update();
        assert_eq!(history.len(), 1);
        assert_eq!(history.state(), HistoryState::Idle);
    }

    #[test]
    fn test_unchanged_capture_is_dropped() {
        let mut history = UndoHistory::new();
        history.capture(snap(1, 1));
        history.capture(snap(1, 1));
        history.begin_batch();
        history.end_batch();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_off_suppresses_capture() {
        let mut history = UndoHistory::new();
        history.set_on(false);
        history.capture(snap(1, 1));
        assert!(history.is_empty());
        history.set_on(true);
        history.capture(snap(1, 1));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_deleted_state_round_trip() {
        let mut store = Store::default();
        let mut history = UndoHistory::new();
        store.cards.insert(1, 4);
        history.capture(snap(1, 4));
        let gone = snap(1, 4);
        store.cards.remove(&1);
        history.capture(UndoState::deleted(1, 0, gone.record));

        assert!(history.undo(&mut store));
        assert_eq!(store.cards[&1], 4);
        assert!(history.redo(&mut store));
        assert!(!store.cards.contains_key(&1));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut history = UndoHistory::new();
        history.capture(snap(1, 1));
        history.mark_loaded();
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.cursor(), 0);
        assert_eq!(history.minimum_frame(), 0);
        assert!(!history.can_undo());
    }
}
