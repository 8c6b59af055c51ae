//! Undo/redo history of formatted-text snapshots.
//!
//! Every state carries the caret offset so content and caret are restored
//! together. Saves are gated by [`are_formatted_texts_equal`]: a snapshot
//! that does not change the message is dropped.

use std::collections::VecDeque;

use web_time::{Duration, Instant};

use crate::config::EditorConfig;
use crate::debounce::Debounced;
use crate::entity::{FormattedText, are_formatted_texts_equal};

/// A history snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryState {
    /// Caret offset in caret units, if the editor had a caret.
    pub caret_offset: Option<usize>,
    pub formatted_text: FormattedText,
}

impl HistoryState {
    pub fn new(formatted_text: FormattedText, caret_offset: Option<usize>) -> Self {
        Self {
            caret_offset,
            formatted_text,
        }
    }
}

/// Bounded undo/redo stacks around a current state.
///
/// `save_state` commits immediately and is meant for discrete actions.
/// `save_state_debounced` holds the snapshot until a quiet period has passed
/// with no further debounced saves; the owner drives it with [`flush_due`].
///
/// [`flush_due`]: HistoryManager::flush_due
#[derive(Debug, Clone)]
pub struct HistoryManager {
    undo_stack: VecDeque<HistoryState>,
    redo_stack: Vec<HistoryState>,
    current: Option<HistoryState>,
    pending: Debounced<HistoryState>,
    max_depth: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

impl HistoryManager {
    pub fn new(max_depth: usize, debounce: Duration) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            current: None,
            pending: Debounced::new(debounce),
            max_depth,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.history_max_depth, config.history_debounce)
    }

    pub fn current(&self) -> Option<&HistoryState> {
        self.current.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Commit a state now. Cancels any pending debounced save.
    ///
    /// Returns `false` when the state equals the current one and nothing was
    /// recorded.
    pub fn save_state(&mut self, state: HistoryState) -> bool {
        self.pending.cancel();
        self.commit(state)
    }

    /// Schedule a save after the quiet period, replacing any pending one.
    pub fn save_state_debounced(&mut self, state: HistoryState, now: Instant) {
        tracing::trace!(target: "composer::history", "debounced save scheduled");
        self.pending.schedule(now, state);
    }

    /// Commit the pending debounced state if its quiet period is over.
    pub fn flush_due(&mut self, now: Instant) -> bool {
        match self.pending.take_due(now) {
            Some(state) => self.commit(state),
            None => false,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.deadline()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_pending()
    }

    pub fn cancel_pending(&mut self) {
        self.pending.cancel();
    }

    /// Step back one state. Returns the new current state.
    pub fn undo(&mut self) -> Option<&HistoryState> {
        let previous = self.undo_stack.pop_back()?;
        self.pending.cancel();
        if let Some(current) = self.current.replace(previous) {
            self.redo_stack.push(current);
        }
        tracing::debug!(
            target: "composer::history",
            undo = self.undo_stack.len(),
            redo = self.redo_stack.len(),
            "undo"
        );
        self.current.as_ref()
    }

    /// Step forward one state. Returns the new current state.
    pub fn redo(&mut self) -> Option<&HistoryState> {
        let next = self.redo_stack.pop()?;
        self.pending.cancel();
        if let Some(current) = self.current.replace(next) {
            self.undo_stack.push_back(current);
        }
        tracing::debug!(
            target: "composer::history",
            undo = self.undo_stack.len(),
            redo = self.redo_stack.len(),
            "redo"
        );
        self.current.as_ref()
    }

    /// Forget every state, including the current one.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current = None;
        self.pending.cancel();
    }

    fn commit(&mut self, state: HistoryState) -> bool {
        let unchanged = are_formatted_texts_equal(
            self.current.as_ref().map(|s| &s.formatted_text),
            Some(&state.formatted_text),
        );
        if unchanged {
            tracing::trace!(target: "composer::history", "skipped unchanged state");
            return false;
        }

        if let Some(current) = self.current.replace(state) {
            self.undo_stack.push_back(current);
            while self.undo_stack.len() > self.max_depth {
                self.undo_stack.pop_front();
            }
        }
        self.redo_stack.clear();

        tracing::debug!(
            target: "composer::history",
            undo = self.undo_stack.len(),
            "saved state"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, EntityKind};

    fn state(text: &str) -> HistoryState {
        HistoryState::new(FormattedText::plain(text), Some(text.len()))
    }

    #[test]
    fn test_save_and_undo_redo() {
        let mut history = HistoryManager::default();
        history.save_state(state("a"));
        history.save_state(state("ab"));
        history.save_state(state("abc"));

        assert_eq!(history.undo().unwrap().formatted_text.text, "ab");
        assert_eq!(history.undo().unwrap().formatted_text.text, "a");
        assert!(history.undo().is_none());
        assert_eq!(history.current().unwrap().formatted_text.text, "a");

        assert_eq!(history.redo().unwrap().formatted_text.text, "ab");
        assert_eq!(history.redo().unwrap().caret_offset, Some(3));
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_equal_states_are_not_recorded() {
        let mut history = HistoryManager::default();
        history.save_state(state("hello world"));
        history.save_state(state("hello"));
        let depth = history.undo_depth();

        assert!(!history.save_state(state("hello")));
        assert!(!history.save_state(state("  hello\n")));
        assert_eq!(history.undo_depth(), depth);
    }

    #[test]
    fn test_entity_change_is_a_new_state() {
        let mut history = HistoryManager::default();
        history.save_state(state("hello"));
        let bold = HistoryState::new(
            FormattedText::new("hello", vec![Entity::new(EntityKind::Bold, 0, 5)]),
            Some(5),
        );
        assert!(history.save_state(bold));
        assert_eq!(history.undo_depth(), 1);
    }

    #[test]
    fn test_undo_then_redo_restores_state() {
        let mut history = HistoryManager::default();
        history.save_state(state("one"));
        history.save_state(state("two"));
        let before = history.current().cloned();

        history.undo();
        let after = history.redo().cloned();
        assert!(are_formatted_texts_equal(
            before.as_ref().map(|s| &s.formatted_text),
            after.as_ref().map(|s| &s.formatted_text),
        ));
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut history = HistoryManager::default();
        history.save_state(state("a"));
        history.save_state(state("ab"));
        history.undo();
        assert!(history.can_redo());

        history.save_state(state("ax"));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_max_depth_keeps_most_recent() {
        let mut history = HistoryManager::default();
        for i in 0..151 {
            history.save_state(state(&format!("state {i}")));
        }
        assert_eq!(history.undo_depth(), 100);

        // Current is state 150; the stack holds 50..=149, newest on top.
        let mut seen = Vec::new();
        while let Some(s) = history.undo() {
            seen.push(s.formatted_text.text.clone());
        }
        assert_eq!(seen.first().map(String::as_str), Some("state 149"));
        assert_eq!(seen.last().map(String::as_str), Some("state 50"));
    }

    #[test]
    fn test_debounced_save_waits_for_quiet_period() {
        let start = Instant::now();
        let mut history = HistoryManager::new(100, Duration::from_millis(400));
        history.save_state(state("a"));

        history.save_state_debounced(state("ab"), start);
        history.save_state_debounced(state("abc"), start + Duration::from_millis(300));
        assert!(!history.flush_due(start + Duration::from_millis(600)));
        assert!(history.flush_due(start + Duration::from_millis(700)));

        assert_eq!(history.current().unwrap().formatted_text.text, "abc");
        assert_eq!(history.undo_depth(), 1);
    }

    #[test]
    fn test_immediate_save_cancels_pending() {
        let start = Instant::now();
        let mut history = HistoryManager::default();
        history.save_state_debounced(state("typed"), start);
        history.save_state(state("setup"));

        assert!(!history.has_pending());
        assert!(!history.flush_due(start + Duration::from_secs(1)));
        assert_eq!(history.current().unwrap().formatted_text.text, "setup");
    }
}
