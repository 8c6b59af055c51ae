//! Tunable editor constants.

use smol_str::SmolStr;
use web_time::Duration;

pub const DEFAULT_MARKDOWN_DEBOUNCE: Duration = Duration::from_millis(250);
pub const DEFAULT_HISTORY_DEBOUNCE: Duration = Duration::from_millis(400);
pub const DEFAULT_HISTORY_MAX_DEPTH: usize = 100;
/// Caret offsets up to this value inside a code block header or footer sit on
/// the fence glyphs.
pub const DEFAULT_FENCE_BACKSPACE_THRESHOLD: usize = 3;
/// Quotes with more lines than this get a collapse toggle.
pub const DEFAULT_BLOCKQUOTE_COLLAPSE_LINES: usize = 4;

/// Editor configuration. Every field has a named default above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    /// Quiet period before the live Markdown check runs.
    pub markdown_debounce: Duration,
    /// Quiet period before a typing snapshot is committed to history.
    pub history_debounce: Duration,
    /// Undo stack depth; the oldest state is dropped beyond it.
    pub history_max_depth: usize,
    pub fence_backspace_threshold: usize,
    pub blockquote_collapse_lines: usize,
    /// Language written after a fence expanded from typed backticks.
    pub default_code_language: SmolStr,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            markdown_debounce: DEFAULT_MARKDOWN_DEBOUNCE,
            history_debounce: DEFAULT_HISTORY_DEBOUNCE,
            history_max_depth: DEFAULT_HISTORY_MAX_DEPTH,
            fence_backspace_threshold: DEFAULT_FENCE_BACKSPACE_THRESHOLD,
            blockquote_collapse_lines: DEFAULT_BLOCKQUOTE_COLLAPSE_LINES,
            default_code_language: SmolStr::default(),
        }
    }
}
