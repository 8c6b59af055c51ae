//! Live Markdown formatting.
//!
//! After each content change (debounced) the editor's Markdown form is
//! re-tokenized. Only a change in token-tree shape produces new formatted
//! text for the controller to render; typing inside a stable structure does
//! nothing.

use composer_core::config::EditorConfig;
use composer_core::convert::tokens_to_formatted_text;
use composer_core::debounce::Debounced;
use composer_core::entity::FormattedText;
use composer_core::lexer::tokenize;
use composer_core::token::{Token, has_structure_changed};
use web_time::{Duration, Instant};

use crate::editor::EditorSurface;

#[derive(Debug, Clone)]
pub struct MarkdownHandler {
    /// Trimmed Markdown of the last check.
    prev_markdown: String,
    prev_tokens: Vec<Token>,
    pending: Debounced<()>,
}

impl MarkdownHandler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            prev_markdown: String::new(),
            prev_tokens: Vec::new(),
            pending: Debounced::new(debounce),
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.markdown_debounce)
    }

    /// Re-tokenize the current content without reacting to it.
    pub fn reload_cache(&mut self, editor: &impl EditorSurface) {
        let markdown = editor.markdown();
        self.prev_markdown = markdown.trim().to_string();
        self.prev_tokens = tokenize(&markdown);
    }

    /// Restart the quiet period.
    pub fn on_content_changed(&mut self, now: Instant) {
        self.pending.schedule(now, ());
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.deadline()
    }

    pub fn cancel(&mut self) {
        self.pending.cancel();
    }

    /// Whether the debounced check is due.
    pub fn take_due(&mut self, now: Instant) -> bool {
        self.pending.take_due(now).is_some()
    }

    /// Cancel the debounce and check immediately.
    pub fn check_now(&mut self, editor: &impl EditorSurface) -> Option<FormattedText> {
        self.pending.cancel();
        self.check(editor)
    }

    /// Formatted text to render when the structure changed since the last
    /// check.
    pub fn check(&mut self, editor: &impl EditorSurface) -> Option<FormattedText> {
        let markdown = editor.markdown();
        let trimmed = markdown.trim();
        if trimmed == self.prev_markdown {
            return None;
        }

        let tokens = tokenize(&markdown);
        let changed = has_structure_changed(&self.prev_tokens, &tokens);
        self.prev_markdown = trimmed.to_string();
        self.prev_tokens = tokens;

        if !changed {
            tracing::trace!(target: "composer::markdown", "content changed, structure stable");
            return None;
        }

        match tokens_to_formatted_text(&self.prev_tokens) {
            Ok(ft) => {
                tracing::debug!(
                    target: "composer::markdown",
                    entities = ft.entities.len(),
                    "structure changed"
                );
                Some(ft)
            }
            Err(err) => {
                tracing::warn!(target: "composer::markdown", %err, "markdown conversion failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use composer_core::actions::InputType;
    use composer_core::entity::{Entity, EntityKind};

    use super::*;
    use crate::editor::RichTextEditor;

    fn typed(text: &str) -> RichTextEditor {
        let mut editor = RichTextEditor::new();
        editor.set_caret_offset(0);
        editor.execute(&InputType::InsertText(text.into()));
        editor
    }

    #[test]
    fn test_plain_typing_is_stable() {
        let mut editor = typed("hello");
        let mut handler = MarkdownHandler::new(Duration::from_millis(250));
        handler.reload_cache(&editor);

        editor.execute(&InputType::InsertText(" world".into()));
        assert_eq!(handler.check(&editor), None);
    }

    #[test]
    fn test_closing_marker_formats() {
        let mut editor = typed("say **hi*");
        let mut handler = MarkdownHandler::new(Duration::from_millis(250));
        handler.reload_cache(&editor);

        editor.execute(&InputType::InsertText("*".into()));
        let ft = handler.check(&editor).unwrap();
        assert_eq!(
            ft,
            FormattedText::new("say hi", vec![Entity::new(EntityKind::Bold, 4, 2)])
        );

        // Rendering the result reproduces the same structure.
        editor.set_content(&ft, &EditorConfig::default());
        assert_eq!(handler.check(&editor), None);
    }

    #[test]
    fn test_debounce_restarts() {
        let start = Instant::now();
        let mut handler = MarkdownHandler::new(Duration::from_millis(250));
        handler.on_content_changed(start);
        handler.on_content_changed(start + Duration::from_millis(200));

        assert!(!handler.take_due(start + Duration::from_millis(300)));
        assert!(handler.take_due(start + Duration::from_millis(450)));
        assert!(!handler.is_pending());
    }
}
