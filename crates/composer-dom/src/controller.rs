//! The composer controller.
//!
//! One controller drives one editor surface: it owns the live Markdown
//! handler and the history, applies the block-level keyboard rules, and fans
//! content changes out to listeners.
//!
//! Nothing here runs on its own. Hosts route keydowns through
//! [`Controller::press`] (or [`Controller::handle_keydown`] followed by their
//! own default action), report direct edits with [`Controller::observe`], and
//! call [`Controller::run_pending`] once [`Controller::next_deadline`] has
//! passed.

use std::collections::VecDeque;
use std::fmt;

use composer_core::actions::{InputType, Key, KeyEvent, KeydownResult, SendKeyCombo};
use composer_core::config::EditorConfig;
use composer_core::entity::{Entity, EntityKind, EntityType, FormattedText};
use composer_core::history::{HistoryManager, HistoryState};
use composer_core::markers::{COLLAPSED_ATTR, FormattingType, QUOTE_TOGGLE_CLASS, auto_insert_rule};
use composer_core::text::{Utf16Text, utf16_len};
use smol_str::SmolStr;
use web_time::Instant;

use crate::blocks::{BlockInfo, BlockType, CodeBlockParts, CodePart, QuoteParts, closest_with_class};
use crate::caret::{line_info, line_info_at, offset_of, set_caret_offset};
use crate::clock::{Clock, SystemClock};
use crate::dom::{Document, NodeId, Position};
use crate::editor::{EditorSurface, RichTextEditor};
use crate::error::ComposerError;
use crate::execute::{delete_selection, editable_caret, insert_node_at, insert_text_at_caret};
use crate::format::{self, SelectedTextInfo};
use crate::highlight::refresh_highlight;
use crate::lock::{LockType, MultiLock};
use crate::markdown::MarkdownHandler;
use crate::notify::{ChangeNotifier, Subscription};
use crate::render::render_into;

/// A custom emoji offered for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomEmoji {
    pub document_id: SmolStr,
    /// Glyph the emoji stands for; required for insertion.
    pub emoji: Option<String>,
    pub sticker_set_id: Option<SmolStr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmojiInput {
    /// A plain emoji glyph.
    Native(String),
    Custom(CustomEmoji),
}

/// Decides whether a custom emoji from a sticker set may be sent.
pub type CustomEmojiPredicate = Box<dyn Fn(&CustomEmoji, Option<&str>) -> bool>;

pub struct ComposerOptions {
    /// Key combination that sends; `None` never intercepts Enter for sending.
    pub send_key_combo: Option<SendKeyCombo>,
    pub is_current_user_premium: bool,
    /// Rendered on attach.
    pub initial_text: Option<FormattedText>,
    pub config: EditorConfig,
    /// Custom emoji are refused when this is absent.
    pub can_send_custom_emoji: Option<CustomEmojiPredicate>,
}

impl Default for ComposerOptions {
    fn default() -> Self {
        Self {
            send_key_combo: Some(SendKeyCombo::Enter),
            is_current_user_premium: false,
            initial_text: None,
            config: EditorConfig::default(),
            can_send_custom_emoji: None,
        }
    }
}

impl fmt::Debug for ComposerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposerOptions")
            .field("send_key_combo", &self.send_key_combo)
            .field("is_current_user_premium", &self.is_current_user_premium)
            .field("initial_text", &self.initial_text)
            .field("config", &self.config)
            .field("can_send_custom_emoji", &self.can_send_custom_emoji.is_some())
            .finish()
    }
}

/// Where a `setup` call comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupSource {
    InitialText,
    Markdown,
    Draft,
    Editing,
    Undo,
    Redo,
    Host,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupOptions {
    pub source: SetupSource,
    /// Restoring a history state: no new history entry is recorded.
    pub is_history: bool,
}

impl SetupOptions {
    pub fn new(source: SetupSource) -> Self {
        Self {
            source,
            is_history: false,
        }
    }
}

/// Payload of a content-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentChange {
    pub revision: u64,
}

/// Work deferred to the end of the current event.
#[derive(Debug)]
enum Microtask {
    Setup {
        formatted_text: FormattedText,
        source: SetupSource,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Before,
    After,
}

pub struct Controller<E: EditorSurface = RichTextEditor, C: Clock = SystemClock> {
    editor: E,
    options: ComposerOptions,
    history: HistoryManager,
    markdown: MarkdownHandler,
    locks: MultiLock<LockType>,
    clock: C,
    microtasks: VecDeque<Microtask>,
    notifier: ChangeNotifier<ContentChange>,
    /// Last document revision seen by `observe`.
    seen_revision: u64,
    cleaned_up: bool,
}

impl<E: EditorSurface> Controller<E, SystemClock> {
    pub fn new(editor: E, options: ComposerOptions) -> Self {
        Self::with_clock(editor, options, SystemClock)
    }
}

impl<E: EditorSurface, C: Clock> Controller<E, C> {
    /// Attach to an editor. The controller takes the editor by value, so no
    /// two controllers can drive the same surface.
    pub fn with_clock(editor: E, options: ComposerOptions, clock: C) -> Self {
        let mut history = HistoryManager::from_config(&options.config);
        history.save_state(HistoryState::new(FormattedText::default(), Some(0)));
        let markdown = MarkdownHandler::from_config(&options.config);
        let seen_revision = editor.revision();

        let mut controller = Self {
            editor,
            options,
            history,
            markdown,
            locks: MultiLock::new(),
            clock,
            microtasks: VecDeque::new(),
            notifier: ChangeNotifier::new(),
            seen_revision,
            cleaned_up: false,
        };
        controller.markdown.reload_cache(&controller.editor);

        if let Some(initial) = controller.options.initial_text.clone() {
            controller.setup(Some(&initial), SetupOptions::new(SetupSource::InitialText));
        }
        tracing::debug!(target: "composer::controller", "attached");
        controller
    }

    // === Accessors ===

    pub fn editor(&self) -> &E {
        &self.editor
    }

    /// Mutable access to the surface. Report edits made through it with
    /// [`observe`](Self::observe).
    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    pub fn options(&self) -> &ComposerOptions {
        &self.options
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn locks(&self) -> &MultiLock<LockType> {
        &self.locks
    }

    // === Change observation and scheduling ===

    /// React to document changes since the last call: refresh the code
    /// highlight, schedule the Markdown check and a history snapshot unless
    /// locked, and notify listeners. Returns whether anything changed.
    pub fn observe(&mut self) -> bool {
        if self.editor.revision() == self.seen_revision {
            return false;
        }
        self.refresh_code_highlight();
        let revision = self.editor.revision();
        self.seen_revision = revision;

        let now = self.clock.now();
        if !self.locks.is_locked(LockType::ContentChange) {
            self.markdown.on_content_changed(now);
        }
        if !self.locks.is_locked(LockType::History) {
            self.save_history(true);
        }

        tracing::trace!(target: "composer::controller", revision, "content changed");
        self.notifier.notify(&ContentChange { revision });
        true
    }

    fn refresh_code_highlight(&mut self) {
        let Some(BlockInfo {
            block_type: BlockType::CodeBlock,
            block_element: Some(block),
            ..
        }) = self.editor.block_info()
        else {
            return;
        };
        refresh_highlight(self.editor.document_mut(), block);
    }

    /// Earliest instant at which [`run_pending`](Self::run_pending) has work.
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.history.next_deadline(), self.markdown.deadline()]
            .into_iter()
            .flatten()
            .min()
    }

    /// Run debounced work that is due.
    pub fn run_pending(&mut self) {
        let now = self.clock.now();
        self.history.flush_due(now);
        if self.markdown.take_due(now) && !self.locks.is_locked(LockType::ContentChange) {
            if let Some(formatted_text) = self.markdown.check(&self.editor) {
                self.microtasks.push_back(Microtask::Setup {
                    formatted_text,
                    source: SetupSource::Markdown,
                });
            }
        }
        self.drain_microtasks();
    }

    /// Run the live Markdown check now instead of after its quiet period.
    pub fn check_markdown_now(&mut self) {
        if let Some(formatted_text) = self.markdown.check_now(&self.editor) {
            self.microtasks.push_back(Microtask::Setup {
                formatted_text,
                source: SetupSource::Markdown,
            });
        }
        self.drain_microtasks();
    }

    fn drain_microtasks(&mut self) {
        while let Some(task) = self.microtasks.pop_front() {
            match task {
                Microtask::Setup {
                    formatted_text,
                    source,
                } => self.setup(Some(&formatted_text), SetupOptions::new(source)),
            }
        }
    }

    fn save_history(&mut self, debounced: bool) {
        let formatted_text = match self.editor.formatted_text() {
            Ok(ft) => ft,
            Err(err) => {
                tracing::warn!(target: "composer::controller", %err, "history snapshot skipped");
                return;
            }
        };
        let state = HistoryState::new(formatted_text, self.editor.caret_offset());
        if debounced {
            self.history.save_state_debounced(state, self.clock.now());
        } else {
            self.history.save_state(state);
        }
    }

    /// Run a programmatic edit with both the Markdown check and history
    /// snapshots locked, then resync the Markdown cache and record the final
    /// state once.
    fn locked_edit(&mut self, edit: impl FnOnce(&mut E)) {
        {
            let _guard = self.locks.lock(&[LockType::ContentChange, LockType::History]);
            edit(&mut self.editor);
            self.observe();
        }
        self.markdown.reload_cache(&self.editor);
        self.save_history(false);
    }

    // === Content ===

    /// Render `formatted_text` into the editor, or clear it for `None`.
    pub fn setup(&mut self, formatted_text: Option<&FormattedText>, options: SetupOptions) {
        tracing::debug!(
            target: "composer::controller",
            source = ?options.source,
            is_history = options.is_history,
            "setup"
        );
        match formatted_text {
            Some(ft) => {
                self.editor.set_content(ft, &self.options.config);
                self.update_marker_visibility();
            }
            None => self.editor.clear(),
        }
        self.observe();
        if !options.is_history {
            self.save_history(false);
        }
    }

    pub fn reset_editor(&mut self) {
        self.editor.clear();
        self.observe();
    }

    pub fn get_formatted_text(&self) -> Result<FormattedText, ComposerError> {
        let ft = self.editor.formatted_text()?;
        if let Some(entity) = ft.out_of_bounds_entity() {
            return Err(ComposerError::EntityOutOfBounds {
                offset: entity.offset,
                end: entity.end(),
                len: ft.len_utf16(),
            });
        }
        Ok(ft)
    }

    pub fn get_html(&self) -> String {
        self.editor.html()
    }

    pub fn is_html_empty(&self) -> bool {
        matches!(self.get_html().as_str(), "" | "\n" | "<br>")
    }

    pub fn is_touched(&self) -> bool {
        !self.is_html_empty()
    }

    pub fn get_block_info(&self) -> Option<BlockInfo> {
        self.editor.block_info()
    }

    fn is_inside_code_block(&self) -> bool {
        self.get_block_info()
            .is_some_and(|info| info.block_type == BlockType::CodeBlock)
    }

    /// The formatting toolbar is unavailable inside code blocks.
    pub fn can_open_text_formatter(&self) -> bool {
        !self.is_inside_code_block()
    }

    /// Subscribe to content changes.
    pub fn listen(&self, callback: impl FnMut(&ContentChange) + 'static) -> Subscription {
        self.notifier.listen(callback)
    }

    // === Formatting ===

    pub fn get_selected_text_info(&self) -> SelectedTextInfo {
        format::selected_text_info(self.editor.document(), self.editor.root())
    }

    /// Toggle a format on the selection.
    pub fn apply_format_to_selected_text(&mut self, format: FormattingType) -> bool {
        let root = self.editor.root();
        let applied = format::apply_format(self.editor.document_mut(), root, format);
        tracing::debug!(target: "composer::controller", ?format, applied, "apply format");
        self.observe();
        applied
    }

    /// Link the selection to `url`.
    pub fn insert_link(&mut self, url: &str) -> bool {
        if self.is_inside_code_block() {
            return false;
        }
        let root = self.editor.root();
        let inserted = format::insert_link(self.editor.document_mut(), root, url);
        self.observe();
        inserted
    }

    /// Insert an emoji at the caret. Refused inside code blocks, and for
    /// custom emoji the injected predicate must approve.
    pub fn insert_emoji(&mut self, emoji: &EmojiInput) -> bool {
        if self.is_inside_code_block() {
            return false;
        }
        let inserted = match emoji {
            EmojiInput::Native(glyph) => self.insert_native_emoji(glyph),
            EmojiInput::Custom(custom) => self.insert_custom_emoji(custom),
        };
        if inserted {
            self.observe();
            self.save_history(false);
        }
        inserted
    }

    fn has_caret(&self) -> bool {
        let doc = self.editor.document();
        doc.selection()
            .is_some_and(|range| doc.contains(self.editor.root(), range.start.node))
    }

    fn insert_native_emoji(&mut self, glyph: &str) -> bool {
        if glyph.is_empty() || !self.has_caret() {
            return false;
        }
        let root = self.editor.root();
        let doc = self.editor.document_mut();
        delete_selection(doc);
        insert_text_at_caret(doc, root, glyph);
        true
    }

    fn insert_custom_emoji(&mut self, custom: &CustomEmoji) -> bool {
        let set_id = custom.sticker_set_id.as_deref();
        let allowed = self
            .options
            .can_send_custom_emoji
            .as_ref()
            .is_some_and(|can_send| can_send(custom, set_id));
        if !allowed {
            tracing::debug!(
                target: "composer::controller",
                document_id = %custom.document_id,
                "custom emoji refused"
            );
            return false;
        }
        let Some(glyph) = custom.emoji.as_deref().filter(|g| !g.is_empty()) else {
            return false;
        };
        if !self.has_caret() {
            return false;
        }

        let root = self.editor.root();
        let doc = self.editor.document_mut();
        delete_selection(doc);
        let Some(pos) = editable_caret(doc, root) else {
            return false;
        };
        let ft = FormattedText::new(
            glyph,
            vec![Entity::new(
                EntityKind::CustomEmoji {
                    document_id: custom.document_id.clone(),
                },
                0,
                utf16_len(glyph),
            )],
        );
        let scratch = doc.create_element("span");
        render_into(doc, scratch, &ft, &self.options.config);
        let Some(img) = doc.first_child(scratch) else {
            doc.remove(scratch);
            return false;
        };
        insert_node_at(doc, pos, img);
        doc.remove(scratch);
        if let Some(after) = doc.position_after(img) {
            doc.set_caret(after);
        }
        true
    }

    /// Handle a click: a quote's collapse toggle flips its collapsed flag.
    pub fn handle_click(&mut self, node: NodeId) -> bool {
        let root = self.editor.root();
        let doc = self.editor.document_mut();
        let Some(toggle) = closest_with_class(doc, root, node, QUOTE_TOGGLE_CLASS) else {
            return false;
        };
        let Some(block) = doc
            .ancestors(toggle)
            .take_while(|&n| n != root)
            .find(|&n| doc.entity_type(n) == Some(EntityType::Blockquote))
        else {
            return false;
        };
        let collapsed = doc.attr(block, COLLAPSED_ATTR) == Some("true");
        doc.set_attr(block, COLLAPSED_ATTR, if collapsed { "false" } else { "true" });
        self.observe();
        true
    }

    pub fn on_selection_change(&mut self) {
        self.update_marker_visibility();
    }

    /// Show the markers of the entity at the caret. Marker classes are not
    /// content, so this does not count as a change.
    pub fn update_marker_visibility(&mut self) {
        let unobserved = self.editor.revision() != self.seen_revision;
        let root = self.editor.root();
        format::update_marker_visibility(self.editor.document_mut(), root);
        if !unobserved {
            self.seen_revision = self.editor.revision();
        }
    }

    // === History ===

    pub fn undo(&mut self) -> bool {
        self.commit_pending_history();
        let Some(state) = self.history.undo().cloned() else {
            return false;
        };
        self.restore(state, SetupSource::Undo);
        true
    }

    pub fn redo(&mut self) -> bool {
        self.commit_pending_history();
        let Some(state) = self.history.redo().cloned() else {
            return false;
        };
        self.restore(state, SetupSource::Redo);
        true
    }

    /// Typing still waiting for its quiet period becomes a history entry
    /// before stepping through history.
    fn commit_pending_history(&mut self) {
        if let Some(deadline) = self.history.next_deadline() {
            self.history.flush_due(deadline);
        }
    }

    fn restore(&mut self, state: HistoryState, source: SetupSource) {
        {
            let _guard = self.locks.lock(&[LockType::ContentChange, LockType::History]);
            self.setup(
                Some(&state.formatted_text),
                SetupOptions {
                    source,
                    is_history: true,
                },
            );
            self.markdown.reload_cache(&self.editor);
        }
        if let Some(offset) = state.caret_offset {
            self.editor.set_caret_offset(offset);
        }
        self.update_marker_visibility();
    }

    // === Keyboard ===

    /// Dispatch a keydown the way a browser would: the controller's handling
    /// first, then the default action unless it was prevented. Deferred work
    /// runs before returning.
    pub fn press(&mut self, event: &KeyEvent) -> KeydownResult {
        let result = self.handle_keydown(event);
        if !result.prevents_default() && result != KeydownResult::Send {
            if let Some(input) = event.default_input() {
                self.editor.execute(&input);
            }
        }
        self.observe();
        self.drain_microtasks();
        self.update_marker_visibility();
        result
    }

    pub fn handle_keydown(&mut self, event: &KeyEvent) -> KeydownResult {
        if self
            .options
            .send_key_combo
            .is_some_and(|combo| combo.is_send(event))
        {
            return KeydownResult::Send;
        }

        if matches!(event.key, Key::Backspace | Key::Enter) && self.handle_block_key(&event.key) {
            tracing::trace!(target: "composer::controller", key = ?event.key, "block rule applied");
            return KeydownResult::Handled;
        }

        match &event.key {
            Key::Delete if !event.modifiers.has_primary() && !event.modifiers.alt => {
                self.delete_current_block()
            }
            Key::Enter if !event.modifiers.shift => {
                self.editor.execute(&InputType::InsertLineBreak);
                KeydownResult::Handled
            }
            Key::Character(_) if event.modifiers.has_primary() && !event.modifiers.alt => {
                if event.repeat {
                    KeydownResult::NotHandled
                } else {
                    self.handle_shortcut(event)
                }
            }
            Key::Character(_) if self.check_auto_insert(event) => KeydownResult::Handled,
            _ => KeydownResult::NotHandled,
        }
    }

    fn handle_shortcut(&mut self, event: &KeyEvent) -> KeydownResult {
        let Some(ch) = event.key.as_char().map(|c| c.to_ascii_lowercase()) else {
            return KeydownResult::NotHandled;
        };
        let format = match ch {
            'z' => {
                if event.modifiers.shift {
                    self.redo();
                } else {
                    self.undo();
                }
                return KeydownResult::Handled;
            }
            'y' => {
                self.redo();
                return KeydownResult::Handled;
            }
            'k' => return KeydownResult::OpenLinkControl,
            'b' => FormattingType::Bold,
            'u' => FormattingType::Underline,
            'i' => FormattingType::Italic,
            'm' => FormattingType::Code,
            's' => FormattingType::Strike,
            'p' => FormattingType::Spoiler,
            _ => return KeydownResult::NotHandled,
        };
        self.apply_format_to_selected_text(format);
        KeydownResult::Handled
    }

    /// Delete removes the whole block around the caret.
    fn delete_current_block(&mut self) -> KeydownResult {
        let Some(block) = self.get_block_info().and_then(|info| info.block_element) else {
            return KeydownResult::NotHandled;
        };
        self.locked_edit(|editor| editor.document_mut().remove(block));
        KeydownResult::Handled
    }

    fn handle_block_key(&mut self, key: &Key) -> bool {
        let Some(info) = self.get_block_info() else {
            return false;
        };
        let Some(block) = info.block_element else {
            return false;
        };
        match info.block_type {
            BlockType::CodeBlock => self.handle_code_block_key(key, block, info.range.start),
            BlockType::QuoteBlock => self.handle_quote_key(key, block),
            BlockType::Paragraph => false,
        }
    }

    fn handle_code_block_key(&mut self, key: &Key, block: NodeId, caret: Position) -> bool {
        let (parts, part, offset) = {
            let doc = self.editor.document();
            let parts = CodeBlockParts::find(doc, block);
            let part = parts.part_of(doc, caret.node);
            let element = match part {
                Some(CodePart::Header) => parts.header,
                Some(CodePart::Footer) => parts.footer,
                _ => None,
            };
            let offset = element.map(|el| offset_of(doc, el, caret)).unwrap_or(0);
            (parts, part, offset)
        };
        let Some(content) = parts.content else {
            return false;
        };
        let threshold = self.options.config.fence_backspace_threshold;

        match (key, part) {
            (Key::Backspace, Some(CodePart::Header)) => {
                if offset == 0 {
                    self.locked_edit(|editor| insert_hard_break(editor.document_mut(), block, Side::Before));
                } else if offset <= threshold {
                    self.demote_code_block(parts);
                } else {
                    return false;
                }
                true
            }
            (Key::Backspace, Some(CodePart::Footer)) => {
                if offset == 0 {
                    set_caret_offset(self.editor.document_mut(), content, 0);
                } else if offset <= threshold {
                    self.demote_code_block(parts);
                } else {
                    return false;
                }
                true
            }
            (Key::Enter, Some(CodePart::Header)) => {
                if offset == 0 {
                    self.locked_edit(|editor| insert_hard_break(editor.document_mut(), block, Side::Before));
                } else {
                    set_caret_offset(self.editor.document_mut(), content, 0);
                }
                true
            }
            (Key::Enter, Some(CodePart::Footer)) => {
                self.locked_edit(|editor| insert_hard_break(editor.document_mut(), block, Side::After));
                true
            }
            _ => false,
        }
    }

    /// Remove both fences and re-render, leaving the code as plain text.
    fn demote_code_block(&mut self, parts: CodeBlockParts) {
        let config = self.options.config.clone();
        self.locked_edit(|editor| {
            let doc = editor.document_mut();
            for fence in [parts.header, parts.footer].into_iter().flatten() {
                doc.remove(fence);
            }
            match editor.formatted_text() {
                Ok(ft) => editor.set_content(&ft, &config),
                Err(err) => {
                    tracing::warn!(target: "composer::controller", %err, "demoted code block not re-rendered");
                }
            }
        });
        tracing::debug!(target: "composer::controller", "code block demoted");
    }

    fn handle_quote_key(&mut self, key: &Key, block: NodeId) -> bool {
        let (container, line) = {
            let doc = self.editor.document();
            let Some(container) = QuoteParts::find(doc, block).container else {
                return false;
            };
            let Some(line) = line_info(doc, container) else {
                return false;
            };
            (container, line)
        };

        match key {
            Key::Backspace if line.is_first_line && line.is_last_line && line.current_line_empty => {
                self.locked_edit(|editor| editor.document_mut().remove(block));
                true
            }
            Key::Backspace if line.is_first_line && line.is_line_start => {
                move_caret_to_end_of_previous_sibling(self.editor.document_mut(), block);
                true
            }
            Key::Enter if line.is_third_line && line.two_first_empty => {
                self.locked_edit(|editor| {
                    let doc = editor.document_mut();
                    strip_breaks(doc, container, Side::Before, 2);
                    insert_hard_break(doc, block, Side::Before);
                });
                true
            }
            Key::Enter if line.is_last_line && line.two_last_empty => {
                self.locked_edit(|editor| {
                    let doc = editor.document_mut();
                    strip_breaks(doc, container, Side::After, 2);
                    insert_hard_break(doc, block, Side::After);
                });
                true
            }
            _ => false,
        }
    }

    /// Pair typed marker characters around the caret, and expand a third
    /// backtick on a line of two into a fenced block.
    fn check_auto_insert(&mut self, event: &KeyEvent) -> bool {
        let Some(ch) = event.key.as_char() else {
            return false;
        };
        let Some(rule) = auto_insert_rule(ch) else {
            return false;
        };
        if event.repeat {
            return false;
        }
        let Some(info) = self.get_block_info() else {
            return false;
        };
        if !info.is_collapsed || info.block_type == BlockType::CodeBlock {
            return false;
        }
        let Some(caret) = self.editor.caret_offset() else {
            return false;
        };
        let units = self.editor.unit_text();

        if ch == '`' && info.block_type == BlockType::Paragraph {
            let line = line_info_at(&units, caret);
            if line.lines.get(line.line_index).is_some_and(|l| l == "``") {
                let line_end = caret - line.offset_in_line + 2;
                let language = self.options.config.default_code_language.clone();
                self.editor.set_caret_offset(line_end);
                self.editor
                    .execute(&InputType::InsertText(format!("`{language}\n\n```")));
                self.editor.set_caret_offset(line_end + utf16_len(&language) + 1);
                return true;
            }
        }

        let text = Utf16Text::new(&units);
        let accepted = |c: Option<char>| c.is_none_or(char::is_whitespace);
        let prev = caret.checked_sub(1).and_then(|i| text.char_at(i));
        let next = text.char_at(caret);
        let (count, shift) = if accepted(prev) && accepted(next) {
            (rule.each_side * 2, rule.each_side)
        } else {
            (1, 1)
        };
        self.editor
            .execute(&InputType::InsertText(ch.to_string().repeat(count)));
        self.editor.set_caret_offset(caret + shift);
        true
    }

    // === Teardown ===

    /// Drop listeners and pending work and empty the editor. Also run on
    /// drop.
    pub fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;
        self.notifier.clear();
        self.history.cancel_pending();
        self.markdown.cancel();
        self.microtasks.clear();
        self.editor.clear();
        self.seen_revision = self.editor.revision();
        tracing::debug!(target: "composer::controller", "cleaned up");
    }
}

impl<E: EditorSurface, C: Clock> Drop for Controller<E, C> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Insert a `<br>` next to a block and put the caret after it.
fn insert_hard_break(doc: &mut Document, block: NodeId, side: Side) {
    let br = doc.create_element("br");
    match side {
        Side::Before => doc.place_before(block, br),
        Side::After => doc.place_after(block, br),
    }
    if let Some(after) = doc.position_after(br) {
        doc.set_caret(after);
    }
}

/// Remove up to `count` line breaks from one end of a container, along with
/// empty text nodes in between.
fn strip_breaks(doc: &mut Document, container: NodeId, side: Side, mut count: usize) {
    while count > 0 {
        let edge = match side {
            Side::Before => doc.first_child(container),
            Side::After => doc.last_child(container),
        };
        let Some(child) = edge else {
            break;
        };
        if doc.text(child).is_some_and(str::is_empty) {
            doc.remove(child);
            continue;
        }
        if !doc.is_tag(child, "br") {
            break;
        }
        doc.remove(child);
        count -= 1;
    }
}

/// Put the caret at the end of the closest previous sibling with content.
fn move_caret_to_end_of_previous_sibling(doc: &mut Document, element: NodeId) {
    let mut prev = doc.previous_sibling(element);
    while let Some(node) = prev {
        if doc.is_text(node) || !doc.text_content(node).trim().is_empty() {
            break;
        }
        prev = doc.previous_sibling(node);
    }
    let Some(target) = prev.or_else(|| doc.previous_sibling(element)) else {
        return;
    };

    let mut last = target;
    while let Some(child) = doc.last_child(last) {
        last = child;
    }
    let pos = if doc.is_text(last) {
        Some(Position::new(last, doc.node_length(last)))
    } else {
        doc.position_after(last)
    };
    if let Some(pos) = pos {
        doc.set_caret(pos);
    }
}
