//! Draft synchronisation between a controller and an external draft store.
//!
//! The store is a host collaborator. `DraftSync` only decides when to talk to
//! it: the editor counts as touched while its formatted text differs from the
//! last known draft, saves wait for a quiet period, and a live
//! [`Suppression`] blocks saves entirely (used while content is swapped in
//! for another chat).

use std::rc::Rc;

use composer_core::debounce::Debounced;
use composer_core::entity::{EntityKind, FormattedText, are_formatted_texts_equal};
use smol_str::SmolStr;
use web_time::{Duration, Instant};

use crate::clock::Clock;
use crate::controller::{Controller, SetupOptions, SetupSource};
use crate::editor::EditorSurface;

pub const DEFAULT_DRAFT_DEBOUNCE: Duration = Duration::from_secs(10);

/// Chat and thread a draft belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DraftKey {
    pub chat_id: SmolStr,
    pub thread_id: Option<SmolStr>,
}

impl DraftKey {
    pub fn new(chat_id: impl Into<SmolStr>, thread_id: Option<SmolStr>) -> Self {
        Self {
            chat_id: chat_id.into(),
            thread_id,
        }
    }
}

/// Persistence for drafts, provided by the host.
pub trait DraftStore {
    fn load(&self, key: &DraftKey) -> Option<FormattedText>;

    fn save(&mut self, key: &DraftKey, text: &FormattedText);

    fn clear(&mut self, key: &DraftKey);
}

/// Blocks draft saves while alive.
#[derive(Debug)]
#[must_use = "saves resume as soon as the suppression is dropped"]
pub struct Suppression(#[allow(dead_code)] Rc<()>);

pub struct DraftSync<S: DraftStore> {
    store: S,
    key: DraftKey,
    /// The draft as last loaded from or written to the store.
    draft: Option<FormattedText>,
    touched: bool,
    editing: bool,
    pending: Debounced<()>,
    suppressor: Rc<()>,
}

impl<S: DraftStore> DraftSync<S> {
    pub fn new(store: S, key: DraftKey) -> Self {
        Self::with_debounce(store, key, DEFAULT_DRAFT_DEBOUNCE)
    }

    pub fn with_debounce(store: S, key: DraftKey, debounce: Duration) -> Self {
        let draft = store.load(&key);
        Self {
            store,
            key,
            draft,
            touched: false,
            editing: false,
            pending: Debounced::new(debounce),
            suppressor: Rc::new(()),
        }
    }

    pub fn key(&self) -> &DraftKey {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_touched(&self) -> bool {
        self.touched
    }

    pub fn is_suppressed(&self) -> bool {
        Rc::strong_count(&self.suppressor) > 1
    }

    pub fn suppress(&self) -> Suppression {
        Suppression(Rc::clone(&self.suppressor))
    }

    /// While an existing message is being edited no drafts are written.
    pub fn set_editing(&mut self, editing: bool) {
        self.editing = editing;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.deadline()
    }

    /// Document ids of custom emoji in the current draft, for the host to
    /// preload.
    pub fn custom_emoji_ids(&self) -> Vec<SmolStr> {
        self.draft
            .iter()
            .flat_map(|ft| &ft.entities)
            .filter_map(|entity| match &entity.kind {
                EntityKind::CustomEmoji { document_id } => Some(document_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Render the stored draft into the editor unless local edits exist or
    /// the editor already shows it.
    pub fn restore<E: EditorSurface, C: Clock>(&mut self, controller: &mut Controller<E, C>) -> bool {
        if self.touched || self.editing {
            return false;
        }
        let Some(draft) = self.draft.clone() else {
            return false;
        };
        let current = controller.get_formatted_text().ok();
        if are_formatted_texts_equal(Some(&draft), current.as_ref()) {
            return false;
        }
        let _suppression = self.suppress();
        controller.setup(Some(&draft), SetupOptions::new(SetupSource::Draft));
        tracing::debug!(target: "composer::controller", chat = %self.key.chat_id, "draft restored");
        true
    }

    /// The store changed the draft for the current key (another client, or a
    /// cleared draft after sending).
    pub fn on_remote_draft<E: EditorSurface, C: Clock>(
        &mut self,
        controller: &mut Controller<E, C>,
        draft: Option<FormattedText>,
    ) {
        if self.touched && draft.is_none() {
            return;
        }
        let had_draft = self.draft.is_some();
        self.draft = draft;
        if self.draft.is_none() && had_draft {
            let _suppression = self.suppress();
            controller.reset_editor();
            return;
        }
        self.restore(controller);
    }

    /// Content-change hook. An emptied editor updates the store right away,
    /// anything else waits for the quiet period.
    pub fn on_change<E: EditorSurface, C: Clock>(&mut self, controller: &Controller<E, C>, now: Instant) {
        if self.is_suppressed() {
            return;
        }
        let current = controller.get_formatted_text().ok();
        self.touched = !are_formatted_texts_equal(self.draft.as_ref(), current.as_ref());
        if controller.is_html_empty() {
            self.pending.cancel();
            self.update(controller);
            return;
        }
        self.pending.schedule(now, ());
    }

    /// Write the draft if the quiet period is over.
    pub fn flush_due<E: EditorSurface, C: Clock>(&mut self, controller: &Controller<E, C>, now: Instant) {
        if self.pending.take_due(now).is_some() {
            self.update(controller);
        }
    }

    /// Write the draft now (blur, backgrounding, unload).
    pub fn flush_now<E: EditorSurface, C: Clock>(&mut self, controller: &Controller<E, C>) {
        self.pending.cancel();
        self.update(controller);
    }

    /// Save the current chat's draft, then load the next chat's.
    pub fn switch_to<E: EditorSurface, C: Clock>(
        &mut self,
        controller: &mut Controller<E, C>,
        key: DraftKey,
    ) {
        if key == self.key {
            return;
        }
        self.flush_now(controller);
        self.key = key;
        self.draft = self.store.load(&self.key);
        self.touched = false;
        {
            let _suppression = self.suppress();
            controller.reset_editor();
        }
        self.restore(controller);
    }

    fn update<E: EditorSurface, C: Clock>(&mut self, controller: &Controller<E, C>) {
        if self.editing || !self.touched || self.is_suppressed() {
            return;
        }
        if controller.is_touched() {
            let text = match controller.get_formatted_text() {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(target: "composer::controller", %err, "draft not saved");
                    return;
                }
            };
            self.store.save(&self.key, &text);
            self.draft = Some(text);
        } else {
            self.store.clear(&self.key);
            self.draft = None;
        }
        self.touched = false;
        tracing::debug!(target: "composer::controller", chat = %self.key.chat_id, "draft updated");
    }
}
