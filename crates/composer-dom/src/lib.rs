//! Document layer of the message composer.
//!
//! This crate provides everything that needs a document tree, generic over
//! the host UI through [`EditorSurface`]:
//!
//! - `dom`: arena document with a live selection and a revision counter
//! - `render` / `bridge`: formatted text to nodes, and nodes back to tokens
//!   or Markdown
//! - `caret` / `blocks`: caret offsets, line info and block context
//! - `execute`: default editing actions for keys the controller passes on
//! - `format`: toolbar formatting, links and marker visibility
//! - `markdown`: the debounced live Markdown check
//! - `controller`: keyboard rules, history and change fan-out
//! - `draft`: draft synchronisation with a host store
//!
//! # Re-exports
//!
//! This crate re-exports `composer-core` for convenience, so consumers only
//! need to depend on `composer-dom`.

pub use composer_core;
pub use composer_core::*;

pub mod blocks;
pub mod bridge;
pub mod caret;
pub mod clock;
pub mod controller;
pub mod dom;
pub mod draft;
pub mod editor;
pub mod error;
pub mod execute;
pub mod format;
pub mod highlight;
pub mod html;
pub mod lock;
pub mod markdown;
pub mod notify;
pub mod render;

pub use blocks::{BlockInfo, BlockType};
pub use bridge::{html_to_formatted_text, html_to_markdown, markdown_to_formatted_text};
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{
    ComposerOptions, ContentChange, Controller, CustomEmoji, CustomEmojiPredicate, EmojiInput,
    SetupOptions, SetupSource,
};
pub use dom::{Document, DomRange, NodeId, Position};
pub use draft::{DraftKey, DraftStore, DraftSync, Suppression};
pub use editor::{EditorSurface, RichTextEditor};
pub use error::ComposerError;
pub use format::SelectedTextInfo;
pub use lock::{LockGuard, LockType, MultiLock};
pub use notify::{ChangeNotifier, Subscription};
