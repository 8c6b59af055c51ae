//! composer-core: platform-free logic of the message composer.
//!
//! This crate provides:
//! - `FormattedText` / `Entity` - the message model exchanged with hosts
//! - The composer's narrow Markdown dialect: `tokenize` and the token tree
//! - `tokens_to_formatted_text` - token tree to formatted text
//! - `HistoryManager` - equality-gated undo/redo of snapshots
//! - Key/input types, configuration and a deadline-based debouncer

pub mod actions;
pub mod config;
pub mod convert;
pub mod debounce;
pub mod entity;
pub mod error;
pub mod history;
pub mod lexer;
pub mod markers;
pub mod tag;
pub mod text;
pub mod token;

pub use actions::{InputType, Key, KeyEvent, KeydownResult, Modifiers, SendKeyCombo};
pub use config::EditorConfig;
pub use convert::{tokens_to_formatted_text, tokens_to_formatted_text_strict};
pub use debounce::Debounced;
pub use entity::{
    Entity, EntityKind, EntityType, FormattedText, are_formatted_texts_equal, normalize_whitespace,
};
pub use error::EntityError;
pub use history::{HistoryManager, HistoryState};
pub use lexer::tokenize;
pub use markers::FormattingType;
pub use smol_str::SmolStr;
pub use tag::{HtmlTag, parse_tag};
pub use text::{Utf16Text, utf16_len, utf16_to_byte};
pub use token::{Token, TokenKind, has_structure_changed, is_structure_equal};
