//! Formatted text: plain content plus typed, offset-addressed entities.
//!
//! Offsets and lengths are UTF-16 code units into [`FormattedText::text`].
//! Entities are kept in processing order (ascending offset, parents before
//! same-offset children) by every producer in this crate; consumers should
//! not rely on that for externally supplied values and can call
//! [`FormattedText::sort_entities`].

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::EntityError;
use crate::text::utf16_len;

/// Entity kinds known to the composer, without their payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Bold,
    Italic,
    Underline,
    Strike,
    Spoiler,
    Code,
    Pre,
    Blockquote,
    TextUrl,
    CustomEmoji,
    Mention,
    Url,
    Hashtag,
    Cashtag,
}

impl EntityType {
    pub const ALL: [EntityType; 14] = [
        Self::Bold,
        Self::Italic,
        Self::Underline,
        Self::Strike,
        Self::Spoiler,
        Self::Code,
        Self::Pre,
        Self::Blockquote,
        Self::TextUrl,
        Self::CustomEmoji,
        Self::Mention,
        Self::Url,
        Self::Hashtag,
        Self::Cashtag,
    ];

    /// The string used in `data-entity-type` attributes and serialized entities.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::Underline => "underline",
            Self::Strike => "strike",
            Self::Spoiler => "spoiler",
            Self::Code => "code",
            Self::Pre => "pre",
            Self::Blockquote => "blockquote",
            Self::TextUrl => "textUrl",
            Self::CustomEmoji => "customEmoji",
            Self::Mention => "mention",
            Self::Url => "url",
            Self::Hashtag => "hashtag",
            Self::Cashtag => "cashtag",
        }
    }

    /// Pre and Blockquote own whole lines and get structural containers.
    pub fn is_block(self) -> bool {
        matches!(self, Self::Pre | Self::Blockquote)
    }

    /// Formats that are toggled with paired markers around inline content.
    pub fn is_inline_format(self) -> bool {
        matches!(
            self,
            Self::Bold | Self::Italic | Self::Underline | Self::Strike | Self::Spoiler | Self::Code
        )
    }

    /// Name of the single type-specific field, if the type has one.
    pub fn extra_key(self) -> Option<&'static str> {
        match self {
            Self::Pre => Some("language"),
            Self::TextUrl => Some("url"),
            Self::Blockquote => Some("collapsed"),
            Self::CustomEmoji => Some("documentId"),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = EntityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| EntityError::UnknownType(s.into()))
    }
}

/// Entity kind together with its type-specific payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EntityKind {
    Bold,
    Italic,
    Underline,
    Strike,
    Spoiler,
    Code,
    Pre {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<SmolStr>,
    },
    Blockquote {
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        collapsed: bool,
    },
    #[serde(rename_all = "camelCase")]
    TextUrl { url: String },
    #[serde(rename_all = "camelCase")]
    CustomEmoji { document_id: SmolStr },
    Mention,
    Url,
    Hashtag,
    Cashtag,
}

impl EntityKind {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Bold => EntityType::Bold,
            Self::Italic => EntityType::Italic,
            Self::Underline => EntityType::Underline,
            Self::Strike => EntityType::Strike,
            Self::Spoiler => EntityType::Spoiler,
            Self::Code => EntityType::Code,
            Self::Pre { .. } => EntityType::Pre,
            Self::Blockquote { .. } => EntityType::Blockquote,
            Self::TextUrl { .. } => EntityType::TextUrl,
            Self::CustomEmoji { .. } => EntityType::CustomEmoji,
            Self::Mention => EntityType::Mention,
            Self::Url => EntityType::Url,
            Self::Hashtag => EntityType::Hashtag,
            Self::Cashtag => EntityType::Cashtag,
        }
    }

    /// Kind for a type that carries no payload. Types with a required field
    /// (`TextUrl`, `CustomEmoji`) have no bare form.
    pub fn bare(ty: EntityType) -> Option<Self> {
        Some(match ty {
            EntityType::Bold => Self::Bold,
            EntityType::Italic => Self::Italic,
            EntityType::Underline => Self::Underline,
            EntityType::Strike => Self::Strike,
            EntityType::Spoiler => Self::Spoiler,
            EntityType::Code => Self::Code,
            EntityType::Pre => Self::Pre { language: None },
            EntityType::Blockquote => Self::Blockquote { collapsed: false },
            EntityType::Mention => Self::Mention,
            EntityType::Url => Self::Url,
            EntityType::Hashtag => Self::Hashtag,
            EntityType::Cashtag => Self::Cashtag,
            EntityType::TextUrl | EntityType::CustomEmoji => return None,
        })
    }

    /// Value of the field named by [`EntityType::extra_key`], as a string.
    pub fn extra_value(&self) -> Option<&str> {
        match self {
            Self::Pre { language } => language.as_deref(),
            Self::Blockquote { collapsed } => collapsed.then_some("true"),
            Self::TextUrl { url } => Some(url),
            Self::CustomEmoji { document_id } => Some(document_id),
            _ => None,
        }
    }
}

/// A typed annotation over `text[offset..offset + length]` (UTF-16 units).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(flatten)]
    pub kind: EntityKind,
    pub offset: usize,
    pub length: usize,
}

impl Entity {
    pub fn new(kind: EntityKind, offset: usize, length: usize) -> Self {
        Self {
            kind,
            offset,
            length,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        self.kind.entity_type()
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Ordering used for processing: ascending offset, block entities before
    /// inline ones, longer (enclosing) entities before shorter ones.
    pub(crate) fn processing_key(&self) -> (usize, bool, Reverse<usize>) {
        (
            self.offset,
            !self.entity_type().is_block(),
            Reverse(self.length),
        )
    }
}

/// Plain text with its formatting entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedText {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Entity>,
}

impl FormattedText {
    pub fn new(text: impl Into<String>, entities: Vec<Entity>) -> Self {
        Self {
            text: text.into(),
            entities,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.entities.is_empty()
    }

    pub fn len_utf16(&self) -> usize {
        utf16_len(&self.text)
    }

    /// Stable sort into processing order (see [`Entity::processing_key`]).
    pub fn sort_entities(&mut self) {
        self.entities.sort_by_key(Entity::processing_key);
    }

    /// First entity that reaches past the end of the text, if any.
    pub fn out_of_bounds_entity(&self) -> Option<&Entity> {
        let len = self.len_utf16();
        self.entities.iter().find(|e| e.end() > len)
    }
}

/// Collapse every whitespace run to a single space and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Semantic equality of formatted texts.
///
/// Text is compared after whitespace normalisation. Entities are compared
/// pairwise after sorting both sides by offset: same count, and per pair the
/// same type, offset, length and type-specific field.
pub fn are_formatted_texts_equal(a: Option<&FormattedText>, b: Option<&FormattedText>) -> bool {
    let (a, b) = match (a, b) {
        (None, None) => return true,
        (Some(a), Some(b)) => (a, b),
        _ => return false,
    };

    if normalize_whitespace(&a.text) != normalize_whitespace(&b.text) {
        return false;
    }
    if a.entities.len() != b.entities.len() {
        return false;
    }

    let mut ents_a: Vec<&Entity> = a.entities.iter().collect();
    let mut ents_b: Vec<&Entity> = b.entities.iter().collect();
    ents_a.sort_by_key(|e| (e.processing_key(), e.entity_type()));
    ents_b.sort_by_key(|e| (e.processing_key(), e.entity_type()));

    ents_a.iter().zip(ents_b.iter()).all(|(e, f)| {
        e.entity_type() == f.entity_type()
            && e.offset == f.offset
            && e.length == f.length
            && e.kind.extra_value() == f.kind.extra_value()
    })
}
