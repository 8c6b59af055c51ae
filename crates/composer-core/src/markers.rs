//! Marker vocabulary and DOM conventions.
//!
//! Maps entity types to the Markdown delimiters of the composer dialect and
//! names the classes and data attributes that identify entities and marker
//! decorations in the editor tree. The bridge and the renderer both read from
//! here, so changing a value changes the wire format.

use crate::entity::EntityType;

/// `data-entity-type` on every entity-bearing element.
pub const ENTITY_TYPE_ATTR: &str = "data-entity-type";
pub const LANGUAGE_ATTR: &str = "data-language";
pub const COLLAPSED_ATTR: &str = "data-collapsed";
pub const DOCUMENT_ID_ATTR: &str = "data-document-id";
pub const ALT_ATTR: &str = "data-alt";
pub const HREF_ATTR: &str = "href";

/// Class shared by all marker decoration spans.
pub const MARKER_CLASS: &str = "markdown-marker";
/// Extra class that makes a marker visible.
pub const MARKER_SHOW_CLASS: &str = "show";
/// Attribute that tags marker decoration spans. Never combined with
/// [`ENTITY_TYPE_ATTR`].
pub const MARKER_ATTR: &str = "data-markdown-marker";

pub const CODE_HEADER_CLASS: &str = "code-header";
pub const CODE_FOOTER_CLASS: &str = "code-footer";
pub const CODE_CONTAINER_CLASS: &str = "code-container";
pub const CODE_CONTENT_CLASS: &str = "code-content";
pub const CODE_HIGHLIGHT_CLASS: &str = "code-highlight";
pub const QUOTE_CONTAINER_CLASS: &str = "container";
pub const QUOTE_TOGGLE_CLASS: &str = "collapse-toggle";

/// Fence that opens and closes a code block.
pub const CODE_FENCE: &str = "```";
/// Leading marker of a blockquote line.
pub const QUOTE_MARKER: &str = ">";

/// Delimiter pair for an inline format.
pub fn inline_marker(ty: EntityType) -> Option<&'static str> {
    match ty {
        EntityType::Bold => Some("**"),
        EntityType::Italic => Some("*"),
        EntityType::Underline => Some("__"),
        EntityType::Strike => Some("~~"),
        EntityType::Spoiler => Some("||"),
        EntityType::Code => Some("`"),
        _ => None,
    }
}

/// Block-level marker for a block entity.
pub fn block_marker(ty: EntityType) -> Option<&'static str> {
    match ty {
        EntityType::Pre => Some(CODE_FENCE),
        EntityType::Blockquote => Some(QUOTE_MARKER),
        _ => None,
    }
}

/// Marker for any type that has one, inline or block.
pub fn marker_for(ty: EntityType) -> Option<&'static str> {
    inline_marker(ty).or_else(|| block_marker(ty))
}

/// Formats the user can toggle on a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormattingType {
    Bold,
    Italic,
    Underline,
    Strike,
    Spoiler,
    Code,
    Blockquote,
}

impl FormattingType {
    pub const INLINE: [FormattingType; 6] = [
        Self::Bold,
        Self::Italic,
        Self::Underline,
        Self::Strike,
        Self::Spoiler,
        Self::Code,
    ];

    pub fn entity_type(self) -> EntityType {
        match self {
            Self::Bold => EntityType::Bold,
            Self::Italic => EntityType::Italic,
            Self::Underline => EntityType::Underline,
            Self::Strike => EntityType::Strike,
            Self::Spoiler => EntityType::Spoiler,
            Self::Code => EntityType::Code,
            Self::Blockquote => EntityType::Blockquote,
        }
    }

    pub fn from_entity_type(ty: EntityType) -> Option<Self> {
        match ty {
            EntityType::Bold => Some(Self::Bold),
            EntityType::Italic => Some(Self::Italic),
            EntityType::Underline => Some(Self::Underline),
            EntityType::Strike => Some(Self::Strike),
            EntityType::Spoiler => Some(Self::Spoiler),
            EntityType::Code => Some(Self::Code),
            EntityType::Blockquote => Some(Self::Blockquote),
            _ => None,
        }
    }

    pub fn marker(self) -> Option<&'static str> {
        marker_for(self.entity_type())
    }
}

/// How a typed marker character is auto-paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoInsert {
    /// Copies inserted on each side of the caret when pairing.
    pub each_side: usize,
}

/// Auto-pair rule for a typed character.
pub fn auto_insert_rule(ch: char) -> Option<AutoInsert> {
    let each_side = match ch {
        '*' => 1,
        '_' => 2,
        '~' => 2,
        '|' => 2,
        '`' => 1,
        _ => return None,
    };
    Some(AutoInsert { each_side })
}
