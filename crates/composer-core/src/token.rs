//! Token tree produced by the lexer and by the DOM token walk.

use smol_str::SmolStr;

/// Token kinds of the composer's Markdown dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Text,
    Br,
    Escape,
    Strong,
    Em,
    Del,
    Underline,
    Spoiler,
    Codespan,
    Code,
    Link,
    Blockquote,
    /// Entity-carrying markup tag, paired open/close by the converter.
    Html,
    Paragraph,
    Space,
}

/// A node of the token tree.
///
/// `tokens` is `Some` exactly for kinds that own children; whether it is
/// present takes part in structural comparison even when the list is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source slice the token was lexed from.
    pub raw: String,
    /// Decoded content, for kinds that have one.
    pub text: Option<String>,
    pub tokens: Option<Vec<Token>>,
    pub lang: Option<SmolStr>,
    pub href: Option<String>,
}

impl Token {
    fn new(kind: TokenKind, raw: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
            text: None,
            tokens: None,
            lang: None,
            href: None,
        }
    }

    pub fn text(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            text: Some(raw.clone()),
            ..Self::new(TokenKind::Text, raw)
        }
    }

    pub fn br() -> Self {
        Self::new(TokenKind::Br, "\n")
    }

    pub fn space(raw: impl Into<String>) -> Self {
        Self::new(TokenKind::Space, raw)
    }

    pub fn escape(raw: impl Into<String>, ch: char) -> Self {
        Self {
            text: Some(ch.to_string()),
            ..Self::new(TokenKind::Escape, raw)
        }
    }

    pub fn html(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            text: Some(raw.clone()),
            ..Self::new(TokenKind::Html, raw)
        }
    }

    /// A token with decoded text and child tokens (emphasis-like kinds,
    /// paragraphs, blockquotes, generic containers).
    pub fn container(
        kind: TokenKind,
        raw: impl Into<String>,
        text: impl Into<String>,
        tokens: Vec<Token>,
    ) -> Self {
        Self {
            text: Some(text.into()),
            tokens: Some(tokens),
            ..Self::new(kind, raw)
        }
    }

    pub fn codespan(raw: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new(TokenKind::Codespan, raw)
        }
    }

    pub fn code(raw: impl Into<String>, text: impl Into<String>, lang: Option<SmolStr>) -> Self {
        Self {
            text: Some(text.into()),
            lang,
            ..Self::new(TokenKind::Code, raw)
        }
    }

    pub fn link(
        raw: impl Into<String>,
        text: impl Into<String>,
        href: impl Into<String>,
        tokens: Vec<Token>,
    ) -> Self {
        Self {
            href: Some(href.into()),
            ..Self::container(TokenKind::Link, raw, text, tokens)
        }
    }

    pub fn has_children(&self) -> bool {
        self.tokens.is_some()
    }

    pub fn children(&self) -> &[Token] {
        self.tokens.as_deref().unwrap_or_default()
    }

    /// Whether this is a closing markup tag (`</...>`).
    pub fn is_closing_tag(&self) -> bool {
        self.kind == TokenKind::Html && self.raw.starts_with("</")
    }
}

/// Structural equality: same length at every level, same kinds pairwise and
/// same presence of children, recursively. Text content is ignored.
pub fn is_structure_equal(a: &[Token], b: &[Token]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.kind == y.kind
                && x.has_children() == y.has_children()
                && is_structure_equal(x.children(), y.children())
        })
}

/// Whether the token tree shape differs between two tokenizations.
pub fn has_structure_changed(old: &[Token], new: &[Token]) -> bool {
    !is_structure_equal(old, new)
}
