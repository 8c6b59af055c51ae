//! Syntax-highlighted overlay for code blocks.
//!
//! The overlay is a non-editable `div.code-highlight` placed before the
//! editable `pre.code-content`, holding classed HTML as a raw node. It is
//! rebuilt from the content whenever the content changes.

use composer_core::markers::{CODE_HIGHLIGHT_CLASS, LANGUAGE_ATTR};

use crate::blocks::CodeBlockParts;
use crate::dom::{Document, NodeData, NodeId};

#[cfg(feature = "syntax-highlighting")]
mod imp {
    use std::sync::LazyLock;

    use syntect::html::{ClassStyle, ClassedHTMLGenerator};
    use syntect::parsing::SyntaxSet;
    use syntect::util::LinesWithEndings;

    static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

    pub fn highlight_code(code: &str, language: &str) -> Option<String> {
        if code.is_empty() || language.is_empty() {
            return None;
        }
        let syntax = SYNTAX_SET.find_syntax_by_token(language)?;
        let mut generator = ClassedHTMLGenerator::new_with_class_style(
            syntax,
            &SYNTAX_SET,
            ClassStyle::SpacedPrefixed { prefix: "hl-" },
        );
        for line in LinesWithEndings::from(code) {
            if let Err(err) = generator.parse_html_for_line_which_includes_newline(line) {
                tracing::debug!(target: "composer::render", %err, language, "highlight failed");
                return None;
            }
        }
        Some(generator.finalize())
    }
}

#[cfg(not(feature = "syntax-highlighting"))]
mod imp {
    pub fn highlight_code(_code: &str, _language: &str) -> Option<String> {
        None
    }
}

/// Classed HTML for code in a language, when the language is known.
pub use imp::highlight_code;

/// Build the overlay element for code, if it highlights.
pub fn create_overlay(doc: &mut Document, code: &str, language: &str) -> Option<NodeId> {
    let html = highlight_code(code, language)?;
    Some(overlay_element(doc, html))
}

fn overlay_element(doc: &mut Document, html: String) -> NodeId {
    let overlay = doc.create_element_with(
        "div",
        &[
            ("class", CODE_HIGHLIGHT_CLASS),
            ("contenteditable", "false"),
            ("aria-hidden", "true"),
        ],
    );
    let raw = doc.create_raw(html);
    doc.append_child(overlay, raw);
    overlay
}

/// Rebuild the overlay of a code block from its current content.
pub fn refresh_highlight(doc: &mut Document, block: NodeId) {
    let parts = CodeBlockParts::find(doc, block);
    let Some(container) = parts.container else {
        return;
    };
    let code = parts
        .content
        .map(|content| doc.text_content(content))
        .unwrap_or_default();
    let language = parts
        .language(doc)
        .or_else(|| doc.attr(block, LANGUAGE_ATTR).map(str::to_string))
        .unwrap_or_default();

    let html = highlight_code(&code, &language);
    let current = parts
        .highlight
        .and_then(|overlay| doc.first_child(overlay))
        .and_then(|raw| match doc.data(raw) {
            Some(NodeData::Raw(html)) => Some(html.as_str()),
            _ => None,
        });
    if current == html.as_deref() {
        return;
    }

    if let Some(old) = parts.highlight {
        doc.remove(old);
    }
    if let Some(overlay) = html.map(|html| overlay_element(doc, html)) {
        doc.insert_at(container, 0, overlay);
    }
}

#[cfg(all(test, feature = "syntax-highlighting"))]
mod tests {
    use super::*;

    #[test]
    fn test_known_language_highlights() {
        let html = highlight_code("int x;\n", "cpp").unwrap();
        assert!(html.contains("hl-"));
        assert!(html.contains("int"));
    }

    #[test]
    fn test_unknown_or_empty_language_does_not() {
        assert!(highlight_code("int x;", "").is_none());
        assert!(highlight_code("int x;", "no-such-language").is_none());
        assert!(highlight_code("", "cpp").is_none());
    }
}
