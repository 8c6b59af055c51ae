//! Document to Markdown and document to tokens.
//!
//! The Markdown pass feeds the live change detector: marker glyphs are plain
//! text to it, and block fences are read back from the document because the
//! user can delete them. The token pass builds the token tree directly for
//! extraction. Both normalise block boundaries the same way, so the two
//! extraction paths agree on every rendered document.

use composer_core::convert::tokens_to_formatted_text;
use composer_core::entity::{EntityType, FormattedText};
use composer_core::error::EntityError;
use composer_core::lexer::tokenize;
use composer_core::markers::{ALT_ATTR, CODE_HIGHLIGHT_CLASS, ENTITY_TYPE_ATTR, LANGUAGE_ATTR, QUOTE_TOGGLE_CLASS};
use composer_core::token::{Token, TokenKind};

use crate::blocks::{CodeBlockParts, QuoteParts};
use crate::dom::{Document, NodeData, NodeId};
use crate::html::{end_tag, start_tag};

/// Serialize the editor content into the composer's Markdown dialect.
pub fn html_to_markdown(doc: &Document, root: NodeId) -> String {
    let mut writer = MarkdownWriter::default();
    writer.children(doc, root);
    writer.out
}

/// Build the token tree of the editor content.
pub fn html_to_tokens(doc: &Document, root: NodeId) -> Vec<Token> {
    let mut walker = TokenWalker { at_line_start: true };
    let mut tokens = Vec::new();
    walker.children(doc, root, &mut tokens);
    tokens
}

/// Extract formatted text through the token tree.
pub fn html_to_formatted_text(doc: &Document, root: NodeId) -> Result<FormattedText, EntityError> {
    tokens_to_formatted_text(&html_to_tokens(doc, root))
}

/// Extract formatted text through the Markdown string.
pub fn markdown_to_formatted_text(markdown: &str) -> Result<FormattedText, EntityError> {
    tokens_to_formatted_text(&tokenize(markdown))
}

/// Decoration that never carries content.
fn is_overlay(doc: &Document, id: NodeId) -> bool {
    doc.has_class(id, CODE_HIGHLIGHT_CLASS) || doc.has_class(id, QUOTE_TOGGLE_CLASS)
}

/// Text of a subtree without marker glyphs, `<br>` as `\n`.
fn plain_text(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    push_plain(doc, id, &mut out);
    out
}

fn push_plain(doc: &Document, id: NodeId, out: &mut String) {
    match doc.data(id) {
        Some(NodeData::Text(text)) => out.push_str(text),
        Some(NodeData::Element(element)) => {
            if element.is_marker() || is_overlay(doc, id) {
                return;
            }
            if element.tag() == "br" {
                out.push('\n');
                return;
            }
            for &child in doc.children(id) {
                push_plain(doc, child, out);
            }
        }
        Some(NodeData::Raw(_)) | None => {}
    }
}

#[derive(Default)]
struct MarkdownWriter {
    out: String,
    /// A code block just closed; a newline goes before whatever follows.
    pending_newline: bool,
}

impl MarkdownWriter {
    fn push(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        if self.pending_newline {
            self.out.push('\n');
            self.pending_newline = false;
        }
        self.out.push_str(s);
    }

    fn ensure_line_start(&mut self) {
        if self.pending_newline {
            self.out.push('\n');
            self.pending_newline = false;
        } else if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn children(&mut self, doc: &Document, id: NodeId) {
        for &child in doc.children(id) {
            self.node(doc, child);
        }
    }

    fn node(&mut self, doc: &Document, id: NodeId) {
        let element = match doc.data(id) {
            Some(NodeData::Text(text)) => return self.push(text),
            Some(NodeData::Element(element)) => element,
            Some(NodeData::Raw(_)) | None => return,
        };
        if element.tag() == "br" {
            return self.push("\n");
        }
        if is_overlay(doc, id) {
            return;
        }

        match element.entity_type() {
            Some(EntityType::Pre) => self.code_block(doc, id),
            Some(EntityType::Blockquote) => {
                self.ensure_line_start();
                self.push(&start_tag(doc, id));
                let parts = QuoteParts::find(doc, id);
                self.children(doc, parts.container.unwrap_or(id));
                self.push(&end_tag(doc, id));
            }
            Some(EntityType::CustomEmoji) => {
                self.push(&start_tag(doc, id));
                self.push(element.attr(ALT_ATTR).unwrap_or_default());
                self.push(&end_tag(doc, id));
            }
            Some(
                EntityType::TextUrl
                | EntityType::Mention
                | EntityType::Url
                | EntityType::Hashtag
                | EntityType::Cashtag,
            ) => {
                self.push(&start_tag(doc, id));
                self.children(doc, id);
                self.push(&end_tag(doc, id));
            }
            // Inline formats and plain elements: markers are children and
            // come out as their glyphs.
            _ => self.children(doc, id),
        }
    }

    fn code_block(&mut self, doc: &Document, id: NodeId) {
        let parts = CodeBlockParts::find(doc, id);
        self.ensure_line_start();
        if let Some(header) = parts.header {
            let header = doc.text_content(header);
            self.push(&header);
            self.push("\n");
        }
        if let Some(content) = parts.content {
            self.push(&doc.text_content(content));
        }
        if let Some(footer) = parts.footer {
            let footer = doc.text_content(footer);
            self.push("\n");
            self.push(&footer);
            self.pending_newline = true;
        }
    }
}

struct TokenWalker {
    at_line_start: bool,
}

impl TokenWalker {
    fn text(&mut self, text: String, out: &mut Vec<Token>) {
        if text.is_empty() {
            return;
        }
        self.at_line_start = text.ends_with('\n');
        out.push(Token::text(text));
    }

    fn break_before_block(&mut self, out: &mut Vec<Token>) {
        if !self.at_line_start {
            out.push(Token::br());
            self.at_line_start = true;
        }
    }

    fn children(&mut self, doc: &Document, id: NodeId, out: &mut Vec<Token>) {
        for &child in doc.children(id) {
            self.node(doc, child, out);
        }
    }

    fn node(&mut self, doc: &Document, id: NodeId, out: &mut Vec<Token>) {
        let element = match doc.data(id) {
            Some(NodeData::Text(text)) => return self.text(text.clone(), out),
            Some(NodeData::Element(element)) => element,
            Some(NodeData::Raw(_)) | None => return,
        };
        if element.tag() == "br" {
            out.push(Token::br());
            self.at_line_start = true;
            return;
        }
        if element.is_marker() || is_overlay(doc, id) {
            return;
        }

        let Some(ty) = element.entity_type() else {
            return self.children(doc, id, out);
        };
        match ty {
            EntityType::Pre => self.code_block(doc, id, out),
            EntityType::Blockquote => {
                self.break_before_block(out);
                out.push(Token::html(start_tag(doc, id)));
                let parts = QuoteParts::find(doc, id);
                self.children(doc, parts.container.unwrap_or(id), out);
                out.push(Token::html(end_tag(doc, id)));
            }
            EntityType::CustomEmoji => {
                out.push(Token::html(start_tag(doc, id)));
                let alt = element.attr(ALT_ATTR).unwrap_or_default().to_string();
                self.text(alt, out);
                out.push(Token::html(end_tag(doc, id)));
            }
            EntityType::TextUrl
            | EntityType::Mention
            | EntityType::Url
            | EntityType::Hashtag
            | EntityType::Cashtag => {
                out.push(Token::html(start_tag(doc, id)));
                self.text(plain_text(doc, id), out);
                out.push(Token::html(end_tag(doc, id)));
            }
            EntityType::Code => {
                let text = plain_text(doc, id);
                if !text.is_empty() {
                    self.at_line_start = text.ends_with('\n');
                }
                out.push(Token::codespan(String::new(), text));
            }
            EntityType::Bold
            | EntityType::Italic
            | EntityType::Underline
            | EntityType::Strike
            | EntityType::Spoiler => {
                let mut children = Vec::new();
                self.children(doc, id, &mut children);
                out.push(Token::container(format_kind(ty), "", "", children));
            }
        }
    }

    fn code_block(&mut self, doc: &Document, id: NodeId, out: &mut Vec<Token>) {
        let parts = CodeBlockParts::find(doc, id);
        let content = parts
            .content
            .map(|c| doc.text_content(c))
            .unwrap_or_default();
        self.break_before_block(out);

        if !parts.is_intact() {
            let mut pieces = Vec::new();
            if let Some(header) = parts.header {
                pieces.push(doc.text_content(header));
            }
            pieces.push(content);
            if let Some(footer) = parts.footer {
                pieces.push(doc.text_content(footer));
            }
            return self.text(pieces.join("\n"), out);
        }

        let language = parts
            .language(doc)
            .filter(|lang| !lang.is_empty())
            .or_else(|| doc.attr(id, LANGUAGE_ATTR).map(str::to_string))
            .unwrap_or_default();
        out.push(Token::html(format!(
            "<pre {ENTITY_TYPE_ATTR}=\"{}\" {LANGUAGE_ATTR}=\"{}\">",
            EntityType::Pre.as_str(),
            html_escape::encode_double_quoted_attribute(&language)
        )));
        if !content.is_empty() {
            out.push(Token::text(content));
        }
        out.push(Token::html("</pre>"));
        self.at_line_start = true;
    }
}

fn format_kind(ty: EntityType) -> TokenKind {
    match ty {
        EntityType::Bold => TokenKind::Strong,
        EntityType::Italic => TokenKind::Em,
        EntityType::Underline => TokenKind::Underline,
        EntityType::Strike => TokenKind::Del,
        EntityType::Spoiler => TokenKind::Spoiler,
        _ => TokenKind::Text,
    }
}

#[cfg(test)]
mod tests {
    use composer_core::config::EditorConfig;
    use composer_core::entity::{Entity, EntityKind, are_formatted_texts_equal};

    use super::*;
    use crate::render::render_into;

    fn rendered(ft: &FormattedText) -> (Document, NodeId) {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        render_into(&mut doc, root, ft, &EditorConfig::default());
        (doc, root)
    }

    #[test]
    fn test_markdown_keeps_marker_glyphs() {
        let ft = FormattedText::new("Hello world!", vec![Entity::new(EntityKind::Bold, 6, 5)]);
        let (doc, root) = rendered(&ft);
        insta::assert_snapshot!(html_to_markdown(&doc, root), @"Hello **world**!");
    }

    #[test]
    fn test_markdown_code_block_separators() {
        let ft = FormattedText::new(
            "before\nint x;\nafter",
            vec![Entity::new(
                EntityKind::Pre {
                    language: Some("cpp".into()),
                },
                7,
                6,
            )],
        );
        let (doc, root) = rendered(&ft);
        insta::assert_snapshot!(html_to_markdown(&doc, root), @r"
        before
        ```cpp
        int x;
        ```

        after
        ");
    }

    #[test]
    fn test_markdown_link_as_markup() {
        let ft = FormattedText::new(
            "go here",
            vec![Entity::new(
                EntityKind::TextUrl {
                    url: "https://a.b/?x=1&y=2".into(),
                },
                3,
                4,
            )],
        );
        let (doc, root) = rendered(&ft);
        insta::assert_snapshot!(
            html_to_markdown(&doc, root),
            @r#"go <a class="text-entity-link" data-entity-type="textUrl" href="https://a.b/?x=1&amp;y=2">here</a>"#
        );
    }

    #[test]
    fn test_tokens_skip_markers() {
        let ft = FormattedText::new("Hello world!", vec![Entity::new(EntityKind::Bold, 6, 5)]);
        let (doc, root) = rendered(&ft);
        let tokens = html_to_tokens(&doc, root);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Text, TokenKind::Strong, TokenKind::Text]);
        assert_eq!(tokens[1].children()[0].text.as_deref(), Some("world"));
    }

    #[test]
    fn test_both_paths_agree() {
        let samples = [
            FormattedText::new("Hello world!", vec![Entity::new(EntityKind::Bold, 6, 5)]),
            FormattedText::new(
                "quote line\nnext\nafter",
                vec![
                    Entity::new(EntityKind::Blockquote { collapsed: true }, 0, 15),
                    Entity::new(EntityKind::Italic, 6, 4),
                ],
            ),
            FormattedText::new(
                "x 😀 @user",
                vec![
                    Entity::new(
                        EntityKind::CustomEmoji {
                            document_id: "99".into(),
                        },
                        2,
                        2,
                    ),
                    Entity::new(EntityKind::Mention, 5, 5),
                ],
            ),
        ];
        for ft in samples {
            let (doc, root) = rendered(&ft);
            let via_tokens = html_to_formatted_text(&doc, root).unwrap();
            let via_markdown = markdown_to_formatted_text(&html_to_markdown(&doc, root)).unwrap();
            assert!(are_formatted_texts_equal(Some(&ft), Some(&via_tokens)), "{via_tokens:?}");
            assert!(are_formatted_texts_equal(Some(&via_tokens), Some(&via_markdown)), "{via_markdown:?}");
        }
    }

    #[test]
    fn test_demoted_code_block_is_text() {
        let ft = FormattedText::new(
            "code",
            vec![Entity::new(EntityKind::Pre { language: None }, 0, 4)],
        );
        let (mut doc, root) = rendered(&ft);
        let block = doc.first_child(root).unwrap();
        let parts = CodeBlockParts::find(&doc, block);
        doc.remove(parts.header.unwrap());
        doc.remove(parts.footer.unwrap());

        let extracted = html_to_formatted_text(&doc, root).unwrap();
        assert_eq!(extracted, FormattedText::plain("code"));
    }
}
