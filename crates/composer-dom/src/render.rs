//! FormattedText to document nodes.
//!
//! A recursive descent over the sorted entities: each entity claims the
//! entities that start inside it as children, so block entities (sorted first
//! at a shared offset) end up outermost. Entities that overlap a sibling are
//! clipped to the enclosing range.

use std::ops::Range;

use composer_core::config::EditorConfig;
use composer_core::entity::{Entity, EntityKind, EntityType, FormattedText};
use composer_core::markers::{
    ALT_ATTR, CODE_CONTAINER_CLASS, CODE_CONTENT_CLASS, CODE_FENCE, CODE_FOOTER_CLASS,
    CODE_HEADER_CLASS, COLLAPSED_ATTR, DOCUMENT_ID_ATTR, ENTITY_TYPE_ATTR, HREF_ATTR,
    LANGUAGE_ATTR, MARKER_ATTR, MARKER_CLASS, MARKER_SHOW_CLASS, QUOTE_CONTAINER_CLASS,
    QUOTE_TOGGLE_CLASS, inline_marker,
};
use composer_core::text::Utf16Text;

use crate::caret::{caret_offset, set_caret_offset};
use crate::dom::{Document, NodeId};
use crate::highlight::create_overlay;

pub const CODE_BLOCK_CLASS: &str = "CodeBlock";
pub const CODE_LANGUAGE_CLASS: &str = "code-language";
pub const QUOTE_BLOCK_CLASS: &str = "Blockquote";
pub const LINK_CLASS: &str = "text-entity-link";
pub const CUSTOM_EMOJI_CLASS: &str = "custom-emoji";
pub const SPOILER_CLASS: &str = "spoiler";

/// Tag and class of the element rendered for an inline format.
pub fn format_tag(ty: EntityType) -> Option<(&'static str, Option<&'static str>)> {
    Some(match ty {
        EntityType::Bold => ("strong", None),
        EntityType::Italic => ("em", None),
        EntityType::Underline => ("ins", None),
        EntityType::Strike => ("del", None),
        EntityType::Spoiler => ("span", Some(SPOILER_CLASS)),
        EntityType::Code => ("code", None),
        _ => return None,
    })
}

/// Render formatted text as children of `parent`.
pub fn render_into(doc: &mut Document, parent: NodeId, ft: &FormattedText, config: &EditorConfig) {
    let mut sorted = ft.clone();
    sorted.sort_entities();
    let text = Utf16Text::new(&ft.text);
    let len = text.len_utf16();

    let mut renderer = Renderer { doc, text, config };
    renderer.range(parent, &sorted.entities, 0..len);
}

/// Replace the contents of `root` with rendered formatted text, keeping the
/// caret at the same caret offset.
pub fn replace_content(doc: &mut Document, root: NodeId, ft: &FormattedText, config: &EditorConfig) {
    let caret = doc
        .selection()
        .filter(|r| doc.contains(root, r.end.node))
        .and_then(|_| caret_offset(doc, root));

    doc.clear_children(root);
    render_into(doc, root, ft, config);
    if let Some(offset) = caret {
        set_caret_offset(doc, root, offset);
    }

    tracing::trace!(
        target: "composer::render",
        len = ft.len_utf16(),
        entities = ft.entities.len(),
        ?caret,
        "replaced content"
    );
}

struct Renderer<'a> {
    doc: &'a mut Document,
    text: Utf16Text,
    config: &'a EditorConfig,
}

impl Renderer<'_> {
    fn range(&mut self, parent: NodeId, entities: &[Entity], range: Range<usize>) {
        let mut pos = range.start;
        let mut i = 0;
        while i < entities.len() {
            let entity = &entities[i];
            let start = entity.offset.clamp(pos, range.end);
            let end = entity.end().min(range.end).max(start);

            let mut j = i + 1;
            while j < entities.len() && entities[j].offset < end {
                j += 1;
            }

            if start < end || entity.entity_type().is_block() {
                self.text_run(parent, pos..start);
                self.entity(parent, entity, &entities[i + 1..j], start..end);
                pos = end;
            }
            i = j;
        }
        self.text_run(parent, pos..range.end);
    }

    /// Plain text, with newlines as `<br>`.
    fn text_run(&mut self, parent: NodeId, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let slice = self.text.slice(range);
        for (idx, piece) in slice.split('\n').enumerate() {
            if idx > 0 {
                let br = self.doc.create_element("br");
                self.doc.append_child(parent, br);
            }
            if !piece.is_empty() {
                let text = self.doc.create_text(piece);
                self.doc.append_child(parent, text);
            }
        }
    }

    fn entity(&mut self, parent: NodeId, entity: &Entity, nested: &[Entity], range: Range<usize>) {
        let ty = entity.entity_type();
        match &entity.kind {
            EntityKind::Pre { language } => {
                let code = self.text.slice(range);
                self.code_block(parent, language.as_deref().unwrap_or_default(), &code);
            }
            EntityKind::Blockquote { collapsed } => {
                self.blockquote(parent, *collapsed, nested, range);
            }
            EntityKind::CustomEmoji { document_id } => {
                let alt = self.text.slice(range);
                let img = self.doc.create_element_with(
                    "img",
                    &[
                        ("class", CUSTOM_EMOJI_CLASS),
                        (ENTITY_TYPE_ATTR, ty.as_str()),
                        (DOCUMENT_ID_ATTR, document_id.as_str()),
                        (ALT_ATTR, alt.as_str()),
                        ("alt", alt.as_str()),
                        ("contenteditable", "false"),
                    ],
                );
                self.doc.append_child(parent, img);
            }
            EntityKind::TextUrl { url } => {
                self.link(parent, ty, Some(url.as_str()), nested, range);
            }
            EntityKind::Url => {
                let href = self.text.slice(range.clone());
                self.link(parent, ty, Some(href.as_str()), nested, range);
            }
            EntityKind::Mention | EntityKind::Hashtag | EntityKind::Cashtag => {
                self.link(parent, ty, None, nested, range);
            }
            EntityKind::Bold
            | EntityKind::Italic
            | EntityKind::Underline
            | EntityKind::Strike
            | EntityKind::Spoiler
            | EntityKind::Code => self.format(parent, ty, nested, range),
        }
    }

    fn format(&mut self, parent: NodeId, ty: EntityType, nested: &[Entity], range: Range<usize>) {
        let (Some((tag, class)), Some(marker)) = (format_tag(ty), inline_marker(ty)) else {
            return;
        };
        let element = match class {
            Some(class) => self
                .doc
                .create_element_with(tag, &[("class", class), (ENTITY_TYPE_ATTR, ty.as_str())]),
            None => self.doc.create_element_with(tag, &[(ENTITY_TYPE_ATTR, ty.as_str())]),
        };
        self.doc.append_child(parent, element);

        let open = marker_span(self.doc, marker, false);
        self.doc.append_child(element, open);
        self.range(element, nested, range);
        let close = marker_span(self.doc, marker, false);
        self.doc.append_child(element, close);
    }

    fn link(
        &mut self,
        parent: NodeId,
        ty: EntityType,
        href: Option<&str>,
        nested: &[Entity],
        range: Range<usize>,
    ) {
        let mut attrs = vec![("class", LINK_CLASS), (ENTITY_TYPE_ATTR, ty.as_str())];
        if let Some(href) = href {
            attrs.push((HREF_ATTR, href));
        }
        let element = self.doc.create_element_with("a", &attrs);
        self.doc.append_child(parent, element);
        self.range(element, nested, range);
    }

    fn code_block(&mut self, parent: NodeId, language: &str, code: &str) {
        let doc = &mut *self.doc;
        let block = doc.create_element_with(
            "div",
            &[
                ("class", CODE_BLOCK_CLASS),
                (ENTITY_TYPE_ATTR, EntityType::Pre.as_str()),
                (LANGUAGE_ATTR, language),
                ("contenteditable", "false"),
            ],
        );
        doc.append_child(parent, block);

        let header = doc.create_element_with(
            "div",
            &[("class", CODE_HEADER_CLASS), ("contenteditable", "true")],
        );
        let open = marker_span(doc, CODE_FENCE, true);
        let lang = doc.create_element_with("span", &[("class", CODE_LANGUAGE_CLASS)]);
        if !language.is_empty() {
            let text = doc.create_text(language);
            doc.append_child(lang, text);
        }
        doc.append_child(header, open);
        doc.append_child(header, lang);
        doc.append_child(block, header);

        let container = doc.create_element_with("div", &[("class", CODE_CONTAINER_CLASS)]);
        if let Some(overlay) = create_overlay(doc, code, language) {
            doc.append_child(container, overlay);
        }
        let content = doc.create_element_with(
            "pre",
            &[("class", CODE_CONTENT_CLASS), ("contenteditable", "true")],
        );
        if !code.is_empty() {
            let text = doc.create_text(code);
            doc.append_child(content, text);
        }
        doc.append_child(container, content);
        doc.append_child(block, container);

        let footer = doc.create_element_with(
            "div",
            &[("class", CODE_FOOTER_CLASS), ("contenteditable", "true")],
        );
        let close = marker_span(doc, CODE_FENCE, true);
        doc.append_child(footer, close);
        doc.append_child(block, footer);
    }

    fn blockquote(&mut self, parent: NodeId, collapsed: bool, nested: &[Entity], range: Range<usize>) {
        let lines = self.text.slice(range.clone()).matches('\n').count() + 1;

        let block = self.doc.create_element_with(
            "span",
            &[
                ("class", QUOTE_BLOCK_CLASS),
                (ENTITY_TYPE_ATTR, EntityType::Blockquote.as_str()),
                (COLLAPSED_ATTR, if collapsed { "true" } else { "false" }),
            ],
        );
        self.doc.append_child(parent, block);
        let quote = self.doc.create_element("blockquote");
        self.doc.append_child(block, quote);
        let container = self
            .doc
            .create_element_with("div", &[("class", QUOTE_CONTAINER_CLASS)]);
        self.doc.append_child(quote, container);
        self.range(container, nested, range);

        if lines > self.config.blockquote_collapse_lines {
            let toggle = self.doc.create_element_with(
                "div",
                &[("class", QUOTE_TOGGLE_CLASS), ("contenteditable", "false")],
            );
            self.doc.append_child(quote, toggle);
        }
    }
}

/// A marker decoration span holding its glyphs. Fence markers are fixed and
/// always shown; inline markers are editable and shown near the caret.
pub fn marker_span(doc: &mut Document, glyphs: &str, fence: bool) -> NodeId {
    let span = if fence {
        let class = format!("{MARKER_CLASS} {MARKER_SHOW_CLASS}");
        doc.create_element_with(
            "span",
            &[
                ("class", class.as_str()),
                (MARKER_ATTR, "true"),
                ("contenteditable", "false"),
            ],
        )
    } else {
        doc.create_element_with("span", &[("class", MARKER_CLASS), (MARKER_ATTR, "true")])
    };
    let text = doc.create_text(glyphs);
    doc.append_child(span, text);
    span
}
