//! Formatting actions on the selection: toggling formats, inserting links and
//! showing markers near the caret.
//!
//! Turning a format on only inserts marker text. The live Markdown check
//! turns it into an entity on its next run.

use std::cmp::Ordering;

use composer_core::entity::EntityType;
use composer_core::markers::{ENTITY_TYPE_ATTR, FormattingType, HREF_ATTR, MARKER_SHOW_CLASS};
use composer_core::text::{Utf16Text, utf16_len};

use crate::blocks::{QuoteParts, topmost_block};
use crate::dom::{Document, DomRange, NodeId, Position};
use crate::execute::{delete_selection, editable_caret, insert_node_at};
use crate::render::LINK_CLASS;

/// Formats present in and applicable to the selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedTextInfo {
    pub available_formats: Vec<FormattingType>,
    pub active_formats: Vec<FormattingType>,
    /// Inline format elements the selection touches.
    pub elements: Vec<NodeId>,
}

pub fn selected_text_info(doc: &Document, root: NodeId) -> SelectedTextInfo {
    let elements = inline_entities_in_selection(doc, root);
    let block = doc
        .selection()
        .filter(|range| doc.contains(root, range.start.node))
        .and_then(|range| topmost_block(doc, root, range.start.node))
        .and_then(|block| doc.entity_type(block));

    let has = |ty: EntityType| elements.iter().any(|&el| doc.entity_type(el) == Some(ty));
    let mut active_formats: Vec<FormattingType> = FormattingType::INLINE
        .into_iter()
        .filter(|format| has(format.entity_type()))
        .collect();
    let mut available_formats = FormattingType::INLINE.to_vec();
    match block {
        Some(EntityType::Blockquote) => {
            active_formats.push(FormattingType::Blockquote);
            available_formats.push(FormattingType::Blockquote);
        }
        None => available_formats.push(FormattingType::Blockquote),
        Some(_) => {}
    }

    SelectedTextInfo {
        available_formats,
        active_formats,
        elements,
    }
}

/// Inline format elements above every text node the selection intersects.
/// Empty for a collapsed selection.
pub fn inline_entities_in_selection(doc: &Document, root: NodeId) -> Vec<NodeId> {
    let Some(range) = doc.selection() else {
        return Vec::new();
    };
    if range.is_collapsed() || !doc.contains(root, range.start.node) {
        return Vec::new();
    }

    let mut found = Vec::new();
    for node in doc.descendants(root) {
        if !doc.is_text(node) || !intersects(doc, range, node) {
            continue;
        }
        for ancestor in doc.ancestors(node).take_while(|&n| n != root) {
            let is_format = doc
                .entity_type(ancestor)
                .is_some_and(EntityType::is_inline_format);
            if is_format && !found.contains(&ancestor) {
                found.push(ancestor);
            }
        }
    }
    found
}

fn intersects(doc: &Document, range: DomRange, node: NodeId) -> bool {
    let (Some(before), Some(after)) = (doc.position_before(node), doc.position_after(node)) else {
        return false;
    };
    doc.compare_positions(before, range.end) == Ordering::Less
        && doc.compare_positions(after, range.start) == Ordering::Greater
}

/// Toggle a format on the selection. Returns whether anything changed.
pub fn apply_format(doc: &mut Document, root: NodeId, format: FormattingType) -> bool {
    let info = selected_text_info(doc, root);
    if !info.available_formats.contains(&format) {
        return false;
    }

    if info.active_formats.contains(&format) {
        if format == FormattingType::Blockquote {
            return unwrap_quote(doc, root);
        }
        let ty = format.entity_type();
        for element in info.elements {
            if doc.exists(element) && doc.entity_type(element) == Some(ty) {
                doc.unwrap(element, Document::is_marker);
            }
        }
        return true;
    }

    let Some(marker) = format.marker() else {
        return false;
    };
    if format == FormattingType::Blockquote {
        add_text_around_selection(doc, &format!("{marker} "), "")
    } else {
        add_text_around_selection(doc, marker, marker)
    }
}

/// Dissolve the quote around the selection start into its content.
fn unwrap_quote(doc: &mut Document, root: NodeId) -> bool {
    let Some(range) = doc.selection() else {
        return false;
    };
    let Some(block) = topmost_block(doc, root, range.start.node)
        .filter(|&block| doc.entity_type(block) == Some(EntityType::Blockquote))
    else {
        return false;
    };
    let parts = QuoteParts::find(doc, block);
    let Some(container) = parts.container else {
        return false;
    };

    if let Some(toggle) = parts.toggle {
        doc.remove(toggle);
    }
    doc.unwrap(container, |_, _| false);
    if let Some(quote) = parts.quote {
        doc.unwrap(quote, |_, _| false);
    }
    doc.unwrap(block, |_, _| false);
    true
}

/// Insert text at both ends of the selection, keeping the original content
/// selected.
fn add_text_around_selection(doc: &mut Document, start: &str, end: &str) -> bool {
    let Some(range) = doc.selection() else {
        return false;
    };
    insert_text_at(doc, range.end, end);
    let content_start = insert_text_at(doc, range.start, start);

    if range.is_collapsed() {
        doc.set_caret(content_start);
    } else if let Some(current) = doc.selection() {
        doc.set_selection(Some(DomRange {
            start: content_start,
            end: current.end,
        }));
    }
    true
}

/// Insert text at a boundary point, returning the point after it.
fn insert_text_at(doc: &mut Document, pos: Position, text: &str) -> Position {
    if text.is_empty() {
        return pos;
    }
    let len = utf16_len(text);
    if doc.is_text(pos.node) {
        doc.insert_text(pos.node, pos.offset, text);
        return Position::new(pos.node, pos.offset + len);
    }
    let node = doc.create_text(text);
    doc.insert_at(pos.node, pos.offset, node);
    Position::new(node, len)
}

/// Prefix `https://` to URLs without a scheme. `None` for blank input.
pub fn ensure_protocol(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    let has_scheme = url.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    });
    if has_scheme || url.starts_with("mailto:") || url.starts_with("tel:") {
        Some(url.to_string())
    } else {
        Some(format!("https://{url}"))
    }
}

/// Link the selection to `url`, or retarget the link the selection sits in.
/// A collapsed selection inserts the URL itself as link text.
pub fn insert_link(doc: &mut Document, root: NodeId, url: &str) -> bool {
    let Some(href) = ensure_protocol(url) else {
        return false;
    };
    let Some(range) = doc.selection() else {
        return false;
    };
    if !doc.contains(root, range.start.node) {
        return false;
    }

    let existing = doc
        .ancestors(range.start.node)
        .take_while(|&n| n != root)
        .find(|&n| {
            doc.has_class(n, LINK_CLASS)
                && matches!(
                    doc.entity_type(n),
                    Some(EntityType::TextUrl | EntityType::Url)
                )
        });
    if let Some(link) = existing {
        doc.set_attr(link, ENTITY_TYPE_ATTR, EntityType::TextUrl.as_str());
        doc.set_attr(link, HREF_ATTR, &href);
        return true;
    }

    let selected = selected_text(doc, root, range);
    let text = if selected.is_empty() { href.clone() } else { selected };
    delete_selection(doc);
    let Some(pos) = editable_caret(doc, root) else {
        return false;
    };

    let link = doc.create_element_with(
        "a",
        &[
            ("class", LINK_CLASS),
            (ENTITY_TYPE_ATTR, EntityType::TextUrl.as_str()),
            (HREF_ATTR, href.as_str()),
        ],
    );
    let content = doc.create_text(text);
    doc.append_child(link, content);
    insert_node_at(doc, pos, link);
    if let Some(after) = doc.position_after(link) {
        doc.set_caret(after);
    }
    true
}

/// Text content of a range, without marker glyphs.
fn selected_text(doc: &Document, root: NodeId, range: DomRange) -> String {
    let mut out = String::new();
    for node in doc.descendants(root) {
        let Some(text) = doc.text(node) else {
            continue;
        };
        if !intersects(doc, range, node) || doc.ancestors(node).any(|n| doc.is_marker(n)) {
            continue;
        }
        let len = utf16_len(text);
        let start = if range.start.node == node { range.start.offset.min(len) } else { 0 };
        let end = if range.end.node == node { range.end.offset.clamp(start, len) } else { len };
        out.push_str(&Utf16Text::new(text).slice(start..end));
    }
    out
}

/// Show the markers of the inline entity at the caret and hide all others.
/// Fence markers are left alone.
pub fn update_marker_visibility(doc: &mut Document, root: NodeId) {
    for marker in doc.descendants(root) {
        if is_inline_marker(doc, marker) {
            doc.remove_class(marker, MARKER_SHOW_CLASS);
        }
    }

    let Some(range) = doc.selection() else {
        return;
    };
    if !doc.contains(root, range.start.node) {
        return;
    }
    let start = range.start.node;
    let scope = topmost_block(doc, root, start).unwrap_or(root);
    let entity = doc
        .ancestors(start)
        .take_while(|&n| n != scope)
        .filter(|&n| doc.entity_type(n).is_some_and(EntityType::is_inline_format))
        .last();
    let target = entity.or_else(|| {
        closest_element_to_caret(doc, range.start).filter(|&n| n != root && doc.contains(root, n))
    });
    let Some(target) = target else {
        return;
    };

    let mut nodes = vec![target];
    nodes.extend(doc.descendants(target));
    for node in nodes {
        if is_inline_marker(doc, node) {
            doc.add_class(node, MARKER_SHOW_CLASS);
        }
    }
}

fn is_inline_marker(doc: &Document, id: NodeId) -> bool {
    doc.is_marker(id) && doc.is_editable(id)
}

/// The element a caret touches from outside: the element right before or
/// after a caret at the edge of a text node, or the caret's element.
fn closest_element_to_caret(doc: &Document, pos: Position) -> Option<NodeId> {
    let is_element = |n: &NodeId| doc.element(*n).is_some();

    if doc.is_text(pos.node) {
        if pos.offset == 0 {
            let mut prev = doc.previous_sibling(pos.node);
            while let Some(node) = prev {
                if is_element(&node) {
                    return Some(node);
                }
                prev = doc.previous_sibling(node);
            }
        }
        if pos.offset == doc.node_length(pos.node) {
            let mut next = doc.next_sibling(pos.node);
            while let Some(node) = next {
                if is_element(&node) {
                    return Some(node);
                }
                next = doc.next_sibling(node);
            }
        }
        return None;
    }

    if pos.offset == 0 {
        return doc
            .previous_sibling(pos.node)
            .or(Some(pos.node))
            .filter(is_element);
    }
    Some(pos.node)
}
