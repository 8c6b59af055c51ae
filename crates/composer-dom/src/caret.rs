//! Caret offsets and line introspection.
//!
//! Offsets are counted in caret units: text contributes its UTF-16 length,
//! `<br>` and custom emoji count as one unit each, and the syntax-highlight
//! overlay counts as nothing. Marker glyphs are text and count like text.

use composer_core::entity::EntityType;
use composer_core::text::{Utf16Text, utf16_floor, utf16_len};

use crate::dom::{Document, NodeData, NodeId, Position};

/// Stand-in unit for an atomic inline object (custom emoji).
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

/// Whether a node occupies exactly one caret unit and has no inner positions.
pub fn is_atomic(doc: &Document, id: NodeId) -> bool {
    doc.is_tag(id, "br") || doc.entity_type(id) == Some(EntityType::CustomEmoji)
}

/// Caret units a node spans.
pub fn node_units(doc: &Document, id: NodeId) -> usize {
    match doc.data(id) {
        Some(NodeData::Text(text)) => utf16_len(text),
        Some(NodeData::Element(_)) if is_atomic(doc, id) => 1,
        Some(NodeData::Element(_)) => doc.children(id).iter().map(|&c| node_units(doc, c)).sum(),
        Some(NodeData::Raw(_)) | None => 0,
    }
}

/// The content of a subtree as a string with one char per caret unit:
/// `<br>` becomes `\n` and custom emoji become U+FFFC.
pub fn unit_text(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    push_units(doc, id, &mut out);
    out
}

fn push_units(doc: &Document, id: NodeId, out: &mut String) {
    match doc.data(id) {
        Some(NodeData::Text(text)) => out.push_str(text),
        Some(NodeData::Element(_)) if doc.is_tag(id, "br") => out.push('\n'),
        Some(NodeData::Element(_)) if is_atomic(doc, id) => out.push(OBJECT_REPLACEMENT),
        Some(NodeData::Element(_)) => {
            for &child in doc.children(id) {
                push_units(doc, child, out);
            }
        }
        Some(NodeData::Raw(_)) | None => {}
    }
}

/// Units between the start of `root` and a boundary point.
///
/// Points outside `root` clamp to its start or end by document order.
pub fn offset_of(doc: &Document, root: NodeId, pos: Position) -> usize {
    if !doc.contains(root, pos.node) {
        let root_start = Position::new(root, 0);
        return match doc.compare_positions(pos, root_start) {
            std::cmp::Ordering::Greater => node_units(doc, root),
            _ => 0,
        };
    }

    let inner = match doc.data(pos.node) {
        Some(NodeData::Text(text)) => pos.offset.min(utf16_len(text)),
        _ if is_atomic(doc, pos.node) => pos.offset.min(1),
        _ => doc
            .children(pos.node)
            .iter()
            .take(pos.offset)
            .map(|&c| node_units(doc, c))
            .sum(),
    };
    inner + units_before(doc, root, pos.node)
}

/// Units of everything in `root` that precedes `node` in document order,
/// excluding `node`'s own ancestors.
fn units_before(doc: &Document, root: NodeId, node: NodeId) -> usize {
    let mut total = 0;
    let mut current = node;
    while current != root {
        let (Some(parent), Some(idx)) = (doc.parent(current), doc.index_of(current)) else {
            break;
        };
        total += doc.children(parent)[..idx]
            .iter()
            .map(|&c| node_units(doc, c))
            .sum::<usize>();
        current = parent;
    }
    total
}

/// Caret offset of the selection end within `root`.
pub fn caret_offset(doc: &Document, root: NodeId) -> Option<usize> {
    let range = doc.selection()?;
    Some(offset_of(doc, root, range.end))
}

/// Boundary point for a caret offset within `root`.
///
/// Offsets at a text boundary resolve into the earlier text node; offsets
/// inside a surrogate pair snap to the start of that character; offsets
/// past the end resolve to the end of `root`.
pub fn position_at(doc: &Document, root: NodeId, offset: usize) -> Position {
    let mut consumed = 0;
    locate(doc, root, offset, &mut consumed)
        .unwrap_or_else(|| Position::new(root, doc.child_count(root)))
}

fn locate(doc: &Document, element: NodeId, offset: usize, consumed: &mut usize) -> Option<Position> {
    for (idx, &child) in doc.children(element).iter().enumerate() {
        match doc.data(child) {
            Some(NodeData::Text(text)) => {
                let len = utf16_len(text);
                if offset <= *consumed + len {
                    return Some(Position::new(child, utf16_floor(text, offset - *consumed)));
                }
                *consumed += len;
            }
            Some(NodeData::Element(_)) if is_atomic(doc, child) => {
                if offset <= *consumed {
                    return Some(Position::new(element, idx));
                }
                if offset == *consumed + 1 {
                    return Some(Position::new(element, idx + 1));
                }
                *consumed += 1;
            }
            Some(NodeData::Element(_)) => {
                if let Some(pos) = locate(doc, child, offset, consumed) {
                    return Some(pos);
                }
            }
            Some(NodeData::Raw(_)) | None => {}
        }
    }
    None
}

/// Collapse the selection to a caret offset within `root`.
pub fn set_caret_offset(doc: &mut Document, root: NodeId, offset: usize) {
    let pos = position_at(doc, root, offset);
    doc.set_caret(pos);
}

/// Where the caret sits among the lines of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInfo {
    pub lines: Vec<String>,
    pub line_index: usize,
    /// Caret offset within its line.
    pub offset_in_line: usize,
    pub is_first_line: bool,
    pub is_last_line: bool,
    pub is_third_line: bool,
    /// Lines 0 and 1 exist and are empty.
    pub two_first_empty: bool,
    /// The last two lines exist and are empty.
    pub two_last_empty: bool,
    pub is_line_start: bool,
    pub current_line_empty: bool,
}

/// Line info for the selection start inside `container`.
pub fn line_info(doc: &Document, container: NodeId) -> Option<LineInfo> {
    let range = doc.selection()?;
    let offset = offset_of(doc, container, range.start);
    Some(line_info_at(&unit_text(doc, container), offset))
}

/// Line info for an offset into a unit string.
pub fn line_info_at(units: &str, offset: usize) -> LineInfo {
    let text = Utf16Text::new(units);
    let (line_index, offset_in_line) = text.line_of(offset);
    let lines = text.lines();
    let empty = |idx: usize| lines.get(idx).is_some_and(|l| l.is_empty());
    let count = lines.len();

    LineInfo {
        line_index,
        offset_in_line,
        is_first_line: line_index == 0,
        is_last_line: line_index + 1 == count,
        is_third_line: line_index == 2,
        two_first_empty: count >= 2 && empty(0) && empty(1),
        two_last_empty: count >= 2 && empty(count - 1) && empty(count - 2),
        is_line_start: offset_in_line == 0,
        current_line_empty: empty(line_index),
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `<div>ab<br><img emoji>c<strong>de</strong></div>`
    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        let ab = doc.create_text("ab");
        let br = doc.create_element("br");
        let emoji = doc.create_element_with(
            "img",
            &[("data-entity-type", "customEmoji"), ("contenteditable", "false")],
        );
        let c = doc.create_text("c");
        let strong = doc.create_element("strong");
        let de = doc.create_text("de");
        for child in [ab, br, emoji, c, strong] {
            doc.append_child(root, child);
        }
        doc.append_child(strong, de);
        (doc, root, ab, de)
    }

    #[test]
    fn test_unit_text_counts_atomics_once() {
        let (doc, root, _, _) = sample();
        assert_eq!(unit_text(&doc, root), "ab\n\u{FFFC}cde");
        assert_eq!(node_units(&doc, root), 7);
    }

    #[test]
    fn test_offset_round_trip() {
        let (mut doc, root, ab, de) = sample();
        for offset in 0..=7 {
            set_caret_offset(&mut doc, root, offset);
            assert_eq!(caret_offset(&doc, root), Some(offset), "offset {offset}");
        }
        set_caret_offset(&mut doc, root, 1);
        assert_eq!(doc.selection().unwrap().start, Position::new(ab, 1));
        set_caret_offset(&mut doc, root, 7);
        assert_eq!(doc.selection().unwrap().start, Position::new(de, 2));
    }

    #[test]
    fn test_offset_past_end_clamps() {
        let (mut doc, root, _, _) = sample();
        set_caret_offset(&mut doc, root, 99);
        assert_eq!(caret_offset(&doc, root), Some(7));
    }

    #[test]
    fn test_offset_inside_surrogate_pair_snaps_back() {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        let text = doc.create_text("a😀b");
        doc.append_child(root, text);

        set_caret_offset(&mut doc, root, 2);
        assert_eq!(doc.selection().unwrap().start, Position::new(text, 1));
        set_caret_offset(&mut doc, root, 3);
        assert_eq!(caret_offset(&doc, root), Some(3));
    }

    #[test]
    fn test_line_info() {
        let info = line_info_at("\n\nthird", 2);
        assert_eq!(info.line_index, 2);
        assert!(info.is_third_line);
        assert!(info.two_first_empty);
        assert!(info.is_line_start);
        assert!(info.is_last_line);

        let info = line_info_at("text\n\n", 6);
        assert!(info.two_last_empty);
        assert!(info.current_line_empty);
        assert_eq!(info.lines, vec!["text", "", ""]);

        let info = line_info_at("", 0);
        assert!(info.is_first_line && info.is_last_line && info.current_line_empty);
    }
}
