//! Default input execution.
//!
//! What the browser does for a key the controller does not intercept:
//! insert text, insert a line break, delete backwards or forwards. Caret
//! positions inside non-editable decoration are moved out of it first, and
//! deletion steps over decoration instead of deleting into it.

use std::cmp::Ordering;

use composer_core::actions::InputType;
use composer_core::text::{utf16_floor, utf16_len};

use crate::caret::{is_atomic, offset_of};
use crate::dom::{Document, DomRange, NodeData, NodeId, Position};

const CONTENT_EDITABLE: &str = "contenteditable";

/// Apply an input to the document at its selection. Returns whether the
/// document changed.
pub fn execute_input(doc: &mut Document, root: NodeId, input: &InputType) -> bool {
    let Some(range) = doc.selection() else {
        return false;
    };
    if !doc.contains(root, range.start.node) || !doc.contains(root, range.end.node) {
        return false;
    }
    let revision = doc.revision();

    match input {
        InputType::InsertText(text) => {
            delete_selection(doc);
            insert_text_at_caret(doc, root, text);
        }
        InputType::InsertLineBreak => {
            delete_selection(doc);
            insert_line_break(doc, root);
        }
        InputType::DeleteContentBackward => {
            if !delete_selection(doc) {
                delete_adjacent(doc, root, Direction::Backward);
            }
        }
        InputType::DeleteContentForward => {
            if !delete_selection(doc) {
                delete_adjacent(doc, root, Direction::Forward);
            }
        }
    }

    let changed = doc.revision() != revision;
    tracing::trace!(target: "composer::controller", ?input, changed, "executed input");
    changed
}

/// Nearest region root that decides editability: an element carrying
/// `contenteditable="true"`, or the editor root.
pub fn editing_host(doc: &Document, root: NodeId, node: NodeId) -> NodeId {
    doc.ancestors(node)
        .take_while(|&n| n != root)
        .find(|&n| doc.attr(n, CONTENT_EDITABLE) == Some("true"))
        .unwrap_or(root)
}

/// The collapsed caret, moved out of any non-editable region it sits in.
pub fn editable_caret(doc: &Document, root: NodeId) -> Option<Position> {
    let mut pos = doc.selection()?.start;
    while !doc.is_editable(pos.node) {
        let Some(blocker) = doc
            .ancestors(pos.node)
            .take_while(|&n| n != root)
            .find(|&n| doc.attr(n, CONTENT_EDITABLE) == Some("false"))
        else {
            break;
        };
        let at_start = offset_of(doc, blocker, pos) == 0;
        pos = if at_start {
            doc.position_before(blocker)?
        } else {
            doc.position_after(blocker)?
        };
    }
    Some(pos)
}

/// Insert text at the caret, merging into an adjacent text node. The caret
/// ends up after the inserted text.
pub fn insert_text_at_caret(doc: &mut Document, root: NodeId, text: &str) {
    let Some(pos) = editable_caret(doc, root) else {
        return;
    };
    if text.is_empty() {
        return;
    }
    let len = utf16_len(text);

    if doc.is_text(pos.node) {
        doc.insert_text(pos.node, pos.offset, text);
        doc.set_caret(Position::new(pos.node, pos.offset + len));
        return;
    }

    let children = doc.children(pos.node);
    let before = pos.offset.checked_sub(1).and_then(|i| children.get(i)).copied();
    let after = children.get(pos.offset).copied();
    match (before, after) {
        (Some(prev), _) if doc.is_text(prev) => {
            let end = doc.node_length(prev);
            doc.insert_text(prev, end, text);
            doc.set_caret(Position::new(prev, end + len));
        }
        (_, Some(next)) if doc.is_text(next) => {
            doc.insert_text(next, 0, text);
            doc.set_caret(Position::new(next, len));
        }
        _ => {
            let node = doc.create_text(text);
            doc.insert_at(pos.node, pos.offset, node);
            doc.set_caret(Position::new(node, len));
        }
    }
}

/// Insert a `<br>` at the caret, or a newline character inside `pre`.
pub fn insert_line_break(doc: &mut Document, root: NodeId) {
    let Some(pos) = editable_caret(doc, root) else {
        return;
    };
    let in_pre = doc
        .ancestors(pos.node)
        .take_while(|&n| n != root)
        .any(|n| doc.is_tag(n, "pre"));
    if in_pre {
        doc.set_caret(pos);
        insert_text_at_caret(doc, root, "\n");
        return;
    }

    let br = doc.create_element("br");
    insert_node_at(doc, pos, br);
    if let Some(after) = doc.position_after(br) {
        doc.set_caret(after);
    }
}

/// Insert a node at a boundary point, splitting a text node when the point
/// is inside one.
pub fn insert_node_at(doc: &mut Document, pos: Position, node: NodeId) {
    if !doc.is_text(pos.node) {
        doc.insert_at(pos.node, pos.offset, node);
        return;
    }
    if pos.offset == 0 {
        doc.place_before(pos.node, node);
    } else if pos.offset >= doc.node_length(pos.node) {
        doc.place_after(pos.node, node);
    } else if let Some(tail) = doc.split_text(pos.node, pos.offset) {
        doc.place_before(tail, node);
    }
}

/// Delete the selected content if the selection is not collapsed, leaving
/// the caret at its start. Returns whether there was anything to delete.
pub fn delete_selection(doc: &mut Document) -> bool {
    match doc.selection() {
        Some(range) if !range.is_collapsed() => {
            delete_range(doc, range);
            true
        }
        _ => false,
    }
}

/// Delete everything between two boundary points.
pub fn delete_range(doc: &mut Document, range: DomRange) {
    doc.set_selection(Some(range));
    let Some(range) = doc.selection() else {
        return;
    };

    // Topmost nodes lying entirely inside the range.
    let common = common_ancestor(doc, range.start.node, range.end.node);
    let mut contained: Vec<NodeId> = Vec::new();
    for node in doc.descendants(common) {
        if contained.last().is_some_and(|&last| doc.contains(last, node)) {
            continue;
        }
        let (Some(before), Some(after)) = (doc.position_before(node), doc.position_after(node)) else {
            continue;
        };
        if doc.compare_positions(range.start, before) != Ordering::Greater
            && doc.compare_positions(after, range.end) != Ordering::Greater
        {
            contained.push(node);
        }
    }
    for node in contained {
        doc.remove(node);
    }

    let Some(range) = doc.selection() else {
        return;
    };
    let (start, end) = (range.start, range.end);
    if start.node == end.node {
        if doc.is_text(start.node) {
            doc.delete_text(start.node, start.offset..end.offset);
        }
    } else {
        if doc.is_text(end.node) {
            doc.delete_text(end.node, 0..end.offset);
        }
        if doc.is_text(start.node) {
            let len = doc.node_length(start.node);
            doc.delete_text(start.node, start.offset..len);
        }
    }

    let Some(range) = doc.selection() else {
        return;
    };
    doc.set_caret(range.start);
    for node in [end.node, start.node] {
        remove_if_empty_text(doc, node);
    }
}

fn common_ancestor(doc: &Document, a: NodeId, b: NodeId) -> NodeId {
    doc.ancestors(a)
        .find(|&n| doc.contains(n, b))
        .unwrap_or(a)
}

fn remove_if_empty_text(doc: &mut Document, node: NodeId) {
    if doc.text(node).is_some_and(str::is_empty) {
        doc.remove(node);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Backward,
    Forward,
}

/// Delete one character or atomic node next to a collapsed caret.
fn delete_adjacent(doc: &mut Document, root: NodeId, direction: Direction) {
    let Some(mut pos) = editable_caret(doc, root) else {
        return;
    };
    // A point set inside a surrogate pair counts as the start of that char.
    if let Some(text) = doc.text(pos.node) {
        pos.offset = utf16_floor(text, pos.offset);
    }
    doc.set_caret(pos);

    if let Some(text) = doc.text(pos.node) {
        let span = match direction {
            Direction::Backward if pos.offset > 0 => {
                Some(utf16_floor(text, pos.offset - 1)..pos.offset)
            }
            Direction::Forward if pos.offset < utf16_len(text) => {
                Some(pos.offset..pos.offset + char_len_at(text, pos.offset))
            }
            _ => None,
        };
        if let Some(span) = span {
            doc.delete_text(pos.node, span);
            remove_if_empty_text(doc, pos.node);
            return;
        }
    }

    let host = editing_host(doc, root, pos.node);
    let Some(leaf) = adjacent_leaf(doc, host, pos, direction) else {
        return;
    };
    match doc.text(leaf) {
        Some(text) => {
            let len = utf16_len(text);
            let span = match direction {
                Direction::Backward => utf16_floor(text, len.saturating_sub(1))..len,
                Direction::Forward => 0..char_len_at(text, 0),
            };
            doc.delete_text(leaf, span);
            remove_if_empty_text(doc, leaf);
        }
        None => doc.remove(leaf),
    }
}

/// The closest deletable leaf before or after a point, within an editing
/// host. Leaves under non-editable decoration are stepped over.
fn adjacent_leaf(doc: &Document, host: NodeId, pos: Position, direction: Direction) -> Option<NodeId> {
    let deletable = |leaf: NodeId| {
        let is_leaf = match doc.data(leaf) {
            Some(NodeData::Text(text)) => !text.is_empty(),
            Some(NodeData::Element(_)) => is_atomic(doc, leaf),
            _ => false,
        };
        is_leaf
            && doc.parent(leaf).is_some_and(|p| doc.is_editable(p))
            && editing_host(doc, host, leaf) == host
    };
    let leaves = doc.descendants(host).into_iter().filter(|&n| deletable(n));

    match direction {
        Direction::Backward => leaves
            .filter(|&leaf| {
                doc.position_after(leaf)
                    .is_some_and(|after| doc.compare_positions(after, pos) != Ordering::Greater)
            })
            .last(),
        Direction::Forward => leaves
            .filter(|&leaf| {
                doc.position_before(leaf)
                    .is_some_and(|before| doc.compare_positions(before, pos) != Ordering::Less)
            })
            .next(),
    }
}

/// UTF-16 length of the character starting at `offset`.
fn char_len_at(text: &str, offset: usize) -> usize {
    let mut units = 0;
    for ch in text.chars() {
        if units >= offset {
            return ch.len_utf16();
        }
        units += ch.len_utf16();
    }
    1
}
