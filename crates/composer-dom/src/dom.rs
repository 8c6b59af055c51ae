//! Arena document tree standing in for the browser DOM.
//!
//! Nodes live in a `Vec` and are addressed by [`NodeId`]. Removed nodes leave
//! an empty slot, so an id never aliases a different node. The single
//! selection range is live: inserting, removing and editing nodes moves its
//! boundary points the way DOM live ranges move.

use std::cmp::Ordering;
use std::ops::Range;

use composer_core::entity::EntityType;
use composer_core::markers::{ENTITY_TYPE_ATTR, MARKER_ATTR};
use composer_core::text::{utf16_len, utf16_to_byte};
use smol_str::SmolStr;

const CONTENT_EDITABLE_ATTR: &str = "contenteditable";

/// Handle to a node in a [`Document`]. A handle to a removed node stays
/// dead even after its arena slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

/// An element: tag, attributes and the entity/marker classification derived
/// from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: SmolStr,
    attrs: Vec<(SmolStr, String)>,
    entity: Option<EntityType>,
    marker: bool,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: SmolStr::new(tag.to_ascii_lowercase()),
            attrs: Vec::new(),
            entity: None,
            marker: false,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attrs(&self) -> &[(SmolStr, String)] {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Entity type from `data-entity-type`, parsed when the attribute is set.
    pub fn entity_type(&self) -> Option<EntityType> {
        self.entity
    }

    /// Marker decoration span.
    pub fn is_marker(&self) -> bool {
        self.marker
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }

    /// Elements serialized without a closing tag.
    pub fn is_void(&self) -> bool {
        matches!(self.tag.as_str(), "br" | "img")
    }

    fn set_attr(&mut self, name: &str, value: &str) -> bool {
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) if existing == value => return false,
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attrs.push((SmolStr::new(name), value.to_string())),
        }
        self.refresh(name);
        true
    }

    fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|(key, _)| key != name);
        let changed = self.attrs.len() != before;
        if changed {
            self.refresh(name);
        }
        changed
    }

    fn refresh(&mut self, name: &str) {
        if name == ENTITY_TYPE_ATTR {
            self.entity = self.attr(ENTITY_TYPE_ATTR).and_then(|ty| ty.parse().ok());
        } else if name == MARKER_ATTR {
            self.marker = self.attr(MARKER_ATTR) == Some("true");
        }
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Text(String),
    Element(Element),
    /// Pre-rendered markup. Displayed and serialized verbatim, never edited,
    /// counted or extracted.
    Raw(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An arena entry; the generation is bumped each time the slot is reused.
#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// A boundary point: a UTF-16 offset in a text node, or a child index in an
/// element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A selection range. `start` never comes after `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomRange {
    pub start: Position,
    pub end: Position,
}

impl DomRange {
    pub fn caret(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// The node arena with its selection.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Slot>,
    /// Slots of removed nodes, reused by later allocations.
    free: Vec<usize>,
    selection: Option<DomRange>,
    revision: u64,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic counter bumped by every tree, text, attribute or selection
    /// independent mutation. Selection changes do not count.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let node = Node {
            data,
            parent: None,
            children: Vec::new(),
        };
        if let Some(index) = self.free.pop() {
            if let Some(slot) = self.nodes.get_mut(index) {
                slot.generation = slot.generation.wrapping_add(1);
                slot.node = Some(node);
                return NodeId {
                    index,
                    generation: slot.generation,
                };
            }
        }
        self.nodes.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index: self.nodes.len() - 1,
            generation: 0,
        }
    }

    /// Arena slots in use, live or free.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    // === Creation ===

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text(text.into()))
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element(Element::new(tag)))
    }

    /// Element with attributes, in order.
    pub fn create_element_with(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let mut element = Element::new(tag);
        for (name, value) in attrs {
            element.set_attr(name, value);
        }
        self.alloc(NodeData::Element(element))
    }

    pub fn create_raw(&mut self, html: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Raw(html.into()))
    }

    // === Inspection ===

    /// Whether the id refers to a live (not removed) node.
    pub fn exists(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.node(id).map(|n| &n.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.data(id)? {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Contents of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.data(id), Some(NodeData::Text(_)))
    }

    pub fn is_raw(&self, id: NodeId) -> bool {
        matches!(self.data(id), Some(NodeData::Raw(_)))
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::tag)
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_class(class))
    }

    pub fn entity_type(&self, id: NodeId) -> Option<EntityType> {
        self.element(id)?.entity_type()
    }

    pub fn is_marker(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(Element::is_marker)
    }

    /// Whether content at this node can be edited: the closest element with a
    /// `contenteditable` attribute decides, and the default is editable.
    pub fn is_editable(&self, id: NodeId) -> bool {
        self.ancestors(id)
            .find_map(|n| self.attr(n, CONTENT_EDITABLE_ATTR))
            .is_none_or(|value| value != "false")
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            Some(NodeData::Text(text)) => out.push_str(text),
            Some(NodeData::Element(_)) => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
            Some(NodeData::Raw(_)) | None => {}
        }
    }

    // === Navigation ===

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Index of a node among its parent's children.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_of(id)?;
        self.children(parent).get(idx + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_of(id)?;
        idx.checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// The node itself, then each ancestor up to the tree root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.exists(id).then_some(id),
        }
    }

    /// Descendants in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    /// Inclusive containment.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|n| n == ancestor)
    }

    /// Boundary point right before a node.
    pub fn position_before(&self, id: NodeId) -> Option<Position> {
        Some(Position::new(self.parent(id)?, self.index_of(id)?))
    }

    /// Boundary point right after a node.
    pub fn position_after(&self, id: NodeId) -> Option<Position> {
        Some(Position::new(self.parent(id)?, self.index_of(id)? + 1))
    }

    /// Length of a node as a boundary container: UTF-16 units for text,
    /// child count otherwise.
    pub fn node_length(&self, id: NodeId) -> usize {
        match self.data(id) {
            Some(NodeData::Text(text)) => utf16_len(text),
            _ => self.child_count(id),
        }
    }

    // === Ordering ===

    fn path(&self, id: NodeId) -> Vec<usize> {
        let mut path: Vec<usize> = self
            .ancestors(id)
            .filter_map(|n| self.index_of(n))
            .collect();
        path.reverse();
        path
    }

    /// Tree order of two nodes: ancestors come before their descendants.
    pub fn tree_order(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        self.path(a).cmp(&self.path(b))
    }

    /// Order of two boundary points.
    pub fn compare_positions(&self, a: Position, b: Position) -> Ordering {
        if a.node == b.node {
            return a.offset.cmp(&b.offset);
        }
        if let Some(child) = self.child_toward(a.node, b.node) {
            let idx = self.index_of(child).unwrap_or_default();
            return if idx < a.offset {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }
        if let Some(child) = self.child_toward(b.node, a.node) {
            let idx = self.index_of(child).unwrap_or_default();
            return if idx < b.offset {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
        self.tree_order(a.node, b.node)
    }

    /// The child of `ancestor` on the path down to `node`, when `ancestor`
    /// strictly contains `node`.
    fn child_toward(&self, ancestor: NodeId, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            if parent == ancestor {
                return Some(current);
            }
            current = parent;
        }
        None
    }

    // === Selection ===

    pub fn selection(&self) -> Option<DomRange> {
        self.selection
    }

    /// Replace the selection. Boundary points are put in document order.
    pub fn set_selection(&mut self, range: Option<DomRange>) {
        self.selection = range.map(|r| {
            if self.compare_positions(r.start, r.end) == Ordering::Greater {
                DomRange {
                    start: r.end,
                    end: r.start,
                }
            } else {
                r
            }
        });
    }

    pub fn set_caret(&mut self, pos: Position) {
        self.selection = Some(DomRange::caret(pos));
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn map_points(&mut self, f: impl Fn(Position) -> Position) {
        if let Some(range) = &mut self.selection {
            range.start = f(range.start);
            range.end = f(range.end);
        }
    }

    // === Attribute mutation ===

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if self.element_mut(id).is_some_and(|e| e.set_attr(name, value)) {
            self.bump();
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if self.element_mut(id).is_some_and(|e| e.remove_attr(name)) {
            self.bump();
        }
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let Some(element) = self.element(id) else {
            return;
        };
        if element.has_class(class) {
            return;
        }
        let classes = match element.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.set_attr(id, "class", &classes);
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let Some(element) = self.element(id) else {
            return;
        };
        if !element.has_class(class) {
            return;
        }
        let classes = element
            .attr("class")
            .unwrap_or_default()
            .split_ascii_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr(id, "class", &classes);
    }

    // === Tree mutation ===

    /// Insert `child` at `index` among `parent`'s children, detaching it from
    /// wherever it was. The index is clamped.
    pub fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if !self.exists(parent) || !self.exists(child) || self.contains(child, parent) {
            return;
        }
        self.detach(child);

        let index = index.min(self.child_count(parent));
        if let Some(node) = self.node_mut(parent) {
            node.children.insert(index, child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        self.map_points(|p| {
            if p.node == parent && p.offset > index {
                Position::new(p.node, p.offset + 1)
            } else {
                p
            }
        });
        self.bump();
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.child_count(parent);
        self.insert_at(parent, len, child);
    }

    /// Insert `child` before `reference`, or at the end when there is none.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let index = reference
            .filter(|r| self.parent(*r) == Some(parent))
            .and_then(|r| self.index_of(r))
            .unwrap_or_else(|| self.child_count(parent));
        self.insert_at(parent, index, child);
    }

    /// Insert `child` as the previous sibling of `reference`.
    pub fn place_before(&mut self, reference: NodeId, child: NodeId) {
        if let Some(pos) = self.position_before(reference) {
            self.insert_at(pos.node, pos.offset, child);
        }
    }

    /// Insert `child` as the next sibling of `reference`.
    pub fn place_after(&mut self, reference: NodeId, child: NodeId) {
        if let Some(pos) = self.position_after(reference) {
            self.insert_at(pos.node, pos.offset, child);
        }
    }

    /// Take a node out of its parent. Boundary points inside it move to where
    /// it was.
    pub fn detach(&mut self, child: NodeId) {
        let (Some(parent), Some(index)) = (self.parent(child), self.index_of(child)) else {
            return;
        };
        let inside = |doc: &Self, p: Position| doc.contains(child, p.node);
        let moved = self.selection.map(|r| (inside(self, r.start), inside(self, r.end)));

        if let Some(node) = self.node_mut(parent) {
            node.children.remove(index);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = None;
        }

        if let (Some(range), Some((start_inside, end_inside))) = (&mut self.selection, moved) {
            for (point, inside) in [(&mut range.start, start_inside), (&mut range.end, end_inside)] {
                if inside {
                    *point = Position::new(parent, index);
                } else if point.node == parent && point.offset > index {
                    point.offset -= 1;
                }
            }
        }
        self.bump();
    }

    /// Detach a node and free it with its whole subtree. The freed slots are
    /// reused by later allocations under new ids.
    pub fn remove(&mut self, id: NodeId) {
        self.detach(id);
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let freed = self
                .nodes
                .get_mut(node.index)
                .filter(|slot| slot.generation == node.generation)
                .and_then(|slot| slot.node.take());
            if let Some(freed) = freed {
                stack.extend(freed.children);
                self.free.push(node.index);
            }
        }
        if self
            .selection
            .is_some_and(|r| !self.exists(r.start.node) || !self.exists(r.end.node))
        {
            self.selection = None;
        }
    }

    /// Remove (and free) every child of `parent`.
    pub fn clear_children(&mut self, parent: NodeId) {
        while let Some(child) = self.last_child(parent) {
            self.remove(child);
        }
    }

    /// Replace the children of `parent` with `children`.
    pub fn replace_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        self.clear_children(parent);
        for child in children {
            self.append_child(parent, child);
        }
    }

    /// Dissolve an element into its parent: its children take its place,
    /// except those `drop` rejects, which are freed.
    ///
    /// Kept children keep their identity, so boundary points inside them stay
    /// where they are.
    pub fn unwrap(&mut self, element: NodeId, drop: impl Fn(&Self, NodeId) -> bool) {
        let (Some(parent), Some(index)) = (self.parent(element), self.index_of(element)) else {
            return;
        };
        let children = self.children(element).to_vec();
        let keep: Vec<bool> = children.iter().map(|&c| !drop(self, c)).collect();
        let kept: Vec<NodeId> = children
            .iter()
            .zip(&keep)
            .filter_map(|(&c, &k)| k.then_some(c))
            .collect();

        // Kept children before each child index of the element.
        let kept_before = |i: usize| keep.iter().take(i).filter(|k| **k).count();
        let remap = |doc: &Self, p: Position| -> Position {
            if p.node == element {
                return Position::new(parent, index + kept_before(p.offset));
            }
            if p.node == parent && p.offset > index {
                return Position::new(parent, p.offset + kept.len() - 1);
            }
            match children
                .iter()
                .position(|&c| doc.contains(c, p.node))
            {
                Some(i) if !keep[i] => Position::new(parent, index + kept_before(i)),
                _ => p,
            }
        };
        let selection = self.selection.map(|r| DomRange {
            start: remap(self, r.start),
            end: remap(self, r.end),
        });

        if let Some(node) = self.node_mut(parent) {
            node.children.splice(index..=index, kept.iter().copied());
        }
        for &child in &kept {
            if let Some(node) = self.node_mut(child) {
                node.parent = Some(parent);
            }
        }
        if let Some(node) = self.node_mut(element) {
            node.children.clear();
            node.parent = None;
        }
        for (&child, &k) in children.iter().zip(&keep) {
            if k {
                continue;
            }
            if let Some(node) = self.node_mut(child) {
                node.parent = None;
            }
        }

        self.selection = selection;
        for (child, k) in children.into_iter().zip(keep) {
            if !k {
                self.remove(child);
            }
        }
        self.remove(element);
        self.bump();
    }

    // === Text mutation ===

    /// Replace a text node's contents. Boundary points in it collapse to 0.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        let Some(NodeData::Text(existing)) = self.node_mut(id).map(|n| &mut n.data) else {
            return;
        };
        *existing = text.into();
        self.map_points(|p| if p.node == id { Position::new(id, 0) } else { p });
        self.bump();
    }

    /// Insert at a UTF-16 offset (clamped).
    pub fn insert_text(&mut self, id: NodeId, offset: usize, text: &str) {
        let Some(NodeData::Text(existing)) = self.node_mut(id).map(|n| &mut n.data) else {
            return;
        };
        let offset = offset.min(utf16_len(existing));
        let byte = utf16_to_byte(existing, offset);
        existing.insert_str(byte, text);

        let added = utf16_len(text);
        self.map_points(|p| {
            if p.node == id && p.offset > offset {
                Position::new(id, p.offset + added)
            } else {
                p
            }
        });
        self.bump();
    }

    /// Delete a UTF-16 range (clamped).
    pub fn delete_text(&mut self, id: NodeId, range: Range<usize>) {
        let Some(NodeData::Text(existing)) = self.node_mut(id).map(|n| &mut n.data) else {
            return;
        };
        let len = utf16_len(existing);
        let start = range.start.min(len);
        let end = range.end.clamp(start, len);
        if start == end {
            return;
        }
        let (start_byte, end_byte) = (utf16_to_byte(existing, start), utf16_to_byte(existing, end));
        existing.replace_range(start_byte..end_byte, "");

        let count = end - start;
        self.map_points(|p| {
            if p.node != id || p.offset <= start {
                p
            } else if p.offset <= end {
                Position::new(id, start)
            } else {
                Position::new(id, p.offset - count)
            }
        });
        self.bump();
    }

    /// Split a text node at a UTF-16 offset. The tail becomes a new text node
    /// right after it, and is returned.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Option<NodeId> {
        let text = self.text(id)?;
        let offset = offset.min(utf16_len(text));
        let byte = utf16_to_byte(text, offset);
        let tail = text[byte..].to_string();

        let new = self.create_text(tail);
        if let Some(NodeData::Text(existing)) = self.node_mut(id).map(|n| &mut n.data) {
            existing.truncate(byte);
        }
        self.place_after(id, new);
        self.map_points(|p| {
            if p.node == id && p.offset > offset {
                Position::new(new, p.offset - offset)
            } else {
                p
            }
        });
        self.bump();
        Some(new)
    }
}

/// Iterator over a node and its ancestors.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_root() -> (Document, NodeId) {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        (doc, root)
    }

    #[test]
    fn test_entity_and_marker_are_cached_from_attributes() {
        let mut doc = Document::new();
        let strong = doc.create_element_with("strong", &[("data-entity-type", "bold")]);
        let marker = doc.create_element_with("span", &[("data-markdown-marker", "true")]);
        assert_eq!(doc.entity_type(strong), Some(EntityType::Bold));
        assert!(doc.is_marker(marker));
        assert!(!doc.is_marker(strong));

        doc.set_attr(strong, "data-entity-type", "italic");
        assert_eq!(doc.entity_type(strong), Some(EntityType::Italic));
        doc.remove_attr(strong, "data-entity-type");
        assert_eq!(doc.entity_type(strong), None);
    }

    #[test]
    fn test_classes() {
        let mut doc = Document::new();
        let span = doc.create_element_with("span", &[("class", "markdown-marker")]);
        doc.add_class(span, "show");
        assert_eq!(doc.attr(span, "class"), Some("markdown-marker show"));
        let rev = doc.revision();
        doc.add_class(span, "show");
        assert_eq!(doc.revision(), rev);
        doc.remove_class(span, "markdown-marker");
        assert_eq!(doc.attr(span, "class"), Some("show"));
    }

    #[test]
    fn test_navigation() {
        let (mut doc, root) = doc_with_root();
        let a = doc.create_text("a");
        let b = doc.create_element("b");
        let c = doc.create_text("c");
        doc.append_child(root, a);
        doc.append_child(root, b);
        doc.append_child(b, c);

        assert_eq!(doc.next_sibling(a), Some(b));
        assert_eq!(doc.previous_sibling(b), Some(a));
        assert_eq!(doc.descendants(root), vec![a, b, c]);
        assert_eq!(doc.ancestors(c).collect::<Vec<_>>(), vec![c, b, root]);
        assert!(doc.contains(root, c));
        assert!(!doc.contains(b, a));
        assert_eq!(doc.text_content(root), "ac");
    }

    #[test]
    fn test_removed_slots_are_reused() {
        let (mut doc, root) = doc_with_root();
        let a = doc.create_text("a");
        let b = doc.create_element("b");
        doc.append_child(root, a);
        doc.append_child(root, b);
        let used = doc.capacity();

        doc.remove(b);
        assert!(!doc.exists(b));
        let c = doc.create_text("c");
        doc.append_child(root, c);
        assert_eq!(doc.capacity(), used);
        assert_eq!(doc.text_content(root), "ac");

        // The old handle does not alias the node now in its slot.
        assert_ne!(b, c);
        assert!(!doc.exists(b));
        assert_eq!(doc.text(b), None);
    }

    #[test]
    fn test_position_order() {
        let (mut doc, root) = doc_with_root();
        let a = doc.create_text("ab");
        let b = doc.create_element("b");
        let c = doc.create_text("c");
        doc.append_child(root, a);
        doc.append_child(root, b);
        doc.append_child(b, c);

        let at = Position::new;
        assert_eq!(doc.compare_positions(at(a, 1), at(c, 0)), Ordering::Less);
        assert_eq!(doc.compare_positions(at(root, 1), at(c, 0)), Ordering::Less);
        assert_eq!(doc.compare_positions(at(root, 2), at(c, 1)), Ordering::Greater);
        assert_eq!(doc.compare_positions(at(a, 2), at(root, 1)), Ordering::Less);
    }

    #[test]
    fn test_live_selection_on_text_edits() {
        let (mut doc, root) = doc_with_root();
        let t = doc.create_text("hello");
        doc.append_child(root, t);
        doc.set_caret(Position::new(t, 3));

        doc.insert_text(t, 0, "ab");
        assert_eq!(doc.selection().unwrap().start, Position::new(t, 5));

        doc.delete_text(t, 1..4);
        assert_eq!(doc.text(t), Some("alo"));
        assert_eq!(doc.selection().unwrap().start, Position::new(t, 2));

        let tail = doc.split_text(t, 1).unwrap();
        assert_eq!(doc.text(t), Some("a"));
        assert_eq!(doc.text(tail), Some("lo"));
        assert_eq!(doc.selection().unwrap().start, Position::new(tail, 1));
    }

    #[test]
    fn test_live_selection_on_removal() {
        let (mut doc, root) = doc_with_root();
        let a = doc.create_text("a");
        let b = doc.create_element("b");
        let c = doc.create_text("c");
        doc.append_child(root, a);
        doc.append_child(root, b);
        doc.append_child(b, c);
        doc.set_caret(Position::new(c, 1));

        doc.remove(b);
        assert_eq!(doc.selection().unwrap().start, Position::new(root, 1));
        assert!(!doc.exists(c));
    }

    #[test]
    fn test_unwrap_keeps_children_and_caret() {
        let (mut doc, root) = doc_with_root();
        let strong = doc.create_element("strong");
        let m1 = doc.create_element_with("span", &[("data-markdown-marker", "true")]);
        let text = doc.create_text("word");
        let m2 = doc.create_element_with("span", &[("data-markdown-marker", "true")]);
        doc.append_child(root, strong);
        for child in [m1, text, m2] {
            doc.append_child(strong, child);
        }
        doc.set_caret(Position::new(text, 2));

        doc.unwrap(strong, |doc, n| doc.is_marker(n));
        assert_eq!(doc.children(root), &[text]);
        assert_eq!(doc.selection().unwrap().start, Position::new(text, 2));
        assert!(!doc.exists(m1));
    }

    #[test]
    fn test_surrogate_pairs_in_text_offsets() {
        let (mut doc, root) = doc_with_root();
        let t = doc.create_text("a😂b");
        doc.append_child(root, t);
        doc.delete_text(t, 1..3);
        assert_eq!(doc.text(t), Some("ab"));
        doc.insert_text(t, 1, "😂");
        assert_eq!(doc.node_length(t), 4);
    }
}
