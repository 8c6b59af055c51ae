//! HTML serialization of the arena document.

use std::fmt::Write;

use crate::dom::{Document, Element, NodeData, NodeId};

/// Serialized children of a node.
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    for &child in doc.children(id) {
        write_node(doc, child, &mut out);
    }
    out
}

/// Serialized node including its own tag.
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

/// Opening tag of an element, attributes escaped. Empty for non-elements.
pub fn start_tag(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    if let Some(element) = doc.element(id) {
        write_start_tag(element, &mut out);
    }
    out
}

/// Closing tag of an element. Empty for non-elements.
pub fn end_tag(doc: &Document, id: NodeId) -> String {
    doc.tag(id).map(|tag| format!("</{tag}>")).unwrap_or_default()
}

fn write_start_tag(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(element.tag());
    for (name, value) in element.attrs() {
        let _ = write!(
            out,
            " {name}=\"{}\"",
            html_escape::encode_double_quoted_attribute(value)
        );
    }
    out.push('>');
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.data(id) {
        Some(NodeData::Text(text)) => {
            out.push_str(&html_escape::encode_text_minimal(text));
        }
        Some(NodeData::Raw(html)) => out.push_str(html),
        Some(NodeData::Element(element)) => {
            write_start_tag(element, out);
            if element.is_void() {
                return;
            }
            for &child in doc.children(id) {
                write_node(doc, child, out);
            }
            let _ = write!(out, "</{}>", element.tag());
        }
        None => {}
    }
}
