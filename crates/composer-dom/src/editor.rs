//! The editable surface: a document and the root element the composer owns.
//!
//! `EditorSurface` abstracts over where the document lives so the controller
//! works the same on a plain in-memory surface and on one mirrored into a
//! host UI. Provided methods carry all the read and edit helpers.

use composer_core::actions::InputType;
use composer_core::config::EditorConfig;
use composer_core::entity::FormattedText;
use composer_core::error::EntityError;

use crate::blocks::{BlockInfo, block_info};
use crate::bridge::{html_to_formatted_text, html_to_markdown};
use crate::caret::{caret_offset, position_at, set_caret_offset, unit_text};
use crate::dom::{Document, DomRange, NodeId};
use crate::execute::execute_input;
use crate::html::inner_html;
use crate::render::replace_content;

/// Class of the editor root element.
pub const EDITOR_ROOT_CLASS: &str = "form-control allow-selection";

pub trait EditorSurface {
    // === Required: document access ===

    fn document(&self) -> &Document;

    fn document_mut(&mut self) -> &mut Document;

    /// The editor root element.
    fn root(&self) -> NodeId;

    // === Provided: reading ===

    /// Revision of the underlying document.
    fn revision(&self) -> u64 {
        self.document().revision()
    }

    fn html(&self) -> String {
        inner_html(self.document(), self.root())
    }

    fn markdown(&self) -> String {
        html_to_markdown(self.document(), self.root())
    }

    fn formatted_text(&self) -> Result<FormattedText, EntityError> {
        html_to_formatted_text(self.document(), self.root())
    }

    /// Content with one char per caret unit.
    fn unit_text(&self) -> String {
        unit_text(self.document(), self.root())
    }

    fn block_info(&self) -> Option<BlockInfo> {
        block_info(self.document(), self.root())
    }

    // === Provided: caret ===

    fn caret_offset(&self) -> Option<usize> {
        caret_offset(self.document(), self.root())
    }

    fn set_caret_offset(&mut self, offset: usize) {
        let root = self.root();
        set_caret_offset(self.document_mut(), root, offset);
    }

    /// Select between two caret offsets.
    fn select_offsets(&mut self, start: usize, end: usize) {
        let root = self.root();
        let doc = self.document_mut();
        let range = DomRange {
            start: position_at(doc, root, start),
            end: position_at(doc, root, end),
        };
        doc.set_selection(Some(range));
    }

    // === Provided: editing ===

    /// Replace the content with rendered formatted text.
    fn set_content(&mut self, ft: &FormattedText, config: &EditorConfig) {
        let root = self.root();
        replace_content(self.document_mut(), root, ft, config);
    }

    fn clear(&mut self) {
        let root = self.root();
        self.document_mut().clear_children(root);
    }

    /// Run the default action of an input.
    fn execute(&mut self, input: &InputType) -> bool {
        let root = self.root();
        execute_input(self.document_mut(), root, input)
    }
}

/// An in-memory editor surface.
#[derive(Debug, Clone)]
pub struct RichTextEditor {
    doc: Document,
    root: NodeId,
}

impl Default for RichTextEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl RichTextEditor {
    pub fn new() -> Self {
        let mut doc = Document::new();
        let root = doc.create_element_with(
            "div",
            &[("class", EDITOR_ROOT_CLASS), ("contenteditable", "true")],
        );
        Self { doc, root }
    }
}

impl EditorSurface for RichTextEditor {
    fn document(&self) -> &Document {
        &self.doc
    }

    fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    fn root(&self) -> NodeId {
        self.root
    }
}
