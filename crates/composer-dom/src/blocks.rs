//! Block context at the caret and the parts of rendered code blocks and
//! quotes.

use composer_core::entity::EntityType;
use composer_core::markers::{
    CODE_CONTAINER_CLASS, CODE_CONTENT_CLASS, CODE_FOOTER_CLASS, CODE_HEADER_CLASS,
    CODE_HIGHLIGHT_CLASS, QUOTE_CONTAINER_CLASS, QUOTE_TOGGLE_CLASS,
};

use crate::dom::{Document, DomRange, NodeId};

/// Editing context of the caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Paragraph,
    CodeBlock,
    QuoteBlock,
}

impl BlockType {
    fn of(ty: EntityType) -> Option<Self> {
        match ty {
            EntityType::Pre => Some(Self::CodeBlock),
            EntityType::Blockquote => Some(Self::QuoteBlock),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub block_type: BlockType,
    /// The `pre`/`blockquote` entity element, absent for paragraphs.
    pub block_element: Option<NodeId>,
    pub range: DomRange,
    pub is_collapsed: bool,
}

/// Block context of the selection start, or `None` when there is no
/// selection inside `root`.
pub fn block_info(doc: &Document, root: NodeId) -> Option<BlockInfo> {
    let range = doc.selection()?;
    if !doc.contains(root, range.start.node) {
        return None;
    }

    let block = doc
        .ancestors(range.start.node)
        .take_while(|&n| n != root)
        .find_map(|n| Some((n, BlockType::of(doc.entity_type(n)?)?)));

    let (block_element, block_type) = match block {
        Some((element, ty)) => (Some(element), ty),
        None => (None, BlockType::Paragraph),
    };
    Some(BlockInfo {
        block_type,
        block_element,
        range,
        is_collapsed: range.is_collapsed(),
    })
}

/// The outermost block entity element containing `node`, below `root`.
pub fn topmost_block(doc: &Document, root: NodeId, node: NodeId) -> Option<NodeId> {
    doc.ancestors(node)
        .take_while(|&n| n != root)
        .filter(|&n| doc.entity_type(n).is_some_and(EntityType::is_block))
        .last()
}

/// First descendant carrying a class.
pub fn find_by_class(doc: &Document, id: NodeId, class: &str) -> Option<NodeId> {
    doc.descendants(id)
        .into_iter()
        .find(|&n| doc.has_class(n, class))
}

/// Closest inclusive ancestor carrying a class, below `root`.
pub fn closest_with_class(doc: &Document, root: NodeId, node: NodeId, class: &str) -> Option<NodeId> {
    doc.ancestors(node)
        .take_while(|&n| n != root)
        .find(|&n| doc.has_class(n, class))
}

/// Which part of a code block a node sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePart {
    Header,
    Content,
    Footer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeBlockParts {
    pub block: NodeId,
    pub header: Option<NodeId>,
    pub container: Option<NodeId>,
    pub highlight: Option<NodeId>,
    pub content: Option<NodeId>,
    pub footer: Option<NodeId>,
}

impl CodeBlockParts {
    pub fn find(doc: &Document, block: NodeId) -> Self {
        Self {
            block,
            header: find_by_class(doc, block, CODE_HEADER_CLASS),
            container: find_by_class(doc, block, CODE_CONTAINER_CLASS),
            highlight: find_by_class(doc, block, CODE_HIGHLIGHT_CLASS),
            content: find_by_class(doc, block, CODE_CONTENT_CLASS),
            footer: find_by_class(doc, block, CODE_FOOTER_CLASS),
        }
    }

    /// A block with both fences is still a code block; one missing a fence
    /// has been demoted to plain text.
    pub fn is_intact(&self) -> bool {
        self.header.is_some() && self.footer.is_some()
    }

    /// Language typed in the header after the fence. `None` without a header.
    pub fn language(&self, doc: &Document) -> Option<String> {
        let header = doc.text_content(self.header?);
        Some(header.trim_start_matches('`').trim().to_string())
    }

    pub fn part_of(&self, doc: &Document, node: NodeId) -> Option<CodePart> {
        let within = |part: Option<NodeId>| part.is_some_and(|p| doc.contains(p, node));
        if within(self.header) {
            Some(CodePart::Header)
        } else if within(self.footer) {
            Some(CodePart::Footer)
        } else if within(self.content) {
            Some(CodePart::Content)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteParts {
    pub block: NodeId,
    pub quote: Option<NodeId>,
    pub container: Option<NodeId>,
    pub toggle: Option<NodeId>,
}

impl QuoteParts {
    pub fn find(doc: &Document, block: NodeId) -> Self {
        Self {
            block,
            quote: doc
                .descendants(block)
                .into_iter()
                .find(|&n| doc.is_tag(n, "blockquote")),
            container: find_by_class(doc, block, QUOTE_CONTAINER_CLASS),
            toggle: find_by_class(doc, block, QUOTE_TOGGLE_CLASS),
        }
    }
}
