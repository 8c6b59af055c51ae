//! Error types for entity construction.

use thiserror::Error;

/// Invariant violations found while turning tokens into entities.
///
/// These indicate a bug in marker or markup generation, never a user error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EntityError {
    /// A `textUrl` entity closed without an `href`.
    #[error("textUrl entity at offset {offset} has no href")]
    MissingHref { offset: usize },

    /// A `customEmoji` entity closed without a document id.
    #[error("customEmoji entity at offset {offset} has no document id")]
    MissingDocumentId { offset: usize },

    /// An entity type string that the composer does not know.
    #[error("unknown entity type: {0:?}")]
    UnknownType(String),

    /// Strict conversion found a close tag with nothing open, or an entity
    /// tag that was never closed.
    #[error("unbalanced entity tag at offset {offset}")]
    UnbalancedTag { offset: usize },
}
