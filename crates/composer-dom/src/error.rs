use composer_core::error::EntityError;

/// Errors surfaced by the composer.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ComposerError {
    /// The document holds entity markup that cannot become an entity.
    #[error("invalid entity markup: {0}")]
    Entity(#[from] EntityError),

    /// A formatted text references text past its end.
    #[error("entity at {offset}..{end} is past the end of the text ({len})")]
    EntityOutOfBounds { offset: usize, end: usize, len: usize },
}
