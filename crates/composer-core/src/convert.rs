//! Token tree to [`FormattedText`].
//!
//! Walks the tokens depth first with a running UTF-16 offset. Markdown
//! constructs produce their entity directly from the token kind; entity
//! markup tags are paired with a stack of pending entities, so an entity can
//! open in one paragraph and close in another.

use crate::entity::{Entity, EntityKind, EntityType, FormattedText};
use crate::error::EntityError;
use crate::markers::{COLLAPSED_ATTR, DOCUMENT_ID_ATTR, HREF_ATTR, LANGUAGE_ATTR};
use crate::tag::{HtmlTag, parse_tag};
use crate::text::utf16_len;
use crate::token::{Token, TokenKind};

/// Convert a token tree into formatted text.
///
/// Entities come out sorted into processing order. Zero-length entities are
/// kept. A close tag with nothing pending is ordinary text.
///
/// # Errors
///
/// Fails when an entity tag names an unknown type, or a `textUrl` or
/// `customEmoji` tag lacks its required attribute.
pub fn tokens_to_formatted_text(tokens: &[Token]) -> Result<FormattedText, EntityError> {
    convert(tokens, false)
}

/// Like [`tokens_to_formatted_text`], but an unmatched close tag or an entity
/// tag left open at the end is an error instead of text.
///
/// # Errors
///
/// Everything [`tokens_to_formatted_text`] rejects, plus
/// [`EntityError::UnbalancedTag`].
pub fn tokens_to_formatted_text_strict(tokens: &[Token]) -> Result<FormattedText, EntityError> {
    convert(tokens, true)
}

fn convert(tokens: &[Token], strict: bool) -> Result<FormattedText, EntityError> {
    let mut converter = Converter {
        strict,
        ..Converter::default()
    };
    converter.walk(tokens)?;
    if strict {
        if let Some(open) = converter.pending.first() {
            return Err(EntityError::UnbalancedTag { offset: open.start });
        }
    }
    for open in &converter.pending {
        tracing::debug!(
            target: "composer::convert",
            entity = ?open.tag.entity_type(),
            offset = open.start,
            "dropping unclosed entity tag"
        );
    }

    let mut formatted = FormattedText::new(converter.text, converter.entities);
    formatted.sort_entities();
    tracing::trace!(
        target: "composer::convert",
        len = converter.offset,
        entities = formatted.entities.len(),
        unclosed = converter.pending.len(),
        "converted tokens"
    );
    Ok(formatted)
}

/// An entity tag that has been opened but not yet closed.
#[derive(Debug)]
struct PendingEntity {
    start: usize,
    tag: HtmlTag,
}

#[derive(Debug, Default)]
struct Converter {
    text: String,
    offset: usize,
    entities: Vec<Entity>,
    pending: Vec<PendingEntity>,
    strict: bool,
}

impl Converter {
    fn walk(&mut self, tokens: &[Token]) -> Result<(), EntityError> {
        for token in tokens {
            if token.kind == TokenKind::Html {
                self.html(token)?;
                continue;
            }

            let start = self.offset;
            let first_child_entity = self.entities.len();
            let text_before = self.text.len();

            if !token.children().is_empty() {
                self.walk(token.children())?;
            }
            if self.text.len() == text_before {
                self.push_text(own_text(token));
            }

            if let Some(kind) = token_entity(token) {
                let entity = Entity::new(kind, start, self.offset - start);
                self.entities.insert(first_child_entity, entity);
            }
        }
        Ok(())
    }

    fn html(&mut self, token: &Token) -> Result<(), EntityError> {
        let Some((tag, _)) = parse_tag(&token.raw) else {
            self.push_text(&token.raw);
            return Ok(());
        };

        if !tag.closing {
            if tag.entity_type().is_some() {
                self.pending.push(PendingEntity {
                    start: self.offset,
                    tag,
                });
            } else {
                self.push_text(&token.raw);
            }
            return Ok(());
        }

        let Some(open) = self.pending.pop() else {
            if self.strict {
                return Err(EntityError::UnbalancedTag {
                    offset: self.offset,
                });
            }
            self.push_text(&token.raw);
            return Ok(());
        };
        let entity = finish_entity(&open, self.offset)?;
        self.entities.push(entity);
        Ok(())
    }

    fn push_text(&mut self, text: &str) {
        self.offset += utf16_len(text);
        self.text.push_str(text);
    }
}

/// Text a token contributes when it has no child text of its own.
fn own_text(token: &Token) -> &str {
    match token.kind {
        TokenKind::Escape | TokenKind::Space | TokenKind::Br => &token.raw,
        TokenKind::Paragraph => "",
        _ => token.text.as_deref().unwrap_or(&token.raw),
    }
}

fn token_entity(token: &Token) -> Option<EntityKind> {
    Some(match token.kind {
        TokenKind::Strong => EntityKind::Bold,
        TokenKind::Em => EntityKind::Italic,
        TokenKind::Underline => EntityKind::Underline,
        TokenKind::Del => EntityKind::Strike,
        TokenKind::Spoiler => EntityKind::Spoiler,
        TokenKind::Codespan => EntityKind::Code,
        TokenKind::Code => EntityKind::Pre {
            language: token.lang.clone().filter(|lang| !lang.is_empty()),
        },
        TokenKind::Link => EntityKind::TextUrl {
            url: token.href.clone()?,
        },
        TokenKind::Blockquote => EntityKind::Blockquote { collapsed: false },
        _ => return None,
    })
}

fn finish_entity(open: &PendingEntity, end: usize) -> Result<Entity, EntityError> {
    let type_name = open.tag.entity_type().unwrap_or_default();
    let ty: EntityType = type_name.parse()?;
    let tag = &open.tag;

    let kind = match ty {
        EntityType::TextUrl => EntityKind::TextUrl {
            url: tag
                .attr(HREF_ATTR)
                .filter(|href| !href.is_empty())
                .ok_or(EntityError::MissingHref { offset: open.start })?
                .to_string(),
        },
        EntityType::CustomEmoji => EntityKind::CustomEmoji {
            document_id: tag
                .attr(DOCUMENT_ID_ATTR)
                .filter(|id| !id.is_empty())
                .ok_or(EntityError::MissingDocumentId { offset: open.start })?
                .into(),
        },
        EntityType::Pre => EntityKind::Pre {
            language: tag
                .attr(LANGUAGE_ATTR)
                .filter(|lang| !lang.is_empty())
                .map(Into::into),
        },
        EntityType::Blockquote => EntityKind::Blockquote {
            collapsed: tag.attr(COLLAPSED_ATTR) == Some("true"),
        },
        other => EntityKind::bare(other).ok_or_else(|| EntityError::UnknownType(type_name.into()))?,
    };

    Ok(Entity::new(kind, open.start, end - open.start))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    use super::*;
    use crate::lexer::tokenize;

    fn convert(markdown: &str) -> FormattedText {
        tokens_to_formatted_text(&tokenize(markdown)).unwrap()
    }

    #[test]
    fn test_bold_in_sentence() {
        let ft = convert("Hello **world**!");
        assert_eq!(ft.text, "Hello world!");
        assert_eq!(ft.entities, vec![Entity::new(EntityKind::Bold, 6, 5)]);
    }

    #[test]
    fn test_all_inline_formats() {
        let ft = convert("*i* __u__ ~~s~~ ||p|| `c`");
        assert_eq!(ft.text, "i u s p c");
        let types: Vec<_> = ft.entities.iter().map(Entity::entity_type).collect();
        assert_eq!(
            types,
            vec![
                EntityType::Italic,
                EntityType::Underline,
                EntityType::Strike,
                EntityType::Spoiler,
                EntityType::Code,
            ]
        );
        assert!(ft.entities.iter().all(|e| e.length == 1));
    }

    #[test]
    fn test_code_block_excludes_fences() {
        let ft = convert("```cpp\nint x;\n```");
        assert_eq!(ft.text, "int x;");
        assert_eq!(
            ft.entities,
            vec![Entity::new(
                EntityKind::Pre {
                    language: Some("cpp".into())
                },
                0,
                6
            )]
        );
    }

    #[test]
    fn test_text_around_code_block_keeps_newlines() {
        // The closing fence owns its line terminator; the blank line after it
        // is the newline that separates the block from what follows.
        let ft = convert("before\n```\nx\n```\n\nafter");
        assert_eq!(ft.text, "before\nx\nafter");
        assert_eq!(
            ft.entities,
            vec![Entity::new(EntityKind::Pre { language: None }, 7, 1)]
        );
    }

    #[test]
    fn test_markdown_blockquote() {
        let ft = convert("> a\n> b\nc");
        assert_eq!(ft.text, "a\nb\nc");
        assert_eq!(
            ft.entities,
            vec![Entity::new(EntityKind::Blockquote { collapsed: false }, 0, 3)]
        );
    }

    #[test]
    fn test_link() {
        let ft = convert("go [here](https://example.com)");
        assert_eq!(ft.text, "go here");
        assert_eq!(
            ft.entities,
            vec![Entity::new(
                EntityKind::TextUrl {
                    url: "https://example.com".into()
                },
                3,
                4
            )]
        );
    }

    #[test]
    fn test_entity_tags_spanning_paragraphs() {
        let ft = convert(
            "<span class=\"Blockquote\" data-entity-type=\"blockquote\" data-collapsed=\"true\">**a**\n\nb</span>",
        );
        assert_eq!(ft.text, "a\n\nb");
        assert_eq!(
            ft.entities,
            vec![
                Entity::new(EntityKind::Blockquote { collapsed: true }, 0, 4),
                Entity::new(EntityKind::Bold, 0, 1),
            ]
        );
    }

    #[test]
    fn test_custom_emoji_and_mention_tags() {
        let ft = convert(
            "<img data-entity-type=\"customEmoji\" data-document-id=\"42\" alt=\"🙂\">🙂</img> \
             <a data-entity-type=\"mention\">@bob</a>",
        );
        assert_eq!(ft.text, "🙂 @bob");
        assert_eq!(
            ft.entities,
            vec![
                Entity::new(
                    EntityKind::CustomEmoji {
                        document_id: "42".into()
                    },
                    0,
                    2
                ),
                Entity::new(EntityKind::Mention, 3, 4),
            ]
        );
    }

    #[test]
    fn test_missing_required_fields_fail() {
        let err = tokens_to_formatted_text(&tokenize(
            "<a data-entity-type=\"textUrl\">x</a>",
        ))
        .unwrap_err();
        assert_eq!(err, EntityError::MissingHref { offset: 0 });

        let err = tokens_to_formatted_text(&tokenize(
            "ab<img data-entity-type=\"customEmoji\">x</img>",
        ))
        .unwrap_err();
        assert_eq!(err, EntityError::MissingDocumentId { offset: 2 });
    }

    #[test]
    fn test_unknown_entity_type_fails() {
        let err = tokens_to_formatted_text(&tokenize(
            "<span data-entity-type=\"sparkle\">x</span>",
        ))
        .unwrap_err();
        assert_eq!(err, EntityError::UnknownType("sparkle".into()));
    }

    #[test]
    fn test_stray_close_tag_is_text() {
        let ft = convert("a</span>b");
        assert_eq!(ft.text, "a</span>b");
        assert!(ft.entities.is_empty());
    }

    #[test]
    fn test_zero_length_entity_is_kept() {
        let ft = convert("x<span data-entity-type=\"blockquote\"></span>");
        assert_eq!(ft.text, "x");
        assert_eq!(
            ft.entities,
            vec![Entity::new(EntityKind::Blockquote { collapsed: false }, 1, 0)]
        );
    }

    #[test]
    fn test_escapes_keep_backslash() {
        let ft = convert(r"\*not italic\*");
        assert_eq!(ft.text, r"\*not italic\*");
        assert!(ft.entities.is_empty());
    }

    #[test]
    fn test_offsets_count_utf16_units() {
        let ft = convert("😂 **b**");
        assert_eq!(ft.entities, vec![Entity::new(EntityKind::Bold, 3, 1)]);
        assert!(ft.out_of_bounds_entity().is_none());
    }

    #[test]
    fn test_strict_rejects_unbalanced_tags() {
        let stray = tokenize("a</span>b");
        assert_eq!(
            tokens_to_formatted_text_strict(&stray),
            Err(EntityError::UnbalancedTag { offset: 1 })
        );

        let unclosed = tokenize("x<span data-entity-type=\"spoiler\">y");
        assert_eq!(
            tokens_to_formatted_text_strict(&unclosed),
            Err(EntityError::UnbalancedTag { offset: 1 })
        );

        let balanced = tokenize("Hello **world**!");
        assert!(tokens_to_formatted_text_strict(&balanced).is_ok());
    }

    /// Collects the targets of debug events.
    #[derive(Clone, Default)]
    struct DebugTargets(Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> Layer<S> for DebugTargets {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let meta = event.metadata();
            if *meta.level() == tracing::Level::DEBUG {
                self.0.lock().unwrap().push(meta.target().to_owned());
            }
        }
    }

    #[test]
    fn test_lenient_drops_unclosed_tag_with_debug_event() {
        let targets = DebugTargets::default();
        let subscriber = tracing_subscriber::registry().with(targets.clone());

        let tokens = tokenize("x<span data-entity-type=\"spoiler\">y");
        let ft = tracing::subscriber::with_default(subscriber, || {
            tokens_to_formatted_text(&tokens).unwrap()
        });

        assert_eq!(ft, FormattedText::plain("xy"));
        assert_eq!(*targets.0.lock().unwrap(), vec!["composer::convert".to_owned()]);
    }
}
