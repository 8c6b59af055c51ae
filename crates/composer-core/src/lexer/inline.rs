//! Inline rules: escapes, entity tags, code spans, links, delimited runs and
//! hard breaks. Anything that matches no rule is text; adjacent text is
//! merged into one token so typing plain characters never changes structure.

use crate::tag::parse_tag;
use crate::token::{Token, TokenKind};

/// Delimited runs, tried in this order at a delimiter character.
const DELIMITED: [(&str, TokenKind); 5] = [
    ("**", TokenKind::Strong),
    ("*", TokenKind::Em),
    ("__", TokenKind::Underline),
    ("~~", TokenKind::Del),
    ("||", TokenKind::Spoiler),
];

enum Step {
    Token(Token, usize),
    /// Bytes to keep as literal text.
    Literal(usize),
}

/// Tokenize inline content.
pub fn tokenize_inline(src: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while pos < src.len() {
        match step(&src[pos..]) {
            Some(Step::Token(token, len)) => {
                if text_start < pos {
                    tokens.push(Token::text(&src[text_start..pos]));
                }
                tokens.push(token);
                pos += len;
                text_start = pos;
            }
            Some(Step::Literal(len)) => pos += len,
            None => pos += src[pos..].chars().next().map_or(1, char::len_utf8),
        }
    }
    if text_start < src.len() {
        tokens.push(Token::text(&src[text_start..]));
    }
    tokens
}

fn step(rest: &str) -> Option<Step> {
    match rest.as_bytes()[0] {
        b'\\' => escape(rest),
        b'<' => entity_tag(rest),
        b'`' => Some(codespan(rest)),
        b'[' => link(rest),
        b'\n' => Some(Step::Token(Token::br(), 1)),
        b'*' | b'_' | b'~' | b'|' => delimited(rest),
        _ => None,
    }
}

fn escape(rest: &str) -> Option<Step> {
    let ch = rest[1..].chars().next()?;
    if !ch.is_ascii_punctuation() {
        return None;
    }
    let len = 1 + ch.len_utf8();
    Some(Step::Token(Token::escape(&rest[..len], ch), len))
}

/// Entity-carrying start tags and any end tag. Other markup stays text.
fn entity_tag(rest: &str) -> Option<Step> {
    let (tag, len) = parse_tag(rest)?;
    if !tag.closing && tag.entity_type().is_none() {
        return None;
    }
    Some(Step::Token(Token::html(&rest[..len]), len))
}

/// A run of N backticks closed by the next run of exactly N. An unmatched
/// run is literal text as a whole.
fn codespan(rest: &str) -> Step {
    let open = backtick_run(rest);
    let body = &rest[open..];
    let mut offset = 0;
    while let Some(found) = body[offset..].find('`') {
        let at = offset + found;
        let run = backtick_run(&body[at..]);
        if run == open && at > 0 {
            let len = open + at + run;
            return Step::Token(Token::codespan(&rest[..len], &body[..at]), len);
        }
        offset = at + run;
    }
    Step::Literal(open)
}

fn backtick_run(s: &str) -> usize {
    s.bytes().take_while(|b| *b == b'`').count()
}

/// `[text](href)` with non-empty text and a non-empty href without spaces.
fn link(rest: &str) -> Option<Step> {
    let mut chars = rest.char_indices().skip(1);
    let close = loop {
        let (idx, ch) = chars.next()?;
        match ch {
            '\\' => {
                chars.next();
            }
            ']' => break idx,
            '[' | '\n' => return None,
            _ => {}
        }
    };
    let text = &rest[1..close];
    let after = &rest[close + 1..];
    let href_src = after.strip_prefix('(')?;
    let href_len = href_src.find(')')?;
    let href = &href_src[..href_len];
    if text.is_empty() || href.is_empty() || href.chars().any(char::is_whitespace) {
        return None;
    }
    let len = close + 1 + 1 + href_len + 1;
    Some(Step::Token(
        Token::link(&rest[..len], text, href, tokenize_inline(text)),
        len,
    ))
}

fn delimited(rest: &str) -> Option<Step> {
    DELIMITED
        .iter()
        .filter(|(delim, _)| rest.starts_with(delim))
        .find_map(|(delim, kind)| {
            let content_len = delimited_content(rest, delim)?;
            let content = &rest[delim.len()..delim.len() + content_len];
            let len = delim.len() * 2 + content_len;
            Some(Step::Token(
                Token::container(*kind, &rest[..len], content, tokenize_inline(content)),
                len,
            ))
        })
}

/// Byte length of the content of a delimited run starting at `rest`.
///
/// The opener must be followed by a character that is neither whitespace nor
/// the delimiter character. Content is a sequence of escapes (`\` + any
/// character except a newline) and non-backslash characters; the shortest
/// content whose last item is an escape or a non-whitespace, non-delimiter
/// character and which is followed by the delimiter, itself not followed by
/// another delimiter character, wins.
fn delimited_content(rest: &str, delim: &str) -> Option<usize> {
    let marker = delim.chars().next()?;
    let body = &rest[delim.len()..];
    let first = body.chars().next()?;
    if first.is_whitespace() || first == marker {
        return None;
    }

    let mut chars = body.char_indices().peekable();
    while let Some((_, ch)) = chars.next() {
        let valid_end = if ch == '\\' {
            match chars.next() {
                Some((_, '\n')) | None => return None,
                Some(_) => true,
            }
        } else {
            !ch.is_whitespace() && ch != marker
        };

        let end = chars.peek().map_or(body.len(), |(idx, _)| *idx);
        if valid_end {
            let tail = &body[end..];
            if let Some(after) = tail.strip_prefix(delim) {
                if !after.starts_with(marker) {
                    return Some(end);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(tokens: &[Token]) -> Vec<(TokenKind, String)> {
        tokens
            .iter()
            .map(|t| (t.kind, t.text.clone().unwrap_or_else(|| t.raw.clone())))
            .collect()
    }

    #[test]
    fn test_bold_inside_text() {
        let tokens = tokenize_inline("Hello **world**!");
        assert_eq!(
            summary(&tokens),
            vec![
                (TokenKind::Text, "Hello ".into()),
                (TokenKind::Strong, "world".into()),
                (TokenKind::Text, "!".into()),
            ]
        );
        assert_eq!(tokens[1].raw, "**world**");
        assert_eq!(summary(tokens[1].children()), vec![(TokenKind::Text, "world".into())]);
    }

    #[test]
    fn test_each_delimiter_kind() {
        let cases = [
            ("*a*", TokenKind::Em),
            ("__a__", TokenKind::Underline),
            ("~~a~~", TokenKind::Del),
            ("||a||", TokenKind::Spoiler),
            ("`a`", TokenKind::Codespan),
        ];
        for (src, kind) in cases {
            let tokens = tokenize_inline(src);
            assert_eq!(tokens.len(), 1, "{src}");
            assert_eq!(tokens[0].kind, kind, "{src}");
            assert_eq!(tokens[0].text.as_deref(), Some("a"), "{src}");
        }
    }

    #[test]
    fn test_single_underscore_tilde_pipe_are_text() {
        for src in ["_a_", "~a~", "|a|", "snake_case"] {
            let tokens = tokenize_inline(src);
            assert_eq!(summary(&tokens), vec![(TokenKind::Text, src.into())]);
        }
    }

    #[test]
    fn test_whitespace_inside_delimiters_blocks_match() {
        for src in ["** x**", "**x **", "|| x||", "__x __"] {
            let tokens = tokenize_inline(src);
            assert_eq!(tokens.len(), 1, "{src}");
            assert_eq!(tokens[0].kind, TokenKind::Text, "{src}");
        }
    }

    #[test]
    fn test_escaped_delimiter_inside_content() {
        let tokens = tokenize_inline(r"**a\*\*b**");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Strong);
        assert_eq!(tokens[0].text.as_deref(), Some(r"a\*\*b"));
        let inner: Vec<_> = tokens[0].children().iter().map(|t| t.kind).collect();
        assert_eq!(
            inner,
            vec![TokenKind::Text, TokenKind::Escape, TokenKind::Escape, TokenKind::Text]
        );
    }

    #[test]
    fn test_closing_is_non_greedy() {
        let tokens = tokenize_inline("~~a~~ and ~~b~~");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Del, TokenKind::Text, TokenKind::Del]);
    }

    #[test]
    fn test_nested_runs() {
        let tokens = tokenize_inline("**bold *it* bold**");
        assert_eq!(tokens.len(), 1);
        let inner: Vec<_> = tokens[0].children().iter().map(|t| t.kind).collect();
        assert_eq!(inner, vec![TokenKind::Text, TokenKind::Em, TokenKind::Text]);
    }

    #[test]
    fn test_link() {
        let tokens = tokenize_inline("see [docs](https://example.com) now");
        assert_eq!(tokens.len(), 3);
        let link = &tokens[1];
        assert_eq!(link.kind, TokenKind::Link);
        assert_eq!(link.href.as_deref(), Some("https://example.com"));
        assert_eq!(link.text.as_deref(), Some("docs"));
    }

    #[test]
    fn test_bare_urls_are_not_links() {
        let tokens = tokenize_inline("go to https://example.com now");
        assert_eq!(summary(&tokens), vec![(TokenKind::Text, "go to https://example.com now".into())]);
    }

    #[test]
    fn test_breaks() {
        let tokens = tokenize_inline("a\nb");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Text, TokenKind::Br, TokenKind::Text]);
    }

    #[test]
    fn test_entity_tags_and_plain_markup() {
        let tokens = tokenize_inline(r#"<a data-entity-type="mention">@me</a> <b>x</b>"#);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Html,
                TokenKind::Text,
                TokenKind::Html,
                TokenKind::Text,
                TokenKind::Html,
            ]
        );
        // `<b>` carries no entity type, so it stays in the text run.
        assert_eq!(tokens[3].raw, " <b>x");
    }

    #[test]
    fn test_unmatched_backticks_are_literal() {
        let tokens = tokenize_inline("``a` b");
        assert_eq!(summary(&tokens), vec![(TokenKind::Text, "``a` b".into())]);
    }

    #[test]
    fn test_escape_keeps_backslash_in_raw() {
        let tokens = tokenize_inline(r"\*");
        assert_eq!(tokens[0].kind, TokenKind::Escape);
        assert_eq!(tokens[0].raw, r"\*");
        assert_eq!(tokens[0].text.as_deref(), Some("*"));
    }
}
