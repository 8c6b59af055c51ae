//! Lexer for the composer's Markdown dialect.
//!
//! The dialect is deliberately narrow. Block level knows fenced code, `>`
//! blockquotes, paragraphs and blank-line runs; headings, lists, tables,
//! rules, HTML blocks and reference definitions are not recognised and stay
//! paragraph text. Inline level is handled by [`inline`].
//!
//! Every character of the source that is not a delimiter ends up in some
//! token's text, so converting the tokens back to plain text loses nothing.
//! Line terminators belong to the construct whose line they end, except the
//! last terminator of a blockquote, which is emitted as a `space` token.

mod inline;

use smol_str::SmolStr;

use crate::markers::{CODE_FENCE, QUOTE_MARKER};
use crate::token::{Token, TokenKind};

pub use inline::tokenize_inline;

/// Tokenize a Markdown string into block tokens with inline children.
pub fn tokenize(src: &str) -> Vec<Token> {
    let lines: Vec<&str> = src.split_inclusive('\n').collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if is_blank(line) {
            let start = i;
            while i < lines.len() && is_blank(lines[i]) {
                i += 1;
            }
            push_space(&mut tokens, lines[start..i].concat());
            continue;
        }

        if let Some(fence) = open_fence(line) {
            i = lex_fence(&lines, i, fence, &mut tokens);
            continue;
        }

        if is_quote_line(line) {
            let start = i;
            while i < lines.len() && is_quote_line(lines[i]) {
                i += 1;
            }
            lex_blockquote(&lines[start..i], &mut tokens);
            continue;
        }

        let start = i;
        while i < lines.len() && starts_paragraph_line(lines[i]) {
            i += 1;
        }
        let raw = lines[start..i].concat();
        let children = tokenize_inline(&raw);
        tokens.push(Token::container(
            TokenKind::Paragraph,
            raw.clone(),
            raw.trim_end_matches('\n'),
            children,
        ));
    }

    tracing::trace!(target: "composer::lexer", blocks = tokens.len(), "tokenized");
    tokens
}

struct Fence {
    len: usize,
    lang: Option<SmolStr>,
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn is_quote_line(line: &str) -> bool {
    line.starts_with(QUOTE_MARKER)
}

fn starts_paragraph_line(line: &str) -> bool {
    !is_blank(line) && open_fence(line).is_none() && !is_quote_line(line)
}

/// An opening fence: at least three backticks at column zero, followed by an
/// optional info string that may not itself contain a backtick.
fn open_fence(line: &str) -> Option<Fence> {
    if !line.starts_with(CODE_FENCE) {
        return None;
    }
    let len = line.bytes().take_while(|b| *b == b'`').count();
    let info = line[len..].trim();
    if info.contains('`') {
        return None;
    }
    let lang = (!info.is_empty()).then(|| SmolStr::new(info));
    Some(Fence { len, lang })
}

fn is_closing_fence(line: &str, fence: &Fence) -> bool {
    let body = line.trim_end();
    body.len() >= fence.len && body.bytes().all(|b| b == b'`')
}

/// Lex a fenced block starting at `start`. Returns the index of the first
/// line after it. An unclosed fence runs to the end of the input.
fn lex_fence(lines: &[&str], start: usize, fence: Fence, tokens: &mut Vec<Token>) -> usize {
    let mut end = start + 1;
    let mut closed = false;
    while end < lines.len() {
        if is_closing_fence(lines[end], &fence) {
            closed = true;
            break;
        }
        end += 1;
    }

    let mut content = lines[start + 1..end].concat();
    if closed && content.ends_with('\n') {
        content.pop();
    }
    let next = if closed { end + 1 } else { end };
    let raw = lines[start..next].concat();

    tokens.push(Token::code(raw, content, fence.lang));
    next
}

fn lex_blockquote(lines: &[&str], tokens: &mut Vec<Token>) {
    let mut raw = lines.concat();
    let mut content: String = lines
        .iter()
        .map(|line| {
            let body = &line[QUOTE_MARKER.len()..];
            body.strip_prefix(' ').unwrap_or(body)
        })
        .collect();

    let trailing_newline = raw.ends_with('\n');
    if trailing_newline {
        raw.pop();
        content.pop();
    }

    let children = tokenize_inline(&content);
    tokens.push(Token::container(
        TokenKind::Blockquote,
        raw,
        content,
        children,
    ));
    if trailing_newline {
        push_space(tokens, "\n".to_string());
    }
}

fn push_space(tokens: &mut Vec<Token>, raw: String) {
    if let Some(last) = tokens.last_mut() {
        if last.kind == TokenKind::Space {
            last.raw.push_str(&raw);
            return;
        }
    }
    tokens.push(Token::space(raw));
}
