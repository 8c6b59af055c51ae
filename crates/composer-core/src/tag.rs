//! Minimal markup tag reader.
//!
//! Entity elements without a Markdown form travel through the Markdown text as
//! literal start/end tags. This reads one such tag from the front of a string;
//! it does not try to be a general HTML parser.

use smol_str::SmolStr;

use crate::markers::ENTITY_TYPE_ATTR;

/// A start or end tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTag {
    pub name: SmolStr,
    pub closing: bool,
    pub attrs: Vec<(SmolStr, String)>,
}

impl HtmlTag {
    /// Decoded attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.attr(ENTITY_TYPE_ATTR)
    }
}

/// Parse a tag at the very start of `src`. Returns the tag and its length in bytes.
pub fn parse_tag(src: &str) -> Option<(HtmlTag, usize)> {
    let bytes = src.as_bytes();
    if bytes.first() != Some(&b'<') {
        return None;
    }
    let mut pos = 1;
    let closing = bytes.get(pos) == Some(&b'/');
    if closing {
        pos += 1;
    }

    let name_start = pos;
    if !bytes.get(pos).is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }
    while bytes
        .get(pos)
        .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'-')
    {
        pos += 1;
    }
    let name = SmolStr::new(src[name_start..pos].to_ascii_lowercase());

    let mut attrs = Vec::new();
    loop {
        pos = skip_whitespace(bytes, pos);
        match bytes.get(pos)? {
            b'>' => {
                return Some((
                    HtmlTag {
                        name,
                        closing,
                        attrs,
                    },
                    pos + 1,
                ));
            }
            b'/' if !closing && bytes.get(pos + 1) == Some(&b'>') => {
                return Some((
                    HtmlTag {
                        name,
                        closing,
                        attrs,
                    },
                    pos + 2,
                ));
            }
            _ if closing => return None,
            _ => {}
        }

        let key_start = pos;
        while bytes
            .get(pos)
            .is_some_and(|b| !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'"' | b'\''))
        {
            pos += 1;
        }
        if pos == key_start {
            return None;
        }
        let key = SmolStr::new(&src[key_start..pos]);

        let after_key = skip_whitespace(bytes, pos);
        if bytes.get(after_key) != Some(&b'=') {
            attrs.push((key, String::new()));
            continue;
        }
        pos = skip_whitespace(bytes, after_key + 1);

        let value = match bytes.get(pos)? {
            quote @ (b'"' | b'\'') => {
                let start = pos + 1;
                let len = src[start..].find(*quote as char)?;
                pos = start + len + 1;
                &src[start..start + len]
            }
            _ => {
                let start = pos;
                while bytes
                    .get(pos)
                    .is_some_and(|b| !b.is_ascii_whitespace() && *b != b'>')
                {
                    pos += 1;
                }
                &src[start..pos]
            }
        };
        attrs.push((key, html_escape::decode_html_entities(value).into_owned()));
    }
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
        pos += 1;
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_tag_with_attributes() {
        let src = r#"<a class="text-entity-link" data-entity-type="textUrl" href="https://x.y/?a=1&amp;b=2">rest"#;
        let (tag, len) = parse_tag(src).unwrap();
        assert_eq!(tag.name, "a");
        assert!(!tag.closing);
        assert_eq!(tag.entity_type(), Some("textUrl"));
        assert_eq!(tag.attr("href"), Some("https://x.y/?a=1&b=2"));
        assert_eq!(&src[len..], "rest");
    }

    #[test]
    fn test_parse_closing_tag() {
        let (tag, len) = parse_tag("</span>tail").unwrap();
        assert!(tag.closing);
        assert_eq!(tag.name, "span");
        assert_eq!(len, 7);
    }

    #[test]
    fn test_bare_and_unquoted_attributes() {
        let (tag, _) = parse_tag("<img data-alt=x alt contenteditable=false>").unwrap();
        assert_eq!(tag.attr("data-alt"), Some("x"));
        assert_eq!(tag.attr("alt"), Some(""));
        assert_eq!(tag.attr("contenteditable"), Some("false"));
    }

    #[test]
    fn test_rejects_non_tags() {
        assert!(parse_tag("a < b").is_none());
        assert!(parse_tag("< b>").is_none());
        assert!(parse_tag("<span data-x=\"unterminated").is_none());
        assert!(parse_tag("</span x>").is_none());
    }
}
