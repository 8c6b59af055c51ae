//! UTF-16 addressed text.
//!
//! Entity offsets and caret offsets are counted in UTF-16 code units, the unit
//! hosts exchange formatted text in. `Utf16Text` wraps a rope so offsets can be
//! converted, sliced and mapped to lines without rescanning the string.

use std::ops::Range;

use ropey::Rope;

/// Length of a string in UTF-16 code units.
pub fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

/// Byte index of a UTF-16 offset inside `s`, clamped to the string length.
///
/// An offset that falls inside a surrogate pair resolves to the start of
/// that character.
pub fn utf16_to_byte(s: &str, offset: usize) -> usize {
    let mut units = 0;
    for (byte, ch) in s.char_indices() {
        if units >= offset {
            return byte;
        }
        units += ch.len_utf16();
        if units > offset {
            return byte;
        }
    }
    s.len()
}

/// Closest character boundary at or before a UTF-16 offset, clamped to the
/// string length.
pub fn utf16_floor(s: &str, offset: usize) -> usize {
    let mut units = 0;
    for ch in s.chars() {
        let next = units + ch.len_utf16();
        if next > offset {
            break;
        }
        units = next;
    }
    units
}

/// Rope-backed text addressed in UTF-16 code units.
#[derive(Clone, Debug, Default)]
pub struct Utf16Text {
    rope: Rope,
}

impl Utf16Text {
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    pub fn len_utf16(&self) -> usize {
        self.rope.len_utf16_cu()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Char index for a UTF-16 offset, clamped to the end of the text.
    pub fn utf16_to_char(&self, offset: usize) -> usize {
        self.rope.utf16_cu_to_char(offset.min(self.len_utf16()))
    }

    pub fn char_to_utf16(&self, char_idx: usize) -> usize {
        self.rope
            .char_to_utf16_cu(char_idx.min(self.rope.len_chars()))
    }

    /// Copy out a UTF-16 range. Out-of-bounds ends are clamped.
    pub fn slice(&self, range: Range<usize>) -> String {
        let start = self.utf16_to_char(range.start);
        let end = self.utf16_to_char(range.end.max(range.start));
        self.rope.slice(start..end).to_string()
    }

    /// The character that contains the given UTF-16 code unit.
    pub fn char_at(&self, offset: usize) -> Option<char> {
        if offset >= self.len_utf16() {
            return None;
        }
        self.rope.get_char(self.utf16_to_char(offset))
    }

    /// Number of `\n`-separated lines. An empty text has one (empty) line, and
    /// a trailing newline starts a new empty line.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Line contents without the terminating newline.
    pub fn line(&self, idx: usize) -> String {
        if idx >= self.rope.len_lines() {
            return String::new();
        }
        let mut line = self.rope.line(idx).to_string();
        if line.ends_with('\n') {
            line.pop();
        }
        line
    }

    pub fn lines(&self) -> Vec<String> {
        (0..self.line_count()).map(|idx| self.line(idx)).collect()
    }

    /// Line index containing a UTF-16 offset, and the offset within that line.
    pub fn line_of(&self, offset: usize) -> (usize, usize) {
        let char_idx = self.utf16_to_char(offset);
        let line = self.rope.char_to_line(char_idx);
        let line_start = self.rope.line_to_char(line);
        let in_line = self.rope.char_to_utf16_cu(char_idx) - self.rope.char_to_utf16_cu(line_start);
        (line, in_line)
    }

    /// UTF-16 offset of the first unit of a line.
    pub fn line_start(&self, line: usize) -> usize {
        let line = line.min(self.rope.len_lines().saturating_sub(1));
        self.rope.char_to_utf16_cu(self.rope.line_to_char(line))
    }
}

impl From<&str> for Utf16Text {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for Utf16Text {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for chunk in self.rope.chunks() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}
