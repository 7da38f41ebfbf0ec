//! Character storage behind the attributed buffer.
//!
//! `AttributedText` only needs a handful of char-offset operations from its
//! storage; `EditorRope` provides them on a ropey rope.

use smol_str::{SmolStr, ToSmolStr};
use std::ops::Range;

/// Char-addressed storage. Offsets count Unicode scalar values.
pub trait TextBuffer {
    fn len_chars(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    fn insert(&mut self, at: usize, text: &str);

    /// Swap `range` for `text`.
    fn replace(&mut self, range: Range<usize>, text: &str);

    /// `None` when `range` is reversed or past the end.
    fn slice(&self, range: Range<usize>) -> Option<SmolStr>;

    fn char_at(&self, at: usize) -> Option<char>;

    fn to_string(&self) -> String;

    /// Char offset of a byte offset, for mapping regex matches back.
    fn byte_to_char(&self, byte: usize) -> usize;
}

#[derive(Clone, Default)]
pub struct EditorRope {
    rope: ropey::Rope,
}

impl EditorRope {
    pub fn from_str(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }
}

impl TextBuffer for EditorRope {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn insert(&mut self, at: usize, text: &str) {
        if !text.is_empty() {
            self.rope.insert(at, text);
        }
    }

    fn replace(&mut self, range: Range<usize>, text: &str) {
        if !range.is_empty() {
            self.rope.remove(range.clone());
        }
        self.insert(range.start, text);
    }

    fn slice(&self, range: Range<usize>) -> Option<SmolStr> {
        if range.start > range.end || range.end > self.len_chars() {
            return None;
        }
        Some(self.rope.slice(range).to_smolstr())
    }

    fn char_at(&self, at: usize) -> Option<char> {
        (at < self.len_chars()).then(|| self.rope.char(at))
    }

    fn to_string(&self) -> String {
        self.rope.to_string()
    }

    fn byte_to_char(&self, byte: usize) -> usize {
        self.rope.byte_to_char(byte)
    }
}

impl std::fmt::Debug for EditorRope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EditorRope({:?})", self.rope.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_and_insert() {
        let mut rope = EditorRope::from_str("hello world");
        rope.insert(5, ",");
        rope.replace(7..12, "rope");
        assert_eq!(rope.to_string(), "hello, rope");
        rope.replace(5..5, "");
        assert_eq!(rope.len_chars(), 11);
    }

    #[test]
    fn test_slice_bounds() {
        let rope = EditorRope::from_str("• item");
        assert_eq!(rope.slice(0..1).as_deref(), Some("•"));
        assert_eq!(rope.slice(2..6).as_deref(), Some("item"));
        assert_eq!(rope.slice(0..100), None);
        assert_eq!(rope.char_at(6), None);
    }

    #[test]
    fn test_byte_offsets_map_to_chars() {
        let rope = EditorRope::from_str("•a");
        assert_eq!(rope.len_chars(), 2);
        assert_eq!(rope.byte_to_char(3), 1);
    }
}
