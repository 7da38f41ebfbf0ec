//! Line navigation helpers.
//!
//! These functions work with any `TextBuffer`. A line range always includes
//! its `\n` terminator when one exists.

use std::ops::Range;

use crate::text::TextBuffer;

/// Zero-width space, used as the checkmark marker glyph.
pub const ZERO_WIDTH_SPACE: char = '\u{200B}';

/// Find start of line containing offset.
pub fn find_line_start<T: TextBuffer + ?Sized>(text: &T, offset: usize) -> usize {
    let mut pos = offset.min(text.len_chars());
    while pos > 0 {
        if let Some('\n') = text.char_at(pos - 1) {
            return pos;
        }
        pos -= 1;
    }
    0
}

/// Find end of line containing offset (position of newline or end of doc).
pub fn find_line_end<T: TextBuffer + ?Sized>(text: &T, offset: usize) -> usize {
    let len = text.len_chars();
    let mut pos = offset.min(len);
    while pos < len {
        if let Some('\n') = text.char_at(pos) {
            return pos;
        }
        pos += 1;
    }
    len
}

/// Range of the line containing `offset`, terminator included.
pub fn line_range<T: TextBuffer + ?Sized>(text: &T, offset: usize) -> Range<usize> {
    let start = find_line_start(text, offset);
    let end = find_line_end(text, offset);
    let end = if end < text.len_chars() { end + 1 } else { end };
    start..end
}

/// Range covering every line touched by `range`, terminators included.
///
/// An empty range yields the line containing its location. A non-empty
/// range extends through the line holding its last character.
pub fn line_range_for<T: TextBuffer + ?Sized>(text: &T, range: Range<usize>) -> Range<usize> {
    let first = line_range(text, range.start);
    if range.end <= range.start + 1 {
        return first;
    }
    let last = line_range(text, range.end - 1);
    first.start..last.end.max(first.end)
}

/// Every line touched by `range`, in order.
pub fn lines_in<T: TextBuffer + ?Sized>(text: &T, range: Range<usize>) -> Vec<Range<usize>> {
    let covered = line_range_for(text, range);
    let mut lines = Vec::new();
    let mut pos = covered.start;
    loop {
        let line = line_range(text, pos);
        let next = line.end;
        lines.push(line);
        if next >= covered.end || next == pos {
            break;
        }
        pos = next;
    }
    lines
}

/// Length of a line without its terminator.
pub fn content_len<T: TextBuffer + ?Sized>(text: &T, line: &Range<usize>) -> usize {
    match line.end.checked_sub(1).and_then(|last| text.char_at(last)) {
        Some('\n') if line.end > line.start => line.len() - 1,
        _ => line.len(),
    }
}

/// Check if character at offset is a zero-width character.
pub fn is_zero_width_char<T: TextBuffer + ?Sized>(text: &T, offset: usize) -> bool {
    matches!(text.char_at(offset), Some('\u{200C}') | Some(ZERO_WIDTH_SPACE))
}
