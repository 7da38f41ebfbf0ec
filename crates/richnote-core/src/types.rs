//! Selection, edit records and caret hints shared by the buffer and the editor.

use std::ops::Range;

use bitflags::bitflags;

bitflags! {
    /// What an edit changed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EditMask: u8 {
        const CHARACTERS = 1 << 0;
        const ATTRIBUTES = 1 << 1;
    }
}

/// A host selection. `head` is the moving end and may sit before `anchor`.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn collapsed(offset: usize) -> Self {
        Self {
            anchor: offset,
            head: offset,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// The selected chars, lowest offset first.
    pub fn to_range(&self) -> Range<usize> {
        self.anchor.min(self.head)..self.anchor.max(self.head)
    }
}

impl From<Range<usize>> for Selection {
    fn from(range: Range<usize>) -> Self {
        Self {
            anchor: range.start,
            head: range.end,
        }
    }
}

/// The edit captured by the outermost editing bracket, waiting for the next
/// formatting pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingEdit {
    /// Edited range in post-edit coordinates.
    pub range: Range<usize>,
    pub mask: EditMask,
    /// Net change in buffer length, in chars.
    pub change_in_length: isize,
}

impl PendingEdit {
    pub fn edited_characters(&self) -> bool {
        self.mask.contains(EditMask::CHARACTERS)
    }
}

/// Where the host should put its cursor after an automatic rewrite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaretHint {
    pub offset: usize,
}

impl CaretHint {
    pub fn new(offset: usize) -> Self {
        Self { offset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backward_selection_orders_its_range() {
        let sel = Selection { anchor: 7, head: 3 };
        assert_eq!(sel.to_range(), 3..7);
        assert!(!sel.is_collapsed());
        assert!(Selection::collapsed(4).is_collapsed());
        assert_eq!(Selection::from(2..5).head, 5);
    }
}
