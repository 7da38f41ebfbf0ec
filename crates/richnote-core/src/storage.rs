//! Attributed text storage.
//!
//! `AttributedText` pairs a `TextBuffer` with a run list. Runs partition the
//! buffer: they are contiguous, never empty, and their lengths always sum to
//! the buffer length. Adjacent runs with equal attributes are merged after
//! every mutation.
//!
//! Mutations happen inside an editing bracket. Nested brackets coalesce, and
//! when the outermost one closes the combined edit is parked in a one-slot
//! `PendingEdit` for the next formatting pass to take.

use std::ops::Range;

use smol_str::SmolStr;

use crate::attrs::{Attributes, MentionRef};
use crate::list::ListItem;
use crate::text::{EditorRope, TextBuffer};
use crate::text_helpers;
use crate::types::{EditMask, PendingEdit};

/// Owned piece of attributed text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Span {
    pub text: String,
    pub attrs: Attributes,
}

impl Span {
    pub fn new(text: impl Into<String>, attrs: Attributes) -> Self {
        Self {
            text: text.into(),
            attrs,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Attributes::default())
    }

    pub fn len_chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// A run of characters sharing one attribute set.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub len: usize,
    pub attrs: Attributes,
}

/// Borrowed view of a run with its absolute range.
#[derive(Debug, Clone)]
pub struct RunRef<'a> {
    pub range: Range<usize>,
    pub attrs: &'a Attributes,
}

#[derive(Debug, Clone)]
struct EditedState {
    range: Range<usize>,
    mask: EditMask,
    delta: isize,
}

/// Character buffer plus attribute runs.
#[derive(Debug, Clone)]
pub struct AttributedText<T: TextBuffer = EditorRope> {
    text: T,
    runs: Vec<Run>,
    editing_depth: usize,
    edited: Option<EditedState>,
    pending: Option<PendingEdit>,
}

impl<T: TextBuffer + Default> Default for AttributedText<T> {
    fn default() -> Self {
        Self {
            text: T::default(),
            runs: Vec::new(),
            editing_depth: 0,
            edited: None,
            pending: None,
        }
    }
}

impl<T: TextBuffer + Default> AttributedText<T> {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer holding `text` with uniform attributes.
    pub fn plain(text: &str, attrs: Attributes) -> Self {
        Self::from_spans([Span::new(text, attrs)])
    }

    /// Build a buffer from spans. No pending edit is recorded.
    pub fn from_spans(spans: impl IntoIterator<Item = Span>) -> Self {
        let mut out = Self::default();
        for span in spans {
            let len = span.len_chars();
            if len == 0 {
                continue;
            }
            let at = out.text.len_chars();
            out.text.insert(at, &span.text);
            out.runs.push(Run {
                len,
                attrs: span.attrs,
            });
        }
        out.normalize();
        out
    }
}

impl<T: TextBuffer> AttributedText<T> {
    /// Length in chars.
    pub fn len(&self) -> usize {
        self.text.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The whole text as a String.
    pub fn text(&self) -> String {
        self.text.to_string()
    }

    pub fn buffer(&self) -> &T {
        &self.text
    }

    pub fn slice(&self, range: Range<usize>) -> Option<SmolStr> {
        self.text.slice(range)
    }

    pub fn char_at(&self, offset: usize) -> Option<char> {
        self.text.char_at(offset)
    }

    fn in_bounds(&self, range: &Range<usize>) -> bool {
        range.start <= range.end && range.end <= self.len()
    }

    // === Editing bracket ===

    /// Open an editing bracket. Brackets nest.
    pub fn begin_editing(&mut self) {
        self.editing_depth += 1;
    }

    /// Close an editing bracket, parking the coalesced edit when the
    /// outermost bracket closes.
    pub fn end_editing(&mut self) {
        self.editing_depth = self.editing_depth.saturating_sub(1);
        if self.editing_depth == 0 {
            self.process_editing();
        }
    }

    /// Run `f` inside one editing bracket.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_editing();
        let out = f(self);
        self.end_editing();
        out
    }

    pub fn is_editing(&self) -> bool {
        self.editing_depth > 0
    }

    fn process_editing(&mut self) {
        let Some(state) = self.edited.take() else {
            return;
        };
        let len = self.len();
        let range = state.range.start.min(len)..state.range.end.min(len);
        tracing::trace!(
            target: "richnote::storage",
            ?range,
            mask = ?state.mask,
            delta = state.delta,
            "process_editing"
        );
        self.pending = Some(PendingEdit {
            range,
            mask: state.mask,
            change_in_length: state.delta,
        });
    }

    /// Record an edit. `range` is in post-edit coordinates.
    fn edited(&mut self, mask: EditMask, range: Range<usize>, delta: isize) {
        self.begin_editing();
        let next = match self.edited.take() {
            None => EditedState { range, mask, delta },
            Some(prev) => {
                let old_len = (range.len() as isize - delta).max(0) as usize;
                let old_end = range.start + old_len;
                let shift = |p: usize, inside: usize| {
                    if p <= range.start {
                        p
                    } else if p >= old_end {
                        (p as isize + delta).max(0) as usize
                    } else {
                        inside
                    }
                };
                let start = shift(prev.range.start, range.start);
                let end = shift(prev.range.end, range.end);
                EditedState {
                    range: start.min(range.start)..end.max(range.end),
                    mask: prev.mask | mask,
                    delta: prev.delta + delta,
                }
            }
        };
        self.edited = Some(next);
        self.end_editing();
    }

    /// Take the edit waiting for formatting, if any.
    pub fn take_pending_edit(&mut self) -> Option<PendingEdit> {
        self.pending.take()
    }

    pub fn pending_edit(&self) -> Option<&PendingEdit> {
        self.pending.as_ref()
    }

    // === Mutation ===

    /// Replace characters. New text takes the typing attributes of its
    /// neighbourhood.
    pub fn replace(&mut self, range: Range<usize>, text: &str) -> bool {
        if !self.in_bounds(&range) {
            tracing::trace!(target: "richnote::storage", ?range, len = self.len(), "replace out of range");
            return false;
        }
        let attrs = self.inherited_attributes(&range);
        self.replace_spans_masked(range, &[Span::new(text, attrs)], EditMask::CHARACTERS)
    }

    /// Replace characters with text carrying explicit attributes.
    pub fn replace_attributed(&mut self, range: Range<usize>, text: &str, attrs: Attributes) -> bool {
        self.replace_spans(range, &[Span::new(text, attrs)])
    }

    /// Replace characters with a sequence of spans.
    pub fn replace_spans(&mut self, range: Range<usize>, spans: &[Span]) -> bool {
        self.replace_spans_masked(range, spans, EditMask::CHARACTERS | EditMask::ATTRIBUTES)
    }

    /// Insert spans at `offset`.
    pub fn insert_spans(&mut self, offset: usize, spans: &[Span]) -> bool {
        self.replace_spans(offset..offset, spans)
    }

    fn replace_spans_masked(&mut self, range: Range<usize>, spans: &[Span], mask: EditMask) -> bool {
        if !self.in_bounds(&range) {
            return false;
        }

        let mut joined = String::new();
        let mut new_runs = Vec::with_capacity(spans.len());
        for span in spans {
            let len = span.len_chars();
            if len == 0 {
                continue;
            }
            joined.push_str(&span.text);
            new_runs.push(Run {
                len,
                attrs: span.attrs.clone(),
            });
        }
        let inserted: usize = new_runs.iter().map(|r| r.len).sum();

        let lo = self.split_at(range.start);
        let hi = self.split_at(range.end);
        self.runs.splice(lo..hi, new_runs);
        self.text.replace(range.clone(), &joined);
        self.normalize();

        let delta = inserted as isize - range.len() as isize;
        self.edited(mask, range.start..range.start + inserted, delta);
        true
    }

    /// Replace the attributes of a range wholesale.
    pub fn set_attributes(&mut self, attrs: Attributes, range: Range<usize>) -> bool {
        if !self.in_bounds(&range) {
            return false;
        }
        if range.is_empty() {
            return true;
        }
        let lo = self.split_at(range.start);
        let hi = self.split_at(range.end);
        self.runs.splice(
            lo..hi,
            [Run {
                len: range.len(),
                attrs,
            }],
        );
        self.normalize();
        self.edited(EditMask::ATTRIBUTES, range, 0);
        true
    }

    /// Overlay `patch` onto every run in `range` that is not a list marker.
    ///
    /// Marker runs are kept verbatim so styling a selection never disturbs
    /// list structure.
    pub fn update_attributes(&mut self, patch: &Attributes, range: Range<usize>) -> bool {
        self.edit_attributes(range, |attrs| {
            if attrs.list.is_none() {
                attrs.apply_patch(patch);
            }
        })
    }

    /// Mutate the attributes of every run piece in `range`.
    pub fn edit_attributes(
        &mut self,
        range: Range<usize>,
        mut f: impl FnMut(&mut Attributes),
    ) -> bool {
        if !self.in_bounds(&range) {
            return false;
        }
        if range.is_empty() {
            return true;
        }
        let lo = self.split_at(range.start);
        let hi = self.split_at(range.end);
        for run in &mut self.runs[lo..hi] {
            f(&mut run.attrs);
        }
        self.normalize();
        self.edited(EditMask::ATTRIBUTES, range, 0);
        true
    }

    /// Attributes new text at `range` should take.
    pub fn inherited_attributes(&self, range: &Range<usize>) -> Attributes {
        let at = if !range.is_empty() {
            range.start
        } else {
            range.start.saturating_sub(1)
        };
        self.run_at(at)
            .map(|(run, _)| run.attrs.typing())
            .unwrap_or_default()
    }

    /// Ensure a run boundary at `pos`, returning the index of the run that
    /// starts there (or `runs.len()` at the end).
    fn split_at(&mut self, pos: usize) -> usize {
        let mut start = 0;
        for i in 0..self.runs.len() {
            let len = self.runs[i].len;
            if pos == start {
                return i;
            }
            if pos < start + len {
                let head = pos - start;
                let tail = Run {
                    len: len - head,
                    attrs: self.runs[i].attrs.clone(),
                };
                self.runs[i].len = head;
                self.runs.insert(i + 1, tail);
                return i + 1;
            }
            start += len;
        }
        self.runs.len()
    }

    fn normalize(&mut self) {
        self.runs.retain(|run| run.len > 0);
        let mut merged: Vec<Run> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            match merged.last_mut() {
                Some(last) if last.attrs == run.attrs && joins_token(last, &run) => {
                    last.len += run.len
                }
                _ => merged.push(run),
            }
        }
        self.runs = merged;
        debug_assert!(self.is_partitioned(), "runs no longer cover the buffer");
    }

    /// Check the run partition invariant.
    pub fn is_partitioned(&self) -> bool {
        self.runs.iter().all(|run| run.len > 0)
            && self.runs.iter().map(|run| run.len).sum::<usize>() == self.len()
    }

    // === Queries ===

    /// Iterate runs with their absolute ranges.
    pub fn runs(&self) -> impl Iterator<Item = RunRef<'_>> + '_ {
        let mut start = 0;
        self.runs.iter().map(move |run| {
            let range = start..start + run.len;
            start += run.len;
            RunRef {
                range,
                attrs: &run.attrs,
            }
        })
    }

    /// Runs overlapping `range`, clipped to it.
    pub fn runs_in(&self, range: Range<usize>) -> impl Iterator<Item = RunRef<'_>> + '_ {
        self.runs().filter_map(move |run| {
            let start = run.range.start.max(range.start);
            let end = run.range.end.min(range.end);
            (start < end).then_some(RunRef {
                range: start..end,
                attrs: run.attrs,
            })
        })
    }

    fn run_at(&self, index: usize) -> Option<(&Run, usize)> {
        let mut start = 0;
        for run in &self.runs {
            if index < start + run.len {
                return Some((run, start));
            }
            start += run.len;
        }
        None
    }

    /// Attributes at `index` with their longest effective range.
    pub fn attributes_at(&self, index: usize) -> Option<(&Attributes, Range<usize>)> {
        let mut start = 0;
        let mut found = None;
        for (i, run) in self.runs.iter().enumerate() {
            if index < start + run.len {
                found = Some((i, start));
                break;
            }
            start += run.len;
        }
        let (i, start) = found?;
        let attrs = &self.runs[i].attrs;

        let mut lo = start;
        for run in self.runs[..i].iter().rev() {
            if run.attrs != *attrs {
                break;
            }
            lo -= run.len;
        }
        let mut hi = start + self.runs[i].len;
        for run in &self.runs[i + 1..] {
            if run.attrs != *attrs {
                break;
            }
            hi += run.len;
        }
        Some((attrs, lo..hi))
    }

    /// Owned spans covering `range`.
    pub fn spans(&self, range: Range<usize>) -> Vec<Span> {
        self.runs_in(range)
            .filter_map(|run| {
                self.text
                    .slice(run.range.clone())
                    .map(|text| Span::new(text.as_str(), run.attrs.clone()))
            })
            .collect()
    }

    /// Owned spans for the whole buffer.
    pub fn to_spans(&self) -> Vec<Span> {
        self.spans(0..self.len())
    }

    pub fn line_range(&self, index: usize) -> Range<usize> {
        text_helpers::line_range(&self.text, index)
    }

    pub fn line_range_for(&self, range: Range<usize>) -> Range<usize> {
        text_helpers::line_range_for(&self.text, range)
    }

    /// Lines touched by `range`, terminators included.
    pub fn lines_in(&self, range: Range<usize>) -> Vec<Range<usize>> {
        text_helpers::lines_in(&self.text, range)
    }

    /// Every line of the buffer, terminators included.
    pub fn lines(&self) -> Vec<Range<usize>> {
        self.lines_in(0..self.len())
    }

    /// Length of a line without its terminator.
    pub fn line_content_len(&self, line: &Range<usize>) -> usize {
        text_helpers::content_len(&self.text, line)
    }

    /// List item whose marker starts at `line_start`.
    pub fn list_item_at(&self, line_start: usize) -> Option<ListItem> {
        self.attributes_at(line_start).and_then(|(attrs, _)| attrs.list)
    }

    /// Range of the list marker starting at `line_start`.
    ///
    /// The marker ends after the character carrying the caret hint, or at the
    /// last list-tagged character when the hint is missing.
    pub fn marker_range(&self, line_start: usize) -> Option<Range<usize>> {
        let (attrs, range) = self.attributes_at(line_start)?;
        attrs.list?;
        let mut end = range.end;
        let mut done = attrs.caret;
        while !done {
            match self.attributes_at(end) {
                Some((next, next_range)) if next.list.is_some() => {
                    end = next_range.end;
                    done = next.caret;
                }
                _ => break,
            }
        }
        Some(line_start..end)
    }

    /// Mention token covering `index`.
    ///
    /// Each token is its own run, so two adjacent tokens for the same
    /// mention stay apart.
    pub fn mention_at(&self, index: usize) -> Option<(MentionRef, Range<usize>)> {
        let (run, start) = self.run_at(index)?;
        let mention = run.attrs.mention.clone()?;
        Some((mention, start..start + run.len))
    }

    /// Every mention token in document order.
    pub fn mentions(&self) -> Vec<(MentionRef, Range<usize>)> {
        self.runs()
            .filter_map(|run| run.attrs.mention.clone().map(|mention| (mention, run.range)))
            .collect()
    }
}

/// Whether two equal runs may merge. Pieces of one mention token rejoin,
/// but a merge never grows a token past its display text.
fn joins_token(last: &Run, next: &Run) -> bool {
    match &last.attrs.mention {
        Some(mention) => last.len + next.len <= mention.display.chars().count(),
        None => true,
    }
}

impl AttributedText<EditorRope> {
    /// Create a plain buffer with default attributes.
    pub fn from_str(text: &str) -> Self {
        Self::plain(text, Attributes::default())
    }
}
