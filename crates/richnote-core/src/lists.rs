//! List state machine.
//!
//! List state lives on each line: a line either starts with a marker (whose
//! characters carry the `list` attribute) or it is a plain paragraph. The
//! functions here insert, swap and remove markers, continue lists on Enter,
//! end them on an empty item, and keep ordered numbering consecutive.

use std::ops::Range;

use crate::attrs::Attributes;
use crate::format::{ChangedText, Formatter};
use crate::list::ListItem;
use crate::storage::AttributedText;
use crate::text::TextBuffer;

fn marker_spans(item: &ListItem) -> Vec<crate::storage::Span> {
    item.marker_spans(&Attributes::default())
}

/// Insert a marker for `item` at `line_start`. Returns the marker length.
pub fn insert_marker<T: TextBuffer>(
    text: &mut AttributedText<T>,
    line_start: usize,
    item: ListItem,
) -> usize {
    if text.insert_spans(line_start, &marker_spans(&item)) {
        item.marker_len()
    } else {
        0
    }
}

/// Swap the marker at `line_start` for one of `item`.
///
/// Returns the old and new marker lengths, or `None` when the line has no
/// marker.
pub fn set_marker<T: TextBuffer>(
    text: &mut AttributedText<T>,
    line_start: usize,
    item: ListItem,
) -> Option<(usize, usize)> {
    let old = text.marker_range(line_start)?;
    let old_len = old.len();
    text.replace_spans(old, &marker_spans(&item));
    Some((old_len, item.marker_len()))
}

/// Remove the marker at `line_start`, returning the item and the range it
/// occupied.
pub fn remove_marker<T: TextBuffer>(
    text: &mut AttributedText<T>,
    line_start: usize,
) -> Option<(ListItem, Range<usize>)> {
    let item = text.list_item_at(line_start)?;
    let range = text.marker_range(line_start)?;
    text.replace_spans(range.clone(), &[]);
    Some((item, range))
}

/// Set the checked state of the checkmark item at `line_start`.
///
/// The marker length does not change, so offsets after it stay valid.
/// Returns `false` when the line is not a checkmark item.
pub fn set_checkmark<T: TextBuffer>(
    text: &mut AttributedText<T>,
    line_start: usize,
    checked: bool,
) -> bool {
    let Some(ListItem::Checkmark(_)) = text.list_item_at(line_start) else {
        return false;
    };
    let swapped = text.batch(|t| set_marker(t, line_start, ListItem::checkmark(checked)));
    if swapped.is_some() {
        tracing::debug!(target: "richnote::format", line_start, checked, "set checkmark");
    }
    swapped.is_some()
}

/// Ordered item on the line directly above the one holding `index`.
pub fn previous_ordered_item<T: TextBuffer>(
    text: &AttributedText<T>,
    index: usize,
) -> Option<ListItem> {
    let line = text.line_range(index);
    if line.start == 0 {
        return None;
    }
    let previous = text.line_range(line.start - 1);
    text.list_item_at(previous.start)
        .filter(ListItem::is_ordered)
}

/// Renumber the ordered lines starting at `line_start`.
///
/// The first line becomes `prior.next_item()` (or 1 without an ordered
/// prior), and each following ordered line counts on from there. Stops at
/// the first line that is not ordered.
pub fn renumber_following<T: TextBuffer>(
    text: &mut AttributedText<T>,
    line_start: usize,
    prior: Option<ListItem>,
) {
    let mut expected = prior
        .filter(ListItem::is_ordered)
        .map(|item| item.next_item())
        .unwrap_or(ListItem::ordered(1));
    let mut pos = line_start;

    text.batch(|t| {
        while let Some(item) = t.list_item_at(pos) {
            if !item.is_ordered() {
                break;
            }
            if item != expected {
                tracing::trace!(
                    target: "richnote::format",
                    from = %item,
                    to = %expected,
                    line = pos,
                    "renumbering ordered item"
                );
                set_marker(t, pos, expected);
            }
            let line = t.line_range(pos);
            if line.end <= pos {
                break;
            }
            pos = line.end;
            expected = expected.next_item();
        }
    });
}

/// Renumber the ordered lines after the line holding `at`.
///
/// Numbering continues from that line when it is ordered. `reversed` forces
/// the following lines to restart at 1 regardless.
pub fn reformat_following_ordered_items<T: TextBuffer>(
    text: &mut AttributedText<T>,
    at: usize,
    reversed: bool,
) {
    if at > text.len() {
        return;
    }
    let line = text.line_range(at);
    let prior = if reversed {
        None
    } else {
        match text.list_item_at(line.start) {
            Some(item) if item.is_ordered() => Some(item),
            _ => return,
        }
    };
    renumber_following(text, line.end, prior);
}

/// Make every ordered line that follows an ordered line hold the next number.
pub fn renumber_all<T: TextBuffer>(text: &mut AttributedText<T>) {
    let mut pos = 0;
    let mut in_run = false;
    while pos < text.len() {
        let line = text.line_range(pos);
        match text.list_item_at(line.start) {
            Some(item) if item.is_ordered() => {
                if !in_run {
                    renumber_following(text, line.end, Some(item));
                }
                in_run = true;
            }
            _ => in_run = false,
        }
        let line = text.line_range(pos);
        if line.end <= pos {
            break;
        }
        pos = line.end;
    }
}

/// Caret fix: a caret inside a marker belongs at the marker end.
pub fn marker_end_for<T: TextBuffer>(text: &AttributedText<T>, caret: usize) -> Option<usize> {
    let line = text.line_range(caret);
    let marker = text.marker_range(line.start)?;
    let (tail, _) = text.attributes_at(marker.end.checked_sub(1)?)?;
    (tail.caret && caret < marker.end).then_some(marker.end)
}

/// Backspace inside a marker removes the item instead of one character.
///
/// When the line holds nothing but the marker it is deleted outright;
/// otherwise the marker and the preceding line break go, merging the item
/// into the previous line. Returns the caret for the host, which should drop
/// its own edit.
pub fn handle_before_text_change<T: TextBuffer>(
    text: &mut AttributedText<T>,
    range: Range<usize>,
    replacement: &str,
) -> Option<usize> {
    if !replacement.is_empty() || range.is_empty() {
        return None;
    }
    let line = text.line_range(range.start);
    let item = text.list_item_at(line.start)?;
    let marker = text.marker_range(line.start)?;
    if range.start < line.start || range.start >= marker.end {
        return None;
    }

    tracing::debug!(target: "richnote::format", %item, line = ?line, "removing list item on backspace");

    let cursor = line.start.saturating_sub(1);
    let caret = text.batch(|t| {
        if line.end <= marker.end {
            t.replace_spans(line.clone(), &[]);
        } else {
            t.replace_spans(cursor..marker.end, &[]);
        }
        if item.is_ordered() {
            let next_line = t.line_range(cursor).end;
            renumber_following(t, next_line, Some(item.previous_item()));
        }
        cursor
    });
    Some(caret)
}

/// Apply `item` to every line touched by `selection`.
///
/// Plain lines gain a marker, list lines have theirs swapped. Ordered items
/// continue the numbering of an ordered line directly above. Returns the
/// selection shifted by the marker changes.
pub fn add_or_replace_list_item<T: TextBuffer>(
    text: &mut AttributedText<T>,
    item: ListItem,
    selection: Range<usize>,
) -> Option<Range<usize>> {
    if selection.start > selection.end || selection.end > text.len() {
        return None;
    }

    let mut next = if item.is_ordered() {
        previous_ordered_item(text, selection.start)
            .map(|previous| previous.next_item())
            .unwrap_or(item)
    } else {
        item
    };

    let lines = text.lines_in(selection.clone());
    let first_start = lines.first()?.start;

    let (first_delta, delta, last_start) = text.batch(|t| {
        let mut first_delta: Option<isize> = None;
        let mut delta: isize = 0;
        let mut last_start = first_start;
        for line in &lines {
            let start = (line.start as isize + delta) as usize;
            if start > t.len() {
                break;
            }
            let change = match set_marker(t, start, next) {
                Some((old_len, new_len)) => new_len as isize - old_len as isize,
                None => insert_marker(t, start, next) as isize,
            };
            first_delta.get_or_insert(change);
            delta += change;
            last_start = start;
            next = next.next_item();
        }
        (first_delta.unwrap_or(0), delta, last_start)
    });

    tracing::debug!(target: "richnote::format", %item, lines = lines.len(), "applied list item");

    reformat_following_ordered_items(text, last_start, false);

    let start = ((selection.start as isize + first_delta).max(first_start as isize)) as usize;
    let end = ((selection.end as isize + delta).max(start as isize)) as usize;
    Some(start..end)
}

/// Remove the marker from the line holding `selection.start`.
///
/// Acts only when that line carries a caret-hint marker. Following ordered
/// lines restart from 1.
pub fn remove_list_item<T: TextBuffer>(
    text: &mut AttributedText<T>,
    selection: Range<usize>,
) -> Option<Range<usize>> {
    if selection.end > text.len() {
        return None;
    }
    let line = text.line_range(selection.start);
    let marker = text.marker_range(line.start)?;
    let (tail, _) = text.attributes_at(marker.end.checked_sub(1)?)?;
    if !tail.caret {
        return None;
    }

    let (item, removed) = remove_marker(text, line.start)?;
    tracing::debug!(target: "richnote::format", %item, "removed list item");

    reformat_following_ordered_items(text, line.start, true);

    let len = removed.len();
    let start = selection.start.saturating_sub(len).max(line.start);
    let end = selection.end.saturating_sub(len).max(start);
    Some(start..end)
}

/// The list pass of the formatting pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFormatter;

impl ListFormatter {
    fn continue_or_end<T: TextBuffer>(
        &self,
        text: &mut AttributedText<T>,
        changed: &ChangedText,
        item: ListItem,
    ) -> usize {
        let marker_len = text
            .marker_range(changed.line.start)
            .map(|marker| marker.len())
            .unwrap_or_else(|| item.marker_len());

        if changed.line.len() <= marker_len + 1 {
            tracing::debug!(target: "richnote::format", %item, "ending list on empty item");
            text.replace_spans(changed.line.clone(), &[]);
            if item.is_ordered() {
                renumber_following(text, changed.line.start, Some(item.previous_item()));
            }
            return changed.line.start;
        }

        let next = item.next_item();
        let at = changed.edited.end;
        insert_marker(text, at, next);
        if next.is_ordered() {
            let after = text.line_range(at).end;
            renumber_following(text, after, Some(next));
        }
        at + next.marker_len()
    }

    fn start_list<T: TextBuffer>(
        &self,
        text: &mut AttributedText<T>,
        changed: &ChangedText,
    ) -> Option<usize> {
        let line = text.line_range(changed.line.start);
        let content_end = line.start + text.line_content_len(&line);
        let content = text.slice(line.start..content_end)?;
        let (detected, prefix_len) = ListItem::detect(&content)?;
        let prefix_end = line.start + prefix_len;
        if text
            .runs_in(line.start..prefix_end)
            .any(|run| run.attrs.mention.is_some())
        {
            return None;
        }

        let item = if detected.is_ordered() {
            previous_ordered_item(text, line.start)
                .map(|previous| previous.next_item())
                .unwrap_or(detected)
        } else {
            detected
        };

        tracing::debug!(target: "richnote::format", %item, "starting list");

        text.replace_spans(line.start..prefix_end, &marker_spans(&item));
        let marker_len = item.marker_len();
        if item.is_ordered() {
            let after = text.line_range(line.start).end;
            renumber_following(text, after, Some(item));
        }

        let caret = if changed.edited.end >= prefix_end {
            changed.edited.end - prefix_len + marker_len
        } else {
            line.start + marker_len
        };
        Some(caret)
    }
}

impl<T: TextBuffer> Formatter<T> for ListFormatter {
    fn name(&self) -> &'static str {
        "lists"
    }

    fn format(
        &self,
        text: &mut AttributedText<T>,
        changed: &ChangedText,
        _editing_style: &Attributes,
    ) -> Option<usize> {
        match changed.list_item {
            Some(item) if changed.is_new_line() => Some(self.continue_or_end(text, changed, item)),
            Some(_) => None,
            None => self.start_list(text, changed),
        }
    }
}
