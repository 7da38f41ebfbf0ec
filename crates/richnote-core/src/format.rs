//! The deferred formatting pass.
//!
//! A raw edit parks a `PendingEdit` in the buffer. The next call to
//! [`process_rich_formatting`] turns it into a [`ChangedText`] and offers it to
//! each formatter pass in order; the first pass that rewrites something wins
//! and its caret offset is handed back to the host.

use std::ops::Range;
use std::sync::Arc;

use crate::attrs::Attributes;
use crate::config::StyleRegistry;
use crate::list::ListItem;
use crate::lists::ListFormatter;
use crate::markdown;
use crate::storage::AttributedText;
use crate::text::TextBuffer;
use crate::types::{CaretHint, EditMask, PendingEdit};

/// What the last edit touched, as seen by the formatter passes.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangedText {
    /// Edited range in post-edit coordinates.
    pub edited: Range<usize>,
    pub mask: EditMask,
    /// The text now occupying `edited`.
    pub contents: String,
    /// Every line the edit touched, terminators included.
    pub line: Range<usize>,
    /// List item of the first touched line.
    pub list_item: Option<ListItem>,
}

impl ChangedText {
    pub fn from_pending<T: TextBuffer>(text: &AttributedText<T>, pending: &PendingEdit) -> Self {
        let edited = pending.range.clone();
        let covered = text.line_range_for(edited.clone());
        let first = text.line_range(edited.start);
        let line = covered.start.min(first.start)..covered.end.max(first.end);
        let contents = text
            .slice(edited.clone())
            .map(|s| s.to_string())
            .unwrap_or_default();
        let list_item = text.list_item_at(line.start);
        Self {
            edited,
            mask: pending.mask,
            contents,
            line,
            list_item,
        }
    }

    /// The edit was a single line break.
    pub fn is_new_line(&self) -> bool {
        self.contents == "\n"
    }

    /// The edit removed characters without inserting any.
    pub fn is_deletion(&self) -> bool {
        self.edited.is_empty()
    }
}

/// One pass of the formatting pipeline.
///
/// A pass inspects the changed text and either rewrites it, returning the
/// caret offset the host should use, or leaves it alone.
pub trait Formatter<T: TextBuffer> {
    fn name(&self) -> &'static str;

    fn format(
        &self,
        text: &mut AttributedText<T>,
        changed: &ChangedText,
        editing_style: &Attributes,
    ) -> Option<usize>;
}

/// Live inline markdown: `**bold**` and friends become styled text.
#[derive(Debug, Clone)]
pub struct WordsFormatter {
    registry: Arc<StyleRegistry>,
}

impl WordsFormatter {
    pub fn new(registry: Arc<StyleRegistry>) -> Self {
        Self { registry }
    }
}

impl<T: TextBuffer> Formatter<T> for WordsFormatter {
    fn name(&self) -> &'static str {
        "words"
    }

    fn format(
        &self,
        text: &mut AttributedText<T>,
        changed: &ChangedText,
        editing_style: &Attributes,
    ) -> Option<usize> {
        if changed.is_deletion() {
            return None;
        }
        markdown::format_words(text, changed, self.registry.live_specs(), editing_style)
    }
}

/// The standard pipeline: list transitions, then inline markdown.
pub fn default_passes<T: TextBuffer>(registry: Arc<StyleRegistry>) -> Vec<Box<dyn Formatter<T>>> {
    vec![Box::new(ListFormatter), Box::new(WordsFormatter::new(registry))]
}

/// Run the formatting passes over one pending edit.
///
/// Inserted characters first take `editing_style` (list markers and mention
/// tokens excepted), then the passes run in order until one rewrites the
/// text. Edits made by the passes are consumed here and never schedule
/// another pass.
pub fn process_rich_formatting<T: TextBuffer>(
    text: &mut AttributedText<T>,
    pending: PendingEdit,
    passes: &[Box<dyn Formatter<T>>],
    editing_style: &Attributes,
) -> Option<CaretHint> {
    if !pending.edited_characters() {
        return None;
    }
    if pending.range.end > text.len() {
        tracing::trace!(target: "richnote::format", range = ?pending.range, "stale pending edit");
        return None;
    }

    let changed = ChangedText::from_pending(text, &pending);
    tracing::trace!(
        target: "richnote::format",
        edited = ?changed.edited,
        line = ?changed.line,
        list = ?changed.list_item,
        "process_rich_formatting"
    );

    let caret = text.batch(|t| {
        let style = editing_style.typing();
        t.edit_attributes(changed.edited.clone(), |attrs| {
            if attrs.list.is_none() && attrs.mention.is_none() {
                *attrs = style.clone();
            }
        });
        passes.iter().find_map(|pass| {
            let caret = pass.format(t, &changed, editing_style)?;
            tracing::trace!(target: "richnote::format", pass = pass.name(), caret, "pass applied");
            Some(caret)
        })
    });

    // The passes' own edits are already formatted.
    let _ = text.take_pending_edit();
    caret.map(CaretHint::new)
}
