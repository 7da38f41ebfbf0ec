//! The editor facade the host view talks to.
//!
//! The host forwards its text-view callbacks (`before_text_change`,
//! `replace`, `after_text_change`, `selection_changed`) and toolbar actions.
//! The editor never touches the view; it queues [`EditorEvent`]s and caret
//! hints for the host to drain and apply.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::attrs::{Attributes, MentionRef};
use crate::config::{EditorConfig, InlineStyle, StyleRegistry};
use crate::error::EditorError;
use crate::format::{self, Formatter};
use crate::list::ListItem;
use crate::lists;
use crate::markdown;
use crate::mention::{self, MentionEvent, MentionState, Mentionable};
use crate::storage::AttributedText;
use crate::text::{EditorRope, TextBuffer};
use crate::types::{CaretHint, Selection};

/// Style reported to the host for the current selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextFormat {
    pub inline: InlineStyle,
    pub list: Option<ListItem>,
}

impl TextFormat {
    pub fn from_attributes(attrs: &Attributes, list: Option<ListItem>) -> Self {
        Self {
            inline: InlineStyle::from_attributes(attrs),
            list,
        }
    }

    pub fn to_attributes(&self) -> Attributes {
        self.inline.to_attributes()
    }
}

/// Notifications for the host.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    MentionStarted { location: usize },
    HashtagStarted { location: usize },
    SearchTextChanged(String),
    MentionRemoved { id: i64 },
    SymbolRemoved,
    MentionCancelled,
    StyleAtSelection(TextFormat),
}

impl From<MentionEvent> for EditorEvent {
    fn from(event: MentionEvent) -> Self {
        match event {
            MentionEvent::Started { location } => EditorEvent::MentionStarted { location },
            MentionEvent::SearchTextChanged(search) => EditorEvent::SearchTextChanged(search),
            MentionEvent::SymbolRemoved => EditorEvent::SymbolRemoved,
            MentionEvent::Cancelled => EditorEvent::MentionCancelled,
            MentionEvent::Removed { id } => EditorEvent::MentionRemoved { id },
        }
    }
}

/// Rich text editing state for one document.
pub struct RichEditor<T: TextBuffer = EditorRope> {
    text: AttributedText<T>,
    selection: Selection,
    editing_style: Attributes,
    registry: Arc<StyleRegistry>,
    mention: MentionState,
    passes: Vec<Box<dyn Formatter<T>>>,
    events: Vec<EditorEvent>,
    caret_hint: Option<CaretHint>,
}

impl<T: TextBuffer + fmt::Debug> fmt::Debug for RichEditor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RichEditor")
            .field("text", &self.text)
            .field("selection", &self.selection)
            .field("editing_style", &self.editing_style)
            .field("mention", &self.mention)
            .field("passes", &self.passes.iter().map(|p| p.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<T: TextBuffer + Default> Default for RichEditor<T> {
    fn default() -> Self {
        Self::with_registry(StyleRegistry::global())
    }
}

impl<T: TextBuffer + Default> RichEditor<T> {
    /// Editor with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Editor with its own registry built from `config`.
    pub fn with_config(config: &EditorConfig) -> Result<Self, EditorError> {
        Ok(Self::with_registry(Arc::new(StyleRegistry::new(config)?)))
    }

    pub fn with_registry(registry: Arc<StyleRegistry>) -> Self {
        Self {
            text: AttributedText::new(),
            selection: Selection::default(),
            editing_style: Attributes::default(),
            passes: format::default_passes(registry.clone()),
            registry,
            mention: MentionState::default(),
            events: Vec::new(),
            caret_hint: None,
        }
    }
}

impl<T: TextBuffer> RichEditor<T> {
    pub fn text(&self) -> &AttributedText<T> {
        &self.text
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn editing_style(&self) -> &Attributes {
        &self.editing_style
    }

    pub fn registry(&self) -> &Arc<StyleRegistry> {
        &self.registry
    }

    pub fn mention_state(&self) -> &MentionState {
        &self.mention
    }

    /// Mention tokens in document order with their ranges.
    pub fn mentions(&self) -> Vec<(MentionRef, Range<usize>)> {
        self.text.mentions()
    }

    /// Swap in a new document. The caret moves to its end.
    pub fn set_text(&mut self, mut text: AttributedText<T>) {
        let _ = text.take_pending_edit();
        self.selection = Selection::collapsed(text.len());
        self.text = text;
        self.mention.end();
    }

    fn set_caret(&mut self, offset: usize) {
        let offset = offset.min(self.text.len());
        self.selection = Selection::collapsed(offset);
        self.caret_hint = Some(CaretHint::new(offset));
    }

    /// The caret the host should apply, if a rewrite moved it.
    pub fn take_caret_hint(&mut self) -> Option<CaretHint> {
        self.caret_hint.take()
    }

    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    // === Host callbacks ===

    /// Vet a host edit before it happens.
    ///
    /// Returns `false` when the editor handled the edit itself (removing a
    /// whole mention token or list item) or refuses it; the host must then
    /// drop its own edit and apply the caret hint.
    pub fn before_text_change(&mut self, range: Range<usize>, replacement: &str) -> bool {
        if range.start > range.end || range.end > self.text.len() {
            tracing::trace!(target: "richnote::editor", ?range, "edit out of range");
            return false;
        }

        if let Some((removed, widened)) =
            mention::replace_through_tokens(&mut self.text, range.clone(), replacement)
        {
            let _ = self.text.take_pending_edit();
            // A deletion inside one token re-arms the search at its start.
            let inside_one = removed.len() == 1
                && widened.len() == removed[0].display.chars().count();
            if replacement.is_empty() && inside_one {
                self.mention.start(widened.start);
            } else {
                self.mention.end();
            }
            self.set_caret(widened.start + replacement.chars().count());
            self.events
                .extend(removed.into_iter().map(|mention| EditorEvent::MentionRemoved { id: mention.id }));
            return false;
        }
        if range.is_empty() {
            if let Some(token) = mention::token_around(&self.text, range.start) {
                self.set_caret(token.end);
                return false;
            }
        }

        if self.mention.is_active() {
            if let Some(event) = self.mention.before_text_change(range.clone(), replacement) {
                self.events.push(event.into());
            }
        }

        if let Some(caret) = lists::handle_before_text_change(&mut self.text, range, replacement) {
            let _ = self.text.take_pending_edit();
            self.mention.end();
            self.set_caret(caret);
            return false;
        }
        true
    }

    /// Apply a host edit. The caret lands after the inserted text.
    pub fn replace(&mut self, range: Range<usize>, replacement: &str) -> bool {
        if !self.text.replace(range.clone(), replacement) {
            return false;
        }
        self.selection = Selection::collapsed(range.start + replacement.chars().count());
        true
    }

    /// Run the deferred formatting for the last edit.
    pub fn after_text_change(&mut self) -> Option<CaretHint> {
        let pending = self.text.take_pending_edit()?;
        let caret = self.selection.head.min(self.text.len());
        let inserted = pending.edited_characters() && !pending.range.is_empty();
        let before = caret.checked_sub(1).and_then(|i| self.text.char_at(i));

        if inserted && before == Some(self.registry.mention_symbol()) {
            let event = self.mention.start(caret - 1);
            self.events.push(event.into());
            return None;
        }
        if inserted && before == Some(self.registry.hashtag_symbol()) {
            tracing::debug!(target: "richnote::editor", location = caret - 1, "hashtag started");
            self.events.push(EditorEvent::HashtagStarted { location: caret - 1 });
            return None;
        }

        let hint = format::process_rich_formatting(
            &mut self.text,
            pending,
            &self.passes,
            &self.editing_style,
        )
        .or_else(|| lists::marker_end_for(&self.text, caret).map(CaretHint::new));

        if let Some(hint) = hint {
            self.set_caret(hint.offset);
        }
        hint
    }

    /// Record a selection change and report the style found there.
    ///
    /// A caret inside a list marker is pushed to the marker end.
    pub fn selection_changed(&mut self, range: Range<usize>) {
        let len = self.text.len();
        let mut range = range.start.min(len)..range.end.min(len);
        self.selection = Selection::from(range.clone());
        if let Some(symbol) = self.mention.symbol_location() {
            let query_end = symbol + 1 + self.mention.search_text().chars().count();
            if range.start < symbol || range.end > query_end {
                self.mention.end();
                self.events.push(EditorEvent::MentionCancelled);
            }
        }
        if range.is_empty() {
            if let Some(end) = lists::marker_end_for(&self.text, range.start) {
                self.set_caret(end);
                range = end..end;
            }
        }
        self.editing_style = self.text.inherited_attributes(&range);

        let line = self.text.line_range(range.start);
        let format = TextFormat::from_attributes(&self.editing_style, self.text.list_item_at(line.start));
        self.events.push(EditorEvent::StyleAtSelection(format));
    }

    // === Toolbar ===

    /// Set the style for new text, restyling the selection when there is one.
    pub fn set_typing_format(&mut self, format: &TextFormat) {
        self.editing_style = format.to_attributes();
        if !self.selection.is_collapsed() {
            let style = &self.editing_style;
            self.text.edit_attributes(self.selection.to_range(), |attrs| {
                if attrs.list.is_none() {
                    attrs.apply_patch(style);
                    attrs.traits = style.traits;
                }
            });
            let _ = self.text.take_pending_edit();
        }
    }

    /// Flip the checkmark on the line holding `offset`.
    ///
    /// Returns the new state, or `None` when that line is not a checkmark
    /// item.
    pub fn toggle_checkmark(&mut self, offset: usize) -> Option<bool> {
        if offset > self.text.len() {
            return None;
        }
        let line = self.text.line_range(offset);
        let checked = !self.text.list_item_at(line.start)?.is_checked();
        if !lists::set_checkmark(&mut self.text, line.start, checked) {
            return None;
        }
        let _ = self.text.take_pending_edit();
        tracing::debug!(target: "richnote::editor", line = line.start, checked, "toggled checkmark");
        Some(checked)
    }

    /// Turn the selected lines into `item` list lines.
    pub fn apply_list(&mut self, item: ListItem) -> Option<Range<usize>> {
        let range = lists::add_or_replace_list_item(&mut self.text, item, self.selection.to_range())?;
        let _ = self.text.take_pending_edit();
        self.selection = Selection::from(range.clone());
        self.caret_hint = Some(CaretHint::new(range.start));
        Some(range)
    }

    /// Drop the list marker of the line under the selection.
    pub fn remove_list(&mut self) -> Option<Range<usize>> {
        let range = lists::remove_list_item(&mut self.text, self.selection.to_range())?;
        let _ = self.text.take_pending_edit();
        self.selection = Selection::from(range.clone());
        self.caret_hint = Some(CaretHint::new(range.start));
        Some(range)
    }

    // === Mentions ===

    /// Confirm the picked item for the running search.
    pub fn add_mention<M: Mentionable + ?Sized>(&mut self, item: &M) -> Option<CaretHint> {
        let style = self.registry.mention_style().clone();
        let caret = self
            .mention
            .add_mention(&mut self.text, item, self.selection.to_range(), &style)?;
        let _ = self.text.take_pending_edit();
        self.set_caret(caret);
        self.caret_hint
    }

    /// Insert a token for `item` at the selection, with or without a search.
    pub fn append_mention<M: Mentionable + ?Sized>(&mut self, item: &M) -> Option<CaretHint> {
        let style = self.registry.mention_style().clone();
        let caret = mention::insert_mention(&mut self.text, self.selection.to_range(), item, &style)?;
        let _ = self.text.take_pending_edit();
        self.mention.end();
        self.set_caret(caret);
        self.caret_hint
    }

    // === Conversion ===

    pub fn to_markdown(&self) -> String {
        markdown::deformat(&self.text, &self.registry)
    }
}

impl RichEditor<EditorRope> {
    /// Replace the document with formatted markdown-ish text.
    pub fn load_markdown(&mut self, source: &str) {
        let text = markdown::format_document(source, &self.registry);
        self.set_text(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(editor: &mut RichEditor, s: &str) {
        for ch in s.chars() {
            let at = editor.selection().head;
            let ch = ch.to_string();
            if editor.before_text_change(at..at, &ch) {
                editor.replace(at..at, &ch);
                editor.after_text_change();
            }
        }
    }

    fn backspace(editor: &mut RichEditor) {
        let at = editor.selection().head;
        if at == 0 {
            return;
        }
        if editor.before_text_change(at - 1..at, "") {
            editor.replace(at - 1..at, "");
            editor.after_text_change();
        }
    }

    #[test]
    fn test_mention_symbol_starts_search() {
        let mut editor = RichEditor::new();
        type_str(&mut editor, "hi @");
        assert_eq!(
            editor.drain_events(),
            vec![EditorEvent::MentionStarted { location: 3 }]
        );
        type_str(&mut editor, "a");
        assert_eq!(
            editor.drain_events(),
            vec![EditorEvent::SearchTextChanged("a".into())]
        );
    }

    #[test]
    fn test_hashtag_symbol_event() {
        let mut editor = RichEditor::new();
        type_str(&mut editor, "#");
        assert_eq!(
            editor.drain_events(),
            vec![EditorEvent::HashtagStarted { location: 0 }]
        );
    }

    #[test]
    fn test_backspace_in_plain_text_is_allowed() {
        let mut editor = RichEditor::new();
        type_str(&mut editor, "abc");
        backspace(&mut editor);
        assert_eq!(editor.text().text(), "ab");
        assert_eq!(editor.selection(), Selection::collapsed(2));
    }

    #[test]
    fn test_out_of_range_edit_is_denied() {
        let mut editor = RichEditor::<EditorRope>::new();
        assert!(!editor.before_text_change(3..4, ""));
        assert!(!editor.replace(3..4, "x"));
        assert_eq!(editor.after_text_change(), None);
    }

    #[test]
    fn test_typing_format_applies_to_new_text() {
        let mut editor = RichEditor::new();
        editor.set_typing_format(&TextFormat {
            inline: InlineStyle {
                bold: true,
                ..Default::default()
            },
            list: None,
        });
        type_str(&mut editor, "loud");
        let (attrs, range) = editor.text().attributes_at(0).unwrap();
        assert!(attrs.is_bold());
        assert_eq!(range, 0..4);
    }

    #[test]
    fn test_typing_format_restyles_selection() {
        let mut editor = RichEditor::new();
        editor.load_markdown("plain words");
        editor.selection_changed(0..5);
        editor.set_typing_format(&TextFormat {
            inline: InlineStyle {
                italic: true,
                ..Default::default()
            },
            list: None,
        });
        assert_eq!(editor.to_markdown(), "*plain* words");
    }

    #[test]
    fn test_typing_format_can_clear_bold() {
        let mut editor = RichEditor::new();
        editor.load_markdown("**loud** words");
        editor.selection_changed(0..4);
        editor.set_typing_format(&TextFormat::default());
        assert_eq!(editor.to_markdown(), "loud words");
    }

    #[test]
    fn test_toggle_checkmark() {
        let mut editor = RichEditor::new();
        editor.load_markdown("[_] milk\nplain");
        assert_eq!(editor.toggle_checkmark(3), Some(true));
        assert_eq!(editor.to_markdown(), "[x] milk\nplain");
        assert_eq!(editor.toggle_checkmark(0), Some(false));
        assert_eq!(editor.to_markdown(), "[_] milk\nplain");
        assert_eq!(editor.toggle_checkmark(7), None);
        assert_eq!(editor.toggle_checkmark(99), None);
        assert_eq!(editor.after_text_change(), None);
    }

    #[test]
    fn test_selection_reports_style() {
        let mut editor = RichEditor::new();
        editor.load_markdown("**a**b\n- c");
        editor.drain_events();
        editor.selection_changed(1..1);
        editor.selection_changed(4..4);
        let events = editor.drain_events();
        let EditorEvent::StyleAtSelection(first) = &events[0] else {
            panic!("expected style event");
        };
        assert!(first.inline.bold);
        assert_eq!(first.list, None);
        let EditorEvent::StyleAtSelection(second) = &events[1] else {
            panic!("expected style event");
        };
        assert_eq!(second.list, Some(ListItem::DASHED));
    }

    #[test]
    fn test_caret_inside_marker_moves_past_it() {
        let mut editor = RichEditor::new();
        editor.load_markdown("10. ten");
        editor.selection_changed(1..1);
        assert_eq!(editor.take_caret_hint(), Some(CaretHint::new(3)));
        assert_eq!(editor.selection(), Selection::collapsed(3));
        editor.selection_changed(5..5);
        assert_eq!(editor.take_caret_hint(), None);
    }
}
