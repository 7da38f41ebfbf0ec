//! Mention tokens and the mention search lifecycle.
//!
//! Typing the trigger symbol starts a search; the host narrows its picker with
//! the search text and eventually confirms an item, which replaces the symbol
//! and query with an atomic token. Tokens are removed whole, never in part.

use std::ops::Range;

use smol_str::SmolStr;

use crate::attrs::{Attributes, MentionRef};
use crate::storage::{AttributedText, Span};
use crate::text::TextBuffer;

/// Something a mention token can point at.
pub trait Mentionable {
    fn id(&self) -> i64;

    /// Display text without the symbol.
    fn text(&self) -> &str;

    fn symbol(&self) -> char {
        '@'
    }

    /// The text inserted into the buffer.
    fn pickable_text(&self) -> String {
        format!("{}{}", self.symbol(), self.text())
    }
}

/// Mention lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MentionEvent {
    Started { location: usize },
    SearchTextChanged(String),
    SymbolRemoved,
    Cancelled,
    Removed { id: i64 },
}

/// Search state between the trigger symbol and a confirmed pick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionState {
    symbol_location: Option<usize>,
    search: String,
}

impl MentionState {
    pub fn is_active(&self) -> bool {
        self.symbol_location.is_some()
    }

    pub fn symbol_location(&self) -> Option<usize> {
        self.symbol_location
    }

    pub fn search_text(&self) -> &str {
        &self.search
    }

    /// Arm the search at `location`, the offset of the trigger symbol.
    pub fn start(&mut self, location: usize) -> MentionEvent {
        tracing::debug!(target: "richnote::mention", location, "mention started");
        self.symbol_location = Some(location);
        self.search.clear();
        MentionEvent::Started { location }
    }

    pub fn end(&mut self) {
        self.symbol_location = None;
        self.search.clear();
    }

    /// Track a host edit while a search is running.
    pub fn before_text_change(
        &mut self,
        range: Range<usize>,
        replacement: &str,
    ) -> Option<MentionEvent> {
        let symbol = self.symbol_location?;

        if replacement.is_empty() {
            if range.start == symbol {
                tracing::debug!(target: "richnote::mention", "mention symbol removed");
                self.end();
                return Some(MentionEvent::SymbolRemoved);
            }
            let count = self.search.chars().count();
            let index = match range.start.checked_sub(symbol + 1) {
                Some(index) if index < count => index,
                _ => {
                    self.end();
                    return Some(MentionEvent::Cancelled);
                }
            };
            let removed = range.len().max(1).min(count - index);
            self.search = self
                .search
                .chars()
                .enumerate()
                .filter(|(i, _)| *i < index || *i >= index + removed)
                .map(|(_, c)| c)
                .collect();
            return Some(MentionEvent::SearchTextChanged(self.search.clone()));
        }

        if range.start <= symbol {
            self.end();
            return Some(MentionEvent::Cancelled);
        }
        self.search.push_str(replacement);
        Some(MentionEvent::SearchTextChanged(self.search.clone()))
    }

    /// Replace the symbol and query with a token for `item`.
    ///
    /// Only valid while a search is running and the symbol precedes `range`.
    /// Returns the caret just past the trailing space.
    pub fn add_mention<T: TextBuffer, M: Mentionable + ?Sized>(
        &mut self,
        text: &mut AttributedText<T>,
        item: &M,
        range: Range<usize>,
        style: &Attributes,
    ) -> Option<usize> {
        let symbol = self.symbol_location?;
        if symbol >= range.start {
            return None;
        }
        let caret = insert_mention(text, symbol..range.end, item, style)?;
        self.end();
        Some(caret)
    }
}

/// Attributes of a confirmed token for `item`.
pub fn mention_attributes<M: Mentionable + ?Sized>(style: &Attributes, item: &M) -> Attributes {
    Attributes {
        mention: Some(MentionRef {
            id: item.id(),
            display: SmolStr::new(item.pickable_text()),
        }),
        ..style.typing()
    }
}

/// Put a token for `item` plus a plain space over `range`.
///
/// Returns the caret just past the space.
pub fn insert_mention<T: TextBuffer, M: Mentionable + ?Sized>(
    text: &mut AttributedText<T>,
    range: Range<usize>,
    item: &M,
    style: &Attributes,
) -> Option<usize> {
    let display = item.pickable_text();
    let len = display.chars().count();
    let spans = [
        Span::new(display, mention_attributes(style, item)),
        Span::plain(" "),
    ];
    if !text.replace_spans(range.clone(), &spans) {
        return None;
    }
    tracing::debug!(target: "richnote::mention", id = item.id(), at = range.start, "mention inserted");
    Some(range.start + len + 1)
}

/// Whole mention tokens overlapping `range`.
pub fn tokens_touching<T: TextBuffer>(
    text: &AttributedText<T>,
    range: Range<usize>,
) -> Vec<(MentionRef, Range<usize>)> {
    if range.is_empty() {
        return Vec::new();
    }
    text.mentions()
        .into_iter()
        .filter(|(_, token)| token.start < range.end && range.start < token.end)
        .collect()
}

/// Replace `range` widened to cover every token it touches.
///
/// Tokens go whole, never in part. Returns the removed mentions and the
/// widened range, or `None` when `range` touches no token.
pub fn replace_through_tokens<T: TextBuffer>(
    text: &mut AttributedText<T>,
    range: Range<usize>,
    replacement: &str,
) -> Option<(Vec<MentionRef>, Range<usize>)> {
    let touched = tokens_touching(text, range.clone());
    let first = touched.first()?.1.start;
    let last = touched.last()?.1.end;
    let widened = range.start.min(first)..range.end.max(last);
    // The replacement takes the style in front of the first token.
    let attrs = text.inherited_attributes(&(widened.start..widened.start));
    if !text.replace_attributed(widened.clone(), replacement, attrs) {
        return None;
    }
    let removed: Vec<MentionRef> = touched.into_iter().map(|(mention, _)| mention).collect();
    tracing::debug!(target: "richnote::mention", count = removed.len(), range = ?widened, "mention tokens removed");
    Some((removed, widened))
}

/// Remove every token touched by a deletion of `range`.
pub fn remove_mention<T: TextBuffer>(
    text: &mut AttributedText<T>,
    range: Range<usize>,
) -> Option<(Vec<MentionRef>, Range<usize>)> {
    replace_through_tokens(text, range, "")
}

/// Token that `offset` falls strictly inside of.
pub fn token_around<T: TextBuffer>(text: &AttributedText<T>, offset: usize) -> Option<Range<usize>> {
    let (_, token) = text.mention_at(offset)?;
    (token.start < offset).then_some(token)
}
