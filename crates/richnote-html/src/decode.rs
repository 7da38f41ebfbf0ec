//! HTML to attributed text.
//!
//! Markup is tokenized, then walked with a pending-line state machine that
//! collects styled spans per line. List lines get freshly generated markers.
//! Mention identity is not carried by the markup walk; a second pass over the
//! plain text re-tags every occurrence of a resolved item's display text.

use std::collections::HashSet;

use regex::Regex;
use richnote_core::mention::mention_attributes;
use richnote_core::{
    Attributes, AttributedText, Color, FontTraits, ListItem, Mentionable, Span, StyleRegistry,
    TextBuffer,
};
use smol_str::SmolStr;

use crate::error::HtmlParseError;
use crate::tokenizer::{Token, tokenize};

/// Tags that never have content or a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// Decode `html` using the global style registry.
///
/// `resolve` receives the mention ids found in `span[data-id]` elements, in
/// document order, and returns the items to re-tag.
pub fn from_html<M, F>(html: &str, resolve: F) -> Result<AttributedText, HtmlParseError>
where
    M: Mentionable,
    F: FnOnce(&[i64]) -> Vec<M>,
{
    let registry = StyleRegistry::global();
    from_html_with(html, &registry, resolve)
}

/// Decode `html`, styling mentions with `registry`'s mention style.
#[tracing::instrument(skip_all, fields(len = html.len()))]
pub fn from_html_with<M, F>(
    html: &str,
    registry: &StyleRegistry,
    resolve: F,
) -> Result<AttributedText, HtmlParseError>
where
    M: Mentionable,
    F: FnOnce(&[i64]) -> Vec<M>,
{
    let tokens = tokenize(html)?;
    let ids = mention_ids(&tokens);

    let mut walker = Walker::new();
    for token in &tokens {
        walker.token(token);
    }
    let lines = walker.finish();
    tracing::debug!(target: "richnote::html", lines = lines.len(), mentions = ids.len(), "decoded markup");

    let mut spans = Vec::new();
    for (i, line) in lines.into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::plain("\n"));
        }
        if let Some(item) = line.item {
            spans.extend(item.marker_spans(&Attributes::default()));
        }
        spans.extend(line.spans);
    }
    let mut text = AttributedText::from_spans(spans);

    let items = resolve(&ids);
    retag_mentions(&mut text, &items, registry.mention_style());
    text.take_pending_edit();
    Ok(text)
}

fn mention_ids(tokens: &[Token]) -> Vec<i64> {
    let mut seen = HashSet::new();
    tokens
        .iter()
        .filter(|token| matches!(token, Token::Start { name, .. } if name == "span"))
        .filter_map(|token| token.attr("data-id")?.trim().parse::<i64>().ok())
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Tag every occurrence of an item's pickable text as a mention of the first
/// item with that text.
fn retag_mentions<T: TextBuffer, M: Mentionable>(
    text: &mut AttributedText<T>,
    items: &[M],
    style: &Attributes,
) {
    let mut needles: Vec<String> = items.iter().map(|item| item.pickable_text()).collect();
    needles.retain(|needle| !needle.is_empty());
    if needles.is_empty() {
        return;
    }
    needles.sort_by(|a, b| b.len().cmp(&a.len()));
    needles.dedup();

    let pattern = needles
        .iter()
        .map(|needle| regex::escape(needle))
        .collect::<Vec<_>>()
        .join("|");
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(err) => {
            tracing::warn!(target: "richnote::html", error = %err, "mention pattern rejected, skipping mentions");
            return;
        }
    };

    let plain = text.text();
    let matches: Vec<_> = re
        .find_iter(&plain)
        .filter_map(|m| {
            let item = items.iter().find(|item| item.pickable_text() == m.as_str())?;
            let start = text.buffer().byte_to_char(m.start());
            let end = text.buffer().byte_to_char(m.end());
            Some((mention_attributes(style, item), start..end))
        })
        .collect();

    tracing::trace!(target: "richnote::html", count = matches.len(), "re-tagging mentions");
    text.batch(|text| {
        for (attrs, range) in matches {
            text.set_attributes(attrs, range);
        }
    });
}

#[derive(Default)]
struct Line {
    item: Option<ListItem>,
    spans: Vec<Span>,
}

impl Line {
    fn is_empty(&self) -> bool {
        self.item.is_none() && self.spans.is_empty()
    }
}

struct ListFrame {
    ordered: bool,
    next: u32,
}

/// Inline style contributed by one open element.
#[derive(Default)]
struct StyleFrame {
    tag: SmolStr,
    bold: bool,
    italic: bool,
    underline: bool,
    strikethrough: bool,
    foreground: Option<Color>,
    background: Option<Color>,
}

impl StyleFrame {
    fn for_tag(token: &Token, tag: &SmolStr) -> Self {
        let mut frame = StyleFrame {
            tag: tag.clone(),
            ..Default::default()
        };
        match tag.as_str() {
            "b" | "strong" => frame.bold = true,
            "i" | "em" => frame.italic = true,
            "u" | "ins" => frame.underline = true,
            "del" | "s" | "strike" => frame.strikethrough = true,
            "font" => frame.foreground = token.attr("color").map(Color::new),
            _ => {}
        }
        if let Some(style) = token.attr("style") {
            for decl in style.split(';') {
                let Some((key, value)) = decl.split_once(':') else {
                    continue;
                };
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                match key.trim().to_ascii_lowercase().as_str() {
                    "color" => frame.foreground = Some(Color::new(value)),
                    "background-color" => frame.background = Some(Color::new(value)),
                    _ => {}
                }
            }
        }
        frame
    }
}

#[derive(Default)]
struct Walker {
    pending: Option<Line>,
    lines: Vec<Line>,
    lists: Vec<ListFrame>,
    in_item: bool,
    styles: Vec<StyleFrame>,
}

impl Walker {
    fn new() -> Self {
        Walker {
            pending: Some(Line::default()),
            ..Default::default()
        }
    }

    fn pending(&mut self) -> &mut Line {
        self.pending.get_or_insert_with(Line::default)
    }

    fn push_pending(&mut self) {
        if let Some(line) = self.pending.take() {
            self.lines.push(line);
        }
    }

    /// Start a new line, keeping a non-empty pending one.
    fn open(&mut self, item: Option<ListItem>) {
        match self.pending.take() {
            Some(line) if !line.is_empty() => self.lines.push(line),
            _ => {}
        }
        self.pending = Some(Line {
            item,
            spans: Vec::new(),
        });
    }

    /// Lines inside a list item stay one line; a break there reads as a space.
    fn line_break(&mut self) {
        if self.in_item {
            let ends_open = self
                .pending()
                .spans
                .last()
                .and_then(|span| span.text.chars().last())
                .is_some_and(|ch| !ch.is_whitespace());
            if ends_open {
                self.append(" ");
            }
            return;
        }
        if !self.lists.is_empty() {
            return;
        }
        self.push_pending();
        self.pending = Some(Line::default());
    }

    fn style(&self) -> Attributes {
        let mut attrs = Attributes::default();
        for frame in &self.styles {
            if frame.bold {
                attrs.traits |= FontTraits::BOLD;
            }
            if frame.italic {
                attrs.traits |= FontTraits::ITALIC;
            }
            attrs.underline |= frame.underline;
            attrs.strikethrough |= frame.strikethrough;
            if frame.foreground.is_some() {
                attrs.foreground = frame.foreground.clone();
            }
            if frame.background.is_some() {
                attrs.background = frame.background.clone();
            }
        }
        attrs
    }

    fn text(&mut self, text: &str) {
        if !self.in_item && !self.lists.is_empty() && text.trim().is_empty() {
            return;
        }
        for (i, segment) in text.split('\n').enumerate() {
            if i > 0 {
                self.line_break();
            }
            if segment.is_empty() {
                continue;
            }
            self.append(segment);
        }
    }

    fn append(&mut self, segment: &str) {
        let attrs = self.style();
        let line = self.pending();
        match line.spans.last_mut() {
            Some(last) if last.attrs == attrs => last.text.push_str(segment),
            _ => line.spans.push(Span::new(segment, attrs)),
        }
    }

    fn list_item(&mut self, token: &Token) -> Option<ListItem> {
        if let Some(raw) = token.attr("data-type") {
            return match raw.parse::<ListItem>() {
                Ok(item) => Some(item),
                Err(err) => {
                    tracing::warn!(target: "richnote::html", error = %err, "unreadable list item, treating line as plain");
                    None
                }
            };
        }
        let depth = self.lists.len();
        let frame = self.lists.last_mut()?;
        if frame.ordered {
            let number = frame.next;
            frame.next = frame.next.saturating_add(1);
            Some(ListItem::ordered(number))
        } else {
            let level = u8::try_from(depth.saturating_sub(1)).unwrap_or(u8::MAX);
            Some(ListItem::Bullet { level })
        }
    }

    fn token(&mut self, token: &Token) {
        match token {
            Token::Text(text) => self.text(text),
            Token::Start {
                name, self_closing, ..
            } => match name.as_str() {
                "br" => self.line_break(),
                "ul" | "ol" => {
                    if self.in_item {
                        self.push_pending();
                        self.in_item = false;
                    }
                    let next = token
                        .attr("start")
                        .and_then(|start| start.trim().parse().ok())
                        .unwrap_or(1);
                    self.lists.push(ListFrame {
                        ordered: name == "ol",
                        next,
                    });
                }
                "li" => {
                    let item = self.list_item(token);
                    self.open(item);
                    self.in_item = true;
                }
                "p" | "div" => {
                    if !self.in_item {
                        self.open(None);
                    }
                }
                tag if *self_closing || VOID_TAGS.contains(&tag) => {}
                _ => self.styles.push(StyleFrame::for_tag(token, name)),
            },
            Token::End { name } => match name.as_str() {
                "li" => {
                    if self.in_item {
                        self.push_pending();
                    }
                    self.in_item = false;
                }
                "ul" | "ol" => {
                    self.lists.pop();
                    self.in_item = false;
                }
                "p" | "div" => {
                    if !self.in_item {
                        self.push_pending();
                    }
                }
                _ => {
                    if let Some(at) = self.styles.iter().rposition(|frame| frame.tag == *name) {
                        self.styles.truncate(at);
                    }
                }
            },
        }
    }

    fn finish(mut self) -> Vec<Line> {
        self.push_pending();
        if self.lines.is_empty() {
            self.lines.push(Line::default());
        }
        self.lines
    }
}
