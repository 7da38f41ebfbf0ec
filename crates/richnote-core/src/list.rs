//! List item model: marker glyphs, numbering and markdown prefixes.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::attrs::{Attributes, ParagraphStyle};
use crate::error::EditorError;
use crate::storage::Span;
use crate::text_helpers::ZERO_WIDTH_SPACE;

/// Extra head indent per nesting level.
const LEVEL_INDENT: f32 = 20.0;

static BULLET_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\*[ \t]").unwrap());
static DASHED_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-[ \t]").unwrap());
static ORDERED_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<number>[0-9]+)\.[ \t]").unwrap());
static CHECKMARK_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(?P<checked>_|x)\][ \t]").unwrap());

static RAW_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<kind>bullet|dashed|ordered|checkmark)(?:\((?P<arg>[^)]*)\))?$").unwrap()
});

/// The kind of list a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ListItem {
    Bullet { level: u8 },
    Dashed { level: u8 },
    /// Ordered item. `None` reads as 1.
    Ordered(Option<u32>),
    /// Checkmark item. `None` reads as unchecked.
    Checkmark(Option<bool>),
}

impl ListItem {
    pub const BULLET: ListItem = ListItem::Bullet { level: 0 };
    pub const DASHED: ListItem = ListItem::Dashed { level: 0 };

    pub fn ordered(number: u32) -> Self {
        ListItem::Ordered(Some(number))
    }

    pub fn checkmark(checked: bool) -> Self {
        ListItem::Checkmark(Some(checked))
    }

    pub fn number(&self) -> Option<u32> {
        match self {
            ListItem::Ordered(n) => Some(n.unwrap_or(1)),
            _ => None,
        }
    }

    pub fn is_ordered(&self) -> bool {
        matches!(self, ListItem::Ordered(_))
    }

    pub fn is_checked(&self) -> bool {
        matches!(self, ListItem::Checkmark(Some(true)))
    }

    /// The glyphs written into the buffer for this item.
    pub fn marker(&self) -> String {
        match self {
            ListItem::Bullet { .. } => "•".to_owned(),
            ListItem::Dashed { .. } => "–".to_owned(),
            ListItem::Ordered(n) => format!("{}.", n.unwrap_or(1)),
            ListItem::Checkmark(_) => ZERO_WIDTH_SPACE.to_string(),
        }
    }

    /// Marker length in chars.
    pub fn marker_len(&self) -> usize {
        self.marker().chars().count()
    }

    /// The item a new line continues with.
    pub fn next_item(&self) -> Self {
        match *self {
            ListItem::Ordered(n) => ListItem::Ordered(Some(n.unwrap_or(1) + 1)),
            ListItem::Checkmark(_) => ListItem::Checkmark(Some(false)),
            other => other,
        }
    }

    /// The item preceding this one. Ordered numbers may reach 0, which makes
    /// the following item restart at 1.
    pub fn previous_item(&self) -> Self {
        match *self {
            ListItem::Ordered(n) => ListItem::Ordered(Some(n.unwrap_or(1).saturating_sub(1))),
            other => other,
        }
    }

    /// Whether two items belong to the same kind of list.
    pub fn same_kind(&self, other: &ListItem) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// HTML element grouping consecutive lines of this kind.
    pub fn group_tag(&self) -> &'static str {
        match self {
            ListItem::Ordered(_) => "ol",
            _ => "ul",
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            ListItem::Bullet { level } | ListItem::Dashed { level } => *level,
            _ => 0,
        }
    }

    /// Spacing applied after the marker's last character.
    pub fn kern(&self) -> f32 {
        match self {
            ListItem::Bullet { .. } | ListItem::Dashed { .. } => 6.5,
            ListItem::Ordered(_) => 3.5,
            ListItem::Checkmark(_) => 0.0,
        }
    }

    pub fn paragraph_style(&self) -> ParagraphStyle {
        match self {
            ListItem::Checkmark(_) => ParagraphStyle {
                first_line_head_indent: 26.0,
                head_indent: 26.0,
                spacing_before: 0.0,
                paragraph_spacing: 10.0,
            },
            _ => {
                let indent = 10.0 + LEVEL_INDENT * f32::from(self.level());
                ParagraphStyle {
                    first_line_head_indent: indent,
                    head_indent: indent,
                    spacing_before: 2.5,
                    paragraph_spacing: 0.0,
                }
            }
        }
    }

    /// The markdown-ish prefix this item deformats to.
    pub fn markdown_prefix(&self) -> String {
        match self {
            ListItem::Bullet { .. } => "* ".to_owned(),
            ListItem::Dashed { .. } => "- ".to_owned(),
            ListItem::Ordered(n) => format!("{}. ", n.unwrap_or(1)),
            ListItem::Checkmark(checked) => {
                if checked.unwrap_or(false) {
                    "[x] ".to_owned()
                } else {
                    "[_] ".to_owned()
                }
            }
        }
    }

    /// Styled marker spans on top of `base`.
    ///
    /// Every marker char gets the list and paragraph attributes; the last one
    /// also carries the kern and the caret hint.
    pub fn marker_spans(&self, base: &Attributes) -> Vec<Span> {
        let mut head = self.marker();
        let last = head.pop().map(String::from).unwrap_or_default();

        let marked = Attributes {
            list: Some(*self),
            paragraph: Some(self.paragraph_style()),
            ..base.typing()
        };
        let tail = Attributes {
            kern: Some(self.kern()),
            caret: true,
            ..marked.clone()
        };

        let mut spans = Vec::with_capacity(2);
        if !head.is_empty() {
            spans.push(Span::new(head, marked));
        }
        spans.push(Span::new(last, tail));
        spans
    }

    /// Match a markdown list prefix at the start of `line`.
    ///
    /// Returns the item and the prefix length in chars.
    pub fn detect(line: &str) -> Option<(ListItem, usize)> {
        if let Some(m) = BULLET_START.find(line) {
            return Some((ListItem::BULLET, m.as_str().chars().count()));
        }
        if let Some(m) = DASHED_START.find(line) {
            return Some((ListItem::DASHED, m.as_str().chars().count()));
        }
        if let Some(caps) = ORDERED_START.captures(line) {
            let number = caps.name("number")?.as_str().parse::<u32>().ok()?;
            let len = caps.get(0)?.as_str().chars().count();
            return Some((ListItem::ordered(number), len));
        }
        if let Some(caps) = CHECKMARK_START.captures(line) {
            let checked = caps.name("checked")?.as_str() == "x";
            let len = caps.get(0)?.as_str().chars().count();
            return Some((ListItem::checkmark(checked), len));
        }
        None
    }
}

impl fmt::Display for ListItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListItem::Bullet { level: 0 } => f.write_str("bullet"),
            ListItem::Bullet { level } => write!(f, "bullet({level})"),
            ListItem::Dashed { level: 0 } => f.write_str("dashed"),
            ListItem::Dashed { level } => write!(f, "dashed({level})"),
            ListItem::Ordered(n) => write!(f, "ordered({})", n.unwrap_or(1)),
            ListItem::Checkmark(checked) => write!(f, "checkmark({})", checked.unwrap_or(false)),
        }
    }
}

impl FromStr for ListItem {
    type Err = EditorError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || EditorError::InvalidListValue(raw.to_owned());
        let caps = RAW_VALUE.captures(raw.trim()).ok_or_else(invalid)?;
        let arg = caps.name("arg").map(|m| m.as_str());
        let kind = caps.name("kind").map(|m| m.as_str()).ok_or_else(invalid)?;

        match (kind, arg) {
            ("bullet", None) => Ok(ListItem::BULLET),
            ("bullet", Some(level)) => level
                .parse()
                .map(|level| ListItem::Bullet { level })
                .map_err(|_| invalid()),
            ("dashed", None) => Ok(ListItem::DASHED),
            ("dashed", Some(level)) => level
                .parse()
                .map(|level| ListItem::Dashed { level })
                .map_err(|_| invalid()),
            ("ordered", None) => Ok(ListItem::Ordered(None)),
            ("ordered", Some(n)) => n
                .parse()
                .map(|n| ListItem::Ordered(Some(n)))
                .map_err(|_| invalid()),
            ("checkmark", None) => Ok(ListItem::Checkmark(None)),
            ("checkmark", Some(b)) => b
                .parse()
                .map(|b| ListItem::Checkmark(Some(b)))
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl From<ListItem> for String {
    fn from(item: ListItem) -> Self {
        item.to_string()
    }
}

impl TryFrom<String> for ListItem {
    type Error = EditorError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}
