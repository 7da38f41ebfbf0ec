//! Inline markdown tokens: recognition, live rewriting and batch conversion.
//!
//! A `TokenSpec` pairs a pattern with the style its match turns into. Wrapped
//! tokens (`**bold**`, `*italic*`, `_underline_`, `~strike~`) lose their
//! delimiters when formatted. Prefix tokens (`@name`, `#tag`) keep their
//! symbol and only gain a highlight.

use std::ops::Range;

use regex::Regex;
use smol_str::SmolStr;

use crate::attrs::Attributes;
use crate::config::StyleRegistry;
use crate::error::EditorError;
use crate::format::ChangedText;
use crate::lists;
use crate::list::ListItem;
use crate::storage::{AttributedText, Span};
use crate::text::{EditorRope, TextBuffer};
use crate::text_helpers::ZERO_WIDTH_SPACE;

/// Which token a spec recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKey {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Mention,
    Hashtag,
}

impl TokenKey {
    pub fn name(&self) -> &'static str {
        match self {
            TokenKey::Bold => "bold",
            TokenKey::Italic => "italic",
            TokenKey::Underline => "underline",
            TokenKey::Strikethrough => "strikethrough",
            TokenKey::Mention => "mention",
            TokenKey::Hashtag => "hashtag",
        }
    }

    /// Whether a run with `attrs` is styled by this token.
    pub fn applies_to(&self, attrs: &Attributes) -> bool {
        match self {
            TokenKey::Bold => attrs.is_bold(),
            TokenKey::Italic => attrs.is_italic(),
            TokenKey::Underline => attrs.underline,
            TokenKey::Strikethrough => attrs.strikethrough,
            TokenKey::Mention | TokenKey::Hashtag => false,
        }
    }
}

/// A recognizable markdown token and the style it produces.
#[derive(Debug, Clone)]
pub struct TokenSpec {
    pub key: TokenKey,
    pattern: Regex,
    pub style: Attributes,
    pub delimiter: SmolStr,
    /// The delimiter is a leading symbol that stays in the text.
    pub only_prefix: bool,
}

/// One token occurrence, in byte offsets of the searched text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMatch {
    pub key: TokenKey,
    /// The whole token, delimiters included.
    pub token: Range<usize>,
    /// The text between the delimiters.
    pub text: Range<usize>,
}

impl TokenSpec {
    /// Compile a spec. The pattern must have a `text` group; a `token` group,
    /// when present, narrows the match to the token itself.
    pub fn new(
        key: TokenKey,
        pattern: &str,
        style: Attributes,
        delimiter: &str,
        only_prefix: bool,
    ) -> Result<Self, EditorError> {
        let pattern = Regex::new(pattern).map_err(|source| EditorError::MalformedPattern {
            key: key.name(),
            source,
        })?;
        Ok(Self {
            key,
            pattern,
            style,
            delimiter: SmolStr::new(delimiter),
            only_prefix,
        })
    }

    /// A prefix token started by `symbol` and followed by a word.
    pub fn prefix(key: TokenKey, symbol: char, style: Attributes) -> Result<Self, EditorError> {
        let escaped = regex::escape(&symbol.to_string());
        let pattern = format!(r"(?:^|\s)(?P<token>{escaped}(?P<text>\w+))");
        Self::new(key, &pattern, style, &symbol.to_string(), true)
    }

    /// First token at or after byte `from`.
    pub fn find_at(&self, haystack: &str, from: usize) -> Option<TokenMatch> {
        let caps = self.pattern.captures_at(haystack, from)?;
        let token = caps.name("token").or_else(|| caps.get(0))?;
        let text = caps.name("text")?;
        Some(TokenMatch {
            key: self.key,
            token: token.range(),
            text: text.range(),
        })
    }

    pub fn find(&self, haystack: &str) -> Option<TokenMatch> {
        self.find_at(haystack, 0)
    }

    /// The text a match is rewritten to.
    fn replacement<'h>(&self, haystack: &'h str, m: &TokenMatch) -> &'h str {
        if self.only_prefix {
            &haystack[m.token.clone()]
        } else {
            &haystack[m.text.clone()]
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Rewrite the first token found on the edited line.
///
/// The token becomes its styled inner text, followed by a space in
/// `editing_style` unless one is already there. The space carries the caret
/// hint and the returned offset sits right after it.
pub fn format_words<'s, T: TextBuffer>(
    text: &mut AttributedText<T>,
    changed: &ChangedText,
    specs: impl IntoIterator<Item = &'s TokenSpec>,
    editing_style: &Attributes,
) -> Option<usize> {
    let line = text.slice(changed.line.clone())?;
    let line = line.as_str();

    let (spec, m) = specs
        .into_iter()
        .find_map(|spec| spec.find(line).map(|m| (spec, m)))?;

    let start = changed.line.start + char_len(&line[..m.token.start]);
    let end = changed.line.start + char_len(&line[..m.token.end]);
    if text
        .runs_in(start..end)
        .any(|run| run.attrs.mention.is_some())
    {
        return None;
    }
    let inner = spec.replacement(line, &m);
    let styled_end = start + char_len(inner);

    tracing::debug!(
        target: "richnote::format",
        token = spec.key.name(),
        range = ?(start..end),
        "formatting inline token"
    );

    let styled = Span::new(inner, editing_style.merged(&spec.style));
    text.batch(|t| {
        t.replace_spans(start..end, &[styled]);
        if t.char_at(styled_end) != Some(' ') {
            t.replace_attributed(styled_end..styled_end, " ", editing_style.typing());
        }
        t.edit_attributes(styled_end..styled_end + 1, |attrs| attrs.caret = true);
    });

    Some(styled_end + 1)
}

/// Convert markdown-ish text to styled spans.
///
/// Each line may open with a list prefix; the rest of the line is scanned
/// for tokens from every spec, earliest match first.
pub fn format(markdown: &str, registry: &StyleRegistry, body: &Attributes) -> Vec<Span> {
    let mut spans = Vec::new();
    for line in markdown.split_inclusive('\n') {
        let (content, terminated) = match line.strip_suffix('\n') {
            Some(content) => (content, true),
            None => (line, false),
        };

        let mut rest = content;
        if let Some((item, prefix_len)) = ListItem::detect(content) {
            spans.extend(item.marker_spans(body));
            // List prefixes are ASCII, so chars and bytes agree.
            rest = &content[prefix_len..];
        }

        format_inline(rest, registry, body, &mut spans);

        if terminated {
            spans.push(Span::new("\n", body.clone()));
        }
    }
    spans
}

fn format_inline(text: &str, registry: &StyleRegistry, body: &Attributes, out: &mut Vec<Span>) {
    let mut pos = 0;
    while pos < text.len() {
        let next = registry
            .specs()
            .iter()
            .filter_map(|spec| spec.find_at(text, pos).map(|m| (spec, m)))
            .min_by_key(|(_, m)| m.token.start);

        let Some((spec, m)) = next else {
            break;
        };
        if m.token.start > pos {
            out.push(Span::new(&text[pos..m.token.start], body.clone()));
        }
        if spec.only_prefix {
            out.push(Span::new(
                spec.replacement(text, &m),
                body.merged(&spec.style),
            ));
        } else {
            // Wrapped tokens may hold another wrapped token.
            format_inline(spec.replacement(text, &m), registry, &body.merged(&spec.style), out);
        }
        pos = m.token.end;
    }
    if pos < text.len() {
        out.push(Span::new(&text[pos..], body.clone()));
    }
}

/// Build a buffer from markdown-ish text, with ordered numbering normalized.
pub fn format_document(markdown: &str, registry: &StyleRegistry) -> AttributedText<EditorRope> {
    let mut text = AttributedText::from_spans(format(markdown, registry, &Attributes::default()));
    lists::renumber_all(&mut text);
    let _ = text.take_pending_edit();
    text
}

/// Convert a buffer back to markdown-ish text.
pub fn deformat<T: TextBuffer>(text: &AttributedText<T>, registry: &StyleRegistry) -> String {
    let mut out = String::new();
    for line in text.lines() {
        let content_end = line.start + text.line_content_len(&line);
        for run in text.runs_in(line.start..content_end) {
            if let Some(item) = run.attrs.list {
                if run.range.start == line.start {
                    out.push_str(&item.markdown_prefix());
                }
                continue;
            }
            let Some(slice) = text.slice(run.range.clone()) else {
                continue;
            };
            let cleaned: String = slice.chars().filter(|c| *c != ZERO_WIDTH_SPACE).collect();
            wrap_run(&cleaned, run.attrs, registry, &mut out);
        }
        if content_end < line.end {
            out.push('\n');
        }
    }
    out
}

fn wrap_run(run: &str, attrs: &Attributes, registry: &StyleRegistry, out: &mut String) {
    if attrs.mention.is_some() || attrs.highlight.is_some() {
        out.push_str(run);
        return;
    }

    let core = run.trim();
    if core.is_empty() {
        out.push_str(run);
        return;
    }
    let leading = &run[..run.len() - run.trim_start().len()];
    let trailing = &run[run.trim_end().len()..];

    let delimiters: Vec<&str> = [
        TokenKey::Bold,
        TokenKey::Italic,
        TokenKey::Underline,
        TokenKey::Strikethrough,
    ]
    .into_iter()
    .filter(|key| key.applies_to(attrs))
    .filter_map(|key| registry.spec(key).map(|spec| spec.delimiter.as_str()))
    .collect();

    out.push_str(leading);
    for delimiter in &delimiters {
        out.push_str(delimiter);
    }
    out.push_str(core);
    for delimiter in delimiters.iter().rev() {
        out.push_str(delimiter);
    }
    out.push_str(trailing);
}
