//! Attributed text to HTML.
//!
//! Lines are rendered one at a time and collected into groups: consecutive
//! list lines sharing a group tag (`ul`/`ol`) form one list element, and
//! consecutive plain lines are joined with `<br>`. Marker characters are
//! structural and never written.

use std::sync::LazyLock;

use pulldown_cmark_escape::{escape_html, escape_html_body_text};
use regex::Regex;
use richnote_core::{Attributes, AttributedText, ListItem, TextBuffer};

/// A line break left in front of the closing tags that end a fragment.
static TRAILING_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n((?:</[^>]+>)*)$").unwrap());

struct Group {
    tag: Option<&'static str>,
    start: Option<u32>,
    lines: Vec<String>,
}

/// Serialize `text` to HTML.
#[tracing::instrument(skip(text), fields(len = text.len()))]
pub fn to_html<T: TextBuffer>(text: &AttributedText<T>) -> String {
    let mut groups: Vec<Group> = Vec::new();

    let mut lines = text.lines();
    if !text.is_empty() && text.char_at(text.len() - 1) == Some('\n') {
        lines.push(text.len()..text.len());
    }

    for line in lines {
        let item = text.list_item_at(line.start);
        let mut fragment = String::new();
        for run in text.runs_in(line.clone()) {
            if run.attrs.list.is_some() {
                continue;
            }
            let Some(slice) = text.slice(run.range.clone()) else {
                continue;
            };
            write_run(&mut fragment, &slice, run.attrs);
        }
        let fragment = TRAILING_BREAK.replace(&fragment, "$1").into_owned();

        let tag = item.map(|item| item.group_tag());
        let html = match item {
            Some(item) => list_line(item, &fragment),
            None => fragment,
        };

        match groups.last_mut() {
            Some(group) if group.tag == tag => group.lines.push(html),
            _ => groups.push(Group {
                tag,
                start: item.and_then(|item| item.number()),
                lines: vec![html],
            }),
        }
    }

    tracing::trace!(target: "richnote::html", groups = groups.len(), "encoded lines");

    let mut out = String::new();
    let count = groups.len();
    for (i, group) in groups.into_iter().enumerate() {
        match group.tag {
            None => out.push_str(&group.lines.join("<br>")),
            Some(tag) => {
                out.push('<');
                out.push_str(tag);
                if let Some(start) = group.start.filter(|n| *n != 1) {
                    out.push_str(&format!(" start=\"{start}\""));
                }
                out.push('>');
                out.push_str(&group.lines.concat());
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
        if i + 1 < count {
            out.push_str("<br>");
        }
    }
    out
}

fn list_line(item: ListItem, content: &str) -> String {
    match item {
        ListItem::Bullet { level: 0 } | ListItem::Ordered(_) => format!("<li>{content}</li>"),
        other => {
            let mut out = String::from("<li data-type=\"");
            let _ = escape_html(&mut out, &other.to_string());
            out.push_str("\">");
            out.push_str(content);
            out.push_str("</li>");
            out
        }
    }
}

fn write_run(out: &mut String, text: &str, attrs: &Attributes) {
    let (body, terminator) = match text.strip_suffix('\n') {
        Some(body) => (body, "\n"),
        None => (text, ""),
    };
    if body.is_empty() {
        out.push_str(terminator);
        return;
    }

    let mut closers: Vec<&'static str> = Vec::new();
    if let Some(mention) = &attrs.mention {
        out.push_str(&format!("<span data-id=\"{}\" class=\"mention\">", mention.id));
        closers.push("</span>");
    } else if attrs.foreground.is_some() || attrs.background.is_some() {
        let mut style = Vec::new();
        if let Some(color) = &attrs.foreground {
            style.push(format!("color: {}", color.as_str()));
        }
        if let Some(color) = &attrs.background {
            style.push(format!("background-color: {}", color.as_str()));
        }
        out.push_str("<span style=\"");
        let _ = escape_html(&mut *out, &style.join("; "));
        out.push_str("\">");
        closers.push("</span>");
    }

    let wrappers = [
        (attrs.strikethrough, "<del>", "</del>"),
        (attrs.underline, "<u>", "</u>"),
        (attrs.is_italic(), "<i>", "</i>"),
        (attrs.is_bold(), "<b>", "</b>"),
    ];
    for (on, open, close) in wrappers {
        if on {
            out.push_str(open);
            closers.push(close);
        }
    }

    let _ = escape_html_body_text(&mut *out, body);
    out.push_str(terminator);
    for close in closers.iter().rev() {
        out.push_str(close);
    }
}
