//! A small, forgiving HTML tokenizer.
//!
//! Only what the codec needs: start and end tags with attributes, text with
//! entities decoded, and comments/doctypes (skipped). A `<` that does not
//! start a tag is plain text. Tags and comments that never close are errors.

use smol_str::SmolStr;

use crate::error::{HtmlErrorKind, HtmlParseError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Start {
        name: SmolStr,
        attrs: Vec<(SmolStr, String)>,
        self_closing: bool,
    },
    End {
        name: SmolStr,
    },
}

impl Token {
    /// Value of attribute `name` on a start tag.
    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            Token::Start { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }
}

/// Split `html` into tokens.
pub fn tokenize(html: &str) -> Result<Vec<Token>, HtmlParseError> {
    Tokenizer { src: html, pos: 0 }.run()
}

struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn error(&self, kind: HtmlErrorKind, at: usize) -> HtmlParseError {
        let len = self.src[at..].chars().next().map_or(0, char::len_utf8);
        HtmlParseError::new(kind, self.src, at, len)
    }

    fn run(mut self) -> Result<Vec<Token>, HtmlParseError> {
        let mut tokens = Vec::new();
        let mut text = String::new();

        while self.pos < self.src.len() {
            let rest = self.rest();
            let starts_markup = rest.starts_with('<')
                && rest[1..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!');

            if !starts_markup {
                let first = rest.chars().next().map_or(1, char::len_utf8);
                let end = rest[first..].find('<').map_or(rest.len(), |i| i + first);
                decode_entities(&rest[..end], &mut text);
                self.pos += end;
                continue;
            }

            if !text.is_empty() {
                tokens.push(Token::Text(std::mem::take(&mut text)));
            }

            if rest.starts_with("<!--") {
                let start = self.pos;
                let end = rest[4..]
                    .find("-->")
                    .ok_or_else(|| self.error(HtmlErrorKind::UnterminatedComment, start))?;
                self.pos += 4 + end + 3;
            } else if rest.starts_with("<!") {
                let start = self.pos;
                let end = rest
                    .find('>')
                    .ok_or_else(|| self.error(HtmlErrorKind::UnterminatedTag, start))?;
                self.pos += end + 1;
            } else {
                tokens.push(self.tag()?);
            }
        }

        if !text.is_empty() {
            tokens.push(Token::Text(text));
        }
        Ok(tokens)
    }

    fn tag(&mut self) -> Result<Token, HtmlParseError> {
        let start = self.pos;
        self.pos += 1;
        let closing = self.rest().starts_with('/');
        if closing {
            self.pos += 1;
        }

        let name = self.name();
        let mut attrs = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            let Some(c) = self.rest().chars().next() else {
                return Err(self.error(HtmlErrorKind::UnterminatedTag, start));
            };
            match c {
                '>' => {
                    self.pos += 1;
                    break;
                }
                '/' => {
                    self.pos += 1;
                    self_closing = true;
                }
                _ => {
                    let key = self.name();
                    if key.is_empty() {
                        // Stray character inside the tag.
                        self.pos += c.len_utf8();
                        continue;
                    }
                    self.skip_whitespace();
                    let value = if self.rest().starts_with('=') {
                        self.pos += 1;
                        self.skip_whitespace();
                        self.value()?
                    } else {
                        String::new()
                    };
                    attrs.push((key, value));
                }
            }
        }

        Ok(if closing {
            Token::End { name }
        } else {
            Token::Start {
                name,
                attrs,
                self_closing,
            }
        })
    }

    fn name(&mut self) -> SmolStr {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '>' | '/' | '='))
            .unwrap_or(rest.len());
        self.pos += end;
        SmolStr::new(rest[..end].to_ascii_lowercase())
    }

    fn value(&mut self) -> Result<String, HtmlParseError> {
        let start = self.pos;
        let rest = self.rest();
        let mut out = String::new();
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let end = rest[1..]
                    .find(quote)
                    .ok_or_else(|| self.error(HtmlErrorKind::UnterminatedAttribute, start))?;
                decode_entities(&rest[1..1 + end], &mut out);
                self.pos += end + 2;
            }
            _ => {
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                decode_entities(&rest[..end], &mut out);
                self.pos += end;
            }
        }
        Ok(out)
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }
}

/// Append `raw` to `out` with character references decoded.
///
/// Unknown references are kept as written.
pub fn decode_entities(raw: &str, out: &mut String) {
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| entity(&rest[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
}

fn entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_and_text() {
        let tokens = tokenize(r#"<B>a &amp; b</b><span data-id="7" class='mention'>@x</span><br/>"#)
            .unwrap();
        assert_eq!(tokens.len(), 7);
        assert_eq!(
            tokens[0],
            Token::Start {
                name: "b".into(),
                attrs: vec![],
                self_closing: false
            }
        );
        assert_eq!(tokens[1], Token::Text("a & b".into()));
        assert_eq!(tokens[3].attr("data-id"), Some("7"));
        assert_eq!(tokens[3].attr("class"), Some("mention"));
        assert!(matches!(&tokens[6], Token::Start { name, self_closing: true, .. } if name == "br"));
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let tokens = tokenize("1 < 2 <3").unwrap();
        assert_eq!(tokens, vec![Token::Text("1 < 2 <3".into())]);
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = tokenize("a<!-- <b> -->b").unwrap();
        assert_eq!(tokens, vec![Token::Text("a".into()), Token::Text("b".into())]);
    }

    #[test]
    fn test_numeric_entities() {
        let mut out = String::new();
        decode_entities("&#65;&#x42;&#39;&bogus; &", &mut out);
        assert_eq!(out, "AB'&bogus; &");
    }

    #[test]
    fn test_unterminated_tag() {
        let err = tokenize("ok <b class=\"x\"").unwrap_err();
        assert_eq!(err.kind(), HtmlErrorKind::UnterminatedTag);
        assert_eq!(err.offset(), 3);
    }

    #[test]
    fn test_unterminated_comment_and_attribute() {
        assert_eq!(
            tokenize("<!-- open").unwrap_err().kind(),
            HtmlErrorKind::UnterminatedComment
        );
        let err = tokenize("<span style=\"color: red>x</span>").unwrap_err();
        assert_eq!(err.kind(), HtmlErrorKind::UnterminatedAttribute);
        assert_eq!(err.offset(), 12);
    }
}
