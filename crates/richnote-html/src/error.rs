//! Error types for HTML decoding.

use miette::{Diagnostic, NamedSource, SourceSpan};

/// What went wrong while reading markup.
#[derive(thiserror::Error, Debug, Diagnostic, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum HtmlErrorKind {
    #[error("tag is never closed")]
    #[diagnostic(code(richnote::html::unterminated_tag))]
    UnterminatedTag,

    #[error("comment is never closed")]
    #[diagnostic(code(richnote::html::unterminated_comment))]
    UnterminatedComment,

    #[error("attribute value is never closed")]
    #[diagnostic(code(richnote::html::unterminated_attribute))]
    UnterminatedAttribute,
}

/// Malformed markup, with the offending location in the input.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[error("html parse error: {kind}")]
#[diagnostic(
    code(richnote::html::parse),
    help("the input was not decoded; fall back to inserting it as plain text")
)]
pub struct HtmlParseError {
    #[diagnostic_source]
    kind: HtmlErrorKind,
    #[source_code]
    src: NamedSource<String>,
    #[label("starts here")]
    location: SourceSpan,
}

impl HtmlParseError {
    pub(crate) fn new(kind: HtmlErrorKind, html: &str, offset: usize, len: usize) -> Self {
        Self {
            kind,
            src: NamedSource::new("input.html", html.to_owned()),
            location: SourceSpan::new(offset.into(), len),
        }
    }

    pub fn kind(&self) -> HtmlErrorKind {
        self.kind
    }

    /// Byte offset of the error in the input.
    pub fn offset(&self) -> usize {
        self.location.offset()
    }
}
