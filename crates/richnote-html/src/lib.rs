//! richnote-html: HTML interchange for richnote documents.
//!
//! `to_html` writes inline formatting as `<b>`/`<i>`/`<u>`/`<del>`, colors
//! as styled spans, mentions as `span[data-id]`, and list lines as `<li>`
//! inside `<ul>`/`<ol>` groups. `from_html` reads that markup (and the common
//! variants editors paste) back into an `AttributedText`, re-deriving mention
//! identity through a caller-supplied resolver.

pub mod decode;
pub mod encode;
pub mod error;
pub mod tokenizer;

pub use decode::{from_html, from_html_with};
pub use encode::to_html;
pub use error::{HtmlErrorKind, HtmlParseError};
