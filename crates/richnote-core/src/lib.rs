//! richnote-core: rich text editing logic without platform dependencies.
//!
//! This crate provides:
//! - `AttributedText<T>` - a `TextBuffer` plus contiguous attribute runs
//! - live formatting passes for lists and inline markdown tokens
//! - batch markdown conversion (`markdown::format_document` / `markdown::deformat`)
//! - the mention lifecycle and `RichEditor`, the facade a host view drives

pub mod attrs;
pub mod config;
pub mod editor;
pub mod error;
pub mod format;
pub mod list;
pub mod lists;
pub mod markdown;
pub mod mention;
pub mod storage;
pub mod text;
pub mod text_helpers;
pub mod types;

pub use attrs::{Attributes, Color, FontTraits, Highlight, MentionRef, ParagraphStyle};
pub use config::{EditorConfig, InlineStyle, StyleRegistry};
pub use editor::{EditorEvent, RichEditor, TextFormat};
pub use error::EditorError;
pub use format::{ChangedText, Formatter, WordsFormatter, process_rich_formatting};
pub use list::ListItem;
pub use lists::ListFormatter;
pub use markdown::{TokenKey, TokenSpec};
pub use mention::{MentionEvent, MentionState, Mentionable};
pub use smol_str::SmolStr;
pub use storage::{AttributedText, Run, RunRef, Span};
pub use text::{EditorRope, TextBuffer};
pub use types::{CaretHint, EditMask, PendingEdit, Selection};
