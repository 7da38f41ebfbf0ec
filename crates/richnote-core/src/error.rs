//! Error types for editor setup and attribute decoding.

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while configuring the editor or decoding stored values.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum EditorError {
    /// A token pattern failed to compile.
    #[error("invalid pattern for {key} token")]
    #[diagnostic(
        code(richnote::pattern),
        help("token patterns must capture the styled span as `text`")
    )]
    MalformedPattern {
        key: &'static str,
        #[source]
        source: regex::Error,
    },

    /// A list item raw value did not parse.
    #[error("invalid list item value: {0:?}")]
    #[diagnostic(code(richnote::list_value))]
    InvalidListValue(String),

    /// Editor configuration failed to deserialize.
    #[error("invalid editor configuration")]
    #[diagnostic(code(richnote::config))]
    Config {
        #[source]
        source: serde_json::Error,
    },
}
