//! Editor configuration and the token style registry.
//!
//! `EditorConfig` is plain serde data. `StyleRegistry` is what the formatter
//! passes read: the compiled token specs plus the mention and hashtag styles.
//! A registry is read-only once built and is shared behind an `Arc`.

use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};

use crate::attrs::{Attributes, Color, FontTraits, Highlight};
use crate::error::EditorError;
use crate::markdown::{TokenKey, TokenSpec};

static GLOBAL_REGISTRY: LazyLock<Arc<StyleRegistry>> = LazyLock::new(|| {
    Arc::new(
        StyleRegistry::new(&EditorConfig::default()).expect("built-in token patterns compile"),
    )
});

/// Inline styling as it appears in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InlineStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
}

impl InlineStyle {
    pub fn to_attributes(&self) -> Attributes {
        let mut traits = FontTraits::empty();
        traits.set(FontTraits::BOLD, self.bold);
        traits.set(FontTraits::ITALIC, self.italic);
        Attributes {
            traits,
            underline: self.underline,
            strikethrough: self.strikethrough,
            foreground: self.foreground.clone(),
            background: self.background.clone(),
            ..Default::default()
        }
    }

    pub fn from_attributes(attrs: &Attributes) -> Self {
        Self {
            bold: attrs.is_bold(),
            italic: attrs.is_italic(),
            underline: attrs.underline,
            strikethrough: attrs.strikethrough,
            foreground: attrs.foreground.clone(),
            background: attrs.background.clone(),
        }
    }
}

/// Editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Character that starts a mention search.
    pub mention_symbol: char,
    /// Character that signals a hashtag.
    pub hashtag_symbol: char,
    pub mention_style: InlineStyle,
    pub hashtag_style: InlineStyle,
    /// Rewrite inline markdown tokens while typing.
    pub live_formatting: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        let accent = InlineStyle {
            foreground: Some(Color::new("#007AFF")),
            ..Default::default()
        };
        Self {
            mention_symbol: '@',
            hashtag_symbol: '#',
            mention_style: accent.clone(),
            hashtag_style: accent,
            live_formatting: true,
        }
    }
}

impl EditorConfig {
    /// Parse configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        serde_json::from_str(json).map_err(|source| EditorError::Config { source })
    }
}

/// Compiled token specs and token styles.
#[derive(Debug, Clone)]
pub struct StyleRegistry {
    specs: Vec<TokenSpec>,
    mention_style: Attributes,
    mention_symbol: char,
    hashtag_symbol: char,
    live_formatting: bool,
}

impl StyleRegistry {
    /// Build a registry from configuration.
    pub fn new(config: &EditorConfig) -> Result<Self, EditorError> {
        let hashtag_style = Attributes {
            highlight: Some(Highlight::Hashtag),
            ..config.hashtag_style.to_attributes()
        };
        let prefix_mention_style = Attributes {
            highlight: Some(Highlight::Mention),
            ..config.mention_style.to_attributes()
        };

        let specs = vec![
            TokenSpec::new(
                TokenKey::Bold,
                r"\*\*(?P<text>\*(?:~\w+(?:[ \t]+\w+)*~|\w+(?:[ \t]+\w+)*)\*|~\w+(?:[ \t]+\w+)*~|\w+(?:[ \t]+\w+)*)\*\*",
                Attributes::bold(),
                "**",
                false,
            )?,
            TokenSpec::new(
                TokenKey::Italic,
                r"(?:^|[^*])(?P<token>\*(?P<text>~\w+(?:[ \t]+\w+)*~|\w+(?:[ \t]+\w+)*)\*)(?:[^*]|$)",
                Attributes::italic(),
                "*",
                false,
            )?,
            TokenSpec::new(
                TokenKey::Underline,
                r"(?:^|\W)(?P<token>_(?P<text>~[^\W_]+(?:[ \t]+[^\W_]+)*~|[^\W_]+(?:[ \t]+[^\W_]+)*)_)(?:\W|$)",
                Attributes {
                    underline: true,
                    ..Default::default()
                },
                "_",
                false,
            )?,
            TokenSpec::new(
                TokenKey::Strikethrough,
                r"~(?P<text>\w+(?:[ \t]+\w+)*)~",
                Attributes {
                    strikethrough: true,
                    ..Default::default()
                },
                "~",
                false,
            )?,
            TokenSpec::prefix(TokenKey::Mention, config.mention_symbol, prefix_mention_style)?,
            TokenSpec::prefix(TokenKey::Hashtag, config.hashtag_symbol, hashtag_style)?,
        ];

        Ok(Self {
            specs,
            mention_style: config.mention_style.to_attributes(),
            mention_symbol: config.mention_symbol,
            hashtag_symbol: config.hashtag_symbol,
            live_formatting: config.live_formatting,
        })
    }

    /// The process-wide registry built from the default configuration.
    pub fn global() -> Arc<StyleRegistry> {
        GLOBAL_REGISTRY.clone()
    }

    /// All specs in precedence order.
    pub fn specs(&self) -> &[TokenSpec] {
        &self.specs
    }

    /// Specs applied while typing. Prefix tokens are left to the mention
    /// subsystem.
    pub fn live_specs(&self) -> impl Iterator<Item = &TokenSpec> {
        self.specs
            .iter()
            .filter(|spec| self.live_formatting && !spec.only_prefix)
    }

    pub fn spec(&self, key: TokenKey) -> Option<&TokenSpec> {
        self.specs.iter().find(|spec| spec.key == key)
    }

    /// Style of confirmed mention tokens, without the mention reference.
    pub fn mention_style(&self) -> &Attributes {
        &self.mention_style
    }

    pub fn mention_symbol(&self) -> char {
        self.mention_symbol
    }

    pub fn hashtag_symbol(&self) -> char {
        self.hashtag_symbol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_partial_json() {
        let config = EditorConfig::from_json(r#"{ "mention_symbol": "+", "live_formatting": false }"#)
            .unwrap();
        assert_eq!(config.mention_symbol, '+');
        assert_eq!(config.hashtag_symbol, '#');
        assert!(!config.live_formatting);
    }

    #[test]
    fn test_config_rejects_bad_json() {
        let err = EditorConfig::from_json(r#"{ "mention_symbol": 12 }"#).unwrap_err();
        assert!(matches!(err, EditorError::Config { .. }));
    }

    #[test]
    fn test_registry_order() {
        let registry = StyleRegistry::global();
        let keys: Vec<_> = registry.specs().iter().map(|s| s.key).collect();
        assert_eq!(
            keys,
            vec![
                TokenKey::Bold,
                TokenKey::Italic,
                TokenKey::Underline,
                TokenKey::Strikethrough,
                TokenKey::Mention,
                TokenKey::Hashtag,
            ]
        );
        assert_eq!(registry.live_specs().count(), 4);
    }

    #[test]
    fn test_live_formatting_can_be_disabled() {
        let config = EditorConfig {
            live_formatting: false,
            ..Default::default()
        };
        let registry = StyleRegistry::new(&config).unwrap();
        assert_eq!(registry.live_specs().count(), 0);
    }

    #[test]
    fn test_inline_style_round_trip() {
        let style = InlineStyle {
            bold: true,
            strikethrough: true,
            background: Some(Color::new("yellow")),
            ..Default::default()
        };
        assert_eq!(InlineStyle::from_attributes(&style.to_attributes()), style);
    }
}
