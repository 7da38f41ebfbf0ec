//! Typed character attributes.
//!
//! Every run in the buffer carries one `Attributes` value. The fields are a
//! closed set: inline styling, list marker bookkeeping, mention identity and
//! the caret-hint flag.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::list::ListItem;

bitflags! {
    /// Font weight and slant flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct FontTraits: u8 {
        const BOLD = 1 << 0;
        const ITALIC = 1 << 1;
    }
}

/// A color, kept as the CSS string it was given as.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub SmolStr);

impl Color {
    pub fn new(value: impl Into<SmolStr>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Paragraph indentation descriptor attached to list markers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParagraphStyle {
    pub first_line_head_indent: f32,
    pub head_indent: f32,
    pub spacing_before: f32,
    pub paragraph_spacing: f32,
}

/// Reference to the entity a mention token points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MentionRef {
    pub id: i64,
    /// The text shown in the buffer, symbol included.
    pub display: SmolStr,
}

/// Highlight applied to prefix tokens recognized by batch formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Highlight {
    Mention,
    Hashtag,
}

/// The attribute set of a run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attributes {
    pub traits: FontTraits,
    pub underline: bool,
    pub strikethrough: bool,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    /// List item, present only on marker characters.
    pub list: Option<ListItem>,
    pub paragraph: Option<ParagraphStyle>,
    /// Spacing after the marker's last character.
    pub kern: Option<f32>,
    pub mention: Option<MentionRef>,
    pub highlight: Option<Highlight>,
    /// Caret-hint marker: the cursor belongs right after this character.
    pub caret: bool,
}

impl Attributes {
    pub fn bold() -> Self {
        Self {
            traits: FontTraits::BOLD,
            ..Default::default()
        }
    }

    pub fn italic() -> Self {
        Self {
            traits: FontTraits::ITALIC,
            ..Default::default()
        }
    }

    pub fn is_bold(&self) -> bool {
        self.traits.contains(FontTraits::BOLD)
    }

    pub fn is_italic(&self) -> bool {
        self.traits.contains(FontTraits::ITALIC)
    }

    /// True when this run belongs to a list marker.
    pub fn is_marker(&self) -> bool {
        self.list.is_some()
    }

    /// Attributes for text typed next to a run with these attributes.
    ///
    /// Marker bookkeeping, mention identity and the caret flag never spread
    /// to new characters.
    pub fn typing(&self) -> Self {
        Self {
            list: None,
            paragraph: None,
            kern: None,
            mention: None,
            highlight: None,
            caret: false,
            ..self.clone()
        }
    }

    /// Overlay an attribute patch.
    ///
    /// Underline and strikethrough are always taken from the patch. Font
    /// traits and optional fields are taken only when the patch sets them.
    pub fn apply_patch(&mut self, patch: &Attributes) {
        if !patch.traits.is_empty() {
            self.traits = patch.traits;
        }
        self.underline = patch.underline;
        self.strikethrough = patch.strikethrough;
        if patch.foreground.is_some() {
            self.foreground = patch.foreground.clone();
        }
        if patch.background.is_some() {
            self.background = patch.background.clone();
        }
        if patch.list.is_some() {
            self.list = patch.list;
        }
        if patch.paragraph.is_some() {
            self.paragraph = patch.paragraph;
        }
        if patch.kern.is_some() {
            self.kern = patch.kern;
        }
        if patch.mention.is_some() {
            self.mention = patch.mention.clone();
        }
        if patch.highlight.is_some() {
            self.highlight = patch.highlight;
        }
        self.caret |= patch.caret;
    }

    /// Add the styling of `style` on top of these attributes.
    ///
    /// Unlike `apply_patch`, flags are unioned rather than replaced.
    pub fn merged(&self, style: &Attributes) -> Self {
        let mut out = self.clone();
        out.traits |= style.traits;
        out.underline |= style.underline;
        out.strikethrough |= style.strikethrough;
        if style.foreground.is_some() {
            out.foreground = style.foreground.clone();
        }
        if style.background.is_some() {
            out.background = style.background.clone();
        }
        if style.highlight.is_some() {
            out.highlight = style.highlight;
        }
        if style.mention.is_some() {
            out.mention = style.mention.clone();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typing_strips_marker_state() {
        let marker = Attributes {
            traits: FontTraits::BOLD,
            list: Some(ListItem::Ordered(Some(2))),
            kern: Some(3.5),
            caret: true,
            ..Default::default()
        };
        let typed = marker.typing();
        assert!(typed.is_bold());
        assert_eq!(typed.list, None);
        assert_eq!(typed.kern, None);
        assert!(!typed.caret);
    }

    #[test]
    fn test_apply_patch_replaces_decorations() {
        let mut attrs = Attributes {
            underline: true,
            foreground: Some(Color::new("red")),
            ..Default::default()
        };
        attrs.apply_patch(&Attributes::italic());
        assert!(attrs.is_italic());
        assert!(!attrs.underline);
        assert_eq!(attrs.foreground, Some(Color::new("red")));
    }

    #[test]
    fn test_apply_patch_keeps_font_without_traits() {
        let mut attrs = Attributes::bold();
        attrs.apply_patch(&Attributes {
            foreground: Some(Color::new("red")),
            ..Default::default()
        });
        assert!(attrs.is_bold());
        assert_eq!(attrs.foreground, Some(Color::new("red")));
    }

    #[test]
    fn test_merged_unions_traits() {
        let base = Attributes::bold();
        let both = base.merged(&Attributes::italic());
        assert!(both.is_bold() && both.is_italic());
    }
}
