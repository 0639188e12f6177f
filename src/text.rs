//! Text shaping, line measurement and the greedy title wrap.

use std::borrow::Cow;

use crate::fonts::ResolvedFont;
use crate::foundation::error::{StoryError, StoryResult};

/// Brush carried through shaped layouts, straight RGBA8.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Shared parley contexts. Registration and shaping must go through the same
/// instance so the family resolves.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
}

impl TextLayoutEngine {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Register the resolved face and return the family name to style with.
    pub fn register(&mut self, font: &ResolvedFont) -> StoryResult<String> {
        let families = self.font_ctx.collection.register_fonts(
            parley::fontique::Blob::from(font.bytes.as_ref().clone()),
            None,
        );
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| StoryError::render_context("font bytes registered no families"))?;
        self.font_ctx
            .collection
            .family_name(family_id)
            .map(|name| name.to_string())
            .ok_or_else(|| StoryError::render_context("registered font family has no name"))
    }

    /// Shape one line of text at `size_px`. The layout is broken so width
    /// and height are available immediately.
    pub fn layout_line(
        &mut self,
        text: &str,
        family: &str,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> StoryResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(StoryError::validation(format!(
                "font size must be positive, got {size_px}"
            )));
        }
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(family.to_string())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));
        let mut layout = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }

    /// Advance width of `text` as a single unbroken line.
    pub fn measure_line(&mut self, text: &str, family: &str, size_px: f32) -> StoryResult<f64> {
        let layout = self.layout_line(text, family, size_px, TextBrushRgba8::default())?;
        Ok(f64::from(layout.width()))
    }
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Width oracle for the wrap. Abstracted so the wrap logic is testable
/// without fonts.
pub trait TextMeasurer {
    fn measure(&mut self, text: &str) -> StoryResult<f64>;
}

/// [`TextMeasurer`] backed by the shaping engine at a fixed family and size.
pub struct EngineMeasurer<'a> {
    pub engine: &'a mut TextLayoutEngine,
    pub family: &'a str,
    pub size_px: f32,
}

impl TextMeasurer for EngineMeasurer<'_> {
    fn measure(&mut self, text: &str) -> StoryResult<f64> {
        self.engine.measure_line(text, self.family, self.size_px)
    }
}

/// Greedy word wrap. Words are packed into the current line until appending
/// the next one would exceed `max_width`; the line is then flushed and the
/// word starts the next line. A single word wider than `max_width` still
/// gets its own line. Lines come back in reading order, top to bottom.
pub fn wrap_title<M: TextMeasurer + ?Sized>(
    title: &str,
    max_width: f64,
    measurer: &mut M,
) -> StoryResult<Vec<String>> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in title.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{line} {word}")
        };
        if !line.is_empty() && measurer.measure(&candidate)? > max_width {
            lines.push(std::mem::take(&mut line));
            line.push_str(word);
        } else {
            line = candidate;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic measurer: every char is `char_px` wide.
    struct FixedWidth {
        char_px: f64,
    }

    impl TextMeasurer for FixedWidth {
        fn measure(&mut self, text: &str) -> StoryResult<f64> {
            Ok(text.chars().count() as f64 * self.char_px)
        }
    }

    #[test]
    fn wrap_packs_greedily_in_reading_order() {
        let mut m = FixedWidth { char_px: 10.0 };
        let lines = wrap_title("aa bb cc dd ee", 80.0, &mut m).unwrap();
        assert_eq!(lines, vec!["aa bb cc", "dd ee"]);
    }

    #[test]
    fn wrap_splits_eight_words_at_three_per_line() {
        let mut m = FixedWidth { char_px: 10.0 };
        // Exactly three single-char words fit in 50px ("A B C" is five chars).
        let lines = wrap_title("A B C D E F G H", 50.0, &mut m).unwrap();
        assert_eq!(lines, vec!["A B C", "D E F", "G H"]);
    }

    #[test]
    fn wrap_keeps_exact_fit_on_one_line() {
        let mut m = FixedWidth { char_px: 10.0 };
        // "aa bb" measures exactly 50; only widths beyond the max break.
        let lines = wrap_title("aa bb", 50.0, &mut m).unwrap();
        assert_eq!(lines, vec!["aa bb"]);
    }

    #[test]
    fn wrap_gives_overwide_word_its_own_line() {
        let mut m = FixedWidth { char_px: 10.0 };
        let lines = wrap_title("hi incomprehensibilities yo", 100.0, &mut m).unwrap();
        assert_eq!(lines, vec!["hi", "incomprehensibilities", "yo"]);
    }

    #[test]
    fn wrap_preserves_every_word_once() {
        let mut m = FixedWidth { char_px: 7.0 };
        let title = "the quick brown fox jumps over the lazy dog";
        let lines = wrap_title(title, 60.0, &mut m).unwrap();
        let rejoined = lines.join(" ");
        assert_eq!(rejoined, title);
    }

    #[test]
    fn wrap_collapses_runs_of_whitespace() {
        let mut m = FixedWidth { char_px: 10.0 };
        let lines = wrap_title("a  b\tc", 1000.0, &mut m).unwrap();
        assert_eq!(lines, vec!["a b c"]);
    }

    #[test]
    fn wrap_of_empty_title_is_empty() {
        let mut m = FixedWidth { char_px: 10.0 };
        let lines = wrap_title("   ", 100.0, &mut m).unwrap();
        assert!(lines.is_empty());
    }
}
