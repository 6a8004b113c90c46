//! Overlay layout: font-size policy and text reflow for one region.
//!
//! Layout is a pure function of the region box, the text and the
//! [`OverlayStyle`], so the same inputs always yield the same geometry.
//! [`crate::pipeline::annotate`] only replays the lines computed here.
//!
//! Text is set in the PDF base-14 Helvetica, so widths are measured with its
//! standard advance widths (1/1000 em). Characters outside printable ASCII
//! use the width of a digit, which is close to the Helvetica average.

use crate::geometry::BoundingBox;
use serde::{Deserialize, Serialize};

/// Line pitch as a multiple of the font size.
pub const LINE_HEIGHT: f32 = 1.2;

/// Helvetica ascender, as a fraction of the font size.
pub const ASCENT: f32 = 0.718;

/// Helvetica advance widths for U+0020..=U+007E.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const FALLBACK_WIDTH: u16 = 556;

/// RGBA overlay colour, alpha in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: f32,
}

impl OverlayColor {
    pub const RED: Self = Self {
        r: 255,
        g: 0,
        b: 0,
        alpha: 0.7,
    };

    /// Alpha as an 8-bit channel value.
    pub fn alpha_u8(&self) -> u8 {
        (self.alpha.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

/// How overlay text is sized and painted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayStyle {
    /// Inset applied to every side of the region box. Default: 2.
    pub margin: f32,
    /// Upper bound on the font size. Default: 12.
    pub max_font_size: f32,
    /// Font size as a fraction of the region box height. Default: 0.6.
    pub font_scale: f32,
    /// Default: red at 70% opacity.
    pub color: OverlayColor,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            margin: 2.0,
            max_font_size: 12.0,
            font_scale: 0.6,
            color: OverlayColor::RED,
        }
    }
}

impl OverlayStyle {
    /// `min(max_font_size, box_height * font_scale)`.
    pub fn font_size_for(&self, box_height: f32) -> f32 {
        (box_height * self.font_scale).min(self.max_font_size)
    }
}

/// One line of overlay text, positioned in page pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedLine {
    pub text: String,
    /// Left edge of the line.
    pub x: f32,
    /// Baseline, measured from the top of the page.
    pub baseline: f32,
}

/// The complete, drawable layout of one region's overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBoxLayout {
    /// The inset rectangle the text is confined to.
    pub rect: BoundingBox,
    pub font_size: f32,
    pub lines: Vec<PlacedLine>,
    /// Some wrapped lines did not fit below the first one and were dropped.
    pub truncated: bool,
}

/// Advance width of `text` at `font_size`.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| {
            let code = c as u32;
            if (0x20..=0x7e).contains(&code) {
                u32::from(HELVETICA_WIDTHS[(code - 0x20) as usize])
            } else {
                u32::from(FALLBACK_WIDTH)
            }
        })
        .sum();
    units as f32 * font_size / 1000.0
}

/// Greedy word wrap to `max_width`.
///
/// Explicit newlines start a new line; blank lines are preserved. Words
/// wider than `max_width` on their own are broken between characters.
pub fn wrap_text(text: &str, font_size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if text_width(&candidate, font_size) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if text_width(word, font_size) <= max_width {
                current = word.to_string();
            } else {
                let mut pieces = break_word(word, font_size, max_width);
                current = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
            }
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Split an over-long word into chunks no wider than `max_width`
/// (at least one character per chunk).
fn break_word(word: &str, font_size: f32, max_width: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for c in word.chars() {
        let mut candidate = current.clone();
        candidate.push(c);
        if !current.is_empty() && text_width(&candidate, font_size) > max_width {
            pieces.push(std::mem::replace(&mut current, c.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Lay out `text` inside the region whose bounding box is `region_box`.
///
/// The font size follows the *full* region height; the text is confined to
/// the box inset by `style.margin`. Returns `None` when there is nothing to
/// draw: empty text, a non-positive font size, an inset box with no area,
/// or one too short to hold the first baseline.
pub fn layout_text_box(region_box: &BoundingBox, text: &str, style: &OverlayStyle) -> Option<TextBoxLayout> {
    if text.trim().is_empty() {
        return None;
    }
    let font_size = style.font_size_for(region_box.height());
    if font_size.is_nan() || font_size <= 0.0 {
        return None;
    }
    let rect = region_box.inset(style.margin);
    if rect.is_empty() {
        return None;
    }

    let wrapped = wrap_text(text, font_size, rect.width());
    let pitch = font_size * LINE_HEIGHT;
    let first_baseline = rect.y_min + font_size * ASCENT;
    if first_baseline > rect.y_max {
        return None;
    }

    let mut lines = Vec::with_capacity(wrapped.len());
    let mut truncated = false;
    for (i, line) in wrapped.into_iter().enumerate() {
        let top = rect.y_min + pitch * i as f32;
        if i > 0 && top + pitch > rect.y_max {
            truncated = true;
            break;
        }
        if line.is_empty() {
            continue;
        }
        lines.push(PlacedLine {
            text: line,
            x: rect.x_min,
            baseline: first_baseline + pitch * i as f32,
        });
    }

    Some(TextBoxLayout {
        rect,
        font_size,
        lines,
        truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn font_size_caps_at_twelve() {
        let style = OverlayStyle::default();
        assert_eq!(style.font_size_for(20.0), 12.0);
        assert_eq!(style.font_size_for(200.0), 12.0);
        assert!((style.font_size_for(10.0) - 6.0).abs() < 1e-6);
    }

    #[test]
    fn measures_helvetica() {
        // H=722 e=556 l=222 l=222 o=556
        assert!((text_width("Hello", 10.0) - 22.78).abs() < 1e-3);
        assert_eq!(text_width("", 12.0), 0.0);
    }

    #[test]
    fn hello_fits_in_reference_box() {
        let region = BoundingBox::new(10.0, 10.0, 110.0, 30.0);
        let layout = layout_text_box(&region, "Hello", &OverlayStyle::default()).unwrap();
        assert_eq!(layout.font_size, 12.0);
        assert_eq!(layout.rect, BoundingBox::new(12.0, 12.0, 108.0, 28.0));
        assert_eq!(layout.lines.len(), 1);
        assert_eq!(layout.lines[0].text, "Hello");
        assert_eq!(layout.lines[0].x, 12.0);
        assert!(layout.lines[0].baseline > 12.0 && layout.lines[0].baseline < 28.0);
        assert!(!layout.truncated);
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap_text("alpha beta gamma delta", 10.0, 60.0);
        assert!(lines.len() > 1, "got {lines:?}");
        for l in &lines {
            assert!(text_width(l, 10.0) <= 60.0, "{l} too wide");
        }
        assert_eq!(lines.join(" "), "alpha beta gamma delta");
    }

    #[test]
    fn breaks_overlong_word() {
        let lines = wrap_text("WWWWWWWWWW", 10.0, 20.0);
        assert!(lines.len() >= 5);
        assert_eq!(lines.concat(), "WWWWWWWWWW");
    }

    #[test]
    fn keeps_explicit_newlines() {
        let lines = wrap_text("one\ntwo", 10.0, 500.0);
        assert_eq!(lines, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn overflow_lines_are_dropped_but_first_is_kept() {
        let region = BoundingBox::new(0.0, 0.0, 60.0, 20.0);
        let layout =
            layout_text_box(&region, "several words that will not fit", &OverlayStyle::default()).unwrap();
        assert_eq!(layout.lines.len(), 1);
        assert!(layout.truncated);
    }

    #[test]
    fn nothing_to_draw() {
        let style = OverlayStyle::default();
        let flat = BoundingBox::new(0.0, 5.0, 50.0, 5.0);
        assert!(layout_text_box(&flat, "x", &style).is_none());
        let tiny = BoundingBox::new(0.0, 0.0, 3.0, 3.0);
        assert!(layout_text_box(&tiny, "x", &style).is_none());
        let short = BoundingBox::new(0.0, 0.0, 100.0, 6.0);
        assert!(layout_text_box(&short, "x", &style).is_none());
        let ok = BoundingBox::new(0.0, 0.0, 50.0, 20.0);
        assert!(layout_text_box(&ok, "   ", &style).is_none());
    }

    #[test]
    fn layout_is_deterministic() {
        let region = BoundingBox::new(40.0, 100.0, 400.0, 160.0);
        let text = "The quick brown fox jumps over the lazy dog";
        let style = OverlayStyle::default();
        assert_eq!(
            layout_text_box(&region, text, &style),
            layout_text_box(&region, text, &style)
        );
    }

    #[test]
    fn red_alpha_channel() {
        assert_eq!(OverlayColor::RED.alpha_u8(), 179);
    }
}
