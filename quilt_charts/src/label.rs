// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Label placement around a glyph and estimated label bounds.

extern crate alloc;

use alloc::string::String;

use kurbo::{Point, Rect};
use quilt_core::{TextAnchor, TextBaseline};

use crate::measure::TextMeasurer;
use crate::record::{FromValue, Value};

/// Gap between a glyph's edge and its label, in pixels.
pub const LABEL_GAP: f64 = 4.0;

/// Where a label sits relative to its glyph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Position {
    /// Above.
    Top,
    /// Below.
    #[default]
    Bottom,
    /// To the left.
    Left,
    /// To the right.
    Right,
    /// Centered on the glyph.
    Center,
}

impl FromValue for Position {
    fn from_value(value: Value<'_>) -> Option<Self> {
        let Value::Str(s) = value else {
            return None;
        };
        Some(match s {
            "top" => Self::Top,
            "bottom" => Self::Bottom,
            "left" => Self::Left,
            "right" => Self::Right,
            "center" => Self::Center,
            _ => return None,
        })
    }
}

/// Anchor point and alignment of a label.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelPlacement {
    /// Anchor point.
    pub pos: Point,
    /// Horizontal alignment at the anchor.
    pub anchor: TextAnchor,
    /// Vertical alignment at the anchor.
    pub baseline: TextBaseline,
}

/// Places a label next to a glyph of radius `radius` centered at `center`.
pub fn place_label(center: Point, radius: f64, position: Position) -> LabelPlacement {
    let d = radius.max(0.0) + LABEL_GAP;
    let (dx, dy, anchor, baseline) = match position {
        Position::Top => (0.0, -d, TextAnchor::Middle, TextBaseline::Alphabetic),
        Position::Bottom => (0.0, d, TextAnchor::Middle, TextBaseline::Hanging),
        Position::Left => (-d, 0.0, TextAnchor::End, TextBaseline::Middle),
        Position::Right => (d, 0.0, TextAnchor::Start, TextBaseline::Middle),
        Position::Center => (0.0, 0.0, TextAnchor::Middle, TextBaseline::Middle),
    };
    LabelPlacement {
        pos: Point::new(center.x + dx, center.y + dy),
        anchor,
        baseline,
    }
}

/// Estimated bounds of `text` anchored at `pos` with the given alignment.
pub fn label_bounds(
    text: &str,
    font_size: f64,
    pos: Point,
    anchor: TextAnchor,
    baseline: TextBaseline,
    measurer: &dyn TextMeasurer,
) -> Rect {
    let (w, h) = measurer.measure(text, font_size);
    let x0 = match anchor {
        TextAnchor::Start => pos.x,
        TextAnchor::Middle => pos.x - w * 0.5,
        TextAnchor::End => pos.x - w,
    };
    let y0 = match baseline {
        TextBaseline::Hanging => pos.y,
        TextBaseline::Middle => pos.y - h * 0.5,
        TextBaseline::Alphabetic | TextBaseline::Ideographic => pos.y - h,
    };
    Rect::new(x0, y0, x0 + w, y0 + h)
}

/// Shortens `text` with a trailing ellipsis until it fits `max_width`.
///
/// Returns the text unchanged if it already fits or if `max_width` is not positive.
pub fn truncate_to_width(
    text: &str,
    font_size: f64,
    max_width: f64,
    measurer: &dyn TextMeasurer,
) -> String {
    if max_width <= 0.0 || measurer.measure(text, font_size).0 <= max_width {
        return text.into();
    }
    let mut out = String::new();
    for c in text.chars() {
        out.push(c);
        out.push('…');
        let fits = measurer.measure(&out, font_size).0 <= max_width;
        out.pop();
        if !fits {
            out.pop();
            break;
        }
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::HeuristicTextMeasurer;

    #[test]
    fn bottom_labels_hang_below_the_glyph() {
        let p = place_label(Point::new(10.0, 10.0), 5.0, Position::Bottom);
        assert_eq!(p.pos, Point::new(10.0, 19.0));
        let b = label_bounds("ab", 10.0, p.pos, p.anchor, p.baseline, &HeuristicTextMeasurer);
        assert!((b.x0 - 4.0).abs() < 1e-9 && (b.x1 - 16.0).abs() < 1e-9);
        assert!((b.y0 - 19.0).abs() < 1e-9 && (b.y1 - 29.0).abs() < 1e-9);
    }

    #[test]
    fn truncation_keeps_within_width() {
        let m = HeuristicTextMeasurer;
        let t = truncate_to_width("abcdefghij", 10.0, 30.0, &m);
        assert_eq!(t, "abcd…");
        assert!(m.measure(&t, 10.0).0 <= 30.0);
        assert_eq!(truncate_to_width("abc", 10.0, 0.0, &m), "abc");
    }
}
