// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text measurement hooks for label layout.
//!
//! Shaping stays downstream, so label placement, bleed and collision use a measurer callback
//! for rough bounds.

/// Measures label text.
///
/// Hosts with a shaping engine supply their own; everything else uses
/// [`HeuristicTextMeasurer`]. Scatter bleed and label collision depend on these boxes, so an
/// implementation should be deterministic for a given string and size.
pub trait TextMeasurer {
    /// Returns the `(width, height)` of `text` in pixels at `font_size`.
    fn measure(&self, text: &str, font_size: f64) -> (f64, f64);
}

/// Width from character count: 0.6em per character, one em tall.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicTextMeasurer;

impl TextMeasurer for HeuristicTextMeasurer {
    fn measure(&self, text: &str, font_size: f64) -> (f64, f64) {
        let width = 0.6 * font_size * text.chars().count() as f64;
        (width, font_size)
    }
}
