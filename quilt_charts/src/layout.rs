// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A tiny arrange helper for containers.
//!
//! Components draw in plot-local coordinates (`0..width`, `0..height`). The container
//! reserves its configured margin plus whatever the components report as bleed, and places the
//! plot rectangle inside the view.

use kurbo::Rect;

use crate::spacing::Spacing;

/// A width/height pair.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Size {
    /// Creates a size; negative or non-finite extents become `0`.
    pub fn new(width: f64, height: f64) -> Self {
        let clean = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            width: clean(width),
            height: clean(height),
        }
    }
}

/// Output of the arrange pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContainerLayout {
    /// Outer bounds.
    pub view: Rect,
    /// The plot rectangle, in view coordinates.
    pub plot: Rect,
    /// The margin that was applied (configured margin plus bleed).
    pub margin: Spacing,
}

impl ContainerLayout {
    /// Places the plot inside a `view` of the given size.
    pub fn arrange(view: Size, margin: Spacing, bleed: Spacing) -> Self {
        let margin = margin.max(Spacing::ZERO).add(bleed.max(Spacing::ZERO));
        let plot_w = (view.width - margin.horizontal()).max(0.0);
        let plot_h = (view.height - margin.vertical()).max(0.0);
        Self {
            view: Rect::new(0.0, 0.0, view.width, view.height),
            plot: Rect::new(
                margin.left,
                margin.top,
                margin.left + plot_w,
                margin.top + plot_h,
            ),
            margin,
        }
    }

    /// The plot size.
    pub fn plot_size(&self) -> Size {
        Size::new(self.plot.width(), self.plot.height())
    }

    /// The view box that renders plot-local coordinates at their place in the view.
    pub fn plot_local_view_box(&self) -> Rect {
        Rect::new(
            -self.plot.x0,
            -self.plot.y0,
            self.view.x1 - self.plot.x0,
            self.view.y1 - self.plot.y0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bleed_adds_to_margin() {
        let layout = ContainerLayout::arrange(
            Size::new(200.0, 100.0),
            Spacing::uniform(10.0),
            Spacing {
                left: 5.0,
                ..Spacing::ZERO
            },
        );
        assert!((layout.plot.x0 - 15.0).abs() < 1e-9);
        assert!((layout.plot.width() - 175.0).abs() < 1e-9);
        assert!((layout.plot.height() - 80.0).abs() < 1e-9);
        assert_eq!(layout.plot_local_view_box().x0, -15.0);
    }

    #[test]
    fn oversized_margins_leave_an_empty_plot() {
        let layout = ContainerLayout::arrange(Size::new(10.0, 10.0), Spacing::uniform(20.0), Spacing::ZERO);
        assert_eq!(layout.plot_size(), Size::new(0.0, 0.0));
    }
}
