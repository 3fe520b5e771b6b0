// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scatter configuration.

extern crate alloc;

use alloc::string::String;
use core::fmt;

use peniko::Color;
use quilt_core::{Attributes, Events};
use smallvec::SmallVec;

use crate::accessor::{Accessor, SeriesAccessor, same_optional};
use crate::component::DEFAULT_DURATION;
use crate::label::Position;
use crate::scale::ScaleContinuous;
use crate::scatter::ScatterPoint;
use crate::symbol::Symbol;

/// Whether series share one size scale or get one each.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SizeDomain {
    /// One size domain over every series.
    #[default]
    Shared,
    /// Each series maps its own size extent onto the size range.
    PerSeries,
}

/// Scatter plot configuration.
pub struct ScatterConfig<D> {
    /// Transition duration in milliseconds.
    pub duration: f64,
    /// Event callbacks, keyed by selector.
    pub events: Events<ScatterPoint<D>>,
    /// Injected attributes, keyed by selector.
    pub attributes: Attributes<ScatterPoint<D>>,
    /// Point identity. Defaults to the record index.
    pub id: Option<Accessor<D, String>>,
    /// X value.
    pub x: Accessor<D, f64>,
    /// Y value; one series per entry.
    pub y: SeriesAccessor<D, f64>,
    /// Fill color. Falls back to the series' palette color.
    pub color: Option<SeriesAccessor<D, Color>>,
    /// Point size, in pixels when `size_range` is unset.
    pub size: SeriesAccessor<D, f64>,
    /// Template for the size scale; its domain and range are replaced.
    pub size_scale: ScaleContinuous,
    /// Pixel range of the size scale. Unset or `(0, 0)` uses raw size values.
    pub size_range: Option<(f64, f64)>,
    /// Shared or per-series size domain.
    pub size_domain: SizeDomain,
    /// Stroke color. No stroke when unset.
    pub stroke_color: Option<SeriesAccessor<D, Color>>,
    /// Stroke width in pixels.
    pub stroke_width: SeriesAccessor<D, f64>,
    /// Point glyph.
    pub shape: SeriesAccessor<D, Symbol>,
    /// Label text. No labels when unset.
    pub label: Option<SeriesAccessor<D, String>>,
    /// Label color. Falls back to a neutral text color.
    pub label_color: Option<SeriesAccessor<D, Color>>,
    /// Label position relative to the point.
    pub label_position: Accessor<D, Position>,
    /// Label font size in pixels.
    pub label_font_size: f64,
    /// Hide labels that overlap an already visible label.
    pub label_hide_overlapping: bool,
    /// Pointer cursor over points.
    pub cursor: Option<SeriesAccessor<D, String>>,
}

impl<D> Default for ScatterConfig<D> {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            events: Events::new(),
            attributes: Attributes::new(),
            id: None,
            x: Accessor::field("x"),
            y: SeriesAccessor::Single(Accessor::field("y")),
            color: None,
            size: SeriesAccessor::Single(Accessor::constant(10.0)),
            size_scale: ScaleContinuous::sqrt(),
            size_range: None,
            size_domain: SizeDomain::Shared,
            stroke_color: None,
            stroke_width: SeriesAccessor::Single(Accessor::constant(1.0)),
            shape: SeriesAccessor::Single(Accessor::constant(Symbol::Circle)),
            label: None,
            label_color: None,
            label_position: Accessor::constant(Position::Bottom),
            label_font_size: 12.0,
            label_hide_overlapping: true,
            cursor: None,
        }
    }
}

impl<D> Clone for ScatterConfig<D> {
    fn clone(&self) -> Self {
        Self {
            duration: self.duration,
            events: self.events.clone(),
            attributes: self.attributes.clone(),
            id: self.id.clone(),
            x: self.x.clone(),
            y: self.y.clone(),
            color: self.color.clone(),
            size: self.size.clone(),
            size_scale: self.size_scale,
            size_range: self.size_range,
            size_domain: self.size_domain,
            stroke_color: self.stroke_color.clone(),
            stroke_width: self.stroke_width.clone(),
            shape: self.shape.clone(),
            label: self.label.clone(),
            label_color: self.label_color.clone(),
            label_position: self.label_position.clone(),
            label_font_size: self.label_font_size,
            label_hide_overlapping: self.label_hide_overlapping,
            cursor: self.cursor.clone(),
        }
    }
}

impl<D> fmt::Debug for ScatterConfig<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScatterConfig")
            .field("duration", &self.duration)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("size", &self.size)
            .field("size_range", &self.size_range)
            .field("size_domain", &self.size_domain)
            .field("label", &self.label.is_some())
            .field("label_hide_overlapping", &self.label_hide_overlapping)
            .finish_non_exhaustive()
    }
}

impl<D> ScatterConfig<D> {
    /// Sets the transition duration.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the event table.
    pub fn with_events(mut self, events: Events<ScatterPoint<D>>) -> Self {
        self.events = events;
        self
    }

    /// Sets the attribute table.
    pub fn with_attributes(mut self, attributes: Attributes<ScatterPoint<D>>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Sets the identity accessor.
    pub fn with_id(mut self, id: Accessor<D, String>) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the x accessor.
    pub fn with_x(mut self, x: Accessor<D, f64>) -> Self {
        self.x = x;
        self
    }

    /// Sets the y accessor(s).
    pub fn with_y(mut self, y: impl Into<SeriesAccessor<D, f64>>) -> Self {
        self.y = y.into();
        self
    }

    /// Sets the fill color accessor(s).
    pub fn with_color(mut self, color: impl Into<SeriesAccessor<D, Color>>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Sets the size accessor(s).
    pub fn with_size(mut self, size: impl Into<SeriesAccessor<D, f64>>) -> Self {
        self.size = size.into();
        self
    }

    /// Sets the size scale template.
    pub fn with_size_scale(mut self, scale: ScaleContinuous) -> Self {
        self.size_scale = scale;
        self
    }

    /// Sets the pixel range of the size scale.
    pub fn with_size_range(mut self, range: (f64, f64)) -> Self {
        self.size_range = Some(range);
        self
    }

    /// Chooses a shared or per-series size domain.
    pub fn with_size_domain(mut self, size_domain: SizeDomain) -> Self {
        self.size_domain = size_domain;
        self
    }

    /// Sets stroke color and width.
    pub fn with_stroke(
        mut self,
        color: impl Into<SeriesAccessor<D, Color>>,
        width: impl Into<SeriesAccessor<D, f64>>,
    ) -> Self {
        self.stroke_color = Some(color.into());
        self.stroke_width = width.into();
        self
    }

    /// Sets the glyph accessor(s).
    pub fn with_shape(mut self, shape: impl Into<SeriesAccessor<D, Symbol>>) -> Self {
        self.shape = shape.into();
        self
    }

    /// Sets the label accessor(s).
    pub fn with_label(mut self, label: impl Into<SeriesAccessor<D, String>>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the label color accessor(s).
    pub fn with_label_color(mut self, color: impl Into<SeriesAccessor<D, Color>>) -> Self {
        self.label_color = Some(color.into());
        self
    }

    /// Sets the label position accessor.
    pub fn with_label_position(mut self, position: Accessor<D, Position>) -> Self {
        self.label_position = position;
        self
    }

    /// Sets the label font size.
    pub fn with_label_font_size(mut self, font_size: f64) -> Self {
        self.label_font_size = font_size;
        self
    }

    /// Enables or disables hiding of overlapping labels.
    pub fn with_label_hide_overlapping(mut self, hide: bool) -> Self {
        self.label_hide_overlapping = hide;
        self
    }

    /// Sets the cursor accessor(s).
    pub fn with_cursor(mut self, cursor: impl Into<SeriesAccessor<D, String>>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Lists the options that differ between `self` and `next`.
    ///
    /// Event and attribute tables are not compared.
    pub fn diff(&self, next: &Self) -> SmallVec<[ScatterOption; 8]> {
        let mut out = SmallVec::new();
        let mut note = |changed: bool, option: ScatterOption| {
            if changed {
                out.push(option);
            }
        };
        note(self.duration != next.duration, ScatterOption::Duration);
        note(
            !same_id(self.id.as_ref(), next.id.as_ref()),
            ScatterOption::Id,
        );
        note(!self.x.same_as(&next.x), ScatterOption::X);
        note(!self.y.same_as(&next.y), ScatterOption::Y);
        note(
            !same_optional(self.color.as_ref(), next.color.as_ref()),
            ScatterOption::Color,
        );
        note(!self.size.same_as(&next.size), ScatterOption::Size);
        note(self.size_scale != next.size_scale, ScatterOption::SizeScale);
        note(self.size_range != next.size_range, ScatterOption::SizeRange);
        note(self.size_domain != next.size_domain, ScatterOption::SizeDomain);
        note(
            !same_optional(self.stroke_color.as_ref(), next.stroke_color.as_ref())
                || !self.stroke_width.same_as(&next.stroke_width),
            ScatterOption::Stroke,
        );
        note(!self.shape.same_as(&next.shape), ScatterOption::Shape);
        note(
            !same_optional(self.label.as_ref(), next.label.as_ref())
                || !same_optional(self.label_color.as_ref(), next.label_color.as_ref())
                || !self.label_position.same_as(&next.label_position)
                || self.label_font_size != next.label_font_size,
            ScatterOption::Label,
        );
        note(
            self.label_hide_overlapping != next.label_hide_overlapping,
            ScatterOption::LabelHideOverlapping,
        );
        note(
            !same_optional(self.cursor.as_ref(), next.cursor.as_ref()),
            ScatterOption::Cursor,
        );
        out
    }
}

fn same_id<D>(a: Option<&Accessor<D, String>>, b: Option<&Accessor<D, String>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same_as(b),
        _ => false,
    }
}

/// Names of scatter options, as reported by [`ScatterConfig::diff`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScatterOption {
    /// `duration`
    Duration,
    /// `id`
    Id,
    /// `x`
    X,
    /// `y`
    Y,
    /// `color`
    Color,
    /// `size`
    Size,
    /// `size_scale`
    SizeScale,
    /// `size_range`
    SizeRange,
    /// `size_domain`
    SizeDomain,
    /// `stroke_color` or `stroke_width`
    Stroke,
    /// `shape`
    Shape,
    /// Any label text, color, position or font size option.
    Label,
    /// `label_hide_overlapping`
    LabelHideOverlapping,
    /// `cursor`
    Cursor,
}

impl ScatterOption {
    /// Returns `true` if the size scale must be recomputed when this option changes.
    pub fn affects_size_scale(self) -> bool {
        matches!(
            self,
            Self::Y | Self::Size | Self::SizeScale | Self::SizeRange | Self::SizeDomain
        )
    }
}
