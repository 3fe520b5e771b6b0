// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Treemap configuration.

extern crate alloc;

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use peniko::Color;
use quilt_core::{Attributes, Events};
use smallvec::SmallVec;

use crate::accessor::Accessor;
use crate::component::DEFAULT_DURATION;
use crate::treemap::TreemapNode;

/// Formats tile values for labels.
pub type NumberFormat = Rc<dyn Fn(f64) -> String>;

/// Treemap configuration.
pub struct TreemapConfig<D> {
    /// Transition duration in milliseconds.
    pub duration: f64,
    /// Event callbacks, keyed by selector.
    pub events: Events<TreemapNode<D>>,
    /// Injected attributes, keyed by selector.
    pub attributes: Attributes<TreemapNode<D>>,
    /// Leaf identity. Defaults to the record index.
    pub id: Option<Accessor<D, String>>,
    /// Leaf value.
    pub value: Accessor<D, f64>,
    /// One grouping level per accessor, outermost first.
    pub layers: Vec<Accessor<D, String>>,
    /// Appends the formatted value to leaf labels.
    pub number_format: Option<NumberFormat>,
    /// Tile color. Falls back to the top-level group's palette color.
    pub tile_color: Option<Accessor<TreemapNode<D>, Color>>,
    /// Padding between sibling tiles and around children.
    pub tile_padding: f64,
    /// Padding above the children of internal nodes; `tile_padding` when unset.
    pub tile_padding_top: Option<f64>,
    /// Also label internal nodes.
    pub label_internal_nodes: bool,
    /// Horizontal label offset from the tile's left edge.
    pub label_offset_x: f64,
    /// Vertical label offset from the tile's top edge.
    pub label_offset_y: f64,
    /// Tile corner radius.
    pub tile_border_radius: f64,
    /// Vary the lightness of sibling leaf tiles by value.
    pub enable_lightness_variance: bool,
    /// Scale leaf label font size with value.
    pub enable_font_size_variation: bool,
    /// Smallest leaf label font size when font size variation is on.
    pub label_min_font_size: f64,
    /// Largest leaf label font size when font size variation is on.
    pub label_max_font_size: f64,
}

impl<D> Default for TreemapConfig<D> {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            events: Events::new(),
            attributes: Attributes::new(),
            id: None,
            value: Accessor::field("value"),
            layers: Vec::new(),
            number_format: None,
            tile_color: None,
            tile_padding: 2.0,
            tile_padding_top: None,
            label_internal_nodes: false,
            label_offset_x: 4.0,
            label_offset_y: 4.0,
            tile_border_radius: 2.0,
            enable_lightness_variance: false,
            enable_font_size_variation: false,
            label_min_font_size: 8.0,
            label_max_font_size: 32.0,
        }
    }
}

impl<D> Clone for TreemapConfig<D> {
    fn clone(&self) -> Self {
        Self {
            duration: self.duration,
            events: self.events.clone(),
            attributes: self.attributes.clone(),
            id: self.id.clone(),
            value: self.value.clone(),
            layers: self.layers.clone(),
            number_format: self.number_format.clone(),
            tile_color: self.tile_color.clone(),
            tile_padding: self.tile_padding,
            tile_padding_top: self.tile_padding_top,
            label_internal_nodes: self.label_internal_nodes,
            label_offset_x: self.label_offset_x,
            label_offset_y: self.label_offset_y,
            tile_border_radius: self.tile_border_radius,
            enable_lightness_variance: self.enable_lightness_variance,
            enable_font_size_variation: self.enable_font_size_variation,
            label_min_font_size: self.label_min_font_size,
            label_max_font_size: self.label_max_font_size,
        }
    }
}

impl<D> fmt::Debug for TreemapConfig<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreemapConfig")
            .field("duration", &self.duration)
            .field("value", &self.value)
            .field("layers", &self.layers.len())
            .field("tile_padding", &self.tile_padding)
            .field("tile_padding_top", &self.tile_padding_top)
            .field("label_internal_nodes", &self.label_internal_nodes)
            .finish_non_exhaustive()
    }
}

impl<D> TreemapConfig<D> {
    /// Sets the transition duration.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the event table.
    pub fn with_events(mut self, events: Events<TreemapNode<D>>) -> Self {
        self.events = events;
        self
    }

    /// Sets the attribute table.
    pub fn with_attributes(mut self, attributes: Attributes<TreemapNode<D>>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Sets the leaf identity accessor.
    pub fn with_id(mut self, id: Accessor<D, String>) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the value accessor.
    pub fn with_value(mut self, value: Accessor<D, f64>) -> Self {
        self.value = value;
        self
    }

    /// Sets the grouping layers.
    pub fn with_layers(mut self, layers: Vec<Accessor<D, String>>) -> Self {
        self.layers = layers;
        self
    }

    /// Sets the value formatter.
    pub fn with_number_format(mut self, format: impl Fn(f64) -> String + 'static) -> Self {
        self.number_format = Some(Rc::new(format));
        self
    }

    /// Sets the tile color accessor.
    pub fn with_tile_color(mut self, color: Accessor<TreemapNode<D>, Color>) -> Self {
        self.tile_color = Some(color);
        self
    }

    /// Sets the sibling padding.
    pub fn with_tile_padding(mut self, padding: f64) -> Self {
        self.tile_padding = padding;
        self
    }

    /// Sets the padding above the children of internal nodes.
    pub fn with_tile_padding_top(mut self, padding: f64) -> Self {
        self.tile_padding_top = Some(padding);
        self
    }

    /// Labels internal nodes too.
    pub fn with_label_internal_nodes(mut self, enabled: bool) -> Self {
        self.label_internal_nodes = enabled;
        self
    }

    /// Sets the label offsets.
    pub fn with_label_offset(mut self, x: f64, y: f64) -> Self {
        self.label_offset_x = x;
        self.label_offset_y = y;
        self
    }

    /// Sets the tile corner radius.
    pub fn with_tile_border_radius(mut self, radius: f64) -> Self {
        self.tile_border_radius = radius;
        self
    }

    /// Enables lightness variance among sibling leaves.
    pub fn with_lightness_variance(mut self, enabled: bool) -> Self {
        self.enable_lightness_variance = enabled;
        self
    }

    /// Enables value-based leaf label font sizes between `min` and `max`.
    pub fn with_font_size_variation(mut self, min: f64, max: f64) -> Self {
        self.enable_font_size_variation = true;
        self.label_min_font_size = min;
        self.label_max_font_size = max;
        self
    }

    /// Lists the options that differ between `self` and `next`.
    ///
    /// Event and attribute tables are not compared.
    pub fn diff(&self, next: &Self) -> SmallVec<[TreemapOption; 8]> {
        let mut out = SmallVec::new();
        let mut note = |changed: bool, option: TreemapOption| {
            if changed {
                out.push(option);
            }
        };
        note(self.duration != next.duration, TreemapOption::Duration);
        note(
            match (&self.id, &next.id) {
                (None, None) => false,
                (Some(a), Some(b)) => !a.same_as(b),
                _ => true,
            },
            TreemapOption::Id,
        );
        note(!self.value.same_as(&next.value), TreemapOption::Value);
        note(
            self.layers.len() != next.layers.len()
                || self
                    .layers
                    .iter()
                    .zip(&next.layers)
                    .any(|(a, b)| !a.same_as(b)),
            TreemapOption::Layers,
        );
        note(
            match (&self.number_format, &next.number_format) {
                (None, None) => false,
                (Some(a), Some(b)) => !core::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
                _ => true,
            },
            TreemapOption::NumberFormat,
        );
        note(
            match (&self.tile_color, &next.tile_color) {
                (None, None) => false,
                (Some(a), Some(b)) => !a.same_as(b),
                _ => true,
            },
            TreemapOption::TileColor,
        );
        note(
            self.tile_padding != next.tile_padding
                || self.tile_padding_top != next.tile_padding_top,
            TreemapOption::TilePadding,
        );
        note(
            self.label_internal_nodes != next.label_internal_nodes
                || self.label_offset_x != next.label_offset_x
                || self.label_offset_y != next.label_offset_y
                || self.enable_font_size_variation != next.enable_font_size_variation
                || self.label_min_font_size != next.label_min_font_size
                || self.label_max_font_size != next.label_max_font_size,
            TreemapOption::Labels,
        );
        note(
            self.tile_border_radius != next.tile_border_radius,
            TreemapOption::TileBorderRadius,
        );
        note(
            self.enable_lightness_variance != next.enable_lightness_variance,
            TreemapOption::LightnessVariance,
        );
        out
    }
}

/// Names of treemap options, as reported by [`TreemapConfig::diff`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreemapOption {
    /// `duration`
    Duration,
    /// `id`
    Id,
    /// `value`
    Value,
    /// `layers`
    Layers,
    /// `number_format`
    NumberFormat,
    /// `tile_color`
    TileColor,
    /// `tile_padding` or `tile_padding_top`
    TilePadding,
    /// Any label placement or font size option.
    Labels,
    /// `tile_border_radius`
    TileBorderRadius,
    /// `enable_lightness_variance`
    LightnessVariance,
}

impl TreemapOption {
    /// Returns `true` if the hierarchy must be regrouped when this option changes.
    pub fn affects_hierarchy(self) -> bool {
        matches!(self, Self::Id | Self::Value | Self::Layers)
    }
}
