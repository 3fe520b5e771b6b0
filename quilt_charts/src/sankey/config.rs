// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sankey configuration.

extern crate alloc;

use alloc::string::String;
use core::fmt;

use peniko::Color;
use quilt_core::{Attributes, Events};
use smallvec::SmallVec;

use crate::accessor::Accessor;
use crate::component::DEFAULT_DURATION;
use crate::sankey::graph::{SankeyLink, SankeyNode};
use crate::sankey::layout::SankeyNodeAlign;

/// Side of the node a label sits on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SankeyLabelPosition {
    /// Left of the node, right-aligned.
    Left,
    /// Right of the node, left-aligned.
    #[default]
    Right,
}

/// Where a node's secondary label goes relative to its label.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SankeySubLabelPlacement {
    /// On the label's line, further from the node.
    #[default]
    Inline,
    /// On its own line under the label.
    Below,
}

/// How newly shown nodes and links appear.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EnterTransition {
    /// Fade in at the final position.
    #[default]
    Fade,
    /// Grow out of the nearest previously drawn ancestor.
    FromAncestor,
}

/// How hidden nodes and links disappear.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExitTransition {
    /// Fade out in place.
    #[default]
    Fade,
    /// Shrink into the parent node.
    ToAncestor,
}

/// Sankey configuration.
pub struct SankeyConfig<N, L> {
    /// Transition duration in milliseconds.
    pub duration: f64,
    /// Node event callbacks, keyed by selector.
    pub events: Events<SankeyNode<N>>,
    /// Link event callbacks, keyed by selector.
    pub link_events: Events<SankeyLink<L>>,
    /// Injected node attributes, keyed by selector.
    pub attributes: Attributes<SankeyNode<N>>,
    /// Injected link attributes, keyed by selector.
    pub link_attributes: Attributes<SankeyLink<L>>,
    /// Node id. Defaults to the record index.
    pub id: Option<Accessor<N, String>>,
    /// Id of a link's source node.
    pub link_source: Accessor<L, String>,
    /// Id of a link's target node.
    pub link_target: Accessor<L, String>,
    /// Link flow value.
    pub link_value: Accessor<L, f64>,
    /// Node fill. Defaults to the first palette color.
    pub node_color: Option<Accessor<N, Color>>,
    /// Link fill. Defaults to a translucent gray.
    pub link_color: Option<Accessor<L, Color>>,
    /// Node label text. Defaults to the node id.
    pub label: Option<Accessor<N, String>>,
    /// Label side.
    pub label_position: SankeyLabelPosition,
    /// Labels wider than this are truncated with an ellipsis.
    pub label_max_width: f64,
    /// Label font size.
    pub label_font_size: f64,
    /// Label fill.
    pub label_color: Color,
    /// Widen labels to the free space before the neighboring column when it exceeds
    /// `label_max_width`.
    pub label_max_width_take_available_space: bool,
    /// Draw a translucent backdrop behind each node's labels.
    pub label_background: bool,
    /// Secondary label text. No secondary label when unset.
    pub sub_label: Option<Accessor<N, String>>,
    /// Secondary label font size.
    pub sub_label_font_size: f64,
    /// Secondary label placement.
    pub sub_label_placement: SankeySubLabelPlacement,
    /// Icon text, read from the laid-out node. An empty or missing value draws no icon.
    /// Collapsed nodes show `+` when unset.
    pub node_icon: Option<Accessor<SankeyNode<N>, String>>,
    /// Node rectangle width.
    pub node_width: f64,
    /// Vertical gap between nodes of a column.
    pub node_padding: f64,
    /// Smallest node height.
    pub node_min_height: f64,
    /// Column assignment.
    pub node_align: SankeyNodeAlign,
    /// Fixed distance between the left edges of adjacent columns. Columns are spread over
    /// the width when unset.
    pub node_horizontal_spacing: Option<f64>,
    /// Relaxation passes.
    pub iterations: usize,
    /// Toggle a node's subtree when it is clicked. Nodes without incoming links are never
    /// collapsed.
    pub collapse_on_click: bool,
    /// Dim everything outside the hovered node's downstream subtree.
    pub highlight_subtree_on_hover: bool,
    /// How appearing elements enter.
    pub enter_transition: EnterTransition,
    /// How disappearing elements exit.
    pub exit_transition: ExitTransition,
    /// Pointer cursor over nodes.
    pub node_cursor: Option<String>,
    /// Pointer cursor over links.
    pub link_cursor: Option<String>,
}

impl<N, L> Default for SankeyConfig<N, L> {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            events: Events::new(),
            link_events: Events::new(),
            attributes: Attributes::new(),
            link_attributes: Attributes::new(),
            id: None,
            link_source: Accessor::field("source"),
            link_target: Accessor::field("target"),
            link_value: Accessor::field("value"),
            node_color: None,
            link_color: None,
            label: None,
            label_position: SankeyLabelPosition::Right,
            label_max_width: 70.0,
            label_font_size: 12.0,
            label_color: Color::from_rgb8(0x5b, 0x5f, 0x6d),
            label_max_width_take_available_space: false,
            label_background: false,
            sub_label: None,
            sub_label_font_size: 10.0,
            sub_label_placement: SankeySubLabelPlacement::Inline,
            node_icon: None,
            node_width: 25.0,
            node_padding: 4.0,
            node_min_height: 20.0,
            node_align: SankeyNodeAlign::Justify,
            node_horizontal_spacing: None,
            iterations: 6,
            collapse_on_click: false,
            highlight_subtree_on_hover: false,
            enter_transition: EnterTransition::Fade,
            exit_transition: ExitTransition::Fade,
            node_cursor: None,
            link_cursor: None,
        }
    }
}

impl<N, L> Clone for SankeyConfig<N, L> {
    fn clone(&self) -> Self {
        Self {
            duration: self.duration,
            events: self.events.clone(),
            link_events: self.link_events.clone(),
            attributes: self.attributes.clone(),
            link_attributes: self.link_attributes.clone(),
            id: self.id.clone(),
            link_source: self.link_source.clone(),
            link_target: self.link_target.clone(),
            link_value: self.link_value.clone(),
            node_color: self.node_color.clone(),
            link_color: self.link_color.clone(),
            label: self.label.clone(),
            label_position: self.label_position,
            label_max_width: self.label_max_width,
            label_font_size: self.label_font_size,
            label_color: self.label_color,
            label_max_width_take_available_space: self.label_max_width_take_available_space,
            label_background: self.label_background,
            sub_label: self.sub_label.clone(),
            sub_label_font_size: self.sub_label_font_size,
            sub_label_placement: self.sub_label_placement,
            node_icon: self.node_icon.clone(),
            node_width: self.node_width,
            node_padding: self.node_padding,
            node_min_height: self.node_min_height,
            node_align: self.node_align,
            node_horizontal_spacing: self.node_horizontal_spacing,
            iterations: self.iterations,
            collapse_on_click: self.collapse_on_click,
            highlight_subtree_on_hover: self.highlight_subtree_on_hover,
            enter_transition: self.enter_transition,
            exit_transition: self.exit_transition,
            node_cursor: self.node_cursor.clone(),
            link_cursor: self.link_cursor.clone(),
        }
    }
}

impl<N, L> fmt::Debug for SankeyConfig<N, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SankeyConfig")
            .field("duration", &self.duration)
            .field("node_width", &self.node_width)
            .field("node_padding", &self.node_padding)
            .field("node_min_height", &self.node_min_height)
            .field("node_align", &self.node_align)
            .field("node_horizontal_spacing", &self.node_horizontal_spacing)
            .field("iterations", &self.iterations)
            .field("label_position", &self.label_position)
            .field("sub_label_placement", &self.sub_label_placement)
            .field("highlight_subtree_on_hover", &self.highlight_subtree_on_hover)
            .finish_non_exhaustive()
    }
}

impl<N, L> SankeyConfig<N, L> {
    /// Sets the transition duration.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the node event table.
    pub fn with_events(mut self, events: Events<SankeyNode<N>>) -> Self {
        self.events = events;
        self
    }

    /// Sets the link event table.
    pub fn with_link_events(mut self, events: Events<SankeyLink<L>>) -> Self {
        self.link_events = events;
        self
    }

    /// Sets the node attribute table.
    pub fn with_attributes(mut self, attributes: Attributes<SankeyNode<N>>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Sets the link attribute table.
    pub fn with_link_attributes(mut self, attributes: Attributes<SankeyLink<L>>) -> Self {
        self.link_attributes = attributes;
        self
    }

    /// Sets the node id accessor.
    pub fn with_id(mut self, id: Accessor<N, String>) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the link endpoint accessors.
    pub fn with_link_endpoints(
        mut self,
        source: Accessor<L, String>,
        target: Accessor<L, String>,
    ) -> Self {
        self.link_source = source;
        self.link_target = target;
        self
    }

    /// Sets the link value accessor.
    pub fn with_link_value(mut self, value: Accessor<L, f64>) -> Self {
        self.link_value = value;
        self
    }

    /// Sets the node color accessor.
    pub fn with_node_color(mut self, color: Accessor<N, Color>) -> Self {
        self.node_color = Some(color);
        self
    }

    /// Sets the link color accessor.
    pub fn with_link_color(mut self, color: Accessor<L, Color>) -> Self {
        self.link_color = Some(color);
        self
    }

    /// Sets the label accessor.
    pub fn with_label(mut self, label: Accessor<N, String>) -> Self {
        self.label = Some(label);
        self
    }

    /// Sets the label side.
    pub fn with_label_position(mut self, position: SankeyLabelPosition) -> Self {
        self.label_position = position;
        self
    }

    /// Sets the label truncation width.
    pub fn with_label_max_width(mut self, width: f64) -> Self {
        self.label_max_width = width;
        self
    }

    /// Sets the label font size.
    pub fn with_label_font_size(mut self, size: f64) -> Self {
        self.label_font_size = size;
        self
    }

    /// Lets labels grow into the free space before the neighboring column.
    pub fn with_label_max_width_take_available_space(mut self, enabled: bool) -> Self {
        self.label_max_width_take_available_space = enabled;
        self
    }

    /// Draws a backdrop behind node labels.
    pub fn with_label_background(mut self, enabled: bool) -> Self {
        self.label_background = enabled;
        self
    }

    /// Sets the secondary label accessor.
    pub fn with_sub_label(mut self, sub_label: Accessor<N, String>) -> Self {
        self.sub_label = Some(sub_label);
        self
    }

    /// Sets the secondary label font size.
    pub fn with_sub_label_font_size(mut self, size: f64) -> Self {
        self.sub_label_font_size = size;
        self
    }

    /// Sets the secondary label placement.
    pub fn with_sub_label_placement(mut self, placement: SankeySubLabelPlacement) -> Self {
        self.sub_label_placement = placement;
        self
    }

    /// Sets the node icon accessor.
    pub fn with_node_icon(mut self, icon: Accessor<SankeyNode<N>, String>) -> Self {
        self.node_icon = Some(icon);
        self
    }

    /// Sets the node width.
    pub fn with_node_width(mut self, width: f64) -> Self {
        self.node_width = width;
        self
    }

    /// Sets the vertical node padding.
    pub fn with_node_padding(mut self, padding: f64) -> Self {
        self.node_padding = padding;
        self
    }

    /// Sets the minimum node height.
    pub fn with_node_min_height(mut self, height: f64) -> Self {
        self.node_min_height = height;
        self
    }

    /// Sets the column alignment.
    pub fn with_node_align(mut self, align: SankeyNodeAlign) -> Self {
        self.node_align = align;
        self
    }

    /// Uses a fixed distance between columns.
    pub fn with_node_horizontal_spacing(mut self, spacing: f64) -> Self {
        self.node_horizontal_spacing = Some(spacing);
        self
    }

    /// Sets the number of relaxation passes.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Toggles subtrees on node clicks.
    pub fn with_collapse_on_click(mut self, enabled: bool) -> Self {
        self.collapse_on_click = enabled;
        self
    }

    /// Dims everything outside the hovered node's subtree.
    pub fn with_highlight_subtree_on_hover(mut self, enabled: bool) -> Self {
        self.highlight_subtree_on_hover = enabled;
        self
    }

    /// Sets the enter and exit transitions.
    pub fn with_transitions(mut self, enter: EnterTransition, exit: ExitTransition) -> Self {
        self.enter_transition = enter;
        self.exit_transition = exit;
        self
    }

    /// Sets the node and link cursors.
    pub fn with_cursors(mut self, node: Option<String>, link: Option<String>) -> Self {
        self.node_cursor = node;
        self.link_cursor = link;
        self
    }

    /// Lists the options that differ between `self` and `next`.
    ///
    /// Event and attribute tables are not compared.
    pub fn diff(&self, next: &Self) -> SmallVec<[SankeyOption; 8]> {
        fn differs<D, T: PartialEq>(a: Option<&Accessor<D, T>>, b: Option<&Accessor<D, T>>) -> bool {
            match (a, b) {
                (None, None) => false,
                (Some(a), Some(b)) => !a.same_as(b),
                _ => true,
            }
        }

        let mut out = SmallVec::new();
        let mut note = |changed: bool, option: SankeyOption| {
            if changed {
                out.push(option);
            }
        };
        note(self.duration != next.duration, SankeyOption::Duration);
        note(differs(self.id.as_ref(), next.id.as_ref()), SankeyOption::Id);
        note(
            !self.link_source.same_as(&next.link_source)
                || !self.link_target.same_as(&next.link_target)
                || !self.link_value.same_as(&next.link_value),
            SankeyOption::Links,
        );
        note(
            differs(self.node_color.as_ref(), next.node_color.as_ref())
                || differs(self.link_color.as_ref(), next.link_color.as_ref()),
            SankeyOption::Colors,
        );
        note(
            differs(self.label.as_ref(), next.label.as_ref())
                || self.label_position != next.label_position
                || self.label_max_width != next.label_max_width
                || self.label_font_size != next.label_font_size
                || self.label_color != next.label_color
                || self.label_max_width_take_available_space
                    != next.label_max_width_take_available_space
                || self.label_background != next.label_background
                || differs(self.sub_label.as_ref(), next.sub_label.as_ref())
                || self.sub_label_font_size != next.sub_label_font_size
                || self.sub_label_placement != next.sub_label_placement,
            SankeyOption::Labels,
        );
        note(
            differs(self.node_icon.as_ref(), next.node_icon.as_ref()),
            SankeyOption::NodeIcon,
        );
        note(
            self.node_width != next.node_width
                || self.node_padding != next.node_padding
                || self.node_min_height != next.node_min_height
                || self.node_align != next.node_align
                || self.node_horizontal_spacing != next.node_horizontal_spacing
                || self.iterations != next.iterations,
            SankeyOption::Geometry,
        );
        note(
            self.collapse_on_click != next.collapse_on_click,
            SankeyOption::CollapseOnClick,
        );
        note(
            self.highlight_subtree_on_hover != next.highlight_subtree_on_hover,
            SankeyOption::Highlight,
        );
        note(
            self.enter_transition != next.enter_transition
                || self.exit_transition != next.exit_transition,
            SankeyOption::Transitions,
        );
        note(
            self.node_cursor != next.node_cursor || self.link_cursor != next.link_cursor,
            SankeyOption::Cursor,
        );
        out
    }
}

/// Names of sankey options, as reported by [`SankeyConfig::diff`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SankeyOption {
    /// `duration`
    Duration,
    /// `id`
    Id,
    /// `link_source`, `link_target` or `link_value`
    Links,
    /// `node_color` or `link_color`
    Colors,
    /// Any label or secondary label option.
    Labels,
    /// `node_icon`
    NodeIcon,
    /// Node size, padding, alignment, spacing or iteration count.
    Geometry,
    /// `collapse_on_click`
    CollapseOnClick,
    /// `highlight_subtree_on_hover`
    Highlight,
    /// `enter_transition` or `exit_transition`
    Transitions,
    /// `node_cursor` or `link_cursor`
    Cursor,
}

impl SankeyOption {
    /// Returns `true` if the node-link graph must be rebuilt when this option changes.
    pub fn affects_graph(self) -> bool {
        matches!(self, Self::Id | Self::Links)
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeMap;

    use super::*;

    type Rec = BTreeMap<String, String>;

    #[test]
    fn geometry_changes_keep_the_graph() {
        let a = SankeyConfig::<Rec, Rec>::default();
        let b = a.clone().with_node_width(30.0).with_node_padding(10.0);
        assert_eq!(a.diff(&b).as_slice(), [SankeyOption::Geometry]);
        assert!(!a.diff(&b).iter().any(|o| o.affects_graph()));
        let c = a.clone().with_link_value(Accessor::field("flow"));
        assert!(a.diff(&c).iter().any(|o| o.affects_graph()));
    }

    #[test]
    fn label_extras_and_icons_are_reported() {
        let a = SankeyConfig::<Rec, Rec>::default();
        let b = a
            .clone()
            .with_sub_label(Accessor::field("unit"))
            .with_label_background(true)
            .with_node_icon(Accessor::constant(String::from("*")))
            .with_highlight_subtree_on_hover(true);
        assert_eq!(
            a.diff(&b).as_slice(),
            [
                SankeyOption::Labels,
                SankeyOption::NodeIcon,
                SankeyOption::Highlight
            ]
        );
        assert!(!a.diff(&b).iter().any(|o| o.affects_graph()));
    }
}
