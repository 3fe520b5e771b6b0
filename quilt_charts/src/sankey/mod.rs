// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sankey diagram component.
//!
//! The visible node-link graph is rebuilt from the raw records whenever the data, the
//! collapsed set or the graph accessors change, and laid out on every render. A layout scale
//! and translation map layout coordinates to the drawing area, which lets hosts zoom and pan
//! without touching the layout.

extern crate alloc;

mod config;
mod graph;
mod layout;

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use kurbo::{BezPath, Point, Rect, Vec2};
use peniko::{Brush, Color};
use quilt_core::{
    ElementPhase, ElementTree, EventType, FrameClock, Mark, MarkId, MarkPayload, PathPayload,
    PointerEvent, RectPayload, TextAnchor, TextBaseline, TextPayload,
};
use tracing::{debug, trace, warn};

pub use config::{
    EnterTransition, ExitTransition, SankeyConfig, SankeyLabelPosition, SankeyOption,
    SankeySubLabelPlacement,
};
pub use graph::{NodeIcon, SankeyData, SankeyError, SankeyLink, SankeyNode};
pub use layout::SankeyNodeAlign;

use crate::component::{Component, ComponentCore};
use crate::data_model::DataModel;
use crate::label::{LABEL_GAP, label_bounds, truncate_to_width};
use crate::layout::Size;
use crate::measure::{HeuristicTextMeasurer, TextMeasurer};
use crate::record::Record;
use crate::{color, z_order};

use graph::{Graph, GraphAccessors, link_mark_id};
use layout::LayoutParams;

/// Selectors of the elements a sankey diagram generates.
pub mod selectors {
    use quilt_core::Selector;

    /// Node rectangles.
    pub const NODE: Selector = "node";
    /// Node labels.
    pub const NODE_LABEL: Selector = "node-label";
    /// Secondary node labels.
    pub const NODE_SUB_LABEL: Selector = "node-sub-label";
    /// Backdrops behind node labels.
    pub const NODE_LABEL_BACKGROUND: Selector = "node-label-background";
    /// Expand/collapse icons.
    pub const NODE_ICON: Selector = "node-icon";
    /// Link bands.
    pub const LINK: Selector = "link";
}

const LABEL_TAG: u64 = 1;
const ICON_TAG: u64 = 2;
const SUB_LABEL_TAG: u64 = 3;
const LABEL_BACKGROUND_TAG: u64 = 4;
const COLLAPSED_ICON: &str = "+";
const DEFAULT_LINK_COLOR: Color = Color::from_rgb8(0x90, 0xa4, 0xc8);
const LINK_OPACITY: f64 = 0.5;
const LABEL_BACKGROUND_COLOR: Color = Color::from_rgba8(0xff, 0xff, 0xff, 0xbf);
const LABEL_BACKGROUND_PADDING: f64 = 2.0;
const DIMMED_OPACITY: f64 = 0.2;

/// The node or link behind an element.
#[derive(Debug)]
pub enum SankeyItem<'a, N, L> {
    /// A node, its label or its icon.
    Node(&'a SankeyNode<N>),
    /// A link band.
    Link(&'a SankeyLink<L>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ItemRef {
    Node(usize),
    Link(usize),
}

/// A sankey diagram.
pub struct Sankey<N, L> {
    config: SankeyConfig<N, L>,
    nodes: DataModel<N>,
    links: DataModel<L>,
    core: ComponentCore,
    collapsed: HashSet<String>,
    graph: Graph<N, L>,
    graph_dirty: bool,
    error: Option<SankeyError>,
    layout_scale: (f64, f64),
    translation: Vec2,
    index: HashMap<MarkId, ItemRef>,
    // Id of the node whose subtree is highlighted.
    highlighted: Option<String>,
    measurer: HeuristicTextMeasurer,
}

impl<N, L> core::fmt::Debug for Sankey<N, L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sankey")
            .field("config", &self.config)
            .field("nodes", &self.graph.nodes.len())
            .field("links", &self.graph.links.len())
            .field("collapsed", &self.collapsed)
            .field("layout_scale", &self.layout_scale)
            .field("translation", &self.translation)
            .finish_non_exhaustive()
    }
}

impl<N: Record, L: Record> Sankey<N, L> {
    /// Creates a sankey diagram without data.
    pub fn new(config: SankeyConfig<N, L>) -> Self {
        Self {
            config,
            nodes: DataModel::new(),
            links: DataModel::new(),
            core: ComponentCore::new(),
            collapsed: HashSet::new(),
            graph: Graph::default(),
            graph_dirty: true,
            error: None,
            layout_scale: (1.0, 1.0),
            translation: Vec2::ZERO,
            index: HashMap::new(),
            highlighted: None,
            measurer: HeuristicTextMeasurer,
        }
    }

    /// The current configuration.
    pub fn config(&self) -> &SankeyConfig<N, L> {
        &self.config
    }

    /// Replaces the configuration. Takes effect on the next render.
    pub fn set_config(&mut self, config: SankeyConfig<N, L>) {
        let changed = self.config.diff(&config);
        debug!(changed = ?changed.as_slice(), "sankey config replaced");
        self.config = config;
        if changed.iter().any(|o| o.affects_graph()) {
            self.graph_dirty = true;
        }
    }

    /// Replaces the nodes and links. Takes effect on the next render.
    pub fn set_data(&mut self, data: SankeyData<N, L>) {
        debug!(
            nodes = data.nodes.len(),
            links = data.links.len(),
            "sankey data replaced"
        );
        self.nodes.set_data(data.nodes);
        self.links.set_data(data.links);
        self.graph_dirty = true;
    }

    /// Visible nodes of the last layout, in layout coordinates.
    pub fn nodes(&self) -> &[SankeyNode<N>] {
        &self.graph.nodes
    }

    /// Visible links of the last layout, in layout coordinates.
    pub fn links(&self) -> &[SankeyLink<L>] {
        &self.graph.links
    }

    /// The visible node with id `id`.
    pub fn node_by_id(&self, id: &str) -> Option<&SankeyNode<N>> {
        self.graph.nodes.iter().find(|n| n.id == id)
    }

    /// The node or link behind an element of the last render.
    pub fn item(&self, id: MarkId) -> Option<SankeyItem<'_, N, L>> {
        match *self.index.get(&id)? {
            ItemRef::Node(i) => self.graph.nodes.get(i).map(SankeyItem::Node),
            ItemRef::Link(k) => self.graph.links.get(k).map(SankeyItem::Link),
        }
    }

    /// The structural error that emptied the last render, if any.
    pub fn error(&self) -> Option<&SankeyError> {
        self.error.as_ref()
    }

    /// Returns `true` if the subtree below node `id` is hidden.
    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapsed.contains(id)
    }

    /// Hides or shows the subtree below node `id`. Takes effect on the next render.
    pub fn set_collapsed(&mut self, id: &str, collapsed: bool) {
        let changed = if collapsed {
            self.collapsed.insert(id.into())
        } else {
            self.collapsed.remove(id)
        };
        if changed {
            debug!(id, collapsed, "sankey node toggled");
            self.graph_dirty = true;
        }
    }

    /// Flips the collapsed state of node `id` and returns the new state.
    pub fn toggle_collapsed(&mut self, id: &str) -> bool {
        let collapsed = !self.is_collapsed(id);
        self.set_collapsed(id, collapsed);
        collapsed
    }

    /// Horizontal and vertical layout scale factors.
    pub fn layout_scale(&self) -> (f64, f64) {
        self.layout_scale
    }

    /// Sets the layout scale factors and re-renders.
    ///
    /// Non-positive or non-finite factors are ignored.
    pub fn set_layout_scale(&mut self, horizontal: f64, vertical: f64) {
        if !valid_scale(horizontal) || !valid_scale(vertical) {
            warn!(horizontal, vertical, "ignoring invalid sankey layout scale");
            return;
        }
        self.layout_scale = (horizontal, vertical);
        self.render(None);
    }

    /// Offset applied after scaling.
    pub fn layout_translation(&self) -> Vec2 {
        self.translation
    }

    /// Sets the offset applied after scaling and re-renders.
    pub fn set_layout_translation(&mut self, translation: Vec2) {
        self.translation = translation;
        self.render(None);
    }

    /// Picks the scale and translation that fit every node into the drawing area, then
    /// re-renders with `duration`.
    pub fn fit_view(&mut self, duration: f64) {
        if let Err(err) = self.relayout() {
            warn!(%err, "sankey layout failed");
            return;
        }
        let Some(bounds) = self
            .graph
            .nodes
            .iter()
            .map(|n| Rect::new(n.x0, n.y0, n.x1, n.y1))
            .reduce(|a, b| a.union(b))
        else {
            return;
        };
        let size = self.core.size();
        let node_width = self.config.node_width;
        // Node widths do not scale, so only the span of left edges is fitted.
        let span_x = bounds.width() - node_width;
        let sx = if span_x > 0.0 {
            (size.width - node_width) / span_x
        } else {
            1.0
        };
        let sy = if bounds.height() > 0.0 {
            size.height / bounds.height()
        } else {
            1.0
        };
        let sx = if valid_scale(sx) { sx } else { 1.0 };
        let sy = if valid_scale(sy) { sy } else { 1.0 };
        self.layout_scale = (sx, sy);
        self.translation = Vec2::new(-bounds.x0 * sx, -bounds.y0 * sy);
        debug!(sx, sy, "sankey view fitted");
        self.render(Some(duration));
    }

    /// The drawn rectangle of `node`.
    pub fn node_rect(&self, node: &SankeyNode<N>) -> Rect {
        let (sx, _) = self.layout_scale;
        let x0 = node.x0 * sx + self.translation.x;
        Rect::new(
            x0,
            self.display_y(node.y0),
            x0 + (node.x1 - node.x0),
            self.display_y(node.y1),
        )
    }

    fn display_y(&self, y: f64) -> f64 {
        y * self.layout_scale.1 + self.translation.y
    }

    fn relayout(&mut self) -> Result<(), SankeyError> {
        if self.graph_dirty {
            let cfg = &self.config;
            let acc = GraphAccessors {
                id: cfg.id.as_ref(),
                source: &cfg.link_source,
                target: &cfg.link_target,
                value: &cfg.link_value,
            };
            // A failed rebuild leaves no stale graph behind.
            self.graph = Graph::default();
            self.graph = graph::build(self.nodes.data(), self.links.data(), &acc, &self.collapsed)?;
            self.graph_dirty = false;
            debug!(
                nodes = self.graph.nodes.len(),
                links = self.graph.links.len(),
                collapsed = self.collapsed.len(),
                "sankey graph rebuilt"
            );
        }
        let size = self.core.size();
        let params = LayoutParams {
            extent: Rect::new(0.0, 0.0, size.width, size.height),
            node_width: self.config.node_width.max(0.0),
            node_padding: self.config.node_padding.max(0.0),
            node_min_height: self.config.node_min_height.max(0.0),
            align: self.config.node_align,
            horizontal_spacing: self.config.node_horizontal_spacing,
            iterations: self.config.iterations,
        };
        layout::layout(&mut self.graph, &params)
    }

    fn resolve_styles(&mut self) {
        let cfg = &self.config;
        for node in &mut self.graph.nodes {
            node.color = cfg
                .node_color
                .as_ref()
                .and_then(|a| a.resolve(&node.datum, node.index))
                .unwrap_or_else(|| color::palette_color(0));
            node.label = cfg
                .label
                .as_ref()
                .map_or_else(|| Some(node.id.clone()), |a| a.resolve(&node.datum, node.index))
                .filter(|s| !s.is_empty());
            node.sub_label = cfg
                .sub_label
                .as_ref()
                .and_then(|a| a.resolve(&node.datum, node.index))
                .filter(|s| !s.is_empty());
            let icon = match &cfg.node_icon {
                Some(a) => a.resolve(node, node.index),
                None => (node.icon == NodeIcon::Collapsed).then(|| COLLAPSED_ICON.into()),
            };
            node.icon_text = icon.filter(|s| !s.is_empty());
        }
        for link in &mut self.graph.links {
            link.color = cfg
                .link_color
                .as_ref()
                .and_then(|a| a.resolve(&link.datum, link.index))
                .unwrap_or_else(|| color::with_opacity(DEFAULT_LINK_COLOR, LINK_OPACITY));
        }
    }

    fn link_ids(&self) -> Vec<MarkId> {
        let mut seen: HashMap<(usize, usize), usize> = HashMap::new();
        self.graph
            .links
            .iter()
            .map(|l| {
                let ordinal = seen.entry((l.source, l.target)).or_insert(0);
                let id = link_mark_id(
                    &self.graph.nodes[l.source].id,
                    &self.graph.nodes[l.target].id,
                    *ordinal,
                );
                *ordinal += 1;
                id
            })
            .collect()
    }

    /// The previously drawn rectangle of `node` or, failing that, of its nearest drawn
    /// ancestor along first incoming links.
    fn previous_anchor(&self, mut node: usize) -> Option<Rect> {
        for _ in 0..=self.graph.nodes.len() {
            let n = &self.graph.nodes[node];
            if let Some(MarkPayload::Rect(r)) = self.core.mark(n.mark_id()).map(|m| &m.payload) {
                return Some(r.rect);
            }
            node = self.graph.links[*n.target_links.first()?].source;
        }
        None
    }

    /// Horizontal extent of each column's nodes, as drawn.
    fn column_spans(&self, rects: &[Rect]) -> Vec<Option<(f64, f64)>> {
        let count = self.graph.nodes.iter().map(|n| n.layer + 1).max().unwrap_or(0);
        let mut spans: Vec<Option<(f64, f64)>> = vec![None; count];
        for (node, r) in self.graph.nodes.iter().zip(rects) {
            let span = &mut spans[node.layer];
            *span = Some(span.map_or((r.x0, r.x1), |(a, b)| (a.min(r.x0), b.max(r.x1))));
        }
        spans
    }

    /// Truncation width for the labels of a node in column `layer` drawn at `r`.
    fn label_width(&self, layer: usize, r: Rect, spans: &[Option<(f64, f64)>]) -> f64 {
        let cfg = &self.config;
        if !cfg.label_max_width_take_available_space {
            return cfg.label_max_width;
        }
        let free = match cfg.label_position {
            SankeyLabelPosition::Right => spans
                .iter()
                .skip(layer + 1)
                .flatten()
                .next()
                .map(|s| s.0 - r.x1),
            SankeyLabelPosition::Left => spans[..layer.min(spans.len())]
                .iter()
                .rev()
                .flatten()
                .next()
                .map(|s| r.x0 - s.1),
        };
        free.map_or(cfg.label_max_width, |f| (f - 2.0 * LABEL_GAP).max(cfg.label_max_width))
    }

    /// Label, secondary label and backdrop marks for node `i`.
    fn label_marks(&self, i: usize, r: Rect, max_width: f64, marks: &mut Vec<Mark>) {
        let cfg = &self.config;
        let node = &self.graph.nodes[i];
        let Some(text) = &node.label else {
            return;
        };
        let id = node.mark_id();
        let (x, anchor, away) = match cfg.label_position {
            SankeyLabelPosition::Right => (r.x1 + LABEL_GAP, TextAnchor::Start, 1.0),
            SankeyLabelPosition::Left => (r.x0 - LABEL_GAP, TextAnchor::End, -1.0),
        };
        let text = truncate_to_width(text, cfg.label_font_size, max_width, &self.measurer);
        let label_width = self.measurer.measure(&text, cfg.label_font_size).0;
        let cy = r.center().y;

        let sub = node.sub_label.as_ref().map(|sub| match cfg.sub_label_placement {
            SankeySubLabelPlacement::Inline => {
                let room = (max_width - label_width - LABEL_GAP).max(f64::MIN_POSITIVE);
                let text = truncate_to_width(sub, cfg.sub_label_font_size, room, &self.measurer);
                (Point::new(x + away * (label_width + LABEL_GAP), cy), text)
            }
            SankeySubLabelPlacement::Below => {
                let text =
                    truncate_to_width(sub, cfg.sub_label_font_size, max_width, &self.measurer);
                (Point::new(x, cy + cfg.label_font_size / 2.0), text)
            }
        });
        let label_y = match (&sub, cfg.sub_label_placement) {
            (Some(_), SankeySubLabelPlacement::Below) => cy - cfg.sub_label_font_size / 2.0,
            _ => cy,
        };
        let label = TextPayload {
            pos: Point::new(x, label_y),
            text,
            font_size: cfg.label_font_size,
            anchor,
            baseline: TextBaseline::Middle,
            fill: cfg.label_color.into(),
        };
        let sub = sub.map(|(pos, text)| TextPayload {
            pos,
            text,
            font_size: cfg.sub_label_font_size,
            anchor,
            baseline: TextBaseline::Middle,
            fill: cfg.label_color.into(),
        });

        if cfg.label_background {
            let bounds = |t: &TextPayload| {
                label_bounds(&t.text, t.font_size, t.pos, t.anchor, t.baseline, &self.measurer)
            };
            let mut backdrop = bounds(&label);
            if let Some(sub) = &sub {
                backdrop = backdrop.union(bounds(sub));
            }
            marks.push(
                Mark::rect(
                    id.child(LABEL_BACKGROUND_TAG),
                    selectors::NODE_LABEL_BACKGROUND,
                    RectPayload::new(
                        backdrop.inflate(LABEL_BACKGROUND_PADDING, LABEL_BACKGROUND_PADDING),
                        LABEL_BACKGROUND_COLOR,
                    ),
                )
                .with_z_index(z_order::LABEL_BACKGROUNDS)
                .with_attributes(cfg.attributes.resolve(selectors::NODE_LABEL_BACKGROUND, node)),
            );
        }
        marks.push(
            Mark::text(id.child(LABEL_TAG), selectors::NODE_LABEL, label)
                .with_z_index(z_order::LABELS)
                .with_attributes(cfg.attributes.resolve(selectors::NODE_LABEL, node)),
        );
        if let Some(sub) = sub {
            marks.push(
                Mark::text(id.child(SUB_LABEL_TAG), selectors::NODE_SUB_LABEL, sub)
                    .with_z_index(z_order::LABELS)
                    .with_attributes(cfg.attributes.resolve(selectors::NODE_SUB_LABEL, node)),
            );
        }
    }

    /// Nodes and links downstream of `root`, `root` included.
    fn subtree(&self, root: usize) -> (HashSet<usize>, HashSet<usize>) {
        let mut nodes = HashSet::new();
        let mut links = HashSet::new();
        nodes.insert(root);
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            for &k in &self.graph.nodes[n].source_links {
                links.insert(k);
                let target = self.graph.links[k].target;
                if nodes.insert(target) {
                    stack.push(target);
                }
            }
        }
        (nodes, links)
    }

    /// Dims every element outside the highlighted node's subtree, or clears the dimming
    /// when no visible node is highlighted.
    fn apply_highlight(&mut self) {
        let subtree = self
            .highlighted
            .as_deref()
            .and_then(|id| self.graph.nodes.iter().position(|n| n.id == id))
            .map(|i| self.subtree(i));
        if subtree.is_none() {
            self.highlighted = None;
        }
        let updates: Vec<(MarkId, Option<f64>)> = self
            .core
            .elements()
            .paint_order()
            .into_iter()
            .filter(|el| el.phase() != ElementPhase::Exiting)
            .filter_map(|el| {
                let item = *self.index.get(&el.id())?;
                let dimmed = subtree.as_ref().is_some_and(|(nodes, links)| match item {
                    ItemRef::Node(i) => !nodes.contains(&i),
                    ItemRef::Link(k) => !links.contains(&k),
                });
                Some((el.id(), dimmed.then_some(DIMMED_OPACITY)))
            })
            .collect();
        trace!(
            highlighted = self.highlighted.as_deref(),
            elements = updates.len(),
            "sankey highlight applied"
        );
        for (id, opacity) in updates {
            if let Err(err) = self.core.elements_mut().set_style_opacity(id, opacity) {
                trace!(%err, "highlight opacity not applied");
            }
        }
    }

    fn parent(&self, node: usize) -> Option<usize> {
        let first = *self.graph.nodes[node].target_links.first()?;
        Some(self.graph.links[first].source)
    }

    fn marks(&self) -> Vec<Mark> {
        let cfg = &self.config;
        let g = &self.graph;
        let rects: Vec<Rect> = g.nodes.iter().map(|n| self.node_rect(n)).collect();
        let spans = self.column_spans(&rects);
        let enter_from_ancestor = cfg.enter_transition == EnterTransition::FromAncestor;
        let exit_to_ancestor = cfg.exit_transition == ExitTransition::ToAncestor;
        let mut marks = Vec::with_capacity(g.nodes.len() * 5 + g.links.len());

        for (link, id) in g.links.iter().zip(self.link_ids()) {
            let (s, t) = (rects[link.source], rects[link.target]);
            let width = link.width * self.layout_scale.1;
            let payload = PathPayload {
                path: band(
                    s.x1,
                    t.x0,
                    self.display_y(link.y0),
                    self.display_y(link.y1),
                    width,
                ),
                fill: link.color.into(),
                stroke: Brush::default(),
                stroke_width: 0.0,
            };
            let collapsed_at = |r: Rect| PathPayload {
                path: band(r.x1, r.x1, r.center().y, r.center().y, 0.0),
                ..payload.clone()
            };
            let mut mark = Mark::path(id, selectors::LINK, payload.clone())
                .with_z_index(z_order::LINKS)
                .with_cursor(cfg.link_cursor.clone())
                .with_attributes(cfg.link_attributes.resolve(selectors::LINK, link));
            if enter_from_ancestor && self.core.mark(id).is_none() {
                if let Some(r) = self.previous_anchor(link.source) {
                    mark = mark.with_enter_from(MarkPayload::Path(collapsed_at(r)));
                }
            }
            if exit_to_ancestor {
                mark = mark.with_exit_to(MarkPayload::Path(collapsed_at(s)));
            }
            marks.push(mark);
        }

        for (i, node) in g.nodes.iter().enumerate() {
            let r = rects[i];
            let id = node.mark_id();
            let payload = RectPayload::new(r, node.color);
            let mut mark = Mark::rect(id, selectors::NODE, payload.clone())
                .with_z_index(z_order::NODES)
                .with_cursor(cfg.node_cursor.clone())
                .with_attributes(cfg.attributes.resolve(selectors::NODE, node));
            if enter_from_ancestor && self.core.mark(id).is_none() {
                if let Some(from) = self.parent(i).and_then(|p| self.previous_anchor(p)) {
                    mark = mark.with_enter_from(MarkPayload::Rect(RectPayload {
                        rect: from,
                        ..payload.clone()
                    }));
                }
            }
            if exit_to_ancestor {
                if let Some(p) = self.parent(i) {
                    mark = mark.with_exit_to(MarkPayload::Rect(RectPayload {
                        rect: rects[p],
                        ..payload
                    }));
                }
            }
            marks.push(mark);

            if let Some(icon) = &node.icon_text {
                marks.push(
                    Mark::text(
                        id.child(ICON_TAG),
                        selectors::NODE_ICON,
                        TextPayload {
                            pos: r.center(),
                            text: icon.clone(),
                            font_size: cfg.label_font_size,
                            anchor: TextAnchor::Middle,
                            baseline: TextBaseline::Middle,
                            fill: Color::WHITE.into(),
                        },
                    )
                    .with_z_index(z_order::ICONS)
                    .with_cursor(cfg.node_cursor.clone())
                    .with_attributes(cfg.attributes.resolve(selectors::NODE_ICON, node)),
                );
            }

            let max_width = self.label_width(node.layer, r, &spans);
            self.label_marks(i, r, max_width, &mut marks);
        }
        marks
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, node) in self.graph.nodes.iter().enumerate() {
            let id = node.mark_id();
            self.index.insert(id, ItemRef::Node(i));
            self.index.insert(id.child(LABEL_TAG), ItemRef::Node(i));
            for tag in [ICON_TAG, SUB_LABEL_TAG, LABEL_BACKGROUND_TAG] {
                self.index.insert(id.child(tag), ItemRef::Node(i));
            }
        }
        for (k, id) in self.link_ids().into_iter().enumerate() {
            self.index.insert(id, ItemRef::Link(k));
        }
    }
}

fn valid_scale(s: f64) -> bool {
    s.is_finite() && s > 0.0
}

/// A horizontal flow band of width `width` whose center runs from `(x0, y0)` to `(x1, y1)`.
fn band(x0: f64, x1: f64, y0: f64, y1: f64, width: f64) -> BezPath {
    let xm = (x0 + x1) / 2.0;
    let h = width / 2.0;
    let mut path = BezPath::new();
    path.move_to((x0, y0 - h));
    path.curve_to((xm, y0 - h), (xm, y1 - h), (x1, y1 - h));
    path.line_to((x1, y1 + h));
    path.curve_to((xm, y1 + h), (xm, y0 + h), (x0, y0 + h));
    path.close_path();
    path
}

impl<N: Record, L: Record> Component for Sankey<N, L> {
    fn set_size(&mut self, size: Size) {
        self.core.set_size(size);
    }

    fn size(&self) -> Size {
        self.core.size()
    }

    fn render(&mut self, duration: Option<f64>) {
        if self.core.is_destroyed() {
            return;
        }
        let duration = duration.unwrap_or(self.config.duration);
        match self.relayout() {
            Ok(()) => self.error = None,
            Err(err) => {
                warn!(%err, "sankey layout failed");
                self.error = Some(err);
                self.graph = Graph::default();
            }
        }
        self.resolve_styles();
        let marks = self.marks();
        self.rebuild_index();
        self.core.commit("sankey", marks, duration);
        if self.highlighted.is_some() {
            self.apply_highlight();
        }
    }

    fn animation_frame(&mut self, clock: &FrameClock) {
        self.core.advance(clock);
    }

    fn elements(&self) -> &ElementTree {
        self.core.elements()
    }

    fn dispatch_event(&mut self, target: MarkId, event: &PointerEvent) -> bool {
        let Some(selector) = self.core.elements().get(target).map(|el| el.selector()) else {
            return false;
        };
        match self.index.get(&target).copied() {
            Some(ItemRef::Node(i)) => {
                let node = &self.graph.nodes[i];
                self.config.events.dispatch(selector, node, event);
                let id = node.id.clone();
                // Roots stay expanded: collapsing one would leave nothing to click.
                let toggles = self.config.collapse_on_click
                    && event.kind == EventType::Click
                    && node.icon != NodeIcon::None
                    && !node.target_links.is_empty();
                if toggles {
                    self.toggle_collapsed(&id);
                    self.render(None);
                }
                if self.config.highlight_subtree_on_hover {
                    match event.kind {
                        EventType::PointerEnter => {
                            self.highlighted = Some(id);
                            self.apply_highlight();
                        }
                        EventType::PointerLeave => {
                            self.highlighted = None;
                            self.apply_highlight();
                        }
                        _ => {}
                    }
                }
                true
            }
            Some(ItemRef::Link(k)) => {
                self.config
                    .link_events
                    .dispatch(selector, &self.graph.links[k], event);
                true
            }
            None => false,
        }
    }

    fn destroy(&mut self) {
        self.core.destroy();
        self.index.clear();
        self.highlighted = None;
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::collections::BTreeMap;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    use quilt_core::{ElementPhase, Events};

    use super::*;
    use crate::accessor::Accessor;

    type Rec = BTreeMap<String, String>;

    fn rec(pairs: &[(&str, &str)]) -> Rec {
        pairs
            .iter()
            .map(|(k, v)| (String::from(*k), String::from(*v)))
            .collect()
    }

    fn data(links: &[(&str, &str, &str)]) -> SankeyData<Rec, Rec> {
        let mut ids: Vec<&str> = links.iter().flat_map(|(s, t, _)| [*s, *t]).collect();
        ids.sort_unstable();
        ids.dedup();
        SankeyData::new(
            ids.iter().map(|id| rec(&[("id", id)])).collect(),
            links
                .iter()
                .map(|(s, t, v)| rec(&[("source", s), ("target", t), ("value", v)]))
                .collect(),
        )
    }

    fn config() -> SankeyConfig<Rec, Rec> {
        SankeyConfig::default()
            .with_duration(0.0)
            .with_id(Accessor::field("id"))
            .with_link_value(Accessor::func(|d: &Rec, _| {
                d.get("value").and_then(|v| v.parse().ok())
            }))
            .with_node_min_height(0.0)
    }

    fn sankey(config: SankeyConfig<Rec, Rec>) -> Sankey<Rec, Rec> {
        let mut s = Sankey::new(config);
        s.set_size(Size::new(400.0, 200.0));
        s.set_data(data(&[
            ("a", "b", "5"),
            ("b", "c", "3"),
            ("b", "d", "2"),
            ("a", "e", "1"),
        ]));
        s
    }

    fn visible(s: &Sankey<Rec, Rec>) -> Vec<&str> {
        let mut ids: Vec<&str> = s.nodes().iter().map(|n| n.id.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn renders_nodes_links_and_labels() {
        let mut s = sankey(config());
        s.render(None);
        assert_eq!(s.elements().select(selectors::NODE).count(), 5);
        assert_eq!(s.elements().select(selectors::LINK).count(), 4);
        assert_eq!(s.elements().select(selectors::NODE_LABEL).count(), 5);
        assert_eq!(s.elements().select(selectors::NODE_ICON).count(), 0);
        assert!(s.error().is_none());
    }

    #[test]
    fn collapse_removes_descendants_and_expand_restores_them() {
        let mut s = sankey(config());
        s.render(None);
        assert!(s.toggle_collapsed("b"));
        s.render(None);
        assert_eq!(visible(&s), ["a", "b", "e"]);
        assert_eq!(s.node_by_id("b").map(|n| n.icon), Some(NodeIcon::Collapsed));
        assert_eq!(s.elements().select(selectors::NODE_ICON).count(), 1);
        assert_eq!(s.elements().select(selectors::LINK).count(), 2);

        assert!(!s.toggle_collapsed("b"));
        s.render(None);
        assert_eq!(visible(&s), ["a", "b", "c", "d", "e"]);
        assert_eq!(s.node_by_id("b").map(|n| n.icon), Some(NodeIcon::Expanded));
    }

    #[test]
    fn clicking_a_node_toggles_it() {
        let clicks = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&clicks);
        let events = Events::new().on(
            selectors::NODE,
            EventType::Click,
            move |n: &SankeyNode<Rec>, _: &PointerEvent| log.borrow_mut().push(n.id.clone()),
        );
        let mut s = sankey(config().with_events(events).with_collapse_on_click(true));
        s.render(None);
        let b = s.node_by_id("b").map(|n| n.mark_id()).unwrap();
        let click = PointerEvent::new(EventType::Click, Point::ZERO);
        assert!(s.dispatch_event(b, &click));
        assert_eq!(*clicks.borrow(), ["b"]);
        assert!(s.is_collapsed("b"));
        assert_eq!(visible(&s), ["a", "b", "e"]);

        // Leaves have nothing to collapse.
        let e = s.node_by_id("e").map(|n| n.mark_id()).unwrap();
        s.dispatch_event(e, &click);
        assert!(!s.is_collapsed("e"));
    }

    #[test]
    fn clicking_a_root_leaves_it_expanded() {
        let mut s = sankey(config().with_collapse_on_click(true));
        s.render(None);
        let a = s.node_by_id("a").map(|n| n.mark_id()).unwrap();
        assert!(s.dispatch_event(a, &PointerEvent::new(EventType::Click, Point::ZERO)));
        assert!(!s.is_collapsed("a"));
        assert_eq!(visible(&s), ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn node_icon_accessor_picks_the_icon_text() {
        let icon = Accessor::func(|n: &SankeyNode<Rec>, _| match n.icon {
            NodeIcon::None => None,
            NodeIcon::Expanded => Some(String::from("-")),
            NodeIcon::Collapsed => Some(String::from("+")),
        });
        let icons = |s: &Sankey<Rec, Rec>| -> Rec {
            s.nodes()
                .iter()
                .filter_map(|n| Some((n.id.clone(), n.icon_text.clone()?)))
                .collect()
        };
        let mut s = sankey(config().with_node_icon(icon));
        s.render(None);
        assert_eq!(icons(&s), rec(&[("a", "-"), ("b", "-")]));
        assert_eq!(s.elements().select(selectors::NODE_ICON).count(), 2);

        s.set_collapsed("b", true);
        s.render(None);
        assert_eq!(icons(&s), rec(&[("a", "-"), ("b", "+")]));

        // Field keys read the laid-out node first.
        let mut s = sankey(config().with_node_icon(Accessor::field("id")));
        s.render(None);
        assert_eq!(s.elements().select(selectors::NODE_ICON).count(), 5);
        assert_eq!(s.node_by_id("c").and_then(|n| n.icon_text.as_deref()), Some("c"));
    }

    #[test]
    fn hovering_highlights_the_downstream_subtree() {
        let enter = PointerEvent::new(EventType::PointerEnter, Point::ZERO);
        let node_opacity = |s: &Sankey<Rec, Rec>, id: &str| {
            let el = s.node_by_id(id).and_then(|n| s.elements().get(n.mark_id()));
            el.and_then(|el| el.style_opacity())
        };

        let mut plain = sankey(config());
        plain.render(None);
        let b = plain.node_by_id("b").map(|n| n.mark_id()).unwrap();
        plain.dispatch_event(b, &enter);
        assert!(plain.elements().paint_order().iter().all(|el| el.style_opacity().is_none()));

        let mut s = sankey(config().with_highlight_subtree_on_hover(true));
        s.render(None);
        s.dispatch_event(b, &enter);
        for id in ["b", "c", "d"] {
            assert_eq!(node_opacity(&s, id), None, "{id}");
        }
        for id in ["a", "e"] {
            assert_eq!(node_opacity(&s, id), Some(DIMMED_OPACITY), "{id}");
        }
        for el in s.elements().select(selectors::LINK) {
            let Some(SankeyItem::Link(l)) = s.item(el.id()) else {
                panic!("link element without a link");
            };
            let inside = l.value == 3.0 || l.value == 2.0;
            assert_eq!(el.style_opacity().is_none(), inside, "{}", l.value);
        }

        s.render(None);
        assert_eq!(node_opacity(&s, "a"), Some(DIMMED_OPACITY));

        s.dispatch_event(b, &PointerEvent::new(EventType::PointerLeave, Point::ZERO));
        assert!(s.elements().paint_order().iter().all(|el| el.style_opacity().is_none()));
    }

    #[test]
    fn circular_links_render_nothing() {
        let mut s = sankey(config());
        s.render(None);
        s.set_data(data(&[("a", "b", "1"), ("b", "a", "1")]));
        s.render(None);
        assert_eq!(s.error(), Some(&SankeyError::CircularLink));
        assert!(s.elements().is_empty());
        assert!(s.nodes().is_empty());
    }

    #[test]
    fn layout_scale_stretches_the_drawing() {
        let mut s = sankey(config());
        s.render(None);
        let before = s.node_by_id("c").map(|n| s.node_rect(n)).unwrap();
        s.set_layout_scale(2.0, 0.5);
        assert_eq!(s.layout_scale(), (2.0, 0.5));
        let after = s.node_by_id("c").map(|n| s.node_rect(n)).unwrap();
        assert!((after.x0 - 2.0 * before.x0).abs() < 1e-9);
        assert!((after.height() - 0.5 * before.height()).abs() < 1e-9);
        assert!((after.width() - before.width()).abs() < 1e-9);

        s.set_layout_scale(0.0, 1.0);
        assert_eq!(s.layout_scale(), (2.0, 0.5));
    }

    #[test]
    fn fit_view_brings_every_node_into_view() {
        let mut s = sankey(config().with_node_horizontal_spacing(300.0));
        s.render(None);
        let overflow = s.nodes().iter().any(|n| s.node_rect(n).x1 > 400.0);
        assert!(overflow);
        s.fit_view(0.0);
        let view = Rect::new(0.0, 0.0, 400.0, 200.0);
        for n in s.nodes() {
            let r = s.node_rect(n);
            assert!(
                r.x0 >= -1e-6 && r.x1 <= view.x1 + 1e-6 && r.y1 <= view.y1 + 1e-6,
                "{r:?}"
            );
        }
        assert!(s.layout_scale().0 < 1.0);
    }

    #[test]
    fn expanded_nodes_grow_out_of_their_ancestor() {
        let cfg = config().with_transitions(EnterTransition::FromAncestor, ExitTransition::Fade);
        let mut s = sankey(cfg);
        s.set_collapsed("b", true);
        s.render(None);
        let b_rect = s.node_by_id("b").map(|n| s.node_rect(n)).unwrap();
        s.set_collapsed("b", false);
        s.render(Some(100.0));
        let c = s.node_by_id("c").map(|n| n.mark_id()).unwrap();
        let el = s.elements().get(c).unwrap();
        assert_eq!(el.phase(), ElementPhase::Entering);
        match el.payload() {
            MarkPayload::Rect(r) => assert_eq!(r.rect, b_rect),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn labels_truncate_and_sit_beside_nodes() {
        let mut s = Sankey::new(
            config()
                .with_label_position(SankeyLabelPosition::Left)
                .with_label_max_width(30.0),
        );
        s.set_size(Size::new(400.0, 200.0));
        s.set_data(SankeyData::new(
            vec![
                rec(&[("id", "a"), ("name", "a very long node name")]),
                rec(&[("id", "b"), ("name", "b")]),
            ],
            vec![rec(&[("source", "a"), ("target", "b"), ("value", "1")])],
        ));
        s.set_config(s.config().clone().with_label(Accessor::field("name")));
        s.render(None);
        let a = s.node_by_id("a").unwrap();
        let rect = s.node_rect(a);
        let label = s.elements().get(a.mark_id().child(LABEL_TAG)).unwrap();
        match label.payload() {
            MarkPayload::Text(t) => {
                assert!(t.text.ends_with('…'));
                assert_eq!(t.anchor, TextAnchor::End);
                assert_eq!(t.pos.x, rect.x0 - LABEL_GAP);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    /// Two nodes `a -> b` labelled from their `name` field.
    fn named_pair(cfg: SankeyConfig<Rec, Rec>) -> Sankey<Rec, Rec> {
        let mut s = Sankey::new(cfg.with_label(Accessor::field("name")));
        s.set_size(Size::new(400.0, 200.0));
        s.set_data(SankeyData::new(
            vec![
                rec(&[("id", "a"), ("name", "a very long node name"), ("unit", "kWh")]),
                rec(&[("id", "b"), ("name", "b"), ("unit", "kWh")]),
            ],
            vec![rec(&[("source", "a"), ("target", "b"), ("value", "1")])],
        ));
        s.render(None);
        s
    }

    fn text(s: &Sankey<Rec, Rec>, node: &str, tag: u64) -> Option<TextPayload> {
        let id = s.node_by_id(node)?.mark_id().child(tag);
        match s.elements().get(id)?.payload() {
            MarkPayload::Text(t) => Some(t.clone()),
            _ => None,
        }
    }

    #[test]
    fn labels_take_the_space_before_the_next_column() {
        let s = named_pair(config().with_label_max_width(30.0));
        assert!(text(&s, "a", LABEL_TAG).unwrap().text.ends_with('…'));

        let cfg = config()
            .with_label_max_width(30.0)
            .with_label_max_width_take_available_space(true);
        let s = named_pair(cfg.clone());
        assert_eq!(text(&s, "a", LABEL_TAG).unwrap().text, "a very long node name");

        // Left labels look back to the previous column.
        let s = named_pair(cfg.with_label_position(SankeyLabelPosition::Left));
        assert!(text(&s, "a", LABEL_TAG).unwrap().text.ends_with('…'));
        assert_eq!(text(&s, "b", LABEL_TAG).unwrap().text, "b");
    }

    #[test]
    fn sub_labels_sit_inline_or_below() {
        let cfg = config().with_sub_label(Accessor::field("unit"));
        let s = named_pair(cfg.clone());
        let b = s.node_by_id("b").map(|n| s.node_rect(n)).unwrap();
        let label = text(&s, "b", LABEL_TAG).unwrap();
        let sub = text(&s, "b", SUB_LABEL_TAG).unwrap();
        assert_eq!(s.elements().select(selectors::NODE_SUB_LABEL).count(), 2);
        assert_eq!(sub.text, "kWh");
        assert_eq!(sub.font_size, 10.0);
        assert_eq!(label.pos.y, sub.pos.y);
        let expected = b.x1 + LABEL_GAP + 0.6 * 12.0 + LABEL_GAP;
        assert!((sub.pos.x - expected).abs() < 1e-9, "{}", sub.pos.x);

        let s = named_pair(cfg.with_sub_label_placement(SankeySubLabelPlacement::Below));
        let label = text(&s, "b", LABEL_TAG).unwrap();
        let sub = text(&s, "b", SUB_LABEL_TAG).unwrap();
        let cy = b.center().y;
        assert_eq!(label.pos.x, sub.pos.x);
        assert!((label.pos.y - (cy - 5.0)).abs() < 1e-9);
        assert!((sub.pos.y - (cy + 6.0)).abs() < 1e-9);
    }

    #[test]
    fn label_background_wraps_both_labels() {
        let plain = named_pair(config());
        assert_eq!(plain.elements().select(selectors::NODE_LABEL_BACKGROUND).count(), 0);

        let cfg = config()
            .with_sub_label(Accessor::field("unit"))
            .with_sub_label_placement(SankeySubLabelPlacement::Below)
            .with_label_background(true);
        let s = named_pair(cfg);
        let id = s.node_by_id("b").unwrap().mark_id().child(LABEL_BACKGROUND_TAG);
        let el = s.elements().get(id).unwrap();
        assert_eq!(el.selector(), selectors::NODE_LABEL_BACKGROUND);
        assert_eq!(el.z_index(), z_order::LABEL_BACKGROUNDS);
        let MarkPayload::Rect(backdrop) = el.payload() else {
            panic!("backdrop is not a rect");
        };
        for t in [text(&s, "b", LABEL_TAG), text(&s, "b", SUB_LABEL_TAG)] {
            let t = t.unwrap();
            let measurer = HeuristicTextMeasurer;
            let r = label_bounds(&t.text, t.font_size, t.pos, t.anchor, t.baseline, &measurer);
            assert!(backdrop.rect.contains(r.origin()), "{r:?}");
            assert!(backdrop.rect.contains(Point::new(r.x1, r.y1)), "{r:?}");
        }
        assert!(matches!(s.item(id), Some(SankeyItem::Node(n)) if n.id == "b"));
    }

    #[test]
    fn link_events_see_the_link() {
        let seen = Rc::new(RefCell::new(None));
        let log = Rc::clone(&seen);
        let events = Events::new().on(
            selectors::LINK,
            EventType::PointerEnter,
            move |l: &SankeyLink<Rec>, _: &PointerEvent| *log.borrow_mut() = Some(l.value),
        );
        let mut s = sankey(config().with_link_events(events));
        s.render(None);
        let id = s
            .elements()
            .select(selectors::LINK)
            .map(|el| el.id())
            .find(|&id| matches!(s.item(id), Some(SankeyItem::Link(l)) if l.value == 3.0))
            .unwrap();
        s.dispatch_event(id, &PointerEvent::new(EventType::PointerEnter, Point::ZERO));
        assert_eq!(*seen.borrow(), Some(3.0));
    }
}
