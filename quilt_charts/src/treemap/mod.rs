// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Treemap component.
//!
//! Records are grouped by the configured layers into a hierarchy, tiled with the squarified
//! algorithm and drawn as one rectangle per node below the root. Leaves are labelled with
//! their innermost group key; internal nodes only when `label_internal_nodes` is set.

extern crate alloc;

mod config;
mod hierarchy;
mod squarify;

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{Point, Rect};
use peniko::Color;
use quilt_core::{
    ElementTree, FrameClock, Mark, MarkId, PointerEvent, RectPayload, TextAnchor, TextBaseline,
    TextPayload,
};
use tracing::debug;

pub use config::{NumberFormat, TreemapConfig, TreemapOption};
pub use hierarchy::{ROOT_ID, TreemapNode};
pub use squarify::PHI;

use crate::color::{adjust_lightness, palette, palette_color, with_opacity};
use crate::component::{Component, ComponentCore};
use crate::data_model::DataModel;
use crate::label::truncate_to_width;
use crate::layout::Size;
use crate::measure::{HeuristicTextMeasurer, TextMeasurer};
use crate::record::Record;
use crate::scale::{ScaleLinear, ScaleOrdinal, infer_domain};
use crate::z_order;

use squarify::Padding;

/// Selectors of the elements a treemap generates.
pub mod selectors {
    use quilt_core::Selector;

    /// Tiles.
    pub const TILE: Selector = "tile";
    /// Tile labels.
    pub const LABEL: Selector = "tile-label";
}

const LABEL_TAG: u64 = 1;
const DEFAULT_FONT_SIZE: f64 = 12.0;
const INTERNAL_TILE_OPACITY: f64 = 0.4;
// Smallest sibling is mixed this far towards white.
const LIGHTNESS_VARIANCE: f64 = 0.5;
const DARK_LABEL: Color = Color::from_rgb8(0x2a, 0x2a, 0x2a);
const LIGHT_LABEL: Color = Color::WHITE;

/// A treemap.
pub struct Treemap<D> {
    config: TreemapConfig<D>,
    data: DataModel<D>,
    core: ComponentCore,
    nodes: Vec<TreemapNode<D>>,
    // Element id -> arena index.
    index: HashMap<MarkId, usize>,
    measurer: HeuristicTextMeasurer,
}

impl<D> core::fmt::Debug for Treemap<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Treemap")
            .field("config", &self.config)
            .field("data", &self.data)
            .field("nodes", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

impl<D: Record> Treemap<D> {
    /// Creates a treemap without data.
    pub fn new(config: TreemapConfig<D>) -> Self {
        let mut treemap = Self {
            config,
            data: DataModel::new(),
            core: ComponentCore::new(),
            nodes: Vec::new(),
            index: HashMap::new(),
            measurer: HeuristicTextMeasurer,
        };
        treemap.regroup();
        treemap
    }

    /// The current configuration.
    pub fn config(&self) -> &TreemapConfig<D> {
        &self.config
    }

    /// Replaces the configuration. Takes effect on the next render.
    pub fn set_config(&mut self, config: TreemapConfig<D>) {
        let changed = self.config.diff(&config);
        debug!(changed = ?changed.as_slice(), "treemap config replaced");
        self.config = config;
        if changed.iter().any(|o| o.affects_hierarchy()) {
            self.regroup();
        }
    }

    /// Replaces the data. Takes effect on the next render.
    pub fn set_data(&mut self, data: Vec<D>) {
        self.data.set_data(data);
        self.regroup();
    }

    /// The data model.
    pub fn data(&self) -> &DataModel<D> {
        &self.data
    }

    /// The hierarchy arena; index `0` is the root.
    pub fn nodes(&self) -> &[TreemapNode<D>] {
        &self.nodes
    }

    /// The node behind a tile or label element of the last render.
    pub fn node(&self, id: MarkId) -> Option<&TreemapNode<D>> {
        self.index.get(&id).and_then(|&i| self.nodes.get(i))
    }

    fn regroup(&mut self) {
        self.nodes = hierarchy::build(
            &self.data,
            &self.config.layers,
            &self.config.value,
            self.config.id.as_ref(),
        );
        debug!(nodes = self.nodes.len(), "treemap hierarchy rebuilt");
    }

    fn assign_colors(&mut self) {
        let cfg = &self.config;
        let nodes = &self.nodes;
        let mut ordinal = ScaleOrdinal::new(palette().collect());
        let fills: Vec<Color> = (0..nodes.len())
            .map(|idx| {
                let node = &nodes[idx];
                if let Some(c) = cfg.tile_color.as_ref().and_then(|a| a.resolve(node, idx)) {
                    return c;
                }
                let base = node
                    .top_level
                    .map(|t| {
                        let top = &nodes[t];
                        ordinal
                            .map(top.key.as_deref().unwrap_or(top.id.as_str()))
                            .unwrap_or_else(|| palette_color(0))
                    })
                    .unwrap_or_else(|| palette_color(0));
                match node.parent {
                    Some(p) if cfg.enable_lightness_variance && node.is_leaf() => {
                        let max = nodes[p]
                            .children
                            .first()
                            .map_or(0.0, |&c| nodes[c].value);
                        if max > 0.0 {
                            adjust_lightness(base, LIGHTNESS_VARIANCE * (1.0 - node.value / max))
                        } else {
                            base
                        }
                    }
                    _ => base,
                }
            })
            .collect();
        for (node, fill) in self.nodes.iter_mut().zip(fills) {
            node.fill = fill;
        }
    }

    fn label_text(&self, idx: usize) -> Option<String> {
        let node = &self.nodes[idx];
        if !node.is_leaf() {
            return node.key.clone();
        }
        let parent_key = node
            .parent
            .and_then(|p| self.nodes[p].key.as_deref())
            .or_else(|| node.id.rsplit('/').next())?;
        Some(match &self.config.number_format {
            Some(f) => format!("{parent_key}: {}", f(node.value)),
            None => parent_key.into(),
        })
    }

    fn marks(&self) -> Vec<Mark> {
        let cfg = &self.config;
        let font_scale = cfg
            .enable_font_size_variation
            .then(|| {
                infer_domain(
                    self.nodes
                        .iter()
                        .skip(1)
                        .filter(|n| n.is_leaf())
                        .map(|n| n.value),
                )
            })
            .flatten()
            .map(|domain| {
                ScaleLinear::new(domain, (cfg.label_min_font_size, cfg.label_max_font_size))
            });

        let mut marks = Vec::with_capacity(self.nodes.len() * 2);
        for (idx, node) in self.nodes.iter().enumerate().skip(1) {
            let depth = i32::try_from(node.depth).unwrap_or(i32::MAX - z_order::LABELS);
            let r = node.rect;
            let fill = if node.is_leaf() {
                node.fill
            } else {
                with_opacity(node.fill, INTERNAL_TILE_OPACITY)
            };
            let radius = cfg
                .tile_border_radius
                .max(0.0)
                .min(r.width() / 2.0)
                .min(r.height() / 2.0);
            marks.push(
                Mark::rect(
                    node.mark_id(),
                    selectors::TILE,
                    RectPayload {
                        corner_radius: radius,
                        ..RectPayload::new(r, fill)
                    },
                )
                .with_z_index(z_order::TILES + depth)
                .with_attributes(cfg.attributes.resolve(selectors::TILE, node)),
            );

            if !node.is_leaf() && !cfg.label_internal_nodes {
                continue;
            }
            let Some(text) = self.label_text(idx) else {
                continue;
            };
            let font_size = match &font_scale {
                Some(scale) if node.is_leaf() => scale.map(node.value),
                _ => DEFAULT_FONT_SIZE,
            };
            let Some(text) = fit_label(
                &text,
                font_size,
                r,
                cfg.label_offset_x,
                cfg.label_offset_y,
                &self.measurer,
            ) else {
                continue;
            };
            marks.push(
                Mark::text(
                    node.mark_id().child(LABEL_TAG),
                    selectors::LABEL,
                    TextPayload {
                        pos: Point::new(r.x0 + cfg.label_offset_x, r.y0 + cfg.label_offset_y),
                        text,
                        font_size,
                        anchor: TextAnchor::Start,
                        baseline: TextBaseline::Hanging,
                        fill: label_color(fill).into(),
                    },
                )
                .with_z_index(z_order::LABELS + depth)
                .with_attributes(cfg.attributes.resolve(selectors::LABEL, node)),
            );
        }
        marks
    }
}

/// Truncates `text` to the tile width; `None` if the tile cannot hold it at all.
fn fit_label(
    text: &str,
    font_size: f64,
    tile: Rect,
    offset_x: f64,
    offset_y: f64,
    measurer: &dyn TextMeasurer,
) -> Option<String> {
    let max_width = tile.width() - 2.0 * offset_x;
    let (_, height) = measurer.measure(text, font_size);
    if max_width <= 0.0 || height + offset_y > tile.height() {
        return None;
    }
    let fitted = truncate_to_width(text, font_size, max_width, measurer);
    if fitted == "…" || measurer.measure(&fitted, font_size).0 > max_width {
        return None;
    }
    Some(fitted)
}

/// Dark text on light tiles, light text on dark ones.
fn label_color(fill: Color) -> Color {
    let [r, g, b, a] = fill.components;
    let luminance = 0.2126 * r + 0.7152 * g + 0.0722 * b;
    // Translucent tiles show the light background through.
    let seen = luminance * a + (1.0 - a);
    if seen > 0.55 { DARK_LABEL } else { LIGHT_LABEL }
}

impl<D: Record> Component for Treemap<D> {
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
        let size = self.core.size();
        squarify::tile(
            &mut self.nodes,
            Rect::new(0.0, 0.0, size.width, size.height),
            Padding {
                inner: self.config.tile_padding,
                top: self.config.tile_padding_top,
            },
        );
        self.assign_colors();
        let marks = self.marks();
        self.index.clear();
        for (idx, node) in self.nodes.iter().enumerate().skip(1) {
            let id = node.mark_id();
            self.index.insert(id, idx);
            self.index.insert(id.child(LABEL_TAG), idx);
        }
        self.core.commit(
            "treemap",
            marks,
            duration.unwrap_or(self.config.duration),
        );
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
        let Some(node) = self.node(target) else {
            return false;
        };
        self.config.events.dispatch(selector, node, event);
        true
    }

    fn destroy(&mut self) {
        self.core.destroy();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::collections::BTreeMap;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    use quilt_core::{ElementPhase, EventType, Events, MarkPayload};

    use super::*;
    use crate::accessor::Accessor;

    type Row = BTreeMap<String, String>;

    fn row(group: &str, name: &str, value: f64) -> Row {
        let mut m = BTreeMap::new();
        m.insert("group".into(), group.into());
        m.insert("name".into(), name.into());
        m.insert("value".into(), format!("{value}"));
        m
    }

    fn config() -> TreemapConfig<Row> {
        TreemapConfig::default()
            .with_duration(0.0)
            .with_value(Accessor::func(|d: &Row, _| {
                d.get("value").and_then(|v| v.parse().ok())
            }))
            .with_layers(vec![Accessor::field("group"), Accessor::field("name")])
    }

    fn rows() -> Vec<Row> {
        vec![
            row("Asia", "China", 60.0),
            row("Asia", "India", 30.0),
            row("Europe", "Germany", 10.0),
        ]
    }

    fn treemap(config: TreemapConfig<Row>, size: f64) -> Treemap<Row> {
        let mut t = Treemap::new(config);
        t.set_data(rows());
        t.set_size(Size::new(size, size));
        t.render(None);
        t
    }

    fn tiles(t: &Treemap<Row>) -> Vec<(String, Rect)> {
        t.elements()
            .select(selectors::TILE)
            .filter_map(|el| {
                let MarkPayload::Rect(r) = el.payload() else {
                    return None;
                };
                Some((t.node(el.id())?.id.clone(), r.rect))
            })
            .collect()
    }

    #[test]
    fn leaf_areas_follow_values_without_padding() {
        let t = treemap(config().with_tile_padding(0.0), 100.0);
        let leaves: Vec<f64> = t
            .nodes()
            .iter()
            .filter(|n| n.index.is_some())
            .map(|n| n.rect.width() * n.rect.height())
            .collect();
        let total: f64 = leaves.iter().sum();
        assert!((total - 10_000.0).abs() < 1e-6);
        assert!(leaves.iter().any(|a| (a - 6_000.0).abs() < 1e-6));
        // Two groups, two "name" levels under Asia, one under Europe, three leaves.
        assert_eq!(tiles(&t).len(), 8);
    }

    #[test]
    fn padding_separates_siblings() {
        let t = treemap(config().with_tile_padding(4.0), 100.0);
        let top: Vec<Rect> = t.nodes()[0]
            .children
            .iter()
            .map(|&c| t.nodes()[c].rect)
            .collect();
        assert_eq!(top.len(), 2);
        let gap = (top[1].x0 - top[0].x1).max(top[1].y0 - top[0].y1);
        assert!((gap - 4.0).abs() < 1e-9, "{top:?}");
        assert!(top[0].x0 >= 4.0 - 1e-9);
    }

    #[test]
    fn padding_top_reserves_header_space() {
        let t = treemap(config().with_tile_padding(2.0).with_tile_padding_top(20.0), 200.0);
        let asia = t.nodes()[0].children[0];
        let child = t.nodes()[asia].children[0];
        assert!(t.nodes()[child].rect.y0 - t.nodes()[asia].rect.y0 >= 20.0 - 1e-9);
    }

    #[test]
    fn ids_are_paths_and_stable() {
        let mut t = treemap(config(), 100.0);
        let ids: Vec<String> = tiles(&t).into_iter().map(|(id, _)| id).collect();
        assert!(ids.iter().any(|id| id == "root/Asia/China/0"));
        let before = t.elements().len();
        t.render(Some(100.0));
        assert_eq!(t.elements().len(), before);
        assert!(t.elements().paint_order().iter().all(|el| matches!(
            el.phase(),
            ElementPhase::Updating | ElementPhase::Settled
        )));
    }

    #[test]
    fn leaf_labels_use_the_parent_key() {
        let t = treemap(config().with_number_format(|v| format!("{v:.0}")), 300.0);
        let labels: Vec<String> = t
            .elements()
            .select(selectors::LABEL)
            .filter_map(|el| match el.payload() {
                MarkPayload::Text(t) => Some(t.text.clone()),
                _ => None,
            })
            .collect();
        assert!(labels.iter().any(|l| l == "China: 60"), "{labels:?}");
        assert!(!labels.iter().any(|l| l == "Asia"));
    }

    #[test]
    fn tiny_tiles_drop_their_labels() {
        let t = treemap(config(), 10.0);
        assert_eq!(t.elements().select(selectors::LABEL).count(), 0);
    }

    #[test]
    fn internal_labels_are_optional() {
        let t = treemap(config().with_label_internal_nodes(true), 300.0);
        assert!(t.elements().select(selectors::LABEL).any(|el| matches!(
            el.payload(),
            MarkPayload::Text(t) if t.text == "Asia"
        )));
    }

    #[test]
    fn font_size_varies_with_value() {
        let t = treemap(config().with_font_size_variation(8.0, 32.0), 400.0);
        let sizes: Vec<(String, f64)> = t
            .elements()
            .select(selectors::LABEL)
            .filter_map(|el| match el.payload() {
                MarkPayload::Text(p) => Some((p.text.clone(), p.font_size)),
                _ => None,
            })
            .collect();
        let china = sizes.iter().find(|(t, _)| t == "China").map(|(_, s)| *s);
        let germany = sizes.iter().find(|(t, _)| t == "Germany").map(|(_, s)| *s);
        assert_eq!(china, Some(32.0));
        assert_eq!(germany, Some(8.0));
    }

    #[test]
    fn colors_follow_the_top_level_group() {
        let t = treemap(config(), 100.0);
        let nodes = t.nodes();
        let asia = nodes[0].children[0];
        let leaf = nodes.iter().find(|n| n.index == Some(1)).unwrap();
        assert_eq!(leaf.fill, nodes[asia].fill);
        assert_eq!(nodes[asia].fill, palette_color(0));
    }

    #[test]
    fn tile_color_accessor_wins() {
        let red = Color::from_rgb8(255, 0, 0);
        let t = treemap(config().with_tile_color(Accessor::constant(red)), 100.0);
        assert!(t.nodes().iter().skip(1).all(|n| n.fill == red));
    }

    #[test]
    fn lightness_variance_lightens_smaller_siblings() {
        let mut t = Treemap::new(
            config()
                .with_layers(vec![Accessor::field("group")])
                .with_lightness_variance(true),
        );
        t.set_data(rows());
        t.set_size(Size::new(100.0, 100.0));
        t.render(None);
        let china = t.nodes().iter().find(|n| n.index == Some(0)).unwrap();
        let india = t.nodes().iter().find(|n| n.index == Some(1)).unwrap();
        assert_eq!(china.fill, palette_color(0));
        assert!(india.fill.components[0] > china.fill.components[0]);
    }

    #[test]
    fn clicks_reach_the_node() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let events = Events::new().on(selectors::TILE, EventType::Click, move |n: &TreemapNode<Row>, _| {
            log.borrow_mut().push(n.id.clone());
        });
        let mut t = treemap(config().with_events(events), 100.0);
        let target = t.nodes()[1].mark_id();
        assert!(t.dispatch_event(target, &PointerEvent::new(EventType::Click, Point::ZERO)));
        assert_eq!(seen.borrow().as_slice(), ["root/Asia"]);
    }
}
