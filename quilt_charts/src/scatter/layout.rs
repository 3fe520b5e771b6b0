// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! On-screen point selection, size scales and bleed.

extern crate alloc;

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Point, Rect};
use peniko::Color;
use quilt_core::MarkId;

use crate::color::{palette_color, resolve_color};
use crate::data_model::DataModel;
use crate::label::{Position, label_bounds, place_label};
use crate::measure::TextMeasurer;
use crate::record::Record;
use crate::scale::{ScaleContinuous, infer_domain};
use crate::scatter::config::{ScatterConfig, SizeDomain};
use crate::spacing::Spacing;
use crate::symbol::Symbol;

const NAMESPACE: u64 = 0x5ca7_7e40;
const LABEL_TAG: u64 = 1;

/// Excess beyond the scale ranges is multiplied by this to absorb later range changes and
/// irregular glyph shapes.
const BLEED_COEFF: f64 = 1.2;

/// A point that passed the on-screen test, with its resolved visual attributes.
pub struct ScatterPoint<D> {
    /// The source record.
    pub datum: Rc<D>,
    /// Identity key: the id accessor's value, else the record index.
    pub key: String,
    /// Element id of the point glyph.
    pub id: MarkId,
    /// X value in domain units.
    pub x_value: f64,
    /// Y value in domain units.
    pub y_value: f64,
    /// Glyph size in pixels.
    pub size_px: f64,
    /// Fill color.
    pub color: Color,
    /// Stroke color; no stroke when unset.
    pub stroke_color: Option<Color>,
    /// Stroke width in pixels.
    pub stroke_width: f64,
    /// Glyph shape.
    pub shape: Symbol,
    /// Label text, if any.
    pub label: Option<String>,
    /// Label color; a neutral color when unset.
    pub label_color: Option<Color>,
    /// Label position relative to the glyph.
    pub label_position: Position,
    /// Pointer cursor.
    pub cursor: Option<String>,
    /// Series index.
    pub group_index: usize,
    /// Record index.
    pub point_index: usize,
}

impl<D> ScatterPoint<D> {
    /// Element id of the point's label.
    pub fn label_id(&self) -> MarkId {
        self.id.child(LABEL_TAG)
    }

    /// Glyph center in pixels.
    pub fn center(&self, x: &ScaleContinuous, y: &ScaleContinuous) -> Point {
        Point::new(x.map(self.x_value), y.map(self.y_value))
    }

    /// Estimated label box in pixels, if the point has a label.
    pub fn label_box(
        &self,
        x: &ScaleContinuous,
        y: &ScaleContinuous,
        font_size: f64,
        measurer: &dyn TextMeasurer,
    ) -> Option<Rect> {
        let text = self.label.as_deref()?;
        let p = place_label(self.center(x, y), self.size_px * 0.5, self.label_position);
        Some(label_bounds(
            text, font_size, p.pos, p.anchor, p.baseline, measurer,
        ))
    }
}

impl<D> Clone for ScatterPoint<D> {
    fn clone(&self) -> Self {
        Self {
            datum: Rc::clone(&self.datum),
            key: self.key.clone(),
            id: self.id,
            x_value: self.x_value,
            y_value: self.y_value,
            size_px: self.size_px,
            color: self.color,
            stroke_color: self.stroke_color,
            stroke_width: self.stroke_width,
            shape: self.shape,
            label: self.label.clone(),
            label_color: self.label_color,
            label_position: self.label_position,
            cursor: self.cursor.clone(),
            group_index: self.group_index,
            point_index: self.point_index,
        }
    }
}

impl<D> fmt::Debug for ScatterPoint<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScatterPoint")
            .field("key", &self.key)
            .field("group_index", &self.group_index)
            .field("point_index", &self.point_index)
            .field("x_value", &self.x_value)
            .field("y_value", &self.y_value)
            .field("size_px", &self.size_px)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// The size scales in use: one shared, or one per series.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct SizeScales {
    scales: Vec<ScaleContinuous>,
    per_series: bool,
    ranged: bool,
}

impl SizeScales {
    /// Rebuilds the size scales from the data extent of the size accessor.
    pub(crate) fn compute<D: Record>(config: &ScatterConfig<D>, data: &DataModel<D>) -> Self {
        let range = config.size_range.unwrap_or((0.0, 0.0));
        let ranged = range != (0.0, 0.0);
        let groups = config.y.len();
        let scale_for = |domain: Option<(f64, f64)>| {
            config
                .size_scale
                .with_domain(domain.unwrap_or((0.0, 1.0)))
                .with_range(range)
        };
        let scales = match config.size_domain {
            SizeDomain::Shared => {
                alloc::vec![scale_for(data.series_extent(&config.size, groups))]
            }
            SizeDomain::PerSeries => (0..groups)
                .map(|j| {
                    scale_for(infer_domain(
                        data.data()
                            .iter()
                            .enumerate()
                            .filter_map(|(i, d)| config.size.resolve(d, i, j)),
                    ))
                })
                .collect(),
        };
        Self {
            scales,
            per_series: config.size_domain == SizeDomain::PerSeries,
            ranged,
        }
    }

    /// The scale used by series `group`.
    pub(crate) fn for_group(&self, group: usize) -> Option<&ScaleContinuous> {
        if self.per_series {
            self.scales.get(group)
        } else {
            self.scales.first()
        }
    }

    /// Converts a raw size value to pixels. Without a size range the raw value is used.
    pub(crate) fn to_px(&self, raw: f64, group: usize) -> f64 {
        match self.for_group(group) {
            Some(scale) if self.ranged => scale.map(raw),
            _ => raw,
        }
    }
}

fn sorted(domain: (f64, f64)) -> (f64, f64) {
    if domain.0 <= domain.1 {
        domain
    } else {
        (domain.1, domain.0)
    }
}

/// Selects the points whose footprint lies inside the visible window, one list per series.
///
/// The window is the scale domains widened by half the largest glyph. Records with an
/// undefined x, y or size value are left out.
pub(crate) fn on_screen_points<D: Record>(
    config: &ScatterConfig<D>,
    data: &DataModel<D>,
    x: &ScaleContinuous,
    y: &ScaleContinuous,
    sizes: &SizeScales,
) -> Vec<Vec<ScatterPoint<D>>> {
    let groups = config.y.len();
    let max_px = (0..groups)
        .flat_map(|j| {
            data.data()
                .iter()
                .enumerate()
                .filter_map(move |(i, d)| config.size.resolve(d, i, j).map(|v| (v, j)))
        })
        .map(|(v, j)| sizes.to_px(v, j))
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
        .unwrap_or(0.0);
    let max_x = x.span_to_domain(max_px).abs();
    let max_y = y.span_to_domain(max_px).abs();
    let (x0, x1) = sorted(x.domain());
    let (y0, y1) = sorted(y.domain());

    (0..groups)
        .map(|j| {
            let series = MarkId::for_index(NAMESPACE, j as u64);
            data.data()
                .iter()
                .enumerate()
                .filter_map(|(i, d)| {
                    let x_value = config.x.resolve(d, i)?;
                    let y_value = config.y.resolve(d, i, j)?;
                    let size_px = sizes.to_px(config.size.resolve(d, i, j)?, j);
                    let fx = x.span_to_domain(size_px).abs();
                    let fy = y.span_to_domain(size_px).abs();
                    let inside = x_value - fx / 2.0 >= x0 - max_x / 2.0
                        && x_value + fx / 2.0 <= x1 + max_x / 2.0
                        && y_value - fy / 2.0 >= y0 - max_y / 2.0
                        && y_value + fy / 2.0 <= y1 + max_y / 2.0;
                    if !inside {
                        return None;
                    }
                    let key = config
                        .id
                        .as_ref()
                        .and_then(|id| id.resolve(d, i))
                        .unwrap_or_else(|| i.to_string());
                    Some(ScatterPoint {
                        datum: Rc::clone(d),
                        id: series.child_key(&key),
                        key,
                        x_value,
                        y_value,
                        size_px,
                        color: resolve_color(config.color.as_ref(), d, i, j, true)
                            .unwrap_or_else(|| palette_color(j)),
                        stroke_color: resolve_color(config.stroke_color.as_ref(), d, i, j, false),
                        stroke_width: config.stroke_width.resolve(d, i, j).unwrap_or(0.0),
                        shape: config.shape.resolve(d, i, j).unwrap_or_default(),
                        label: config
                            .label
                            .as_ref()
                            .and_then(|l| l.resolve(d, i, j))
                            .filter(|s| !s.is_empty()),
                        label_color: resolve_color(config.label_color.as_ref(), d, i, j, false),
                        label_position: config.label_position.resolve(d, i).unwrap_or_default(),
                        cursor: config.cursor.as_ref().and_then(|c| c.resolve(d, i, j)),
                        group_index: j,
                        point_index: i,
                    })
                })
                .collect()
        })
        .collect()
}

/// Space the points and their labels need beyond the scale ranges.
pub(crate) fn bleed<D>(
    points: &[Vec<ScatterPoint<D>>],
    x: &ScaleContinuous,
    y: &ScaleContinuous,
    font_size: f64,
    measurer: &dyn TextMeasurer,
) -> Spacing {
    let mut extent: Option<Rect> = None;
    for p in points.iter().flatten() {
        let c = p.center(x, y);
        let r = p.size_px * 0.5;
        let mut rect = Rect::new(c.x - r, c.y - r, c.x + r, c.y + r);
        if let Some(label) = p.label_box(x, y, font_size, measurer) {
            rect = rect.union(label);
        }
        if !(rect.x0.is_finite()
            && rect.y0.is_finite()
            && rect.x1.is_finite()
            && rect.y1.is_finite())
        {
            continue;
        }
        extent = Some(extent.map_or(rect, |e| e.union(rect)));
    }
    let Some(extent) = extent else {
        return Spacing::ZERO;
    };

    let (x_start, x_end) = x.range();
    let (y_start, y_end) = sorted(y.range());
    let excess = |v: f64| if v > 0.0 { BLEED_COEFF * v } else { 0.0 };
    Spacing {
        top: excess(y_start - extent.y0),
        bottom: excess(extent.y1 - y_end),
        left: excess(x_start - extent.x0),
        right: excess(extent.x1 - x_end),
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::collections::BTreeMap;
    use alloc::vec;

    use super::*;
    use crate::accessor::Accessor;
    use crate::measure::HeuristicTextMeasurer;

    type Row = BTreeMap<String, f64>;

    fn row(x: f64, y: f64, size: f64) -> Row {
        let mut m = BTreeMap::new();
        m.insert("x".into(), x);
        m.insert("y".into(), y);
        m.insert("size".into(), size);
        m
    }

    fn scales() -> (ScaleContinuous, ScaleContinuous) {
        (
            ScaleContinuous::linear()
                .with_domain((0.0, 10.0))
                .with_range((0.0, 100.0)),
            ScaleContinuous::linear()
                .with_domain((0.0, 10.0))
                .with_range((100.0, 0.0)),
        )
    }

    fn model(rows: Vec<Row>) -> DataModel<Row> {
        let mut m = DataModel::new();
        m.set_data(rows);
        m
    }

    #[test]
    fn zero_sized_points_on_the_domain_edges_are_on_screen() {
        let config = ScatterConfig::default().with_size(Accessor::field("size"));
        let data = model(vec![row(0.0, 0.0, 0.0), row(10.0, 0.0, 0.0)]);
        let (x, y) = scales();
        let sizes = SizeScales::compute(&config, &data);
        let points = on_screen_points(&config, &data, &x, &y, &sizes);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].len(), 2);
        let b = bleed(&points, &x, &y, 12.0, &HeuristicTextMeasurer);
        assert!(b.is_zero());
    }

    #[test]
    fn points_outside_the_widened_window_are_dropped() {
        let config = ScatterConfig::default().with_size(Accessor::field("size"));
        let data = model(vec![row(5.0, 5.0, 10.0), row(11.0, 5.0, 10.0), row(10.0, 5.0, 10.0)]);
        let (x, y) = scales();
        let sizes = SizeScales::compute(&config, &data);
        let points = on_screen_points(&config, &data, &x, &y, &sizes);
        let kept: Vec<usize> = points[0].iter().map(|p| p.point_index).collect();
        assert_eq!(kept, [0, 2]);
    }

    #[test]
    fn undefined_values_are_excluded() {
        let config = ScatterConfig::default();
        let mut partial = BTreeMap::new();
        partial.insert(String::from("x"), 1.0);
        let data = model(vec![row(1.0, 1.0, 0.0), partial]);
        let (x, y) = scales();
        let sizes = SizeScales::compute(&config, &data);
        let points = on_screen_points(&config, &data, &x, &y, &sizes);
        assert_eq!(points[0].len(), 1);
    }

    #[test]
    fn size_range_maps_through_the_size_scale() {
        let config = ScatterConfig::default()
            .with_size(Accessor::field("size"))
            .with_size_scale(ScaleContinuous::linear())
            .with_size_range((4.0, 8.0));
        let data = model(vec![row(1.0, 1.0, 0.0), row(2.0, 2.0, 100.0)]);
        let (x, y) = scales();
        let sizes = SizeScales::compute(&config, &data);
        let points = on_screen_points(&config, &data, &x, &y, &sizes);
        let px: Vec<f64> = points[0].iter().map(|p| p.size_px).collect();
        assert_eq!(px, [4.0, 8.0]);
    }

    #[test]
    fn per_series_size_domains_are_independent() {
        let size_a = Accessor::func(|d: &Row, _| d.get("size").copied());
        let size_b = Accessor::func(|d: &Row, _| d.get("size").map(|s| s * 10.0));
        let config = ScatterConfig::default()
            .with_y(vec![Accessor::field("y"), Accessor::field("y")])
            .with_size(vec![size_a, size_b])
            .with_size_scale(ScaleContinuous::linear())
            .with_size_range((0.0, 10.0))
            .with_size_domain(SizeDomain::PerSeries);
        let data = model(vec![row(1.0, 1.0, 1.0), row(2.0, 2.0, 2.0)]);
        let (x, y) = scales();
        let sizes = SizeScales::compute(&config, &data);
        let points = on_screen_points(&config, &data, &x, &y, &sizes);
        assert_eq!(points[0][1].size_px, 10.0);
        assert_eq!(points[1][1].size_px, 10.0);
    }

    #[test]
    fn bleed_counts_only_the_excess() {
        let config = ScatterConfig::default().with_size(Accessor::field("size"));
        let data = model(vec![row(0.0, 5.0, 20.0)]);
        let (x, y) = scales();
        let sizes = SizeScales::compute(&config, &data);
        let points = on_screen_points(&config, &data, &x, &y, &sizes);
        let b = bleed(&points, &x, &y, 12.0, &HeuristicTextMeasurer);
        assert!((b.left - 12.0).abs() < 1e-9);
        assert_eq!((b.top, b.bottom, b.right), (0.0, 0.0, 0.0));
    }

    #[test]
    fn labels_extend_the_bleed() {
        let config = ScatterConfig::default()
            .with_size(Accessor::field("size"))
            .with_label(Accessor::func(|_: &Row, _| Some(String::from("label"))));
        let data = model(vec![row(5.0, 0.0, 0.0)]);
        let (x, y) = scales();
        let sizes = SizeScales::compute(&config, &data);
        let points = on_screen_points(&config, &data, &x, &y, &sizes);
        let b = bleed(&points, &x, &y, 10.0, &HeuristicTextMeasurer);
        // Hanging label: 4px gap plus 10px of text below the bottom edge.
        assert!((b.bottom - 1.2 * 14.0).abs() < 1e-9);
    }
}
