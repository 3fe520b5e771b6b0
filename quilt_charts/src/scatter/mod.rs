// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scatter plot component.
//!
//! Points are laid out against the x/y scales installed by the container. Only points whose
//! footprint falls inside the visible window are drawn. Labels that overlap an already
//! visible label are hidden by a collision pass that runs on the next animation frame;
//! hovering a point force-shows its label.

extern crate alloc;

mod config;
mod layout;

use alloc::boxed::Box;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use peniko::Color;
use quilt_core::{
    Deferred, ElementPhase, ElementTree, EventType, FrameClock, Mark, MarkId, MarkPayload,
    PathPayload, PointerEvent, TextPayload,
};
use tracing::{debug, trace};

pub use config::{ScatterConfig, ScatterOption, SizeDomain};
pub use layout::ScatterPoint;

use crate::collide::{LabelCandidate, resolve_collisions};
use crate::component::{Component, ComponentCore, XyComponent};
use crate::data_model::DataModel;
use crate::label::{label_bounds, place_label};
use crate::layout::Size;
use crate::measure::{HeuristicTextMeasurer, TextMeasurer};
use crate::record::Record;
use crate::scale::ScaleContinuous;
use crate::spacing::Spacing;
use crate::z_order;

use layout::SizeScales;

/// Selectors of the elements a scatter plot generates.
pub mod selectors {
    use quilt_core::Selector;

    /// Point glyphs.
    pub const POINT: Selector = "point";
    /// Point labels.
    pub const POINT_LABEL: Selector = "point-label";
}

const DEFAULT_LABEL_COLOR: Color = Color::from_rgb8(0x5b, 0x5f, 0x6d);

#[derive(Debug)]
struct CollideLabels;

/// A scatter plot.
pub struct Scatter<D> {
    config: ScatterConfig<D>,
    data: DataModel<D>,
    core: ComponentCore,
    x_scale: ScaleContinuous,
    y_scale: ScaleContinuous,
    size_scales: SizeScales,
    points: Vec<Vec<ScatterPoint<D>>>,
    // Element id -> (series, slot) in `points`.
    nodes: HashMap<MarkId, (usize, usize)>,
    // Point ids whose label is force-shown.
    force_show: HashSet<MarkId>,
    collide: Deferred<CollideLabels>,
    measurer: Box<dyn TextMeasurer>,
}

impl<D> core::fmt::Debug for Scatter<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scatter")
            .field("config", &self.config)
            .field("data", &self.data)
            .field("x_scale", &self.x_scale)
            .field("y_scale", &self.y_scale)
            .field("points", &self.points.iter().map(Vec::len).sum::<usize>())
            .field("force_show", &self.force_show)
            .finish_non_exhaustive()
    }
}

impl<D: Record> Scatter<D> {
    /// Creates a scatter plot without data.
    pub fn new(config: ScatterConfig<D>) -> Self {
        let data = DataModel::new();
        let size_scales = SizeScales::compute(&config, &data);
        Self {
            config,
            data,
            core: ComponentCore::new(),
            x_scale: ScaleContinuous::linear(),
            y_scale: ScaleContinuous::linear(),
            size_scales,
            points: Vec::new(),
            nodes: HashMap::new(),
            force_show: HashSet::new(),
            collide: Deferred::new(),
            measurer: Box::new(HeuristicTextMeasurer),
        }
    }

    /// Replaces the text measurer used for label boxes.
    pub fn with_measurer(mut self, measurer: impl TextMeasurer + 'static) -> Self {
        self.measurer = Box::new(measurer);
        self
    }

    /// The current configuration.
    pub fn config(&self) -> &ScatterConfig<D> {
        &self.config
    }

    /// Replaces the configuration. Takes effect on the next render.
    pub fn set_config(&mut self, config: ScatterConfig<D>) {
        let changed = self.config.diff(&config);
        debug!(changed = ?changed.as_slice(), "scatter config replaced");
        self.config = config;
        if changed.iter().any(|o| o.affects_size_scale()) {
            self.size_scales = SizeScales::compute(&self.config, &self.data);
        }
    }

    /// Replaces the data. Takes effect on the next render.
    pub fn set_data(&mut self, data: Vec<D>) {
        self.data.set_data(data);
        self.size_scales = SizeScales::compute(&self.config, &self.data);
    }

    /// The data model.
    pub fn data(&self) -> &DataModel<D> {
        &self.data
    }

    /// The on-screen points of the last render, one list per series.
    pub fn points(&self) -> &[Vec<ScatterPoint<D>>] {
        &self.points
    }

    /// The point behind an element of the last render (glyph or label).
    pub fn point(&self, id: MarkId) -> Option<&ScatterPoint<D>> {
        let &(g, k) = self.nodes.get(&id)?;
        self.points.get(g)?.get(k)
    }

    /// The x scale.
    pub fn x_scale(&self) -> &ScaleContinuous {
        &self.x_scale
    }

    /// The y scale.
    pub fn y_scale(&self) -> &ScaleContinuous {
        &self.y_scale
    }

    /// Returns `true` if the label of point `id` is force-shown.
    pub fn is_force_shown(&self, id: MarkId) -> bool {
        self.force_show.contains(&id)
    }

    /// Returns `true` while a collision pass waits for the next frame.
    pub fn collision_pending(&self) -> bool {
        self.collide.is_pending()
    }

    fn on_screen(&self) -> Vec<Vec<ScatterPoint<D>>> {
        layout::on_screen_points(
            &self.config,
            &self.data,
            &self.x_scale,
            &self.y_scale,
            &self.size_scales,
        )
    }

    fn has_labels(&self) -> bool {
        self.config.label.is_some() && self.points.iter().flatten().any(|p| p.label.is_some())
    }

    fn marks(&self, points: &[Vec<ScatterPoint<D>>]) -> Vec<Mark> {
        let cfg = &self.config;
        let mut marks = Vec::new();
        for p in points.iter().flatten() {
            let center = p.center(&self.x_scale, &self.y_scale);
            let (stroke, stroke_width) = match p.stroke_color {
                Some(c) => (c, p.stroke_width),
                None => (Color::TRANSPARENT, 0.0),
            };
            marks.push(
                Mark::path(
                    p.id,
                    selectors::POINT,
                    PathPayload {
                        path: p.shape.path(center.x, center.y, p.size_px),
                        fill: p.color.into(),
                        stroke: stroke.into(),
                        stroke_width,
                    },
                )
                .with_z_index(z_order::POINTS)
                .with_cursor(p.cursor.clone())
                .with_attributes(cfg.attributes.resolve(selectors::POINT, p)),
            );

            let Some(text) = p.label.clone() else {
                continue;
            };
            let placement = place_label(center, p.size_px * 0.5, p.label_position);
            marks.push(
                Mark::text(
                    p.label_id(),
                    selectors::POINT_LABEL,
                    TextPayload {
                        pos: placement.pos,
                        text,
                        font_size: cfg.label_font_size,
                        anchor: placement.anchor,
                        baseline: placement.baseline,
                        fill: p.label_color.unwrap_or(DEFAULT_LABEL_COLOR).into(),
                    },
                )
                .with_z_index(z_order::LABELS)
                .with_attributes(cfg.attributes.resolve(selectors::POINT_LABEL, p)),
            );
        }
        marks
    }

    fn resolve_label_overlap(&mut self) {
        if !self.config.label_hide_overlapping {
            self.collide.cancel();
            let labels: Vec<MarkId> = self
                .core
                .elements()
                .select(selectors::POINT_LABEL)
                .map(|el| el.id())
                .collect();
            for id in labels {
                if let Err(err) = self.core.elements_mut().set_style_opacity(id, None) {
                    trace!(%err, "label opacity not cleared");
                }
            }
            return;
        }
        let handle = self.collide.schedule(self.core.clock(), CollideLabels);
        trace!(handle = handle.0, "scheduled label collision pass");
    }

    // Labels are visited in render order (series, then record) rather than raise order, so
    // the outcome after a hover ends matches the one before it started.
    fn collide_labels(&mut self) {
        let elements = self.core.elements();
        let mut candidates: Vec<((usize, usize), LabelCandidate)> = elements
            .select(selectors::POINT_LABEL)
            .filter(|el| el.phase() != ElementPhase::Exiting)
            .filter_map(|el| {
                let MarkPayload::Text(t) = el.target_payload() else {
                    return None;
                };
                let bounds = label_bounds(
                    &t.text,
                    t.font_size,
                    t.pos,
                    t.anchor,
                    t.baseline,
                    self.measurer.as_ref(),
                );
                let slot = *self.nodes.get(&el.id())?;
                let force_show = self
                    .point(el.id())
                    .is_some_and(|p| self.force_show.contains(&p.id));
                Some((
                    slot,
                    LabelCandidate {
                        id: el.id(),
                        bounds,
                        force_show,
                    },
                ))
            })
            .collect();
        candidates.sort_by_key(|(slot, _)| *slot);
        let candidates: Vec<LabelCandidate> = candidates.into_iter().map(|(_, c)| c).collect();
        resolve_collisions(&candidates).apply(self.core.elements_mut());
    }

    fn set_hover(&mut self, point: MarkId, hovered: bool) {
        if hovered {
            self.force_show.insert(point);
            let label = self.point(point).map(|p| p.label_id());
            let elements = self.core.elements_mut();
            for id in core::iter::once(point).chain(label) {
                if let Err(err) = elements.raise(id) {
                    trace!(%err, "hovered element not raised");
                }
            }
        } else {
            self.force_show.remove(&point);
        }
        if self.has_labels() {
            self.resolve_label_overlap();
        }
    }
}

impl<D: Record> Component for Scatter<D> {
    fn set_size(&mut self, size: Size) {
        self.core.set_size(size);
        self.x_scale.set_range((0.0, size.width));
        self.y_scale.set_range((size.height, 0.0));
    }

    fn size(&self) -> Size {
        self.core.size()
    }

    fn bleed(&self) -> Spacing {
        layout::bleed(
            &self.on_screen(),
            &self.x_scale,
            &self.y_scale,
            self.config.label_font_size,
            self.measurer.as_ref(),
        )
    }

    fn render(&mut self, duration: Option<f64>) {
        if self.core.is_destroyed() {
            return;
        }
        let points = self.on_screen();
        let marks = self.marks(&points);
        self.core.commit(
            "scatter",
            marks,
            duration.unwrap_or(self.config.duration),
        );

        self.nodes.clear();
        for (g, series) in points.iter().enumerate() {
            for (k, p) in series.iter().enumerate() {
                self.nodes.insert(p.id, (g, k));
                if p.label.is_some() {
                    self.nodes.insert(p.label_id(), (g, k));
                }
            }
        }
        self.points = points;
        let nodes = &self.nodes;
        self.force_show.retain(|id| nodes.contains_key(id));

        if self.has_labels() {
            self.resolve_label_overlap();
        }
    }

    fn animation_frame(&mut self, clock: &FrameClock) {
        self.core.advance(clock);
        if self.collide.take_due(clock).is_some() {
            self.collide_labels();
        }
    }

    fn elements(&self) -> &ElementTree {
        self.core.elements()
    }

    fn dispatch_event(&mut self, target: MarkId, event: &PointerEvent) -> bool {
        let Some(selector) = self.core.elements().get(target).map(|el| el.selector()) else {
            return false;
        };
        let Some(point_id) = self.point(target).map(|p| p.id) else {
            return false;
        };
        if selector == selectors::POINT {
            match event.kind {
                EventType::PointerEnter => self.set_hover(point_id, true),
                EventType::PointerLeave => self.set_hover(point_id, false),
                _ => {}
            }
        }
        if let Some(point) = self.point(target) {
            self.config.events.dispatch(selector, point, event);
        }
        true
    }

    fn is_busy(&self) -> bool {
        self.core.elements().is_animating() || self.collide.is_pending()
    }

    fn destroy(&mut self) {
        self.collide.cancel();
        self.core.destroy();
        self.points.clear();
        self.nodes.clear();
        self.force_show.clear();
    }
}

impl<D: Record> XyComponent for Scatter<D> {
    fn x_extent(&self) -> Option<(f64, f64)> {
        self.data.extent(&self.config.x)
    }

    fn y_extent(&self) -> Option<(f64, f64)> {
        self.data.series_extent(&self.config.y, self.config.y.len())
    }

    fn set_scales(&mut self, x: ScaleContinuous, y: ScaleContinuous) {
        self.x_scale = x;
        self.y_scale = y;
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::collections::BTreeMap;
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::vec;
    use core::cell::Cell;

    use kurbo::Point;
    use quilt_core::Events;

    use super::*;
    use crate::accessor::Accessor;
    use crate::label::Position;

    type Row = BTreeMap<String, f64>;

    fn row(x: f64, y: f64) -> Row {
        let mut m = BTreeMap::new();
        m.insert("x".into(), x);
        m.insert("y".into(), y);
        m
    }

    fn labelled() -> ScatterConfig<Row> {
        ScatterConfig::default()
            .with_duration(0.0)
            .with_label(Accessor::func(|_: &Row, i| Some(alloc::format!("label {i}"))))
            .with_label_position(Accessor::constant(Position::Right))
    }

    fn plot(config: ScatterConfig<Row>, rows: Vec<Row>) -> Scatter<Row> {
        let mut s = Scatter::new(config);
        s.set_data(rows);
        s.set_size(Size::new(100.0, 100.0));
        s.set_scales(
            ScaleContinuous::linear()
                .with_domain((0.0, 10.0))
                .with_range((0.0, 100.0)),
            ScaleContinuous::linear()
                .with_domain((0.0, 10.0))
                .with_range((100.0, 0.0)),
        );
        s
    }

    fn frame(s: &mut Scatter<Row>, clock: &mut FrameClock, now: f64) {
        clock.tick(now);
        s.animation_frame(clock);
    }

    fn label_opacities(s: &Scatter<Row>) -> Vec<Option<f64>> {
        s.points()
            .iter()
            .flatten()
            .map(|p| s.elements().get(p.label_id()).and_then(|el| el.style_opacity()))
            .collect()
    }

    #[test]
    fn rerender_without_changes_enters_nothing() {
        let mut s = plot(ScatterConfig::default().with_duration(0.0), vec![row(1.0, 1.0), row(2.0, 2.0)]);
        s.render(None);
        assert_eq!(s.elements().len(), 2);
        let summary = s.core.commit("scatter", s.marks(&s.points), 0.0);
        assert_eq!((summary.entered, summary.exited), (0, 0));
    }

    #[test]
    fn overlapping_labels_hide_on_the_next_frame() {
        let mut clock = FrameClock::new();
        let mut s = plot(labelled(), vec![row(1.0, 1.0), row(1.1, 1.0)]);
        s.render(None);
        assert!(s.collision_pending());
        assert_eq!(label_opacities(&s), [None, None]);

        frame(&mut s, &mut clock, 16.0);
        assert!(!s.collision_pending());
        let mut op = label_opacities(&s);
        op.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(op, [Some(0.0), Some(1.0)]);
    }

    #[test]
    fn hover_force_shows_the_label() {
        let mut clock = FrameClock::new();
        let mut s = plot(labelled(), vec![row(1.0, 1.0), row(1.1, 1.0)]);
        s.render(None);
        frame(&mut s, &mut clock, 16.0);

        let hidden = s
            .points()
            .iter()
            .flatten()
            .find(|p| {
                s.elements().get(p.label_id()).and_then(|el| el.style_opacity()) == Some(0.0)
            })
            .map(|p| p.id)
            .unwrap();
        let ev = PointerEvent::new(EventType::PointerEnter, Point::ZERO);
        assert!(s.dispatch_event(hidden, &ev));
        assert!(s.is_force_shown(hidden));
        frame(&mut s, &mut clock, 32.0);
        let label = s.point(hidden).unwrap().label_id();
        assert_eq!(s.elements().get(label).unwrap().style_opacity(), Some(1.0));

        let ev = PointerEvent::new(EventType::PointerLeave, Point::ZERO);
        s.dispatch_event(hidden, &ev);
        assert!(!s.is_force_shown(hidden));
        assert!(s.collision_pending());
    }

    #[test]
    fn hover_then_leave_restores_the_collision_outcome() {
        let mut clock = FrameClock::new();
        let mut s = plot(labelled(), vec![row(1.0, 1.0), row(1.1, 1.0)]);
        s.render(None);
        frame(&mut s, &mut clock, 16.0);
        let before = label_opacities(&s);
        assert_eq!(before, [Some(1.0), Some(0.0)]);

        let mut now = 16.0;
        for k in [1, 0] {
            let id = s.points()[0][k].id;
            s.dispatch_event(id, &PointerEvent::new(EventType::PointerEnter, Point::ZERO));
            now += 16.0;
            frame(&mut s, &mut clock, now);
            assert_eq!(label_opacities(&s)[k], Some(1.0));
            assert_eq!(label_opacities(&s)[1 - k], Some(0.0));

            s.dispatch_event(id, &PointerEvent::new(EventType::PointerLeave, Point::ZERO));
            now += 16.0;
            frame(&mut s, &mut clock, now);
            assert_eq!(label_opacities(&s), before);
        }
    }

    #[test]
    fn disabled_hiding_leaves_opacity_unset() {
        let mut clock = FrameClock::new();
        let mut s = plot(
            labelled().with_label_hide_overlapping(false),
            vec![row(1.0, 1.0), row(1.1, 1.0)],
        );
        s.render(None);
        assert!(!s.collision_pending());
        frame(&mut s, &mut clock, 16.0);
        assert_eq!(label_opacities(&s), [None, None]);
    }

    #[test]
    fn events_reach_the_point() {
        let hits = Rc::new(Cell::new(0_usize));
        let seen = Rc::clone(&hits);
        let config = ScatterConfig::default()
            .with_duration(0.0)
            .with_events(Events::new().on(
                selectors::POINT,
                EventType::Click,
                move |p: &ScatterPoint<Row>, _| seen.set(seen.get() + p.point_index + 1),
            ));
        let mut s = plot(config, vec![row(1.0, 1.0), row(5.0, 5.0)]);
        s.render(None);
        let id = s.points()[0][1].id;
        assert!(s.dispatch_event(id, &PointerEvent::new(EventType::Click, Point::ZERO)));
        assert_eq!(hits.get(), 2);
        assert!(!s.dispatch_event(MarkId::from_raw(1), &PointerEvent::new(EventType::Click, Point::ZERO)));
    }

    #[test]
    fn destroy_cancels_the_pending_pass() {
        let mut s = plot(labelled(), vec![row(1.0, 1.0)]);
        s.render(None);
        assert!(s.collision_pending());
        s.destroy();
        assert!(!s.collision_pending());
        assert!(s.elements().is_empty());
        s.render(None);
        assert!(s.elements().is_empty());
    }

    #[test]
    fn shrinking_data_exits_points() {
        let mut s = plot(ScatterConfig::default(), vec![row(1.0, 1.0), row(2.0, 2.0)]);
        s.render(Some(0.0));
        s.set_data(vec![row(1.0, 1.0)]);
        s.render(Some(100.0));
        assert_eq!(s.elements().len(), 2);
        let mut clock = FrameClock::new();
        frame(&mut s, &mut clock, 200.0);
        assert_eq!(s.elements().len(), 1);
    }
}
