// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Containers own the view: they size their components, install shared scales, forward
//! pointer input and pump animation frames.
//!
//! Components draw in plot-local coordinates. A container arranges the plot rectangle inside
//! its view from the configured margin plus the components' bleed, and translates pointer
//! positions into plot-local coordinates before hit testing.

extern crate alloc;

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Point;
use quilt_core::{ElementTree, EventType, FrameClock, MarkId, PointerEvent, svg_document};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::component::{Component, XyComponent};
use crate::layout::{ContainerLayout, Size};
use crate::scale::{ScaleContinuous, ScaleLinear};
use crate::spacing::Spacing;

/// Tick count used when snapping domains to nice values.
const NICE_TICKS: usize = 10;

/// Container configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContainerConfig {
    /// Outer view size.
    pub size: Size,
    /// Space reserved around the plot, before bleed.
    pub margin: Spacing,
    /// Transition duration override for renders started by the container.
    pub duration: Option<f64>,
    /// Fixed x domain; the union of the components' extents when unset.
    pub x_domain: Option<(f64, f64)>,
    /// Fixed y domain; the union of the components' extents when unset.
    pub y_domain: Option<(f64, f64)>,
    /// Extend computed domains to nice round values.
    pub nice: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            size: Size::new(600.0, 400.0),
            margin: Spacing::ZERO,
            duration: None,
            x_domain: None,
            y_domain: None,
            nice: false,
        }
    }
}

impl ContainerConfig {
    /// Sets the view size.
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    /// Sets the margin.
    pub fn with_margin(mut self, margin: Spacing) -> Self {
        self.margin = margin;
        self
    }

    /// Overrides the components' transition duration.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Fixes the x domain.
    pub fn with_x_domain(mut self, domain: (f64, f64)) -> Self {
        self.x_domain = Some(domain);
        self
    }

    /// Fixes the y domain.
    pub fn with_y_domain(mut self, domain: (f64, f64)) -> Self {
        self.y_domain = Some(domain);
        self
    }

    /// Snaps computed domains to nice values.
    pub fn with_nice(mut self, nice: bool) -> Self {
        self.nice = nice;
        self
    }
}

/// An element in component `.0` of a container.
type Target = (usize, MarkId);

/// Frame pumping, pointer translation and hover tracking shared by both containers.
#[derive(Debug, Default)]
struct Host {
    clock: FrameClock,
    layout: Option<ContainerLayout>,
    // The element that last received `PointerEnter`.
    hovered: Option<Target>,
}

impl Host {
    fn tick(&mut self, now_ms: f64) -> &FrameClock {
        self.clock.tick(now_ms);
        trace!(frame = self.clock.frame(), now_ms, "container frame");
        &self.clock
    }

    fn to_local(&self, point: Point) -> Point {
        match &self.layout {
            Some(l) => Point::new(point.x - l.plot.x0, point.y - l.plot.y0),
            None => point,
        }
    }

    fn view_box(&self, size: Size) -> kurbo::Rect {
        self.layout.map_or(
            kurbo::Rect::new(0.0, 0.0, size.width, size.height),
            |l| l.plot_local_view_box(),
        )
    }

    /// Turns a pointer event into deliveries, given the element now under the pointer.
    ///
    /// Enter and leave follow the tracked hover target, not the hit: moving onto a new
    /// element leaves the previous one, and `PointerLeave` always reaches the element that
    /// was entered, wherever the pointer is.
    fn route(
        &mut self,
        kind: EventType,
        hit: Option<Target>,
    ) -> SmallVec<[(Target, EventType); 3]> {
        let mut out = SmallVec::new();
        match kind {
            EventType::PointerLeave => {
                out.extend(self.hovered.take().map(|t| (t, EventType::PointerLeave)));
            }
            EventType::PointerEnter | EventType::PointerMove => {
                if hit != self.hovered {
                    out.extend(self.hovered.take().map(|t| (t, EventType::PointerLeave)));
                    out.extend(hit.map(|t| (t, EventType::PointerEnter)));
                    self.hovered = hit;
                }
                if kind == EventType::PointerMove {
                    out.extend(hit.map(|t| (t, EventType::PointerMove)));
                }
            }
            _ => out.extend(hit.map(|t| (t, kind))),
        }
        out
    }
}

/// Delivers `kind` at `point` (plot-local) to element `target` of `component`.
fn deliver(component: &mut dyn Component, target: MarkId, kind: EventType, point: Point) -> bool {
    let handled = component.dispatch_event(target, &PointerEvent::new(kind, point));
    trace!(?kind, target = target.0, handled, "pointer delivered");
    handled
}

/// A container holding one component that brings its own geometry.
#[derive(Debug)]
pub struct SingleContainer<C> {
    config: ContainerConfig,
    component: C,
    host: Host,
}

impl<C: Component> SingleContainer<C> {
    /// Wraps `component`. Nothing is drawn until [`SingleContainer::render`].
    pub fn new(config: ContainerConfig, component: C) -> Self {
        Self {
            config,
            component,
            host: Host::default(),
        }
    }

    /// The current configuration.
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Replaces the configuration and re-renders.
    pub fn set_config(&mut self, config: ContainerConfig) {
        self.config = config;
        self.render(None);
    }

    /// Changes the view size and re-renders.
    pub fn resize(&mut self, size: Size) {
        debug!(width = size.width, height = size.height, "container resized");
        self.config.size = size;
        self.render(None);
    }

    /// The wrapped component.
    pub fn component(&self) -> &C {
        &self.component
    }

    /// Mutable access to the wrapped component.
    pub fn component_mut(&mut self) -> &mut C {
        &mut self.component
    }

    /// The last arrangement, if rendered.
    pub fn layout(&self) -> Option<&ContainerLayout> {
        self.host.layout.as_ref()
    }

    /// Arranges the plot and renders the component.
    ///
    /// `duration` takes precedence over the configured duration override.
    pub fn render(&mut self, duration: Option<f64>) {
        let first = ContainerLayout::arrange(self.config.size, self.config.margin, Spacing::ZERO);
        self.component.set_size(first.plot_size());
        let bleed = self.component.bleed();
        let layout = if bleed.is_zero() {
            first
        } else {
            let l = ContainerLayout::arrange(self.config.size, self.config.margin, bleed);
            self.component.set_size(l.plot_size());
            l
        };
        self.host.layout = Some(layout);
        self.component.render(duration.or(self.config.duration));
    }

    /// Advances to `now_ms`.
    pub fn animation_frame(&mut self, now_ms: f64) {
        let clock = *self.host.tick(now_ms);
        self.component.animation_frame(&clock);
    }

    /// Delivers a pointer event at `point`, in view coordinates.
    ///
    /// Pointer moves also send `PointerLeave` and `PointerEnter` when the hovered element
    /// changes. Returns `true` if any delivery was handled.
    pub fn dispatch_pointer(&mut self, kind: EventType, point: Point) -> bool {
        let local = self.host.to_local(point);
        let hit = self.component.elements().hit_test(local).map(|id| (0, id));
        let mut handled = false;
        for ((_, id), ev) in self.host.route(kind, hit) {
            handled |= deliver(&mut self.component, id, ev, local);
        }
        handled
    }

    /// Returns `true` while the component is animating or has deferred work.
    pub fn is_busy(&self) -> bool {
        self.component.is_busy()
    }

    /// Serializes the view as a standalone SVG document.
    pub fn to_svg_string(&self) -> String {
        svg_document(
            self.host.view_box(self.config.size),
            &[self.component.elements()],
        )
    }

    /// Destroys the component.
    pub fn destroy(&mut self) {
        self.host.hovered = None;
        self.component.destroy();
    }
}

/// A container whose components share x/y scales.
pub struct XyContainer {
    config: ContainerConfig,
    components: Vec<Box<dyn XyComponent>>,
    x_scale: ScaleContinuous,
    y_scale: ScaleContinuous,
    host: Host,
}

impl core::fmt::Debug for XyContainer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("XyContainer")
            .field("config", &self.config)
            .field("components", &self.components.len())
            .field("x_scale", &self.x_scale)
            .field("y_scale", &self.y_scale)
            .field("host", &self.host)
            .finish()
    }
}

impl XyContainer {
    /// Creates a container for `components`.
    pub fn new(config: ContainerConfig, components: Vec<Box<dyn XyComponent>>) -> Self {
        Self {
            config,
            components,
            x_scale: ScaleContinuous::linear(),
            y_scale: ScaleContinuous::linear(),
            host: Host::default(),
        }
    }

    /// Adds a component. Takes effect on the next render.
    pub fn push(&mut self, component: Box<dyn XyComponent>) {
        self.components.push(component);
    }

    /// The components, in paint order.
    pub fn components(&self) -> &[Box<dyn XyComponent>] {
        &self.components
    }

    /// Mutable access to component `i`.
    pub fn component_mut(&mut self, i: usize) -> Option<&mut (dyn XyComponent + 'static)> {
        self.components.get_mut(i).map(|c| &mut **c)
    }

    /// The current configuration.
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Replaces the configuration and re-renders.
    pub fn set_config(&mut self, config: ContainerConfig) {
        self.config = config;
        self.render(None);
    }

    /// Changes the view size and re-renders.
    pub fn resize(&mut self, size: Size) {
        debug!(width = size.width, height = size.height, "container resized");
        self.config.size = size;
        self.render(None);
    }

    /// The installed x scale.
    pub fn x_scale(&self) -> &ScaleContinuous {
        &self.x_scale
    }

    /// The installed y scale.
    pub fn y_scale(&self) -> &ScaleContinuous {
        &self.y_scale
    }

    /// The last arrangement, if rendered.
    pub fn layout(&self) -> Option<&ContainerLayout> {
        self.host.layout.as_ref()
    }

    fn domains(&self) -> ((f64, f64), (f64, f64)) {
        let union = |extents: &mut dyn Iterator<Item = Option<(f64, f64)>>| {
            extents
                .flatten()
                .reduce(|a, b| (a.0.min(b.0), a.1.max(b.1)))
        };
        let nice = |d: (f64, f64)| {
            if self.config.nice {
                ScaleLinear::new(d, (0.0, 1.0)).nice(NICE_TICKS).domain()
            } else {
                d
            }
        };
        let x = self.config.x_domain.unwrap_or_else(|| {
            union(&mut self.components.iter().map(|c| c.x_extent())).map_or((0.0, 1.0), nice)
        });
        let y = self.config.y_domain.unwrap_or_else(|| {
            union(&mut self.components.iter().map(|c| c.y_extent())).map_or((0.0, 1.0), nice)
        });
        (x, y)
    }

    fn install(&mut self, layout: &ContainerLayout, x: (f64, f64), y: (f64, f64)) {
        let plot = layout.plot_size();
        self.x_scale = ScaleContinuous::linear()
            .with_domain(x)
            .with_range((0.0, plot.width));
        self.y_scale = ScaleContinuous::linear()
            .with_domain(y)
            .with_range((plot.height, 0.0));
        for c in &mut self.components {
            c.set_size(plot);
            c.set_scales(self.x_scale, self.y_scale);
        }
    }

    /// Computes domains, arranges the plot around the components' bleed and renders them.
    pub fn render(&mut self, duration: Option<f64>) {
        let (x, y) = self.domains();
        let first = ContainerLayout::arrange(self.config.size, self.config.margin, Spacing::ZERO);
        self.install(&first, x, y);
        let bleed = self
            .components
            .iter()
            .map(|c| c.bleed())
            .fold(Spacing::ZERO, Spacing::max);
        let layout = if bleed.is_zero() {
            first
        } else {
            let l = ContainerLayout::arrange(self.config.size, self.config.margin, bleed);
            self.install(&l, x, y);
            l
        };
        debug!(
            x_domain = ?x,
            y_domain = ?y,
            bleed = ?bleed,
            "xy container arranged"
        );
        self.host.layout = Some(layout);
        let duration = duration.or(self.config.duration);
        for c in &mut self.components {
            c.render(duration);
        }
    }

    /// Advances to `now_ms`.
    pub fn animation_frame(&mut self, now_ms: f64) {
        let clock = *self.host.tick(now_ms);
        for c in &mut self.components {
            c.animation_frame(&clock);
        }
    }

    /// Delivers a pointer event at `point`, in view coordinates, to the topmost component
    /// with an element under it.
    ///
    /// Hover changes are tracked across components the same way as in
    /// [`SingleContainer::dispatch_pointer`].
    pub fn dispatch_pointer(&mut self, kind: EventType, point: Point) -> bool {
        let local = self.host.to_local(point);
        let hit = self
            .components
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, c)| c.elements().hit_test(local).map(|id| (i, id)));
        let mut handled = false;
        for ((i, id), ev) in self.host.route(kind, hit) {
            if let Some(c) = self.components.get_mut(i) {
                handled |= deliver(c, id, ev, local);
            }
        }
        handled
    }

    /// Returns `true` while any component is animating or has deferred work.
    pub fn is_busy(&self) -> bool {
        self.components.iter().any(|c| c.is_busy())
    }

    /// Serializes the view as a standalone SVG document.
    pub fn to_svg_string(&self) -> String {
        let trees: Vec<&ElementTree> = self.components.iter().map(|c| c.elements()).collect();
        svg_document(self.host.view_box(self.config.size), &trees)
    }

    /// Destroys every component.
    pub fn destroy(&mut self) {
        self.host.hovered = None;
        for c in &mut self.components {
            c.destroy();
        }
    }
}
