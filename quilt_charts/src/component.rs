// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The component contract and the state every component shares.
//!
//! A component owns its config, data, the [`Scene`] of its last render and the retained
//! [`ElementTree`]. Hosts (usually a container) drive it through [`Component`]:
//! size it, ask for bleed, render, pump animation frames and forward pointer events.

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;

use quilt_core::{
    DiffSummary, ElementTree, FrameClock, Mark, MarkId, PointerEvent, Scene, svg_document,
};
use tracing::debug;

use crate::layout::Size;
use crate::scale::ScaleContinuous;
use crate::spacing::Spacing;

/// Default transition duration in milliseconds.
pub const DEFAULT_DURATION: f64 = 600.0;

/// The host-facing contract of a chart component.
pub trait Component {
    /// Sets the drawing area, in pixels.
    fn set_size(&mut self, size: Size);

    /// The drawing area.
    fn size(&self) -> Size;

    /// Space the component needs outside its drawing area.
    fn bleed(&self) -> Spacing {
        Spacing::ZERO
    }

    /// Lays out the current data and reconciles the element tree.
    ///
    /// `duration` overrides the configured transition duration for this call.
    fn render(&mut self, duration: Option<f64>);

    /// Advances transitions and runs work deferred to this frame.
    fn animation_frame(&mut self, clock: &FrameClock);

    /// The retained elements.
    fn elements(&self) -> &ElementTree;

    /// Delivers a pointer event to the element `target`.
    ///
    /// Returns `true` if the target is one of this component's elements.
    fn dispatch_event(&mut self, target: MarkId, event: &PointerEvent) -> bool;

    /// Returns `true` while transitions or deferred work are outstanding.
    fn is_busy(&self) -> bool {
        self.elements().is_animating()
    }

    /// Cancels deferred work and detaches every element.
    fn destroy(&mut self);
}

/// A component drawn against shared x/y scales.
pub trait XyComponent: Component {
    /// `(min, max)` of the component's x values.
    fn x_extent(&self) -> Option<(f64, f64)>;

    /// `(min, max)` of the component's y values.
    fn y_extent(&self) -> Option<(f64, f64)>;

    /// Installs the container's scales.
    fn set_scales(&mut self, x: ScaleContinuous, y: ScaleContinuous);
}

impl<C: Component + ?Sized> Component for Box<C> {
    fn set_size(&mut self, size: Size) {
        (**self).set_size(size);
    }

    fn size(&self) -> Size {
        (**self).size()
    }

    fn bleed(&self) -> Spacing {
        (**self).bleed()
    }

    fn render(&mut self, duration: Option<f64>) {
        (**self).render(duration);
    }

    fn animation_frame(&mut self, clock: &FrameClock) {
        (**self).animation_frame(clock);
    }

    fn elements(&self) -> &ElementTree {
        (**self).elements()
    }

    fn dispatch_event(&mut self, target: MarkId, event: &PointerEvent) -> bool {
        (**self).dispatch_event(target, event)
    }

    fn is_busy(&self) -> bool {
        (**self).is_busy()
    }

    fn destroy(&mut self) {
        (**self).destroy();
    }
}

/// Render state shared by every component.
#[derive(Debug, Default)]
pub struct ComponentCore {
    scene: Scene,
    elements: ElementTree,
    clock: FrameClock,
    size: Size,
    destroyed: bool,
}

impl ComponentCore {
    /// Fresh state with an empty element tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconciles `marks` against the previous render and starts transitions.
    pub fn commit(&mut self, name: &'static str, marks: Vec<Mark>, duration: f64) -> DiffSummary {
        let diffs = self.scene.tick(marks);
        let summary = DiffSummary::of(&diffs);
        self.elements.apply(&diffs, duration);
        debug!(
            component = name,
            entered = summary.entered,
            updated = summary.updated,
            changed = summary.changed,
            exited = summary.exited,
            duration,
            "rendered"
        );
        summary
    }

    /// Moves to the host's frame and advances transitions.
    pub fn advance(&mut self, clock: &FrameClock) {
        self.clock = *clock;
        self.elements.advance(clock.now_ms());
    }

    /// The last frame seen.
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// The retained elements.
    pub fn elements(&self) -> &ElementTree {
        &self.elements
    }

    /// Mutable access to the retained elements.
    pub fn elements_mut(&mut self) -> &mut ElementTree {
        &mut self.elements
    }

    /// The mark submitted for `id` in the last render.
    pub fn mark(&self, id: MarkId) -> Option<&Mark> {
        self.scene.get(id)
    }

    /// The drawing area.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Sets the drawing area.
    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    /// Returns `true` after [`ComponentCore::destroy`].
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Forgets the previous render and detaches every element.
    pub fn destroy(&mut self) {
        let _ = self.scene.clear();
        self.elements.clear();
        self.destroyed = true;
    }

    /// Serializes the elements with the drawing area as view box.
    pub fn to_svg_string(&self) -> alloc::string::String {
        svg_document(
            kurbo::Rect::new(0.0, 0.0, self.size.width, self.size.height),
            &[&self.elements],
        )
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use kurbo::Rect;
    use peniko::Color;
    use quilt_core::RectPayload;

    use super::*;

    #[test]
    fn commit_and_destroy() {
        let mut core = ComponentCore::new();
        let mark = Mark::rect(
            MarkId::from_raw(7),
            "tile",
            RectPayload::new(Rect::new(0.0, 0.0, 1.0, 1.0), Color::from_rgb8(1, 2, 3)),
        );
        let s = core.commit("test", vec![mark.clone()], 0.0);
        assert_eq!(s.entered, 1);
        let s = core.commit("test", vec![mark], 0.0);
        assert_eq!((s.entered, s.exited), (0, 0));
        assert_eq!(core.elements().len(), 1);

        core.destroy();
        assert!(core.is_destroyed());
        assert!(core.elements().is_empty());
        assert!(core.mark(MarkId::from_raw(7)).is_none());
    }
}
