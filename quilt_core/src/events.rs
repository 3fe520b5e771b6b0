// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event registration keyed by selector.

extern crate alloc;

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Point, Vec2};

use crate::mark::Selector;

/// Input event kinds a host can forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Primary button click.
    Click,
    /// Pointer entered an element.
    PointerEnter,
    /// Pointer left an element.
    PointerLeave,
    /// Pointer moved over an element.
    PointerMove,
    /// Button pressed.
    PointerDown,
    /// Button released.
    PointerUp,
    /// Scroll wheel.
    Wheel,
}

/// A host input event, already translated into scene coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    /// Event kind.
    pub kind: EventType,
    /// Pointer position in scene coordinates.
    pub position: Point,
    /// Scroll delta for wheel events.
    pub delta: Vec2,
}

impl PointerEvent {
    /// Creates an event with no scroll delta.
    pub fn new(kind: EventType, position: Point) -> Self {
        Self {
            kind,
            position,
            delta: Vec2::ZERO,
        }
    }
}

/// Callback invoked with the geometry node behind the target element.
pub type EventCallback<N> = Rc<dyn Fn(&N, &PointerEvent)>;

/// Selector -> event type -> callback table.
pub struct Events<N> {
    handlers: Vec<(Selector, EventType, EventCallback<N>)>,
}

impl<N> Events<N> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Registers a callback.
    pub fn on(
        mut self,
        selector: Selector,
        kind: EventType,
        callback: impl Fn(&N, &PointerEvent) + 'static,
    ) -> Self {
        self.handlers.push((selector, kind, Rc::new(callback)));
        self
    }

    /// Returns `true` if no callback is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invokes every callback registered for `selector` and the event kind.
    ///
    /// Returns the number of callbacks invoked.
    pub fn dispatch(&self, selector: Selector, node: &N, event: &PointerEvent) -> usize {
        let mut n = 0;
        for (s, kind, cb) in &self.handlers {
            if *s == selector && *kind == event.kind {
                cb(node, event);
                n += 1;
            }
        }
        n
    }
}

impl<N> Default for Events<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> Clone for Events<N> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<N> fmt::Debug for Events<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for (selector, kind, _) in &self.handlers {
            list.entry(&(selector, kind));
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;

    #[test]
    fn dispatch_matches_selector_and_kind() {
        let hits = Rc::new(Cell::new(0_u32));
        let h = hits.clone();
        let events = Events::<u32>::new().on("point", EventType::Click, move |n, _| {
            h.set(h.get() + *n);
        });

        let click = PointerEvent::new(EventType::Click, Point::ZERO);
        let hover = PointerEvent::new(EventType::PointerEnter, Point::ZERO);
        assert_eq!(events.dispatch("point", &5, &click), 1);
        assert_eq!(events.dispatch("point", &5, &hover), 0);
        assert_eq!(events.dispatch("tile", &5, &click), 0);
        assert_eq!(hits.get(), 5);
    }
}
