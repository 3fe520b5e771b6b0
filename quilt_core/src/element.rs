// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The retained element tree.
//!
//! An [`ElementTree`] plays the role of the DOM: it holds one [`Element`] per live mark id,
//! applies reconciliation records with transitions, and keeps paint order. Exiting elements
//! stay attached until their exit transition completes.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{Point, Rect};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::trace;

use crate::attrs::Attribute;
use crate::diff::MarkDiff;
use crate::mark::{Mark, MarkId, MarkPayload, Selector};
use crate::transition::{Easing, Transition, Tween};

/// Errors returned by element operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElementError {
    /// No live element has this id.
    #[error("unknown element {0:?}")]
    Unknown(MarkId),
}

/// Lifecycle phase of an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementPhase {
    /// Transitioning in after an enter.
    Entering,
    /// Transitioning after an update.
    Updating,
    /// Transitioning out; detached when done.
    Exiting,
    /// At rest.
    Settled,
}

/// A live element.
#[derive(Clone, Debug)]
pub struct Element {
    id: MarkId,
    selector: Selector,
    z_index: i32,
    order: u64,
    phase: ElementPhase,
    cursor: Option<String>,
    attributes: SmallVec<[Attribute; 2]>,
    payload: Tween<MarkPayload>,
    opacity: Tween<f64>,
    exit_to: Option<MarkPayload>,
    display: MarkPayload,
    display_opacity: f64,
    style_opacity: Option<f64>,
}

impl Element {
    /// Element id.
    pub fn id(&self) -> MarkId {
        self.id
    }

    /// Visual role.
    pub fn selector(&self) -> Selector {
        self.selector
    }

    /// Paint order class.
    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> ElementPhase {
        self.phase
    }

    /// Pointer cursor.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Injected attributes.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// The currently displayed payload.
    pub fn payload(&self) -> &MarkPayload {
        &self.display
    }

    /// The payload this element is transitioning to.
    pub fn target_payload(&self) -> &MarkPayload {
        self.payload.target()
    }

    /// The currently displayed lifecycle opacity.
    pub fn opacity(&self) -> f64 {
        self.display_opacity
    }

    /// The style opacity override (`None` means unset).
    pub fn style_opacity(&self) -> Option<f64> {
        self.style_opacity
    }

    /// Lifecycle opacity multiplied by the style override.
    pub fn effective_opacity(&self) -> f64 {
        self.display_opacity * self.style_opacity.unwrap_or(1.0)
    }

    fn refresh(&mut self, now_ms: f64) {
        self.display = self.payload.sample(now_ms);
        self.display_opacity = self.opacity.sample(now_ms);
    }

    fn is_done(&self, now_ms: f64) -> bool {
        self.payload.is_done(now_ms) && self.opacity.is_done(now_ms)
    }

    fn adopt(&mut self, mark: &Mark) {
        self.selector = mark.selector;
        self.z_index = mark.z_index;
        self.cursor.clone_from(&mark.cursor);
        self.attributes.clone_from(&mark.attributes);
        self.exit_to.clone_from(&mark.exit_to);
    }
}

/// The retained set of live elements.
#[derive(Debug)]
pub struct ElementTree {
    elements: HashMap<MarkId, Element>,
    next_order: u64,
    now_ms: f64,
    easing: Easing,
}

impl Default for ElementTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            elements: HashMap::new(),
            next_order: 0,
            now_ms: 0.0,
            easing: Easing::default(),
        }
    }

    /// Sets the easing used for subsequent transitions.
    pub fn set_easing(&mut self, easing: Easing) {
        self.easing = easing;
    }

    /// The tree's notion of the current time.
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Applies reconciliation records, starting transitions at the current time.
    pub fn apply(&mut self, diffs: &[MarkDiff], duration_ms: f64) {
        let now = self.now_ms;
        let transition = Transition::new(now, duration_ms, self.easing);

        for diff in diffs {
            match diff {
                MarkDiff::Enter { new, .. } | MarkDiff::Update { new, .. } => {
                    self.upsert(new, transition, now);
                }
                MarkDiff::Exit { id, .. } => {
                    let Some(el) = self.elements.get_mut(id) else {
                        continue;
                    };
                    let to = el.exit_to.clone().unwrap_or_else(|| el.display.clone());
                    el.payload.retarget(to, transition, now);
                    el.opacity.retarget(0.0, transition, now);
                    el.phase = ElementPhase::Exiting;
                    el.refresh(now);
                }
            }
        }

        // Zero-duration exits detach right away.
        self.elements
            .retain(|_, el| !(el.phase == ElementPhase::Exiting && el.is_done(now)));
    }

    fn upsert(&mut self, mark: &Mark, transition: Transition, now: f64) {
        if let Some(el) = self.elements.get_mut(&mark.id) {
            el.adopt(mark);
            el.payload.retarget(mark.payload.clone(), transition, now);
            el.opacity.retarget(1.0, transition, now);
            el.phase = if transition.is_done(now) {
                ElementPhase::Settled
            } else {
                ElementPhase::Updating
            };
            el.refresh(now);
            return;
        }

        let from = mark.enter_from.clone().unwrap_or_else(|| mark.payload.clone());
        let order = self.next_order;
        self.next_order += 1;
        let mut el = Element {
            id: mark.id,
            selector: mark.selector,
            z_index: mark.z_index,
            order,
            phase: if transition.is_done(now) {
                ElementPhase::Settled
            } else {
                ElementPhase::Entering
            },
            cursor: mark.cursor.clone(),
            attributes: mark.attributes.clone(),
            payload: Tween::new(from.clone(), mark.payload.clone(), transition),
            opacity: Tween::new(0.0, 1.0, transition),
            exit_to: mark.exit_to.clone(),
            display: from,
            display_opacity: 0.0,
            style_opacity: None,
        };
        el.refresh(now);
        self.elements.insert(mark.id, el);
    }

    /// Advances time, settling finished transitions and detaching finished exits.
    ///
    /// Returns the number of detached elements.
    pub fn advance(&mut self, now_ms: f64) -> usize {
        self.now_ms = now_ms.max(self.now_ms);
        let now = self.now_ms;
        let before = self.elements.len();
        self.elements.retain(|_, el| {
            el.refresh(now);
            if el.is_done(now) {
                if el.phase == ElementPhase::Exiting {
                    return false;
                }
                el.phase = ElementPhase::Settled;
            }
            true
        });
        let removed = before - self.elements.len();
        if removed > 0 {
            trace!(removed, "detached exited elements");
        }
        removed
    }

    /// Returns `true` while any element is transitioning.
    pub fn is_animating(&self) -> bool {
        self.elements
            .values()
            .any(|el| el.phase != ElementPhase::Settled)
    }

    /// Looks up a live element.
    pub fn get(&self, id: MarkId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Number of attached elements, exiting ones included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterates attached elements with the given selector, in paint order.
    pub fn select(&self, selector: Selector) -> impl Iterator<Item = &Element> {
        self.paint_order()
            .into_iter()
            .filter(move |el| el.selector == selector)
    }

    /// Moves an element above its siblings of the same z-index.
    pub fn raise(&mut self, id: MarkId) -> Result<(), ElementError> {
        let order = self.next_order;
        let el = self.elements.get_mut(&id).ok_or(ElementError::Unknown(id))?;
        el.order = order;
        self.next_order += 1;
        Ok(())
    }

    /// Sets or clears the style opacity override of an element.
    pub fn set_style_opacity(
        &mut self,
        id: MarkId,
        opacity: Option<f64>,
    ) -> Result<(), ElementError> {
        let el = self.elements.get_mut(&id).ok_or(ElementError::Unknown(id))?;
        el.style_opacity = opacity;
        Ok(())
    }

    /// Elements sorted by `(z_index, raise order, id)`; later elements paint on top.
    pub fn paint_order(&self) -> Vec<&Element> {
        let mut out: Vec<&Element> = self.elements.values().collect();
        out.sort_by_key(|el| (el.z_index, el.order, el.id));
        out
    }

    /// Returns the topmost non-exiting, visible element whose bounds contain `point`.
    pub fn hit_test(&self, point: Point) -> Option<MarkId> {
        self.paint_order()
            .into_iter()
            .rev()
            .filter(|el| el.phase != ElementPhase::Exiting && el.effective_opacity() > 0.0)
            .find(|el| el.display.bounds().is_some_and(|b| contains(b, point)))
            .map(|el| el.id)
    }

    /// Detaches every element immediately.
    pub fn clear(&mut self) {
        self.elements.clear();
    }
}

fn contains(r: Rect, p: Point) -> bool {
    p.x >= r.x0 && p.x <= r.x1 && p.y >= r.y0 && p.y <= r.y1
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use kurbo::Rect;
    use peniko::Color;

    use super::*;
    use crate::mark::RectPayload;
    use crate::scene::Scene;

    fn square(key: u64, x: f64) -> Mark {
        Mark::rect(
            MarkId::for_index(3, key),
            "cell",
            RectPayload::new(
                Rect::new(x, 0.0, x + 10.0, 10.0),
                Color::from_rgba8(10, 20, 30, 255),
            ),
        )
    }

    fn x0(el: &Element) -> f64 {
        el.payload().bounds().unwrap().x0
    }

    #[test]
    fn enter_fades_in_and_settles() {
        let mut scene = Scene::new();
        let mut tree = ElementTree::new();
        tree.apply(&scene.tick(vec![square(0, 0.0)]), 100.0);

        let el = tree.get(MarkId::for_index(3, 0)).unwrap();
        assert_eq!(el.phase(), ElementPhase::Entering);
        assert!(el.opacity().abs() < 1e-12);

        tree.advance(100.0);
        let el = tree.get(MarkId::for_index(3, 0)).unwrap();
        assert_eq!(el.phase(), ElementPhase::Settled);
        assert!((el.opacity() - 1.0).abs() < 1e-12);
        assert!(!tree.is_animating());
    }

    #[test]
    fn update_moves_and_exit_detaches_after_duration() {
        let mut scene = Scene::new();
        let mut tree = ElementTree::new();
        tree.apply(&scene.tick(vec![square(0, 0.0), square(1, 20.0)]), 0.0);

        tree.apply(&scene.tick(vec![square(0, 40.0)]), 200.0);
        assert_eq!(tree.len(), 2);
        let exiting = tree.get(MarkId::for_index(3, 1)).unwrap();
        assert_eq!(exiting.phase(), ElementPhase::Exiting);

        tree.advance(100.0);
        let moving = tree.get(MarkId::for_index(3, 0)).unwrap();
        assert!((x0(moving) - 20.0).abs() < 1e-9);

        assert_eq!(tree.advance(200.0), 1);
        assert!(tree.get(MarkId::for_index(3, 1)).is_none());
        assert!((x0(tree.get(MarkId::for_index(3, 0)).unwrap()) - 40.0).abs() < 1e-12);
    }

    #[test]
    fn zero_duration_exit_detaches_immediately() {
        let mut scene = Scene::new();
        let mut tree = ElementTree::new();
        tree.apply(&scene.tick(vec![square(0, 0.0)]), 0.0);
        tree.apply(&scene.tick(vec![]), 0.0);
        assert!(tree.is_empty());
    }

    #[test]
    fn reentering_element_is_revived() {
        let mut scene = Scene::new();
        let mut tree = ElementTree::new();
        tree.apply(&scene.tick(vec![square(0, 0.0)]), 0.0);
        tree.apply(&scene.tick(vec![]), 100.0);
        tree.advance(50.0);
        tree.apply(&scene.tick(vec![square(0, 0.0)]), 100.0);
        tree.advance(500.0);
        let el = tree.get(MarkId::for_index(3, 0)).unwrap();
        assert_eq!(el.phase(), ElementPhase::Settled);
        assert!((el.opacity() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn raise_changes_paint_order_and_hit_test() {
        let mut scene = Scene::new();
        let mut tree = ElementTree::new();
        tree.apply(&scene.tick(vec![square(0, 0.0), square(1, 5.0)]), 0.0);

        let p = Point::new(7.0, 5.0);
        assert_eq!(tree.hit_test(p), Some(MarkId::for_index(3, 1)));
        tree.raise(MarkId::for_index(3, 0)).unwrap();
        assert_eq!(tree.hit_test(p), Some(MarkId::for_index(3, 0)));
        assert_eq!(
            tree.raise(MarkId::from_raw(1)),
            Err(ElementError::Unknown(MarkId::from_raw(1)))
        );
    }

    #[test]
    fn style_opacity_is_independent_of_lifecycle() {
        let mut scene = Scene::new();
        let mut tree = ElementTree::new();
        tree.apply(&scene.tick(vec![square(0, 0.0)]), 0.0);
        let id = MarkId::for_index(3, 0);
        tree.set_style_opacity(id, Some(0.0)).unwrap();
        assert!(tree.get(id).unwrap().effective_opacity().abs() < 1e-12);
        assert_eq!(tree.hit_test(Point::new(1.0, 1.0)), None);
        tree.set_style_opacity(id, None).unwrap();
        assert_eq!(tree.get(id).unwrap().style_opacity(), None);
    }
}
