// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Greedy label collision resolution.
//!
//! Force-shown labels are visited first, then the remaining labels. Each group keeps the
//! order of the candidates and a label is hidden if it overlaps one that was already
//! accepted, so a force-shown label only loses to an earlier force-shown label.

extern crate alloc;

use alloc::vec::Vec;

use kurbo::Rect;
use quilt_core::{ElementTree, MarkId};
use tracing::trace;

/// A label taking part in collision resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelCandidate {
    /// The label's element id.
    pub id: MarkId,
    /// Estimated bounds.
    pub bounds: Rect,
    /// Hovered labels are always shown.
    pub force_show: bool,
}

/// Result of a collision pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionOutcome {
    /// Labels left visible, in acceptance order.
    pub visible: Vec<MarkId>,
    /// Labels hidden because they overlap a visible one.
    pub hidden: Vec<MarkId>,
}

impl CollisionOutcome {
    /// Applies the outcome as element style opacity (`1` visible, `0` hidden).
    pub fn apply(&self, elements: &mut ElementTree) {
        let shown = self.visible.iter().map(|id| (*id, 1.0));
        let hidden = self.hidden.iter().map(|id| (*id, 0.0));
        for (id, opacity) in shown.chain(hidden) {
            if let Err(err) = elements.set_style_opacity(id, Some(opacity)) {
                trace!(%err, "label left the tree before its collision pass");
            }
        }
    }
}

// Touching edges have zero intersection area and do not count.
fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.intersect(*b).area() > 0.0
}

/// Resolves collisions among `candidates`, given in drawing order.
pub fn resolve_collisions(candidates: &[LabelCandidate]) -> CollisionOutcome {
    let mut accepted: Vec<Rect> = Vec::with_capacity(candidates.len());
    let mut out = CollisionOutcome::default();

    let forced = candidates.iter().filter(|c| c.force_show);
    let rest = candidates.iter().filter(|c| !c.force_show);
    for c in forced.chain(rest) {
        if accepted.iter().any(|r| overlaps(r, &c.bounds)) {
            out.hidden.push(c.id);
        } else {
            accepted.push(c.bounds);
            out.visible.push(c.id);
        }
    }
    trace!(
        visible = out.visible.len(),
        hidden = out.hidden.len(),
        "resolved label collisions"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(id: u64, x: f64, force_show: bool) -> LabelCandidate {
        LabelCandidate {
            id: MarkId::from_raw(id),
            bounds: Rect::new(x, 0.0, x + 10.0, 10.0),
            force_show,
        }
    }

    #[test]
    fn later_overlapping_label_is_hidden() {
        let out = resolve_collisions(&[label(1, 0.0, false), label(2, 5.0, false)]);
        assert_eq!(out.visible, [MarkId::from_raw(1)]);
        assert_eq!(out.hidden, [MarkId::from_raw(2)]);
    }

    #[test]
    fn force_shown_label_wins_regardless_of_order() {
        let out = resolve_collisions(&[label(1, 0.0, false), label(2, 5.0, true)]);
        assert_eq!(out.visible, [MarkId::from_raw(2)]);
        assert_eq!(out.hidden, [MarkId::from_raw(1)]);
    }

    #[test]
    fn later_of_two_force_shown_labels_is_hidden() {
        let out = resolve_collisions(&[
            label(1, 0.0, true),
            label(2, 5.0, true),
            label(3, 30.0, false),
        ]);
        assert_eq!(out.visible, [MarkId::from_raw(1), MarkId::from_raw(3)]);
        assert_eq!(out.hidden, [MarkId::from_raw(2)]);
    }

    #[test]
    fn apply_skips_labels_missing_from_the_tree() {
        let mut elements = ElementTree::default();
        let out = resolve_collisions(&[label(1, 0.0, false), label(2, 5.0, false)]);
        out.apply(&mut elements);
        assert!(elements.is_empty());
    }

    #[test]
    fn touching_edges_do_not_collide() {
        let out = resolve_collisions(&[label(1, 0.0, false), label(2, 10.0, false)]);
        assert!(out.hidden.is_empty());
    }
}
