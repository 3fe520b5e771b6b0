// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Enter/update/exit reconciliation.

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use kurbo::Rect;
use tracing::trace;

use crate::mark::{Mark, MarkId, MarkKind};

/// One reconciliation record.
#[derive(Clone, Debug, PartialEq)]
pub enum MarkDiff {
    /// A mark present now but not before.
    Enter {
        /// Mark id.
        id: MarkId,
        /// Payload kind.
        kind: MarkKind,
        /// Paint order.
        z_index: i32,
        /// Bounds of the new payload.
        bounds: Option<Rect>,
        /// The new mark.
        new: Box<Mark>,
    },
    /// A mark present before and now.
    Update {
        /// Mark id.
        id: MarkId,
        /// Payload kind of the new mark.
        kind: MarkKind,
        /// Previous paint order.
        old_z_index: i32,
        /// New paint order.
        new_z_index: i32,
        /// Bounds of the previous payload.
        old_bounds: Option<Rect>,
        /// Bounds of the new payload.
        new_bounds: Option<Rect>,
        /// Whether anything about the mark changed.
        changed: bool,
        /// The new mark.
        new: Box<Mark>,
    },
    /// A mark present before but not now.
    Exit {
        /// Mark id.
        id: MarkId,
        /// Payload kind.
        kind: MarkKind,
        /// Bounds of the last payload.
        bounds: Option<Rect>,
        /// The removed mark.
        old: Box<Mark>,
    },
}

impl MarkDiff {
    /// Returns the id this record refers to.
    pub fn id(&self) -> MarkId {
        match self {
            Self::Enter { id, .. } | Self::Update { id, .. } | Self::Exit { id, .. } => *id,
        }
    }
}

/// Counts of each reconciliation category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Entering marks.
    pub entered: usize,
    /// Updating marks (changed or not).
    pub updated: usize,
    /// Updating marks whose content changed.
    pub changed: usize,
    /// Exiting marks.
    pub exited: usize,
}

impl DiffSummary {
    /// Tallies a diff list.
    pub fn of(diffs: &[MarkDiff]) -> Self {
        let mut s = Self::default();
        for d in diffs {
            match d {
                MarkDiff::Enter { .. } => s.entered += 1,
                MarkDiff::Update { changed, .. } => {
                    s.updated += 1;
                    if *changed {
                        s.changed += 1;
                    }
                }
                MarkDiff::Exit { .. } => s.exited += 1,
            }
        }
        s
    }
}

/// Reconciles `old` against `new`.
///
/// Enter and update records follow the order of `new`; exit records follow `old_order`.
/// When `new` contains a duplicate id, the first occurrence wins and later ones are dropped.
pub fn diff_marks(old: &HashMap<MarkId, Mark>, old_order: &[MarkId], new: &[Mark]) -> Vec<MarkDiff> {
    let mut out = Vec::with_capacity(new.len());
    let mut seen: HashSet<MarkId> = HashSet::with_capacity(new.len());

    for mark in new {
        if !seen.insert(mark.id) {
            trace!(id = mark.id.0, "dropping duplicate mark id");
            continue;
        }
        match old.get(&mark.id) {
            Some(prev) => out.push(MarkDiff::Update {
                id: mark.id,
                kind: mark.kind(),
                old_z_index: prev.z_index,
                new_z_index: mark.z_index,
                old_bounds: prev.payload.bounds(),
                new_bounds: mark.payload.bounds(),
                changed: prev != mark,
                new: Box::new(mark.clone()),
            }),
            None => out.push(MarkDiff::Enter {
                id: mark.id,
                kind: mark.kind(),
                z_index: mark.z_index,
                bounds: mark.payload.bounds(),
                new: Box::new(mark.clone()),
            }),
        }
    }

    for id in old_order {
        if seen.contains(id) {
            continue;
        }
        if let Some(prev) = old.get(id) {
            out.push(MarkDiff::Exit {
                id: *id,
                kind: prev.kind(),
                bounds: prev.payload.bounds(),
                old: Box::new(prev.clone()),
            });
        }
    }

    out
}
