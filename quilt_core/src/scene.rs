// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The retained mark set of the previous render.

extern crate alloc;

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::diff::{MarkDiff, diff_marks};
use crate::mark::{Mark, MarkId};

/// Remembers the last mark set and produces diffs against the next one.
#[derive(Debug, Default)]
pub struct Scene {
    marks: HashMap<MarkId, Mark>,
    order: Vec<MarkId>,
}

impl Scene {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the mark set and returns the reconciliation records.
    pub fn tick(&mut self, marks: impl IntoIterator<Item = Mark>) -> Vec<MarkDiff> {
        let marks: Vec<Mark> = marks.into_iter().collect();
        let diffs = diff_marks(&self.marks, &self.order, &marks);

        self.marks.clear();
        self.order.clear();
        for mark in marks {
            if self.marks.contains_key(&mark.id) {
                continue;
            }
            self.order.push(mark.id);
            self.marks.insert(mark.id, mark);
        }
        diffs
    }

    /// Drops every mark, returning exit records for them.
    pub fn clear(&mut self) -> Vec<MarkDiff> {
        self.tick(core::iter::empty())
    }

    /// Returns the mark with the given id from the last tick.
    pub fn get(&self, id: MarkId) -> Option<&Mark> {
        self.marks.get(&id)
    }

    /// Number of marks from the last tick.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the last tick produced no marks.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates marks of the last tick in submission order.
    pub fn marks(&self) -> impl Iterator<Item = &Mark> {
        self.order.iter().filter_map(|id| self.marks.get(id))
    }
}
