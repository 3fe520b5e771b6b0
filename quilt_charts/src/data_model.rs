// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Caller data plus derived aggregates.

extern crate alloc;

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use tracing::debug;

use crate::accessor::{Accessor, SeriesAccessor};
use crate::record::Record;
use crate::scale::infer_domain;

/// An ordered collection of caller records.
///
/// Records are reference counted so geometry nodes can point back at their datum without
/// copying it.
pub struct DataModel<D> {
    data: Vec<Rc<D>>,
    version: u64,
}

impl<D> Default for DataModel<D> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            version: 0,
        }
    }
}

impl<D> Clone for DataModel<D> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            version: self.version,
        }
    }
}

impl<D> fmt::Debug for DataModel<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataModel")
            .field("len", &self.data.len())
            .field("version", &self.version)
            .finish()
    }
}

impl<D> DataModel<D> {
    /// An empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the records.
    pub fn set_data(&mut self, data: Vec<D>) {
        self.data = data.into_iter().map(Rc::new).collect();
        self.version += 1;
        debug!(len = self.data.len(), version = self.version, "replaced data");
    }

    /// The records, in input order.
    pub fn data(&self) -> &[Rc<D>] {
        &self.data
    }

    /// The record at `index`.
    pub fn get(&self, index: usize) -> Option<&Rc<D>> {
        self.data.get(index)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if there are no records.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Incremented by every [`DataModel::set_data`].
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl<D: Record> DataModel<D> {
    /// `(min, max)` of an accessor over every record; undefined values are skipped.
    pub fn extent(&self, accessor: &Accessor<D, f64>) -> Option<(f64, f64)> {
        infer_domain(
            self.data
                .iter()
                .enumerate()
                .filter_map(|(i, d)| accessor.resolve(d, i)),
        )
    }

    /// `(min, max)` of a per-series accessor over `groups` series and every record.
    pub fn series_extent(
        &self,
        accessor: &SeriesAccessor<D, f64>,
        groups: usize,
    ) -> Option<(f64, f64)> {
        infer_domain((0..groups).flat_map(|j| {
            self.data
                .iter()
                .enumerate()
                .filter_map(move |(i, d)| accessor.resolve(d, i, j))
        }))
    }

    /// The bounding box of geographic points, padded by `padding_degrees`.
    ///
    /// Latitudes are clamped to `[-90, 90]` and longitudes to `[-180, 180]`.
    pub fn lat_lng_bounds(
        &self,
        latitude: &Accessor<D, f64>,
        longitude: &Accessor<D, f64>,
        padding_degrees: f64,
    ) -> Option<GeoBounds> {
        let (lat_min, lat_max) = self.extent(latitude)?;
        let (lng_min, lng_max) = self.extent(longitude)?;
        Some(GeoBounds {
            north_west: (
                (lat_max + padding_degrees).clamp(-90.0, 90.0),
                (lng_min - padding_degrees).clamp(-180.0, 180.0),
            ),
            south_east: (
                (lat_min - padding_degrees).clamp(-90.0, 90.0),
                (lng_max + padding_degrees).clamp(-180.0, 180.0),
            ),
        })
    }
}

/// Geographic bounds as `(latitude, longitude)` corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoBounds {
    /// North-west corner.
    pub north_west: (f64, f64),
    /// South-east corner.
    pub south_east: (f64, f64),
}
