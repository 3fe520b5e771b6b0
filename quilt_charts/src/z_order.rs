// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Z-order conventions for chart-generated marks.
//!
//! Elements paint sorted by `(z_index, raise order, MarkId)`, so raising a hovered element
//! only reorders it among marks of the same layer.

/// Treemap tiles.
pub const TILES: i32 = 0;
/// Sankey links, drawn behind nodes.
pub const LINKS: i32 = 5;
/// Sankey nodes.
pub const NODES: i32 = 10;
/// Scatter points.
pub const POINTS: i32 = 20;
/// Node icons drawn on top of nodes.
pub const ICONS: i32 = 30;
/// Backdrops behind sankey labels.
pub const LABEL_BACKGROUNDS: i32 = 35;
/// Labels.
pub const LABELS: i32 = 40;
