// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chart layout and rendering components for `quilt_core`.
//!
//! Each component turns caller records into stable-identity marks and reconciles them into a
//! retained element tree with enter/update/exit transitions:
//! - [`scatter::Scatter`] lays out points against shared x/y scales, culls off-screen points,
//!   reports the bleed its glyphs and labels need, and hides overlapping labels on the next
//!   animation frame.
//! - [`treemap::Treemap`] groups records into a hierarchy and tiles it with squarified
//!   rectangles.
//! - [`sankey::Sankey`] lays out a flow graph with collapsible subtrees, a layout scale and
//!   fit-to-view.
//!
//! Containers ([`SingleContainer`], [`XyContainer`]) own the view size and margins, install
//! scales, translate pointer input and pump animation frames.
//!
//! Records are read through [`Accessor`]s: constants, field keys resolved through [`Record`],
//! or closures. Text shaping is out of scope; label bounds come from a [`TextMeasurer`].

#![no_std]

extern crate alloc;

mod accessor;
mod collide;
mod color;
mod component;
mod container;
mod data_model;
#[cfg(not(feature = "std"))]
mod float;
mod label;
mod layout;
mod measure;
mod record;
mod scale;
mod spacing;
mod symbol;

pub mod sankey;
pub mod scatter;
pub mod treemap;
pub mod z_order;

pub use accessor::{Accessor, SeriesAccessor};
pub use collide::{CollisionOutcome, LabelCandidate, resolve_collisions};
pub use color::{
    PALETTE_LEN, adjust_lightness, palette, palette_color, parse_color, resolve_color,
    with_opacity,
};
pub use component::{Component, ComponentCore, DEFAULT_DURATION, XyComponent};
pub use container::{ContainerConfig, SingleContainer, XyContainer};
pub use data_model::{DataModel, GeoBounds};
pub use label::{LABEL_GAP, LabelPlacement, Position, label_bounds, place_label, truncate_to_width};
pub use layout::{ContainerLayout, Size};
pub use measure::{HeuristicTextMeasurer, TextMeasurer};
pub use record::{FromValue, Record, Value};
pub use scale::{ScaleContinuous, ScaleLinear, ScaleLog, ScaleOrdinal, ScalePow, infer_domain};
pub use spacing::Spacing;
pub use symbol::Symbol;
