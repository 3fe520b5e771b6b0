// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental render runtime for data-bound charts.
//!
//! Chart components describe what should be on screen as a flat list of [`Mark`]s, each
//! carrying a stable [`MarkId`]. The runtime takes it from there:
//! - [`Scene`] remembers the previous mark set and reconciles it against the next one into
//!   [`MarkDiff::Enter`], [`MarkDiff::Update`] and [`MarkDiff::Exit`] records.
//! - [`ElementTree`] is the retained render target. It applies diffs with timed transitions,
//!   keeps paint order, and can be serialized to SVG.
//! - [`Deferred`] and [`FrameClock`] model work postponed to the next animation frame.
//!
//! Attribute injection ([`Attributes`]) and event registration ([`Events`]) are keyed by mark
//! selector so hosts can address every element generated for the same visual role.

#![no_std]

extern crate alloc;

mod attrs;
mod diff;
mod element;
mod events;
mod frame;
mod mark;
mod scene;
mod svg;
mod transition;

pub use attrs::{Attribute, AttributeSpec, AttributeValue, Attributes};
pub use diff::{DiffSummary, MarkDiff, diff_marks};
pub use element::{Element, ElementError, ElementPhase, ElementTree};
pub use events::{EventCallback, EventType, Events, PointerEvent};
pub use frame::{Deferred, FrameClock, FrameHandle};
pub use mark::{
    Mark, MarkId, MarkKind, MarkPayload, PathPayload, RectPayload, Selector, TextAnchor,
    TextBaseline, TextPayload,
};
pub use scene::Scene;
pub use svg::svg_document;
pub use transition::{Easing, Interpolate, Transition, Tween};
