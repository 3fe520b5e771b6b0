// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Marks: the unit of reconciliation.

extern crate alloc;

use alloc::string::String;

use kurbo::{BezPath, Point, Rect, Shape};
use peniko::Brush;
use smallvec::SmallVec;

use crate::attrs::{Attribute, AttributeValue};

/// A selector names the visual role of a mark (for example `"point"` or `"point-label"`).
///
/// Attribute injection and event registration are keyed by selector.
pub type Selector = &'static str;

/// Stable identity of a mark across renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkId(pub u64);

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

fn fnv1a(seed: u64, bytes: &[u8]) -> u64 {
    let mut h = seed;
    for b in bytes {
        h ^= u64::from(*b);
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

fn mix(a: u64, b: u64) -> u64 {
    // splitmix64 finalizer over the combined words.
    let mut z = a ^ b.wrapping_add(0x9e37_79b9_7f4a_7c15).rotate_left(17);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

impl MarkId {
    /// Wraps a raw id.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Derives an id from a namespace and a string key.
    pub fn for_key(namespace: u64, key: &str) -> Self {
        Self(mix(namespace, fnv1a(FNV_OFFSET, key.as_bytes())))
    }

    /// Derives an id from a namespace and a positional index.
    pub fn for_index(namespace: u64, index: u64) -> Self {
        Self(mix(namespace, index))
    }

    /// Derives a child id (e.g. the label belonging to a point).
    pub fn child(self, tag: u64) -> Self {
        Self(mix(self.0, tag))
    }

    /// Derives a child id from a string key.
    pub fn child_key(self, key: &str) -> Self {
        Self::for_key(self.0, key)
    }
}

/// The kind of a mark payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkKind {
    /// Axis-aligned rectangle.
    Rect,
    /// Arbitrary path.
    Path,
    /// Single line of text.
    Text,
}

/// Horizontal text anchoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextAnchor {
    /// Text starts at the anchor point.
    Start,
    /// Text is centered on the anchor point.
    Middle,
    /// Text ends at the anchor point.
    End,
}

/// Vertical text baseline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextBaseline {
    /// The anchor is on the alphabetic baseline.
    Alphabetic,
    /// The anchor is on the vertical middle of the text.
    Middle,
    /// The anchor is on the top of the text.
    Hanging,
    /// The anchor is on the ideographic baseline.
    Ideographic,
}

/// Rectangle payload.
#[derive(Clone, Debug, PartialEq)]
pub struct RectPayload {
    /// Geometry in scene coordinates.
    pub rect: Rect,
    /// Corner radius.
    pub corner_radius: f64,
    /// Fill paint.
    pub fill: Brush,
    /// Stroke paint.
    pub stroke: Brush,
    /// Stroke width; `0` disables the stroke.
    pub stroke_width: f64,
}

impl RectPayload {
    /// A filled rectangle without stroke or rounding.
    pub fn new(rect: Rect, fill: impl Into<Brush>) -> Self {
        Self {
            rect,
            corner_radius: 0.0,
            fill: fill.into(),
            stroke: Brush::default(),
            stroke_width: 0.0,
        }
    }
}

/// Path payload.
#[derive(Clone, Debug, PartialEq)]
pub struct PathPayload {
    /// Path geometry in scene coordinates.
    pub path: BezPath,
    /// Fill paint.
    pub fill: Brush,
    /// Stroke paint.
    pub stroke: Brush,
    /// Stroke width; `0` disables the stroke.
    pub stroke_width: f64,
}

/// Text payload.
#[derive(Clone, Debug, PartialEq)]
pub struct TextPayload {
    /// Anchor position.
    pub pos: Point,
    /// Unshaped text.
    pub text: String,
    /// Font size in scene units.
    pub font_size: f64,
    /// Horizontal anchor.
    pub anchor: TextAnchor,
    /// Vertical baseline.
    pub baseline: TextBaseline,
    /// Fill paint.
    pub fill: Brush,
}

/// The visual content of a mark.
#[derive(Clone, Debug, PartialEq)]
pub enum MarkPayload {
    /// Rectangle.
    Rect(RectPayload),
    /// Path.
    Path(PathPayload),
    /// Text.
    Text(TextPayload),
}

impl MarkPayload {
    /// Returns the payload kind.
    pub fn kind(&self) -> MarkKind {
        match self {
            Self::Rect(_) => MarkKind::Rect,
            Self::Path(_) => MarkKind::Path,
            Self::Text(_) => MarkKind::Text,
        }
    }

    /// Returns geometric bounds, if the payload has intrinsic geometry.
    ///
    /// Text has no intrinsic bounds without a text measurer.
    pub fn bounds(&self) -> Option<Rect> {
        match self {
            Self::Rect(r) => Some(r.rect),
            Self::Path(p) => {
                if p.path.elements().is_empty() {
                    None
                } else {
                    Some(p.path.bounding_box().inflate(p.stroke_width * 0.5, p.stroke_width * 0.5))
                }
            }
            Self::Text(_) => None,
        }
    }
}

/// A mark: a payload with identity, role and paint order.
#[derive(Clone, Debug, PartialEq)]
pub struct Mark {
    /// Stable identity.
    pub id: MarkId,
    /// Visual role.
    pub selector: Selector,
    /// Paint order; ties are broken by raise order, then by id.
    pub z_index: i32,
    /// Target visual state.
    pub payload: MarkPayload,
    /// Starting state for entering elements. Defaults to `payload`.
    pub enter_from: Option<MarkPayload>,
    /// Final state for exiting elements. Defaults to the last displayed payload.
    pub exit_to: Option<MarkPayload>,
    /// Pointer cursor style.
    pub cursor: Option<String>,
    /// Injected attributes.
    pub attributes: SmallVec<[Attribute; 2]>,
}

impl Mark {
    /// Creates a mark with the given payload.
    pub fn new(id: MarkId, selector: Selector, payload: MarkPayload) -> Self {
        Self {
            id,
            selector,
            z_index: 0,
            payload,
            enter_from: None,
            exit_to: None,
            cursor: None,
            attributes: SmallVec::new(),
        }
    }

    /// Creates a rectangle mark.
    pub fn rect(id: MarkId, selector: Selector, payload: RectPayload) -> Self {
        Self::new(id, selector, MarkPayload::Rect(payload))
    }

    /// Creates a path mark.
    pub fn path(id: MarkId, selector: Selector, payload: PathPayload) -> Self {
        Self::new(id, selector, MarkPayload::Path(payload))
    }

    /// Creates a text mark.
    pub fn text(id: MarkId, selector: Selector, payload: TextPayload) -> Self {
        Self::new(id, selector, MarkPayload::Text(payload))
    }

    /// Returns the payload kind.
    pub fn kind(&self) -> MarkKind {
        self.payload.kind()
    }

    /// Sets the z-index.
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    /// Sets the payload an entering element starts from.
    pub fn with_enter_from(mut self, from: MarkPayload) -> Self {
        self.enter_from = Some(from);
        self
    }

    /// Sets the payload an exiting element animates to.
    pub fn with_exit_to(mut self, to: MarkPayload) -> Self {
        self.exit_to = Some(to);
        self
    }

    /// Sets the pointer cursor.
    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Appends an injected attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.push(Attribute {
            name: name.into(),
            value,
        });
        self
    }

    /// Appends several injected attributes.
    pub fn with_attributes(mut self, attrs: impl IntoIterator<Item = Attribute>) -> Self {
        self.attributes.extend(attrs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_ids_are_deterministic_and_distinct() {
        let a = MarkId::for_key(1, "alpha");
        assert_eq!(a, MarkId::for_key(1, "alpha"));
        assert_ne!(a, MarkId::for_key(2, "alpha"));
        assert_ne!(a, MarkId::for_key(1, "beta"));
        assert_ne!(a.child(1), a.child(2));
        assert_ne!(MarkId::for_index(7, 0), MarkId::for_index(7, 1));
    }

    #[test]
    fn path_bounds_include_stroke() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((10.0, 0.0));
        let payload = MarkPayload::Path(PathPayload {
            path,
            fill: Brush::default(),
            stroke: Brush::default(),
            stroke_width: 4.0,
        });
        let b = payload.bounds().unwrap();
        assert!((b.y0 + 2.0).abs() < 1e-9);
        assert!((b.y1 - 2.0).abs() < 1e-9);
    }
}
