// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Symbol helpers for point glyphs.

use core::f64::consts::PI;

use kurbo::BezPath;

#[cfg(not(feature = "std"))]
use crate::float::FloatExt;
use crate::record::{FromValue, Value};

/// Point glyph shapes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Symbol {
    /// A circle.
    #[default]
    Circle,
    /// A square (axis-aligned).
    Square,
    /// An upward-pointing triangle.
    Triangle,
    /// A square rotated by 45 degrees.
    Diamond,
    /// A plus-shaped cross.
    Cross,
    /// A five-pointed star.
    Star,
    /// A three-armed wye.
    Wye,
}

impl Symbol {
    /// Parses a lowercase shape name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "circle" => Self::Circle,
            "square" => Self::Square,
            "triangle" => Self::Triangle,
            "diamond" => Self::Diamond,
            "cross" => Self::Cross,
            "star" => Self::Star,
            "wye" => Self::Wye,
            _ => return None,
        })
    }

    /// Returns a path for this symbol centered at `cx, cy`, fitting a `size`-wide box.
    pub fn path(self, cx: f64, cy: f64, size: f64) -> BezPath {
        let size = if size.is_finite() { size.max(0.0) } else { 0.0 };
        let r = size * 0.5;
        match self {
            Self::Circle => circle_path(cx, cy, r),
            Self::Square => polygon(&[(-r, -r), (r, -r), (r, r), (-r, r)], cx, cy),
            Self::Diamond => polygon(&[(0.0, -r), (r, 0.0), (0.0, r), (-r, 0.0)], cx, cy),
            Self::Triangle => {
                let pts = radial(3, r, -PI / 2.0);
                polygon(&pts, cx, cy)
            }
            Self::Cross => {
                let t = r / 3.0;
                polygon(
                    &[
                        (-t, -r),
                        (t, -r),
                        (t, -t),
                        (r, -t),
                        (r, t),
                        (t, t),
                        (t, r),
                        (-t, r),
                        (-t, t),
                        (-r, t),
                        (-r, -t),
                        (-t, -t),
                    ],
                    cx,
                    cy,
                )
            }
            Self::Star => {
                let outer = radial(5, r, -PI / 2.0);
                let inner = radial(5, r * 0.382, -PI / 2.0 + PI / 5.0);
                let pts: alloc::vec::Vec<(f64, f64)> = outer
                    .iter()
                    .zip(&inner)
                    .flat_map(|(o, i)| [*o, *i])
                    .collect();
                polygon(&pts, cx, cy)
            }
            Self::Wye => {
                let t = r / 4.0;
                let mut pts = alloc::vec::Vec::with_capacity(9);
                for k in 0..3 {
                    let a = -PI / 2.0 + f64::from(k) * 2.0 * PI / 3.0;
                    let (s, c) = (a.sin(), a.cos());
                    let (ps, pc) = ((a + PI / 2.0).sin(), (a + PI / 2.0).cos());
                    pts.push((-pc * t, -ps * t));
                    pts.push((c * r - pc * t, s * r - ps * t));
                    pts.push((c * r + pc * t, s * r + ps * t));
                }
                polygon(&pts, cx, cy)
            }
        }
    }
}

impl FromValue for Symbol {
    fn from_value(value: Value<'_>) -> Option<Self> {
        match value {
            Value::Str(s) => Self::from_name(s),
            _ => None,
        }
    }
}

fn radial(n: u32, r: f64, start: f64) -> alloc::vec::Vec<(f64, f64)> {
    (0..n)
        .map(|k| {
            let a = start + f64::from(k) * 2.0 * PI / f64::from(n);
            (a.cos() * r, a.sin() * r)
        })
        .collect()
}

fn polygon(pts: &[(f64, f64)], cx: f64, cy: f64) -> BezPath {
    let mut p = BezPath::new();
    for (i, (x, y)) in pts.iter().enumerate() {
        if i == 0 {
            p.move_to((cx + x, cy + y));
        } else {
            p.line_to((cx + x, cy + y));
        }
    }
    p.close_path();
    p
}

fn circle_path(cx: f64, cy: f64, r: f64) -> BezPath {
    // Four cubic quadrants: the element count is independent of the radius, so circles of
    // different sizes interpolate instead of snapping.
    const KAPPA: f64 = 0.552_284_749_830_793_4;
    let k = r * KAPPA;
    let mut p = BezPath::new();
    p.move_to((cx + r, cy));
    p.curve_to((cx + r, cy + k), (cx + k, cy + r), (cx, cy + r));
    p.curve_to((cx - k, cy + r), (cx - r, cy + k), (cx - r, cy));
    p.curve_to((cx - r, cy - k), (cx - k, cy - r), (cx, cy - r));
    p.curve_to((cx + k, cy - r), (cx + r, cy - k), (cx + r, cy));
    p.close_path();
    p
}

#[cfg(test)]
mod tests {
    extern crate std;

    use kurbo::Shape;

    use super::*;

    #[test]
    fn symbols_fit_their_box() {
        for s in [
            Symbol::Circle,
            Symbol::Square,
            Symbol::Triangle,
            Symbol::Diamond,
            Symbol::Cross,
            Symbol::Star,
            Symbol::Wye,
        ] {
            let b = s.path(10.0, 10.0, 8.0).bounding_box();
            assert!(b.x0 >= 6.0 - 1e-9 && b.x1 <= 14.0 + 1e-9, "{s:?} {b:?}");
            assert!(b.y0 >= 6.0 - 1e-9 && b.y1 <= 14.0 + 1e-9, "{s:?} {b:?}");
        }
    }

    #[test]
    fn parses_names() {
        assert_eq!(Symbol::from_value(Value::Str("star")), Some(Symbol::Star));
        assert_eq!(Symbol::from_value(Value::Str("blob")), None);
    }
}
