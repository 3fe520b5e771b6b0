// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Timed interpolation of visual state.

extern crate alloc;

use alloc::vec::Vec;

use kurbo::{BezPath, PathEl, Point, Rect};
use peniko::{Brush, Color};

use crate::mark::{MarkPayload, PathPayload, RectPayload, TextPayload};

/// Values that can be blended between two states.
///
/// `t` is in `[0, 1]`. Values that cannot be blended switch to `to` as soon as `t > 0`.
pub trait Interpolate: Sized {
    /// Blends `self` towards `to`.
    fn interpolate(&self, to: &Self, t: f64) -> Self;
}

impl Interpolate for f64 {
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        self + (to - self) * t
    }
}

impl Interpolate for Point {
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        self.lerp(*to, t)
    }
}

impl Interpolate for Rect {
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        Self::new(
            self.x0.interpolate(&to.x0, t),
            self.y0.interpolate(&to.y0, t),
            self.x1.interpolate(&to.x1, t),
            self.y1.interpolate(&to.y1, t),
        )
    }
}

impl Interpolate for Color {
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        #[allow(clippy::cast_possible_truncation, reason = "blend factor in [0, 1]")]
        let t = t as f32;
        let a = self.components;
        let b = to.components;
        Self::new([
            a[0] + (b[0] - a[0]) * t,
            a[1] + (b[1] - a[1]) * t,
            a[2] + (b[2] - a[2]) * t,
            a[3] + (b[3] - a[3]) * t,
        ])
    }
}

impl Interpolate for Brush {
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        match (self, to) {
            (Self::Solid(a), Self::Solid(b)) => Self::Solid(a.interpolate(b, t)),
            _ => snap(self, to, t),
        }
    }
}

impl Interpolate for BezPath {
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        let a = self.elements();
        let b = to.elements();
        if a.len() != b.len() {
            return snap(self, to, t);
        }
        let mut out = Vec::with_capacity(a.len());
        for (ea, eb) in a.iter().zip(b) {
            let el = match (ea, eb) {
                (PathEl::MoveTo(p), PathEl::MoveTo(q)) => PathEl::MoveTo(p.lerp(*q, t)),
                (PathEl::LineTo(p), PathEl::LineTo(q)) => PathEl::LineTo(p.lerp(*q, t)),
                (PathEl::QuadTo(p1, p2), PathEl::QuadTo(q1, q2)) => {
                    PathEl::QuadTo(p1.lerp(*q1, t), p2.lerp(*q2, t))
                }
                (PathEl::CurveTo(p1, p2, p3), PathEl::CurveTo(q1, q2, q3)) => {
                    PathEl::CurveTo(p1.lerp(*q1, t), p2.lerp(*q2, t), p3.lerp(*q3, t))
                }
                (PathEl::ClosePath, PathEl::ClosePath) => PathEl::ClosePath,
                _ => return snap(self, to, t),
            };
            out.push(el);
        }
        Self::from_vec(out)
    }
}

impl Interpolate for MarkPayload {
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        match (self, to) {
            (Self::Rect(a), Self::Rect(b)) => Self::Rect(RectPayload {
                rect: a.rect.interpolate(&b.rect, t),
                corner_radius: a.corner_radius.interpolate(&b.corner_radius, t),
                fill: a.fill.interpolate(&b.fill, t),
                stroke: a.stroke.interpolate(&b.stroke, t),
                stroke_width: a.stroke_width.interpolate(&b.stroke_width, t),
            }),
            (Self::Path(a), Self::Path(b)) => Self::Path(PathPayload {
                path: a.path.interpolate(&b.path, t),
                fill: a.fill.interpolate(&b.fill, t),
                stroke: a.stroke.interpolate(&b.stroke, t),
                stroke_width: a.stroke_width.interpolate(&b.stroke_width, t),
            }),
            (Self::Text(a), Self::Text(b)) => Self::Text(TextPayload {
                pos: a.pos.interpolate(&b.pos, t),
                text: b.text.clone(),
                font_size: a.font_size.interpolate(&b.font_size, t),
                anchor: b.anchor,
                baseline: b.baseline,
                fill: a.fill.interpolate(&b.fill, t),
            }),
            _ => snap(self, to, t),
        }
    }
}

fn snap<T: Clone>(from: &T, to: &T, t: f64) -> T {
    if t > 0.0 { to.clone() } else { from.clone() }
}

/// Easing curves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    /// Constant speed.
    Linear,
    /// Cubic ease-in-out.
    #[default]
    CubicInOut,
}

impl Easing {
    /// Applies the curve to a normalized time in `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::CubicInOut => {
                let t2 = t * 2.0;
                if t2 <= 1.0 {
                    t2 * t2 * t2 / 2.0
                } else {
                    let u = t2 - 2.0;
                    (u * u * u + 2.0) / 2.0
                }
            }
        }
    }
}

/// A time window over which a value changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    /// Start time in milliseconds.
    pub start_ms: f64,
    /// Duration in milliseconds; `0` means the change is immediate.
    pub duration_ms: f64,
    /// Easing curve.
    pub easing: Easing,
}

impl Transition {
    /// Creates a transition starting at `start_ms`.
    pub fn new(start_ms: f64, duration_ms: f64, easing: Easing) -> Self {
        Self {
            start_ms,
            duration_ms: if duration_ms.is_finite() {
                duration_ms.max(0.0)
            } else {
                0.0
            },
            easing,
        }
    }

    /// An immediate transition.
    pub fn immediate(now_ms: f64) -> Self {
        Self::new(now_ms, 0.0, Easing::Linear)
    }

    /// Eased progress at `now_ms`, in `[0, 1]`.
    pub fn progress(&self, now_ms: f64) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        self.easing
            .apply((now_ms - self.start_ms) / self.duration_ms)
    }

    /// Returns `true` once the transition has reached its end state.
    pub fn is_done(&self, now_ms: f64) -> bool {
        self.duration_ms <= 0.0 || now_ms >= self.start_ms + self.duration_ms
    }
}

/// A value moving from `from` to `to` over a [`Transition`].
#[derive(Clone, Debug, PartialEq)]
pub struct Tween<T> {
    from: T,
    to: T,
    transition: Transition,
}

impl<T: Interpolate + Clone> Tween<T> {
    /// A value that is already at rest.
    pub fn settled(value: T, now_ms: f64) -> Self {
        Self {
            from: value.clone(),
            to: value,
            transition: Transition::immediate(now_ms),
        }
    }

    /// A value moving between two states.
    pub fn new(from: T, to: T, transition: Transition) -> Self {
        Self {
            from,
            to,
            transition,
        }
    }

    /// Samples the value at `now_ms`.
    pub fn sample(&self, now_ms: f64) -> T {
        let t = self.transition.progress(now_ms);
        if t >= 1.0 {
            self.to.clone()
        } else {
            self.from.interpolate(&self.to, t)
        }
    }

    /// Retargets the tween, starting from its value at `now_ms`.
    pub fn retarget(&mut self, to: T, transition: Transition, now_ms: f64) {
        self.from = self.sample(now_ms);
        self.to = to;
        self.transition = transition;
    }

    /// The end state.
    pub fn target(&self) -> &T {
        &self.to
    }

    /// The transition window.
    pub fn transition(&self) -> Transition {
        self.transition
    }

    /// Returns `true` once the end state has been reached.
    pub fn is_done(&self, now_ms: f64) -> bool {
        self.transition.is_done(now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cubic_easing_hits_endpoints_and_midpoint() {
        let e = Easing::CubicInOut;
        assert!(e.apply(0.0).abs() < 1e-12);
        assert!((e.apply(0.5) - 0.5).abs() < 1e-12);
        assert!((e.apply(1.0) - 1.0).abs() < 1e-12);
        assert!((e.apply(2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn tween_samples_between_states() {
        let tw = Tween::new(0.0, 10.0, Transition::new(100.0, 100.0, Easing::Linear));
        assert!((tw.sample(100.0) - 0.0).abs() < 1e-12);
        assert!((tw.sample(150.0) - 5.0).abs() < 1e-12);
        assert!((tw.sample(500.0) - 10.0).abs() < 1e-12);
        assert!(tw.is_done(200.0));
        assert!(!tw.is_done(199.0));
    }

    #[test]
    fn zero_duration_is_immediate() {
        let tw = Tween::new(0.0, 10.0, Transition::new(0.0, 0.0, Easing::CubicInOut));
        assert!((tw.sample(0.0) - 10.0).abs() < 1e-12);
        assert!(tw.is_done(0.0));
    }

    #[test]
    fn retarget_continues_from_current_value() {
        let mut tw = Tween::new(0.0, 10.0, Transition::new(0.0, 100.0, Easing::Linear));
        tw.retarget(0.0, Transition::new(50.0, 100.0, Easing::Linear), 50.0);
        assert!((tw.sample(50.0) - 5.0).abs() < 1e-12);
        assert!((tw.sample(150.0) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn mismatched_paths_snap() {
        let mut a = BezPath::new();
        a.move_to((0.0, 0.0));
        let mut b = BezPath::new();
        b.move_to((1.0, 1.0));
        b.line_to((2.0, 2.0));
        assert_eq!(a.interpolate(&b, 0.0), a);
        assert_eq!(a.interpolate(&b, 0.1), b);
    }
}
