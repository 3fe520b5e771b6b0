// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scales: mappings from data values to pixels and back.
//!
//! Scales are plain values. A component that needs a specialized variant (the scatter size
//! scale, for example) clones the configured scale and sets its own domain and range on the
//! copy.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;

#[cfg(not(feature = "std"))]
use crate::float::FloatExt;

/// A continuous scale instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScaleContinuous {
    /// Linear scale.
    Linear(ScaleLinear),
    /// Log scale.
    Log(ScaleLog),
    /// Power scale (square root with exponent `0.5`).
    Pow(ScalePow),
}

impl Default for ScaleContinuous {
    fn default() -> Self {
        Self::linear()
    }
}

impl From<ScaleLinear> for ScaleContinuous {
    fn from(value: ScaleLinear) -> Self {
        Self::Linear(value)
    }
}

impl From<ScaleLog> for ScaleContinuous {
    fn from(value: ScaleLog) -> Self {
        Self::Log(value)
    }
}

impl From<ScalePow> for ScaleContinuous {
    fn from(value: ScalePow) -> Self {
        Self::Pow(value)
    }
}

impl ScaleContinuous {
    /// A linear scale over the unit domain and range.
    pub fn linear() -> Self {
        Self::Linear(ScaleLinear::new((0.0, 1.0), (0.0, 1.0)))
    }

    /// A square-root scale over the unit domain and range.
    pub fn sqrt() -> Self {
        Self::Pow(ScalePow::sqrt((0.0, 1.0), (0.0, 1.0)))
    }

    /// Maps a value from domain space into range space.
    pub fn map(&self, x: f64) -> f64 {
        match self {
            Self::Linear(s) => s.map(x),
            Self::Log(s) => s.map(x),
            Self::Pow(s) => s.map(x),
        }
    }

    /// Maps a value from range space back into domain space.
    pub fn invert(&self, y: f64) -> f64 {
        match self {
            Self::Linear(s) => s.invert(y),
            Self::Log(s) => s.invert(y),
            Self::Pow(s) => s.invert(y),
        }
    }

    /// Returns tick values.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        match self {
            Self::Linear(s) => s.ticks(count),
            Self::Log(s) => s.ticks(count),
            Self::Pow(s) => nice_ticks(s.domain.0, s.domain.1, count),
        }
    }

    /// The configured domain, as authored.
    pub fn domain(&self) -> (f64, f64) {
        match self {
            Self::Linear(s) => s.domain,
            Self::Log(s) => s.domain,
            Self::Pow(s) => s.domain,
        }
    }

    /// The configured range.
    pub fn range(&self) -> (f64, f64) {
        match self {
            Self::Linear(s) => s.range,
            Self::Log(s) => s.range,
            Self::Pow(s) => s.range,
        }
    }

    /// Replaces the domain.
    pub fn set_domain(&mut self, domain: (f64, f64)) {
        match self {
            Self::Linear(s) => s.domain = domain,
            Self::Log(s) => s.domain = domain,
            Self::Pow(s) => s.domain = domain,
        }
    }

    /// Replaces the range.
    pub fn set_range(&mut self, range: (f64, f64)) {
        match self {
            Self::Linear(s) => s.range = range,
            Self::Log(s) => s.range = range,
            Self::Pow(s) => s.range = range,
        }
    }

    /// Returns a copy with a different domain.
    pub fn with_domain(mut self, domain: (f64, f64)) -> Self {
        self.set_domain(domain);
        self
    }

    /// Returns a copy with a different range.
    pub fn with_range(mut self, range: (f64, f64)) -> Self {
        self.set_range(range);
        self
    }

    /// The size in domain units of a `px`-wide span anchored at range value `0`.
    ///
    /// Always finite: degenerate scales yield `0`.
    pub fn span_to_domain(&self, px: f64) -> f64 {
        let span = self.invert(px) - self.invert(0.0);
        if span.is_finite() { span } else { 0.0 }
    }
}

/// A linear mapping from a continuous domain to a continuous range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleLinear {
    domain: (f64, f64),
    range: (f64, f64),
}

impl ScaleLinear {
    /// Creates a new scale mapping `domain` values to `range` values.
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    /// Maps a value from domain space into range space.
    ///
    /// A zero-width domain maps everything to the middle of the range.
    pub fn map(&self, x: f64) -> f64 {
        lerp_between(self.domain, self.range, x)
    }

    /// Maps a value from range space back into domain space.
    ///
    /// A zero-width range maps everything to the middle of the domain.
    pub fn invert(&self, y: f64) -> f64 {
        lerp_between(self.range, self.domain, y)
    }

    /// The configured domain.
    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    /// The configured range.
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Returns “nice-ish” tick values for the domain.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        nice_ticks(self.domain.0, self.domain.1, count)
    }

    /// Extends the domain outwards to the nearest tick boundaries.
    pub fn nice(mut self, count: usize) -> Self {
        let ticks = nice_ticks(self.domain.0, self.domain.1, count);
        if let (Some(first), Some(last)) = (ticks.first(), ticks.last())
            && ticks.len() >= 2
        {
            self.domain = if self.domain.0 <= self.domain.1 {
                (*first, *last)
            } else {
                (*last, *first)
            };
        }
        self
    }
}

fn lerp_between(from: (f64, f64), to: (f64, f64), x: f64) -> f64 {
    let (a0, a1) = from;
    let (b0, b1) = to;
    let denom = a1 - a0;
    if denom == 0.0 {
        return (b0 + b1) * 0.5;
    }
    let t = (x - a0) / denom;
    b0 + t * (b1 - b0)
}

pub(crate) fn nice_ticks(mut min: f64, mut max: f64, count: usize) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    if min == max {
        return alloc::vec![min];
    }
    if min > max {
        core::mem::swap(&mut min, &mut max);
    }
    let span = max - min;
    let step0 = span / count.max(1) as f64;
    let step = nice_step(step0);
    if step == 0.0 {
        return alloc::vec![min, max];
    }

    let start = (min / step).floor() * step;
    let stop = (max / step).ceil() * step;

    let n_f = ((stop - start) / step).round();
    let n = if n_f.is_finite() && n_f >= 0.0 {
        let n_f = n_f.min(10_000.0);
        #[allow(
            clippy::cast_possible_truncation,
            reason = "guarded by finite/non-negative checks and capped at 10k"
        )]
        {
            n_f as u64
        }
    } else {
        0
    };
    (0..=n).map(|i| start + step * i as f64).collect()
}

fn nice_step(step: f64) -> f64 {
    if !step.is_finite() || step <= 0.0 {
        return 0.0;
    }
    let power = step.log10().floor();
    let base = 10_f64.powf(power);
    let error = step / base;
    let nice = if error >= 7.5 {
        10.0
    } else if error >= 3.5 {
        5.0
    } else if error >= 1.5 {
        2.0
    } else {
        1.0
    };
    nice * base
}

/// A log-scale mapping from a positive domain to a range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleLog {
    domain: (f64, f64),
    range: (f64, f64),
    base: f64,
}

impl ScaleLog {
    /// Creates a new log scale.
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self {
            domain,
            range,
            base: 10.0,
        }
    }

    /// Sets the log base.
    pub fn with_base(mut self, base: f64) -> Self {
        self.base = if base.is_finite() && base > 0.0 && base != 1.0 {
            base
        } else {
            10.0
        };
        self
    }

    fn log_base(&self, x: f64) -> f64 {
        let denom = self.base.ln();
        if denom == 0.0 { x.ln() } else { x.ln() / denom }
    }

    fn log_domain(&self) -> Option<(f64, f64)> {
        let (d0, d1) = self.domain;
        if d0 <= 0.0 || d1 <= 0.0 {
            return None;
        }
        Some((self.log_base(d0), self.log_base(d1)))
    }

    /// Maps a value from domain space into range space.
    ///
    /// Non-positive inputs or domains map to the start of the range.
    pub fn map(&self, x: f64) -> f64 {
        match self.log_domain() {
            Some(ld) if x > 0.0 => lerp_between(ld, self.range, self.log_base(x)),
            _ => self.range.0,
        }
    }

    /// Maps a value from range space back into domain space.
    pub fn invert(&self, y: f64) -> f64 {
        match self.log_domain() {
            Some(ld) => self.base.powf(lerp_between(self.range, ld, y)),
            None => self.domain.0,
        }
    }

    /// Returns “nice-ish” tick values for a log domain.
    ///
    /// This currently returns powers of `base` that fall within the domain, capped by `count`.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (mut min, mut max) = self.domain;
        if min > max {
            core::mem::swap(&mut min, &mut max);
        }
        if min <= 0.0 || !min.is_finite() || !max.is_finite() {
            return Vec::new();
        }
        let exponent = |v: f64| {
            let e = v.clamp(f64::from(i32::MIN), f64::from(i32::MAX));
            #[allow(clippy::cast_possible_truncation, reason = "clamped to the i32 range")]
            {
                e as i32
            }
        };
        let min_e = exponent(self.log_base(min).floor());
        let max_e = exponent(self.log_base(max).ceil());
        let mut out = Vec::new();
        for e in min_e..=max_e {
            out.push(self.base.powi(e));
            if count != 0 && out.len() >= count {
                break;
            }
        }
        out
    }
}

/// A power scale: linear over `sign(x) * |x|^exponent`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalePow {
    domain: (f64, f64),
    range: (f64, f64),
    exponent: f64,
}

impl ScalePow {
    /// Creates a power scale with the given exponent.
    pub fn new(domain: (f64, f64), range: (f64, f64), exponent: f64) -> Self {
        Self {
            domain,
            range,
            exponent: if exponent.is_finite() && exponent != 0.0 {
                exponent
            } else {
                1.0
            },
        }
    }

    /// A square-root scale.
    pub fn sqrt(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self::new(domain, range, 0.5)
    }

    /// The exponent.
    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    fn forward(&self, x: f64) -> f64 {
        if x < 0.0 {
            -(-x).powf(self.exponent)
        } else {
            x.powf(self.exponent)
        }
    }

    fn backward(&self, x: f64) -> f64 {
        let e = 1.0 / self.exponent;
        if x < 0.0 { -(-x).powf(e) } else { x.powf(e) }
    }

    /// Maps a value from domain space into range space.
    pub fn map(&self, x: f64) -> f64 {
        let d = (self.forward(self.domain.0), self.forward(self.domain.1));
        lerp_between(d, self.range, self.forward(x))
    }

    /// Maps a value from range space back into domain space.
    pub fn invert(&self, y: f64) -> f64 {
        let d = (self.forward(self.domain.0), self.forward(self.domain.1));
        self.backward(lerp_between(self.range, d, y))
    }
}

/// A categorical scale assigning range values to keys in order of first appearance.
///
/// Keys beyond the length of the range wrap around.
#[derive(Clone, Debug)]
pub struct ScaleOrdinal<T> {
    keys: Vec<String>,
    index: HashMap<String, usize>,
    range: Vec<T>,
}

impl<T: Clone> ScaleOrdinal<T> {
    /// An ordinal scale with an implicit, initially empty domain.
    pub fn new(range: Vec<T>) -> Self {
        Self {
            keys: Vec::new(),
            index: HashMap::new(),
            range,
        }
    }

    /// Returns the value for `key`, adding it to the domain if unseen.
    pub fn map(&mut self, key: &str) -> Option<T> {
        let i = match self.index.get(key) {
            Some(i) => *i,
            None => {
                let i = self.keys.len();
                self.keys.push(key.into());
                self.index.insert(key.into(), i);
                i
            }
        };
        self.at(i)
    }

    /// Returns the value for a known key without growing the domain.
    pub fn get(&self, key: &str) -> Option<T> {
        self.index.get(key).and_then(|i| self.at(*i))
    }

    fn at(&self, i: usize) -> Option<T> {
        if self.range.is_empty() {
            return None;
        }
        self.range.get(i % self.range.len()).cloned()
    }

    /// Keys in order of first appearance.
    pub fn domain(&self) -> &[String] {
        &self.keys
    }

    /// Forgets every key.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.index.clear();
    }
}

/// Infers a `(min, max)` domain from a sequence of values.
///
/// Non-finite values are ignored. Returns `None` if no finite values are present.
pub fn infer_domain(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        if !v.is_finite() {
            continue;
        }
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() {
        Some((min, max))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn linear_map_and_invert_agree() {
        let s = ScaleLinear::new((0.0, 10.0), (100.0, 0.0));
        assert!((s.map(2.5) - 75.0).abs() < 1e-9);
        assert!((s.invert(75.0) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn degenerate_linear_scale_uses_midpoints() {
        let s = ScaleLinear::new((5.0, 5.0), (0.0, 100.0));
        assert!((s.map(123.0) - 50.0).abs() < 1e-9);
        let flat = ScaleContinuous::from(ScaleLinear::new((0.0, 10.0), (20.0, 20.0)));
        assert!((flat.invert(3.0) - 5.0).abs() < 1e-9);
        assert!(flat.span_to_domain(12.0).abs() < 1e-12);
    }

    #[test]
    fn log_scale_maps_endpoints_to_range() {
        let s = ScaleLog::new((1.0, 100.0), (0.0, 10.0));
        assert!((s.map(1.0) - 0.0).abs() < 1e-9);
        assert!((s.map(100.0) - 10.0).abs() < 1e-9);
        assert!((s.invert(5.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn sqrt_scale_round_trips() {
        let s = ScalePow::sqrt((0.0, 100.0), (0.0, 10.0));
        assert!((s.map(25.0) - 5.0).abs() < 1e-9);
        assert!((s.invert(5.0) - 25.0).abs() < 1e-9);
        let neg = ScalePow::sqrt((-100.0, 100.0), (-10.0, 10.0));
        assert!((neg.map(-25.0) + 5.0).abs() < 1e-9);
    }

    #[test]
    fn copies_do_not_share_state() {
        let base = ScaleContinuous::sqrt();
        let mut copy = base;
        copy.set_domain((0.0, 4.0));
        copy.set_range((0.0, 20.0));
        assert_eq!(base.domain(), (0.0, 1.0));
        assert!((copy.map(1.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn nice_extends_domain_to_ticks() {
        let s = ScaleLinear::new((0.3, 9.2), (0.0, 1.0)).nice(5);
        assert_eq!(s.domain(), (0.0, 10.0));
    }

    #[test]
    fn ordinal_assigns_in_first_appearance_order_and_wraps() {
        let mut s = ScaleOrdinal::new(alloc::vec![1, 2]);
        assert_eq!(s.map("b"), Some(1));
        assert_eq!(s.map("a"), Some(2));
        assert_eq!(s.map("c"), Some(1));
        assert_eq!(s.map("b"), Some(1));
        assert_eq!(s.get("zzz"), None);
        assert_eq!(s.domain().len(), 3);
    }

    #[test]
    fn infer_domain_skips_non_finite() {
        assert_eq!(infer_domain([3.0, f64::NAN, -1.0, 2.0]), Some((-1.0, 3.0)));
        assert_eq!(infer_domain([f64::NAN]), None);
    }
}
