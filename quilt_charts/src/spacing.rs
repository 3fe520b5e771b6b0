// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-side spacing for margins and bleed.

/// Space on each side of a rectangle, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Spacing {
    /// Space above.
    pub top: f64,
    /// Space below.
    pub bottom: f64,
    /// Space to the left.
    pub left: f64,
    /// Space to the right.
    pub right: f64,
}

impl Spacing {
    /// No spacing on any side.
    pub const ZERO: Self = Self::uniform(0.0);

    /// The same spacing on every side.
    pub const fn uniform(v: f64) -> Self {
        Self {
            top: v,
            bottom: v,
            left: v,
            right: v,
        }
    }

    /// Side-wise maximum.
    pub fn max(self, other: Self) -> Self {
        Self {
            top: self.top.max(other.top),
            bottom: self.bottom.max(other.bottom),
            left: self.left.max(other.left),
            right: self.right.max(other.right),
        }
    }

    /// Side-wise sum.
    pub fn add(self, other: Self) -> Self {
        Self {
            top: self.top + other.top,
            bottom: self.bottom + other.bottom,
            left: self.left + other.left,
            right: self.right + other.right,
        }
    }

    /// Total horizontal spacing.
    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    /// Total vertical spacing.
    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }

    /// Returns `true` if every side is zero.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_side_wise() {
        let a = Spacing {
            top: 1.0,
            bottom: 5.0,
            left: 0.0,
            right: 2.0,
        };
        let b = Spacing::uniform(3.0);
        assert_eq!(
            a.max(b),
            Spacing {
                top: 3.0,
                bottom: 5.0,
                left: 3.0,
                right: 3.0
            }
        );
        assert!((a.add(b).horizontal() - 8.0).abs() < 1e-12);
        assert!(Spacing::ZERO.is_zero());
    }
}
