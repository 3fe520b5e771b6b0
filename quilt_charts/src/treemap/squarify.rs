// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Squarified tiling with sibling and top padding.

extern crate alloc;

use alloc::vec::Vec;

use kurbo::Rect;

use crate::treemap::hierarchy::TreemapNode;

/// The golden ratio, the target aspect ratio of squarified rows.
pub const PHI: f64 = 1.618_033_988_749_895;

/// Padding applied while tiling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Padding {
    /// Space between siblings and around children inside their parent.
    pub(crate) inner: f64,
    /// Replaces `inner` above the children of internal nodes.
    pub(crate) top: Option<f64>,
}

/// Positions every node of `nodes` (an arena rooted at `0`) inside `bounds`.
pub(crate) fn tile<D>(nodes: &mut [TreemapNode<D>], bounds: Rect, padding: Padding) {
    if nodes.is_empty() {
        return;
    }
    nodes[0].rect = bounds;
    // Per-depth half padding, as inherited by the children of each level.
    let mut half: Vec<f64> = alloc::vec![0.0];
    let mut stack = alloc::vec![0_usize];
    while let Some(idx) = stack.pop() {
        let depth = nodes[idx].depth;
        let p = half.get(depth).copied().unwrap_or(0.0);
        let r = collapse(Rect::new(
            nodes[idx].rect.x0 + p,
            nodes[idx].rect.y0 + p,
            nodes[idx].rect.x1 - p,
            nodes[idx].rect.y1 - p,
        ));
        nodes[idx].rect = r;
        if nodes[idx].children.is_empty() {
            continue;
        }

        let ph = padding.inner.max(0.0) / 2.0;
        if half.len() <= depth + 1 {
            half.resize(depth + 2, 0.0);
        }
        half[depth + 1] = ph;
        let outer = padding.inner.max(0.0);
        let top = padding.top.unwrap_or(outer).max(0.0);
        let inner = collapse(Rect::new(
            r.x0 + outer - ph,
            r.y0 + top - ph,
            r.x1 - (outer - ph),
            r.y1 - (outer - ph),
        ));

        let children = nodes[idx].children.clone();
        let values: Vec<f64> = children.iter().map(|&c| nodes[c].value).collect();
        for (c, rect) in children.iter().zip(squarify(&values, nodes[idx].value, inner)) {
            nodes[*c].rect = rect;
        }
        // Pre-order: push in reverse so the first child is visited first.
        stack.extend(children.iter().rev());
    }
}

fn collapse(r: Rect) -> Rect {
    let (x0, x1) = if r.x1 < r.x0 {
        let m = (r.x0 + r.x1) / 2.0;
        (m, m)
    } else {
        (r.x0, r.x1)
    };
    let (y0, y1) = if r.y1 < r.y0 {
        let m = (r.y0 + r.y1) / 2.0;
        (m, m)
    } else {
        (r.y0, r.y1)
    };
    Rect::new(x0, y0, x1, y1)
}

/// Squarifies `values` (sorted descending, summing to `total`) into `rect`.
///
/// Rows are grown while their worst aspect ratio does not get worse than `PHI` allows.
pub(crate) fn squarify(values: &[f64], total: f64, rect: Rect) -> Vec<Rect> {
    let n = values.len();
    let mut out = alloc::vec![Rect::ZERO; n];
    let (mut x0, mut y0, x1, y1) = (rect.x0, rect.y0, rect.x1, rect.y1);
    let mut remaining = total;
    let mut i0 = 0;
    let mut i1 = 0;

    while i0 < n {
        let dx = x1 - x0;
        let dy = y1 - y0;

        // Find the next non-empty node.
        let mut sum;
        loop {
            sum = values[i1];
            i1 += 1;
            if sum != 0.0 || i1 >= n {
                break;
            }
        }
        let mut min_v = sum;
        let mut max_v = sum;
        let alpha = (dy / dx).max(dx / dy) / (remaining * PHI);
        let mut beta = sum * sum * alpha;
        let mut min_ratio = (max_v / beta).max(beta / min_v);

        while i1 < n {
            let v = values[i1];
            sum += v;
            min_v = min_v.min(v);
            max_v = max_v.max(v);
            beta = sum * sum * alpha;
            let ratio = (max_v / beta).max(beta / min_v);
            if ratio > min_ratio {
                sum -= v;
                break;
            }
            min_ratio = ratio;
            i1 += 1;
        }

        let row = i0..i1;
        if dx < dy {
            // Dice: the row spans the width.
            let ry1 = if remaining > 0.0 {
                y0 + dy * sum / remaining
            } else {
                y1
            };
            let k = if sum > 0.0 { dx / sum } else { 0.0 };
            let mut x = x0;
            for i in row {
                let nx = x + values[i] * k;
                out[i] = Rect::new(x, y0, nx, ry1);
                x = nx;
            }
            y0 = ry1;
        } else {
            // Slice: the row spans the height.
            let rx1 = if remaining > 0.0 {
                x0 + dx * sum / remaining
            } else {
                x1
            };
            let k = if sum > 0.0 { dy / sum } else { 0.0 };
            let mut y = y0;
            for i in row {
                let ny = y + values[i] * k;
                out[i] = Rect::new(x0, y, rx1, ny);
                y = ny;
            }
            x0 = rx1;
        }
        remaining -= sum;
        i0 = i1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(r: &Rect) -> f64 {
        r.width() * r.height()
    }

    #[test]
    fn areas_are_proportional_to_values() {
        let values = [6.0, 6.0, 4.0, 3.0, 2.0, 2.0, 1.0];
        let rects = squarify(&values, 24.0, Rect::new(0.0, 0.0, 6.0, 4.0));
        for (v, r) in values.iter().zip(&rects) {
            assert!((area(r) - v).abs() < 1e-9, "{v} vs {r:?}");
        }
    }

    #[test]
    fn tiles_cover_the_rectangle_without_overlap() {
        let values = [5.0, 3.0, 2.0];
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        let rects = squarify(&values, 10.0, bounds);
        let total: f64 = rects.iter().map(area).sum();
        assert!((total - 5000.0).abs() < 1e-6);
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                let o = a.intersect(*b);
                assert!(o.width() <= 1e-9 || o.height() <= 1e-9);
            }
        }
    }

    #[test]
    fn zero_values_get_empty_tiles() {
        let rects = squarify(&[0.0, 0.0], 0.0, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(rects.iter().all(|r| area(r) == 0.0));
    }
}
