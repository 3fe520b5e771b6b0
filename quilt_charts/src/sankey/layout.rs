// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flow layout: columns, node breadths and link breadths.
//!
//! Nodes are assigned to columns by depth and alignment, stacked with padding, and then
//! relaxed towards the weighted centers of their neighbors for a fixed number of iterations,
//! resolving collisions within each column after every sweep.

extern crate alloc;

use alloc::vec::Vec;

use kurbo::Rect;

use crate::sankey::graph::{Graph, SankeyError};

/// Column assignment of nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SankeyNodeAlign {
    /// By depth from the sources.
    Left,
    /// By height from the sinks.
    Right,
    /// Sources by depth, sinks moved to the last column.
    #[default]
    Justify,
    /// Like `Left`, but sources sit one column before their nearest target.
    Center,
}

/// Geometry parameters of a layout pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct LayoutParams {
    pub(crate) extent: Rect,
    pub(crate) node_width: f64,
    pub(crate) node_padding: f64,
    pub(crate) node_min_height: f64,
    pub(crate) align: SankeyNodeAlign,
    /// Fixed distance between the left edges of adjacent columns; columns are spread over
    /// the extent width when unset.
    pub(crate) horizontal_spacing: Option<f64>,
    pub(crate) iterations: usize,
}

/// Lays out `graph` in place.
pub(crate) fn layout<N, L>(graph: &mut Graph<N, L>, p: &LayoutParams) -> Result<(), SankeyError> {
    if graph.nodes.is_empty() {
        return Ok(());
    }
    node_values(graph);
    node_depths(graph)?;
    node_heights(graph)?;
    let mut columns = node_layers(graph, p);
    node_breadths(graph, &mut columns, p);
    link_breadths(graph);
    Ok(())
}

fn node_values<N, L>(g: &mut Graph<N, L>) {
    for i in 0..g.nodes.len() {
        let out: f64 = g.nodes[i].source_links.iter().map(|&k| g.links[k].value).sum();
        let into: f64 = g.nodes[i].target_links.iter().map(|&k| g.links[k].value).sum();
        g.nodes[i].value = out.max(into);
    }
}

fn node_depths<N, L>(g: &mut Graph<N, L>) -> Result<(), SankeyError> {
    let n = g.nodes.len();
    let mut current: Vec<usize> = (0..n).collect();
    let mut depth = 0;
    while !current.is_empty() {
        let mut seen = alloc::vec![false; n];
        let mut next = Vec::new();
        for &i in &current {
            g.nodes[i].depth = depth;
            for &k in &g.nodes[i].source_links {
                let t = g.links[k].target;
                if !seen[t] {
                    seen[t] = true;
                    next.push(t);
                }
            }
        }
        depth += 1;
        if depth > n {
            return Err(SankeyError::CircularLink);
        }
        current = next;
    }
    Ok(())
}

fn node_heights<N, L>(g: &mut Graph<N, L>) -> Result<(), SankeyError> {
    let n = g.nodes.len();
    let mut current: Vec<usize> = (0..n).collect();
    let mut height = 0;
    while !current.is_empty() {
        let mut seen = alloc::vec![false; n];
        let mut next = Vec::new();
        for &i in &current {
            g.nodes[i].height = height;
            for &k in &g.nodes[i].target_links {
                let s = g.links[k].source;
                if !seen[s] {
                    seen[s] = true;
                    next.push(s);
                }
            }
        }
        height += 1;
        if height > n {
            return Err(SankeyError::CircularLink);
        }
        current = next;
    }
    Ok(())
}

fn align<N, L>(g: &Graph<N, L>, i: usize, columns: usize, align: SankeyNodeAlign) -> usize {
    let node = &g.nodes[i];
    let last = columns - 1;
    match align {
        SankeyNodeAlign::Left => node.depth,
        SankeyNodeAlign::Right => last.saturating_sub(node.height),
        SankeyNodeAlign::Justify => {
            if node.source_links.is_empty() {
                last
            } else {
                node.depth
            }
        }
        SankeyNodeAlign::Center => {
            if !node.target_links.is_empty() {
                node.depth
            } else {
                node.source_links
                    .iter()
                    .map(|&k| g.nodes[g.links[k].target].depth)
                    .min()
                    .map_or(0, |d| d.saturating_sub(1))
            }
        }
    }
}

fn node_layers<N, L>(g: &mut Graph<N, L>, p: &LayoutParams) -> Vec<Vec<usize>> {
    let count = g.nodes.iter().map(|n| n.depth).max().unwrap_or(0) + 1;
    let kx = match p.horizontal_spacing {
        Some(spacing) => spacing.max(0.0),
        None if count > 1 => (p.extent.width() - p.node_width) / (count - 1) as f64,
        None => 0.0,
    };
    let mut columns = alloc::vec![Vec::new(); count];
    for i in 0..g.nodes.len() {
        let layer = align(g, i, count, p.align).min(count - 1);
        let node = &mut g.nodes[i];
        node.layer = layer;
        node.x0 = p.extent.x0 + layer as f64 * kx;
        node.x1 = node.x0 + p.node_width;
        columns[layer].push(i);
    }
    columns
}

fn node_breadths<N, L>(g: &mut Graph<N, L>, columns: &mut [Vec<usize>], p: &LayoutParams) {
    let tallest = columns.iter().map(Vec::len).max().unwrap_or(0);
    let py = if tallest > 1 {
        p.node_padding.min(p.extent.height() / (tallest - 1) as f64)
    } else {
        p.node_padding
    };
    initialize_breadths(g, columns, p, py);

    let mut alpha = 1.0_f64;
    let iterations = p.iterations.max(1) as f64;
    for i in 0..p.iterations {
        let beta = (1.0 - alpha).max((i + 1) as f64 / iterations);
        relax_right_to_left(g, columns, p, py, alpha, beta);
        relax_left_to_right(g, columns, p, py, alpha, beta);
        alpha *= 0.99;
    }
}

fn initialize_breadths<N, L>(
    g: &mut Graph<N, L>,
    columns: &[Vec<usize>],
    p: &LayoutParams,
    py: f64,
) {
    let ky = columns
        .iter()
        .filter_map(|c| {
            let total: f64 = c.iter().map(|&i| g.nodes[i].value).sum();
            (total > 0.0)
                .then(|| (p.extent.height() - c.len().saturating_sub(1) as f64 * py) / total)
        })
        .fold(f64::INFINITY, f64::min);
    let ky = if ky.is_finite() { ky.max(0.0) } else { 0.0 };

    for column in columns {
        let mut y = p.extent.y0;
        for &i in column {
            let node = &mut g.nodes[i];
            node.y0 = y;
            node.y1 = y + (node.value * ky).max(p.node_min_height);
            y = node.y1 + py;
            for k in 0..g.nodes[i].source_links.len() {
                let link = g.nodes[i].source_links[k];
                g.links[link].width = g.links[link].value * ky;
            }
        }
        // Spread the leftover space evenly around the column's nodes.
        let gap = (p.extent.y1 - y + py) / (column.len() + 1) as f64;
        for (j, &i) in column.iter().enumerate() {
            let shift = gap * (j + 1) as f64;
            g.nodes[i].y0 += shift;
            g.nodes[i].y1 += shift;
        }
        for &i in column {
            sort_source_links(g, i);
            sort_target_links(g, i);
        }
    }
}

fn relax_left_to_right<N, L>(
    g: &mut Graph<N, L>,
    columns: &mut [Vec<usize>],
    p: &LayoutParams,
    py: f64,
    alpha: f64,
    beta: f64,
) {
    for c in 1..columns.len() {
        for &target in &columns[c] {
            let mut y = 0.0;
            let mut w = 0.0;
            for &k in &g.nodes[target].target_links {
                let link = &g.links[k];
                let v = link.value * (g.nodes[target].layer as f64 - g.nodes[link.source].layer as f64);
                y += target_top(g, link.source, target, py) * v;
                w += v;
            }
            if w <= 0.0 {
                continue;
            }
            let dy = (y / w - g.nodes[target].y0) * alpha;
            g.nodes[target].y0 += dy;
            g.nodes[target].y1 += dy;
            reorder_node_links(g, target);
        }
        sort_by_breadth(g, &mut columns[c]);
        resolve_collisions(g, &columns[c], p, py, beta);
    }
}

fn relax_right_to_left<N, L>(
    g: &mut Graph<N, L>,
    columns: &mut [Vec<usize>],
    p: &LayoutParams,
    py: f64,
    alpha: f64,
    beta: f64,
) {
    for c in (0..columns.len().saturating_sub(1)).rev() {
        for &source in &columns[c] {
            let mut y = 0.0;
            let mut w = 0.0;
            for &k in &g.nodes[source].source_links {
                let link = &g.links[k];
                let v = link.value * (g.nodes[link.target].layer as f64 - g.nodes[source].layer as f64);
                y += source_top(g, source, link.target, py) * v;
                w += v;
            }
            if w <= 0.0 {
                continue;
            }
            let dy = (y / w - g.nodes[source].y0) * alpha;
            g.nodes[source].y0 += dy;
            g.nodes[source].y1 += dy;
            reorder_node_links(g, source);
        }
        sort_by_breadth(g, &mut columns[c]);
        resolve_collisions(g, &columns[c], p, py, beta);
    }
}

fn resolve_collisions<N, L>(
    g: &mut Graph<N, L>,
    column: &[usize],
    p: &LayoutParams,
    py: f64,
    alpha: f64,
) {
    if column.is_empty() {
        return;
    }
    let mid = column.len() >> 1;
    let subject = column[mid];
    let (above, below) = (g.nodes[subject].y0 - py, g.nodes[subject].y1 + py);
    push_up(g, &column[..mid], above, py, alpha);
    push_down(g, &column[mid + 1..], below, py, alpha);
    push_up(g, column, p.extent.y1, py, alpha);
    push_down(g, column, p.extent.y0, py, alpha);
}

/// Pushes nodes down, top to bottom, so that none starts above `y`.
fn push_down<N, L>(g: &mut Graph<N, L>, nodes: &[usize], mut y: f64, py: f64, alpha: f64) {
    for &i in nodes {
        let node = &mut g.nodes[i];
        let dy = (y - node.y0) * alpha;
        if dy > 1e-6 {
            node.y0 += dy;
            node.y1 += dy;
        }
        y = node.y1 + py;
    }
}

/// Pushes nodes up, bottom to top, so that none ends below `y`.
fn push_up<N, L>(g: &mut Graph<N, L>, nodes: &[usize], mut y: f64, py: f64, alpha: f64) {
    for &i in nodes.iter().rev() {
        let node = &mut g.nodes[i];
        let dy = (node.y1 - y) * alpha;
        if dy > 1e-6 {
            node.y0 -= dy;
            node.y1 -= dy;
        }
        y = node.y0 - py;
    }
}

/// Where a link from `source` should enter `target`, expressed as `target`'s top edge.
fn target_top<N, L>(g: &Graph<N, L>, source: usize, target: usize, py: f64) -> f64 {
    let s = &g.nodes[source];
    let mut y = s.y0 - (s.source_links.len() as f64 - 1.0) * py / 2.0;
    for &k in &s.source_links {
        let link = &g.links[k];
        if link.target == target {
            break;
        }
        y += link.width + py;
    }
    for &k in &g.nodes[target].target_links {
        let link = &g.links[k];
        if link.source == source {
            break;
        }
        y -= link.width;
    }
    y
}

/// Where a link to `target` should leave `source`, expressed as `source`'s top edge.
fn source_top<N, L>(g: &Graph<N, L>, source: usize, target: usize, py: f64) -> f64 {
    let t = &g.nodes[target];
    let mut y = t.y0 - (t.target_links.len() as f64 - 1.0) * py / 2.0;
    for &k in &t.target_links {
        let link = &g.links[k];
        if link.source == source {
            break;
        }
        y += link.width + py;
    }
    for &k in &g.nodes[source].source_links {
        let link = &g.links[k];
        if link.target == target {
            break;
        }
        y -= link.width;
    }
    y
}

fn sort_by_breadth<N, L>(g: &Graph<N, L>, column: &mut [usize]) {
    column.sort_by(|&a, &b| g.nodes[a].y0.total_cmp(&g.nodes[b].y0));
}

fn sort_source_links<N, L>(g: &mut Graph<N, L>, node: usize) {
    let mut links = core::mem::take(&mut g.nodes[node].source_links);
    links.sort_by(|&a, &b| {
        let (ta, tb) = (g.links[a].target, g.links[b].target);
        g.nodes[ta].y0.total_cmp(&g.nodes[tb].y0).then(a.cmp(&b))
    });
    g.nodes[node].source_links = links;
}

fn sort_target_links<N, L>(g: &mut Graph<N, L>, node: usize) {
    let mut links = core::mem::take(&mut g.nodes[node].target_links);
    links.sort_by(|&a, &b| {
        let (sa, sb) = (g.links[a].source, g.links[b].source);
        g.nodes[sa].y0.total_cmp(&g.nodes[sb].y0).then(a.cmp(&b))
    });
    g.nodes[node].target_links = links;
}

/// Re-sorts the link lists of the neighbors of a node that just moved.
fn reorder_node_links<N, L>(g: &mut Graph<N, L>, node: usize) {
    let sources: Vec<usize> = g.nodes[node].target_links.iter().map(|&k| g.links[k].source).collect();
    for s in sources {
        sort_source_links(g, s);
    }
    let targets: Vec<usize> = g.nodes[node].source_links.iter().map(|&k| g.links[k].target).collect();
    for t in targets {
        sort_target_links(g, t);
    }
}

fn link_breadths<N, L>(g: &mut Graph<N, L>) {
    for i in 0..g.nodes.len() {
        let mut y0 = g.nodes[i].y0;
        let mut y1 = y0;
        for j in 0..g.nodes[i].source_links.len() {
            let link = &mut g.links[g.nodes[i].source_links[j]];
            link.y0 = y0 + link.width / 2.0;
            y0 += link.width;
        }
        for j in 0..g.nodes[i].target_links.len() {
            let link = &mut g.links[g.nodes[i].target_links[j]];
            link.y1 = y1 + link.width / 2.0;
            y1 += link.width;
        }
    }
}
