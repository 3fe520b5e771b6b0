// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests for collapsing and expanding sankey subtrees.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use quilt_charts::sankey::{NodeIcon, Sankey, SankeyConfig, SankeyData, selectors};
use quilt_charts::{Accessor, Component, Size};

type Rec = BTreeMap<String, String>;

fn rec(pairs: &[(&str, String)]) -> Rec {
    pairs
        .iter()
        .map(|(k, v)| (String::from(*k), v.clone()))
        .collect()
}

/// A tree rooted at node `0`; node `i + 1` hangs below `parents[i] % (i + 1)`.
fn tree(parents: &[usize]) -> (usize, Vec<(usize, usize)>) {
    let edges = parents
        .iter()
        .enumerate()
        .map(|(i, p)| (p % (i + 1), i + 1))
        .collect();
    (parents.len() + 1, edges)
}

fn sankey(n: usize, edges: &[(usize, usize)]) -> Sankey<Rec, Rec> {
    let config = SankeyConfig::default()
        .with_duration(0.0)
        .with_id(Accessor::field("id"))
        .with_link_value(Accessor::func(|d: &Rec, _| {
            d.get("value").and_then(|v| v.parse().ok())
        }));
    let mut s = Sankey::new(config);
    s.set_size(Size::new(600.0, 400.0));
    s.set_data(SankeyData::new(
        (0..n).map(|i| rec(&[("id", i.to_string())])).collect(),
        edges
            .iter()
            .map(|(a, b)| {
                rec(&[
                    ("source", a.to_string()),
                    ("target", b.to_string()),
                    ("value", "1".into()),
                ])
            })
            .collect(),
    ));
    s
}

fn descendants(root: usize, edges: &[(usize, usize)]) -> BTreeSet<usize> {
    let mut out = BTreeSet::new();
    let mut stack = vec![root];
    while let Some(n) = stack.pop() {
        for &(a, b) in edges {
            if a == n && out.insert(b) {
                stack.push(b);
            }
        }
    }
    out
}

fn visible(s: &Sankey<Rec, Rec>) -> BTreeSet<usize> {
    s.nodes().iter().filter_map(|n| n.id.parse().ok()).collect()
}

proptest! {
    #[test]
    fn collapse_hides_descendants_and_expand_restores_them(
        parents in prop::collection::vec(0_usize..64, 1..16),
        pick in 0_usize..64,
    ) {
        let (n, edges) = tree(&parents);
        let target = pick % n;
        let mut s = sankey(n, &edges);
        s.render(None);
        prop_assert!(s.error().is_none());
        prop_assert_eq!(visible(&s).len(), n);
        prop_assert_eq!(s.elements().select(selectors::NODE).count(), n);

        s.set_collapsed(&target.to_string(), true);
        s.render(None);
        let hidden = descendants(target, &edges);
        let expected: BTreeSet<usize> = (0..n).filter(|i| !hidden.contains(i)).collect();
        prop_assert!(s.is_collapsed(&target.to_string()));
        prop_assert_eq!(visible(&s), expected);
        prop_assert_eq!(s.elements().select(selectors::NODE).count(), n - hidden.len());

        let node = s.node_by_id(&target.to_string());
        prop_assert!(node.is_some());
        if let Some(node) = node {
            let icon = if hidden.is_empty() { NodeIcon::None } else { NodeIcon::Collapsed };
            prop_assert_eq!(node.icon, icon);
            prop_assert!(node.source_links.is_empty());
        }

        prop_assert!(!s.toggle_collapsed(&target.to_string()));
        s.render(None);
        prop_assert_eq!(visible(&s).len(), n);
        prop_assert_eq!(s.links().len(), edges.len());
    }
}
