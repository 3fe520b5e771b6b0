// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node-link graph construction and the collapse model.

extern crate alloc;

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use hashbrown::{HashMap, HashSet};
use peniko::Color;
use quilt_core::MarkId;

use crate::accessor::Accessor;
use crate::record::{Record, Value};

pub(crate) const NODE_NAMESPACE: u64 = 0x5a4e_0001;
pub(crate) const LINK_NAMESPACE: u64 = 0x5a4e_0002;

/// Raw sankey input.
#[derive(Clone, Debug, PartialEq)]
pub struct SankeyData<N, L> {
    /// Node records.
    pub nodes: Vec<N>,
    /// Link records; `source` and `target` name node ids.
    pub links: Vec<L>,
}

impl<N, L> SankeyData<N, L> {
    /// Bundles nodes and links.
    pub fn new(nodes: Vec<N>, links: Vec<L>) -> Self {
        Self { nodes, links }
    }
}

impl<N, L> Default for SankeyData<N, L> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }
}

/// Structural problems that prevent a sankey layout.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SankeyError {
    /// The links contain a cycle.
    #[error("circular link")]
    CircularLink,
    /// A link names a node id that does not exist.
    #[error("missing node: {0}")]
    MissingNode(String),
}

/// Expand/collapse affordance of a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeIcon {
    /// The node has no outgoing links in the raw data.
    #[default]
    None,
    /// The node's subtree is shown.
    Expanded,
    /// The node's subtree is hidden.
    Collapsed,
}

/// A laid-out sankey node.
pub struct SankeyNode<N> {
    /// Source record.
    pub datum: Rc<N>,
    /// Index of the record in the raw node list.
    pub index: usize,
    /// Node id.
    pub id: String,
    /// Column from the left.
    pub depth: usize,
    /// Column distance to the furthest sink.
    pub height: usize,
    /// Assigned column after alignment.
    pub layer: usize,
    /// Larger of incoming and outgoing flow.
    pub value: f64,
    /// Left edge.
    pub x0: f64,
    /// Right edge.
    pub x1: f64,
    /// Top edge.
    pub y0: f64,
    /// Bottom edge.
    pub y1: f64,
    /// Outgoing links (indices into the link list).
    pub source_links: Vec<usize>,
    /// Incoming links (indices into the link list).
    pub target_links: Vec<usize>,
    /// Whether the subtree below this node is hidden.
    pub collapsed: bool,
    /// Expand/collapse affordance.
    pub icon: NodeIcon,
    /// Resolved fill.
    pub color: Color,
    /// Resolved label text.
    pub label: Option<String>,
    /// Resolved secondary label text.
    pub sub_label: Option<String>,
    /// Resolved icon text; no icon is drawn when unset.
    pub icon_text: Option<String>,
}

impl<N> SankeyNode<N> {
    /// Element id of the node rectangle.
    pub fn mark_id(&self) -> MarkId {
        MarkId::for_key(NODE_NAMESPACE, &self.id)
    }

    /// Node height.
    pub fn breadth(&self) -> f64 {
        self.y1 - self.y0
    }
}

/// Field access for accessors over laid-out nodes.
///
/// `id`, `depth`, `layer`, `value`, `collapsed` and `expandable` come from the node; any
/// other key reads the source record.
impl<N: Record> Record for SankeyNode<N> {
    fn field(&self, key: &str) -> Option<Value<'_>> {
        match key {
            "id" => Some(Value::Str(self.id.as_str())),
            "depth" => Some(Value::Number(self.depth as f64)),
            "layer" => Some(Value::Number(self.layer as f64)),
            "value" => Some(Value::Number(self.value)),
            "collapsed" => Some(Value::Bool(self.collapsed)),
            "expandable" => Some(Value::Bool(self.icon != NodeIcon::None)),
            _ => self.datum.field(key),
        }
    }
}

impl<N> Clone for SankeyNode<N> {
    fn clone(&self) -> Self {
        Self {
            datum: Rc::clone(&self.datum),
            index: self.index,
            id: self.id.clone(),
            depth: self.depth,
            height: self.height,
            layer: self.layer,
            value: self.value,
            x0: self.x0,
            x1: self.x1,
            y0: self.y0,
            y1: self.y1,
            source_links: self.source_links.clone(),
            target_links: self.target_links.clone(),
            collapsed: self.collapsed,
            icon: self.icon,
            color: self.color,
            label: self.label.clone(),
            sub_label: self.sub_label.clone(),
            icon_text: self.icon_text.clone(),
        }
    }
}

impl<N> fmt::Debug for SankeyNode<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SankeyNode")
            .field("id", &self.id)
            .field("layer", &self.layer)
            .field("value", &self.value)
            .field("x0", &self.x0)
            .field("y0", &self.y0)
            .field("y1", &self.y1)
            .field("collapsed", &self.collapsed)
            .finish_non_exhaustive()
    }
}

/// A laid-out sankey link.
pub struct SankeyLink<L> {
    /// Source record.
    pub datum: Rc<L>,
    /// Index of the record in the raw link list.
    pub index: usize,
    /// Source node (index into the node list).
    pub source: usize,
    /// Target node (index into the node list).
    pub target: usize,
    /// Flow value.
    pub value: f64,
    /// Band width.
    pub width: f64,
    /// Band center at the source.
    pub y0: f64,
    /// Band center at the target.
    pub y1: f64,
    /// Resolved fill.
    pub color: Color,
}

impl<L> Clone for SankeyLink<L> {
    fn clone(&self) -> Self {
        Self {
            datum: Rc::clone(&self.datum),
            index: self.index,
            source: self.source,
            target: self.target,
            value: self.value,
            width: self.width,
            y0: self.y0,
            y1: self.y1,
            color: self.color,
        }
    }
}

impl<L> fmt::Debug for SankeyLink<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SankeyLink")
            .field("index", &self.index)
            .field("source", &self.source)
            .field("target", &self.target)
            .field("value", &self.value)
            .field("width", &self.width)
            .finish_non_exhaustive()
    }
}

/// Element id of a link band. `ordinal` separates parallel links between the same nodes.
pub(crate) fn link_mark_id(source: &str, target: &str, ordinal: usize) -> MarkId {
    MarkId::for_key(LINK_NAMESPACE, source)
        .child_key(target)
        .child(ordinal as u64)
}

/// Accessors needed to read the raw graph.
pub(crate) struct GraphAccessors<'a, N, L> {
    pub(crate) id: Option<&'a Accessor<N, String>>,
    pub(crate) source: &'a Accessor<L, String>,
    pub(crate) target: &'a Accessor<L, String>,
    pub(crate) value: &'a Accessor<L, f64>,
}

/// The visible graph: nodes and links left after removing collapsed subtrees.
pub(crate) struct Graph<N, L> {
    pub(crate) nodes: Vec<SankeyNode<N>>,
    pub(crate) links: Vec<SankeyLink<L>>,
}

impl<N, L> Default for Graph<N, L> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }
}

/// Builds the visible graph from raw records.
///
/// A node is visible if some path from a root (a node without incoming links) reaches it
/// without passing through a collapsed node. Collapsed nodes stay visible but lose their
/// outgoing links.
pub(crate) fn build<N: Record, L: Record>(
    nodes: &[Rc<N>],
    links: &[Rc<L>],
    acc: &GraphAccessors<'_, N, L>,
    collapsed: &HashSet<String>,
) -> Result<Graph<N, L>, SankeyError> {
    let ids: Vec<String> = nodes
        .iter()
        .enumerate()
        .map(|(i, d)| {
            acc.id
                .and_then(|a| a.resolve(d, i))
                .unwrap_or_else(|| i.to_string())
        })
        .collect();
    // Later records win on duplicate ids.
    let by_id: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();

    let mut raw_links: Vec<(usize, usize, usize, f64)> = Vec::with_capacity(links.len());
    for (i, l) in links.iter().enumerate() {
        let endpoint = |a: &Accessor<L, String>| -> Result<usize, SankeyError> {
            let key = a.resolve(l, i).unwrap_or_default();
            by_id
                .get(key.as_str())
                .copied()
                .ok_or(SankeyError::MissingNode(key))
        };
        let s = endpoint(acc.source)?;
        let t = endpoint(acc.target)?;
        let value = acc
            .value
            .resolve(l, i)
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(0.0);
        raw_links.push((i, s, t, value));
    }

    let mut outgoing: Vec<Vec<usize>> = alloc::vec![Vec::new(); nodes.len()];
    let mut has_incoming = alloc::vec![false; nodes.len()];
    for (k, &(_, s, t, _)) in raw_links.iter().enumerate() {
        outgoing[s].push(k);
        has_incoming[t] = true;
    }
    if has_cycle(&outgoing, &raw_links) {
        return Err(SankeyError::CircularLink);
    }
    let is_collapsed = |n: usize| collapsed.contains(ids[n].as_str());

    let mut visible = alloc::vec![false; nodes.len()];
    let mut queue: VecDeque<usize> = (0..nodes.len())
        .filter(|&n| !has_incoming[n] && by_id.get(ids[n].as_str()) == Some(&n))
        .collect();
    for &n in &queue {
        visible[n] = true;
    }
    while let Some(n) = queue.pop_front() {
        if is_collapsed(n) {
            continue;
        }
        for &k in &outgoing[n] {
            let t = raw_links[k].2;
            if !visible[t] {
                visible[t] = true;
                queue.push_back(t);
            }
        }
    }

    let mut remap = alloc::vec![usize::MAX; nodes.len()];
    let mut out_nodes = Vec::new();
    for (n, d) in nodes.iter().enumerate() {
        if !visible[n] {
            continue;
        }
        remap[n] = out_nodes.len();
        let collapsed_here = is_collapsed(n);
        out_nodes.push(SankeyNode {
            datum: Rc::clone(d),
            index: n,
            id: ids[n].clone(),
            depth: 0,
            height: 0,
            layer: 0,
            value: 0.0,
            x0: 0.0,
            x1: 0.0,
            y0: 0.0,
            y1: 0.0,
            source_links: Vec::new(),
            target_links: Vec::new(),
            collapsed: collapsed_here,
            icon: match (outgoing[n].is_empty(), collapsed_here) {
                (true, _) => NodeIcon::None,
                (false, true) => NodeIcon::Collapsed,
                (false, false) => NodeIcon::Expanded,
            },
            color: Color::TRANSPARENT,
            label: None,
            sub_label: None,
            icon_text: None,
        });
    }

    let mut out_links = Vec::new();
    for &(i, s, t, value) in &raw_links {
        if !visible[s] || !visible[t] || is_collapsed(s) {
            continue;
        }
        let k = out_links.len();
        let (s, t) = (remap[s], remap[t]);
        out_nodes[s].source_links.push(k);
        out_nodes[t].target_links.push(k);
        out_links.push(SankeyLink {
            datum: Rc::clone(&links[i]),
            index: i,
            source: s,
            target: t,
            value,
            width: 0.0,
            y0: 0.0,
            y1: 0.0,
            color: Color::TRANSPARENT,
        });
    }

    Ok(Graph {
        nodes: out_nodes,
        links: out_links,
    })
}

/// Kahn's algorithm: any node left unvisited sits on a cycle.
fn has_cycle(outgoing: &[Vec<usize>], links: &[(usize, usize, usize, f64)]) -> bool {
    let mut indegree = alloc::vec![0_usize; outgoing.len()];
    for &(_, _, t, _) in links {
        indegree[t] += 1;
    }
    let mut ready: Vec<usize> = (0..outgoing.len()).filter(|&n| indegree[n] == 0).collect();
    let mut visited = 0;
    while let Some(n) = ready.pop() {
        visited += 1;
        for &k in &outgoing[n] {
            let t = links[k].2;
            indegree[t] -= 1;
            if indegree[t] == 0 {
                ready.push(t);
            }
        }
    }
    visited < outgoing.len()
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeMap;

    use super::*;

    type Rec = BTreeMap<String, String>;

    fn node(id: &str) -> Rc<Rec> {
        let mut m = BTreeMap::new();
        m.insert("id".into(), id.into());
        Rc::new(m)
    }

    fn link(s: &str, t: &str) -> Rc<Rec> {
        let mut m = BTreeMap::new();
        m.insert("source".into(), s.into());
        m.insert("target".into(), t.into());
        Rc::new(m)
    }

    fn graph(collapsed: &[&str]) -> Result<Graph<Rec, Rec>, SankeyError> {
        let id = Accessor::field("id");
        let source = Accessor::field("source");
        let target = Accessor::field("target");
        let value = Accessor::constant(1.0);
        let acc = GraphAccessors {
            id: Some(&id),
            source: &source,
            target: &target,
            value: &value,
        };
        let nodes = [node("a"), node("b"), node("c"), node("d")];
        let links = [link("a", "b"), link("b", "c"), link("a", "d")];
        let collapsed = collapsed.iter().map(|s| String::from(*s)).collect();
        build(&nodes, &links, &acc, &collapsed)
    }

    #[test]
    fn collapsing_hides_the_subtree() {
        let g = graph(&["b"]).unwrap();
        let ids: Vec<&str> = g.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "d"]);
        assert_eq!(g.links.len(), 2);
        assert_eq!(g.nodes[1].icon, NodeIcon::Collapsed);
        assert_eq!(g.nodes[0].icon, NodeIcon::Expanded);
        assert_eq!(g.nodes[2].icon, NodeIcon::None);
    }

    #[test]
    fn collapsing_the_root_keeps_only_the_root() {
        let g = graph(&["a"]).unwrap();
        assert_eq!(g.nodes.len(), 1);
        assert!(g.links.is_empty());
    }

    #[test]
    fn expanding_restores_everything() {
        let g = graph(&[]).unwrap();
        assert_eq!(g.nodes.len(), 4);
        assert_eq!(g.links.len(), 3);
    }

    #[test]
    fn unknown_link_endpoint_is_an_error() {
        let id = Accessor::field("id");
        let source = Accessor::field("source");
        let target = Accessor::field("target");
        let value = Accessor::constant(1.0);
        let acc = GraphAccessors {
            id: Some(&id),
            source: &source,
            target: &target,
            value: &value,
        };
        let err = build(&[node("a")], &[link("a", "z")], &acc, &HashSet::new());
        assert_eq!(err.err(), Some(SankeyError::MissingNode("z".into())));
    }

    #[test]
    fn cycles_are_rejected() {
        let id = Accessor::field("id");
        let source = Accessor::field("source");
        let target = Accessor::field("target");
        let value = Accessor::constant(1.0);
        let acc = GraphAccessors {
            id: Some(&id),
            source: &source,
            target: &target,
            value: &value,
        };
        let nodes = [node("a"), node("b")];
        let links = [link("a", "b"), link("b", "a")];
        let err = build(&nodes, &links, &acc, &HashSet::new());
        assert_eq!(err.err(), Some(SankeyError::CircularLink));
    }
}
