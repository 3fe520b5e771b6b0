// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grouping records into an arena hierarchy.

extern crate alloc;

use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;
use kurbo::Rect;
use peniko::Color;
use quilt_core::MarkId;

use crate::accessor::Accessor;
use crate::data_model::DataModel;
use crate::record::{Record, Value};

/// Id of the root node.
pub const ROOT_ID: &str = "root";

/// A node of the treemap hierarchy.
///
/// Nodes live in an arena; `parent`, `children` and `top_level` are arena indices.
pub struct TreemapNode<D> {
    /// Layer key. `None` for the root and for leaves.
    pub key: Option<String>,
    /// Path id: `root/<layer keys...>`, leaves append their identity.
    pub id: String,
    /// Distance from the root.
    pub depth: usize,
    /// Own value for leaves, sum of descendants otherwise.
    pub value: f64,
    /// Source record (leaves only).
    pub datum: Option<Rc<D>>,
    /// Source record index (leaves only).
    pub index: Option<usize>,
    /// Parent node.
    pub parent: Option<usize>,
    /// Child nodes, by descending value.
    pub children: Vec<usize>,
    /// The depth-1 ancestor (or the node itself at depth 1).
    pub top_level: Option<usize>,
    /// Tile in plot coordinates, set by the tiling pass.
    pub rect: Rect,
    /// Resolved tile fill.
    pub fill: Color,
}

impl<D> TreemapNode<D> {
    fn new(key: Option<String>, id: String, depth: usize, parent: Option<usize>) -> Self {
        Self {
            key,
            id,
            depth,
            value: 0.0,
            datum: None,
            index: None,
            parent,
            children: Vec::new(),
            top_level: None,
            rect: Rect::ZERO,
            fill: Color::TRANSPARENT,
        }
    }

    /// Returns `true` for nodes without children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Element id of the node's tile.
    pub fn mark_id(&self) -> MarkId {
        MarkId::for_key(NAMESPACE, &self.id)
    }
}

pub(crate) const NAMESPACE: u64 = 0x7ee_3a90;

impl<D> Clone for TreemapNode<D> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            id: self.id.clone(),
            depth: self.depth,
            value: self.value,
            datum: self.datum.clone(),
            index: self.index,
            parent: self.parent,
            children: self.children.clone(),
            top_level: self.top_level,
            rect: self.rect,
            fill: self.fill,
        }
    }
}

impl<D> fmt::Debug for TreemapNode<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreemapNode")
            .field("id", &self.id)
            .field("depth", &self.depth)
            .field("value", &self.value)
            .field("index", &self.index)
            .field("rect", &self.rect)
            .finish_non_exhaustive()
    }
}

/// Exposes `key`, `id`, `depth` and `value`; other fields are read from the leaf's record.
impl<D: Record> Record for TreemapNode<D> {
    fn field(&self, key: &str) -> Option<Value<'_>> {
        match key {
            "key" => self.key.as_deref().map(Value::Str),
            "id" => Some(Value::Str(self.id.as_str())),
            "depth" => Some(Value::Number(self.depth as f64)),
            "value" => Some(Value::Number(self.value)),
            _ => self.datum.as_deref().and_then(|d| d.field(key)),
        }
    }
}

/// Groups records by `layers` into an arena rooted at index `0`.
///
/// Records whose layer key is undefined are left out. Values are summed bottom-up and
/// siblings are sorted by descending value.
pub(crate) fn build<D: Record>(
    data: &DataModel<D>,
    layers: &[Accessor<D, String>],
    value: &Accessor<D, f64>,
    id: Option<&Accessor<D, String>>,
) -> Vec<TreemapNode<D>> {
    let mut nodes = alloc::vec![TreemapNode::new(None, ROOT_ID.into(), 0, None)];
    let mut groups: HashMap<(usize, String), usize> = HashMap::new();

    'records: for (i, d) in data.data().iter().enumerate() {
        let mut keys = Vec::with_capacity(layers.len());
        for layer in layers {
            let Some(key) = layer.resolve(d, i) else {
                continue 'records;
            };
            keys.push(key);
        }

        let mut parent = 0;
        for key in keys {
            parent = match groups.get(&(parent, key.clone())) {
                Some(&idx) => idx,
                None => {
                    let idx = nodes.len();
                    let node = TreemapNode::new(
                        Some(key.clone()),
                        format!("{}/{}", nodes[parent].id, key),
                        nodes[parent].depth + 1,
                        Some(parent),
                    );
                    nodes.push(node);
                    nodes[parent].children.push(idx);
                    groups.insert((parent, key), idx);
                    idx
                }
            };
        }

        let identity = id
            .and_then(|a| a.resolve(d, i))
            .unwrap_or_else(|| i.to_string());
        let idx = nodes.len();
        let mut leaf = TreemapNode::new(
            None,
            format!("{}/{}", nodes[parent].id, identity),
            nodes[parent].depth + 1,
            Some(parent),
        );
        leaf.value = value
            .resolve(d, i)
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(0.0);
        leaf.datum = Some(Rc::clone(d));
        leaf.index = Some(i);
        nodes.push(leaf);
        nodes[parent].children.push(idx);
    }

    // Children always come after their parent in the arena.
    for idx in (1..nodes.len()).rev() {
        if let Some(p) = nodes[idx].parent {
            let v = nodes[idx].value;
            nodes[p].value += v;
        }
    }
    for idx in 0..nodes.len() {
        let mut children = core::mem::take(&mut nodes[idx].children);
        children.sort_by(|&a, &b| nodes[b].value.total_cmp(&nodes[a].value));
        nodes[idx].children = children;
        if let Some(p) = nodes[idx].parent {
            nodes[idx].top_level = if nodes[idx].depth == 1 {
                Some(idx)
            } else {
                nodes[p].top_level
            };
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeMap;
    use alloc::vec;

    use super::*;

    type Row = BTreeMap<String, String>;

    fn row(group: &str, name: &str, value: &str) -> Row {
        let mut m = BTreeMap::new();
        m.insert("group".into(), group.into());
        m.insert("name".into(), name.into());
        m.insert("value".into(), value.into());
        m
    }

    fn value() -> Accessor<Row, f64> {
        Accessor::func(|d: &Row, _| d.get("value").and_then(|v| v.parse().ok()))
    }

    #[test]
    fn groups_sum_and_sort() {
        let mut data = DataModel::new();
        data.set_data(vec![
            row("a", "x", "1"),
            row("b", "y", "5"),
            row("a", "z", "3"),
        ]);
        let nodes = build(&data, &[Accessor::field("group")], &value(), None);
        let root = &nodes[0];
        assert_eq!(root.value, 9.0);
        let first = &nodes[root.children[0]];
        assert_eq!(first.key.as_deref(), Some("b"));
        let a = &nodes[root.children[1]];
        assert_eq!(a.value, 4.0);
        assert_eq!(a.id, "root/a");
        let leaf = &nodes[a.children[0]];
        assert_eq!(leaf.index, Some(2));
        assert_eq!(leaf.id, "root/a/2");
        assert_eq!(leaf.top_level, Some(root.children[1]));
    }

    #[test]
    fn undefined_layer_keys_are_left_out() {
        let mut data = DataModel::new();
        let mut missing = row("a", "x", "1");
        missing.remove("group");
        data.set_data(vec![missing, row("b", "y", "2")]);
        let nodes = build(&data, &[Accessor::field("group")], &value(), None);
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].value, 2.0);
    }

    #[test]
    fn id_accessor_names_leaves() {
        let mut data = DataModel::new();
        data.set_data(vec![row("a", "x", "1")]);
        let layers = [Accessor::field("group"), Accessor::field("name")];
        let id = Accessor::field("name");
        let nodes = build(&data, &layers, &value(), Some(&id));
        assert_eq!(nodes.last().map(|n| n.id.as_str()), Some("root/a/x/x"));
        assert_eq!(nodes.last().map(|n| n.depth), Some(3));
    }
}
