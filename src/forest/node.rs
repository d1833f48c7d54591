//! Forest node and per-tree metadata

use serde::Serialize;

use crate::Value;

/// One distinct value reached by some traced sample.
///
/// Identity is the value itself. `parent` is the value this node maps to
/// under one rule application. For a tree root it points at the root's
/// successor inside its cycle; that link is informational and is never a
/// tree edge (the root does not appear among its successor's children).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub(crate) value: Value,
    pub(crate) parent: Value,
    pub(crate) root: Value,
    pub(crate) children: Vec<Value>,
    pub(crate) depth: u32,
    pub(crate) height: Value,
    pub(crate) weight: u64,
}

impl Node {
    pub(crate) fn root(value: Value, successor: Value) -> Self {
        Self {
            value,
            parent: successor,
            root: value,
            children: Vec::new(),
            depth: 0,
            height: value,
            weight: 0,
        }
    }

    pub(crate) fn child_of(value: Value, parent: &Node) -> Self {
        Self {
            value,
            parent: parent.value,
            root: parent.root,
            children: Vec::new(),
            depth: parent.depth + 1,
            height: value.max(parent.height),
            weight: 0,
        }
    }

    /// Node value.
    pub fn value(&self) -> Value {
        self.value
    }

    /// Successor under the rule set.
    pub fn parent(&self) -> Value {
        self.parent
    }

    /// Root of the tree this node belongs to.
    pub fn tree_root(&self) -> Value {
        self.root
    }

    /// Values mapping onto this node, in insertion order.
    pub fn children(&self) -> &[Value] {
        &self.children
    }

    /// Edge count to the root.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Largest value on the path from the root down to this node.
    pub fn height(&self) -> Value {
        self.height
    }

    /// Number of leaves below (and including) this node.
    ///
    /// Zero until statistics have been propagated.
    pub fn weight(&self) -> u64 {
        self.weight
    }

    /// Whether this node is its tree's root.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.value == self.root
    }

    /// Whether nothing maps onto this node.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Running metadata for one tree, keyed by its cycle root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeMeta {
    /// Minimum value of the cycle; identifies the tree.
    pub root: Value,
    /// Largest value in the tree.
    pub highest: Value,
    /// Smallest value in the tree.
    pub lowest: Value,
    /// First node inserted at the maximum depth.
    pub deepest: Value,
    /// Depth of `deepest`.
    pub max_depth: u32,
    /// Leaf whose height equals `highest`.
    pub highest_leaf: Value,
    /// Value designated for labelling, if any.
    pub start_value: Option<Value>,
    /// Root weight, cached for sorting.
    pub leaf_count: u64,
    /// Number of nodes assigned to this tree.
    pub node_count: usize,
}

impl TreeMeta {
    pub(crate) fn new(root: Value) -> Self {
        Self {
            root,
            highest: root,
            lowest: root,
            deepest: root,
            max_depth: 0,
            highest_leaf: root,
            start_value: None,
            leaf_count: 1,
            node_count: 1,
        }
    }

    pub(crate) fn observe(&mut self, value: Value, depth: u32) {
        self.node_count += 1;
        if value > self.highest {
            self.highest = value;
        }
        if value < self.lowest {
            self.lowest = value;
        }
        if depth > self.max_depth {
            self.max_depth = depth;
            self.deepest = value;
        }
    }
}
