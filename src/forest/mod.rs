//! Shared forest of traced samples
//!
//! Nodes live in an arena keyed by value; parent/children links are values,
//! never references. Each tree is keyed by the minimum of its cycle.
//!
//! Lifecycle: empty → built → extended (repeatable). A change of rules or
//! sampling parameters requires [`Forest::reset`].

mod node;
pub mod stats;

pub use node::{Node, TreeMeta};

use std::collections::{BTreeMap, HashMap};

use crate::rules::RuleSet;
use crate::trace::{trace_sample, Divergence, Trace, TraceLimits};
use crate::Value;

/// Result of adding one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Sample was already present; nothing changed.
    AlreadyPresent {
        /// Tree holding the sample.
        root: Value,
    },
    /// Sample's trajectory was merged.
    Merged {
        /// Tree the sample now belongs to.
        root: Value,
        /// Whether this sample discovered the tree.
        new_tree: bool,
        /// Nodes created by this sample.
        new_nodes: usize,
    },
    /// Sample was recorded as divergent.
    Diverged(Divergence),
}

impl SampleOutcome {
    /// Root of the sample's tree, if it has one.
    pub fn root(&self) -> Option<Value> {
        match self {
            SampleOutcome::AlreadyPresent { root } | SampleOutcome::Merged { root, .. } => {
                Some(*root)
            }
            SampleOutcome::Diverged(_) => None,
        }
    }
}

/// Arena of nodes plus per-tree metadata.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    nodes: HashMap<Value, Node>,
    /// Insertion order; parents always precede their children.
    node_list: Vec<Value>,
    trees: BTreeMap<Value, TreeMeta>,
    divergent: Vec<Value>,
    start_value: Option<Value>,
    limits: TraceLimits,
}

impl Forest {
    /// Empty forest with default trace limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty forest with explicit trace limits.
    pub fn with_limits(limits: TraceLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Trace limits applied to every sample.
    pub fn limits(&self) -> &TraceLimits {
        &self.limits
    }

    /// Discard every node, tree and divergent record.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.node_list.clear();
        self.trees.clear();
        self.divergent.clear();
        self.start_value = None;
    }

    /// Trace `sample` and merge its unknown prefix.
    ///
    /// With `update_stats`, weights along the new branch and the tree's
    /// highest leaf are updated incrementally; otherwise the caller is
    /// expected to run [`stats::compute_weights`] and
    /// [`stats::compute_heights`] after the batch.
    pub fn add_sample(&mut self, sample: Value, rules: &RuleSet, update_stats: bool) -> SampleOutcome {
        let trace = trace_sample(sample, rules, self, &self.limits);

        let (path, root, new_tree) = match trace {
            Trace::Known { root } => return SampleOutcome::AlreadyPresent { root },
            Trace::Diverged(reason) => {
                tracing::debug!(sample, %reason, "sample diverged, skipping");
                self.divergent.push(sample);
                return SampleOutcome::Diverged(reason);
            }
            Trace::Joined { path, root } => (path, root, false),
            Trace::Cycle {
                path,
                root,
                successor,
            } => {
                self.register_root(root, successor);
                (path, root, true)
            }
        };

        let mut inserted = Vec::new();
        for i in (0..path.len().saturating_sub(1)).rev() {
            let node = path[i];
            if self.nodes.contains_key(&node) {
                continue;
            }
            if self.add_to_forest(node, root, path[i + 1]) {
                inserted.push(node);
            }
        }

        if update_stats {
            // A sample entering a new cycle away from the root's successor
            // leaves two new branches under the root: the rest of the cycle
            // and its own tail. Every new leaf needs its own walk.
            if inserted.is_empty() {
                stats::propagate_from(self, root);
            }
            for &node in &inserted {
                if self.nodes.get(&node).is_some_and(Node::is_leaf) {
                    stats::propagate_from(self, node);
                }
            }
        }

        SampleOutcome::Merged {
            root,
            new_tree,
            new_nodes: inserted.len(),
        }
    }

    /// Create the tree record for a newly discovered cycle root.
    ///
    /// `successor` is stored as the root's parent for reference only.
    /// Returns `false` if the root is already known.
    pub fn register_root(&mut self, root: Value, successor: Value) -> bool {
        if self.nodes.contains_key(&root) {
            return false;
        }
        self.nodes.insert(root, Node::root(root, successor));
        self.node_list.push(root);
        self.trees.insert(root, TreeMeta::new(root));
        true
    }

    /// Attach `node` under `parent` in the tree rooted at `root`.
    ///
    /// Inserting a node twice is a no-op that returns `false`; the tracer
    /// stops before known nodes, so this only happens on a logic error.
    /// The parent and the tree must already exist.
    pub fn add_to_forest(&mut self, node: Value, root: Value, parent: Value) -> bool {
        if self.nodes.contains_key(&node) {
            tracing::warn!(node, "node already present in forest, ignoring");
            return false;
        }
        let Some(parent_node) = self.nodes.get_mut(&parent) else {
            tracing::warn!(node, parent, "parent missing from forest, ignoring");
            return false;
        };
        if parent_node.root != root || !self.trees.contains_key(&root) {
            tracing::warn!(node, parent, root, "parent belongs to another tree, ignoring");
            return false;
        }

        let child = Node::child_of(node, parent_node);
        parent_node.children.push(node);

        if let Some(meta) = self.trees.get_mut(&root) {
            meta.observe(node, child.depth);
        }
        self.nodes.insert(node, child);
        self.node_list.push(node);
        true
    }

    /// Record `value` as the forest's designated start value and label its tree.
    ///
    /// Returns the tree root, or `None` if the value is not in the forest.
    pub fn set_start_value(&mut self, value: Value) -> Option<Value> {
        self.start_value = Some(value);
        let root = self.root_of(value)?;
        if let Some(meta) = self.trees.get_mut(&root) {
            meta.start_value = Some(value);
        }
        Some(root)
    }

    /// Forest-level start value.
    pub fn start_value(&self) -> Option<Value> {
        self.start_value
    }

    /// Whether `value` is a node.
    pub fn contains(&self, value: Value) -> bool {
        self.nodes.contains_key(&value)
    }

    /// Node by value.
    pub fn node(&self, value: Value) -> Option<&Node> {
        self.nodes.get(&value)
    }

    /// Root of the tree holding `value`.
    pub fn root_of(&self, value: Value) -> Option<Value> {
        self.nodes.get(&value).map(|n| n.root)
    }

    /// Successor of `value`.
    pub fn parent(&self, value: Value) -> Option<Value> {
        self.nodes.get(&value).map(|n| n.parent)
    }

    /// Values mapping onto `value`.
    pub fn children(&self, value: Value) -> Option<&[Value]> {
        self.nodes.get(&value).map(|n| n.children.as_slice())
    }

    /// Leaf-descendant count of `value`.
    pub fn weight(&self, value: Value) -> Option<u64> {
        self.nodes.get(&value).map(|n| n.weight)
    }

    /// Distance of `value` from its root.
    pub fn depth(&self, value: Value) -> Option<u32> {
        self.nodes.get(&value).map(|n| n.depth)
    }

    /// Largest value between the root and `value`.
    pub fn height(&self, value: Value) -> Option<Value> {
        self.nodes.get(&value).map(|n| n.height)
    }

    /// Tree metadata by root.
    pub fn tree(&self, root: Value) -> Option<&TreeMeta> {
        self.trees.get(&root)
    }

    /// All trees, ascending by root.
    pub fn trees(&self) -> impl Iterator<Item = &TreeMeta> {
        self.trees.values()
    }

    /// All roots, ascending.
    pub fn roots(&self) -> Vec<Value> {
        self.trees.keys().copied().collect()
    }

    /// Roots sorted by leaf count (largest first, ties by ascending root).
    pub fn roots_by_leaf_count(&self) -> Vec<Value> {
        let mut roots: Vec<&TreeMeta> = self.trees.values().collect();
        roots.sort_by(|a, b| b.leaf_count.cmp(&a.leaf_count).then(a.root.cmp(&b.root)));
        roots.into_iter().map(|meta| meta.root).collect()
    }

    /// Nodes of one tree in insertion order.
    pub fn tree_nodes(&self, root: Value) -> impl Iterator<Item = &Node> + '_ {
        self.iter().filter(move |node| node.root == root)
    }

    /// Leaves of one tree in insertion order.
    pub fn leaves(&self, root: Value) -> Vec<Value> {
        self.tree_nodes(root)
            .filter(|node| node.is_leaf())
            .map(|node| node.value)
            .collect()
    }

    /// All nodes in insertion order (parents before children).
    pub fn iter(&self) -> impl Iterator<Item = &Node> + '_ {
        self.node_list.iter().filter_map(|value| self.nodes.get(value))
    }

    /// Insertion order of node values.
    pub fn node_list(&self) -> &[Value] {
        &self.node_list
    }

    /// Samples excluded as divergent, in the order they were seen.
    pub fn divergent(&self) -> &[Value] {
        &self.divergent
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the forest holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of trees.
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Content hash of every node's links and statistics.
    ///
    /// Independent of insertion order.
    pub fn fingerprint(&self) -> blake3::Hash {
        self.hash_nodes(|_| true)
    }

    /// Content hash of one tree.
    pub fn tree_fingerprint(&self, root: Value) -> blake3::Hash {
        self.hash_nodes(|node| node.root == root)
    }

    fn hash_nodes(&self, mut include: impl FnMut(&Node) -> bool) -> blake3::Hash {
        let mut values: Vec<&Node> = self.nodes.values().filter(|n| include(n)).collect();
        values.sort_unstable_by_key(|node| node.value);

        let mut hasher = blake3::Hasher::new();
        for node in values {
            hasher.update(&node.value.to_le_bytes());
            hasher.update(&node.parent.to_le_bytes());
            hasher.update(&node.root.to_le_bytes());
            hasher.update(&node.depth.to_le_bytes());
            hasher.update(&node.height.to_le_bytes());
            hasher.update(&node.weight.to_le_bytes());
        }
        hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classic() -> RuleSet {
        RuleSet::new(2, &["n/2", "3*n+1"]).unwrap()
    }

    #[test]
    fn test_merge_builds_cycle_tree() {
        let mut forest = Forest::new();
        let outcome = forest.add_sample(6, &classic(), false);
        assert_eq!(
            outcome,
            SampleOutcome::Merged {
                root: 1,
                new_tree: true,
                new_nodes: 8
            }
        );

        assert_eq!(forest.len(), 9);
        assert_eq!(forest.parent(1), Some(4));
        assert_eq!(forest.children(1), Some(&[2][..]));
        assert_eq!(forest.depth(6), Some(8));
        assert_eq!(forest.node_list()[0], 1);

        let meta = forest.tree(1).unwrap();
        assert_eq!(meta.highest, 16);
        assert_eq!(meta.lowest, 1);
        assert_eq!(meta.deepest, 6);
    }

    #[test]
    fn test_root_is_not_its_successors_child() {
        let mut forest = Forest::new();
        forest.add_sample(1, &classic(), false);
        assert_eq!(forest.children(4), Some(&[][..]));
        assert_eq!(forest.leaves(1), vec![4]);
    }

    #[test]
    fn test_known_sample_is_noop() {
        let mut forest = Forest::new();
        forest.add_sample(12, &classic(), true);
        let before = forest.fingerprint();
        assert_eq!(
            forest.add_sample(3, &classic(), true),
            SampleOutcome::AlreadyPresent { root: 1 }
        );
        assert_eq!(forest.fingerprint(), before);
    }

    #[test]
    fn test_duplicate_insert_ignored() {
        let mut forest = Forest::new();
        forest.add_sample(4, &classic(), false);
        let len = forest.len();
        assert!(!forest.add_to_forest(2, 1, 1));
        assert!(!forest.add_to_forest(99, 1, 12345));
        assert_eq!(forest.len(), len);
    }

    #[test]
    fn test_divergent_samples_recorded() {
        let rules = RuleSet::new(2, &["n/0", "3*n+1"]).unwrap();
        let mut forest = Forest::new();
        assert!(matches!(
            forest.add_sample(8, &rules, false),
            SampleOutcome::Diverged(Divergence::Undefined { at: 8 })
        ));
        assert!(forest.is_empty());
        assert_eq!(forest.divergent(), &[8]);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut forest = Forest::new();
        forest.add_sample(27, &classic(), true);
        forest.set_start_value(27);
        forest.reset();
        assert!(forest.is_empty());
        assert_eq!(forest.tree_count(), 0);
        assert_eq!(forest.start_value(), None);
    }

    #[test]
    fn test_start_value_labels_tree() {
        let mut forest = Forest::new();
        forest.add_sample(7, &classic(), true);
        assert_eq!(forest.set_start_value(7), Some(1));
        assert_eq!(forest.tree(1).unwrap().start_value, Some(7));
        assert_eq!(forest.set_start_value(1_000_001), None);
        assert_eq!(forest.start_value(), Some(1_000_001));
    }

    #[test]
    fn test_roots_by_leaf_count_orders_desc_then_by_root() {
        // 3n-1 has cycles rooted at 1, 5 and 17.
        let rules = RuleSet::new(2, &["n/2", "3*n-1"]).unwrap();
        let mut forest = Forest::new();
        for sample in [1, 3, 16, 5, 160, 27, 17, 23] {
            forest.add_sample(sample, &rules, false);
        }
        stats::compute_weights(&mut forest);

        assert_eq!(forest.tree(1).unwrap().leaf_count, 2);
        assert_eq!(forest.tree(5).unwrap().leaf_count, 3);
        assert_eq!(forest.tree(17).unwrap().leaf_count, 2);
        assert_eq!(forest.roots(), vec![1, 5, 17]);
        assert_eq!(forest.roots_by_leaf_count(), vec![5, 1, 17]);
    }
}
