//! Weight and height propagation
//!
//! Full passes walk `node_list`, where parents precede children:
//! - heights forward (root → leaves)
//! - weights backward (leaves → root)
//!
//! The incremental path walks each new leaf up to its root and stops as soon
//! as a recomputed weight equals the stored one. Weights only grow as
//! samples are appended, so every ancestor above that point is already
//! current.

use super::Forest;
use crate::Value;

/// Forward pass: `height = max(value, parent.height)`, roots keep their value.
///
/// Leaves whose height equals their tree's highest value become that tree's
/// highest leaf.
pub fn compute_heights(forest: &mut Forest) {
    let order = forest.node_list.clone();
    for value in order {
        let Some(node) = forest.nodes.get(&value) else {
            continue;
        };
        let (root, parent, is_root, is_leaf) = (node.root, node.parent, node.is_root(), node.is_leaf());

        let height = if is_root {
            value
        } else {
            let parent_height = forest.nodes.get(&parent).map_or(parent, |p| p.height);
            value.max(parent_height)
        };
        if let Some(node) = forest.nodes.get_mut(&value) {
            node.height = height;
        }

        if is_leaf {
            if let Some(meta) = forest.trees.get_mut(&root) {
                if meta.highest == height {
                    meta.highest_leaf = value;
                }
            }
        }
    }
}

/// Backward pass: leaves weigh 1, internal nodes the sum of their children.
///
/// Each root's weight is copied to its tree's `leaf_count`.
pub fn compute_weights(forest: &mut Forest) {
    for i in (0..forest.node_list.len()).rev() {
        let value = forest.node_list[i];
        let weight = recomputed_weight(forest, value);
        let Some(node) = forest.nodes.get_mut(&value) else {
            continue;
        };
        node.weight = weight;
        if node.is_root() {
            if let Some(meta) = forest.trees.get_mut(&value) {
                meta.leaf_count = weight;
            }
        }
    }
}

/// Incremental update after `leaf` was spliced into its tree.
///
/// Returns the number of nodes whose weight changed.
pub fn propagate_from(forest: &mut Forest, leaf: Value) -> usize {
    let Some(root) = forest.root_of(leaf) else {
        return 0;
    };

    let mut updated = 0;
    let mut curr = leaf;
    loop {
        let weight = recomputed_weight(forest, curr);
        let Some(node) = forest.nodes.get_mut(&curr) else {
            break;
        };
        if curr != leaf && node.weight == weight {
            break;
        }
        node.weight = weight;
        updated += 1;

        if curr == root {
            if let Some(meta) = forest.trees.get_mut(&root) {
                meta.leaf_count = weight;
            }
            break;
        }
        curr = node.parent;
    }

    let leaf_height = forest.height(leaf);
    if let (Some(height), Some(meta)) = (leaf_height, forest.trees.get_mut(&root)) {
        if height >= meta.highest {
            meta.highest_leaf = leaf;
        }
    }

    updated
}

fn recomputed_weight(forest: &Forest, value: Value) -> u64 {
    match forest.nodes.get(&value) {
        Some(node) if node.is_leaf() => 1,
        Some(node) => node
            .children
            .iter()
            .filter_map(|child| forest.nodes.get(child))
            .map(|child| child.weight)
            .sum(),
        None => 0,
    }
}
