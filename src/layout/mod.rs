//! Radial tree layout
//!
//! Breadth-first from a tree root. Each edge turns by the angle assigned to
//! the child's residue class and shrinks with depth:
//!   len(d) = base / √(d·scale − ε)
//!
//! Pure: the forest is only read.

mod viewport;

pub use viewport::{Bounds, ExportSize, Viewport};

use std::collections::{HashMap, VecDeque};
use std::f64::consts::FRAC_PI_2;

use serde::Serialize;
use thiserror::Error;

use crate::forest::Forest;
use crate::rules::RuleConfig;
use crate::Value;

/// Errors raised by layout.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// Requested root has no tree.
    #[error("no tree with root {0}")]
    UnknownTree(Value),

    /// Modulus must be at least 1.
    #[error("layout modulus must be > 0")]
    ZeroModulus,
}

/// Layout tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutParams {
    /// Modulus used to pick the branch angle.
    pub modulus: u32,
    /// Branch angle (degrees) per residue class; missing entries count as 0.
    pub angles: Vec<f64>,
    /// Heading of the root (degrees, 0 = up).
    pub init_angle: f64,
    /// Edge length scale.
    pub base_length: f64,
    /// Depth multiplier inside the square root.
    pub depth_scale: f64,
    /// Offset subtracted inside the square root.
    pub depth_epsilon: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            modulus: 2,
            angles: vec![7.5, -15.0],
            init_angle: 0.0,
            base_length: 50.0,
            depth_scale: 0.5,
            depth_epsilon: 0.2,
        }
    }
}

impl LayoutParams {
    /// Angles and modulus taken from a rule configuration.
    pub fn from_config(config: &RuleConfig) -> Self {
        Self {
            modulus: config.modulus,
            angles: config.angles.clone(),
            init_angle: config.init_angle,
            ..Self::default()
        }
    }

    /// Set the base edge length.
    pub fn with_base_length(mut self, base_length: f64) -> Self {
        self.base_length = base_length;
        self
    }

    /// Set the depth decay constants.
    pub fn with_depth_decay(mut self, scale: f64, epsilon: f64) -> Self {
        self.depth_scale = scale;
        self.depth_epsilon = epsilon;
        self
    }

    /// Set the initial heading (degrees).
    pub fn with_init_angle(mut self, init_angle: f64) -> Self {
        self.init_angle = init_angle;
        self
    }

    /// Edge length leading to a node at `depth`.
    ///
    /// Falls back to `base_length` if the radicand is not positive.
    pub fn branch_length(&self, depth: u32) -> f64 {
        let radicand = depth as f64 * self.depth_scale - self.depth_epsilon;
        if radicand > 0.0 {
            self.base_length / radicand.sqrt()
        } else {
            self.base_length
        }
    }

    /// Turn (radians) applied on the edge into `value`.
    pub fn branch_turn(&self, value: Value) -> f64 {
        let residue = value.rem_euclid(self.modulus.max(1) as Value) as usize;
        self.angles.get(residue).copied().unwrap_or(0.0).to_radians()
    }

    /// Root heading in radians (screen coordinates, y down).
    pub fn root_heading(&self) -> f64 {
        self.init_angle.to_radians() - FRAC_PI_2
    }
}

/// Position and heading of one node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Cumulative heading (radians).
    pub heading: f64,
}

/// Computed layout of one tree.
#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    /// Root laid out.
    pub root: Value,
    /// Node values in BFS order (root first).
    pub order: Vec<Value>,
    /// Positions by value.
    pub positions: HashMap<Value, Placement>,
    /// `(parent, child)` edges in BFS order.
    pub edges: Vec<(Value, Value)>,
    /// Bounding box (includes the origin).
    pub bounds: Bounds,
}

impl Layout {
    /// Placement of `value`, if it was laid out.
    pub fn placement(&self, value: Value) -> Option<&Placement> {
        self.positions.get(&value)
    }

    /// Number of placed nodes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing was placed.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Nearest node within `threshold` of `(x, y)`.
    pub fn hit_test(&self, x: f64, y: f64, threshold: f64) -> Option<Value> {
        let limit = threshold * threshold;
        let mut best: Option<(Value, f64)> = None;
        for &value in &self.order {
            let Some(pos) = self.positions.get(&value) else {
                continue;
            };
            let (dx, dy) = (pos.x - x, pos.y - y);
            let dist = dx * dx + dy * dy;
            if dist < limit && best.map_or(true, |(_, d)| dist < d) {
                best = Some((value, dist));
            }
        }
        best.map(|(value, _)| value)
    }
}

/// Lay out the tree rooted at `root`.
pub fn compute_layout(forest: &Forest, root: Value, params: &LayoutParams) -> Result<Layout, LayoutError> {
    if params.modulus == 0 {
        return Err(LayoutError::ZeroModulus);
    }
    if forest.tree(root).is_none() {
        return Err(LayoutError::UnknownTree(root));
    }

    let origin = Placement {
        x: 0.0,
        y: 0.0,
        heading: params.root_heading(),
    };

    let mut positions = HashMap::new();
    let mut order = vec![root];
    let mut edges = Vec::new();
    let mut bounds = Bounds::at(origin.x, origin.y);
    positions.insert(root, origin);

    let mut queue = VecDeque::from([root]);
    while let Some(parent) = queue.pop_front() {
        let (Some(node), Some(&pos)) = (forest.node(parent), positions.get(&parent)) else {
            continue;
        };

        for &child in node.children() {
            let depth = forest.depth(child).unwrap_or(node.depth() + 1);
            let length = params.branch_length(depth);
            let heading = pos.heading + params.branch_turn(child);
            let placement = Placement {
                x: pos.x + heading.cos() * length,
                y: pos.y + heading.sin() * length,
                heading,
            };

            bounds.include(placement.x, placement.y);
            positions.insert(child, placement);
            order.push(child);
            edges.push((parent, child));
            queue.push_back(child);
        }
    }

    Ok(Layout {
        root,
        order,
        positions,
        edges,
        bounds,
    })
}
