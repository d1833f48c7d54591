//! Sample tracing
//!
//! Walks `s, f(s), f(f(s)), ...` until the walk
//! - lands on a value already in the forest (join),
//! - repeats a value of its own trace (new cycle), or
//! - exceeds the magnitude/step ceilings (divergent).
//!
//! Tracing only reads the forest; merging is done by [`crate::forest::Forest`].

use std::collections::HashMap;
use std::fmt;

use crate::forest::Forest;
use crate::rules::RuleSet;
use crate::Value;

/// Largest magnitude a trajectory may reach before it counts as divergent.
pub const DEFAULT_MAX_VALUE: Value = 1_000_000_000_000_000_000;

/// Longest trajectory traced before it counts as divergent.
pub const DEFAULT_MAX_STEPS: usize = 10_000;

/// Ceilings guaranteeing that every trace terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceLimits {
    /// Magnitude ceiling.
    pub max_value: Value,
    /// Step ceiling.
    pub max_steps: usize,
}

impl Default for TraceLimits {
    fn default() -> Self {
        Self {
            max_value: DEFAULT_MAX_VALUE,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl TraceLimits {
    /// Set the magnitude ceiling.
    pub fn with_max_value(mut self, max_value: Value) -> Self {
        self.max_value = max_value.max(1);
        self
    }

    /// Set the step ceiling.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }
}

/// Why a sample was excluded from the forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divergence {
    /// Trajectory value grew past the magnitude ceiling.
    Magnitude {
        /// First value over the ceiling.
        value: Value,
    },
    /// Trajectory neither joined nor cycled within the step ceiling.
    StepLimit {
        /// Number of values traced.
        steps: usize,
    },
    /// The rule set produced no value (division by zero, overflow).
    Undefined {
        /// Input the rule failed on.
        at: Value,
    },
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Divergence::Magnitude { value } => write!(f, "diverged to {}", value),
            Divergence::StepLimit { steps } => write!(f, "did not converge in {} steps", steps),
            Divergence::Undefined { at } => write!(f, "rule undefined at {}", at),
        }
    }
}

/// Classified trajectory of one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trace {
    /// The sample is already part of the forest.
    Known {
        /// Root of the tree holding the sample.
        root: Value,
    },
    /// The walk reached a node of an existing tree.
    ///
    /// `path` starts at the sample and ends at that node.
    Joined {
        /// Visited values, sample first.
        path: Vec<Value>,
        /// Root of the joined tree.
        root: Value,
    },
    /// The walk closed a new cycle.
    ///
    /// `path` starts at the sample and is extended around the cycle so
    /// that it ends at `root`; every value's successor follows it.
    Cycle {
        /// Visited values, sample first, root last.
        path: Vec<Value>,
        /// Minimum of the cycle members.
        root: Value,
        /// Value following the root inside the cycle.
        successor: Value,
    },
    /// The sample must be excluded.
    Diverged(Divergence),
}

impl Trace {
    /// Path to merge, if any.
    pub fn path(&self) -> Option<&[Value]> {
        match self {
            Trace::Joined { path, .. } | Trace::Cycle { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Root the sample belongs to, unless it diverged.
    pub fn root(&self) -> Option<Value> {
        match self {
            Trace::Known { root } | Trace::Joined { root, .. } | Trace::Cycle { root, .. } => {
                Some(*root)
            }
            Trace::Diverged(_) => None,
        }
    }

    /// Largest value on the traced path.
    pub fn peak(&self) -> Option<Value> {
        self.path().and_then(|path| path.iter().copied().max())
    }
}

/// Trace `sample` against the current forest.
pub fn trace_sample(sample: Value, rules: &RuleSet, forest: &Forest, limits: &TraceLimits) -> Trace {
    if let Some(root) = forest.root_of(sample) {
        return Trace::Known { root };
    }

    let mut sequence: Vec<Value> = Vec::new();
    let mut seen: HashMap<Value, usize> = HashMap::new();
    let mut curr = sample;

    loop {
        if curr.unsigned_abs() > limits.max_value.unsigned_abs() {
            return Trace::Diverged(Divergence::Magnitude { value: curr });
        }

        if let Some(root) = forest.root_of(curr) {
            sequence.push(curr);
            return Trace::Joined {
                path: sequence,
                root,
            };
        }

        if let Some(&first) = seen.get(&curr) {
            return close_cycle(sequence, first, curr);
        }

        if sequence.len() >= limits.max_steps {
            return Trace::Diverged(Divergence::StepLimit {
                steps: sequence.len(),
            });
        }

        seen.insert(curr, sequence.len());
        sequence.push(curr);

        curr = match rules.apply(curr) {
            Some(next) => next,
            None => return Trace::Diverged(Divergence::Undefined { at: curr }),
        };
    }
}

/// `sequence[first..]` is the cycle and `repeat == sequence[first]`.
fn close_cycle(mut sequence: Vec<Value>, first: usize, repeat: Value) -> Trace {
    let (offset, root) = sequence[first..]
        .iter()
        .copied()
        .enumerate()
        .min_by_key(|&(_, value)| value)
        .unwrap_or((0, repeat));
    let root_index = first + offset;

    sequence.push(repeat);
    let successor = sequence[root_index + 1];
    // Walk around once more so the path ends on the root.
    sequence.extend_from_within(first + 1..=root_index);

    Trace::Cycle {
        path: sequence,
        root,
        successor,
    }
}
