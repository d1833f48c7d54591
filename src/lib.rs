//! # Generalized Collatz Forests
//!
//! Builds the forest of trees produced by iterating a per-residue rule set
//! `n ↦ f_{n mod M}(n)` over a set of starting values, and lays trees out as
//! radial fractal drawings.
//!
//! ## Pipeline
//!
//! 1. **Rules**: compile `M` arithmetic expressions into a step function
//! 2. **Trace**: follow each sample until it joins the forest, closes a
//!    cycle, or diverges
//! 3. **Merge**: splice the unknown prefix into the shared forest; each
//!    tree is rooted at the minimum of its cycle
//! 4. **Stats**: heights forward, weights backward (or incrementally)
//! 5. **Layout**: BFS placement with per-residue branch angles
//!
//! ## Usage Example
//!
//! ```
//! use collatz_forest::{ForestBuilder, RuleConfig, SampleSpec};
//!
//! let report = ForestBuilder::new(RuleConfig::classic(), SampleSpec::range(1, 100))
//!     .build()
//!     .unwrap();
//! let forest = &report.forest;
//! assert_eq!(forest.roots(), vec![1]);
//! assert_eq!(forest.height(27), Some(9232));
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod forest;     // Node arena, merging, statistics
pub mod layout;     // Radial layout and viewport helpers
pub mod persist;    // Saved tree files
pub mod rules;      // Expression parsing and rule sets
pub mod sampling;   // Sample-set generation
pub mod trace;      // Trajectory classification
/// Python bindings exposing the forest to external runtimes.
#[cfg(feature = "python-bindings")]
pub mod python_bindings;

// Re-exports for convenience
pub use forest::{Forest, Node, SampleOutcome, TreeMeta};
pub use layout::{compute_layout, Layout, LayoutError, LayoutParams};
pub use persist::{PersistError, SavedTree};
pub use rules::{RuleConfig, RuleError, RulePreset, RuleSet};
pub use sampling::{SampleError, SampleSpec};
pub use trace::{trace_sample, Divergence, Trace, TraceLimits};

use std::time::{Duration, Instant};

use thiserror::Error;

/// Integer value of a node.
pub type Value = i64;

/// Errors that can occur during a batch build.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Rule configuration could not be compiled.
    #[error("invalid rules: {0}")]
    Rules(#[from] RuleError),

    /// Sample set could not be generated.
    #[error("invalid samples: {0}")]
    Samples(#[from] SampleError),

    /// Every sample diverged (or none were given).
    #[error("no trees found ({divergent} divergent samples)")]
    NoTrees {
        /// Number of samples excluded as divergent.
        divergent: usize,
    },
}

/// Batch build orchestrator.
///
/// Resets a fresh forest, traces every sample, then runs both full
/// statistics passes.
#[derive(Debug, Clone)]
pub struct ForestBuilder {
    config: RuleConfig,
    samples: SampleSpec,
    limits: TraceLimits,
}

/// Result of a batch build.
#[derive(Debug)]
pub struct BuildReport {
    /// The built forest.
    pub forest: Forest,
    /// Compiled rules, reusable for interactive additions.
    pub rules: RuleSet,
    /// Number of samples traced.
    pub samples: usize,
    /// Wall-clock build time.
    pub elapsed: Duration,
}

impl BuildReport {
    /// Tree to show first: the start value's tree, otherwise the largest.
    pub fn default_root(&self) -> Option<Value> {
        self.forest
            .start_value()
            .and_then(|start| self.forest.root_of(start))
            .or_else(|| self.forest.roots_by_leaf_count().first().copied())
    }
}

impl ForestBuilder {
    /// Create a builder.
    pub fn new(config: RuleConfig, samples: SampleSpec) -> Self {
        Self {
            config,
            samples,
            limits: TraceLimits::default(),
        }
    }

    /// Override the divergence ceilings.
    pub fn with_limits(mut self, limits: TraceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Rule configuration.
    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    /// Run the batch build.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        let rules = RuleSet::from_config(&self.config)?;
        let samples = self.samples.samples()?;

        let mut forest = Forest::with_limits(self.limits);
        for &sample in &samples {
            forest.add_sample(sample, &rules, false);
        }
        forest::stats::compute_weights(&mut forest);
        forest::stats::compute_heights(&mut forest);

        if let Some(start) = self.samples.start_value {
            forest.set_start_value(start);
        }

        let elapsed = started.elapsed();
        tracing::info!(
            samples = samples.len(),
            nodes = forest.len(),
            trees = forest.tree_count(),
            divergent = forest.divergent().len(),
            elapsed_ms = elapsed.as_secs_f64() * 1e3,
            "forest built"
        );

        if forest.tree_count() == 0 {
            return Err(BuildError::NoTrees {
                divergent: forest.divergent().len(),
            });
        }

        Ok(BuildReport {
            forest,
            rules,
            samples: samples.len(),
            elapsed,
        })
    }

    /// Interactively add `value` as the new start value.
    ///
    /// Uses the incremental statistics path and labels the value's tree.
    pub fn add_start_value(forest: &mut Forest, rules: &RuleSet, value: Value) -> SampleOutcome {
        let outcome = forest.add_sample(value, rules, true);
        forest.set_start_value(value);
        outcome
    }
}
