//! Saved tree files
//!
//! A saved tree stores only its leaves and the rule configuration; replaying
//! the leaves under the same rules regenerates the identical tree.
//!
//! ```json
//! { "version": "1.0", "root": 1, "leaves": [27, 12],
//!   "config": { "modulus": 2, "rules": ["n/2", "3*n+1"], "angles": [7.5, -15], "initAngle": 0 } }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::forest::{stats, Forest};
use crate::rules::{RuleConfig, RuleSet};
use crate::trace::TraceLimits;
use crate::Value;

/// File format version written by this crate.
pub const SAVE_FORMAT_VERSION: &str = "1.0";

/// Errors raised while reading, validating or replaying a saved tree.
#[derive(Debug, Error)]
pub enum PersistError {
    /// File could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Content is not valid JSON or is missing fields.
    #[error("malformed tree file: {0}")]
    Json(#[from] serde_json::Error),

    /// Content parsed but is not a usable tree.
    #[error("invalid tree file: {0}")]
    Invalid(String),
}

/// On-disk representation of one tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedTree {
    /// Format version.
    pub version: String,
    /// Root of the saved tree.
    pub root: Value,
    /// Leaves of the saved tree, in insertion order.
    pub leaves: Vec<Value>,
    /// Rules and angles the tree was built with.
    pub config: RuleConfig,
}

impl SavedTree {
    /// Snapshot the tree rooted at `root`.
    pub fn capture(forest: &Forest, root: Value, config: &RuleConfig) -> Result<Self, PersistError> {
        if forest.tree(root).is_none() {
            return Err(PersistError::Invalid(format!("no tree with root {}", root)));
        }
        Ok(Self {
            version: SAVE_FORMAT_VERSION.to_string(),
            root,
            leaves: forest.leaves(root),
            config: config.clone(),
        })
    }

    /// Parse and validate JSON text.
    pub fn from_json(text: &str) -> Result<Self, PersistError> {
        let saved: SavedTree = serde_json::from_str(text)?;
        saved.validate()?;
        Ok(saved)
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read and validate a file.
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Write as pretty JSON.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    /// Check version, modulus and rule count.
    pub fn validate(&self) -> Result<(), PersistError> {
        if self.version != SAVE_FORMAT_VERSION {
            return Err(PersistError::Invalid(format!(
                "unsupported version '{}'",
                self.version
            )));
        }
        if self.config.modulus == 0 {
            return Err(PersistError::Invalid("modulus must be > 0".to_string()));
        }
        if self.config.rules.len() != self.config.modulus as usize {
            return Err(PersistError::Invalid(format!(
                "expected {} rules for modulus {}, found {}",
                self.config.modulus,
                self.config.modulus,
                self.config.rules.len()
            )));
        }
        Ok(())
    }

    /// Replay every leaf into a fresh forest and compute statistics.
    ///
    /// The start value of the rebuilt tree is its largest leaf.
    pub fn rebuild(&self) -> Result<Forest, PersistError> {
        self.rebuild_with_limits(TraceLimits::default())
    }

    /// [`SavedTree::rebuild`] with explicit trace limits.
    pub fn rebuild_with_limits(&self, limits: TraceLimits) -> Result<Forest, PersistError> {
        self.validate()?;
        let rules = RuleSet::from_config(&self.config)
            .map_err(|err| PersistError::Invalid(err.to_string()))?;

        let mut forest = Forest::with_limits(limits);
        for &leaf in &self.leaves {
            forest.add_sample(leaf, &rules, false);
        }
        stats::compute_weights(&mut forest);
        stats::compute_heights(&mut forest);

        if let Some(&max_leaf) = self.leaves.iter().max() {
            forest.set_start_value(max_leaf);
        }
        tracing::info!(
            root = self.root,
            leaves = self.leaves.len(),
            nodes = forest.len(),
            "rebuilt saved tree"
        );
        Ok(forest)
    }
}
