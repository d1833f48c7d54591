//! Python bindings that expose the forest engine via PyO3.
use pyo3::{
    exceptions::{PyKeyError, PyValueError},
    prelude::*,
    types::PyModule,
};

use crate::forest::stats;
use crate::{compute_layout, Forest, LayoutParams, RuleConfig, RuleSet, SampleOutcome, Value};

/// Python-facing forest bound to one rule configuration.
#[pyclass]
#[derive(Debug)]
pub struct PyForest {
    config: RuleConfig,
    rules: RuleSet,
    forest: Forest,
}

#[pymethods]
impl PyForest {
    #[new]
    #[pyo3(signature = (modulus = 2, rules = None))]
    /// Create an empty forest for `rules` (defaults to the classic rules).
    pub fn new(modulus: u32, rules: Option<Vec<String>>) -> PyResult<Self> {
        let config = match rules {
            Some(rules) => RuleConfig::new(modulus, rules),
            None => RuleConfig::default_for_modulus(modulus),
        };
        let rules = RuleSet::from_config(&config).map_err(|err| PyValueError::new_err(err.to_string()))?;
        Ok(Self {
            config,
            rules,
            forest: Forest::new(),
        })
    }

    /// Trace one sample with incremental statistics.
    ///
    /// Returns:
    ///     Root of the sample's tree, or `None` if it diverged.
    pub fn add_sample(&mut self, sample: Value) -> Option<Value> {
        self.forest.add_sample(sample, &self.rules, true).root()
    }

    /// Trace every value in `[start, stop)` and run full statistics passes.
    ///
    /// Returns:
    ///     Number of samples that diverged.
    pub fn build_range(&mut self, start: Value, stop: Value) -> usize {
        let diverged = (start..stop)
            .filter(|&s| {
                matches!(
                    self.forest.add_sample(s, &self.rules, false),
                    SampleOutcome::Diverged(_)
                )
            })
            .count();
        stats::compute_weights(&mut self.forest);
        stats::compute_heights(&mut self.forest);
        diverged
    }

    /// Number of leaves below `value`.
    pub fn weight(&self, value: Value) -> PyResult<u64> {
        self.forest.weight(value).ok_or_else(|| missing(value))
    }

    /// Largest value on the path from the root to `value`.
    pub fn height(&self, value: Value) -> PyResult<Value> {
        self.forest.height(value).ok_or_else(|| missing(value))
    }

    /// Distance of `value` from its root.
    pub fn depth(&self, value: Value) -> PyResult<u32> {
        self.forest.depth(value).ok_or_else(|| missing(value))
    }

    /// Tree roots in ascending order.
    pub fn roots(&self) -> Vec<Value> {
        self.forest.roots()
    }

    /// Leaf count of the tree rooted at `root`.
    pub fn leaf_count(&self, root: Value) -> PyResult<u64> {
        self.forest
            .tree(root)
            .map(|tree| tree.leaf_count)
            .ok_or_else(|| missing(root))
    }

    /// Samples recorded as divergent.
    pub fn divergent(&self) -> Vec<Value> {
        self.forest.divergent().to_vec()
    }

    /// Lay out one tree.
    ///
    /// Returns:
    ///     List of `(value, x, y)` tuples in breadth-first order.
    pub fn layout(&self, root: Value) -> PyResult<Vec<(Value, f64, f64)>> {
        let params = LayoutParams::from_config(&self.config);
        let layout = compute_layout(&self.forest, root, &params)
            .map_err(|err| PyKeyError::new_err(err.to_string()))?;
        Ok(layout
            .order
            .iter()
            .filter_map(|v| layout.placement(*v).map(|p| (*v, p.x, p.y)))
            .collect())
    }

    /// Drop every node and tree.
    pub fn reset(&mut self) {
        self.forest.reset();
    }

    fn __len__(&self) -> usize {
        self.forest.len()
    }
}

fn missing(value: Value) -> PyErr {
    PyKeyError::new_err(format!("{} is not in the forest", value))
}

/// Create Python module.
#[pymodule]
pub fn collatz_forest_py(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyForest>()?;
    Ok(())
}
