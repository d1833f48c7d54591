#![allow(dead_code)]

use collatz_forest::forest::stats;
use collatz_forest::{Forest, RuleSet, Value};

pub fn classic_rules() -> RuleSet {
    RuleSet::new(2, &["n/2", "3*n+1"]).expect("classic rules compile")
}

/// Batch build: merge everything, then run both full passes.
pub fn build_batch(rules: &RuleSet, samples: &[Value]) -> Forest {
    let mut forest = Forest::new();
    for &sample in samples {
        forest.add_sample(sample, rules, false);
    }
    stats::compute_weights(&mut forest);
    stats::compute_heights(&mut forest);
    forest
}

/// Interactive build: incremental statistics after every sample.
pub fn build_incremental(rules: &RuleSet, samples: &[Value]) -> Forest {
    let mut forest = Forest::new();
    for &sample in samples {
        forest.add_sample(sample, rules, true);
    }
    forest
}

/// Every value appears exactly once in insertion order.
pub fn assert_no_duplicates(forest: &Forest) {
    let mut values = forest.node_list().to_vec();
    values.sort_unstable();
    values.dedup();
    assert_eq!(values.len(), forest.node_list().len(), "duplicate node inserted");
    assert_eq!(values.len(), forest.len());
}
