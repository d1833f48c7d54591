mod common;

use collatz_forest::{
    compute_layout, trace_sample, Divergence, Forest, ForestBuilder, LayoutParams, RuleConfig,
    RuleSet, SampleOutcome, SampleSpec, SavedTree, Trace, TraceLimits,
};
use common::{assert_no_duplicates, build_batch, build_incremental, classic_rules};

#[test]
fn classic_27_reaches_known_peak() {
    let forest = build_batch(&classic_rules(), &[27]);

    assert_eq!(forest.roots(), vec![1]);
    assert_eq!(forest.root_of(27), Some(1));
    assert_eq!(forest.height(27), Some(9232));
    assert_eq!(forest.tree(1).unwrap().highest, 9232);
    assert_eq!(forest.tree(1).unwrap().highest_leaf, 27);
    // 111 steps to reach 1
    assert_eq!(forest.depth(27), Some(111));
}

#[test]
fn shared_suffix_is_stored_once() {
    let rules = classic_rules();
    let forest = build_batch(&rules, &[6, 12]);

    assert_no_duplicates(&forest);
    assert_eq!(forest.len(), 10);
    assert_eq!(forest.parent(12), Some(6));
    // 12 extends 6, so both pass through 3 on a single branch
    assert_eq!(forest.weight(3), Some(1));
    assert_eq!(forest.tree(1).unwrap().leaf_count, 1);

    // 20 branches off at 10: the shared ancestor now carries two leaves
    let forest = build_batch(&rules, &[6, 12, 20]);
    assert_no_duplicates(&forest);
    assert_eq!(forest.weight(10), Some(2));
    assert_eq!(forest.weight(3), Some(1));
    assert_eq!(forest.tree(1).unwrap().leaf_count, 2);
}

#[test]
fn undefined_rule_result_only_drops_the_affected_samples() {
    // Division by zero exactly when the trajectory reaches 5.
    let config = RuleConfig::new(2, vec!["n/2".to_string(), "3*n+1 + 0/(n-5)".to_string()]);
    let report = ForestBuilder::new(config, SampleSpec::range(1, 10))
        .build()
        .unwrap();
    let forest = &report.forest;

    assert_eq!(forest.divergent(), &[3, 5, 6, 7, 9, 10]);
    assert_eq!(forest.roots(), vec![1]);
    for value in [1, 2, 4, 8] {
        assert!(forest.contains(value));
    }
    assert!(!forest.contains(5));
    assert_eq!(forest.weight(1), Some(1));
    assert_eq!(forest.height(8), Some(8));
}

#[test]
fn divergence_is_classified() {
    let rules = classic_rules();
    let forest = Forest::new();

    let tight = TraceLimits::default().with_max_value(100);
    assert_eq!(
        trace_sample(27, &rules, &forest, &tight),
        Trace::Diverged(Divergence::Magnitude { value: 124 })
    );

    let short = TraceLimits::default().with_max_steps(10);
    assert!(matches!(
        trace_sample(27, &rules, &forest, &short),
        Trace::Diverged(Divergence::StepLimit { steps: 10 })
    ));

    let growing = RuleSet::new(1, &["2*n"]).unwrap();
    assert!(matches!(
        trace_sample(3, &growing, &forest, &TraceLimits::default()),
        Trace::Diverged(Divergence::Magnitude { .. })
    ));
}

#[test]
fn cycle_roots_are_cycle_minima() {
    // 3n-1 has three positive cycles: {1, 2}, {5, 14, 7, 20, 10} and the
    // 18-cycle through 17.
    let rules = RuleSet::new(2, &["n/2", "3*n-1"]).unwrap();
    let samples: Vec<i64> = (1..=100).collect();
    let forest = build_batch(&rules, &samples);
    assert_eq!(forest.roots(), vec![1, 5, 17]);

    let fresh = Forest::new();
    match trace_sample(7, &rules, &fresh, fresh.limits()) {
        Trace::Cycle {
            path,
            root,
            successor,
        } => {
            assert_eq!(root, 5);
            assert_eq!(successor, 14);
            assert_eq!(path.first(), Some(&7));
            assert_eq!(path.last(), Some(&5));
        }
        other => panic!("expected a cycle, got {:?}", other),
    }
}

#[test]
fn negative_samples_form_their_own_trees() {
    let samples: Vec<i64> = (-10..=-1).collect();
    let forest = build_batch(&classic_rules(), &samples);

    assert_eq!(forest.roots(), vec![-20, -2]);
    assert_eq!(forest.root_of(-9), Some(-20));
    assert_eq!(forest.root_of(-3), Some(-2));
    assert_eq!(forest.height(-2), Some(-2));
}

#[test]
fn large_range_has_one_tree_and_no_duplicates() {
    let report = ForestBuilder::new(RuleConfig::classic(), SampleSpec::range(1, 2_000))
        .build()
        .unwrap();
    let forest = &report.forest;

    assert_no_duplicates(forest);
    assert_eq!(forest.roots(), vec![1]);
    assert!(forest.divergent().is_empty());
    assert_eq!(report.samples, 2_000);

    let leaves = forest.leaves(1);
    assert_eq!(forest.tree(1).unwrap().leaf_count, leaves.len() as u64);
    assert_eq!(forest.tree(1).unwrap().node_count, forest.len());
}

#[test]
fn start_value_is_labelled_and_added_incrementally() {
    let report = ForestBuilder::new(
        RuleConfig::classic(),
        SampleSpec::range(1, 20).with_start_value(Some(27)),
    )
    .build()
    .unwrap();
    assert_eq!(report.forest.tree(1).unwrap().start_value, Some(27));
    assert_eq!(report.default_root(), Some(1));

    let mut forest = report.forest;
    let outcome = ForestBuilder::add_start_value(&mut forest, &report.rules, 97);
    assert!(matches!(outcome, SampleOutcome::Merged { root: 1, new_tree: false, .. }));
    assert_eq!(forest.start_value(), Some(97));
    assert_eq!(forest.tree(1).unwrap().start_value, Some(97));

    let mut recomputed = forest.clone();
    collatz_forest::forest::stats::compute_weights(&mut recomputed);
    assert_eq!(recomputed.fingerprint(), forest.fingerprint());
}

#[test]
fn saved_tree_rebuilds_identically() {
    let config = RuleConfig::classic();
    let report = ForestBuilder::new(config.clone(), SampleSpec::range(1, 60))
        .build()
        .unwrap();
    let forest = &report.forest;

    let saved = SavedTree::capture(forest, 1, &config).unwrap();
    let text = saved.to_json_pretty().unwrap();
    let loaded = SavedTree::from_json(&text).unwrap();
    assert_eq!(loaded, saved);

    let rebuilt = loaded.rebuild().unwrap();
    assert_eq!(rebuilt.tree_fingerprint(1), forest.tree_fingerprint(1));
    assert_eq!(rebuilt.tree(1).unwrap().leaf_count, forest.tree(1).unwrap().leaf_count);
    assert_eq!(rebuilt.start_value(), saved.leaves.iter().max().copied());
}

#[test]
fn saved_tree_file_round_trip() {
    let config = RuleConfig::classic();
    let forest = build_incremental(&RuleSet::from_config(&config).unwrap(), &[7, 9, 12]);
    let saved = SavedTree::capture(&forest, 1, &config).unwrap();

    let path = std::env::temp_dir().join(format!("collatz-forest-{}.json", std::process::id()));
    saved.write_to(&path).unwrap();
    let loaded = SavedTree::read_from(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.leaves, saved.leaves);
    assert_eq!(loaded.rebuild().unwrap().tree_fingerprint(1), forest.tree_fingerprint(1));
}

#[test]
fn layout_covers_tree_and_fits_viewport() {
    let report = ForestBuilder::new(RuleConfig::classic(), SampleSpec::range(1, 200))
        .build()
        .unwrap();
    let forest = &report.forest;
    let params = LayoutParams::from_config(&RuleConfig::classic());
    let layout = compute_layout(forest, 1, &params).unwrap();

    assert_eq!(layout.len(), forest.len());
    assert_eq!(layout.placement(1).map(|p| (p.x, p.y)), Some((0.0, 0.0)));
    for &(parent, child) in &layout.edges {
        assert_eq!(forest.parent(child), Some(parent));
    }

    let viewport = layout.bounds.fit(800.0, 600.0, 20.0, 4.0);
    assert!(viewport.zoom > 0.0 && viewport.zoom <= 4.0);
}
