//! Integration tests for the experiments library
//!
//! These tests verify the public API and module interactions.

use std::collections::HashMap;
use std::sync::Arc;

use experiments::{
    calculate_sample_size, test_significance,
    storage::JsonFileStorage,
    AssignmentStore, ExecutionContext, ExperimentCatalog, ExperimentDefinition, ExperimentSession,
    MemorySink, SeededSource, VariantSample,
};

fn definition() -> ExperimentDefinition {
    ExperimentDefinition::new(
        "homepage-headline",
        vec!["variant-a", "variant-b", "variant-c"],
        "variant-a",
    )
    .unwrap()
}

fn session(seed: u64) -> (ExperimentSession, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let session = ExperimentSession::new(
        AssignmentStore::in_memory(),
        Box::new(Arc::clone(&sink)),
        Box::new(SeededSource::new(seed)),
        ExecutionContext::ready(),
    );
    (session, sink)
}

// ============================================================================
// Bucketing Tests
// ============================================================================

#[test]
fn test_uniform_assignment_frequencies_converge() {
    let def = definition();
    let trials = 12_000;
    let mut counts: HashMap<String, u32> = HashMap::new();

    // A fresh visitor session per trial
    for seed in 0..trials {
        let (mut session, _sink) = session(seed);
        let variant = session.get_variant(&def);
        *counts.entry(variant).or_insert(0) += 1;
    }

    let expected = trials as f64 / 3.0;
    for variant in ["variant-a", "variant-b", "variant-c"] {
        let observed = f64::from(counts[variant]);
        let deviation = (observed - expected).abs() / expected;
        assert!(deviation < 0.05, "{}: {}", variant, observed);
    }
}

#[test]
fn test_weighted_assignment_frequencies_converge() {
    let def = definition().with_weights(vec![0.6, 0.3, 0.1]);
    let trials = 12_000;
    let mut counts: HashMap<String, u32> = HashMap::new();

    for seed in 0..trials {
        let (mut session, _sink) = session(seed);
        let variant = session.get_variant(&def);
        *counts.entry(variant).or_insert(0) += 1;
    }

    for (variant, weight) in [("variant-a", 0.6), ("variant-b", 0.3), ("variant-c", 0.1)] {
        let observed = f64::from(counts[variant]) / trials as f64;
        assert!(
            (observed - weight).abs() < 0.02,
            "{}: {} vs {}",
            variant,
            observed,
            weight
        );
    }
}

#[test]
fn test_get_variant_idempotent_with_single_event() {
    let (mut session, sink) = session(99);
    let def = definition();

    let first = session.get_variant(&def);
    let second = session.get_variant(&def);

    assert_eq!(first, second);
    assert_eq!(sink.len(), 1);
    assert_eq!(sink.events()[0].action, "experiment_assigned");
}

#[test]
fn test_clear_all_then_get_variant_reassigns() {
    let (mut session, sink) = session(17);
    let def = definition();

    session.get_variant(&def);
    session.clear_all_experiments();
    let variant = session.get_variant(&def);

    assert!(def.contains(&variant));
    assert_eq!(sink.len(), 2, "each allocation emits one assignment event");
}

#[test]
fn test_conversion_flow_end_to_end() {
    let (mut session, sink) = session(23);
    let def = definition();

    let variant = session.get_variant(&def);
    session.track_conversion("homepage-headline", "demo_request", Some(1.0));
    // Unassigned experiment: nothing emitted
    session.track_conversion("pricing-display", "purchase", None);

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].action, "demo_request");
    assert_eq!(events[1].label, format!("homepage-headline:{}", variant));
}

#[test]
fn test_assignments_survive_session_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("visitor.json");
    let def = definition();

    let first = {
        let mut session = ExperimentSession::new(
            AssignmentStore::new(Box::new(JsonFileStorage::new(&path))),
            Box::new(MemorySink::new()),
            Box::new(SeededSource::new(31)),
            ExecutionContext::ready(),
        );
        session.get_variant(&def)
    };

    // Same visitor, new session: sticky via the persisted file
    let sink = Arc::new(MemorySink::new());
    let mut session = ExperimentSession::new(
        AssignmentStore::new(Box::new(JsonFileStorage::new(&path))),
        Box::new(Arc::clone(&sink)),
        Box::new(SeededSource::new(32)),
        ExecutionContext::ready(),
    );
    assert_eq!(session.get_variant(&def), first);
    assert!(sink.is_empty());
}

// ============================================================================
// Catalog Tests
// ============================================================================

#[test]
fn test_default_catalog_usable_for_bucketing() {
    let catalog = ExperimentCatalog::defaults();
    let (mut session, _sink) = session(41);

    for id in catalog.ids() {
        let def = catalog.get(id).unwrap();
        let variant = session.get_variant(def);
        assert!(def.contains(&variant), "{}", id);
    }
}

// ============================================================================
// Significance Engine Tests
// ============================================================================

#[test]
fn test_significance_fixed_vectors() {
    let tie = test_significance(
        VariantSample::new(1000, 500),
        VariantSample::new(1000, 500),
        95.0,
        1000,
    );
    assert_eq!(tie.z_score, 0.0);
    assert!(!tie.is_significant);

    let winner = test_significance(
        VariantSample::new(1000, 100),
        VariantSample::new(1000, 150),
        95.0,
        1000,
    );
    assert!(winner.is_significant);
    assert!((winner.relative_lift - 50.0).abs() < 1e-9);

    let early = test_significance(
        VariantSample::new(50, 10),
        VariantSample::new(55, 12),
        95.0,
        1000,
    );
    assert!(!early.has_enough_data);
    assert!(early.recommendation.contains("Continue"));
}

#[test]
fn test_sample_size_planning_monotone() {
    let wide = calculate_sample_size(0.10, 0.50, 0.05, 0.8);
    let narrow = calculate_sample_size(0.10, 0.05, 0.05, 0.8);
    assert!(narrow > wide);
    assert!(wide > 0);
}
