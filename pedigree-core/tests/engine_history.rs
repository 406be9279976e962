//! Engine scenarios across history, cascades and derived data

use pedigree_core::validation::codes;
use pedigree_core::{LegendMarker, PedigreeEngine, Relationship};
use serde_json::json;
use std::collections::BTreeSet;

fn ids(engine: &PedigreeEngine) -> Vec<String> {
    engine
        .state()
        .individuals
        .iter()
        .map(|ind| ind.id.clone())
        .collect()
}

#[test]
fn test_history_is_capped_at_fifty() {
    let mut engine = PedigreeEngine::default();
    for n in 1..=60 {
        engine.upsert_individual(&json!({"id": format!("I{}", n)}));
    }
    for _ in 0..60 {
        engine.undo();
    }
    assert_eq!(engine.state().individuals.len(), 10);
    assert_eq!(ids(&engine).last().map(String::as_str), Some("I10"));
    assert!(!engine.can_undo());
}

#[test]
fn test_custom_history_limit() {
    let mut engine = PedigreeEngine::with_history_limit(&json!({}), 2);
    for n in 1..=5 {
        engine.upsert_individual(&json!({"id": format!("I{}", n)}));
    }
    engine.undo();
    engine.undo();
    engine.undo();
    assert_eq!(engine.state().individuals.len(), 3);
}

#[test]
fn test_undo_then_redo_restores_state() {
    let mut engine = PedigreeEngine::default();
    engine.upsert_individual(&json!({"id": "A", "sex": "F"}));
    engine.upsert_individual(&json!({"id": "B", "sex": "M"}));
    engine.upsert_relationship(&json!({"type": "partner", "a": "A", "b": "B"}));

    let before = engine.state().clone();
    engine.undo();
    assert_ne!(engine.state(), &before);
    engine.redo();
    assert_eq!(engine.state(), &before);
}

#[test]
fn test_new_mutation_clears_redo() {
    let mut engine = PedigreeEngine::default();
    engine.upsert_individual(&json!({"id": "A"}));
    engine.undo();
    assert!(engine.can_redo());
    engine.update_metadata(&json!({"reason": "Consulta"}));
    assert!(!engine.can_redo());
    let before = engine.state().clone();
    engine.redo();
    assert_eq!(engine.state(), &before);
}

#[test]
fn test_remove_individual_cascade() {
    let mut engine = PedigreeEngine::new(&json!({
        "individuals": [{"id": "X"}, {"id": "Y"}, {"id": "C"}],
        "relationships": [
            {"type": "partner", "a": "X", "b": "Y"},
            {"type": "parentChild", "father": "X", "mother": "Y", "child": "C"}
        ],
        "pregnancies": [{"id": "P1", "mother": "Y", "father": "X", "outcome": "SAB"}],
        "art": [{"id": "ART-1", "relatedTo": "P1"}]
    }));

    assert!(engine.remove_individual("X"));
    let state = engine.state();
    assert_eq!(ids(&engine), vec!["Y", "C"]);
    assert!(state.relationships.iter().all(|rel| !rel.references("X")));
    assert!(state.pregnancies.is_empty());
    assert!(state.art.is_empty());

    engine.undo();
    assert_eq!(engine.state().relationships.len(), 2);
    assert_eq!(engine.state().art.len(), 1);
}

#[test]
fn test_removal_leaves_ancestry_reference_dangling() {
    let mut engine = PedigreeEngine::new(&json!({
        "individuals": [
            {"id": "GM"},
            {"id": "M", "ancestry": {"maternal": "GM"}}
        ]
    }));
    engine.remove_individual("GM");

    let m = engine.state().individual("M").unwrap();
    assert_eq!(m.ancestry.maternal.as_deref(), Some("GM"));
    // ancestry hints are free text, so validation does not treat them as references
    assert_eq!(engine.validate().with_code(codes::REF_MISSING).count(), 0);
}

#[test]
fn test_relationship_identity() {
    let mut engine = PedigreeEngine::default();
    engine.upsert_relationship(&json!({"type": "parentChild", "father": "F", "mother": "M", "child": "C"}));
    engine.upsert_relationship(&json!({"type": "parentChild", "father": "F", "mother": "M", "child": "C", "biological": false, "adoptive": true}));
    engine.upsert_relationship(&json!({"type": "parentChild", "father": "F", "child": "C"}));

    let rels = &engine.state().relationships;
    assert_eq!(rels.len(), 2);
    let Relationship::ParentChild(first) = &rels[0] else {
        panic!("expected parent/child");
    };
    assert!(first.adoptive);
    assert!(!first.biological);
}

#[test]
fn test_legend_usage_sample() {
    let engine = PedigreeEngine::new(&json!({
        "individuals": [
            {"id": "A", "sex": "U", "affected": true},
            {"id": "B", "sex": "F", "carrier": {"type": "X"}},
            {"id": "C", "sex": "M", "affected": true, "carrier": {"type": "AR"}}
        ],
        "pregnancies": [{"id": "P1", "outcome": "Live"}]
    }));
    assert_eq!(
        engine.compute_legend_usage(),
        BTreeSet::from([LegendMarker::Filled, LegendMarker::Dot, LegendMarker::Diamond])
    );
}

#[test]
fn test_validation_of_engine_state() {
    let mut engine = PedigreeEngine::default();
    engine.upsert_individual(&json!({"id": "A", "dead": true}));
    engine.upsert_relationship(&json!({"type": "partner", "a": "A", "b": "NOBODY"}));

    let report = engine.validate();
    assert!(report.has_errors());
    assert_eq!(report.with_code(codes::REF_MISSING).count(), 1);
    assert_eq!(report.with_code(codes::INDI_DEAD_INFO).count(), 1);
    assert_eq!(report.with_code(codes::META_REASON_MISSING).count(), 1);
}
