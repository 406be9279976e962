//! Pedigree engine: mutation API over a normalized document
//!
//! Every mutator normalizes its input, builds the next document by value,
//! records the replaced document in a bounded history and clears the redo
//! stack. Mutators never fail; malformed payloads degrade to defaults and
//! unknown ids are no-ops.

pub mod history;
pub mod layout;

pub use history::{History, DEFAULT_HISTORY_LIMIT};

use crate::document::{Document, Individual, LegendMarker, Relationship};
use crate::error::Result;
use crate::graph::PedigreeGraph;
use crate::legend::legend_usage;
use crate::normalize::{
    create_empty_state, id_text, member, merge_objects, normalize_art, normalize_individual,
    normalize_legend, normalize_metadata, normalize_pregnancy, normalize_relationship,
    normalize_state, number,
};
use crate::privacy::privacy_label;
use crate::validation::{validate_state, ValidationReport};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use tracing::{debug, trace};
use uuid::Uuid;

pub const INDIVIDUAL_ID_PREFIX: &str = "I-";
pub const PREGNANCY_ID_PREFIX: &str = "P-";
pub const ART_ID_PREFIX: &str = "ART-";

#[derive(Debug, Clone)]
pub struct PedigreeEngine {
    state: Document,
    history: History<Document>,
    revision: u64,
}

impl PedigreeEngine {
    /// Engine over `initial`, normalized. Any JSON value is accepted.
    pub fn new(initial: &Value) -> Self {
        Self::with_history_limit(initial, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(initial: &Value, limit: usize) -> Self {
        Self::from_document(normalize_state(initial), limit)
    }

    /// Engine over an already normalized document.
    pub fn from_document(document: Document, history_limit: usize) -> Self {
        Self {
            state: document,
            history: History::new(history_limit),
            revision: 0,
        }
    }

    /// Parse a serialized document.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text)?;
        Ok(Self::new(&raw))
    }

    pub fn state(&self) -> &Document {
        &self.state
    }

    /// Changes whenever the current document changes, including undo/redo.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Replace the whole document.
    pub fn set_state(&mut self, next: &Value) -> &Document {
        self.commit(normalize_state(next));
        &self.state
    }

    /// Replace the whole document with an already normalized one.
    pub fn replace_document(&mut self, next: Document) -> &Document {
        self.commit(next);
        &self.state
    }

    /// Empty the document, keeping its metadata.
    pub fn reset(&mut self) -> &Document {
        let metadata = serde_json::to_value(&self.state.metadata).unwrap_or(Value::Null);
        self.commit(create_empty_state(&json!({ "metadata": metadata })));
        &self.state
    }

    pub fn undo(&mut self) -> &Document {
        if self.history.undo(&mut self.state) {
            self.revision += 1;
            debug!(revision = self.revision, "undo");
        } else {
            trace!("undo with empty history");
        }
        &self.state
    }

    pub fn redo(&mut self) -> &Document {
        if self.history.redo(&mut self.state) {
            self.revision += 1;
            debug!(revision = self.revision, "redo");
        } else {
            trace!("redo with empty future");
        }
        &self.state
    }

    /// Insert or merge an individual; returns its id, generated when absent.
    /// An optional `pos {x, y}` places its layout node.
    pub fn upsert_individual(&mut self, payload: &Value) -> String {
        let mut next = self.state.clone();
        let existing = id_text(payload, "id")
            .and_then(|id| next.individuals.iter().position(|ind| ind.id == id));

        let id = match existing {
            Some(idx) => {
                let merged = merge_stored(&next.individuals[idx], payload);
                let mut individual = normalize_individual(&merged);
                individual.id = next.individuals[idx].id.clone();
                next.individuals[idx] = individual;
                next.individuals[idx].id.clone()
            }
            None => {
                let mut individual = normalize_individual(payload);
                if individual.id.is_empty() {
                    individual.id = generate_id(INDIVIDUAL_ID_PREFIX, |candidate| {
                        next.has_individual(candidate)
                    });
                }
                let id = individual.id.clone();
                next.individuals.push(individual);
                id
            }
        };

        let pos = member(payload, "pos");
        layout::place_node(&mut next.layout.nodes, &id, number(pos, "x"), number(pos, "y"));

        debug!(individual = %id, created = existing.is_none(), "upsert individual");
        self.commit(next);
        id
    }

    /// Remove an individual with every relationship and pregnancy that
    /// references it, ART entries of those pregnancies, and its layout node
    /// and edges. Ancestry hints on other individuals are left untouched.
    pub fn remove_individual(&mut self, id: &str) -> bool {
        if id.is_empty() || !self.state.has_individual(id) {
            trace!(individual = %id, "remove unknown individual");
            return false;
        }

        let mut next = self.state.clone();
        next.individuals.retain(|ind| ind.id != id);
        next.relationships.retain(|rel| !rel.references(id));

        let (dropped, kept): (Vec<_>, Vec<_>) = next.pregnancies.into_iter().partition(|preg| {
            preg.mother.as_deref() == Some(id) || preg.father.as_deref() == Some(id)
        });
        next.pregnancies = kept;
        next.art.retain(|entry| {
            !dropped
                .iter()
                .any(|preg| entry.related_to.as_deref() == Some(preg.id.as_str()))
        });
        layout::detach(&mut next.layout, id);

        debug!(individual = %id, pregnancies = dropped.len(), "remove individual");
        self.commit(next);
        true
    }

    /// Replace the relationship with the same identity, or append. Payloads
    /// that are not a known relationship type are ignored.
    pub fn upsert_relationship(&mut self, payload: &Value) -> bool {
        let Some(relationship) = normalize_relationship(payload) else {
            trace!("ignore relationship payload without a known type");
            return false;
        };

        let mut next = self.state.clone();
        match next
            .relationships
            .iter()
            .position(|rel| rel.same_identity(&relationship))
        {
            Some(idx) => next.relationships[idx] = relationship,
            None => next.relationships.push(relationship),
        }

        debug!(relationships = next.relationships.len(), "upsert relationship");
        self.commit(next);
        true
    }

    /// Remove relationships structurally matching `payload`; returns how many.
    pub fn remove_relationship(&mut self, payload: &Value) -> usize {
        match normalize_relationship(payload) {
            Some(target) => self.remove_relationships_where(|rel| rel.same_identity(&target)),
            None => 0,
        }
    }

    /// Remove every relationship for which `matcher` returns true.
    pub fn remove_relationships_where(&mut self, matcher: impl Fn(&Relationship) -> bool) -> usize {
        let removed = self.state.relationships.iter().filter(|&rel| matcher(rel)).count();
        if removed == 0 {
            trace!("no relationship matched");
            return 0;
        }

        let mut next = self.state.clone();
        next.relationships.retain(|rel| !matcher(rel));
        debug!(removed, "remove relationships");
        self.commit(next);
        removed
    }

    pub fn upsert_pregnancy(&mut self, payload: &Value) -> String {
        let mut next = self.state.clone();
        let existing = id_text(payload, "id")
            .and_then(|id| next.pregnancies.iter().position(|preg| preg.id == id));

        let id = match existing {
            Some(idx) => {
                let merged = merge_stored(&next.pregnancies[idx], payload);
                let mut pregnancy = normalize_pregnancy(&merged);
                pregnancy.id = next.pregnancies[idx].id.clone();
                next.pregnancies[idx] = pregnancy;
                next.pregnancies[idx].id.clone()
            }
            None => {
                let mut pregnancy = normalize_pregnancy(payload);
                if pregnancy.id.is_empty() {
                    pregnancy.id = generate_id(PREGNANCY_ID_PREFIX, |candidate| {
                        next.pregnancy(candidate).is_some()
                    });
                }
                let id = pregnancy.id.clone();
                next.pregnancies.push(pregnancy);
                id
            }
        };

        debug!(pregnancy = %id, created = existing.is_none(), "upsert pregnancy");
        self.commit(next);
        id
    }

    /// Remove a pregnancy and the ART entries related to it.
    pub fn remove_pregnancy(&mut self, id: &str) -> bool {
        if self.state.pregnancy(id).is_none() {
            trace!(pregnancy = %id, "remove unknown pregnancy");
            return false;
        }

        let mut next = self.state.clone();
        next.pregnancies.retain(|preg| preg.id != id);
        next.art.retain(|entry| entry.related_to.as_deref() != Some(id));
        debug!(pregnancy = %id, "remove pregnancy");
        self.commit(next);
        true
    }

    pub fn upsert_art(&mut self, payload: &Value) -> String {
        let mut next = self.state.clone();
        let existing = id_text(payload, "id")
            .and_then(|id| next.art.iter().position(|entry| entry.id == id));

        let id = match existing {
            Some(idx) => {
                let mut entry = normalize_art(&merge_stored(&next.art[idx], payload));
                entry.id = next.art[idx].id.clone();
                next.art[idx] = entry;
                next.art[idx].id.clone()
            }
            None => {
                let mut entry = normalize_art(payload);
                if entry.id.is_empty() {
                    entry.id =
                        generate_id(ART_ID_PREFIX, |candidate| next.art_entry(candidate).is_some());
                }
                let id = entry.id.clone();
                next.art.push(entry);
                id
            }
        };

        debug!(art = %id, created = existing.is_none(), "upsert art entry");
        self.commit(next);
        id
    }

    pub fn remove_art(&mut self, id: &str) -> bool {
        if self.state.art_entry(id).is_none() {
            trace!(art = %id, "remove unknown art entry");
            return false;
        }

        let mut next = self.state.clone();
        next.art.retain(|entry| entry.id != id);
        debug!(art = %id, "remove art entry");
        self.commit(next);
        true
    }

    /// Shallow-merge `patch` into the metadata.
    pub fn update_metadata(&mut self, patch: &Value) {
        let mut next = self.state.clone();
        next.metadata = normalize_metadata(&merge_stored(&next.metadata, patch));
        debug!("update metadata");
        self.commit(next);
    }

    /// Shallow-merge `patch` into the legend descriptions.
    pub fn update_legend(&mut self, patch: &Value) {
        let mut next = self.state.clone();
        next.legend = normalize_legend(&merge_stored(&next.legend, patch));
        debug!("update legend");
        self.commit(next);
    }

    /// Merge node positions and edges from `patch` (`{nodes?, edges?}`).
    pub fn update_layout(&mut self, patch: &Value) {
        let mut next = self.state.clone();
        layout::merge_layout(&mut next.layout, patch);
        debug!(
            nodes = next.layout.nodes.len(),
            edges = next.layout.edges.len(),
            "update layout"
        );
        self.commit(next);
    }

    /// Move one layout node. Non-finite coordinates keep the current value.
    pub fn set_node_position(&mut self, id: &str, x: f64, y: f64) {
        if id.is_empty() {
            return;
        }
        let mut next = self.state.clone();
        layout::place_node(&mut next.layout.nodes, id, Some(x), Some(y));
        trace!(node = %id, x, y, "set node position");
        self.commit(next);
    }

    pub fn validate(&self) -> ValidationReport {
        validate_state(&self.state)
    }

    pub fn to_json(&self) -> &Document {
        &self.state
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.state)?)
    }

    /// Detached copy of the document for export and printing.
    pub fn to_clinical_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.state)?)
    }

    pub fn compute_legend_usage(&self) -> BTreeSet<LegendMarker> {
        legend_usage(&self.state)
    }

    pub fn compute_privacy_label(&self, individual: &Individual) -> String {
        privacy_label(&self.state.metadata.privacy, individual)
    }

    pub fn graph(&self) -> PedigreeGraph<'_> {
        PedigreeGraph::new(&self.state)
    }

    fn commit(&mut self, next: Document) {
        let previous = std::mem::replace(&mut self.state, next);
        self.history.record(previous);
        self.revision += 1;
    }
}

impl Default for PedigreeEngine {
    fn default() -> Self {
        Self::new(&Value::Null)
    }
}

/// Stored entity with `patch` shallow-merged over it, as raw JSON.
fn merge_stored<T: Serialize>(stored: &T, patch: &Value) -> Value {
    match serde_json::to_value(stored) {
        Ok(base) => merge_objects(&base, patch),
        Err(_) => patch.clone(),
    }
}

fn generate_id(prefix: &str, taken: impl Fn(&str) -> bool) -> String {
    loop {
        let suffix = Uuid::new_v4().simple().to_string();
        let candidate = format!("{}{}", prefix, &suffix[..8]);
        if !taken(&candidate) {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{CarrierType, PartnerStatus, Sex};
    use crate::validation::codes;

    fn engine() -> PedigreeEngine {
        PedigreeEngine::default()
    }

    #[test]
    fn test_upsert_generates_id_and_layout_node() {
        let mut engine = engine();
        let id = engine.upsert_individual(&json!({"sex": "F", "pos": {"x": 40, "y": 80}}));
        assert!(id.starts_with(INDIVIDUAL_ID_PREFIX));
        let state = engine.state();
        assert_eq!(state.individuals.len(), 1);
        assert_eq!(state.individuals[0].sex, Sex::F);
        assert_eq!(state.layout.nodes[0].id, id);
        assert_eq!(state.layout.nodes[0].x, 40.0);
        assert_eq!(state.layout.nodes[0].y, 80.0);
    }

    #[test]
    fn test_upsert_merges_existing_fields() {
        let mut engine = engine();
        engine.upsert_individual(&json!({"id": "A", "sex": "M", "dead": true, "pos": {"x": 5}}));
        let id = engine.upsert_individual(&json!({"id": "A", "carrier": {"type": "AR"}}));
        assert_eq!(id, "A");

        let state = engine.state();
        assert_eq!(state.individuals.len(), 1);
        let ind = &state.individuals[0];
        assert_eq!(ind.sex, Sex::M);
        assert!(ind.dead);
        assert_eq!(ind.carrier.kind, CarrierType::AR);
        assert_eq!(state.layout.nodes.len(), 1);
        assert_eq!(state.layout.nodes[0].x, 5.0);
    }

    #[test]
    fn test_remove_individual_cascades() {
        let mut engine = engine();
        for id in ["X", "Y", "Z", "K"] {
            engine.upsert_individual(&json!({"id": id}));
        }
        engine.upsert_relationship(&json!({"type": "partner", "a": "X", "b": "Y"}));
        engine.upsert_relationship(&json!({"type": "parentChild", "father": "Z", "child": "X"}));
        engine.upsert_relationship(&json!({"type": "partner", "a": "Z", "b": "K"}));
        let preg = engine.upsert_pregnancy(&json!({"mother": "X", "outcome": "SAB"}));
        engine.upsert_pregnancy(&json!({"id": "P-keep", "mother": "K", "outcome": "Live"}));
        engine.upsert_art(&json!({"id": "ART-1", "relatedTo": preg}));
        engine.upsert_art(&json!({"id": "ART-2", "relatedTo": "P-keep"}));
        engine.update_layout(&json!({"edges": [
            {"from": "X", "to": "Y", "kind": "partner"},
            {"from": "Z", "to": "K", "kind": "partner"}
        ]}));

        assert!(engine.remove_individual("X"));
        let state = engine.state();
        assert!(!state.has_individual("X"));
        assert_eq!(state.relationships.len(), 1);
        assert_eq!(state.pregnancies.len(), 1);
        assert_eq!(state.pregnancies[0].id, "P-keep");
        assert_eq!(state.art.len(), 1);
        assert_eq!(state.art[0].id, "ART-2");
        assert!(state.layout.nodes.iter().all(|node| node.id != "X"));
        assert_eq!(state.layout.edges.len(), 1);
    }

    #[test]
    fn test_remove_individual_keeps_ancestry_hints() {
        let mut engine = engine();
        engine.upsert_individual(&json!({"id": "GM"}));
        engine.upsert_individual(&json!({"id": "A", "ancestry": {"maternal": "GM"}}));
        engine.remove_individual("GM");
        let ind = engine.state().individual("A").unwrap();
        assert_eq!(ind.ancestry.maternal.as_deref(), Some("GM"));
    }

    #[test]
    fn test_unknown_removals_are_noops() {
        let mut engine = engine();
        engine.upsert_individual(&json!({"id": "A"}));
        let revision = engine.revision();
        assert!(!engine.remove_individual("nope"));
        assert!(!engine.remove_pregnancy("nope"));
        assert!(!engine.remove_art("nope"));
        assert_eq!(engine.remove_relationship(&json!({"type": "partner", "a": "A", "b": "B"})), 0);
        assert_eq!(engine.remove_relationship(&json!({"type": "cousin"})), 0);
        assert_eq!(engine.revision(), revision);

        engine.undo();
        assert!(engine.state().individuals.is_empty());
    }

    #[test]
    fn test_partner_identity_is_unordered() {
        let mut engine = engine();
        engine.upsert_relationship(&json!({"type": "partner", "a": "X", "b": "Y", "status": "ended"}));
        engine.upsert_relationship(&json!({"type": "partner", "a": "Y", "b": "X", "consanguinity": true}));
        let rels = &engine.state().relationships;
        assert_eq!(rels.len(), 1);
        let Relationship::Partner(p) = &rels[0] else {
            panic!("expected partner");
        };
        assert!(p.consanguinity);
        assert_eq!(p.status, PartnerStatus::Current);
    }

    #[test]
    fn test_remove_relationship_by_payload_and_matcher() {
        let mut engine = engine();
        engine.upsert_relationship(&json!({"type": "partner", "a": "X", "b": "Y"}));
        engine.upsert_relationship(&json!({"type": "parentChild", "mother": "Y", "child": "C"}));
        engine.upsert_relationship(&json!({"type": "parentChild", "father": "X", "mother": "Y", "child": "C"}));

        assert_eq!(engine.remove_relationship(&json!({"type": "partner", "a": "Y", "b": "X"})), 1);
        let removed = engine.remove_relationships_where(|rel| {
            matches!(rel, Relationship::ParentChild(pc) if pc.father.is_none())
        });
        assert_eq!(removed, 1);
        assert_eq!(engine.state().relationships.len(), 1);
    }

    #[test]
    fn test_invalid_relationship_payload_ignored() {
        let mut engine = engine();
        assert!(!engine.upsert_relationship(&json!({"a": "X"})));
        assert!(!engine.can_undo());
    }

    #[test]
    fn test_remove_pregnancy_cascades_art() {
        let mut engine = engine();
        let preg = engine.upsert_pregnancy(&json!({"outcome": "TOP"}));
        assert!(preg.starts_with(PREGNANCY_ID_PREFIX));
        let art = engine.upsert_art(&json!({"role": "S", "relatedTo": preg}));
        assert!(art.starts_with(ART_ID_PREFIX));
        engine.upsert_art(&json!({"id": "ART-free"}));

        assert!(engine.remove_pregnancy(&preg));
        assert_eq!(engine.state().art.len(), 1);
        assert_eq!(engine.state().art[0].id, "ART-free");
    }

    #[test]
    fn test_upsert_pregnancy_merges() {
        let mut engine = engine();
        engine.upsert_pregnancy(&json!({"id": "P1", "mother": "M", "outcome": "SB"}));
        engine.upsert_pregnancy(&json!({"id": "P1", "karyotype": "46,XY"}));
        let preg = engine.state().pregnancy("P1").unwrap();
        assert_eq!(preg.mother.as_deref(), Some("M"));
        assert_eq!(preg.karyotype.as_deref(), Some("46,XY"));
    }

    #[test]
    fn test_metadata_and_legend_updates() {
        let mut engine = engine();
        engine.update_metadata(&json!({"reason": "Sordera", "privacy": {"names": "full"}}));
        engine.update_metadata(&json!({"historian": "Madre"}));
        engine.update_legend(&json!({"triangle": "Aborto"}));
        let state = engine.state();
        assert_eq!(state.metadata.reason, "Sordera");
        assert_eq!(state.metadata.historian, "Madre");
        assert_eq!(state.metadata.privacy.names, crate::document::NamePrivacy::Full);
        assert_eq!(state.legend.triangle, "Aborto");
        assert_eq!(state.legend.filled, "Affected");
    }

    #[test]
    fn test_set_node_position() {
        let mut engine = engine();
        engine.upsert_individual(&json!({"id": "A", "pos": {"x": 1, "y": 2}}));
        engine.set_node_position("A", f64::NAN, 9.0);
        assert_eq!(engine.state().layout.nodes[0].x, 1.0);
        assert_eq!(engine.state().layout.nodes[0].y, 9.0);
        engine.set_node_position("NEW", 3.0, 4.0);
        assert_eq!(engine.state().layout.nodes.len(), 2);
    }

    #[test]
    fn test_undo_redo_basics() {
        let mut engine = engine();
        assert_eq!(engine.undo().individuals.len(), 0);
        engine.upsert_individual(&json!({"id": "A"}));
        engine.upsert_individual(&json!({"id": "B"}));
        assert_eq!(engine.undo().individuals.len(), 1);
        assert_eq!(engine.redo().individuals.len(), 2);
        engine.undo();
        engine.upsert_individual(&json!({"id": "C"}));
        assert!(!engine.can_redo());
        let ids: Vec<_> = engine.state().individuals.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
    }

    #[test]
    fn test_reset_keeps_metadata() {
        let mut engine = engine();
        engine.update_metadata(&json!({"familyId": "FAM-2", "reason": "x"}));
        engine.upsert_individual(&json!({"id": "A"}));
        engine.reset();
        assert!(engine.state().individuals.is_empty());
        assert_eq!(engine.state().metadata.family_id, "FAM-2");
        engine.undo();
        assert_eq!(engine.state().individuals.len(), 1);
    }

    #[test]
    fn test_clinical_json_is_detached() {
        let mut engine = engine();
        engine.upsert_individual(&json!({"id": "A"}));
        let mut export = engine.to_clinical_json().unwrap();
        export["individuals"][0]["id"] = json!("mutated");
        assert_eq!(engine.state().individuals[0].id, "A");
        assert_eq!(export["individuals"][0]["sex"], "U");
    }

    #[test]
    fn test_from_json_round_trip() {
        let mut engine = engine();
        engine.upsert_individual(&json!({"id": "A", "affected": {"value": true, "dx": ["CF"]}}));
        let text = engine.to_json_string().unwrap();
        let restored = PedigreeEngine::from_json(&text).unwrap();
        assert_eq!(restored.state(), engine.state());
        assert!(PedigreeEngine::from_json("{not json").is_err());
    }

    #[test]
    fn test_validate_and_derived_data() {
        let mut engine = engine();
        engine.upsert_individual(&json!({"id": "A", "sex": "F", "affected": {"value": true}, "notes": "ana lopez"}));
        engine.upsert_pregnancy(&json!({"mother": "A", "outcome": "SAB"}));

        let report = engine.validate();
        assert_eq!(report.with_code(codes::INDI_DX_MISSING).count(), 1);
        assert_eq!(
            engine.compute_legend_usage(),
            BTreeSet::from([LegendMarker::Filled, LegendMarker::Triangle])
        );
        let ind = engine.state().individual("A").unwrap().clone();
        assert_eq!(engine.compute_privacy_label(&ind), "AL");
        assert_eq!(engine.graph().proband().unwrap().id, "A");
    }
}
