//! Editing session for one family's pedigree
//!
//! A session owns the engine, persists after every mutation that changed the
//! document, and applies documents saved by other writers on
//! [`PedigreeSession::sync_external`].

use crate::config::SessionConfig;
use crate::error::Result;
use pedigree_core::graph::PROBAND_ROLE;
use pedigree_core::legacy::{members_to_individuals, seed_document};
use pedigree_core::{
    create_empty_state, merge_objects, summarize_validation, Document, Finding, LegendMarker,
    PartnerStatus, PedigreeEngine, Relationship, Sex, ValidationReport,
};
use pedigree_store::{DocumentStore, Listener, Subscription};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// A parent/child link as requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    pub father: Option<String>,
    pub mother: Option<String>,
    pub child: String,
    pub biological: bool,
    pub gestational: bool,
    pub adoptive: bool,
}

impl ParentLink {
    pub fn new(child: impl Into<String>) -> Self {
        Self {
            father: None,
            mother: None,
            child: child.into(),
            biological: true,
            gestational: false,
            adoptive: false,
        }
    }

    pub fn father(mut self, id: impl Into<String>) -> Self {
        self.father = Some(id.into());
        self
    }

    pub fn mother(mut self, id: impl Into<String>) -> Self {
        self.mother = Some(id.into());
        self
    }

    pub fn adoptive(mut self) -> Self {
        self.biological = false;
        self.adoptive = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewParents {
    pub father_sex: Sex,
    pub mother_sex: Sex,
    pub biological: bool,
}

impl Default for NewParents {
    fn default() -> Self {
        Self {
            father_sex: Sex::M,
            mother_sex: Sex::F,
            biological: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parents {
    pub father: String,
    pub mother: String,
}

pub struct PedigreeSession {
    store: Arc<dyn DocumentStore>,
    family_id: String,
    recorder: String,
    engine: PedigreeEngine,
    saved_revision: u64,
    inbox: Receiver<Document>,
    subscription: Subscription,
}

impl PedigreeSession {
    /// Load `family_id` from `store`, or start an empty document when
    /// nothing is stored or the stored copy cannot be read.
    pub fn open(
        store: Arc<dyn DocumentStore>,
        family_id: &str,
        config: &SessionConfig,
    ) -> Result<Self> {
        let family_id = family_id.trim().to_string();
        pedigree_store::storage_key(&family_id)?;

        let document = match store.load(&family_id) {
            Ok(Some(doc)) => {
                debug!(family = %family_id, individuals = doc.individuals.len(), "loaded document");
                doc
            }
            Ok(None) => {
                info!(family = %family_id, "no stored document, starting empty");
                empty_document(&family_id, &config.defaults.recorder)
            }
            Err(e) => {
                warn!(family = %family_id, error = %e, "failed to load document, starting empty");
                empty_document(&family_id, &config.defaults.recorder)
            }
        };

        let (tx, inbox) = channel();
        let listener: Listener = Arc::new(move |doc: &Document| {
            let _ = tx.send(doc.clone());
        });
        let subscription = store.subscribe(&family_id, listener);

        Ok(Self {
            store,
            family_id,
            recorder: config.defaults.recorder.clone(),
            engine: PedigreeEngine::from_document(document, config.engine.history_limit),
            saved_revision: 0,
            inbox,
            subscription,
        })
    }

    pub fn family_id(&self) -> &str {
        &self.family_id
    }

    pub fn engine(&self) -> &PedigreeEngine {
        &self.engine
    }

    pub fn state(&self) -> &Document {
        self.engine.state()
    }

    /// Run engine mutations and persist if the document changed.
    pub fn commit<T>(&mut self, mutate: impl FnOnce(&mut PedigreeEngine) -> T) -> Result<T> {
        let before = self.engine.revision();
        let out = mutate(&mut self.engine);
        if self.engine.revision() != before {
            self.persist()?;
        }
        Ok(out)
    }

    /// Save the current document unless it is already stored.
    pub fn persist(&mut self) -> Result<()> {
        let revision = self.engine.revision();
        if revision == self.saved_revision {
            return Ok(());
        }

        if let Err(e) = self.store.save_from(
            &self.family_id,
            self.engine.state(),
            Some(self.subscription.id()),
        ) {
            warn!(family = %self.family_id, error = %e, "failed to save document");
            return Err(e.into());
        }
        self.saved_revision = revision;
        trace!(family = %self.family_id, revision, "persisted");
        Ok(())
    }

    /// Apply the latest document saved by another writer. Returns whether
    /// the current document changed.
    pub fn sync_external(&mut self) -> bool {
        let Some(latest) = self.inbox.try_iter().last() else {
            return false;
        };
        if &latest == self.engine.state() {
            trace!(family = %self.family_id, "external document already current");
            return false;
        }

        self.engine.replace_document(latest);
        self.saved_revision = self.engine.revision();
        debug!(family = %self.family_id, "applied external document");
        true
    }

    /// Replace the whole document.
    pub fn replace(&mut self, raw: &Value) -> Result<()> {
        self.commit(|engine| {
            engine.set_state(raw);
        })
    }

    pub fn create_individual(&mut self, payload: &Value) -> Result<String> {
        self.commit(|engine| engine.upsert_individual(payload))
    }

    /// Patch an individual; an unknown id creates it.
    pub fn update_individual(&mut self, id: &str, patch: &Value) -> Result<()> {
        if id.trim().is_empty() {
            return Ok(());
        }
        let payload = merge_objects(patch, &json!({ "id": id }));
        self.commit(|engine| {
            engine.upsert_individual(&payload);
        })
    }

    /// Make sure `id` exists, applying `patch` either way.
    pub fn ensure_individual(&mut self, id: &str, patch: &Value) -> Result<Option<String>> {
        if id.trim().is_empty() {
            return Ok(None);
        }
        let payload = merge_objects(patch, &json!({ "id": id }));
        self.commit(|engine| Some(engine.upsert_individual(&payload)))
    }

    pub fn remove_individual(&mut self, id: &str) -> Result<bool> {
        self.commit(|engine| engine.remove_individual(id))
    }

    pub fn link_partner(&mut self, a: &str, b: &str, status: PartnerStatus) -> Result<bool> {
        if a.is_empty() || b.is_empty() {
            return Ok(false);
        }
        let status = match status {
            PartnerStatus::Current => "current",
            PartnerStatus::Ended => "ended",
        };
        let payload = json!({"type": "partner", "a": a, "b": b, "status": status});
        self.commit(|engine| engine.upsert_relationship(&payload))
    }

    /// Patch the partnership between `a` and `b`, creating it if missing.
    /// The stored pair is ordered so the same couple always gets one entry.
    pub fn update_partner_relationship(&mut self, a: &str, b: &str, patch: &Value) -> Result<bool> {
        if a.is_empty() || b.is_empty() {
            return Ok(false);
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };

        let wanted = Relationship::Partner(pedigree_core::Partnership {
            a: Some(first.to_string()),
            b: Some(second.to_string()),
            ..Default::default()
        });
        let base = self
            .engine
            .state()
            .relationships
            .iter()
            .find(|rel| rel.same_identity(&wanted))
            .unwrap_or(&wanted);
        let base = serde_json::to_value(base).unwrap_or(Value::Null);

        let payload = merge_objects(
            &merge_objects(&base, patch),
            &json!({"type": "partner", "a": first, "b": second}),
        );
        self.commit(|engine| engine.upsert_relationship(&payload))
    }

    pub fn unlink_partner(&mut self, a: &str, b: &str) -> Result<usize> {
        let payload = json!({"type": "partner", "a": a, "b": b});
        self.commit(|engine| engine.remove_relationship(&payload))
    }

    /// Link a child to at least one parent.
    pub fn link_parent_child(&mut self, link: &ParentLink) -> Result<bool> {
        if link.child.is_empty() || (link.father.is_none() && link.mother.is_none()) {
            return Ok(false);
        }
        let payload = json!({
            "type": "parentChild",
            "father": link.father,
            "mother": link.mother,
            "child": link.child,
            "biological": link.biological,
            "gestational": link.gestational,
            "adoptive": link.adoptive,
        });
        self.commit(|engine| engine.upsert_relationship(&payload))
    }

    pub fn unlink_parent_child(
        &mut self,
        father: Option<&str>,
        mother: Option<&str>,
        child: &str,
    ) -> Result<usize> {
        let payload = json!({
            "type": "parentChild",
            "father": father,
            "mother": mother,
            "child": child,
        });
        self.commit(|engine| engine.remove_relationship(&payload))
    }

    /// Give `child` two parents: existing parents are reused, missing ones
    /// are created, the pair is linked as partners and an incomplete
    /// parent/child link is replaced by the complete one.
    pub fn create_parents_for_child(
        &mut self,
        child: &str,
        options: NewParents,
    ) -> Result<Option<Parents>> {
        if child.is_empty() {
            return Ok(None);
        }

        let existing = self.engine.state().relationships.iter().find_map(|rel| match rel {
            Relationship::ParentChild(pc)
                if pc.child.as_deref() == Some(child)
                    && (pc.father.is_some() || pc.mother.is_some()) =>
            {
                Some((pc.father.clone(), pc.mother.clone()))
            }
            _ => None,
        });

        if let Some((Some(father), Some(mother))) = &existing {
            return Ok(Some(Parents {
                father: father.clone(),
                mother: mother.clone(),
            }));
        }

        let parents = self.commit(|engine| {
            let (known_father, known_mother) = existing.clone().unwrap_or_default();
            let mut create = |sex: Sex| engine.upsert_individual(&json!({"sex": sex_code(sex)}));
            let father = known_father.unwrap_or_else(|| create(options.father_sex));
            let mother = known_mother.unwrap_or_else(|| create(options.mother_sex));

            engine.upsert_relationship(
                &json!({"type": "partner", "a": father, "b": mother, "status": "current"}),
            );
            engine.upsert_relationship(&json!({
                "type": "parentChild",
                "father": father,
                "mother": mother,
                "child": child,
                "biological": options.biological,
            }));
            if let Some((old_father, old_mother)) = &existing {
                engine.remove_relationship(&json!({
                    "type": "parentChild",
                    "father": old_father,
                    "mother": old_mother,
                    "child": child,
                }));
            }

            Parents { father, mother }
        })?;

        debug!(
            child = %child,
            father = %parents.father,
            mother = %parents.mother,
            "created parents"
        );
        Ok(Some(parents))
    }

    pub fn upsert_pregnancy(&mut self, payload: &Value) -> Result<String> {
        self.commit(|engine| engine.upsert_pregnancy(payload))
    }

    pub fn remove_pregnancy(&mut self, id: &str) -> Result<bool> {
        self.commit(|engine| engine.remove_pregnancy(id))
    }

    pub fn upsert_art(&mut self, payload: &Value) -> Result<String> {
        self.commit(|engine| engine.upsert_art(payload))
    }

    pub fn remove_art(&mut self, id: &str) -> Result<bool> {
        self.commit(|engine| engine.remove_art(id))
    }

    pub fn set_node_position(&mut self, id: &str, x: f64, y: f64) -> Result<()> {
        self.commit(|engine| engine.set_node_position(id, x, y))
    }

    pub fn set_legend(&mut self, patch: &Value) -> Result<()> {
        self.commit(|engine| engine.update_legend(patch))
    }

    pub fn set_metadata(&mut self, patch: &Value) -> Result<()> {
        self.commit(|engine| engine.update_metadata(patch))
    }

    /// Fill family id, reason and recorder when they are still blank.
    /// Nothing is recorded when all three are already set.
    pub fn apply_metadata_defaults(&mut self, reason: &str) -> Result<()> {
        let metadata = &self.engine.state().metadata;
        let mut patch = serde_json::Map::new();
        if metadata.family_id != self.family_id {
            patch.insert("familyId".into(), json!(self.family_id));
        }
        if metadata.reason.trim().is_empty() && !reason.trim().is_empty() {
            patch.insert("reason".into(), json!(reason));
        }
        if metadata.recorder.trim().is_empty() && !self.recorder.is_empty() {
            patch.insert("recorder".into(), json!(self.recorder));
        }
        if patch.is_empty() {
            return Ok(());
        }
        let patch = Value::Object(patch);
        self.commit(|engine| engine.update_metadata(&patch))
    }

    /// Seed an empty document from legacy member records and parent map.
    /// Returns false when the document already has individuals or there is
    /// nothing to import.
    pub fn bootstrap_from_legacy(&mut self, members: &Value, pedigree: &Value) -> Result<bool> {
        let current = self.engine.state();
        if !current.individuals.is_empty() {
            trace!(family = %self.family_id, "document already populated, skipping legacy import");
            return Ok(false);
        }
        let individuals = members_to_individuals(members);
        if individuals.is_empty() {
            return Ok(false);
        }

        let historian = individuals
            .iter()
            .find(|ind| ind.rol.trim().eq_ignore_ascii_case(PROBAND_ROLE))
            .map(|ind| ind.nombre.clone())
            .unwrap_or_default();
        let metadata = serde_json::to_value(&current.metadata).unwrap_or(Value::Null);
        let metadata = merge_objects(
            &metadata,
            &json!({"familyId": self.family_id, "historian": historian}),
        );
        let legend = serde_json::to_value(&current.legend).unwrap_or(Value::Null);

        let overrides = json!({"metadata": metadata, "legend": legend});
        let mut seeded = seed_document(members, pedigree, &overrides);
        seeded.pregnancies = current.pregnancies.clone();
        seeded.art = current.art.clone();
        seeded.layout = current.layout.clone();

        info!(
            family = %self.family_id,
            individuals = seeded.individuals.len(),
            relationships = seeded.relationships.len(),
            "bootstrapped from legacy records"
        );
        self.commit(|engine| {
            engine.replace_document(seeded);
        })?;
        Ok(true)
    }

    pub fn undo(&mut self) -> Result<()> {
        self.commit(|engine| {
            engine.undo();
        })
    }

    pub fn redo(&mut self) -> Result<()> {
        self.commit(|engine| {
            engine.redo();
        })
    }

    pub fn validation_report(&self) -> ValidationReport {
        self.engine.validate()
    }

    pub fn validation_summary(&self) -> Vec<Finding> {
        summarize_validation(&self.engine.validate())
    }

    pub fn legend_usage(&self) -> BTreeSet<LegendMarker> {
        self.engine.compute_legend_usage()
    }
}

fn empty_document(family_id: &str, recorder: &str) -> Document {
    create_empty_state(&json!({
        "metadata": {"familyId": family_id, "recorder": recorder}
    }))
}

fn sex_code(sex: Sex) -> &'static str {
    match sex {
        Sex::M => "M",
        Sex::F => "F",
        Sex::U => "U",
    }
}
