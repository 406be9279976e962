//! Read-only family graph queries
//!
//! Built on demand from a document snapshot. References to ids that are not
//! among the document's individuals are ignored.

use crate::document::{Document, Individual, Relationship};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

pub const PROBAND_ROLE: &str = "proband";

pub struct PedigreeGraph<'a> {
    doc: &'a Document,
    parents: HashMap<&'a str, Vec<&'a str>>,
    children: HashMap<&'a str, Vec<&'a str>>,
    partners: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> PedigreeGraph<'a> {
    pub fn new(doc: &'a Document) -> Self {
        let known: HashSet<&str> = doc.individuals.iter().map(|ind| ind.id.as_str()).collect();
        let mut parents: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut partners: HashMap<&str, Vec<&str>> = HashMap::new();

        let link = |map: &mut HashMap<&'a str, Vec<&'a str>>, from: &'a str, to: &'a str| {
            let entry = map.entry(from).or_default();
            if !entry.contains(&to) {
                entry.push(to);
            }
        };

        for rel in &doc.relationships {
            match rel {
                Relationship::ParentChild(pc) => {
                    let Some(child) = pc.child.as_deref().filter(|id| known.contains(id)) else {
                        continue;
                    };
                    for parent in [pc.father.as_deref(), pc.mother.as_deref()]
                        .into_iter()
                        .flatten()
                        .filter(|id| known.contains(id))
                    {
                        link(&mut parents, child, parent);
                        link(&mut children, parent, child);
                    }
                }
                Relationship::Partner(p) => {
                    if let (Some(a), Some(b)) = (p.a.as_deref(), p.b.as_deref())
                        && known.contains(a)
                        && known.contains(b)
                    {
                        link(&mut partners, a, b);
                        link(&mut partners, b, a);
                    }
                }
            }
        }

        Self {
            doc,
            parents,
            children,
            partners,
        }
    }

    pub fn parents_of(&self, id: &str) -> &[&'a str] {
        self.parents.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn children_of(&self, id: &str) -> &[&'a str] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn partners_of(&self, id: &str) -> &[&'a str] {
        self.partners.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// The individual whose `rol` is "proband", else the first individual.
    pub fn proband(&self) -> Option<&'a Individual> {
        self.doc
            .individuals
            .iter()
            .find(|ind| ind.rol.trim().eq_ignore_ascii_case(PROBAND_ROLE))
            .or_else(|| self.doc.individuals.first())
    }

    /// Generation index relative to the proband (parents -1, children +1).
    /// Individuals not connected to the proband get 0.
    pub fn generations(&self) -> BTreeMap<&'a str, i32> {
        let mut generations = BTreeMap::new();
        if let Some(proband) = self.proband() {
            generations.insert(proband.id.as_str(), 0);
            let mut queue = VecDeque::from([proband.id.as_str()]);

            while let Some(current) = queue.pop_front() {
                let generation = generations[current];
                let neighbours = self
                    .parents_of(current)
                    .iter()
                    .map(|id| (*id, generation - 1))
                    .chain(self.children_of(current).iter().map(|id| (*id, generation + 1)));
                for (id, g) in neighbours {
                    if !generations.contains_key(id) {
                        generations.insert(id, g);
                        queue.push_back(id);
                    }
                }
            }
        }

        for ind in &self.doc.individuals {
            generations.entry(ind.id.as_str()).or_insert(0);
        }
        generations
    }
}
