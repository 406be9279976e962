//! Pedigree document model
//!
//! One `Document` holds a whole family tree. The serde shape (camelCase,
//! `null` for absent optional ids) is the export format handed to
//! persistence adapters and print renderers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A whole pedigree: people, links between them and presentation data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub individuals: Vec<Individual>,
    pub relationships: Vec<Relationship>,
    pub pregnancies: Vec<Pregnancy>,
    pub art: Vec<ArtEntry>,
    pub layout: Layout,
    pub metadata: Metadata,
    pub legend: Legend,
}

impl Document {
    pub fn individual(&self, id: &str) -> Option<&Individual> {
        self.individuals.iter().find(|ind| ind.id == id)
    }

    pub fn has_individual(&self, id: &str) -> bool {
        self.individual(id).is_some()
    }

    pub fn pregnancy(&self, id: &str) -> Option<&Pregnancy> {
        self.pregnancies.iter().find(|preg| preg.id == id)
    }

    pub fn art_entry(&self, id: &str) -> Option<&ArtEntry> {
        self.art.iter().find(|entry| entry.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sex {
    M,
    F,
    /// Unspecified, drawn as a diamond.
    U,
}

impl Sex {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "M" | "m" => Some(Sex::M),
            "F" | "f" => Some(Sex::F),
            "U" | "u" => Some(Sex::U),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Individual {
    pub id: String,
    pub label: String,
    pub nombre: String,
    /// Free-text role in the family, e.g. "proband".
    pub rol: String,
    pub sex: Sex,
    pub born_year: Option<i32>,
    pub age: Option<i32>,
    pub dead: bool,
    pub dead_info: DeadInfo,
    pub affected: Affected,
    pub carrier: Carrier,
    pub evaluations: Vec<Evaluation>,
    pub notes: String,
    pub ancestry: Ancestry,
    pub filiatorios: Map<String, Value>,
}

impl Individual {
    /// An individual with every field at its default.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: String::new(),
            nombre: String::new(),
            rol: String::new(),
            sex: Sex::U,
            born_year: None,
            age: None,
            dead: false,
            dead_info: DeadInfo::default(),
            affected: Affected::default(),
            carrier: Carrier::default(),
            evaluations: Vec::new(),
            notes: String::new(),
            ancestry: Ancestry::default(),
            filiatorios: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeadInfo {
    pub year: Option<i32>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Affected {
    pub value: bool,
    pub dx: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CarrierType {
    #[default]
    #[serde(rename = "none")]
    None,
    /// Autosomal recessive.
    AR,
    /// X-linked.
    X,
}

impl CarrierType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "none" => Some(CarrierType::None),
            "AR" | "ar" => Some(CarrierType::AR),
            "X" | "x" => Some(CarrierType::X),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarrierEvidence {
    Lab,
    Family,
    #[default]
    Unknown,
}

impl CarrierEvidence {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "lab" => Some(CarrierEvidence::Lab),
            "family" => Some(CarrierEvidence::Family),
            "unknown" => Some(CarrierEvidence::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carrier {
    #[serde(rename = "type")]
    pub kind: CarrierType,
    pub evidence: CarrierEvidence,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub code: String,
    pub desc: String,
    pub result: String,
}

/// Lineage hints. Advisory only: nothing keeps these in sync with
/// `individuals`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ancestry {
    pub maternal: Option<String>,
    pub paternal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Relationship {
    #[serde(rename = "partner")]
    Partner(Partnership),
    #[serde(rename = "parentChild")]
    ParentChild(ParentChild),
}

impl Relationship {
    /// Identity comparison: unordered `{a, b}` for partners, the
    /// `(child, mother, father)` triple for parent/child links.
    pub fn same_identity(&self, other: &Relationship) -> bool {
        match (self, other) {
            (Relationship::Partner(x), Relationship::Partner(y)) => {
                (x.a == y.a && x.b == y.b) || (x.a == y.b && x.b == y.a)
            }
            (Relationship::ParentChild(x), Relationship::ParentChild(y)) => {
                x.child == y.child && x.mother == y.mother && x.father == y.father
            }
            _ => false,
        }
    }

    pub fn references(&self, id: &str) -> bool {
        self.individual_refs().any(|(_, value)| value == id)
    }

    /// Every non-null individual id this relationship points at, with its field name.
    pub fn individual_refs(&self) -> impl Iterator<Item = (&'static str, &str)> {
        let refs: [(&'static str, Option<&str>); 3] = match self {
            Relationship::Partner(p) => [("a", p.a.as_deref()), ("b", p.b.as_deref()), ("", None)],
            Relationship::ParentChild(pc) => [
                ("father", pc.father.as_deref()),
                ("mother", pc.mother.as_deref()),
                ("child", pc.child.as_deref()),
            ],
        };
        refs.into_iter()
            .filter_map(|(field, value)| value.map(|v| (field, v)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartnerStatus {
    #[default]
    Current,
    Ended,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partnership {
    pub a: Option<String>,
    pub b: Option<String>,
    pub status: PartnerStatus,
    pub consanguinity: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentChild {
    pub father: Option<String>,
    pub mother: Option<String>,
    pub child: Option<String>,
    pub biological: bool,
    pub gestational: bool,
    pub adoptive: bool,
}

impl Default for ParentChild {
    fn default() -> Self {
        Self {
            father: None,
            mother: None,
            child: None,
            biological: true,
            gestational: false,
            adoptive: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PregnancyOutcome {
    /// Spontaneous abortion.
    SAB,
    /// Termination of pregnancy.
    TOP,
    /// Ectopic.
    ECT,
    /// Stillbirth.
    SB,
    Live,
}

impl PregnancyOutcome {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "SAB" => Some(PregnancyOutcome::SAB),
            "TOP" => Some(PregnancyOutcome::TOP),
            "ECT" => Some(PregnancyOutcome::ECT),
            "SB" => Some(PregnancyOutcome::SB),
            "Live" => Some(PregnancyOutcome::Live),
            _ => None,
        }
    }

    pub fn is_live(self) -> bool {
        self == PregnancyOutcome::Live
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pregnancy {
    pub id: String,
    pub mother: Option<String>,
    pub father: Option<String>,
    pub gestational_age_wks: Option<f64>,
    pub outcome: Option<PregnancyOutcome>,
    pub karyotype: Option<String>,
    pub affected: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtRole {
    /// Donor.
    #[default]
    D,
    /// Surrogate / gestational carrier.
    S,
}

impl ArtRole {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "D" | "d" => Some(ArtRole::D),
            "S" | "s" => Some(ArtRole::S),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtEntry {
    pub id: String,
    pub role: ArtRole,
    /// Pregnancy id this entry annotates.
    pub related_to: Option<String>,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEdge {
    pub from: String,
    pub to: String,
    pub kind: String,
}

impl LayoutEdge {
    /// `"<kind>:<from>-><to>"`, the merge key used by layout updates.
    pub fn key(&self) -> String {
        format!("{}:{}->{}", self.kind, self.from, self.to)
    }

    pub fn touches(&self, id: &str) -> bool {
        self.from == id || self.to == id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub family_id: String,
    pub created_at: String,
    pub updated_at: String,
    pub recorder: String,
    pub historian: String,
    pub reason: String,
    pub privacy: Privacy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Privacy {
    pub names: NamePrivacy,
    pub dates: DatePrivacy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamePrivacy {
    #[default]
    Initials,
    Full,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatePrivacy {
    #[default]
    YearOnly,
    Full,
}

/// Text shown next to each graphical marker in a rendered legend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Legend {
    pub filled: String,
    pub half_filled: String,
    pub dot: String,
    pub triangle: String,
    pub diamond: String,
}

impl Default for Legend {
    fn default() -> Self {
        Self {
            filled: "Affected".to_string(),
            half_filled: "Carrier (autosomal recessive)".to_string(),
            dot: "Carrier (X-linked)".to_string(),
            triangle: "Pregnancy not carried to term".to_string(),
            diamond: "Sex not specified".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LegendMarker {
    Filled,
    HalfFilled,
    Dot,
    Triangle,
    Diamond,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_relationship_tagged_serialization() {
        let rel = Relationship::Partner(Partnership {
            a: Some("X".to_string()),
            b: None,
            ..Default::default()
        });
        let value = serde_json::to_value(&rel).unwrap();
        assert_eq!(
            value,
            json!({"type": "partner", "a": "X", "b": null, "status": "current", "consanguinity": false})
        );
    }

    #[test]
    fn test_partner_identity_ignores_order() {
        let xy = Relationship::Partner(Partnership {
            a: Some("X".into()),
            b: Some("Y".into()),
            ..Default::default()
        });
        let yx = Relationship::Partner(Partnership {
            a: Some("Y".into()),
            b: Some("X".into()),
            consanguinity: true,
            ..Default::default()
        });
        assert!(xy.same_identity(&yx));
    }

    #[test]
    fn test_parent_child_identity_is_triple() {
        let with_father = Relationship::ParentChild(ParentChild {
            father: Some("F".into()),
            child: Some("C".into()),
            ..Default::default()
        });
        let with_both = Relationship::ParentChild(ParentChild {
            father: Some("F".into()),
            mother: Some("M".into()),
            child: Some("C".into()),
            ..Default::default()
        });
        assert!(!with_father.same_identity(&with_both));
        assert!(with_both.references("M"));
        assert!(!with_father.references("M"));
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_value(CarrierType::None).unwrap(), json!("none"));
        assert_eq!(serde_json::to_value(DatePrivacy::YearOnly).unwrap(), json!("year-only"));
        assert_eq!(serde_json::to_value(LegendMarker::HalfFilled).unwrap(), json!("halfFilled"));
        assert_eq!(Sex::parse(" f "), Some(Sex::F));
        assert_eq!(PregnancyOutcome::parse("live"), None);
    }
}
