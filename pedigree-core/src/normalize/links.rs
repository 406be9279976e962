use super::{flag, id_text, number, opt_text, text};
use crate::document::{
    ArtEntry, ArtRole, ParentChild, PartnerStatus, Partnership, Pregnancy, PregnancyOutcome,
    Relationship,
};
use serde_json::Value;

/// Normalize a relationship. Payloads whose `type` is neither `partner`
/// nor `parentChild` have no canonical form and yield `None`.
pub fn normalize_relationship(raw: &Value) -> Option<Relationship> {
    match raw.get("type").and_then(Value::as_str)? {
        "partner" => Some(Relationship::Partner(Partnership {
            a: id_text(raw, "a"),
            b: id_text(raw, "b"),
            status: match raw.get("status").and_then(Value::as_str) {
                Some("ended") => PartnerStatus::Ended,
                _ => PartnerStatus::Current,
            },
            consanguinity: flag(raw, "consanguinity", false),
        })),
        "parentChild" => Some(Relationship::ParentChild(ParentChild {
            father: id_text(raw, "father"),
            mother: id_text(raw, "mother"),
            child: id_text(raw, "child"),
            biological: flag(raw, "biological", true),
            gestational: flag(raw, "gestational", false),
            adoptive: flag(raw, "adoptive", false),
        })),
        _ => None,
    }
}

/// Normalize a pregnancy. Unknown outcomes become `null`, which validation
/// reports as an error.
pub fn normalize_pregnancy(raw: &Value) -> Pregnancy {
    Pregnancy {
        id: id_text(raw, "id").unwrap_or_default(),
        mother: id_text(raw, "mother"),
        father: id_text(raw, "father"),
        gestational_age_wks: number(raw, "gestationalAgeWks"),
        outcome: raw
            .get("outcome")
            .and_then(Value::as_str)
            .and_then(PregnancyOutcome::parse),
        karyotype: opt_text(raw, "karyotype"),
        affected: flag(raw, "affected", false),
    }
}

pub fn normalize_art(raw: &Value) -> ArtEntry {
    ArtEntry {
        id: id_text(raw, "id").unwrap_or_default(),
        role: raw
            .get("role")
            .and_then(Value::as_str)
            .and_then(ArtRole::parse)
            .unwrap_or_default(),
        related_to: id_text(raw, "relatedTo"),
        notes: text(raw, "notes"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partner_defaults() {
        let rel = normalize_relationship(&json!({"type": "partner", "a": "X", "status": "divorced"}));
        let Some(Relationship::Partner(p)) = rel else {
            panic!("expected partner");
        };
        assert_eq!(p.a.as_deref(), Some("X"));
        assert_eq!(p.b, None);
        assert_eq!(p.status, PartnerStatus::Current);
        assert!(!p.consanguinity);
    }

    #[test]
    fn test_parent_child_defaults_biological() {
        let rel = normalize_relationship(&json!({"type": "parentChild", "child": "C", "mother": ""}));
        let Some(Relationship::ParentChild(pc)) = rel else {
            panic!("expected parentChild");
        };
        assert!(pc.biological);
        assert!(!pc.adoptive);
        assert_eq!(pc.mother, None);
    }

    #[test]
    fn test_unknown_relationship_type() {
        assert!(normalize_relationship(&json!({"type": "twin"})).is_none());
        assert!(normalize_relationship(&json!({"a": "X", "b": "Y"})).is_none());
        assert!(normalize_relationship(&json!(null)).is_none());
    }

    #[test]
    fn test_pregnancy_outcome() {
        let preg = normalize_pregnancy(&json!({"id": "P1", "outcome": "miscarriage", "gestationalAgeWks": "11"}));
        assert_eq!(preg.outcome, None);
        assert_eq!(preg.gestational_age_wks, Some(11.0));
        let preg = normalize_pregnancy(&json!({"id": "P1", "outcome": "TOP", "karyotype": "47,XY,+21"}));
        assert_eq!(preg.outcome, Some(PregnancyOutcome::TOP));
        assert_eq!(preg.karyotype.as_deref(), Some("47,XY,+21"));
    }

    #[test]
    fn test_art_role_fallback() {
        let entry = normalize_art(&json!({"id": "ART-1", "role": "Q", "relatedTo": "P1"}));
        assert_eq!(entry.role, ArtRole::D);
        assert_eq!(entry.related_to.as_deref(), Some("P1"));
        assert_eq!(normalize_art(&json!({"role": "S"})).role, ArtRole::S);
    }
}
