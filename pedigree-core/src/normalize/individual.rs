use super::{flag, id_text, int, member, object, opt_text, text};
use crate::document::{
    Affected, Ancestry, Carrier, CarrierEvidence, CarrierType, DeadInfo, Evaluation, Individual,
    Sex,
};
use serde_json::Value;

/// Normalize one individual. A missing id is left empty; callers decide
/// whether to drop the entry or generate one.
pub fn normalize_individual(raw: &Value) -> Individual {
    let mut individual = Individual::new(id_text(raw, "id").unwrap_or_default());
    if !raw.is_object() {
        return individual;
    }

    individual.label = text(raw, "label");
    individual.nombre = text(raw, "nombre");
    individual.rol = text(raw, "rol");
    individual.sex = raw
        .get("sex")
        .and_then(Value::as_str)
        .and_then(Sex::parse)
        .unwrap_or(Sex::U);
    individual.born_year = int(raw, "bornYear");
    individual.age = int(raw, "age");
    individual.dead = flag(raw, "dead", false);

    let dead_info = member(raw, "deadInfo");
    individual.dead_info = DeadInfo {
        year: int(dead_info, "year"),
        note: opt_text(dead_info, "note"),
    };

    individual.affected = normalize_affected(member(raw, "affected"));
    individual.carrier = normalize_carrier(member(raw, "carrier"));
    individual.evaluations = raw
        .get("evaluations")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.is_object())
                .map(|item| Evaluation {
                    code: text(item, "code"),
                    desc: text(item, "desc"),
                    result: text(item, "result"),
                })
                .collect()
        })
        .unwrap_or_default();
    individual.notes = text(raw, "notes");

    let ancestry = member(raw, "ancestry");
    individual.ancestry = Ancestry {
        maternal: opt_text(ancestry, "maternal"),
        paternal: opt_text(ancestry, "paternal"),
    };
    individual.filiatorios = object(raw, "filiatorios");

    individual
}

/// `affected` is either the canonical `{value, dx}` or a bare boolean.
fn normalize_affected(raw: &Value) -> Affected {
    match raw {
        Value::Bool(value) => Affected {
            value: *value,
            dx: Vec::new(),
        },
        Value::Object(_) => {
            let dx = match raw.get("dx") {
                Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string)
                    .collect(),
                _ => Vec::new(),
            };
            Affected {
                value: flag(raw, "value", false),
                dx,
            }
        }
        _ => Affected::default(),
    }
}

/// `carrier` is either the canonical `{type, evidence}` or a bare type string.
fn normalize_carrier(raw: &Value) -> Carrier {
    match raw {
        Value::String(kind) => Carrier {
            kind: CarrierType::parse(kind).unwrap_or_default(),
            evidence: CarrierEvidence::Unknown,
        },
        Value::Object(_) => Carrier {
            kind: raw
                .get("type")
                .and_then(Value::as_str)
                .and_then(CarrierType::parse)
                .unwrap_or_default(),
            evidence: raw
                .get("evidence")
                .and_then(Value::as_str)
                .and_then(CarrierEvidence::parse)
                .unwrap_or_default(),
        },
        _ => Carrier::default(),
    }
}
