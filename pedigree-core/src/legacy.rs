//! Import of legacy family records
//!
//! Older records describe a family as a list of members plus a parent map
//! keyed by child id (`{childId: {padreId, madreId, biological, ...}}`).
//! Member fields:
//!
//! | legacy field | individual field |
//! |--------------|------------------|
//! | `nombre`, `filiatorios.iniciales`, `id` | `label` (first present) |
//! | `sexo` | `sex` (`M`, `F`, otherwise `U`) |
//! | `nacimiento` | `bornYear` |
//! | `edadCalculada` | `age` |
//! | `estado` = `fallecido` | `dead` |
//! | `fallecimiento.year`, `defuncion` | `deadInfo.year` |
//! | `edadTexto` or the death year | `deadInfo.note` as `d. <value>` |
//! | `afectado`, `estadoClinico` = `afectado` | `affected.value` |
//! | `diagnostico`, `diagnosticos` | `affected.dx` |
//! | `portador` (`AR`/`X`), `portadorEvidencia` | `carrier` |
//! | `evaluaciones` | `evaluations`, default codes `E1`, `E2`, ... |
//! | `notas` (text or `[{texto}]`) | `notes` |

use crate::document::{Document, Individual, Relationship};
use crate::normalize::{
    create_empty_state, id_text, int, normalize_individual, normalize_state, opt_text, text,
};
use crate::validation::individuals::DEATH_NOTE_PREFIX;
use serde_json::{json, Value};

const DECEASED: &str = "fallecido";
const AFFECTED: &str = "afectado";
const NOTE_SEPARATOR: &str = " · ";

/// Convert legacy member records. Members without an id are skipped.
pub fn members_to_individuals(members: &Value) -> Vec<Individual> {
    member_payloads(members)
        .iter()
        .map(normalize_individual)
        .collect()
}

/// Convert a legacy parent map into parent/child relationships, one per
/// entry, including entries that name no parent yet.
pub fn pedigree_to_relationships(pedigree: &Value) -> Vec<Relationship> {
    parent_payloads(pedigree)
        .iter()
        .filter_map(crate::normalize::normalize_relationship)
        .collect()
}

/// Build a complete document from legacy records; `overrides` is passed to
/// [`create_empty_state`].
pub fn seed_document(members: &Value, pedigree: &Value, overrides: &Value) -> Document {
    let seeded = normalize_state(&json!({
        "individuals": member_payloads(members),
        "relationships": parent_payloads(pedigree),
    }));

    let mut doc = create_empty_state(overrides);
    doc.individuals = seeded.individuals;
    doc.relationships = seeded.relationships;
    doc
}

fn member_payloads(members: &Value) -> Vec<Value> {
    members
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(member_payload)
        .collect()
}

fn member_payload(member: &Value) -> Option<Value> {
    let id = id_text(member, "id")?;
    let filiatorios = member.get("filiatorios").filter(|f| f.is_object());

    let label = opt_text(member, "nombre")
        .or_else(|| filiatorios.and_then(|f| opt_text(f, "iniciales")))
        .unwrap_or_else(|| id.clone());

    let sex = match member.get("sexo").and_then(Value::as_str) {
        Some("M") => "M",
        Some("F") => "F",
        _ => "U",
    };

    let dead = text(member, "estado").trim().eq_ignore_ascii_case(DECEASED);
    let death_year = member
        .get("fallecimiento")
        .and_then(|f| int(f, "year"))
        .filter(|year| *year != 0)
        .or_else(|| year_of(&text(member, "defuncion")));
    let death_note = dead
        .then(|| {
            opt_text(member, "edadTexto")
                .or_else(|| death_year.map(|year| year.to_string()))
        })
        .flatten()
        .map(|value| format!("{} {}", DEATH_NOTE_PREFIX, value));

    let affected = member.get("afectado") == Some(&Value::Bool(true))
        || member.get("estadoClinico").and_then(Value::as_str) == Some(AFFECTED);

    let carrier = match member.get("portador").and_then(Value::as_str) {
        Some(kind @ ("AR" | "X")) => kind,
        _ => "none",
    };
    let evidence = opt_text(member, "portadorEvidencia").unwrap_or_else(|| "unknown".to_string());

    let ancestry = member.get("ancestry");

    Some(json!({
        "id": id,
        "label": label,
        "nombre": text(member, "nombre"),
        "rol": text(member, "rol"),
        "sex": sex,
        "bornYear": year_of(&text(member, "nacimiento")),
        "age": member.get("edadCalculada").filter(|age| age.is_number()),
        "dead": dead,
        "deadInfo": { "year": death_year, "note": death_note },
        "affected": { "value": affected, "dx": diagnoses(member) },
        "carrier": { "type": carrier, "evidence": evidence },
        "evaluations": evaluations(member),
        "notes": notes(member),
        "ancestry": {
            "maternal": ancestry.and_then(|a| opt_text(a, "maternal")),
            "paternal": ancestry.and_then(|a| opt_text(a, "paternal")),
        },
        "filiatorios": filiatorios.cloned().unwrap_or_else(|| json!({})),
    }))
}

/// `diagnostico` first, then `diagnosticos` entries (text or `{texto}`).
fn diagnoses(member: &Value) -> Vec<String> {
    let listed = member
        .get("diagnosticos")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            _ => opt_text(item, "texto"),
        });

    opt_text(member, "diagnostico")
        .into_iter()
        .chain(listed)
        .filter(|dx| !dx.is_empty())
        .collect()
}

fn evaluations(member: &Value) -> Vec<Value> {
    member
        .get("evaluaciones")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(idx, eval)| {
            let code = opt_text(eval, "code").unwrap_or_else(|| format!("E{}", idx + 1));
            json!({
                "code": code,
                "desc": text(eval, "desc"),
                "result": text(eval, "result"),
            })
        })
        .collect()
}

fn notes(member: &Value) -> String {
    match member.get("notas") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| opt_text(item, "texto"))
            .collect::<Vec<_>>()
            .join(NOTE_SEPARATOR),
        _ => String::new(),
    }
}

fn parent_payloads(pedigree: &Value) -> Vec<Value> {
    pedigree
        .as_object()
        .into_iter()
        .flatten()
        .map(|(child, node)| {
            let biological = node.get("biological") != Some(&Value::Bool(false));
            let adoptive = !biological || node.get("adoptive") == Some(&Value::Bool(true));
            json!({
                "type": "parentChild",
                "child": child.trim(),
                "father": id_text(node, "padreId"),
                "mother": id_text(node, "madreId"),
                "biological": biological,
                "gestational": node.get("gestational") == Some(&Value::Bool(true)),
                "adoptive": adoptive,
            })
        })
        .collect()
}

/// Year prefix of an ISO-like date ("1970-01-01" -> 1970).
fn year_of(date: &str) -> Option<i32> {
    let year = date.trim().get(..4)?;
    year.chars()
        .all(|c| c.is_ascii_digit())
        .then(|| year.parse().ok())
        .flatten()
}
