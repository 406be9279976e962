use super::report::{codes, Finding, ValidationReport};
use crate::document::{CarrierType, Document, Individual};
use regex::Regex;
use serde_json::json;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Canonical prefix of a death note ("d. 60s").
pub const DEATH_NOTE_PREFIX: &str = "d.";

/// Evaluation codes starting with `E<number>` ("E12", "e3-exome") refer to a
/// genetic study.
static STUDY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^E\d+").expect("study code pattern is valid"));

/// Per-individual checks: identity, death record, diagnosis, carrier hints.
pub fn check_individuals(doc: &Document, report: &mut ValidationReport) {
    let mut seen = HashSet::new();

    for (idx, ind) in doc.individuals.iter().enumerate() {
        let path = format!("individuals[{}]", idx);

        if ind.id.trim().is_empty() {
            report.push(
                Finding::error(
                    codes::INDI_ID_MISSING,
                    format!("Individual at position {} has no id", idx),
                )
                .at(format!("{}.id", path)),
            );
        } else if !seen.insert(ind.id.as_str()) {
            report.push(
                Finding::error(
                    codes::INDI_ID_DUPLICATE,
                    format!("Duplicate individual id '{}'", ind.id),
                )
                .at(format!("{}.id", path)),
            );
        }

        check_death_record(ind, &path, report);

        if ind.affected.value && ind.affected.dx.is_empty() {
            report.push(
                Finding::warning(
                    codes::INDI_DX_MISSING,
                    format!("Individual '{}' is affected but the diagnosis is missing", ind.id),
                )
                .at(format!("{}.affected.dx", path)),
            );
        }

        if !ind.affected.value
            && ind.carrier.kind == CarrierType::None
            && ind
                .evaluations
                .iter()
                .any(|eval| STUDY_CODE.is_match(eval.code.trim()))
        {
            report.push(
                Finding::suggestion(
                    codes::INDI_EVAL_HINT,
                    format!(
                        "Individual '{}' has study results; consider recording a carrier or affected status",
                        ind.id
                    ),
                )
                .at(format!("{}.evaluations", path)),
            );
        }
    }
}

fn check_death_record(ind: &Individual, path: &str, report: &mut ValidationReport) {
    if !ind.dead {
        return;
    }

    match (&ind.dead_info.year, &ind.dead_info.note) {
        (None, None) => report.push(
            Finding::warning(
                codes::INDI_DEAD_INFO,
                format!("Deceased individual '{}' has no death year or note", ind.id),
            )
            .at(format!("{}.deadInfo", path)),
        ),
        (_, Some(note)) if !has_death_prefix(note) => {
            let fixed = format!("{} {}", DEATH_NOTE_PREFIX, note.trim());
            report.push(
                Finding::suggestion(
                    codes::INDI_DEAD_NOTE,
                    format!("Death note should start with '{}'", DEATH_NOTE_PREFIX),
                )
                .at(format!("{}.deadInfo.note", path))
                .with_fix(json!({ "note": fixed })),
            );
        }
        _ => {}
    }
}

fn has_death_prefix(note: &str) -> bool {
    note.trim()
        .get(..DEATH_NOTE_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(DEATH_NOTE_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Evaluation, Individual};
    use crate::normalize::normalize_state;

    fn doc_with(individuals: Vec<Individual>) -> Document {
        let mut doc = normalize_state(&serde_json::Value::Null);
        doc.individuals = individuals;
        doc
    }

    fn run(doc: &Document) -> ValidationReport {
        let mut report = ValidationReport::default();
        check_individuals(doc, &mut report);
        report
    }

    #[test]
    fn test_dead_without_info_warns() {
        let mut ind = Individual::new("A1");
        ind.dead = true;
        let report = run(&doc_with(vec![ind]));
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].code, codes::INDI_DEAD_INFO);
    }

    #[test]
    fn test_dead_note_prefix_suggestion() {
        let mut ind = Individual::new("A1");
        ind.dead = true;
        ind.dead_info.note = Some("60s".to_string());
        let report = run(&doc_with(vec![ind.clone()]));
        assert!(report.warnings.is_empty());
        assert_eq!(report.suggestions.len(), 1);
        assert_eq!(report.suggestions[0].code, codes::INDI_DEAD_NOTE);
        assert_eq!(report.suggestions[0].fix.as_ref().unwrap()["note"], "d. 60s");

        ind.dead_info.note = Some("d. 1990".to_string());
        assert!(run(&doc_with(vec![ind])).is_clean());
    }

    #[test]
    fn test_dead_note_prefix_ignores_case() {
        let mut ind = Individual::new("A1");
        ind.dead = true;
        ind.dead_info.note = Some("D. 1990".to_string());
        assert!(run(&doc_with(vec![ind.clone()])).is_clean());

        ind.dead_info.note = Some("  D.60s".to_string());
        assert!(run(&doc_with(vec![ind.clone()])).is_clean());

        ind.dead_info.note = Some("Dx 1990".to_string());
        let report = run(&doc_with(vec![ind]));
        assert_eq!(report.suggestions[0].fix.as_ref().unwrap()["note"], "d. Dx 1990");
    }

    #[test]
    fn test_death_year_alone_is_enough() {
        let mut ind = Individual::new("A1");
        ind.dead = true;
        ind.dead_info.year = Some(2001);
        assert!(run(&doc_with(vec![ind])).is_clean());
    }

    #[test]
    fn test_missing_and_duplicate_ids() {
        let report = run(&doc_with(vec![
            Individual::new("A"),
            Individual::new(""),
            Individual::new("A"),
        ]));
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].code, codes::INDI_ID_MISSING);
        assert_eq!(report.errors[1].code, codes::INDI_ID_DUPLICATE);
        assert_eq!(report.errors[1].path.as_deref(), Some("individuals[2].id"));
    }

    #[test]
    fn test_affected_without_diagnosis() {
        let mut ind = Individual::new("A");
        ind.affected.value = true;
        let report = run(&doc_with(vec![ind.clone()]));
        assert_eq!(report.warnings[0].code, codes::INDI_DX_MISSING);

        ind.affected.dx.push("Marfan".to_string());
        assert!(run(&doc_with(vec![ind])).is_clean());
    }

    #[test]
    fn test_study_code_hint() {
        let mut ind = Individual::new("A");
        ind.evaluations.push(Evaluation {
            code: "E12".to_string(),
            desc: "Exome".to_string(),
            result: String::new(),
        });
        let report = run(&doc_with(vec![ind.clone()]));
        assert_eq!(report.suggestions.len(), 1);
        assert_eq!(report.suggestions[0].code, codes::INDI_EVAL_HINT);

        ind.carrier.kind = CarrierType::AR;
        assert!(run(&doc_with(vec![ind.clone()])).is_clean());

        ind.carrier.kind = CarrierType::None;
        ind.evaluations[0].code = "EX".to_string();
        assert!(run(&doc_with(vec![ind])).is_clean());
    }

    #[test]
    fn test_study_code_hint_lowercase_and_suffix() {
        for code in ["e12", "E12-exoma", " E7 "] {
            let mut ind = Individual::new("A");
            ind.evaluations.push(Evaluation {
                code: code.to_string(),
                desc: String::new(),
                result: String::new(),
            });
            let report = run(&doc_with(vec![ind]));
            assert_eq!(report.with_code(codes::INDI_EVAL_HINT).count(), 1, "code {code:?}");
        }
    }
}
