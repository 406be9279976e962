use super::report::{codes, Finding, ValidationReport};
use crate::document::Sex;
use crate::normalize::id_text;
use serde_json::Value;
use std::collections::HashSet;

/// Checks that only make sense before normalization repairs the payload:
/// individuals without an id, duplicate ids, and `sex` values outside M/F/U.
pub fn check_raw(raw: &Value, report: &mut ValidationReport) {
    let Some(individuals) = raw.get("individuals").and_then(Value::as_array) else {
        return;
    };

    let mut seen = HashSet::new();
    for (idx, item) in individuals.iter().enumerate() {
        let path = format!("individuals[{}]", idx);

        match id_text(item, "id") {
            None => report.push(
                Finding::error(
                    codes::INDI_ID_MISSING,
                    format!("Individual at position {} has no id", idx),
                )
                .at(format!("{}.id", path)),
            ),
            Some(id) if !seen.insert(id.clone()) => report.push(
                Finding::error(
                    codes::INDI_ID_DUPLICATE,
                    format!("Duplicate individual id '{}'", id),
                )
                .at(format!("{}.id", path)),
            ),
            Some(_) => {}
        }

        match item.get("sex") {
            None | Some(Value::Null) => {}
            Some(Value::String(sex)) if Sex::parse(sex).is_some() => {}
            Some(other) => report.push(
                Finding::error(
                    codes::INDI_SEX,
                    format!("Invalid sex {}; expected M, F or U", other),
                )
                .at(format!("{}.sex", path)),
            ),
        }
    }
}
