use crate::document::{Individual, NamePrivacy, Privacy};
use serde_json::Value;

/// Display name for `ind` under the document's privacy policy.
///
/// Initials mode prefers `filiatorios.iniciales`, then the initials of the
/// free-text notes, then the id. Full mode shows the notes, else the id.
pub fn privacy_label(privacy: &Privacy, ind: &Individual) -> String {
    match privacy.names {
        NamePrivacy::Initials => stored_initials(ind)
            .or_else(|| non_empty(initials(&ind.notes)))
            .unwrap_or_else(|| ind.id.clone()),
        NamePrivacy::Full => non_empty(ind.notes.clone()).unwrap_or_else(|| ind.id.clone()),
    }
}

/// First letter of each whitespace-separated word, uppercased.
pub fn initials(text: &str) -> String {
    text.split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

fn stored_initials(ind: &Individual) -> Option<String> {
    match ind.filiatorios.get("iniciales") {
        Some(Value::String(s)) => non_empty(s.trim().to_string()),
        _ => None,
    }
}

fn non_empty(s: String) -> Option<String> {
    (!s.trim().is_empty()).then_some(s)
}
