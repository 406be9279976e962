//! Normalization of untrusted document payloads
//!
//! Every `normalize_*` function accepts any JSON value (partial, legacy,
//! hand-edited or plain garbage) and returns the canonical typed entity.
//! Nothing here fails: unknown enum values fall back to their default,
//! missing fields take documented defaults, and array entries without a
//! required identifier are dropped. Normalization never reads the clock;
//! only [`create_empty_state`] stamps timestamps.

mod individual;
mod links;
mod presentation;

pub use individual::normalize_individual;
pub use links::{normalize_art, normalize_pregnancy, normalize_relationship};
pub use presentation::{normalize_layout, normalize_legend, normalize_metadata};

use crate::document::{Document, Individual};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Normalize a whole document.
pub fn normalize_state(raw: &Value) -> Document {
    let individuals = first_by_id(
        entries(raw, "individuals").map(normalize_individual),
        |ind: &Individual| ind.id.as_str(),
    );
    let pregnancies = first_by_id(entries(raw, "pregnancies").map(normalize_pregnancy), |p| {
        p.id.as_str()
    });
    let art = first_by_id(entries(raw, "art").map(normalize_art), |entry| entry.id.as_str());
    let relationships = entries(raw, "relationships")
        .filter_map(normalize_relationship)
        .collect();

    Document {
        individuals,
        relationships,
        pregnancies,
        art,
        layout: normalize_layout(member(raw, "layout")),
        metadata: normalize_metadata(member(raw, "metadata")),
        legend: normalize_legend(member(raw, "legend")),
    }
}

/// A minimal valid document. `overrides` may carry `metadata` and `legend`
/// objects; creation/update timestamps default to now.
pub fn create_empty_state(overrides: &Value) -> Document {
    let mut metadata = normalize_metadata(member(overrides, "metadata"));
    if metadata.created_at.is_empty() || metadata.updated_at.is_empty() {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        if metadata.created_at.is_empty() {
            metadata.created_at = now.clone();
        }
        if metadata.updated_at.is_empty() {
            metadata.updated_at = now;
        }
    }

    Document {
        individuals: Vec::new(),
        relationships: Vec::new(),
        pregnancies: Vec::new(),
        art: Vec::new(),
        layout: Default::default(),
        metadata,
        legend: normalize_legend(member(overrides, "legend")),
    }
}

/// Shallow-merge `patch` over `base`. Non-object patches leave `base` as is.
pub fn merge_objects(base: &Value, patch: &Value) -> Value {
    let mut merged = base.as_object().cloned().unwrap_or_default();
    if let Some(patch) = patch.as_object() {
        for (key, value) in patch {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}

/// Keep entries with a non-empty id, first occurrence wins.
fn first_by_id<T>(items: impl Iterator<Item = T>, id: impl Fn(&T) -> &str) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .filter(|item| {
            let id = id(item);
            !id.is_empty() && seen.insert(id.to_string())
        })
        .collect()
}

static NULL: Value = Value::Null;

/// `raw[key]`, or `Null` when `raw` is not an object or lacks the key.
pub(crate) fn member<'a>(raw: &'a Value, key: &str) -> &'a Value {
    raw.get(key).unwrap_or(&NULL)
}

pub(crate) fn entries<'a>(raw: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    raw.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

pub(crate) fn text(raw: &Value, key: &str) -> String {
    match raw.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Nullable free text; blank strings become `None`.
pub(crate) fn opt_text(raw: &Value, key: &str) -> Option<String> {
    match raw.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Identifier: trimmed string or a number rendered as text.
pub(crate) fn id_text(raw: &Value, key: &str) -> Option<String> {
    match raw.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn int(raw: &Value, key: &str) -> Option<i32> {
    match raw.get(key)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn number(raw: &Value, key: &str) -> Option<f64> {
    let value = match raw.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    value.filter(|v: &f64| v.is_finite())
}

pub(crate) fn flag(raw: &Value, key: &str, default: bool) -> bool {
    match raw.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => match s.trim() {
            "true" => true,
            "false" => false,
            _ => default,
        },
        _ => default,
    }
}

pub(crate) fn object(raw: &Value, key: &str) -> Map<String, Value> {
    raw.get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}
