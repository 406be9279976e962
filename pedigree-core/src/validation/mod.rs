//! Clinical validation of pedigree documents
//!
//! Individuals: identity, death record, diagnosis and carrier hints
//! Links: relationships, pregnancies and ART entries, reference integrity
//! Raw: checks against the payload before normalization repairs it
//!
//! Validation never fails and never mutates its input; findings are data.

pub mod individuals;
pub mod links;
pub mod raw;
pub mod report;

pub use report::{codes, Finding, FindingLevel, ValidationReport};

use crate::document::Document;
use crate::normalize::normalize_state;
use serde_json::Value;

/// Validate a normalized document.
pub fn validate_state(doc: &Document) -> ValidationReport {
    let mut report = ValidationReport::default();

    individuals::check_individuals(doc, &mut report);
    links::check_links(doc, &mut report);

    if doc.metadata.reason.trim().is_empty() {
        report.push(
            Finding::warning(codes::META_REASON_MISSING, "Reason for consultation is empty")
                .at("metadata.reason"),
        );
    }

    report
}

/// Validate an untrusted payload: raw-shape checks first, then the
/// normalized document.
pub fn validate_value(raw: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();
    raw::check_raw(raw, &mut report);
    report.merge(validate_state(&normalize_state(raw)));
    report
}

/// Flatten a report for display: errors, then warnings, then suggestions.
pub fn summarize_validation(report: &ValidationReport) -> Vec<Finding> {
    report.iter().cloned().collect()
}
