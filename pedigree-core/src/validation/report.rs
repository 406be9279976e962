use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable finding codes.
pub mod codes {
    pub const INDI_ID_MISSING: &str = "INDI_ID_MISSING";
    pub const INDI_ID_DUPLICATE: &str = "INDI_ID_DUPLICATE";
    pub const INDI_SEX: &str = "INDI_SEX";
    pub const INDI_DEAD_INFO: &str = "INDI_DEAD_INFO";
    pub const INDI_DEAD_NOTE: &str = "INDI_DEAD_NOTE";
    pub const INDI_DX_MISSING: &str = "INDI_DX_MISSING";
    pub const INDI_EVAL_HINT: &str = "INDI_EVAL_HINT";
    pub const REF_MISSING: &str = "REF_MISSING";
    pub const REL_PARTNER_INCOMPLETE: &str = "REL_PARTNER_INCOMPLETE";
    pub const REL_CHILD_MISSING: &str = "REL_CHILD_MISSING";
    pub const REL_PARENTS_MISSING: &str = "REL_PARENTS_MISSING";
    pub const REL_ADOPTIVE_FLAG: &str = "REL_ADOPTIVE_FLAG";
    pub const PREG_OUTCOME_INVALID: &str = "PREG_OUTCOME_INVALID";
    pub const PREG_FINDING_MISSING: &str = "PREG_FINDING_MISSING";
    pub const ART_RELATED_MISSING: &str = "ART_RELATED_MISSING";
    pub const ART_REF_MISSING: &str = "ART_REF_MISSING";
    pub const META_REASON_MISSING: &str = "META_REASON_MISSING";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingLevel {
    Error,
    Warning,
    Suggestion,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub code: String,
    pub level: FindingLevel,
    pub message: String,
    /// Location inside the document, e.g. `individuals[2].deadInfo`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Literal patch that would resolve the finding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<Value>,
}

impl Finding {
    pub fn new(level: FindingLevel, code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            level,
            message: message.into(),
            path: None,
            fix: None,
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::new(FindingLevel::Error, code, message)
    }

    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self::new(FindingLevel::Warning, code, message)
    }

    pub fn suggestion(code: &str, message: impl Into<String>) -> Self {
        Self::new(FindingLevel::Suggestion, code, message)
    }

    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_fix(mut self, fix: Value) -> Self {
        self.fix = Some(fix);
        self
    }
}

/// Findings grouped by severity. Advisory data, never an error value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub suggestions: Vec<Finding>,
}

impl ValidationReport {
    pub fn push(&mut self, finding: Finding) {
        match finding.level {
            FindingLevel::Error => self.errors.push(finding),
            FindingLevel::Warning => self.warnings.push(finding),
            FindingLevel::Suggestion => self.suggestions.push(finding),
        }
    }

    /// Append `other`'s findings after this report's, per severity.
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.suggestions.extend(other.suggestions);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.suggestions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Finding> {
        self.errors
            .iter()
            .chain(&self.warnings)
            .chain(&self.suggestions)
    }

    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Finding> {
        self.iter().filter(move |finding| finding.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_routes_by_level() {
        let mut report = ValidationReport::default();
        report.push(Finding::suggestion(codes::REL_ADOPTIVE_FLAG, "s"));
        report.push(Finding::error(codes::REF_MISSING, "e"));
        report.push(Finding::warning(codes::META_REASON_MISSING, "w"));
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.suggestions.len(), 1);
        assert!(report.has_errors());
        let order: Vec<_> = report.iter().map(|f| f.level).collect();
        assert_eq!(
            order,
            vec![FindingLevel::Error, FindingLevel::Warning, FindingLevel::Suggestion]
        );
    }

    #[test]
    fn test_finding_serialization_skips_empty_optionals() {
        let finding = Finding::warning(codes::INDI_DX_MISSING, "diagnosis missing");
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(
            json,
            json!({"code": "INDI_DX_MISSING", "level": "warning", "message": "diagnosis missing"})
        );

        let finding = Finding::suggestion(codes::INDI_DEAD_NOTE, "prefix")
            .at("individuals[0].deadInfo.note")
            .with_fix(json!({"note": "d. 60s"}));
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["path"], "individuals[0].deadInfo.note");
        assert_eq!(json["fix"]["note"], "d. 60s");
    }

    #[test]
    fn test_empty_report_is_clean() {
        let report = ValidationReport::default();
        assert!(report.is_clean());
        assert!(!report.has_errors());
        assert_eq!(report.len(), 0);
    }
}
