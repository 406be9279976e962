pub mod document;
pub mod engine;
pub mod error;
pub mod graph;
pub mod legacy;
pub mod legend;
pub mod normalize;
pub mod privacy;
pub mod validation;

pub use document::{
    Affected, Ancestry, ArtEntry, ArtRole, Carrier, CarrierEvidence, CarrierType, DatePrivacy,
    DeadInfo, Document, Evaluation, Individual, Layout, LayoutEdge, LayoutNode, Legend,
    LegendMarker, Metadata, NamePrivacy, ParentChild, PartnerStatus, Partnership, Pregnancy,
    PregnancyOutcome, Privacy, Relationship, Sex,
};
pub use engine::{PedigreeEngine, DEFAULT_HISTORY_LIMIT};
pub use error::{PedigreeError, Result};
pub use graph::PedigreeGraph;
pub use legend::legend_usage;
pub use normalize::{create_empty_state, merge_objects, normalize_state};
pub use privacy::privacy_label;
pub use validation::{
    summarize_validation, validate_state, validate_value, Finding, FindingLevel, ValidationReport,
};
