use super::{entries, id_text, member, number, text};
use crate::document::{
    DatePrivacy, Layout, LayoutEdge, LayoutNode, Legend, Metadata, NamePrivacy, Privacy,
};
use serde_json::Value;
use std::collections::HashSet;

/// Normalize layout hints. Nodes need an id; edges need `from`, `to` and
/// `kind`. Coordinates that are missing or not finite become `0`.
pub fn normalize_layout(raw: &Value) -> Layout {
    let mut seen = HashSet::new();
    let nodes = entries(raw, "nodes")
        .filter_map(|node| {
            let id = id_text(node, "id")?;
            seen.insert(id.clone()).then(|| LayoutNode {
                id,
                x: number(node, "x").unwrap_or(0.0),
                y: number(node, "y").unwrap_or(0.0),
            })
        })
        .collect();

    let edges = entries(raw, "edges")
        .filter_map(|edge| {
            Some(LayoutEdge {
                from: id_text(edge, "from")?,
                to: id_text(edge, "to")?,
                kind: id_text(edge, "kind")?,
            })
        })
        .collect();

    Layout { nodes, edges }
}

pub fn normalize_metadata(raw: &Value) -> Metadata {
    let privacy = member(raw, "privacy");
    Metadata {
        family_id: id_text(raw, "familyId").unwrap_or_default(),
        created_at: text(raw, "createdAt"),
        updated_at: text(raw, "updatedAt"),
        recorder: text(raw, "recorder"),
        historian: text(raw, "historian"),
        reason: text(raw, "reason"),
        privacy: Privacy {
            names: match privacy.get("names").and_then(Value::as_str) {
                Some("full") => NamePrivacy::Full,
                _ => NamePrivacy::Initials,
            },
            dates: match privacy.get("dates").and_then(Value::as_str) {
                Some("full") => DatePrivacy::Full,
                _ => DatePrivacy::YearOnly,
            },
        },
    }
}

/// Blank or non-string descriptions fall back to the built-in text.
pub fn normalize_legend(raw: &Value) -> Legend {
    let defaults = Legend::default();
    let pick = |key: &str, default: String| match raw.get(key).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        _ => default,
    };
    Legend {
        filled: pick("filled", defaults.filled),
        half_filled: pick("halfFilled", defaults.half_filled),
        dot: pick("dot", defaults.dot),
        triangle: pick("triangle", defaults.triangle),
        diamond: pick("diamond", defaults.diamond),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_layout_repairs_coordinates() {
        let layout = normalize_layout(&json!({
            "nodes": [{"id": "A", "x": "12.5", "y": null}, {"id": "A", "x": 99}],
            "edges": [{"from": "A", "to": "B", "kind": ""}]
        }));
        assert_eq!(layout.nodes.len(), 1);
        assert_eq!(layout.nodes[0].x, 12.5);
        assert_eq!(layout.nodes[0].y, 0.0);
        assert!(layout.edges.is_empty());
    }

    #[test]
    fn test_metadata_privacy_defaults() {
        let meta = normalize_metadata(&json!({"reason": "Hipoacusia", "privacy": {"names": "FULL"}}));
        assert_eq!(meta.reason, "Hipoacusia");
        assert_eq!(meta.privacy.names, NamePrivacy::Initials);
        assert_eq!(meta.privacy.dates, DatePrivacy::YearOnly);
        assert_eq!(meta.created_at, "");
    }

    #[test]
    fn test_legend_partial_override() {
        let legend = normalize_legend(&json!({"dot": "Portadora X", "diamond": "", "filled": 3}));
        assert_eq!(legend.dot, "Portadora X");
        assert_eq!(legend.diamond, Legend::default().diamond);
        assert_eq!(legend.filled, Legend::default().filled);
    }
}
