use crate::document::{Layout, LayoutEdge, LayoutNode};
use crate::normalize::{entries, id_text, number};
use serde_json::Value;

/// Move (or create) the node for `id`. Coordinates that are `None` keep the
/// node's current value, or `0` for a new node.
pub fn place_node(nodes: &mut Vec<LayoutNode>, id: &str, x: Option<f64>, y: Option<f64>) {
    let x = x.filter(|v| v.is_finite());
    let y = y.filter(|v| v.is_finite());
    match nodes.iter_mut().find(|node| node.id == id) {
        Some(node) => {
            node.x = x.unwrap_or(node.x);
            node.y = y.unwrap_or(node.y);
        }
        None => nodes.push(LayoutNode {
            id: id.to_string(),
            x: x.unwrap_or(0.0),
            y: y.unwrap_or(0.0),
        }),
    }
}

/// Apply a layout patch `{nodes?, edges?}`. Nodes merge by id; edges merge
/// by `"<kind>:<from>-><to>"` so re-adding an edge replaces it.
pub fn merge_layout(layout: &mut Layout, patch: &Value) {
    for node in entries(patch, "nodes") {
        if let Some(id) = id_text(node, "id") {
            place_node(&mut layout.nodes, &id, number(node, "x"), number(node, "y"));
        }
    }

    for edge in entries(patch, "edges") {
        let (Some(from), Some(to), Some(kind)) = (
            id_text(edge, "from"),
            id_text(edge, "to"),
            id_text(edge, "kind"),
        ) else {
            continue;
        };
        let edge = LayoutEdge { from, to, kind };
        let key = edge.key();
        match layout.edges.iter_mut().find(|existing| existing.key() == key) {
            Some(existing) => *existing = edge,
            None => layout.edges.push(edge),
        }
    }
}

/// Drop the node for `id` and every edge touching it.
pub fn detach(layout: &mut Layout, id: &str) {
    layout.nodes.retain(|node| node.id != id);
    layout.edges.retain(|edge| !edge.touches(id));
}
