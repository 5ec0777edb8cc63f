//! Reconciles a freshly built snapshot against the previous renderer state
//! before it is handed to the graph widget.

use std::collections::{HashMap, HashSet};

use crate::builder::apply_connected_rows;
use crate::{GraphSnapshot, Position};

/// What the rendering widget currently shows. The widget itself is a black
/// box: it takes node/edge lists and emits click/drag/connect events.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RendererState {
    pub tables: Vec<crate::TableNode>,
    pub edges: Vec<crate::Edge>,
}

/// Produce the next renderer state from a fresh build:
///
/// - edges whose endpoint tables are not both present are suppressed
///   (defense against partial builds);
/// - `connected_row_ids` is re-derived from the surviving edges;
/// - table positions the user dragged in the previous state carry over for
///   matching ids. Collapse state deliberately does not: a full refresh
///   resets every table to minimized.
pub fn synchronize(mut snapshot: GraphSnapshot, prev: &RendererState) -> RendererState {
    let prev_positions: HashMap<&str, &Position> = prev
        .tables
        .iter()
        .map(|t| (t.id.as_str(), &t.position))
        .collect();
    for table in &mut snapshot.tables {
        if let Some(pos) = prev_positions.get(table.id.as_str()) {
            table.position = (*pos).clone();
        }
    }

    let table_ids: HashSet<&str> = snapshot.tables.iter().map(|t| t.id.as_str()).collect();
    snapshot.edges.retain(|e| {
        let ok = table_ids.contains(e.source_table_id.as_str())
            && table_ids.contains(e.target_table_id.as_str());
        if !ok {
            eprintln!(
                "[reqflow-core] suppressing edge {} with missing endpoint ({} -> {})",
                e.id, e.source_table_id, e.target_table_id
            );
        }
        ok
    });

    apply_connected_rows(&mut snapshot.tables, &snapshot.edges);

    RendererState {
        tables: snapshot.tables,
        edges: snapshot.edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use serde_json::json;

    fn tree() -> serde_json::Value {
        json!({
            "uiid": "proj-1",
            "flows": [{
                "uiid": "f1", "parent_uiid": "proj-1", "name": "Login",
                "high_level_requirements": [
                    {"uiid": "h1", "parent_uiid": "f1", "name": "Form"}
                ],
            }]
        })
    }

    #[test]
    fn dragged_positions_survive_a_refresh() {
        let mut first = synchronize(build(&tree(), "proj-1"), &RendererState::default());
        let moved = Position { x: 901.0, y: 77.5 };
        first.tables[0].position = moved.clone();

        let second = synchronize(build(&tree(), "proj-1"), &first);
        assert_eq!(second.tables[0].position, moved);
        // Tables that did not move keep their computed spot.
        assert_eq!(second.tables[1].position, first.tables[1].position);
    }

    #[test]
    fn collapse_state_resets_to_minimized_on_refresh() {
        let mut first = synchronize(build(&tree(), "proj-1"), &RendererState::default());
        first.tables[0].toggle();
        assert!(!first.tables[0].is_minimized);

        let second = synchronize(build(&tree(), "proj-1"), &first);
        assert!(second.tables.iter().all(|t| t.is_minimized));
    }

    #[test]
    fn edges_with_a_missing_endpoint_never_reach_the_renderer() {
        let mut snapshot = build(&tree(), "proj-1");
        let mut stray = snapshot.edges[0].clone();
        stray.id = "stray".into();
        stray.target_table_id = "llr_gone".into();
        snapshot.edges.push(stray);

        let state = synchronize(snapshot, &RendererState::default());
        assert_eq!(state.edges.len(), 1);
        assert!(state.edges.iter().all(|e| e.id != "stray"));
    }

    #[test]
    fn connected_rows_are_rederived_from_surviving_edges() {
        let mut snapshot = build(&tree(), "proj-1");
        // Forge an edge from a second row; its endpoint table is gone, so
        // the row must not count as connected afterwards.
        let mut stray = snapshot.edges[0].clone();
        stray.id = "stray".into();
        stray.source_row_id = "f2".into();
        stray.target_table_id = "hlr_gone".into();
        snapshot.edges.push(stray);

        let state = synchronize(snapshot, &RendererState::default());
        let flow_table = state.tables.iter().find(|t| t.id == "flow_proj-1").unwrap();
        assert!(flow_table.connected_row_ids.contains("f1"));
        assert!(!flow_table.connected_row_ids.contains("f2"));
    }
}
