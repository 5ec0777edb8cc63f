//! Tree-to-graph builder: walks the nested requirement tree and emits one
//! table per parent-with-children relationship plus one edge from the parent
//! row to that child table.

use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::{
    fields, ids, Edge, GraphSnapshot, Item, Level, Position, RowRecord, TableNode,
    HIDDEN_ROWS_HANDLE, VISIBLE_ROW_BUDGET,
};
use crate::project::table_height;

/// Visual edge kind handed to the renderer.
pub const EDGE_KIND: &str = "hierarchy";

const ORIGIN_X: f64 = 100.0;
const ORIGIN_Y: f64 = 100.0;
const LEVEL_GAP_X: f64 = 460.0;
const TABLE_GAP_Y: f64 = 80.0;

/// Build a complete snapshot from the raw backend tree. Never fails: absent
/// or empty collections are leaves, malformed items fall back through the
/// field resolver.
pub fn build(tree: &Value, project_uiid: &str) -> GraphSnapshot {
    let mut cx = BuildCx::default();

    let flows = top_level_items(tree);
    if !flows.is_empty() {
        let root = cx.make_table(Level::Flow, project_uiid, &flows, 0);
        let root_id = root.id.clone();
        let row_ids: Vec<String> = root.all_rows.iter().map(|r| r.id.clone()).collect();
        cx.tables.push(root);
        cx.descend(&flows, Level::Flow, &root_id, &row_ids, 1);
    }

    let mut snapshot = GraphSnapshot {
        tables: cx.tables,
        edges: cx.edges,
    };
    drop_dangling_edges(&mut snapshot);
    apply_connected_rows(&mut snapshot.tables, &snapshot.edges);
    snapshot
}

/// Items of the top-level flow collection on the root document.
pub fn top_level_items(tree: &Value) -> Vec<Item> {
    fields::child_relations(tree)
        .into_iter()
        .find(|(key, _)| fields::relation_matches(key, Level::Flow))
        .map(|(_, raw)| {
            raw.iter()
                .enumerate()
                .map(|(i, v)| Item::from_value(v, i))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Default)]
struct BuildCx {
    tables: Vec<TableNode>,
    edges: Vec<Edge>,
    /// One y cursor per depth, advanced by each placed table's maximized
    /// height so siblings never overlap even after expansion.
    y_cursors: Vec<f64>,
}

impl BuildCx {
    fn make_table(&mut self, level: Level, anchor: &str, items: &[Item], depth: usize) -> TableNode {
        let id = ids::table_id(level, anchor);

        let mut ordered: Vec<&Item> = items.iter().collect();
        ordered.sort_by_key(|i| i.sequence_number);

        let all_rows: Vec<RowRecord> = ordered
            .iter()
            .enumerate()
            .map(|(i, item)| RowRecord {
                id: ids::row_id(&item.uiid, &id, i),
                sequence_number: i as u32 + 1,
                display_name: item.display_name.clone(),
                description: item.description.clone(),
                extra: Default::default(),
                source: item.raw.clone(),
            })
            .collect();

        while self.y_cursors.len() <= depth {
            self.y_cursors.push(ORIGIN_Y);
        }
        let position = Position {
            x: ORIGIN_X + depth as f64 * LEVEL_GAP_X,
            y: self.y_cursors[depth],
        };
        self.y_cursors[depth] += table_height(all_rows.len()) + TABLE_GAP_Y;

        let mut table = TableNode {
            id,
            level,
            title: level.title().to_string(),
            columns: crate::ColumnDef::structural(),
            visible_rows: vec![],
            all_rows,
            // Tables are born collapsed; a data refresh resets user choices.
            is_minimized: true,
            connected_row_ids: BTreeSet::new(),
            position,
            height: 0.0,
        };
        table.reproject();
        table
    }

    /// Walk one level down: for every parent row with matching children,
    /// emit a child table and the connecting edge, then recurse.
    fn descend(
        &mut self,
        items: &[Item],
        level: Level,
        parent_table_id: &str,
        parent_row_ids: &[String],
        depth: usize,
    ) {
        let Some(next) = level.next() else {
            return;
        };

        let mut ordered: Vec<&Item> = items.iter().collect();
        ordered.sort_by_key(|i| i.sequence_number);

        for (idx, item) in ordered.into_iter().enumerate() {
            let children = consistent_children(item, next);
            if children.is_empty() {
                continue;
            }

            // consistent_children keeps nothing under a uiid-less item, so
            // every parent reaching this point has a backend id to anchor
            // its child table.
            let child = self.make_table(next, &item.uiid, &children, depth);
            let child_id = child.id.clone();
            let child_row_ids: Vec<String> =
                child.all_rows.iter().map(|r| r.id.clone()).collect();
            self.tables.push(child);

            let source_row_id = parent_row_ids[idx].clone();
            // A row past the budget has no per-row connection point while
            // its table is collapsed; route through the shared handle.
            let source_handle = if idx >= VISIBLE_ROW_BUDGET {
                HIDDEN_ROWS_HANDLE.to_string()
            } else {
                source_row_id.clone()
            };
            self.edges.push(Edge {
                id: ids::edge_id(parent_table_id, idx, &child_id),
                source_table_id: parent_table_id.to_string(),
                source_row_id,
                source_handle,
                target_table_id: child_id.clone(),
                kind: EDGE_KIND.to_string(),
            });

            self.descend(&children, next, &child_id, &child_row_ids, depth + 1);
        }
    }
}

/// An item's children for the next level, restricted to those whose
/// `parent_uiid` points back at the item. Mismatches are silently excluded.
fn consistent_children(item: &Item, next: Level) -> Vec<Item> {
    let Some(candidates) = fields::select_relation(&item.children, next) else {
        return vec![];
    };
    candidates
        .iter()
        .filter(|c| {
            !item.uiid.is_empty() && c.parent_uiid.as_deref() == Some(item.uiid.as_str())
        })
        .cloned()
        .collect()
}

/// Drop edges whose endpoints are not both among the built tables.
fn drop_dangling_edges(snapshot: &mut GraphSnapshot) {
    let table_ids: HashSet<&str> = snapshot.tables.iter().map(|t| t.id.as_str()).collect();
    snapshot.edges.retain(|e| {
        let ok = table_ids.contains(e.source_table_id.as_str())
            && table_ids.contains(e.target_table_id.as_str());
        if !ok {
            eprintln!(
                "[reqflow-core] dropping dangling edge {} ({} -> {})",
                e.id, e.source_table_id, e.target_table_id
            );
        }
        ok
    });
}

/// Re-derive, per table, which rows originate at least one outgoing edge.
pub(crate) fn apply_connected_rows(tables: &mut [TableNode], edges: &[Edge]) {
    let mut by_table: HashMap<&str, BTreeSet<String>> = HashMap::new();
    for edge in edges {
        by_table
            .entry(edge.source_table_id.as_str())
            .or_default()
            .insert(edge.source_row_id.clone());
    }
    for table in tables {
        table.connected_row_ids = by_table.remove(table.id.as_str()).unwrap_or_default();
    }
}

/// Merge AI-generated children into the raw tree under the item with
/// `parent_uiid`, so the next rebuild picks them up. The new records carry no
/// uiid yet — the backend assigns one on save. Returns false when the parent
/// is not present in the tree.
pub fn append_generated_children(
    tree: &mut Value,
    parent_uiid: &str,
    child_level: Level,
    children: &[(String, String)],
) -> bool {
    let Some(parent) = find_item_mut(tree, parent_uiid) else {
        return false;
    };
    let Some(map) = parent.as_object_mut() else {
        return false;
    };

    let relation = map
        .keys()
        .find(|k| fields::relation_matches(k, child_level))
        .cloned()
        .unwrap_or_else(|| child_level.default_relation().to_string());

    let list = map
        .entry(relation)
        .or_insert_with(|| Value::Array(vec![]));
    let Some(list) = list.as_array_mut() else {
        return false;
    };
    for (name, description) in children {
        list.push(serde_json::json!({
            "uiid": "",
            "parent_uiid": parent_uiid,
            "name": name,
            "description": description,
        }));
    }
    true
}

/// Depth-first search for the object whose `uiid` matches.
fn find_item_mut<'a>(value: &'a mut Value, uiid: &str) -> Option<&'a mut Value> {
    if value.get("uiid").and_then(Value::as_str) == Some(uiid) {
        return Some(value);
    }
    match value {
        Value::Object(map) => {
            for (_, v) in map.iter_mut() {
                if let Some(found) = find_item_mut(v, uiid) {
                    return Some(found);
                }
            }
            None
        }
        Value::Array(items) => {
            for v in items {
                if let Some(found) = find_item_mut(v, uiid) {
                    return Some(found);
                }
            }
            None
        }
        _ => None,
    }
}
