//! Localized table edits. Every operation is scoped to one `TableNode`,
//! looks rows up by stable id (never by visible-array index), and finishes
//! with a reprojection so the visible/full invariant and the rendered height
//! stay correct. Lookup misses are silent no-ops; the caller owns feedback.

use crate::{ids, ColumnDef, RowRecord, TableNode};

/// Rewrite one field of one row. Structural keys map onto the named fields;
/// any other key writes the `extra` cell for that column. The sequence
/// column is not editable and the row's identity never changes.
pub fn edit_cell(table: &mut TableNode, row_id: &str, column_key: &str, value: &str) {
    let editable = table
        .columns
        .iter()
        .find(|c| c.key == column_key)
        .map(|c| c.editable);
    if editable != Some(true) {
        return;
    }
    let Some(row) = table.row_mut(row_id) else {
        return;
    };
    match column_key {
        "name" => row.display_name = value.to_string(),
        "description" => row.description = value.to_string(),
        key => {
            row.extra.insert(key.to_string(), value.to_string());
        }
    }
    table.reproject();
}

/// Insert a fresh row immediately after `after_row_id` (at the end when
/// `None`), resequence, reproject. Returns the synthesized id of the new
/// row, or `None` when the anchor row does not exist.
pub fn add_row(table: &mut TableNode, after_row_id: Option<&str>) -> Option<String> {
    let insert_at = match after_row_id {
        // Position in `all_rows`, so insertion lands after the true
        // successor even while the table is minimized.
        Some(id) => table.all_rows.iter().position(|r| r.id == id)? + 1,
        None => table.all_rows.len(),
    };
    let new_id = ids::synthesized_row_id(&table.id, insert_at);
    table.all_rows.insert(
        insert_at,
        RowRecord {
            id: new_id.clone(),
            sequence_number: 0,
            display_name: String::new(),
            description: String::new(),
            extra: Default::default(),
            source: serde_json::Value::Null,
        },
    );
    resequence(&mut table.all_rows);
    table.reproject();
    Some(new_id)
}

/// Remove the row with the given stable id, resequence, reproject. Returns
/// whether a row was removed.
pub fn delete_row(table: &mut TableNode, row_id: &str) -> bool {
    let before = table.all_rows.len();
    table.all_rows.retain(|r| r.id != row_id);
    if table.all_rows.len() == before {
        return false;
    }
    resequence(&mut table.all_rows);
    table.reproject();
    true
}

/// Append a user column with a fresh `col-N` key. Returns the key.
pub fn add_column(table: &mut TableNode, label: &str) -> String {
    let max = table
        .columns
        .iter()
        .filter_map(|c| c.key.strip_prefix("col-").and_then(|s| s.parse::<u64>().ok()))
        .max()
        .unwrap_or(0);
    let key = format!("col-{}", max + 1);
    let order = table.columns.iter().map(|c| c.order).max().map_or(0, |o| o + 1);
    table.columns.push(ColumnDef {
        key: key.clone(),
        label: label.to_string(),
        order,
        editable: true,
    });
    key
}

/// Structural removal only: cells already written for this column stay on
/// the rows (no back-fill or cleanup).
pub fn delete_column(table: &mut TableNode, key: &str) -> bool {
    let before = table.columns.len();
    table.columns.retain(|c| c.key != key);
    table.columns.len() != before
}

pub fn rename_column(table: &mut TableNode, key: &str, label: &str) -> bool {
    match table.columns.iter_mut().find(|c| c.key == key) {
        Some(col) => {
            col.label = label.to_string();
            true
        }
        None => false,
    }
}

/// Re-normalize sequence numbers to 1..=N in array order.
fn resequence(rows: &mut [RowRecord]) {
    for (i, row) in rows.iter_mut().enumerate() {
        row.sequence_number = i as u32 + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::table_height;
    use crate::{Level, Position, VISIBLE_ROW_BUDGET};
    use std::collections::BTreeSet;

    fn row(n: u32) -> RowRecord {
        RowRecord {
            id: format!("r{n}"),
            sequence_number: n,
            display_name: format!("Row {n}"),
            description: String::new(),
            extra: Default::default(),
            source: serde_json::Value::Null,
        }
    }

    fn table(rows: usize, minimized: bool) -> TableNode {
        let mut t = TableNode {
            id: "llr_h1".into(),
            level: Level::LowLevel,
            title: Level::LowLevel.title().into(),
            columns: ColumnDef::structural(),
            visible_rows: vec![],
            all_rows: (1..=rows as u32).map(row).collect(),
            is_minimized: minimized,
            connected_row_ids: BTreeSet::new(),
            position: Position::default(),
            height: 0.0,
        };
        t.reproject();
        t
    }

    fn seqs(t: &TableNode) -> Vec<u32> {
        t.all_rows.iter().map(|r| r.sequence_number).collect()
    }

    fn assert_projection_invariant(t: &TableNode) {
        if t.is_minimized {
            let k = t.all_rows.len().min(VISIBLE_ROW_BUDGET);
            assert_eq!(t.visible_rows[..], t.all_rows[..k]);
        } else {
            assert_eq!(t.visible_rows, t.all_rows);
        }
        assert_eq!(t.height, table_height(t.visible_rows.len()));
    }

    #[test]
    fn edit_cell_updates_both_projections() {
        let mut t = table(4, true);
        edit_cell(&mut t, "r1", "name", "Renamed");
        assert_eq!(t.all_rows[0].display_name, "Renamed");
        assert_eq!(t.visible_rows[0].display_name, "Renamed");
        assert_eq!(t.all_rows[0].id, "r1");
        assert_projection_invariant(&t);
    }

    #[test]
    fn edit_cell_refuses_the_sequence_column() {
        let mut t = table(2, false);
        edit_cell(&mut t, "r1", "sequence", "9");
        assert_eq!(seqs(&t), vec![1, 2]);
    }

    #[test]
    fn edit_cell_is_a_noop_on_unknown_row_or_column() {
        let mut t = table(2, false);
        let before = t.clone();
        edit_cell(&mut t, "missing", "name", "x");
        edit_cell(&mut t, "r1", "no-such-column", "x");
        assert_eq!(t, before);
    }

    #[test]
    fn edit_cell_writes_custom_columns_into_extra() {
        let mut t = table(2, false);
        let key = add_column(&mut t, "Priority");
        edit_cell(&mut t, "r2", &key, "high");
        assert_eq!(t.all_rows[1].extra[&key], "high");
    }

    #[test]
    fn delete_row_by_id_works_while_minimized() {
        // 4 rows, minimized, showing 3: delete the row at visible index 1.
        let mut t = table(4, true);
        assert!(delete_row(&mut t, "r2"));
        assert_eq!(t.all_rows.len(), 3);
        assert_eq!(seqs(&t), vec![1, 2, 3]);
        // 3 rows ≤ budget: all of them visible again.
        assert_eq!(t.visible_rows.len(), 3);
        assert_projection_invariant(&t);
    }

    #[test]
    fn delete_row_miss_is_a_noop() {
        let mut t = table(3, true);
        assert!(!delete_row(&mut t, "r9"));
        assert_eq!(t.all_rows.len(), 3);
        assert_projection_invariant(&t);
    }

    #[test]
    fn add_row_after_the_last_visible_row_of_a_minimized_table() {
        // 5 rows minimized: visible r1..r3. Inserting after r3 must land at
        // all-rows position 3, before r4, not at the end.
        let mut t = table(5, true);
        let new_id = add_row(&mut t, Some("r3")).unwrap();
        assert_eq!(t.all_rows.len(), 6);
        assert_eq!(t.all_rows[3].id, new_id);
        assert_eq!(t.all_rows[4].id, "r4");
        assert_eq!(seqs(&t), vec![1, 2, 3, 4, 5, 6]);
        assert_projection_invariant(&t);
    }

    #[test]
    fn add_row_appends_without_an_anchor() {
        let mut t = table(2, false);
        let new_id = add_row(&mut t, None).unwrap();
        assert_eq!(t.all_rows.last().unwrap().id, new_id);
        assert_eq!(seqs(&t), vec![1, 2, 3]);
        assert_projection_invariant(&t);
    }

    #[test]
    fn add_row_ids_are_fresh_and_unique() {
        let mut t = table(1, false);
        let a = add_row(&mut t, None).unwrap();
        let b = add_row(&mut t, None).unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("llr_h1-r"));
    }

    #[test]
    fn add_row_with_unknown_anchor_is_a_noop() {
        let mut t = table(2, false);
        assert!(add_row(&mut t, Some("r9")).is_none());
        assert_eq!(t.all_rows.len(), 2);
    }

    #[test]
    fn column_keys_come_from_a_max_scan() {
        let mut t = table(1, false);
        assert_eq!(add_column(&mut t, "One"), "col-1");
        assert_eq!(add_column(&mut t, "Two"), "col-2");
        assert!(delete_column(&mut t, "col-1"));
        // The key space never reuses a deleted slot's successor.
        assert_eq!(add_column(&mut t, "Three"), "col-3");
        let orders: Vec<u32> = t.columns.iter().map(|c| c.order).collect();
        let mut sorted = orders.clone();
        sorted.sort_unstable();
        assert_eq!(orders, sorted);
    }

    #[test]
    fn deleting_a_column_keeps_existing_cells() {
        let mut t = table(1, false);
        let key = add_column(&mut t, "Priority");
        edit_cell(&mut t, "r1", &key, "low");
        assert!(delete_column(&mut t, &key));
        assert_eq!(t.all_rows[0].extra[&key], "low");
    }

    #[test]
    fn rename_column_changes_the_label_only() {
        let mut t = table(1, false);
        assert!(rename_column(&mut t, "name", "Title"));
        let col = t.columns.iter().find(|c| c.key == "name").unwrap();
        assert_eq!(col.label, "Title");
        assert!(!rename_column(&mut t, "ghost", "x"));
    }

    #[test]
    fn row_mutations_never_desynchronize_projections() {
        let mut t = table(5, true);
        add_row(&mut t, Some("r5"));
        assert_projection_invariant(&t);
        delete_row(&mut t, "r1");
        assert_projection_invariant(&t);
        t.toggle();
        assert_projection_invariant(&t);
        add_row(&mut t, None);
        assert_projection_invariant(&t);
    }
}
