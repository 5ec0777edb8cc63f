//! Visibility projection: the "visible rows" view over the full backing set.
//!
//! The table record is the single source of truth for its own minimized
//! flag — the flag and the row arrays always change together. UI controls
//! that want a quick lookup get a derived map from [`collapse_states`]
//! instead of a separately maintained registry.

use std::collections::BTreeMap;

use crate::{GraphSnapshot, RowRecord, TableNode, HEADER_HEIGHT, ROW_HEIGHT, VISIBLE_ROW_BUDGET};

/// Identity when maximized, the first `VISIBLE_ROW_BUDGET` rows when
/// minimized.
pub fn project(all_rows: &[RowRecord], is_minimized: bool) -> Vec<RowRecord> {
    if is_minimized {
        all_rows.iter().take(VISIBLE_ROW_BUDGET).cloned().collect()
    } else {
        all_rows.to_vec()
    }
}

/// Rendered table height, a pure function of the visible row count.
pub fn table_height(visible_count: usize) -> f64 {
    HEADER_HEIGHT + visible_count as f64 * ROW_HEIGHT
}

impl TableNode {
    /// Re-derive `visible_rows` and `height` from `all_rows` and this
    /// table's own minimized flag.
    pub fn reproject(&mut self) {
        self.visible_rows = project(&self.all_rows, self.is_minimized);
        self.height = table_height(self.visible_rows.len());
    }

    /// Flip minimized/maximized and re-project atomically.
    pub fn toggle(&mut self) {
        self.is_minimized = !self.is_minimized;
        self.reproject();
    }
}

/// Per-table collapse flags, computed on demand for UI controls. Never the
/// projector's input.
pub fn collapse_states(snapshot: &GraphSnapshot) -> BTreeMap<String, bool> {
    snapshot
        .tables
        .iter()
        .map(|t| (t.id.clone(), t.is_minimized))
        .collect()
}
