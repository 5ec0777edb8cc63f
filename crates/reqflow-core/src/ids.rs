//! Identifier derivation for tables, rows, and edges.
//!
//! Every id is a pure function of its inputs — no shared counters — so a
//! rebuild from unchanged data produces the same ids and the renderer's
//! edges keep resolving across show/hide cycles. The one exception is the
//! placeholder row id, which mixes in a clock reading and a sequence because
//! rows without a backend uiid still need to be globally unique.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::Level;

static SYNTH_SEQ: AtomicU64 = AtomicU64::new(0);

/// `role_anchorUiid`. The anchor is the uiid of the parent item that owns
/// this table's rows, so unrelated parents never share a table.
pub fn table_id(level: Level, anchor_uiid: &str) -> String {
    format!("{}_{}", level.role(), anchor_uiid)
}

/// The item's own uiid when the backend assigned one, else a synthesized
/// placeholder.
pub fn row_id(uiid: &str, table_id: &str, index: usize) -> String {
    if uiid.is_empty() {
        synthesized_row_id(table_id, index)
    } else {
        uiid.to_string()
    }
}

/// Placeholder id embedding the table, the row position, a nanosecond
/// timestamp, and a process-wide sequence — the sequence keeps two reads
/// within one clock tick apart on coarse-clock platforms. Stable for the
/// lifetime of the row in memory; replaced by the backend uiid on the next
/// full refresh.
pub fn synthesized_row_id(table_id: &str, index: usize) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seq = SYNTH_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{table_id}-r{index}-{nanos}-{seq}")
}

/// Deterministic edge id. Two edges collide only when source table, source
/// row index, and target table are all identical — which is exactly the
/// de-duplication we want.
pub fn edge_id(source_table: &str, source_index: usize, target_table: &str) -> String {
    format!("{source_table}-{source_index}-{target_table}")
}
