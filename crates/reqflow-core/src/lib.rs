pub mod builder;
pub mod feature;
pub mod fields;
pub mod ids;
pub mod mutate;
pub mod project;
pub mod sync;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;

// --- Constants ---

/// Rows shown while a table is minimized.
pub const VISIBLE_ROW_BUDGET: usize = 3;
pub const HEADER_HEIGHT: f64 = 52.0;
pub const ROW_HEIGHT: f64 = 36.0;
/// Shared connection point for edges whose source row is hidden while the
/// table is collapsed. The renderer keeps exactly one of these per table.
pub const HIDDEN_ROWS_HANDLE: &str = "hidden-rows";

// --- Types (matching the canvas frontend contract) ---

/// One level of the requirement hierarchy. Exactly four levels exist;
/// deeper or shallower trees are not supported.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Level {
    Flow,
    HighLevel,
    LowLevel,
    TestCase,
}

impl Level {
    /// Short role prefix used in table ids.
    pub fn role(self) -> &'static str {
        match self {
            Level::Flow => "flow",
            Level::HighLevel => "hlr",
            Level::LowLevel => "llr",
            Level::TestCase => "test",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Level::Flow => "User Flows",
            Level::HighLevel => "High-Level Requirements",
            Level::LowLevel => "Low-Level Requirements",
            Level::TestCase => "Test Cases",
        }
    }

    pub fn next(self) -> Option<Level> {
        match self {
            Level::Flow => Some(Level::HighLevel),
            Level::HighLevel => Some(Level::LowLevel),
            Level::LowLevel => Some(Level::TestCase),
            Level::TestCase => None,
        }
    }

    /// Suffix a child-collection key must end with to count as this level's
    /// relation ("flows", "high_level_requirements", "testCases", ...).
    pub fn relation_suffix(self) -> &'static str {
        match self {
            Level::Flow => "flows",
            Level::HighLevel | Level::LowLevel => "requirements",
            Level::TestCase => "cases",
        }
    }

    /// Disambiguates the two "...requirements" relations when an item
    /// carries both.
    pub fn relation_marker(self) -> Option<&'static str> {
        match self {
            Level::HighLevel => Some("high"),
            Level::LowLevel => Some("low"),
            Level::Flow | Level::TestCase => None,
        }
    }

    /// Relation key written when generated children are merged into a tree
    /// that has no existing collection for this level.
    pub fn default_relation(self) -> &'static str {
        match self {
            Level::Flow => "flows",
            Level::HighLevel => "high_level_requirements",
            Level::LowLevel => "low_level_requirements",
            Level::TestCase => "test_cases",
        }
    }
}

/// One backend record of the requirement hierarchy, projected leniently from
/// whatever shape the backend sent. Read-only to the engine apart from
/// echoing edits back out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Backend-assigned stable id. Empty when the backend has not assigned
    /// one yet (freshly generated children).
    #[serde(default)]
    pub uiid: String,
    #[serde(default)]
    pub parent_uiid: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sequence_number: u32,
    /// Child collections keyed by relation name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, Vec<Item>>,
    /// The raw backend record, kept for echoing edits and build requests.
    #[serde(skip)]
    pub raw: serde_json::Value,
}

/// One row of a table, derived from an `Item`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RowRecord {
    /// The item's uiid, or a synthesized placeholder when the backend has
    /// not assigned one.
    pub id: String,
    /// Contiguous 1..=N within the table, re-normalized after every
    /// insert/delete.
    pub sequence_number: u32,
    pub display_name: String,
    pub description: String,
    /// Cells belonging to user-added columns, keyed by column key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
    #[serde(skip)]
    pub source: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    /// Stable key, unique within the table.
    pub key: String,
    pub label: String,
    pub order: u32,
    pub editable: bool,
}

impl ColumnDef {
    /// The structural columns every table starts with.
    pub fn structural() -> Vec<ColumnDef> {
        vec![
            ColumnDef { key: "sequence".into(), label: "#".into(), order: 0, editable: false },
            ColumnDef { key: "name".into(), label: "Name".into(), order: 1, editable: true },
            ColumnDef { key: "description".into(), label: "Description".into(), order: 2, editable: true },
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// One rendered table holding all children of a single parent item.
/// Owns both row projections; only the mutation engine and the visibility
/// projector may write them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableNode {
    /// `role_anchorUiid`, where the anchor is the parent item owning the rows.
    pub id: String,
    pub level: Level,
    pub title: String,
    pub columns: Vec<ColumnDef>,
    /// Prefix of `all_rows` of length min(N, budget) when minimized,
    /// `all_rows` verbatim when maximized.
    pub visible_rows: Vec<RowRecord>,
    pub all_rows: Vec<RowRecord>,
    pub is_minimized: bool,
    /// Ids of rows that originate at least one outgoing edge.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub connected_row_ids: BTreeSet<String>,
    #[serde(default)]
    pub position: Position,
    pub height: f64,
}

impl TableNode {
    pub fn row_mut(&mut self, row_id: &str) -> Option<&mut RowRecord> {
        self.all_rows.iter_mut().find(|r| r.id == row_id)
    }
}

/// A directed edge from one source row to a child table. Both endpoint
/// tables must exist in the current build; violations are dropped before
/// the renderer sees them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source_table_id: String,
    pub source_row_id: String,
    /// The source row's own handle, or `HIDDEN_ROWS_HANDLE` when the row
    /// sits past the visible-row budget.
    pub source_handle: String,
    pub target_table_id: String,
    /// Visual edge kind consumed by the renderer.
    pub kind: String,
}

/// Renderer-ready output of one build cycle. Discarded and fully rebuilt on
/// every data refresh; individual tables mutate in place between refreshes.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    pub tables: Vec<TableNode>,
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    pub fn table(&self, table_id: &str) -> Option<&TableNode> {
        self.tables.iter().find(|t| t.id == table_id)
    }

    pub fn table_mut(&mut self, table_id: &str) -> Option<&mut TableNode> {
        self.tables.iter_mut().find(|t| t.id == table_id)
    }
}

// --- AI Settings ---

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    pub provider: String,
    pub api_key: String,
    pub model: String,
}

/// Resolve the global config directory (~/.reqflow/).
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".reqflow")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn read_settings() -> AiSettings {
    let path = settings_path();
    if !path.exists() {
        return AiSettings::default();
    }
    fs::read_to_string(&path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn write_settings(settings: &AiSettings) -> Result<(), String> {
    let dir = config_dir();
    fs::create_dir_all(&dir).map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(settings).map_err(|e| e.to_string())?;
    fs::write(settings_path(), json).map_err(|e| e.to_string())
}

pub fn ai_configured(settings: &AiSettings) -> bool {
    !settings.provider.is_empty()
        && !settings.model.is_empty()
        && (settings.provider == "ollama" || !settings.api_key.is_empty())
}
