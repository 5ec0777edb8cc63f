pub mod engine;
mod parse;
mod prompt;

use serde::{Deserialize, Serialize};

use reqflow_core::Level;

/// Text summary of the row the user asked to decompose, plus the anchor
/// project. This is everything the AI service sees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowContext {
    pub project_uiid: String,
    pub row_uiid: String,
    pub name: String,
    pub description: String,
    pub table_title: String,
    pub row_index: usize,
    /// Level of the row itself; generated children live one level below.
    pub level: Level,
}

/// One AI-generated child requirement. No uiid yet — the backend assigns one
/// when the tree is saved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedItem {
    pub name: String,
    pub description: String,
}

/// Ask the configured LLM for child requirements of one row. Returns an
/// empty vec on any failure (graceful degradation) and when the row sits at
/// the bottom of the hierarchy.
pub async fn generate_children(
    ctx: &RowContext,
    settings: &reqflow_core::AiSettings,
) -> Vec<GeneratedItem> {
    let Some(child_level) = ctx.level.next() else {
        return vec![];
    };

    let system = prompt::system_prompt(child_level);
    let user_msg = prompt::user_message(ctx, child_level);

    eprintln!(
        "[reqflow-gen] decomposing '{}' into {} via {} ({})",
        ctx.name,
        child_level.title(),
        settings.provider,
        settings.model
    );

    match engine::generate(settings, &system, &user_msg).await {
        Ok(raw) => {
            let items = parse::parse_generated(&raw);
            eprintln!("[reqflow-gen] parsed {} generated item(s)", items.len());
            items
        }
        Err(e) => {
            eprintln!("[reqflow-gen] generate error: {}", e);
            vec![]
        }
    }
}
