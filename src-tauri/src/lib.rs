use std::sync::{Arc, Mutex};

use reqflow_core::sync::{synchronize, RendererState};
use reqflow_core::{builder, feature, mutate};
use reqflow_gen::RowContext;

/// Everything the canvas works on: the raw backend tree, the project it
/// belongs to, and what the renderer currently shows. One lock, one writer
/// at a time — the engine itself is single-threaded by design.
#[derive(Default)]
struct Canvas {
    tree: serde_json::Value,
    project_uiid: String,
    renderer: RendererState,
}

struct CanvasState(Arc<Mutex<Canvas>>);

/// Managed state wrapping the AI settings.
struct SettingsState(Arc<Mutex<reqflow_core::AiSettings>>);

fn renderer_json(canvas: &Canvas) -> Result<String, String> {
    serde_json::to_string(&canvas.renderer).map_err(|e| e.to_string())
}

/// Rebuild from the stored tree and reconcile against what the renderer
/// already shows (dragged positions carry over, collapse state resets).
fn rebuild(canvas: &mut Canvas) {
    let snapshot = builder::build(&canvas.tree, &canvas.project_uiid);
    canvas.renderer = synchronize(snapshot, &canvas.renderer);
}

#[tauri::command]
async fn load_project(
    base_url: String,
    project_id: String,
    state: tauri::State<'_, CanvasState>,
) -> Result<String, String> {
    let url = format!(
        "{}/api/projects/{}/tree",
        base_url.trim_end_matches('/'),
        project_id
    );
    let tree: serde_json::Value = reqwest::get(&url)
        .await
        .map_err(|e| format!("fetch tree: {e}"))?
        .error_for_status()
        .map_err(|e| format!("fetch tree: {e}"))?
        .json()
        .await
        .map_err(|e| format!("decode tree: {e}"))?;

    let project_uiid = tree
        .get("uiid")
        .and_then(serde_json::Value::as_str)
        .unwrap_or(project_id.as_str())
        .to_string();

    // Lock only after the await: a stale response that loses the race
    // simply overwrites (last-write-wins).
    let mut canvas = state.0.lock().unwrap();
    canvas.tree = tree;
    canvas.project_uiid = project_uiid;
    rebuild(&mut canvas);
    renderer_json(&canvas)
}

#[tauri::command]
fn rebuild_graph(state: tauri::State<'_, CanvasState>) -> Result<String, String> {
    let mut canvas = state.0.lock().unwrap();
    rebuild(&mut canvas);
    renderer_json(&canvas)
}

#[tauri::command]
fn toggle_table(table_id: String, state: tauri::State<'_, CanvasState>) -> Result<String, String> {
    let mut canvas = state.0.lock().unwrap();
    if let Some(table) = canvas.renderer.tables.iter_mut().find(|t| t.id == table_id) {
        table.toggle();
    }
    renderer_json(&canvas)
}

#[tauri::command]
fn edit_cell(
    table_id: String,
    row_id: String,
    column_key: String,
    value: String,
    state: tauri::State<'_, CanvasState>,
) -> Result<String, String> {
    let mut canvas = state.0.lock().unwrap();
    if let Some(table) = canvas.renderer.tables.iter_mut().find(|t| t.id == table_id) {
        mutate::edit_cell(table, &row_id, &column_key, &value);
    }
    renderer_json(&canvas)
}

#[tauri::command]
fn add_row(
    table_id: String,
    after_row_id: Option<String>,
    state: tauri::State<'_, CanvasState>,
) -> Result<String, String> {
    let mut canvas = state.0.lock().unwrap();
    if let Some(table) = canvas.renderer.tables.iter_mut().find(|t| t.id == table_id) {
        let _ = mutate::add_row(table, after_row_id.as_deref());
    }
    renderer_json(&canvas)
}

#[tauri::command]
fn delete_row(
    table_id: String,
    row_id: String,
    state: tauri::State<'_, CanvasState>,
) -> Result<String, String> {
    let mut canvas = state.0.lock().unwrap();
    if let Some(table) = canvas.renderer.tables.iter_mut().find(|t| t.id == table_id) {
        mutate::delete_row(table, &row_id);
    }
    renderer_json(&canvas)
}

#[tauri::command]
fn add_column(
    table_id: String,
    label: String,
    state: tauri::State<'_, CanvasState>,
) -> Result<String, String> {
    let mut canvas = state.0.lock().unwrap();
    if let Some(table) = canvas.renderer.tables.iter_mut().find(|t| t.id == table_id) {
        mutate::add_column(table, &label);
    }
    renderer_json(&canvas)
}

#[tauri::command]
fn delete_column(
    table_id: String,
    column_key: String,
    state: tauri::State<'_, CanvasState>,
) -> Result<String, String> {
    let mut canvas = state.0.lock().unwrap();
    if let Some(table) = canvas.renderer.tables.iter_mut().find(|t| t.id == table_id) {
        mutate::delete_column(table, &column_key);
    }
    renderer_json(&canvas)
}

#[tauri::command]
fn rename_column(
    table_id: String,
    column_key: String,
    label: String,
    state: tauri::State<'_, CanvasState>,
) -> Result<String, String> {
    let mut canvas = state.0.lock().unwrap();
    if let Some(table) = canvas.renderer.tables.iter_mut().find(|t| t.id == table_id) {
        mutate::rename_column(table, &column_key, &label);
    }
    renderer_json(&canvas)
}

#[tauri::command]
async fn generate_children(
    table_id: String,
    row_id: String,
    state: tauri::State<'_, CanvasState>,
    settings: tauri::State<'_, SettingsState>,
) -> Result<String, String> {
    let settings = settings.0.lock().unwrap().clone();
    if !reqflow_core::ai_configured(&settings) {
        return Err("AI provider is not configured".to_string());
    }

    // Snapshot the row context, then release the lock for the LLM call.
    // A second request over the same row before this one resolves is not
    // deduplicated; the later merge wins.
    let ctx = {
        let canvas = state.0.lock().unwrap();
        let table = canvas
            .renderer
            .tables
            .iter()
            .find(|t| t.id == table_id)
            .ok_or_else(|| format!("unknown table: {table_id}"))?;
        let (index, row) = table
            .all_rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.id == row_id)
            .ok_or_else(|| format!("unknown row: {row_id}"))?;
        RowContext {
            project_uiid: canvas.project_uiid.clone(),
            row_uiid: row.id.clone(),
            name: row.display_name.clone(),
            description: row.description.clone(),
            table_title: table.title.clone(),
            row_index: index,
            level: table.level,
        }
    };

    let Some(child_level) = ctx.level.next() else {
        return Err("test cases cannot be decomposed further".to_string());
    };

    let generated = reqflow_gen::generate_children(&ctx, &settings).await;

    let mut canvas = state.0.lock().unwrap();
    if !generated.is_empty() {
        let children: Vec<(String, String)> = generated
            .into_iter()
            .map(|g| (g.name, g.description))
            .collect();
        if builder::append_generated_children(&mut canvas.tree, &ctx.row_uiid, child_level, &children)
        {
            rebuild(&mut canvas);
        } else {
            eprintln!(
                "[reqflow] row {} has no backend uiid yet; generated children discarded",
                ctx.row_uiid
            );
        }
    }
    renderer_json(&canvas)
}

#[tauri::command]
fn prepare_build_request(
    llr_uiid: String,
    state: tauri::State<'_, CanvasState>,
) -> Result<String, String> {
    let canvas = state.0.lock().unwrap();
    let request = feature::assemble_build_request(&canvas.tree, &canvas.project_uiid, &llr_uiid)
        .ok_or_else(|| format!("low-level requirement not found: {llr_uiid}"))?;
    serde_json::to_string(&request).map_err(|e| e.to_string())
}

#[tauri::command]
fn collapse_states(state: tauri::State<'_, CanvasState>) -> Result<String, String> {
    let canvas = state.0.lock().unwrap();
    let snapshot = reqflow_core::GraphSnapshot {
        tables: canvas.renderer.tables.clone(),
        edges: canvas.renderer.edges.clone(),
    };
    serde_json::to_string(&reqflow_core::project::collapse_states(&snapshot))
        .map_err(|e| e.to_string())
}

#[tauri::command]
fn get_ai_settings(state: tauri::State<'_, SettingsState>) -> Result<serde_json::Value, String> {
    let settings = state.0.lock().unwrap().clone();
    let configured = reqflow_core::ai_configured(&settings);
    // Mask API key — only send whether it's set
    Ok(serde_json::json!({
        "provider": settings.provider,
        "model": settings.model,
        "hasKey": !settings.api_key.is_empty(),
        "configured": configured,
    }))
}

#[tauri::command]
fn save_ai_settings(
    provider: String,
    api_key: String,
    model: String,
    state: tauri::State<'_, SettingsState>,
) -> Result<(), String> {
    let mut settings = state.0.lock().unwrap();
    settings.provider = provider;
    settings.model = model;
    // Empty key means "keep existing"
    if !api_key.is_empty() {
        settings.api_key = api_key;
    }
    reqflow_core::write_settings(&settings)
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let settings = reqflow_core::read_settings();

    tauri::Builder::default()
        .manage(CanvasState(Arc::new(Mutex::new(Canvas::default()))))
        .manage(SettingsState(Arc::new(Mutex::new(settings))))
        .invoke_handler(tauri::generate_handler![
            load_project,
            rebuild_graph,
            toggle_table,
            edit_cell,
            add_row,
            delete_row,
            add_column,
            delete_column,
            rename_column,
            generate_children,
            prepare_build_request,
            collapse_states,
            get_ai_settings,
            save_ai_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
