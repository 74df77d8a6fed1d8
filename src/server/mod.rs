// SPDX-License-Identifier: MIT

//! HTTP API over the gate and the player's progress

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::checklist::{self, ChecklistDocument, ProgressStore};
use crate::condition::{Gate, Values};
use crate::config::AppConfig;
use crate::error::GateError;

/// Shared state behind every route
///
/// One `Gate` serves all requests so compiled conditions are reused.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<Gate>,
    pub document: Arc<ChecklistDocument>,
    pub progress: Arc<RwLock<ProgressStore>>,
    pub title: String,
    pub progress_key: String,
}

impl AppState {
    pub fn new(config: &AppConfig, document: ChecklistDocument, progress: ProgressStore) -> Self {
        Self {
            gate: Arc::new(Gate::from_config(&config.gate)),
            document: Arc::new(document),
            progress: Arc::new(RwLock::new(progress)),
            title: config.title.clone(),
            progress_key: config.progress_key.clone(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/evaluate", post(evaluate))
        .route("/api/checklist", get(checklist_status))
        .route("/api/progress/items", put(set_item))
        .route("/api/progress/progression", put(set_progression))
        .route("/api/progress/export", get(export_progress))
        .route("/api/progress/import", post(import_progress))
        .route("/api/export/markdown", get(export_markdown))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, host: &str, port: u16) -> Result<(), GateError> {
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| GateError::config(format!("invalid listen address {}:{}: {}", host, port, e)))?;
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct EvaluateRequest {
    #[serde(default)]
    condition: Option<Value>,
    #[serde(default)]
    values: Option<Value>,
}

async fn evaluate(State(state): State<AppState>, Json(payload): Json<EvaluateRequest>) -> Response {
    let values = match payload.values {
        Some(raw) => match Values::from_json(&raw) {
            Some(values) => values,
            None => return error_response(StatusCode::BAD_REQUEST, "values must be an object"),
        },
        None => state.progress.read().await.values(),
    };

    let unlocked = state
        .gate
        .is_unlocked_json(payload.condition.as_ref(), &values);
    Json(json!({ "unlocked": unlocked })).into_response()
}

async fn checklist_status(State(state): State<AppState>) -> Json<Value> {
    let progress = state.progress.read().await;
    let items = state.document.statuses(&progress, &state.gate);
    let completed = items.iter().filter(|s| s.completed).count();
    let sections = state.document.outline(&progress, &state.gate);
    Json(json!({
        "title": state.title,
        "total": items.len(),
        "completed": completed,
        "values": progress.values(),
        "sections": sections,
        "items": items,
    }))
}

#[derive(Debug, Deserialize)]
struct ItemUpdate {
    key: String,
    completed: bool,
}

async fn set_item(State(state): State<AppState>, Json(update): Json<ItemUpdate>) -> Response {
    let mut progress = state.progress.write().await;
    let changed = progress.set_completed(&update.key, update.completed);
    if changed {
        if let Err(e) = progress.save() {
            log::error!("Failed to save progress: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    }
    Json(json!({
        "key": update.key,
        "completed": update.completed,
        "changed": changed,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressionUpdate {
    #[serde(default)]
    game_mode: Option<i64>,
    #[serde(default)]
    region: Option<i64>,
}

async fn set_progression(
    State(state): State<AppState>,
    Json(update): Json<ProgressionUpdate>,
) -> Response {
    let mut progress = state.progress.write().await;
    if let Some(game_mode) = update.game_mode {
        progress.set_game_mode(game_mode);
    }
    if let Some(region) = update.region {
        progress.set_last_region(region);
    }
    if let Err(e) = progress.save() {
        log::error!("Failed to save progress: {}", e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }
    Json(json!({ "values": progress.values() })).into_response()
}

async fn export_progress(State(state): State<AppState>) -> Response {
    let progress = state.progress.read().await;
    match checklist::export_json(&progress, &state.progress_key) {
        Ok(Some(body)) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn import_progress(State(state): State<AppState>, body: String) -> Response {
    let mut progress = state.progress.write().await;
    let imported = match checklist::import_into(&mut progress, &body, &state.progress_key) {
        Ok(count) => count,
        Err(e) => {
            log::warn!("Rejected progress import: {}", e);
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };
    if let Err(e) = progress.save() {
        log::error!("Failed to save progress: {}", e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }
    Json(json!({ "imported": imported })).into_response()
}

async fn export_markdown(State(state): State<AppState>) -> Response {
    let progress = state.progress.read().await;
    match checklist::generate_markdown(&state.title, &state.document, &progress) {
        Some(markdown) => ([(header::CONTENT_TYPE, "text/markdown")], markdown).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    fn state() -> AppState {
        let document = ChecklistDocument::from_json(json!({
            "cans": {
                "title": "Cans",
                "list": ["Red", { "name": "Blue", "$condition": { "region": ">= 1" } }]
            },
            "codes": {
                "title": "Codes",
                "$condition": "gameMode >= 1",
                "list": [{ "code": "7A-22" }]
            }
        }))
        .unwrap();
        AppState::new(
            &AppConfig::default(),
            document,
            ProgressStore::in_memory("test"),
        )
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let Json(body) = health_check().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_evaluate_with_values() {
        let payload = EvaluateRequest {
            condition: Some(json!("gameMode == 1")),
            values: Some(json!({ "gameMode": 1 })),
        };
        let response = evaluate(State(state()), Json(payload)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["unlocked"], true);
    }

    #[tokio::test]
    async fn test_evaluate_falls_back_to_progress() {
        let payload = EvaluateRequest {
            condition: Some(json!({ "region": ">= 1" })),
            values: None,
        };
        let response = evaluate(State(state()), Json(payload)).await;
        assert_eq!(body_json(response).await["unlocked"], false);
    }

    #[tokio::test]
    async fn test_evaluate_rejects_non_object_values() {
        let payload = EvaluateRequest {
            condition: None,
            values: Some(json!([1])),
        };
        let response = evaluate(State(state()), Json(payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_progression_unlocks_items() {
        let state = state();
        let Json(before) = checklist_status(State(state.clone())).await;
        assert_eq!(before["items"][1]["locked"], true);

        let update = ProgressionUpdate {
            game_mode: None,
            region: Some(1),
        };
        let response = set_progression(State(state.clone()), Json(update)).await;
        assert_eq!(body_json(response).await["values"]["region"], 1);

        let Json(after) = checklist_status(State(state)).await;
        assert_eq!(after["items"][1]["locked"], false);
    }

    #[tokio::test]
    async fn test_status_lists_sections_and_codes() {
        let state = state();
        let Json(body) = checklist_status(State(state.clone())).await;
        assert_eq!(
            body["sections"],
            json!([
                { "key": "cans", "title": "Cans", "locked": false },
                { "key": "codes", "title": "Codes", "locked": true }
            ])
        );
        assert_eq!(body["items"][2]["key"], "codes/7a-22");
        assert_eq!(body["items"][2]["code"], true);
        assert_eq!(body["items"][0]["code"], false);

        let update = ProgressionUpdate {
            game_mode: Some(1),
            region: None,
        };
        let response = set_progression(State(state.clone()), Json(update)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let Json(body) = checklist_status(State(state)).await;
        assert_eq!(body["sections"][1]["locked"], false);
        assert_eq!(body["items"][2]["locked"], false);
    }

    #[tokio::test]
    async fn test_mark_export_import() {
        let state = state();
        let update = ItemUpdate {
            key: "cans/red".to_string(),
            completed: true,
        };
        let response = set_item(State(state.clone()), Json(update)).await;
        assert_eq!(body_json(response).await["changed"], true);

        let response = export_progress(State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let exported = body_json(response).await;
        assert_eq!(exported["completed"], json!(["cans/red"]));

        let bad = json!({ "key": "other", "completed": [] }).to_string();
        let response = import_progress(State(state.clone()), bad).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let good = json!({ "key": state.progress_key, "completed": ["cans/blue"] }).to_string();
        let response = import_progress(State(state.clone()), good).await;
        assert_eq!(body_json(response).await["imported"], 1);
        assert!(state.progress.read().await.is_completed("cans/blue"));
    }

    #[tokio::test]
    async fn test_export_without_progress() {
        let response = export_progress(State(state())).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
