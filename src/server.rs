//! HTTP surface: `GET /health`, `POST /search`, `POST /reindex`.
//!
//! Routing, CORS and the error-response plumbing follow the rest of this
//! codebase's Axum services; the JSON contract itself (flat
//! `{errorCode, message}` error bodies, the exact field names below) is
//! fixed by the adapter this crate exposes to its caller and must not drift.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

use crate::background::BackgroundWorker;
use crate::config::Config;
use crate::models::{RefreshMode, RefreshStatus, RefreshSummary, SearchResultItem};
use crate::query::{parse_limit, parse_query};
use crate::refresh::IndexHandle;
use crate::search::search_documents;

#[derive(Clone)]
struct AppState {
    index: IndexHandle,
    background: Option<Arc<BackgroundWorker>>,
}

/// Builds the router. Split out from [`run_server`] so tests can drive it
/// in-process with `tower::ServiceExt::oneshot` instead of binding a socket.
///
/// `background` is `None` when no background worker is running (the common
/// test case, and any deployment with `backgroundSyncSeconds == 0`); when
/// present, `/health` reports its live `is_alive()` state rather than just
/// echoing the configured interval.
pub fn build_router(index: IndexHandle, background: Option<Arc<BackgroundWorker>>) -> Router {
    let state = AppState { index, background };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/search", post(handle_search))
        .route("/reindex", post(handle_reindex))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server and runs until the process is terminated.
pub async fn run_server(
    config: &Config,
    index: IndexHandle,
    background: Option<Arc<BackgroundWorker>>,
) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr.clone();
    let app = build_router(index, background);

    tracing::info!(bind_addr = %bind_addr, "officeindex adapter listening");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error_code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    error_code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error_code: self.error_code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

fn invalid_query(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        error_code: "INVALID_QUERY".to_string(),
        message: message.into(),
    }
}

fn invalid_mode(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        error_code: "INVALID_MODE".to_string(),
        message: message.into(),
    }
}

fn workspace_root_not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        error_code: "WORKSPACE_ROOT_NOT_FOUND".to_string(),
        message: message.into(),
    }
}

#[allow(dead_code)]
fn reindex_failed(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        error_code: "REINDEX_FAILED".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    indexed_files: usize,
    last_indexed_at: Option<i64>,
    refresh_interval_seconds: u64,
    background_sync_seconds: u64,
    background_sync_active: bool,
    last_refresh_mode: RefreshMode,
    last_refresh_summary: Option<RefreshSummary>,
    last_refresh_error: Option<String>,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.index.health_snapshot().await;
    let config = state.index.config();
    let background_sync_active = state
        .background
        .as_ref()
        .map(|worker| worker.is_alive())
        .unwrap_or(false);
    Json(HealthResponse {
        status: "ok",
        service: "officeindex-adapter",
        indexed_files: snapshot.indexed_files,
        last_indexed_at: snapshot.last_indexed_at_ms,
        refresh_interval_seconds: config.refresh_interval_seconds,
        background_sync_seconds: config.background_sync_seconds,
        background_sync_active,
        last_refresh_mode: snapshot.last_refresh_mode,
        last_refresh_summary: snapshot.last_refresh_summary,
        last_refresh_error: snapshot.last_refresh_error,
    })
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    limit: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    query: String,
    total: usize,
    took_ms: u64,
    results: Vec<SearchResultItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    degraded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<Vec<String>>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let started_at = Instant::now();
    let query = parse_query(&req.query).map_err(invalid_query)?;
    let limit = parse_limit(req.limit);

    let mut degraded = false;
    let mut diagnostics: Vec<String> = Vec::new();

    match state.index.refresh(RefreshMode::Incremental, false).await {
        Ok(summary) => {
            if summary.failed_files > 0 {
                degraded = true;
                diagnostics.extend(summary.diagnostics);
            }
        }
        Err(err) => {
            degraded = true;
            tracing::warn!(error = %err, "officeindex refresh skipped due to missing workspace root");
            diagnostics.push(format!("refresh-failed:{err}"));
        }
    }

    let snapshot = state.index.snapshot().await;
    let results = search_documents(&snapshot, &query, limit);

    Ok(Json(SearchResponse {
        query,
        total: results.len(),
        took_ms: started_at.elapsed().as_millis() as u64,
        results,
        degraded: degraded.then_some(true),
        diagnostics: (!diagnostics.is_empty()).then_some(diagnostics),
    }))
}

// ============ POST /reindex ============

#[derive(Deserialize, Default)]
struct ReindexRequest {
    mode: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReindexResponse {
    status: &'static str,
    mode: RefreshMode,
    indexed_files: usize,
    scanned_files: usize,
    reused_files: usize,
    updated_files: usize,
    removed_files: usize,
    failed_files: usize,
    diagnostics: Vec<String>,
    took_ms: u64,
}

async fn handle_reindex(
    State(state): State<AppState>,
    body: Option<Json<ReindexRequest>>,
) -> Result<Json<ReindexResponse>, AppError> {
    let requested_mode = body.and_then(|Json(req)| req.mode);
    let mode = RefreshMode::parse(requested_mode.as_deref(), RefreshMode::Full).map_err(invalid_mode)?;

    let summary = state
        .index
        .refresh(mode, true)
        .await
        .map_err(|err| match err {
            crate::refresh::RefreshError::WorkspaceRootNotFound(_) => workspace_root_not_found(err.to_string()),
        })?;

    let status = if summary.status == RefreshStatus::Degraded {
        "degraded"
    } else {
        "ok"
    };

    Ok(Json(ReindexResponse {
        status,
        mode,
        indexed_files: summary.indexed_files,
        scanned_files: summary.scanned_files,
        reused_files: summary.reused_files,
        updated_files: summary.updated_files,
        removed_files: summary.removed_files,
        failed_files: summary.failed_files,
        diagnostics: summary.diagnostics,
        took_ms: summary.took_ms,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use http_body_util::BodyExt;
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn test_config(root: PathBuf) -> Config {
        Config {
            workspace_root: root,
            refresh_interval_seconds: 0,
            background_sync_seconds: 0,
            extract_timeout_seconds: 8,
            include_pdf_files: false,
            opensearch_base_url: None,
            opensearch_pipeline: "attachment".to_string(),
            opensearch_username: None,
            opensearch_password: None,
            bind_addr: "127.0.0.1:0".to_string(),
        }
    }

    #[tokio::test]
    async fn search_rejects_short_query() {
        let workspace = tempfile::TempDir::new().unwrap();
        let index = IndexHandle::new(test_config(workspace.path().to_path_buf()));
        let app = build_router(index, None);

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/search")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"query":"a"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["errorCode"], "INVALID_QUERY");
    }

    #[tokio::test]
    async fn search_finds_docx_fixture_by_filename() {
        let workspace = tempfile::TempDir::new().unwrap();
        std::fs::write(workspace.path().join("quarterly.docx"), b"not a real docx").unwrap();
        let index = IndexHandle::new(test_config(workspace.path().to_path_buf()));
        let app = build_router(index, None);

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/search")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"query":"quarterly"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["total"], 1);
    }

    #[tokio::test]
    async fn reindex_reports_workspace_root_not_found() {
        let index = IndexHandle::new(test_config(PathBuf::from("/nonexistent/workspace/root")));
        let app = build_router(index, None);

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/reindex")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["errorCode"], "WORKSPACE_ROOT_NOT_FOUND");
    }

    #[tokio::test]
    async fn health_reports_live_background_worker() {
        let workspace = tempfile::TempDir::new().unwrap();
        let index = IndexHandle::new(test_config(workspace.path().to_path_buf()));
        let worker = Arc::new(BackgroundWorker::spawn(index.clone(), 3600).unwrap());
        let app = build_router(index, Some(worker.clone()));

        let request = axum::http::Request::builder()
            .method("GET")
            .uri("/health")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["backgroundSyncActive"], true);

        worker.stop();
    }

    #[tokio::test]
    async fn reindex_rejects_invalid_mode() {
        let workspace = tempfile::TempDir::new().unwrap();
        let index = IndexHandle::new(test_config(workspace.path().to_path_buf()));
        let app = build_router(index, None);

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/reindex")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"mode":"bogus"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
