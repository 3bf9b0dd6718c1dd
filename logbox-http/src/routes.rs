use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use logbox_core::{FileContent, FileTreeNode, LogRecord, RemoteLogSummary};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/logs", get(list_logs))
        .route("/api/remote-logs", get(search_remote))
        .route("/api/download", post(download))
        .route("/api/logs/{id}", get(get_log).delete(delete_log))
        .route("/api/logs/{id}/files", get(list_files))
        .route("/api/logs/{id}/file", get(read_file))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_logs(State(st): State<Arc<AppState>>) -> ApiResult<Vec<LogRecord>> {
    Ok(Json(st.service.records().await?))
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    keyword: String,
}

async fn search_remote(
    State(st): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<RemoteLogSummary>> {
    Ok(Json(st.service.search(&params.keyword).await?))
}

#[derive(Serialize)]
struct DownloadResponse {
    status: &'static str,
    log_id: String,
}

async fn download(State(st): State<Arc<AppState>>, body: Bytes) -> ApiResult<DownloadResponse> {
    let log_id = requested_log_id(&body)?;
    let guard = st.lock_id(&log_id).await;
    let rec = st.service.acquire_holding(&log_id, guard).await?;
    info!(log_id = %rec.id, bytes = rec.archive_size, "log acquired");
    Ok(Json(DownloadResponse {
        status: "success",
        log_id: rec.id,
    }))
}

/// Pull `log_id` out of a download request. Numbers are accepted and
/// stringified.
fn requested_log_id(body: &[u8]) -> Result<String, ApiError> {
    let missing = || ApiError::bad_request("Log ID is required");
    let req: Value = serde_json::from_slice(body).map_err(|_| missing())?;
    match req.get("log_id") {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(missing()),
    }
}

async fn get_log(State(st): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<LogRecord> {
    Ok(Json(st.service.record(&id).await?))
}

async fn list_files(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Vec<FileTreeNode>> {
    Ok(Json(st.service.tree(&id).await?))
}

#[derive(Deserialize)]
struct FileParams {
    path: Option<String>,
}

async fn read_file(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<FileParams>,
) -> ApiResult<FileContent> {
    let rel = params
        .path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_request("File path is required"))?;
    Ok(Json(st.service.read_file(&id, &rel).await?))
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

async fn delete_log(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusResponse> {
    let guard = st.lock_id(&id).await;
    st.service.delete_holding(&id, guard).await?;
    info!(log_id = %id, "log deleted");
    Ok(Json(StatusResponse { status: "success" }))
}
