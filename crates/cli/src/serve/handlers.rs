//! Route handlers. Each one resolves path/query/body, calls the engine, and
//! lets [`ApiError`] map failures.

use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use prestasi_core::{AchievementDraft, AchievementStatus, Caller, PageRequest};
use prestasi_workflow::Upload;
use serde::Deserialize;
use uuid::Uuid;

use super::error::ApiError;
use super::extract::{ApiJson, ApiQuery};
use super::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    ApiError::not_found("not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

/// Pagination and status filter. Unparseable numbers fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    page: Option<String>,
    per_page: Option<String>,
    status: Option<String>,
}

impl ListQuery {
    fn page_request(&self) -> PageRequest {
        let num = |v: &Option<String>| -> Option<i64> {
            v.as_deref().and_then(|s| s.trim().parse().ok())
        };
        PageRequest::new(num(&self.page), num(&self.per_page))
    }

    fn status(&self) -> ApiResult<Option<AchievementStatus>> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| ApiError::bad_request(format!("unknown status '{raw}'"))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectBody {
    #[serde(default)]
    note: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignAdvisorBody {
    lecturer_id: String,
}

fn reference_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::unknown_reference(raw))
}

// ── Lifecycle ────────────────────────────────────────────────────────────────

/// POST /achievements
pub(crate) async fn handle_create(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiJson(draft): ApiJson<AchievementDraft>,
) -> ApiResult<impl IntoResponse> {
    let created = state.engine.create(&caller, draft).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /achievements/{id}/submit
pub(crate) async fn handle_submit(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let reference = state.engine.submit(&caller, reference_id(&id)?).await?;
    Ok(Json(reference))
}

/// POST /achievements/{id}/verify
pub(crate) async fn handle_verify(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let reference = state.engine.verify(&caller, reference_id(&id)?).await?;
    Ok(Json(reference))
}

/// POST /achievements/{id}/reject
pub(crate) async fn handle_reject(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<RejectBody>,
) -> ApiResult<impl IntoResponse> {
    let reference = state
        .engine
        .reject(&caller, reference_id(&id)?, &body.note)
        .await?;
    Ok(Json(reference))
}

/// DELETE /achievements/{id}
pub(crate) async fn handle_delete(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let reference = state.engine.delete_draft(&caller, reference_id(&id)?).await?;
    Ok(Json(reference))
}

/// PUT /achievements/{id}
pub(crate) async fn handle_update(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    ApiJson(draft): ApiJson<AchievementDraft>,
) -> ApiResult<impl IntoResponse> {
    let content = state
        .engine
        .update_draft(&caller, reference_id(&id)?, draft)
        .await?;
    Ok(Json(content))
}

/// POST /achievements/{id}/attachments (multipart, field `file`)
pub(crate) async fn handle_upload(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = reference_id(&id)?;
    let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("could not read file: {e}")))?;
        upload = Some(Upload {
            original_name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }
    let upload = upload.ok_or_else(|| ApiError::bad_request("file is required"))?;

    let attachment = state.engine.add_attachment(&caller, id, upload).await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

// ── Read projections ─────────────────────────────────────────────────────────

/// GET /achievements
pub(crate) async fn handle_list(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = state
        .engine
        .list_for_caller(&caller, query.page_request(), query.status()?)
        .await?;
    Ok(Json(page))
}

/// GET /achievements/me
pub(crate) async fn handle_mine(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.engine.my_achievements(&caller).await?))
}

/// GET /achievements/deleted
pub(crate) async fn handle_deleted(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.engine.deleted_achievements(&caller).await?))
}

/// GET /achievements/bimbingan
pub(crate) async fn handle_bimbingan(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = state
        .engine
        .bimbingan(&caller, query.page_request(), query.status()?)
        .await?;
    Ok(Json(page))
}

/// GET /achievements/{id}
pub(crate) async fn handle_detail(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.engine.detail(&caller, reference_id(&id)?).await?))
}

/// GET /achievements/{id}/history
pub(crate) async fn handle_history(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.engine.history(&caller, reference_id(&id)?).await?))
}

// ── Orphans ──────────────────────────────────────────────────────────────────

/// GET /achievements/orphans
pub(crate) async fn handle_list_orphans(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.engine.list_orphans(&caller).await?))
}

/// POST /achievements/orphans/{content_id}/reference
pub(crate) async fn handle_complete_orphan(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(content_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let reference = state.engine.complete_orphan(&caller, &content_id).await?;
    Ok((StatusCode::CREATED, Json(reference)))
}

/// DELETE /achievements/orphans/{content_id}
pub(crate) async fn handle_discard_orphan(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(content_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.engine.discard_orphan(&caller, &content_id).await?))
}

// ── Admin ────────────────────────────────────────────────────────────────────

/// GET /admin/achievements
pub(crate) async fn handle_admin_list(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = state
        .engine
        .list_all(&caller, query.page_request(), query.status()?)
        .await?;
    Ok(Json(page))
}

/// PUT /admin/students/{id}/advisor
pub(crate) async fn handle_assign_advisor(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(student_id): Path<String>,
    ApiJson(body): ApiJson<AssignAdvisorBody>,
) -> ApiResult<impl IntoResponse> {
    let student = state
        .engine
        .assign_advisor(&caller, &student_id, body.lecturer_id.trim())
        .await?;
    Ok(Json(student))
}
