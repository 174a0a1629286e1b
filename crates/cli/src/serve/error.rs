//! Mapping of workflow failures onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use prestasi_core::{AchievementContent, ErrorKind};
use prestasi_workflow::WorkflowError;
use serde::Serialize;

/// JSON error body: `{"message", "reason"}`, plus the orphaned
/// `achievement` when a create half-succeeded.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    message: String,
    reason: &'static str,
    achievement: Option<Box<AchievementContent>>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    reason: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    achievement: Option<&'a AchievementContent>,
}

impl ApiError {
    pub(crate) fn new(status: StatusCode, reason: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            reason,
            achievement: None,
        }
    }

    pub(crate) fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    /// A path id that is not a UUID names no reference.
    pub(crate) fn unknown_reference(raw: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "achievement_reference_not_found",
            format!("achievement reference not found: {raw}"),
        )
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidTransition | ErrorKind::Validation | ErrorKind::NoAdvisorAssigned => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::NotOwner | ErrorKind::NotAdvisor | ErrorKind::Forbidden => {
            StatusCode::FORBIDDEN
        }
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        let kind = err.kind();
        let reason = err.reason();
        let status = status_for(kind);
        match err {
            WorkflowError::OrphanedContent { content, source } => {
                tracing::error!(
                    content_id = %content.id,
                    error = %source,
                    "achievement stored without reference"
                );
                Self {
                    status,
                    message: "achievement stored but its reference could not be created"
                        .to_string(),
                    reason,
                    achievement: Some(content),
                }
            }
            other if kind == ErrorKind::Internal => {
                tracing::error!(error = %other, "internal error");
                Self::new(status, reason, "internal error")
            }
            other => Self::new(status, reason, other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: &self.message,
            reason: self.reason,
            achievement: self.achievement.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}
