use prestasi_core::{AchievementContent, AchievementStatus, ErrorKind};
use prestasi_storage::StorageError;

/// Every way a workflow operation can fail.
///
/// Callers match on [`WorkflowError::kind`]; [`WorkflowError::reason`] is the
/// stable machine-readable string sent to clients.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("achievement reference not found: {reference_id}")]
    ReferenceNotFound { reference_id: String },

    #[error("student profile not found: {lookup}")]
    StudentProfileNotFound { lookup: String },

    #[error("lecturer record not found: {lecturer_id}")]
    LecturerNotFound { lecturer_id: String },

    #[error("verifier user not found: {user_id}")]
    VerifierNotFound { user_id: String },

    #[error("achievement not found: {content_id}")]
    ContentNotFound { content_id: String },

    #[error("invalid status transition for {reference_id}: {from} -> {to}")]
    InvalidTransition {
        reference_id: String,
        from: AchievementStatus,
        to: AchievementStatus,
    },

    #[error("{reference_id} does not belong to the caller")]
    NotOwner { reference_id: String },

    #[error("only the assigned academic advisor can access achievement {reference_id}")]
    NotAdvisor { reference_id: String },

    #[error("role not permitted to {action}")]
    Forbidden { action: &'static str },

    #[error("student {student_id} has no advisor assigned")]
    NoAdvisorAssigned { student_id: String },

    #[error("{0}")]
    Validation(String),

    #[error("achievement reference {reference_id} was modified concurrently, retry")]
    Conflict { reference_id: String },

    /// Content was stored but its reference row was not. The document still
    /// exists and is returned so the caller can complete or discard it.
    #[error("achievement {} was stored but its reference could not be created: {source}", .content.id)]
    OrphanedContent {
        content: Box<AchievementContent>,
        source: StorageError,
    },

    #[error(transparent)]
    Storage(StorageError),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::ReferenceNotFound { .. }
            | WorkflowError::StudentProfileNotFound { .. }
            | WorkflowError::LecturerNotFound { .. }
            | WorkflowError::VerifierNotFound { .. }
            | WorkflowError::ContentNotFound { .. } => ErrorKind::NotFound,
            WorkflowError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            WorkflowError::NotOwner { .. } => ErrorKind::NotOwner,
            WorkflowError::NotAdvisor { .. } => ErrorKind::NotAdvisor,
            WorkflowError::Forbidden { .. } => ErrorKind::Forbidden,
            WorkflowError::NoAdvisorAssigned { .. } => ErrorKind::NoAdvisorAssigned,
            WorkflowError::Validation(_) => ErrorKind::Validation,
            WorkflowError::Conflict { .. } => ErrorKind::Conflict,
            WorkflowError::OrphanedContent { .. } | WorkflowError::Storage(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            WorkflowError::ReferenceNotFound { .. } => "achievement_reference_not_found",
            WorkflowError::StudentProfileNotFound { .. } => "student_profile_not_found",
            WorkflowError::LecturerNotFound { .. } => "lecturer_not_found",
            WorkflowError::VerifierNotFound { .. } => "verifier_not_found",
            WorkflowError::ContentNotFound { .. } => "achievement_not_found",
            WorkflowError::InvalidTransition { .. } => "invalid_status_transition",
            WorkflowError::NotOwner { .. } => "not_owner",
            WorkflowError::NotAdvisor { .. } => "not_advisor",
            WorkflowError::Forbidden { .. } => "forbidden",
            WorkflowError::NoAdvisorAssigned { .. } => "student_no_advisor",
            WorkflowError::Validation(_) => "validation_error",
            WorkflowError::Conflict { .. } => "concurrent_conflict",
            WorkflowError::OrphanedContent { .. } => "orphaned_content",
            WorkflowError::Storage(_) => "storage_error",
        }
    }
}

impl From<StorageError> for WorkflowError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConcurrentConflict { reference_id, .. } => {
                WorkflowError::Conflict { reference_id }
            }
            StorageError::ReferenceNotFound { reference_id } => {
                WorkflowError::ReferenceNotFound { reference_id }
            }
            StorageError::ContentNotFound { content_id } => {
                WorkflowError::ContentNotFound { content_id }
            }
            StorageError::RecordNotFound {
                what: "student",
                id,
            } => WorkflowError::StudentProfileNotFound { lookup: id },
            StorageError::RecordNotFound {
                what: "lecturer",
                id,
            } => WorkflowError::LecturerNotFound { lecturer_id: id },
            other => WorkflowError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_domain_variants() {
        let conflict: WorkflowError = StorageError::ConcurrentConflict {
            reference_id: "r1".into(),
            expected_version: 2,
        }
        .into();
        assert_eq!(conflict.kind(), ErrorKind::Conflict);
        assert_eq!(conflict.reason(), "concurrent_conflict");

        let missing: WorkflowError = StorageError::ContentNotFound {
            content_id: "c1".into(),
        }
        .into();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert_eq!(missing.reason(), "achievement_not_found");

        let student: WorkflowError = StorageError::RecordNotFound {
            what: "student",
            id: "s1".into(),
        }
        .into();
        assert_eq!(student.reason(), "student_profile_not_found");

        let backend: WorkflowError = StorageError::Backend("disk full".into()).into();
        assert_eq!(backend.kind(), ErrorKind::Internal);
    }

    #[test]
    fn transition_error_message_names_both_statuses() {
        let err = WorkflowError::InvalidTransition {
            reference_id: "r1".into(),
            from: AchievementStatus::Verified,
            to: AchievementStatus::Verified,
        };
        assert_eq!(
            err.to_string(),
            "invalid status transition for r1: verified -> verified"
        );
    }
}
