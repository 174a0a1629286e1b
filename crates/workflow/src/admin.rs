//! Advisor assignment and recovery of content left without a reference.

use prestasi_core::{
    AchievementContent, AchievementReference, Caller, ContentId, Role, StudentRecord,
};
use prestasi_storage::{ReferenceStore, StorageError};
use time::OffsetDateTime;

use crate::engine::WorkflowEngine;
use crate::error::WorkflowError;

impl<R: ReferenceStore> WorkflowEngine<R> {
    /// Point a student at a lecturer. Admin only; the lecturer's user must
    /// hold the advisor role.
    pub async fn assign_advisor(
        &self,
        caller: &Caller,
        student_id: &str,
        lecturer_id: &str,
    ) -> Result<StudentRecord, WorkflowError> {
        if !caller.is_admin() {
            return Err(WorkflowError::Forbidden {
                action: "assign advisors",
            });
        }
        let lecturer = self
            .directory
            .find_lecturer(lecturer_id)
            .await?
            .ok_or_else(|| WorkflowError::LecturerNotFound {
                lecturer_id: lecturer_id.to_string(),
            })?;
        let role = self
            .directory
            .find_user(&lecturer.user_id)
            .await?
            .map(|u| u.role);
        if role != Some(Role::Advisor) {
            return Err(WorkflowError::Validation(format!(
                "lecturer {lecturer_id} is not an academic advisor"
            )));
        }

        let student = self.directory.assign_advisor(student_id, lecturer_id).await?;
        tracing::info!(
            student_id = %student.id,
            lecturer_id,
            actor = %caller.user_id,
            "advisor assigned"
        );
        Ok(student)
    }

    // ── Orphaned content ─────────────────────────────────────────────────────

    /// The caller's live content documents that have no reference.
    pub async fn list_orphans(
        &self,
        caller: &Caller,
    ) -> Result<Vec<AchievementContent>, WorkflowError> {
        let student = self.caller_student(caller).await?;
        let mut orphans = Vec::new();
        for content in self.contents.find_by_student(&student.id, false).await? {
            if self
                .references
                .find_reference_by_content(&content.id)
                .await?
                .is_none()
            {
                orphans.push(content);
            }
        }
        Ok(orphans)
    }

    /// Create the missing `draft` reference for an orphaned document.
    pub async fn complete_orphan(
        &self,
        caller: &Caller,
        content_id: &str,
    ) -> Result<AchievementReference, WorkflowError> {
        let content = self.owned_orphan(caller, content_id).await?;
        let reference = AchievementReference::new_draft(
            content.student_id.clone(),
            content.id.clone(),
            OffsetDateTime::now_utc(),
        );
        match self.insert_reference(reference.clone()).await {
            Ok(()) => {}
            Err(StorageError::AlreadyExists { .. }) => {
                return Err(already_referenced(&content.id));
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(
            reference_id = %reference.id,
            content_id = %content.id,
            "orphaned content completed"
        );
        Ok(reference)
    }

    /// Soft-delete an orphaned document.
    pub async fn discard_orphan(
        &self,
        caller: &Caller,
        content_id: &str,
    ) -> Result<AchievementContent, WorkflowError> {
        let content = self.owned_orphan(caller, content_id).await?;
        self.contents.soft_delete(&content.id).await?;
        tracing::info!(content_id = %content.id, "orphaned content discarded");
        Ok(content)
    }

    async fn owned_orphan(
        &self,
        caller: &Caller,
        content_id: &str,
    ) -> Result<AchievementContent, WorkflowError> {
        let student = self.caller_student(caller).await?;
        let id = ContentId::parse(content_id).ok_or_else(|| WorkflowError::ContentNotFound {
            content_id: content_id.to_string(),
        })?;
        let content = self.contents.find_by_id(&id).await?;
        if content.student_id != student.id {
            return Err(WorkflowError::NotOwner {
                reference_id: content.id.to_string(),
            });
        }
        if self
            .references
            .find_reference_by_content(&content.id)
            .await?
            .is_some()
        {
            return Err(already_referenced(&content.id));
        }
        Ok(content)
    }
}

fn already_referenced(id: &ContentId) -> WorkflowError {
    WorkflowError::Validation(format!("achievement {id} already has a reference"))
}
