//! Edits to a draft's content document: field updates and attachments.

use prestasi_core::{
    allowed_attachment_extension, AchievementContent, AchievementDraft, AchievementStatus,
    Attachment, Caller, ALLOWED_ATTACHMENT_EXTENSIONS,
};
use prestasi_storage::ReferenceStore;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::engine::WorkflowEngine;
use crate::error::WorkflowError;

/// An uploaded file as received at the boundary.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied name; only its extension is kept.
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl<R: ReferenceStore> WorkflowEngine<R> {
    /// Replace the recognized fields of a draft. Owner only.
    pub async fn update_draft(
        &self,
        caller: &Caller,
        reference_id: Uuid,
        draft: AchievementDraft,
    ) -> Result<AchievementContent, WorkflowError> {
        draft.validate().map_err(WorkflowError::Validation)?;
        let reference = self.owned_draft(caller, reference_id).await?;
        let updated = self.contents.update(&reference.content_id, draft).await?;
        self.ensure_still_draft(&reference).await?;
        tracing::info!(
            reference_id = %reference.id,
            content_id = %updated.id,
            "draft content updated"
        );
        Ok(updated)
    }

    /// Store the file under a generated name and append it to the draft's
    /// attachments. The stored file is removed if the append fails.
    pub async fn add_attachment(
        &self,
        caller: &Caller,
        reference_id: Uuid,
        upload: Upload,
    ) -> Result<Attachment, WorkflowError> {
        let ext = allowed_attachment_extension(&upload.original_name).ok_or_else(|| {
            WorkflowError::Validation(format!(
                "file type not allowed, expected one of: {}",
                ALLOWED_ATTACHMENT_EXTENSIONS.join(", ")
            ))
        })?;
        if upload.bytes.is_empty() {
            return Err(WorkflowError::Validation("file is empty".to_string()));
        }
        let reference = self.owned_draft(caller, reference_id).await?;

        let file_name = format!("{}.{ext}", Uuid::new_v4());
        let stored = self.files.save(&file_name, &upload.bytes).await?;
        let attachment = Attachment {
            file_name: stored.file_name.clone(),
            file_url: stored.url,
            file_type: upload.content_type,
            uploaded_at: OffsetDateTime::now_utc(),
        };

        if let Err(e) = self
            .contents
            .append_attachment(&reference.content_id, attachment.clone())
            .await
        {
            if let Err(cleanup) = self.files.remove(&stored.file_name).await {
                tracing::warn!(
                    file_name = %stored.file_name,
                    error = %cleanup,
                    "could not remove attachment file after failed append"
                );
            }
            return Err(e.into());
        }
        self.ensure_still_draft(&reference).await?;

        tracing::info!(
            reference_id = %reference.id,
            file_name = %attachment.file_name,
            "attachment added"
        );
        Ok(attachment)
    }

    /// Content writes are not fenced by the reference snapshot. A transition
    /// that committed between the draft check and the write shows up as a
    /// version change, reported as `Conflict`.
    async fn ensure_still_draft(
        &self,
        before: &prestasi_core::AchievementReference,
    ) -> Result<(), WorkflowError> {
        let now = self.references.get_reference(before.id).await?;
        if now.version != before.version {
            tracing::warn!(
                reference_id = %before.id,
                status = %now.status,
                "reference changed while its draft content was being written"
            );
            return Err(WorkflowError::Conflict {
                reference_id: before.id.to_string(),
            });
        }
        Ok(())
    }

    /// The caller's own reference, required to still be a draft.
    async fn owned_draft(
        &self,
        caller: &Caller,
        reference_id: Uuid,
    ) -> Result<prestasi_core::AchievementReference, WorkflowError> {
        let student = self.caller_student(caller).await?;
        let reference = self.references.get_reference(reference_id).await?;
        if reference.student_id != student.id {
            return Err(WorkflowError::NotOwner {
                reference_id: reference.id.to_string(),
            });
        }
        if reference.status != AchievementStatus::Draft {
            return Err(WorkflowError::InvalidTransition {
                reference_id: reference.id.to_string(),
                from: reference.status,
                to: AchievementStatus::Draft,
            });
        }
        Ok(reference)
    }
}
