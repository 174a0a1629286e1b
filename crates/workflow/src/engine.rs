//! The achievement lifecycle: create, submit, verify, reject, delete.
//!
//! Every status change follows the same shape: resolve the caller, load the
//! reference inside a snapshot, check ownership or advisor authority, check
//! the transition table, then stage the reference update and its status-log
//! row together and commit. The version read at the start is the version the
//! update is conditional on, so two racing writers cannot both commit.

use std::sync::Arc;

use prestasi_core::{
    AchievementContent, AchievementDraft, AchievementReference, Caller, Role, StatusLogEntry,
    StudentRecord, Transition,
};
use prestasi_storage::{ContentStore, Directory, FileStore, ReferenceStore};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::WorkflowError;

/// A freshly created achievement: the content document and its `draft`
/// reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedAchievement {
    pub achievement: AchievementContent,
    pub reference: AchievementReference,
}

/// Orchestrates the content store, the reference store and the directory.
///
/// Stateless between calls; share it behind an `Arc`.
pub struct WorkflowEngine<R: ReferenceStore> {
    pub(crate) contents: Arc<dyn ContentStore>,
    pub(crate) references: Arc<R>,
    pub(crate) directory: Arc<dyn Directory>,
    pub(crate) files: Arc<dyn FileStore>,
}

impl<R: ReferenceStore> WorkflowEngine<R> {
    pub fn new(
        contents: Arc<dyn ContentStore>,
        references: Arc<R>,
        directory: Arc<dyn Directory>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            contents,
            references,
            directory,
            files,
        }
    }

    pub fn references(&self) -> &R {
        &self.references
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Store the content document, then its `draft` reference.
    ///
    /// The two writes are not atomic as a pair. If the reference write fails
    /// the content survives and is handed back in
    /// [`WorkflowError::OrphanedContent`].
    pub async fn create(
        &self,
        caller: &Caller,
        draft: AchievementDraft,
    ) -> Result<CreatedAchievement, WorkflowError> {
        draft.validate().map_err(WorkflowError::Validation)?;
        let student = self.caller_student(caller).await?;

        let content = self.contents.create(&student.id, draft).await?;
        let reference = AchievementReference::new_draft(
            student.id.clone(),
            content.id.clone(),
            OffsetDateTime::now_utc(),
        );

        match self.insert_reference(reference.clone()).await {
            Ok(()) => {
                tracing::info!(
                    reference_id = %reference.id,
                    content_id = %content.id,
                    student_id = %student.id,
                    "achievement created"
                );
                Ok(CreatedAchievement {
                    achievement: content,
                    reference,
                })
            }
            Err(source) => {
                tracing::warn!(
                    content_id = %content.id,
                    student_id = %student.id,
                    error = %source,
                    "reference write failed, content left without reference"
                );
                Err(WorkflowError::OrphanedContent {
                    content: Box::new(content),
                    source,
                })
            }
        }
    }

    /// `draft -> submitted`. Owner only.
    pub async fn submit(
        &self,
        caller: &Caller,
        reference_id: Uuid,
    ) -> Result<AchievementReference, WorkflowError> {
        let student = self.caller_student(caller).await?;

        let mut snap = self.references.begin_snapshot().await?;
        let staged = async {
            let current = self.load_for_update(&mut snap, reference_id).await?;
            ensure_owner(&current, &student)?;
            let now = OffsetDateTime::now_utc();
            self.stage_transition(&mut snap, current, Transition::Submit, caller, None, now, |r| {
                r.submitted_at = Some(now);
            })
            .await
        }
        .await;
        self.finish(snap, staged, Transition::Submit, caller).await
    }

    /// `submitted -> verified`. Admin or the student's assigned advisor.
    pub async fn verify(
        &self,
        caller: &Caller,
        reference_id: Uuid,
    ) -> Result<AchievementReference, WorkflowError> {
        let mut snap = self.references.begin_snapshot().await?;
        let staged = async {
            let current = self.load_for_update(&mut snap, reference_id).await?;
            self.authorize_verifier(caller, &current).await?;
            let now = OffsetDateTime::now_utc();
            let verifier = caller.user_id.clone();
            self.stage_transition(&mut snap, current, Transition::Verify, caller, None, now, |r| {
                r.verified_at = Some(now);
                r.verified_by = Some(verifier);
                r.rejection_note = None;
            })
            .await
        }
        .await;
        self.finish(snap, staged, Transition::Verify, caller).await
    }

    /// `submitted -> rejected`. Same authority as [`verify`](Self::verify);
    /// the note must be non-empty and is checked before anything is read.
    pub async fn reject(
        &self,
        caller: &Caller,
        reference_id: Uuid,
        note: &str,
    ) -> Result<AchievementReference, WorkflowError> {
        let note = note.trim();
        if note.is_empty() {
            return Err(WorkflowError::Validation(
                "rejection note is required".to_string(),
            ));
        }

        let mut snap = self.references.begin_snapshot().await?;
        let staged = async {
            let current = self.load_for_update(&mut snap, reference_id).await?;
            self.authorize_verifier(caller, &current).await?;
            let now = OffsetDateTime::now_utc();
            let verifier = caller.user_id.clone();
            let log_note = Some(note.to_string());
            self.stage_transition(
                &mut snap,
                current,
                Transition::Reject,
                caller,
                log_note,
                now,
                |r| {
                    r.verified_at = Some(now);
                    r.verified_by = Some(verifier);
                    r.rejection_note = Some(note.to_string());
                },
            )
            .await
        }
        .await;
        self.finish(snap, staged, Transition::Reject, caller).await
    }

    /// `draft -> deleted`. Owner only. Soft-deletes the content first, then
    /// commits the reference change.
    pub async fn delete_draft(
        &self,
        caller: &Caller,
        reference_id: Uuid,
    ) -> Result<AchievementReference, WorkflowError> {
        let student = self.caller_student(caller).await?;

        let mut snap = self.references.begin_snapshot().await?;
        let staged = async {
            let current = self.load_for_update(&mut snap, reference_id).await?;
            ensure_owner(&current, &student)?;
            let content_id = current.content_id.clone();
            let now = OffsetDateTime::now_utc();
            let updated = self
                .stage_transition(&mut snap, current, Transition::DeleteDraft, caller, None, now, |_| {})
                .await?;
            self.contents.soft_delete(&content_id).await?;
            Ok(updated)
        }
        .await;
        let result = self.finish(snap, staged, Transition::DeleteDraft, caller).await;
        if let Err(WorkflowError::Conflict { reference_id }) = &result {
            tracing::warn!(
                %reference_id,
                "content soft-deleted but reference update lost a race"
            );
        }
        result
    }

    // ── Shared steps ─────────────────────────────────────────────────────────

    pub(crate) async fn caller_student(&self, caller: &Caller) -> Result<StudentRecord, WorkflowError> {
        self.directory
            .find_student_by_user(&caller.user_id)
            .await?
            .ok_or_else(|| WorkflowError::StudentProfileNotFound {
                lookup: format!("user {}", caller.user_id),
            })
    }

    pub(crate) async fn insert_reference(
        &self,
        reference: AchievementReference,
    ) -> Result<(), prestasi_storage::StorageError> {
        let mut snap = self.references.begin_snapshot().await?;
        if let Err(e) = self.references.insert_reference(&mut snap, reference).await {
            let _ = self.references.abort_snapshot(snap).await;
            return Err(e);
        }
        self.references.commit_snapshot(snap).await
    }

    async fn load_for_update(
        &self,
        snap: &mut R::Snapshot,
        reference_id: Uuid,
    ) -> Result<AchievementReference, WorkflowError> {
        Ok(self
            .references
            .get_reference_for_update(snap, reference_id)
            .await?)
    }

    /// Advisor authority for verify and reject.
    ///
    /// Resolves reference -> student -> assigned lecturer -> user on every
    /// call. The student-side checks apply to admins too; only the final
    /// identity comparison is skipped for them.
    async fn authorize_verifier(
        &self,
        caller: &Caller,
        reference: &AchievementReference,
    ) -> Result<(), WorkflowError> {
        let student = self
            .directory
            .find_student(&reference.student_id)
            .await?
            .ok_or_else(|| WorkflowError::StudentProfileNotFound {
                lookup: format!("student {}", reference.student_id),
            })?;
        let advisor_id = student
            .advisor_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| WorkflowError::NoAdvisorAssigned {
                student_id: student.id.clone(),
            })?;
        let lecturer = self
            .directory
            .find_lecturer(advisor_id)
            .await?
            .ok_or_else(|| WorkflowError::LecturerNotFound {
                lecturer_id: advisor_id.to_string(),
            })?;
        let verifier = self
            .directory
            .find_user(&caller.user_id)
            .await?
            .ok_or_else(|| WorkflowError::VerifierNotFound {
                user_id: caller.user_id.clone(),
            })?;

        match caller.role {
            Role::Admin => Ok(()),
            Role::Advisor | Role::Student => {
                if lecturer.user_id == verifier.id {
                    Ok(())
                } else {
                    Err(WorkflowError::NotAdvisor {
                        reference_id: reference.id.to_string(),
                    })
                }
            }
        }
    }

    /// Check the transition table, then stage the conditional update and its
    /// log row in `snap`.
    #[allow(clippy::too_many_arguments)]
    async fn stage_transition(
        &self,
        snap: &mut R::Snapshot,
        current: AchievementReference,
        transition: Transition,
        caller: &Caller,
        note: Option<String>,
        now: OffsetDateTime,
        apply: impl FnOnce(&mut AchievementReference) + Send,
    ) -> Result<AchievementReference, WorkflowError> {
        let from = current.status;
        let to = transition.to_status();
        if from != transition.from_status() {
            return Err(WorkflowError::InvalidTransition {
                reference_id: current.id.to_string(),
                from,
                to,
            });
        }

        let mut next = current.clone();
        next.status = to;
        next.updated_at = now;
        apply(&mut next);

        next.version = self
            .references
            .update_reference(snap, next.clone(), current.version)
            .await?;
        let entry = StatusLogEntry::new(current.id, from, to, caller.user_id.clone(), note, now);
        self.references.insert_status_log(snap, entry).await?;
        Ok(next)
    }

    /// Commit on success, abort on failure.
    async fn finish(
        &self,
        snap: R::Snapshot,
        staged: Result<AchievementReference, WorkflowError>,
        transition: Transition,
        caller: &Caller,
    ) -> Result<AchievementReference, WorkflowError> {
        let updated = match staged {
            Ok(updated) => updated,
            Err(e) => {
                let _ = self.references.abort_snapshot(snap).await;
                return Err(e);
            }
        };
        if let Err(e) = self.references.commit_snapshot(snap).await {
            let err = WorkflowError::from(e);
            if matches!(err, WorkflowError::Conflict { .. }) {
                tracing::warn!(
                    reference_id = %updated.id,
                    transition = transition.name(),
                    actor = %caller.user_id,
                    "transition lost an optimistic concurrency race"
                );
            }
            return Err(err);
        }
        tracing::info!(
            reference_id = %updated.id,
            from = %transition.from_status(),
            to = %transition.to_status(),
            actor = %caller.user_id,
            "achievement status changed"
        );
        Ok(updated)
    }
}

fn ensure_owner(reference: &AchievementReference, student: &StudentRecord) -> Result<(), WorkflowError> {
    if reference.student_id == student.id {
        Ok(())
    } else {
        Err(WorkflowError::NotOwner {
            reference_id: reference.id.to_string(),
        })
    }
}
