//! Read projections. None of these mutate anything.

use std::collections::HashMap;

use prestasi_core::{
    AchievementContent, AchievementEntry, AchievementReference, AchievementStatus, Caller, Page,
    PageRequest, Role, StatusLogEntry,
};
use prestasi_storage::{ReferenceFilter, ReferenceStore};
use uuid::Uuid;

use crate::engine::WorkflowEngine;
use crate::error::WorkflowError;

impl<R: ReferenceStore> WorkflowEngine<R> {
    /// The caller's live content documents.
    pub async fn my_achievements(
        &self,
        caller: &Caller,
    ) -> Result<Vec<AchievementContent>, WorkflowError> {
        let student = self.caller_student(caller).await?;
        Ok(self.contents.find_by_student(&student.id, false).await?)
    }

    /// The caller's soft-deleted content documents.
    pub async fn deleted_achievements(
        &self,
        caller: &Caller,
    ) -> Result<Vec<AchievementContent>, WorkflowError> {
        let student = self.caller_student(caller).await?;
        Ok(self.contents.find_deleted_by_student(&student.id).await?)
    }

    /// Achievements of the caller's advisees. Admins see every student.
    pub async fn bimbingan(
        &self,
        caller: &Caller,
        request: PageRequest,
        status: Option<AchievementStatus>,
    ) -> Result<Page<AchievementEntry>, WorkflowError> {
        match caller.role {
            Role::Admin => self.entries(ReferenceFilter::all().with_status(status), request).await,
            Role::Advisor => {
                let advisees = self.advisee_ids(caller).await?;
                if advisees.is_empty() {
                    return Ok(Page::new(request, 0, Vec::new()));
                }
                self.entries(ReferenceFilter::students(advisees).with_status(status), request)
                    .await
            }
            Role::Student => Err(WorkflowError::Forbidden {
                action: "list advisee achievements",
            }),
        }
    }

    /// References visible to the caller: a student's own, an advisor's
    /// advisees', or everything for an admin.
    pub async fn list_for_caller(
        &self,
        caller: &Caller,
        request: PageRequest,
        status: Option<AchievementStatus>,
    ) -> Result<Page<AchievementEntry>, WorkflowError> {
        match caller.role {
            Role::Student => {
                let student = self.caller_student(caller).await?;
                self.entries(
                    ReferenceFilter::students(vec![student.id]).with_status(status),
                    request,
                )
                .await
            }
            Role::Advisor | Role::Admin => self.bimbingan(caller, request, status).await,
        }
    }

    /// Every reference, admin only.
    pub async fn list_all(
        &self,
        caller: &Caller,
        request: PageRequest,
        status: Option<AchievementStatus>,
    ) -> Result<Page<AchievementEntry>, WorkflowError> {
        if !caller.is_admin() {
            return Err(WorkflowError::Forbidden {
                action: "list all achievements",
            });
        }
        self.entries(ReferenceFilter::all().with_status(status), request)
            .await
    }

    /// One reference with its content, if the caller may see it.
    pub async fn detail(
        &self,
        caller: &Caller,
        reference_id: Uuid,
    ) -> Result<AchievementEntry, WorkflowError> {
        let reference = self.visible_reference(caller, reference_id).await?;
        let achievement = self
            .contents
            .find_by_ids(&[reference.content_id.as_str()])
            .await?
            .into_iter()
            .next();
        Ok(AchievementEntry {
            reference,
            achievement,
        })
    }

    /// Status-log rows for one reference in creation order.
    pub async fn history(
        &self,
        caller: &Caller,
        reference_id: Uuid,
    ) -> Result<Vec<StatusLogEntry>, WorkflowError> {
        let reference = self.visible_reference(caller, reference_id).await?;
        Ok(self.references.list_status_logs(reference.id).await?)
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    async fn advisee_ids(&self, caller: &Caller) -> Result<Vec<String>, WorkflowError> {
        let lecturer = self
            .directory
            .find_lecturer_by_user(&caller.user_id)
            .await?
            .ok_or_else(|| WorkflowError::LecturerNotFound {
                lecturer_id: format!("user {}", caller.user_id),
            })?;
        Ok(self
            .directory
            .find_advisees(&lecturer.id)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect())
    }

    /// Admin sees all; a student only their own; an advisor only their
    /// advisees'.
    async fn visible_reference(
        &self,
        caller: &Caller,
        reference_id: Uuid,
    ) -> Result<AchievementReference, WorkflowError> {
        let reference = self.references.get_reference(reference_id).await?;
        match caller.role {
            Role::Admin => Ok(reference),
            Role::Student => {
                let student = self.caller_student(caller).await?;
                if reference.student_id == student.id {
                    Ok(reference)
                } else {
                    Err(WorkflowError::NotOwner {
                        reference_id: reference.id.to_string(),
                    })
                }
            }
            Role::Advisor => {
                let advisees = self.advisee_ids(caller).await?;
                if advisees.contains(&reference.student_id) {
                    Ok(reference)
                } else {
                    Err(WorkflowError::NotAdvisor {
                        reference_id: reference.id.to_string(),
                    })
                }
            }
        }
    }

    /// Count, page, then join content by id. Missing content leaves
    /// `achievement` empty instead of failing the page.
    async fn entries(
        &self,
        filter: ReferenceFilter,
        request: PageRequest,
    ) -> Result<Page<AchievementEntry>, WorkflowError> {
        let total = self.references.count_references(&filter).await?;
        let references = self
            .references
            .list_references(&filter, request.per_page(), request.offset())
            .await?;

        let ids: Vec<&str> = references.iter().map(|r| r.content_id.as_str()).collect();
        let mut by_id: HashMap<String, AchievementContent> = self
            .contents
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|c| (c.id.as_str().to_string(), c))
            .collect();

        let items = references
            .into_iter()
            .map(|reference| {
                let achievement = by_id.remove(reference.content_id.as_str());
                AchievementEntry {
                    reference,
                    achievement,
                }
            })
            .collect();
        Ok(Page::new(request, total, items))
    }
}
