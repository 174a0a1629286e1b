use std::sync::Arc;

use async_trait::async_trait;
use prestasi_core::{AchievementContent, AchievementDraft, Attachment, ContentId};
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::traits::ContentStore;

/// In-memory [`ContentStore`]. Documents are kept in creation order.
#[derive(Clone, Default)]
pub struct MemoryContentStore {
    documents: Arc<Mutex<Vec<AchievementContent>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(id: &ContentId) -> StorageError {
    StorageError::ContentNotFound {
        content_id: id.to_string(),
    }
}

fn live_mut<'a>(
    docs: &'a mut [AchievementContent],
    id: &ContentId,
) -> Result<&'a mut AchievementContent, StorageError> {
    docs.iter_mut()
        .find(|d| d.id == *id && !d.is_deleted)
        .ok_or_else(|| not_found(id))
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn create(
        &self,
        student_id: &str,
        draft: AchievementDraft,
    ) -> Result<AchievementContent, StorageError> {
        let mut docs = self.documents.lock().await;
        let id = loop {
            let candidate = ContentId::from_bytes(rand::random());
            if !docs.iter().any(|d| d.id == candidate) {
                break candidate;
            }
        };
        let content =
            AchievementContent::from_draft(id, student_id, draft, OffsetDateTime::now_utc());
        docs.push(content.clone());
        Ok(content)
    }

    async fn find_by_student(
        &self,
        student_id: &str,
        include_deleted: bool,
    ) -> Result<Vec<AchievementContent>, StorageError> {
        let docs = self.documents.lock().await;
        Ok(docs
            .iter()
            .filter(|d| d.student_id == student_id && (include_deleted || !d.is_deleted))
            .cloned()
            .collect())
    }

    async fn find_deleted_by_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<AchievementContent>, StorageError> {
        let docs = self.documents.lock().await;
        Ok(docs
            .iter()
            .filter(|d| d.student_id == student_id && d.is_deleted)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &ContentId) -> Result<AchievementContent, StorageError> {
        let docs = self.documents.lock().await;
        docs.iter()
            .find(|d| d.id == *id && !d.is_deleted)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn find_by_ids(&self, ids: &[&str]) -> Result<Vec<AchievementContent>, StorageError> {
        let wanted: Vec<ContentId> = ids.iter().filter_map(|raw| ContentId::parse(raw)).collect();
        let docs = self.documents.lock().await;
        Ok(docs
            .iter()
            .filter(|d| !d.is_deleted && wanted.contains(&d.id))
            .cloned()
            .collect())
    }

    async fn soft_delete(&self, id: &ContentId) -> Result<(), StorageError> {
        let mut docs = self.documents.lock().await;
        let doc = docs
            .iter_mut()
            .find(|d| d.id == *id)
            .ok_or_else(|| not_found(id))?;
        if doc.is_deleted {
            return Ok(());
        }
        let now = OffsetDateTime::now_utc();
        doc.is_deleted = true;
        doc.deleted_at = Some(now);
        doc.updated_at = now;
        Ok(())
    }

    async fn append_attachment(
        &self,
        id: &ContentId,
        attachment: Attachment,
    ) -> Result<(), StorageError> {
        let mut docs = self.documents.lock().await;
        let doc = live_mut(&mut docs, id)?;
        doc.attachments.push(attachment);
        doc.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn update(
        &self,
        id: &ContentId,
        draft: AchievementDraft,
    ) -> Result<AchievementContent, StorageError> {
        let mut docs = self.documents.lock().await;
        let doc = live_mut(&mut docs, id)?;
        doc.apply_draft(draft, OffsetDateTime::now_utc());
        Ok(doc.clone())
    }
}
