use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use prestasi_core::{AchievementReference, ContentId, StatusLogEntry};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StorageError;
use crate::record::{listing_order, ReferenceFilter};
use crate::traits::ReferenceStore;

#[derive(Default)]
struct Tables {
    references: HashMap<Uuid, AchievementReference>,
    logs: Vec<StatusLogEntry>,
}

/// In-memory [`ReferenceStore`].
///
/// Snapshots buffer their writes; `commit_snapshot` re-validates every staged
/// version under the table lock and applies all writes or none.
#[derive(Clone, Default)]
pub struct MemoryReferenceStore {
    tables: Arc<Mutex<Tables>>,
}

/// Writes staged by one [`MemoryReferenceStore`] transaction.
#[derive(Debug, Default)]
pub struct MemorySnapshot {
    inserts: Vec<AchievementReference>,
    /// Staged row plus the committed version it was based on.
    updates: Vec<(AchievementReference, i64)>,
    logs: Vec<StatusLogEntry>,
}

impl MemorySnapshot {
    fn staged(&self, id: Uuid) -> Option<&AchievementReference> {
        self.updates
            .iter()
            .rev()
            .map(|(r, _)| r)
            .find(|r| r.id == id)
            .or_else(|| self.inserts.iter().find(|r| r.id == id))
    }
}

impl MemoryReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(id: Uuid) -> StorageError {
    StorageError::ReferenceNotFound {
        reference_id: id.to_string(),
    }
}

#[async_trait]
impl ReferenceStore for MemoryReferenceStore {
    type Snapshot = MemorySnapshot;

    async fn begin_snapshot(&self) -> Result<MemorySnapshot, StorageError> {
        Ok(MemorySnapshot::default())
    }

    async fn commit_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        let mut tables = self.tables.lock().await;

        // Validate everything before applying anything.
        for record in &snapshot.inserts {
            if tables.references.contains_key(&record.id) {
                return Err(StorageError::AlreadyExists {
                    what: "achievement reference",
                    id: record.id.to_string(),
                });
            }
            if tables
                .references
                .values()
                .any(|r| r.content_id == record.content_id)
            {
                return Err(StorageError::AlreadyExists {
                    what: "reference for content",
                    id: record.content_id.to_string(),
                });
            }
        }
        for (record, base_version) in &snapshot.updates {
            match tables.references.get(&record.id) {
                Some(current) if current.version == *base_version => {}
                Some(_) => {
                    return Err(StorageError::ConcurrentConflict {
                        reference_id: record.id.to_string(),
                        expected_version: *base_version,
                    })
                }
                None => return Err(not_found(record.id)),
            }
        }

        for record in snapshot.inserts {
            tables.references.insert(record.id, record);
        }
        for (record, _) in snapshot.updates {
            tables.references.insert(record.id, record);
        }
        tables.logs.extend(snapshot.logs);
        Ok(())
    }

    async fn abort_snapshot(&self, _snapshot: MemorySnapshot) -> Result<(), StorageError> {
        Ok(())
    }

    async fn insert_reference(
        &self,
        snapshot: &mut MemorySnapshot,
        record: AchievementReference,
    ) -> Result<(), StorageError> {
        if record.version != 0 {
            return Err(StorageError::Backend(format!(
                "new reference {} must start at version 0, got {}",
                record.id, record.version
            )));
        }
        let tables = self.tables.lock().await;
        let taken = tables.references.contains_key(&record.id)
            || snapshot.inserts.iter().any(|r| r.id == record.id);
        if taken {
            return Err(StorageError::AlreadyExists {
                what: "achievement reference",
                id: record.id.to_string(),
            });
        }
        let content_referenced = tables
            .references
            .values()
            .chain(snapshot.inserts.iter())
            .any(|r| r.content_id == record.content_id);
        if content_referenced {
            return Err(StorageError::AlreadyExists {
                what: "reference for content",
                id: record.content_id.to_string(),
            });
        }
        snapshot.inserts.push(record);
        Ok(())
    }

    async fn get_reference_for_update(
        &self,
        snapshot: &mut MemorySnapshot,
        id: Uuid,
    ) -> Result<AchievementReference, StorageError> {
        if let Some(staged) = snapshot.staged(id) {
            return Ok(staged.clone());
        }
        let tables = self.tables.lock().await;
        tables.references.get(&id).cloned().ok_or_else(|| not_found(id))
    }

    async fn update_reference(
        &self,
        snapshot: &mut MemorySnapshot,
        mut record: AchievementReference,
        expected_version: i64,
    ) -> Result<i64, StorageError> {
        let current_version = match snapshot.staged(record.id) {
            Some(staged) => staged.version,
            None => {
                let tables = self.tables.lock().await;
                tables
                    .references
                    .get(&record.id)
                    .map(|r| r.version)
                    .ok_or_else(|| not_found(record.id))?
            }
        };
        if current_version != expected_version {
            return Err(StorageError::ConcurrentConflict {
                reference_id: record.id.to_string(),
                expected_version,
            });
        }

        let new_version = expected_version + 1;
        record.version = new_version;

        if let Some(pending) = snapshot.inserts.iter_mut().find(|r| r.id == record.id) {
            *pending = record;
            return Ok(new_version);
        }
        // Keep the version this transaction originally read so commit can
        // detect writers that committed in between.
        let base_version = snapshot
            .updates
            .iter()
            .find(|(r, _)| r.id == record.id)
            .map(|(_, base)| *base)
            .unwrap_or(expected_version);
        snapshot.updates.retain(|(r, _)| r.id != record.id);
        snapshot.updates.push((record, base_version));
        Ok(new_version)
    }

    async fn insert_status_log(
        &self,
        snapshot: &mut MemorySnapshot,
        entry: StatusLogEntry,
    ) -> Result<(), StorageError> {
        let staged = snapshot.staged(entry.reference_id).is_some();
        if !staged {
            let tables = self.tables.lock().await;
            if !tables.references.contains_key(&entry.reference_id) {
                return Err(not_found(entry.reference_id));
            }
        }
        snapshot.logs.push(entry);
        Ok(())
    }

    async fn get_reference(&self, id: Uuid) -> Result<AchievementReference, StorageError> {
        let tables = self.tables.lock().await;
        tables.references.get(&id).cloned().ok_or_else(|| not_found(id))
    }

    async fn find_reference_by_content(
        &self,
        content_id: &ContentId,
    ) -> Result<Option<AchievementReference>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .references
            .values()
            .find(|r| r.content_id == *content_id)
            .cloned())
    }

    async fn list_references(
        &self,
        filter: &ReferenceFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AchievementReference>, StorageError> {
        let tables = self.tables.lock().await;
        let mut matching: Vec<AchievementReference> = tables
            .references
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| listing_order(a, b).then_with(|| a.id.cmp(&b.id)));
        Ok(matching
            .into_iter()
            .skip(usize::try_from(offset.max(0)).unwrap_or(usize::MAX))
            .take(usize::try_from(limit.max(0)).unwrap_or(usize::MAX))
            .collect())
    }

    async fn count_references(&self, filter: &ReferenceFilter) -> Result<i64, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables.references.values().filter(|r| filter.matches(r)).count() as i64)
    }

    async fn list_status_logs(
        &self,
        reference_id: Uuid,
    ) -> Result<Vec<StatusLogEntry>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .logs
            .iter()
            .filter(|l| l.reference_id == reference_id)
            .cloned()
            .collect())
    }
}
