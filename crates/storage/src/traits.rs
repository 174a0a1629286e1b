use async_trait::async_trait;
use prestasi_core::{
    AchievementContent, AchievementDraft, AchievementReference, Attachment, ContentId,
    LecturerRecord, StatusLogEntry, StudentRecord, UserRecord,
};
use uuid::Uuid;

use crate::error::StorageError;
use crate::record::{ReferenceFilter, StoredFile};

/// Document store for achievement content.
///
/// All reads exclude soft-deleted documents except [`find_deleted_by_student`]
/// (and `find_by_student` with `include_deleted`). There is no hard delete.
///
/// [`find_deleted_by_student`]: ContentStore::find_deleted_by_student
#[async_trait]
pub trait ContentStore: Send + Sync + 'static {
    /// Store a new document for `student_id`. The store assigns the id and
    /// both timestamps.
    async fn create(
        &self,
        student_id: &str,
        draft: AchievementDraft,
    ) -> Result<AchievementContent, StorageError>;

    /// Documents owned by `student_id`, in creation order.
    async fn find_by_student(
        &self,
        student_id: &str,
        include_deleted: bool,
    ) -> Result<Vec<AchievementContent>, StorageError>;

    /// Only the soft-deleted documents owned by `student_id`.
    async fn find_deleted_by_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<AchievementContent>, StorageError>;

    /// Returns `Err(StorageError::ContentNotFound)` for missing or
    /// soft-deleted documents.
    async fn find_by_id(&self, id: &ContentId) -> Result<AchievementContent, StorageError>;

    /// Batch lookup. Ids that are malformed, missing, or soft-deleted are
    /// silently omitted.
    async fn find_by_ids(&self, ids: &[&str]) -> Result<Vec<AchievementContent>, StorageError>;

    /// Flag the document deleted and stamp `deleted_at`. Deleting an already
    /// deleted document succeeds and keeps the first stamp; unknown ids are
    /// `ContentNotFound`.
    async fn soft_delete(&self, id: &ContentId) -> Result<(), StorageError>;

    async fn append_attachment(
        &self,
        id: &ContentId,
        attachment: Attachment,
    ) -> Result<(), StorageError>;

    /// Replace the recognized fields of a live document.
    async fn update(
        &self,
        id: &ContentId,
        draft: AchievementDraft,
    ) -> Result<AchievementContent, StorageError>;
}

/// Transactional store for workflow references and their status log.
///
/// ## Snapshot Semantics
///
/// All mutating operations take `&mut Self::Snapshot`, an in-progress
/// transaction:
///
/// 1. `begin_snapshot()` starts one
/// 2. mutating methods are called with `&mut snapshot`
/// 3. `commit_snapshot(snapshot)` makes every staged write durable at once,
///    or `abort_snapshot(snapshot)` discards them
///
/// A snapshot dropped without commit is rolled back.
///
/// ## OCC Conflict Detection
///
/// `update_reference` is conditional on `version = expected_version`. A
/// mismatch returns `Err(StorageError::ConcurrentConflict)`, either from the
/// update call itself or from `commit_snapshot` if another writer committed
/// in between.
///
/// ## Atomic audit
///
/// A status change and its log row are written in the same snapshot, so a
/// committed reference status always has its log row and vice versa.
#[async_trait]
pub trait ReferenceStore: Send + Sync + 'static {
    type Snapshot: Send;

    // ── Snapshot lifecycle ────────────────────────────────────────────────────

    async fn begin_snapshot(&self) -> Result<Self::Snapshot, StorageError>;

    async fn commit_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    async fn abort_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    // ── Mutations (within snapshot) ──────────────────────────────────────────

    /// Stage a new reference. Its `version` must be 0.
    ///
    /// Returns `Err(StorageError::AlreadyExists)` if the id is taken or the
    /// content document already has a reference.
    async fn insert_reference(
        &self,
        snapshot: &mut Self::Snapshot,
        record: AchievementReference,
    ) -> Result<(), StorageError>;

    /// Read a reference as seen by this snapshot.
    async fn get_reference_for_update(
        &self,
        snapshot: &mut Self::Snapshot,
        id: Uuid,
    ) -> Result<AchievementReference, StorageError>;

    /// Version-validated replacement of a reference row.
    ///
    /// Returns the new version (`expected_version + 1`) on success.
    async fn update_reference(
        &self,
        snapshot: &mut Self::Snapshot,
        record: AchievementReference,
        expected_version: i64,
    ) -> Result<i64, StorageError>;

    /// Append an audit row. The reference must exist, committed or staged in
    /// the same snapshot.
    async fn insert_status_log(
        &self,
        snapshot: &mut Self::Snapshot,
        entry: StatusLogEntry,
    ) -> Result<(), StorageError>;

    // ── Queries (outside snapshot) ───────────────────────────────────────────

    async fn get_reference(&self, id: Uuid) -> Result<AchievementReference, StorageError>;

    async fn find_reference_by_content(
        &self,
        content_id: &ContentId,
    ) -> Result<Option<AchievementReference>, StorageError>;

    /// Matching references in listing order (see [`crate::listing_order`]).
    async fn list_references(
        &self,
        filter: &ReferenceFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AchievementReference>, StorageError>;

    async fn count_references(&self, filter: &ReferenceFilter) -> Result<i64, StorageError>;

    /// Audit rows for one reference in creation order.
    async fn list_status_logs(&self, reference_id: Uuid)
        -> Result<Vec<StatusLogEntry>, StorageError>;
}

/// Read access to users, students and lecturers, plus advisor assignment.
#[async_trait]
pub trait Directory: Send + Sync + 'static {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>, StorageError>;

    async fn find_student(&self, student_id: &str) -> Result<Option<StudentRecord>, StorageError>;

    async fn find_student_by_user(
        &self,
        user_id: &str,
    ) -> Result<Option<StudentRecord>, StorageError>;

    async fn find_lecturer(
        &self,
        lecturer_id: &str,
    ) -> Result<Option<LecturerRecord>, StorageError>;

    async fn find_lecturer_by_user(
        &self,
        user_id: &str,
    ) -> Result<Option<LecturerRecord>, StorageError>;

    /// Students whose assigned advisor is `lecturer_id`.
    async fn find_advisees(&self, lecturer_id: &str) -> Result<Vec<StudentRecord>, StorageError>;

    async fn assign_advisor(
        &self,
        student_id: &str,
        lecturer_id: &str,
    ) -> Result<StudentRecord, StorageError>;
}

/// Blob storage for attachment files.
#[async_trait]
pub trait FileStore: Send + Sync + 'static {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<StoredFile, StorageError>;

    async fn remove(&self, file_name: &str) -> Result<(), StorageError>;
}
