//! Shared fixture: a small faculty with two advisors, three students and an
//! admin, wired to in-memory stores.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use prestasi_core::{
    AchievementDraft, AchievementReference, AchievementStatus, Caller, ContentId, LecturerRecord,
    Role, StatusLogEntry, StudentRecord, UserRecord,
};
use prestasi_storage::memory::{
    MemoryContentStore, MemoryDirectory, MemoryReferenceStore, MemorySnapshot,
};
use prestasi_storage::{MemoryFileStore, ReferenceFilter, ReferenceStore, StorageError};
use prestasi_workflow::WorkflowEngine;
use uuid::Uuid;

pub struct Harness<R: ReferenceStore> {
    pub engine: Arc<WorkflowEngine<R>>,
    pub contents: MemoryContentStore,
    pub directory: MemoryDirectory,
    pub files: MemoryFileStore,
}

pub fn harness() -> Harness<MemoryReferenceStore> {
    harness_with(MemoryReferenceStore::new())
}

pub fn harness_with<R: ReferenceStore>(references: R) -> Harness<R> {
    let contents = MemoryContentStore::new();
    let directory = seeded_directory();
    let files = MemoryFileStore::new("/uploads/achievements");
    let engine = WorkflowEngine::new(
        Arc::new(contents.clone()),
        Arc::new(references),
        Arc::new(directory.clone()),
        Arc::new(files.clone()),
    );
    Harness {
        engine: Arc::new(engine),
        contents,
        directory,
        files,
    }
}

fn user(id: &str, role: Role) -> UserRecord {
    UserRecord {
        id: id.to_string(),
        username: id.to_string(),
        full_name: String::new(),
        role,
    }
}

fn student(id: &str, user_id: &str, advisor: Option<&str>) -> StudentRecord {
    StudentRecord {
        id: id.to_string(),
        user_id: user_id.to_string(),
        student_number: format!("NIM-{id}"),
        program_study: "Informatika".to_string(),
        advisor_id: advisor.map(str::to_string),
    }
}

fn lecturer(id: &str, user_id: &str) -> LecturerRecord {
    LecturerRecord {
        id: id.to_string(),
        user_id: user_id.to_string(),
        lecturer_number: format!("NIP-{id}"),
        department: "Informatika".to_string(),
    }
}

/// - `u-stu` / `s1`, advised by `l1` (`u-adv`)
/// - `u-stu2` / `s2`, advised by `l2` (`u-adv2`)
/// - `u-stu3` / `s3`, no advisor
/// - `u-admin`
/// - `u-dosen`: a lecturer record whose user is a student account
pub fn seeded_directory() -> MemoryDirectory {
    MemoryDirectory::new(
        vec![
            user("u-stu", Role::Student),
            user("u-stu2", Role::Student),
            user("u-stu3", Role::Student),
            user("u-adv", Role::Advisor),
            user("u-adv2", Role::Advisor),
            user("u-admin", Role::Admin),
            user("u-dosen", Role::Student),
        ],
        vec![
            student("s1", "u-stu", Some("l1")),
            student("s2", "u-stu2", Some("l2")),
            student("s3", "u-stu3", None),
        ],
        vec![
            lecturer("l1", "u-adv"),
            lecturer("l2", "u-adv2"),
            lecturer("l3", "u-dosen"),
        ],
    )
}

pub fn student_caller() -> Caller {
    Caller::new("u-stu", "u-stu", Role::Student)
}

pub fn other_student() -> Caller {
    Caller::new("u-stu2", "u-stu2", Role::Student)
}

pub fn unadvised_student() -> Caller {
    Caller::new("u-stu3", "u-stu3", Role::Student)
}

pub fn advisor() -> Caller {
    Caller::new("u-adv", "u-adv", Role::Advisor)
}

pub fn other_advisor() -> Caller {
    Caller::new("u-adv2", "u-adv2", Role::Advisor)
}

pub fn admin() -> Caller {
    Caller::new("u-admin", "u-admin", Role::Admin)
}

pub fn draft(title: &str) -> AchievementDraft {
    let mut draft = AchievementDraft {
        achievement_type: "competition".to_string(),
        title: title.to_string(),
        description: "Juara 1 lomba pemrograman".to_string(),
        points: 50.0,
        tags: vec!["programming".to_string()],
        ..Default::default()
    };
    draft
        .details
        .insert("competitionLevel", serde_json::json!("national"));
    draft
}

/// Reference store whose commits can be made to fail on demand, and which
/// can submit a draft behind the reader's back right after a read.
#[derive(Clone, Default)]
pub struct FlakyReferenceStore {
    inner: MemoryReferenceStore,
    fail_commits: Arc<AtomicBool>,
    submit_after_read: Arc<AtomicBool>,
}

impl FlakyReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_commits.store(failing, Ordering::SeqCst);
    }

    /// The next `get_reference` returns the draft it read, then the stored
    /// reference is moved to `submitted`.
    pub fn submit_after_next_read(&self) {
        self.submit_after_read.store(true, Ordering::SeqCst);
    }

    async fn submit_behind(&self, reference: &AchievementReference) -> Result<(), StorageError> {
        let mut snap = self.inner.begin_snapshot().await?;
        let mut current = self.inner.get_reference_for_update(&mut snap, reference.id).await?;
        let expected = current.version;
        current.status = AchievementStatus::Submitted;
        self.inner.update_reference(&mut snap, current, expected).await?;
        self.inner.commit_snapshot(snap).await
    }
}

#[async_trait]
impl ReferenceStore for FlakyReferenceStore {
    type Snapshot = MemorySnapshot;

    async fn begin_snapshot(&self) -> Result<MemorySnapshot, StorageError> {
        self.inner.begin_snapshot().await
    }

    async fn commit_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("connection reset".to_string()));
        }
        self.inner.commit_snapshot(snapshot).await
    }

    async fn abort_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        self.inner.abort_snapshot(snapshot).await
    }

    async fn insert_reference(
        &self,
        snapshot: &mut MemorySnapshot,
        record: AchievementReference,
    ) -> Result<(), StorageError> {
        self.inner.insert_reference(snapshot, record).await
    }

    async fn get_reference_for_update(
        &self,
        snapshot: &mut MemorySnapshot,
        id: Uuid,
    ) -> Result<AchievementReference, StorageError> {
        self.inner.get_reference_for_update(snapshot, id).await
    }

    async fn update_reference(
        &self,
        snapshot: &mut MemorySnapshot,
        record: AchievementReference,
        expected_version: i64,
    ) -> Result<i64, StorageError> {
        self.inner
            .update_reference(snapshot, record, expected_version)
            .await
    }

    async fn insert_status_log(
        &self,
        snapshot: &mut MemorySnapshot,
        entry: StatusLogEntry,
    ) -> Result<(), StorageError> {
        self.inner.insert_status_log(snapshot, entry).await
    }

    async fn get_reference(&self, id: Uuid) -> Result<AchievementReference, StorageError> {
        let reference = self.inner.get_reference(id).await?;
        if self.submit_after_read.swap(false, Ordering::SeqCst) {
            self.submit_behind(&reference).await?;
        }
        Ok(reference)
    }

    async fn find_reference_by_content(
        &self,
        content_id: &ContentId,
    ) -> Result<Option<AchievementReference>, StorageError> {
        self.inner.find_reference_by_content(content_id).await
    }

    async fn list_references(
        &self,
        filter: &ReferenceFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AchievementReference>, StorageError> {
        self.inner.list_references(filter, limit, offset).await
    }

    async fn count_references(&self, filter: &ReferenceFilter) -> Result<i64, StorageError> {
        self.inner.count_references(filter).await
    }

    async fn list_status_logs(
        &self,
        reference_id: Uuid,
    ) -> Result<Vec<StatusLogEntry>, StorageError> {
        self.inner.list_status_logs(reference_id).await
    }
}
