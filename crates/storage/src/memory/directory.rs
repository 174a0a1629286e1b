use std::sync::Arc;

use async_trait::async_trait;
use prestasi_core::{LecturerRecord, StudentRecord, UserRecord};
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::traits::Directory;

#[derive(Default)]
struct Records {
    users: Vec<UserRecord>,
    students: Vec<StudentRecord>,
    lecturers: Vec<LecturerRecord>,
}

/// In-memory [`Directory`], seeded at startup.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    records: Arc<RwLock<Records>>,
}

impl MemoryDirectory {
    pub fn new(
        users: Vec<UserRecord>,
        students: Vec<StudentRecord>,
        lecturers: Vec<LecturerRecord>,
    ) -> Self {
        Self {
            records: Arc::new(RwLock::new(Records {
                users,
                students,
                lecturers,
            })),
        }
    }

    pub async fn add_user(&self, user: UserRecord) {
        self.records.write().await.users.push(user);
    }

    pub async fn add_student(&self, student: StudentRecord) {
        self.records.write().await.students.push(student);
    }

    pub async fn add_lecturer(&self, lecturer: LecturerRecord) {
        self.records.write().await.lecturers.push(lecturer);
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_student(&self, student_id: &str) -> Result<Option<StudentRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records.students.iter().find(|s| s.id == student_id).cloned())
    }

    async fn find_student_by_user(
        &self,
        user_id: &str,
    ) -> Result<Option<StudentRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records.students.iter().find(|s| s.user_id == user_id).cloned())
    }

    async fn find_lecturer(
        &self,
        lecturer_id: &str,
    ) -> Result<Option<LecturerRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records.lecturers.iter().find(|l| l.id == lecturer_id).cloned())
    }

    async fn find_lecturer_by_user(
        &self,
        user_id: &str,
    ) -> Result<Option<LecturerRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records.lecturers.iter().find(|l| l.user_id == user_id).cloned())
    }

    async fn find_advisees(&self, lecturer_id: &str) -> Result<Vec<StudentRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .students
            .iter()
            .filter(|s| s.advisor_id.as_deref() == Some(lecturer_id))
            .cloned()
            .collect())
    }

    async fn assign_advisor(
        &self,
        student_id: &str,
        lecturer_id: &str,
    ) -> Result<StudentRecord, StorageError> {
        let mut records = self.records.write().await;
        if !records.lecturers.iter().any(|l| l.id == lecturer_id) {
            return Err(StorageError::RecordNotFound {
                what: "lecturer",
                id: lecturer_id.to_string(),
            });
        }
        let student = records
            .students
            .iter_mut()
            .find(|s| s.id == student_id)
            .ok_or_else(|| StorageError::RecordNotFound {
                what: "student",
                id: student_id.to_string(),
            })?;
        student.advisor_id = Some(lecturer_id.to_string());
        Ok(student.clone())
    }
}
