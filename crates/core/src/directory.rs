//! Records owned by the user-management subsystem and read by the workflow.

use serde::{Deserialize, Serialize};

use crate::role::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub student_number: String,
    #[serde(default)]
    pub program_study: String,
    /// Lecturer id of the assigned advisor.
    #[serde(default)]
    pub advisor_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LecturerRecord {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub lecturer_number: String,
    #[serde(default)]
    pub department: String,
}
