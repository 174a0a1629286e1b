//! Workflow records: the authoritative reference row and its audit log.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::content::{AchievementContent, ContentId};
use crate::status::AchievementStatus;

/// The workflow record of one achievement.
///
/// `version` starts at 0 and is bumped by the store on every successful
/// conditional update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementReference {
    pub id: Uuid,
    pub student_id: String,
    #[serde(rename = "mongo_achievement_id")]
    pub content_id: ContentId,
    pub status: AchievementStatus,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub submitted_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub verified_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub verified_by: Option<String>,
    #[serde(default)]
    pub rejection_note: Option<String>,
    #[serde(default)]
    pub version: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl AchievementReference {
    /// A fresh `draft` reference pointing at `content_id`.
    pub fn new_draft(student_id: impl Into<String>, content_id: ContentId, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id: student_id.into(),
            content_id,
            status: AchievementStatus::Draft,
            submitted_at: None,
            verified_at: None,
            verified_by: None,
            rejection_note: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One append-only audit row per status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusLogEntry {
    pub id: Uuid,
    #[serde(rename = "achievement_ref_id")]
    pub reference_id: Uuid,
    pub old_status: AchievementStatus,
    pub new_status: AchievementStatus,
    pub changed_by: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl StatusLogEntry {
    pub fn new(
        reference_id: Uuid,
        old_status: AchievementStatus,
        new_status: AchievementStatus,
        changed_by: impl Into<String>,
        note: Option<String>,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference_id,
            old_status,
            new_status,
            changed_by: changed_by.into(),
            note,
            created_at: now,
        }
    }
}

/// A reference joined with its content. `achievement` is `None` when the
/// content document is missing or soft-deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementEntry {
    pub reference: AchievementReference,
    pub achievement: Option<AchievementContent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_wire_names_are_snake_case() {
        let content_id = ContentId::from_bytes([1; 12]);
        let reference =
            AchievementReference::new_draft("stu-1", content_id.clone(), OffsetDateTime::UNIX_EPOCH);
        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json["student_id"], "stu-1");
        assert_eq!(json["mongo_achievement_id"], content_id.as_str());
        assert_eq!(json["status"], "draft");
        assert!(json["submitted_at"].is_null());
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
        assert_eq!(json["version"], 0);
    }
}
