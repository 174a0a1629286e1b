//! Achievement content: the free-form document held by the content store.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Length of a well-formed content identifier (12 bytes, hex encoded).
pub const CONTENT_ID_LEN: usize = 24;

/// Store-assigned identifier of a content document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Accepts exactly 24 hex digits; normalizes to lowercase.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() == CONTENT_ID_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(ContentId(raw.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        ContentId(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Open-ended, type-specific detail fields (competition rank, publisher, ...).
///
/// Opaque to the workflow; only the store and the API boundary look inside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Details(serde_json::Map<String, serde_json::Value>);

impl Details {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.0.insert(key.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Details {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Details(map)
    }
}

/// The recognized, caller-editable fields of an achievement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDraft {
    #[serde(default)]
    pub achievement_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub details: Details,
    #[serde(default)]
    pub points: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl AchievementDraft {
    /// Returns a human-readable reason when the draft cannot be stored.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is required".to_string());
        }
        if !self.points.is_finite() || self.points < 0.0 {
            return Err("points must be a non-negative number".to_string());
        }
        Ok(())
    }
}

/// File evidence attached to an achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

/// File extensions accepted for attachments.
pub const ALLOWED_ATTACHMENT_EXTENSIONS: [&str; 4] = ["pdf", "jpg", "jpeg", "png"];

/// Lowercased extension of `file_name` if it is in the allow-list.
pub fn allowed_attachment_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();
    ALLOWED_ATTACHMENT_EXTENSIONS
        .contains(&ext.as_str())
        .then_some(ext)
}

/// A content document as stored. Never hard-deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementContent {
    pub id: ContentId,
    pub student_id: String,
    pub achievement_type: String,
    pub title: String,
    pub description: String,
    pub details: Details,
    pub points: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl AchievementContent {
    /// Build a fresh document from a draft. The store assigns `id`.
    pub fn from_draft(
        id: ContentId,
        student_id: impl Into<String>,
        draft: AchievementDraft,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            student_id: student_id.into(),
            achievement_type: draft.achievement_type,
            title: draft.title,
            description: draft.description,
            details: draft.details,
            points: draft.points,
            tags: draft.tags,
            attachments: Vec::new(),
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the recognized fields, leaving identity, attachments and
    /// deletion state untouched.
    pub fn apply_draft(&mut self, draft: AchievementDraft, now: OffsetDateTime) {
        self.achievement_type = draft.achievement_type;
        self.title = draft.title;
        self.description = draft.description;
        self.details = draft.details;
        self.points = draft.points;
        self.tags = draft.tags;
        self.updated_at = now;
    }
}
