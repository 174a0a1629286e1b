use std::cmp::Ordering;

use prestasi_core::{AchievementReference, AchievementStatus};
use serde::{Deserialize, Serialize};

/// Selection for reference listings and counts.
///
/// `student_ids: None` selects every student; `Some(vec![])` selects nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceFilter {
    pub student_ids: Option<Vec<String>>,
    pub status: Option<AchievementStatus>,
}

impl ReferenceFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn students(ids: Vec<String>) -> Self {
        Self {
            student_ids: Some(ids),
            status: None,
        }
    }

    pub fn with_status(mut self, status: Option<AchievementStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn matches(&self, reference: &AchievementReference) -> bool {
        let student_ok = match &self.student_ids {
            Some(ids) => ids.iter().any(|id| *id == reference.student_id),
            None => true,
        };
        let status_ok = self.status.map_or(true, |s| s == reference.status);
        student_ok && status_ok
    }
}

/// Listing order: `submitted_at` descending with unsubmitted rows last, then
/// `created_at` descending.
pub fn listing_order(a: &AchievementReference, b: &AchievementReference) -> Ordering {
    let submitted = match (a.submitted_at, b.submitted_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    submitted.then_with(|| b.created_at.cmp(&a.created_at))
}

/// Where a saved attachment file ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub file_name: String,
    /// Public URL path, e.g. `/uploads/achievements/<name>`.
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prestasi_core::ContentId;
    use time::{Duration, OffsetDateTime};

    fn reference(student: &str, created: i64, submitted: Option<i64>) -> AchievementReference {
        let base = OffsetDateTime::UNIX_EPOCH;
        let mut r = AchievementReference::new_draft(
            student,
            ContentId::from_bytes([0; 12]),
            base + Duration::seconds(created),
        );
        r.submitted_at = submitted.map(|s| base + Duration::seconds(s));
        r
    }

    #[test]
    fn submitted_first_newest_first_then_unsubmitted() {
        let mut refs = [
            reference("a", 1, None),
            reference("a", 2, Some(10)),
            reference("a", 3, None),
            reference("a", 4, Some(20)),
        ];
        refs.sort_by(listing_order);
        let created: Vec<i64> = refs
            .iter()
            .map(|r| (r.created_at - OffsetDateTime::UNIX_EPOCH).whole_seconds())
            .collect();
        assert_eq!(created, vec![4, 2, 3, 1]);
    }

    #[test]
    fn filter_semantics() {
        let r = reference("stu-1", 0, None);
        assert!(ReferenceFilter::all().matches(&r));
        assert!(!ReferenceFilter::students(vec![]).matches(&r));
        assert!(ReferenceFilter::students(vec!["stu-1".into()]).matches(&r));
        assert!(!ReferenceFilter::all()
            .with_status(Some(AchievementStatus::Verified))
            .matches(&r));
    }
}
