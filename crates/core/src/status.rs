//! Achievement status and the lifecycle transition table.
//!
//! The legal edges are:
//!
//! ```text
//! draft ──submit──▶ submitted ──verify──▶ verified
//!   │                    └─────reject──▶ rejected
//!   └──delete──▶ deleted
//! ```
//!
//! `verified`, `rejected` and `deleted` are terminal. There is no reopen or
//! resubmission edge.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::reference::StatusLogEntry;

/// Workflow status of an achievement reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementStatus {
    Draft,
    Submitted,
    Verified,
    Rejected,
    Deleted,
}

impl AchievementStatus {
    pub const ALL: [AchievementStatus; 5] = [
        AchievementStatus::Draft,
        AchievementStatus::Submitted,
        AchievementStatus::Verified,
        AchievementStatus::Rejected,
        AchievementStatus::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementStatus::Draft => "draft",
            AchievementStatus::Submitted => "submitted",
            AchievementStatus::Verified => "verified",
            AchievementStatus::Rejected => "rejected",
            AchievementStatus::Deleted => "deleted",
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AchievementStatus::Verified | AchievementStatus::Rejected | AchievementStatus::Deleted
        )
    }

    /// Whether `self -> next` is an edge of the transition table.
    pub fn can_transition_to(&self, next: AchievementStatus) -> bool {
        Transition::ALL
            .iter()
            .any(|t| t.from_status() == *self && t.to_status() == next)
    }
}

impl fmt::Display for AchievementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown achievement status '{0}'")]
pub struct ParseStatusError(pub String);

impl FromStr for AchievementStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(AchievementStatus::Draft),
            "submitted" => Ok(AchievementStatus::Submitted),
            "verified" => Ok(AchievementStatus::Verified),
            "rejected" => Ok(AchievementStatus::Rejected),
            "deleted" => Ok(AchievementStatus::Deleted),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// A named edge of the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Submit,
    Verify,
    Reject,
    DeleteDraft,
}

impl Transition {
    pub const ALL: [Transition; 4] = [
        Transition::Submit,
        Transition::Verify,
        Transition::Reject,
        Transition::DeleteDraft,
    ];

    /// The only status this transition may start from.
    pub fn from_status(&self) -> AchievementStatus {
        match self {
            Transition::Submit | Transition::DeleteDraft => AchievementStatus::Draft,
            Transition::Verify | Transition::Reject => AchievementStatus::Submitted,
        }
    }

    pub fn to_status(&self) -> AchievementStatus {
        match self {
            Transition::Submit => AchievementStatus::Submitted,
            Transition::Verify => AchievementStatus::Verified,
            Transition::Reject => AchievementStatus::Rejected,
            Transition::DeleteDraft => AchievementStatus::Deleted,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transition::Submit => "submit",
            Transition::Verify => "verify",
            Transition::Reject => "reject",
            Transition::DeleteDraft => "delete",
        }
    }
}

/// A log row that does not continue the walk it was replayed onto.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("log row {index} records {old} -> {new} but the replayed status was {current}")]
pub struct ReplayError {
    pub index: usize,
    pub current: AchievementStatus,
    pub old: AchievementStatus,
    pub new: AchievementStatus,
}

/// Replay status-log rows, in creation order, starting from `draft`.
///
/// Fails if a row's `old_status` does not match the status reached so far or
/// if a row records an edge that is not in the transition table.
pub fn replay_status(logs: &[StatusLogEntry]) -> Result<AchievementStatus, ReplayError> {
    let mut current = AchievementStatus::Draft;
    for (index, log) in logs.iter().enumerate() {
        if log.old_status != current || !current.can_transition_to(log.new_status) {
            return Err(ReplayError {
                index,
                current,
                old: log.old_status,
                new: log.new_status,
            });
        }
        current = log.new_status;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn log(old: AchievementStatus, new: AchievementStatus) -> StatusLogEntry {
        StatusLogEntry {
            id: Uuid::new_v4(),
            reference_id: Uuid::nil(),
            old_status: old,
            new_status: new,
            changed_by: "user-1".to_string(),
            note: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn only_table_edges_are_legal() {
        use AchievementStatus::*;
        let legal = [
            (Draft, Submitted),
            (Draft, Deleted),
            (Submitted, Verified),
            (Submitted, Rejected),
        ];
        for from in AchievementStatus::ALL {
            for to in AchievementStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn terminal_statuses_have_no_outgoing_edges() {
        for from in AchievementStatus::ALL.iter().filter(|s| s.is_terminal()) {
            assert!(AchievementStatus::ALL
                .iter()
                .all(|to| !from.can_transition_to(*to)));
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_rejects_unknown() {
        assert_eq!(
            "Submitted".parse::<AchievementStatus>().unwrap(),
            AchievementStatus::Submitted
        );
        assert!("archived".parse::<AchievementStatus>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&AchievementStatus::Rejected).unwrap();
        assert_eq!(json, "\"rejected\"");
    }

    #[test]
    fn replay_reconstructs_walk() {
        use AchievementStatus::*;
        assert_eq!(replay_status(&[]).unwrap(), Draft);
        let logs = vec![log(Draft, Submitted), log(Submitted, Verified)];
        assert_eq!(replay_status(&logs).unwrap(), Verified);
    }

    #[test]
    fn replay_rejects_skipped_edge() {
        use AchievementStatus::*;
        let logs = vec![log(Draft, Submitted), log(Draft, Deleted)];
        let err = replay_status(&logs).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.current, Submitted);

        let err = replay_status(&[log(Draft, Verified)]).unwrap_err();
        assert_eq!(err.index, 0);
    }
}
