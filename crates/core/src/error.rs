use serde::{Deserialize, Serialize};

/// Discriminant shared by every workflow failure.
///
/// Transport layers map on this, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidTransition,
    NotOwner,
    NotAdvisor,
    /// The caller's role does not allow the operation at all.
    Forbidden,
    NoAdvisorAssigned,
    Validation,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// Whether the failure is the caller's to fix (as opposed to ours).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ErrorKind::Internal)
    }
}
