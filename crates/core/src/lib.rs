//! prestasi-core: domain model for the achievement (prestasi) workflow.
//!
//! Pure data and rules, no I/O:
//!
//! - [`AchievementStatus`] and the [`Transition`] table, with
//!   [`replay_status`] for audit-log reconstruction
//! - [`Role`] and [`Caller`], resolved once at the authentication boundary
//! - content, reference, status-log and directory records
//! - [`PageRequest`] clamping and [`Page`] results
//! - the [`ErrorKind`] taxonomy shared by every layer above

pub mod content;
pub mod directory;
pub mod error;
pub mod page;
pub mod reference;
pub mod role;
pub mod status;

// ── Convenience re-exports ───────────────────────────────────────────

pub use content::{
    allowed_attachment_extension, AchievementContent, AchievementDraft, Attachment, ContentId,
    Details, ALLOWED_ATTACHMENT_EXTENSIONS,
};
pub use directory::{LecturerRecord, StudentRecord, UserRecord};
pub use error::ErrorKind;
pub use page::{Page, PageRequest};
pub use reference::{AchievementEntry, AchievementReference, StatusLogEntry};
pub use role::{Caller, ParseRoleError, Role};
pub use status::{replay_status, AchievementStatus, ParseStatusError, ReplayError, Transition};
