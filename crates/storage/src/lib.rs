//! prestasi-storage: store contracts for the achievement workflow.
//!
//! Three durable collaborators sit behind traits: a document store for
//! achievement content ([`ContentStore`]), a transactional store for workflow
//! references and their status log ([`ReferenceStore`]), and the read-mostly
//! user/student/lecturer [`Directory`]. Attachment bytes go through a
//! [`FileStore`].
//!
//! In-memory backends live in [`memory`]; [`conformance`] holds the
//! backend-agnostic test suites.

pub mod conformance;
mod error;
mod files;
pub mod memory;
mod record;
mod traits;

pub use error::StorageError;
pub use files::{LocalFileStore, MemoryFileStore};
pub use record::{listing_order, ReferenceFilter, StoredFile};
pub use traits::{ContentStore, Directory, FileStore, ReferenceStore};
