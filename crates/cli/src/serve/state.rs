//! Application state shared across request handlers.

use ed25519_dalek::VerifyingKey;
use prestasi_storage::memory::MemoryReferenceStore;
use prestasi_workflow::WorkflowEngine;

pub(crate) type Engine = WorkflowEngine<MemoryReferenceStore>;

pub(crate) struct AppState {
    pub(crate) engine: Engine,
    /// Verifies bearer tokens.
    pub(crate) verifying_key: VerifyingKey,
}
