/// All errors that can be returned by a prestasi store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Optimistic concurrency conflict: the reference was modified after it
    /// was read. The expected version no longer matches the stored one.
    #[error("concurrent conflict on reference {reference_id}: expected version {expected_version}")]
    ConcurrentConflict {
        reference_id: String,
        expected_version: i64,
    },

    /// No reference row with the given id.
    #[error("achievement reference not found: {reference_id}")]
    ReferenceNotFound { reference_id: String },

    /// No live content document with the given id (missing, malformed id, or
    /// soft-deleted).
    #[error("achievement content not found: {content_id}")]
    ContentNotFound { content_id: String },

    /// A record with this identity already exists.
    #[error("{what} already exists: {id}")]
    AlreadyExists { what: &'static str, id: String },

    /// A directory record (student, lecturer) named by a write is absent.
    #[error("{what} not found: {id}")]
    RecordNotFound { what: &'static str, id: String },

    /// A backend-specific error (I/O, serialization, connection, ...).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}
