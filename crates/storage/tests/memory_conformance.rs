//! Runs the storage conformance suites against the in-memory backends.

use prestasi_storage::conformance::{run_conformance_suite, run_content_conformance_suite};
use prestasi_storage::memory::{MemoryContentStore, MemoryReferenceStore};

#[tokio::test]
async fn memory_reference_store_conformance() {
    let report = run_conformance_suite(|| async { MemoryReferenceStore::new() }).await;
    assert!(report.total > 0);
    assert_eq!(report.failed, 0, "{report}");
}

#[tokio::test]
async fn memory_content_store_conformance() {
    let report = run_content_conformance_suite(|| async { MemoryContentStore::new() }).await;
    assert!(report.total > 0);
    assert_eq!(report.failed, 0, "{report}");
}
