//! Conformance test suites for store implementations.
//!
//! Backend-agnostic checks that any [`ReferenceStore`] or [`ContentStore`]
//! implementation can run to verify correctness. The reference suite covers:
//!
//! - **Insert**: reference creation, duplicate detection, one reference per content
//! - **Snapshot isolation**: uncommitted writes invisible, committed writes visible
//! - **Atomic commit**: reference update and status-log row land together or not at all
//! - **Version validation / OCC**: optimistic concurrency conflict detection
//! - **Audit log**: append-only rows in creation order, bound to an existing reference
//! - **Queries**: filters, listing order, pagination, counts
//! - **Error handling**: correct error variants for invalid operations
//! - **Concurrency**: racing writers on one reference, exactly one wins
//!
//! The content suite covers soft-delete visibility, batch lookup and
//! attachment/update behaviour.
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty store for each test:
//!
//! ```ignore
//! use prestasi_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn postgres_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_postgres_store().await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod audit;
mod commit;
mod concurrent;
mod content;
mod error;
mod init;
mod query;
mod snapshot;
mod version;

use std::fmt;
use std::future::Future;

use prestasi_core::{AchievementReference, AchievementStatus, ContentId, StatusLogEntry};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{ContentStore, ReferenceStore};

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "insert", "snapshot", "commit").
    pub category: String,
    /// Test name (e.g. "insert_starts_at_version_0").
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl ConformanceReport {
    fn from_results(results: Vec<TestResult>) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        let total = results.len();
        ConformanceReport {
            results,
            passed,
            failed: total - passed,
            total,
        }
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full reference-store suite.
///
/// The `factory` function is called once per test to create a fresh, empty
/// store instance, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(init::run_init_tests(&factory).await);
    results.extend(error::run_error_tests(&factory).await);
    results.extend(snapshot::run_snapshot_tests(&factory).await);
    results.extend(commit::run_commit_tests(&factory).await);
    results.extend(version::run_version_tests(&factory).await);
    results.extend(audit::run_audit_tests(&factory).await);
    results.extend(query::run_query_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    ConformanceReport::from_results(results)
}

/// Run the content-store suite.
pub async fn run_content_conformance_suite<C, F, Fut>(factory: F) -> ConformanceReport
where
    C: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = C>,
{
    ConformanceReport::from_results(content::run_content_tests(&factory).await)
}

// ── Helpers: record constructors with sensible defaults ──────────────────────

fn make_reference(student_id: &str, seed: u8) -> AchievementReference {
    AchievementReference::new_draft(
        student_id,
        ContentId::from_bytes([seed; 12]),
        OffsetDateTime::now_utc(),
    )
}

fn make_log(
    reference_id: Uuid,
    old_status: AchievementStatus,
    new_status: AchievementStatus,
) -> StatusLogEntry {
    StatusLogEntry::new(
        reference_id,
        old_status,
        new_status,
        "user-test",
        None,
        OffsetDateTime::now_utc(),
    )
}

/// Insert and commit `record` in its own snapshot.
async fn seed_reference<S: ReferenceStore>(
    store: &S,
    record: AchievementReference,
) -> Result<(), String> {
    let mut snap = store
        .begin_snapshot()
        .await
        .map_err(|e| format!("begin: {e}"))?;
    store
        .insert_reference(&mut snap, record)
        .await
        .map_err(|e| format!("insert: {e}"))?;
    store
        .commit_snapshot(snap)
        .await
        .map_err(|e| format!("commit insert: {e}"))
}

/// Apply one status change plus its log row from `expected_version` and
/// commit.
async fn apply_transition<S: ReferenceStore>(
    store: &S,
    id: Uuid,
    expected_version: i64,
    to: AchievementStatus,
) -> Result<i64, String> {
    let mut snap = store
        .begin_snapshot()
        .await
        .map_err(|e| format!("begin: {e}"))?;
    let mut current = store
        .get_reference_for_update(&mut snap, id)
        .await
        .map_err(|e| format!("get_for_update: {e}"))?;
    let from = current.status;
    current.status = to;
    let new_version = store
        .update_reference(&mut snap, current, expected_version)
        .await
        .map_err(|e| format!("update: {e}"))?;
    store
        .insert_status_log(&mut snap, make_log(id, from, to))
        .await
        .map_err(|e| format!("log: {e}"))?;
    store
        .commit_snapshot(snap)
        .await
        .map_err(|e| format!("commit: {e}"))?;
    Ok(new_version)
}
