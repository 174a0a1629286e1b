use std::future::Future;
use std::sync::Arc;

use prestasi_core::AchievementStatus;

use super::{make_log, make_reference, seed_reference, TestResult};
use crate::{ReferenceStore, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "concurrent_updates_exactly_one_wins",
            concurrent_updates_exactly_one_wins(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_updates_different_references_all_succeed",
            concurrent_updates_different_references_all_succeed(factory).await,
        ),
    ]
}

/// Outcome of one racing task: `true` if its commit landed.
///
/// Every racer claims to have read `read_version`, as if all of them loaded
/// the row before any of them wrote.
async fn race_once<S: ReferenceStore>(
    s: Arc<S>,
    id: uuid::Uuid,
    read_version: i64,
    to: AchievementStatus,
    actor: String,
) -> Result<bool, StorageError> {
    let mut snap = s.begin_snapshot().await?;
    let mut current = s.get_reference_for_update(&mut snap, id).await?;
    let from = current.status;
    current.status = to;
    if let Err(e) = s.update_reference(&mut snap, current, read_version).await {
        let _ = s.abort_snapshot(snap).await;
        return match e {
            StorageError::ConcurrentConflict { .. } => Ok(false),
            other => Err(other),
        };
    }
    let mut entry = make_log(id, from, to);
    entry.changed_by = actor;
    s.insert_status_log(&mut snap, entry).await?;
    match s.commit_snapshot(snap).await {
        Ok(()) => Ok(true),
        Err(StorageError::ConcurrentConflict { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

// ── Concurrent update: exactly one wins ─────────────────────────────────────

/// N tasks race to move the same reference out of version 0. Exactly one
/// commit lands; the rest get ConcurrentConflict, and exactly one log row is
/// written.
async fn concurrent_updates_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let record = make_reference("stu-1", 1);
    let id = record.id;
    seed_reference(storage.as_ref(), record).await?;

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(race_once(
            s,
            id,
            0,
            AchievementStatus::Submitted,
            format!("user-{i}"),
        )));
    }

    let mut winners = 0usize;
    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("storage error: {e}"))?;
        if won {
            winners += 1;
        }
    }
    if winners != 1 {
        return Err(format!("expected exactly 1 winner, got {winners}"));
    }

    let stored = storage
        .get_reference(id)
        .await
        .map_err(|e| format!("get: {e}"))?;
    if stored.version != 1 {
        return Err(format!("expected version 1, got {}", stored.version));
    }
    let logs = storage
        .list_status_logs(id)
        .await
        .map_err(|e| format!("list: {e}"))?;
    if logs.len() != 1 {
        return Err(format!("expected 1 log row, got {}", logs.len()));
    }
    Ok(())
}

// ── Concurrent updates to different references: all succeed ─────────────────

async fn concurrent_updates_different_references_all_succeed<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let mut ids = Vec::new();
    for i in 0..N {
        let record = make_reference(&format!("stu-{i}"), i as u8);
        ids.push(record.id);
        seed_reference(storage.as_ref(), record).await?;
    }

    let mut handles = Vec::new();
    for (i, id) in ids.iter().enumerate() {
        handles.push(tokio::spawn(race_once(
            storage.clone(),
            *id,
            0,
            AchievementStatus::Submitted,
            format!("user-{i}"),
        )));
    }
    for (i, handle) in handles.into_iter().enumerate() {
        let won = handle
            .await
            .map_err(|e| format!("task {i} panic: {e}"))?
            .map_err(|e| format!("task {i} failed: {e}"))?;
        if !won {
            return Err(format!("task {i} saw a false conflict"));
        }
    }

    for id in ids {
        let stored = storage
            .get_reference(id)
            .await
            .map_err(|e| format!("get {id}: {e}"))?;
        if stored.status != AchievementStatus::Submitted || stored.version != 1 {
            return Err(format!(
                "{id}: expected submitted v1, got {} v{}",
                stored.status, stored.version
            ));
        }
    }
    Ok(())
}
