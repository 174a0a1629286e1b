//! Snapshot isolation conformance tests.
//!
//! Verifies that uncommitted writes are invisible outside a snapshot,
//! committed writes are visible, and aborted writes are discarded.

use std::future::Future;

use prestasi_core::AchievementStatus;

use super::{make_reference, seed_reference, TestResult};
use crate::{ReferenceFilter, ReferenceStore, StorageError};

pub(super) async fn run_snapshot_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "snapshot",
            "uncommitted_insert_invisible",
            uncommitted_insert_invisible(factory).await,
        ),
        TestResult::from_result(
            "snapshot",
            "uncommitted_update_invisible",
            uncommitted_update_invisible(factory).await,
        ),
        TestResult::from_result(
            "snapshot",
            "snapshot_reads_its_own_writes",
            snapshot_reads_its_own_writes(factory).await,
        ),
        TestResult::from_result(
            "snapshot",
            "abort_discards_insert",
            abort_discards_insert(factory).await,
        ),
        TestResult::from_result(
            "snapshot",
            "abort_discards_update",
            abort_discards_update(factory).await,
        ),
    ]
}

async fn uncommitted_insert_invisible<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = make_reference("stu-1", 1);
    let id = record.id;
    let mut snap = s.begin_snapshot().await.map_err(|e| format!("begin: {e}"))?;
    s.insert_reference(&mut snap, record)
        .await
        .map_err(|e| format!("insert: {e}"))?;

    let visible = s.get_reference(id).await;
    let count = s
        .count_references(&ReferenceFilter::all())
        .await
        .map_err(|e| format!("count: {e}"))?;
    let _ = s.abort_snapshot(snap).await;

    match visible {
        Err(StorageError::ReferenceNotFound { .. }) => {}
        other => return Err(format!("uncommitted insert visible: {:?}", other)),
    }
    if count != 0 {
        return Err(format!("uncommitted insert counted: {count}"));
    }
    Ok(())
}

async fn uncommitted_update_invisible<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = make_reference("stu-1", 1);
    let id = record.id;
    seed_reference(&s, record).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| format!("begin: {e}"))?;
    let mut current = s
        .get_reference_for_update(&mut snap, id)
        .await
        .map_err(|e| format!("get_for_update: {e}"))?;
    current.status = AchievementStatus::Submitted;
    s.update_reference(&mut snap, current, 0)
        .await
        .map_err(|e| format!("update: {e}"))?;

    let outside = s.get_reference(id).await.map_err(|e| format!("get: {e}"))?;
    let _ = s.abort_snapshot(snap).await;
    if outside.status != AchievementStatus::Draft || outside.version != 0 {
        return Err(format!(
            "uncommitted update visible: {} v{}",
            outside.status, outside.version
        ));
    }
    Ok(())
}

async fn snapshot_reads_its_own_writes<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = make_reference("stu-1", 1);
    let id = record.id;
    seed_reference(&s, record).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| format!("begin: {e}"))?;
    let mut current = s
        .get_reference_for_update(&mut snap, id)
        .await
        .map_err(|e| format!("get_for_update: {e}"))?;
    current.status = AchievementStatus::Submitted;
    s.update_reference(&mut snap, current, 0)
        .await
        .map_err(|e| format!("update: {e}"))?;
    let inside = s
        .get_reference_for_update(&mut snap, id)
        .await
        .map_err(|e| format!("re-read: {e}"))?;
    let _ = s.abort_snapshot(snap).await;

    if inside.status != AchievementStatus::Submitted || inside.version != 1 {
        return Err(format!(
            "snapshot did not see its own write: {} v{}",
            inside.status, inside.version
        ));
    }
    Ok(())
}

async fn abort_discards_insert<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = make_reference("stu-1", 1);
    let id = record.id;
    let mut snap = s.begin_snapshot().await.map_err(|e| format!("begin: {e}"))?;
    s.insert_reference(&mut snap, record)
        .await
        .map_err(|e| format!("insert: {e}"))?;
    s.abort_snapshot(snap)
        .await
        .map_err(|e| format!("abort: {e}"))?;

    match s.get_reference(id).await {
        Err(StorageError::ReferenceNotFound { .. }) => Ok(()),
        other => Err(format!("aborted insert visible: {:?}", other)),
    }
}

async fn abort_discards_update<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = make_reference("stu-1", 1);
    let id = record.id;
    seed_reference(&s, record).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| format!("begin: {e}"))?;
    let mut current = s
        .get_reference_for_update(&mut snap, id)
        .await
        .map_err(|e| format!("get_for_update: {e}"))?;
    current.status = AchievementStatus::Deleted;
    s.update_reference(&mut snap, current, 0)
        .await
        .map_err(|e| format!("update: {e}"))?;
    s.abort_snapshot(snap)
        .await
        .map_err(|e| format!("abort: {e}"))?;

    let stored = s.get_reference(id).await.map_err(|e| format!("get: {e}"))?;
    if stored.status != AchievementStatus::Draft || stored.version != 0 {
        return Err(format!(
            "aborted update visible: {} v{}",
            stored.status, stored.version
        ));
    }
    Ok(())
}
