//! Atomic commit conformance tests.
//!
//! A status change and its audit row are staged in one snapshot; the commit
//! must apply both or neither.

use std::future::Future;

use prestasi_core::AchievementStatus;

use super::{make_log, make_reference, seed_reference, TestResult};
use crate::{ReferenceStore, StorageError};

pub(super) async fn run_commit_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "commit",
            "update_and_log_commit_together",
            update_and_log_commit_together(factory).await,
        ),
        TestResult::from_result(
            "commit",
            "abort_discards_update_and_log",
            abort_discards_update_and_log(factory).await,
        ),
        TestResult::from_result(
            "commit",
            "conflicting_commit_applies_nothing",
            conflicting_commit_applies_nothing(factory).await,
        ),
        TestResult::from_result(
            "commit",
            "insert_and_log_in_one_snapshot",
            insert_and_log_in_one_snapshot(factory).await,
        ),
    ]
}

async fn update_and_log_commit_together<S, F, Fut>(factory: &F) -> Result<(), String>
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
    s.insert_status_log(
        &mut snap,
        make_log(id, AchievementStatus::Draft, AchievementStatus::Submitted),
    )
    .await
    .map_err(|e| format!("log: {e}"))?;

    let logs_before = s
        .list_status_logs(id)
        .await
        .map_err(|e| format!("list before: {e}"))?;
    if !logs_before.is_empty() {
        return Err("log row visible before commit".to_string());
    }

    s.commit_snapshot(snap)
        .await
        .map_err(|e| format!("commit: {e}"))?;

    let stored = s.get_reference(id).await.map_err(|e| format!("get: {e}"))?;
    let logs = s
        .list_status_logs(id)
        .await
        .map_err(|e| format!("list: {e}"))?;
    if stored.status != AchievementStatus::Submitted {
        return Err(format!("expected submitted, got {}", stored.status));
    }
    if logs.len() != 1 {
        return Err(format!("expected 1 log row, got {}", logs.len()));
    }
    Ok(())
}

async fn abort_discards_update_and_log<S, F, Fut>(factory: &F) -> Result<(), String>
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
    s.insert_status_log(
        &mut snap,
        make_log(id, AchievementStatus::Draft, AchievementStatus::Submitted),
    )
    .await
    .map_err(|e| format!("log: {e}"))?;
    s.abort_snapshot(snap)
        .await
        .map_err(|e| format!("abort: {e}"))?;

    let stored = s.get_reference(id).await.map_err(|e| format!("get: {e}"))?;
    let logs = s
        .list_status_logs(id)
        .await
        .map_err(|e| format!("list: {e}"))?;
    if stored.status != AchievementStatus::Draft || !logs.is_empty() {
        return Err(format!(
            "abort leaked writes: status {}, {} log rows",
            stored.status,
            logs.len()
        ));
    }
    Ok(())
}

/// Two snapshots read version 0; the first commits. The second snapshot's
/// update or commit must fail with ConcurrentConflict, and its log row must
/// not appear.
async fn conflicting_commit_applies_nothing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = make_reference("stu-1", 1);
    let id = record.id;
    seed_reference(&s, record).await?;

    let mut first = s.begin_snapshot().await.map_err(|e| format!("begin 1: {e}"))?;
    let mut second = s.begin_snapshot().await.map_err(|e| format!("begin 2: {e}"))?;

    let mut a = s
        .get_reference_for_update(&mut first, id)
        .await
        .map_err(|e| format!("read 1: {e}"))?;
    let mut b = s
        .get_reference_for_update(&mut second, id)
        .await
        .map_err(|e| format!("read 2: {e}"))?;

    a.status = AchievementStatus::Submitted;
    s.update_reference(&mut first, a, 0)
        .await
        .map_err(|e| format!("update 1: {e}"))?;
    s.insert_status_log(
        &mut first,
        make_log(id, AchievementStatus::Draft, AchievementStatus::Submitted),
    )
    .await
    .map_err(|e| format!("log 1: {e}"))?;
    s.commit_snapshot(first)
        .await
        .map_err(|e| format!("commit 1: {e}"))?;

    b.status = AchievementStatus::Deleted;
    let outcome = match s.update_reference(&mut second, b, 0).await {
        Ok(_) => {
            s.insert_status_log(
                &mut second,
                make_log(id, AchievementStatus::Draft, AchievementStatus::Deleted),
            )
            .await
            .map_err(|e| format!("log 2: {e}"))?;
            s.commit_snapshot(second).await
        }
        Err(e) => {
            let _ = s.abort_snapshot(second).await;
            Err(e)
        }
    };
    match outcome {
        Err(StorageError::ConcurrentConflict { .. }) => {}
        other => return Err(format!("expected ConcurrentConflict, got {:?}", other)),
    }

    let stored = s.get_reference(id).await.map_err(|e| format!("get: {e}"))?;
    let logs = s
        .list_status_logs(id)
        .await
        .map_err(|e| format!("list: {e}"))?;
    if stored.status != AchievementStatus::Submitted || stored.version != 1 {
        return Err(format!(
            "expected submitted v1, got {} v{}",
            stored.status, stored.version
        ));
    }
    if logs.len() != 1 {
        return Err(format!("expected 1 log row, got {}", logs.len()));
    }
    Ok(())
}

async fn insert_and_log_in_one_snapshot<S, F, Fut>(factory: &F) -> Result<(), String>
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
    s.insert_status_log(
        &mut snap,
        make_log(id, AchievementStatus::Draft, AchievementStatus::Submitted),
    )
    .await
    .map_err(|e| format!("log against staged reference: {e}"))?;
    s.commit_snapshot(snap)
        .await
        .map_err(|e| format!("commit: {e}"))?;

    let logs = s
        .list_status_logs(id)
        .await
        .map_err(|e| format!("list: {e}"))?;
    if logs.len() != 1 {
        return Err(format!("expected 1 log row, got {}", logs.len()));
    }
    Ok(())
}
