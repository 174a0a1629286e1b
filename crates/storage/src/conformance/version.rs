use std::future::Future;

use prestasi_core::AchievementStatus;

use super::{apply_transition, make_reference, seed_reference, TestResult};
use crate::{ReferenceStore, StorageError};

pub(super) async fn run_version_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "version",
            "update_returns_next_version",
            update_returns_next_version(factory).await,
        ),
        TestResult::from_result(
            "version",
            "versions_increment_sequentially",
            versions_increment_sequentially(factory).await,
        ),
        TestResult::from_result(
            "version",
            "wrong_version_returns_conflict",
            wrong_version_returns_conflict(factory).await,
        ),
        TestResult::from_result(
            "version",
            "conflict_has_correct_fields",
            conflict_has_correct_fields(factory).await,
        ),
        TestResult::from_result(
            "version",
            "repeated_update_in_one_snapshot",
            repeated_update_in_one_snapshot(factory).await,
        ),
    ]
}

async fn update_returns_next_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = make_reference("stu-1", 1);
    let id = record.id;
    seed_reference(&s, record).await?;

    let v = apply_transition(&s, id, 0, AchievementStatus::Submitted).await?;
    if v != 1 {
        return Err(format!("expected new version 1, got {v}"));
    }
    let stored = s.get_reference(id).await.map_err(|e| format!("get: {e}"))?;
    if stored.version != 1 {
        return Err(format!("expected stored version 1, got {}", stored.version));
    }
    Ok(())
}

async fn versions_increment_sequentially<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = make_reference("stu-1", 1);
    let id = record.id;
    seed_reference(&s, record).await?;

    let v1 = apply_transition(&s, id, 0, AchievementStatus::Submitted).await?;
    let v2 = apply_transition(&s, id, v1, AchievementStatus::Verified).await?;
    if (v1, v2) != (1, 2) {
        return Err(format!("expected versions (1, 2), got ({v1}, {v2})"));
    }
    Ok(())
}

async fn wrong_version_returns_conflict<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = make_reference("stu-1", 1);
    let id = record.id;
    seed_reference(&s, record).await?;

    for wrong in [-1, 1, 5] {
        let mut snap = s.begin_snapshot().await.map_err(|e| format!("begin: {e}"))?;
        let current = s
            .get_reference_for_update(&mut snap, id)
            .await
            .map_err(|e| format!("get_for_update: {e}"))?;
        let staged = s.update_reference(&mut snap, current, wrong).await;
        let outcome = match staged {
            Ok(_) => s.commit_snapshot(snap).await,
            Err(e) => {
                let _ = s.abort_snapshot(snap).await;
                Err(e)
            }
        };
        match outcome {
            Err(StorageError::ConcurrentConflict { .. }) => {}
            other => {
                return Err(format!(
                    "version {wrong}: expected ConcurrentConflict, got {:?}",
                    other
                ))
            }
        }
    }
    Ok(())
}

async fn conflict_has_correct_fields<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = make_reference("stu-1", 1);
    let id = record.id;
    seed_reference(&s, record.clone()).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| format!("begin: {e}"))?;
    let result = s.update_reference(&mut snap, record, 3).await;
    let _ = s.abort_snapshot(snap).await;
    match result {
        Err(StorageError::ConcurrentConflict {
            reference_id,
            expected_version,
        }) => {
            if reference_id != id.to_string() {
                return Err(format!("wrong reference_id in conflict: {reference_id}"));
            }
            if expected_version != 3 {
                return Err(format!("wrong expected_version: {expected_version}"));
            }
            Ok(())
        }
        other => Err(format!("expected ConcurrentConflict, got {:?}", other)),
    }
}

/// Two updates inside one snapshot chain versions 0 -> 1 -> 2 and commit as
/// version 2.
async fn repeated_update_in_one_snapshot<S, F, Fut>(factory: &F) -> Result<(), String>
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
        .map_err(|e| format!("read: {e}"))?;
    current.status = AchievementStatus::Submitted;
    let v1 = s
        .update_reference(&mut snap, current, 0)
        .await
        .map_err(|e| format!("update 1: {e}"))?;
    let mut current = s
        .get_reference_for_update(&mut snap, id)
        .await
        .map_err(|e| format!("re-read: {e}"))?;
    current.status = AchievementStatus::Verified;
    let v2 = s
        .update_reference(&mut snap, current, v1)
        .await
        .map_err(|e| format!("update 2: {e}"))?;
    s.commit_snapshot(snap)
        .await
        .map_err(|e| format!("commit: {e}"))?;

    let stored = s.get_reference(id).await.map_err(|e| format!("get: {e}"))?;
    if v2 != 2 || stored.version != 2 || stored.status != AchievementStatus::Verified {
        return Err(format!(
            "expected verified v2, got {} v{} (returned {v2})",
            stored.status, stored.version
        ));
    }
    Ok(())
}
