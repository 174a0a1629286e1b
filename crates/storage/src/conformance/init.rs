use std::future::Future;

use prestasi_core::AchievementStatus;

use super::{make_reference, seed_reference, TestResult};
use crate::{ReferenceStore, StorageError};

pub(super) async fn run_init_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "insert",
            "insert_creates_draft_at_version_0",
            insert_creates_draft_at_version_0(factory).await,
        ),
        TestResult::from_result(
            "insert",
            "duplicate_id_in_same_snapshot_rejected",
            duplicate_id_in_same_snapshot_rejected(factory).await,
        ),
        TestResult::from_result(
            "insert",
            "duplicate_id_after_commit_rejected",
            duplicate_id_after_commit_rejected(factory).await,
        ),
        TestResult::from_result(
            "insert",
            "second_reference_for_same_content_rejected",
            second_reference_for_same_content_rejected(factory).await,
        ),
        TestResult::from_result(
            "insert",
            "find_by_content_returns_reference",
            find_by_content_returns_reference(factory).await,
        ),
    ]
}

async fn insert_creates_draft_at_version_0<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = make_reference("stu-1", 1);
    let id = record.id;
    seed_reference(&s, record).await?;

    let stored = s.get_reference(id).await.map_err(|e| format!("get: {e}"))?;
    if stored.status != AchievementStatus::Draft {
        return Err(format!("expected draft, got {}", stored.status));
    }
    if stored.version != 0 {
        return Err(format!("expected version 0, got {}", stored.version));
    }
    Ok(())
}

async fn duplicate_id_in_same_snapshot_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let first = make_reference("stu-1", 1);
    let mut second = make_reference("stu-1", 2);
    second.id = first.id;

    let mut snap = s.begin_snapshot().await.map_err(|e| format!("begin: {e}"))?;
    s.insert_reference(&mut snap, first)
        .await
        .map_err(|e| format!("first insert: {e}"))?;
    let result = s.insert_reference(&mut snap, second).await;
    let _ = s.abort_snapshot(snap).await;
    match result {
        Err(StorageError::AlreadyExists { .. }) => Ok(()),
        other => Err(format!("expected AlreadyExists, got {:?}", other)),
    }
}

async fn duplicate_id_after_commit_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let first = make_reference("stu-1", 1);
    let mut second = make_reference("stu-1", 2);
    second.id = first.id;
    seed_reference(&s, first).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| format!("begin: {e}"))?;
    let staged = s.insert_reference(&mut snap, second).await;
    let outcome = match staged {
        Ok(()) => s.commit_snapshot(snap).await,
        Err(e) => {
            let _ = s.abort_snapshot(snap).await;
            Err(e)
        }
    };
    match outcome {
        Err(StorageError::AlreadyExists { .. }) => Ok(()),
        other => Err(format!("expected AlreadyExists, got {:?}", other)),
    }
}

async fn second_reference_for_same_content_rejected<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_reference(&s, make_reference("stu-1", 7)).await?;

    let mut snap = s.begin_snapshot().await.map_err(|e| format!("begin: {e}"))?;
    let staged = s.insert_reference(&mut snap, make_reference("stu-1", 7)).await;
    let outcome = match staged {
        Ok(()) => s.commit_snapshot(snap).await,
        Err(e) => {
            let _ = s.abort_snapshot(snap).await;
            Err(e)
        }
    };
    match outcome {
        Err(StorageError::AlreadyExists { .. }) => Ok(()),
        other => Err(format!("expected AlreadyExists, got {:?}", other)),
    }
}

async fn find_by_content_returns_reference<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = make_reference("stu-1", 3);
    let (id, content_id) = (record.id, record.content_id.clone());
    seed_reference(&s, record).await?;

    let found = s
        .find_reference_by_content(&content_id)
        .await
        .map_err(|e| format!("find: {e}"))?;
    match found {
        Some(r) if r.id == id => {}
        other => return Err(format!("expected reference {id}, got {:?}", other)),
    }

    let missing = s
        .find_reference_by_content(&make_reference("stu-1", 4).content_id)
        .await
        .map_err(|e| format!("find missing: {e}"))?;
    if missing.is_some() {
        return Err("expected None for unreferenced content".to_string());
    }
    Ok(())
}
