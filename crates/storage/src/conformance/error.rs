use std::future::Future;

use prestasi_core::AchievementStatus;
use uuid::Uuid;

use super::{make_log, make_reference, TestResult};
use crate::{ReferenceStore, StorageError};

pub(super) async fn run_error_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "error",
            "get_reference_nonexistent",
            get_reference_nonexistent(factory).await,
        ),
        TestResult::from_result(
            "error",
            "get_reference_for_update_nonexistent",
            get_reference_for_update_nonexistent(factory).await,
        ),
        TestResult::from_result(
            "error",
            "update_reference_nonexistent",
            update_reference_nonexistent(factory).await,
        ),
        TestResult::from_result(
            "error",
            "log_for_unknown_reference_rejected",
            log_for_unknown_reference_rejected(factory).await,
        ),
        TestResult::from_result(
            "error",
            "list_logs_empty_for_nonexistent",
            list_logs_empty_for_nonexistent(factory).await,
        ),
    ]
}

async fn get_reference_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = Uuid::new_v4();
    match s.get_reference(id).await {
        Err(StorageError::ReferenceNotFound { reference_id }) if reference_id == id.to_string() => {
            Ok(())
        }
        other => Err(format!("expected ReferenceNotFound({id}), got {:?}", other)),
    }
}

async fn get_reference_for_update_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| format!("begin: {e}"))?;
    let result = s.get_reference_for_update(&mut snap, Uuid::new_v4()).await;
    let _ = s.abort_snapshot(snap).await;
    match result {
        Err(StorageError::ReferenceNotFound { .. }) => Ok(()),
        other => Err(format!("expected ReferenceNotFound, got {:?}", other)),
    }
}

async fn update_reference_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| format!("begin: {e}"))?;
    let result = s
        .update_reference(&mut snap, make_reference("stu-1", 1), 0)
        .await;
    let _ = s.abort_snapshot(snap).await;
    match result {
        Err(StorageError::ReferenceNotFound { .. }) => Ok(()),
        other => Err(format!("expected ReferenceNotFound, got {:?}", other)),
    }
}

async fn log_for_unknown_reference_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut snap = s.begin_snapshot().await.map_err(|e| format!("begin: {e}"))?;
    let entry = make_log(
        Uuid::new_v4(),
        AchievementStatus::Draft,
        AchievementStatus::Submitted,
    );
    let staged = s.insert_status_log(&mut snap, entry).await;
    let outcome = match staged {
        Ok(()) => s.commit_snapshot(snap).await,
        Err(e) => {
            let _ = s.abort_snapshot(snap).await;
            Err(e)
        }
    };
    match outcome {
        Err(StorageError::ReferenceNotFound { .. }) => Ok(()),
        other => Err(format!("expected ReferenceNotFound, got {:?}", other)),
    }
}

async fn list_logs_empty_for_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let logs = s
        .list_status_logs(Uuid::new_v4())
        .await
        .map_err(|e| format!("list: {e}"))?;
    if !logs.is_empty() {
        return Err(format!("expected no logs, got {}", logs.len()));
    }
    Ok(())
}
