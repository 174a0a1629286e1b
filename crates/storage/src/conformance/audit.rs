//! Status-log conformance tests.

use std::future::Future;

use prestasi_core::{replay_status, AchievementStatus};

use super::{apply_transition, make_reference, seed_reference, TestResult};
use crate::ReferenceStore;

pub(super) async fn run_audit_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "audit",
            "logs_returned_in_creation_order",
            logs_returned_in_creation_order(factory).await,
        ),
        TestResult::from_result(
            "audit",
            "logs_scoped_to_reference",
            logs_scoped_to_reference(factory).await,
        ),
        TestResult::from_result(
            "audit",
            "replay_matches_stored_status",
            replay_matches_stored_status(factory).await,
        ),
    ]
}

async fn logs_returned_in_creation_order<S, F, Fut>(factory: &F) -> Result<(), String>
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
    apply_transition(&s, id, v, AchievementStatus::Rejected).await?;

    let logs = s
        .list_status_logs(id)
        .await
        .map_err(|e| format!("list: {e}"))?;
    let walk: Vec<(AchievementStatus, AchievementStatus)> =
        logs.iter().map(|l| (l.old_status, l.new_status)).collect();
    let expected = vec![
        (AchievementStatus::Draft, AchievementStatus::Submitted),
        (AchievementStatus::Submitted, AchievementStatus::Rejected),
    ];
    if walk != expected {
        return Err(format!("expected {:?}, got {:?}", expected, walk));
    }
    Ok(())
}

async fn logs_scoped_to_reference<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let a = make_reference("stu-1", 1);
    let b = make_reference("stu-1", 2);
    let (a_id, b_id) = (a.id, b.id);
    seed_reference(&s, a).await?;
    seed_reference(&s, b).await?;
    apply_transition(&s, a_id, 0, AchievementStatus::Submitted).await?;

    let b_logs = s
        .list_status_logs(b_id)
        .await
        .map_err(|e| format!("list: {e}"))?;
    if !b_logs.is_empty() {
        return Err(format!("reference b has {} foreign log rows", b_logs.len()));
    }
    Ok(())
}

async fn replay_matches_stored_status<S, F, Fut>(factory: &F) -> Result<(), String>
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
    apply_transition(&s, id, v, AchievementStatus::Verified).await?;

    let logs = s
        .list_status_logs(id)
        .await
        .map_err(|e| format!("list: {e}"))?;
    let stored = s.get_reference(id).await.map_err(|e| format!("get: {e}"))?;
    let replayed = replay_status(&logs).map_err(|e| format!("replay: {e}"))?;
    if replayed != stored.status {
        return Err(format!(
            "replayed {replayed} but stored status is {}",
            stored.status
        ));
    }
    Ok(())
}
