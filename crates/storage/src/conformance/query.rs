use std::future::Future;

use prestasi_core::AchievementStatus;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::{make_reference, seed_reference, TestResult};
use crate::{ReferenceFilter, ReferenceStore};

pub(super) async fn run_query_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "query",
            "list_orders_submitted_desc_nulls_last",
            list_orders_submitted_desc_nulls_last(factory).await,
        ),
        TestResult::from_result(
            "query",
            "filter_by_students_and_status",
            filter_by_students_and_status(factory).await,
        ),
        TestResult::from_result(
            "query",
            "limit_and_offset_page_through",
            limit_and_offset_page_through(factory).await,
        ),
        TestResult::from_result(
            "query",
            "empty_student_set_matches_nothing",
            empty_student_set_matches_nothing(factory).await,
        ),
    ]
}

/// Seed four references: two submitted (at t+10 and t+20), two never
/// submitted (created at t+1 and t+3). Returns ids in expected listing order.
async fn seed_ordering_fixture<S: ReferenceStore>(s: &S) -> Result<Vec<Uuid>, String> {
    let base = OffsetDateTime::now_utc();
    let mut rows = Vec::new();
    for (seed, created, submitted) in [(1u8, 1, None), (2, 2, Some(10)), (3, 3, None), (4, 4, Some(20))] {
        let mut r = make_reference("stu-1", seed);
        r.created_at = base + Duration::seconds(created);
        r.updated_at = r.created_at;
        if let Some(at) = submitted {
            r.status = AchievementStatus::Submitted;
            r.submitted_at = Some(base + Duration::seconds(at));
        }
        rows.push(r);
    }
    let expected = vec![rows[3].id, rows[1].id, rows[2].id, rows[0].id];
    for r in rows {
        seed_reference(s, r).await?;
    }
    Ok(expected)
}

async fn list_orders_submitted_desc_nulls_last<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let expected = seed_ordering_fixture(&s).await?;
    let listed: Vec<Uuid> = s
        .list_references(&ReferenceFilter::all(), 100, 0)
        .await
        .map_err(|e| format!("list: {e}"))?
        .into_iter()
        .map(|r| r.id)
        .collect();
    if listed != expected {
        return Err(format!("expected order {:?}, got {:?}", expected, listed));
    }
    Ok(())
}

async fn filter_by_students_and_status<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_reference(&s, make_reference("stu-1", 1)).await?;
    seed_reference(&s, make_reference("stu-2", 2)).await?;
    let mut submitted = make_reference("stu-2", 3);
    submitted.status = AchievementStatus::Submitted;
    submitted.submitted_at = Some(OffsetDateTime::now_utc());
    seed_reference(&s, submitted).await?;
    seed_reference(&s, make_reference("stu-3", 4)).await?;

    let students = ReferenceFilter::students(vec!["stu-1".into(), "stu-2".into()]);
    let count = s
        .count_references(&students)
        .await
        .map_err(|e| format!("count: {e}"))?;
    if count != 3 {
        return Err(format!("expected 3 references for stu-1/stu-2, got {count}"));
    }

    let only_submitted = students.with_status(Some(AchievementStatus::Submitted));
    let listed = s
        .list_references(&only_submitted, 10, 0)
        .await
        .map_err(|e| format!("list: {e}"))?;
    if listed.len() != 1 || listed[0].student_id != "stu-2" {
        return Err(format!("expected one submitted row for stu-2, got {:?}", listed));
    }
    Ok(())
}

async fn limit_and_offset_page_through<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let expected = seed_ordering_fixture(&s).await?;
    let all = ReferenceFilter::all();

    let mut paged = Vec::new();
    for offset in [0, 2] {
        let page = s
            .list_references(&all, 2, offset)
            .await
            .map_err(|e| format!("list offset {offset}: {e}"))?;
        if page.len() != 2 {
            return Err(format!("offset {offset}: expected 2 rows, got {}", page.len()));
        }
        paged.extend(page.into_iter().map(|r| r.id));
    }
    if paged != expected {
        return Err(format!("paged order {:?} != {:?}", paged, expected));
    }

    let past_end = s
        .list_references(&all, 2, 10)
        .await
        .map_err(|e| format!("list past end: {e}"))?;
    if !past_end.is_empty() {
        return Err(format!("expected empty page past end, got {}", past_end.len()));
    }
    Ok(())
}

async fn empty_student_set_matches_nothing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ReferenceStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_reference(&s, make_reference("stu-1", 1)).await?;
    let none = ReferenceFilter::students(Vec::new());
    let count = s
        .count_references(&none)
        .await
        .map_err(|e| format!("count: {e}"))?;
    let listed = s
        .list_references(&none, 10, 0)
        .await
        .map_err(|e| format!("list: {e}"))?;
    if count != 0 || !listed.is_empty() {
        return Err(format!(
            "empty student set matched {count} / {} rows",
            listed.len()
        ));
    }
    Ok(())
}
