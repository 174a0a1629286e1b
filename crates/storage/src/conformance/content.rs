//! Content-store conformance tests.

use std::future::Future;

use prestasi_core::{AchievementDraft, Attachment, ContentId};
use time::OffsetDateTime;

use super::TestResult;
use crate::{ContentStore, StorageError};

pub(super) async fn run_content_tests<C, F, Fut>(factory: &F) -> Vec<TestResult>
where
    C: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = C>,
{
    vec![
        TestResult::from_result(
            "content",
            "create_assigns_well_formed_id",
            create_assigns_well_formed_id(factory).await,
        ),
        TestResult::from_result(
            "content",
            "soft_delete_hides_from_default_reads",
            soft_delete_hides_from_default_reads(factory).await,
        ),
        TestResult::from_result(
            "content",
            "soft_delete_twice_keeps_first_stamp",
            soft_delete_twice_keeps_first_stamp(factory).await,
        ),
        TestResult::from_result(
            "content",
            "find_by_ids_omits_malformed_and_missing",
            find_by_ids_omits_malformed_and_missing(factory).await,
        ),
        TestResult::from_result(
            "content",
            "append_attachment_preserves_order",
            append_attachment_preserves_order(factory).await,
        ),
        TestResult::from_result(
            "content",
            "update_replaces_recognized_fields",
            update_replaces_recognized_fields(factory).await,
        ),
        TestResult::from_result(
            "content",
            "writes_to_unknown_id_are_not_found",
            writes_to_unknown_id_are_not_found(factory).await,
        ),
    ]
}

fn draft(title: &str) -> AchievementDraft {
    AchievementDraft {
        achievement_type: "competition".to_string(),
        title: title.to_string(),
        description: "conformance".to_string(),
        points: 10.0,
        ..Default::default()
    }
}

fn attachment(name: &str) -> Attachment {
    Attachment {
        file_name: name.to_string(),
        file_url: format!("/uploads/achievements/{name}"),
        file_type: "application/pdf".to_string(),
        uploaded_at: OffsetDateTime::now_utc(),
    }
}

async fn create_assigns_well_formed_id<C, F, Fut>(factory: &F) -> Result<(), String>
where
    C: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = C>,
{
    let c = factory().await;
    let a = c.create("stu-1", draft("A")).await.map_err(|e| format!("create: {e}"))?;
    let b = c.create("stu-1", draft("B")).await.map_err(|e| format!("create: {e}"))?;
    if ContentId::parse(a.id.as_str()).is_none() {
        return Err(format!("malformed id {}", a.id));
    }
    if a.id == b.id {
        return Err("two documents share an id".to_string());
    }
    if a.is_deleted || a.deleted_at.is_some() || a.student_id != "stu-1" {
        return Err(format!("unexpected fresh document: {:?}", a));
    }
    let fetched = c.find_by_id(&a.id).await.map_err(|e| format!("find: {e}"))?;
    if fetched.title != "A" {
        return Err(format!("expected title A, got {}", fetched.title));
    }
    Ok(())
}

async fn soft_delete_hides_from_default_reads<C, F, Fut>(factory: &F) -> Result<(), String>
where
    C: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = C>,
{
    let c = factory().await;
    let keep = c.create("stu-1", draft("keep")).await.map_err(|e| format!("create: {e}"))?;
    let gone = c.create("stu-1", draft("gone")).await.map_err(|e| format!("create: {e}"))?;
    c.soft_delete(&gone.id)
        .await
        .map_err(|e| format!("soft_delete: {e}"))?;

    let live = c
        .find_by_student("stu-1", false)
        .await
        .map_err(|e| format!("find live: {e}"))?;
    if live.len() != 1 || live[0].id != keep.id {
        return Err(format!("live listing wrong: {:?}", live));
    }
    let everything = c
        .find_by_student("stu-1", true)
        .await
        .map_err(|e| format!("find all: {e}"))?;
    if everything.len() != 2 {
        return Err(format!("include_deleted returned {}", everything.len()));
    }
    let deleted = c
        .find_deleted_by_student("stu-1")
        .await
        .map_err(|e| format!("find deleted: {e}"))?;
    if deleted.len() != 1 || deleted[0].id != gone.id {
        return Err(format!("deleted listing wrong: {:?}", deleted));
    }
    if !deleted[0].is_deleted || deleted[0].deleted_at.is_none() {
        return Err("soft-deleted document missing flag or timestamp".to_string());
    }
    match c.find_by_id(&gone.id).await {
        Err(StorageError::ContentNotFound { .. }) => Ok(()),
        other => Err(format!("find_by_id on deleted: expected ContentNotFound, got {:?}", other)),
    }
}

async fn soft_delete_twice_keeps_first_stamp<C, F, Fut>(factory: &F) -> Result<(), String>
where
    C: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = C>,
{
    let c = factory().await;
    let doc = c.create("stu-1", draft("x")).await.map_err(|e| format!("create: {e}"))?;
    c.soft_delete(&doc.id)
        .await
        .map_err(|e| format!("first soft_delete: {e}"))?;
    let stamp = deleted_at(&c, &doc.id).await?;
    c.soft_delete(&doc.id)
        .await
        .map_err(|e| format!("second soft_delete: {e}"))?;
    let again = deleted_at(&c, &doc.id).await?;
    if stamp != again {
        return Err(format!("deleted_at moved from {stamp:?} to {again:?}"));
    }
    if c.find_by_id(&doc.id).await.is_ok() {
        return Err("document still readable after soft_delete".into());
    }
    Ok(())
}

async fn deleted_at<C: ContentStore>(
    c: &C,
    id: &ContentId,
) -> Result<Option<OffsetDateTime>, String> {
    let docs = c
        .find_deleted_by_student("stu-1")
        .await
        .map_err(|e| format!("find_deleted_by_student: {e}"))?;
    let doc = docs
        .into_iter()
        .find(|d| d.id == *id)
        .ok_or_else(|| format!("{id} missing from deleted listing"))?;
    if doc.deleted_at.is_none() {
        return Err(format!("{id} has no deleted_at"));
    }
    Ok(doc.deleted_at)
}

async fn find_by_ids_omits_malformed_and_missing<C, F, Fut>(factory: &F) -> Result<(), String>
where
    C: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = C>,
{
    let c = factory().await;
    let a = c.create("stu-1", draft("a")).await.map_err(|e| format!("create: {e}"))?;
    let b = c.create("stu-2", draft("b")).await.map_err(|e| format!("create: {e}"))?;
    let deleted = c.create("stu-2", draft("d")).await.map_err(|e| format!("create: {e}"))?;
    c.soft_delete(&deleted.id)
        .await
        .map_err(|e| format!("soft_delete: {e}"))?;

    let missing = ContentId::from_bytes([0xff; 12]);
    let ids = [
        a.id.as_str(),
        "not-an-id",
        missing.as_str(),
        b.id.as_str(),
        deleted.id.as_str(),
    ];
    let found = c.find_by_ids(&ids).await.map_err(|e| format!("find_by_ids: {e}"))?;
    let mut got: Vec<&str> = found.iter().map(|d| d.id.as_str()).collect();
    got.sort();
    let mut want = vec![a.id.as_str(), b.id.as_str()];
    want.sort();
    if got != want {
        return Err(format!("expected {:?}, got {:?}", want, got));
    }
    Ok(())
}

async fn append_attachment_preserves_order<C, F, Fut>(factory: &F) -> Result<(), String>
where
    C: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = C>,
{
    let c = factory().await;
    let doc = c.create("stu-1", draft("x")).await.map_err(|e| format!("create: {e}"))?;
    c.append_attachment(&doc.id, attachment("one.pdf"))
        .await
        .map_err(|e| format!("append one: {e}"))?;
    c.append_attachment(&doc.id, attachment("two.png"))
        .await
        .map_err(|e| format!("append two: {e}"))?;

    let stored = c.find_by_id(&doc.id).await.map_err(|e| format!("find: {e}"))?;
    let names: Vec<&str> = stored.attachments.iter().map(|a| a.file_name.as_str()).collect();
    if names != ["one.pdf", "two.png"] {
        return Err(format!("unexpected attachments {:?}", names));
    }
    Ok(())
}

async fn update_replaces_recognized_fields<C, F, Fut>(factory: &F) -> Result<(), String>
where
    C: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = C>,
{
    let c = factory().await;
    let doc = c.create("stu-1", draft("before")).await.map_err(|e| format!("create: {e}"))?;
    c.append_attachment(&doc.id, attachment("keep.pdf"))
        .await
        .map_err(|e| format!("append: {e}"))?;

    let mut next = draft("after");
    next.tags = vec!["debate".to_string()];
    let updated = c.update(&doc.id, next).await.map_err(|e| format!("update: {e}"))?;
    if updated.title != "after" || updated.tags != ["debate"] {
        return Err(format!("fields not replaced: {:?}", updated));
    }
    if updated.id != doc.id || updated.created_at != doc.created_at {
        return Err("update changed identity".to_string());
    }
    if updated.attachments.len() != 1 {
        return Err("update dropped attachments".to_string());
    }
    Ok(())
}

async fn writes_to_unknown_id_are_not_found<C, F, Fut>(factory: &F) -> Result<(), String>
where
    C: ContentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = C>,
{
    let c = factory().await;
    let unknown = ContentId::from_bytes([0x42; 12]);
    match c.soft_delete(&unknown).await {
        Err(StorageError::ContentNotFound { .. }) => {}
        other => return Err(format!("soft_delete: expected ContentNotFound, got {:?}", other)),
    }
    match c.append_attachment(&unknown, attachment("x.pdf")).await {
        Err(StorageError::ContentNotFound { .. }) => {}
        other => return Err(format!("append: expected ContentNotFound, got {:?}", other)),
    }
    match c.update(&unknown, draft("x")).await {
        Err(StorageError::ContentNotFound { .. }) => Ok(()),
        other => Err(format!("update: expected ContentNotFound, got {:?}", other)),
    }
}
