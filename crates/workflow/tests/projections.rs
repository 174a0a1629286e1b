//! Listings, detail/history visibility, draft edits, attachments and
//! advisor assignment.

mod common;

use common::*;
use prestasi_core::{
    AchievementReference, AchievementStatus, ContentId, ErrorKind, PageRequest,
};
use prestasi_storage::memory::MemoryReferenceStore;
use prestasi_storage::ReferenceStore;
use prestasi_workflow::{Upload, WorkflowError};
use time::OffsetDateTime;
use uuid::Uuid;

fn pdf(name: &str) -> Upload {
    Upload {
        original_name: name.to_string(),
        content_type: "application/pdf".to_string(),
        bytes: b"%PDF-1.4".to_vec(),
    }
}

async fn dangling_reference(h: &Harness<MemoryReferenceStore>, student_id: &str) -> Uuid {
    let references = h.engine.references();
    let reference = AchievementReference::new_draft(
        student_id,
        ContentId::from_bytes([0xab; 12]),
        OffsetDateTime::now_utc(),
    );
    let id = reference.id;
    let mut snap = references.begin_snapshot().await.unwrap();
    references.insert_reference(&mut snap, reference).await.unwrap();
    references.commit_snapshot(snap).await.unwrap();
    id
}

// ── Bimbingan ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn bimbingan_lists_only_advisees_submitted_first() {
    let h = harness();
    let older = h.engine.create(&student_caller(), draft("older")).await.unwrap();
    let newer = h.engine.create(&student_caller(), draft("newer")).await.unwrap();
    let plain = h.engine.create(&student_caller(), draft("plain")).await.unwrap();
    h.engine.create(&other_student(), draft("not mine")).await.unwrap();
    h.engine
        .submit(&student_caller(), older.reference.id)
        .await
        .unwrap();
    h.engine
        .submit(&student_caller(), newer.reference.id)
        .await
        .unwrap();

    let page = h
        .engine
        .bimbingan(&advisor(), PageRequest::default(), None)
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    let ids: Vec<Uuid> = page.items.iter().map(|e| e.reference.id).collect();
    assert_eq!(
        ids,
        vec![newer.reference.id, older.reference.id, plain.reference.id]
    );
    assert!(page.items.iter().all(|e| e.achievement.is_some()));
}

#[tokio::test]
async fn bimbingan_paginates_and_filters_by_status() {
    let h = harness();
    for i in 0..5 {
        let created = h
            .engine
            .create(&student_caller(), draft(&format!("a{i}")))
            .await
            .unwrap();
        if i % 2 == 0 {
            h.engine
                .submit(&student_caller(), created.reference.id)
                .await
                .unwrap();
        }
    }

    let page = h
        .engine
        .bimbingan(&advisor(), PageRequest::new(Some(2), Some(2)), None)
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.page, 2);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total_pages(), 3);

    let submitted = h
        .engine
        .bimbingan(
            &advisor(),
            PageRequest::default(),
            Some(AchievementStatus::Submitted),
        )
        .await
        .unwrap();
    assert_eq!(submitted.total, 3);
    assert!(submitted
        .items
        .iter()
        .all(|e| e.reference.status == AchievementStatus::Submitted));
}

#[tokio::test]
async fn bimbingan_tolerates_missing_content() {
    let h = harness();
    h.engine.create(&student_caller(), draft("real")).await.unwrap();
    let dangling = dangling_reference(&h, "s1").await;

    let page = h
        .engine
        .bimbingan(&advisor(), PageRequest::default(), None)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    let entry = page
        .items
        .iter()
        .find(|e| e.reference.id == dangling)
        .unwrap();
    assert!(entry.achievement.is_none());
}

#[tokio::test]
async fn bimbingan_for_advisor_without_advisees_is_empty() {
    let h = harness();
    h.directory
        .add_user(prestasi_core::UserRecord {
            id: "u-new".into(),
            username: "new".into(),
            full_name: String::new(),
            role: prestasi_core::Role::Advisor,
        })
        .await;
    h.directory
        .add_lecturer(prestasi_core::LecturerRecord {
            id: "l-new".into(),
            user_id: "u-new".into(),
            lecturer_number: String::new(),
            department: String::new(),
        })
        .await;
    h.engine.create(&student_caller(), draft("a")).await.unwrap();

    let caller = prestasi_core::Caller::new("u-new", "new", prestasi_core::Role::Advisor);
    let page = h
        .engine
        .bimbingan(&caller, PageRequest::new(Some(0), Some(500)), None)
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    assert!(page.items.is_empty());
    assert_eq!(page.page, 1);
    assert_eq!(page.per_page, 100);
}

#[tokio::test]
async fn bimbingan_is_refused_to_students() {
    let h = harness();
    let err = h
        .engine
        .bimbingan(&student_caller(), PageRequest::default(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

// ── Role-scoped listings ─────────────────────────────────────────────────────

#[tokio::test]
async fn list_for_caller_scopes_by_role() {
    let h = harness();
    h.engine.create(&student_caller(), draft("mine")).await.unwrap();
    h.engine.create(&other_student(), draft("theirs")).await.unwrap();

    let own = h
        .engine
        .list_for_caller(&student_caller(), PageRequest::default(), None)
        .await
        .unwrap();
    assert_eq!(own.total, 1);
    assert_eq!(own.items[0].reference.student_id, "s1");

    let advisees = h
        .engine
        .list_for_caller(&other_advisor(), PageRequest::default(), None)
        .await
        .unwrap();
    assert_eq!(advisees.total, 1);
    assert_eq!(advisees.items[0].reference.student_id, "s2");

    let everything = h
        .engine
        .list_for_caller(&admin(), PageRequest::default(), None)
        .await
        .unwrap();
    assert_eq!(everything.total, 2);
}

#[tokio::test]
async fn list_all_is_admin_only_and_keeps_deleted_rows() {
    let h = harness();
    let gone = h.engine.create(&student_caller(), draft("gone")).await.unwrap();
    h.engine
        .delete_draft(&student_caller(), gone.reference.id)
        .await
        .unwrap();

    let err = h
        .engine
        .list_all(&advisor(), PageRequest::default(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let page = h
        .engine
        .list_all(&admin(), PageRequest::default(), None)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].reference.status, AchievementStatus::Deleted);
    assert!(page.items[0].achievement.is_none());
}

// ── Detail and history ───────────────────────────────────────────────────────

#[tokio::test]
async fn detail_is_visible_to_owner_advisor_and_admin_only() {
    let h = harness();
    let created = h.engine.create(&student_caller(), draft("a")).await.unwrap();
    let id = created.reference.id;

    for caller in [student_caller(), advisor(), admin()] {
        let entry = h.engine.detail(&caller, id).await.unwrap();
        assert_eq!(entry.reference.id, id);
        assert_eq!(entry.achievement.unwrap().title, "a");
    }

    let err = h.engine.detail(&other_student(), id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotOwner);
    let err = h.engine.detail(&other_advisor(), id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAdvisor);
}

#[tokio::test]
async fn history_lists_transitions_in_order() {
    let h = harness();
    let id = h
        .engine
        .create(&student_caller(), draft("a"))
        .await
        .unwrap()
        .reference
        .id;
    h.engine.submit(&student_caller(), id).await.unwrap();
    h.engine.verify(&advisor(), id).await.unwrap();

    let history = h.engine.history(&student_caller(), id).await.unwrap();
    let steps: Vec<(AchievementStatus, AchievementStatus)> = history
        .iter()
        .map(|l| (l.old_status, l.new_status))
        .collect();
    assert_eq!(
        steps,
        vec![
            (AchievementStatus::Draft, AchievementStatus::Submitted),
            (AchievementStatus::Submitted, AchievementStatus::Verified),
        ]
    );
    assert_eq!(history[1].changed_by, "u-adv");

    let err = h.engine.history(&other_advisor(), id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAdvisor);
}

// ── Draft edits ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_draft_replaces_fields_only_while_draft() {
    let h = harness();
    let created = h.engine.create(&student_caller(), draft("before")).await.unwrap();
    let id = created.reference.id;

    let updated = h
        .engine
        .update_draft(&student_caller(), id, draft("after"))
        .await
        .unwrap();
    assert_eq!(updated.title, "after");
    assert_eq!(updated.id, created.achievement.id);

    let err = h
        .engine
        .update_draft(&other_student(), id, draft("hijack"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotOwner);

    h.engine.submit(&student_caller(), id).await.unwrap();
    let err = h
        .engine
        .update_draft(&student_caller(), id, draft("late"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
}

#[tokio::test]
async fn attachment_is_stored_under_generated_name() {
    let h = harness();
    let created = h.engine.create(&student_caller(), draft("a")).await.unwrap();

    let attachment = h
        .engine
        .add_attachment(&student_caller(), created.reference.id, pdf("Sertifikat.PDF"))
        .await
        .unwrap();
    assert!(attachment.file_name.ends_with(".pdf"));
    assert_ne!(attachment.file_name, "Sertifikat.PDF");
    assert_eq!(
        attachment.file_url,
        format!("/uploads/achievements/{}", attachment.file_name)
    );
    assert_eq!(attachment.file_type, "application/pdf");
    assert!(h.files.contains(&attachment.file_name).await);

    let entry = h
        .engine
        .detail(&student_caller(), created.reference.id)
        .await
        .unwrap();
    assert_eq!(entry.achievement.unwrap().attachments, vec![attachment]);
}

#[tokio::test]
async fn attachment_with_disallowed_extension_is_refused() {
    let h = harness();
    let created = h.engine.create(&student_caller(), draft("a")).await.unwrap();
    for name in ["payload.exe", "noext", "archive.pdf.zip"] {
        let err = h
            .engine
            .add_attachment(&student_caller(), created.reference.id, pdf(name))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)), "{name}");
    }
    assert!(h.files.is_empty().await);
}

#[tokio::test]
async fn failed_append_removes_the_stored_file() {
    let h = harness();
    let dangling = dangling_reference(&h, "s1").await;

    let err = h
        .engine
        .add_attachment(&student_caller(), dangling, pdf("proof.png"))
        .await
        .unwrap_err();
    assert_eq!(err.reason(), "achievement_not_found");
    assert!(h.files.is_empty().await);
}

// ── Advisor assignment ───────────────────────────────────────────────────────

#[tokio::test]
async fn assign_advisor_moves_verification_authority() {
    let h = harness();
    let id = h
        .engine
        .create(&unadvised_student(), draft("a"))
        .await
        .unwrap()
        .reference
        .id;
    h.engine.submit(&unadvised_student(), id).await.unwrap();

    let err = h
        .engine
        .assign_advisor(&advisor(), "s3", "l1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let student = h.engine.assign_advisor(&admin(), "s3", "l1").await.unwrap();
    assert_eq!(student.advisor_id.as_deref(), Some("l1"));

    h.engine.verify(&advisor(), id).await.unwrap();
}

#[tokio::test]
async fn assign_advisor_requires_an_advisor_lecturer() {
    let h = harness();
    let err = h
        .engine
        .assign_advisor(&admin(), "s3", "l3")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = h
        .engine
        .assign_advisor(&admin(), "s3", "l-nope")
        .await
        .unwrap_err();
    assert_eq!(err.reason(), "lecturer_not_found");

    let err = h
        .engine
        .assign_advisor(&admin(), "s-nope", "l1")
        .await
        .unwrap_err();
    assert_eq!(err.reason(), "student_profile_not_found");
}

// ── Edits racing a transition ──

#[tokio::test]
async fn update_draft_reports_conflict_when_submitted_mid_write() {
    let h = harness_with(FlakyReferenceStore::new());
    let created = h.engine.create(&student_caller(), draft("a")).await.unwrap();
    let id = created.reference.id;

    h.engine.references().submit_after_next_read();
    let err = h
        .engine
        .update_draft(&student_caller(), id, draft("b"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Conflict { .. }), "{err:?}");
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let stored = h.engine.references().get_reference(id).await.unwrap();
    assert_eq!(stored.status, AchievementStatus::Submitted);
    // once submitted, further edits are refused outright
    let err = h
        .engine
        .update_draft(&student_caller(), id, draft("c"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
}

#[tokio::test]
async fn add_attachment_reports_conflict_when_submitted_mid_write() {
    let h = harness_with(FlakyReferenceStore::new());
    let created = h.engine.create(&student_caller(), draft("a")).await.unwrap();
    let id = created.reference.id;

    h.engine.references().submit_after_next_read();
    let err = h
        .engine
        .add_attachment(&student_caller(), id, pdf("sertifikat.pdf"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn undisturbed_update_passes_the_version_recheck() {
    let h = harness_with(FlakyReferenceStore::new());
    let created = h.engine.create(&student_caller(), draft("a")).await.unwrap();
    let updated = h
        .engine
        .update_draft(&student_caller(), created.reference.id, draft("b"))
        .await
        .unwrap();
    assert_eq!(updated.title, "b");
}
