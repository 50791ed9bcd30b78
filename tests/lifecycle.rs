//! Lifecycle engine tests
//!
//! - 컨테이너 이동 = 상태 전이, 원장 행 추가
//! - 권한 게이트(Forbidden)와 상태 머신(InvalidTransition) 구분
//! - 버전은 교체마다 정확히 1 증가, 모든 버전이 원장에 존재
//! - 삭제는 원장 → 문서 → 블롭 순

mod common;

use std::collections::BTreeSet;
use std::time::Duration;

use cdeflow::db;
use cdeflow::error::AppError;
use cdeflow::models::*;
use cdeflow::services::{ledger, BlobStore, EventKind};
use common::*;
use cdeflow::models::ContainerStatus::*;

// =============================================================================
// Scenario
// =============================================================================

#[tokio::test]
async fn plan_a_walks_through_the_lifecycle() {
    let h = harness().await;
    let t = team(&h).await;

    let doc = upload(&h, &t, &t.pm, "Plan-A.pdf").await;
    assert_eq!(doc.version, 1);
    assert_eq!(doc.status, WorkInProgress);
    assert_eq!(doc.revision_code, DEFAULT_REVISION_CODE);
    assert_eq!(h.engine.history(&t.pm, &doc.id).await.unwrap().len(), 1);

    let doc = h
        .engine
        .move_document(&t.pm, &doc.id, &t.container(Shared).id)
        .await
        .unwrap();
    assert_eq!(doc.status, Shared);
    let history = h.engine.history(&t.pm, &doc.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(
        history[0].comment.as_deref(),
        Some("Moved to Shared container")
    );

    let err = h
        .engine
        .move_document(&t.pm, &doc.id, &t.container(Archived).id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            from: Shared,
            to: Archived
        }
    ));

    let doc = h
        .engine
        .move_document(&t.pm, &doc.id, &t.container(Published).id)
        .await
        .unwrap();
    assert_eq!(doc.status, Published);
    assert_eq!(h.engine.history(&t.pm, &doc.id).await.unwrap().len(), 3);

    let cmd = replacement(&h, "Plan-A.pdf").await;
    let doc = h.engine.replace_content(&t.pm, &doc.id, cmd).await.unwrap();
    assert_eq!(doc.version, 2);
    assert_eq!(doc.status, Published);
    assert_eq!(doc.container_id.as_deref(), Some(t.container(Published).id.as_str()));

    let history = h.engine.history(&t.pm, &doc.id).await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].version, 2);
    assert_eq!(history[0].status, Published);
    assert_eq!(history[0].file_url, doc.file_url);
}

// =============================================================================
// State machine vs. permission gate
// =============================================================================

#[tokio::test]
async fn published_cannot_return_to_shared() {
    let h = harness().await;
    let t = team(&h).await;
    let doc = upload(&h, &t, &t.pm, "a.pdf").await;

    for status in [Shared, Published] {
        h.engine
            .move_document(&t.pm, &doc.id, &t.container(status).id)
            .await
            .unwrap();
    }

    let err = h
        .engine
        .move_document(&t.admin, &doc.id, &t.container(Shared).id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
    assert_eq!(err.code(), "invalid_transition");
}

#[tokio::test]
async fn contributor_cannot_publish_but_bim_manager_can() {
    let h = harness().await;
    let t = team(&h).await;
    let doc = upload(&h, &t, &t.contributor, "facade.pdf").await;

    // WIP → SHARED는 멤버면 누구나
    h.engine
        .move_document(&t.contributor, &doc.id, &t.container(Shared).id)
        .await
        .unwrap();

    let err = h
        .engine
        .move_document(&t.contributor, &doc.id, &t.container(Published).id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let doc = h
        .engine
        .move_document(&t.bim, &doc.id, &t.container(Published).id)
        .await
        .unwrap();
    assert_eq!(doc.status, Published);

    // 보관은 PM만
    let err = h
        .engine
        .move_document(&t.bim, &doc.id, &t.container(Archived).id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let doc = h
        .engine
        .move_document(&t.pm, &doc.id, &t.container(Archived).id)
        .await
        .unwrap();
    assert_eq!(doc.status, Archived);
}

#[tokio::test]
async fn impossible_transition_is_reported_before_role_gate() {
    let h = harness().await;
    let t = team(&h).await;
    let doc = upload(&h, &t, &t.contributor, "skip.pdf").await;

    let err = h
        .engine
        .move_document(&t.contributor, &doc.id, &t.container(Published).id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            from: WorkInProgress,
            to: Published
        }
    ));
}

#[tokio::test]
async fn viewers_read_but_never_mutate() {
    let h = harness().await;
    let t = team(&h).await;
    let doc = upload(&h, &t, &t.pm, "read-only.pdf").await;

    assert_eq!(h.engine.get_document(&t.viewer, &doc.id).await.unwrap().id, doc.id);
    assert_eq!(h.engine.history(&t.viewer, &doc.id).await.unwrap().len(), 1);

    let err = h
        .engine
        .move_document(&t.viewer, &doc.id, &t.container(Shared).id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let cmd = replacement(&h, "read-only.pdf").await;
    let err = h.engine.replace_content(&t.viewer, &doc.id, cmd).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn non_members_are_forbidden_even_with_manager_identity() {
    let h = harness().await;
    let t = team(&h).await;
    let doc = upload(&h, &t, &t.pm, "private.pdf").await;

    let err = h.engine.get_document(&t.outsider, &doc.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // ADMIN은 멤버십 없이 통과
    h.engine
        .move_document(&t.admin, &doc.id, &t.container(Shared).id)
        .await
        .unwrap();
}

#[tokio::test]
async fn reassignment_within_a_status_keeps_status() {
    let h = harness().await;
    let t = team(&h).await;
    let second_wip = h
        .engine
        .create_container(
            &t.pm,
            &t.project.id,
            CreateContainerRequest {
                name: "WIP Structural".into(),
                code: "WIP-ST".into(),
                status: WorkInProgress,
            },
        )
        .await
        .unwrap();
    let doc = upload(&h, &t, &t.contributor, "beam.pdf").await;

    let moved = h
        .engine
        .move_document(&t.contributor, &doc.id, &second_wip.id)
        .await
        .unwrap();
    assert_eq!(moved.status, WorkInProgress);
    assert_eq!(moved.container_id.as_deref(), Some(second_wip.id.as_str()));
    assert_eq!(moved.version, 1);

    let history = h.engine.history(&t.pm, &doc.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(
        history[0].comment.as_deref(),
        Some("Moved to WIP Structural container")
    );

    // 지금 있는 컨테이너로의 이동은 입력 오류
    let err = h
        .engine
        .move_document(&t.contributor, &doc.id, &second_wip.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn containers_of_other_projects_are_not_found() {
    let h = harness().await;
    let t = team(&h).await;
    let (_, foreign) = h
        .engine
        .create_project(
            &t.admin,
            CreateProjectRequest {
                name: "Bridge".into(),
                code: "BRG".into(),
            },
        )
        .await
        .unwrap();
    let doc = upload(&h, &t, &t.pm, "x.pdf").await;

    let foreign_shared = foreign.iter().find(|c| c.status == Shared).unwrap();
    let err = h
        .engine
        .move_document(&t.admin, &doc.id, &foreign_shared.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Container")));
}

// =============================================================================
// Upload
// =============================================================================

#[tokio::test]
async fn upload_lists_every_missing_metadata_field() {
    let h = harness().await;
    let t = team(&h).await;
    let file = stored_file(&h, "no-meta.pdf", b"x").await;

    let err = h
        .engine
        .upload(
            &t.pm,
            UploadDocument {
                project_id: t.project.id.clone(),
                container_id: None,
                name: None,
                revision_code: None,
                metadata: Metadata::new(),
                file,
            },
        )
        .await
        .unwrap_err();

    match err {
        AppError::Validation(details) => {
            assert_eq!(details.len(), 2);
            assert!(details.iter().any(|d| d.contains("originator")));
            assert!(details.iter().any(|d| d.contains("discipline")));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(h
        .engine
        .list_documents(&t.pm, &t.project.id, &DocumentQuery::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn upload_name_falls_back_to_generated_then_original() {
    let h = harness().await;
    let t = team(&h).await;

    let file = stored_file(&h, "Ground Floor Plan.PDF", b"x").await;
    let doc = h
        .engine
        .upload(
            &t.pm,
            UploadDocument {
                project_id: t.project.id.clone(),
                container_id: None,
                name: None,
                revision_code: Some("C02".into()),
                metadata: metadata(),
                file,
            },
        )
        .await
        .unwrap();
    assert_eq!(doc.name, "ground-floor-plan.pdf");
    assert_eq!(doc.original_name, "Ground Floor Plan.PDF");
    assert_eq!(doc.revision_code, "C02");

    // 생성기가 실패하면 원본 이름
    let file = stored_file(&h, "###.pdf", b"x").await;
    let doc = h
        .engine
        .upload(
            &t.pm,
            UploadDocument {
                project_id: t.project.id.clone(),
                container_id: None,
                name: None,
                revision_code: None,
                metadata: metadata(),
                file,
            },
        )
        .await
        .unwrap();
    assert_eq!(doc.name, "###.pdf");
}

#[tokio::test]
async fn contributors_upload_only_drafts() {
    let h = harness().await;
    let t = team(&h).await;

    for (by, target, allowed) in [
        (&t.contributor, Shared, false),
        (&t.contributor, WorkInProgress, true),
        (&t.bim, Shared, true),
        (&t.bim, Archived, false),
        (&t.pm, Archived, true),
        (&t.viewer, WorkInProgress, false),
    ] {
        let file = stored_file(&h, "drop.pdf", b"x").await;
        let result = h
            .engine
            .upload(
                by,
                UploadDocument {
                    project_id: t.project.id.clone(),
                    container_id: Some(t.container(target).id.clone()),
                    name: None,
                    revision_code: None,
                    metadata: metadata(),
                    file,
                },
            )
            .await;

        match result {
            Ok(doc) => {
                assert!(allowed, "{} should not upload into {target}", by.role);
                assert_eq!(doc.status, target);
            }
            Err(e) => {
                assert!(!allowed, "{} should upload into {target}: {e}", by.role);
                assert!(matches!(e, AppError::Forbidden(_)));
            }
        }
    }
}

// =============================================================================
// Versions and ledger
// =============================================================================

#[tokio::test]
async fn every_version_is_in_the_ledger() {
    let h = harness().await;
    let t = team(&h).await;
    let doc = upload(&h, &t, &t.contributor, "rev.pdf").await;

    let mut current = doc.clone();
    for expected in 2..=4 {
        let cmd = replacement(&h, "rev.pdf").await;
        // 업로더 본인은 CONTRIBUTOR라도 내용 교체 가능
        current = h
            .engine
            .replace_content(&t.contributor, &doc.id, cmd)
            .await
            .unwrap();
        assert_eq!(current.version, expected);
        assert_eq!(current.revision_code, DEFAULT_REVISION_CODE);
    }

    let history = h.engine.history(&t.pm, &doc.id).await.unwrap();
    let versions: BTreeSet<i64> = history.iter().map(|e| e.version).collect();
    assert_eq!(versions, (1..=4).collect());
    assert_eq!(history.iter().map(|e| e.version).max(), Some(current.version));

    // 다른 CONTRIBUTOR는 남의 문서를 교체할 수 없음
    let other = actor("con-2", Role::Contributor);
    h.engine
        .add_member(
            &t.pm,
            &t.project.id,
            AddMemberRequest {
                user_id: other.id.clone(),
                role: Role::Contributor,
            },
        )
        .await
        .unwrap();
    let cmd = replacement(&h, "rev.pdf").await;
    let err = h.engine.replace_content(&other, &doc.id, cmd).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn concurrent_replacements_take_distinct_versions() {
    let h = harness().await;
    let t = team(&h).await;
    let doc = upload(&h, &t, &t.pm, "race.pdf").await;

    let first = replacement(&h, "race.pdf").await;
    let second = replacement(&h, "race.pdf").await;
    let (a, b) = tokio::join!(
        h.engine.replace_content(&t.pm, &doc.id, first),
        h.engine.replace_content(&t.bim, &doc.id, second),
    );

    let versions: Vec<i64> = [a, b]
        .into_iter()
        .filter_map(|r| r.ok())
        .map(|d| d.version)
        .collect();
    let distinct: BTreeSet<i64> = versions.iter().copied().collect();
    assert_eq!(distinct.len(), versions.len());

    let current = h.engine.get_document(&t.pm, &doc.id).await.unwrap();
    assert_eq!(current.version, 1 + versions.len() as i64);

    let history = h.engine.history(&t.pm, &doc.id).await.unwrap();
    let ledger_versions: BTreeSet<i64> = history.iter().map(|e| e.version).collect();
    assert_eq!(ledger_versions, (1..=current.version).collect());
}

/// 연결 여러 개짜리 파일 DB에서 교체를 동시에 시작합니다.
/// 성공한 쓰기마다 버전이 하나씩 올라가고, 진 쪽은 재시도 후 `conflict`를 받습니다.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_replacements_never_share_a_version() {
    const WRITERS: usize = 8;

    let h = file_harness(5).await;
    let t = team(&h).await;
    let doc = upload(&h, &t, &t.pm, "race.pdf").await;

    let mut tasks = Vec::with_capacity(WRITERS);
    for n in 0..WRITERS {
        let engine = h.engine.clone();
        let actor = if n % 2 == 0 { t.pm.clone() } else { t.bim.clone() };
        let document_id = doc.id.clone();
        let cmd = replacement(&h, &format!("race-{n}.pdf")).await;
        tasks.push(tokio::spawn(async move {
            engine.replace_content(&actor, &document_id, cmd).await
        }));
    }

    let mut versions = Vec::new();
    let mut errors = Vec::new();
    for task in tasks {
        match task.await.unwrap() {
            Ok(updated) => versions.push(updated.version),
            Err(e) => errors.push(e.code()),
        }
    }

    assert!(!versions.is_empty());
    assert_eq!(versions.len() + errors.len(), WRITERS);
    let distinct: BTreeSet<i64> = versions.iter().copied().collect();
    assert_eq!(distinct.len(), versions.len(), "versions = {versions:?}");
    assert!(errors.iter().all(|code| *code == "conflict"), "errors = {errors:?}");

    let current = h.engine.get_document(&t.pm, &doc.id).await.unwrap();
    assert_eq!(current.version, 1 + versions.len() as i64);

    let history = h.engine.history(&t.pm, &doc.id).await.unwrap();
    assert_eq!(history.len() as i64, current.version);
    let ledger_versions: BTreeSet<i64> = history.iter().map(|e| e.version).collect();
    assert_eq!(ledger_versions, (1..=current.version).collect());
}

#[tokio::test]
async fn replace_can_set_a_new_revision_code() {
    let h = harness().await;
    let t = team(&h).await;
    let doc = upload(&h, &t, &t.pm, "rc.pdf").await;

    let mut cmd = replacement(&h, "rc.pdf").await;
    cmd.revision_code = Some("P02".into());
    let doc = h.engine.replace_content(&t.pm, &doc.id, cmd).await.unwrap();
    assert_eq!(doc.revision_code, "P02");

    let history = h.engine.history(&t.pm, &doc.id).await.unwrap();
    assert_eq!(history[0].revision_code, "P02");
    assert_eq!(history[0].comment.as_deref(), Some("revised"));
    assert_eq!(history[1].revision_code, DEFAULT_REVISION_CODE);
}

#[tokio::test]
async fn ledger_rejects_regressions_and_rewrites() {
    let h = harness().await;
    let t = team(&h).await;
    let v1 = upload(&h, &t, &t.pm, "guard.pdf").await;
    let cmd = replacement(&h, "guard.pdf").await;
    let v2 = h.engine.replace_content(&t.pm, &v1.id, cmd).await.unwrap();

    let mut conn = h.pool.acquire().await.unwrap();

    let err = ledger::record(&mut conn, &v1, "pm-1", None).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let mut rewritten = v2.clone();
    rewritten.file_url = "/files/somewhere-else.pdf".into();
    let err = ledger::record(&mut conn, &rewritten, "pm-1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let mut skipped = v2.clone();
    skipped.version = 4;
    let err = ledger::record(&mut conn, &skipped, "pm-1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));
}

#[tokio::test]
async fn ledger_rows_are_append_only() {
    let h = harness().await;
    let t = team(&h).await;
    let doc = upload(&h, &t, &t.pm, "immutable.pdf").await;

    let result = sqlx::query("UPDATE document_history SET comment = 'edited' WHERE document_id = ?")
        .bind(&doc.id)
        .execute(&h.pool)
        .await;
    assert!(result.is_err());
}

// =============================================================================
// Metadata updates
// =============================================================================

#[tokio::test]
async fn metadata_update_merges_and_skips_the_ledger() {
    let h = harness().await;
    let t = team(&h).await;
    let doc = upload(&h, &t, &t.contributor, "meta.pdf").await;

    let updated = h
        .engine
        .update_metadata(
            &t.contributor,
            &doc.id,
            UpdateDocumentRequest {
                name: Some("meta-renamed.pdf".into()),
                metadata: Some(
                    [("discipline".to_string(), "ST".to_string())]
                        .into_iter()
                        .collect(),
                ),
                container_id: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "meta-renamed.pdf");
    assert_eq!(updated.metadata.0["discipline"], "ST");
    assert_eq!(updated.metadata.0["originator"], "ACME");
    assert_eq!(updated.version, 1);
    assert_eq!(updated.status, WorkInProgress);
    assert_eq!(h.engine.history(&t.pm, &doc.id).await.unwrap().len(), 1);

    // 병합 결과도 검증됨
    let err = h
        .engine
        .update_metadata(
            &t.pm,
            &doc.id,
            UpdateDocumentRequest {
                metadata: Some(
                    [("originator".to_string(), " ".to_string())]
                        .into_iter()
                        .collect(),
                ),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn metadata_update_with_container_change_moves_atomically() {
    let h = harness().await;
    let t = team(&h).await;
    let doc = upload(&h, &t, &t.pm, "combo.pdf").await;
    let mut events = h.events.subscribe();

    let updated = h
        .engine
        .update_metadata(
            &t.pm,
            &doc.id,
            UpdateDocumentRequest {
                name: Some("combo-shared.pdf".into()),
                metadata: None,
                container_id: Some(t.container(Shared).id.clone()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, Shared);
    assert_eq!(updated.name, "combo-shared.pdf");
    assert_eq!(h.engine.history(&t.pm, &doc.id).await.unwrap().len(), 2);
    assert_eq!(events.recv().await.unwrap().kind, EventKind::DocumentsMoved);
    assert_eq!(events.recv().await.unwrap().kind, EventKind::DocumentUpdated);

    // 불가능한 전이가 섞이면 이름도 바뀌지 않음
    let err = h
        .engine
        .update_metadata(
            &t.pm,
            &doc.id,
            UpdateDocumentRequest {
                name: Some("should-not-stick.pdf".into()),
                metadata: None,
                container_id: Some(t.container(Archived).id.clone()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
    let current = h.engine.get_document(&t.pm, &doc.id).await.unwrap();
    assert_eq!(current.name, "combo-shared.pdf");
    assert_eq!(current.status, Shared);
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn delete_clears_ledger_and_blobs() {
    let h = harness().await;
    let t = team(&h).await;
    let doc = upload(&h, &t, &t.pm, "Plan-A.pdf").await;
    let first_url = doc.file_url.clone();
    let cmd = replacement(&h, "Plan-A.pdf").await;
    let doc = h.engine.replace_content(&t.pm, &doc.id, cmd).await.unwrap();
    assert!(blob_exists(&h, &first_url));
    assert!(blob_exists(&h, &doc.file_url));

    // CONTRIBUTOR는 삭제 불가
    let err = h
        .engine
        .delete_document(&t.contributor, &doc.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    h.engine.delete_document(&t.bim, &doc.id).await.unwrap();

    let rows = db::list_history(&h.pool, &doc.id).await.unwrap();
    assert!(rows.is_empty());
    assert!(matches!(
        h.engine.get_document(&t.pm, &doc.id).await,
        Err(AppError::NotFound("Document"))
    ));
    assert!(!blob_exists(&h, &first_url));
    assert!(!blob_exists(&h, &doc.file_url));

    let again = upload(&h, &t, &t.pm, "Plan-A.pdf").await;
    assert_ne!(again.id, doc.id);
    assert_eq!(again.version, 1);
    assert_eq!(h.engine.history(&t.pm, &again.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn missing_blob_does_not_fail_delete() {
    let h = harness().await;
    let t = team(&h).await;
    let doc = upload(&h, &t, &t.pm, "gone.pdf").await;

    h.blobs.delete(&doc.file_url).await.unwrap();
    h.engine.delete_document(&t.pm, &doc.id).await.unwrap();
    assert!(db::get_document(&h.pool, &doc.id).await.unwrap().is_none());
}

// =============================================================================
// Containers, bulk move, timeouts
// =============================================================================

#[tokio::test]
async fn occupied_containers_cannot_be_deleted_or_restatused() {
    let h = harness().await;
    let t = team(&h).await;
    let wip = t.container(WorkInProgress).clone();
    upload(&h, &t, &t.pm, "anchor.pdf").await;

    let overview = h.engine.list_containers(&t.viewer, &t.project.id).await.unwrap();
    assert_eq!(overview.len(), 4);
    assert_eq!(overview[0].status, WorkInProgress);
    assert_eq!(overview[0].document_count, 1);

    let err = h.engine.delete_container(&t.pm, &wip.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = h
        .engine
        .update_container(
            &t.pm,
            &wip.id,
            UpdateContainerRequest {
                status: Some(Shared),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // 이름 변경은 가능
    let renamed = h
        .engine
        .update_container(
            &t.pm,
            &wip.id,
            UpdateContainerRequest {
                name: Some("Drafts".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Drafts");
    assert_eq!(renamed.status, WorkInProgress);

    // 빈 컨테이너는 삭제 가능, BIM 매니저는 컨테이너를 관리할 수 없음
    let archive = t.container(Archived);
    let err = h.engine.delete_container(&t.bim, &archive.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    h.engine.delete_container(&t.pm, &archive.id).await.unwrap();
    assert_eq!(
        h.engine.list_containers(&t.pm, &t.project.id).await.unwrap().len(),
        3
    );
}

#[tokio::test]
async fn bulk_move_reports_each_document() {
    let h = harness().await;
    let t = team(&h).await;
    let shared = t.container(Shared);
    let fresh = upload(&h, &t, &t.pm, "one.pdf").await;
    let already = upload(&h, &t, &t.pm, "two.pdf").await;
    h.engine
        .move_document(&t.pm, &already.id, &shared.id)
        .await
        .unwrap();

    let mut events = h.events.subscribe();
    let results = h
        .engine
        .move_documents(
            &t.pm,
            &[fresh.id.clone(), already.id.clone(), "missing".to_string()],
            &shared.id,
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].moved);
    assert_eq!(results[0].status, Some(Shared));
    assert!(!results[1].moved);
    assert_eq!(results[1].error.as_deref(), Some("validation_error"));
    assert_eq!(results[2].error.as_deref(), Some("not_found"));

    let event = events.recv().await.unwrap();
    assert_eq!(event.kind, EventKind::DocumentsMoved);
    assert_eq!(event.id, fresh.id);
    assert!(events.try_recv().is_err());

    let err = h.engine.move_documents(&t.pm, &[], &shared.id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn list_documents_filters_by_status() {
    let h = harness().await;
    let t = team(&h).await;
    let a = upload(&h, &t, &t.pm, "a.pdf").await;
    upload(&h, &t, &t.pm, "b.pdf").await;
    h.engine
        .move_document(&t.pm, &a.id, &t.container(Shared).id)
        .await
        .unwrap();

    let shared = h
        .engine
        .list_documents(
            &t.viewer,
            &t.project.id,
            &DocumentQuery {
                container_id: None,
                status: Some(Shared),
            },
        )
        .await
        .unwrap();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].id, a.id);

    let all = h
        .engine
        .list_documents(&t.viewer, &t.project.id, &DocumentQuery::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn timeout_surfaces_as_unavailable_without_partial_writes() {
    let h = harness().await;
    let t = team(&h).await;
    let doc = upload(&h, &t, &t.pm, "slow.pdf").await;
    let cmd = replacement(&h, "slow.pdf").await;

    let impatient = h.engine.clone().with_operation_timeout(Duration::from_millis(100));
    // 연결이 하나뿐이므로 붙잡고 있으면 엔진은 트랜잭션을 시작할 수 없음
    let held = h.pool.acquire().await.unwrap();
    let err = impatient
        .replace_content(&t.pm, &doc.id, cmd)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unavailable(_)));
    drop(held);

    let current = h.engine.get_document(&t.pm, &doc.id).await.unwrap();
    assert_eq!(current.version, 1);
    assert_eq!(h.engine.history(&t.pm, &doc.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn upload_emits_event_with_payload() {
    let h = harness().await;
    let t = team(&h).await;
    let mut events = h.events.subscribe();

    let doc = upload(&h, &t, &t.bim, "event.pdf").await;
    let event = events.recv().await.unwrap();
    assert_eq!(event.kind, EventKind::DocumentUploaded);
    assert_eq!(event.id, doc.id);
    assert_eq!(event.name, "event.pdf");
    assert_eq!(event.status, WorkInProgress);
    assert_eq!(event.container_id, doc.container_id);
    assert_eq!(event.actor_id, t.bim.id);
}
