//! # 버전 원장 (Version Ledger)
//!
//! 문서의 내용/상태/컨테이너가 바뀔 때마다 현재 문서 행의 스냅샷을
//! `document_history`에 한 행씩 덧붙입니다. 과거 행은 수정하지 않으며
//! (스키마 트리거로도 막혀 있음), 문서 삭제 시에만 통째로 지웁니다.
//!
//! 지키는 규칙:
//! - 원장의 최대 버전 == `Document.version`
//! - 버전은 거꾸로 가거나 건너뛰지 않는다
//! - 같은 버전의 행이 서로 다른 파일을 가리키지 않는다
//!
//! 기록은 항상 문서 갱신과 같은 트랜잭션 안에서 이루어집니다.

use sqlx::{Executor, Sqlite, SqliteConnection};

use crate::db::{self, NewHistory};
use crate::error::AppError;
use crate::models::{Document, DocumentHistory};

pub const INITIAL_UPLOAD_COMMENT: &str = "Initial upload";

/// 컨테이너 이동 시 남기는 코멘트
pub fn moved_comment(container_name: &str) -> String {
    format!("Moved to {container_name} container")
}

/// 문서의 현재 상태를 원장에 덧붙입니다.
///
/// `doc`은 같은 트랜잭션에서 방금 갱신 후 다시 읽은 행이어야 합니다.
pub async fn record(
    conn: &mut SqliteConnection,
    doc: &Document,
    updated_by: &str,
    comment: Option<&str>,
) -> Result<String, AppError> {
    match db::latest_version(&mut *conn, &doc.id).await? {
        None if doc.version != 1 => {
            return Err(AppError::Internal(format!(
                "ledger for document {} is empty but document is at version {}",
                doc.id, doc.version
            )));
        }
        Some((latest, _)) if doc.version < latest => {
            return Err(AppError::Conflict(format!(
                "document {} is at version {} but ledger already holds version {}",
                doc.id, doc.version, latest
            )));
        }
        Some((latest, _)) if doc.version > latest + 1 => {
            return Err(AppError::Internal(format!(
                "ledger for document {} would skip from version {} to {}",
                doc.id, latest, doc.version
            )));
        }
        Some((latest, ref url)) if doc.version == latest && *url != doc.file_url => {
            return Err(AppError::Conflict(format!(
                "version {} of document {} is already recorded with different content",
                doc.version, doc.id
            )));
        }
        _ => {}
    }

    let id = db::insert_history(
        conn,
        &NewHistory {
            document_id: &doc.id,
            version: doc.version,
            file_url: &doc.file_url,
            revision_code: &doc.revision_code,
            status: doc.status,
            updated_by,
            comment,
        },
    )
    .await?;

    tracing::debug!(
        document_id = %doc.id,
        version = doc.version,
        status = %doc.status,
        "ledger entry appended"
    );

    Ok(id)
}

/// 최신순 원장
pub async fn entries<'e, E>(executor: E, document_id: &str) -> Result<Vec<DocumentHistory>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    db::list_history(executor, document_id).await
}

/// 문서의 원장을 지우고, 그동안 참조했던 파일 URL 목록을 돌려줍니다.
/// 문서 행을 지우기 전에 호출해야 합니다 (외래 키).
pub async fn purge(conn: &mut SqliteConnection, document_id: &str) -> Result<Vec<String>, AppError> {
    let urls = db::file_urls(&mut *conn, document_id).await?;
    let removed = db::delete_history(conn, document_id).await?;
    tracing::debug!(document_id, removed, "ledger purged");
    Ok(urls)
}
