//! # 버전 원장 쿼리 모듈
//!
//! `document_history` 테이블은 INSERT와 문서 삭제 시의 DELETE만 받습니다.
//! UPDATE는 스키마 트리거가 거부합니다.

use crate::error::AppError;
use crate::models::{ContainerStatus, DocumentHistory};
use sqlx::{Executor, Sqlite};

#[derive(Debug)]
pub struct NewHistory<'a> {
    pub document_id: &'a str,
    pub version: i64,
    pub file_url: &'a str,
    pub revision_code: &'a str,
    pub status: ContainerStatus,
    pub updated_by: &'a str,
    pub comment: Option<&'a str>,
}

pub async fn insert_history<'e, E>(executor: E, entry: &NewHistory<'_>) -> Result<String, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    // UUIDv7: 시간순으로 정렬되므로 같은 시각의 행끼리도 순서가 유지됩니다.
    let id = uuid::Uuid::now_v7().to_string();

    sqlx::query(
        r#"
        INSERT INTO document_history (id, document_id, version, file_url, revision_code,
                                      status, updated_by, comment)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(entry.document_id)
    .bind(entry.version)
    .bind(entry.file_url)
    .bind(entry.revision_code)
    .bind(entry.status)
    .bind(entry.updated_by)
    // Option<&str>: None이면 comment 컬럼이 NULL이 됩니다.
    .bind(entry.comment)
    .execute(executor)
    .await?;

    Ok(id)
}

/// 최신 항목이 먼저 오도록 정렬합니다.
/// 같은 밀리초에 생긴 행은 UUIDv7 id가 생성 순서를 보존합니다.
pub async fn list_history<'e, E>(
    executor: E,
    document_id: &str,
) -> Result<Vec<DocumentHistory>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, DocumentHistory>(
        r#"
        SELECT id, document_id, version, file_url, revision_code, status, updated_by,
               comment, created_at
        FROM document_history
        WHERE document_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(document_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

/// 원장에 기록된 가장 높은 버전과 그 버전의 파일 URL
pub async fn latest_version<'e, E>(
    executor: E,
    document_id: &str,
) -> Result<Option<(i64, String)>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    // 구조체 대신 튜플로 받습니다. 컬럼 순서대로 (version, file_url)입니다.
    let row: Option<(i64, String)> = sqlx::query_as(
        r#"
        SELECT version, file_url
        FROM document_history
        WHERE document_id = ?
        ORDER BY version DESC, created_at DESC
        LIMIT 1
        "#,
    )
    .bind(document_id)
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// 지금까지 원장에 등장한 모든 파일 URL (중복 제거)
pub async fn file_urls<'e, E>(executor: E, document_id: &str) -> Result<Vec<String>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let urls: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT file_url FROM document_history WHERE document_id = ?",
    )
    .bind(document_id)
    .fetch_all(executor)
    .await?;

    Ok(urls)
}

pub async fn delete_history<'e, E>(executor: E, document_id: &str) -> Result<u64, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM document_history WHERE document_id = ?")
        .bind(document_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}
