//! # 문서 데이터베이스 쿼리 모듈
//!
//! `documents` 테이블에 대한 쿼리 함수들입니다.
//!
//! 모든 함수는 sqlx `Executor`를 제네릭으로 받습니다. 연결 풀(`&SqlitePool`)과
//! 트랜잭션 안의 연결(`&mut *tx`) 모두 넘길 수 있어, 라이프사이클 엔진이
//! "읽기 → 계산 → 쓰기"를 한 트랜잭션으로 묶을 수 있습니다.
//! Executor는 한 번 쓰면 소비되므로 각 함수는 쿼리를 정확히 하나만 실행합니다.

use crate::error::AppError;
use crate::models::*;
// Executor: 쿼리를 실행할 수 있는 대상 (풀, 연결, 트랜잭션 안의 연결)
// Json: 메타데이터 맵을 TEXT 컬럼에 JSON 문자열로 저장/조회하는 래퍼
use sqlx::{types::Json, Executor, Sqlite};

/// 문서 행을 삽입할 때 필요한 값들
#[derive(Debug)]
pub struct NewDocument<'a> {
    pub id: &'a str,
    pub project_id: &'a str,
    pub container_id: &'a str,
    pub name: &'a str,
    pub file: &'a FileRef,
    pub revision_code: &'a str,
    pub status: ContainerStatus,
    pub metadata: &'a Metadata,
    pub uploader_id: &'a str,
}

/// 새 문서를 version = 1로 삽입합니다.
pub async fn insert_document<'e, E>(executor: E, doc: &NewDocument<'_>) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    // sqlx::query(): 결과 행을 구조체로 받지 않는 쿼리 (INSERT/UPDATE/DELETE)
    // r#"..."#: Raw 문자열 리터럴. SQL을 이스케이프 없이 그대로 씁니다.
    sqlx::query(
        r#"
        INSERT INTO documents (id, project_id, container_id, name, original_name, file_url,
                               file_size, file_type, version, revision_code, status, metadata,
                               uploader_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?, ?)
        "#,
        // ↑ version은 항상 1로 시작합니다. 나머지 `?`는 아래 .bind() 순서대로 채워집니다.
    )
    .bind(doc.id)
    .bind(doc.project_id)
    .bind(doc.container_id)
    .bind(doc.name)
    .bind(&doc.file.original_name)
    .bind(&doc.file.url)
    .bind(doc.file.size)
    .bind(&doc.file.content_type)
    .bind(doc.revision_code)
    // ContainerStatus는 #[derive(sqlx::Type)]이라 'SHARED' 같은 TEXT로 바인딩됩니다.
    .bind(doc.status)
    .bind(Json(doc.metadata))
    .bind(doc.uploader_id)
    // .execute(): 행을 돌려받지 않고 실행만 합니다. 결과에는 영향받은 행 수가 들어 있습니다.
    .execute(executor)
    // ?: sqlx::Error → AppError 변환 후 에러 전파 (error.rs의 From 구현)
    .await?;

    Ok(())
}

/// ID로 단일 문서를 조회합니다.
///
/// # 반환값
/// - `Ok(Some(Document))`: 문서를 찾은 경우
/// - `Ok(None)`: 해당 ID의 문서가 없는 경우
pub async fn get_document<'e, E>(executor: E, id: &str) -> Result<Option<Document>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let doc = sqlx::query_as::<_, Document>(
        r#"
        SELECT id, project_id, container_id, name, original_name, file_url, file_size,
               file_type, version, revision_code, status, metadata, uploader_id,
               created_at, updated_at
        FROM documents
        WHERE id = ?
        "#,
    )
    .bind(id)
    // .fetch_optional(): 0행이면 None, 1행이면 Some(Document)
    .fetch_optional(executor)
    .await?;

    Ok(doc)
}

/// 프로젝트의 문서 목록을 조회합니다. 컨테이너/상태로 걸러낼 수 있습니다.
///
/// `? IS NULL OR column = ?` 패턴으로 선택적 필터를 하나의 정적 쿼리로 표현합니다.
pub async fn list_documents<'e, E>(
    executor: E,
    project_id: &str,
    query: &DocumentQuery,
) -> Result<Vec<Document>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let docs = sqlx::query_as::<_, Document>(
        r#"
        SELECT id, project_id, container_id, name, original_name, file_url, file_size,
               file_type, version, revision_code, status, metadata, uploader_id,
               created_at, updated_at
        FROM documents
        WHERE project_id = ?
          AND (? IS NULL OR container_id = ?)
          AND (? IS NULL OR status = ?)
        ORDER BY updated_at DESC, id DESC
        "#,
        // ↑ 필터가 None이면 `? IS NULL`이 참이 되어 조건 전체가 무시됩니다.
    )
    .bind(project_id)
    .bind(&query.container_id)
    .bind(&query.container_id)
    .bind(query.status)
    .bind(query.status)
    // .fetch_all(): 모든 결과 행을 Vec으로 가져옵니다.
    .fetch_all(executor)
    .await?;

    Ok(docs)
}

/// 내용을 교체하고 버전을 1 올립니다 (compare-and-swap).
///
/// `expected_version`이 현재 값과 다르면 다른 쓰기가 먼저 커밋된 것이므로
/// 아무 행도 바꾸지 않고 `false`를 반환합니다.
pub async fn replace_content<'e, E>(
    executor: E,
    id: &str,
    expected_version: i64,
    file: &FileRef,
    revision_code: &str,
) -> Result<bool, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET version = version + 1,
            file_url = ?, file_size = ?, file_type = ?, original_name = ?,
            revision_code = ?,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ? AND version = ?
        "#,
        // ↑ version = ? 조건이 CAS의 핵심입니다. 그 사이 다른 쓰기가 버전을 올렸다면
        //   조건에 맞는 행이 없어 0행이 바뀝니다.
    )
    .bind(&file.url)
    .bind(file.size)
    .bind(&file.content_type)
    .bind(&file.original_name)
    .bind(revision_code)
    .bind(id)
    .bind(expected_version)
    .execute(executor)
    .await?;

    // rows_affected(): UPDATE가 실제로 바꾼 행 수. 0이면 경쟁에서 진 것입니다.
    Ok(result.rows_affected() == 1)
}

/// 컨테이너와 상태를 함께 바꿉니다 (compare-and-swap).
///
/// 읽었던 (version, status, container_id)가 그대로일 때만 갱신합니다.
/// `IS`는 NULL끼리도 같다고 비교하는 SQLite 연산자입니다.
pub async fn assign_container<'e, E>(
    executor: E,
    current: &Document,
    container_id: &str,
    status: ContainerStatus,
) -> Result<bool, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET container_id = ?, status = ?,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ? AND version = ? AND status = ? AND container_id IS ?
        "#,
    )
    .bind(container_id)
    .bind(status)
    .bind(&current.id)
    .bind(current.version)
    .bind(current.status)
    // &Option<String>: None이면 NULL로 바인딩됩니다.
    .bind(&current.container_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// 이름과 메타데이터를 수정합니다. 버전과 상태는 건드리지 않습니다.
pub async fn update_fields<'e, E>(
    executor: E,
    id: &str,
    name: &str,
    metadata: &Metadata,
) -> Result<bool, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET name = ?, metadata = ?,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(name)
    .bind(Json(metadata))
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// 문서 행을 삭제합니다. 원장 행이 남아 있으면 외래 키 때문에 실패합니다.
pub async fn delete_document<'e, E>(executor: E, id: &str) -> Result<bool, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// 컨테이너를 참조하는 문서 수
pub async fn count_in_container<'e, E>(executor: E, container_id: &str) -> Result<i64, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    // query_scalar: 첫 행의 첫 컬럼 하나만 꺼냅니다. COUNT(*)는 항상 한 행입니다.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE container_id = ?")
        .bind(container_id)
        .fetch_one(executor)
        .await?;

    Ok(count)
}
