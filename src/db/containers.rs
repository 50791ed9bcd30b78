//! # 컨테이너 데이터베이스 쿼리 모듈
//!
//! `containers` 테이블 CRUD. 컨테이너 삭제는 문서가 참조하는 동안
//! 스키마(`ON DELETE RESTRICT`)와 엔진 양쪽에서 막힙니다.

use crate::error::AppError;
use crate::models::*;
use sqlx::{Executor, Sqlite};

pub async fn insert_container<'e, E>(
    executor: E,
    id: &str,
    project_id: &str,
    name: &str,
    code: &str,
    status: ContainerStatus,
) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO containers (id, project_id, name, code, status)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(project_id)
    .bind(name)
    .bind(code)
    .bind(status)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn get_container<'e, E>(executor: E, id: &str) -> Result<Option<Container>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let container = sqlx::query_as::<_, Container>(
        r#"
        SELECT id, project_id, name, code, status, created_at, updated_at
        FROM containers
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(container)
}

/// 프로젝트에서 주어진 상태를 가진 첫 컨테이너 (가장 먼저 만들어진 것).
/// 업로드 대상이 지정되지 않았을 때 WIP 컨테이너를 찾는 데 씁니다.
pub async fn first_with_status<'e, E>(
    executor: E,
    project_id: &str,
    status: ContainerStatus,
) -> Result<Option<Container>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let container = sqlx::query_as::<_, Container>(
        r#"
        SELECT id, project_id, name, code, status, created_at, updated_at
        FROM containers
        WHERE project_id = ? AND status = ?
        ORDER BY created_at, id
        LIMIT 1
        "#,
        // ↑ LIMIT 1 + fetch_optional: 가장 오래된 컨테이너 하나 또는 None
    )
    .bind(project_id)
    .bind(status)
    .fetch_optional(executor)
    .await?;

    Ok(container)
}

/// 프로젝트의 컨테이너 목록 (CDE 단계 순서 → 이름순), 소속 문서 수 포함
pub async fn list_containers<'e, E>(
    executor: E,
    project_id: &str,
) -> Result<Vec<ContainerOverview>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let containers = sqlx::query_as::<_, ContainerOverview>(
        r#"
        SELECT c.id, c.project_id, c.name, c.code, c.status,
               -- 상관 서브쿼리: 컨테이너마다 소속 문서 수를 셉니다.
               (SELECT COUNT(*) FROM documents d WHERE d.container_id = c.id) AS document_count,
               c.created_at, c.updated_at
        FROM containers c
        WHERE c.project_id = ?
        ORDER BY CASE c.status
                     WHEN 'WORK_IN_PROGRESS' THEN 0
                     WHEN 'SHARED' THEN 1
                     WHEN 'PUBLISHED' THEN 2
                     ELSE 3
                 END,
                 c.name
        "#,
    )
    .bind(project_id)
    .fetch_all(executor)
    .await?;

    Ok(containers)
}

/// 부분 업데이트. `None`인 필드는 COALESCE로 기존 값을 유지합니다.
pub async fn update_container<'e, E>(
    executor: E,
    id: &str,
    req: &UpdateContainerRequest,
) -> Result<bool, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE containers
        SET name = COALESCE(?, name),
            code = COALESCE(?, code),
            status = COALESCE(?, status),
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    // None을 바인딩하면 NULL → COALESCE가 기존 값을 고릅니다.
    .bind(&req.name)
    .bind(&req.code)
    .bind(req.status)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_container<'e, E>(executor: E, id: &str) -> Result<bool, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM containers WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}
