use crate::error::AppError;
use crate::models::*;
use sqlx::{Executor, Sqlite};

pub async fn insert_project<'e, E>(
    executor: E,
    id: &str,
    name: &str,
    code: &str,
    created_by: &str,
) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT INTO projects (id, name, code, created_by) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(name)
        .bind(code)
        .bind(created_by)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn get_project<'e, E>(executor: E, id: &str) -> Result<Option<Project>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let project = sqlx::query_as::<_, Project>(
        "SELECT id, name, code, created_by, created_at, updated_at FROM projects WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(project)
}

/// 멤버를 추가합니다. 이미 멤버이면 역할만 바꿉니다.
pub async fn upsert_member<'e, E>(
    executor: E,
    project_id: &str,
    user_id: &str,
    role: Role,
) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO project_members (project_id, user_id, role)
        VALUES (?, ?, ?)
        ON CONFLICT (project_id, user_id) DO UPDATE SET role = excluded.role
        "#,
        // ↑ excluded: 충돌로 삽입되지 못한 새 행. 이미 멤버면 역할만 새 값으로 바꿉니다.
    )
    .bind(project_id)
    .bind(user_id)
    .bind(role)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn get_membership<'e, E>(
    executor: E,
    project_id: &str,
    user_id: &str,
) -> Result<Option<ProjectMember>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let member = sqlx::query_as::<_, ProjectMember>(
        r#"
        SELECT project_id, user_id, role, created_at
        FROM project_members
        WHERE project_id = ? AND user_id = ?
        "#,
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await?;

    Ok(member)
}

pub async fn list_members<'e, E>(
    executor: E,
    project_id: &str,
) -> Result<Vec<ProjectMember>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let members = sqlx::query_as::<_, ProjectMember>(
        r#"
        SELECT project_id, user_id, role, created_at
        FROM project_members
        WHERE project_id = ?
        ORDER BY created_at, user_id
        "#,
    )
    .bind(project_id)
    .fetch_all(executor)
    .await?;

    Ok(members)
}
