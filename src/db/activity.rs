use crate::error::AppError;
use crate::models::{ActivityEntry, ActivityLog};
use sqlx::{Executor, Sqlite};

pub async fn insert_activity<'e, E>(executor: E, entry: &ActivityEntry) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id = uuid::Uuid::now_v7().to_string();

    sqlx::query(
        r#"
        INSERT INTO activity_logs (id, user_id, action, object_type, object_id, description,
                                   status_code, duration_ms)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&entry.user_id)
    .bind(&entry.action)
    .bind(&entry.object_type)
    .bind(&entry.object_id)
    .bind(&entry.description)
    // SQLite INTEGER는 i64입니다.
    .bind(i64::from(entry.status_code))
    .bind(i64::try_from(entry.duration_ms).unwrap_or(i64::MAX))
    .execute(executor)
    .await?;

    Ok(())
}

/// 최근 활동부터 `limit`개. `user_id`가 주어지면 해당 사용자만.
pub async fn list_activity<'e, E>(
    executor: E,
    user_id: Option<&str>,
    limit: i64,
) -> Result<Vec<ActivityLog>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let logs = sqlx::query_as::<_, ActivityLog>(
        r#"
        SELECT id, user_id, action, object_type, object_id, description, status_code,
               duration_ms, created_at
        FROM activity_logs
        WHERE (? IS NULL OR user_id = ?)   -- user_id가 없으면 전체
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .bind(limit)
    .fetch_all(executor)
    .await?;

    Ok(logs)
}
