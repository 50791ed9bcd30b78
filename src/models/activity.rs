use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityLog {
    pub id: String,
    pub user_id: String,
    pub action: String,
    pub object_type: String,
    pub object_id: Option<String>,
    pub description: String,
    pub status_code: i64,
    pub duration_ms: i64,
    pub created_at: String,
}

/// 감사 기록기로 보내는 항목
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub user_id: String,
    pub action: String,
    pub object_type: String,
    pub object_id: Option<String>,
    pub description: String,
    pub status_code: u16,
    pub duration_ms: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
    pub user_id: Option<String>,
}
