use serde::{Deserialize, Serialize};

use super::ContainerStatus;

/// 문서 버전 원장의 한 행. 삽입 이후 변경되지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DocumentHistory {
    pub id: String,
    pub document_id: String,
    pub version: i64,
    pub file_url: String,
    pub revision_code: String,
    pub status: ContainerStatus,
    pub updated_by: String,
    pub comment: Option<String>,
    pub created_at: String,
}
