use serde::{Deserialize, Serialize};
use std::fmt;

/// 컨테이너가 나타내는 CDE 성숙도 단계.
/// 문서의 `status`도 같은 타입이며, 항상 소속 컨테이너의 값과 같습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerStatus {
    WorkInProgress,
    Shared,
    Published,
    Archived,
}

impl ContainerStatus {
    pub const ALL: [ContainerStatus; 4] = [
        ContainerStatus::WorkInProgress,
        ContainerStatus::Shared,
        ContainerStatus::Published,
        ContainerStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerStatus::WorkInProgress => "WORK_IN_PROGRESS",
            ContainerStatus::Shared => "SHARED",
            ContainerStatus::Published => "PUBLISHED",
            ContainerStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Container {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub code: String,
    pub status: ContainerStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// 컨테이너 목록 조회용: 소속 문서 수 포함
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ContainerOverview {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub code: String,
    pub status: ContainerStatus,
    pub document_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateContainerRequest {
    pub name: String,
    pub code: String,
    pub status: ContainerStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateContainerRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    /// 비어 있는 컨테이너에서만 변경 가능
    pub status: Option<ContainerStatus>,
}
