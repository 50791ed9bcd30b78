use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::collections::BTreeMap;

use super::ContainerStatus;

/// 자유 형식 문서 메타데이터 (키/값)
pub type Metadata = BTreeMap<String, String>;

/// 새 문서의 기본 리비전 코드
pub const DEFAULT_REVISION_CODE: &str = "P01";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: String,
    pub project_id: String,
    pub container_id: Option<String>,
    pub name: String,
    pub original_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub file_type: String,
    /// 1부터 시작하고, 내용 교체마다 정확히 1씩 증가
    pub version: i64,
    pub revision_code: String,
    pub status: ContainerStatus,
    pub metadata: Json<Metadata>,
    pub uploader_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// 블롭 저장소에 이미 저장된 파일에 대한 참조
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRef {
    pub url: String,
    pub size: i64,
    pub content_type: String,
    pub original_name: String,
}

/// 업로드 명령. HTTP 계층이 multipart 본문을 저장한 뒤 만듭니다.
#[derive(Debug, Clone)]
pub struct UploadDocument {
    pub project_id: String,
    /// 없으면 프로젝트의 WIP 컨테이너
    pub container_id: Option<String>,
    /// 없으면 파일 이름 생성기의 결과 (실패 시 원본 파일 이름)
    pub name: Option<String>,
    pub revision_code: Option<String>,
    pub metadata: Metadata,
    pub file: FileRef,
}

/// 내용(버전) 교체 명령
#[derive(Debug, Clone)]
pub struct ReplaceContent {
    pub file: FileRef,
    /// 없으면 현재 리비전 코드 유지
    pub revision_code: Option<String>,
    pub comment: Option<String>,
}

/// `PATCH /documents/{id}` 요청 본문.
/// `status`는 받지 않습니다: 문서 상태는 항상 컨테이너에서 결정됩니다.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateDocumentRequest {
    pub name: Option<String>,
    /// 기존 메타데이터 위에 병합
    pub metadata: Option<Metadata>,
    /// 같은 호출에서 컨테이너도 바꾸면 이동 + 수정이 하나의 트랜잭션으로 처리됨
    pub container_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MoveDocumentRequest {
    pub container_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkMoveRequest {
    pub document_ids: Vec<String>,
    pub container_id: String,
}

/// 일괄 이동의 문서별 결과
#[derive(Debug, Clone, Serialize)]
pub struct MoveOutcome {
    pub document_id: String,
    pub moved: bool,
    pub status: Option<ContainerStatus>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DocumentQuery {
    pub container_id: Option<String>,
    pub status: Option<ContainerStatus>,
}
