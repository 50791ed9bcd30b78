//! # 블롭 저장소
//!
//! 업로드된 파일의 바이트를 저장하고 URL로 주소를 매깁니다.
//! 엔진에게 파일 내용은 불투명하며, URL만 문서/원장 행에 기록됩니다.
//!
//! - `BlobStore`: 저장소 포트 (`save`, `delete`)
//! - `LocalBlobStore`: 로컬 디렉토리 구현. `{public_prefix}/{key}` 형태의 URL을 돌려주고,
//!   서버는 같은 디렉토리를 `public_prefix` 경로로 정적 서빙합니다.

use async_trait::async_trait;
// Path : PathBuf = &str : String
use std::path::{Path, PathBuf};
// 비동기 서버에서는 블로킹 std::fs 대신 tokio::fs를 사용합니다.
use tokio::fs;

use crate::error::AppError;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 바이트를 저장하고 공개 URL을 돌려줍니다.
    async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, AppError>;

    /// URL이 가리키는 블롭을 지웁니다. 호출자는 실패를 치명적으로 다루지 않습니다.
    async fn delete(&self, url: &str) -> Result<(), AppError>;
}

#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalBlobStore {
    /// # 매개변수
    /// - `root`: 파일이 저장될 디렉토리 (예: "data/uploads")
    /// - `public_prefix`: URL 접두사 (예: "/files")
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// URL에서 저장소 키를 꺼냅니다. 다른 저장소의 URL이나 경로 탈출은 거부합니다.
    fn key_for(&self, url: &str) -> Result<String, AppError> {
        let key = url
            .strip_prefix(&self.public_prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| AppError::BadRequest(format!("blob url outside this store: {url}")))?;

        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(AppError::BadRequest(format!("invalid blob key: {key}")));
        }
        Ok(key.to_string())
    }
}

/// 저장 키 생성: UUIDv7 + slug 처리한 원본 이름
///
/// # 예시
/// ```text
/// generate_key("Plan A.pdf") → "0190c1d2-...-plan-a.pdf"
/// ```
pub fn generate_key(original_name: &str) -> String {
    let path = Path::new(original_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(slug::slugify)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "file".to_string());
    let id = uuid::Uuid::now_v7();

    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(slug::slugify)
        .filter(|e| !e.is_empty())
    {
        Some(ext) => format!("{id}-{stem}.{ext}"),
        None => format!("{id}-{stem}"),
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, AppError> {
        // create_dir_all: 중간 디렉토리까지 모두 생성 (이미 있으면 무시)
        fs::create_dir_all(&self.root).await?;

        let key = generate_key(original_name);
        fs::write(self.root.join(&key), bytes).await?;

        Ok(format!("{}/{}", self.public_prefix, key))
    }

    async fn delete(&self, url: &str) -> Result<(), AppError> {
        let key = self.key_for(url)?;
        fs::remove_file(self.root.join(key)).await?;
        Ok(())
    }
}
