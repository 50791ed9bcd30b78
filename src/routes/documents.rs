//! # 문서(Document) 라우트 핸들러
//!
//! ## 엔드포인트
//! - `GET    /api/v1/projects/{id}/documents` → 문서 목록 (`?container_id=&status=`)
//! - `POST   /api/v1/projects/{id}/documents` → 업로드 (multipart)
//! - `GET    /api/v1/documents/{id}`          → 단일 문서 조회
//! - `PATCH  /api/v1/documents/{id}`          → 이름/메타데이터 수정 (+ 선택적 이동)
//! - `DELETE /api/v1/documents/{id}`          → 삭제
//! - `PUT    /api/v1/documents/{id}/content`  → 내용 교체, 버전 +1 (multipart)
//! - `POST   /api/v1/documents/{id}/move`     → 다른 컨테이너로 이동
//! - `POST   /api/v1/documents/move`          → 일괄 이동
//! - `GET    /api/v1/documents/{id}/history`  → 버전 원장 (최신순)
//!
//! ## multipart 필드
//! - `file` (필수): 파일 본문
//! - 업로드: `name`, `container_id`, `revision_code`, `metadata` (JSON 객체 문자열)
//! - 내용 교체: `revision_code`, `comment`
//!
//! 파일은 엔진을 호출하기 전에 블롭 저장소에 저장합니다. 엔진이 요청을 거부하면
//! 방금 저장한 블롭을 지웁니다.

use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use super::AppState;
use crate::{error::AppError, middleware::auth::AuthUser, models::*};

/// multipart 본문에서 읽은 파일 하나
struct UploadedFile {
    original_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// `file` 필드와 나머지 텍스트 필드
#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == "file" {
                let original_name = field.file_name().unwrap_or("unnamed").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.file = Some(UploadedFile {
                    original_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// 비어 있지 않은 텍스트 필드
    fn text(&self, key: &str) -> Option<String> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn metadata(&self) -> Result<Metadata, AppError> {
        match self.text("metadata") {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                AppError::validation(format!("metadata must be a JSON object of strings: {e}"))
            }),
            None => Ok(Metadata::new()),
        }
    }
}

/// 파일을 블롭 저장소에 저장하고 참조를 만듭니다.
async fn store_file(state: &AppState, file: UploadedFile) -> Result<FileRef, AppError> {
    if file.bytes.is_empty() {
        return Err(AppError::validation("file must not be empty"));
    }

    let url = state.blobs.save(&file.original_name, &file.bytes).await?;
    Ok(FileRef {
        url,
        size: file.bytes.len() as i64,
        content_type: file.content_type,
        original_name: file.original_name,
    })
}

/// 엔진이 거부한 요청의 블롭을 치웁니다. 실패해도 원래 에러를 돌려줍니다.
async fn discard_blob(state: &AppState, url: &str) {
    if let Err(e) = state.blobs.delete(url).await {
        tracing::warn!(%url, error = %e, "failed to discard rejected upload");
    }
}

pub async fn list_documents(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(project_id): Path<String>,
    Query(query): Query<DocumentQuery>,
) -> Result<Json<Value>, AppError> {
    let documents = state
        .engine
        .list_documents(&actor, &project_id, &query)
        .await?;
    Ok(Json(json!({ "documents": documents })))
}

pub async fn upload_document(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(project_id): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Document>), AppError> {
    let mut form = UploadForm::read(multipart).await?;
    let metadata = form.metadata()?;
    let file = form
        .file
        .take()
        .ok_or_else(|| AppError::validation("file is required"))?;
    let file = store_file(&state, file).await?;
    let url = file.url.clone();

    let cmd = UploadDocument {
        project_id,
        container_id: form.text("container_id"),
        name: form.text("name"),
        revision_code: form.text("revision_code"),
        metadata,
        file,
    };

    match state.engine.upload(&actor, cmd).await {
        Ok(document) => Ok((StatusCode::CREATED, Json(document))),
        Err(e) => {
            discard_blob(&state, &url).await;
            Err(e)
        }
    }
}

pub async fn get_document(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Document>, AppError> {
    let document = state.engine.get_document(&actor, &id).await?;
    Ok(Json(document))
}

/// 요청 본문에 포함된 필드만 업데이트합니다.
/// 예: `{ "metadata": { "discipline": "ST" } }`
pub async fn update_document(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateDocumentRequest>,
) -> Result<Json<Document>, AppError> {
    let document = state.engine.update_metadata(&actor, &id, req).await?;
    Ok(Json(document))
}

/// 성공 시 HTTP 204 No Content
pub async fn delete_document(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.engine.delete_document(&actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn replace_content(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Document>, AppError> {
    let mut form = UploadForm::read(multipart).await?;
    let file = form
        .file
        .take()
        .ok_or_else(|| AppError::validation("file is required"))?;
    let file = store_file(&state, file).await?;
    let url = file.url.clone();

    let cmd = ReplaceContent {
        file,
        revision_code: form.text("revision_code"),
        comment: form.text("comment"),
    };

    match state.engine.replace_content(&actor, &id, cmd).await {
        Ok(document) => Ok(Json(document)),
        Err(e) => {
            discard_blob(&state, &url).await;
            Err(e)
        }
    }
}

pub async fn move_document(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<MoveDocumentRequest>,
) -> Result<Json<Document>, AppError> {
    let document = state
        .engine
        .move_document(&actor, &id, &req.container_id)
        .await?;
    Ok(Json(document))
}

/// 문서별 결과를 돌려줍니다. 일부가 실패해도 응답은 200입니다.
pub async fn move_documents(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(req): Json<BulkMoveRequest>,
) -> Result<Json<Value>, AppError> {
    let results = state
        .engine
        .move_documents(&actor, &req.document_ids, &req.container_id)
        .await?;
    let moved = results.iter().filter(|r| r.moved).count();
    Ok(Json(json!({ "moved": moved, "results": results })))
}

pub async fn document_history(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let history = state.engine.history(&actor, &id).await?;
    Ok(Json(json!({ "history": history })))
}
