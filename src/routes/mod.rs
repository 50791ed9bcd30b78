//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 라이프사이클 엔진 호출로 바꾸는 얇은 어댑터들입니다.
//! 규칙 판단은 모두 `services::LifecycleEngine`이 하고, 핸들러는 요청 파싱과
//! 응답 형태만 담당합니다.
//!
//! 각 하위 모듈:
//! - `activity`: 감사 로그 조회 (ADMIN)
//! - `containers`: 컨테이너 관리
//! - `documents`: 업로드, 내용 교체, 이동, 수정, 삭제, 원장 조회
//! - `health`: 서버 상태 확인 (헬스체크)
//! - `projects`: 프로젝트와 멤버십

pub mod activity;
pub mod containers;
pub mod documents;
pub mod health;
pub mod projects;

pub use activity::*;
pub use containers::*;
pub use documents::*;
pub use health::*;
pub use projects::*;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
    Router,
};

use crate::middleware::audit::record_activity;
use crate::services::{AuditRecorder, BlobStore, LifecycleEngine};

/// 애플리케이션 공유 상태
///
/// 모든 요청 핸들러가 `State(state): State<AppState>`로 접근합니다.
/// 필드가 모두 내부적으로 Arc/채널이라 clone이 가볍습니다.
#[derive(Clone)]
pub struct AppState {
    pub engine: LifecycleEngine,
    /// multipart 본문을 엔진 호출 전에 저장하는 데 씁니다.
    pub blobs: Arc<dyn BlobStore>,
    pub audit: AuditRecorder,
    /// JWT 토큰 검증용 비밀키
    pub jwt_secret: String,
    pub max_upload_bytes: usize,
}

/// `/api/v1` 아래의 모든 API 라우트. 감사 레이어와 본문 크기 제한이 함께 걸립니다.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        // 프로젝트와 멤버
        .route("/projects", post(create_project))
        .route("/projects/{id}", get(get_project))
        .route("/projects/{id}/members", get(list_members).post(add_member))
        // 컨테이너
        .route(
            "/projects/{id}/containers",
            get(list_containers).post(create_container),
        )
        .route(
            "/containers/{id}",
            patch(update_container).delete(delete_container),
        )
        // 문서
        .route(
            "/projects/{id}/documents",
            get(list_documents).post(upload_document),
        )
        .route("/documents/move", post(move_documents))
        .route(
            "/documents/{id}",
            get(get_document)
                .patch(update_document)
                .delete(delete_document),
        )
        .route("/documents/{id}/content", put(replace_content))
        .route("/documents/{id}/move", post(move_document))
        .route("/documents/{id}/history", get(document_history))
        // 감사 로그
        .route("/activity", get(list_activity))
        .layer(from_fn_with_state(state.clone(), record_activity))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .with_state(state);

    Router::new().nest("/api/v1", api)
}
