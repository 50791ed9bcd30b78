//! # 컨테이너 라우트 핸들러
//!
//! ## 엔드포인트
//! - `GET    /api/v1/projects/{id}/containers` → 컨테이너 목록 (문서 수 포함)
//! - `POST   /api/v1/projects/{id}/containers` → 컨테이너 생성
//! - `PATCH  /api/v1/containers/{id}`          → 이름/코드/상태 수정
//! - `DELETE /api/v1/containers/{id}`          → 삭제 (비어 있을 때만)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use super::AppState;
use crate::{error::AppError, middleware::auth::AuthUser, models::*};

pub async fn list_containers(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(project_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let containers = state.engine.list_containers(&actor, &project_id).await?;
    Ok(Json(json!({ "containers": containers })))
}

pub async fn create_container(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(project_id): Path<String>,
    Json(req): Json<CreateContainerRequest>,
) -> Result<(StatusCode, Json<Container>), AppError> {
    let container = state
        .engine
        .create_container(&actor, &project_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(container)))
}

pub async fn update_container(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateContainerRequest>,
) -> Result<Json<Container>, AppError> {
    let container = state.engine.update_container(&actor, &id, req).await?;
    Ok(Json(container))
}

/// 성공 시 HTTP 204 No Content
pub async fn delete_container(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.engine.delete_container(&actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
