//! # 프로젝트 라우트 핸들러
//!
//! ## 엔드포인트
//! - `POST /api/v1/projects`              → 프로젝트 생성 (단계별 컨테이너 포함)
//! - `GET  /api/v1/projects/{id}`         → 프로젝트 조회
//! - `GET  /api/v1/projects/{id}/members` → 멤버 목록
//! - `POST /api/v1/projects/{id}/members` → 멤버 추가 / 역할 변경

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use super::AppState;
use crate::{error::AppError, middleware::auth::AuthUser, models::*};

pub async fn create_project(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let (project, containers) = state.engine.create_project(&actor, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "project": project, "containers": containers })),
    ))
}

pub async fn get_project(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Project>, AppError> {
    let project = state.engine.get_project(&actor, &id).await?;
    Ok(Json(project))
}

pub async fn list_members(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let members = state.engine.list_members(&actor, &id).await?;
    Ok(Json(json!({ "members": members })))
}

pub async fn add_member(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<ProjectMember>), AppError> {
    let member = state.engine.add_member(&actor, &id, req).await?;
    Ok((StatusCode::CREATED, Json(member)))
}
