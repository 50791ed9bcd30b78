use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};

use super::AppState;
use crate::{error::AppError, middleware::auth::AuthUser, models::ActivityQuery};

/// `GET /activity?limit=50&user_id=...`: 최근 감사 로그 (ADMIN 전용)
pub async fn list_activity(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Value>, AppError> {
    let logs = state.engine.list_activity(&actor, &query).await?;
    Ok(Json(json!({ "activity": logs })))
}
