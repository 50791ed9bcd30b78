//! # 에러 처리 모듈
//!
//! 라이프사이클 엔진과 HTTP 계층이 공유하는 에러 타입을 정의합니다.
//! Rust에서는 예외(exception) 대신 `Result<T, E>` 타입으로 에러를 처리합니다.
//!
//! 이 모듈의 핵심:
//! - `AppError` 열거형(enum): 검증/권한/상태 전이/동시성/가용성 에러를 하나의 타입으로 통합
//! - `IntoResponse` 구현: 에러를 HTTP 응답으로 자동 변환
//!
//! 모든 에러는 호출자가 복구할 수 있는 에러입니다. 엔진이 스스로 재시도하는 경우는
//! 낙관적 동시성 충돌(`is_retryable()`) 하나뿐입니다.

use axum::{
    http::StatusCode,                   // HTTP 상태 코드 (200, 404, 500 등)
    response::{IntoResponse, Response}, // Axum의 응답 변환 트레이트
    Json,                               // JSON 응답 래퍼
};
use serde_json::json; // json! 매크로: JSON 객체를 간편하게 생성
use thiserror::Error; // thiserror: 커스텀 에러 타입을 쉽게 만들어주는 매크로 크레이트

use crate::models::ContainerStatus;

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
///
/// 각 에러 variant는 적절한 HTTP 상태 코드와 메시지로 변환됩니다.
/// 핸들러에서 `Result<T, AppError>`를 반환하면,
/// Axum이 자동으로 `IntoResponse`를 호출하여 HTTP 응답으로 변환합니다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 입력값 검증 실패 (HTTP 422)
    /// 누락된 필수 메타데이터 필드 등 여러 개의 사유를 담을 수 있습니다.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// 잘못된 요청 형식 (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 프로젝트/컨테이너/문서를 찾을 수 없음 (HTTP 404)
    /// 어떤 리소스가 없는지를 정적 문자열로 담습니다.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// 권한 게이트가 거부함 (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 컨테이너 상태 머신이 거부한 이동 (HTTP 409)
    /// `Forbidden`과 구분됩니다: 누가 요청하든 불가능한 전이입니다.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: ContainerStatus,
        to: ContainerStatus,
    },

    /// 동시 쓰기 경쟁에서 패배 / 참조 무결성 충돌 (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 타임아웃 또는 저장소 장애 (HTTP 503)
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// 인증 실패 (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 데이터베이스 오류 (HTTP 500)
    /// `From<sqlx::Error>`는 아래에서 직접 구현합니다. 풀 타임아웃은 `Unavailable`로 분류합니다.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// 파일 입출력 오류 (HTTP 500)
    /// #[from]: std::io::Error → AppError::Io 자동 변환
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 서버 내부 오류 (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),
}

// `?` 연산자로 sqlx 에러를 전파할 때 호출됩니다.
// 연결 풀 타임아웃/종료는 503(Unavailable)입니다.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => {
                AppError::Unavailable("database pool timed out".to_string())
            }
            sqlx::Error::PoolClosed => AppError::Unavailable("database pool closed".to_string()),
            other => AppError::Database(other),
        }
    }
}

impl AppError {
    /// 메타데이터 필드 하나에 대한 검증 에러를 만듭니다.
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(vec![message.into()])
    }

    /// 낙관적 재시도 대상인지 확인합니다.
    ///
    /// SQLite가 다른 쓰기 트랜잭션 때문에 잠금을 얻지 못한 경우(BUSY=5, LOCKED=6)입니다.
    /// 확장 에러 코드(예: 517 = BUSY_SNAPSHOT)는 하위 8비트가 기본 코드입니다.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(sqlx::Error::Database(db_err)) => db_err
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .is_some_and(|code| matches!(code & 0xff, 5 | 6)),
            _ => false,
        }
    }

    /// 에러를 짧은 코드 문자열로 변환합니다. 응답 본문과 일괄 이동 결과에서 사용합니다.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden(_) => "forbidden",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::Conflict(_) => "conflict",
            AppError::Unavailable(_) => "unavailable",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Database(_) => "database_error",
            AppError::Io(_) => "io_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// 에러에 대응하는 HTTP 상태 코드
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidTransition { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_) | AppError::Io(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    /// AppError를 HTTP 응답으로 변환합니다.
    ///
    /// 내부 에러(Database, IO, Internal)는 실제 에러 내용을 로그에만 기록하고,
    /// 클라이언트에는 일반적인 메시지만 반환합니다 (보안을 위해).
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                "A database error occurred".to_string()
            }
            AppError::Io(ref e) => {
                tracing::error!("IO error: {}", e);
                "An IO error occurred".to_string()
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            AppError::Unavailable(ref msg) => {
                tracing::warn!("Unavailable: {}", msg);
                self.to_string()
            }
            _ => self.to_string(),
        };

        // 결과: { "error": { "code": "not_found", "message": "Document not found" } }
        // 검증 에러는 실패한 항목 목록을 details로 함께 보냅니다.
        let body = match self {
            AppError::Validation(ref details) => json!({
                "error": { "code": code, "message": message, "details": details }
            }),
            _ => json!({
                "error": { "code": code, "message": message }
            }),
        };

        (status, Json(body)).into_response()
    }
}
