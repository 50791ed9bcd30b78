//! # 미들웨어
//!
//! - `auth`: JWT 검증과 `AuthUser` 추출기
//! - `audit`: 상태를 바꾸는 요청을 감사 큐에 기록하는 레이어

pub mod audit;
pub mod auth;
