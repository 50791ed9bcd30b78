//! # 데이터 모델 모듈
//!
//! 애플리케이션에서 사용하는 데이터 구조체(struct)들을 정의합니다.
//! 각 하위 모듈은 특정 도메인의 데이터 타입을 담당합니다:
//! - `activity`: 감사 로그(ActivityLog)
//! - `container`: 컨테이너와 CDE 단계(ContainerStatus)
//! - `document`: 문서와 업로드/교체/이동 명령
//! - `history`: 문서 버전 원장(DocumentHistory)
//! - `project`: 프로젝트와 멤버십
//! - `user`: 역할(Role)과 요청 주체(Actor)
//!
//! `pub use X::*;`로 재공개하여 `crate::models::Document`처럼 짧게 접근합니다.

pub mod activity;
pub mod container;
pub mod document;
pub mod history;
pub mod project;
pub mod user;

pub use activity::*;
pub use container::*;
pub use document::*;
pub use history::*;
pub use project::*;
pub use user::*;
