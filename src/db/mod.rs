//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 데이터베이스와 직접 상호작용하는 함수들을 모아둔 모듈입니다.
//! 서비스 계층(services/)이 이 모듈의 함수를 트랜잭션 안팎에서 호출합니다.
//!
//! 각 하위 모듈:
//! - `activity`: 감사 로그 쿼리
//! - `containers`: 컨테이너 CRUD 쿼리
//! - `documents`: 문서 CRUD 및 compare-and-swap 갱신 쿼리
//! - `history`: 문서 버전 원장 쿼리
//! - `projects`: 프로젝트와 멤버십 쿼리

pub mod activity;
pub mod containers;
pub mod documents;
pub mod history;
pub mod projects;

// 하위 모듈의 모든 공개 함수를 재공개(re-export)하여
// `crate::db::get_document`처럼 바로 접근할 수 있게 합니다.
pub use activity::*;
pub use containers::*;
pub use documents::*;
pub use history::*;
pub use projects::*;
