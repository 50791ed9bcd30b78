//! # 서비스 계층
//!
//! 문서/컨테이너 라이프사이클의 핵심 규칙이 모여 있는 곳입니다.
//! HTTP 계층(routes/)은 여기의 `LifecycleEngine`만 호출합니다.
//!
//! - `transitions`: 컨테이너 상태 머신 (순수 함수)
//! - `permissions`: 권한 게이트 (순수 함수)
//! - `ledger`: 문서 버전 원장
//! - `lifecycle`: 문서 라이프사이클 엔진
//! - `containers`: 프로젝트/멤버/컨테이너 관리 (엔진의 추가 메서드)
//! - `audit`: 감사 로그 큐와 writer 태스크
//! - `events`: 라이프사이클 이벤트 버스
//! - `collaborators`: 메타데이터 검증기, 파일 이름 생성기
//! - `blob_store`: 파일 저장소 포트와 로컬 디스크 구현

pub mod audit;
pub mod blob_store;
pub mod collaborators;
pub mod containers;
pub mod events;
pub mod ledger;
pub mod lifecycle;
pub mod permissions;
pub mod transitions;

pub use audit::AuditRecorder;
pub use blob_store::{BlobStore, LocalBlobStore};
pub use events::{EventBus, EventKind, LifecycleEvent};
pub use lifecycle::LifecycleEngine;
