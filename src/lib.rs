//! # cdeflow
//!
//! 건설/엔지니어링 문서를 CDE 단계 컨테이너(WIP → Shared → Published → Archived)에
//! 담아 관리하는 백엔드입니다. 바이너리(`main.rs`)와 통합 테스트가 이 라이브러리를 씁니다.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
