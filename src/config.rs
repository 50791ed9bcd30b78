//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `DATABASE_URL`: SQLite 데이터베이스 경로 (필수)
//! - `JWT_SECRET`: 신원 서비스와 공유하는 JWT 서명 비밀키 (필수)
//! - `UPLOADS_PATH`: 블롭(업로드 파일) 저장 디렉토리
//! - `PUBLIC_BLOB_PREFIX`: 블롭 URL 접두사이자 정적 서빙 경로
//! - `HOST` / `PORT`: 서버 바인딩 주소
//! - `OPERATION_TIMEOUT_MS`: 엔진 연산 하나에 허용되는 시간
//! - `MAX_WRITE_ATTEMPTS`: 낙관적 동시성 충돌 시 최대 시도 횟수
//! - `REQUIRED_METADATA_FIELDS`: 쉼표로 구분한 필수 메타데이터 필드
//! - `MAX_UPLOAD_BYTES`: 업로드 본문 최대 크기
//! - `AUDIT_QUEUE_CAPACITY` / `EVENT_CHANNEL_CAPACITY`: 감사 큐, 이벤트 채널 크기

use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_millis(5_000);
pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 3;
pub const DEFAULT_REQUIRED_METADATA_FIELDS: [&str; 2] = ["originator", "discipline"];

/// 애플리케이션 전체 설정을 담는 구조체
///
/// 서버 시작 시 환경변수에서 한 번 읽어온 후,
/// 애플리케이션 전체에서 공유됩니다.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 데이터베이스 파일 경로 (예: "sqlite:data/cdeflow.db?mode=rwc")
    pub database_url: String,
    /// JWT 토큰 검증에 사용하는 비밀키
    pub jwt_secret: String,
    pub uploads_path: String,
    /// 예: "/files" → 블롭 URL은 "/files/{key}"
    pub public_blob_prefix: String,
    /// 서버가 바인딩할 호스트 주소 (기본값: "0.0.0.0")
    pub host: String,
    /// u16: 0~65535 범위의 부호 없는 16비트 정수. 포트 번호에 딱 맞는 타입입니다.
    pub port: u16,
    pub operation_timeout: Duration,
    pub max_write_attempts: u32,
    pub required_metadata_fields: Vec<String>,
    pub max_upload_bytes: usize,
    pub audit_queue_capacity: usize,
    pub event_channel_capacity: usize,
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `DATABASE_URL`과 `JWT_SECRET`은 필수이며, 없으면 에러가 발생합니다.
    /// 나머지 설정은 기본값이 있고, 숫자로 읽을 수 없는 값도 기본값으로 대체됩니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            // `?`: 변수가 없으면 즉시 에러를 반환합니다.
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,

            uploads_path: env::var("UPLOADS_PATH").unwrap_or_else(|_| "data/uploads".to_string()),
            public_blob_prefix: env::var("PUBLIC_BLOB_PREFIX")
                .unwrap_or_else(|_| "/files".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 3000),

            operation_timeout: Duration::from_millis(parse_or(
                "OPERATION_TIMEOUT_MS",
                DEFAULT_OPERATION_TIMEOUT.as_millis() as u64,
            )),
            max_write_attempts: parse_or("MAX_WRITE_ATTEMPTS", DEFAULT_MAX_WRITE_ATTEMPTS).max(1),
            required_metadata_fields: env::var("REQUIRED_METADATA_FIELDS")
                .map(|raw| split_fields(&raw))
                .unwrap_or_else(|_| {
                    DEFAULT_REQUIRED_METADATA_FIELDS
                        .iter()
                        .map(|f| f.to_string())
                        .collect()
                }),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", 50 * 1024 * 1024),
            audit_queue_capacity: parse_or("AUDIT_QUEUE_CAPACITY", 1024),
            event_channel_capacity: parse_or("EVENT_CHANNEL_CAPACITY", 256),
        })
    }
}

/// 환경변수를 숫자로 파싱하고, 없거나 잘못된 값이면 기본값을 씁니다.
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

/// "originator, discipline,," → ["originator", "discipline"]
fn split_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}
