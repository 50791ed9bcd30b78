//! # cdeflow 웹 서버 진입점
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. SQLite 데이터베이스 연결 풀 생성
//! 4. 데이터베이스 마이그레이션 실행
//! 5. 블롭 저장 디렉토리 생성
//! 6. 라이프사이클 엔진, 감사 writer, 이벤트 구독자 준비
//! 7. API 라우터 설정
//! 8. HTTP 서버 시작 (Ctrl+C로 정상 종료)

use std::path::Path;
use std::sync::Arc;

use anyhow::Result; // anyhow::Result: 어떤 에러 타입이든 담을 수 있는 범용 Result 타입
use axum::Router;
use cdeflow::{
    config::Config,
    routes::{self, AppState},
    services::{audit, events, AuditRecorder, BlobStore, EventBus, LifecycleEngine, LocalBlobStore},
};
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1단계: 환경변수 로딩 ──
    // .ok(): .env 파일이 없어도 에러 없이 넘어갑니다.
    dotenvy::dotenv().ok();

    // ── 2단계: 로깅(tracing) 초기화 ──
    // RUST_LOG가 없으면 cdeflow, tower_http, axum 모듈을 debug 레벨로 설정
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cdeflow=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── 3단계: 설정 로딩 ──
    let config = Config::from_env()?;
    tracing::info!("Starting cdeflow server on {}:{}", config.host, config.port);

    // ── 4단계: SQLite 연결 풀 생성 ──
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    // ── 5단계: 데이터베이스 마이그레이션 실행 ──
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    // ── 6단계: 블롭 저장 디렉토리 생성 ──
    let uploads_path = Path::new(&config.uploads_path);
    if !uploads_path.exists() {
        tokio::fs::create_dir_all(uploads_path).await?;
        tracing::info!("Created uploads directory: {}", config.uploads_path);
    }

    // ── 7단계: 엔진과 백그라운드 태스크 ──
    let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(
        &config.uploads_path,
        config.public_blob_prefix.clone(),
    ));
    let event_bus = EventBus::new(config.event_channel_capacity);
    // 알림 팬아웃이 붙기 전까지는 이벤트를 로그로만 흘려보냅니다.
    let _event_logger = events::spawn_event_logger(&event_bus);

    let (recorder, audit_rx) = AuditRecorder::channel(config.audit_queue_capacity);
    let audit_writer = audit::spawn_writer(pool.clone(), audit_rx);

    let engine = LifecycleEngine::from_config(&config, pool.clone(), blobs.clone(), event_bus);
    tracing::info!(
        required_fields = ?engine.required_metadata_fields(),
        timeout_ms = config.operation_timeout.as_millis() as u64,
        max_write_attempts = config.max_write_attempts,
        "lifecycle engine ready"
    );

    let state = AppState {
        engine,
        blobs,
        audit: recorder,
        jwt_secret: config.jwt_secret.clone(),
        max_upload_bytes: config.max_upload_bytes,
    };

    // ── 8단계: 라우터와 미들웨어 ──
    // 개발 환경에서는 Any(모두 허용)로 설정합니다.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 블롭 URL(`{PUBLIC_BLOB_PREFIX}/{key}`)을 업로드 디렉토리에서 바로 서빙합니다.
    let app = Router::new()
        .merge(routes::router(state))
        .nest_service(&config.public_blob_prefix, ServeDir::new(&config.uploads_path))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // ── 9단계: 서버 시작 ──
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 라우터가 drop되면 감사 큐의 송신단도 모두 닫히고, writer는 남은 항목을 쓰고 끝납니다.
    if let Err(e) = audit_writer.await {
        tracing::warn!(error = %e, "audit writer ended abnormally");
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
