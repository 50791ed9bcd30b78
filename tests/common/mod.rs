//! 통합 테스트 공용 도우미: 메모리 SQLite, 임시 블롭 디렉토리, 기본 팀 구성.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use cdeflow::models::*;
use cdeflow::services::collaborators::RequiredFieldsValidator;
use cdeflow::services::{BlobStore, EventBus, LifecycleEngine, LocalBlobStore};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const JWT_SECRET: &str = "integration-secret";

pub struct Harness {
    pub engine: LifecycleEngine,
    pub pool: SqlitePool,
    pub blobs: Arc<LocalBlobStore>,
    pub events: EventBus,
    // 테스트가 끝날 때까지 디렉토리를 유지
    pub dir: TempDir,
}

/// 연결 하나짜리 메모리 DB. 연결이 닫히면 DB도 사라지므로 수명 제한을 끕니다.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

/// 임시 디렉토리의 SQLite 파일. 연결이 여러 개라 쓰기가 실제로 경쟁합니다.
pub async fn file_pool(dir: &TempDir, max_connections: u32) -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("cdeflow.db"))
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

pub async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let pool = memory_pool().await;
    build_harness(pool, dir)
}

/// 파일 DB를 쓰는 하네스. 블롭과 DB 파일이 같은 임시 디렉토리에 있습니다.
pub async fn file_harness(max_connections: u32) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let pool = file_pool(&dir, max_connections).await;
    build_harness(pool, dir)
}

fn build_harness(pool: SqlitePool, dir: TempDir) -> Harness {
    let blobs = Arc::new(LocalBlobStore::new(dir.path(), "/files"));
    let events = EventBus::new(64);

    let engine = LifecycleEngine::new(pool.clone(), blobs.clone(), events.clone())
        .with_validator(RequiredFieldsValidator::new(["originator", "discipline"]));

    Harness {
        engine,
        pool,
        blobs,
        events,
        dir,
    }
}

pub fn actor(id: &str, role: Role) -> Actor {
    Actor::new(id, role)
}

pub fn metadata() -> Metadata {
    [("originator", "ACME"), ("discipline", "AR")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// 블롭을 실제로 저장하고 참조를 돌려줍니다.
pub async fn stored_file(h: &Harness, name: &str, bytes: &[u8]) -> FileRef {
    let url = h.blobs.save(name, bytes).await.unwrap();
    FileRef {
        url,
        size: bytes.len() as i64,
        content_type: "application/pdf".to_string(),
        original_name: name.to_string(),
    }
}

pub fn blob_exists(h: &Harness, url: &str) -> bool {
    let key = url.trim_start_matches("/files/");
    h.dir.path().join(key).exists()
}

/// PM이 만든 프로젝트와 역할별 멤버
pub struct Team {
    pub project: Project,
    pub admin: Actor,
    pub pm: Actor,
    pub bim: Actor,
    pub contributor: Actor,
    pub viewer: Actor,
    pub outsider: Actor,
    pub containers: HashMap<ContainerStatus, Container>,
}

impl Team {
    pub fn container(&self, status: ContainerStatus) -> &Container {
        &self.containers[&status]
    }
}

pub async fn team(h: &Harness) -> Team {
    let pm = actor("pm-1", Role::ProjectManager);
    let (project, containers) = h
        .engine
        .create_project(
            &pm,
            CreateProjectRequest {
                name: "Tower B".into(),
                code: "TWB".into(),
            },
        )
        .await
        .unwrap();

    let bim = actor("bim-1", Role::BimManager);
    let contributor = actor("con-1", Role::Contributor);
    let viewer = actor("view-1", Role::Viewer);
    for member in [&bim, &contributor, &viewer] {
        h.engine
            .add_member(
                &pm,
                &project.id,
                AddMemberRequest {
                    user_id: member.id.clone(),
                    role: member.role,
                },
            )
            .await
            .unwrap();
    }

    Team {
        project,
        admin: actor("admin-1", Role::Admin),
        pm,
        bim,
        contributor,
        viewer,
        outsider: actor("stranger-1", Role::ProjectManager),
        containers: containers.into_iter().map(|c| (c.status, c)).collect(),
    }
}

/// 기본 WIP 컨테이너로 업로드
pub async fn upload(h: &Harness, team: &Team, by: &Actor, name: &str) -> Document {
    let file = stored_file(h, name, b"%PDF-1.7 v1").await;
    h.engine
        .upload(
            by,
            UploadDocument {
                project_id: team.project.id.clone(),
                container_id: None,
                name: Some(name.to_string()),
                revision_code: None,
                metadata: metadata(),
                file,
            },
        )
        .await
        .unwrap()
}

pub async fn replacement(h: &Harness, name: &str) -> ReplaceContent {
    ReplaceContent {
        file: stored_file(h, name, b"%PDF-1.7 next").await,
        revision_code: None,
        comment: Some("revised".to_string()),
    }
}
