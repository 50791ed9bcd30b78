//! # 문서 라이프사이클 엔진
//!
//! 문서에 대한 모든 변경의 진입점입니다. 각 연산은 같은 순서를 따릅니다:
//!
//! ```text
//! 요청 검증 → 권한 게이트 → 상태 머신 → 쓰기(CAS) → 원장 기록 → 커밋 → 이벤트 발행
//! ```
//!
//! 문서 갱신과 원장 기록은 항상 한 트랜잭션입니다. 쓰기는 읽었던
//! `(version, status, container_id)`에 대한 compare-and-swap이고, 경쟁에서 지면
//! 새 트랜잭션으로 다시 시도합니다 (`max_attempts`회 후 `Conflict`).
//! 커밋 직전까지의 작업은 `op_timeout` 안에 끝나야 하며, 넘기면 트랜잭션이 롤백되고
//! `Unavailable`입니다. 커밋은 제한 시간에 포함되지 않으며, COMMIT을 보낸 뒤에는
//! 결과를 끝까지 기다립니다.
//!
//! 컨테이너/프로젝트 관리 연산은 `services::containers`에 있습니다.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tokio::time::Instant;

use crate::config::{Config, DEFAULT_MAX_WRITE_ATTEMPTS, DEFAULT_OPERATION_TIMEOUT};
use crate::db::{self, NewDocument};
use crate::error::AppError;
use crate::models::*;
use crate::services::blob_store::BlobStore;
use crate::services::collaborators::{
    FilenameGenerator, MetadataValidator, RequiredFieldsValidator, SlugFilenameGenerator,
};
use crate::services::events::{EventBus, EventKind, LifecycleEvent};
use crate::services::ledger;
use crate::services::permissions::{self, Action};
use crate::services::transitions::{self, MoveKind};

/// CAS 한 번의 결과
pub(super) enum Attempt<T> {
    Done(T),
    /// 다른 쓰기가 먼저 커밋됨. 새 트랜잭션으로 다시 시도합니다.
    Lost,
}

/// 커밋만 남은 쓰기. `bounded` 밖에서 `commit()`을 호출합니다.
///
/// 커밋하지 않고 drop하면 sqlx가 트랜잭션을 롤백합니다.
#[must_use = "staged writes are rolled back unless committed"]
pub(super) struct Staged<T> {
    tx: Transaction<'static, Sqlite>,
    value: T,
}

impl<T> Staged<T> {
    pub(super) fn new(tx: Transaction<'static, Sqlite>, value: T) -> Self {
        Self { tx, value }
    }

    pub(super) async fn commit(self) -> Result<T, AppError> {
        self.tx.commit().await?;
        Ok(self.value)
    }
}

#[derive(Clone)]
pub struct LifecycleEngine {
    pub(super) pool: SqlitePool,
    validator: Arc<dyn MetadataValidator>,
    filenames: Arc<dyn FilenameGenerator>,
    blobs: Arc<dyn BlobStore>,
    pub(super) events: EventBus,
    op_timeout: Duration,
    max_attempts: u32,
}

impl LifecycleEngine {
    /// 기본 협력자(필드 없는 검증기, slug 파일명 생성기)로 엔진을 만듭니다.
    pub fn new(pool: SqlitePool, blobs: Arc<dyn BlobStore>, events: EventBus) -> Self {
        Self {
            pool,
            validator: Arc::new(RequiredFieldsValidator::default()),
            filenames: Arc::new(SlugFilenameGenerator),
            blobs,
            events,
            op_timeout: DEFAULT_OPERATION_TIMEOUT,
            max_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }

    pub fn from_config(
        config: &Config,
        pool: SqlitePool,
        blobs: Arc<dyn BlobStore>,
        events: EventBus,
    ) -> Self {
        Self::new(pool, blobs, events)
            .with_validator(RequiredFieldsValidator::new(
                config.required_metadata_fields.iter().cloned(),
            ))
            .with_operation_timeout(config.operation_timeout)
            .with_max_write_attempts(config.max_write_attempts)
    }

    pub fn with_validator(mut self, validator: impl MetadataValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn with_filename_generator(mut self, generator: impl FilenameGenerator + 'static) -> Self {
        self.filenames = Arc::new(generator);
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    pub fn with_max_write_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn required_metadata_fields(&self) -> Vec<String> {
        self.validator.required_fields()
    }

    // ── 공통 도우미 ──

    /// 연산 하나를 제한 시간 안에서 실행합니다.
    /// 시간이 지나면 future가 drop되고, 그 안의 트랜잭션도 롤백됩니다.
    /// 쓰기 연산의 `fut`는 커밋하지 않은 `Staged`를 돌려줘야 합니다.
    pub(super) async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        self.bounded_until(op, Instant::now() + self.op_timeout, fut)
            .await
    }

    async fn bounded_until<T, F>(
        &self,
        op: &'static str,
        deadline: Instant,
        fut: F,
    ) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        match tokio::time::timeout_at(deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(op, timeout_ms = self.op_timeout.as_millis() as u64, "operation timed out");
                Err(AppError::Unavailable(format!(
                    "{op} did not complete within {} ms",
                    self.op_timeout.as_millis()
                )))
            }
        }
    }

    /// 경쟁에서 졌거나(`Lost`) SQLite가 잠겨 있으면 처음부터 다시 시도합니다.
    ///
    /// 모든 시도가 하나의 마감 시각을 공유합니다. 커밋은 마감 밖에서 기다리고,
    /// 커밋이 잠금 때문에 실패하면 트랜잭션은 롤백된 상태이므로 다시 시도합니다.
    pub(super) async fn with_retry<T, F, Fut>(
        &self,
        op: &'static str,
        mut attempt: F,
    ) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Attempt<Staged<T>>, AppError>>,
    {
        let deadline = Instant::now() + self.op_timeout;

        for n in 1..=self.max_attempts {
            let outcome = match self.bounded_until(op, deadline, attempt()).await {
                Ok(Attempt::Done(staged)) => staged.commit().await,
                Ok(Attempt::Lost) => {
                    tracing::debug!(op, attempt = n, "lost compare-and-swap race");
                    continue;
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    tracing::debug!(op, attempt = n, error = %e, "database busy");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Conflict(format!(
            "{op} lost to concurrent writes {} times",
            self.max_attempts
        )))
    }

    /// 요청 주체의 멤버십. ADMIN은 조회하지 않습니다.
    pub(super) async fn membership(
        &self,
        conn: &mut SqliteConnection,
        actor: &Actor,
        project_id: &str,
    ) -> Result<Option<ProjectMember>, AppError> {
        if actor.is_admin() {
            return Ok(None);
        }
        db::get_membership(conn, project_id, &actor.id).await
    }

    pub(super) async fn authorize(
        &self,
        conn: &mut SqliteConnection,
        action: Action,
        actor: &Actor,
        project_id: &str,
        owner_ids: &[&str],
    ) -> Result<(), AppError> {
        let member = self.membership(conn, actor, project_id).await?;
        permissions::decide(action, actor, member.as_ref(), owner_ids).ensure()
    }

    fn validate_metadata(&self, metadata: &Metadata) -> Result<(), AppError> {
        let report = self.validator.validate(metadata);
        if report.is_ok() {
            Ok(())
        } else {
            Err(AppError::Validation(report.errors))
        }
    }

    /// 요청된 이름 → 파일명 생성기 → 원본 파일 이름 순으로 결정합니다.
    fn resolve_name(
        &self,
        requested: Option<&str>,
        original_name: &str,
        project_id: &str,
        metadata: &Metadata,
    ) -> String {
        if let Some(name) = requested.map(str::trim).filter(|n| !n.is_empty()) {
            return name.to_string();
        }

        match self.filenames.generate(original_name, project_id, metadata) {
            Ok(name) if !name.trim().is_empty() => name,
            Ok(_) => original_name.to_string(),
            Err(reason) => {
                tracing::warn!(original_name, %reason, "filename generation failed, keeping original name");
                original_name.to_string()
            }
        }
    }

    // ── 업로드 ──

    /// 새 문서를 version 1로 만들고 첫 원장 행을 남깁니다.
    ///
    /// `cmd.file`은 이미 블롭 저장소에 저장된 파일입니다. 실패 시 정리는 호출자 몫입니다.
    pub async fn upload(&self, actor: &Actor, cmd: UploadDocument) -> Result<Document, AppError> {
        let doc = self
            .bounded("upload", self.upload_inner(actor, &cmd))
            .await?
            .commit()
            .await?;

        tracing::info!(
            document_id = %doc.id,
            project_id = %doc.project_id,
            status = %doc.status,
            actor = %actor.id,
            "document uploaded"
        );
        self.events
            .publish(LifecycleEvent::for_document(EventKind::DocumentUploaded, &doc, &actor.id));
        Ok(doc)
    }

    async fn upload_inner(
        &self,
        actor: &Actor,
        cmd: &UploadDocument,
    ) -> Result<Staged<Document>, AppError> {
        if cmd.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(AppError::validation("name must not be blank"));
        }
        self.validate_metadata(&cmd.metadata)?;

        // begin(): 트랜잭션 시작. 커밋하지 않고 drop되면 자동으로 롤백됩니다.
        let mut tx = self.pool.begin().await?;

        // &mut *tx: 트랜잭션 안의 연결을 Executor로 빌려줍니다.
        let project = db::get_project(&mut *tx, &cmd.project_id)
            .await?
            .ok_or(AppError::NotFound("Project"))?;

        let container = match cmd.container_id.as_deref() {
            Some(id) => db::get_container(&mut *tx, id)
                .await?
                .filter(|c| c.project_id == project.id)
                .ok_or(AppError::NotFound("Container"))?,
            None => db::first_with_status(&mut *tx, &project.id, ContainerStatus::WorkInProgress)
                .await?
                .ok_or(AppError::NotFound("Container"))?,
        };

        let member = self.membership(&mut tx, actor, &project.id).await?;
        let upload_action = match container.status {
            ContainerStatus::WorkInProgress => Action::UploadDraft,
            _ => Action::Upload,
        };
        permissions::decide(upload_action, actor, member.as_ref(), &[]).ensure()?;
        // 게시/보관 컨테이너로 바로 올리려면 해당 승격 권한도 있어야 함
        let gate = transitions::required_action(container.status);
        if gate != Action::Move {
            permissions::decide(gate, actor, member.as_ref(), &[]).ensure()?;
        }

        let name = self.resolve_name(
            cmd.name.as_deref(),
            &cmd.file.original_name,
            &project.id,
            &cmd.metadata,
        );
        // 빈 문자열은 지정하지 않은 것으로 봅니다.
        let revision_code = cmd
            .revision_code
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REVISION_CODE);
        let id = uuid::Uuid::now_v7().to_string();

        db::insert_document(
            &mut *tx,
            &NewDocument {
                id: &id,
                project_id: &project.id,
                container_id: &container.id,
                name: &name,
                file: &cmd.file,
                revision_code,
                status: container.status,
                metadata: &cmd.metadata,
                uploader_id: &actor.id,
            },
        )
        .await?;

        let doc = db::get_document(&mut *tx, &id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("document {id} vanished after insert")))?;
        ledger::record(&mut tx, &doc, &actor.id, Some(ledger::INITIAL_UPLOAD_COMMENT)).await?;

        Ok(Staged::new(tx, doc))
    }

    // ── 내용 교체 ──

    /// 파일을 교체하고 버전을 정확히 1 올립니다. 상태와 컨테이너는 그대로입니다.
    pub async fn replace_content(
        &self,
        actor: &Actor,
        document_id: &str,
        cmd: ReplaceContent,
    ) -> Result<Document, AppError> {
        let doc = self
            .with_retry("replace_content", || self.try_replace(actor, document_id, &cmd))
            .await?;

        tracing::info!(
            document_id = %doc.id,
            version = doc.version,
            revision_code = %doc.revision_code,
            actor = %actor.id,
            "document content replaced"
        );
        self.events.publish(LifecycleEvent::for_document(
            EventKind::DocumentVersionUpdated,
            &doc,
            &actor.id,
        ));
        Ok(doc)
    }

    async fn try_replace(
        &self,
        actor: &Actor,
        document_id: &str,
        cmd: &ReplaceContent,
    ) -> Result<Attempt<Staged<Document>>, AppError> {
        let mut tx = self.pool.begin().await?;

        let doc = db::get_document(&mut *tx, document_id)
            .await?
            .ok_or(AppError::NotFound("Document"))?;
        self.authorize(&mut tx, Action::EditContent, actor, &doc.project_id, &[&doc.uploader_id])
            .await?;

        let revision_code = cmd
            .revision_code
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(doc.revision_code.as_str());

        // false = 읽은 뒤에 다른 쓰기가 버전을 올림. tx는 여기서 drop(롤백)됩니다.
        if !db::replace_content(&mut *tx, &doc.id, doc.version, &cmd.file, revision_code).await? {
            return Ok(Attempt::Lost);
        }

        let updated = db::get_document(&mut *tx, &doc.id)
            .await?
            .ok_or(AppError::NotFound("Document"))?;
        ledger::record(&mut tx, &updated, &actor.id, cmd.comment.as_deref()).await?;

        Ok(Attempt::Done(Staged::new(tx, updated)))
    }

    // ── 이동 ──

    /// 문서를 다른 컨테이너로 옮깁니다. 문서 상태는 대상 컨테이너의 상태가 됩니다.
    pub async fn move_document(
        &self,
        actor: &Actor,
        document_id: &str,
        target_container_id: &str,
    ) -> Result<Document, AppError> {
        let doc = self
            .with_retry("move_document", || {
                self.try_move(actor, document_id, target_container_id)
            })
            .await?;

        tracing::info!(
            document_id = %doc.id,
            container_id = ?doc.container_id,
            status = %doc.status,
            actor = %actor.id,
            "document moved"
        );
        self.events
            .publish(LifecycleEvent::for_document(EventKind::DocumentsMoved, &doc, &actor.id));
        Ok(doc)
    }

    async fn try_move(
        &self,
        actor: &Actor,
        document_id: &str,
        target_container_id: &str,
    ) -> Result<Attempt<Staged<Document>>, AppError> {
        let mut tx = self.pool.begin().await?;

        let doc = db::get_document(&mut *tx, document_id)
            .await?
            .ok_or(AppError::NotFound("Document"))?;

        match self.apply_move(&mut tx, actor, &doc, target_container_id).await? {
            Some(moved) => Ok(Attempt::Done(Staged::new(tx, moved))),
            None => Ok(Attempt::Lost),
        }
    }

    /// 열린 트랜잭션 안에서 이동을 수행합니다. CAS에서 지면 `None`.
    ///
    /// 검사 순서: 대상 확인 → 멤버십(Move) → 상태 머신 → 승격 권한.
    /// 그래서 불가능한 전이는 역할과 무관하게 `InvalidTransition`입니다.
    async fn apply_move(
        &self,
        conn: &mut SqliteConnection,
        actor: &Actor,
        doc: &Document,
        target_container_id: &str,
    ) -> Result<Option<Document>, AppError> {
        let target = db::get_container(&mut *conn, target_container_id)
            .await?
            .filter(|c| c.project_id == doc.project_id)
            .ok_or(AppError::NotFound("Container"))?;

        if doc.container_id.as_deref() == Some(target.id.as_str()) {
            return Err(AppError::validation(format!(
                "document is already in container {}",
                target.name
            )));
        }

        let member = self.membership(&mut *conn, actor, &doc.project_id).await?;
        permissions::decide(Action::Move, actor, member.as_ref(), &[]).ensure()?;

        if transitions::check_move(doc.status, target.status)? == MoveKind::Transition {
            let gate = transitions::required_action(target.status);
            if gate != Action::Move {
                permissions::decide(gate, actor, member.as_ref(), &[]).ensure()?;
            }
        }

        if !db::assign_container(&mut *conn, doc, &target.id, target.status).await? {
            return Ok(None);
        }

        let moved = db::get_document(&mut *conn, &doc.id)
            .await?
            .ok_or(AppError::NotFound("Document"))?;
        let comment = ledger::moved_comment(&target.name);
        ledger::record(conn, &moved, &actor.id, Some(&comment)).await?;

        Ok(Some(moved))
    }

    /// 여러 문서를 각각 독립적인 이동으로 처리합니다. 하나가 실패해도 나머지는 계속합니다.
    pub async fn move_documents(
        &self,
        actor: &Actor,
        document_ids: &[String],
        target_container_id: &str,
    ) -> Result<Vec<MoveOutcome>, AppError> {
        if document_ids.is_empty() {
            return Err(AppError::validation("document_ids must not be empty"));
        }

        let mut outcomes = Vec::with_capacity(document_ids.len());
        for id in document_ids {
            let outcome = match self.move_document(actor, id, target_container_id).await {
                Ok(doc) => MoveOutcome {
                    document_id: id.clone(),
                    moved: true,
                    status: Some(doc.status),
                    error: None,
                },
                Err(e) => {
                    tracing::debug!(document_id = %id, error = %e, "bulk move item failed");
                    MoveOutcome {
                        document_id: id.clone(),
                        moved: false,
                        status: None,
                        error: Some(e.code().to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    // ── 이름/메타데이터 수정 ──

    /// 이름과 메타데이터를 수정합니다. 버전과 상태는 바뀌지 않습니다.
    ///
    /// 같은 요청에 다른 `container_id`가 있으면 이동과 수정을 한 트랜잭션으로 처리하고,
    /// 이때만 원장 행이 추가됩니다.
    pub async fn update_metadata(
        &self,
        actor: &Actor,
        document_id: &str,
        req: UpdateDocumentRequest,
    ) -> Result<Document, AppError> {
        let (doc, moved) = self
            .with_retry("update_metadata", || self.try_update(actor, document_id, &req))
            .await?;

        tracing::info!(document_id = %doc.id, moved, actor = %actor.id, "document updated");
        if moved {
            self.events
                .publish(LifecycleEvent::for_document(EventKind::DocumentsMoved, &doc, &actor.id));
        }
        self.events
            .publish(LifecycleEvent::for_document(EventKind::DocumentUpdated, &doc, &actor.id));
        Ok(doc)
    }

    async fn try_update(
        &self,
        actor: &Actor,
        document_id: &str,
        req: &UpdateDocumentRequest,
    ) -> Result<Attempt<Staged<(Document, bool)>>, AppError> {
        let mut tx = self.pool.begin().await?;

        let doc = db::get_document(&mut *tx, document_id)
            .await?
            .ok_or(AppError::NotFound("Document"))?;
        self.authorize(&mut tx, Action::EditMetadata, actor, &doc.project_id, &[&doc.uploader_id])
            .await?;

        let name = match req.name.as_deref().map(str::trim) {
            Some("") => return Err(AppError::validation("name must not be blank")),
            Some(name) => name.to_string(),
            None => doc.name.clone(),
        };

        // Json<Metadata>의 .0이 실제 맵입니다. 요청에 온 키만 덮어씁니다.
        let mut metadata = doc.metadata.0.clone();
        if let Some(fields) = &req.metadata {
            metadata.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        self.validate_metadata(&metadata)?;

        let (current, moved) = match req.container_id.as_deref() {
            Some(target) if doc.container_id.as_deref() != Some(target) => {
                match self.apply_move(&mut tx, actor, &doc, target).await? {
                    Some(moved) => (moved, true),
                    None => return Ok(Attempt::Lost),
                }
            }
            _ => (doc, false),
        };

        if !db::update_fields(&mut *tx, &current.id, &name, &metadata).await? {
            return Err(AppError::NotFound("Document"));
        }
        let updated = db::get_document(&mut *tx, &current.id)
            .await?
            .ok_or(AppError::NotFound("Document"))?;

        Ok(Attempt::Done(Staged::new(tx, (updated, moved))))
    }

    // ── 삭제 ──

    /// 원장 → 문서 행 순서로 지우고 커밋한 뒤, 참조했던 블롭을 최선 노력으로 지웁니다.
    /// 블롭 삭제 실패는 경고만 남깁니다.
    pub async fn delete_document(&self, actor: &Actor, document_id: &str) -> Result<(), AppError> {
        let (doc, urls) = self
            .bounded("delete_document", self.delete_inner(actor, document_id))
            .await?
            .commit()
            .await?;

        tracing::info!(document_id = %doc.id, blobs = urls.len(), actor = %actor.id, "document deleted");
        self.events
            .publish(LifecycleEvent::for_document(EventKind::DocumentDeleted, &doc, &actor.id));

        for url in urls {
            if let Err(e) = self.blobs.delete(&url).await {
                tracing::warn!(document_id = %doc.id, %url, error = %e, "failed to delete blob");
            }
        }
        Ok(())
    }

    async fn delete_inner(
        &self,
        actor: &Actor,
        document_id: &str,
    ) -> Result<Staged<(Document, Vec<String>)>, AppError> {
        let mut tx = self.pool.begin().await?;

        let doc = db::get_document(&mut *tx, document_id)
            .await?
            .ok_or(AppError::NotFound("Document"))?;
        self.authorize(&mut tx, Action::Delete, actor, &doc.project_id, &[&doc.uploader_id])
            .await?;

        let mut urls = ledger::purge(&mut tx, &doc.id).await?;
        if !db::delete_document(&mut *tx, &doc.id).await? {
            return Err(AppError::NotFound("Document"));
        }

        if !urls.contains(&doc.file_url) {
            urls.push(doc.file_url.clone());
        }
        Ok(Staged::new(tx, (doc, urls)))
    }

    // ── 조회 ──

    pub async fn get_document(&self, actor: &Actor, document_id: &str) -> Result<Document, AppError> {
        self.bounded("get_document", async {
            let mut conn = self.pool.acquire().await?;
            let doc = db::get_document(&mut *conn, document_id)
                .await?
                .ok_or(AppError::NotFound("Document"))?;
            self.authorize(&mut conn, Action::View, actor, &doc.project_id, &[])
                .await?;
            Ok(doc)
        })
        .await
    }

    pub async fn list_documents(
        &self,
        actor: &Actor,
        project_id: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<Document>, AppError> {
        self.bounded("list_documents", async {
            let mut conn = self.pool.acquire().await?;
            db::get_project(&mut *conn, project_id)
                .await?
                .ok_or(AppError::NotFound("Project"))?;
            self.authorize(&mut conn, Action::View, actor, project_id, &[])
                .await?;
            db::list_documents(&mut *conn, project_id, query).await
        })
        .await
    }

    /// 문서의 원장 (최신순)
    pub async fn history(
        &self,
        actor: &Actor,
        document_id: &str,
    ) -> Result<Vec<DocumentHistory>, AppError> {
        self.bounded("history", async {
            let mut conn = self.pool.acquire().await?;
            let doc = db::get_document(&mut *conn, document_id)
                .await?
                .ok_or(AppError::NotFound("Document"))?;
            self.authorize(&mut conn, Action::View, actor, &doc.project_id, &[])
                .await?;
            ledger::entries(&mut *conn, &doc.id).await
        })
        .await
    }
}
