//! # 감사 기록기 (Audit Trail Recorder)
//!
//! 상태를 바꾸는 모든 호출의 의도와 결과를 `activity_logs`에 남깁니다.
//! 버전 원장과는 독립적이며, 실패한 시도도 기록합니다.
//!
//! 요청 처리 경로는 `AuditRecorder::record()`로 항목을 큐에 넣기만 하고,
//! 실제 INSERT는 별도의 writer 태스크가 수행합니다. 큐가 가득 차거나 닫혀 있으면
//! 항목을 버리고 경고만 남깁니다. 감사 기록 실패가 요청 결과를 바꾸지 않습니다.

use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::db;
use crate::models::ActivityEntry;

#[derive(Debug, Clone)]
pub struct AuditRecorder {
    tx: mpsc::Sender<ActivityEntry>,
}

impl AuditRecorder {
    /// 기록기와, writer 태스크에 넘길 수신단을 만듭니다.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ActivityEntry>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// 큐에 넣기만 하고 기다리지 않습니다.
    pub fn record(&self, entry: ActivityEntry) {
        if let Err(err) = self.tx.try_send(entry) {
            let (reason, entry) = match err {
                mpsc::error::TrySendError::Full(entry) => ("queue full", entry),
                mpsc::error::TrySendError::Closed(entry) => ("queue closed", entry),
            };
            tracing::warn!(
                reason,
                user_id = %entry.user_id,
                action = %entry.action,
                object_type = %entry.object_type,
                "audit entry dropped"
            );
        }
    }
}

/// 큐를 비우며 `activity_logs`에 기록하는 태스크를 띄웁니다.
/// 모든 `AuditRecorder`가 drop되면 남은 항목을 처리한 뒤 종료합니다.
pub fn spawn_writer(pool: SqlitePool, rx: mpsc::Receiver<ActivityEntry>) -> JoinHandle<()> {
    tokio::spawn(run_writer(pool, rx))
}

pub async fn run_writer(pool: SqlitePool, mut rx: mpsc::Receiver<ActivityEntry>) {
    while let Some(entry) = rx.recv().await {
        if let Err(e) = db::insert_activity(&pool, &entry).await {
            tracing::warn!(
                error = %e,
                user_id = %entry.user_id,
                action = %entry.action,
                "failed to persist audit entry"
            );
        }
    }
    tracing::debug!("audit writer stopped");
}
