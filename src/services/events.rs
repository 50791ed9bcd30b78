//! # 라이프사이클 이벤트
//!
//! 성공한 변경마다 알림 팬아웃(외부 협력자)이 소비할 이벤트를 내보냅니다.
//! `tokio::sync::broadcast` 채널을 쓰므로 구독자가 없어도 발행은 실패하지 않고,
//! 느린 구독자는 오래된 이벤트를 건너뜁니다(Lagged).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::models::{Container, ContainerStatus, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    #[serde(rename = "document:uploaded")]
    DocumentUploaded,
    #[serde(rename = "document:updated")]
    DocumentUpdated,
    #[serde(rename = "document:version:updated")]
    DocumentVersionUpdated,
    #[serde(rename = "document:deleted")]
    DocumentDeleted,
    #[serde(rename = "documents:moved")]
    DocumentsMoved,
    #[serde(rename = "container:created")]
    ContainerCreated,
    #[serde(rename = "container:updated")]
    ContainerUpdated,
    #[serde(rename = "container:deleted")]
    ContainerDeleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DocumentUploaded => "document:uploaded",
            EventKind::DocumentUpdated => "document:updated",
            EventKind::DocumentVersionUpdated => "document:version:updated",
            EventKind::DocumentDeleted => "document:deleted",
            EventKind::DocumentsMoved => "documents:moved",
            EventKind::ContainerCreated => "container:created",
            EventKind::ContainerUpdated => "container:updated",
            EventKind::ContainerDeleted => "container:deleted",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub id: String,
    pub name: String,
    pub status: ContainerStatus,
    pub container_id: Option<String>,
    pub project_id: String,
    pub actor_id: String,
    pub at: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn for_document(kind: EventKind, doc: &Document, actor_id: &str) -> Self {
        Self {
            kind,
            id: doc.id.clone(),
            name: doc.name.clone(),
            status: doc.status,
            container_id: doc.container_id.clone(),
            project_id: doc.project_id.clone(),
            actor_id: actor_id.to_string(),
            at: Utc::now(),
        }
    }

    pub fn for_container(kind: EventKind, container: &Container, actor_id: &str) -> Self {
        Self {
            kind,
            id: container.id.clone(),
            name: container.name.clone(),
            status: container.status,
            container_id: Some(container.id.clone()),
            project_id: container.project_id.clone(),
            actor_id: actor_id.to_string(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 이벤트를 발행하고 받은 구독자 수를 돌려줍니다. 구독자가 없으면 0.
    pub fn publish(&self, event: LifecycleEvent) -> usize {
        let kind = event.kind;
        let id = event.id.clone();
        let delivered = self.sender.send(event).unwrap_or(0);
        tracing::debug!(%kind, %id, delivered, "lifecycle event published");
        delivered
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }
}

/// 이벤트를 로그로 흘려보내는 구독자. 알림 팬아웃이 붙기 전까지의 기본 소비자입니다.
pub fn spawn_event_logger(bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => tracing::info!(
                    kind = %event.kind,
                    id = %event.id,
                    name = %event.name,
                    status = %event.status,
                    actor = %event.actor_id,
                    "lifecycle event"
                ),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event logger lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
