//! 프로젝트, 멤버십, 컨테이너 관리와 감사 로그 조회.
//!
//! 문서 연산과 같은 엔진(`LifecycleEngine`)의 메서드이며, 같은 제한 시간과
//! 권한 게이트를 거칩니다.

use crate::db;
use crate::error::AppError;
use crate::models::*;
use crate::services::events::{EventKind, LifecycleEvent};
use crate::services::lifecycle::{LifecycleEngine, Staged};
use crate::services::permissions::{self, Action};

/// 새 프로젝트에 만들어지는 컨테이너: (상태, 코드, 이름)
static BOOTSTRAP_CONTAINERS: [(ContainerStatus, &str, &str); 4] = [
    (ContainerStatus::WorkInProgress, "WIP", "Work in Progress"),
    (ContainerStatus::Shared, "SHR", "Shared"),
    (ContainerStatus::Published, "PUB", "Published"),
    (ContainerStatus::Archived, "ARC", "Archived"),
];

const DEFAULT_ACTIVITY_LIMIT: i64 = 100;
const MAX_ACTIVITY_LIMIT: i64 = 500;

fn require_text<'a>(field: &str, value: &'a str) -> Result<&'a str, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AppError::validation(format!("{field} must not be blank")))
    } else {
        Ok(trimmed)
    }
}

impl LifecycleEngine {
    // ── 프로젝트 ──

    /// 프로젝트를 만들고, 생성자를 PROJECT_MANAGER로 등록하고, 단계별 컨테이너를 하나씩 만듭니다.
    pub async fn create_project(
        &self,
        actor: &Actor,
        req: CreateProjectRequest,
    ) -> Result<(Project, Vec<Container>), AppError> {
        permissions::decide_create_project(actor).ensure()?;
        let name = require_text("name", &req.name)?;
        let code = require_text("code", &req.code)?;

        let (project, containers) = self
            .bounded("create_project", async {
                let mut tx = self.pool.begin().await?;

                let project_id = uuid::Uuid::now_v7().to_string();
                db::insert_project(&mut *tx, &project_id, name, code, &actor.id).await?;
                db::upsert_member(&mut *tx, &project_id, &actor.id, Role::ProjectManager).await?;

                let mut containers = Vec::with_capacity(BOOTSTRAP_CONTAINERS.len());
                for (status, stage_code, stage_name) in BOOTSTRAP_CONTAINERS {
                    let id = uuid::Uuid::now_v7().to_string();
                    db::insert_container(&mut *tx, &id, &project_id, stage_name, stage_code, status)
                        .await?;
                    let container = db::get_container(&mut *tx, &id)
                        .await?
                        .ok_or(AppError::NotFound("Container"))?;
                    containers.push(container);
                }

                let project = db::get_project(&mut *tx, &project_id)
                    .await?
                    .ok_or(AppError::NotFound("Project"))?;
                Ok(Staged::new(tx, (project, containers)))
            })
            .await?
            .commit()
            .await?;

        tracing::info!(project_id = %project.id, code = %project.code, actor = %actor.id, "project created");
        for container in &containers {
            self.events.publish(LifecycleEvent::for_container(
                EventKind::ContainerCreated,
                container,
                &actor.id,
            ));
        }
        Ok((project, containers))
    }

    pub async fn get_project(&self, actor: &Actor, project_id: &str) -> Result<Project, AppError> {
        self.bounded("get_project", async {
            let mut conn = self.pool.acquire().await?;
            let project = db::get_project(&mut *conn, project_id)
                .await?
                .ok_or(AppError::NotFound("Project"))?;
            self.authorize(&mut conn, Action::View, actor, project_id, &[])
                .await?;
            Ok(project)
        })
        .await
    }

    /// 멤버를 추가합니다. 이미 멤버면 역할을 바꿉니다.
    pub async fn add_member(
        &self,
        actor: &Actor,
        project_id: &str,
        req: AddMemberRequest,
    ) -> Result<ProjectMember, AppError> {
        let user_id = require_text("user_id", &req.user_id)?;
        if req.role == Role::Admin {
            return Err(AppError::validation(
                "ADMIN is an identity role, not a project role",
            ));
        }

        let member = self
            .bounded("add_member", async {
                let mut tx = self.pool.begin().await?;
                db::get_project(&mut *tx, project_id)
                    .await?
                    .ok_or(AppError::NotFound("Project"))?;
                self.authorize(&mut tx, Action::ManageMembers, actor, project_id, &[])
                    .await?;

                db::upsert_member(&mut *tx, project_id, user_id, req.role).await?;
                let member = db::get_membership(&mut *tx, project_id, user_id)
                    .await?
                    .ok_or(AppError::NotFound("Member"))?;
                Ok(Staged::new(tx, member))
            })
            .await?
            .commit()
            .await?;

        tracing::info!(project_id, user_id, role = %member.role, actor = %actor.id, "member enrolled");
        Ok(member)
    }

    pub async fn list_members(
        &self,
        actor: &Actor,
        project_id: &str,
    ) -> Result<Vec<ProjectMember>, AppError> {
        self.bounded("list_members", async {
            let mut conn = self.pool.acquire().await?;
            db::get_project(&mut *conn, project_id)
                .await?
                .ok_or(AppError::NotFound("Project"))?;
            self.authorize(&mut conn, Action::View, actor, project_id, &[])
                .await?;
            db::list_members(&mut *conn, project_id).await
        })
        .await
    }

    // ── 컨테이너 ──

    pub async fn create_container(
        &self,
        actor: &Actor,
        project_id: &str,
        req: CreateContainerRequest,
    ) -> Result<Container, AppError> {
        let name = require_text("name", &req.name)?;
        let code = require_text("code", &req.code)?;

        let container = self
            .bounded("create_container", async {
                let mut tx = self.pool.begin().await?;
                db::get_project(&mut *tx, project_id)
                    .await?
                    .ok_or(AppError::NotFound("Project"))?;
                self.authorize(&mut tx, Action::ManageContainers, actor, project_id, &[])
                    .await?;

                let id = uuid::Uuid::now_v7().to_string();
                db::insert_container(&mut *tx, &id, project_id, name, code, req.status).await?;
                let container = db::get_container(&mut *tx, &id)
                    .await?
                    .ok_or(AppError::NotFound("Container"))?;
                Ok(Staged::new(tx, container))
            })
            .await?
            .commit()
            .await?;

        tracing::info!(container_id = %container.id, status = %container.status, actor = %actor.id, "container created");
        self.events.publish(LifecycleEvent::for_container(
            EventKind::ContainerCreated,
            &container,
            &actor.id,
        ));
        Ok(container)
    }

    /// 이름/코드는 언제나, 상태는 컨테이너가 비어 있을 때만 바꿀 수 있습니다.
    pub async fn update_container(
        &self,
        actor: &Actor,
        container_id: &str,
        req: UpdateContainerRequest,
    ) -> Result<Container, AppError> {
        if let Some(name) = req.name.as_deref() {
            require_text("name", name)?;
        }
        if let Some(code) = req.code.as_deref() {
            require_text("code", code)?;
        }
        let req = UpdateContainerRequest {
            name: req.name.map(|n| n.trim().to_string()),
            code: req.code.map(|c| c.trim().to_string()),
            status: req.status,
        };

        let container = self
            .bounded("update_container", async {
                let mut tx = self.pool.begin().await?;
                let current = db::get_container(&mut *tx, container_id)
                    .await?
                    .ok_or(AppError::NotFound("Container"))?;
                self.authorize(&mut tx, Action::ManageContainers, actor, &current.project_id, &[])
                    .await?;

                if req.status.is_some_and(|s| s != current.status) {
                    let held = db::count_in_container(&mut *tx, &current.id).await?;
                    if held > 0 {
                        return Err(AppError::Conflict(format!(
                            "container {} holds {held} documents; status can only change while empty",
                            current.name
                        )));
                    }
                }

                db::update_container(&mut *tx, &current.id, &req).await?;
                let updated = db::get_container(&mut *tx, &current.id)
                    .await?
                    .ok_or(AppError::NotFound("Container"))?;
                Ok(Staged::new(tx, updated))
            })
            .await?
            .commit()
            .await?;

        tracing::info!(container_id = %container.id, status = %container.status, actor = %actor.id, "container updated");
        self.events.publish(LifecycleEvent::for_container(
            EventKind::ContainerUpdated,
            &container,
            &actor.id,
        ));
        Ok(container)
    }

    /// 문서가 하나라도 참조하면 `Conflict`입니다.
    pub async fn delete_container(&self, actor: &Actor, container_id: &str) -> Result<(), AppError> {
        let container = self
            .bounded("delete_container", async {
                let mut tx = self.pool.begin().await?;
                let container = db::get_container(&mut *tx, container_id)
                    .await?
                    .ok_or(AppError::NotFound("Container"))?;
                self.authorize(&mut tx, Action::ManageContainers, actor, &container.project_id, &[])
                    .await?;

                let held = db::count_in_container(&mut *tx, &container.id).await?;
                if held > 0 {
                    return Err(AppError::Conflict(format!(
                        "container {} still holds {held} documents",
                        container.name
                    )));
                }

                db::delete_container(&mut *tx, &container.id).await?;
                Ok(Staged::new(tx, container))
            })
            .await?
            .commit()
            .await?;

        tracing::info!(container_id = %container.id, actor = %actor.id, "container deleted");
        self.events.publish(LifecycleEvent::for_container(
            EventKind::ContainerDeleted,
            &container,
            &actor.id,
        ));
        Ok(())
    }

    pub async fn list_containers(
        &self,
        actor: &Actor,
        project_id: &str,
    ) -> Result<Vec<ContainerOverview>, AppError> {
        self.bounded("list_containers", async {
            let mut conn = self.pool.acquire().await?;
            db::get_project(&mut *conn, project_id)
                .await?
                .ok_or(AppError::NotFound("Project"))?;
            self.authorize(&mut conn, Action::View, actor, project_id, &[])
                .await?;
            db::list_containers(&mut *conn, project_id).await
        })
        .await
    }

    // ── 감사 로그 ──

    pub async fn list_activity(
        &self,
        actor: &Actor,
        query: &ActivityQuery,
    ) -> Result<Vec<ActivityLog>, AppError> {
        permissions::decide_view_activity(actor).ensure()?;
        let limit = query
            .limit
            .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
            .clamp(1, MAX_ACTIVITY_LIMIT);

        self.bounded(
            "list_activity",
            db::list_activity(&self.pool, query.user_id.as_deref(), limit),
        )
        .await
    }
}
