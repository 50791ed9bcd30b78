//! # 권한 게이트
//!
//! 누가 어떤 변경을 요청할 수 있는지를 결정하는 순수 함수입니다.
//! 역할 비교를 호출 지점마다 흩어 놓지 않고, `action × role` 표 하나로 모읍니다.
//!
//! 입력:
//! - 요청 주체(Actor)와 그 전역 역할
//! - 해당 프로젝트의 멤버십 기록 (없을 수 있음)
//! - 리소스의 소유자(업로더) ID 목록
//!
//! 판단은 항상 `Decision`(허용/거부)으로 끝나고 에러를 던지지 않습니다.
//! 라이프사이클 엔진이 거부를 일관된 `Forbidden` 응답으로 바꿉니다.
//! `ADMIN`은 멤버십 검사를 포함한 모든 검사를 건너뜁니다.

use std::fmt;

use crate::error::AppError;
use crate::models::{Actor, ProjectMember, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// 프로젝트/컨테이너/문서/원장 조회
    View,
    /// WIP 컨테이너로 업로드 (자기 작업물)
    UploadDraft,
    /// WIP 외 컨테이너로 업로드
    Upload,
    /// 승격이 아닌 이동 (WIP/SHARED 방향, 같은 상태 내 재배치)
    Move,
    /// PUBLISHED로 승격
    Publish,
    /// ARCHIVED로 승격
    Archive,
    /// 파일 내용(버전) 교체
    EditContent,
    /// 이름/메타데이터 수정
    EditMetadata,
    Delete,
    ManageContainers,
    ManageMembers,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::UploadDraft => "upload_draft",
            Action::Upload => "upload",
            Action::Move => "move",
            Action::Publish => "publish",
            Action::Archive => "archive",
            Action::EditContent => "edit_content",
            Action::EditMetadata => "edit_metadata",
            Action::Delete => "delete",
            Action::ManageContainers => "manage_containers",
            Action::ManageMembers => "manage_members",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use Role::{BimManager, Contributor, ProjectManager, Viewer};

/// 프로젝트 역할별 허용 동작
static PERMISSIONS: [(Action, &[Role]); 11] = [
    (Action::View, &[ProjectManager, BimManager, Contributor, Viewer]),
    (Action::UploadDraft, &[ProjectManager, BimManager, Contributor]),
    (Action::Upload, &[ProjectManager, BimManager]),
    (Action::Move, &[ProjectManager, BimManager, Contributor]),
    (Action::Publish, &[ProjectManager, BimManager]),
    (Action::Archive, &[ProjectManager]),
    (Action::EditContent, &[ProjectManager, BimManager]),
    (Action::EditMetadata, &[ProjectManager, BimManager]),
    (Action::Delete, &[ProjectManager, BimManager]),
    (Action::ManageContainers, &[ProjectManager]),
    (Action::ManageMembers, &[ProjectManager]),
];

/// 리소스 소유자일 때 추가로 허용되는 동작
static OWNER_PERMISSIONS: [(Action, &[Role]); 2] = [
    (Action::EditContent, &[Contributor]),
    (Action::EditMetadata, &[Contributor]),
];

fn table_allows(table: &[(Action, &[Role])], action: Action, role: Role) -> bool {
    table
        .iter()
        .any(|(entry, roles)| *entry == action && roles.contains(&role))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// 거부를 `Forbidden` 에러로 바꿉니다.
    pub fn ensure(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(AppError::Forbidden(reason)),
        }
    }
}

/// 프로젝트 범위 동작에 대한 판단
pub fn decide(
    action: Action,
    actor: &Actor,
    membership: Option<&ProjectMember>,
    owner_ids: &[&str],
) -> Decision {
    if actor.is_admin() {
        return Decision::Allow;
    }

    let Some(member) = membership.filter(|m| m.user_id == actor.id) else {
        return Decision::Deny("not a member of this project".to_string());
    };

    if table_allows(&PERMISSIONS, action, member.role) {
        return Decision::Allow;
    }

    let is_owner = owner_ids.iter().any(|owner| *owner == actor.id);
    if is_owner && table_allows(&OWNER_PERMISSIONS, action, member.role) {
        return Decision::Allow;
    }

    Decision::Deny(format!("role {} may not {}", member.role, action))
}

/// 프로젝트 생성: 아직 멤버십이 없으므로 전역 역할로 판단합니다.
pub fn decide_create_project(actor: &Actor) -> Decision {
    match actor.role {
        Role::Admin | Role::ProjectManager => Decision::Allow,
        role => Decision::Deny(format!("role {role} may not create projects")),
    }
}

/// 시스템 전체 감사 로그 조회
pub fn decide_view_activity(actor: &Actor) -> Decision {
    if actor.is_admin() {
        Decision::Allow
    } else {
        Decision::Deny("activity log is restricted to administrators".to_string())
    }
}
