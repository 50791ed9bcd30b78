//! # 컨테이너 상태 머신
//!
//! 문서를 다른 컨테이너로 옮기는 것은 곧 상태 전이입니다. 이 모듈은 어떤 전이가
//! 합법인지와, 전이마다 어떤 권한이 필요한지를 정적인 표로 정의합니다.
//!
//! ```text
//! WORK_IN_PROGRESS ──▶ SHARED ──▶ PUBLISHED ──▶ ARCHIVED
//!        ▲               │                          │
//!        └───────────────┘◀─────────────────────────┘
//! ```
//!
//! 전이는 *문서의 현재 상태*를 기준으로 판단합니다 (컨테이너 상태가 아님).
//! 모든 함수는 순수 함수이며 전역 상태가 없습니다.

use crate::error::AppError;
use crate::models::ContainerStatus::{self, *};
use crate::services::permissions::Action;

/// 현재 상태 → 합법적인 다음 상태
static TRANSITIONS: [(ContainerStatus, &[ContainerStatus]); 4] = [
    (WorkInProgress, &[Shared]),
    (Shared, &[Published, WorkInProgress]),
    (Published, &[Archived]),
    (Archived, &[WorkInProgress]),
];

/// `from` 상태에서 옮겨갈 수 있는 상태 목록
pub fn legal_targets(from: ContainerStatus) -> &'static [ContainerStatus] {
    TRANSITIONS
        .iter()
        .find(|(status, _)| *status == from)
        .map(|(_, targets)| *targets)
        .unwrap_or(&[])
}

pub fn is_legal(from: ContainerStatus, to: ContainerStatus) -> bool {
    legal_targets(from).contains(&to)
}

/// 이동 한 번이 어떤 종류인지
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// 같은 상태의 다른 컨테이너로 옮김 (상태 변화 없음)
    Reassign,
    /// 표에 있는 상태 전이
    Transition,
}

/// 이동을 검사합니다. 표에 없는 전이는 `InvalidTransition`입니다.
pub fn check_move(from: ContainerStatus, to: ContainerStatus) -> Result<MoveKind, AppError> {
    if from == to {
        Ok(MoveKind::Reassign)
    } else if is_legal(from, to) {
        Ok(MoveKind::Transition)
    } else {
        Err(AppError::InvalidTransition { from, to })
    }
}

/// 해당 상태로 들어가는 데 필요한 권한.
/// 게시(PUBLISHED)와 보관(ARCHIVED)만 역할이 제한되고, 나머지는 멤버면 됩니다.
pub fn required_action(to: ContainerStatus) -> Action {
    match to {
        Published => Action::Publish,
        Archived => Action::Archive,
        WorkInProgress | Shared => Action::Move,
    }
}
