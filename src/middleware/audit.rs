//! # HTTP 감사 레이어
//!
//! 상태를 바꾸는 요청(GET/HEAD/OPTIONS 외)마다 응답이 만들어진 뒤
//! 요청 주체, 동사, 대상, 결과 상태 코드, 소요 시간을 감사 큐에 넣습니다.
//! 토큰을 검증할 수 없는 요청(주체를 모르는 요청)은 기록하지 않습니다.
//!
//! 응답은 기록 여부와 무관하게 그대로 돌려보냅니다.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header::CONTENT_LENGTH, header::CONTENT_TYPE, Method},
    middleware::Next,
    response::Response,
};
use futures_util::StreamExt;

use crate::middleware::auth::actor_from_headers;
use crate::models::ActivityEntry;
use crate::routes::AppState;

/// 설명에 포함할 JSON 본문의 최대 크기 (Content-Length 기준)
const MAX_LOGGED_BODY: usize = 16 * 1024;
/// 설명에 실제로 남기는 본문 글자 수
const MAX_PAYLOAD_CHARS: usize = 512;

/// 경로 세그먼트 → 대상 종류
static OBJECT_TYPES: [(&str, &str); 5] = [
    ("projects", "project"),
    ("containers", "container"),
    ("documents", "document"),
    ("members", "member"),
    ("activity", "activity"),
];

/// ID 자리에 오지만 ID가 아닌 하위 경로
static SUB_RESOURCES: [&str; 3] = ["move", "content", "history"];

pub async fn record_activity(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if matches!(*request.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return next.run(request).await;
    }
    let Ok(actor) = actor_from_headers(request.headers(), &state.jwt_secret) else {
        return next.run(request).await;
    };

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let (request, copy) = tee_json_body(request);

    let started = Instant::now();
    let response = next.run(request).await;
    let elapsed = started.elapsed();

    let status = response.status();
    let (object_type, object_id) = classify(&path);
    let outcome = if status.is_success() { "succeeded" } else { "failed" };

    let mut description = format!(
        "{method} {path} {outcome} with {} in {} ms",
        status.as_u16(),
        elapsed.as_millis()
    );
    if let Some(payload) = copy.and_then(|c| c.payload()) {
        description.push_str(" payload: ");
        description.push_str(&payload);
    }

    state.audit.record(ActivityEntry {
        user_id: actor.id,
        action: verb(&method, &path, object_id.is_some()).to_string(),
        object_type: object_type.to_string(),
        object_id,
        description,
        status_code: status.as_u16(),
        duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
    });

    response
}

/// 본문 사본. 핸들러가 읽은 청크가 그대로 쌓입니다.
#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    /// 스트림 오류 또는 크기 초과
    incomplete: bool,
}

#[derive(Debug, Clone, Default)]
struct BodyCopy(Arc<Mutex<Captured>>);

impl BodyCopy {
    fn push(&self, chunk: &Result<Bytes, axum::Error>) {
        let Ok(mut captured) = self.0.lock() else {
            return;
        };
        match chunk {
            Ok(bytes) if captured.bytes.len() + bytes.len() <= MAX_LOGGED_BODY => {
                captured.bytes.extend_from_slice(bytes);
            }
            _ => captured.incomplete = true,
        }
    }

    /// 핸들러가 오류 없이 읽은 본문 (앞부분만)
    fn payload(&self) -> Option<String> {
        let captured = self.0.lock().ok()?;
        if captured.incomplete || captured.bytes.is_empty() {
            return None;
        }
        Some(
            String::from_utf8_lossy(&captured.bytes)
                .chars()
                .take(MAX_PAYLOAD_CHARS)
                .collect(),
        )
    }
}

/// 길이를 아는 작은 JSON 본문에만 사본을 붙입니다.
///
/// 본문을 미리 읽지 않습니다. 핸들러가 읽는 청크와 오류는 원래 스트림 그대로이고,
/// 사본은 그 옆에서 쌓일 뿐입니다.
fn tee_json_body(request: Request) -> (Request, Option<BodyCopy>) {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    let small = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .is_some_and(|len| len <= MAX_LOGGED_BODY);

    if !(is_json && small) {
        return (request, None);
    }

    let copy = BodyCopy::default();
    let sink = copy.clone();
    let (parts, body) = request.into_parts();
    // inspect: 청크를 바꾸지 않고 들여다보기만 합니다.
    let stream = body.into_data_stream().inspect(move |chunk| sink.push(chunk));

    (Request::from_parts(parts, Body::from_stream(stream)), Some(copy))
}

/// `/api/v1/projects/P/containers` → ("container", None)
/// `/api/v1/documents/D/move` → ("document", Some("D"))
fn classify(path: &str) -> (&'static str, Option<String>) {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut object = ("request", None);

    for (i, segment) in segments.iter().enumerate() {
        if let Some((_, kind)) = OBJECT_TYPES.iter().find(|(name, _)| name == segment) {
            let id = segments
                .get(i + 1)
                .filter(|next| {
                    !SUB_RESOURCES.contains(*next) && !OBJECT_TYPES.iter().any(|(n, _)| n == *next)
                })
                .map(|id| id.to_string());
            object = (*kind, id);
        }
    }

    object
}

fn verb(method: &Method, path: &str, targets_object: bool) -> &'static str {
    match path.rsplit('/').next() {
        Some("move") => return "move",
        Some("content") => return "replace_content",
        _ => {}
    }

    match *method {
        Method::POST if path.ends_with("/documents") => "upload",
        Method::POST if targets_object => "update",
        Method::POST => "create",
        Method::PUT => "replace",
        Method::PATCH => "update",
        Method::DELETE => "delete",
        _ => "other",
    }
}
