//! In-process stand-in for the Nuki Web API.
//!
//! Serves the handful of endpoints the client uses from shared in-memory
//! state and records every request so tests can assert on wire shapes.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use nuki_otp_client::{OtpService, RetryPolicy};
use nuki_otp_core::otp::format_api_date;
use nuki_otp_core::OtpConfig;
use nuki_otp_events::EventBus;

pub const TOKEN: &str = "test-token";
pub const LOCK_NAME: &str = "Front Door";
pub const LOCK_ID: i64 = 42;

/// A request as seen by the fake server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub accept: Option<String>,
    pub body: Option<Value>,
}

/// Mutable state behind the fake server.
#[derive(Default)]
pub struct CloudState {
    pub locks: Vec<Value>,
    pub auths: Vec<Value>,
    /// Unlock log entries keyed by authorization id.
    pub logs: HashMap<String, Vec<Value>>,
    pub requests: Vec<RecordedRequest>,
    pub next_id: u64,
    /// Status returned instead of success for the given method + path.
    pub failures: HashMap<(Method, String), u16>,
    /// Raw 200 body returned instead of the normal answer.
    pub raw_bodies: HashMap<(Method, String), String>,
    /// Delay applied before answering any request.
    pub delay: Option<Duration>,
    /// Serve `/smartlock` as two enveloped pages.
    pub paginate_locks: bool,
    /// `next` link of the first page; defaults to a relative path.
    pub next_link: Option<String>,
}

type Shared = Arc<Mutex<CloudState>>;

/// Handle on a running fake server.
#[derive(Clone)]
pub struct FakeCloud {
    state: Shared,
    pub base_url: String,
}

impl FakeCloud {
    /// Start a server on an ephemeral port with the "Front Door" lock.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(CloudState::default()));
        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake cloud server");
        });

        let cloud = Self {
            state,
            base_url: format!("http://{addr}"),
        };
        cloud.add_lock(7, "Garage");
        cloud.add_lock(LOCK_ID, LOCK_NAME);
        cloud
    }

    pub fn state(&self) -> MutexGuard<'_, CloudState> {
        self.state.lock().expect("fake cloud state poisoned")
    }

    pub fn config(&self) -> OtpConfig {
        OtpConfig::new(TOKEN, LOCK_NAME)
            .with_api_url(&self.base_url)
            .with_lifetime_hours(12)
    }

    pub fn service(&self) -> OtpService {
        self.service_with(self.config())
    }

    pub fn service_with(&self, config: OtpConfig) -> OtpService {
        OtpService::with_policy(config, fast_policy(), Arc::new(EventBus::default()))
            .expect("valid test configuration")
    }

    pub fn add_lock(&self, id: i64, name: &str) {
        self.state()
            .locks
            .push(json!({"smartlockId": id, "name": name, "type": 4}));
    }

    /// Seed a keypad authorization created at `created`.
    pub fn add_auth(&self, id: &str, name: &str, code: u32, created: DateTime<Utc>) {
        self.state().auths.push(json!({
            "id": id,
            "name": name,
            "code": code,
            "type": 13,
            "creationDate": format_api_date(created),
            "enabled": true,
            "remoteAllowed": true,
            "lockCount": 0,
            "smartlockId": LOCK_ID,
        }));
    }

    /// Seed an authorization of another type.
    pub fn add_foreign_auth(&self, id: &str, name: &str, auth_type: u8) {
        self.state().auths.push(json!({
            "id": id,
            "name": name,
            "type": auth_type,
            "creationDate": format_api_date(Utc::now()),
        }));
    }

    pub fn mark_used(&self, auth_id: &str) {
        self.state()
            .logs
            .entry(auth_id.to_string())
            .or_default()
            .push(json!({"action": 1, "authId": auth_id, "date": format_api_date(Utc::now())}));
    }

    pub fn fail(&self, method: Method, path: &str, status: u16) {
        self.state()
            .failures
            .insert((method, path.to_string()), status);
    }

    pub fn respond_raw(&self, method: Method, path: &str, body: &str) {
        self.state()
            .raw_bodies
            .insert((method, path.to_string()), body.to_string());
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    pub fn auth_ids(&self) -> Vec<String> {
        self.state()
            .auths
            .iter()
            .filter_map(|a| a["id"].as_str().map(String::from))
            .collect()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }
}

/// Retry tuning that keeps tests fast.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        timeout: Duration::from_millis(250),
        max_retries: 3,
        retry_delay: Duration::from_millis(10),
    }
}

/// Base URL nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

// ---------------------------------------------------------------------------
// Request handling
// ---------------------------------------------------------------------------

fn query_param<'a>(query: Option<&'a str>, key: &str) -> Option<&'a str> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

async fn handle(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let query = uri.query().map(String::from);
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let body: Option<Value> = serde_json::from_slice(&body).ok();

    let delay = {
        let mut s = state.lock().expect("fake cloud state poisoned");
        s.requests.push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            query: query.clone(),
            authorization: authorization.clone(),
            accept,
            body: body.clone(),
        });
        s.delay
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    if authorization.as_deref() != Some(&format!("Bearer {TOKEN}")) {
        return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
    }

    let mut s = state.lock().expect("fake cloud state poisoned");

    if let Some(status) = s.failures.get(&(method.clone(), path.clone())) {
        let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, "injected failure").into_response();
    }

    if let Some(raw) = s.raw_bodies.get(&(method.clone(), path.clone())) {
        return (StatusCode::OK, raw.clone()).into_response();
    }

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let query = query.as_deref();

    match (method, segments.as_slice()) {
        (Method::GET, ["smartlock"]) => {
            if s.paginate_locks {
                let (first, rest) = s.locks.split_at(1.min(s.locks.len()));
                if query_param(query, "page") == Some("2") {
                    Json(json!({"items": rest})).into_response()
                } else {
                    let next = s.next_link.as_deref().unwrap_or("smartlock?page=2");
                    Json(json!({"items": first, "next": next})).into_response()
                }
            } else {
                Json(Value::Array(s.locks.clone())).into_response()
            }
        }
        (Method::GET, ["smartlock", "auth"]) => {
            let wanted = query_param(query, "type").and_then(|t| t.parse::<u64>().ok());
            let auths: Vec<Value> = s
                .auths
                .iter()
                .filter(|a| wanted.is_none() || a["type"].as_u64() == wanted)
                .cloned()
                .collect();
            Json(Value::Array(auths)).into_response()
        }
        (Method::PUT, ["smartlock", "auth"]) => {
            let Some(body) = body else {
                return (StatusCode::BAD_REQUEST, "missing body").into_response();
            };
            s.next_id += 1;
            let id = format!("auth{}", s.next_id);
            s.auths.push(json!({
                "id": id,
                "name": body["name"],
                "code": body["code"],
                "type": body["type"],
                "creationDate": format_api_date(Utc::now()),
                "enabled": true,
                "remoteAllowed": body["remoteAllowed"],
                "lockCount": 0,
                "smartlockId": body["smartlockIds"][0],
            }));
            StatusCode::NO_CONTENT.into_response()
        }
        (Method::DELETE, ["smartlock", "auth"]) => {
            let ids: Vec<String> = body
                .as_ref()
                .and_then(|b| b["ids"].as_array())
                .map(|ids| {
                    ids.iter()
                        .filter_map(|i| i.as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default();
            s.auths
                .retain(|a| !ids.iter().any(|id| a["id"].as_str() == Some(id.as_str())));
            StatusCode::NO_CONTENT.into_response()
        }
        (Method::GET, ["smartlock", _lock_id, "log"]) => {
            let entries = query_param(query, "authId")
                .and_then(|id| s.logs.get(id).cloned())
                .unwrap_or_default();
            Json(Value::Array(entries)).into_response()
        }
        _ => (StatusCode::NOT_FOUND, "no such endpoint").into_response(),
    }
}
