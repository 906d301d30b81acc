use std::collections::HashMap;

use axum::{
    extract::Query,
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{debug, info};

pub const DOWNLOAD_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0xff];

/// Size of the `/api/download/large` payload, past the client's text body cap.
pub const LARGE_DOWNLOAD_LEN: usize = 11 * 1024 * 1024;

/// The `{ code, data, message }` body every API endpoint answers with.
#[derive(Clone, Debug, Serialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Self {
            code: 0,
            data,
            message: None,
        }
    }

    pub fn fail(code: i64, message: &str) -> Self {
        Self {
            code,
            data: Value::Null,
            message: Some(message.to_string()),
        }
    }
}

pub fn app() -> Router {
    Router::new()
        .route("/api/home", get(home))
        .route("/api/profile", get(profile))
        .route("/api/fail", get(fail))
        .route("/api/plain", get(plain))
        .route("/api/error", get(server_error))
        .route("/api/download", get(download))
        .route("/api/download/large", get(large_download))
        .route(
            "/api/echo",
            get(echo).post(echo).put(echo).patch(echo).delete(echo),
        )
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock server ready");
    }
    axum::serve(listener, app()).await
}

pub fn home_data() -> Value {
    json!({
        "swiper": [
            {"image": "/banner-1.png", "title": "Welcome", "subTitle": "Start here", "url": "/about"},
            {"image": "/banner-2.png"}
        ],
        "projects": [
            {"title": "Docs", "subTitle": "Guides and references", "url": "/docs", "icon": "i-carbon-book"}
        ],
        "lessons": [
            {"title": "Intro", "subTitle": "First steps", "url": "/lessons/intro", "image": "/intro.png"}
        ],
        "partners": [
            {"name": "Acme", "desc": "Tooling partner", "image": "/acme.png"},
            {"name": "Globex", "desc": "Hosting partner"}
        ]
    })
}

async fn home() -> Json<Envelope> {
    Json(Envelope::ok(home_data()))
}

/// Requires `Authorization: Bearer <token>` and echoes the token back.
async fn profile(headers: HeaderMap) -> (StatusCode, Json<Envelope>) {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match token {
        Some(token) if !token.is_empty() => {
            debug!("profile request authorized");
            (StatusCode::OK, Json(Envelope::ok(json!({ "token": token }))))
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(Envelope::fail(401, "login required")),
        ),
    }
}

async fn fail() -> Json<Envelope> {
    Json(Envelope::fail(1, "not found"))
}

async fn plain() -> Json<Value> {
    Json(json!({ "items": ["a", "b"] }))
}

async fn server_error() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "database unavailable" })),
    )
}

async fn download() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        DOWNLOAD_BYTES,
    )
}

async fn large_download() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        vec![0xab_u8; LARGE_DOWNLOAD_LEN],
    )
}

/// Reflects method, query, auth header and JSON body inside a `code: 200`
/// envelope.
async fn echo(
    method: Method,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> Json<Envelope> {
    let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    Json(Envelope {
        code: 200,
        data: json!({
            "method": method.as_str(),
            "query": query,
            "authorization": authorization,
            "body": body,
        }),
        message: Some("ok".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_omits_message() {
        let json = serde_json::to_value(Envelope::ok(json!({"a": 1}))).unwrap();
        assert_eq!(json, json!({"code": 0, "data": {"a": 1}}));
    }

    #[test]
    fn fail_envelope_omits_data() {
        let json = serde_json::to_value(Envelope::fail(1, "not found")).unwrap();
        assert_eq!(json, json!({"code": 1, "message": "not found"}));
    }

    #[test]
    fn home_data_has_every_section() {
        let data = home_data();
        for section in ["swiper", "projects", "lessons", "partners"] {
            assert!(data[section].is_array(), "{section} should be an array");
        }
    }
}
