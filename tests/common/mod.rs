#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt;

use vidtube::config::{Config, MediaProvider};
use vidtube::db;
use vidtube::media;
use vidtube::routes::build_router;
use vidtube::state::AppState;

pub const PASSWORD: &str = "hunter22";
const BOUNDARY: &str = "vidtube-test-boundary";

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

pub fn build_test_context() -> Result<TestContext> {
    let temp_dir = tempfile::tempdir()?;

    let mut config = Config::default();
    config.database.path = Some(temp_dir.path().join("vidtube.db"));
    config.storage.path = Some(temp_dir.path().join("uploads"));
    config.server.public_url = Some("http://localhost:8000".into());
    config.auth.access_token_secret = "test-access-secret".into();
    config.auth.refresh_token_secret = "test-refresh-secret".into();
    config.auth.secure_cookies = false;
    config.auth.bcrypt_cost = 4;
    config.media.provider = MediaProvider::Local;

    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;
    let store = media::from_config(&config)?;

    let state = AppState::new(pool, config, store);
    let app = build_router(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
    })
}

/// A multipart part: text field or file field.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn send(app: &axum::Router, req: Request<Body>) -> Response {
    app.clone()
        .oneshot(req)
        .await
        .expect("request should be handled")
}

async fn read_json(resp: Response) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };
    (status, json)
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    read_json(send(app, req).await).await
}

/// Request with the given raw Cookie header; returns the response headers too.
pub async fn request_with_cookie(
    app: &axum::Router,
    method: &str,
    uri: &str,
    cookie: &str,
) -> (StatusCode, Value, Vec<String>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .expect("request should build");

    let resp = send(app, req).await;
    let cookies = set_cookies(&resp);
    let (status, json) = read_json(resp).await;
    (status, json, cookies)
}

/// Request with an arbitrary body and content type, plus an optional Cookie header.
pub async fn request_raw(
    app: &axum::Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    content_type: &str,
    body: &str,
) -> (StatusCode, Value, Vec<String>) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let req = builder
        .body(Body::from(body.to_string()))
        .expect("request should build");

    let resp = send(app, req).await;
    let cookies = set_cookies(&resp);
    let (status, json) = read_json(resp).await;
    (status, json, cookies)
}

pub async fn request_multipart(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    parts: &[Part<'_>],
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = builder
        .body(Body::from(multipart_body(parts)))
        .expect("request should build");

    read_json(send(app, req).await).await
}

pub fn set_cookies(resp: &Response) -> Vec<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

pub async fn register_user(app: &axum::Router, username: &str) -> Value {
    let email = format!("{username}@example.com");
    let (status, body) = request_multipart(
        app,
        "POST",
        "/users/register",
        None,
        &[
            Part::Text("fullName", "Test User"),
            Part::Text("email", &email),
            Part::Text("username", username),
            Part::Text("password", PASSWORD),
            Part::File("avatar", "avatar.png", b"fake-png-bytes"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    body["data"].clone()
}

/// Log in and return (access token, refresh token, Set-Cookie headers).
pub async fn login(app: &axum::Router, username: &str) -> (String, String, Vec<String>) {
    let payload = serde_json::json!({
        "email": format!("{username}@example.com"),
        "password": PASSWORD,
    });
    let req = Request::builder()
        .method("POST")
        .uri("/users/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request should build");

    let resp = send(app, req).await;
    let cookies = set_cookies(&resp);
    let (status, body) = read_json(resp).await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");

    let access = body["data"]["accessToken"]
        .as_str()
        .expect("access token should exist")
        .to_string();
    let refresh = body["data"]["refreshToken"]
        .as_str()
        .expect("refresh token should exist")
        .to_string();
    (access, refresh, cookies)
}

/// Register and log in; returns (user id, access token).
pub async fn signed_in_user(app: &axum::Router, username: &str) -> (String, String) {
    let user = register_user(app, username).await;
    let (access, _, _) = login(app, username).await;
    let id = user["id"].as_str().expect("user id should exist").to_string();
    (id, access)
}

pub async fn upload_video(app: &axum::Router, token: &str, title: &str) -> Value {
    let (status, body) = request_multipart(
        app,
        "POST",
        "/videos/upload-video",
        Some(token),
        &[
            Part::Text("title", title),
            Part::Text("description", "a test video"),
            Part::File("video", "clip.mp4", b"fake-mp4-bytes"),
            Part::File("thumbnail", "thumb.jpg", b"fake-jpg-bytes"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK, "upload failed: {body}");
    body["data"].clone()
}

/// Number of files directly inside the media uploads directory.
pub fn stored_media_count(ctx: &TestContext) -> usize {
    std::fs::read_dir(ctx.state.config.uploads_path())
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .count()
        })
        .unwrap_or(0)
}

/// Number of spooled files left behind in the temp uploads directory.
pub fn temp_file_count(ctx: &TestContext) -> usize {
    std::fs::read_dir(ctx.state.config.temp_uploads_path())
        .map(|entries| entries.filter_map(|e| e.ok()).count())
        .unwrap_or(0)
}
