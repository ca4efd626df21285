#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{HeaderValue, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use jojo_api::config::ServerConfig;
use jojo_api::router::build_app_router;
use jojo_api::state::AppState;
use jojo_core::scripting::{EngineConfig, RegistryHandle};

/// Build a test `ServerConfig` pointing at `script_dir`.
///
/// Allows `http://app.example` as CORS origin and uses a 30-second request
/// timeout.
pub fn test_config(script_dir: &Path) -> ServerConfig {
    ServerConfig {
        script_dir: script_dir.to_path_buf(),
        host: "127.0.0.1".to_string(),
        port: 0,
        unix_socket: None,
        cors_origins: vec![HeaderValue::from_static("http://app.example")],
        request_timeout_secs: 30,
        engine: EngineConfig::default(),
    }
}

/// Load the registry from `script_dir` and build the full application
/// router, the same one `main.rs` serves.
pub async fn build_test_app(script_dir: &Path) -> Router {
    build_test_app_with(test_config(script_dir)).await
}

/// Same as [`build_test_app`] with a caller-tuned configuration.
pub async fn build_test_app_with(config: ServerConfig) -> Router {
    let script_dir = config.script_dir.clone();
    let registry = RegistryHandle::load(script_dir)
        .await
        .expect("registry should load");
    build_app_router(AppState::new(config.clone(), registry), &config)
}

/// Write a script under `dir`, executable unless `executable` is false.
pub fn write_script(dir: &Path, relative: &str, contents: &str, executable: bool) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create script dir");
    }
    std::fs::write(&path, contents).expect("write script");
    let mode = if executable { 0o755 } else { 0o644 };
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).expect("chmod");
    path
}

/// Wrap `directives` in an annotation block after a `/bin/sh` shebang.
pub fn annotated(directives: &str, body: &str) -> String {
    format!("#!/bin/sh\n# -- jojo --\n{directives}\n# -- jojo --\n{body}")
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("request should complete")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    send(app, request).await
}

pub async fn post(app: Router, uri: &str) -> Response<Body> {
    request_json(app, Method::POST, uri, "").await
}

pub async fn post_json(app: Router, uri: &str, body: &str) -> Response<Body> {
    request_json(app, Method::POST, uri, body).await
}

pub async fn request_json(app: Router, method: Method, uri: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    send(app, request).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}
