#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{FromRequest, Multipart};
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use ecus::config::Config;
use ecus::store::{AppState, ArtifactStore, DeploymentRegistry};

pub const PROJECT: &str = "web";
pub const UPLOAD_KEY: &str = "ecus_test_upload_key";
pub const ADMIN_TOKEN: &str = "ecus_test_admin";
pub const BOUNDARY: &str = "ecus-test-boundary";

pub fn test_config() -> Config {
    Config {
        listen: "127.0.0.1:0".into(),
        s3_endpoint: "http://localhost:9000".into(),
        s3_region: "us-east-1".into(),
        s3_bucket: "test".into(),
        s3_access_key_id: "test".into(),
        s3_secret_access_key: "test".into(),
        api_keys: HashMap::from([(PROJECT.to_owned(), UPLOAD_KEY.to_owned())]),
        admin_token: Some(ADMIN_TOKEN.into()),
        max_upload_bytes: 1024 * 1024,
    }
}

/// Build a test `AppState` backed by in-memory object storage.
pub fn test_state() -> AppState {
    state_with_store(ArtifactStore::memory().expect("memory operator"))
}

pub fn state_with_store(artifacts: ArtifactStore) -> AppState {
    AppState {
        artifacts,
        deployments: DeploymentRegistry::new(),
        config: Arc::new(test_config()),
    }
}

/// Build the full API router with the given state.
pub fn test_router(state: AppState) -> Router {
    let max = state.config.max_upload_bytes;
    Router::new()
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .merge(ecus::api::router(max))
        .with_state(state)
}

/// Serve the router on an ephemeral port. Returns the base url.
pub async fn spawn_server(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = test_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ---------------------------------------------------------------------------
// Multipart
// ---------------------------------------------------------------------------

/// One multipart part: `(name, filename, bytes)`.
pub type FormPart<'a> = (&'a str, Option<&'a str>, &'a [u8]);

pub fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(f) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                     Content-Type: application/gzip\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Decode a multipart body into `name -> bytes` with axum's extractor, the
/// same parser the upload endpoint uses.
pub async fn parse_multipart(content_type: &str, body: &[u8]) -> HashMap<String, Vec<u8>> {
    let req = Request::builder()
        .header("Content-Type", content_type)
        .body(Body::from(body.to_vec()))
        .unwrap();
    let mut multipart = Multipart::from_request(req, &()).await.unwrap();

    let mut parts = HashMap::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().expect("unnamed multipart field").to_owned();
        parts.insert(name, field.bytes().await.unwrap().to_vec());
    }
    parts
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Send a multipart PUT to the upload endpoint with Bearer auth.
pub async fn put_upload(
    app: &Router,
    token: &str,
    project: &str,
    parts: &[FormPart<'_>],
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("PUT")
        .uri(format!("/api/{project}/upload"))
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if !token.is_empty() {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let req = builder.body(Body::from(multipart_body(parts))).unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = body_json(resp).await;
    (status, body)
}

/// Send a GET request with Bearer auth.
pub async fn get_json(app: &Router, token: &str, path: &str) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("GET").uri(path);
    if !token.is_empty() {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let req = builder.body(Body::empty()).unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = body_json(resp).await;
    (status, body)
}

/// Extract JSON body from a response.
async fn body_json(resp: axum::http::Response<Body>) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

pub fn git_info_json(hash: &str) -> String {
    serde_json::json!({
        "hash": hash,
        "isClean": true,
        "branch": "main",
        "message": "initial commit",
    })
    .to_string()
}

// ---------------------------------------------------------------------------
// Git repo helpers
// ---------------------------------------------------------------------------

/// Create a git repo holding `files`, committed on `main`.
pub fn create_repo(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    git_cmd(dir.path(), &["init", "-b", "main"]);
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
    git_cmd(dir.path(), &["add", "."]);
    git_cmd(dir.path(), &["commit", "-m", "initial commit"]);
    dir
}

/// Run a git command in a directory; panic on failure.
pub fn git_cmd(dir: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "E2E Test")
        .env("GIT_AUTHOR_EMAIL", "test@e2e.local")
        .env("GIT_COMMITTER_NAME", "E2E Test")
        .env("GIT_COMMITTER_EMAIL", "test@e2e.local")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Entry names of a `.tar.gz` archive.
pub fn archive_entries(bytes: &[u8]) -> Vec<String> {
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(bytes));
    archive
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
        .collect()
}
