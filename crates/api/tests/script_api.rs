//! Integration tests for the script listing, detail, execution, and reload
//! endpoints.

mod common;

use axum::http::{Method, StatusCode};
use common::{annotated, body_json, get, post, post_json, request_json, write_script};
use tempfile::TempDir;

/// A script directory with three tagged scripts, one of them nested.
fn seeded_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write_script(
        dir.path(),
        "deploy.sh",
        &annotated(
            "# description: Deploy the app\n# param: env - target environment\n# tags: ops, prod",
            "echo \"deploying to $ENV\"\n",
        ),
        true,
    );
    write_script(
        dir.path(),
        "backup.sh",
        &annotated("# description: Nightly backup\n# tags: ops", "echo backed up\n"),
        true,
    );
    write_script(
        dir.path(),
        "tools/clean-cache.sh",
        &annotated("# description: Clean\n# tags: dev\n# http_method: delete", "echo cleaned\n"),
        true,
    );
    dir
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_returns_all_scripts_keyed_by_name() {
    let dir = seeded_dir();
    let app = common::build_test_app(dir.path()).await;

    let response = get(app, "/scripts").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let scripts = json["scripts"].as_object().expect("scripts object");
    assert_eq!(scripts.len(), 3);
    assert_eq!(scripts["deploy"]["description"], "Deploy the app");
    assert_eq!(scripts["deploy"]["params"][0]["name"], "env");
    assert_eq!(scripts["tools_clean_cache"]["http_method"], "delete");
}

#[tokio::test]
async fn list_filters_by_tags() {
    let dir = seeded_dir();

    let app = common::build_test_app(dir.path()).await;
    let json = body_json(get(app, "/scripts?tags=ops,prod").await).await;
    let names: Vec<_> = json["scripts"].as_object().expect("object").keys().cloned().collect();
    assert_eq!(names, ["deploy"]);

    let app = common::build_test_app(dir.path()).await;
    let json = body_json(get(app, "/scripts?not_tags=ops").await).await;
    let names: Vec<_> = json["scripts"].as_object().expect("object").keys().cloned().collect();
    assert_eq!(names, ["tools_clean_cache"]);
}

#[tokio::test]
async fn list_names_only() {
    let dir = seeded_dir();
    let app = common::build_test_app(dir.path()).await;

    let json = body_json(get(app, "/scripts?names=true").await).await;
    assert_eq!(
        json["names"],
        serde_json::json!(["backup", "deploy", "tools_clean_cache"])
    );
}

#[tokio::test]
async fn non_executable_files_are_not_listed() {
    let dir = seeded_dir();
    write_script(dir.path(), "draft.sh", &annotated("# description: wip", "echo\n"), false);
    let app = common::build_test_app(dir.path()).await;

    let json = body_json(get(app, "/scripts?names=true").await).await;
    let names = json["names"].as_array().expect("names array");
    assert!(!names.iter().any(|n| n == "draft"));
}

// ---------------------------------------------------------------------------
// Details
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_script_returns_metadata() {
    let dir = seeded_dir();
    let app = common::build_test_app(dir.path()).await;

    let response = get(app, "/scripts/deploy").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["script"]["name"], "deploy");
    assert_eq!(json["script"]["http_method"], "post");
    assert_eq!(json["script"]["output_mode"], "split");
    assert_eq!(json["script"]["tags"], serde_json::json!(["ops", "prod"]));
}

#[tokio::test]
async fn unknown_script_returns_404_json() {
    let dir = seeded_dir();
    let app = common::build_test_app(dir.path()).await;

    let response = get(app, "/scripts/ghost").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Script with name 'ghost' not found");
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_script_with_json_params() {
    let dir = seeded_dir();
    let app = common::build_test_app(dir.path()).await;

    let response = post_json(app, "/scripts/deploy", r#"{"env": "staging"}"#).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["exit_code"], 0);
    assert_eq!(json["stdout"], serde_json::json!(["deploying to staging"]));
    assert_eq!(json["stderr"], serde_json::json!([]));
    assert!(json["duration_ms"].is_u64());
}

#[tokio::test]
async fn run_script_with_query_params() {
    let dir = seeded_dir();
    let app = common::build_test_app(dir.path()).await;

    let json = body_json(post(app, "/scripts/deploy?env=qa").await).await;
    assert_eq!(json["stdout"], serde_json::json!(["deploying to qa"]));
}

#[tokio::test]
async fn body_overrides_query_params() {
    let dir = seeded_dir();
    let app = common::build_test_app(dir.path()).await;

    let json = body_json(post_json(app, "/scripts/deploy?env=qa", r#"{"env": "prod"}"#).await).await;
    assert_eq!(json["stdout"], serde_json::json!(["deploying to prod"]));
}

#[tokio::test]
async fn run_accepts_put_and_delete() {
    let dir = seeded_dir();

    let app = common::build_test_app(dir.path()).await;
    let response = request_json(app, Method::DELETE, "/scripts/tools_clean_cache", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["stdout"], serde_json::json!(["cleaned"]));

    let app = common::build_test_app(dir.path()).await;
    let response = request_json(app, Method::PUT, "/scripts/backup", "").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn non_zero_exit_is_reported_not_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_script(
        dir.path(),
        "fail.sh",
        &annotated("# output: combined", "echo oops >&2\nexit 3\n"),
        true,
    );
    let app = common::build_test_app(dir.path()).await;

    let response = post(app, "/scripts/fail").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["exit_code"], 3);
    assert_eq!(json["stdout"], serde_json::json!(["oops"]));
}

#[tokio::test]
async fn running_unknown_script_returns_404() {
    let dir = seeded_dir();
    let app = common::build_test_app(dir.path()).await;

    let response = post(app, "/scripts/ghost").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_json_returns_400() {
    let dir = seeded_dir();
    let app = common::build_test_app(dir.path()).await;

    let response = post_json(app, "/scripts/deploy", "{not json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn run_outlasting_request_timeout_completes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let marker = dir.path().join("done");
    write_script(
        dir.path(),
        "slow.sh",
        &annotated(
            "# lock: True",
            &format!("export PATH=/usr/bin:/bin\nsleep 1.5\ntouch '{}'\necho finished\n", marker.display()),
        ),
        true,
    );
    let mut config = common::test_config(dir.path());
    config.request_timeout_secs = 1;
    let app = common::build_test_app_with(config).await;

    let response = post(app, "/scripts/slow").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["stdout"], serde_json::json!(["finished"]));
    assert!(marker.exists());
}

// ---------------------------------------------------------------------------
// Trailing slashes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trailing_slash_is_accepted_everywhere() {
    let dir = seeded_dir();

    let app = common::build_test_app(dir.path()).await;
    assert_eq!(get(app, "/scripts/").await.status(), StatusCode::OK);

    let app = common::build_test_app(dir.path()).await;
    let response = get(app, "/scripts/deploy/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["script"]["name"], "deploy");

    let app = common::build_test_app(dir.path()).await;
    let json = body_json(post_json(app, "/scripts/deploy/", r#"{"env": "dev"}"#).await).await;
    assert_eq!(json["stdout"], serde_json::json!(["deploying to dev"]));

    let app = common::build_test_app(dir.path()).await;
    assert_eq!(post(app, "/reload/").await.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Reload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reload_picks_up_new_and_removed_scripts() {
    let dir = seeded_dir();
    let app = common::build_test_app(dir.path()).await;

    write_script(dir.path(), "fresh.sh", &annotated("# description: new", "echo new\n"), true);
    std::fs::remove_file(dir.path().join("backup.sh")).expect("remove");

    let response = post(app.clone(), "/reload").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["scripts"], 3);

    let json = body_json(get(app, "/scripts?names=true").await).await;
    assert_eq!(
        json["names"],
        serde_json::json!(["deploy", "fresh", "tools_clean_cache"])
    );
}
