//! Integration tests for the `netconsole` CLI binary.
//!
//! Argument parsing, help output and completions run offline; the session
//! flows run against a wiremock backend with config and session files in a
//! temporary directory.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `netconsole` binary with env isolation.
///
/// Clears all `NETCONSOLE_*` and `API_BASE_URL` variables and points the
/// config and data directories at `home` so tests never touch the user's
/// real configuration or session.
fn netconsole_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("netconsole");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("NETCONSOLE_SESSION__PATH", home.join("session.json"))
        .env_remove("API_BASE_URL")
        .env_remove("NETCONSOLE_BASE_URL")
        .env_remove("NETCONSOLE_OUTPUT")
        .env_remove("NETCONSOLE_PASSWORD")
        .env_remove("NETCONSOLE_TIMEOUT")
        .env_remove("NETCONSOLE_SESSION__BACKEND")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn write_session(home: &Path, token: &str, refresh: Option<&str>) {
    let mut body = json!({ "authToken": token });
    if let Some(r) = refresh {
        body["refreshToken"] = json!(r);
    }
    std::fs::write(home.join("session.json"), body.to_string()).unwrap();
}

fn read_session(home: &Path) -> Option<serde_json::Value> {
    let raw = std::fs::read_to_string(home.join("session.json")).ok()?;
    Some(serde_json::from_str(&raw).unwrap())
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = netconsole_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    netconsole_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("login")
                .and(predicate::str::contains("request"))
                .and(predicate::str::contains("devices"))
                .and(predicate::str::contains("session")),
        );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    netconsole_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("netconsole"));
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    netconsole_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    netconsole_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    let output = netconsole_cmd(home.path()).arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_invalid_base_url_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    netconsole_cmd(home.path())
        .args(["--base-url", "not a url", "devices", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("base_url"));
}

#[test]
fn test_double_prefixed_path_rejected() {
    let home = tempfile::tempdir().unwrap();
    netconsole_cmd(home.path())
        .args([
            "--base-url",
            "http://127.0.0.1:9/api",
            "--session",
            "memory",
            "request",
            "get",
            "/api/devices",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("base path"));
}

#[test]
fn test_unreachable_server_is_connection_error() {
    let home = tempfile::tempdir().unwrap();
    netconsole_cmd(home.path())
        .args([
            "--base-url",
            "http://127.0.0.1:9/api",
            "--timeout",
            "2",
            "devices",
            "list",
        ])
        .assert()
        .code(7);
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_defaults() {
    let home = tempfile::tempdir().unwrap();
    netconsole_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("http://localhost:8000/api")
                .and(predicate::str::contains("timeout = 30")),
        );
}

#[test]
fn test_config_show_honours_api_base_url() {
    let home = tempfile::tempdir().unwrap();
    netconsole_cmd(home.path())
        .env("API_BASE_URL", "https://netops.example.com/api")
        .args(["config", "show", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://netops.example.com/api"));
}

#[test]
fn test_config_set_then_show() {
    let home = tempfile::tempdir().unwrap();
    netconsole_cmd(home.path())
        .args(["config", "set", "refresh_policy", "single-flight"])
        .assert()
        .success();
    netconsole_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("single-flight"));
}

#[test]
fn test_config_rejects_unknown_output_format() {
    let home = tempfile::tempdir().unwrap();
    netconsole_cmd(home.path())
        .args(["config", "set", "output", "xml"])
        .assert()
        .code(2);
}

// ── Session flows against a mock backend ────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_login_persists_session() {
    let server = MockServer::start().await;
    let home = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "username": "admin", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "abc",
            "refreshToken": "r1",
            "user": { "id": "1", "username": "admin", "role": "admin" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    netconsole_cmd(home.path())
        .args(["--base-url", &format!("{}/api", server.uri())])
        .args(["login", "-u", "admin", "--password", "hunter2", "-o", "plain"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Logged in as admin"));

    let session = read_session(home.path()).unwrap();
    assert_eq!(session["authToken"], "abc");
    assert_eq!(session["refreshToken"], "r1");

    netconsole_cmd(home.path())
        .args(["--base-url", &format!("{}/api", server.uri())])
        .arg("logout")
        .assert()
        .success();
    assert!(read_session(home.path()).is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_list_refreshes_expired_token() {
    let server = MockServer::start().await;
    let home = tempfile::tempdir().unwrap();
    write_session(home.path(), "old", Some("r1"));

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "r1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "new" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .and(header("authorization", "Bearer new"))
        .and(query_param("site", "hq"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "dev-1", "name": "core-sw-01" },
            { "id": "dev-2", "name": "edge-rtr-01" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    netconsole_cmd(home.path())
        .args(["--base-url", &format!("{}/api", server.uri())])
        .args(["devices", "list", "--site", "hq", "-o", "plain"])
        .assert()
        .success()
        .stdout("dev-1\ndev-2\n");

    let session = read_session(home.path()).unwrap();
    assert_eq!(session["authToken"], "new");
    assert_eq!(session["refreshToken"], "r1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_configured_output_format_is_the_default() {
    let server = MockServer::start().await;
    let home = tempfile::tempdir().unwrap();
    write_session(home.path(), "abc", None);

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "dev-1", "name": "core-sw-01" }
        ])))
        .expect(2)
        .mount(&server)
        .await;

    netconsole_cmd(home.path())
        .args(["config", "set", "output", "json"])
        .assert()
        .success();

    let base_url = format!("{}/api", server.uri());
    let output = netconsole_cmd(home.path())
        .args(["--base-url", &base_url, "devices", "list"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listed[0]["id"], "dev-1");

    // An explicit flag still wins over the configured default.
    netconsole_cmd(home.path())
        .args(["--base-url", &base_url, "devices", "list", "-o", "plain"])
        .assert()
        .success()
        .stdout("dev-1\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_refresh_clears_session_and_exits_auth() {
    let server = MockServer::start().await;
    let home = tempfile::tempdir().unwrap();
    write_session(home.path(), "old", Some("r1"));

    Mock::given(method("GET"))
        .and(path("/api/devices"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "refresh token expired" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    netconsole_cmd(home.path())
        .args(["--base-url", &format!("{}/api", server.uri())])
        .args(["devices", "list"])
        .assert()
        .code(3)
        .stderr(
            predicate::str::contains("refresh token expired")
                .and(predicate::str::contains("netconsole login")),
        );

    assert!(read_session(home.path()).is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_raw_request_posts_body() {
    let server = MockServer::start().await;
    let home = tempfile::tempdir().unwrap();
    write_session(home.path(), "abc", None);

    Mock::given(method("POST"))
        .and(path("/api/devices"))
        .and(header("authorization", "Bearer abc"))
        .and(body_json(json!({ "name": "lab-ap-03" })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "id": "dev-3", "name": "lab-ap-03" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    netconsole_cmd(home.path())
        .args(["--base-url", &format!("{}/api", server.uri())])
        .args(["request", "POST", "/devices", "-d", r#"{"name":"lab-ap-03"}"#])
        .args(["-o", "json-compact"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""id":"dev-3""#));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_device_get_not_found() {
    let server = MockServer::start().await;
    let home = tempfile::tempdir().unwrap();
    write_session(home.path(), "abc", None);

    Mock::given(method("GET"))
        .and(path("/api/devices/dev-9"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    netconsole_cmd(home.path())
        .args(["--base-url", &format!("{}/api", server.uri())])
        .args(["devices", "get", "dev-9"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("dev-9"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_session_status_reports_refresh_token() {
    let server = MockServer::start().await;
    let home = tempfile::tempdir().unwrap();
    write_session(home.path(), "abc", Some("r1"));

    netconsole_cmd(home.path())
        .args(["--base-url", &format!("{}/api", server.uri())])
        .args(["session", "status", "-o", "json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains(r#""authenticated": true"#)
                .and(predicate::str::contains(r#""refresh_token": true"#)),
        );

    assert!(server.received_requests().await.unwrap().is_empty());
}
