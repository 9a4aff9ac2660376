//! CLI integration tests using assert_cmd
//!
//! These tests verify the CLI commands work correctly end-to-end.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Get a command instance for the eaudit binary with an isolated home
fn eaudit_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("eaudit").expect("Failed to find eaudit binary");
    cmd.env("HOME", home.path())
        .env_remove("EAUDIT_URL")
        .env_remove("EAUDIT_CLIENT_ID")
        .env_remove("EAUDIT_CLIENT_SECRET")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(home: &TempDir, content: &str) {
    let dir = home.path().join(".eaudit");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), content).unwrap();
}

async fn mock_server_with_one_attribute() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "cli-token",
            "token_type": "Bearer",
            "expires_in": 1199
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/JSSResource/computerextensionattributes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "computer_extension_attributes": [{"id": 1, "name": "Foo", "enabled": true}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/JSSResource/computerextensionattributes/id/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<computer_extension_attribute><id>1</id><name>Foo</name>\
             <enabled>true</enabled></computer_extension_attribute>",
        ))
        .mount(&server)
        .await;
    server
}

#[test]
fn test_help_command() {
    let home = TempDir::new().unwrap();
    eaudit_cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Find extension attributes that are safe to remove",
        ));
}

#[test]
fn test_version_command() {
    let home = TempDir::new().unwrap();
    eaudit_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("eaudit"));
}

#[test]
fn test_scan_help() {
    let home = TempDir::new().unwrap();
    eaudit_cmd(&home)
        .args(["scan", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--include-mobile"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_scan_without_url_fails_before_network() {
    let home = TempDir::new().unwrap();
    eaudit_cmd(&home)
        .arg("scan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing server URL"));
}

#[test]
fn test_scan_without_secret_fails() {
    let home = TempDir::new().unwrap();
    eaudit_cmd(&home)
        .args(["scan", "--url", "https://example.invalid", "--client-id", "reader"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("EAUDIT_CLIENT_SECRET"));
}

#[test]
fn test_config_path_defaults_to_home() {
    let home = TempDir::new().unwrap();
    let expected = home.path().join(".eaudit").join("config.toml");
    eaudit_cmd(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.display().to_string()));
}

#[test]
fn test_config_show_redacts_secret() {
    let home = TempDir::new().unwrap();
    write_config(
        &home,
        "url = \"https://example.jamfcloud.com\"\nclient_id = \"reader\"\nclient_secret = \"hunter2\"\n\n[scan]\nbatch_size = 5\n",
    );

    eaudit_cmd(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://example.jamfcloud.com"))
        .stdout(predicate::str::contains("Batch size:      5"))
        .stdout(predicate::str::contains("********"))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_url_flag_overrides_config_file() {
    let home = TempDir::new().unwrap();
    write_config(&home, "url = \"https://file.example\"\n");

    eaudit_cmd(&home)
        .args(["config", "show", "--url", "https://flag.example"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://flag.example"))
        .stdout(predicate::str::contains("https://file.example").not());
}

#[test]
fn test_invalid_config_is_reported() {
    let home = TempDir::new().unwrap();
    write_config(&home, "url = [\n");

    eaudit_cmd(&home)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config"));
}

#[test]
fn test_explicit_missing_config_fails() {
    let home = TempDir::new().unwrap();
    eaudit_cmd(&home)
        .args(["--config", "/nonexistent/eaudit.toml", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("file not found"));
}

#[test]
fn test_delete_requires_id() {
    let home = TempDir::new().unwrap();
    eaudit_cmd(&home).arg("delete").assert().failure();
}

#[test]
fn test_delete_cancelled_without_confirmation() {
    let home = TempDir::new().unwrap();
    eaudit_cmd(&home)
        .args(["delete", "7", "--url", "https://example.invalid"])
        .args(["--client-id", "reader", "--client-secret", "s3cret"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled."));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scan_json_against_mock_server() {
    let server = mock_server_with_one_attribute().await;
    let home = TempDir::new().unwrap();
    let mut cmd = eaudit_cmd(&home);
    cmd.args(["scan", "--json"])
        .env("EAUDIT_URL", server.uri())
        .env("EAUDIT_CLIENT_ID", "reader")
        .env("EAUDIT_CLIENT_SECRET", "s3cret");

    let assert = tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .unwrap();

    // Scanner lists are not mocked, so the report carries a warning
    assert
        .success()
        .stdout(predicate::str::contains("\"name\": \"Foo\""))
        .stdout(predicate::str::contains("\"status\": \"safe\""))
        .stderr(predicate::str::contains("Dependency scan incomplete"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scan_table_against_mock_server() {
    let server = mock_server_with_one_attribute().await;
    let home = TempDir::new().unwrap();
    let mut cmd = eaudit_cmd(&home);
    cmd.args(["scan", "--url", server.uri().as_str()])
        .args(["--client-id", "reader", "--client-secret", "s3cret"]);

    let assert = tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("safe to remove"))
        .stdout(predicate::str::contains("Safe to remove:  1"))
        .stderr(predicate::str::contains("Loading extension attributes..."));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_forced_delete_calls_api() {
    let server = mock_server_with_one_attribute().await;
    Mock::given(method("DELETE"))
        .and(path("/JSSResource/mobiledeviceextensionattributes/id/4"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let mut cmd = eaudit_cmd(&home);
    cmd.args(["delete", "4", "--mobile", "--force", "--url", server.uri().as_str()])
        .args(["--client-id", "reader", "--client-secret", "s3cret"]);

    let assert = tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains(
            "Deleted mobile device extension attribute 4",
        ));
}
