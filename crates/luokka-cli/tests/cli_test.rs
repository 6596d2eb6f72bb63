//! CLI integration tests using assert_cmd
//!
//! These run the real binary. No FreeIPA server is available here, so they
//! cover the argument surface and the failure paths before and at login.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::net::TcpListener;
use tempfile::TempDir;

/// Get a command instance for the luokka binary, isolated from the
/// caller's configuration
fn luokka_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("luokka").expect("Failed to find luokka binary");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("LUOKKA_PASSWORD")
        .env_remove("LUOKKA_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

/// A local URL nothing is listening on
fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let port = listener.local_addr().expect("Failed to get address").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

#[test]
fn test_help_command() {
    let home = TempDir::new().expect("Failed to create temp dir");
    luokka_cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "luokka - FreeIPA class and student administration",
        ));
}

#[test]
fn test_version_command() {
    let home = TempDir::new().expect("Failed to create temp dir");
    luokka_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("luokka"));
}

#[test]
fn test_class_help() {
    let home = TempDir::new().expect("Failed to create temp dir");
    luokka_cmd(&home)
        .args(["class", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Create a class group"))
        .stdout(predicate::str::contains("List all classes"));
}

#[test]
fn test_student_create_requires_names() {
    let home = TempDir::new().expect("Failed to create temp dir");
    luokka_cmd(&home)
        .args(["student", "create", "231054"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--given"));
}

#[test]
fn test_add_requires_students() {
    let home = TempDir::new().expect("Failed to create temp dir");
    luokka_cmd(&home)
        .args(["add", "s23ativ"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("STUDENTS"));
}

#[test]
fn test_invalid_config_file() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let config = home.path().join("config.toml");
    fs::write(&config, "log_cap = \"lots\"\n").expect("Failed to write config");

    luokka_cmd(&home)
        .arg("--config")
        .arg(&config)
        .args(["class", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_missing_password_without_terminal() {
    let home = TempDir::new().expect("Failed to create temp dir");
    luokka_cmd(&home)
        .args(["--url", &closed_url(), "class", "list"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("LUOKKA_PASSWORD is not set"));
}

#[test]
fn test_unreachable_server_is_reported() {
    let home = TempDir::new().expect("Failed to create temp dir");
    luokka_cmd(&home)
        .env("LUOKKA_PASSWORD", "secret")
        .args(["--url", &closed_url(), "class", "list"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: Directory unavailable"))
        .stderr(predicate::str::contains("Check that the FreeIPA server is reachable"));
}

#[test]
fn test_settings_file_supplies_url() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let config_dir = home.path().join(".config").join("luokka");
    fs::create_dir_all(&config_dir).expect("Failed to create config dir");
    fs::write(
        config_dir.join("config.toml"),
        format!("url = \"{}\"\nuser = \"opettaja\"\n", closed_url()),
    )
    .expect("Failed to write config");

    luokka_cmd(&home)
        .env("LUOKKA_PASSWORD", "secret")
        .args(["add", "s23ativ", "231054"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Directory unavailable"));
}
