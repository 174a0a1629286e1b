//! End-to-end tests for `prestasi keygen`, `prestasi token`,
//! `prestasi check-config` and `prestasi serve` argument handling.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn prestasi() -> Command {
    cargo_bin_cmd!("prestasi")
}

/// Generate a keypair in a temp dir, returning paths to .secret and .pub.
fn keygen_in(tmp: &TempDir, name: &str) -> (PathBuf, PathBuf) {
    let prefix = tmp.path().join(name);
    prestasi()
        .args(["keygen", "--prefix", prefix.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated Ed25519 keypair"));
    let secret = tmp.path().join(format!("{}.secret", name));
    let pub_key = tmp.path().join(format!("{}.pub", name));
    assert!(secret.exists(), "{}.secret not created", name);
    assert!(pub_key.exists(), "{}.pub not created", name);
    (secret, pub_key)
}

fn write_config(tmp: &TempDir, public_key: Option<&str>) -> PathBuf {
    let auth = match public_key {
        Some(key) => format!("[auth]\npublic_key = \"{}\"\n", key.trim()),
        None => String::new(),
    };
    let content = format!(
        r#"
[server]
listen = "127.0.0.1:0"

{auth}
[[directory.users]]
id = "u-stu"
username = "siti"
role = "Mahasiswa"

[[directory.students]]
id = "s1"
user_id = "u-stu"
"#
    );
    let path = tmp.path().join("prestasi.toml");
    fs::write(&path, content).unwrap();
    path
}

// ── keygen / token ─────────────────────────────────────────────────

#[test]
fn keygen_then_token() {
    let tmp = TempDir::new().unwrap();
    let (secret, _) = keygen_in(&tmp, "issuer");

    let output = prestasi()
        .args([
            "token",
            "--key",
            secret.to_str().unwrap(),
            "--user-id",
            "u-adv",
            "--username",
            "budi",
            "--role",
            "Dosen Wali",
            "--perm",
            "achievement:verify",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let token = String::from_utf8(output).unwrap();
    assert_eq!(token.trim().split('.').count(), 2, "token: {token}");
}

#[test]
fn token_with_unknown_role_fails() {
    let tmp = TempDir::new().unwrap();
    let (secret, _) = keygen_in(&tmp, "issuer");
    prestasi()
        .args([
            "token",
            "--key",
            secret.to_str().unwrap(),
            "--user-id",
            "u1",
            "--username",
            "x",
            "--role",
            "Rektor",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown role"));
}

#[test]
fn token_with_missing_key_file_fails() {
    prestasi()
        .args([
            "token",
            "--key",
            "/nonexistent/issuer.secret",
            "--user-id",
            "u1",
            "--username",
            "x",
            "--role",
            "admin",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error reading secret key"));
}

// ── check-config ───────────────────────────────────────────────────

#[test]
fn check_config_accepts_valid_file() {
    let tmp = TempDir::new().unwrap();
    let (_, public) = keygen_in(&tmp, "issuer");
    let key = fs::read_to_string(public).unwrap();
    let config = write_config(&tmp, Some(&key));

    prestasi()
        .args(["check-config", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 users, 1 students, 0 lecturers"));
}

#[test]
fn check_config_without_key_fails() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(&tmp, None);
    prestasi()
        .args(["check-config", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no token verifying key configured"));
}

#[test]
fn check_config_reports_parse_errors() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("broken.toml");
    fs::write(&path, "[server\nlisten = 1").unwrap();
    prestasi()
        .args(["check-config", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error parsing config"));
}

// ── serve argument handling ────────────────────────────────────────

#[test]
fn serve_requires_both_tls_flags() {
    prestasi()
        .args(["serve", "--tls-cert", "cert.pem"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "--tls-cert and --tls-key must both be provided",
        ));
}

#[test]
fn serve_without_key_exits_before_binding() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(&tmp, None);
    prestasi()
        .env_remove("PRESTASI_PUBLIC_KEY")
        .args(["serve", "--config", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no token verifying key configured"));
}
