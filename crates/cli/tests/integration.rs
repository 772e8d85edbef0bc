//! Integration tests for the ossdu CLI
//!
//! These tests require a running S3-compatible server and an existing
//! bucket to scan.
//!
//! Run with:
//! ```bash
//! docker run -d --name minio -p 9000:9000 \
//!     -e MINIO_ROOT_USER=accesskey \
//!     -e MINIO_ROOT_PASSWORD=secretkey \
//!     minio/minio server /data
//!
//! export TEST_S3_ENDPOINT=http://localhost:9000
//! export TEST_S3_ACCESS_KEY=accesskey
//! export TEST_S3_SECRET_KEY=secretkey
//! export TEST_S3_BUCKET=ossdu-it
//! cargo test --features integration
//! ```

#![cfg(feature = "integration")]

use std::process::{Command, Output};

use tempfile::TempDir;

/// Path to the ossdu binary built for this test run
fn ossdu_binary() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_ossdu"))
}

/// Run ossdu against an isolated config directory
fn run_ossdu(args: &[&str], config_dir: &std::path::Path) -> Output {
    Command::new(ossdu_binary())
        .args(args)
        .env("OSSDU_CONFIG_DIR", config_dir)
        .output()
        .expect("Failed to execute ossdu")
}

/// S3 test configuration from the environment
struct TestServer {
    endpoint: String,
    access_key: String,
    secret_key: String,
    bucket: String,
}

fn test_server() -> Option<TestServer> {
    Some(TestServer {
        endpoint: std::env::var("TEST_S3_ENDPOINT").ok()?,
        access_key: std::env::var("TEST_S3_ACCESS_KEY").ok()?,
        secret_key: std::env::var("TEST_S3_SECRET_KEY").ok()?,
        bucket: std::env::var("TEST_S3_BUCKET").ok()?,
    })
}

/// Configure a `test` profile in a fresh config directory
fn setup_profile() -> Option<(TempDir, TestServer)> {
    let server = test_server()?;
    let config_dir = tempfile::tempdir().ok()?;

    let output = run_ossdu(
        &[
            "profile",
            "set",
            "test",
            &server.endpoint,
            &server.access_key,
            &server.secret_key,
        ],
        config_dir.path(),
    );

    if !output.status.success() {
        eprintln!(
            "Failed to set profile: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        return None;
    }

    Some((config_dir, server))
}

fn parse_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

mod profile_operations {
    use super::*;

    #[test]
    fn test_profile_set_list_remove() {
        let config_dir = tempfile::tempdir().unwrap();

        let output = run_ossdu(
            &["profile", "set", "local", "http://localhost:9000", "ak", "sk"],
            config_dir.path(),
        );
        assert!(output.status.success());

        let output = run_ossdu(&["--json", "profile", "list"], config_dir.path());
        assert!(output.status.success());
        let json = parse_json(&output);
        assert_eq!(json["profiles"][0]["name"], "local");
        assert!(!String::from_utf8_lossy(&output.stdout).contains("sk"));

        let output = run_ossdu(&["profile", "remove", "local"], config_dir.path());
        assert!(output.status.success());

        let output = run_ossdu(&["profile", "remove", "local"], config_dir.path());
        assert_eq!(output.status.code(), Some(5));
    }
}

mod usage_errors {
    use super::*;

    #[test]
    fn test_unknown_profile_exits_not_found() {
        let config_dir = tempfile::tempdir().unwrap();
        let output = run_ossdu(&["du", "nowhere/bucket"], config_dir.path());
        assert_eq!(output.status.code(), Some(5));
    }

    #[test]
    fn test_bad_payer_exits_usage() {
        let config_dir = tempfile::tempdir().unwrap();
        let output = run_ossdu(
            &["du", "local/bucket", "--payer", "someone"],
            config_dir.path(),
        );
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_bad_block_size_wins_over_unknown_profile() {
        let config_dir = tempfile::tempdir().unwrap();
        let output = run_ossdu(&["du", "nowhere/bucket", "-B", "PB"], config_dir.path());
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_bad_block_size_exits_usage() {
        let Some((config_dir, server)) = setup_profile() else {
            eprintln!("Skipping: S3 test config not available");
            return;
        };
        let path = format!("test/{}", server.bucket);
        let output = run_ossdu(&["du", &path, "-B", "PB"], config_dir.path());
        assert_eq!(output.status.code(), Some(2));
    }
}

mod usage_operations {
    use super::*;

    #[test]
    fn test_du_json() {
        let Some((config_dir, server)) = setup_profile() else {
            eprintln!("Skipping: S3 test config not available");
            return;
        };

        let path = format!("test/{}", server.bucket);
        let output = run_ossdu(&["--json", "du", &path], config_dir.path());
        assert!(
            output.status.success(),
            "du failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );

        let json = parse_json(&output);
        let totals = &json["totals"];
        let object_size = totals["object_sum_size"].as_i64().unwrap();
        let part_size = totals["part_sum_size"].as_i64().unwrap();
        assert_eq!(json["total_size_bytes"].as_i64(), Some(object_size + part_size));
    }

    #[test]
    fn test_du_all_versions_human() {
        let Some((config_dir, server)) = setup_profile() else {
            eprintln!("Skipping: S3 test config not available");
            return;
        };

        let path = format!("test/{}", server.bucket);
        let output = run_ossdu(
            &["--no-progress", "du", &path, "--all-versions", "-B", "KB"],
            config_dir.path(),
        );
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("total du size(KB): "));
    }

    #[test]
    fn test_parts_json() {
        let Some((config_dir, server)) = setup_profile() else {
            eprintln!("Skipping: S3 test config not available");
            return;
        };

        let path = format!("test/{}", server.bucket);
        let output = run_ossdu(
            &["--json", "parts", &path, "--workers", "2"],
            config_dir.path(),
        );
        assert!(output.status.success());

        let json = parse_json(&output);
        let rows = json["parts"].as_array().unwrap();
        assert_eq!(json["total_part_count"].as_u64(), Some(rows.len() as u64));
    }

    #[test]
    fn test_missing_bucket_exits_not_found() {
        let Some((config_dir, _server)) = setup_profile() else {
            eprintln!("Skipping: S3 test config not available");
            return;
        };

        let output = run_ossdu(
            &["du", "test/ossdu-bucket-that-does-not-exist"],
            config_dir.path(),
        );
        assert_eq!(output.status.code(), Some(5));
    }
}
