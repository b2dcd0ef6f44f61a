//! End-to-end scans against a stub `aws` executable.
//!
//! Everything lives in a single test so the stub script is written once,
//! before any other thread in this binary spawns a process.

#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const FAKE_AWS: &str = r#"#!/bin/sh
case "$2" in
  get-rest-apis)
    echo '{"items":[{"id":"a1","name":"OrdersAPI"},{"id":"d1","name":"OrdersAPI-DEV"}]}' ;;
  get-resources)
    echo '{"items":[{"id":"r1","path":"/health","resourceMethods":{"GET":{}}},{"id":"r2","path":"/orders","resourceMethods":{"GET":{},"OPTIONS":{}}}]}' ;;
  get-resource)
    case "$6" in
      r1) echo '{"id":"r1","path":"/health","resourceMethods":{"GET":{}}}' ;;
      *) echo '{"id":"r2","path":"/orders","resourceMethods":{"GET":{},"OPTIONS":{}}}' ;;
    esac ;;
  get-method)
    case "$6" in
      r1) echo '{"httpMethod":"GET","authorizationType":"NONE","apiKeyRequired":false}' ;;
      *) echo '{"httpMethod":"GET","authorizationType":"CUSTOM","authorizerId":"au1","apiKeyRequired":false}' ;;
    esac ;;
  get-authorizer)
    echo '{"id":"au1","name":"AdminAuth","type":"TOKEN","identitySource":"method.request.header.Authorization"}' ;;
  get-integration)
    echo '{"type":"HTTP_PROXY","httpMethod":"GET","uri":"https://backend.internal/v1/orders"}' ;;
  get-caller-identity)
    echo '{"Arn":"arn:aws:iam::123456789012:user/auditor"}' ;;
  *)
    echo "unsupported: $*" >&2
    exit 1 ;;
esac
"#;

fn api_guardian() -> Command {
    assert_cmd::cargo::cargo_bin_cmd!("api-guardian")
}

fn write_fake_aws(dir: &Path) -> PathBuf {
    let path = dir.join("fake-aws");
    std::fs::write(&path, FAKE_AWS).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn files_starting_with(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with(prefix))
        })
        .collect()
}

#[test]
fn scan_with_stub_aws_cli() {
    let dir = tempfile::tempdir().unwrap();
    let aws = write_fake_aws(dir.path());
    std::fs::write(
        dir.path().join("api-guardian.toml"),
        format!("[aws]\nbinary = \"{}\"\n", aws.display()),
    )
    .unwrap();

    // check-tools resolves the caller identity.
    api_guardian()
        .current_dir(dir.path())
        .arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("arn:aws:iam::123456789012:user/auditor"));

    // list-apis shows every API, marking excluded ones.
    api_guardian()
        .current_dir(dir.path())
        .env("NO_COLOR", "1")
        .arg("list-apis")
        .assert()
        .success()
        .stdout(predicate::str::contains("OrdersAPI-DEV (excluded)"))
        .stdout(predicate::str::contains("Total: 2 APIs"));

    // Strict scan without a whitelist fails on the open /health endpoint.
    let first = dir.path().join("first");
    api_guardian()
        .current_dir(dir.path())
        .args(["scan", "--strict", "--format", "json", "--output-dir"])
        .arg(&first)
        .assert()
        .code(1);

    let csv_files = files_starting_with(&first, "security_audit_report_");
    assert_eq!(csv_files.len(), 1);
    let csv = std::fs::read_to_string(&csv_files[0]).unwrap();
    let mut rows: Vec<&str> = csv.lines().skip(1).collect();
    rows.sort();
    assert_eq!(
        rows,
        [
            "OrdersAPI,GET,/health,NO,NONE,NONE,NO,NO,/v1/orders",
            "OrdersAPI,GET,/orders,YES,CUSTOM,AdminAuth,NO,NO,/v1/orders",
        ]
    );
    assert_eq!(files_starting_with(&first, "api_summary_").len(), 1);
    assert_eq!(files_starting_with(&first, "security_report_").len(), 1);

    // Whitelisting /health makes the strict scan pass.
    std::fs::write(
        dir.path().join("whitelist_PUBLIC.json"),
        r#"{"whitelist": {"OrdersAPI": [{"method": "GET", "path": "/health"}]}}"#,
    )
    .unwrap();
    let second = dir.path().join("second");
    let output = api_guardian()
        .current_dir(dir.path())
        .args(["scan", "--strict", "--format", "json", "--api", "OrdersAPI", "--output-dir"])
        .arg(&second)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["summary"]["total_apis"], 1);
    assert_eq!(report["summary"]["total_protected"], 1);
    assert_eq!(report["summary"]["total_unprotected"], 1);
    assert_eq!(report["summary"]["unexpected_unprotected"], 0);
    assert_eq!(report["summary"]["total_methods_filtered"], 1);
    assert_eq!(files_starting_with(&second, "OrdersAPI_report_").len(), 1);
}
