use assert_cmd::cargo::cargo_bin_cmd;

mod common;

use common::{parse_json, stdout};

#[test]
fn resolve_prints_bare_url() {
    let temp = tempfile::tempdir().expect("tempdir");
    let assert = cargo_bin_cmd!("pyrig")
        .env("PYRIG_CACHE_PATH", temp.path())
        .args(["resolve", "go", "--os", "linux", "--arch", "amd64"])
        .assert()
        .success();
    assert_eq!(
        stdout(&assert).trim(),
        "https://go.dev/dl/go1.23.3.linux-amd64.tar.gz"
    );
}

#[test]
fn resolve_json_reports_cache_slot() {
    let temp = tempfile::tempdir().expect("tempdir");
    let assert = cargo_bin_cmd!("pyrig")
        .env("PYRIG_CACHE_PATH", temp.path())
        .args([
            "--json",
            "resolve",
            "python",
            "--os",
            "windows",
            "--arch",
            "amd64",
            "--free-threaded",
            "--debug",
        ])
        .assert()
        .success();
    let payload = parse_json(&assert);
    let details = &payload["details"];
    assert_eq!(details["component"], "interpreter-runtime");
    assert_eq!(details["format"], "tar.zst");
    assert_eq!(details["cached"], false);
    assert_eq!(
        details["file_name"],
        "cpython-3.13.0+20241016-x86_64-pc-windows-msvc-shared-freethreaded+pgo-full.tar.zst"
    );
    let cache_path = details["cache_path"].as_str().expect("cache path");
    assert!(cache_path.starts_with(&temp.path().display().to_string()));
}

#[test]
fn resolve_unsupported_target_exits_one() {
    let temp = tempfile::tempdir().expect("tempdir");
    let assert = cargo_bin_cmd!("pyrig")
        .env("PYRIG_CACHE_PATH", temp.path())
        .args(["--json", "resolve", "mingw", "--os", "linux", "--arch", "amd64"])
        .assert()
        .code(1);
    let payload = parse_json(&assert);
    assert_eq!(payload["status"], "user-error");
    assert_eq!(payload["details"]["reason"], "unsupported_platform");
}
