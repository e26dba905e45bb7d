#![allow(dead_code)]

use std::{env, fs, path::Path};

use assert_cmd::assert::Assert;
use serde_json::Value;

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}

pub fn stdout(assert: &Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout")
}

pub fn require_online(what: &str) -> bool {
    if let Some("1") = env::var("PYRIG_ONLINE").ok().as_deref() {
        true
    } else {
        eprintln!("skipping {what} (PYRIG_ONLINE!=1)");
        false
    }
}

/// Write a `.deps/env.txt` the way `pyrig install` leaves it.
pub fn write_env_file(project: &Path, lines: &[(&str, &str)]) {
    let deps = project.join(".deps");
    fs::create_dir_all(&deps).expect("create .deps");
    let contents: String = lines
        .iter()
        .map(|(key, value)| format!("{key}={value}\n"))
        .collect();
    fs::write(deps.join("env.txt"), contents).expect("write env.txt");
}
