use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An OS/architecture pair in the Go token vocabulary (`linux`, `darwin`,
/// `windows` / `amd64`, `arm64`, `386`).
///
/// Tokens are kept as strings so that callers can request any target; the
/// resolver decides what is supported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetPlatform {
    pub os: String,
    pub arch: String,
}

impl TargetPlatform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this binary was compiled for.
    #[must_use]
    pub fn host() -> Self {
        Self::new(os_token(env::consts::OS), arch_token(env::consts::ARCH))
    }

    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    #[must_use]
    pub fn is_darwin(&self) -> bool {
        self.os == "darwin"
    }

    /// Suffix appended to executables on this platform.
    #[must_use]
    pub fn exe_suffix(&self) -> &'static str {
        if self.is_windows() {
            ".exe"
        } else {
            ""
        }
    }

    /// Separator between entries of `PATH`-like variables.
    #[must_use]
    pub fn path_list_separator(&self) -> char {
        if self.is_windows() {
            ';'
        } else {
            ':'
        }
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

fn os_token(rust_os: &str) -> String {
    match rust_os {
        "macos" => "darwin".to_string(),
        other => other.to_string(),
    }
}

fn arch_token(rust_arch: &str) -> String {
    match rust_arch {
        "x86_64" => "amd64".to_string(),
        "aarch64" => "arm64".to_string(),
        "x86" => "386".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_targets_map_to_go_tokens() {
        assert_eq!(os_token("macos"), "darwin");
        assert_eq!(os_token("linux"), "linux");
        assert_eq!(arch_token("x86_64"), "amd64");
        assert_eq!(arch_token("aarch64"), "arm64");
        assert_eq!(arch_token("x86"), "386");
        assert_eq!(arch_token("riscv64"), "riscv64");
    }

    #[test]
    fn windows_specific_conventions() {
        let windows = TargetPlatform::new("windows", "amd64");
        assert_eq!(windows.exe_suffix(), ".exe");
        assert_eq!(windows.path_list_separator(), ';');
        let linux = TargetPlatform::new("linux", "amd64");
        assert_eq!(linux.exe_suffix(), "");
        assert_eq!(linux.path_list_separator(), ':');
        assert_eq!(linux.to_string(), "linux/amd64");
    }
}
