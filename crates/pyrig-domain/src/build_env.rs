use std::ffi::OsStr;
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::layout::ProjectLayout;

/// Environment for child processes that build against the provisioned
/// toolchain. Nothing here touches the current process environment; the
/// map is handed to `Command::envs` by the caller.
///
/// `layout` should be rooted at an absolute project path so the values stay
/// valid when the child changes directory.
#[must_use]
pub fn compose_build_env(
    layout: &ProjectLayout,
    inherited_path: Option<&OsStr>,
) -> IndexMap<String, String> {
    let separator = if layout.is_windows() { ";" } else { ":" };
    let mut entries: Vec<PathBuf> = vec![layout.tiny_pkg_config_dir()];
    if layout.is_windows() {
        entries.push(layout.mingw_bin_dir());
    }
    entries.push(layout.python_bin_dir());
    entries.push(layout.go_bin_dir());

    let mut path = entries
        .iter()
        .map(|entry| entry.display().to_string())
        .collect::<Vec<_>>()
        .join(separator);
    if let Some(inherited) = inherited_path.filter(|value| !value.is_empty()) {
        path.push_str(separator);
        path.push_str(&inherited.to_string_lossy());
    }

    let mut env = IndexMap::new();
    env.insert("PATH".to_string(), path);
    env.insert("GOPATH".to_string(), layout.go_path().display().to_string());
    env.insert("GOROOT".to_string(), layout.go_root().display().to_string());
    env.insert(
        "GOCACHE".to_string(),
        layout.go_cache_dir().display().to_string(),
    );
    env.insert(
        "PKG_CONFIG_PATH".to_string(),
        layout.python_pkgconfig_dir().display().to_string(),
    );
    env.insert("CGO_ENABLED".to_string(), "1".to_string());
    env
}
