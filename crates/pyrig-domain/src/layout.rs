use std::path::{Path, PathBuf};

use crate::component::ComponentKind;
use crate::env_descriptor::ENV_FILE_NAME;
use crate::platform::TargetPlatform;

pub const DEPS_DIR: &str = ".deps";

/// Deterministic paths under a project's `.deps` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
    windows: bool,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>, platform: &TargetPlatform) -> Self {
        Self {
            root: root.into(),
            windows: platform.is_windows(),
        }
    }

    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn deps_dir(&self) -> PathBuf {
        self.root.join(DEPS_DIR)
    }

    #[must_use]
    pub fn component_dir(&self, kind: ComponentKind) -> PathBuf {
        self.deps_dir().join(kind.dir_name())
    }

    #[must_use]
    pub fn env_file(&self) -> PathBuf {
        self.deps_dir().join(ENV_FILE_NAME)
    }

    #[must_use]
    pub fn python_root(&self) -> PathBuf {
        self.component_dir(ComponentKind::InterpreterRuntime)
    }

    /// Windows builds keep `python.exe` at the install root.
    #[must_use]
    pub fn python_bin_dir(&self) -> PathBuf {
        python_bin_dir(&self.python_root(), self.windows)
    }

    #[must_use]
    pub fn python_lib_dir(&self) -> PathBuf {
        self.python_root().join("lib")
    }

    #[must_use]
    pub fn python_pkgconfig_dir(&self) -> PathBuf {
        self.python_lib_dir().join("pkgconfig")
    }

    #[must_use]
    pub fn go_root(&self) -> PathBuf {
        self.component_dir(ComponentKind::LanguageRuntime)
    }

    #[must_use]
    pub fn go_bin_dir(&self) -> PathBuf {
        self.go_root().join("bin")
    }

    #[must_use]
    pub fn go_path(&self) -> PathBuf {
        self.go_root().join("packages")
    }

    #[must_use]
    pub fn go_cache_dir(&self) -> PathBuf {
        self.go_root().join("go-build")
    }

    #[must_use]
    pub fn go_binary(&self) -> PathBuf {
        self.go_bin_dir().join(if self.windows { "go.exe" } else { "go" })
    }

    #[must_use]
    pub fn mingw_root(&self) -> PathBuf {
        self.component_dir(ComponentKind::CompilerToolchain)
            .join("mingw64")
    }

    #[must_use]
    pub fn mingw_bin_dir(&self) -> PathBuf {
        self.mingw_root().join("bin")
    }

    #[must_use]
    pub fn tiny_pkg_config_dir(&self) -> PathBuf {
        self.component_dir(ComponentKind::BuildHelper)
    }

    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.windows
    }
}

/// Interpreter bin directory for an install rooted at `python_root`.
#[must_use]
pub fn python_bin_dir(python_root: &Path, windows: bool) -> PathBuf {
    if windows {
        python_root.to_path_buf()
    } else {
        python_root.join("bin")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_directories_live_under_deps() {
        let layout = ProjectLayout::new("/work/app", &TargetPlatform::new("linux", "amd64"));
        assert_eq!(layout.deps_dir(), PathBuf::from("/work/app/.deps"));
        assert_eq!(layout.python_root(), PathBuf::from("/work/app/.deps/python"));
        assert_eq!(layout.python_bin_dir(), PathBuf::from("/work/app/.deps/python/bin"));
        assert_eq!(
            layout.python_pkgconfig_dir(),
            PathBuf::from("/work/app/.deps/python/lib/pkgconfig")
        );
        assert_eq!(layout.go_path(), PathBuf::from("/work/app/.deps/go/packages"));
        assert_eq!(layout.go_cache_dir(), PathBuf::from("/work/app/.deps/go/go-build"));
        assert_eq!(layout.go_binary(), PathBuf::from("/work/app/.deps/go/bin/go"));
        assert_eq!(
            layout.tiny_pkg_config_dir(),
            PathBuf::from("/work/app/.deps/tiny-pkg-config")
        );
        assert_eq!(layout.env_file(), PathBuf::from("/work/app/.deps/env.txt"));
    }

    #[test]
    fn windows_layout_keeps_interpreter_at_root() {
        let layout = ProjectLayout::new("proj", &TargetPlatform::new("windows", "amd64"));
        assert_eq!(layout.python_bin_dir(), layout.python_root());
        assert!(layout.go_binary().ends_with("go.exe"));
        assert_eq!(
            layout.mingw_bin_dir(),
            PathBuf::from("proj").join(".deps").join("mingw").join("mingw64").join("bin")
        );
    }
}
