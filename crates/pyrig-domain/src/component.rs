use std::fmt;

use serde::{Deserialize, Serialize};

use crate::platform::TargetPlatform;

pub const DEFAULT_GO_VERSION: &str = "1.23.3";
pub const DEFAULT_TINY_PKG_CONFIG_VERSION: &str = "v0.2.0";
pub const DEFAULT_PYTHON_VERSION: &str = "3.13.0";
pub const DEFAULT_PYTHON_BUILD_DATE: &str = "20241016";
pub const MINGW_VERSION: &str = "14.2.0";

/// The installable units, in provisioning order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    /// `tiny-pkg-config`, installed as `pkg-config`.
    BuildHelper,
    /// winlibs MinGW-w64 (Windows only).
    CompilerToolchain,
    /// The Go distribution.
    LanguageRuntime,
    /// python-build-standalone CPython.
    InterpreterRuntime,
}

impl ComponentKind {
    /// Fixed directory name under `.deps`; never derived from a version.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            ComponentKind::BuildHelper => "tiny-pkg-config",
            ComponentKind::CompilerToolchain => "mingw",
            ComponentKind::LanguageRuntime => "go",
            ComponentKind::InterpreterRuntime => "python",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ComponentKind::BuildHelper => "tiny-pkg-config",
            ComponentKind::CompilerToolchain => "mingw",
            ComponentKind::LanguageRuntime => "go",
            ComponentKind::InterpreterRuntime => "cpython",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantFlags {
    pub debug: bool,
    pub free_threaded: bool,
    pub shared: bool,
}

/// Versions selected for one provisioning run. Values are opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentVersions {
    pub go: String,
    pub python: String,
    pub python_build_date: String,
    pub tiny_pkg_config: String,
}

impl Default for ComponentVersions {
    fn default() -> Self {
        Self {
            go: DEFAULT_GO_VERSION.to_string(),
            python: DEFAULT_PYTHON_VERSION.to_string(),
            python_build_date: DEFAULT_PYTHON_BUILD_DATE.to_string(),
            tiny_pkg_config: DEFAULT_TINY_PKG_CONFIG_VERSION.to_string(),
        }
    }
}

/// Identifies one installable artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub kind: ComponentKind,
    pub version: String,
    pub build_date: Option<String>,
    pub platform: TargetPlatform,
    pub variant: VariantFlags,
}

impl ComponentDescriptor {
    pub fn new(kind: ComponentKind, version: impl Into<String>, platform: TargetPlatform) -> Self {
        Self {
            kind,
            version: version.into(),
            build_date: None,
            platform,
            variant: VariantFlags::default(),
        }
    }

    #[must_use]
    pub fn with_build_date(mut self, date: impl Into<String>) -> Self {
        self.build_date = Some(date.into());
        self
    }

    #[must_use]
    pub fn with_variant(mut self, variant: VariantFlags) -> Self {
        self.variant = variant;
        self
    }

    /// Descriptors for every component a run on `platform` needs, in order.
    #[must_use]
    pub fn plan_for(
        versions: &ComponentVersions,
        variant: VariantFlags,
        platform: &TargetPlatform,
    ) -> Vec<ComponentDescriptor> {
        let mut plan = vec![ComponentDescriptor::new(
            ComponentKind::BuildHelper,
            &versions.tiny_pkg_config,
            platform.clone(),
        )];
        if platform.is_windows() {
            plan.push(ComponentDescriptor::new(
                ComponentKind::CompilerToolchain,
                MINGW_VERSION,
                platform.clone(),
            ));
        }
        plan.push(ComponentDescriptor::new(
            ComponentKind::LanguageRuntime,
            &versions.go,
            platform.clone(),
        ));
        plan.push(
            ComponentDescriptor::new(
                ComponentKind::InterpreterRuntime,
                &versions.python,
                platform.clone(),
            )
            .with_build_date(&versions.python_build_date)
            .with_variant(variant),
        );
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_adds_compiler_only_on_windows() {
        let versions = ComponentVersions::default();
        let linux = ComponentDescriptor::plan_for(
            &versions,
            VariantFlags::default(),
            &TargetPlatform::new("linux", "amd64"),
        );
        let kinds: Vec<_> = linux.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ComponentKind::BuildHelper,
                ComponentKind::LanguageRuntime,
                ComponentKind::InterpreterRuntime
            ]
        );

        let windows = ComponentDescriptor::plan_for(
            &versions,
            VariantFlags::default(),
            &TargetPlatform::new("windows", "amd64"),
        );
        assert_eq!(windows[1].kind, ComponentKind::CompilerToolchain);
        assert_eq!(windows.len(), 4);
    }

    #[test]
    fn interpreter_descriptor_carries_build_date_and_variant() {
        let variant = VariantFlags {
            debug: true,
            free_threaded: true,
            shared: false,
        };
        let plan = ComponentDescriptor::plan_for(
            &ComponentVersions::default(),
            variant,
            &TargetPlatform::new("darwin", "arm64"),
        );
        let python = plan.last().expect("interpreter descriptor");
        assert_eq!(python.build_date.as_deref(), Some(DEFAULT_PYTHON_BUILD_DATE));
        assert_eq!(python.variant, variant);
        assert_eq!(plan[0].variant, VariantFlags::default());
    }
}
