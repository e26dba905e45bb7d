//! Download URL resolution.
//!
//! Every function here is pure: identical descriptors always produce the
//! byte-identical URL, which the download cache relies on for its keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::component::{ComponentDescriptor, ComponentKind};

const PYTHON_RELEASES: &str =
    "https://github.com/indygreg/python-build-standalone/releases/download";
const GO_DOWNLOADS: &str = "https://go.dev/dl";
const TINY_PKG_CONFIG_RELEASES: &str =
    "https://github.com/cpunion/tiny-pkg-config/releases/download";
const MINGW_URL: &str = "https://github.com/brechtsanders/winlibs_mingw/releases/download/14.2.0posix-19.1.1-12.0.0-ucrt-r2/winlibs-x86_64-posix-seh-gcc-14.2.0-llvm-19.1.1-mingw-w64ucrt-12.0.0-r2.zip";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("{component} is not available for {os}/{arch}")]
    Unsupported {
        component: ComponentKind,
        os: String,
        arch: String,
    },
    #[error("{component} requires a build date")]
    MissingBuildDate { component: ComponentKind },
}

impl ResolveError {
    fn unsupported(descriptor: &ComponentDescriptor) -> Self {
        Self::Unsupported {
            component: descriptor.kind,
            os: descriptor.platform.os.clone(),
            arch: descriptor.platform.arch.clone(),
        }
    }
}

/// Archive container formats, selected by file extension only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    TarZst,
}

impl ArchiveFormat {
    /// Detect the format from a file name. Unknown extensions yield `None`.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".tar.zst") {
            Some(Self::TarZst)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => ".zip",
            Self::TarGz => ".tar.gz",
            Self::TarZst => ".tar.zst",
        }
    }

    /// Go and tiny-pkg-config archives wrap everything in a redundant root
    /// folder; the zstd-tar interpreter archives use an explicit prefix.
    #[must_use]
    pub fn has_root_alias(self) -> bool {
        matches!(self, Self::Zip | Self::TarGz)
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
            Self::TarZst => "tar.zst",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedArtifact {
    pub url: String,
    pub file_name: String,
    pub format: ArchiveFormat,
}

impl ResolvedArtifact {
    fn new(url: String, format: ArchiveFormat) -> Self {
        let file_name = url.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            url,
            file_name,
            format,
        }
    }
}

/// Map a component descriptor to the artifact to download.
///
/// # Errors
/// Returns [`ResolveError::Unsupported`] for OS or architecture tokens the
/// upstream project does not publish, and
/// [`ResolveError::MissingBuildDate`] for interpreter descriptors without a
/// release date.
pub fn resolve(descriptor: &ComponentDescriptor) -> Result<ResolvedArtifact, ResolveError> {
    match descriptor.kind {
        ComponentKind::InterpreterRuntime => python_artifact(descriptor),
        ComponentKind::LanguageRuntime => go_artifact(descriptor),
        ComponentKind::BuildHelper => tiny_pkg_config_artifact(descriptor),
        ComponentKind::CompilerToolchain => mingw_artifact(descriptor),
    }
}

fn python_artifact(descriptor: &ComponentDescriptor) -> Result<ResolvedArtifact, ResolveError> {
    let date = descriptor
        .build_date
        .as_deref()
        .ok_or(ResolveError::MissingBuildDate {
            component: descriptor.kind,
        })?;
    let arch = match descriptor.platform.arch.as_str() {
        "amd64" => "x86_64",
        "arm64" => "aarch64",
        "386" => "i686",
        _ => return Err(ResolveError::unsupported(descriptor)),
    };
    let variant = descriptor.variant;
    let (triple, shared, build) = match descriptor.platform.os.as_str() {
        "darwin" | "linux" => {
            let triple = if descriptor.platform.is_darwin() {
                "apple-darwin"
            } else {
                "unknown-linux-gnu"
            };
            let build = match (variant.free_threaded, variant.debug) {
                (true, true) => "freethreaded+debug",
                (true, false) => "freethreaded+pgo",
                (false, true) => "debug",
                (false, false) => "pgo",
            };
            (triple, variant.shared, build)
        }
        // Only shared pgo builds are published for Windows.
        "windows" => {
            let build = if variant.free_threaded {
                "freethreaded+pgo"
            } else {
                "pgo"
            };
            ("pc-windows-msvc", true, build)
        }
        _ => return Err(ResolveError::unsupported(descriptor)),
    };
    let shared = if shared { "-shared" } else { "" };
    let version = &descriptor.version;
    let url = format!(
        "{PYTHON_RELEASES}/{date}/cpython-{version}+{date}-{arch}-{triple}{shared}-{build}-full.tar.zst"
    );
    Ok(ResolvedArtifact::new(url, ArchiveFormat::TarZst))
}

fn go_artifact(descriptor: &ComponentDescriptor) -> Result<ResolvedArtifact, ResolveError> {
    let os = descriptor.platform.os.as_str();
    let format = match os {
        "windows" => ArchiveFormat::Zip,
        "darwin" | "linux" => ArchiveFormat::TarGz,
        _ => return Err(ResolveError::unsupported(descriptor)),
    };
    let arch = descriptor.platform.arch.as_str();
    if !matches!(arch, "amd64" | "386" | "arm64") {
        return Err(ResolveError::unsupported(descriptor));
    }
    let url = format!(
        "{GO_DOWNLOADS}/go{}.{os}-{arch}{}",
        descriptor.version,
        format.extension()
    );
    Ok(ResolvedArtifact::new(url, format))
}

fn tiny_pkg_config_artifact(
    descriptor: &ComponentDescriptor,
) -> Result<ResolvedArtifact, ResolveError> {
    let (os, format) = match descriptor.platform.os.as_str() {
        "linux" => ("Linux", ArchiveFormat::TarGz),
        "darwin" => ("Darwin", ArchiveFormat::TarGz),
        "windows" => ("Windows", ArchiveFormat::Zip),
        _ => return Err(ResolveError::unsupported(descriptor)),
    };
    let arch = match descriptor.platform.arch.as_str() {
        "amd64" => "x86_64",
        "arm64" => "arm64",
        "386" => "386",
        _ => return Err(ResolveError::unsupported(descriptor)),
    };
    let url = format!(
        "{TINY_PKG_CONFIG_RELEASES}/{version}/tiny-pkg-config_{os}_{arch}{ext}",
        version = descriptor.version,
        ext = format.extension()
    );
    Ok(ResolvedArtifact::new(url, format))
}

fn mingw_artifact(descriptor: &ComponentDescriptor) -> Result<ResolvedArtifact, ResolveError> {
    if descriptor.platform.os != "windows" || descriptor.platform.arch != "amd64" {
        return Err(ResolveError::unsupported(descriptor));
    }
    Ok(ResolvedArtifact::new(MINGW_URL.to_string(), ArchiveFormat::Zip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::VariantFlags;
    use crate::platform::TargetPlatform;

    fn python(os: &str, arch: &str, free_threaded: bool, debug: bool) -> ComponentDescriptor {
        ComponentDescriptor::new(
            ComponentKind::InterpreterRuntime,
            "3.13.0",
            TargetPlatform::new(os, arch),
        )
        .with_build_date("20241016")
        .with_variant(VariantFlags {
            debug,
            free_threaded,
            shared: false,
        })
    }

    #[test]
    fn python_file_names_follow_release_naming() {
        let cases = [
            (
                ("darwin", "arm64", true, true),
                "cpython-3.13.0+20241016-aarch64-apple-darwin-freethreaded+debug-full.tar.zst",
            ),
            (
                ("darwin", "amd64", true, false),
                "cpython-3.13.0+20241016-x86_64-apple-darwin-freethreaded+pgo-full.tar.zst",
            ),
            (
                ("darwin", "amd64", false, true),
                "cpython-3.13.0+20241016-x86_64-apple-darwin-debug-full.tar.zst",
            ),
            (
                ("darwin", "amd64", false, false),
                "cpython-3.13.0+20241016-x86_64-apple-darwin-pgo-full.tar.zst",
            ),
            (
                ("linux", "amd64", true, true),
                "cpython-3.13.0+20241016-x86_64-unknown-linux-gnu-freethreaded+debug-full.tar.zst",
            ),
            (
                ("windows", "amd64", true, false),
                "cpython-3.13.0+20241016-x86_64-pc-windows-msvc-shared-freethreaded+pgo-full.tar.zst",
            ),
            (
                ("windows", "386", true, false),
                "cpython-3.13.0+20241016-i686-pc-windows-msvc-shared-freethreaded+pgo-full.tar.zst",
            ),
        ];
        for ((os, arch, free_threaded, debug), expected) in cases {
            let artifact = resolve(&python(os, arch, free_threaded, debug))
                .unwrap_or_else(|err| panic!("{os}/{arch}: {err}"));
            assert_eq!(artifact.file_name, expected);
            assert_eq!(
                artifact.url,
                format!("{PYTHON_RELEASES}/20241016/{expected}")
            );
            assert_eq!(artifact.format, ArchiveFormat::TarZst);
        }
    }

    #[test]
    fn windows_ignores_debug_and_forces_shared() {
        let artifact = resolve(&python("windows", "amd64", true, true)).expect("windows");
        assert_eq!(
            artifact.file_name,
            "cpython-3.13.0+20241016-x86_64-pc-windows-msvc-shared-freethreaded+pgo-full.tar.zst"
        );
        let artifact = resolve(&python("windows", "arm64", false, true)).expect("windows");
        assert!(artifact.file_name.ends_with("aarch64-pc-windows-msvc-shared-pgo-full.tar.zst"));
    }

    #[test]
    fn shared_flag_inserts_token_on_unix() {
        let mut descriptor = python("linux", "arm64", false, false);
        descriptor.variant.shared = true;
        let artifact = resolve(&descriptor).expect("linux shared");
        assert_eq!(
            artifact.file_name,
            "cpython-3.13.0+20241016-aarch64-unknown-linux-gnu-shared-pgo-full.tar.zst"
        );
    }

    #[test]
    fn python_rejects_unknown_platforms() {
        let err = resolve(&python("linux", "mips", false, false)).unwrap_err();
        assert_eq!(
            err,
            ResolveError::Unsupported {
                component: ComponentKind::InterpreterRuntime,
                os: "linux".to_string(),
                arch: "mips".to_string(),
            }
        );
        assert!(matches!(
            resolve(&python("freebsd", "amd64", false, false)),
            Err(ResolveError::Unsupported { .. })
        ));
    }

    #[test]
    fn python_requires_build_date() {
        let mut descriptor = python("linux", "amd64", false, false);
        descriptor.build_date = None;
        assert!(matches!(
            resolve(&descriptor),
            Err(ResolveError::MissingBuildDate { .. })
        ));
    }

    #[test]
    fn go_urls_pick_extension_by_os() {
        let go = |os: &str, arch: &str| {
            resolve(&ComponentDescriptor::new(
                ComponentKind::LanguageRuntime,
                "1.23.3",
                TargetPlatform::new(os, arch),
            ))
        };
        let linux = go("linux", "amd64").expect("linux");
        assert_eq!(linux.url, "https://go.dev/dl/go1.23.3.linux-amd64.tar.gz");
        assert_eq!(linux.format, ArchiveFormat::TarGz);
        let windows = go("windows", "386").expect("windows");
        assert_eq!(windows.url, "https://go.dev/dl/go1.23.3.windows-386.zip");
        assert_eq!(windows.format, ArchiveFormat::Zip);
        assert_eq!(
            go("darwin", "arm64").expect("darwin").file_name,
            "go1.23.3.darwin-arm64.tar.gz"
        );
        assert!(go("plan9", "amd64").is_err());
        assert!(go("linux", "riscv64").is_err());
    }

    #[test]
    fn tiny_pkg_config_urls_capitalise_os() {
        let helper = |os: &str, arch: &str| {
            resolve(&ComponentDescriptor::new(
                ComponentKind::BuildHelper,
                "v0.2.0",
                TargetPlatform::new(os, arch),
            ))
        };
        assert_eq!(
            helper("linux", "amd64").expect("linux").url,
            "https://github.com/cpunion/tiny-pkg-config/releases/download/v0.2.0/tiny-pkg-config_Linux_x86_64.tar.gz"
        );
        assert_eq!(
            helper("darwin", "arm64").expect("darwin").file_name,
            "tiny-pkg-config_Darwin_arm64.tar.gz"
        );
        let windows = helper("windows", "amd64").expect("windows");
        assert_eq!(windows.file_name, "tiny-pkg-config_Windows_x86_64.zip");
        assert_eq!(windows.format, ArchiveFormat::Zip);
        assert_eq!(
            helper("linux", "386").expect("linux/386").file_name,
            "tiny-pkg-config_Linux_386.tar.gz"
        );
        assert!(helper("solaris", "amd64").is_err());
        assert!(matches!(
            helper("linux", "mips"),
            Err(ResolveError::Unsupported { .. })
        ));
        assert!(helper("linux", "").is_err());
    }

    #[test]
    fn mingw_only_resolves_for_windows_amd64() {
        let mingw = |os: &str, arch: &str| {
            resolve(&ComponentDescriptor::new(
                ComponentKind::CompilerToolchain,
                "14.2.0",
                TargetPlatform::new(os, arch),
            ))
        };
        let artifact = mingw("windows", "amd64").expect("windows");
        assert_eq!(artifact.url, MINGW_URL);
        assert_eq!(artifact.format, ArchiveFormat::Zip);
        assert!(mingw("linux", "amd64").is_err());
        assert!(mingw("windows", "arm64").is_err());
    }

    #[test]
    fn resolution_is_deterministic() {
        let descriptor = python("linux", "amd64", false, false);
        assert_eq!(resolve(&descriptor), resolve(&descriptor.clone()));
    }

    #[test]
    fn format_detection_is_extension_based() {
        assert_eq!(
            ArchiveFormat::from_file_name("cpython-3.13.0-full.tar.zst"),
            Some(ArchiveFormat::TarZst)
        );
        assert_eq!(
            ArchiveFormat::from_file_name("go1.23.3.linux-amd64-1a2b3c4d.tar.gz"),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::from_file_name("winlibs.ZIP"),
            Some(ArchiveFormat::Zip)
        );
        assert_eq!(ArchiveFormat::from_file_name("python.tar.bz2"), None);
        assert_eq!(ArchiveFormat::from_file_name("notes.txt"), None);
    }
}
