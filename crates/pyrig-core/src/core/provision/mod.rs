//! Sequencing of resolve, fetch, extract and patch for every component.


use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pyrig_domain::{
    compose_build_env, resolve, ComponentDescriptor, ComponentKind, ComponentVersions,
    EnvDescriptor, ProjectLayout, ResolvedArtifact, TargetPlatform, VariantFlags,
};
use serde::Serialize;
use tracing::{debug, info, info_span, Span};

use crate::archive::{ArchiveExtractor, ExtractionPlan};
use crate::config::Config;
use crate::errors::ProvisionError;
use crate::net::build_http_client;
use crate::patch::ArtifactPatcher;
use crate::process::ToolCommand;
use crate::python::{InterpreterInfo, PythonEnv};
use crate::store::ContentCache;

/// Package fetched with `go get -u` once Go is installed.
pub const DEFAULT_GO_PACKAGE: &str = "github.com/gotray/go-python";

/// Archive directory holding the relocatable interpreter tree.
const INTERPRETER_ARCHIVE_PREFIX: &str = "python/install";

const PIP_BOOTSTRAP: [&str; 5] = ["install", "--upgrade", "pip", "setuptools", "wheel"];

#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub project_root: PathBuf,
    pub versions: ComponentVersions,
    pub variant: VariantFlags,
    pub platform: TargetPlatform,
    pub go_packages: Vec<String>,
}

impl ProvisionRequest {
    /// Defaults for the host platform.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            versions: ComponentVersions::default(),
            variant: VariantFlags::default(),
            platform: TargetPlatform::host(),
            go_packages: vec![DEFAULT_GO_PACKAGE.to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentReport {
    pub kind: ComponentKind,
    pub version: String,
    pub url: String,
    pub archive: PathBuf,
    pub cache_hit: bool,
    pub destination: PathBuf,
    pub entries_written: usize,
    pub bytes_written: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub project_root: PathBuf,
    pub platform: String,
    pub components: Vec<ComponentReport>,
    /// Set when the interpreter was interrogated (Windows descriptor
    /// generation).
    pub interpreter: Option<InterpreterInfo>,
    /// `python --version` of the installed interpreter.
    pub python_version: String,
    pub python_path: String,
    pub env_file: PathBuf,
}

pub struct Provisioner {
    cache: ContentCache,
    extractor: ArchiveExtractor,
    patcher: ArtifactPatcher,
    span: Span,
}

impl Provisioner {
    /// Wire the engine from configuration.
    ///
    /// # Errors
    /// Fails when the HTTP client or cache directory cannot be set up.
    pub fn new(config: &Config) -> Result<Self> {
        let client = build_http_client(config.network())?;
        let cache = ContentCache::open(&config.cache().store, client, info_span!("cache"))?;
        Ok(Self::from_parts(
            cache,
            ArchiveExtractor::new(info_span!("extract")),
            ArtifactPatcher::new(info_span!("patch")),
            info_span!("provision"),
        ))
    }

    #[must_use]
    pub fn from_parts(
        cache: ContentCache,
        extractor: ArchiveExtractor,
        patcher: ArtifactPatcher,
        span: Span,
    ) -> Self {
        Self {
            cache,
            extractor,
            patcher,
            span,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Install every component into `<project>/.deps` and write `env.txt`.
    ///
    /// Stops at the first failure; earlier components stay on disk. Any
    /// previous `env.txt` is removed before the first component is touched
    /// and only rewritten once everything succeeded.
    ///
    /// # Errors
    /// The root cause is a [`ProvisionError`].
    pub fn provision(&self, request: &ProvisionRequest) -> Result<ProvisionReport> {
        let _entered = self.span.enter();
        let root = std::path::absolute(&request.project_root)
            .map_err(|err| ProvisionError::filesystem("resolve", &request.project_root, err))?;
        let layout = ProjectLayout::new(&root, &request.platform);
        let windows = request.platform.is_windows();

        // Resolve everything up front so an unsupported target fails before
        // any download.
        let artifacts = plan_artifacts(request)?;
        let env_file = layout.env_file();
        remove_stale_env_file(&env_file)?;

        let inherited_path = env::var_os("PATH");
        let build_env: Vec<(String, String)> =
            compose_build_env(&layout, inherited_path.as_deref())
                .into_iter()
                .collect();

        let mut components = Vec::with_capacity(artifacts.len());
        let mut interpreter = None;
        for (descriptor, artifact) in &artifacts {
            let kind = descriptor.kind;
            let report = self
                .install_component(&layout, descriptor, artifact)
                .with_context(|| format!("error installing {kind} {}", descriptor.version))?;
            match kind {
                ComponentKind::BuildHelper => {
                    rename_pkg_config(&report.destination, &request.platform)?;
                }
                ComponentKind::LanguageRuntime => {
                    fetch_go_packages(&layout, &request.go_packages, &build_env)
                        .context("error installing dependencies")?;
                }
                ComponentKind::InterpreterRuntime => {
                    interpreter = self
                        .patch_interpreter(&layout, &request.platform, &build_env)
                        .with_context(|| {
                            format!("error installing {kind} {}", descriptor.version)
                        })?;
                }
                ComponentKind::CompilerToolchain => {}
            }
            components.push(report);
        }

        let python = PythonEnv::new(layout.python_root(), windows).with_envs(build_env.clone());
        let python_version = python
            .version()
            .context("installed interpreter does not run")?;
        debug!(version = %python_version, "interpreter answered");
        info!("installing Python dependencies");
        python
            .run_pip(&PIP_BOOTSTRAP)
            .context("error upgrading pip, setuptools, wheel")?;
        let python_path = python.sys_path()?;

        let descriptor = EnvDescriptor::for_interpreter(
            &python_path,
            &layout.python_root(),
            &layout.python_bin_dir(),
        )?;
        descriptor
            .write(&env_file)
            .context("error writing environment file")?;
        info!(path = %env_file.display(), "wrote environment file");

        Ok(ProvisionReport {
            project_root: root,
            platform: request.platform.to_string(),
            components,
            interpreter,
            python_version,
            python_path,
            env_file,
        })
    }

    fn install_component(
        &self,
        layout: &ProjectLayout,
        descriptor: &ComponentDescriptor,
        artifact: &ResolvedArtifact,
    ) -> Result<ComponentReport> {
        let destination = layout.component_dir(descriptor.kind);
        info!(
            component = %descriptor.kind,
            version = %descriptor.version,
            dest = %destination.display(),
            "installing"
        );
        recreate_dir(&destination)?;

        let entry = self.cache.fetch(&artifact.url)?;
        let prefix = match descriptor.kind {
            ComponentKind::InterpreterRuntime => INTERPRETER_ARCHIVE_PREFIX,
            _ => "",
        };
        let plan = ExtractionPlan::for_format(&destination, artifact.format, prefix);
        let summary = self
            .extractor
            .extract(artifact.format, &entry.local_path, &plan)?;

        Ok(ComponentReport {
            kind: descriptor.kind,
            version: descriptor.version.clone(),
            url: artifact.url.clone(),
            archive: entry.local_path,
            cache_hit: entry.cache_hit,
            destination,
            entries_written: summary.written,
            bytes_written: summary.bytes,
        })
    }

    fn patch_interpreter(
        &self,
        layout: &ProjectLayout,
        platform: &TargetPlatform,
        build_env: &[(String, String)],
    ) -> Result<Option<InterpreterInfo>> {
        if platform.is_darwin() {
            self.patcher.relink_dylibs(&layout.python_lib_dir())?;
        }
        let mut interpreter = None;
        if platform.is_windows() {
            let info = PythonEnv::new(layout.python_root(), true)
                .with_envs(build_env.iter().cloned())
                .probe()?;
            self.patcher
                .generate_pkg_config(&layout.python_pkgconfig_dir(), &info)?;
            interpreter = Some(info);
        }
        self.patcher
            .rewrite_pkg_config(&layout.python_pkgconfig_dir(), &layout.python_root())?;
        Ok(interpreter)
    }
}

/// Resolve the component plan for `request`.
///
/// # Errors
/// Fails with [`ProvisionError::UnsupportedPlatform`] for targets with no
/// published artifact.
pub fn plan_artifacts(
    request: &ProvisionRequest,
) -> Result<Vec<(ComponentDescriptor, ResolvedArtifact)>> {
    ComponentDescriptor::plan_for(&request.versions, request.variant, &request.platform)
        .into_iter()
        .map(|descriptor| -> Result<_> {
            let artifact = resolve(&descriptor).map_err(ProvisionError::from)?;
            debug!(component = %descriptor.kind, url = %artifact.url, "resolved");
            Ok((descriptor, artifact))
        })
        .collect()
}

fn recreate_dir(dir: &Path) -> Result<(), ProvisionError> {
    if fs::symlink_metadata(dir).is_ok() {
        fs::remove_dir_all(dir).map_err(|err| ProvisionError::filesystem("remove", dir, err))?;
    }
    fs::create_dir_all(dir).map_err(|err| ProvisionError::filesystem("create", dir, err))
}

fn remove_stale_env_file(env_file: &Path) -> Result<(), ProvisionError> {
    match fs::remove_file(env_file) {
        Ok(()) => {
            debug!(path = %env_file.display(), "removed previous environment file");
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(ProvisionError::filesystem("remove", env_file, err)),
    }
}

fn rename_pkg_config(dir: &Path, platform: &TargetPlatform) -> Result<()> {
    let suffix = platform.exe_suffix();
    let from = dir.join(format!("tiny-pkg-config{suffix}"));
    let to = dir.join(format!("pkg-config{suffix}"));
    fs::rename(&from, &to)
        .map_err(|err| ProvisionError::filesystem("rename", &from, err))
        .context("failed to rename executable")?;
    debug!(from = %from.display(), to = %to.display(), "renamed pkg-config helper");
    Ok(())
}

fn fetch_go_packages(
    layout: &ProjectLayout,
    packages: &[String],
    build_env: &[(String, String)],
) -> Result<()> {
    if packages.is_empty() {
        return Ok(());
    }
    info!(packages = ?packages, "installing Go dependencies");
    let go = layout.go_binary();
    let mut args: Vec<&str> = vec!["get", "-u"];
    args.extend(packages.iter().map(String::as_str));
    ToolCommand::new(&go)
        .args(&args)
        .envs(build_env)
        .current_dir(layout.project_root())
        .status()
}
