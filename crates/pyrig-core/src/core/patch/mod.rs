//! Post-extraction fixes that make a relocated interpreter usable.

mod dylib;
mod pkgconfig;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, Span};

use crate::python::InterpreterInfo;

pub use dylib::{rewrite_install_names, LinkEditor, SystemLinkEditor};
pub use pkgconfig::{generate_windows_descriptors, rewrite_descriptors};

pub struct ArtifactPatcher {
    editor: Box<dyn LinkEditor>,
    span: Span,
}

impl ArtifactPatcher {
    #[must_use]
    pub fn new(span: Span) -> Self {
        Self::with_editor(Box::new(SystemLinkEditor), span)
    }

    #[must_use]
    pub fn with_editor(editor: Box<dyn LinkEditor>, span: Span) -> Self {
        Self { editor, span }
    }

    /// # Errors
    /// Fails on the first library whose install name cannot be updated.
    pub fn relink_dylibs(&self, lib_dir: &Path) -> Result<Vec<PathBuf>> {
        let _entered = self.span.enter();
        let updated = rewrite_install_names(lib_dir, self.editor.as_ref())
            .context("error updating dylib install names")?;
        info!(count = updated.len(), "updated dylib install names");
        Ok(updated)
    }

    /// # Errors
    /// Fails when the pkgconfig directory is missing or unwritable.
    pub fn rewrite_pkg_config(
        &self,
        pkgconfig_dir: &Path,
        runtime_root: &Path,
    ) -> Result<Vec<PathBuf>> {
        let _entered = self.span.enter();
        rewrite_descriptors(pkgconfig_dir, runtime_root).context("error updating pkg-config")
    }

    /// # Errors
    /// Fails when a descriptor cannot be written.
    pub fn generate_pkg_config(
        &self,
        pkgconfig_dir: &Path,
        interpreter: &InterpreterInfo,
    ) -> Result<Vec<PathBuf>> {
        let _entered = self.span.enter();
        info!(dir = %pkgconfig_dir.display(), "generating pkg-config files");
        generate_windows_descriptors(pkgconfig_dir, interpreter)
            .context("error generating pkg-config files")
    }
}
