use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::errors::ProvisionError;
use crate::process::{locate_tool, ToolCommand};

/// Reads and writes the install name recorded in a Mach-O dylib.
pub trait LinkEditor {
    /// Current install name, or `None` when the library carries none.
    ///
    /// # Errors
    /// Fails when the underlying tool fails.
    fn install_name(&self, dylib: &Path) -> Result<Option<String>>;

    /// # Errors
    /// Fails when the underlying tool fails.
    fn set_install_name(&self, dylib: &Path, name: &Path) -> Result<()>;
}

/// `otool -D` / `install_name_tool -id` from the host toolchain.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLinkEditor;

impl LinkEditor for SystemLinkEditor {
    fn install_name(&self, dylib: &Path) -> Result<Option<String>> {
        let otool = locate_tool("otool")?;
        let output = ToolCommand::new(&otool).arg("-D").arg(dylib).output()?;
        Ok(parse_otool_id(&output.stdout))
    }

    fn set_install_name(&self, dylib: &Path, name: &Path) -> Result<()> {
        let tool = locate_tool("install_name_tool")?;
        ToolCommand::new(&tool)
            .arg("-id")
            .arg(name)
            .arg(dylib)
            .output()
            .map(drop)
    }
}

/// `otool -D` prints the file path on the first line and the id on the second.
#[must_use]
pub fn parse_otool_id(output: &str) -> Option<String> {
    let id = output.split('\n').nth(1)?.trim();
    (!id.is_empty()).then(|| id.to_string())
}

/// Point every dylib directly under `lib_dir` at its absolute location.
///
/// Returns the libraries whose install name was changed.
///
/// # Errors
/// Any tool failure aborts the pass.
pub fn rewrite_install_names(lib_dir: &Path, editor: &dyn LinkEditor) -> Result<Vec<PathBuf>> {
    let abs_lib_dir = std::path::absolute(lib_dir)
        .map_err(|err| ProvisionError::filesystem("resolve", lib_dir, err))?;
    let mut dylibs = Vec::new();
    let entries =
        fs::read_dir(lib_dir).map_err(|err| ProvisionError::filesystem("read", lib_dir, err))?;
    for entry in entries {
        let entry = entry.map_err(|err| ProvisionError::filesystem("read", lib_dir, err))?;
        let file_type = entry
            .file_type()
            .map_err(|err| ProvisionError::filesystem("inspect", entry.path(), err))?;
        // Versioned aliases are symlinks to the real library.
        if !file_type.is_file() {
            continue;
        }
        if entry.path().extension().is_some_and(|ext| ext == "dylib") {
            dylibs.push(entry.path());
        }
    }
    dylibs.sort();

    let mut updated = Vec::new();
    for dylib in dylibs {
        let current = editor
            .install_name(&dylib)
            .with_context(|| format!("failed to read install name of {}", dylib.display()))?;
        let Some(current) = current else {
            debug!(dylib = %dylib.display(), "no install name recorded");
            continue;
        };
        let Some(base) = Path::new(&current).file_name() else {
            continue;
        };
        let new_name = abs_lib_dir.join(base);
        info!(
            dylib = %dylib.display(),
            install_name = %new_name.display(),
            "updating install name"
        );
        editor
            .set_install_name(&dylib, &new_name)
            .with_context(|| format!("failed to update install name of {}", dylib.display()))?;
        updated.push(dylib);
    }
    Ok(updated)
}
