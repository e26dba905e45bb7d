use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use anyhow::Result;
use tracing::trace;

use super::{ArchiveEntry, EntryKind, EntrySink, ExtractionPlan};
use crate::errors::ProvisionError;

/// Counts reported after an extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub written: usize,
    pub skipped: usize,
    /// Uncompressed size of the regular files written.
    pub bytes: u64,
}

/// Materialises entries under the plan's destination root.
pub struct EntryWriter<'a> {
    plan: &'a ExtractionPlan,
    archive: &'a Path,
    summary: ExtractionSummary,
}

impl<'a> EntryWriter<'a> {
    #[must_use]
    pub fn new(plan: &'a ExtractionPlan, archive: &'a Path) -> Self {
        Self {
            plan,
            archive,
            summary: ExtractionSummary::default(),
        }
    }

    #[must_use]
    pub fn finish(self) -> ExtractionSummary {
        self.summary
    }

    fn link_target<'e>(&self, entry: &'e ArchiveEntry) -> Result<&'e str> {
        entry.link_target.as_deref().ok_or_else(|| {
            ProvisionError::corrupt(self.archive, format!("link {} has no target", entry.name))
                .into()
        })
    }
}

impl EntrySink for EntryWriter<'_> {
    fn write_entry(&mut self, entry: &ArchiveEntry, content: &mut dyn Read) -> Result<()> {
        let relative = self
            .plan
            .remap(&entry.name)
            .map_err(|message| ProvisionError::corrupt(self.archive, message))?;
        let Some(relative) = relative else {
            trace!(name = %entry.name, "skipping entry");
            self.summary.skipped += 1;
            return Ok(());
        };
        let dest = self.plan.destination(&relative);
        trace!(name = %entry.name, kind = ?entry.kind, dest = %dest.display(), "writing entry");
        match entry.kind {
            EntryKind::Directory => write_directory(&dest, entry.mode)?,
            EntryKind::File => {
                write_file(&dest, entry.mode, content)?;
                self.summary.bytes += entry.size;
            }
            EntryKind::Symlink => write_symlink(&dest, self.link_target(entry)?)?,
            EntryKind::Hardlink => {
                let target = self
                    .plan
                    .retarget_link(self.link_target(entry)?)
                    .map_err(|message| ProvisionError::corrupt(self.archive, message))?;
                write_hardlink(&dest, &target)?;
            }
        }
        self.summary.written += 1;
        Ok(())
    }
}

fn write_directory(dest: &Path, mode: Option<u32>) -> Result<(), ProvisionError> {
    fs::create_dir_all(dest).map_err(|err| ProvisionError::filesystem("create", dest, err))?;
    // Owner keeps rwx so later entries can be written inside.
    apply_mode(dest, mode.map(|mode| mode | 0o700))
}

fn write_file(
    dest: &Path,
    mode: Option<u32>,
    content: &mut dyn Read,
) -> Result<(), ProvisionError> {
    ensure_parent(dest)?;
    if fs::symlink_metadata(dest).is_ok_and(|meta| meta.file_type().is_symlink()) {
        remove_existing(dest)?;
    }
    let mut file =
        File::create(dest).map_err(|err| ProvisionError::filesystem("create", dest, err))?;
    io::copy(content, &mut file).map_err(|err| ProvisionError::filesystem("write", dest, err))?;
    drop(file);
    apply_mode(dest, mode)
}

fn write_symlink(dest: &Path, target: &str) -> Result<(), ProvisionError> {
    ensure_parent(dest)?;
    remove_existing(dest)?;
    create_symlink(target, dest).map_err(|err| ProvisionError::filesystem("symlink", dest, err))
}

fn write_hardlink(dest: &Path, target: &Path) -> Result<(), ProvisionError> {
    ensure_parent(dest)?;
    remove_existing(dest)?;
    fs::hard_link(target, dest).map_err(|err| ProvisionError::filesystem("hard link", dest, err))
}

fn ensure_parent(dest: &Path) -> Result<(), ProvisionError> {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|err| ProvisionError::filesystem("create", parent, err)),
        _ => Ok(()),
    }
}

/// Remove whatever sits at `dest` without following symlinks.
fn remove_existing(dest: &Path) -> Result<(), ProvisionError> {
    let Ok(meta) = fs::symlink_metadata(dest) else {
        return Ok(());
    };
    let result = if meta.is_dir() {
        fs::remove_dir_all(dest)
    } else {
        fs::remove_file(dest)
    };
    result.map_err(|err| ProvisionError::filesystem("remove", dest, err))
}

#[cfg(unix)]
fn apply_mode(dest: &Path, mode: Option<u32>) -> Result<(), ProvisionError> {
    use std::os::unix::fs::PermissionsExt;

    let Some(mode) = mode else {
        return Ok(());
    };
    fs::set_permissions(dest, fs::Permissions::from_mode(mode & 0o7777))
        .map_err(|err| ProvisionError::filesystem("set permissions on", dest, err))
}

#[cfg(not(unix))]
fn apply_mode(_dest: &Path, _mode: Option<u32>) -> Result<(), ProvisionError> {
    Ok(())
}

#[cfg(unix)]
fn create_symlink(target: &str, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, dest)
}

#[cfg(windows)]
fn create_symlink(target: &str, dest: &Path) -> io::Result<()> {
    let resolved: std::path::PathBuf = dest
        .parent()
        .map_or_else(|| std::path::PathBuf::from(target), |parent| parent.join(target));
    if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(target, dest)
    } else {
        std::os::windows::fs::symlink_file(target, dest)
    }
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_target: &str, _dest: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ))
}
