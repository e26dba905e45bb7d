use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tar::{Archive, EntryType};
use tracing::trace;

use super::{ArchiveEntry, ArchiveStream, EntryKind, EntrySink};
use crate::errors::ProvisionError;

/// Tar adapter over any decompressed byte stream (gzip or zstd).
pub(super) struct TarStream<R: Read> {
    archive: Archive<R>,
    path: PathBuf,
}

impl<R: Read> TarStream<R> {
    pub(super) fn new(reader: R, path: &Path) -> Self {
        Self {
            archive: Archive::new(reader),
            path: path.to_path_buf(),
        }
    }
}

impl<R: Read> ArchiveStream for TarStream<R> {
    fn stream_entries(&mut self, sink: &mut dyn EntrySink) -> Result<()> {
        let corrupt = |err: std::io::Error| ProvisionError::corrupt(&self.path, err.to_string());
        let entries = self.archive.entries().map_err(corrupt)?;
        for entry in entries {
            let mut entry = entry.map_err(corrupt)?;
            let header = entry.header();
            let kind = match header.entry_type() {
                EntryType::Directory => EntryKind::Directory,
                EntryType::Regular | EntryType::Continuous => EntryKind::File,
                EntryType::Symlink => EntryKind::Symlink,
                EntryType::Link => EntryKind::Hardlink,
                other => {
                    trace!(?other, "skipping tar entry type");
                    continue;
                }
            };
            let mode = header.mode().ok();
            let size = header.size().unwrap_or(0);
            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let link_target = entry
                .link_name_bytes()
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
            if matches!(kind, EntryKind::Symlink | EntryKind::Hardlink) && link_target.is_none() {
                return Err(
                    ProvisionError::corrupt(&self.path, format!("link {name} has no target"))
                        .into(),
                );
            }
            let record = ArchiveEntry {
                name,
                kind,
                mode,
                size,
                link_target,
            };
            sink.write_entry(&record, &mut entry)?;
        }
        Ok(())
    }
}
