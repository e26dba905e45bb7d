use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Result;
use zip::ZipArchive;

use super::{ArchiveEntry, ArchiveStream, EntryKind, EntrySink};
use crate::errors::ProvisionError;

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

pub(super) struct ZipStream {
    archive: ZipArchive<File>,
    path: PathBuf,
}

impl ZipStream {
    pub(super) fn new(file: File, path: &Path) -> Result<Self> {
        let archive = ZipArchive::new(file)
            .map_err(|err| ProvisionError::corrupt(path, err.to_string()))?;
        Ok(Self {
            archive,
            path: path.to_path_buf(),
        })
    }
}

impl ArchiveStream for ZipStream {
    fn stream_entries(&mut self, sink: &mut dyn EntrySink) -> Result<()> {
        for index in 0..self.archive.len() {
            let mut file = self
                .archive
                .by_index(index)
                .map_err(|err| ProvisionError::corrupt(&self.path, err.to_string()))?;
            let name = file.name().to_string();
            let mode = file.unix_mode();
            let size = file.size();
            let is_symlink = mode.is_some_and(|mode| mode & S_IFMT == S_IFLNK);
            let entry = if file.is_dir() {
                ArchiveEntry {
                    name,
                    kind: EntryKind::Directory,
                    mode,
                    size,
                    link_target: None,
                }
            } else if is_symlink {
                // Zip stores a symlink's target as the entry's content.
                let mut target = String::new();
                file.read_to_string(&mut target)
                    .map_err(|err| ProvisionError::corrupt(&self.path, err.to_string()))?;
                ArchiveEntry {
                    name,
                    kind: EntryKind::Symlink,
                    mode,
                    size,
                    link_target: Some(target),
                }
            } else {
                ArchiveEntry {
                    name,
                    kind: EntryKind::File,
                    mode,
                    size,
                    link_target: None,
                }
            };
            sink.write_entry(&entry, &mut file)?;
        }
        Ok(())
    }
}
