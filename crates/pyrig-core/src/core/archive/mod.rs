//! Streaming extraction for zip, gzip-tar and zstd-tar archives.
//!
//! Each format is an [`ArchiveStream`] adapter that walks entries in archive
//! order and hands them to an [`EntrySink`]. The only sink is
//! [`EntryWriter`], which applies an [`ExtractionPlan`] and materialises the
//! entry on disk, so the three formats share one set of placement rules.

mod plan;
mod tar_stream;
mod writer;
mod zip_stream;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use pyrig_domain::ArchiveFormat;
use tracing::{debug, Span};

use crate::errors::ProvisionError;

pub use plan::ExtractionPlan;
pub use writer::{EntryWriter, ExtractionSummary};

use self::tar_stream::TarStream;
use self::zip_stream::ZipStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Hardlink,
}

/// Header of one archive member, produced while streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Unix permission bits when the archive records them.
    pub mode: Option<u32>,
    pub size: u64,
    pub link_target: Option<String>,
}

/// Receives entries one at a time together with a reader over the entry's
/// content. The reader is only valid for the duration of the call.
pub trait EntrySink {
    /// # Errors
    /// Implementations fail when the entry cannot be materialised.
    fn write_entry(&mut self, entry: &ArchiveEntry, content: &mut dyn Read) -> Result<()>;
}

/// A format adapter that walks every entry in archive order.
pub trait ArchiveStream {
    /// # Errors
    /// Fails on decode errors or when the sink fails.
    fn stream_entries(&mut self, sink: &mut dyn EntrySink) -> Result<()>;
}

/// Pick the adapter from a file name's extension.
///
/// # Errors
/// Unknown extensions are rejected with [`ProvisionError::UnsupportedArchive`].
pub fn format_for_path(path: &Path) -> Result<ArchiveFormat> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(ArchiveFormat::from_file_name)
        .ok_or_else(|| {
            ProvisionError::UnsupportedArchive {
                path: path.to_path_buf(),
            }
            .into()
        })
}

/// Open `source` with the adapter for `format`.
///
/// # Errors
/// Fails if the file cannot be opened or its container header is invalid.
pub fn open_archive(format: ArchiveFormat, source: &Path) -> Result<Box<dyn ArchiveStream>> {
    let file =
        File::open(source).map_err(|err| ProvisionError::filesystem("open", source, err))?;
    let stream: Box<dyn ArchiveStream> = match format {
        ArchiveFormat::Zip => Box::new(ZipStream::new(file, source)?),
        ArchiveFormat::TarGz => Box::new(TarStream::new(
            GzDecoder::new(BufReader::new(file)),
            source,
        )),
        ArchiveFormat::TarZst => {
            let mut decoder = zstd::stream::read::Decoder::new(file)
                .map_err(|err| ProvisionError::corrupt(source, err.to_string()))?;
            decoder
                .window_log_max(ZSTD_WINDOW_LOG_MAX)
                .map_err(|err| ProvisionError::corrupt(source, err.to_string()))?;
            Box::new(TarStream::new(decoder, source))
        }
    };
    Ok(stream)
}

/// Accept frames written with `--long`.
#[cfg(target_pointer_width = "64")]
const ZSTD_WINDOW_LOG_MAX: u32 = 31;
#[cfg(not(target_pointer_width = "64"))]
const ZSTD_WINDOW_LOG_MAX: u32 = 30;

/// Extracts downloaded archives into toolchain roots.
#[derive(Debug, Clone)]
pub struct ArchiveExtractor {
    span: Span,
}

impl ArchiveExtractor {
    #[must_use]
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    /// Extract `source` according to `plan`.
    ///
    /// Nothing is rolled back on failure; the destination may be left
    /// partially populated and should be recreated before retrying.
    ///
    /// # Errors
    /// Fails on decode errors, unsafe entry names and filesystem errors.
    pub fn extract(
        &self,
        format: ArchiveFormat,
        source: &Path,
        plan: &ExtractionPlan,
    ) -> Result<ExtractionSummary> {
        let _entered = self.span.enter();
        debug!(
            archive = %source.display(),
            %format,
            destination = %plan.destination_root.display(),
            prefix = %plan.prefix_to_strip,
            "extracting"
        );
        let mut stream = open_archive(format, source)?;
        let mut writer = EntryWriter::new(plan, source);
        stream.stream_entries(&mut writer).with_context(|| {
            format!(
                "extracting {} into {}",
                source.display(),
                plan.destination_root.display()
            )
        })?;
        let summary = writer.finish();
        debug!(
            written = summary.written,
            skipped = summary.skipped,
            bytes = summary.bytes,
            "extraction finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests;
