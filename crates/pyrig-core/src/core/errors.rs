use std::io;
use std::path::PathBuf;

use pyrig_domain::ResolveError;
use thiserror::Error;

/// Root causes of a failed provisioning run.
///
/// Engine functions return `anyhow::Result`; the innermost error of the
/// chain is one of these variants and can be recovered with
/// `err.downcast_ref::<ProvisionError>()`.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    UnsupportedPlatform(#[from] ResolveError),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("download of {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("unsupported archive format: {}", .path.display())]
    UnsupportedArchive { path: PathBuf },

    #[error("corrupt archive {}: {message}", .archive.display())]
    ArchiveCorrupt { archive: PathBuf, message: String },

    #[error("failed to {action} {}: {source}", .path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{tool} exited with {status}{}", stderr_suffix(.stderr))]
    ExternalTool {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("python executable not found in {}", .root.display())]
    InterpreterNotFound { root: PathBuf },
}

impl ProvisionError {
    pub(crate) fn filesystem(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(archive: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ArchiveCorrupt {
            archive: archive.into(),
            message: message.into(),
        }
    }

    /// Unsupported platforms are a caller problem rather than a tool failure.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::UnsupportedPlatform(_))
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Find the [`ProvisionError`] at the bottom of an error chain, if any.
#[must_use]
pub fn provision_error(err: &anyhow::Error) -> Option<&ProvisionError> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ProvisionError>())
}
