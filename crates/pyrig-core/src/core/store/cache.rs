use std::env;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::home_dir;
use reqwest::blocking::Client;
use sha2::{Digest, Sha256};
use tempfile::Builder;
use tracing::{debug, info, Span};

use crate::config::EnvSnapshot;
use crate::errors::ProvisionError;

/// Length of the URL digest embedded in cached file names.
const URL_DIGEST_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct CacheLocation {
    pub path: PathBuf,
    pub source: &'static str,
}

/// A downloaded artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_url: String,
    pub local_path: PathBuf,
    /// `true` when the file was already present and no request was made.
    pub cache_hit: bool,
}

impl CacheEntry {
    /// SHA-256 of the cached payload, hex encoded.
    ///
    /// # Errors
    /// Returns an error if the cached file cannot be read.
    pub fn content_sha256(&self) -> Result<String> {
        let mut file = File::open(&self.local_path)
            .map_err(|err| ProvisionError::filesystem("open", &self.local_path, err))?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)
            .map_err(|err| ProvisionError::filesystem("read", &self.local_path, err))?;
        Ok(hex::encode(hasher.finalize()))
    }
}

/// URL-keyed download cache.
///
/// Each URL maps to exactly one file under the cache root. Downloads land in
/// a temporary file next to the final path and are renamed into place only
/// after the whole body has been written. There is no cross-process lock:
/// two processes missing on the same URL both download and the last rename
/// wins.
#[derive(Debug)]
pub struct ContentCache {
    root: PathBuf,
    client: Client,
    span: Span,
}

impl ContentCache {
    /// Open (and create if needed) the cache at `location`.
    ///
    /// # Errors
    /// Returns an error if the cache directory cannot be created.
    pub fn open(location: &CacheLocation, client: Client, span: Span) -> Result<Self> {
        fs::create_dir_all(&location.path)
            .map_err(|err| ProvisionError::filesystem("create", &location.path, err))
            .with_context(|| format!("preparing download cache ({})", location.source))?;
        Ok(Self {
            root: location.path.clone(),
            client,
            span,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.root.join(cache_file_name(url))
    }

    /// Return the cached copy of `url`, downloading it on a miss.
    ///
    /// # Errors
    /// Fails on transport errors, non-success HTTP statuses and filesystem
    /// errors. No file is left at the final cache path on failure.
    pub fn fetch(&self, url: &str) -> Result<CacheEntry> {
        let _entered = self.span.enter();
        let local_path = self.path_for(url);
        if local_path.is_file() {
            debug!(url, path = %local_path.display(), "cache hit");
            return Ok(CacheEntry {
                source_url: url.to_string(),
                local_path,
                cache_hit: true,
            });
        }

        info!(url, "downloading");
        let bytes = self.download(url, &local_path)?;
        debug!(url, bytes, path = %local_path.display(), "stored download");
        Ok(CacheEntry {
            source_url: url.to_string(),
            local_path,
            cache_hit: false,
        })
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let transport = |source| ProvisionError::Transport {
            url: url.to_string(),
            source,
        };
        let mut response = self.client.get(url).send().map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProvisionError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let mut file = Builder::new()
            .prefix("download-")
            .tempfile_in(&self.root)
            .map_err(|err| {
                ProvisionError::filesystem("create temporary file in", &self.root, err)
            })?;
        let bytes = response.copy_to(file.as_file_mut()).map_err(transport)?;
        file.as_file()
            .sync_all()
            .map_err(|err| ProvisionError::filesystem("flush", file.path(), err))?;
        file.persist(dest)
            .map_err(|err| ProvisionError::filesystem("move download to", dest, err.error))?;
        Ok(bytes)
    }
}

/// Cache file name for `url`: the last path segment with a short digest of
/// the URL inserted before the (possibly two-part) extension.
#[must_use]
pub fn cache_file_name(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let name = without_query
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("download");
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    let short = &digest[..URL_DIGEST_LEN];
    let (stem, extension) = split_extension(name);
    format!("{stem}-{short}{extension}")
}

fn split_extension(name: &str) -> (&str, &str) {
    let lower = name.to_ascii_lowercase();
    for compound in [".tar.gz", ".tar.zst", ".tar.xz", ".tar.bz2"] {
        if lower.ends_with(compound) && name.len() > compound.len() {
            return name.split_at(name.len() - compound.len());
        }
    }
    match name.rfind('.') {
        Some(index) if index > 0 => name.split_at(index),
        _ => (name, ""),
    }
}

/// Determine the root directory for the download cache.
///
/// # Errors
///
/// Returns an error if a relative override cannot be made absolute.
pub(crate) fn resolve_cache_store_path(snapshot: &EnvSnapshot) -> Result<CacheLocation> {
    if let Some(override_path) = snapshot.var("PYRIG_CACHE_PATH").filter(|v| !v.is_empty()) {
        let path = absolutize(PathBuf::from(override_path))?;
        return Ok(CacheLocation {
            path,
            source: "PYRIG_CACHE_PATH",
        });
    }

    if let Some(home) = home_dir() {
        return Ok(CacheLocation {
            path: home.join(".pyrig").join("cache"),
            source: "HOME/.pyrig",
        });
    }

    Ok(CacheLocation {
        path: env::temp_dir().join("pyrig").join("cache"),
        source: "default (temp dir)",
    })
}

fn absolutize(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(env::current_dir()
            .context("failed to resolve PYRIG_CACHE_PATH")?
            .join(path))
    }
}
