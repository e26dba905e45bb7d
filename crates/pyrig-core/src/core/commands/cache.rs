use std::fs;

use anyhow::{Context, Result};
use serde_json::json;

use crate::{CommandContext, ExecutionOutcome};

#[derive(Clone, Debug, Default)]
pub struct CachePathRequest;

/// # Errors
/// Fails when the cache directory cannot be created.
pub fn cache_path(ctx: &CommandContext, _request: CachePathRequest) -> Result<ExecutionOutcome> {
    let cache = ctx.cache();
    fs::create_dir_all(&cache.path).context("unable to create cache directory")?;
    let canonical = fs::canonicalize(&cache.path).unwrap_or_else(|_| cache.path.clone());
    let path_str = canonical.display().to_string();
    Ok(ExecutionOutcome::success(
        format!("cache directory: {path_str}"),
        json!({
            "status": "path",
            "cache_path": path_str,
            "source": cache.source,
        }),
    ))
}
