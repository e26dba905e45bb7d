use anyhow::Result;
use serde_json::json;
use tracing::debug;

use crate::provision::{ProvisionRequest, Provisioner};
use crate::{CommandContext, ExecutionOutcome};

/// Provision every component for `request.project_root`.
///
/// # Errors
/// Propagates the first provisioning failure; callers turn it into an
/// outcome with [`crate::outcome_from_error`].
pub fn install(ctx: &CommandContext, request: &ProvisionRequest) -> Result<ExecutionOutcome> {
    debug!(
        root = %request.project_root.display(),
        platform = %request.platform,
        quiet = ctx.global.quiet,
        "install requested"
    );
    let provisioner = Provisioner::new(ctx.config())?;
    let report = provisioner.provision(request)?;
    let downloaded = report
        .components
        .iter()
        .filter(|component| !component.cache_hit)
        .count();
    let message = format!(
        "installed {} components for {} ({} downloaded)",
        report.components.len(),
        report.platform,
        downloaded
    );
    let mut details = serde_json::to_value(&report)?;
    if let Some(map) = details.as_object_mut() {
        map.insert(
            "cache_path".to_string(),
            json!(provisioner.cache().root().display().to_string()),
        );
    }
    Ok(ExecutionOutcome::success(message, details))
}
