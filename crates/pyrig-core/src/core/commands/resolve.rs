use anyhow::Result;
use pyrig_domain::component::MINGW_VERSION;
use pyrig_domain::{
    resolve, ComponentDescriptor, ComponentKind, ComponentVersions, TargetPlatform, VariantFlags,
};
use serde_json::json;

use crate::errors::ProvisionError;
use crate::store::cache_file_name;
use crate::{CommandContext, ExecutionOutcome};

#[derive(Clone, Debug)]
pub struct ResolveRequest {
    pub component: ComponentKind,
    pub versions: ComponentVersions,
    pub variant: VariantFlags,
    pub platform: TargetPlatform,
}

impl ResolveRequest {
    fn descriptor(&self) -> ComponentDescriptor {
        let versions = &self.versions;
        let platform = self.platform.clone();
        match self.component {
            ComponentKind::BuildHelper => {
                ComponentDescriptor::new(self.component, &versions.tiny_pkg_config, platform)
            }
            ComponentKind::CompilerToolchain => {
                ComponentDescriptor::new(self.component, MINGW_VERSION, platform)
            }
            ComponentKind::LanguageRuntime => {
                ComponentDescriptor::new(self.component, &versions.go, platform)
            }
            ComponentKind::InterpreterRuntime => {
                ComponentDescriptor::new(self.component, &versions.python, platform)
                    .with_build_date(&versions.python_build_date)
                    .with_variant(self.variant)
            }
        }
    }
}

/// Show the download URL and cache slot for one component without
/// fetching anything.
///
/// # Errors
/// Fails with an unsupported-platform error when no artifact exists.
pub fn resolve_component(
    ctx: &CommandContext,
    request: &ResolveRequest,
) -> Result<ExecutionOutcome> {
    let descriptor = request.descriptor();
    let artifact = resolve(&descriptor).map_err(ProvisionError::from)?;
    let cache_path = ctx.cache().path.join(cache_file_name(&artifact.url));
    Ok(ExecutionOutcome::success(
        artifact.url.clone(),
        json!({
            "passthrough": true,
            "component": descriptor.kind,
            "version": descriptor.version,
            "platform": descriptor.platform.to_string(),
            "url": artifact.url,
            "file_name": artifact.file_name,
            "format": artifact.format.to_string(),
            "cache_path": cache_path.display().to_string(),
            "cached": cache_path.is_file(),
        }),
    ))
}
