use std::env;
use std::path::PathBuf;

use anyhow::Result;
use pyrig_domain::{EnvDescriptor, ProjectLayout, TargetPlatform};
use serde_json::{json, Map, Value};

use crate::errors::ProvisionError;
use crate::{CommandContext, ExecutionOutcome};

#[derive(Clone, Debug)]
pub struct EnvRequest {
    pub project_root: PathBuf,
    pub platform: TargetPlatform,
}

/// Print the recorded interpreter environment of a provisioned project.
///
/// # Errors
/// Fails when an existing `env.txt` cannot be read.
pub fn show_env(_ctx: &CommandContext, request: &EnvRequest) -> Result<ExecutionOutcome> {
    let root = std::path::absolute(&request.project_root)
        .map_err(|err| ProvisionError::filesystem("resolve", &request.project_root, err))?;
    let layout = ProjectLayout::new(&root, &request.platform);
    let env_file = layout.env_file();
    if !env_file.is_file() {
        return Ok(ExecutionOutcome::user_error(
            format!("no environment file at {}", env_file.display()),
            json!({
                "reason": "missing_env",
                "env_file": env_file.display().to_string(),
                "hint": "Run `pyrig install` in the project first.",
            }),
        ));
    }

    let descriptor = EnvDescriptor::read(&env_file)?;
    let inherited = env::var_os("PATH");
    let windows = request.platform.is_windows();
    let runtime = match descriptor.runtime_env(inherited.as_deref(), windows) {
        Ok(runtime) => runtime,
        Err(err) => {
            return Ok(ExecutionOutcome::user_error(
                err.to_string(),
                json!({
                    "reason": "invalid_env",
                    "env_file": env_file.display().to_string(),
                    "hint": "Rerun `pyrig install` to regenerate env.txt.",
                }),
            ))
        }
    };

    let vars: Map<String, Value> = descriptor
        .iter()
        .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
        .collect();
    let runtime: Map<String, Value> = runtime
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    Ok(ExecutionOutcome::success(
        descriptor.render().trim_end().to_string(),
        json!({
            "passthrough": true,
            "env_file": env_file.display().to_string(),
            "vars": vars,
            "runtime_env": runtime,
        }),
    ))
}
