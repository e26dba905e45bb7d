use serde_json::{json, Value};

use crate::config::context::CommandInfo;
use crate::errors::provision_error;
use crate::outcome::{CommandStatus, ExecutionOutcome};

/// The `--json` envelope.
#[must_use]
pub fn to_json_response(info: CommandInfo, outcome: &ExecutionOutcome) -> Value {
    let status = match outcome.status {
        CommandStatus::Ok => "ok",
        CommandStatus::UserError => "user-error",
        CommandStatus::Failure => "error",
    };
    let details = match &outcome.details {
        Value::Object(_) => outcome.details.clone(),
        Value::Null => json!({}),
        other => json!({ "value": other }),
    };
    json!({
        "status": status,
        "message": format_status_message(info, &outcome.message),
        "details": details,
    })
}

#[must_use]
pub fn format_status_message(info: CommandInfo, message: &str) -> String {
    let group_name = info.group.to_string();
    let prefix = if group_name == info.name {
        format!("pyrig {}", info.name)
    } else {
        format!("pyrig {} {}", group_name, info.name)
    };
    if message.is_empty() {
        prefix
    } else if message.starts_with(&prefix) {
        message.to_string()
    } else {
        format!("{prefix}: {message}")
    }
}

/// Turn an engine error into the outcome the CLI reports.
///
/// Unsupported targets are the caller's problem; everything else is a
/// failure carrying the full context chain.
#[must_use]
pub fn outcome_from_error(err: &anyhow::Error) -> ExecutionOutcome {
    let issues: Vec<String> = err.chain().map(ToString::to_string).collect();
    let message = format!("{err:#}");
    match provision_error(err) {
        Some(cause) if cause.is_user_error() => ExecutionOutcome::user_error(
            message,
            json!({
                "reason": "unsupported_platform",
                "error": cause.to_string(),
                "hint": "Pass --os/--arch for a supported target (linux, darwin, windows on amd64, arm64 or 386).",
                "issues": issues,
            }),
        ),
        cause => ExecutionOutcome::failure(
            message,
            json!({
                "reason": cause.map_or("internal_error", reason_code),
                "error": cause.map_or_else(|| err.to_string(), ToString::to_string),
                "issues": issues,
            }),
        ),
    }
}

fn reason_code(cause: &crate::errors::ProvisionError) -> &'static str {
    use crate::errors::ProvisionError;

    match cause {
        ProvisionError::UnsupportedPlatform(_) => "unsupported_platform",
        ProvisionError::Transport { .. } => "transport",
        ProvisionError::HttpStatus { .. } => "http_status",
        ProvisionError::UnsupportedArchive { .. } => "unsupported_archive",
        ProvisionError::ArchiveCorrupt { .. } => "archive_corrupt",
        ProvisionError::Filesystem { .. } => "filesystem",
        ProvisionError::ExternalTool { .. } => "external_tool",
        ProvisionError::InterpreterNotFound { .. } => "interpreter_not_found",
    }
}
