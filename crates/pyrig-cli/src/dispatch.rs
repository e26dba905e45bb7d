use color_eyre::Result;
use pyrig_core::{
    self, CachePathRequest, CommandContext, CommandGroup, CommandInfo, EnvRequest,
    ExecutionOutcome, ProvisionRequest, ResolveRequest,
};
use tracing::debug;

use crate::cli::{CacheCommand, CommandGroupCli, InstallArgs};

pub fn dispatch_command(
    ctx: &CommandContext,
    group: &CommandGroupCli,
) -> Result<(CommandInfo, ExecutionOutcome)> {
    match group {
        CommandGroupCli::Install(args) => {
            let info = CommandInfo::new(CommandGroup::Install, "install");
            let request = install_request_from_args(args);
            core_call(info, || pyrig_core::install(ctx, &request))
        }
        CommandGroupCli::Env(args) => {
            let info = CommandInfo::new(CommandGroup::Env, "env");
            let request = EnvRequest {
                project_root: args.path.clone(),
                platform: args.platform.platform(),
            };
            core_call(info, || pyrig_core::show_env(ctx, &request))
        }
        CommandGroupCli::Resolve(args) => {
            let info = CommandInfo::new(CommandGroup::Resolve, "resolve");
            let request = ResolveRequest {
                component: args.component.into(),
                versions: args.versions.versions(),
                variant: args.variant.variant(),
                platform: args.platform.platform(),
            };
            core_call(info, || pyrig_core::resolve_component(ctx, &request))
        }
        CommandGroupCli::Cache(CacheCommand::Path) => {
            let info = CommandInfo::new(CommandGroup::Cache, "path");
            core_call(info, || pyrig_core::cache_path(ctx, CachePathRequest))
        }
    }
}

fn install_request_from_args(args: &InstallArgs) -> ProvisionRequest {
    let mut request = ProvisionRequest::new(&args.path);
    request.versions = args.versions.versions();
    request.variant = args.variant.variant();
    request.platform = args.platform.platform();
    if args.no_go_packages {
        request.go_packages.clear();
    } else if !args.go_packages.is_empty() {
        request.go_packages.clone_from(&args.go_packages);
    }
    request
}

fn core_call<F>(info: CommandInfo, action: F) -> Result<(CommandInfo, ExecutionOutcome)>
where
    F: FnOnce() -> anyhow::Result<ExecutionOutcome>,
{
    match action() {
        Ok(outcome) => Ok((info, outcome)),
        Err(err) => {
            debug!(error = ?err, "command failed");
            Ok((info, pyrig_core::outcome_from_error(&err)))
        }
    }
}
