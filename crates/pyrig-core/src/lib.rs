#![deny(clippy::all)]

//! The pyrig provisioning engine: download cache, archive extraction,
//! artifact patching and the orchestrator that ties them together.

mod core;

pub(crate) use crate::core::tooling::outcome;
pub(crate) use crate::core::{
    archive, config, errors, net, patch, process, provision, python, store,
};

pub use crate::core::archive::{
    format_for_path, open_archive, ArchiveEntry, ArchiveExtractor, ArchiveStream, EntryKind,
    EntrySink, ExtractionPlan, ExtractionSummary,
};
pub use crate::core::commands::{
    cache_path, install, resolve_component, show_env, CachePathRequest, EnvRequest,
    ResolveRequest,
};
pub use crate::core::config::context::{CommandContext, CommandGroup, CommandInfo};
pub use crate::core::config::{CacheConfig, Config, GlobalOptions, NetworkConfig};
pub use crate::core::errors::{provision_error, ProvisionError};
pub use crate::core::net::build_http_client;
pub use crate::core::patch::{ArtifactPatcher, LinkEditor, SystemLinkEditor};
pub use crate::core::process::RunOutput;
pub use crate::core::provision::{
    plan_artifacts, ComponentReport, ProvisionReport, ProvisionRequest, Provisioner,
    DEFAULT_GO_PACKAGE,
};
pub use crate::core::python::{InterpreterInfo, PythonEnv};
pub use crate::core::store::{cache_file_name, CacheEntry, CacheLocation, ContentCache};
pub use crate::core::tooling::outcome::{CommandStatus, ExecutionOutcome};
pub use crate::core::tooling::{format_status_message, outcome_from_error, to_json_response};

pub const PYRIG_VERSION: &str = env!("CARGO_PKG_VERSION");
