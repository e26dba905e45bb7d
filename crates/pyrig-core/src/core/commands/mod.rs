//! Command handlers behind the CLI; each returns an [`ExecutionOutcome`].
//!
//! [`ExecutionOutcome`]: crate::ExecutionOutcome

mod cache;
mod env;
mod install;
mod resolve;

pub use cache::{cache_path, CachePathRequest};
pub use env::{show_env, EnvRequest};
pub use install::install;
pub use resolve::{resolve_component, ResolveRequest};
