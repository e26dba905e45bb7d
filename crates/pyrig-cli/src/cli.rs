use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use pyrig_domain::component::{
    DEFAULT_GO_VERSION, DEFAULT_PYTHON_BUILD_DATE, DEFAULT_PYTHON_VERSION,
    DEFAULT_TINY_PKG_CONFIG_VERSION,
};
use pyrig_domain::{ComponentKind, ComponentVersions, TargetPlatform, VariantFlags};

pub const PYRIG_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nGlobal options:\n{options}\n";

pub const PYRIG_BEFORE_HELP: &str = concat!(
    "pyrig ",
    env!("CARGO_PKG_VERSION"),
    " – Project-local Go + Python toolchains\n\n",
    "\x1b[1;36mCommands\x1b[0m\n",
    "  install          Download and unpack the toolchain into .deps/, then write .deps/env.txt.\n",
    "  env              Print the interpreter environment recorded in .deps/env.txt.\n",
    "  resolve          Show the download URL for one component without fetching it.\n",
    "  cache path       Show the download cache directory.\n",
);

#[derive(Parser, Debug)]
#[command(
    name = "pyrig",
    author,
    version,
    propagate_version = false,
    disable_help_subcommand = true,
    before_help = PYRIG_BEFORE_HELP,
    help_template = PYRIG_HELP_TEMPLATE
)]
#[allow(clippy::struct_excessive_bools)]
pub struct PyrigCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(
        about = "Install Go, CPython and pkg-config into <PATH>/.deps and write env.txt.",
        override_usage = "pyrig install [PATH] [--python-version VERSION] [--free-threaded]"
    )]
    Install(InstallArgs),
    #[command(
        about = "Print the variables recorded in .deps/env.txt.",
        override_usage = "pyrig env [PATH]"
    )]
    Env(EnvArgs),
    #[command(
        about = "Show the download URL and cache slot for one component.",
        override_usage = "pyrig resolve <COMPONENT> [--os OS] [--arch ARCH]"
    )]
    Resolve(ResolveArgs),
    #[command(about = "Inspect the download cache.", subcommand)]
    Cache(CacheCommand),
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    #[command(about = "Print the cache directory (PYRIG_CACHE_PATH or ~/.pyrig/cache).")]
    Path,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PlatformArgs {
    #[arg(
        long,
        value_name = "OS",
        help = "Target operating system (linux, darwin, windows); defaults to the host"
    )]
    pub os: Option<String>,
    #[arg(
        long,
        value_name = "ARCH",
        help = "Target architecture (amd64, arm64, 386); defaults to the host"
    )]
    pub arch: Option<String>,
}

impl PlatformArgs {
    pub fn platform(&self) -> TargetPlatform {
        let host = TargetPlatform::host();
        TargetPlatform::new(
            self.os.clone().unwrap_or(host.os),
            self.arch.clone().unwrap_or(host.arch),
        )
    }
}

#[derive(Args, Debug, Clone)]
pub struct VersionArgs {
    #[arg(long, value_name = "VERSION", default_value = DEFAULT_GO_VERSION)]
    pub go_version: String,
    #[arg(long, value_name = "VERSION", default_value = DEFAULT_PYTHON_VERSION)]
    pub python_version: String,
    #[arg(
        long,
        value_name = "YYYYMMDD",
        default_value = DEFAULT_PYTHON_BUILD_DATE,
        help = "python-build-standalone release tag"
    )]
    pub python_build_date: String,
    #[arg(long, value_name = "VERSION", default_value = DEFAULT_TINY_PKG_CONFIG_VERSION)]
    pub tiny_pkg_config_version: String,
}

impl VersionArgs {
    pub fn versions(&self) -> ComponentVersions {
        ComponentVersions {
            go: self.go_version.clone(),
            python: self.python_version.clone(),
            python_build_date: self.python_build_date.clone(),
            tiny_pkg_config: self.tiny_pkg_config_version.clone(),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct VariantArgs {
    #[arg(long, help = "Use the free-threaded (no GIL) CPython build")]
    pub free_threaded: bool,
    #[arg(long, help = "Use the debug CPython build (ignored on Windows)")]
    pub debug: bool,
    #[arg(long, help = "Request the shared-library CPython build (always on for Windows)")]
    pub shared: bool,
}

impl VariantArgs {
    pub fn variant(&self) -> VariantFlags {
        VariantFlags {
            debug: self.debug,
            free_threaded: self.free_threaded,
            shared: self.shared,
        }
    }
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    #[arg(value_name = "PATH", default_value = ".", help = "Project root")]
    pub path: PathBuf,
    #[command(flatten)]
    pub versions: VersionArgs,
    #[command(flatten)]
    pub variant: VariantArgs,
    #[command(flatten)]
    pub platform: PlatformArgs,
    #[arg(
        long = "go-package",
        value_name = "PACKAGE",
        action = ArgAction::Append,
        help = "Go package for `go get -u` (repeatable; defaults to github.com/gotray/go-python)"
    )]
    pub go_packages: Vec<String>,
    #[arg(
        long,
        conflicts_with = "go_packages",
        help = "Skip `go get` after installing Go"
    )]
    pub no_go_packages: bool,
}

#[derive(Args, Debug)]
pub struct EnvArgs {
    #[arg(value_name = "PATH", default_value = ".", help = "Project root")]
    pub path: PathBuf,
    #[command(flatten)]
    pub platform: PlatformArgs,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    #[arg(value_enum, value_name = "COMPONENT")]
    pub component: ComponentArg,
    #[command(flatten)]
    pub versions: VersionArgs,
    #[command(flatten)]
    pub variant: VariantArgs,
    #[command(flatten)]
    pub platform: PlatformArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentArg {
    #[value(name = "pkg-config", alias = "tiny-pkg-config")]
    PkgConfig,
    Mingw,
    Go,
    #[value(alias = "cpython")]
    Python,
}

impl From<ComponentArg> for ComponentKind {
    fn from(value: ComponentArg) -> Self {
        match value {
            ComponentArg::PkgConfig => ComponentKind::BuildHelper,
            ComponentArg::Mingw => ComponentKind::CompilerToolchain,
            ComponentArg::Go => ComponentKind::LanguageRuntime,
            ComponentArg::Python => ComponentKind::InterpreterRuntime,
        }
    }
}
