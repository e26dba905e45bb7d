use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use anyhow::{Context, Result};
use tracing::debug;

use crate::errors::ProvisionError;

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// A child process with an explicit environment overlay.
#[derive(Debug, Clone)]
pub(crate) struct ToolCommand<'a> {
    program: &'a Path,
    args: Vec<&'a OsStr>,
    envs: &'a [(String, String)],
    cwd: Option<&'a Path>,
}

impl<'a> ToolCommand<'a> {
    pub(crate) fn new(program: &'a Path) -> Self {
        Self {
            program,
            args: Vec::new(),
            envs: &[],
            cwd: None,
        }
    }

    pub(crate) fn arg(mut self, arg: &'a (impl AsRef<OsStr> + ?Sized)) -> Self {
        self.args.push(arg.as_ref());
        self
    }

    pub(crate) fn args<S: AsRef<OsStr> + 'a>(mut self, args: &'a [S]) -> Self {
        self.args.extend(args.iter().map(AsRef::as_ref));
        self
    }

    pub(crate) fn envs(mut self, envs: &'a [(String, String)]) -> Self {
        self.envs = envs;
        self
    }

    pub(crate) fn current_dir(mut self, cwd: &'a Path) -> Self {
        self.cwd = Some(cwd);
        self
    }

    fn label(&self) -> String {
        self.program
            .file_name()
            .map_or_else(|| self.program.display().to_string(), |name| {
                name.to_string_lossy().into_owned()
            })
    }

    fn command(&self) -> Command {
        let mut command = Command::new(self.program);
        command.args(&self.args);
        command.envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(cwd) = self.cwd {
            command.current_dir(cwd);
        }
        command.stdin(Stdio::null());
        command
    }

    /// Run to completion and capture both streams.
    ///
    /// # Errors
    /// Fails when the program cannot be spawned or exits unsuccessfully.
    pub(crate) fn output(&self) -> Result<RunOutput> {
        debug!(program = %self.program.display(), args = ?self.args, "running");
        let output = self
            .command()
            .output()
            .with_context(|| format!("failed to start {}", self.program.display()))?;
        let run = RunOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        self.check(output.status, &run.stderr)?;
        Ok(run)
    }

    /// Run with stdout/stderr attached to the terminal.
    ///
    /// # Errors
    /// Fails when the program cannot be spawned or exits unsuccessfully.
    pub(crate) fn status(&self) -> Result<()> {
        debug!(program = %self.program.display(), args = ?self.args, "running (inherited output)");
        let status = self
            .command()
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("failed to start {}", self.program.display()))?;
        Ok(self.check(status, "")?)
    }

    fn check(&self, status: ExitStatus, stderr: &str) -> Result<(), ProvisionError> {
        if status.success() {
            return Ok(());
        }
        Err(ProvisionError::ExternalTool {
            tool: self.label(),
            status: status.to_string(),
            stderr: stderr.to_string(),
        })
    }
}

/// Resolve a tool on `PATH`.
///
/// # Errors
/// Returns an external-tool error when the tool is not installed.
pub(crate) fn locate_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|err| {
        ProvisionError::ExternalTool {
            tool: name.to_string(),
            status: "not found on PATH".to_string(),
            stderr: err.to_string(),
        }
        .into()
    })
}
