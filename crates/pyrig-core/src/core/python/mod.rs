//! Locating and driving the interpreter inside an extracted runtime.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pyrig_domain::layout::python_bin_dir;
use serde::Serialize;
use tracing::debug;

use crate::errors::ProvisionError;
use crate::process::ToolCommand;

const PROBE_SCRIPT: &str = "import sys, sysconfig\n\
print(f'{sys.version_info.major}.{sys.version_info.minor}')\n\
print(bool(sysconfig.get_config_var('Py_GIL_DISABLED')))\n";

const SYS_PATH_SCRIPT: &str = "import os,sys; print(os.pathsep.join(sys.path))";

/// What the Windows descriptor generator needs to know about a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterpreterInfo {
    /// `major.minor`
    pub version: String,
    pub free_threaded: bool,
}

impl InterpreterInfo {
    /// Parse the two lines printed by the probe script.
    ///
    /// # Errors
    /// Fails when the output is not exactly a version line and a boolean line.
    pub fn parse(output: &str) -> Result<Self, ProvisionError> {
        let lines: Vec<&str> = output.trim().lines().map(str::trim).collect();
        match lines.as_slice() {
            [version, flag] if !version.is_empty() => Ok(Self {
                version: (*version).to_string(),
                free_threaded: *flag == "True",
            }),
            _ => Err(ProvisionError::ExternalTool {
                tool: "python".to_string(),
                status: "unexpected probe output".to_string(),
                stderr: output.to_string(),
            }),
        }
    }
}

/// An extracted interpreter rooted at `root`.
#[derive(Debug, Clone)]
pub struct PythonEnv {
    root: PathBuf,
    windows: bool,
    envs: Vec<(String, String)>,
}

impl PythonEnv {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, windows: bool) -> Self {
        Self {
            root: root.into(),
            windows,
            envs: Vec::new(),
        }
    }

    /// Extra variables for every child process started from this env.
    #[must_use]
    pub fn with_envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.envs = envs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        python_bin_dir(&self.root, self.windows)
    }

    /// First interpreter-looking file in the bin directory, by name.
    ///
    /// # Errors
    /// Returns [`ProvisionError::InterpreterNotFound`] when nothing matches.
    pub fn python(&self) -> Result<PathBuf> {
        let bin_dir = self.bin_dir();
        let not_found = || ProvisionError::InterpreterNotFound {
            root: self.root.clone(),
        };
        let entries = match fs::read_dir(&bin_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(not_found().into()),
            Err(err) => return Err(ProvisionError::filesystem("read", &bin_dir, err).into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| ProvisionError::filesystem("read", &bin_dir, err))?;
            if entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_interpreter_name(name, self.windows) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        names
            .first()
            .map(|name| bin_dir.join(name))
            .ok_or_else(|| not_found().into())
    }

    /// Run the interpreter and return its trimmed stdout.
    ///
    /// # Errors
    /// Fails when the interpreter is missing or exits unsuccessfully.
    pub fn run_python(&self, args: &[&str]) -> Result<String> {
        let python = self.python()?;
        let output = ToolCommand::new(&python)
            .args(args)
            .envs(&self.envs)
            .output()?;
        Ok(output.stdout.trim().to_string())
    }

    /// `python -m pip <args>` with output streamed to the terminal.
    ///
    /// # Errors
    /// Fails when pip exits unsuccessfully.
    pub fn run_pip(&self, args: &[&str]) -> Result<()> {
        let python = self.python()?;
        let mut full = vec!["-m", "pip"];
        full.extend_from_slice(args);
        debug!(args = ?full, "running pip");
        ToolCommand::new(&python).args(&full).envs(&self.envs).status()
    }

    /// # Errors
    /// Fails when the interpreter cannot be run or prints something unexpected.
    pub fn probe(&self) -> Result<InterpreterInfo> {
        let output = self
            .run_python(&["-c", PROBE_SCRIPT])
            .context("failed to get Python info")?;
        Ok(InterpreterInfo::parse(&output)?)
    }

    /// `sys.path` joined with the platform path separator.
    ///
    /// # Errors
    /// Fails when the interpreter cannot be run.
    pub fn sys_path(&self) -> Result<String> {
        self.run_python(&["-c", SYS_PATH_SCRIPT])
            .context("failed to get Python path")
    }

    /// # Errors
    /// Fails when the interpreter cannot be run.
    pub fn version(&self) -> Result<String> {
        self.run_python(&["--version"])
    }
}

/// `python`, optional `3`, digits and dots, optional `t`, plus `.exe` on
/// Windows.
#[must_use]
pub fn is_interpreter_name(name: &str, windows: bool) -> bool {
    let name = if windows {
        name.strip_suffix(".exe").unwrap_or(name)
    } else {
        name
    };
    let Some(rest) = name.strip_prefix("python") else {
        return false;
    };
    let rest = rest.strip_suffix('t').unwrap_or(rest);
    rest.bytes().all(|b| b.is_ascii_digit() || b == b'.')
}
