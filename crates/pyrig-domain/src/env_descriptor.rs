//! The persisted `KEY=VALUE` record handed from provisioning to later
//! invocations.
//!
//! The file format has no quoting or escaping. Keys may not contain `=`,
//! and neither keys nor values may contain a line break; such entries are
//! rejected on insert rather than written in a form that would not parse
//! back.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use thiserror::Error;

use crate::layout::python_bin_dir;

pub const ENV_FILE_NAME: &str = "env.txt";

pub const PYTHONPATH: &str = "PYTHONPATH";
pub const PYTHONHOME: &str = "PYTHONHOME";
pub const PATH: &str = "PATH";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvDescriptorError {
    #[error("environment key {0:?} cannot be stored in env.txt")]
    InvalidKey(String),
    #[error("value for {0} contains a line break and cannot be stored in env.txt")]
    InvalidValue(String),
    #[error("{0} is not set in env.txt")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvDescriptor {
    vars: IndexMap<String, String>,
}

impl EnvDescriptor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The record written at the end of provisioning.
    ///
    /// # Errors
    /// Fails if any of the values contains a line break.
    pub fn for_interpreter(
        python_path: &str,
        python_home: &Path,
        python_bin: &Path,
    ) -> Result<Self, EnvDescriptorError> {
        let mut descriptor = Self::new();
        descriptor.insert(PYTHONPATH, python_path.trim())?;
        descriptor.insert(PYTHONHOME, python_home.display().to_string())?;
        descriptor.insert(PATH, python_bin.display().to_string())?;
        Ok(descriptor)
    }

    /// # Errors
    /// Rejects keys that are empty or contain `=`/line breaks, and values
    /// containing line breaks.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), EnvDescriptorError> {
        let key = key.into();
        let value = value.into();
        if key.is_empty() || key.contains(['=', '\n', '\r']) {
            return Err(EnvDescriptorError::InvalidKey(key));
        }
        if value.contains(['\n', '\r']) {
            return Err(EnvDescriptorError::InvalidValue(key));
        }
        self.vars.insert(key, value);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.vars {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        out
    }

    /// Parse the file format. Lines without `=` are ignored; values keep
    /// everything after the first `=`.
    #[must_use]
    pub fn parse(contents: &str) -> Self {
        let vars = contents
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter_map(|line| line.split_once('='))
            .filter(|(key, _)| !key.trim().is_empty())
            .map(|(key, value)| (key.trim().to_string(), value.to_string()))
            .collect();
        Self { vars }
    }

    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read env file {}", path.display()))?;
        Ok(Self::parse(&contents))
    }

    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(path, self.render())
            .with_context(|| format!("failed to write env file {}", path.display()))
    }

    /// Variables a child process needs to run the provisioned interpreter:
    /// every stored entry, with `PATH` replaced by the interpreter bin
    /// directory prepended to `inherited_path`.
    ///
    /// # Errors
    /// Fails when `PYTHONHOME` or `PYTHONPATH` is absent.
    pub fn runtime_env(
        &self,
        inherited_path: Option<&OsStr>,
        windows: bool,
    ) -> Result<IndexMap<String, String>, EnvDescriptorError> {
        let home = self
            .get(PYTHONHOME)
            .ok_or(EnvDescriptorError::Missing(PYTHONHOME))?;
        if self.get(PYTHONPATH).is_none() {
            return Err(EnvDescriptorError::Missing(PYTHONPATH));
        }
        let bin = python_bin_dir(Path::new(home), windows);
        let separator = if windows { ';' } else { ':' };
        let mut path = bin.display().to_string();
        if let Some(inherited) = inherited_path.filter(|value| !value.is_empty()) {
            path.push(separator);
            path.push_str(&inherited.to_string_lossy());
        }
        let mut env = self.vars.clone();
        env.insert(PATH.to_string(), path);
        Ok(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn interpreter_record_keeps_insertion_order() -> Result<()> {
        let descriptor = EnvDescriptor::for_interpreter(
            "  /p/lib/python3.13:/p/lib/python3.13/site-packages\n",
            Path::new("/p"),
            Path::new("/p/bin"),
        )?;
        assert_eq!(
            descriptor.render(),
            "PYTHONPATH=/p/lib/python3.13:/p/lib/python3.13/site-packages\nPYTHONHOME=/p\nPATH=/p/bin\n"
        );
        Ok(())
    }

    #[test]
    fn parse_splits_on_first_equals_and_skips_noise() {
        let descriptor = EnvDescriptor::parse("A=1\r\nB=x=y\n\nnot a pair\n=orphan\nC=\n");
        assert_eq!(descriptor.get("A"), Some("1"));
        assert_eq!(descriptor.get("B"), Some("x=y"));
        assert_eq!(descriptor.get("C"), Some(""));
        assert_eq!(descriptor.len(), 3);
    }

    #[test]
    fn values_with_line_breaks_are_rejected() {
        let mut descriptor = EnvDescriptor::new();
        assert_eq!(
            descriptor.insert("A", "one\ntwo"),
            Err(EnvDescriptorError::InvalidValue("A".to_string()))
        );
        assert!(matches!(
            descriptor.insert("A=B", "x"),
            Err(EnvDescriptorError::InvalidKey(_))
        ));
        assert!(descriptor.is_empty());
    }

    #[test]
    fn file_round_trip() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join(".deps").join(ENV_FILE_NAME);
        let mut descriptor = EnvDescriptor::new();
        descriptor.insert(PYTHONHOME, "/srv/py")?;
        descriptor.insert(PYTHONPATH, "/srv/py/lib")?;
        descriptor.write(&path)?;
        assert_eq!(EnvDescriptor::read(&path)?, descriptor);
        Ok(())
    }

    #[test]
    fn runtime_env_prepends_interpreter_bin() -> Result<()> {
        let descriptor =
            EnvDescriptor::parse("PYTHONPATH=/srv/py/lib\nPYTHONHOME=/srv/py\nPATH=/srv/py/bin\n");
        let env = descriptor.runtime_env(Some(OsStr::new("/usr/bin")), false)?;
        let expected = format!("{}:/usr/bin", PathBuf::from("/srv/py").join("bin").display());
        assert_eq!(env.get(PATH).map(String::as_str), Some(expected.as_str()));
        assert_eq!(env.get(PYTHONHOME).map(String::as_str), Some("/srv/py"));

        let windows = descriptor.runtime_env(None, true)?;
        assert_eq!(windows.get(PATH).map(String::as_str), Some("/srv/py"));
        Ok(())
    }

    #[test]
    fn runtime_env_requires_home_and_path() {
        let missing_home = EnvDescriptor::parse("PYTHONPATH=/x\n");
        assert_eq!(
            missing_home.runtime_env(None, false),
            Err(EnvDescriptorError::Missing(PYTHONHOME))
        );
        let missing_path = EnvDescriptor::parse("PYTHONHOME=/x\n");
        assert_eq!(
            missing_path.runtime_env(None, false),
            Err(EnvDescriptorError::Missing(PYTHONPATH))
        );
    }
}
