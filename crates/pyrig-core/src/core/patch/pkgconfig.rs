use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, trace};

use crate::errors::ProvisionError;
use crate::python::InterpreterInfo;

/// Prefix baked into python-build-standalone descriptors.
pub const INSTALL_PREFIX: &str = "prefix=/install";

/// `python-X.Y[t][-embed].pc`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionedDescriptor<'a> {
    pub version: &'a str,
    pub free_threaded: bool,
    pub embed: bool,
}

impl<'a> VersionedDescriptor<'a> {
    #[must_use]
    pub fn parse(name: &'a str) -> Option<Self> {
        let rest = name.strip_prefix("python-")?;
        let (rest, embed) = match rest.strip_suffix("-embed.pc") {
            Some(rest) => (rest, true),
            None => (rest.strip_suffix(".pc")?, false),
        };
        let (version, free_threaded) = match rest.strip_suffix('t') {
            Some(version) => (version, true),
            None => (rest, false),
        };
        let (major, minor) = version.split_once('.')?;
        if !is_digits(major) || !is_digits(minor) {
            return None;
        }
        Some(Self {
            version,
            free_threaded,
            embed,
        })
    }

    fn suffix(self) -> &'static str {
        if self.embed {
            "-embed.pc"
        } else {
            ".pc"
        }
    }

    /// `python-X.Y[-embed].pc`, without the thread-model marker.
    fn plain_name(self) -> String {
        format!("python-{}{}", self.version, self.suffix())
    }

    fn aliases(self, originals: &BTreeSet<String>) -> Vec<String> {
        let suffix = self.suffix();
        if !self.free_threaded {
            return vec![format!("python3{suffix}")];
        }
        let mut aliases = vec![format!("python3t{suffix}")];
        // A real GIL build shipped alongside keeps its own unsuffixed names.
        if !originals.contains(&self.plain_name()) {
            aliases.push(format!("python3{suffix}"));
            aliases.push(self.plain_name());
        }
        aliases
    }
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Rewrite every `.pc` file under `pkgconfig_dir` to point at `runtime_root`
/// and add the `python3*` aliases build tools look for.
///
/// Returns every file written, originals first.
///
/// # Errors
/// Fails when the directory is missing or any file cannot be rewritten.
pub fn rewrite_descriptors(pkgconfig_dir: &Path, runtime_root: &Path) -> Result<Vec<PathBuf>> {
    let abs_root = std::path::absolute(runtime_root)
        .map_err(|err| ProvisionError::filesystem("resolve", runtime_root, err))?;
    let replacement = format!("prefix={}", abs_root.display());

    let originals = descriptor_names(pkgconfig_dir)?;
    let mut written = Vec::new();
    let mut aliases = Vec::new();
    for name in &originals {
        let path = pkgconfig_dir.join(name);
        let content = fs::read_to_string(&path)
            .map_err(|err| ProvisionError::filesystem("read", &path, err))?;
        let content = content.replace(INSTALL_PREFIX, &replacement);
        write_descriptor(&path, &content)?;
        written.push(path);

        if let Some(descriptor) = VersionedDescriptor::parse(name) {
            for alias in descriptor.aliases(&originals) {
                aliases.push((alias, content.clone()));
            }
        }
    }
    for (alias, content) in aliases {
        let path = pkgconfig_dir.join(&alias);
        trace!(alias = %alias, "writing pkg-config alias");
        write_descriptor(&path, &content)?;
        if !written.contains(&path) {
            written.push(path);
        }
    }
    debug!(dir = %pkgconfig_dir.display(), files = written.len(), "rewrote pkg-config files");
    Ok(written)
}

fn descriptor_names(dir: &Path) -> Result<BTreeSet<String>> {
    let entries = fs::read_dir(dir).map_err(|err| ProvisionError::filesystem("read", dir, err))?;
    let mut names = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|err| ProvisionError::filesystem("read", dir, err))?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.ends_with(".pc") {
            names.insert(name);
        }
    }
    Ok(names)
}

fn write_descriptor(path: &Path, content: &str) -> Result<(), ProvisionError> {
    fs::write(path, content).map_err(|err| ProvisionError::filesystem("write", path, err))
}

fn embed_descriptor(version: &str, lib: &str) -> String {
    format!(
        "prefix=${{pcfiledir}}/../..\n\
         exec_prefix=${{prefix}}\n\
         libdir=${{exec_prefix}}\n\
         includedir=${{prefix}}/include\n\
         \n\
         Name: Python\n\
         Description: Embed Python into an application\n\
         Requires:\n\
         Version: {version}\n\
         Libs.private:\n\
         Libs: -L${{libdir}} -l{lib}\n\
         Cflags: -I${{includedir}}\n"
    )
}

fn library_descriptor(version: &str, lib: &str) -> String {
    format!(
        "prefix=${{pcfiledir}}/../..\n\
         exec_prefix=${{prefix}}\n\
         libdir=${{exec_prefix}}\n\
         includedir=${{prefix}}/include\n\
         \n\
         Name: Python\n\
         Description: Python library\n\
         Requires:\n\
         Version: {version}\n\
         Libs.private:\n\
         Libs: -L${{libdir}} -l{lib}\n\
         Cflags: -I${{includedir}}\n"
    )
}

/// Windows builds ship no `.pc` files; synthesise them relative to the
/// descriptor's own directory.
///
/// # Errors
/// Fails when the directory or a file cannot be written.
pub fn generate_windows_descriptors(
    pkgconfig_dir: &Path,
    interpreter: &InterpreterInfo,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(pkgconfig_dir)
        .map_err(|err| ProvisionError::filesystem("create", pkgconfig_dir, err))?;
    let version = interpreter.version.as_str();
    let t = if interpreter.free_threaded { "t" } else { "" };
    let compact = version.replace('.', "");

    let library = library_descriptor(version, &format!("python3{t}"));
    let embed = embed_descriptor(version, &format!("python{compact}{t}"));

    let mut files = vec![
        (format!("python-{version}{t}.pc"), &library),
        (format!("python-{version}{t}-embed.pc"), &embed),
        (format!("python3{t}.pc"), &library),
        (format!("python3{t}-embed.pc"), &embed),
    ];
    if interpreter.free_threaded {
        files.extend([
            (format!("python-{version}.pc"), &library),
            (format!("python-{version}-embed.pc"), &embed),
            ("python3.pc".to_string(), &library),
            ("python3-embed.pc".to_string(), &embed),
        ]);
    }

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = pkgconfig_dir.join(name);
        write_descriptor(&path, content)?;
        written.push(path);
    }
    debug!(dir = %pkgconfig_dir.display(), files = written.len(), "generated pkg-config files");
    Ok(written)
}
