use std::path::{Path, PathBuf};

use pyrig_domain::ArchiveFormat;

/// Root folder that Go-style zip and gzip-tar archives wrap around their
/// content.
pub const LEGACY_ROOT_ALIAS: &str = "go";

/// How archive entry names map onto the destination tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionPlan {
    pub destination_root: PathBuf,
    /// Entries outside this prefix are skipped; empty disables the filter.
    pub prefix_to_strip: String,
    /// A single root segment dropped from every entry, with the segment's
    /// own entry skipped.
    pub root_alias: Option<String>,
}

impl ExtractionPlan {
    pub fn new(destination_root: impl Into<PathBuf>) -> Self {
        Self {
            destination_root: destination_root.into(),
            prefix_to_strip: String::new(),
            root_alias: None,
        }
    }

    /// The plan used for downloaded toolchains: zip and gzip-tar archives
    /// get the legacy root alias, every format gets `prefix`.
    pub fn for_format(
        destination_root: impl Into<PathBuf>,
        format: ArchiveFormat,
        prefix: &str,
    ) -> Self {
        let plan = Self::new(destination_root).with_prefix(prefix);
        if format.has_root_alias() {
            plan.with_root_alias(LEGACY_ROOT_ALIAS)
        } else {
            plan
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix_to_strip = normalize(prefix).trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_root_alias(mut self, alias: &str) -> Self {
        let alias = normalize(alias).trim_end_matches('/').to_string();
        self.root_alias = (!alias.is_empty()).then_some(alias);
        self
    }

    /// Relative destination for an entry, or `None` when the entry is
    /// skipped.
    ///
    /// # Errors
    /// Names that would escape the destination (`..`) are rejected.
    pub fn remap(&self, name: &str) -> Result<Option<PathBuf>, String> {
        let name = normalize(name);
        let name = match self.strip_alias(&name) {
            Some(rest) => rest,
            None => return Ok(None),
        };
        let rest = if self.prefix_to_strip.is_empty() {
            name
        } else {
            match strip_segment_prefix(name, &self.prefix_to_strip) {
                Some(rest) => rest,
                None => return Ok(None),
            }
        };
        let relative = checked_relative(rest)?;
        Ok((!relative.as_os_str().is_empty()).then_some(relative))
    }

    /// Absolute location a hard link should point at.
    ///
    /// The recorded target carries the same install-root prefix as entry
    /// names; it is stripped when present and the remainder is joined under
    /// the destination.
    ///
    /// # Errors
    /// Targets that are empty or escape the destination are rejected.
    pub fn retarget_link(&self, target: &str) -> Result<PathBuf, String> {
        let target = normalize(target);
        let target = self.strip_alias(&target).unwrap_or(&target);
        let rest = if self.prefix_to_strip.is_empty() {
            target
        } else {
            strip_segment_prefix(target, &self.prefix_to_strip).unwrap_or(target)
        };
        let relative = checked_relative(rest)?;
        if relative.as_os_str().is_empty() {
            return Err(format!("hard link target {target:?} is empty"));
        }
        Ok(self.destination_root.join(relative))
    }

    #[must_use]
    pub fn destination(&self, relative: &Path) -> PathBuf {
        self.destination_root.join(relative)
    }

    /// `None` means the entry is the alias folder itself.
    fn strip_alias<'a>(&self, name: &'a str) -> Option<&'a str> {
        let Some(alias) = self.root_alias.as_deref() else {
            return Some(name);
        };
        if name.trim_end_matches('/') == alias {
            return None;
        }
        Some(
            name.strip_prefix(alias)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(name),
        )
    }
}

/// Forward slashes, no leading `./` or `/`.
fn normalize(name: &str) -> String {
    let mut name = name.replace('\\', "/");
    loop {
        if let Some(rest) = name.strip_prefix("./") {
            name = rest.to_string();
        } else if let Some(rest) = name.strip_prefix('/') {
            name = rest.to_string();
        } else {
            break;
        }
    }
    name
}

/// Strip `prefix` only when it ends on a path segment boundary.
fn strip_segment_prefix<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = name.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix('/')
    }
}

fn checked_relative(rest: &str) -> Result<PathBuf, String> {
    let mut relative = PathBuf::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(format!("entry {rest:?} escapes the destination")),
            segment if segment.contains(':') && cfg!(windows) => {
                return Err(format!("entry {rest:?} is not a relative path"));
            }
            segment => relative.push(segment),
        }
    }
    Ok(relative)
}
