//! Logical template identifiers.
//!
//! A [`TemplateKey`] is the normalized name of a template: a slash-separated
//! path without the file extension, compared case-sensitively. The same key
//! addresses the template in every source provider, so `pages/home/index`
//! maps to `pages/home/index.html` under the project directory and under the
//! bundled defaults alike.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::constants::DEFAULT_TEMPLATE_EXTENSION;

/// Normalized logical template name.
///
/// Normalization rules:
/// - backslashes become `/`
/// - empty and `.` segments are dropped (so leading `./` and `/` disappear)
/// - one trailing `.<extension>` is stripped (case-insensitive)
///
/// Two names differing only by the trailing extension produce equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateKey(String);

impl TemplateKey {
    /// Normalize `name` into a key, stripping `.{extension}` once.
    pub fn new(name: &str, extension: &str) -> Self {
        let joined = name
            .replace('\\', "/")
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect::<Vec<_>>()
            .join("/");

        Self(strip_extension(&joined, extension).to_string())
    }

    /// Derive a key from a path relative to a provider root.
    ///
    /// Returns `None` when the path does not carry the template extension or
    /// contains components that cannot be part of a key (`..`, roots,
    /// prefixes, non-UTF-8 names).
    pub fn from_relative_path(path: &Path, extension: &str) -> Option<Self> {
        if !has_extension(path, extension) {
            return None;
        }

        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => segments.push(part.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }

        if segments.is_empty() {
            return None;
        }

        Some(Self::new(&segments.join("/"), extension))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relative file path of this key for the given extension.
    pub fn to_relative_path(&self, extension: &str) -> PathBuf {
        self.file_name(extension).split('/').collect()
    }

    /// File name form of the key (`a/b/c.html`), always with `/` separators.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }

    /// Whether the key stays inside its provider root.
    ///
    /// Keys containing `..` segments are never resolved from disk.
    pub fn is_contained(&self) -> bool {
        !self.0.is_empty() && self.0.split('/').all(|segment| segment != "..")
    }

    /// Whether the key lives under `prefix/` (e.g. `components`).
    pub fn is_under(&self, prefix: &str) -> bool {
        self.0
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Final path segment of the key.
    pub fn base_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TemplateKey {
    fn from(name: &str) -> Self {
        Self::new(name, DEFAULT_TEMPLATE_EXTENSION)
    }
}

impl AsRef<str> for TemplateKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Check whether `path` ends in `.{extension}` (case-insensitive).
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

fn strip_extension<'a>(name: &'a str, extension: &str) -> &'a str {
    let suffix_len = extension.len() + 1;
    if name.len() <= suffix_len {
        return name;
    }

    let (stem, suffix) = name.split_at(name.len() - suffix_len);
    if suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(extension) {
        stem
    } else {
        name
    }
}
