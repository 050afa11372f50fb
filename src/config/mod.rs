//! Configuration for the rendering pipeline.
//!
//! Settings come from an optional `hxview.toml` in the project directory or
//! from the programmatic [`ViewEngineBuilder`]; every field has a default, so
//! an empty or missing file is valid.
//!
//! ```toml
//! templates_path = "Templates"
//! extension = "html"
//! hot_reload = true
//! debounce_ms = 50
//! autoescape = true
//! default_layout = "main"
//! layouts = ["main", "admin"]
//! ```
//!
//! # Modules
//!
//! - `builder` - [`ViewEngineBuilder`] and the assembled [`ViewEngine`]
//! - `eject` - copying bundled components into the project tree
//! - `parser` - generic TOML parsing with file context

mod builder;
mod eject;
mod parser;

pub use builder::{ViewEngine, ViewEngineBuilder};
pub use eject::{EjectOutcome, eject_all_components, eject_component};
pub use parser::parse_config;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    CONFIG_FILE_NAME, DEFAULT_DEBOUNCE, DEFAULT_TEMPLATE_EXTENSION, DEFAULT_TEMPLATES_DIR,
};

/// Pipeline settings as stored in `hxview.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewConfig {
    /// Project template root; relative paths are resolved against the project directory
    pub templates_path: PathBuf,
    /// Template file extension, without the dot
    pub extension: String,
    /// Watch the template root and invalidate changed templates
    pub hot_reload: bool,
    /// Quiet period before a burst of changes is flushed
    pub debounce_ms: u64,
    /// HTML-escape expression output
    pub autoescape: bool,
    /// Layout used by `render()`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_layout: Option<String>,
    /// Layouts without side-data providers
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub layouts: Vec<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            templates_path: PathBuf::from(DEFAULT_TEMPLATES_DIR),
            extension: DEFAULT_TEMPLATE_EXTENSION.to_string(),
            hot_reload: false,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            autoescape: true,
            default_layout: None,
            layouts: Vec::new(),
        }
    }
}

impl ViewConfig {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        parse_config(path)
    }

    /// Load `hxview.toml` from `project_dir`, falling back to defaults when
    /// the file does not exist.
    pub fn discover(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            tracing::debug!(path = %path.display(), "Loading configuration");
            Self::load(&path)
        } else {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Absolute template root for `project_dir`.
    pub fn templates_root(&self, project_dir: &Path) -> PathBuf {
        if self.templates_path.is_absolute() {
            self.templates_path.clone()
        } else {
            project_dir.join(&self.templates_path)
        }
    }

    /// Builder preloaded with these settings.
    ///
    /// The default layout is registered even when it is missing from
    /// `layouts`.
    pub fn to_builder(&self, project_dir: &Path) -> ViewEngineBuilder {
        let mut builder = ViewEngineBuilder::new()
            .templates_path(self.templates_root(project_dir))
            .extension(&self.extension)
            .hot_reload(self.hot_reload)
            .debounce(self.debounce())
            .autoescape(self.autoescape);

        for layout in &self.layouts {
            builder = builder.add_layout(layout);
        }
        if let Some(default) = &self.default_layout {
            if !self.layouts.contains(default) {
                builder = builder.add_layout(default);
            }
            builder = builder.default_layout(default);
        }
        builder
    }
}
