//! Test utilities for hxview
//!
//! Helpers shared by unit and integration tests: one-time logging setup and
//! a throwaway project directory with a template tree.
//!
//! # Example
//!
//! ```rust,no_run
//! use hxview::test_utils::TemplateTree;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let tree = TemplateTree::new()?;
//! tree.write("layouts/main", "<html>{{ content | safe }}</html>")?;
//! tree.write("pages/hello", "Hello {{ name }}")?;
//!
//! let engine = tree.builder().add_layout("main").default_layout("main").build()?;
//! # let _ = engine;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::ViewEngineBuilder;
use crate::constants::{DEFAULT_TEMPLATE_EXTENSION, DEFAULT_TEMPLATES_DIR};
use crate::templating::{TemplateKey, TemplateLocator};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; without either, tests run
/// without a subscriber. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=hxview=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_ansi(true)
            .try_init();
    });
}

/// Temporary project with a `Templates/` directory.
///
/// Template names are given without extension; files are written with the
/// default extension. The directory is removed on drop.
pub struct TemplateTree {
    dir: TempDir,
    templates: PathBuf,
}

impl TemplateTree {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("Failed to create temporary project directory")?;
        let templates = dir.path().join(DEFAULT_TEMPLATES_DIR);
        std::fs::create_dir_all(&templates)
            .with_context(|| format!("Failed to create {}", templates.display()))?;
        Ok(Self { dir, templates })
    }

    /// Project directory.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn templates_dir(&self) -> &Path {
        &self.templates
    }

    /// Path of template `name` inside the tree.
    pub fn path(&self, name: &str) -> PathBuf {
        self.templates.join(self.key(name).to_relative_path(DEFAULT_TEMPLATE_EXTENSION))
    }

    pub fn key(&self, name: &str) -> TemplateKey {
        TemplateKey::new(name, DEFAULT_TEMPLATE_EXTENSION)
    }

    /// Create or overwrite template `name`, creating parent directories.
    pub fn write(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.path(name);
        std::fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        let (from, to) = (self.path(from), self.path(to));
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(&from, &to)
            .with_context(|| format!("Failed to rename {} to {}", from.display(), to.display()))
    }

    /// Project directory first, bundled defaults second.
    pub fn locator(&self) -> TemplateLocator {
        TemplateLocator::with_defaults(&self.templates, DEFAULT_TEMPLATE_EXTENSION)
    }

    /// Builder pointed at this tree with hot reload off.
    pub fn builder(&self) -> ViewEngineBuilder {
        ViewEngineBuilder::new()
            .templates_path(&self.templates)
            .hot_reload(false)
    }
}
