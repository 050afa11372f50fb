//! Command-line interface for hxview.
//!
//! A developer tool around the rendering pipeline: render a template the way
//! the application would, inspect which provider serves each template, eject
//! bundled components for customization, and watch the template tree.
//!
//! # Available Commands
//!
//! - `render` - Render a template, full page or fragment, to stdout
//! - `list` - List available templates and the provider that serves each
//! - `eject` - Copy bundled components into the project template directory
//! - `watch` - Watch the template directory and report invalidations
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug logging
//! - `--quiet` - Only log errors
//! - `--config <FILE>` - Configuration file (default: `<project>/hxview.toml`)
//! - `--project <DIR>` - Project directory (default: current directory)
//!
//! ```bash
//! hxview render pages/index --model model.json
//! hxview render pages/users --fragment --path /users
//! hxview list --provider bundled
//! hxview eject alert badge
//! hxview --verbose watch
//! ```

mod eject;
mod list;
mod render;
mod watch;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::{ViewConfig, ViewEngineBuilder};
use crate::constants::LAYOUTS_PREFIX;

/// Main CLI application structure.
#[derive(Parser)]
#[command(
    name = "hxview",
    about = "Render, inspect and hot-reload server-side templates for HTMX apps",
    version,
    long_about = "hxview resolves templates from a project directory with bundled fallbacks, \
                  renders them as full pages or HTMX fragments, and watches the template tree for changes."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, value_name = "FILE", env = "HXVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// Project directory containing the template root
    #[arg(short, long, global = true, value_name = "DIR", default_value = ".")]
    project: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template to stdout.
    Render(render::RenderCommand),

    /// List available templates and the provider serving each one.
    List(list::ListCommand),

    /// Copy bundled components into the project template directory.
    Eject(eject::EjectCommand),

    /// Watch the template directory and report invalidated templates.
    Watch(watch::WatchCommand),
}

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub project_dir: PathBuf,
    pub config: ViewConfig,
}

impl CommandContext {
    /// Load the configuration for `project_dir`, from `config_path` when given.
    pub fn load(project_dir: &Path, config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => ViewConfig::load(path)?,
            None => ViewConfig::discover(project_dir)?,
        };

        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            config,
        })
    }

    pub fn templates_root(&self) -> PathBuf {
        self.config.templates_root(&self.project_dir)
    }

    /// Builder for the configured pipeline.
    ///
    /// Without any configured layout the bundled `base` layout is registered
    /// and used as default, so a fresh project can render right away.
    pub fn engine_builder(&self) -> ViewEngineBuilder {
        let builder = self.config.to_builder(&self.project_dir);
        if self.config.layouts.is_empty() && self.config.default_layout.is_none() {
            builder.add_layout("base").default_layout("base")
        } else {
            builder
        }
    }
}

impl Cli {
    /// Install the tracing subscriber.
    ///
    /// `--verbose` and `--quiet` override `RUST_LOG`; otherwise `RUST_LOG`
    /// applies, defaulting to `info`. Logs go to stderr so rendered output
    /// on stdout stays clean.
    pub fn init_logging(&self) {
        let filter = if self.verbose {
            EnvFilter::new("debug")
        } else if self.quiet {
            EnvFilter::new("error")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Execute the selected command.
    pub async fn execute(self) -> Result<()> {
        let context = CommandContext::load(&self.project, self.config.as_deref())
            .with_context(|| format!("Failed to load configuration for {}", self.project.display()))?;
        tracing::debug!(
            project = %context.project_dir.display(),
            templates = %context.templates_root().display(),
            "Loaded configuration"
        );

        match self.command {
            Commands::Render(cmd) => cmd.execute(&context).await,
            Commands::List(cmd) => cmd.execute(&context),
            Commands::Eject(cmd) => cmd.execute(&context).await,
            Commands::Watch(cmd) => cmd.execute(&context).await,
        }
    }
}

/// Layout ids found in the templates, used for error hints.
pub(crate) fn known_layouts(context: &CommandContext) -> Vec<String> {
    let locator = crate::templating::TemplateLocator::with_defaults(
        context.templates_root(),
        &context.config.extension,
    );
    locator
        .list()
        .map(|listing| {
            listing
                .keys()
                .filter(|key| key.is_under(LAYOUTS_PREFIX))
                .map(|key| key.base_name().to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["hxview", "list", "--verbose", "--project", "/srv/app"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.project, PathBuf::from("/srv/app"));
        assert!(matches!(cli.command, Commands::List(_)));
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["hxview", "--verbose", "--quiet", "list"]).is_err());
    }

    #[test]
    fn test_context_defaults_to_bundled_base_layout() {
        let temp = TempDir::new().unwrap();
        let context = CommandContext::load(temp.path(), None).unwrap();
        assert_eq!(context.templates_root(), temp.path().join("Templates"));

        let builder = context.engine_builder();
        assert!(builder.validate().is_ok());
    }

    #[test]
    fn test_known_layouts_include_bundled_base() {
        let temp = TempDir::new().unwrap();
        let context = CommandContext::load(temp.path(), None).unwrap();
        assert_eq!(known_layouts(&context), vec!["base".to_string()]);
    }
}
