//! `hxview watch`: report template invalidations until interrupted.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;

use super::CommandContext;
use crate::templating::{Invalidate, TemplateKey, TemplateWatcher};

/// Watch the template directory and print every template that would be
/// recompiled.
#[derive(Args, Debug)]
pub struct WatchCommand {
    /// Debounce window in milliseconds (default: from configuration)
    #[arg(long, value_name = "MS")]
    debounce_ms: Option<u64>,
}

struct PrintInvalidations;

impl Invalidate for PrintInvalidations {
    fn invalidate(&self, key: &TemplateKey) {
        println!("{} {}", "changed".yellow(), key);
    }
}

impl WatchCommand {
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let root = context.templates_root();
        if !root.is_dir() {
            bail!("Template directory does not exist: {}", root.display());
        }

        let debounce = self
            .debounce_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| context.config.debounce());

        let mut watcher = TemplateWatcher::start(
            &root,
            &context.config.extension,
            debounce,
            true,
            Arc::new(PrintInvalidations),
        );
        if !watcher.is_active() {
            bail!("Could not watch {}; see the log for details", root.display());
        }

        println!("Watching {} (Ctrl-C to stop)", root.display());
        tokio::signal::ctrl_c().await?;

        watcher.shutdown().await;
        Ok(())
    }
}
