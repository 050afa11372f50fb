//! `hxview eject`: copy bundled components into the project.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

use super::CommandContext;
use crate::config::EjectOutcome;

/// Copy bundled components into the project template directory so they can
/// be customized. Existing files are left untouched.
#[derive(Args, Debug)]
pub struct EjectCommand {
    /// Component names (e.g. `alert`, `badge`)
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    names: Vec<String>,

    /// Eject every bundled component
    #[arg(long)]
    all: bool,
}

impl EjectCommand {
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let builder = context.engine_builder();

        let outcomes = if self.all {
            builder.eject_all_components().await?
        } else {
            if self.names.is_empty() {
                bail!("No components given; pass component names or --all");
            }
            let mut outcomes = Vec::with_capacity(self.names.len());
            for name in &self.names {
                outcomes.push(builder.eject_component(name).await?);
            }
            outcomes
        };

        for outcome in &outcomes {
            match outcome {
                EjectOutcome::Written(path) => {
                    println!("{} {}", "Ejected".green(), path.display());
                }
                EjectOutcome::Skipped(path) => {
                    println!("{} {} (already exists)", "Skipped".yellow(), path.display());
                }
            }
        }
        Ok(())
    }
}
