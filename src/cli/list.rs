//! `hxview list`: show available templates.
//!
//! ```text
//! components/alert    bundled
//! components/badge    project (overrides bundled)
//! layouts/base        bundled
//! pages/index         project
//! ```

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;

use super::CommandContext;
use crate::constants::{BUNDLED_PROVIDER, PROJECT_PROVIDER};
use crate::templating::{TemplateKey, TemplateLocator};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// List templates with the provider that serves each.
#[derive(Args, Debug)]
pub struct ListCommand {
    /// Only show templates served by this provider (`project` or `bundled`)
    #[arg(long)]
    provider: Option<String>,

    /// Only show keys under this prefix (e.g. `components`)
    #[arg(long)]
    prefix: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct ListEntry {
    key: String,
    provider: String,
    /// Project template shadowing a bundled one
    overrides_bundled: bool,
}

impl ListCommand {
    pub fn execute(self, context: &CommandContext) -> Result<()> {
        let locator =
            TemplateLocator::with_defaults(context.templates_root(), &context.config.extension);
        let entries = self.entries(&locator)?;

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
            OutputFormat::Table => {
                if entries.is_empty() {
                    println!("{}", "No templates found".yellow());
                    return Ok(());
                }

                let width = entries.iter().map(|e| e.key.len()).max().unwrap_or(0);
                for entry in &entries {
                    let provider = if entry.provider == PROJECT_PROVIDER {
                        entry.provider.green()
                    } else {
                        entry.provider.dimmed()
                    };
                    let note = if entry.overrides_bundled {
                        " (overrides bundled)".cyan().to_string()
                    } else {
                        String::new()
                    };
                    println!("{:<width$}  {}{}", entry.key, provider, note, width = width);
                }
            }
        }
        Ok(())
    }

    fn entries(&self, locator: &TemplateLocator) -> Result<Vec<ListEntry>> {
        let bundled: Vec<TemplateKey> = match locator.provider(BUNDLED_PROVIDER) {
            Some(provider) => provider.list()?,
            None => Vec::new(),
        };

        let entries = locator
            .list()?
            .into_iter()
            .filter(|(key, provider)| {
                self.provider.as_ref().is_none_or(|wanted| wanted == provider)
                    && self.prefix.as_ref().is_none_or(|prefix| key.is_under(prefix))
            })
            .map(|(key, provider)| ListEntry {
                overrides_bundled: provider != BUNDLED_PROVIDER && bundled.contains(&key),
                key: key.to_string(),
                provider,
            })
            .collect();
        Ok(entries)
    }
}
