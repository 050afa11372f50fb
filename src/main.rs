//! hxview CLI entry point
//!
//! Parses arguments, installs logging, runs the selected command and turns
//! failures into a user-facing report with suggestions.

use anyhow::Result;
use clap::Parser;
use hxview::cli;
use hxview::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.init_logging();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
