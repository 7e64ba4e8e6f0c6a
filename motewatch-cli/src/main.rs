//! ## motewatch
//! **Command-line front end**
//!
//! `simulate` runs the seeded traffic simulator with the configured attacks,
//! `replay` feeds a recorded run log through the observer, `check-config`
//! validates a configuration file.

use clap::Parser;

mod commands;
mod error;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    commands::run_command(cli).await?;
    Ok(())
}
