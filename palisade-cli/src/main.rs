//! ## palisade-cli
//! **Command-line frontend for the perimeter simulator**
//!
//! Every command loads the layered configuration first (defaults, YAML,
//! `PALISADE_*` environment), then applies its own flag overrides.

use clap::Parser;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    commands::run_command(cli).await
}
