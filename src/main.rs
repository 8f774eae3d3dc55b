mod cli;
mod commands;
mod config;
mod dedup;
mod error;
mod index;
mod loader;
mod model;
mod render;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::error::ConfigurationError;
use crate::index::EXIT_FATAL;

fn main() {
    init_tracing();

    match run() {
        Ok(code) => std::process::exit(i32::from(code)),
        Err(err) => {
            if let Some(config_err) = err.downcast_ref::<ConfigurationError>() {
                error!(error = %config_err, "invalid configuration");
            } else {
                error!(error = %err, "command failed");
                for cause in err.chain().skip(1) {
                    error!(cause = %cause, "caused by");
                }
            }
            std::process::exit(i32::from(EXIT_FATAL));
        }
    }
}

fn run() -> Result<u8> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => commands::build::run(args),
        Commands::Check(args) => commands::check::run(args),
        Commands::Inventory(args) => commands::inventory::run(args),
        Commands::Duplicates(args) => commands::duplicates::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
