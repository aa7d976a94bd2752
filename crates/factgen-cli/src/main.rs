use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod commands;

use args::{Cli, Command};

#[tokio::main]
async fn main() {
    // Load .env file if present, before clap reads FACTGEN_* variables
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // RUST_LOG wins; otherwise warn, or debug with --verbose
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Command::Generate(args) => commands::generate::run(args).await,
        Command::Validate(args) => commands::validate::run(args),
        Command::Verify(args) => commands::verify::run(args),
        Command::Info(args) => commands::info::run(args),
    };

    if let Err(err) = result {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
