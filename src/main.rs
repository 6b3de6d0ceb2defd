use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use dpak_rip::{exit_code, run, Cli};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let outcome = run(&cli)?;
    Ok(ExitCode::from(exit_code(outcome)))
}
