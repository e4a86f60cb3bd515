use backdrop_dl::cli::{Cli, execute};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("backdrop-dl: {e}");
            return ExitCode::from(2);
        }
    };

    match execute(&config).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Run aborted");
            eprintln!("backdrop-dl: {e}");
            ExitCode::FAILURE
        }
    }
}
