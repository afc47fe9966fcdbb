use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::infrastructure::config::ConfigService;
use crate::interfaces::cli::{execute, Cli};

const DEFAULT_LOG_FILTER: &str = "info";

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let settings = match ConfigService::new(cli.config.as_deref()).load() {
        Ok(settings) => settings,
        Err(err) => {
            init_tracing(None);
            eprintln!("Error: {}", err);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(settings.log_level.as_deref());
    debug!(command = ?cli.command, "Starting");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: failed to start async runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(execute(cli.command, settings)) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins over the configured level. Logs go to stderr so command
/// output stays clean.
fn init_tracing(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.unwrap_or(DEFAULT_LOG_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
