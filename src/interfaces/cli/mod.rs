mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::domain::error::Result;
use crate::domain::settings::AppSettings;

#[derive(Parser, Debug)]
#[command(name = "csv-highlights")]
#[command(about = "Upload CSV files for analysis and stream back highlights")]
#[command(version)]
pub struct Cli {
    /// Settings file (defaults to ./csv-highlights.toml)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyse a CSV file, printing highlights as they arrive (Ctrl-C cancels)
    Analyze {
        /// CSV file to upload
        file: PathBuf,
        /// Override the configured row limit
        #[arg(long)]
        rows: Option<u32>,
    },

    /// Browse and manage past analyses
    #[command(subcommand)]
    History(HistoryCommands),

    /// Generate a report and save it to the download directory
    Report {
        /// Directory to save the report into
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Run a local mock of the analysis service
    MockServer {
        #[arg(long, default_value_t = 8000)]
        port: u16,
        /// Bytes per streamed chunk
        #[arg(long, default_value_t = 16)]
        chunk_size: usize,
        /// Pause before each chunk
        #[arg(long, default_value_t = 150)]
        delay_ms: u64,
        /// File holding the analysis response body to stream
        #[arg(long)]
        fixture: Option<PathBuf>,
        /// Answer every request with this status instead
        #[arg(long)]
        fail_status: Option<u16>,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// List past analyses, newest first
    List,
    /// Print one analysis with its highlights as JSON
    Show { id: String },
    /// Delete one analysis
    Remove { id: String },
    /// Delete every analysis
    Clear,
}

pub async fn execute(command: Commands, settings: AppSettings) -> Result<ExitCode> {
    match command {
        Commands::Analyze { file, rows } => commands::analyze(&settings, &file, rows).await,
        Commands::History(history) => commands::history(&settings, history),
        Commands::Report { out } => commands::report(&settings, out).await,
        Commands::MockServer {
            port,
            chunk_size,
            delay_ms,
            fixture,
            fail_status,
        } => {
            commands::mock_server(port, chunk_size, delay_ms, fixture.as_deref(), fail_status)
                .await
        }
    }
}
