use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{info, warn};

use super::HistoryCommands;
use crate::application::use_cases::analysis_session::{AnalysisSession, SessionRecorder};
use crate::application::use_cases::csv_analysis::{
    AbortHandle, AnalysisCallbacks, CallbackSet, CsvAnalysisUseCase,
};
use crate::application::use_cases::history::HistoryUseCase;
use crate::application::use_cases::report_generation::{failure_message, ReportUseCase};
use crate::domain::analysis::{AnalysisState, CsvUpload};
use crate::domain::error::{AppError, Result};
use crate::domain::highlight::StorageHighlight;
use crate::domain::settings::AppSettings;
use crate::infrastructure::csv::CsvInspector;
use crate::infrastructure::service_clients::{HttpAnalysisClient, HttpReportClient};
use crate::infrastructure::storage::HistoryRepository;
use crate::interfaces::mock_server::{start_mock_server, MockServerConfig};

/// Exit status for a run cancelled with Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

pub async fn analyze(settings: &AppSettings, file: &Path, rows: Option<u32>) -> Result<ExitCode> {
    let upload = CsvUpload::from_path(file)?;
    let row_limit = rows.unwrap_or(settings.service.row_limit);
    if row_limit == 0 {
        return Err(AppError::ValidationError(
            "Row limit must be at least 1".to_string(),
        ));
    }

    match CsvInspector::new().inspect(upload.content()) {
        Ok(summary) => {
            println!(
                "{}: {} rows, {} columns ({})",
                upload.file_name(),
                summary.row_count,
                summary.headers.len(),
                summary.encoding
            );
            if summary.exceeds(row_limit) {
                println!(
                    "Only the first {} of {} rows will be analysed.",
                    row_limit, summary.row_count
                );
            }
        }
        Err(err) => warn!(error = %err, "Could not inspect CSV locally; uploading as is"),
    }

    let recorder = SessionRecorder::default();
    recorder.begin(upload.clone());

    let use_case = CsvAnalysisUseCase::new(
        Arc::new(HttpAnalysisClient::new(settings.service.clone())),
        Arc::new(console_callbacks(recorder.clone())),
        row_limit,
    );

    let (abort_handle, abort_signal) = AbortHandle::new_pair();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            abort_handle.abort();
        }
    });

    let state = use_case.analyze_csv_with_abort(upload, abort_signal).await;
    ctrl_c.abort();

    let session = recorder.snapshot();
    match state {
        AnalysisState::Completed => {
            let history = HistoryUseCase::new(HistoryRepository::new(
                settings.storage.history_path.clone(),
            ));
            let item = history.record(file_name(&session), session.highlights().to_vec())?;
            println!(
                "Done: {} highlights. Saved to history as {}",
                item.highlights.len(),
                item.id
            );
            Ok(ExitCode::SUCCESS)
        }
        AnalysisState::Aborted => {
            println!("Analysis cancelled.");
            Ok(ExitCode::from(EXIT_CANCELLED))
        }
        _ => Ok(ExitCode::FAILURE),
    }
}

fn file_name(session: &AnalysisSession) -> &str {
    session.file().map(CsvUpload::file_name).unwrap_or("unknown.csv")
}

/// Prints highlights as they arrive and keeps the session up to date.
fn console_callbacks(recorder: SessionRecorder) -> CallbackSet {
    let on_data = recorder.clone();
    let on_error = recorder.clone();
    let on_complete = recorder;

    CallbackSet::new()
        .on_data(move |highlights| {
            for highlight in &highlights {
                print_highlight(highlight);
            }
            on_data.on_data(highlights);
        })
        .on_error(move |err| {
            eprintln!("Analysis failed: {}", err.user_message());
            on_error.on_error(err);
        })
        .on_complete(move |highlights| on_complete.on_complete(highlights))
}

fn print_highlight(highlight: &StorageHighlight) {
    let title = highlight
        .title()
        .map(str::to_string)
        .or_else(|| highlight.id().map(|id| format!("Highlight {}", id)))
        .unwrap_or_else(|| "Highlight".to_string());
    println!("* {}", title);
    if let Some(description) = highlight.fields.get("description").and_then(|v| v.as_str()) {
        println!("  {}", description);
    }
}

pub fn history(settings: &AppSettings, command: HistoryCommands) -> Result<ExitCode> {
    let history = HistoryUseCase::new(HistoryRepository::new(
        settings.storage.history_path.clone(),
    ));

    match command {
        HistoryCommands::List => {
            let items = history.list()?;
            if items.is_empty() {
                println!("No analyses yet.");
            }
            for item in items {
                println!(
                    "{}  {}  {}  ({} highlights)",
                    item.id,
                    item.timestamp,
                    item.file_name,
                    item.highlights.len()
                );
            }
        }
        HistoryCommands::Show { id } => {
            let item = history.show(&id)?;
            println!("{}", serde_json::to_string_pretty(&item)?);
        }
        HistoryCommands::Remove { id } => {
            if !history.remove(&id)? {
                return Err(AppError::NotFound(format!("History item {}", id)));
            }
            println!("Removed {}", id);
        }
        HistoryCommands::Clear => {
            history.clear()?;
            println!("History cleared.");
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn report(settings: &AppSettings, out: Option<PathBuf>) -> Result<ExitCode> {
    let download_dir = out.unwrap_or_else(|| settings.storage.download_dir.clone());
    let use_case = ReportUseCase::new(
        Arc::new(HttpReportClient::new(settings.service.clone())),
        download_dir,
    );

    println!("Generating report...");
    match use_case.generate().await {
        Ok(path) => {
            println!("Report generated: {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(err @ AppError::IoError(_)) => Err(err),
        Err(err) => {
            eprintln!("{}", failure_message(&err));
            Ok(ExitCode::FAILURE)
        }
    }
}

pub async fn mock_server(
    port: u16,
    chunk_size: usize,
    delay_ms: u64,
    fixture: Option<&Path>,
    fail_status: Option<u16>,
) -> Result<ExitCode> {
    let mut config = MockServerConfig {
        port,
        chunk_size,
        delay_ms,
        fail_status,
        ..Default::default()
    };
    if let Some(fixture) = fixture {
        config = config.with_fixture(fixture)?;
    }

    let server = start_mock_server(config).await?;
    println!("Mock analysis service listening on {}", server.base_url());
    println!("Press Ctrl-C to stop.");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to listen for Ctrl-C: {}", e)))?;
    info!("Shutting down mock server");
    server.stop().await;
    Ok(ExitCode::SUCCESS)
}
