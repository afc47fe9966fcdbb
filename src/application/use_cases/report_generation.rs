use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info};

use crate::domain::error::{AppError, Result};
use crate::domain::report::DEFAULT_REPORT_FILE_NAME;
use crate::infrastructure::service_clients::ReportTransport;
use crate::infrastructure::storage::ensure_dir;

const UNKNOWN_REPORT_ERROR: &str = "Unknown error while generating the report";

pub struct ReportUseCase {
    transport: Arc<dyn ReportTransport + Send + Sync>,
    download_dir: PathBuf,
}

impl ReportUseCase {
    pub fn new(transport: Arc<dyn ReportTransport + Send + Sync>, download_dir: PathBuf) -> Self {
        Self {
            transport,
            download_dir,
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Requests a report and writes it into the download directory.
    /// Returns the path of the written file.
    pub async fn generate(&self) -> Result<PathBuf> {
        let report = self.transport.generate_report().await.map_err(|e| {
            error!(error = %e, "Report generation failed");
            e
        })?;

        let file_name = safe_file_name(&report.file_name);
        ensure_dir(&self.download_dir)?;
        let path = self.download_dir.join(&file_name);
        fs::write(&path, &report.content).map_err(|e| {
            AppError::IoError(format!("Failed to write report {}: {}", path.display(), e))
        })?;

        info!(
            path = %path.display(),
            bytes = report.content.len(),
            "Report saved"
        );
        Ok(path)
    }
}

/// Message shown when report generation fails. Errors raised before any
/// response arrived are reported generically.
pub fn failure_message(error: &AppError) -> String {
    match error {
        AppError::Transport(_) => UNKNOWN_REPORT_ERROR.to_string(),
        other => format!("Report generation failed: {}", other.user_message()),
    }
}

/// Drops any directory components a server-supplied name might carry.
fn safe_file_name(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or(DEFAULT_REPORT_FILE_NAME)
        .to_string()
}
