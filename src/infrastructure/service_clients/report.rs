use super::ReportTransport;
use crate::domain::error::{AppError, Result};
use crate::domain::report::{GeneratedReport, DEFAULT_REPORT_FILE_NAME};
use crate::domain::settings::ServiceSettings;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::CONTENT_DISPOSITION;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

static FILENAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"filename="([^"]+)"|filename=([^";\s]+)"#).unwrap());

#[derive(Deserialize)]
struct ReportErrorBody {
    error: String,
}

pub struct HttpReportClient {
    client: reqwest::Client,
    settings: ServiceSettings,
}

impl HttpReportClient {
    pub fn new(settings: ServiceSettings) -> Self {
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
                .timeout(Duration::from_secs(settings.report_timeout_secs))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            settings,
        }
    }

    pub fn endpoint(&self) -> String {
        self.settings.endpoint(&self.settings.report_path)
    }
}

/// Pulls the file name out of a `Content-Disposition` value such as
/// `attachment; filename="report.csv"`.
pub fn filename_from_disposition(disposition: &str) -> Option<String> {
    let captures = FILENAME_PATTERN.captures(disposition)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

#[async_trait]
impl ReportTransport for HttpReportClient {
    async fn generate_report(&self) -> Result<GeneratedReport> {
        let url = self.endpoint();
        debug!(url = %url, "Requesting report generation");

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .json::<ReportErrorBody>()
                .await
                .ok()
                .map(|body| body.error);
            return Err(AppError::ServerStatus { status, message });
        }

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| DEFAULT_REPORT_FILE_NAME.to_string());

        let content = response
            .bytes()
            .await
            .map_err(|e| AppError::StreamRead(format!("Failed to download report: {}", e)))?;

        Ok(GeneratedReport { file_name, content })
    }
}
