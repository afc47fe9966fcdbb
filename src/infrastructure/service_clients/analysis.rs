use super::{AnalysisResponse, AnalysisTransport, ByteStream};
use crate::domain::analysis::AnalysisRequest;
use crate::domain::error::{AppError, Result};
use crate::domain::settings::ServiceSettings;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

pub struct HttpAnalysisClient {
    client: reqwest::Client,
    settings: ServiceSettings,
}

impl HttpAnalysisClient {
    pub fn new(settings: ServiceSettings) -> Self {
        // No overall timeout: the body streams for as long as the analysis runs.
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            settings,
        }
    }

    pub fn endpoint(&self) -> String {
        self.settings.endpoint(&self.settings.analyze_path)
    }

    fn upload_form(request: &AnalysisRequest) -> Result<Form> {
        let file = request.file();
        let part = Part::bytes(file.content().to_vec())
            .file_name(file.file_name().to_string())
            .mime_str("text/csv")
            .map_err(|e| AppError::Internal(format!("Invalid upload mime type: {}", e)))?;
        Ok(Form::new().part("file", part))
    }
}

#[async_trait]
impl AnalysisTransport for HttpAnalysisClient {
    async fn submit(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        let url = self.endpoint();
        let form = Self::upload_form(request)?;

        debug!(
            url = %url,
            file_name = request.file().file_name(),
            bytes = request.file().len(),
            rows = request.row_limit(),
            "Submitting CSV for analysis"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("rows", request.row_limit())])
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Request failed: {}", e)))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let has_body = status != StatusCode::NO_CONTENT && response.content_length() != Some(0);
        let body = if has_body {
            let stream = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| AppError::StreamRead(e.to_string())));
            Some(Box::pin(stream) as ByteStream)
        } else {
            None
        };

        Ok(AnalysisResponse {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}
