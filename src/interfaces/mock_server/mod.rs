//! Local stand-in for the analysis service. Streams a highlight payload in
//! small byte chunks and serves a downloadable report.

use actix_web::dev::ServerHandle;
use actix_web::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::application::use_cases::payload_parser::IncrementalPayloadParser;
use crate::domain::error::{AppError, Result};
use crate::domain::report::DEFAULT_REPORT_FILE_NAME;

const DEFAULT_PAYLOAD: &str = r#"{"highlights":[{"id":1,"title":"Revenue grew 12%","description":"Quarter over quarter growth in total sales","metric":"revenue"},{"id":2,"title":"Top region: North","description":"North accounts for 41% of all orders"}]}
{"highlights":[{"id":"avg-basket","title":"Average basket size","description":"Средний чек вырос до 1 240 ₽"}]}
"#;

const DEFAULT_REPORT: &str = "metric,value\nrevenue,120000\norders,3400\n";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockServerConfig {
    pub port: u16,
    /// Bytes per streamed chunk. Small values split UTF-8 sequences and
    /// JSON tokens across chunks.
    pub chunk_size: usize,
    pub delay_ms: u64,
    /// Raw analysis response body.
    pub payload: String,
    pub report_file_name: String,
    pub report_body: String,
    /// When set, both endpoints answer with this status and an error body.
    pub fail_status: Option<u16>,
    pub fail_message: Option<String>,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            chunk_size: 16,
            delay_ms: 150,
            payload: DEFAULT_PAYLOAD.to_string(),
            report_file_name: DEFAULT_REPORT_FILE_NAME.to_string(),
            report_body: DEFAULT_REPORT.to_string(),
            fail_status: None,
            fail_message: None,
        }
    }
}

impl MockServerConfig {
    /// Replaces the payload with a fixture file. The fixture must hold at
    /// least one complete highlight envelope.
    pub fn with_fixture(mut self, path: &Path) -> Result<Self> {
        let payload = fs::read_to_string(path).map_err(|err| {
            AppError::ConfigError(format!(
                "Failed to read fixture {}: {}",
                path.display(),
                err
            ))
        })?;
        let mut parser = IncrementalPayloadParser::new();
        parser
            .push(&payload)
            .into_result()
            .and_then(|_| parser.finish().into_result())
            .map_err(|err| {
                AppError::ConfigError(format!("Invalid fixture {}: {}", path.display(), err))
            })?;
        self.payload = payload;
        Ok(self)
    }
}

/// A started mock server. Dropping it leaves the server running; call `stop`.
pub struct RunningMockServer {
    handle: ServerHandle,
    addr: SocketAddr,
}

impl RunningMockServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn stop(self) {
        let graceful = timeout(Duration::from_secs(2), self.handle.stop(true)).await;
        if graceful.is_err() {
            self.handle.stop(false).await;
            warn!("Mock server forced stop after timeout");
        } else {
            info!("Mock server stopped");
        }
    }
}

pub async fn start_mock_server(config: MockServerConfig) -> Result<RunningMockServer> {
    let port = config.port;
    let data = web::Data::new(config);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/aggregate", web::post().to(handle_aggregate))
            .route("/report", web::post().to(handle_report))
            .default_service(web::route().to(handle_not_found))
    })
    .workers(1)
    .disable_signals()
    .bind(("127.0.0.1", port))
    .map_err(|err| AppError::Internal(format!("Failed to bind mock server: {}", err)))?;

    let addr = server
        .addrs()
        .first()
        .copied()
        .ok_or_else(|| AppError::Internal("Mock server has no bound address".to_string()))?;

    let server = server.run();
    let handle = server.handle();
    tokio::spawn(server);

    info!(url = %format!("http://{}", addr), "Mock server started");
    Ok(RunningMockServer { handle, addr })
}

async fn handle_aggregate(
    req: HttpRequest,
    body: web::Bytes,
    config: web::Data<MockServerConfig>,
) -> HttpResponse {
    let rows = url::form_urlencoded::parse(req.query_string().as_bytes())
        .find(|(key, _)| key == "rows")
        .and_then(|(_, value)| value.parse::<u32>().ok());
    let Some(rows) = rows else {
        return error_response(StatusCode::BAD_REQUEST, "Missing or invalid rows parameter");
    };

    let is_multipart = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("multipart/form-data"))
        .unwrap_or(false);
    if !is_multipart || body.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Expected a multipart CSV upload");
    }

    if let Some(response) = configured_failure(&config) {
        return response;
    }

    info!(rows, upload_bytes = body.len(), "Mock analysis requested");

    let chunks: Vec<web::Bytes> = config
        .payload
        .as_bytes()
        .chunks(config.chunk_size.max(1))
        .map(web::Bytes::copy_from_slice)
        .collect();
    let delay = Duration::from_millis(config.delay_ms);
    let stream = futures::stream::iter(chunks).then(move |chunk| async move {
        if !delay.is_zero() {
            sleep(delay).await;
        }
        Ok::<_, actix_web::Error>(chunk)
    });

    HttpResponse::Ok()
        .content_type("application/json; charset=utf-8")
        .streaming(stream)
}

async fn handle_report(config: web::Data<MockServerConfig>) -> HttpResponse {
    if let Some(response) = configured_failure(&config) {
        return response;
    }
    info!(file_name = %config.report_file_name, "Mock report requested");
    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .append_header((
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", config.report_file_name),
        ))
        .body(config.report_body.clone())
}

async fn handle_not_found(req: HttpRequest) -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "error": "No mock route matched.",
        "method": req.method().as_str(),
        "path": req.path()
    }))
}

fn configured_failure(config: &MockServerConfig) -> Option<HttpResponse> {
    let status = StatusCode::from_u16(config.fail_status?)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = config
        .fail_message
        .clone()
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Error").to_string());
    Some(error_response(status, &message))
}

fn error_response(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({ "error": message }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::analysis_session::{SessionRecorder, SessionStatus};
    use crate::application::use_cases::csv_analysis::CsvAnalysisUseCase;
    use crate::domain::analysis::{AnalysisState, CsvUpload};
    use crate::domain::highlight::HighlightId;
    use crate::domain::settings::ServiceSettings;
    use crate::infrastructure::service_clients::{
        HttpAnalysisClient, HttpReportClient, ReportTransport,
    };
    use std::sync::Arc;

    fn test_config() -> MockServerConfig {
        MockServerConfig {
            port: 0,
            chunk_size: 7,
            delay_ms: 0,
            ..Default::default()
        }
    }

    fn settings(server: &RunningMockServer) -> ServiceSettings {
        ServiceSettings {
            base_url: server.base_url(),
            ..Default::default()
        }
    }

    async fn analyze(server: &RunningMockServer) -> (AnalysisState, SessionRecorder) {
        let recorder = SessionRecorder::default();
        let upload = CsvUpload::new("sales.csv", "region,sales\nnorth,10\n");
        recorder.begin(upload.clone());

        let use_case = CsvAnalysisUseCase::new(
            Arc::new(HttpAnalysisClient::new(settings(server))),
            Arc::new(recorder.clone()),
            100,
        );
        (use_case.analyze_csv(upload).await, recorder)
    }

    #[tokio::test]
    async fn test_streamed_analysis_end_to_end() {
        let server = start_mock_server(test_config()).await.unwrap();

        let (state, recorder) = analyze(&server).await;
        server.stop().await;

        assert_eq!(state, AnalysisState::Completed);
        let session = recorder.snapshot();
        assert_eq!(session.status(), SessionStatus::Completed);
        assert_eq!(session.highlights().len(), 3);
        assert_eq!(
            session.highlights()[2].id(),
            Some(HighlightId::Text("avg-basket".to_string()))
        );
        assert_eq!(
            session.highlights()[2].fields["description"],
            "Средний чек вырос до 1 240 ₽"
        );
        assert_eq!(session.results().map(|r| r.len()), Some(3));
    }

    #[tokio::test]
    async fn test_failing_analysis_end_to_end() {
        let server = start_mock_server(MockServerConfig {
            fail_status: Some(503),
            ..test_config()
        })
        .await
        .unwrap();

        let (state, recorder) = analyze(&server).await;
        server.stop().await;

        assert_eq!(state, AnalysisState::Failed);
        let session = recorder.snapshot();
        assert_eq!(session.status(), SessionStatus::Error);
        assert!(session.highlights().is_empty());
        assert!(session.error().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_report_download_end_to_end() {
        let server = start_mock_server(MockServerConfig {
            report_file_name: "q3-summary.csv".to_string(),
            ..test_config()
        })
        .await
        .unwrap();

        let report = HttpReportClient::new(settings(&server))
            .generate_report()
            .await;
        server.stop().await;

        let report = report.unwrap();
        assert_eq!(report.file_name, "q3-summary.csv");
        assert_eq!(&report.content[..], DEFAULT_REPORT.as_bytes());
    }

    #[tokio::test]
    async fn test_report_error_message_end_to_end() {
        let server = start_mock_server(MockServerConfig {
            fail_status: Some(500),
            fail_message: Some("Test error".to_string()),
            ..test_config()
        })
        .await
        .unwrap();

        let result = HttpReportClient::new(settings(&server))
            .generate_report()
            .await;
        server.stop().await;

        assert_eq!(
            result,
            Err(AppError::ServerStatus {
                status: 500,
                message: Some("Test error".to_string()),
            })
        );
    }

    #[test]
    fn test_fixture_must_hold_an_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        fs::write(&good, r#"{"highlights":[{"id":7}]}"#).unwrap();
        fs::write(&bad, r#"{"highlights":[{"id":7}"#).unwrap();

        let config = MockServerConfig::default().with_fixture(&good).unwrap();
        assert_eq!(config.payload, r#"{"highlights":[{"id":7}]}"#);
        assert!(matches!(
            MockServerConfig::default().with_fixture(&bad),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn test_default_payload_is_valid() {
        let mut parser = IncrementalPayloadParser::new();
        let mut batches = parser.push(DEFAULT_PAYLOAD).into_result().unwrap();
        batches.extend(parser.finish().into_result().unwrap());
        assert_eq!(batches.len(), 2);
    }
}
