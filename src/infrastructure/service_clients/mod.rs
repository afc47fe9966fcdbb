pub mod analysis;
pub mod report;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::domain::analysis::AnalysisRequest;
use crate::domain::error::Result;
use crate::domain::report::GeneratedReport;

pub use analysis::HttpAnalysisClient;
pub use report::HttpReportClient;

/// Response body as it comes off the wire.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// What the analysis endpoint answered, before any of the body is read.
pub struct AnalysisResponse {
    pub status: u16,
    pub content_type: Option<String>,
    /// `None` when the response carries no readable body.
    pub body: Option<ByteStream>,
}

impl AnalysisResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for AnalysisResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

#[async_trait]
pub trait AnalysisTransport {
    /// Sends the request. Errors here mean no response was received at all.
    async fn submit(&self, request: &AnalysisRequest) -> Result<AnalysisResponse>;
}

#[async_trait]
pub trait ReportTransport {
    async fn generate_report(&self) -> Result<GeneratedReport>;
}
