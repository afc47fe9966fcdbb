use bytes::Bytes;

pub const DEFAULT_REPORT_FILE_NAME: &str = "report.csv";

/// A report downloaded from the generation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReport {
    pub file_name: String,
    pub content: Bytes,
}
