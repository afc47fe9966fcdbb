use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::error::{AppError, Result};

/// A CSV file selected for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvUpload {
    file_name: String,
    content: Bytes,
}

impl CsvUpload {
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read(path).map_err(|e| {
            AppError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                AppError::ValidationError(format!("{} is not a file path", path.display()))
            })?;
        Ok(Self::new(file_name, content))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// One analysis request. Built per call and never mutated after it is issued.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    file: CsvUpload,
    row_limit: u32,
}

impl AnalysisRequest {
    pub fn new(file: CsvUpload, row_limit: u32) -> Self {
        Self { file, row_limit }
    }

    pub fn file(&self) -> &CsvUpload {
        &self.file
    }

    pub fn row_limit(&self) -> u32 {
        self.row_limit
    }
}

/// Lifecycle of a single `analyze_csv` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisState {
    Idle,
    Requesting,
    Streaming,
    Failed,
    Completed,
    Aborted,
}

impl AnalysisState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AnalysisState::Failed | AnalysisState::Completed | AnalysisState::Aborted
        )
    }
}
