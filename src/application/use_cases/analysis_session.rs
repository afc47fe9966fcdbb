use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::warn;

use crate::application::use_cases::csv_analysis::AnalysisCallbacks;
use crate::domain::analysis::CsvUpload;
use crate::domain::error::AppError;
use crate::domain::highlight::{RawHighlight, StorageHighlight};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Processing,
    Completed,
    Error,
}

/// State of one analysis as seen by its caller: the selected file, the
/// highlights received so far and how the run ended.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    file: Option<CsvUpload>,
    status: SessionStatus,
    highlights: Vec<StorageHighlight>,
    results: Option<Vec<RawHighlight>>,
    error: Option<String>,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self {
            file: None,
            status: SessionStatus::Idle,
            highlights: Vec::new(),
            results: None,
            error: None,
        }
    }
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self) -> Option<&CsvUpload> {
        self.file.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn highlights(&self) -> &[StorageHighlight] {
        &self.highlights
    }

    /// Raw highlights handed over on completion.
    pub fn results(&self) -> Option<&[RawHighlight]> {
        self.results.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Selecting a new file discards the previous run's output.
    pub fn set_file(&mut self, file: CsvUpload) {
        *self = Self {
            file: Some(file),
            ..Self::default()
        };
    }

    /// Moves to `Processing`. Returns the file to analyse, or `None` when no
    /// file is selected or a run is already in progress.
    pub fn start(&mut self) -> Option<CsvUpload> {
        if self.status == SessionStatus::Processing {
            return None;
        }
        let file = self.file.clone()?;
        self.status = SessionStatus::Processing;
        self.highlights.clear();
        self.results = None;
        self.error = None;
        Some(file)
    }

    pub fn apply_data(&mut self, highlights: Vec<StorageHighlight>) {
        if self.status != SessionStatus::Processing {
            warn!(status = ?self.status, "Ignoring highlights outside a running analysis");
            return;
        }
        self.highlights.extend(highlights);
    }

    pub fn complete(&mut self, highlights: Vec<RawHighlight>) {
        self.status = SessionStatus::Completed;
        self.results = Some(highlights);
    }

    pub fn fail(&mut self, error: &AppError) {
        self.status = SessionStatus::Error;
        self.error = Some(error.user_message());
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Feeds analysis callbacks into a shared [`AnalysisSession`].
#[derive(Clone, Default)]
pub struct SessionRecorder {
    session: Arc<Mutex<AnalysisSession>>,
}

impl SessionRecorder {
    pub fn new(session: Arc<Mutex<AnalysisSession>>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> Arc<Mutex<AnalysisSession>> {
        Arc::clone(&self.session)
    }

    /// Selects `file` and starts a run on it.
    pub fn begin(&self, file: CsvUpload) -> bool {
        let mut session = self.lock();
        session.set_file(file);
        session.start().is_some()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> AnalysisSession {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, AnalysisSession> {
        // A panic inside a callback must not wedge the session.
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AnalysisCallbacks for SessionRecorder {
    fn on_data(&self, highlights: Vec<StorageHighlight>) {
        self.lock().apply_data(highlights);
    }

    fn on_error(&self, error: AppError) {
        self.lock().fail(&error);
    }

    fn on_complete(&self, highlights: Vec<RawHighlight>) {
        self.lock().complete(highlights);
    }
}
