//! CSV analysis use case: uploads a file, streams highlight batches back and
//! reports them through caller-supplied callbacks.
//!
//! Every call to [`CsvAnalysisUseCase::analyze_csv`] ends in exactly one of
//! `on_error` or `on_complete`, unless it is aborted, in which case no further
//! callback fires. `on_data` only ever sees non-empty batches, in stream order.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::application::use_cases::highlight_transformer::transform_highlights;
use crate::application::use_cases::payload_parser::{
    HighlightBatch, IncrementalPayloadParser, ParseProgress,
};
use crate::domain::analysis::{AnalysisRequest, AnalysisState, CsvUpload};
use crate::domain::error::{AppError, Result};
use crate::domain::highlight::{RawHighlight, StorageHighlight};
use crate::infrastructure::response::{decode_stream, ResponseDecoder};
use crate::infrastructure::service_clients::AnalysisTransport;

/// Sinks for analysis progress. Held by reference; never mutated by the use case.
pub trait AnalysisCallbacks {
    fn on_data(&self, highlights: Vec<StorageHighlight>);
    fn on_error(&self, error: AppError);
    fn on_complete(&self, highlights: Vec<RawHighlight>);
}

type DataFn = Box<dyn Fn(Vec<StorageHighlight>) + Send + Sync>;
type ErrorFn = Box<dyn Fn(AppError) + Send + Sync>;
type CompleteFn = Box<dyn Fn(Vec<RawHighlight>) + Send + Sync>;

/// Closure-backed [`AnalysisCallbacks`]. Unset sinks do nothing.
#[derive(Default)]
pub struct CallbackSet {
    on_data: Option<DataFn>,
    on_error: Option<ErrorFn>,
    on_complete: Option<CompleteFn>,
}

impl CallbackSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_data(mut self, f: impl Fn(Vec<StorageHighlight>) + Send + Sync + 'static) -> Self {
        self.on_data = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(AppError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn(Vec<RawHighlight>) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }
}

impl AnalysisCallbacks for CallbackSet {
    fn on_data(&self, highlights: Vec<StorageHighlight>) {
        if let Some(f) = &self.on_data {
            f(highlights);
        }
    }

    fn on_error(&self, error: AppError) {
        if let Some(f) = &self.on_error {
            f(error);
        }
    }

    fn on_complete(&self, highlights: Vec<RawHighlight>) {
        if let Some(f) = &self.on_complete {
            f(highlights);
        }
    }
}

/// Caller side of an abort request.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    sender: Arc<watch::Sender<bool>>,
}

/// Analysis side of an abort request.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    receiver: Option<watch::Receiver<bool>>,
}

impl AbortHandle {
    pub fn new_pair() -> (Self, AbortSignal) {
        let (sender, receiver) = watch::channel(false);
        (
            Self {
                sender: Arc::new(sender),
            },
            AbortSignal {
                receiver: Some(receiver),
            },
        )
    }

    pub fn abort(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.sender.borrow()
    }
}

impl AbortSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self { receiver: None }
    }

    /// Resolves once the matching handle aborts. Dropping the handle without
    /// aborting does not count.
    pub async fn aborted(&mut self) {
        match self.receiver.as_mut() {
            Some(receiver) => {
                let handle_dropped = receiver.wait_for(|aborted| *aborted).await.is_err();
                if handle_dropped {
                    std::future::pending::<()>().await;
                }
            }
            None => std::future::pending::<()>().await,
        }
    }
}

pub struct CsvAnalysisUseCase {
    transport: Arc<dyn AnalysisTransport + Send + Sync>,
    callbacks: Arc<dyn AnalysisCallbacks + Send + Sync>,
    row_limit: u32,
}

impl CsvAnalysisUseCase {
    pub fn new(
        transport: Arc<dyn AnalysisTransport + Send + Sync>,
        callbacks: Arc<dyn AnalysisCallbacks + Send + Sync>,
        row_limit: u32,
    ) -> Self {
        Self {
            transport,
            callbacks,
            row_limit,
        }
    }

    pub fn row_limit(&self) -> u32 {
        self.row_limit
    }

    /// Runs one analysis to its terminal state. Errors are reported through
    /// `on_error`, never returned.
    pub async fn analyze_csv(&self, file: CsvUpload) -> AnalysisState {
        self.analyze_csv_with_abort(file, AbortSignal::never()).await
    }

    pub async fn analyze_csv_with_abort(
        &self,
        file: CsvUpload,
        mut abort: AbortSignal,
    ) -> AnalysisState {
        let file_name = file.file_name().to_string();
        let request = AnalysisRequest::new(file, self.row_limit);

        tokio::select! {
            biased;
            _ = abort.aborted() => {
                info!(file_name = %file_name, "CSV analysis aborted");
                AnalysisState::Aborted
            }
            state = self.run(&request) => state,
        }
    }

    async fn run(&self, request: &AnalysisRequest) -> AnalysisState {
        debug!(file_name = request.file().file_name(), state = ?AnalysisState::Requesting, "CSV analysis started");

        let mut collected = Vec::new();
        match self.stream_highlights(request, &mut collected).await {
            Ok(()) => {
                info!(
                    file_name = request.file().file_name(),
                    highlights = collected.len(),
                    "CSV analysis completed"
                );
                self.callbacks.on_complete(collected);
                AnalysisState::Completed
            }
            Err(err) => {
                warn!(
                    file_name = request.file().file_name(),
                    delivered = collected.len(),
                    error = %err,
                    "CSV analysis failed"
                );
                self.callbacks.on_error(err);
                AnalysisState::Failed
            }
        }
    }

    async fn stream_highlights(
        &self,
        request: &AnalysisRequest,
        collected: &mut Vec<RawHighlight>,
    ) -> Result<()> {
        let response = self.transport.submit(request).await?;

        if !response.is_success() {
            return Err(AppError::ServerStatus {
                status: response.status,
                message: None,
            });
        }

        let body = response.body.ok_or_else(|| {
            AppError::InvalidServerResponse("response has no readable body".to_string())
        })?;

        debug!(state = ?AnalysisState::Streaming, status = response.status, "Reading highlight stream");

        let decoder = ResponseDecoder::for_content_type(response.content_type.as_deref());
        let chunks = decode_stream(body, decoder);
        futures::pin_mut!(chunks);

        let mut parser = IncrementalPayloadParser::new();
        while let Some(chunk) = chunks.next().await {
            let progress = parser.push(&chunk?);
            self.deliver_progress(progress, collected)?;
        }
        self.deliver_progress(parser.finish(), collected)
    }

    /// Batches completed ahead of a parse error still reach `on_data`.
    fn deliver_progress(
        &self,
        progress: ParseProgress,
        collected: &mut Vec<RawHighlight>,
    ) -> Result<()> {
        for batch in progress.batches {
            self.deliver(batch, collected)?;
        }
        match progress.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn deliver(&self, batch: HighlightBatch, collected: &mut Vec<RawHighlight>) -> Result<()> {
        let transformed = transform_highlights(&batch)?;
        debug!(records = batch.len(), "Highlight batch received");
        collected.extend(batch);
        self.callbacks.on_data(transformed.highlights_to_store);
        Ok(())
    }
}
