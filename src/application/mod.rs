pub mod use_cases;

pub use use_cases::analysis_session::{AnalysisSession, SessionRecorder, SessionStatus};
pub use use_cases::csv_analysis::{
    AbortHandle, AbortSignal, AnalysisCallbacks, CallbackSet, CsvAnalysisUseCase,
};
pub use use_cases::history::HistoryUseCase;
pub use use_cases::report_generation::ReportUseCase;
