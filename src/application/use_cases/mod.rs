pub mod analysis_session;
pub mod csv_analysis;
pub mod highlight_transformer;
pub mod history;
pub mod payload_parser;
pub mod report_generation;
