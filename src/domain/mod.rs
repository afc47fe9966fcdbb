pub mod analysis;
pub mod error;
pub mod highlight;
pub mod history;
pub mod report;
pub mod settings;
