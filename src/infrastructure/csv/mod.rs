// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Pre-flight inspection of CSV uploads

mod csv_inspector;

pub use csv_inspector::{CsvInspector, CsvSummary};
