use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::highlight::StorageHighlight;

/// One past analysis as kept in the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub file_name: String,
    /// RFC 3339 / ISO-8601 timestamp.
    pub timestamp: String,
    #[serde(default)]
    pub highlights: Vec<StorageHighlight>,
}

impl HistoryItem {
    pub fn new(file_name: impl Into<String>, highlights: Vec<StorageHighlight>) -> Self {
        Self::recorded_at(file_name, highlights, Utc::now())
    }

    pub fn recorded_at(
        file_name: impl Into<String>,
        highlights: Vec<StorageHighlight>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file_name: file_name.into(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Secs, true),
            highlights,
        }
    }

    pub fn recorded_time(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|time| time.with_timezone(&Utc))
    }
}
