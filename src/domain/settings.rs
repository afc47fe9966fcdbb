use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

pub const DEFAULT_ROW_LIMIT: u32 = 10_000;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct ServiceSettings {
    #[validate(url)]
    pub base_url: String,
    pub analyze_path: String,
    pub report_path: String,
    #[validate(range(min = 1, max = 1_000_000))]
    pub row_limit: u32,
    #[validate(range(min = 1, max = 300))]
    pub connect_timeout_secs: u64,
    #[validate(range(min = 1, max = 3600))]
    pub report_timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            analyze_path: "/aggregate".to_string(),
            report_path: "/report".to_string(),
            row_limit: DEFAULT_ROW_LIMIT,
            connect_timeout_secs: 10,
            report_timeout_secs: 120,
        }
    }
}

impl ServiceSettings {
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StorageSettings {
    pub history_path: PathBuf,
    pub download_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("csv-highlights");
        let download_dir = dirs::download_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            history_path: data_dir.join("history.json"),
            download_dir,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate, Default)]
#[serde(default)]
pub struct AppSettings {
    #[validate(nested)]
    pub service: ServiceSettings,
    pub storage: StorageSettings,
    pub log_level: Option<String>,
}
