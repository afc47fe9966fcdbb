use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use tracing::debug;
use validator::Validate;

use crate::domain::error::{AppError, Result};
use crate::domain::settings::AppSettings;

pub const DEFAULT_CONFIG_FILE: &str = "csv-highlights.toml";
pub const ENV_PREFIX: &str = "CSV_HIGHLIGHTS_";

/// Layered settings: built-in defaults, then the TOML file, then
/// `CSV_HIGHLIGHTS_*` environment variables (`__` separates nested keys).
pub struct ConfigService {
    config_path: PathBuf,
}

impl ConfigService {
    pub fn new(config_path: Option<&Path>) -> Self {
        Self {
            config_path: config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn figment(&self) -> Figment {
        Figment::from(Serialized::defaults(AppSettings::default()))
            .merge(Toml::file(&self.config_path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(&self) -> Result<AppSettings> {
        dotenvy::dotenv().ok();
        self.load_from(self.figment())
    }

    fn load_from(&self, figment: Figment) -> Result<AppSettings> {
        let settings: AppSettings = figment
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Failed to load settings: {}", e)))?;
        settings
            .validate()
            .map_err(|e| AppError::ConfigError(format!("Invalid settings: {}", e)))?;

        debug!(
            path = %self.config_path.display(),
            base_url = %settings.service.base_url,
            row_limit = settings.service.row_limit,
            "Settings loaded"
        );
        Ok(settings)
    }
}
