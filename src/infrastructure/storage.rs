use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::error::{AppError, Result};
use crate::domain::history::HistoryItem;

/// History store: one JSON object on disk mapping item id to item.
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    path: PathBuf,
}

impl HistoryRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored item, newest first.
    pub fn load_all(&self) -> Result<Vec<HistoryItem>> {
        let mut items: Vec<HistoryItem> = self.read_map()?.into_values().collect();
        items.sort_by(|a, b| {
            b.recorded_time()
                .cmp(&a.recorded_time())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(items)
    }

    pub fn get(&self, id: &str) -> Result<HistoryItem> {
        self.read_map()?
            .remove(id)
            .ok_or_else(|| AppError::NotFound(format!("History item {}", id)))
    }

    pub fn save(&self, item: &HistoryItem) -> Result<()> {
        let mut map = self.read_map()?;
        map.insert(item.id.clone(), item.clone());
        self.write_map(&map)
    }

    /// Returns whether an item was removed.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let mut map = self.read_map()?;
        let removed = map.remove(id).is_some();
        if removed {
            self.write_map(&map)?;
        }
        Ok(removed)
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                AppError::IoError(format!(
                    "Failed to clear history at {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    fn read_map(&self) -> Result<HashMap<String, HistoryItem>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| {
            AppError::IoError(format!(
                "Failed to read history at {}: {}",
                self.path.display(),
                e
            ))
        })?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            AppError::ParseError(format!(
                "Failed to parse history at {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn write_map(&self, map: &HashMap<String, HistoryItem>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let serialized = serde_json::to_string_pretty(map)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serialized)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.as_os_str().is_empty() && !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
