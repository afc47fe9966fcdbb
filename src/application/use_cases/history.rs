use tracing::info;

use crate::domain::error::Result;
use crate::domain::highlight::StorageHighlight;
use crate::domain::history::HistoryItem;
use crate::infrastructure::storage::HistoryRepository;

pub struct HistoryUseCase {
    repository: HistoryRepository,
}

impl HistoryUseCase {
    pub fn new(repository: HistoryRepository) -> Self {
        Self { repository }
    }

    /// Stores a finished analysis as a new history entry.
    pub fn record(
        &self,
        file_name: &str,
        highlights: Vec<StorageHighlight>,
    ) -> Result<HistoryItem> {
        let item = HistoryItem::new(file_name, highlights);
        self.repository.save(&item)?;
        info!(
            id = %item.id,
            file_name = %item.file_name,
            highlights = item.highlights.len(),
            "Analysis recorded in history"
        );
        Ok(item)
    }

    pub fn list(&self) -> Result<Vec<HistoryItem>> {
        self.repository.load_all()
    }

    pub fn show(&self, id: &str) -> Result<HistoryItem> {
        self.repository.get(id)
    }

    pub fn remove(&self, id: &str) -> Result<bool> {
        let removed = self.repository.remove(id)?;
        if removed {
            info!(id = %id, "History item removed");
        }
        Ok(removed)
    }

    pub fn clear(&self) -> Result<()> {
        self.repository.clear()?;
        info!("History cleared");
        Ok(())
    }
}
