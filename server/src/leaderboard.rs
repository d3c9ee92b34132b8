//! Paginated view over the ranked highscore table

use crate::error::Result;
use crate::score_store::ScoreStore;
use shared::{page_count, LeaderboardRow, LeaderboardSummary, DEFAULT_PAGE_SIZE};
use std::sync::Arc;

/// Serves fixed-size pages of players with a positive best score,
/// highest first. Out-of-range pages are empty rather than an error.
#[derive(Clone)]
pub struct LeaderboardQuery {
    store: Arc<dyn ScoreStore>,
    page_size: u32,
}

impl LeaderboardQuery {
    pub fn new(store: Arc<dyn ScoreStore>, page_size: u32) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    pub fn with_default_page_size(store: Arc<dyn ScoreStore>) -> Self {
        Self::new(store, DEFAULT_PAGE_SIZE)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn get_page(&self, page_index: u32) -> Result<Vec<LeaderboardRow>> {
        let offset = (page_index as usize).saturating_mul(self.page_size as usize);
        let rows = self
            .store
            .ranked(offset, self.page_size as usize)?
            .into_iter()
            .map(|entry| LeaderboardRow {
                display_name: entry.display_name,
                score: entry.best_score,
            })
            .collect();
        Ok(rows)
    }

    pub fn get_count(&self) -> Result<u64> {
        Ok(self.store.count_ranked()? as u64)
    }

    pub fn get_page_count(&self) -> Result<u64> {
        Ok(page_count(self.get_count()?, self.page_size))
    }

    pub fn summary(&self) -> Result<LeaderboardSummary> {
        let count = self.get_count()?;
        Ok(LeaderboardSummary {
            count,
            pages: page_count(count, self.page_size),
        })
    }
}
