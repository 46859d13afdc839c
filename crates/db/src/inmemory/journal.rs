//! In-memory implementation of the journal.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    errors::DbResult,
    journal::{JournalDb, JournalEntry},
};

/// Journal kept in memory; lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct JournalInMemory {
    /// Pending entry per campaign.
    entries: Arc<RwLock<HashMap<String, JournalEntry>>>,
}

#[async_trait]
impl JournalDb for JournalInMemory {
    async fn pending(&self, campaign: &str) -> DbResult<Option<JournalEntry>> {
        Ok(self.entries.read().await.get(campaign).cloned())
    }

    async fn record(&self, campaign: &str, entry: &JournalEntry) -> DbResult<()> {
        self.entries
            .write()
            .await
            .insert(campaign.to_string(), entry.clone());
        Ok(())
    }

    async fn clear(&self, campaign: &str) -> DbResult<()> {
        self.entries.write().await.remove(campaign);
        Ok(())
    }
}
