//! The journal contract.

use std::sync::Arc;

use async_trait::async_trait;
use campaign_primitives::{
    duties::CampaignDuty,
    hashes::TxId,
    time::PosixTime,
    utxo::OutputRef,
};
use serde::{Deserialize, Serialize};

use crate::errors::DbResult;

/// A submission the orchestrator started and has not seen confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// The duty being carried out.
    pub duty: CampaignDuty,

    /// 1-based attempt number.
    pub attempt: u32,

    /// Outputs the transaction consumes; once any of them is gone the transaction (or a
    /// competitor) has settled.
    pub spends: Vec<OutputRef>,

    /// Id returned by the gateway, `None` until the submission went through.
    pub tx_id: Option<TxId>,

    /// Ledger time at which the entry was written.
    pub recorded_at: PosixTime,
}

/// Storage of the in-flight submission of each campaign.
#[async_trait]
pub trait JournalDb: Send + Sync {
    /// The pending entry of `campaign`, if any.
    async fn pending(&self, campaign: &str) -> DbResult<Option<JournalEntry>>;

    /// Writes `entry` as the pending entry of `campaign`, replacing any previous one.
    async fn record(&self, campaign: &str, entry: &JournalEntry) -> DbResult<()>;

    /// Removes the pending entry of `campaign`.
    async fn clear(&self, campaign: &str) -> DbResult<()>;
}

#[async_trait]
impl<J: JournalDb + ?Sized> JournalDb for Arc<J> {
    async fn pending(&self, campaign: &str) -> DbResult<Option<JournalEntry>> {
        (**self).pending(campaign).await
    }

    async fn record(&self, campaign: &str, entry: &JournalEntry) -> DbResult<()> {
        (**self).record(campaign, entry).await
    }

    async fn clear(&self, campaign: &str) -> DbResult<()> {
        (**self).clear(campaign).await
    }
}
