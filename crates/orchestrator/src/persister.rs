//! Journaling submissions so that a restarted orchestrator neither loses nor repeats one.

use campaign_db::journal::{JournalDb, JournalEntry};
use campaign_ledger::{context::CampaignContext, gateway::LedgerGateway, submit::PlannedTx};
use campaign_primitives::{
    duties::CampaignDuty, errors::CampaignError, hashes::TxId, time::PosixTime,
};
use campaign_sm::driver::Recovery;
use tracing::{debug, info};

use crate::errors::OrchestratorResult;

/// Writes the journal entry of one campaign.
#[derive(Debug, Clone)]
pub struct Persister<J> {
    journal: J,
    campaign: String,
}

impl<J: JournalDb> Persister<J> {
    /// Journals the campaign described by `ctx`, keyed by its campaign token.
    pub fn new(journal: J, ctx: &CampaignContext) -> Self {
        Self {
            journal,
            campaign: ctx.campaign_token().to_string(),
        }
    }

    /// The journal key of the campaign.
    pub fn campaign(&self) -> &str {
        &self.campaign
    }

    /// Reads the journal left by a previous run and classifies it against the ledger.
    ///
    /// An entry whose inputs are partly spent has settled, by this transaction or by a
    /// competitor, and is dropped along with entries that never reached the gateway.
    pub async fn recover<G>(&self, gateway: &G) -> OrchestratorResult<Recovery>
    where
        G: LedgerGateway + ?Sized,
    {
        let Some(entry) = self.journal.pending(&self.campaign).await? else {
            return Ok(Recovery::Clean);
        };

        for spend in &entry.spends {
            if gateway.is_spent(spend).await.map_err(CampaignError::from)? {
                info!(
                    campaign = %self.campaign, duty = %entry.duty, %spend,
                    "journaled submission settled"
                );
                self.settle().await?;
                return Ok(Recovery::Settled);
            }
        }

        let recovery = match entry.tx_id {
            Some(tx_id) => Recovery::InFlight {
                duty: entry.duty,
                attempt: entry.attempt,
                tx_id,
            },
            None => {
                self.settle().await?;
                Recovery::Abandoned {
                    duty: entry.duty,
                    attempt: entry.attempt,
                }
            }
        };
        info!(campaign = %self.campaign, ?recovery, "recovered journal");
        Ok(recovery)
    }

    /// Journals `planned` before it is handed to the gateway.
    pub async fn begin(
        &self,
        duty: &CampaignDuty,
        attempt: u32,
        planned: &PlannedTx,
        now: PosixTime,
    ) -> OrchestratorResult<JournalEntry> {
        let entry = JournalEntry {
            duty: duty.clone(),
            attempt,
            spends: planned.spends(),
            tx_id: None,
            recorded_at: now,
        };
        self.journal.record(&self.campaign, &entry).await?;
        debug!(campaign = %self.campaign, %duty, attempt, "journaled dispatch");
        Ok(entry)
    }

    /// Journals the id the gateway assigned to `entry`'s transaction.
    pub async fn submitted(&self, mut entry: JournalEntry, tx_id: TxId) -> OrchestratorResult<()> {
        entry.tx_id = Some(tx_id);
        self.journal.record(&self.campaign, &entry).await?;
        Ok(())
    }

    /// Drops the journal entry of the campaign.
    pub async fn settle(&self) -> OrchestratorResult<()> {
        self.journal.clear(&self.campaign).await?;
        Ok(())
    }
}
