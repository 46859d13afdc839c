//! Everything an operation needs to know about the campaign it acts on.

use campaign_params::{protocol::ProtocolParams, scripts::ScriptParams, CampaignParams};
use campaign_primitives::{
    datums::CampaignConfig,
    errors::{CampaignError, CampaignResult},
    time::{PosixTime, ValidityWindow},
    utxo::Utxo,
    value::{AssetName, Value},
};
use tracing::debug;

use crate::{gateway::LedgerGateway, queries::records_with_asset};

/// The parameters of a deployed campaign together with its on-ledger configuration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignContext {
    /// Protocol parameters and script hashes.
    pub params: CampaignParams,
    /// The decoded configuration record.
    pub config: CampaignConfig,
    /// The output holding the configuration record, read by nearly every transaction.
    pub config_utxo: Utxo,
}

impl CampaignContext {
    /// Looks up the configuration record of the campaign named `campaign_token`.
    ///
    /// A missing or inconsistent record is a configuration error.
    pub async fn load<G>(
        gateway: &G,
        params: CampaignParams,
        campaign_token: &AssetName,
    ) -> CampaignResult<Self>
    where
        G: LedgerGateway + ?Sized,
    {
        let scripts = params.scripts;
        let asset = scripts.campaign_token(campaign_token.clone());
        let mut records =
            records_with_asset::<_, CampaignConfig>(gateway, &scripts.config_address(), &asset)
                .await?;

        let record = match records.len() {
            0 => {
                return Err(CampaignError::Configuration(format!(
                    "no config record for campaign {campaign_token}"
                )))
            }
            1 => records.remove(0),
            n => {
                return Err(CampaignError::Configuration(format!(
                    "{n} config records for campaign {campaign_token}"
                )))
            }
        };

        if record.datum.campaign_token_name() != *campaign_token {
            return Err(CampaignError::Configuration(format!(
                "config record at {} belongs to another campaign",
                record.utxo.out_ref
            )));
        }
        record.datum.validate()?;

        debug!(config = %record.utxo.out_ref, %campaign_token, "loaded campaign config");
        Ok(Self {
            params,
            config: record.datum,
            config_utxo: record.utxo,
        })
    }

    /// Builds a context from already known parts.
    pub fn new(params: CampaignParams, config: CampaignConfig, config_utxo: Utxo) -> Self {
        Self {
            params,
            config,
            config_utxo,
        }
    }

    /// Name of the campaign token.
    pub fn campaign_token(&self) -> AssetName {
        self.config.campaign_token_name()
    }

    /// Protocol parameters.
    pub const fn protocol(&self) -> &ProtocolParams {
        &self.params.protocol
    }

    /// Script hashes.
    pub const fn scripts(&self) -> &ScriptParams {
        &self.params.scripts
    }

    /// The validity window of a transaction built at `now`.
    pub fn validity_window(&self, now: PosixTime) -> ValidityWindow {
        ValidityWindow::around(now, self.params.protocol.validity_tolerance)
    }

    /// Stake held by a value.
    pub fn stake_of(&self, value: &Value) -> u64 {
        value.amount_of(&self.config.stake_asset)
    }

    /// Reward held by a value.
    pub fn reward_of(&self, value: &Value) -> u64 {
        value.amount_of(&self.config.reward_asset)
    }
}
