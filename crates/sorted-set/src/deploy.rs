//! Publishing the campaign configuration record.

use std::time::Duration;

use campaign_ledger::{
    context::CampaignContext,
    gateway::LedgerGateway,
    queries::records_with_asset,
    skeleton::TxSkeleton,
    submit::{submit_and_confirm, PlannedTx},
};
use campaign_params::CampaignParams;
use campaign_primitives::{
    datums::CampaignConfig,
    errors::{CampaignError, CampaignResult},
    hashes::PubKeyHash,
    utxo::{TxOutput, Utxo},
    value::Value,
};
use tracing::info;

/// Plans the config record of `config`, minting the campaign token under the one-shot output.
///
/// The one-shot output is only read here; the head creation spends it.
pub fn plan_deploy_config(
    params: &CampaignParams,
    config: &CampaignConfig,
    init_utxo: &Utxo,
    signer: PubKeyHash,
) -> CampaignResult<PlannedTx> {
    config.validate()?;
    if init_utxo.out_ref != config.init_utxo {
        return Err(CampaignError::Configuration(format!(
            "expected one-shot output {}, got {}",
            config.init_utxo, init_utxo.out_ref
        )));
    }
    let token = params
        .scripts
        .campaign_token(config.campaign_token_name());

    let mut tx = TxSkeleton::new("deploy-config");
    tx.read(init_utxo)
        .mint(token.clone(), 1, &config.init_utxo)
        .require_signer(signer);
    tx.pay(
        TxOutput::new(
            params.scripts.config_address(),
            Value::from_lovelace(params.protocol.record_floor).with(token, 1),
        )
        .with_datum(config),
    );
    Ok(PlannedTx::new(tx, signer))
}

/// Publishes `config` and returns the context of the new campaign.
pub async fn deploy_config<G>(
    gateway: &G,
    params: CampaignParams,
    config: CampaignConfig,
    signer: PubKeyHash,
    timeout: Duration,
) -> CampaignResult<CampaignContext>
where
    G: LedgerGateway + ?Sized,
{
    config.validate()?;
    let name = config.campaign_token_name();
    let token = params.scripts.campaign_token(name.clone());
    let existing =
        records_with_asset::<_, CampaignConfig>(gateway, &params.scripts.config_address(), &token)
            .await?;
    if !existing.is_empty() {
        return Err(CampaignError::DuplicateKey(format!(
            "campaign {name} already deployed"
        )));
    }

    let init_utxo = gateway
        .wallet_utxos(&signer)
        .await?
        .into_iter()
        .find(|u| u.out_ref == config.init_utxo)
        .ok_or_else(|| {
            CampaignError::Configuration(format!(
                "{} is not in the wallet of {signer}",
                config.init_utxo
            ))
        })?;

    let planned = plan_deploy_config(&params, &config, &init_utxo, signer)?;
    let tx_id = submit_and_confirm(gateway, &planned, timeout).await?;
    info!(%tx_id, campaign = %name, "deployed campaign config");

    CampaignContext::load(gateway, params, &name).await
}
