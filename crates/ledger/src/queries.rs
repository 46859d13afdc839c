//! Typed ledger queries shared by the campaign operations.

use campaign_primitives::{
    address::Address,
    errors::CampaignResult,
    hashes::PubKeyHash,
    plutus::FromPlutusData,
    utxo::Utxo,
    value::AssetClass,
};
use tracing::warn;

use crate::gateway::LedgerGateway;

/// An unspent record together with its decoded datum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<T> {
    /// The output holding the record.
    pub utxo: Utxo,
    /// The decoded inline datum.
    pub datum: T,
}

/// Fetches the outputs at `address` that hold `asset` and carry a datum decodable as `T`.
///
/// Outputs with a missing or foreign datum are skipped.
pub async fn records_with_asset<G, T>(
    gateway: &G,
    address: &Address,
    asset: &AssetClass,
) -> CampaignResult<Vec<Record<T>>>
where
    G: LedgerGateway + ?Sized,
    T: FromPlutusData,
{
    let utxos = gateway.utxos_with_asset(address, asset).await?;
    let mut records = Vec::with_capacity(utxos.len());
    for utxo in utxos {
        match utxo.output.decode_datum::<T>() {
            Ok(datum) => records.push(Record { utxo, datum }),
            Err(err) => {
                warn!(out_ref = %utxo.out_ref, %asset, %err, "skipping undecodable record");
            }
        }
    }
    Ok(records)
}

/// Total quantity of `asset` held by `key`'s wallet.
pub async fn wallet_balance<G>(
    gateway: &G,
    key: &PubKeyHash,
    asset: &AssetClass,
) -> CampaignResult<u64>
where
    G: LedgerGateway + ?Sized,
{
    let utxos = gateway.wallet_utxos(key).await?;
    Ok(utxos
        .iter()
        .map(|u| u.value().amount_of(asset))
        .fold(0u64, u64::saturating_add))
}
