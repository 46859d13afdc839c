//! The ledger gateway contract.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use campaign_primitives::{
    address::Address,
    hashes::{PubKeyHash, TxId},
    time::PosixTime,
    utxo::{OutputRef, Utxo},
    value::AssetClass,
};

use crate::{errors::GatewayError, skeleton::TxSkeleton};

/// Result type of every gateway call.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Access to the ledger: queries, submission and confirmation.
///
/// Implementations balance a submitted [`TxSkeleton`] from the signer's wallet (adding inputs and
/// a change output as needed), sign it with the signer's key and submit it. Application is
/// atomic: a transaction either takes effect as a whole or not at all.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// The ledger's notion of the current time.
    async fn current_time(&self) -> GatewayResult<PosixTime>;

    /// All unspent outputs at `address`.
    async fn utxos_at(&self, address: &Address) -> GatewayResult<Vec<Utxo>>;

    /// Unspent outputs at `address` holding at least one unit of `asset`.
    async fn utxos_with_asset(
        &self,
        address: &Address,
        asset: &AssetClass,
    ) -> GatewayResult<Vec<Utxo>>;

    /// Unspent outputs controlled by `key`.
    async fn wallet_utxos(&self, key: &PubKeyHash) -> GatewayResult<Vec<Utxo>>;

    /// Balances, signs and submits the transaction, returning its id.
    async fn submit(&self, skeleton: &TxSkeleton, signer: &PubKeyHash) -> GatewayResult<TxId>;

    /// Waits up to `timeout` for the transaction to be included; `false` if it was not.
    async fn await_confirmation(&self, tx_id: &TxId, timeout: Duration) -> GatewayResult<bool>;

    /// Whether the output has been consumed (or never existed).
    async fn is_spent(&self, out_ref: &OutputRef) -> GatewayResult<bool>;
}

#[async_trait]
impl<G: LedgerGateway + ?Sized> LedgerGateway for Arc<G> {
    async fn current_time(&self) -> GatewayResult<PosixTime> {
        (**self).current_time().await
    }

    async fn utxos_at(&self, address: &Address) -> GatewayResult<Vec<Utxo>> {
        (**self).utxos_at(address).await
    }

    async fn utxos_with_asset(
        &self,
        address: &Address,
        asset: &AssetClass,
    ) -> GatewayResult<Vec<Utxo>> {
        (**self).utxos_with_asset(address, asset).await
    }

    async fn wallet_utxos(&self, key: &PubKeyHash) -> GatewayResult<Vec<Utxo>> {
        (**self).wallet_utxos(key).await
    }

    async fn submit(&self, skeleton: &TxSkeleton, signer: &PubKeyHash) -> GatewayResult<TxId> {
        (**self).submit(skeleton, signer).await
    }

    async fn await_confirmation(&self, tx_id: &TxId, timeout: Duration) -> GatewayResult<bool> {
        (**self).await_confirmation(tx_id, timeout).await
    }

    async fn is_spent(&self, out_ref: &OutputRef) -> GatewayResult<bool> {
        (**self).is_spent(out_ref).await
    }
}
