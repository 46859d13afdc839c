//! Submitting planned transactions and waiting for them to settle.

use std::time::Duration;

use campaign_primitives::{
    errors::{CampaignError, CampaignResult},
    hashes::{PubKeyHash, TxId},
    utxo::OutputRef,
};
use tracing::{info, warn};

use crate::{gateway::LedgerGateway, skeleton::TxSkeleton};

/// A transaction ready to be handed to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTx {
    /// What the transaction does.
    pub skeleton: TxSkeleton,
    /// Who signs and balances it.
    pub signer: PubKeyHash,
}

impl PlannedTx {
    /// Creates a new plan.
    pub const fn new(skeleton: TxSkeleton, signer: PubKeyHash) -> Self {
        Self { skeleton, signer }
    }

    /// Outputs consumed by the transaction.
    pub fn spends(&self) -> Vec<OutputRef> {
        self.skeleton.spent_refs()
    }
}

/// Submits the planned transaction and returns its id without waiting for inclusion.
pub async fn submit<G>(gateway: &G, planned: &PlannedTx) -> CampaignResult<TxId>
where
    G: LedgerGateway + ?Sized,
{
    let label = planned.skeleton.label();
    let tx_id = gateway
        .submit(&planned.skeleton, &planned.signer)
        .await
        .inspect_err(|err| warn!(%label, %err, "submission failed"))?;
    info!(%label, %tx_id, signer = %planned.signer, "submitted transaction");
    Ok(tx_id)
}

/// Waits for `tx_id` to be included.
///
/// A transaction that does not settle within `timeout` is reported as a ledger rejection: it may
/// still land later, so callers re-derive the state before trying again.
pub async fn confirm<G>(gateway: &G, tx_id: &TxId, timeout: Duration) -> CampaignResult<()>
where
    G: LedgerGateway + ?Sized,
{
    if gateway.await_confirmation(tx_id, timeout).await? {
        info!(%tx_id, "transaction confirmed");
        return Ok(());
    }
    warn!(%tx_id, timeout_secs = timeout.as_secs(), "transaction not confirmed in time");
    Err(CampaignError::LedgerRejection(format!(
        "transaction {tx_id} not confirmed within {}s",
        timeout.as_secs()
    )))
}

/// Submits the planned transaction and waits for it to be included.
pub async fn submit_and_confirm<G>(
    gateway: &G,
    planned: &PlannedTx,
    timeout: Duration,
) -> CampaignResult<TxId>
where
    G: LedgerGateway + ?Sized,
{
    let tx_id = submit(gateway, planned).await?;
    confirm(gateway, &tx_id, timeout).await?;
    Ok(tx_id)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use campaign_primitives::{
        address::Address, errors::ErrorKind, time::PosixTime, utxo::Utxo, value::AssetClass,
    };

    use super::*;
    use crate::{errors::GatewayError, gateway::GatewayResult};

    /// Accepts every submission and confirms only when told to.
    #[derive(Debug, Default)]
    struct StubGateway {
        confirms: bool,
        submitted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LedgerGateway for StubGateway {
        async fn current_time(&self) -> GatewayResult<PosixTime> {
            Ok(PosixTime(0))
        }

        async fn utxos_at(&self, _address: &Address) -> GatewayResult<Vec<Utxo>> {
            Ok(vec![])
        }

        async fn utxos_with_asset(
            &self,
            _address: &Address,
            _asset: &AssetClass,
        ) -> GatewayResult<Vec<Utxo>> {
            Ok(vec![])
        }

        async fn wallet_utxos(&self, _key: &PubKeyHash) -> GatewayResult<Vec<Utxo>> {
            Ok(vec![])
        }

        async fn submit(&self, skeleton: &TxSkeleton, _signer: &PubKeyHash) -> GatewayResult<TxId> {
            let mut submitted = self
                .submitted
                .lock()
                .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
            submitted.push(skeleton.label().to_string());
            Ok(TxId::digest(skeleton.label()))
        }

        async fn await_confirmation(
            &self,
            _tx_id: &TxId,
            _timeout: Duration,
        ) -> GatewayResult<bool> {
            Ok(self.confirms)
        }

        async fn is_spent(&self, _out_ref: &OutputRef) -> GatewayResult<bool> {
            Ok(false)
        }
    }

    fn planned(label: &str) -> PlannedTx {
        PlannedTx::new(TxSkeleton::new(label), PubKeyHash::new([1; 28]))
    }

    #[tokio::test]
    async fn test_submit_and_confirm_returns_tx_id() {
        let gateway = StubGateway {
            confirms: true,
            ..Default::default()
        };
        let tx_id = submit_and_confirm(&gateway, &planned("insert"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(tx_id, TxId::digest("insert"));
        assert_eq!(*gateway.submitted.lock().unwrap(), vec!["insert".to_string()]);
    }

    #[tokio::test]
    async fn test_unconfirmed_transaction_is_recoverable() {
        let gateway = StubGateway::default();
        let err = submit_and_confirm(&gateway, &planned("advance"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LedgerRejection);
        assert!(err.is_recoverable());
    }
}
