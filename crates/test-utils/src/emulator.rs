//! An in-memory ledger.
//!
//! The emulator applies transactions atomically, rejects conflicting spends and balances every
//! submission from the signer's wallet, the way a real gateway would. Authorization scripts are
//! not evaluated: whatever a skeleton mints is accepted. There are no fees.

use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    time::Duration,
};

use async_trait::async_trait;
use campaign_ledger::{
    errors::GatewayError,
    gateway::{GatewayResult, LedgerGateway},
    skeleton::TxSkeleton,
};
use campaign_primitives::{
    address::{Address, Credential},
    hashes::{PubKeyHash, TxId},
    time::PosixTime,
    utxo::{OutputRef, TxOutput, Utxo},
    value::{AssetClass, Value},
};
use tokio::sync::Mutex;
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct State {
    now: PosixTime,
    clock_step: Duration,
    utxos: BTreeMap<OutputRef, TxOutput>,
    supply: BTreeMap<AssetClass, i128>,
    confirmed: BTreeSet<TxId>,
    history: Vec<String>,
    tx_count: u64,
    genesis_count: u64,
    injected_failures: VecDeque<GatewayError>,
    withheld_confirmations: usize,
}

/// A ledger living in memory, shared by reference between the parties of a test.
#[derive(Debug, Default)]
pub struct LedgerEmulator {
    state: Mutex<State>,
}

impl LedgerEmulator {
    /// Creates an empty ledger whose clock reads `now`.
    pub fn new(now: PosixTime) -> Self {
        Self {
            state: Mutex::new(State {
                now,
                ..Default::default()
            }),
        }
    }

    /// Creates an output out of thin air, e.g. to fund a wallet.
    pub async fn seed(&self, output: TxOutput) -> Utxo {
        let mut state = self.state.lock().await;
        state.genesis_count += 1;
        let out_ref = OutputRef::new(
            TxId::digest(format!("genesis:{}", state.genesis_count)),
            0,
        );
        for (asset, amount) in output.value.iter() {
            if !asset.is_lovelace() {
                *state.supply.entry(asset.clone()).or_insert(0) += i128::from(amount);
            }
        }
        state.utxos.insert(out_ref, output.clone());
        Utxo { out_ref, output }
    }

    /// Pays `value` to `key`'s wallet.
    pub async fn fund(&self, key: PubKeyHash, value: Value) -> Utxo {
        self.seed(TxOutput::new(Address::from_key(key), value)).await
    }

    /// Sets the clock.
    pub async fn set_time(&self, now: PosixTime) {
        self.state.lock().await.now = now;
    }

    /// Moves the clock forward.
    pub async fn advance_time(&self, by: Duration) {
        let mut state = self.state.lock().await;
        state.now = state.now.saturating_add(by);
    }

    /// Makes the clock move forward by `step` every time it is read.
    pub async fn set_clock_step(&self, step: Duration) {
        self.state.lock().await.clock_step = step;
    }

    /// The current reading of the clock, without moving it.
    pub async fn now(&self) -> PosixTime {
        self.state.lock().await.now
    }

    /// Makes the next submission fail with `err` without touching the ledger.
    pub async fn inject_failure(&self, err: GatewayError) {
        self.state.lock().await.injected_failures.push_back(err);
    }

    /// Makes the next `n` confirmation queries time out even though the transactions landed.
    pub async fn withhold_confirmations(&self, n: usize) {
        self.state.lock().await.withheld_confirmations = n;
    }

    /// The unspent output at `out_ref`.
    pub async fn utxo(&self, out_ref: &OutputRef) -> Option<Utxo> {
        let state = self.state.lock().await;
        state.utxos.get(out_ref).map(|output| Utxo {
            out_ref: *out_ref,
            output: output.clone(),
        })
    }

    /// Sum of everything held at `address`.
    pub async fn value_at(&self, address: &Address) -> Value {
        let state = self.state.lock().await;
        state
            .utxos
            .values()
            .filter(|o| o.address == *address)
            .fold(Value::zero(), |acc, o| acc.merge(&o.value))
    }

    /// Sum of everything held by `key`'s wallet.
    pub async fn balance_of(&self, key: &PubKeyHash) -> Value {
        let state = self.state.lock().await;
        state
            .utxos
            .values()
            .filter(|o| o.address.payment == Credential::PubKey(*key))
            .fold(Value::zero(), |acc, o| acc.merge(&o.value))
    }

    /// Circulating quantity of a native token.
    pub async fn supply_of(&self, asset: &AssetClass) -> i128 {
        self.state
            .lock()
            .await
            .supply
            .get(asset)
            .copied()
            .unwrap_or(0)
    }

    /// Labels of the applied transactions, oldest first.
    pub async fn history(&self) -> Vec<String> {
        self.state.lock().await.history.clone()
    }
}

impl State {
    fn utxos_where(&self, pred: impl Fn(&TxOutput) -> bool) -> Vec<Utxo> {
        self.utxos
            .iter()
            .filter(|(_, o)| pred(o))
            .map(|(out_ref, output)| Utxo {
                out_ref: *out_ref,
                output: output.clone(),
            })
            .collect()
    }

    fn apply(&mut self, skeleton: &TxSkeleton, signer: &PubKeyHash) -> GatewayResult<TxId> {
        if let Some(window) = skeleton.validity() {
            if !window.contains(self.now) {
                return Err(GatewayError::Rejected(format!(
                    "validity window [{}, {}] does not contain {}",
                    window.lower, window.upper, self.now
                )));
            }
        }
        if let Some(missing) = skeleton.required_signers().iter().find(|k| *k != signer) {
            return Err(GatewayError::Rejected(format!("missing signature of {missing}")));
        }

        let mut spent = BTreeSet::new();
        for input in skeleton.inputs() {
            let out_ref = input.utxo.out_ref;
            let Some(output) = self.utxos.get(&out_ref) else {
                return Err(GatewayError::Rejected(format!("input {out_ref} already spent")));
            };
            if !spent.insert(out_ref) {
                return Err(GatewayError::Rejected(format!("input {out_ref} spent twice")));
            }
            match (&output.address.payment, &input.redeemer) {
                (Credential::PubKey(owner), None) if owner != signer => {
                    return Err(GatewayError::Rejected(format!(
                        "input {out_ref} belongs to {owner}"
                    )));
                }
                (Credential::Script(_), None) => {
                    return Err(GatewayError::Rejected(format!(
                        "script input {out_ref} has no redeemer"
                    )));
                }
                _ => {}
            }
        }
        for utxo in skeleton.reference_inputs() {
            if !self.utxos.contains_key(&utxo.out_ref) {
                return Err(GatewayError::Rejected(format!(
                    "reference input {} already spent",
                    utxo.out_ref
                )));
            }
        }

        let input_value = skeleton.input_value();
        let mut available = input_value.clone();
        let mut required = skeleton.output_value();
        for (asset, quantity) in skeleton.mint_value().iter() {
            let amount = u64::try_from(quantity.unsigned_abs()).unwrap_or(u64::MAX);
            if quantity > 0 {
                available.add(asset.clone(), amount);
            } else {
                if input_value.amount_of(asset) < amount {
                    return Err(GatewayError::Rejected(format!(
                        "burning {amount} {asset} but only {} spent",
                        input_value.amount_of(asset)
                    )));
                }
                required.add(asset.clone(), amount);
            }
        }
        for withdrawal in skeleton.withdrawals() {
            available.add(AssetClass::lovelace(), withdrawal.amount);
        }

        // Balance from the signer's wallet.
        let referenced: BTreeSet<OutputRef> = skeleton
            .reference_inputs()
            .iter()
            .map(|u| u.out_ref)
            .collect();
        let mut wallet_inputs = Vec::new();
        while !available.covers(&required) {
            let short: Vec<&AssetClass> = required
                .iter()
                .filter(|(asset, amount)| available.amount_of(asset) < *amount)
                .map(|(asset, _)| asset)
                .collect();
            let candidate = self.utxos.iter().find(|(out_ref, output)| {
                output.address.payment == Credential::PubKey(*signer)
                    && !spent.contains(*out_ref)
                    && !referenced.contains(*out_ref)
                    && short.iter().any(|asset| output.value.amount_of(asset) > 0)
            });
            let Some((out_ref, output)) = candidate else {
                let missing = short
                    .iter()
                    .map(|asset| {
                        format!(
                            "{} {asset}",
                            required.amount_of(asset) - available.amount_of(asset)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(GatewayError::InsufficientFunds(format!(
                    "{signer} lacks {missing}"
                )));
            };
            available = available.merge(&output.value);
            spent.insert(*out_ref);
            wallet_inputs.push(*out_ref);
        }
        let change = available.checked_sub(&required).unwrap_or_default();

        self.tx_count += 1;
        let tx_id = TxId::digest(format!("{}:{}", self.tx_count, skeleton.label()));
        for out_ref in &spent {
            self.utxos.remove(out_ref);
        }
        let mut outputs = skeleton.outputs().to_vec();
        if !change.is_zero() {
            outputs.push(TxOutput::new(Address::from_key(*signer), change));
        }
        for (index, output) in outputs.into_iter().enumerate() {
            let index = u32::try_from(index).unwrap_or(u32::MAX);
            self.utxos.insert(OutputRef::new(tx_id, index), output);
        }
        for (asset, quantity) in skeleton.mint_value().iter() {
            *self.supply.entry(asset.clone()).or_insert(0) += quantity;
        }
        self.confirmed.insert(tx_id);
        self.history.push(skeleton.label().to_string());

        debug!(
            label = skeleton.label(),
            %tx_id,
            wallet_inputs = wallet_inputs.len(),
            "emulator applied transaction"
        );
        Ok(tx_id)
    }
}

#[async_trait]
impl LedgerGateway for LedgerEmulator {
    async fn current_time(&self) -> GatewayResult<PosixTime> {
        let mut state = self.state.lock().await;
        let now = state.now;
        state.now = now.saturating_add(state.clock_step);
        Ok(now)
    }

    async fn utxos_at(&self, address: &Address) -> GatewayResult<Vec<Utxo>> {
        let state = self.state.lock().await;
        Ok(state.utxos_where(|o| o.address == *address))
    }

    async fn utxos_with_asset(
        &self,
        address: &Address,
        asset: &AssetClass,
    ) -> GatewayResult<Vec<Utxo>> {
        let state = self.state.lock().await;
        Ok(state.utxos_where(|o| o.address == *address && o.value.amount_of(asset) > 0))
    }

    async fn wallet_utxos(&self, key: &PubKeyHash) -> GatewayResult<Vec<Utxo>> {
        let state = self.state.lock().await;
        Ok(state.utxos_where(|o| o.address.payment == Credential::PubKey(*key)))
    }

    async fn submit(&self, skeleton: &TxSkeleton, signer: &PubKeyHash) -> GatewayResult<TxId> {
        let mut state = self.state.lock().await;
        if let Some(err) = state.injected_failures.pop_front() {
            trace!(label = skeleton.label(), %err, "injecting submission failure");
            return Err(err);
        }
        state.apply(skeleton, signer)
    }

    async fn await_confirmation(&self, tx_id: &TxId, _timeout: Duration) -> GatewayResult<bool> {
        let mut state = self.state.lock().await;
        if state.withheld_confirmations > 0 {
            state.withheld_confirmations -= 1;
            return Ok(false);
        }
        Ok(state.confirmed.contains(tx_id))
    }

    async fn is_spent(&self, out_ref: &OutputRef) -> GatewayResult<bool> {
        Ok(!self.state.lock().await.utxos.contains_key(out_ref))
    }
}

#[cfg(test)]
mod tests {
    use campaign_primitives::{
        hashes::PolicyId, plutus::PlutusData, time::ValidityWindow, value::AssetName,
    };

    use super::*;

    fn key(b: u8) -> PubKeyHash {
        PubKeyHash::new([b; 28])
    }

    fn token() -> AssetClass {
        AssetClass::new(PolicyId::new([7; 28]), AssetName::new(*b"STAKE").unwrap())
    }

    #[tokio::test]
    async fn test_balances_from_wallet_and_returns_change() {
        let ledger = LedgerEmulator::new(PosixTime(0));
        ledger.fund(key(1), Value::from_lovelace(10)).await;

        let mut tx = TxSkeleton::new("pay");
        tx.pay(TxOutput::new(Address::from_key(key(2)), Value::from_lovelace(4)));
        ledger.submit(&tx, &key(1)).await.unwrap();

        assert_eq!(ledger.balance_of(&key(1)).await, Value::from_lovelace(6));
        assert_eq!(ledger.balance_of(&key(2)).await, Value::from_lovelace(4));
        assert_eq!(ledger.history().await, vec!["pay".to_string()]);
    }

    #[tokio::test]
    async fn test_insufficient_funds_leave_ledger_untouched() {
        let ledger = LedgerEmulator::new(PosixTime(0));
        ledger.fund(key(1), Value::from_lovelace(3)).await;

        let mut tx = TxSkeleton::new("pay");
        tx.pay(TxOutput::new(
            Address::from_key(key(2)),
            Value::from_lovelace(1).with(token(), 5),
        ));
        let err = ledger.submit(&tx, &key(1)).await.unwrap_err();

        assert!(matches!(err, GatewayError::InsufficientFunds(_)));
        assert_eq!(ledger.balance_of(&key(1)).await, Value::from_lovelace(3));
        assert!(ledger.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_second_spend_of_same_input_is_rejected() {
        let ledger = LedgerEmulator::new(PosixTime(0));
        let script = Address::from_script(campaign_primitives::hashes::ScriptHash::new([9; 28]));
        let record = ledger
            .seed(TxOutput::new(script, Value::from_lovelace(2)))
            .await;

        let mut tx = TxSkeleton::new("claim");
        tx.spend(&record, &PlutusData::unit());
        ledger.submit(&tx, &key(1)).await.unwrap();
        let err = ledger.submit(&tx, &key(1)).await.unwrap_err();

        assert!(matches!(err, GatewayError::Rejected(_)));
        assert!(ledger.is_spent(&record.out_ref).await.unwrap());
    }

    #[tokio::test]
    async fn test_validity_window_is_enforced() {
        let ledger = LedgerEmulator::new(PosixTime(1_000));
        ledger.fund(key(1), Value::from_lovelace(10)).await;

        let mut tx = TxSkeleton::new("late");
        tx.valid_in(ValidityWindow {
            lower: PosixTime(0),
            upper: PosixTime(500),
        });
        let err = ledger.submit(&tx, &key(1)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_mint_and_burn_track_supply() {
        let ledger = LedgerEmulator::new(PosixTime(0));
        ledger.fund(key(1), Value::from_lovelace(10)).await;

        let mut mint = TxSkeleton::new("mint");
        mint.mint(token(), 3, &PlutusData::unit());
        ledger.submit(&mint, &key(1)).await.unwrap();
        assert_eq!(ledger.supply_of(&token()).await, 3);
        assert_eq!(ledger.balance_of(&key(1)).await.amount_of(&token()), 3);

        let wallet = ledger.wallet_utxos(&key(1)).await.unwrap();
        let mut burn = TxSkeleton::new("burn");
        for utxo in &wallet {
            burn.spend_from_wallet(utxo);
        }
        burn.mint(token(), -3, &PlutusData::unit());
        ledger.submit(&burn, &key(1)).await.unwrap();
        assert_eq!(ledger.supply_of(&token()).await, 0);
    }

    #[tokio::test]
    async fn test_injected_failure_is_returned_once() {
        let ledger = LedgerEmulator::new(PosixTime(0));
        ledger
            .inject_failure(GatewayError::Unavailable("down".into()))
            .await;

        let tx = TxSkeleton::new("noop");
        assert!(ledger.submit(&tx, &key(1)).await.is_err());
        let tx_id = ledger.submit(&tx, &key(1)).await.unwrap();
        assert!(ledger
            .await_confirmation(&tx_id, Duration::from_secs(1))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_clock_step_advances_on_read() {
        let ledger = LedgerEmulator::new(PosixTime(0));
        ledger.set_clock_step(Duration::from_secs(1)).await;
        assert_eq!(ledger.current_time().await.unwrap(), PosixTime(0));
        assert_eq!(ledger.current_time().await.unwrap(), PosixTime(1_000));
    }
}
