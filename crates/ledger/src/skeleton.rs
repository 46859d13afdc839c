//! Unbalanced transaction descriptions.

use campaign_primitives::{
    address::Credential,
    hashes::PubKeyHash,
    plutus::{PlutusData, ToPlutusData},
    time::ValidityWindow,
    utxo::{OutputRef, TxOutput, Utxo},
    value::{AssetClass, MintValue, Value},
};

/// An input consumed by the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// The consumed output.
    pub utxo: Utxo,
    /// Selector for the guarding script, `None` for key-controlled outputs.
    pub redeemer: Option<PlutusData>,
}

/// Tokens minted or burned under one policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintEntry {
    /// The token.
    pub asset: AssetClass,
    /// Positive to mint, negative to burn.
    pub quantity: i128,
    /// Selector for the minting policy.
    pub redeemer: PlutusData,
}

/// A withdrawal from a stake credential, used to run a stake script once per transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    /// The stake credential.
    pub credential: Credential,
    /// Withdrawn amount, zero to merely trigger the script.
    pub amount: u64,
    /// Selector for the stake script.
    pub redeemer: PlutusData,
}

/// What a transaction must do, before the gateway balances it from the signer's wallet.
///
/// Inputs and reference inputs are kept in insertion order; the ledger sorts them by
/// [`OutputRef`], which is what [`Self::input_index`] and [`Self::reference_index`] report.
/// Outputs keep their insertion order, and balancing only ever appends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxSkeleton {
    label: String,
    inputs: Vec<TxInput>,
    reference_inputs: Vec<Utxo>,
    outputs: Vec<TxOutput>,
    mints: Vec<MintEntry>,
    withdrawals: Vec<Withdrawal>,
    validity: Option<ValidityWindow>,
    required_signers: Vec<PubKeyHash>,
}

impl TxSkeleton {
    /// Starts an empty transaction; `label` names it in logs.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Consumes a script-guarded output.
    pub fn spend(&mut self, utxo: &Utxo, redeemer: &impl ToPlutusData) -> &mut Self {
        self.inputs.push(TxInput {
            utxo: utxo.clone(),
            redeemer: Some(redeemer.to_plutus_data()),
        });
        self
    }

    /// Consumes a key-controlled output.
    pub fn spend_from_wallet(&mut self, utxo: &Utxo) -> &mut Self {
        self.inputs.push(TxInput {
            utxo: utxo.clone(),
            redeemer: None,
        });
        self
    }

    /// Reads an output without consuming it.
    pub fn read(&mut self, utxo: &Utxo) -> &mut Self {
        if !self.reference_inputs.iter().any(|u| u.out_ref == utxo.out_ref) {
            self.reference_inputs.push(utxo.clone());
        }
        self
    }

    /// Creates an output, returning its position.
    pub fn pay(&mut self, output: TxOutput) -> u32 {
        self.outputs.push(output);
        u32::try_from(self.outputs.len() - 1).unwrap_or(u32::MAX)
    }

    /// Mints (positive) or burns (negative) `quantity` of `asset`.
    pub fn mint(
        &mut self,
        asset: AssetClass,
        quantity: i128,
        redeemer: &impl ToPlutusData,
    ) -> &mut Self {
        self.mints.push(MintEntry {
            asset,
            quantity,
            redeemer: redeemer.to_plutus_data(),
        });
        self
    }

    /// Withdraws `amount` from a stake credential.
    pub fn withdraw(
        &mut self,
        credential: Credential,
        amount: u64,
        redeemer: &impl ToPlutusData,
    ) -> &mut Self {
        self.withdrawals.push(Withdrawal {
            credential,
            amount,
            redeemer: redeemer.to_plutus_data(),
        });
        self
    }

    /// Restricts inclusion to `window`.
    pub fn valid_in(&mut self, window: ValidityWindow) -> &mut Self {
        self.validity = Some(window);
        self
    }

    /// Requires a signature of `key`.
    pub fn require_signer(&mut self, key: PubKeyHash) -> &mut Self {
        if !self.required_signers.contains(&key) {
            self.required_signers.push(key);
        }
        self
    }

    /// Name of the transaction for logs.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Consumed inputs, in insertion order.
    pub fn inputs(&self) -> &[TxInput] {
        &self.inputs
    }

    /// Reference inputs, in insertion order.
    pub fn reference_inputs(&self) -> &[Utxo] {
        &self.reference_inputs
    }

    /// Outputs, in order.
    pub fn outputs(&self) -> &[TxOutput] {
        &self.outputs
    }

    /// Mint entries, in insertion order.
    pub fn mints(&self) -> &[MintEntry] {
        &self.mints
    }

    /// Withdrawals, in insertion order.
    pub fn withdrawals(&self) -> &[Withdrawal] {
        &self.withdrawals
    }

    /// The validity window, if any.
    pub const fn validity(&self) -> Option<ValidityWindow> {
        self.validity
    }

    /// Keys that must sign.
    pub fn required_signers(&self) -> &[PubKeyHash] {
        &self.required_signers
    }

    /// References of every consumed input.
    pub fn spent_refs(&self) -> Vec<OutputRef> {
        self.inputs.iter().map(|i| i.utxo.out_ref).collect()
    }

    /// Net minted value.
    pub fn mint_value(&self) -> MintValue {
        let mut mint = MintValue::zero();
        for entry in &self.mints {
            mint.add(entry.asset.clone(), entry.quantity);
        }
        mint
    }

    /// Sum of the consumed inputs.
    pub fn input_value(&self) -> Value {
        self.inputs
            .iter()
            .fold(Value::zero(), |acc, i| acc.merge(i.utxo.value()))
    }

    /// Sum of the outputs.
    pub fn output_value(&self) -> Value {
        self.outputs
            .iter()
            .fold(Value::zero(), |acc, o| acc.merge(&o.value))
    }

    /// Position of `out_ref` among the inputs as the ledger sorts them.
    pub fn input_index(&self, out_ref: &OutputRef) -> Option<u32> {
        ledger_position(self.inputs.iter().map(|i| &i.utxo.out_ref), out_ref)
    }

    /// Position of `out_ref` among the reference inputs as the ledger sorts them.
    pub fn reference_index(&self, out_ref: &OutputRef) -> Option<u32> {
        ledger_position(self.reference_inputs.iter().map(|u| &u.out_ref), out_ref)
    }
}

/// Position of `target` in `refs` once sorted the way the ledger sorts inputs.
pub fn ledger_position<'a>(
    refs: impl Iterator<Item = &'a OutputRef>,
    target: &OutputRef,
) -> Option<u32> {
    let mut refs: Vec<&OutputRef> = refs.collect();
    refs.sort();
    refs.iter()
        .position(|r| *r == target)
        .and_then(|p| u32::try_from(p).ok())
}
