//! Unspent outputs and references to them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    address::Address,
    errors::DecodeError,
    hashes::TxId,
    plutus::{FromPlutusData, PlutusData, ToPlutusData},
    value::{AssetClass, Value},
};

/// Points at an output of a transaction.
///
/// Orders by transaction id first, then by output index, which is also how the ledger sorts
/// inputs and reference inputs.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    /// The transaction that created the output.
    pub tx_id: TxId,
    /// Position of the output in that transaction.
    pub index: u32,
}

impl OutputRef {
    /// Creates a new output reference.
    pub const fn new(tx_id: TxId, index: u32) -> Self {
        Self { tx_id, index }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_id, self.index)
    }
}

impl fmt::Debug for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputRef({self})")
    }
}

impl ToPlutusData for OutputRef {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::constr(
            0,
            vec![
                PlutusData::constr(0, vec![PlutusData::bytes(self.tx_id)]),
                PlutusData::uint(self.index.into()),
            ],
        )
    }
}

impl FromPlutusData for OutputRef {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, DecodeError> {
        let fields = data.expect_constr(0, 2)?;
        let tx_id = TxId::from_slice(fields[0].expect_constr(0, 1)?[0].as_bytes()?)?;
        let index = fields[1].as_integer()?;
        let index = u32::try_from(index).map_err(|_| DecodeError::IntegerOutOfRange(index))?;
        Ok(OutputRef { tx_id, index })
    }
}

/// A transaction output: where the value sits, how much, and the inline record it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    /// Owner of the output.
    pub address: Address,
    /// Assets held.
    pub value: Value,
    /// Inline datum, if any.
    pub datum: Option<PlutusData>,
}

impl TxOutput {
    /// An output without a datum.
    pub const fn new(address: Address, value: Value) -> Self {
        Self {
            address,
            value,
            datum: None,
        }
    }

    /// Attaches an inline datum.
    pub fn with_datum(mut self, datum: &impl ToPlutusData) -> Self {
        self.datum = Some(datum.to_plutus_data());
        self
    }

    /// Decodes the inline datum as `T`.
    pub fn decode_datum<T: FromPlutusData>(&self) -> Result<T, DecodeError> {
        let datum = self.datum.as_ref().ok_or_else(|| DecodeError::UnexpectedShape {
            expected: "inline datum".to_string(),
            got: "no datum".to_string(),
        })?;
        T::from_plutus_data(datum)
    }
}

/// An unspent output together with its reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    /// Where the output lives.
    pub out_ref: OutputRef,
    /// The output itself.
    pub output: TxOutput,
}

impl Utxo {
    /// Shorthand for the held value.
    pub const fn value(&self) -> &Value {
        &self.output.value
    }

    /// Shorthand for the owner address.
    pub const fn address(&self) -> &Address {
        &self.output.address
    }

    /// Whether the output holds at least one unit of `asset`.
    pub fn holds(&self, asset: &AssetClass) -> bool {
        self.output.value.amount_of(asset) > 0
    }
}
