//! Multi-asset values.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    errors::DecodeError,
    hashes::PolicyId,
    plutus::{FromPlutusData, PlutusData, ToPlutusData},
};

/// Maximum length of an asset name in bytes.
pub const MAX_ASSET_NAME_LEN: usize = 32;

/// The name of an asset under a minting policy (at most 32 bytes).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AssetName(Vec<u8>);

impl AssetName {
    /// Creates a new asset name, failing if it is longer than [`MAX_ASSET_NAME_LEN`].
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, DecodeError> {
        let bytes = bytes.into();
        if bytes.len() > MAX_ASSET_NAME_LEN {
            return Err(DecodeError::InvalidLength {
                expected: MAX_ASSET_NAME_LEN,
                got: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    /// The empty asset name.
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Returns the raw bytes of the name.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the name starts with the given prefix.
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) if s.chars().all(|c| c.is_ascii_graphic()) => write!(f, "AssetName({s:?})"),
            _ => write!(f, "AssetName({})", hex::encode(&self.0)),
        }
    }
}

impl FromStr for AssetName {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| DecodeError::InvalidHex(e.to_string()))?;
        Self::new(bytes)
    }
}

impl Serialize for AssetName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AssetName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// A fully qualified asset: minting policy plus asset name.
///
/// The native coin (lovelace) has no policy and is represented with `policy: None`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetClass {
    /// The minting policy, `None` for the native coin.
    pub policy: Option<PolicyId>,
    /// The asset name.
    pub name: AssetName,
}

impl AssetClass {
    /// The native coin.
    pub const fn lovelace() -> Self {
        Self {
            policy: None,
            name: AssetName::empty(),
        }
    }

    /// A native token.
    pub const fn new(policy: PolicyId, name: AssetName) -> Self {
        Self {
            policy: Some(policy),
            name,
        }
    }

    /// Whether this is the native coin.
    pub const fn is_lovelace(&self) -> bool {
        self.policy.is_none()
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.policy {
            None => write!(f, "lovelace"),
            Some(policy) => write!(f, "{policy}.{}", self.name),
        }
    }
}

impl fmt::Debug for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.policy {
            None => write!(f, "AssetClass(lovelace)"),
            Some(policy) => write!(f, "AssetClass({policy}.{:?})", self.name),
        }
    }
}

impl ToPlutusData for AssetClass {
    fn to_plutus_data(&self) -> PlutusData {
        let policy = self
            .policy
            .map(|p| p.as_bytes().to_vec())
            .unwrap_or_default();
        PlutusData::constr(
            0,
            vec![
                PlutusData::Bytes(policy),
                PlutusData::bytes(self.name.as_bytes()),
            ],
        )
    }
}

impl FromPlutusData for AssetClass {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, DecodeError> {
        let fields = data.expect_constr(0, 2)?;
        let policy = fields[0].as_bytes()?;
        let name = AssetName::new(fields[1].as_bytes()?)?;
        if policy.is_empty() {
            return Ok(AssetClass {
                policy: None,
                name,
            });
        }
        Ok(AssetClass::new(PolicyId::from_slice(policy)?, name))
    }
}

/// A bag of assets with non-negative quantities.
///
/// Zero quantities are never stored, so two values holding the same assets compare equal.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Value(BTreeMap<AssetClass, u64>);

impl Value {
    /// The empty value.
    pub const fn zero() -> Self {
        Self(BTreeMap::new())
    }

    /// A value holding only the native coin.
    pub fn from_lovelace(amount: u64) -> Self {
        Self::zero().with(AssetClass::lovelace(), amount)
    }

    /// Adds `amount` of `asset` to the value (builder style).
    pub fn with(mut self, asset: AssetClass, amount: u64) -> Self {
        self.add(asset, amount);
        self
    }

    /// Adds `amount` of `asset` to the value, saturating at `u64::MAX`.
    pub fn add(&mut self, asset: AssetClass, amount: u64) {
        if amount == 0 {
            return;
        }
        let entry = self.0.entry(asset).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Removes `amount` of `asset`, returning `None` if the value does not hold enough.
    pub fn remove(&mut self, asset: &AssetClass, amount: u64) -> Option<()> {
        if amount == 0 {
            return Some(());
        }
        let held = self.0.get_mut(asset)?;
        *held = held.checked_sub(amount)?;
        if *held == 0 {
            self.0.remove(asset);
        }
        Some(())
    }

    /// Returns the quantity of `asset` held.
    pub fn amount_of(&self, asset: &AssetClass) -> u64 {
        self.0.get(asset).copied().unwrap_or(0)
    }

    /// Returns the quantity of the native coin held.
    pub fn lovelace(&self) -> u64 {
        self.amount_of(&AssetClass::lovelace())
    }

    /// Replaces the native coin quantity.
    pub fn set_lovelace(&mut self, amount: u64) {
        self.0.remove(&AssetClass::lovelace());
        self.add(AssetClass::lovelace(), amount);
    }

    /// Sums two values.
    pub fn merge(&self, other: &Value) -> Value {
        let mut out = self.clone();
        for (asset, amount) in other.iter() {
            out.add(asset.clone(), amount);
        }
        out
    }

    /// Subtracts `other`, returning `None` if any asset would go negative.
    pub fn checked_sub(&self, other: &Value) -> Option<Value> {
        let mut out = self.clone();
        for (asset, amount) in other.iter() {
            out.remove(asset, amount)?;
        }
        Some(out)
    }

    /// Whether every asset of `other` is held in at least the same quantity.
    pub fn covers(&self, other: &Value) -> bool {
        other
            .iter()
            .all(|(asset, amount)| self.amount_of(asset) >= amount)
    }

    /// Iterates over the held assets and quantities.
    pub fn iter(&self) -> impl Iterator<Item = (&AssetClass, u64)> {
        self.0.iter().map(|(asset, amount)| (asset, *amount))
    }

    /// Whether the value holds nothing.
    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the assets minted under `policy` with their quantities.
    pub fn assets_of_policy(&self, policy: &PolicyId) -> Vec<(&AssetName, u64)> {
        self.0
            .iter()
            .filter(|(asset, _)| asset.policy.as_ref() == Some(policy))
            .map(|(asset, amount)| (&asset.name, *amount))
            .collect()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

/// Signed quantities minted (positive) or burned (negative) by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MintValue(BTreeMap<AssetClass, i128>);

impl MintValue {
    /// The empty mint.
    pub const fn zero() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds a signed quantity of `asset`.
    pub fn add(&mut self, asset: AssetClass, quantity: i128) {
        let entry = self.0.entry(asset.clone()).or_insert(0);
        *entry += quantity;
        if *entry == 0 {
            self.0.remove(&asset);
        }
    }

    /// Returns the signed quantity of `asset`.
    pub fn quantity_of(&self, asset: &AssetClass) -> i128 {
        self.0.get(asset).copied().unwrap_or(0)
    }

    /// Iterates over the minted assets and quantities.
    pub fn iter(&self) -> impl Iterator<Item = (&AssetClass, i128)> {
        self.0.iter().map(|(asset, quantity)| (asset, *quantity))
    }

    /// Whether nothing is minted or burned.
    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }
}
