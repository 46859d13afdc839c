//! Addresses and credentials.

use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    errors::DecodeError,
    hashes::{PubKeyHash, ScriptHash},
    plutus::{FromPlutusData, PlutusData, ToPlutusData},
};

/// Something that can authorize spending: a key or a script.
///
/// Textual form is `pk:<hex>` or `script:<hex>`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Credential {
    /// A verification key hash.
    PubKey(PubKeyHash),
    /// An authorization script hash.
    Script(ScriptHash),
}

impl Credential {
    /// Returns the key hash if this is a key credential.
    pub const fn pub_key_hash(&self) -> Option<PubKeyHash> {
        match self {
            Credential::PubKey(pkh) => Some(*pkh),
            Credential::Script(_) => None,
        }
    }

    /// Returns the script hash if this is a script credential.
    pub const fn script_hash(&self) -> Option<ScriptHash> {
        match self {
            Credential::PubKey(_) => None,
            Credential::Script(hash) => Some(*hash),
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::PubKey(pkh) => write!(f, "pk:{pkh}"),
            Credential::Script(hash) => write!(f, "script:{hash}"),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({self})")
    }
}

impl FromStr for Credential {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("pk", hex)) => Ok(Credential::PubKey(hex.parse()?)),
            Some(("script", hex)) => Ok(Credential::Script(hex.parse()?)),
            _ => Err(DecodeError::InvalidFormat(format!(
                "credential must be `pk:<hex>` or `script:<hex>`, got {s:?}"
            ))),
        }
    }
}

impl Serialize for Credential {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Credential {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl ToPlutusData for Credential {
    fn to_plutus_data(&self) -> PlutusData {
        match self {
            Credential::PubKey(pkh) => PlutusData::constr(0, vec![PlutusData::bytes(pkh)]),
            Credential::Script(hash) => PlutusData::constr(1, vec![PlutusData::bytes(hash)]),
        }
    }
}

impl FromPlutusData for Credential {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, DecodeError> {
        let (tag, _) = data.as_constr()?;
        let fields = data.expect_constr(tag, 1)?;
        let bytes = fields[0].as_bytes()?;
        match tag {
            0 => Ok(Credential::PubKey(PubKeyHash::from_slice(bytes)?)),
            1 => Ok(Credential::Script(ScriptHash::from_slice(bytes)?)),
            other => Err(DecodeError::UnexpectedShape {
                expected: "credential constr 0 or 1".to_string(),
                got: format!("constr {other}"),
            }),
        }
    }
}

/// A ledger address: payment credential plus optional stake credential.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address {
    /// Who may spend outputs at this address.
    pub payment: Credential,
    /// Delegation part, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stake: Option<Credential>,
}

impl Address {
    /// An address controlled by a key, without stake part.
    pub const fn from_key(pkh: PubKeyHash) -> Self {
        Self {
            payment: Credential::PubKey(pkh),
            stake: None,
        }
    }

    /// An address controlled by a script, without stake part.
    pub const fn from_script(hash: ScriptHash) -> Self {
        Self {
            payment: Credential::Script(hash),
            stake: None,
        }
    }

    /// Returns the same address with the given stake credential.
    pub const fn with_stake(mut self, stake: Credential) -> Self {
        self.stake = Some(stake);
        self
    }

    /// The key hash of the payment credential, if it is a key.
    pub const fn payment_key_hash(&self) -> Option<PubKeyHash> {
        self.payment.pub_key_hash()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stake {
            None => write!(f, "{}", self.payment),
            Some(stake) => write!(f, "{}+{}", self.payment, stake),
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl ToPlutusData for Address {
    fn to_plutus_data(&self) -> PlutusData {
        // Maybe (StakingCredential): Just = 0, Nothing = 1; StakingHash = 0.
        let stake = match &self.stake {
            None => PlutusData::constr(1, vec![]),
            Some(cred) => PlutusData::constr(
                0,
                vec![PlutusData::constr(0, vec![cred.to_plutus_data()])],
            ),
        };
        PlutusData::constr(0, vec![self.payment.to_plutus_data(), stake])
    }
}

impl FromPlutusData for Address {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, DecodeError> {
        let fields = data.expect_constr(0, 2)?;
        let payment = Credential::from_plutus_data(&fields[0])?;
        let stake = match fields[1].as_constr()? {
            (1, []) => None,
            (0, [staking]) => {
                let inner = staking.expect_constr(0, 1)?;
                Some(Credential::from_plutus_data(&inner[0])?)
            }
            _ => {
                return Err(DecodeError::UnexpectedShape {
                    expected: "maybe staking credential".to_string(),
                    got: format!("{:?}", fields[1]),
                })
            }
        };
        Ok(Address { payment, stake })
    }
}
