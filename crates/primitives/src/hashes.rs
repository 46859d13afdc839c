//! Fixed-size hash newtypes used throughout the ledger model.
//!
//! All of them display as lowercase hex and (de)serialize as hex strings so that they can be
//! written into TOML params files by hand.

use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::errors::DecodeError;

/// Length of a Blake2b-224 style credential hash.
pub const HASH28_LEN: usize = 28;

/// Length of a transaction id.
pub const TXID_LEN: usize = 32;

macro_rules! impl_fixed_hash {
    ($name:ident, $len:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name([u8; $len]);

        impl $name {
            /// Length of the hash in bytes.
            pub const LEN: usize = $len;

            /// Creates a new hash from raw bytes.
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Returns the raw bytes of the hash.
            pub const fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Parses a hash from a byte slice, failing if the length does not match.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
                let bytes: [u8; $len] =
                    bytes
                        .try_into()
                        .map_err(|_| DecodeError::InvalidLength {
                            expected: $len,
                            got: bytes.len(),
                        })?;
                Ok(Self(bytes))
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = hex::decode(s).map_err(|e| DecodeError::InvalidHex(e.to_string()))?;
                Self::from_slice(&bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

impl_fixed_hash!(
    PubKeyHash,
    HASH28_LEN,
    "Hash of a verification key; identifies a participant (and the key of a set node)."
);
impl_fixed_hash!(
    ScriptHash,
    HASH28_LEN,
    "Hash of an authorization script."
);
impl_fixed_hash!(
    PolicyId,
    HASH28_LEN,
    "Hash of a minting policy script. The all-zero-length policy of the native coin is modelled \
     separately by [`AssetClass::lovelace`](crate::value::AssetClass::lovelace)."
);
impl_fixed_hash!(TxId, TXID_LEN, "Identifier of a transaction.");

impl TxId {
    /// Derives a transaction id by hashing arbitrary bytes.
    ///
    /// Only meant for ledgers that do not have a canonical transaction serialization of their
    /// own, such as test emulators.
    pub fn digest(data: impl AsRef<[u8]>) -> Self {
        let hash: [u8; TXID_LEN] = Sha256::digest(data.as_ref()).into();
        Self(hash)
    }
}

impl PolicyId {
    /// Reinterprets the policy as the script hash of the minting script.
    pub const fn to_script_hash(self) -> ScriptHash {
        ScriptHash(self.0)
    }
}

impl ScriptHash {
    /// Reinterprets the script hash as a minting policy id.
    pub const fn to_policy_id(self) -> PolicyId {
        PolicyId(self.0)
    }
}
