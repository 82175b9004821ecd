use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const BLOCK_HASH_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid block hash: {0}")]
pub struct BlockHashError(String);

/// Hash of a ledger block. Renders as `0x`-prefixed hex.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockHash(pub [u8; BLOCK_HASH_SIZE]);

impl BlockHash {
    pub fn from_hex(hex: &str) -> Result<Self, BlockHashError> {
        let stripped = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0u8; BLOCK_HASH_SIZE];
        hex::decode_to_slice(stripped, &mut buff).map_err(|_| BlockHashError(hex.to_string()))?;
        Ok(Self(buff))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.to_hex())
    }
}

impl FromStr for BlockHash {
    type Err = BlockHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A failed dispatch reported by the ledger for an included transaction,
/// e.g. `TransactionStorage.RenewedNotFound` or a bare `BadOrigin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchError {
    pub pallet: Option<String>,
    pub error: String,
}

impl DispatchError {
    pub fn module(pallet: &str, error: &str) -> Self {
        Self {
            pallet: Some(pallet.to_string()),
            error: error.to_string(),
        }
    }

    pub fn other(error: &str) -> Self {
        Self {
            pallet: None,
            error: error.to_string(),
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pallet {
            Some(pallet) => write!(f, "{}.{}", pallet, self.error),
            None => f.write_str(&self.error),
        }
    }
}

/// Where a submitted transaction ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inclusion {
    /// The finalized block containing the transaction.
    pub block_hash: BlockHash,
    pub block_number: Option<u32>,
    /// Index of the stored entry within the block, when the transport
    /// can tell.
    pub index: Option<u32>,
    /// Set when the transaction was included but its dispatch failed.
    pub dispatch_error: Option<DispatchError>,
}
