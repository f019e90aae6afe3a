//! Chain identifiers and bootstrap seeds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length of a chain identifier in bytes (the genesis block id).
pub const CHAIN_ID_LEN: usize = 32;

/// Identifies the chain (or shard) a peer serves.
///
/// Opaque to the pool: only ever compared byte-for-byte and used as a map key.
/// The human-readable form is lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId([u8; CHAIN_ID_LEN]);

impl ChainId {
    pub const fn new(bytes: [u8; CHAIN_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Full lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First eight bytes as hex, for log fields.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainId({})", self.short())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ChainIdError {
    #[error("chain id is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("chain id must be {CHAIN_ID_LEN} bytes, got {0}")]
    WrongLength(usize),
    #[error("seed must look like <chain_id>@<host:port>, got {0:?}")]
    MalformedSeed(String),
}

impl FromStr for ChainId {
    type Err = ChainIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        let bytes: [u8; CHAIN_ID_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ChainIdError::WrongLength(bytes.len()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// A configured bootstrap node for cross-chain connectivity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedNode {
    /// `host:port` to dial.
    pub address: String,
    /// The chain this seed is expected to serve.
    pub chain_id: ChainId,
}

impl FromStr for SeedNode {
    type Err = ChainIdError;

    /// Parses the `<chain_id>@<host:port>` form used by env overrides.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (chain, address) = s
            .trim()
            .split_once('@')
            .ok_or_else(|| ChainIdError::MalformedSeed(s.to_string()))?;
        if address.is_empty() {
            return Err(ChainIdError::MalformedSeed(s.to_string()));
        }
        Ok(Self {
            address: address.to_string(),
            chain_id: chain.parse()?,
        })
    }
}

impl fmt::Display for SeedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.chain_id.short(), self.address)
    }
}
