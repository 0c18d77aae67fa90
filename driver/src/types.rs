use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use solana_sdk::pubkey::Pubkey;

use crate::error::DriverError;

/// Ethereum-style 20-byte address
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EthAddress(pub [u8; 20]);

impl EthAddress {
    pub const LEN: usize = 20;

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Last 20 bytes of a 32-byte hash, the address truncation used by
    /// both CREATE2 prediction and event topics.
    pub fn from_hash(hash: &[u8; 32]) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash[12..]);
        Self(bytes)
    }

    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, DriverError> {
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| DriverError::InvalidAccountData("expected 20 address bytes".into()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Base58 rendering of the raw address bytes, used as the derivation
    /// seed for a contract's code account.
    pub fn to_seed(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl fmt::Display for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EthAddress({self})")
    }
}

impl FromStr for EthAddress {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw)
            .map_err(|e| DriverError::InvalidAccountData(format!("bad address hex: {e}")))?;
        Self::try_from_slice(&bytes)
    }
}

impl Serialize for EthAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for EthAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// A signed application-level EVM transaction, the opaque product of the
/// external transaction builder: caller address, 65-byte recoverable
/// signature, RLP-serialized unsigned message.
#[derive(Debug, Clone)]
pub struct SignedEvmTx {
    pub from: EthAddress,
    pub signature: [u8; 65],
    pub message: Vec<u8>,
}

impl SignedEvmTx {
    /// Storage accounts are keyed by the first 8 signature bytes so that a
    /// retried execution of the same transaction reuses its state.
    pub fn storage_seed(&self) -> String {
        hex::encode(&self.signature[..8])
    }

    /// `from || signature || message`, the EVM instruction body consumed
    /// by the PartialCall entry point.
    pub fn to_instruction_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(20 + 65 + self.message.len());
        out.extend_from_slice(self.from.as_bytes());
        out.extend_from_slice(&self.signature);
        out.extend_from_slice(&self.message);
        out
    }
}

/// A deployed contract as the interpreter sees it: main ledger account,
/// ethereum address, and the code account holding its bytecode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContractAccounts {
    pub main: Pubkey,
    pub eth: EthAddress,
    pub code: Pubkey,
}
