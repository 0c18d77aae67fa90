//! Minimal call-data encoding for the Solidity ABI subset the driver needs:
//! 4-byte selectors and 32-byte words.

use solana_sdk::keccak;

use crate::types::EthAddress;

/// First four bytes of `keccak(signature)`, e.g.
/// `selector("get_salt(address,address)")`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak::hash(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash.to_bytes()[..4]);
    out
}

/// Full `keccak(signature)`, the topic-0 hash identifying an event type.
pub fn event_topic(signature: &str) -> [u8; 32] {
    keccak::hash(signature.as_bytes()).to_bytes()
}

/// Address left-padded to a 32-byte word.
pub fn encode_address(address: &EthAddress) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// Unsigned integer as a big-endian 32-byte word.
pub fn encode_uint(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// `selector || words`, the call-data layout for fixed-size arguments.
pub fn encode_call(signature: &str, words: &[[u8; 32]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + words.len() * 32);
    data.extend_from_slice(&selector(signature));
    for word in words {
        data.extend_from_slice(word);
    }
    data
}
