use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Identities and sizing for one interpreter deployment. Every component
/// takes this explicitly; there is no ambient global configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// The interpreter program that owns holder, storage, and contract
    /// accounts and executes the staged transactions.
    pub evm_loader: Pubkey,

    /// Mint of the token backing ether balances; every contract account
    /// list references its associated token account for this mint.
    pub token_mint: Pubkey,

    /// Fixed allocation for holder accounts, sized for the largest
    /// expected serialized transaction.
    #[serde(default = "default_holder_size")]
    pub holder_size: u64,

    /// Allocation for storage accounts holding continuation state.
    #[serde(default = "default_storage_size")]
    pub storage_size: u64,

    /// Allocation for a freshly provisioned pair code account.
    #[serde(default = "default_pair_code_size")]
    pub pair_code_size: u64,

    /// Maximum bytes of holder payload written per ledger transaction.
    #[serde(default = "default_write_chunk_size")]
    pub write_chunk_size: usize,
}

fn default_holder_size() -> u64 {
    128 * 1024
}

fn default_storage_size() -> u64 {
    128 * 1024
}

fn default_pair_code_size() -> u64 {
    20_000
}

fn default_write_chunk_size() -> usize {
    1_000
}

impl LoaderConfig {
    pub fn new(evm_loader: Pubkey, token_mint: Pubkey) -> Self {
        Self {
            evm_loader,
            token_mint,
            holder_size: default_holder_size(),
            storage_size: default_storage_size(),
            pair_code_size: default_pair_code_size(),
            write_chunk_size: default_write_chunk_size(),
        }
    }
}
