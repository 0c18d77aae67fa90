use solana_sdk::pubkey::Pubkey;

use crate::error::{DriverError, Result};

/// Derive the account address `sha256(base || seed || program_id)`.
///
/// Deterministic and reproducible by any party knowing the three inputs,
/// which is what lets holder and storage accounts be recomputed instead of
/// persisted. Fails only on seeds the scheme rejects (too long, or a result
/// colliding with the program-address marker).
pub fn derive_account_with_seed(base: &Pubkey, seed: &str, program_id: &Pubkey) -> Result<Pubkey> {
    Pubkey::create_with_seed(base, seed, program_id)
        .map_err(|e| DriverError::InvalidSeed(format!("{seed:?}: {e}")))
}
