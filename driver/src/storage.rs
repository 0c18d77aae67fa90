//! Storage accounts hold the interpreter's continuation state for one
//! in-flight iterative execution.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use tracing::debug;

use crate::config::LoaderConfig;
use crate::connection::LedgerConnection;
use crate::derive::derive_account_with_seed;
use crate::error::Result;

/// Derive the seed-addressed account owned by the interpreter and create
/// it rent-exempt at `space` bytes if it does not exist yet. Funded
/// accounts are reused as-is, so a second call with the same seed submits
/// nothing.
pub(crate) async fn ensure_seeded_account(
    conn: &impl LedgerConnection,
    payer: &Keypair,
    seed: &str,
    space: u64,
    config: &LoaderConfig,
) -> Result<Pubkey> {
    let address = derive_account_with_seed(&payer.pubkey(), seed, &config.evm_loader)?;

    if conn.get_balance(&address).await? > 0 {
        debug!(%address, seed, "seeded account already funded, reusing");
        return Ok(address);
    }

    let lamports = conn
        .get_minimum_balance_for_rent_exemption(space as usize)
        .await?;
    let instruction = system_instruction::create_account_with_seed(
        &payer.pubkey(),
        &address,
        &payer.pubkey(),
        seed,
        lamports,
        space,
        &config.evm_loader,
    );
    let blockhash = conn.get_latest_blockhash().await?;
    let tx = Transaction::new_signed_with_payer(
        &[instruction],
        Some(&payer.pubkey()),
        &[payer],
        blockhash,
    );
    conn.send_and_confirm(&tx).await?;
    debug!(%address, seed, space, lamports, "created seeded account");

    Ok(address)
}

/// Ensure the storage account for `seed` exists, sized per `size_hint`.
/// Already-existed and newly-created look identical to callers. Storage
/// accounts are abandoned after use; reclamation is a separate concern.
pub async fn ensure_storage(
    conn: &impl LedgerConnection,
    payer: &Keypair,
    seed: &str,
    size_hint: u64,
    config: &LoaderConfig,
) -> Result<Pubkey> {
    ensure_seeded_account(conn, payer, seed, size_hint, config).await
}
