//! Holder accounts stage a serialized signed transaction on-chain in
//! bounded chunks so the interpreter can execute payloads larger than a
//! single ledger instruction can carry.

use rand::Rng;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;
use tracing::debug;

use crate::config::LoaderConfig;
use crate::connection::LedgerConnection;
use crate::error::Result;
use crate::instruction;
use crate::storage::ensure_seeded_account;

/// A holder is not execution-scoped, so its seed only needs to be unique
/// per operator.
pub fn random_holder_seed() -> String {
    hex::encode(rand::thread_rng().gen::<[u8; 5]>())
}

/// Idempotently create the holder account for `seed` at the configured
/// fixed size.
pub async fn ensure_holder(
    conn: &impl LedgerConnection,
    payer: &Keypair,
    seed: &str,
    config: &LoaderConfig,
) -> Result<Pubkey> {
    ensure_seeded_account(conn, payer, seed, config.holder_size, config).await
}

/// The exact bytes a staged holder account contains:
/// `signature || payload_len_le(8) || payload`.
pub fn holder_message(signature: &[u8; 65], payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(65 + 8 + payload.len());
    message.extend_from_slice(signature);
    message.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    message.extend_from_slice(payload);
    message
}

/// Overwrite the holder account with the signed payload, one Write
/// instruction per chunk in strict offset order.
///
/// Every submission is confirmed before staging counts as complete; the
/// interpreter may read from any committed offset at Begin time. A failure
/// leaves the holder partially written, and re-invoking with the same
/// content from offset 0 is the prescribed recovery.
pub async fn stage(
    conn: &impl LedgerConnection,
    payer: &Keypair,
    holder: &Pubkey,
    signature: &[u8; 65],
    payload: &[u8],
    config: &LoaderConfig,
) -> Result<Vec<Signature>> {
    let message = holder_message(signature, payload);
    let blockhash = conn.get_latest_blockhash().await?;

    let mut submissions = Vec::new();
    for (index, chunk) in message.chunks(config.write_chunk_size).enumerate() {
        let offset = (index * config.write_chunk_size) as u32;
        let instruction =
            instruction::write_holder(config, holder, &payer.pubkey(), offset, chunk);
        let tx = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&payer.pubkey()),
            &[payer],
            blockhash,
        );
        let submission = conn.send_transaction(&tx).await?;
        debug!(%holder, offset, len = chunk.len(), %submission, "wrote holder chunk");
        submissions.push(submission);
    }

    for submission in &submissions {
        conn.confirm(submission).await?;
    }
    debug!(%holder, total = message.len(), chunks = submissions.len(), "holder staged");

    Ok(submissions)
}
