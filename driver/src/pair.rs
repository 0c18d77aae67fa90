//! Predicts a not-yet-created pool contract's address from an on-chain
//! salt and provisions its backing accounts.

use solana_sdk::instruction::AccountMeta;
use solana_sdk::keccak;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::sysvar;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use tracing::{debug, info};

use crate::abi;
use crate::config::LoaderConfig;
use crate::connection::LedgerConnection;
use crate::derive::derive_account_with_seed;
use crate::error::{DriverError, Result};
use crate::instruction;
use crate::loader::{EtherAccountData, EvmLoaderClient};
use crate::trace::{decode_trace, TraceOutcome};
use crate::types::{ContractAccounts, EthAddress};

/// The pair address plus the ledger accounts backing it. Until the pool
/// contract is created the address is virtual; `main` and `code` may not
/// exist yet.
#[derive(Debug, Clone, Copy)]
pub struct PairAccounts {
    pub eth: EthAddress,
    pub main: Pubkey,
    pub code: Pubkey,
}

/// `keccak(init code)`, the off-chain half of the CREATE2 scheme.
pub fn init_code_hash(init_code: &[u8]) -> [u8; 32] {
    keccak::hash(init_code).to_bytes()
}

/// `last20(keccak(0xff || factory || salt || init_code_hash))`
pub fn predict_pair_address(
    factory: &EthAddress,
    salt: &[u8; 32],
    init_code_hash: &[u8; 32],
) -> EthAddress {
    let hash = keccak::hashv(&[&[0xff], factory.as_bytes(), salt, init_code_hash]);
    EthAddress::from_hash(&hash.to_bytes())
}

/// Ask the helper contract for the pair salt of `(token_a, token_b)` in a
/// single one-shot call and pull it out of the emitted event.
pub async fn query_salt(
    conn: &impl LedgerConnection,
    payer: &Keypair,
    helper: &ContractAccounts,
    token_a: &EthAddress,
    token_b: &EthAddress,
    config: &LoaderConfig,
) -> Result<[u8; 32]> {
    let call_data = abi::encode_call(
        "get_salt(address,address)",
        &[abi::encode_address(token_a), abi::encode_address(token_b)],
    );
    let accounts = vec![
        AccountMeta::new(helper.main, false),
        AccountMeta::new(
            get_associated_token_address(&helper.main, &config.token_mint),
            false,
        ),
        AccountMeta::new(helper.code, false),
        AccountMeta::new_readonly(payer.pubkey(), true),
        AccountMeta::new_readonly(config.evm_loader, false),
        AccountMeta::new_readonly(config.token_mint, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
    ];
    let blockhash = conn.get_latest_blockhash().await?;
    let tx = Transaction::new_signed_with_payer(
        &[instruction::call(config, &call_data, accounts)],
        Some(&payer.pubkey()),
        &[payer],
        blockhash,
    );
    let signature = conn.send_and_confirm(&tx).await?;

    let entries = conn.get_inner_instruction_data(&signature).await?;
    let decoded = decode_trace(&entries)?;
    if decoded.outcome != TraceOutcome::Stopped {
        return Err(DriverError::Protocol(format!(
            "salt query did not stop cleanly: {:?}",
            decoded.outcome
        )));
    }
    let event = decoded
        .events
        .first()
        .ok_or_else(|| DriverError::Protocol("salt query emitted no event".into()))?;
    if event.emitter != helper.eth {
        return Err(DriverError::Protocol(format!(
            "salt event emitted by {} instead of helper {}",
            event.emitter, helper.eth
        )));
    }
    if event.topics.len() != 1 || event.data.len() < 32 {
        return Err(DriverError::Protocol(
            "salt event does not carry a single 32-byte word".into(),
        ));
    }

    let mut salt = [0u8; 32];
    salt.copy_from_slice(&event.data[..32]);
    debug!(salt = %hex::encode(salt), "salt obtained");
    Ok(salt)
}

/// Resolve the pair address for `(token_a, token_b)` and make sure its
/// backing accounts exist, creating the code account and the ether
/// account in one transaction when both are missing.
pub async fn resolve(
    conn: &impl LedgerConnection,
    payer: &Keypair,
    loader: &impl EvmLoaderClient,
    helper: &ContractAccounts,
    factory: &EthAddress,
    token_a: &EthAddress,
    token_b: &EthAddress,
    init_code_hash: &[u8; 32],
    config: &LoaderConfig,
) -> Result<PairAccounts> {
    let salt = query_salt(conn, payer, helper, token_a, token_b, config).await?;
    let pair_eth = predict_pair_address(factory, &salt, init_code_hash);
    let (pair_main, _) = loader.ether_to_ledger(&pair_eth);

    let seed = pair_eth.to_seed();
    let derived_code = derive_account_with_seed(&payer.pubkey(), &seed, &config.evm_loader)?;

    let pair_code = match conn.get_account_data(&pair_main).await? {
        // The main account exists; its stored code reference is
        // authoritative but must agree with the derivation.
        Some(data) => {
            let stored = EtherAccountData::unpack(&data)?.code_account;
            if stored != derived_code {
                return Err(DriverError::Protocol(format!(
                    "pair {pair_eth} stores code account {stored}, derivation yields {derived_code}"
                )));
            }
            stored
        }
        None => derived_code,
    };

    let mut instructions = Vec::new();
    if conn.get_balance(&pair_code).await? == 0 {
        let lamports = conn
            .get_minimum_balance_for_rent_exemption(config.pair_code_size as usize)
            .await?;
        instructions.push(solana_sdk::system_instruction::create_account_with_seed(
            &payer.pubkey(),
            &pair_code,
            &payer.pubkey(),
            &seed,
            lamports,
            config.pair_code_size,
            &config.evm_loader,
        ));
    }
    if conn.get_balance(&pair_main).await? == 0 {
        let lamports = conn
            .get_minimum_balance_for_rent_exemption(EtherAccountData::LEN)
            .await?;
        instructions.push(loader.create_ether_account(
            &payer.pubkey(),
            &pair_eth,
            &pair_code,
            lamports,
            0,
        ));
    }
    if !instructions.is_empty() {
        let blockhash = conn.get_latest_blockhash().await?;
        let tx = Transaction::new_signed_with_payer(
            &instructions,
            Some(&payer.pubkey()),
            &[payer],
            blockhash,
        );
        conn.send_and_confirm(&tx).await?;
        info!(%pair_eth, %pair_main, %pair_code, "provisioned pair accounts");
    }

    Ok(PairAccounts {
        eth: pair_eth,
        main: pair_main,
        code: pair_code,
    })
}
