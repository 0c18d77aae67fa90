//! Benchmark run configuration and workload description, both plain JSON
//! files. The workload items are the opaque output of the external
//! transaction builder: prebuilt signed EVM transactions plus the account
//! lists their calls touch.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use evm_driver::types::{EthAddress, SignedEvmTx};
use evm_driver::{abi, LoaderConfig};
use serde::Deserialize;
use solana_sdk::instruction::AccountMeta;
use solana_sdk::pubkey::Pubkey;

use crate::report::ExpectedEvent;

#[derive(Debug, Deserialize)]
pub struct BenchConfig {
    pub rpc_url: String,
    pub evm_loader: String,
    pub token_mint: String,
    pub workload_file: PathBuf,
    /// Keypair files for the fee-paying identities, one flow at a time
    /// per identity.
    pub sender_keypairs: Vec<PathBuf>,
    /// Cap on how many workload items to run; all of them when absent.
    pub count: Option<usize>,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    #[serde(default = "default_continue_steps")]
    pub continue_steps: u64,
}

fn default_max_rounds() -> u32 {
    128
}

fn default_continue_steps() -> u64 {
    1_000
}

impl BenchConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn loader_config(&self) -> Result<LoaderConfig> {
        Ok(LoaderConfig::new(
            self.evm_loader.parse().context("bad evm_loader pubkey")?,
            self.token_mint.parse().context("bad token_mint pubkey")?,
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct WorkAccount {
    pub pubkey: String,
    #[serde(default)]
    pub writable: bool,
    #[serde(default)]
    pub signer: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExpectSpec {
    /// Event signature, e.g. `Transfer(address,address,uint256)`.
    pub event: String,
    pub amount: u128,
}

#[derive(Debug, Deserialize)]
pub struct WorkItem {
    pub from: String,
    pub signature: String,
    pub message: String,
    pub accounts: Vec<WorkAccount>,
    pub expect: Option<ExpectSpec>,
}

impl WorkItem {
    pub fn signed_tx(&self) -> Result<SignedEvmTx> {
        let from: EthAddress = self.from.parse().map_err(anyhow::Error::msg)?;
        let signature: [u8; 65] = hex::decode(&self.signature)?
            .try_into()
            .map_err(|bytes: Vec<u8>| {
                anyhow::anyhow!("signature must be 65 bytes, got {}", bytes.len())
            })?;
        Ok(SignedEvmTx {
            from,
            signature,
            message: hex::decode(&self.message)?,
        })
    }

    pub fn account_metas(&self) -> Result<Vec<AccountMeta>> {
        self.accounts
            .iter()
            .map(|account| {
                let pubkey: Pubkey = account.pubkey.parse()?;
                Ok(if account.writable {
                    AccountMeta::new(pubkey, account.signer)
                } else {
                    AccountMeta::new_readonly(pubkey, account.signer)
                })
            })
            .collect()
    }

    pub fn expected_event(&self) -> Option<ExpectedEvent> {
        self.expect.as_ref().map(|spec| ExpectedEvent {
            topic0: abi::event_topic(&spec.event),
            amount: abi::encode_uint(spec.amount),
        })
    }
}

pub fn load_workload(path: &Path) -> Result<Vec<WorkItem>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading workload {}", path.display()))?;
    Ok(serde_json::from_str(&raw)?)
}
