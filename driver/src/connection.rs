use std::time::Duration;

use async_trait::async_trait;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcSendTransactionConfig, RpcTransactionConfig};
use solana_client::rpc_request::RpcError;
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use solana_transaction_status::option_serializer::OptionSerializer;
use solana_transaction_status::{UiInstruction, UiTransactionEncoding};
use thiserror::Error;

/// Failures at the ledger boundary. `Transport` never implies the ledger
/// applied the submission; `Rejected` means it did see it and declined.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("submission rejected: {0}")]
    Rejected(String),
}

impl From<ClientError> for ConnectionError {
    fn from(err: ClientError) -> Self {
        match err.kind() {
            ClientErrorKind::TransactionError(e) => ConnectionError::Rejected(e.to_string()),
            ClientErrorKind::RpcError(RpcError::RpcResponseError { .. }) => {
                ConnectionError::Rejected(err.to_string())
            }
            _ => ConnectionError::Transport(err.to_string()),
        }
    }
}

/// Abstraction over the ledger RPC endpoint. This allows the driver to work
/// with:
/// 1. A live cluster via `RpcConnection`
/// 2. In-memory mocks in tests
#[async_trait]
pub trait LedgerConnection: Send + Sync {
    /// Submit without waiting for confirmation.
    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, ConnectionError>;

    /// Block until the given submission is durably confirmed; a confirmed
    /// transaction that failed on-chain surfaces as `Rejected`.
    async fn confirm(&self, signature: &Signature) -> Result<(), ConnectionError>;

    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, ConnectionError>;

    async fn get_account_data(&self, pubkey: &Pubkey)
        -> Result<Option<Vec<u8>>, ConnectionError>;

    async fn get_latest_blockhash(&self) -> Result<Hash, ConnectionError>;

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, ConnectionError>;

    /// Ordered data payloads of the inner instructions the interpreter
    /// emitted while executing the given transaction, filtered to the
    /// interpreter program itself.
    async fn get_inner_instruction_data(
        &self,
        signature: &Signature,
    ) -> Result<Vec<Vec<u8>>, ConnectionError>;

    /// Submit and wait for confirmation in one round-trip.
    async fn send_and_confirm(&self, tx: &Transaction) -> Result<Signature, ConnectionError> {
        let signature = self.send_transaction(tx).await?;
        self.confirm(&signature).await?;
        Ok(signature)
    }
}

/// Production connection over the nonblocking RPC client.
pub struct RpcConnection {
    rpc: RpcClient,
    /// Interpreter program id; inner instructions targeting other programs
    /// (token transfers and the like) are not trace entries.
    program: Pubkey,
    commitment: CommitmentConfig,
}

impl RpcConnection {
    pub fn new(url: String, program: Pubkey) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(url, CommitmentConfig::confirmed()),
            program,
            commitment: CommitmentConfig::confirmed(),
        }
    }
}

#[async_trait]
impl LedgerConnection for RpcConnection {
    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, ConnectionError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: true,
            preflight_commitment: Some(CommitmentLevel::Confirmed),
            ..RpcSendTransactionConfig::default()
        };
        Ok(self.rpc.send_transaction_with_config(tx, config).await?)
    }

    async fn confirm(&self, signature: &Signature) -> Result<(), ConnectionError> {
        // Status propagation to the confirmed commitment is not immediate;
        // poll with a bounded number of attempts.
        for _ in 0..60 {
            let response = self
                .rpc
                .get_signature_statuses(&[*signature])
                .await
                .map_err(ConnectionError::from)?;
            if let Some(Some(status)) = response.value.into_iter().next() {
                if status.satisfies_commitment(self.commitment) {
                    return match status.err {
                        Some(err) => Err(ConnectionError::Rejected(err.to_string())),
                        None => Ok(()),
                    };
                }
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        Err(ConnectionError::Transport(format!(
            "transaction {signature} was not confirmed"
        )))
    }

    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, ConnectionError> {
        Ok(self.rpc.get_balance(pubkey).await?)
    }

    async fn get_account_data(
        &self,
        pubkey: &Pubkey,
    ) -> Result<Option<Vec<u8>>, ConnectionError> {
        let response = self
            .rpc
            .get_account_with_commitment(pubkey, self.commitment)
            .await?;
        Ok(response.value.map(|account| account.data))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, ConnectionError> {
        Ok(self.rpc.get_latest_blockhash().await?)
    }

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, ConnectionError> {
        Ok(self
            .rpc
            .get_minimum_balance_for_rent_exemption(data_len)
            .await?)
    }

    async fn get_inner_instruction_data(
        &self,
        signature: &Signature,
    ) -> Result<Vec<Vec<u8>>, ConnectionError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(self.commitment),
            max_supported_transaction_version: Some(0),
        };
        let fetched = self
            .rpc
            .get_transaction_with_config(signature, config)
            .await?;
        let meta = fetched.transaction.meta.ok_or_else(|| {
            ConnectionError::Transport("transaction meta missing from RPC response".into())
        })?;
        let decoded = fetched.transaction.transaction.decode().ok_or_else(|| {
            ConnectionError::Transport("transaction body missing from RPC response".into())
        })?;
        let account_keys = decoded.message.static_account_keys();

        let groups = match meta.inner_instructions {
            OptionSerializer::Some(groups) => groups,
            _ => return Ok(Vec::new()),
        };

        let mut entries = Vec::new();
        for group in groups {
            for instruction in group.instructions {
                let UiInstruction::Compiled(compiled) = instruction else {
                    continue;
                };
                let target = account_keys.get(compiled.program_id_index as usize);
                if target != Some(&self.program) {
                    continue;
                }
                let data = bs58::decode(&compiled.data)
                    .into_vec()
                    .map_err(|e| ConnectionError::Transport(format!("bad base58 data: {e}")))?;
                entries.push(data);
            }
        }
        Ok(entries)
    }
}
