use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::connection::ConnectionError;

/// Driver-specific error types for the iterative execution protocol
#[derive(Debug, Error)]
pub enum DriverError {
    /// Transport-level failure: the RPC endpoint was unreachable or timed
    /// out. Never implies the ledger applied the submission.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The ledger declined the transaction (bad signature, insufficient
    /// funds, compute limit). For a Continue round this is safe to retry
    /// with a smaller step budget.
    #[error("Submission rejected: {0}")]
    Rejected(String),

    /// Malformed inner-instruction trace, missing terminal entry, or a
    /// mismatch between stored and derived account references. Fatal to
    /// the current execution, never masked.
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// The interpreter terminated with a non-success status. The ledger
    /// delivered the transaction correctly; the EVM-level call failed.
    #[error("Interpreter returned failure status {0:#04x}")]
    Interpreter(u8),

    /// The Continue loop exhausted its round or wall-clock budget without
    /// observing a terminal trace entry.
    #[error("Execution did not terminate within {rounds} rounds")]
    ExecutionTimeout { rounds: u32 },

    /// Seed rejected by the address derivation scheme
    #[error("Invalid derivation seed: {0}")]
    InvalidSeed(String),

    /// Account not found on-chain
    #[error("Account not found: {0}")]
    AccountNotFound(Pubkey),

    /// Account data present but not parseable
    #[error("Invalid account data: {0}")]
    InvalidAccountData(String),
}

impl From<ConnectionError> for DriverError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::Transport(msg) => DriverError::Connection(msg),
            ConnectionError::Rejected(msg) => DriverError::Rejected(msg),
        }
    }
}

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, DriverError>;
