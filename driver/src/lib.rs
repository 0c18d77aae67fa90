//! Client protocol for driving EVM-style transactions through a
//! ledger-hosted interpreter: payloads too large for one ledger
//! instruction are staged into a holder account and executed through a
//! step-budgeted Begin/Continue loop, with completion and event signals
//! decoded from the interpreter's inner-instruction trace.

pub mod abi;
pub mod config;
pub mod connection;
pub mod derive;
pub mod error;
pub mod executor;
pub mod holder;
pub mod instruction;
pub mod loader;
pub mod pair;
pub mod storage;
pub mod trace;
pub mod types;

pub use crate::config::LoaderConfig;
pub use crate::connection::{ConnectionError, LedgerConnection, RpcConnection};
pub use crate::derive::derive_account_with_seed;
pub use crate::error::{DriverError, Result};
pub use crate::executor::{
    ExecutionContext, ExecutionMethod, ExecutionOutcome, ExecutionPolicy, ExecutionStatus,
    IterativeExecutor,
};
pub use crate::loader::{EvmLoaderClient, ProgramAddressMapper};
pub use crate::pair::{predict_pair_address, resolve, PairAccounts};
pub use crate::trace::{decode_trace, DecodedTrace, EvmEvent, TraceOutcome};
pub use crate::types::{ContractAccounts, EthAddress, SignedEvmTx};
