//! One end-to-end benchmark flow: stage a signed transaction into a holder
//! account, provision its storage account, then drive the iterative
//! execution to a terminal state and classify the result.

use evm_driver::connection::LedgerConnection;
use evm_driver::executor::{
    ExecutionContext, ExecutionMethod, ExecutionPolicy, IterativeExecutor,
};
use evm_driver::types::SignedEvmTx;
use evm_driver::{holder, storage, LoaderConfig};
use solana_sdk::instruction::AccountMeta;
use solana_sdk::signature::Keypair;
use tracing::{debug, instrument, warn};

use crate::report::{classify, ExpectedEvent, ReportKind};

/// Run one workload item to completion. Errors are folded into the report
/// class rather than propagated; a benchmark batch never aborts because a
/// single flow failed.
#[instrument(skip_all, fields(from = %tx.from))]
pub async fn run_flow(
    conn: &impl LedgerConnection,
    payer: &Keypair,
    config: &LoaderConfig,
    policy: ExecutionPolicy,
    tx: &SignedEvmTx,
    call_accounts: Vec<AccountMeta>,
    expected: Option<&ExpectedEvent>,
) -> ReportKind {
    let result = drive(conn, payer, config, policy, tx, call_accounts).await;
    if let Err(err) = &result {
        warn!(%err, "flow failed");
    }
    classify(&result, expected)
}

async fn drive(
    conn: &impl LedgerConnection,
    payer: &Keypair,
    config: &LoaderConfig,
    policy: ExecutionPolicy,
    tx: &SignedEvmTx,
    call_accounts: Vec<AccountMeta>,
) -> evm_driver::Result<evm_driver::executor::ExecutionOutcome> {
    let holder_seed = holder::random_holder_seed();
    let holder_account = holder::ensure_holder(conn, payer, &holder_seed, config).await?;
    holder::stage(conn, payer, &holder_account, &tx.signature, &tx.message, config).await?;
    debug!(%holder_account, "payload staged");

    let storage_account = storage::ensure_storage(
        conn,
        payer,
        &tx.storage_seed(),
        config.storage_size,
        config,
    )
    .await?;

    let ctx = ExecutionContext {
        storage: storage_account,
        call_accounts,
    };
    IterativeExecutor::new(conn, payer, config)
        .with_policy(policy)
        .execute(ExecutionMethod::FromHolder(holder_account), &ctx)
        .await
}
