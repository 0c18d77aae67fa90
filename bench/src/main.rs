use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use evm_driver::executor::ExecutionPolicy;
use evm_driver::{LoaderConfig, RpcConnection};
use solana_sdk::signature::read_keypair_file;
use tracing::info;
use tracing_subscriber::EnvFilter;

use evm_driver_bench::config::{load_workload, BenchConfig};
use evm_driver_bench::flow::run_flow;
use evm_driver_bench::report::BatchSummary;
use evm_driver_bench::senders::SenderPool;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config_path: PathBuf = match std::env::args().nth(1) {
        Some(path) => path.into(),
        None => bail!("usage: evm-driver-bench <config.json>"),
    };
    let config = BenchConfig::load(&config_path)?;
    let loader_config = Arc::new(config.loader_config()?);

    let workload = load_workload(&config.workload_file)?;
    let count = config.count.unwrap_or(workload.len()).min(workload.len());

    let mut keypairs = Vec::with_capacity(config.sender_keypairs.len());
    for path in &config.sender_keypairs {
        let keypair = read_keypair_file(path)
            .map_err(|err| anyhow::anyhow!("{err}"))
            .with_context(|| format!("reading keypair {}", path.display()))?;
        keypairs.push(keypair);
    }
    let senders = Arc::new(SenderPool::new(keypairs));

    let conn = Arc::new(RpcConnection::new(
        config.rpc_url.clone(),
        loader_config.evm_loader,
    ));
    let policy = ExecutionPolicy {
        continue_steps: config.continue_steps,
        max_rounds: config.max_rounds,
        ..ExecutionPolicy::default()
    };

    info!(count, senders = senders.len(), "starting batch");

    let mut tasks = Vec::with_capacity(count);
    for (index, item) in workload.into_iter().take(count).enumerate() {
        // Malformed workload entries abort the run up front instead of
        // skewing the tally.
        let tx = item
            .signed_tx()
            .with_context(|| format!("workload item {index}"))?;
        let call_accounts = item
            .account_metas()
            .with_context(|| format!("workload item {index}"))?;
        let expected = item.expected_event();

        let conn = Arc::clone(&conn);
        let loader_config = Arc::clone(&loader_config);
        let payer = senders.next_sender();
        let policy = policy.clone();
        tasks.push(tokio::spawn(async move {
            run_flow(
                &*conn,
                &payer,
                &loader_config,
                policy,
                &tx,
                call_accounts,
                expected.as_ref(),
            )
            .await
        }));
    }

    let mut summary = BatchSummary::default();
    for task in tasks {
        summary.record(task.await?);
    }

    info!(%summary, "batch finished");
    println!("{summary}");
    Ok(())
}
