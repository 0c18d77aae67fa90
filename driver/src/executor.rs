//! The Begin/Continue state machine that drives one staged transaction
//! through the interpreter to a terminal state.

use std::time::{Duration, Instant};

use solana_sdk::instruction::AccountMeta;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::connection::{ConnectionError, LedgerConnection};
use crate::error::{DriverError, Result};
use crate::instruction;
use crate::trace::{decode_trace, EvmEvent, TraceOutcome};
use crate::types::SignedEvmTx;

/// Step budgets and termination bounds for one execution. The reference
/// flow loops unconditionally until the interpreter returns; here every
/// execution carries an explicit round and wall-clock budget.
#[derive(Debug, Clone)]
pub struct ExecutionPolicy {
    /// Step budget committed with the Begin instruction.
    pub begin_steps: u64,
    /// Step budget per Continue round.
    pub continue_steps: u64,
    /// Floor for budget backoff after a compute-limit rejection.
    pub min_steps: u64,
    /// Hard bound on Continue rounds before the execution fails.
    pub max_rounds: u32,
    /// Optional wall-clock bound over the whole execution.
    pub deadline: Option<Duration>,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            begin_steps: 10,
            continue_steps: 1_000,
            min_steps: 10,
            max_rounds: 128,
            deadline: None,
        }
    }
}

/// How the interpreter obtains the transaction payload.
pub enum ExecutionMethod<'a> {
    /// PartialCall: the signed transaction rides in the Begin instruction
    /// itself, alongside a hash-commitment instruction.
    FromPayload(&'a SignedEvmTx),
    /// ExecuteFromHolder: the payload was staged into the given holder
    /// account beforehand.
    FromHolder(Pubkey),
}

/// Accounts one execution threads through every Begin/Continue round: the
/// storage account plus everything the target call touches (contract
/// accounts, token accounts, the interpreter program, sysvars).
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub storage: Pubkey,
    pub call_accounts: Vec<AccountMeta>,
}

impl ExecutionContext {
    /// Begin account list; the holder, when present, goes first.
    fn begin_accounts(&self, holder: Option<&Pubkey>) -> Vec<AccountMeta> {
        let mut accounts = Vec::with_capacity(self.call_accounts.len() + 2);
        if let Some(holder) = holder {
            accounts.push(AccountMeta::new(*holder, false));
        }
        accounts.push(AccountMeta::new(self.storage, false));
        accounts.extend(self.call_accounts.iter().cloned());
        accounts
    }

    /// Continue rounds drop the holder but keep the rest of the list.
    fn continue_accounts(&self) -> Vec<AccountMeta> {
        self.begin_accounts(None)
    }
}

/// Terminal interpreter-level result of a completed protocol run. An
/// interpreter failure is a successfully delivered transaction that
/// failed inside the EVM, distinct from transport or submission errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Stopped,
    InterpreterError(u8),
}

#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    /// Continue rounds performed after Begin.
    pub rounds: u32,
    /// Events decoded across all rounds, in emission order.
    pub events: Vec<EvmEvent>,
    /// Signature of the terminating submission.
    pub signature: Signature,
}

pub struct IterativeExecutor<'a, C: LedgerConnection> {
    conn: &'a C,
    payer: &'a Keypair,
    config: &'a LoaderConfig,
    policy: ExecutionPolicy,
}

impl<'a, C: LedgerConnection> IterativeExecutor<'a, C> {
    pub fn new(conn: &'a C, payer: &'a Keypair, config: &'a LoaderConfig) -> Self {
        Self {
            conn,
            payer,
            config,
            policy: ExecutionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Drive the execution to a terminal state: Begin, then bounded
    /// Continue rounds, classifying the inner-instruction trace after
    /// every submission.
    pub async fn execute(
        &self,
        method: ExecutionMethod<'_>,
        ctx: &ExecutionContext,
    ) -> Result<ExecutionOutcome> {
        let started = Instant::now();
        let mut events = Vec::new();

        let signature = self.begin(&method, ctx).await?;
        debug!(storage = %ctx.storage, %signature, "begin submitted");
        if let Some(outcome) = self.check_round(&signature, 0, &mut events).await? {
            return Ok(outcome);
        }

        let mut budget = self.policy.continue_steps;
        let mut rounds = 0u32;
        while rounds < self.policy.max_rounds {
            if let Some(deadline) = self.policy.deadline {
                if started.elapsed() >= deadline {
                    return Err(DriverError::ExecutionTimeout { rounds });
                }
            }
            rounds += 1;

            let signature = match self.continue_round(ctx, budget).await {
                Ok(signature) => signature,
                // A compute-limit rejection is an ordinary submission
                // failure, not a protocol-level one; retry the round with
                // a smaller budget while one is available.
                Err(ConnectionError::Rejected(reason)) if budget / 2 >= self.policy.min_steps => {
                    budget /= 2;
                    warn!(rounds, budget, %reason, "continue rejected, reducing step budget");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            debug!(storage = %ctx.storage, rounds, budget, %signature, "continue submitted");

            if let Some(outcome) = self.check_round(&signature, rounds, &mut events).await? {
                return Ok(outcome);
            }
        }

        Err(DriverError::ExecutionTimeout { rounds })
    }

    async fn begin(&self, method: &ExecutionMethod<'_>, ctx: &ExecutionContext) -> Result<Signature> {
        let blockhash = self.conn.get_latest_blockhash().await?;
        let instructions = match method {
            ExecutionMethod::FromPayload(tx) => vec![
                // The commitment references the partial-call instruction
                // at index 1, whose EVM body starts after tag + budget.
                // The offset table carries u16 fields, so the message must
                // fit one.
                instruction::hash_commitment(
                    1,
                    u16::try_from(tx.message.len()).map_err(|_| {
                        DriverError::Protocol(format!(
                            "message of {} bytes exceeds the commitment offset range",
                            tx.message.len()
                        ))
                    })?,
                    instruction::PARTIAL_CALL_DATA_START as u16,
                ),
                instruction::partial_call(
                    self.config,
                    self.policy.begin_steps,
                    &tx.to_instruction_bytes(),
                    ctx.begin_accounts(None),
                ),
            ],
            ExecutionMethod::FromHolder(holder) => vec![instruction::execute_from_holder(
                self.config,
                self.policy.begin_steps,
                ctx.begin_accounts(Some(holder)),
            )],
        };
        let tx = Transaction::new_signed_with_payer(
            &instructions,
            Some(&self.payer.pubkey()),
            &[self.payer],
            blockhash,
        );
        Ok(self.conn.send_and_confirm(&tx).await?)
    }

    async fn continue_round(
        &self,
        ctx: &ExecutionContext,
        budget: u64,
    ) -> std::result::Result<Signature, ConnectionError> {
        let blockhash = self.conn.get_latest_blockhash().await?;
        let instruction =
            instruction::continue_call(self.config, budget, ctx.continue_accounts());
        let tx = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&self.payer.pubkey()),
            &[self.payer],
            blockhash,
        );
        self.conn.send_and_confirm(&tx).await
    }

    /// Fetch and classify the trace of one submission. `Some` means the
    /// execution reached a terminal state.
    async fn check_round(
        &self,
        signature: &Signature,
        rounds: u32,
        events: &mut Vec<EvmEvent>,
    ) -> Result<Option<ExecutionOutcome>> {
        let entries = self.conn.get_inner_instruction_data(signature).await?;
        let decoded = decode_trace(&entries)?;
        events.extend(decoded.events);

        let status = match decoded.outcome {
            TraceOutcome::Pending => return Ok(None),
            TraceOutcome::Stopped => ExecutionStatus::Stopped,
            TraceOutcome::Error(code) => ExecutionStatus::InterpreterError(code),
        };
        info!(%signature, rounds, ?status, "execution terminated");
        Ok(Some(ExecutionOutcome {
            status,
            rounds,
            events: std::mem::take(events),
            signature: *signature,
        }))
    }
}
