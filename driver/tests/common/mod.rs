#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use evm_driver::connection::{ConnectionError, LedgerConnection};
use evm_driver::trace::{STATUS_STOP, TAG_ON_EVENT, TAG_ON_RETURN};
use evm_driver::LoaderConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::system_program;
use solana_sdk::transaction::Transaction;

/// Scripted result for one submission.
pub enum SendScript {
    /// Accept and expose the given inner-instruction trace.
    Trace(Vec<Vec<u8>>),
    /// Decline at the ledger boundary.
    Reject(String),
}

#[derive(Default)]
struct MockState {
    balances: HashMap<Pubkey, u64>,
    accounts: HashMap<Pubkey, Vec<u8>>,
    holders: HashMap<Pubkey, Vec<u8>>,
    script: VecDeque<SendScript>,
    traces: HashMap<Signature, Vec<Vec<u8>>>,
    submitted: Vec<Transaction>,
}

/// In-memory ledger stub: applies holder writes and system account
/// creations, and hands out scripted traces per submission.
pub struct MockConnection {
    evm_loader: Pubkey,
    state: Mutex<MockState>,
}

impl MockConnection {
    pub fn new(evm_loader: Pubkey) -> Self {
        Self {
            evm_loader,
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn set_balance(&self, pubkey: Pubkey, lamports: u64) {
        self.state.lock().unwrap().balances.insert(pubkey, lamports);
    }

    pub fn set_account_data(&self, pubkey: Pubkey, data: Vec<u8>) {
        self.state.lock().unwrap().accounts.insert(pubkey, data);
    }

    pub fn push_script(&self, script: SendScript) {
        self.state.lock().unwrap().script.push_back(script);
    }

    pub fn push_trace(&self, trace: Vec<Vec<u8>>) {
        self.push_script(SendScript::Trace(trace));
    }

    pub fn submissions(&self) -> Vec<Transaction> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn submission_count(&self) -> usize {
        self.state.lock().unwrap().submitted.len()
    }

    pub fn holder_content(&self, holder: &Pubkey) -> Option<Vec<u8>> {
        self.state.lock().unwrap().holders.get(holder).cloned()
    }

    fn apply(&self, state: &mut MockState, tx: &Transaction) {
        let keys = &tx.message.account_keys;
        for ix in &tx.message.instructions {
            let program = keys[ix.program_id_index as usize];
            if program == system_program::id() && ix.accounts.len() >= 2 {
                // Treat any system instruction as account creation.
                let created = keys[ix.accounts[1] as usize];
                state.balances.insert(created, 1_000_000_000);
            }
            if program == self.evm_loader && ix.data.first() == Some(&0x00) && ix.data.len() >= 17
            {
                let holder = keys[ix.accounts[0] as usize];
                let offset = u32::from_le_bytes(ix.data[5..9].try_into().unwrap()) as usize;
                let chunk = &ix.data[17..];
                let buffer = state.holders.entry(holder).or_default();
                if buffer.len() < offset + chunk.len() {
                    buffer.resize(offset + chunk.len(), 0);
                }
                buffer[offset..offset + chunk.len()].copy_from_slice(chunk);
            }
        }
    }
}

#[async_trait]
impl LedgerConnection for MockConnection {
    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, ConnectionError> {
        let mut state = self.state.lock().unwrap();
        match state.script.pop_front() {
            Some(SendScript::Reject(reason)) => return Err(ConnectionError::Rejected(reason)),
            Some(SendScript::Trace(trace)) => {
                let signature = tx.signatures[0];
                state.traces.insert(signature, trace);
            }
            None => {}
        }
        self.apply(&mut state, tx);
        state.submitted.push(tx.clone());
        Ok(tx.signatures[0])
    }

    async fn confirm(&self, _signature: &Signature) -> Result<(), ConnectionError> {
        Ok(())
    }

    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, ConnectionError> {
        Ok(*self.state.lock().unwrap().balances.get(pubkey).unwrap_or(&0))
    }

    async fn get_account_data(
        &self,
        pubkey: &Pubkey,
    ) -> Result<Option<Vec<u8>>, ConnectionError> {
        Ok(self.state.lock().unwrap().accounts.get(pubkey).cloned())
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, ConnectionError> {
        Ok(Hash::new_unique())
    }

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, ConnectionError> {
        Ok(890_880 + 10 * data_len as u64)
    }

    async fn get_inner_instruction_data(
        &self,
        signature: &Signature,
    ) -> Result<Vec<Vec<u8>>, ConnectionError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .traces
            .get(signature)
            .cloned()
            .unwrap_or_default())
    }
}

pub fn test_config() -> LoaderConfig {
    LoaderConfig::new(Pubkey::new_unique(), Pubkey::new_unique())
}

pub fn on_return(status: u8) -> Vec<u8> {
    vec![TAG_ON_RETURN, status]
}

pub fn on_stop() -> Vec<u8> {
    on_return(STATUS_STOP)
}

pub fn on_event(emitter: [u8; 20], topics: &[[u8; 32]], data: &[u8]) -> Vec<u8> {
    let mut entry = vec![TAG_ON_EVENT];
    entry.extend_from_slice(&emitter);
    entry.extend_from_slice(&(topics.len() as u64).to_le_bytes());
    for topic in topics {
        entry.extend_from_slice(topic);
    }
    entry.extend_from_slice(data);
    entry
}
