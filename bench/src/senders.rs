//! Rotation over distinct fee-paying identities. The ledger misorders or
//! rejects concurrent submissions from a single identity, so each flow
//! takes the next sender in round-robin order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use solana_sdk::signature::Keypair;

pub struct SenderPool {
    keypairs: Vec<Arc<Keypair>>,
    next: AtomicUsize,
}

impl SenderPool {
    pub fn new(keypairs: Vec<Keypair>) -> Self {
        assert!(!keypairs.is_empty(), "sender pool needs at least one keypair");
        Self {
            keypairs: keypairs.into_iter().map(Arc::new).collect(),
            next: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.keypairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypairs.is_empty()
    }

    pub fn next_sender(&self) -> Arc<Keypair> {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.keypairs.len();
        Arc::clone(&self.keypairs[index])
    }
}
