//! Benchmark harness over the iterative execution driver: load a workload
//! of prebuilt signed transactions, run them concurrently across a pool of
//! fee payers, and report an aggregate tally.

pub mod config;
pub mod contracts;
pub mod flow;
pub mod report;
pub mod senders;

pub use crate::config::{load_workload, BenchConfig, WorkItem};
pub use crate::report::{classify, BatchSummary, ExpectedEvent, ReportKind};
pub use crate::senders::SenderPool;
