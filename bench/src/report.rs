//! Classification and aggregation of batch execution results. Every flow
//! returns one structured report; the tally is a fold over the batch, not
//! a set of counters threaded through the flows.

use std::fmt;

use evm_driver::executor::{ExecutionOutcome, ExecutionStatus};
use evm_driver::DriverError;

/// What one execution's result counts as, mirroring the classes the
/// benchmark reports in aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Terminated with a stop and carried the expected event.
    Confirmed,
    /// Terminated with a stop but the expected event was absent or wrong.
    EventMismatch,
    /// No receipt: the submission never confirmed.
    MissingReceipt,
    /// Rejected for a stale or duplicate transaction count.
    NonceError,
    /// Rejected for an insufficient value or balance.
    ValueTooSmall,
    /// Anything else, including interpreter-level failures and timeouts.
    Unknown,
}

/// The event a flow expects on success: topic-0 hash plus the amount word
/// its data must end with.
#[derive(Debug, Clone, Copy)]
pub struct ExpectedEvent {
    pub topic0: [u8; 32],
    pub amount: [u8; 32],
}

/// Classify one finished flow. Without an expected event, any clean stop
/// counts as confirmed.
pub fn classify(
    result: &Result<ExecutionOutcome, DriverError>,
    expected: Option<&ExpectedEvent>,
) -> ReportKind {
    match result {
        Ok(outcome) => match outcome.status {
            ExecutionStatus::Stopped => {
                let matched = match expected {
                    None => true,
                    Some(expected) => outcome.events.iter().any(|event| {
                        event.topics.first() == Some(&expected.topic0)
                            && event.data.len() >= 32
                            && event.data[event.data.len() - 32..] == expected.amount
                    }),
                };
                if matched {
                    ReportKind::Confirmed
                } else {
                    ReportKind::EventMismatch
                }
            }
            ExecutionStatus::InterpreterError(_) => ReportKind::Unknown,
        },
        Err(DriverError::Connection(_)) => ReportKind::MissingReceipt,
        Err(DriverError::Rejected(reason)) => {
            let reason = reason.to_lowercase();
            if reason.contains("nonce") {
                ReportKind::NonceError
            } else if reason.contains("too small") || reason.contains("insufficient") {
                ReportKind::ValueTooSmall
            } else {
                ReportKind::Unknown
            }
        }
        Err(_) => ReportKind::Unknown,
    }
}

/// Aggregate tally over a batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub confirmed: usize,
    pub event_errors: usize,
    pub receipt_errors: usize,
    pub nonce_errors: usize,
    pub too_small_errors: usize,
    pub unknown_errors: usize,
}

impl BatchSummary {
    pub fn record(&mut self, kind: ReportKind) {
        self.total += 1;
        match kind {
            ReportKind::Confirmed => self.confirmed += 1,
            ReportKind::EventMismatch => self.event_errors += 1,
            ReportKind::MissingReceipt => self.receipt_errors += 1,
            ReportKind::NonceError => self.nonce_errors += 1,
            ReportKind::ValueTooSmall => self.too_small_errors += 1,
            ReportKind::Unknown => self.unknown_errors += 1,
        }
    }
}

impl FromIterator<ReportKind> for BatchSummary {
    fn from_iter<I: IntoIterator<Item = ReportKind>>(iter: I) -> Self {
        let mut summary = BatchSummary::default();
        for kind in iter {
            summary.record(kind);
        }
        summary
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total {} confirmed {} event_err {} receipt_err {} nonce_err {} too_small {} unknown {}",
            self.total,
            self.confirmed,
            self.event_errors,
            self.receipt_errors,
            self.nonce_errors,
            self.too_small_errors,
            self.unknown_errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evm_driver::abi;
    use evm_driver::trace::EvmEvent;
    use evm_driver::types::EthAddress;
    use solana_sdk::signature::Signature;

    fn expected() -> ExpectedEvent {
        ExpectedEvent {
            topic0: abi::event_topic("Transfer(address,address,uint256)"),
            amount: abi::encode_uint(1_000),
        }
    }

    fn stopped_with(events: Vec<EvmEvent>) -> Result<ExecutionOutcome, DriverError> {
        Ok(ExecutionOutcome {
            status: ExecutionStatus::Stopped,
            rounds: 1,
            events,
            signature: Signature::default(),
        })
    }

    #[test]
    fn matching_event_confirms() {
        let expected = expected();
        let event = EvmEvent {
            emitter: EthAddress::new([1; 20]),
            topics: vec![expected.topic0],
            data: expected.amount.to_vec(),
        };
        assert_eq!(classify(&stopped_with(vec![event]), Some(&expected)), ReportKind::Confirmed);
    }

    #[test]
    fn wrong_amount_is_an_event_mismatch() {
        let expected = expected();
        let event = EvmEvent {
            emitter: EthAddress::new([1; 20]),
            topics: vec![expected.topic0],
            data: abi::encode_uint(999).to_vec(),
        };
        assert_eq!(
            classify(&stopped_with(vec![event]), Some(&expected)),
            ReportKind::EventMismatch
        );
    }

    #[test]
    fn rejection_reasons_map_to_classes() {
        let expected = expected();
        assert_eq!(
            classify(&Err(DriverError::Rejected("bad nonce".into())), Some(&expected)),
            ReportKind::NonceError
        );
        assert_eq!(
            classify(
                &Err(DriverError::Rejected("lamports insufficient".into())),
                Some(&expected)
            ),
            ReportKind::ValueTooSmall
        );
        assert_eq!(
            classify(&Err(DriverError::Connection("timeout".into())), Some(&expected)),
            ReportKind::MissingReceipt
        );
        assert_eq!(
            classify(
                &Err(DriverError::ExecutionTimeout { rounds: 8 }),
                Some(&expected)
            ),
            ReportKind::Unknown
        );
    }

    #[test]
    fn summary_folds_kinds() {
        let summary: BatchSummary = [
            ReportKind::Confirmed,
            ReportKind::Confirmed,
            ReportKind::NonceError,
            ReportKind::Unknown,
        ]
        .into_iter()
        .collect();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.confirmed, 2);
        assert_eq!(summary.nonce_errors, 1);
        assert_eq!(summary.unknown_errors, 1);
    }
}
