//! Decoder for the interpreter's inner-instruction trace, the side-channel
//! through which it reports termination and EVM log emission.

use crate::error::{DriverError, Result};
use crate::types::EthAddress;

/// Trace entry tag: execution terminated, sub-status follows.
pub const TAG_ON_RETURN: u8 = 0x06;
/// Trace entry tag: EVM log emission.
pub const TAG_ON_EVENT: u8 = 0x07;
/// OnReturn sub-status: the machine encountered an explicit stop.
pub const STATUS_STOP: u8 = 0x11;

const EVENT_HEADER_LEN: usize = 29;
const TOPIC_LEN: usize = 32;

/// A decoded OnEvent entry: emitter address, indexed topics, data words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmEvent {
    pub emitter: EthAddress,
    pub topics: Vec<[u8; 32]>,
    pub data: Vec<u8>,
}

/// Terminal classification of one submitted transaction's trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceOutcome {
    /// No OnReturn observed; the execution is still in flight.
    Pending,
    /// OnReturn with the explicit-stop status.
    Stopped,
    /// OnReturn with any other status; the EVM-level call failed.
    Error(u8),
}

/// Everything one trace carries: the events emitted during the covered
/// steps plus the terminal outcome, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTrace {
    pub events: Vec<EvmEvent>,
    pub outcome: TraceOutcome,
}

impl DecodedTrace {
    pub fn is_terminal(&self) -> bool {
        !matches!(self.outcome, TraceOutcome::Pending)
    }
}

/// Parse a single OnEvent payload:
/// `0x07 || emitter(20) || topic_count_le(8) || topics(32 each) || data`.
pub fn decode_event(entry: &[u8]) -> Result<EvmEvent> {
    if entry.first() != Some(&TAG_ON_EVENT) {
        return Err(DriverError::Protocol(format!(
            "expected OnEvent entry, found tag {:?}",
            entry.first()
        )));
    }
    if entry.len() < EVENT_HEADER_LEN {
        return Err(DriverError::Protocol(format!(
            "OnEvent entry truncated at {} bytes",
            entry.len()
        )));
    }

    let emitter = EthAddress::try_from_slice(&entry[1..21])?;
    let topic_count = u64::from_le_bytes(entry[21..29].try_into().unwrap()) as usize;

    // The declared count is interpreter-controlled; a wrapping size here
    // would accept a malformed entry as topicless.
    let topics_end = topic_count
        .checked_mul(TOPIC_LEN)
        .and_then(|len| len.checked_add(EVENT_HEADER_LEN))
        .ok_or_else(|| {
            DriverError::Protocol(format!("OnEvent declares {topic_count} topics"))
        })?;
    if entry.len() < topics_end {
        return Err(DriverError::Protocol(format!(
            "OnEvent declares {} topics but carries {} bytes",
            topic_count,
            entry.len()
        )));
    }

    let topics = entry[EVENT_HEADER_LEN..topics_end]
        .chunks_exact(TOPIC_LEN)
        .map(|chunk| chunk.try_into().unwrap())
        .collect();

    Ok(EvmEvent {
        emitter,
        topics,
        data: entry[topics_end..].to_vec(),
    })
}

/// Classify a full inner-instruction trace.
///
/// Entries are scanned by tag, never by position: any OnReturn terminates
/// the execution, with the last one winning if the interpreter emitted
/// several. Tags outside the recognized set are a protocol violation and
/// are never skipped.
pub fn decode_trace(entries: &[Vec<u8>]) -> Result<DecodedTrace> {
    let mut events = Vec::new();
    let mut outcome = TraceOutcome::Pending;

    for entry in entries {
        match entry.first() {
            Some(&TAG_ON_RETURN) => {
                let status = *entry.get(1).ok_or_else(|| {
                    DriverError::Protocol("OnReturn entry missing status byte".into())
                })?;
                outcome = if status == STATUS_STOP {
                    TraceOutcome::Stopped
                } else {
                    TraceOutcome::Error(status)
                };
            }
            Some(&TAG_ON_EVENT) => events.push(decode_event(entry)?),
            Some(&tag) => {
                return Err(DriverError::Protocol(format!(
                    "unknown trace entry tag {tag:#04x}"
                )))
            }
            None => return Err(DriverError::Protocol("empty trace entry".into())),
        }
    }

    Ok(DecodedTrace { events, outcome })
}
