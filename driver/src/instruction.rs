//! Byte-exact instruction encodings defined by the interpreter program.

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::secp256k1_program;

use crate::config::LoaderConfig;

/// Write a payload chunk into a holder account.
pub const TAG_WRITE: u8 = 0x00;
/// One-shot call executed atomically from instruction data.
pub const TAG_CALL: u8 = 0x03;
/// Begin an iterative execution from instruction data.
pub const TAG_PARTIAL_CALL: u8 = 0x09;
/// Advance an in-flight iterative execution.
pub const TAG_CONTINUE: u8 = 0x0A;
/// Begin an iterative execution reading the payload from a holder account.
pub const TAG_EXECUTE_FROM_HOLDER: u8 = 0x0B;

/// Offset of the EVM instruction body inside PartialCall data:
/// tag (1) + step budget (8).
pub const PARTIAL_CALL_DATA_START: usize = 9;

/// `0x00 || reserved(4) || offset_le(4) || len_le(8) || chunk`
pub fn write_holder(
    config: &LoaderConfig,
    holder: &Pubkey,
    operator: &Pubkey,
    offset: u32,
    chunk: &[u8],
) -> Instruction {
    let mut data = Vec::with_capacity(17 + chunk.len());
    data.push(TAG_WRITE);
    data.extend_from_slice(&[0u8; 4]);
    data.extend_from_slice(&offset.to_le_bytes());
    data.extend_from_slice(&(chunk.len() as u64).to_le_bytes());
    data.extend_from_slice(chunk);

    Instruction {
        program_id: config.evm_loader,
        accounts: vec![
            AccountMeta::new(*holder, false),
            AccountMeta::new_readonly(*operator, true),
        ],
        data,
    }
}

/// `0x03 || call data`; the interpreter completes the call within this
/// single instruction, so no step budget is carried.
pub fn call(config: &LoaderConfig, call_data: &[u8], accounts: Vec<AccountMeta>) -> Instruction {
    let mut data = Vec::with_capacity(1 + call_data.len());
    data.push(TAG_CALL);
    data.extend_from_slice(call_data);

    Instruction {
        program_id: config.evm_loader,
        accounts,
        data,
    }
}

/// `0x09 || step_budget_le(8) || from || signature || message`
pub fn partial_call(
    config: &LoaderConfig,
    step_budget: u64,
    evm_instruction: &[u8],
    accounts: Vec<AccountMeta>,
) -> Instruction {
    let mut data = Vec::with_capacity(PARTIAL_CALL_DATA_START + evm_instruction.len());
    data.push(TAG_PARTIAL_CALL);
    data.extend_from_slice(&step_budget.to_le_bytes());
    data.extend_from_slice(evm_instruction);

    Instruction {
        program_id: config.evm_loader,
        accounts,
        data,
    }
}

/// `0x0A || step_budget_le(8)`
pub fn continue_call(
    config: &LoaderConfig,
    step_budget: u64,
    accounts: Vec<AccountMeta>,
) -> Instruction {
    let mut data = Vec::with_capacity(9);
    data.push(TAG_CONTINUE);
    data.extend_from_slice(&step_budget.to_le_bytes());

    Instruction {
        program_id: config.evm_loader,
        accounts,
        data,
    }
}

/// `0x0B || initial_step_counter_le(8)`
pub fn execute_from_holder(
    config: &LoaderConfig,
    initial_step: u64,
    accounts: Vec<AccountMeta>,
) -> Instruction {
    let mut data = Vec::with_capacity(9);
    data.push(TAG_EXECUTE_FROM_HOLDER);
    data.extend_from_slice(&initial_step.to_le_bytes());

    Instruction {
        program_id: config.evm_loader,
        accounts,
        data,
    }
}

/// Hash-commitment instruction paired with PartialCall. The interpreter
/// verifies the caller signature against the offsets committed here, which
/// describe the EVM instruction laid out at `data_start` of the sibling
/// instruction at `check_index`: caller address (20 bytes), then the
/// 65-byte signature, then the message.
pub fn hash_commitment(check_index: u8, message_len: u16, data_start: u16) -> Instruction {
    let eth_address_offset = data_start;
    let signature_offset = eth_address_offset + 20;
    let message_data_offset = signature_offset + 65;

    let mut data = Vec::with_capacity(12);
    data.push(1u8); // number of committed signatures
    data.extend_from_slice(&signature_offset.to_le_bytes());
    data.push(check_index);
    data.extend_from_slice(&eth_address_offset.to_le_bytes());
    data.push(check_index);
    data.extend_from_slice(&message_data_offset.to_le_bytes());
    data.extend_from_slice(&message_len.to_le_bytes());
    data.push(check_index);

    Instruction {
        program_id: secp256k1_program::id(),
        accounts: vec![AccountMeta::new_readonly(secp256k1_program::id(), false)],
        data,
    }
}
