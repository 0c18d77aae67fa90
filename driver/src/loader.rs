//! Seam to the interpreter program's own account-management entry points:
//! the ethereum-address-to-ledger-address mapping and ether account
//! creation. Consumed as an opaque collaborator by the resolver.

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;

use crate::error::{DriverError, Result};
use crate::types::EthAddress;

/// Create an ether account backing an ethereum address.
const TAG_CREATE_ETHER_ACCOUNT: u8 = 0x02;

pub trait EvmLoaderClient: Send + Sync {
    /// Program-address mapping from an ethereum address to its ledger
    /// account, with the bump that made the derivation fall off the curve.
    fn ether_to_ledger(&self, address: &EthAddress) -> (Pubkey, u8);

    /// Instruction creating the ether account for `address`, wired to the
    /// given code account.
    fn create_ether_account(
        &self,
        payer: &Pubkey,
        address: &EthAddress,
        code_account: &Pubkey,
        lamports: u64,
        space: u64,
    ) -> Instruction;
}

/// The interpreter's canonical mapping and account-creation encoding.
pub struct ProgramAddressMapper {
    pub evm_loader: Pubkey,
}

impl ProgramAddressMapper {
    pub fn new(evm_loader: Pubkey) -> Self {
        Self { evm_loader }
    }
}

impl EvmLoaderClient for ProgramAddressMapper {
    fn ether_to_ledger(&self, address: &EthAddress) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[address.as_bytes()], &self.evm_loader)
    }

    fn create_ether_account(
        &self,
        payer: &Pubkey,
        address: &EthAddress,
        code_account: &Pubkey,
        lamports: u64,
        space: u64,
    ) -> Instruction {
        let (account, bump) = self.ether_to_ledger(address);

        // 0x02 || lamports_le(8) || space_le(8) || ether(20) || bump
        let mut data = Vec::with_capacity(38);
        data.push(TAG_CREATE_ETHER_ACCOUNT);
        data.extend_from_slice(&lamports.to_le_bytes());
        data.extend_from_slice(&space.to_le_bytes());
        data.extend_from_slice(address.as_bytes());
        data.push(bump);

        Instruction {
            program_id: self.evm_loader,
            accounts: vec![
                AccountMeta::new(*payer, true),
                AccountMeta::new(account, false),
                AccountMeta::new(*code_account, false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            data,
        }
    }
}

/// Header of an ether account as stored by the interpreter:
/// tag(1) || ether(20) || nonce(1) || trx_count_le(8) || code_account(32).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EtherAccountData {
    pub ether: EthAddress,
    pub nonce: u8,
    pub trx_count: u64,
    pub code_account: Pubkey,
}

impl EtherAccountData {
    pub const LEN: usize = 62;

    pub fn unpack(data: &[u8]) -> Result<Self> {
        if data.len() < Self::LEN {
            return Err(DriverError::InvalidAccountData(format!(
                "ether account data too small: {} bytes",
                data.len()
            )));
        }
        Ok(Self {
            ether: EthAddress::try_from_slice(&data[1..21])?,
            nonce: data[21],
            trx_count: u64::from_le_bytes(data[22..30].try_into().unwrap()),
            code_account: Pubkey::try_from(&data[30..62])
                .map_err(|_| DriverError::InvalidAccountData("bad code account bytes".into()))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_is_deterministic() {
        let mapper = ProgramAddressMapper::new(Pubkey::new_unique());
        let address = EthAddress::new([7; 20]);
        assert_eq!(mapper.ether_to_ledger(&address), mapper.ether_to_ledger(&address));
    }

    #[test]
    fn create_ether_account_layout() {
        let mapper = ProgramAddressMapper::new(Pubkey::new_unique());
        let payer = Pubkey::new_unique();
        let code = Pubkey::new_unique();
        let address = EthAddress::new([9; 20]);
        let (_, bump) = mapper.ether_to_ledger(&address);

        let ix = mapper.create_ether_account(&payer, &address, &code, 1_000, 0);
        assert_eq!(ix.data[0], 0x02);
        assert_eq!(&ix.data[1..9], &1_000u64.to_le_bytes());
        assert_eq!(&ix.data[9..17], &0u64.to_le_bytes());
        assert_eq!(&ix.data[17..37], address.as_bytes());
        assert_eq!(ix.data[37], bump);
        assert_eq!(ix.data.len(), 38);
    }

    #[test]
    fn ether_account_round_trip() {
        let code_account = Pubkey::new_unique();
        let mut data = vec![1u8];
        data.extend_from_slice(&[5u8; 20]);
        data.push(3);
        data.extend_from_slice(&42u64.to_le_bytes());
        data.extend_from_slice(code_account.as_ref());
        data.extend_from_slice(&[0u8; 7]); // trailing fields ignored

        let parsed = EtherAccountData::unpack(&data).unwrap();
        assert_eq!(parsed.ether, EthAddress::new([5; 20]));
        assert_eq!(parsed.nonce, 3);
        assert_eq!(parsed.trx_count, 42);
        assert_eq!(parsed.code_account, code_account);
    }

    #[test]
    fn short_account_data_rejected() {
        assert!(EtherAccountData::unpack(&[0u8; 10]).is_err());
    }
}
