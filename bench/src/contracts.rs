//! JSON persistence of previously deployed contract account triples, so a
//! benchmark run can pick up contracts deployed by an earlier invocation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use evm_driver::types::{ContractAccounts, EthAddress};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// On-disk form: base58 for ledger accounts, hex for the ethereum address.
#[derive(Debug, Serialize, Deserialize)]
struct StoredContract {
    ledger: String,
    eth: String,
    code: String,
}

impl TryFrom<&StoredContract> for ContractAccounts {
    type Error = anyhow::Error;

    fn try_from(stored: &StoredContract) -> Result<Self> {
        Ok(ContractAccounts {
            main: stored.ledger.parse::<Pubkey>()?,
            eth: stored.eth.parse::<EthAddress>().map_err(anyhow::Error::msg)?,
            code: stored.code.parse::<Pubkey>()?,
        })
    }
}

impl From<&ContractAccounts> for StoredContract {
    fn from(contract: &ContractAccounts) -> Self {
        Self {
            ledger: contract.main.to_string(),
            eth: hex::encode(contract.eth.as_bytes()),
            code: contract.code.to_string(),
        }
    }
}

pub fn load(path: &Path) -> Result<Vec<ContractAccounts>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading contracts file {}", path.display()))?;
    let stored: Vec<StoredContract> = serde_json::from_str(&raw)?;
    stored.iter().map(ContractAccounts::try_from).collect()
}

pub fn save(path: &Path, contracts: &[ContractAccounts]) -> Result<()> {
    let stored: Vec<StoredContract> = contracts.iter().map(StoredContract::from).collect();
    fs::write(path, serde_json::to_string_pretty(&stored)?)
        .with_context(|| format!("writing contracts file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contracts.json");
        let contracts = vec![
            ContractAccounts {
                main: Pubkey::new_unique(),
                eth: EthAddress::new([1; 20]),
                code: Pubkey::new_unique(),
            },
            ContractAccounts {
                main: Pubkey::new_unique(),
                eth: EthAddress::new([2; 20]),
                code: Pubkey::new_unique(),
            },
        ];

        save(&path, &contracts).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].main, contracts[0].main);
        assert_eq!(loaded[1].eth, contracts[1].eth);
        assert_eq!(loaded[1].code, contracts[1].code);
    }
}
