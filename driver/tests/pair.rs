use evm_driver::derive_account_with_seed;
use evm_driver::loader::{EvmLoaderClient, ProgramAddressMapper};
use evm_driver::pair::{init_code_hash, predict_pair_address, query_salt, resolve};
use evm_driver::types::{ContractAccounts, EthAddress};
use evm_driver::DriverError;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;

mod common;
use common::{on_event, on_stop, test_config, MockConnection};

fn helper_contract() -> ContractAccounts {
    ContractAccounts {
        main: Pubkey::new_unique(),
        eth: EthAddress::new([0xAB; 20]),
        code: Pubkey::new_unique(),
    }
}

fn salt_trace(helper: &ContractAccounts, salt: [u8; 32]) -> Vec<Vec<u8>> {
    vec![
        on_event(*helper.eth.as_bytes(), &[[0x11; 32]], &salt),
        on_stop(),
    ]
}

#[tokio::test]
async fn salt_is_read_from_the_helper_event() {
    let config = test_config();
    let conn = MockConnection::new(config.evm_loader);
    let payer = Keypair::new();
    let helper = helper_contract();

    let expected = [0x5A; 32];
    conn.push_trace(salt_trace(&helper, expected));

    let salt = query_salt(
        &conn,
        &payer,
        &helper,
        &EthAddress::new([1; 20]),
        &EthAddress::new([2; 20]),
        &config,
    )
    .await
    .unwrap();
    assert_eq!(salt, expected);
}

#[tokio::test]
async fn foreign_emitter_is_a_protocol_violation() {
    let config = test_config();
    let conn = MockConnection::new(config.evm_loader);
    let payer = Keypair::new();
    let helper = helper_contract();

    conn.push_trace(vec![
        on_event([0xCD; 20], &[[0x11; 32]], &[0x5A; 32]),
        on_stop(),
    ]);

    let err = query_salt(
        &conn,
        &payer,
        &helper,
        &EthAddress::new([1; 20]),
        &EthAddress::new([2; 20]),
        &config,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DriverError::Protocol(_)));
}

#[tokio::test]
async fn resolving_a_new_pair_provisions_both_accounts() {
    let config = test_config();
    let conn = MockConnection::new(config.evm_loader);
    let payer = Keypair::new();
    let mapper = ProgramAddressMapper::new(config.evm_loader);
    let helper = helper_contract();
    let factory = EthAddress::new([0xFA; 20]);
    let code_hash = init_code_hash(b"pair template");
    let salt = [0x33; 32];

    conn.push_trace(salt_trace(&helper, salt));

    let pair = resolve(
        &conn,
        &payer,
        &mapper,
        &helper,
        &factory,
        &EthAddress::new([1; 20]),
        &EthAddress::new([2; 20]),
        &code_hash,
        &config,
    )
    .await
    .unwrap();

    assert_eq!(pair.eth, predict_pair_address(&factory, &salt, &code_hash));
    assert_eq!(pair.main, mapper.ether_to_ledger(&pair.eth).0);
    assert_eq!(
        pair.code,
        derive_account_with_seed(&payer.pubkey(), &pair.eth.to_seed(), &config.evm_loader)
            .unwrap()
    );

    // Salt query plus one provisioning transaction carrying both the
    // code-account creation and the ether-account creation.
    let submissions = conn.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[1].message.instructions.len(), 2);
}

#[tokio::test]
async fn resolving_an_existing_pair_is_read_only_and_stable() {
    let config = test_config();
    let conn = MockConnection::new(config.evm_loader);
    let payer = Keypair::new();
    let mapper = ProgramAddressMapper::new(config.evm_loader);
    let helper = helper_contract();
    let factory = EthAddress::new([0xFA; 20]);
    let code_hash = init_code_hash(b"pair template");
    let salt = [0x33; 32];

    let pair_eth = predict_pair_address(&factory, &salt, &code_hash);
    let (pair_main, _) = mapper.ether_to_ledger(&pair_eth);
    let pair_code =
        derive_account_with_seed(&payer.pubkey(), &pair_eth.to_seed(), &config.evm_loader)
            .unwrap();

    let mut account = vec![1u8];
    account.extend_from_slice(pair_eth.as_bytes());
    account.push(0);
    account.extend_from_slice(&0u64.to_le_bytes());
    account.extend_from_slice(pair_code.as_ref());
    conn.set_account_data(pair_main, account);
    conn.set_balance(pair_main, 1_000_000);
    conn.set_balance(pair_code, 1_000_000);

    conn.push_trace(salt_trace(&helper, salt));

    let pair = resolve(
        &conn,
        &payer,
        &mapper,
        &helper,
        &factory,
        &EthAddress::new([1; 20]),
        &EthAddress::new([2; 20]),
        &code_hash,
        &config,
    )
    .await
    .unwrap();

    assert_eq!(pair.eth, pair_eth);
    assert_eq!(pair.code, pair_code);
    // Only the salt query hit the ledger.
    assert_eq!(conn.submission_count(), 1);
}

#[tokio::test]
async fn stored_code_account_mismatch_is_fatal() {
    let config = test_config();
    let conn = MockConnection::new(config.evm_loader);
    let payer = Keypair::new();
    let mapper = ProgramAddressMapper::new(config.evm_loader);
    let helper = helper_contract();
    let factory = EthAddress::new([0xFA; 20]);
    let code_hash = init_code_hash(b"pair template");
    let salt = [0x33; 32];

    let pair_eth = predict_pair_address(&factory, &salt, &code_hash);
    let (pair_main, _) = mapper.ether_to_ledger(&pair_eth);

    let mut account = vec![1u8];
    account.extend_from_slice(pair_eth.as_bytes());
    account.push(0);
    account.extend_from_slice(&0u64.to_le_bytes());
    account.extend_from_slice(Pubkey::new_unique().as_ref()); // wrong code account
    conn.set_account_data(pair_main, account);

    conn.push_trace(salt_trace(&helper, salt));

    let err = resolve(
        &conn,
        &payer,
        &mapper,
        &helper,
        &factory,
        &EthAddress::new([1; 20]),
        &EthAddress::new([2; 20]),
        &code_hash,
        &config,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DriverError::Protocol(_)));
}
