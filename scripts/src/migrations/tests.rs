//! Tests of the migration steps against the mock chain

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::{SolCall, SolValue};

use super::*;
use crate::{
    constants::{
        ALLOWLIST_FIREWALL, ALLOWLIST_PROXY_FIREWALL, PROXY_IMPLEMENTATION_STORAGE_SLOT,
        RIVER_PROXY_FIREWALL, TLC_PROXY_FIREWALL,
    },
    deployer::tests::{test_context, test_context_with},
    records::{tests::dummy_record, DeploymentStore},
    solidity::{
        forceFundedValidatorKeysEventEmissionCall, getAdministratorCall, getCredentialsCall,
        getOracleCall, getRiverCall, initRiverV1_1Call, initializeWithdrawV1Call,
        upgradeToAndCallCall, upgradeToCall,
    },
    testing::MockChain,
};

/// The deployer used by the tests
fn deployer() -> Address {
    Address::repeat_byte(0xde)
}

/// The selector of `data`, if it has one
fn selector_of(data: &[u8]) -> Option<[u8; 4]> {
    data.get(..4)?.try_into().ok()
}

/// Answer the calls of the core step from the deployment records, with River
/// reporting `oracle_override` as its oracle when set
fn core_calls(
    store: &DeploymentStore,
    oracle_override: Option<Address>,
) -> impl Fn(Address, &[u8]) -> Option<Bytes> + Send + Sync + 'static {
    let store = store.clone();
    move |_, data| {
        let selector = selector_of(data)?;
        let encoded = if selector == getCredentialsCall::SELECTOR {
            B256::repeat_byte(0xcc).abi_encode()
        } else if selector == getOracleCall::SELECTOR {
            let oracle = match oracle_override {
                Some(oracle) => oracle,
                None => store.get(ORACLE).ok()??.address,
            };
            oracle.abi_encode()
        } else if selector == getRiverCall::SELECTOR {
            store.get(RIVER).ok()??.address.abi_encode()
        } else {
            return None;
        };

        Some(encoded.into())
    }
}

#[test]
fn test_tag_selection() {
    let all = select_migrations(default_migrations(), &[]);
    assert_eq!(all.len(), 7);
    assert_eq!(all[0].id(), "01_deploy_withdraw_stub");

    let selected = select_migrations(
        default_migrations(),
        &["core".to_string(), "tlc".to_string()],
    );
    assert_eq!(selected, vec![Migration::CoreContracts, Migration::Tlc]);

    let release = Migration::Release {
        version: "1_3_0".to_string(),
        contracts: vec!["RiverV1".to_string()],
        migration: None,
    };
    assert!(select_migrations(vec![release.clone()], &[]).is_empty());
    assert_eq!(release.id(), "release_1_3_0");
    assert_eq!(release.targets(), vec!["RiverV1_Implementation_1_3_0"]);
}

#[tokio::test]
async fn test_step_is_applied_once() {
    let test = test_context(MockChain::new(deployer()), Network::Local);
    let ctx = &test.ctx;

    let first = run_migrations(ctx, &[Migration::WithdrawStub]).await.unwrap();
    assert_eq!(first, vec![("01_deploy_withdraw_stub".to_string(), StepOutcome::Applied)]);
    // Implementation and proxy
    assert_eq!(ctx.chain.num_deployments(), 2);

    let second = run_migrations(ctx, &[Migration::WithdrawStub]).await.unwrap();
    assert_eq!(second, vec![("01_deploy_withdraw_stub".to_string(), StepOutcome::Skipped)]);
    assert_eq!(ctx.chain.num_deployments(), 2);

    let withdraw = ctx.store.require(WITHDRAW).unwrap();
    assert_eq!(withdraw.address, deployer().create(1));
    assert_eq!(withdraw.implementation, Some(deployer().create(0)));
    assert!(withdraw.execute.is_none());
}

#[tokio::test]
async fn test_allowlist_lands_at_predicted_address() {
    let chain = MockChain::new(deployer()).with_nonce(40);
    let test = test_context(chain, Network::Local);
    let ctx = &test.ctx;

    run_migrations(ctx, &[Migration::Allowlist]).await.unwrap();

    let firewall = ctx.store.require(ALLOWLIST_FIREWALL).unwrap();
    let proxy_firewall = ctx.store.require(ALLOWLIST_PROXY_FIREWALL).unwrap();
    let allowlist = ctx.store.require(ALLOWLIST).unwrap();

    assert_eq!(firewall.address, deployer().create(40));
    assert_eq!(proxy_firewall.address, deployer().create(41));
    assert_eq!(allowlist.address, deployer().create(43));
    // Both firewalls guard the allowlist they were deployed before
    assert_eq!(firewall.args[2], allowlist.address.to_string());
    assert_eq!(proxy_firewall.args[2], allowlist.address.to_string());
    assert_eq!(
        allowlist.execute.unwrap().args,
        vec![firewall.address.to_string(), firewall.address.to_string()]
    );
}

#[tokio::test]
async fn test_tlc_lands_at_predicted_address() {
    let chain = MockChain::new(deployer()).with_nonce(7);
    let test = test_context(chain, Network::Local);
    let ctx = &test.ctx;

    let outcomes = run_migrations(ctx, &[Migration::Tlc]).await.unwrap();
    assert_eq!(outcomes[0].1, StepOutcome::Applied);

    let proxy_firewall = ctx.store.require(TLC_PROXY_FIREWALL).unwrap();
    let implementation = ctx.store.require("TLCV1_Implementation_1_1_0").unwrap();
    let tlc = ctx.store.require(TLC).unwrap();

    assert_eq!(proxy_firewall.address, deployer().create(7));
    assert_eq!(implementation.address, deployer().create(8));
    assert_eq!(tlc.address, deployer().create(9));
    assert_eq!(tlc.implementation, Some(implementation.address));

    // The executor may only pause TLC through its proxy firewall
    let accounts = Network::Local.named_accounts();
    assert_eq!(
        proxy_firewall.args,
        vec![
            accounts.proxy_administrator().unwrap().to_string(),
            accounts.executor().unwrap().to_string(),
            tlc.address.to_string(),
            "[0x8456cb59]".to_string(),
        ]
    );
    assert_eq!(tlc.args[1], proxy_firewall.address.to_string());

    let init = tlc.execute.unwrap();
    assert_eq!(init.method_name, "initTLCV1");
    assert_eq!(
        init.args,
        vec![accounts.tlc_mint_account().unwrap().to_string()]
    );
}

#[tokio::test]
async fn test_coverage_fund_links_to_river() {
    let river = Address::repeat_byte(0x01);
    let test = test_context(MockChain::new(deployer()), Network::Local);
    let ctx = &test.ctx;
    ctx.store.save(&dummy_record(RIVER, river)).unwrap();

    let outcomes = run_migrations(ctx, &[Migration::CoverageFund])
        .await
        .unwrap();
    assert_eq!(outcomes[0].1, StepOutcome::Applied);
    assert_eq!(ctx.chain.num_deployments(), 2);

    let coverage_fund = ctx.store.require(COVERAGE_FUND).unwrap();
    assert_eq!(coverage_fund.address, deployer().create(1));
    assert_eq!(coverage_fund.implementation, Some(deployer().create(0)));
    // Administered by the proxy administrator directly, no proxy firewall
    assert_eq!(
        coverage_fund.args[1],
        Network::Local
            .named_accounts()
            .proxy_administrator()
            .unwrap()
            .to_string()
    );

    let init = coverage_fund.execute.unwrap();
    assert_eq!(init.method_name, "initCoverageFundV1");
    assert_eq!(init.args, vec![river.to_string()]);
}

#[tokio::test]
async fn test_interleaved_transaction_aborts() {
    let test = test_context(MockChain::new(deployer()), Network::Local);
    let ctx = &test.ctx;

    // Another client sends from the deployer account after the first firewall
    ctx.chain.interleave_foreign_tx_after(1);
    let err = run_migrations(ctx, &[Migration::Allowlist])
        .await
        .unwrap_err();

    match err {
        ScriptError::AddressMismatch {
            ref name,
            predicted,
            actual,
        } => {
            assert_eq!(name, ALLOWLIST_PROXY_FIREWALL);
            assert_eq!(predicted, deployer().create(1));
            assert_eq!(actual, deployer().create(2));

            let msg = err.to_string();
            assert!(msg.contains(&format!("{predicted:#x}")));
            assert!(msg.contains(&format!("{actual:#x}")));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(!ctx.store.is_deployed(ALLOWLIST));
}

#[tokio::test]
async fn test_network_gating() {
    let test = test_context(MockChain::new(deployer()), Network::Mainnet);
    let ctx = &test.ctx;

    let err = run_migrations(ctx, &[Migration::WithdrawStub])
        .await
        .unwrap_err();
    assert!(matches!(err, ScriptError::InvalidNetwork(_)));

    // WLSETH already exists on mainnet
    let outcomes = run_migrations(ctx, &[Migration::Wlseth]).await.unwrap();
    assert_eq!(outcomes[0].1, StepOutcome::Skipped);
    assert_eq!(ctx.chain.num_deployments(), 0);
}

#[tokio::test]
async fn test_missing_prior_deployment() {
    let test = test_context(MockChain::new(deployer()), Network::Local);
    let ctx = &test.ctx;

    let err = run_migrations(ctx, &[Migration::CoverageFund])
        .await
        .unwrap_err();
    assert!(matches!(err, ScriptError::MissingDeployment(name) if name == RIVER));
    assert_eq!(ctx.chain.num_deployments(), 0);
}

#[tokio::test]
async fn test_core_contracts_are_wired() {
    let test = test_context_with(Network::DevHolesky, |store| {
        MockChain::new(deployer()).with_call_handler(core_calls(store, None))
    });
    let ctx = &test.ctx;

    let steps = [
        Migration::WithdrawStub,
        Migration::Allowlist,
        Migration::CoreContracts,
    ];
    let outcomes = run_migrations(ctx, &steps).await.unwrap();
    assert!(outcomes
        .iter()
        .all(|(_, outcome)| *outcome == StepOutcome::Applied));

    // Withdraw 2, Allowlist 4, River/Oracle/OperatorsRegistry 4 each,
    // ELFeeRecipient 2, RedeemManager 3
    assert_eq!(ctx.chain.num_deployments(), 23);

    let river = ctx.store.require(RIVER).unwrap();
    let oracle = ctx.store.require(ORACLE).unwrap();
    let operators_registry = ctx.store.require(OPERATORS_REGISTRY).unwrap();
    let el_fee_recipient = ctx.store.require(EL_FEE_RECIPIENT).unwrap();
    let redeem_manager = ctx.store.require(REDEEM_MANAGER).unwrap();
    let river_proxy_firewall = ctx.store.require(RIVER_PROXY_FIREWALL).unwrap();

    // River was initialized with the addresses of contracts deployed after it
    let init_river = river.execute.unwrap();
    assert_eq!(init_river.method_name, "initRiverV1");
    assert_eq!(init_river.args[1], el_fee_recipient.address.to_string());
    assert_eq!(init_river.args[3], oracle.address.to_string());
    assert_eq!(init_river.args[6], operators_registry.address.to_string());
    assert_eq!(init_river.args[8], "1250");
    assert_eq!(river_proxy_firewall.args[2], river.address.to_string());
    assert_eq!(oracle.execute.unwrap().args[2], "225");

    let sent = ctx.chain.sent_calls();
    let withdraw = ctx.store.require(WITHDRAW).unwrap().address;
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0].0, withdraw);
    assert_eq!(sent[0].1[..4], initializeWithdrawV1Call::SELECTOR);
    assert_eq!(sent[1].0, river.address);
    let init_river_v1_1 = initRiverV1_1Call::abi_decode(&sent[1].1, true).unwrap();
    assert_eq!(init_river_v1_1.redeemManager, redeem_manager.address);
    assert_eq!(init_river_v1_1.epochsPerFrame, 225);
    assert_eq!(sent[2].0, operators_registry.address);
    assert_eq!(
        sent[2].1[..4],
        forceFundedValidatorKeysEventEmissionCall::SELECTOR
    );

    let rerun = run_migrations(ctx, &steps).await.unwrap();
    assert!(rerun
        .iter()
        .all(|(_, outcome)| *outcome == StepOutcome::Skipped));
    assert_eq!(ctx.chain.num_deployments(), 23);
}

#[tokio::test]
async fn test_dev_hoodi_reporting_frames() {
    let test = test_context_with(Network::DevHoodi, |store| {
        MockChain::new(deployer()).with_call_handler(core_calls(store, None))
    });
    let ctx = &test.ctx;

    run_migrations(
        ctx,
        &[
            Migration::WithdrawStub,
            Migration::Allowlist,
            Migration::CoreContracts,
        ],
    )
    .await
    .unwrap();

    let river = ctx.store.require(RIVER).unwrap();
    let oracle = ctx.store.require(ORACLE).unwrap();
    assert_eq!(river.execute.unwrap().args[8], "1000");

    // The oracle reports on full frames, River on two epochs
    let init_oracle = oracle.execute.unwrap();
    assert_eq!(init_oracle.method_name, "initOracleV1");
    assert_eq!(init_oracle.args[2], "225");
    assert_eq!(init_oracle.args[5], "1742213400");

    let sent = ctx.chain.sent_calls();
    let init_river_v1_1 = initRiverV1_1Call::abi_decode(&sent[1].1, true).unwrap();
    assert_eq!(init_river_v1_1.epochsPerFrame, 2);
    assert_eq!(init_river_v1_1.genesisTime, 1742213400);
}

#[tokio::test]
async fn test_core_cross_reference_mismatch() {
    let test = test_context_with(Network::Local, |store| {
        MockChain::new(deployer())
            .with_call_handler(core_calls(store, Some(Address::repeat_byte(0x0b))))
    });
    let ctx = &test.ctx;

    let err = run_migrations(
        ctx,
        &[
            Migration::WithdrawStub,
            Migration::Allowlist,
            Migration::CoreContracts,
        ],
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ScriptError::CrossReferenceMismatch(_)));
    assert!(!ctx.store.is_deployed(REDEEM_MANAGER));
    assert!(ctx.chain.sent_calls().is_empty());
}

#[tokio::test]
async fn test_oracle_admin_wait() {
    let river = Address::repeat_byte(0x01);
    let oracle = Address::repeat_byte(0x02);
    let administrator = Address::repeat_byte(0x03);

    let polls = Arc::new(AtomicUsize::new(0));
    let handler_polls = polls.clone();
    let chain = MockChain::new(deployer()).with_call_handler(move |_, data| {
        let selector = selector_of(data)?;
        if selector == getAdministratorCall::SELECTOR {
            return Some(administrator.abi_encode().into());
        }

        // River points at the oracle from the fifth read on
        let reads = handler_polls.fetch_add(1, Ordering::SeqCst) + 1;
        let current = if reads >= 5 { oracle } else { Address::ZERO };
        Some(current.abi_encode().into())
    });

    let test = test_context(chain, Network::Local);
    let ctx = &test.ctx;
    ctx.store.save(&dummy_record(RIVER, river)).unwrap();
    ctx.store.save(&dummy_record(ORACLE, oracle)).unwrap();

    let outcomes = run_migrations(ctx, &[Migration::SetOracleOnRiver])
        .await
        .unwrap();
    assert_eq!(outcomes[0].1, StepOutcome::Applied);
    assert_eq!(polls.load(Ordering::SeqCst), 5);

    let outcomes = run_migrations(ctx, &[Migration::SetOracleOnRiver])
        .await
        .unwrap();
    assert_eq!(outcomes[0].1, StepOutcome::Skipped);
}

#[tokio::test]
async fn test_release_waits_for_upgrade() {
    let test = test_context(MockChain::new(deployer()), Network::Local);
    let ctx = &test.ctx;
    ctx.store
        .save(&dummy_record(RIVER, Address::repeat_byte(0x01)))
        .unwrap();

    run_migrations(ctx, &[Migration::Wlseth]).await.unwrap();
    let wlseth = ctx.store.require(WLSETH).unwrap();
    assert_eq!(ctx.chain.num_deployments(), 2);

    let release = Migration::Release {
        version: "1_3_0".to_string(),
        contracts: vec!["WLSETHV1".to_string()],
        migration: None,
    };

    let outcomes = run_migrations(ctx, &[release.clone()]).await.unwrap();
    assert_eq!(outcomes[0].1, StepOutcome::Applied);
    assert_eq!(ctx.chain.num_deployments(), 3);
    let implementation = ctx
        .store
        .require("WLSETHV1_Implementation_1_3_0")
        .unwrap()
        .address;

    // Not upgraded yet: the upgrade is printed again, nothing is redeployed
    let outcomes = run_migrations(ctx, &[release.clone()]).await.unwrap();
    assert_eq!(outcomes[0].1, StepOutcome::Applied);
    assert_eq!(ctx.chain.num_deployments(), 3);

    ctx.chain.set_storage(
        wlseth.address,
        PROXY_IMPLEMENTATION_STORAGE_SLOT,
        implementation.into_word(),
    );
    let outcomes = run_migrations(ctx, &[release]).await.unwrap();
    assert_eq!(outcomes[0].1, StepOutcome::Skipped);
    // Nothing was sent by the deployer, upgrades are up to the administrator
    assert!(ctx.chain.sent_calls().is_empty());
}

#[tokio::test]
async fn test_release_upgrades_through_proxy_firewall() {
    let test = test_context(MockChain::new(deployer()), Network::Local);
    let ctx = &test.ctx;
    ctx.store
        .save(&dummy_record(RIVER, Address::repeat_byte(0x01)))
        .unwrap();
    run_migrations(ctx, &[Migration::Wlseth]).await.unwrap();
    let wlseth = ctx.store.require(WLSETH).unwrap();

    let proxy_firewall = Address::repeat_byte(0x77);
    ctx.store
        .save(&dummy_record("WLSETHProxyFirewall", proxy_firewall))
        .unwrap();

    // Recorded under the same artifact, but not deployed with any of its
    // implementations
    let mut unrelated = dummy_record("Unrelated", Address::repeat_byte(0x55));
    unrelated.contract = "WLSETHV1".to_string();
    unrelated.implementation = Some(Address::repeat_byte(0x56));
    ctx.store.save(&unrelated).unwrap();

    let release = Migration::Release {
        version: "1_3_0".to_string(),
        contracts: vec!["WLSETHV1".to_string()],
        migration: None,
    };
    run_migrations(ctx, &[release]).await.unwrap();
    let implementation = ctx
        .store
        .require("WLSETHV1_Implementation_1_3_0")
        .unwrap()
        .address;

    let transactions = release::upgrade_transactions(ctx, "1_3_0", "WLSETHV1", None)
        .await
        .unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].name, WLSETH);
    assert_eq!(transactions[0].to, proxy_firewall);
    assert_ne!(transactions[0].to, wlseth.address);
    assert_eq!(transactions[0].call.signature, upgradeToCall::SIGNATURE);
    let upgrade = upgradeToCall::abi_decode(&transactions[0].call.calldata, true).unwrap();
    assert_eq!(upgrade.newImplementation, implementation);
}

#[tokio::test]
async fn test_release_with_migration_calldata() {
    let test = test_context(MockChain::new(deployer()), Network::Local);
    let ctx = &test.ctx;
    ctx.store
        .save(&dummy_record(RIVER, Address::repeat_byte(0x01)))
        .unwrap();
    run_migrations(ctx, &[Migration::Wlseth]).await.unwrap();
    let wlseth = ctx.store.require(WLSETH).unwrap();

    let migration = Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]);
    let two_contracts = Migration::Release {
        version: "1_3_0".to_string(),
        contracts: vec!["WLSETHV1".to_string(), "TLCV1".to_string()],
        migration: Some(migration.clone()),
    };
    let err = run_migrations(ctx, &[two_contracts]).await.unwrap_err();
    assert!(matches!(err, ScriptError::InvalidInput(_)));
    assert_eq!(ctx.chain.num_deployments(), 2);

    let release = Migration::Release {
        version: "1_3_0".to_string(),
        contracts: vec!["WLSETHV1".to_string()],
        migration: Some(migration.clone()),
    };
    run_migrations(ctx, &[release]).await.unwrap();

    // Without a proxy firewall the proxy is upgraded directly
    let transactions =
        release::upgrade_transactions(ctx, "1_3_0", "WLSETHV1", Some(&migration))
            .await
            .unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].to, wlseth.address);
    assert_eq!(
        transactions[0].call.signature,
        upgradeToAndCallCall::SIGNATURE
    );
    let upgrade =
        upgradeToAndCallCall::abi_decode(&transactions[0].call.calldata, true).unwrap();
    let implementation = ctx.store.require("WLSETHV1_Implementation_1_3_0").unwrap();
    assert_eq!(upgrade.newImplementation, implementation.address);
    assert_eq!(upgrade.data, migration);
}
