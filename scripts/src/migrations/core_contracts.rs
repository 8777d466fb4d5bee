//! Deployment of the core protocol contracts.
//!
//! River, Oracle and OperatorsRegistry reference each other from their
//! initializers, so every address is predicted up front from the deployment
//! plan and checked once the contracts exist:
//!
//! 1. River (firewall, proxy firewall, implementation, proxy)
//! 2. Oracle (firewall, proxy firewall, implementation, proxy)
//! 3. OperatorsRegistry (firewall, proxy firewall, implementation, proxy)
//! 4. ELFeeRecipient (implementation, proxy)
//! 5. RedeemManager (proxy firewall, implementation, proxy)
//!
//! followed by `initializeWithdrawV1` on Withdraw, `initRiverV1_1` on River and
//! `forceFundedValidatorKeysEventEmission` on OperatorsRegistry.

use alloy_primitives::{Address, U256};

use crate::{
    chain::Chain,
    constants::{
        ALLOWLIST, EL_FEE_RECIPIENT, EL_FEE_RECIPIENT_CONTRACT, FUNDED_KEYS_EVENT_BATCH,
        IMPLEMENTATION_VERSION, OPERATORS_REGISTRY, OPERATORS_REGISTRY_CONTRACT,
        OPERATORS_REGISTRY_FIREWALL, OPERATORS_REGISTRY_PROXY_FIREWALL, ORACLE, ORACLE_CONTRACT,
        ORACLE_FIREWALL, ORACLE_PROXY_FIREWALL, REDEEM_MANAGER, REDEEM_MANAGER_CONTRACT,
        REDEEM_MANAGER_PROXY_FIREWALL, RIVER, RIVER_CONTRACT, RIVER_FIREWALL, RIVER_PROXY_FIREWALL,
        WITHDRAW,
    },
    deployer::{DeployContext, ProxiedDeployment},
    errors::ScriptError,
    solidity::{
        forceFundedValidatorKeysEventEmissionCall, getCredentialsCall, getOracleCall,
        getRiverCall, initELFeeRecipientV1Call, initOperatorsRegistryV1Call, initOracleV1Call,
        initRiverV1Call, initRiverV1_1Call, initializeRedeemManagerV1Call,
        initializeWithdrawV1Call, pauseCall, selector, setOperatorLimitsCall, EncodedCall,
    },
};

use super::deploy_firewall;

/// Deploy and wire the core contracts
pub(super) async fn run<C: Chain>(ctx: &DeployContext<C>) -> Result<(), ScriptError> {
    let accounts = &ctx.accounts;
    let governor = accounts.governor()?;
    let proxy_administrator = accounts.proxy_administrator()?;
    let collector = accounts.collector()?;
    let deposit_contract = accounts.deposit_contract()?;
    // Fail before sending anything if the executor is missing
    accounts.executor()?;

    let params = ctx.network.params();
    let withdraw = ctx.store.require(WITHDRAW)?.address;
    let allowlist = ctx.store.require(ALLOWLIST)?.address;
    let withdrawal_credentials = ctx
        .read(withdraw, getCredentialsCall {})
        .await?
        .credentials;

    let reused = |contract: &str| ctx.implementation_reusable(contract, IMPLEMENTATION_VERSION);

    let mut plan = ctx.plan().await?;
    plan.contract(RIVER_FIREWALL, None);
    plan.contract(RIVER_PROXY_FIREWALL, None);
    let future_river = plan.proxied(RIVER, Some("initRiverV1"), reused(RIVER_CONTRACT)?);
    plan.contract(ORACLE_FIREWALL, None);
    plan.contract(ORACLE_PROXY_FIREWALL, None);
    let future_oracle = plan.proxied(ORACLE, Some("initOracleV1"), reused(ORACLE_CONTRACT)?);
    plan.contract(OPERATORS_REGISTRY_FIREWALL, None);
    plan.contract(OPERATORS_REGISTRY_PROXY_FIREWALL, None);
    let future_operators_registry = plan.proxied(
        OPERATORS_REGISTRY,
        Some("initOperatorsRegistryV1"),
        reused(OPERATORS_REGISTRY_CONTRACT)?,
    );
    let future_el_fee_recipient = plan.proxied(
        EL_FEE_RECIPIENT,
        Some("initELFeeRecipientV1"),
        reused(EL_FEE_RECIPIENT_CONTRACT)?,
    );
    plan.contract(REDEEM_MANAGER_PROXY_FIREWALL, None);
    let future_redeem_manager = plan.proxied(
        REDEEM_MANAGER,
        Some("initializeRedeemManagerV1"),
        reused(REDEEM_MANAGER_CONTRACT)?,
    );
    plan.transaction("initializeWithdrawV1");
    plan.transaction("initRiverV1_1");
    plan.transaction("forceFundedValidatorKeysEventEmission");

    // River

    let river_firewall =
        deploy_firewall(ctx, &plan, RIVER_FIREWALL, governor, future_river, vec![]).await?;
    let river_proxy_firewall = deploy_firewall(
        ctx,
        &plan,
        RIVER_PROXY_FIREWALL,
        proxy_administrator,
        future_river,
        vec![selector::<pauseCall>()],
    )
    .await?;

    let global_fee = U256::from(params.gross_fee);
    let river = ctx
        .deploy_proxied(ProxiedDeployment {
            name: RIVER,
            contract: RIVER_CONTRACT,
            version: IMPLEMENTATION_VERSION,
            owner: river_proxy_firewall,
            initializer: Some(EncodedCall::new(
                initRiverV1Call {
                    depositContractAddress: deposit_contract,
                    elFeeRecipientAddress: future_el_fee_recipient,
                    withdrawalCredentials: withdrawal_credentials,
                    oracleAddress: future_oracle,
                    systemAdministratorAddress: river_firewall,
                    allowlistAddress: allowlist,
                    operatorRegistryAddress: future_operators_registry,
                    collectorAddress: collector,
                    globalFee: global_fee,
                },
                vec![
                    deposit_contract.to_string(),
                    future_el_fee_recipient.to_string(),
                    withdrawal_credentials.to_string(),
                    future_oracle.to_string(),
                    river_firewall.to_string(),
                    allowlist.to_string(),
                    future_operators_registry.to_string(),
                    collector.to_string(),
                    global_fee.to_string(),
                ],
            )),
        })
        .await?
        .address;
    plan.assert_deployed(RIVER, river)?;

    // Oracle

    let oracle_firewall =
        deploy_firewall(ctx, &plan, ORACLE_FIREWALL, governor, future_oracle, vec![]).await?;
    let oracle_proxy_firewall = deploy_firewall(
        ctx,
        &plan,
        ORACLE_PROXY_FIREWALL,
        proxy_administrator,
        future_oracle,
        vec![selector::<pauseCall>()],
    )
    .await?;

    let init_oracle = initOracleV1Call {
        riverAddress: river,
        administratorAddress: oracle_firewall,
        epochsPerFrame: params.oracle_epochs_per_frame,
        slotsPerEpoch: params.slots_per_epoch,
        secondsPerSlot: params.seconds_per_slot,
        genesisTime: params.genesis_timestamp,
        annualAprUpperBound: U256::from(params.annual_apr_upper_bound),
        relativeLowerBound: U256::from(params.relative_lower_bound),
    };
    let init_oracle_args = vec![
        river.to_string(),
        oracle_firewall.to_string(),
        params.oracle_epochs_per_frame.to_string(),
        params.slots_per_epoch.to_string(),
        params.seconds_per_slot.to_string(),
        params.genesis_timestamp.to_string(),
        params.annual_apr_upper_bound.to_string(),
        params.relative_lower_bound.to_string(),
    ];
    let oracle = ctx
        .deploy_proxied(ProxiedDeployment {
            name: ORACLE,
            contract: ORACLE_CONTRACT,
            version: IMPLEMENTATION_VERSION,
            owner: oracle_proxy_firewall,
            initializer: Some(EncodedCall::new(init_oracle, init_oracle_args)),
        })
        .await?
        .address;
    plan.assert_deployed(ORACLE, oracle)?;

    // OperatorsRegistry

    let operators_registry_firewall = deploy_firewall(
        ctx,
        &plan,
        OPERATORS_REGISTRY_FIREWALL,
        governor,
        future_operators_registry,
        vec![selector::<setOperatorLimitsCall>()],
    )
    .await?;
    let operators_registry_proxy_firewall = deploy_firewall(
        ctx,
        &plan,
        OPERATORS_REGISTRY_PROXY_FIREWALL,
        proxy_administrator,
        future_operators_registry,
        vec![selector::<pauseCall>()],
    )
    .await?;

    let operators_registry = ctx
        .deploy_proxied(ProxiedDeployment {
            name: OPERATORS_REGISTRY,
            contract: OPERATORS_REGISTRY_CONTRACT,
            version: IMPLEMENTATION_VERSION,
            owner: operators_registry_proxy_firewall,
            initializer: Some(EncodedCall::new(
                initOperatorsRegistryV1Call {
                    admin: operators_registry_firewall,
                    river: future_river,
                },
                vec![
                    operators_registry_firewall.to_string(),
                    future_river.to_string(),
                ],
            )),
        })
        .await?
        .address;
    plan.assert_deployed(OPERATORS_REGISTRY, operators_registry)?;

    // ELFeeRecipient

    let el_fee_recipient = ctx
        .deploy_proxied(ProxiedDeployment {
            name: EL_FEE_RECIPIENT,
            contract: EL_FEE_RECIPIENT_CONTRACT,
            version: IMPLEMENTATION_VERSION,
            owner: proxy_administrator,
            initializer: Some(EncodedCall::new(
                initELFeeRecipientV1Call {
                    riverAddress: river,
                },
                vec![river.to_string()],
            )),
        })
        .await?
        .address;
    plan.assert_deployed(EL_FEE_RECIPIENT, el_fee_recipient)?;

    check_cross_references(ctx, river, oracle).await?;

    // RedeemManager

    let redeem_manager_proxy_firewall = deploy_firewall(
        ctx,
        &plan,
        REDEEM_MANAGER_PROXY_FIREWALL,
        proxy_administrator,
        future_redeem_manager,
        vec![selector::<pauseCall>()],
    )
    .await?;

    let redeem_manager = ctx
        .deploy_proxied(ProxiedDeployment {
            name: REDEEM_MANAGER,
            contract: REDEEM_MANAGER_CONTRACT,
            version: IMPLEMENTATION_VERSION,
            owner: redeem_manager_proxy_firewall,
            initializer: Some(EncodedCall::new(
                initializeRedeemManagerV1Call { river },
                vec![river.to_string()],
            )),
        })
        .await?
        .address;
    plan.assert_deployed(REDEEM_MANAGER, redeem_manager)?;

    // Initializations

    ctx.send_call(
        withdraw,
        &EncodedCall::new(initializeWithdrawV1Call { river }, vec![river.to_string()]),
    )
    .await?;

    let init_river_v1_1 = initRiverV1_1Call {
        redeemManager: redeem_manager,
        epochsPerFrame: params.river_epochs_per_frame,
        slotsPerEpoch: params.slots_per_epoch,
        secondsPerSlot: params.seconds_per_slot,
        genesisTime: params.genesis_timestamp,
        epochsToAssumedFinality: params.epochs_to_assumed_finality,
        annualAprUpperBound: U256::from(params.annual_apr_upper_bound),
        relativeLowerBound: U256::from(params.relative_lower_bound),
        minDailyNetCommittableAmount: params.min_daily_net_committable,
        maxDailyRelativeCommittableAmount: params.max_daily_relative_committable,
    };
    let init_river_v1_1_args = vec![
        redeem_manager.to_string(),
        params.river_epochs_per_frame.to_string(),
        params.slots_per_epoch.to_string(),
        params.seconds_per_slot.to_string(),
        params.genesis_timestamp.to_string(),
        params.epochs_to_assumed_finality.to_string(),
        params.annual_apr_upper_bound.to_string(),
        params.relative_lower_bound.to_string(),
        params.min_daily_net_committable.to_string(),
        params.max_daily_relative_committable.to_string(),
    ];
    ctx.send_call(
        river,
        &EncodedCall::new(init_river_v1_1, init_river_v1_1_args),
    )
    .await?;

    ctx.send_call(
        operators_registry,
        &EncodedCall::new(
            forceFundedValidatorKeysEventEmissionCall {
                amountToEmit: U256::from(FUNDED_KEYS_EVENT_BATCH),
            },
            vec![FUNDED_KEYS_EVENT_BATCH.to_string()],
        ),
    )
    .await?;

    Ok(())
}

/// Check that River and Oracle were initialized with each other's address
async fn check_cross_references<C: Chain>(
    ctx: &DeployContext<C>,
    river: Address,
    oracle: Address,
) -> Result<(), ScriptError> {
    let river_oracle = ctx.read(river, getOracleCall {}).await?.oracle;
    if river_oracle != oracle {
        return Err(ScriptError::CrossReferenceMismatch(format!(
            "River at {river:#x} points at oracle {river_oracle:#x}, expected {oracle:#x}"
        )));
    }

    let oracle_river = ctx.read(oracle, getRiverCall {}).await?.river;
    if oracle_river != river {
        return Err(ScriptError::CrossReferenceMismatch(format!(
            "Oracle at {oracle:#x} points at river {oracle_river:#x}, expected {river:#x}"
        )));
    }

    Ok(())
}
