//! Releases of new implementations.
//!
//! Implementations are deployed by the deployer under version-qualified
//! names. Pointing the proxies at them is up to the proxy administrator, who
//! is handed the `upgradeTo` transaction to send, or `upgradeToAndCall` when
//! the release carries migration calldata.

use std::collections::HashSet;

use alloy_primitives::{Address, Bytes};
use tracing::{info, warn};

use crate::{
    chain::Chain,
    constants::{
        IMPLEMENTATION_INFIX, NUM_BYTES_ADDRESS, NUM_BYTES_STORAGE_SLOT, PROXY_FIREWALL_SUFFIX,
        PROXY_IMPLEMENTATION_STORAGE_SLOT,
    },
    deployer::{implementation_name, DeployContext},
    errors::ScriptError,
    solidity::{upgradeToAndCallCall, upgradeToCall, ConstructorArgs, EncodedCall},
};

use super::log_administrator_hint;

/// A proxy still delegating to another implementation than the released one
#[derive(Clone, Debug)]
struct PendingUpgrade {
    /// The proxied deployment name, e.g. `River`
    name: String,
    /// The proxy address
    proxy: Address,
    /// The implementation the proxy delegates to
    current: Address,
    /// The released implementation
    implementation: Address,
}

/// A transaction the proxy administrator must send to upgrade a proxy
#[derive(Clone, Debug)]
pub(super) struct UpgradeTransaction {
    /// The proxied deployment name, e.g. `River`
    pub(super) name: String,
    /// The proxy firewall of the deployment, or the proxy itself
    pub(super) to: Address,
    /// The upgrade call
    pub(super) call: EncodedCall,
}

/// Read the implementation a proxy delegates to from its EIP-1967 slot
async fn current_implementation<C: Chain>(
    ctx: &DeployContext<C>,
    proxy: Address,
) -> Result<Address, ScriptError> {
    let word = ctx
        .chain
        .storage(proxy, PROXY_IMPLEMENTATION_STORAGE_SLOT)
        .await?;
    Ok(Address::from_slice(
        &word[NUM_BYTES_STORAGE_SLOT - NUM_BYTES_ADDRESS..],
    ))
}

/// The proxies of `contract` that do not delegate to `implementation` yet.
///
/// A proxy belongs to `contract` when it was deployed with one of the
/// `<contract>_Implementation_<version>` records.
async fn pending_upgrades<C: Chain>(
    ctx: &DeployContext<C>,
    contract: &str,
    implementation: Address,
) -> Result<Vec<PendingUpgrade>, ScriptError> {
    let records = ctx.store.list()?;
    let prefix = format!("{contract}{IMPLEMENTATION_INFIX}");
    let implementations: HashSet<Address> = records
        .iter()
        .filter(|record| record.succeeded() && record.name.starts_with(&prefix))
        .map(|record| record.address)
        .collect();

    let proxied = records.into_iter().filter(|record| {
        record.succeeded()
            && record
                .implementation
                .is_some_and(|address| implementations.contains(&address))
    });

    let mut pending = Vec::new();
    for record in proxied {
        let current = current_implementation(ctx, record.address).await?;
        if current != implementation {
            pending.push(PendingUpgrade {
                name: record.name,
                proxy: record.address,
                current,
                implementation,
            });
        }
    }

    Ok(pending)
}

/// The call upgrading a proxy to `implementation`, running `migration` on the
/// new implementation when given
fn upgrade_call(implementation: Address, migration: Option<&Bytes>) -> EncodedCall {
    match migration {
        Some(data) => EncodedCall::new(
            upgradeToAndCallCall {
                newImplementation: implementation,
                data: data.clone(),
            },
            vec![implementation.to_string(), data.to_string()],
        ),
        None => EncodedCall::new(
            upgradeToCall {
                newImplementation: implementation,
            },
            vec![implementation.to_string()],
        ),
    }
}

/// Whether every implementation of the release is deployed and every proxy
/// of the released contracts delegates to it
pub(super) async fn is_applied<C: Chain>(
    ctx: &DeployContext<C>,
    version: &str,
    contracts: &[String],
) -> Result<bool, ScriptError> {
    for contract in contracts {
        let name = implementation_name(contract, version);
        if !ctx.store.is_deployed(&name) {
            return Ok(false);
        }

        let implementation = ctx.store.require(&name)?.address;
        if !pending_upgrades(ctx, contract, implementation).await?.is_empty() {
            return Ok(false);
        }
    }

    Ok(true)
}

/// The upgrade transactions of every proxy of `contract` still delegating to
/// another implementation than the deployed release
pub(super) async fn upgrade_transactions<C: Chain>(
    ctx: &DeployContext<C>,
    version: &str,
    contract: &str,
    migration: Option<&Bytes>,
) -> Result<Vec<UpgradeTransaction>, ScriptError> {
    let implementation = ctx
        .store
        .require(&implementation_name(contract, version))?
        .address;

    let mut transactions = Vec::new();
    for upgrade in pending_upgrades(ctx, contract, implementation).await? {
        // Firewalled proxies are administered through their proxy firewall
        let proxy_firewall = format!("{}{PROXY_FIREWALL_SUFFIX}", upgrade.name);
        let to = if ctx.store.is_deployed(&proxy_firewall) {
            ctx.store.require(&proxy_firewall)?.address
        } else {
            upgrade.proxy
        };

        info!(
            "{} at {:#x} delegates to {:#x}, release {version} is at {:#x}",
            upgrade.name, upgrade.proxy, upgrade.current, upgrade.implementation
        );
        transactions.push(UpgradeTransaction {
            name: upgrade.name,
            to,
            call: upgrade_call(upgrade.implementation, migration),
        });
    }

    Ok(transactions)
}

/// Deploy the implementations of the release and print the upgrade
/// transactions of every proxy still delegating to an older one
pub(super) async fn run<C: Chain>(
    ctx: &DeployContext<C>,
    version: &str,
    contracts: &[String],
    migration: Option<&Bytes>,
) -> Result<(), ScriptError> {
    if contracts.is_empty() {
        return Err(ScriptError::InvalidInput(
            "a release needs at least one contract".to_string(),
        ));
    }
    if migration.is_some() && contracts.len() > 1 {
        return Err(ScriptError::InvalidInput(
            "migration calldata applies to a single released contract".to_string(),
        ));
    }

    for contract in contracts {
        ctx.deploy_contract(
            &implementation_name(contract, version),
            contract,
            ConstructorArgs::none(),
        )
        .await?;
    }

    let administrator = ctx.accounts.proxy_administrator()?;
    for contract in contracts {
        let transactions = upgrade_transactions(ctx, version, contract, migration).await?;
        if transactions.is_empty() {
            warn!("No proxy of {contract} left to upgrade to release {version}");
        }

        for transaction in transactions {
            log_administrator_hint(
                administrator,
                transaction.to,
                transaction.call.signature,
                &transaction.call.args,
                Some(&transaction.call.calldata),
            );
        }
    }

    Ok(())
}
