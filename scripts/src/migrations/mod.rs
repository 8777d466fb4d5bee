//! The ordered migration steps and the runner applying them.
//!
//! Each step runs at most once per network: before running, its target
//! records are checked and the step is skipped when all of them are
//! successfully deployed.

mod allowlist;
mod core_contracts;
mod coverage_fund;
mod oracle_admin;
mod release;
mod tlc;
mod withdraw;
mod wlseth;

#[cfg(test)]
mod tests;

use std::fmt::{self, Display};

use alloy_primitives::{Address, Bytes, FixedBytes};
use tracing::info;

use crate::{
    chain::Chain,
    constants::{
        ALLOWLIST, COVERAGE_FUND, EL_FEE_RECIPIENT, FIREWALL_CONTRACT, OPERATORS_REGISTRY, ORACLE,
        REDEEM_MANAGER, RIVER, TLC, WITHDRAW, WLSETH,
    },
    deployer::{implementation_name, DeployContext},
    errors::ScriptError,
    networks::Network,
    predict::PendingDeploymentPlan,
    solidity::firewall_args,
};

/// The tag selecting every default migration
pub const ALL_TAG: &str = "all";

/// A migration step
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Migration {
    /// Deploy the Withdraw contract, initialized later by the core step
    WithdrawStub,
    /// Deploy the Allowlist behind its firewalls
    Allowlist,
    /// Deploy River, Oracle, OperatorsRegistry, ELFeeRecipient and
    /// RedeemManager, wired to each other through predicted addresses
    CoreContracts,
    /// Deploy the CoverageFund
    CoverageFund,
    /// Deploy the wrapped LsETH token
    Wlseth,
    /// Deploy the TLC token behind its proxy firewall
    Tlc,
    /// Wait for the River administrator to point River at the Oracle
    SetOracleOnRiver,
    /// Deploy new implementations and print the upgrade transactions
    Release {
        /// The implementation version, e.g. `1_3_0`
        version: String,
        /// The implementation artifacts, e.g. `RiverV1`
        contracts: Vec<String>,
        /// Calldata run on the new implementation as part of the upgrade
        migration: Option<Bytes>,
    },
}

/// The result of a migration step
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step ran
    Applied,
    /// The step had already been applied
    Skipped,
}

impl Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Applied => write!(f, "applied"),
            StepOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

/// The default migrations, in the order they run
pub fn default_migrations() -> Vec<Migration> {
    vec![
        Migration::WithdrawStub,
        Migration::Allowlist,
        Migration::CoreContracts,
        Migration::CoverageFund,
        Migration::Wlseth,
        Migration::Tlc,
        Migration::SetOracleOnRiver,
    ]
}

/// The migrations carrying any of `tags`, or every migration tagged `all`
/// when no tag is given
pub fn select_migrations(migrations: Vec<Migration>, tags: &[String]) -> Vec<Migration> {
    migrations
        .into_iter()
        .filter(|migration| {
            let migration_tags = migration.tags();
            if tags.is_empty() {
                migration_tags.contains(&ALL_TAG)
            } else {
                tags.iter().any(|tag| migration_tags.contains(&tag.as_str()))
            }
        })
        .collect()
}

impl Migration {
    /// The step identifier, ordering the default steps
    pub fn id(&self) -> String {
        match self {
            Migration::WithdrawStub => "01_deploy_withdraw_stub".to_string(),
            Migration::Allowlist => "02_deploy_allowlist".to_string(),
            Migration::CoreContracts => "03_deploy_core".to_string(),
            Migration::CoverageFund => "04_deploy_coverage_fund".to_string(),
            Migration::Wlseth => "05_deploy_wlseth".to_string(),
            Migration::Tlc => "06_deploy_tlc".to_string(),
            Migration::SetOracleOnRiver => "07_set_oracle_on_river".to_string(),
            Migration::Release { version, .. } => format!("release_{version}"),
        }
    }

    /// The tags selecting the step
    pub fn tags(&self) -> &'static [&'static str] {
        match self {
            Migration::WithdrawStub => &[ALL_TAG, "withdraw"],
            Migration::Allowlist => &[ALL_TAG, "allowlist"],
            Migration::CoreContracts => &[ALL_TAG, "core"],
            Migration::CoverageFund => &[ALL_TAG, "coverageFund"],
            Migration::Wlseth => &[ALL_TAG, "wlseth"],
            Migration::Tlc => &[ALL_TAG, "tlc"],
            Migration::SetOracleOnRiver => &[ALL_TAG, "oracle"],
            Migration::Release { .. } => &["release"],
        }
    }

    /// The records whose successful deployment marks the step as applied.
    ///
    /// A release is only applied once the proxies also delegate to the
    /// released implementations.
    pub fn targets(&self) -> Vec<String> {
        let names: &[&str] = match self {
            Migration::WithdrawStub => &[WITHDRAW],
            Migration::Allowlist => &[ALLOWLIST],
            Migration::CoreContracts => &[
                RIVER,
                ORACLE,
                OPERATORS_REGISTRY,
                EL_FEE_RECIPIENT,
                REDEEM_MANAGER,
            ],
            Migration::CoverageFund => &[COVERAGE_FUND],
            Migration::Wlseth => &[WLSETH],
            Migration::Tlc => &[TLC],
            Migration::SetOracleOnRiver => &[],
            Migration::Release { version, contracts, .. } => {
                return contracts
                    .iter()
                    .map(|contract| implementation_name(contract, version))
                    .collect();
            }
        };

        names.iter().map(|name| name.to_string()).collect()
    }

    /// Whether the step may run on `network`
    pub fn allowed_on(&self, network: Network) -> bool {
        match self {
            Migration::WithdrawStub
            | Migration::Allowlist
            | Migration::CoreContracts
            | Migration::CoverageFund
            | Migration::Tlc => network != Network::Mainnet,
            Migration::Wlseth | Migration::SetOracleOnRiver | Migration::Release { .. } => true,
        }
    }

    /// Whether the step has already been applied
    pub async fn should_skip<C: Chain>(&self, ctx: &DeployContext<C>) -> Result<bool, ScriptError> {
        match self {
            Migration::Wlseth if ctx.network == Network::Mainnet => Ok(true),
            Migration::SetOracleOnRiver => oracle_admin::oracle_is_set(ctx).await,
            Migration::Release {
                version, contracts, ..
            } => release::is_applied(ctx, version, contracts).await,
            _ => {
                let targets = self.targets();
                let targets: Vec<&str> = targets.iter().map(String::as_str).collect();
                Ok(ctx.store.all_deployed(&targets))
            }
        }
    }

    /// Run the step
    pub async fn run<C: Chain>(&self, ctx: &DeployContext<C>) -> Result<(), ScriptError> {
        match self {
            Migration::WithdrawStub => withdraw::run(ctx).await,
            Migration::Allowlist => allowlist::run(ctx).await,
            Migration::CoreContracts => core_contracts::run(ctx).await,
            Migration::CoverageFund => coverage_fund::run(ctx).await,
            Migration::Wlseth => wlseth::run(ctx).await,
            Migration::Tlc => tlc::run(ctx).await,
            Migration::SetOracleOnRiver => oracle_admin::run(ctx).await,
            Migration::Release {
                version,
                contracts,
                migration,
            } => release::run(ctx, version, contracts, migration.as_ref()).await,
        }
    }
}

/// Apply `migrations` in order, skipping the applied ones.
///
/// Stops at the first failing step; steps applied before it stay applied and
/// are skipped on the next run.
pub async fn run_migrations<C: Chain>(
    ctx: &DeployContext<C>,
    migrations: &[Migration],
) -> Result<Vec<(String, StepOutcome)>, ScriptError> {
    let mut outcomes = Vec::with_capacity(migrations.len());

    for migration in migrations {
        let id = migration.id();
        info!("=== {id} START");

        if !migration.allowed_on(ctx.network) {
            return Err(ScriptError::InvalidNetwork(format!(
                "{id} cannot run on {}",
                ctx.network
            )));
        }

        let outcome = if migration.should_skip(ctx).await? {
            info!("Skipped");
            StepOutcome::Skipped
        } else {
            migration.run(ctx).await?;
            StepOutcome::Applied
        };

        info!("=== {id} END");
        outcomes.push((id, outcome));
    }

    Ok(outcomes)
}

/// Deploy the firewall `name` guarding `destination` on behalf of `admin`,
/// letting the executor call `executor_can_call`, and check that it landed
/// where `plan` predicted
async fn deploy_firewall<C: Chain>(
    ctx: &DeployContext<C>,
    plan: &PendingDeploymentPlan,
    name: &str,
    admin: Address,
    destination: Address,
    executor_can_call: Vec<FixedBytes<4>>,
) -> Result<Address, ScriptError> {
    let executor = ctx.accounts.executor()?;
    let record = ctx
        .deploy_contract(
            name,
            FIREWALL_CONTRACT,
            firewall_args(admin, executor, destination, executor_can_call),
        )
        .await?;

    plan.assert_deployed(name, record.address)?;
    Ok(record.address)
}

/// Log the transaction an administrator must send for the deployment to proceed
fn log_administrator_hint(
    administrator: Address,
    to: Address,
    method: &str,
    args: &[String],
    calldata: Option<&Bytes>,
) {
    info!("============================================================");
    info!("Administrator action required");
    info!("From={administrator}");
    info!("To={to}");
    info!("Method={method}");
    for (idx, arg) in args.iter().enumerate() {
        info!("Arg{}={arg}", idx + 1);
    }
    if let Some(calldata) = calldata {
        info!("Calldata={calldata}");
    }
    info!("============================================================");
}
