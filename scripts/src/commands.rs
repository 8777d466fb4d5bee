//! Implementations of the deployment script commands

use itertools::Itertools;
use tool_utils::prompt_for_confirmation;
use tracing::{info, warn};

use crate::{
    artifacts::ArtifactStore,
    chain::{setup_client, Chain, RpcChain},
    cli::{Config, DeployArgs, ExportArgs, PredictArgs, ReleaseArgs},
    deployer::DeployContext,
    errors::ScriptError,
    export::export_deployments,
    migrations::{default_migrations, run_migrations, select_migrations, Migration, StepOutcome},
    networks::{NamedAccounts, Network},
    predict::predict_at_offset,
    records::DeploymentStore,
    verify::ExplorerVerifier,
};

/// Connect to the configured network as the deployer, checking that the RPC
/// endpoint serves the expected chain
async fn connect(config: &Config) -> Result<(RpcChain, u64), ScriptError> {
    let priv_key = config.priv_key.as_deref().ok_or_else(|| {
        ScriptError::InvalidInput("a deployer private key is required".to_string())
    })?;

    let chain = setup_client(priv_key, &config.rpc_url)?;
    let chain_id = chain.chain_id().await?;
    config.network.check_chain_id(chain_id)?;

    info!(
        "Connected to {} (chain id {chain_id}) as {:#x}",
        config.network,
        chain.deployer()
    );
    Ok((chain, chain_id))
}

/// The named accounts of the network, with the overrides of the accounts file
fn named_accounts(config: &Config) -> Result<NamedAccounts, ScriptError> {
    let accounts = config.network.named_accounts();
    match &config.accounts_file {
        Some(path) => Ok(accounts.with_overrides(NamedAccounts::from_file(path)?)),
        None => Ok(accounts),
    }
}

/// The deployment records of the configured network
fn deployment_store(config: &Config) -> DeploymentStore {
    DeploymentStore::new(&config.deployments_dir, config.network)
}

/// Set up the context the migrations run in
async fn deploy_context(config: &Config) -> Result<DeployContext<RpcChain>, ScriptError> {
    let (chain, chain_id) = connect(config).await?;
    let verifier = ExplorerVerifier::for_network(
        config.network,
        chain_id,
        config.etherscan_api_key.clone(),
        &config.contracts_root,
    );

    let ctx = DeployContext::new(
        chain,
        config.network,
        named_accounts(config)?,
        deployment_store(config),
        ArtifactStore::new(&config.artifacts_dir),
    )
    .with_verifier(verifier);

    Ok(ctx)
}

/// Log the outcome of every step of a run
fn log_outcomes(outcomes: &[(String, StepOutcome)]) {
    let applied = outcomes
        .iter()
        .filter(|(_, outcome)| *outcome == StepOutcome::Applied)
        .count();

    info!(
        "{applied} of {} migrations applied: {}",
        outcomes.len(),
        outcomes
            .iter()
            .map(|(id, outcome)| format!("{id} ({outcome})"))
            .join(", ")
    );
}

/// Run the selected migrations on the configured network
pub async fn deploy(args: DeployArgs, config: &Config) -> Result<(), ScriptError> {
    let migrations = select_migrations(default_migrations(), &args.tags);
    if migrations.is_empty() {
        return Err(ScriptError::InvalidInput(format!(
            "no migration tagged {}",
            args.tags.join(", ")
        )));
    }

    let ctx = deploy_context(config).await?;
    let outcomes = run_migrations(&ctx, &migrations).await?;
    log_outcomes(&outcomes);

    Ok(())
}

/// Deploy the implementations of a release, asking for confirmation on mainnet
pub async fn release(args: ReleaseArgs, config: &Config) -> Result<(), ScriptError> {
    if config.network == Network::Mainnet && !args.yes {
        let prompt = format!(
            "Release {} of {} on mainnet?",
            args.version,
            args.contracts.join(", ")
        );
        let confirmed = prompt_for_confirmation(&prompt)
            .map_err(|e| ScriptError::InvalidInput(e.to_string()))?;
        if !confirmed {
            warn!("Release aborted");
            return Ok(());
        }
    }

    let ctx = deploy_context(config).await?;
    let release = Migration::Release {
        version: args.version,
        contracts: args.contracts,
        migration: args.migration_calldata,
    };
    let outcomes = run_migrations(&ctx, &[release]).await?;
    log_outcomes(&outcomes);

    Ok(())
}

/// Print the address the sender's transaction at the given offset will create
pub async fn predict(args: PredictArgs, config: &Config) -> Result<(), ScriptError> {
    let (sender, nonce) = match (args.sender, args.nonce) {
        (Some(sender), Some(nonce)) => (sender, nonce),
        (sender, nonce) => {
            let (chain, _) = connect(config).await?;
            let deployer = chain.deployer();
            if sender.is_some_and(|sender| sender != deployer) {
                return Err(ScriptError::InvalidInput(
                    "--nonce is required when predicting for another sender than the deployer"
                        .to_string(),
                ));
            }

            let nonce = match nonce {
                Some(nonce) => nonce,
                None => chain.nonce().await?,
            };
            (deployer, nonce)
        }
    };

    let address = predict_at_offset(sender, nonce, args.offset)?;
    info!(
        "Transaction {} of {sender:#x} (nonce {nonce}) will create",
        args.offset
    );
    println!("{address:#x}");

    Ok(())
}

/// Write the consolidated export, firewall ABIs and combined implementations
pub async fn export(args: ExportArgs, config: &Config) -> Result<(), ScriptError> {
    let chain_id = match config.network.chain_id() {
        Some(chain_id) => chain_id,
        None => connect(config).await?.1,
    };

    // The deployer is only known from the private key, no RPC call needed
    let deployer = match &config.priv_key {
        Some(priv_key) => Some(setup_client(priv_key, &config.rpc_url)?.deployer()),
        None => None,
    };

    let accounts = named_accounts(config)?;
    let output = args.output.unwrap_or_else(|| {
        config
            .deployments_dir
            .join(format!("deployment.{}.json", config.network))
    });

    let summary = export_deployments(
        &deployment_store(config),
        config.network,
        chain_id,
        &accounts.entries(deployer),
        &output,
    )?;

    info!("Wrote {}", summary.deployment.display());
    for path in summary
        .firewall_abis
        .iter()
        .chain(&summary.combined_implementations)
    {
        info!("Wrote {}", path.display());
    }

    Ok(())
}

/// Log which migrations the deployment records mark as applied
pub fn status(config: &Config) -> Result<(), ScriptError> {
    let store = deployment_store(config);

    for migration in default_migrations() {
        let targets = migration.targets();
        if targets.is_empty() {
            info!("{}: checked on chain when deploying", migration.id());
            continue;
        }

        let pending = targets
            .iter()
            .filter(|name| !store.is_deployed(name))
            .collect_vec();
        if pending.is_empty() {
            info!("{}: applied", migration.id());
        } else if !migration.allowed_on(config.network) {
            info!("{}: not run on {}", migration.id(), config.network);
        } else {
            info!("{}: pending ({} missing)", migration.id(), pending.iter().join(", "));
        }
    }

    Ok(())
}
