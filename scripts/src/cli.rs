//! Definitions of CLI arguments and commands for the deployment scripts

use std::path::PathBuf;

use alloy_primitives::{Address, Bytes};
use clap::{Args, Parser, Subcommand};

use crate::{
    commands::{deploy, export, predict, release, status},
    constants::{DEFAULT_ARTIFACTS_DIR, DEFAULT_DEPLOYMENTS_DIR, DEFAULT_RPC_URL},
    errors::ScriptError,
    networks::Network,
};

/// Deploy and release the liquid staking contracts
#[derive(Parser)]
pub struct Cli {
    /// The options shared by every command
    #[command(flatten)]
    pub config: Config,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// The options shared by every command
#[derive(Args, Clone, Debug)]
pub struct Config {
    /// Network RPC URL
    #[arg(short, long, env = "RPC_URL", default_value = DEFAULT_RPC_URL, global = true)]
    pub rpc_url: String,

    /// Private key of the deployer
    #[arg(short, long, env = "PRIVATE_KEY", hide_env_values = true, global = true)]
    pub priv_key: Option<String>,

    /// The network to deploy to
    #[arg(short, long, env = "NETWORK", value_enum, default_value_t = Network::Local, global = true)]
    pub network: Network,

    /// The directory holding the per-network deployment records
    #[arg(long, default_value = DEFAULT_DEPLOYMENTS_DIR, global = true)]
    pub deployments_dir: PathBuf,

    /// The directory holding the compiled contract artifacts
    #[arg(long, default_value = DEFAULT_ARTIFACTS_DIR, global = true)]
    pub artifacts_dir: PathBuf,

    /// A JSON file overriding the named accounts of the network
    #[arg(long, global = true)]
    pub accounts_file: Option<PathBuf>,

    /// The block explorer API key used to verify deployed contracts
    #[arg(long, env = "ETHERSCAN_API_KEY", hide_env_values = true, global = true)]
    pub etherscan_api_key: Option<String>,

    /// The root of the Solidity project, used when verifying contracts
    #[arg(long, default_value = ".", global = true)]
    pub contracts_root: PathBuf,
}

/// The commands of the deployment scripts
#[derive(Subcommand)]
pub enum Command {
    /// Run the migration sequence
    Deploy(DeployArgs),
    /// Release new implementations of proxied contracts
    Release(ReleaseArgs),
    /// Predict the address of a future deployment
    Predict(PredictArgs),
    /// Export the network's deployments
    Export(ExportArgs),
    /// Print which migrations are applied on the network
    Status,
}

impl Command {
    /// Run the command against the configured network
    pub async fn run(self, config: &Config) -> Result<(), ScriptError> {
        match self {
            Command::Deploy(args) => deploy(args, config).await,
            Command::Release(args) => release(args, config).await,
            Command::Predict(args) => predict(args, config).await,
            Command::Export(args) => export(args, config).await,
            Command::Status => status(config),
        }
    }
}

/// Run the migration sequence.
///
/// Steps already applied on the network are skipped, so an interrupted run
/// can simply be started again.
#[derive(Args)]
pub struct DeployArgs {
    /// Only run the migrations carrying one of these tags
    #[arg(short, long, value_delimiter = ',')]
    pub tags: Vec<String>,
}

/// Deploy new implementations and print the upgrade transactions for the
/// proxy administrator
#[derive(Args)]
pub struct ReleaseArgs {
    /// The implementation version, e.g. `1_3_0`
    #[arg(short, long)]
    pub version: String,

    /// The implementation artifacts to release, e.g. `RiverV1`
    #[arg(short, long = "contract", required = true)]
    pub contracts: Vec<String>,

    /// Hex calldata the upgrade runs on the new implementation, sent with
    /// `upgradeToAndCall` instead of `upgradeTo`
    #[arg(long)]
    pub migration_calldata: Option<Bytes>,

    /// Skip the confirmation prompt on mainnet
    #[arg(short, long)]
    pub yes: bool,
}

/// Print the address a future contract-creating transaction will produce
#[derive(Args)]
pub struct PredictArgs {
    /// The sending account, the deployer by default
    #[arg(short, long)]
    pub sender: Option<Address>,

    /// The current nonce of the sender, the deployer's pending nonce by default
    #[arg(long)]
    pub nonce: Option<u64>,

    /// The number of transactions the sender sends before the deployment
    #[arg(short, long, default_value_t = 0)]
    pub offset: u64,
}

/// Write the consolidated export of the network's deployments
#[derive(Args)]
pub struct ExportArgs {
    /// The export file, `<deployments-dir>/deployment.<network>.json` by default
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
