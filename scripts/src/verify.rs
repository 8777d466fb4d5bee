//! Submission of deployed contracts to a block explorer for source verification.
//!
//! Verification is best effort: a failure is logged and the deployment carries on.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use tool_utils::run_command;
use tracing::{info, warn};

use crate::{networks::Network, records::DeployedContractRecord};

/// The foundry binary used to submit verifications
const FORGE_COMMAND: &str = "forge";

/// Verifies contracts through `forge verify-contract`
#[derive(Clone, Debug)]
pub struct ExplorerVerifier {
    /// The chain the contracts live on
    chain_id: u64,
    /// The explorer API key
    api_key: String,
    /// The root of the Solidity project holding the contract sources
    project_root: PathBuf,
}

impl ExplorerVerifier {
    /// Set up verification for `network`, if the network has an explorer and an
    /// API key is available
    pub fn for_network(
        network: Network,
        chain_id: u64,
        api_key: Option<String>,
        project_root: &Path,
    ) -> Option<Self> {
        if !network.supports_explorer_verification() {
            return None;
        }

        let Some(api_key) = api_key else {
            warn!("No explorer API key configured, contracts on {network} will not be verified");
            return None;
        };

        Some(Self {
            chain_id,
            api_key,
            project_root: project_root.to_path_buf(),
        })
    }

    /// Build the verification command for a record
    fn command(&self, record: &DeployedContractRecord) -> Command {
        let mut cmd = Command::new(FORGE_COMMAND);
        cmd.arg("verify-contract")
            .arg(format!("{:#x}", record.address))
            .arg(&record.contract)
            .arg("--root")
            .arg(&self.project_root)
            .arg("--chain")
            .arg(self.chain_id.to_string())
            .arg("--etherscan-api-key")
            .arg(&self.api_key)
            .arg("--watch");

        if !record.encoded_args.is_empty() {
            cmd.arg("--constructor-args")
                .arg(hex::encode(&record.encoded_args));
        }

        cmd
    }

    /// Submit a deployed contract for verification
    pub fn verify(&self, record: &DeployedContractRecord) {
        info!(
            "Verifying {} ({}) at {:#x}",
            record.name, record.contract, record.address
        );

        if let Err(e) = run_command(self.command(record)) {
            warn!("Verification of {} failed: {e}", record.name);
        }
    }
}
