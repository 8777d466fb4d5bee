//! Persisted deployment records, one JSON file per contract per network, and
//! the skip-guard built on them

use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{
    chain::TxOutcome,
    constants::{RECEIPT_STATUS_FAILURE, RECEIPT_STATUS_SUCCESS},
    errors::ScriptError,
    networks::Network,
};

/// The initializer executed by a proxy on construction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRecord {
    /// The initializer method name
    pub method_name: String,
    /// The initializer arguments, rendered as strings
    pub args: Vec<String>,
}

/// The part of a transaction receipt kept in a record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptRecord {
    /// `1` for success, `0` for a reverted transaction
    pub status: u8,
    /// The block the transaction was mined in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

impl ReceiptRecord {
    /// The receipt of a mined, successful transaction
    pub fn success(outcome: &TxOutcome) -> Self {
        Self {
            status: RECEIPT_STATUS_SUCCESS,
            block_number: outcome.block_number,
        }
    }

    /// The receipt of a reverted transaction
    pub fn failure() -> Self {
        Self {
            status: RECEIPT_STATUS_FAILURE,
            block_number: None,
        }
    }
}

/// A deployment record.
///
/// Records are never mutated once successful: an upgrade is recorded under a
/// new, version-qualified name instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedContractRecord {
    /// The deployment name, e.g. `River` or `RiverV1_Implementation_1_2_1`
    pub name: String,
    /// The artifact name of the deployed contract, e.g. `RiverV1`
    pub contract: String,
    /// The address users interact with (the proxy, for proxied deployments)
    pub address: Address,
    /// The implementation behind the proxy, for proxied deployments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<Address>,
    /// The contract ABI
    pub abi: Value,
    /// The constructor arguments, rendered as strings
    #[serde(default)]
    pub args: Vec<String>,
    /// The ABI-encoded constructor arguments
    #[serde(default)]
    pub encoded_args: Bytes,
    /// The initializer executed through the proxy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute: Option<ExecuteRecord>,
    /// The deployment transaction hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
    /// The deployment receipt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ReceiptRecord>,
    /// How many times a contract was deployed under this name
    #[serde(default = "default_num_deployments")]
    pub num_deployments: u64,
}

/// Records written before redeployments were counted
fn default_num_deployments() -> u64 {
    1
}

impl DeployedContractRecord {
    /// Whether the deployment transaction succeeded
    pub fn succeeded(&self) -> bool {
        self.receipt
            .as_ref()
            .is_some_and(|receipt| receipt.status == RECEIPT_STATUS_SUCCESS)
    }
}

/// The deployment records of one network, stored as
/// `<deployments dir>/<network>/<name>.json`
#[derive(Clone, Debug)]
pub struct DeploymentStore {
    /// The directory holding the network's records
    root: PathBuf,
}

impl DeploymentStore {
    /// Open the store of `network` under `deployments_dir`
    pub fn new(deployments_dir: impl AsRef<Path>, network: Network) -> Self {
        Self {
            root: deployments_dir.as_ref().join(network.to_string()),
        }
    }

    /// The directory holding the network's records
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file holding the record `name`
    fn path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    /// Read the record stored under `name`, if any
    pub fn get(&self, name: &str) -> Result<Option<DeployedContractRecord>, ScriptError> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| ScriptError::ReadDeployments(format!("{}: {}", path.display(), e)))?;
        let record = serde_json::from_str(&content)
            .map_err(|e| ScriptError::ReadDeployments(format!("{}: {}", path.display(), e)))?;

        Ok(Some(record))
    }

    /// Read the successful record stored under `name`, failing if there is none
    pub fn require(&self, name: &str) -> Result<DeployedContractRecord, ScriptError> {
        match self.get(name)? {
            Some(record) if record.succeeded() => Ok(record),
            _ => Err(ScriptError::MissingDeployment(name.to_string())),
        }
    }

    /// The skip-guard: whether a successful deployment is recorded under `name`.
    ///
    /// Unreadable records count as not deployed.
    pub fn is_deployed(&self, name: &str) -> bool {
        match self.get(name) {
            Ok(record) => record.is_some_and(|record| record.succeeded()),
            Err(e) => {
                debug!("Treating {name} as not deployed: {e}");
                false
            }
        }
    }

    /// Whether every one of `names` is deployed
    pub fn all_deployed(&self, names: &[&str]) -> bool {
        names.iter().all(|name| self.is_deployed(name))
    }

    /// Persist a record, refusing to replace a successful one
    pub fn save(&self, record: &DeployedContractRecord) -> Result<(), ScriptError> {
        if self.is_deployed(&record.name) {
            return Err(ScriptError::RecordExists(record.name.clone()));
        }

        self.write(record)
    }

    /// Persist a record for a contract redeployed under an existing name,
    /// counting the redeployment.
    ///
    /// Used only when a deployment is re-run with different constructor
    /// arguments; upgrades use new, version-qualified names instead.
    pub fn supersede(&self, mut record: DeployedContractRecord) -> Result<(), ScriptError> {
        let previous = self.get(&record.name)?;
        record.num_deployments = previous.map_or(1, |previous| previous.num_deployments + 1);

        self.write(&record)
    }

    /// Write a record, replacing any previous one
    fn write(&self, record: &DeployedContractRecord) -> Result<(), ScriptError> {
        fs::create_dir_all(&self.root)
            .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;

        let json = serde_json::to_string_pretty(record)
            .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;
        fs::write(self.path(&record.name), json)
            .map_err(|e| ScriptError::WriteDeployments(e.to_string()))
    }

    /// Read every record of the network, sorted by name
    pub fn list(&self) -> Result<Vec<DeployedContractRecord>, ScriptError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let entries =
            fs::read_dir(&self.root).map_err(|e| ScriptError::ReadDeployments(e.to_string()))?;

        let mut records = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| ScriptError::ReadDeployments(e.to_string()))?
                .path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let name = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .ok_or_else(|| {
                        ScriptError::ReadDeployments(format!("bad file name {}", path.display()))
                    })?;
                if let Some(record) = self.get(name)? {
                    records.push(record);
                }
            }
        }

        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }
}
