//! Consolidation of a network's deployment records into the files consumed
//! downstream: the deployment summary, firewall ABIs and combined
//! proxy + implementations artifacts

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::{Address, B256};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    artifacts::mutating_entries,
    constants::{
        COMBINED_IMPLEMENTATIONS_DIR, COMBINED_IMPLEMENTATIONS_SUFFIX, FIREWALLED_CONTRACTS,
        FIREWALL_ABIS_DIR, FIREWALL_ABI_SOURCE, IMPLEMENTATION_INFIX, PROXY_RECORD_SUFFIX,
    },
    deployer::{merge_abis, proxy_name},
    errors::ScriptError,
    networks::Network,
    records::{DeployedContractRecord, DeploymentStore},
};

/// The consolidated deployment summary of a network
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentExport {
    /// The network name
    pub name: String,
    /// The chain id
    pub chain_id: u64,
    /// Every deployment, by name
    pub contracts: BTreeMap<String, ContractEntry>,
    /// The named accounts, by name
    pub named_accounts: BTreeMap<String, Address>,
}

/// A deployment in the summary
#[derive(Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContractEntry {
    /// A contract deployed without arguments
    Address(Address),
    /// A contract deployed with constructor arguments or an initializer
    WithParams {
        /// The deployed address
        address: Address,
        /// How the contract was set up
        #[serde(rename = "deploymentParams")]
        deployment_params: DeploymentParams,
    },
}

/// How a contract was set up on deployment
#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeploymentParams {
    /// Initialized through the proxy
    Proxy {
        /// The initializer name
        #[serde(rename = "methodName")]
        method_name: String,
        /// The initializer arguments
        args: Vec<ExportedArg>,
    },
    /// Set up by its constructor
    Constructor {
        /// The constructor arguments
        args: Vec<ExportedArg>,
    },
}

/// A deployment argument, annotated when it refers to a known account or contract
#[derive(Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExportedArg {
    /// An argument referring to a named account
    NamedAccount {
        /// The rendered argument
        value: String,
        /// The account name
        #[serde(rename = "namedAccount")]
        named_account: String,
    },
    /// An argument referring to a deployed contract
    Contract {
        /// The rendered argument
        value: String,
        /// The deployment name
        contract: String,
    },
    /// Any other argument
    Plain(String),
}

/// A proxy with every implementation it was deployed or upgraded with
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedImplementations {
    /// The proxy address
    pub address: Address,
    /// The ABI of the latest implementation without constructor, followed by the proxy ABI
    pub abi: Value,
    /// The implementations, oldest first
    pub implementations: Vec<ImplementationEntry>,
}

/// One implementation in a [`CombinedImplementations`] artifact
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationEntry {
    /// The implementation record name
    pub name: String,
    /// The implementation version, e.g. `1_2_1`
    pub version: String,
    /// The implementation address
    pub address: Address,
    /// The implementation deployment transaction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
}

/// The files written by an export
#[derive(Debug, Default)]
pub struct ExportSummary {
    /// The consolidated deployment summary
    pub deployment: PathBuf,
    /// The firewall ABIs
    pub firewall_abis: Vec<PathBuf>,
    /// The combined implementations artifacts
    pub combined_implementations: Vec<PathBuf>,
}

/// Resolves addresses back to the names they are known by
struct AddressBook {
    /// Named accounts by address
    accounts: HashMap<Address, String>,
    /// Deployment names by address
    contracts: HashMap<Address, String>,
}

impl AddressBook {
    /// Index the deployed contracts and named accounts by address
    fn new(records: &[DeployedContractRecord], accounts: &[(&'static str, Address)]) -> Self {
        let mut contracts = HashMap::new();
        // Merged and standalone records take precedence over derived ones
        let (derived, primary): (Vec<_>, Vec<_>) =
            records.iter().partition(|record| is_derived(&record.name));
        for record in derived.into_iter().chain(primary) {
            contracts.insert(record.address, record.name.clone());
        }

        let accounts = accounts
            .iter()
            .rev()
            .map(|(name, address)| (*address, name.to_string()))
            .collect();

        Self {
            accounts,
            contracts,
        }
    }

    /// Name the account or contract an argument refers to, if any
    fn annotate(&self, arg: &str) -> ExportedArg {
        let Ok(address) = arg.parse::<Address>() else {
            return ExportedArg::Plain(arg.to_string());
        };

        if let Some(name) = self.accounts.get(&address) {
            ExportedArg::NamedAccount {
                value: arg.to_string(),
                named_account: name.clone(),
            }
        } else if let Some(name) = self.contracts.get(&address) {
            ExportedArg::Contract {
                value: arg.to_string(),
                contract: name.clone(),
            }
        } else {
            ExportedArg::Plain(arg.to_string())
        }
    }

    /// The export entry of a record
    fn entry(&self, record: &DeployedContractRecord) -> ContractEntry {
        let annotate = |args: &[String]| args.iter().map(|arg| self.annotate(arg)).collect();

        let deployment_params = match &record.execute {
            Some(execute) => DeploymentParams::Proxy {
                method_name: execute.method_name.clone(),
                args: annotate(&execute.args),
            },
            None if !record.args.is_empty() => DeploymentParams::Constructor {
                args: annotate(&record.args),
            },
            None => return ContractEntry::Address(record.address),
        };

        ContractEntry::WithParams {
            address: record.address,
            deployment_params,
        }
    }
}

/// Whether a record name is a bare proxy or implementation record of another deployment
fn is_derived(name: &str) -> bool {
    name.ends_with(PROXY_RECORD_SUFFIX) || name.contains(IMPLEMENTATION_INFIX)
}

/// Parse an implementation version like `1_2_1` for ordering
fn version_key(version: &str) -> Vec<u64> {
    version
        .split('_')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

/// Serialize `value` as pretty JSON to `path`, creating parent directories
fn write_json(path: &Path, value: &impl Serialize) -> Result<(), ScriptError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ScriptError::Export(e.to_string()))?;
    }

    let json =
        serde_json::to_string_pretty(value).map_err(|e| ScriptError::Export(e.to_string()))?;
    fs::write(path, json).map_err(|e| ScriptError::Export(format!("{}: {}", path.display(), e)))
}

/// Build the consolidated summary of the successful records of a network
pub fn build_deployment_export(
    records: &[DeployedContractRecord],
    network: Network,
    chain_id: u64,
    accounts: &[(&'static str, Address)],
) -> DeploymentExport {
    let book = AddressBook::new(records, accounts);

    DeploymentExport {
        name: network.to_string(),
        chain_id,
        contracts: records
            .iter()
            .map(|record| (record.name.clone(), book.entry(record)))
            .collect(),
        named_accounts: accounts
            .iter()
            .map(|(name, address)| (name.to_string(), *address))
            .collect(),
    }
}

/// Build the ABI of each firewalled contract as called through its firewall:
/// the firewall ABI followed by the contract's mutating entries
pub fn build_firewall_abis(records: &[DeployedContractRecord]) -> Vec<(String, Value)> {
    let by_name: HashMap<&str, &DeployedContractRecord> =
        records.iter().map(|record| (record.name.as_str(), record)).collect();

    let Some(firewall) = by_name.get(FIREWALL_ABI_SOURCE) else {
        warn!("No {FIREWALL_ABI_SOURCE} deployment, skipping firewall ABIs");
        return Vec::new();
    };

    FIREWALLED_CONTRACTS
        .iter()
        .filter_map(|name| by_name.get(name))
        .map(|record| {
            let mut abi: Vec<Value> = firewall.abi.as_array().cloned().unwrap_or_default();
            abi.extend(mutating_entries(&record.abi));
            (record.name.clone(), Value::Array(abi))
        })
        .collect()
}

/// Build the combined implementations artifact of every proxied deployment
pub fn build_combined_implementations(
    records: &[DeployedContractRecord],
) -> Vec<(String, CombinedImplementations)> {
    let by_name: HashMap<&str, &DeployedContractRecord> =
        records.iter().map(|record| (record.name.as_str(), record)).collect();

    let mut combined = Vec::new();
    for record in records.iter().filter(|record| record.implementation.is_some()) {
        let Some(proxy) = by_name.get(proxy_name(&record.name).as_str()) else {
            warn!("No proxy record for {}, skipping its implementations", record.name);
            continue;
        };

        let prefix = format!("{}{IMPLEMENTATION_INFIX}", record.contract);
        let mut implementations: Vec<(&str, &DeployedContractRecord)> = records
            .iter()
            .filter_map(|candidate| {
                candidate
                    .name
                    .strip_prefix(&prefix)
                    .map(|version| (version, candidate))
            })
            .collect();
        implementations.sort_by_key(|(version, _)| version_key(version));

        let Some((_, latest)) = implementations.last() else {
            continue;
        };

        combined.push((
            record.name.clone(),
            CombinedImplementations {
                address: record.address,
                abi: merge_abis(&latest.abi, &proxy.abi),
                implementations: implementations
                    .iter()
                    .map(|(version, implementation)| ImplementationEntry {
                        name: implementation.name.clone(),
                        version: version.to_string(),
                        address: implementation.address,
                        transaction_hash: implementation.transaction_hash,
                    })
                    .collect(),
            },
        ));
    }

    combined
}

/// Write every export of a network.
///
/// The summary goes to `output`; firewall ABIs and combined implementations
/// next to the network's records.
pub fn export_deployments(
    store: &DeploymentStore,
    network: Network,
    chain_id: u64,
    accounts: &[(&'static str, Address)],
    output: &Path,
) -> Result<ExportSummary, ScriptError> {
    let records: Vec<DeployedContractRecord> = store
        .list()?
        .into_iter()
        .filter(|record| record.succeeded())
        .collect();

    let mut summary = ExportSummary {
        deployment: output.to_path_buf(),
        ..Default::default()
    };

    write_json(
        output,
        &build_deployment_export(&records, network, chain_id, accounts),
    )?;
    info!("Exported {} deployments to {}", records.len(), output.display());

    for (name, abi) in build_firewall_abis(&records) {
        let path = store
            .root()
            .join(FIREWALL_ABIS_DIR)
            .join(format!("{name}.abi.json"));
        write_json(&path, &abi)?;
        summary.firewall_abis.push(path);
    }

    for (name, combined) in build_combined_implementations(&records) {
        let path = store
            .root()
            .join(COMBINED_IMPLEMENTATIONS_DIR)
            .join(format!("{name}{COMBINED_IMPLEMENTATIONS_SUFFIX}"));
        write_json(&path, &combined)?;
        summary.combined_implementations.push(path);
    }

    Ok(summary)
}
