//! The deployment context shared by the migrations: contract creation with
//! record keeping, proxied deployments, and contract calls

use std::time::Duration;

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolCall;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    artifacts::{abi_without_constructor, ArtifactStore},
    chain::{Chain, TxOutcome},
    constants::{ADMIN_POLL_INTERVAL, IMPLEMENTATION_INFIX, PROXY_CONTRACT, PROXY_RECORD_SUFFIX},
    errors::ScriptError,
    networks::{NamedAccounts, Network},
    predict::PendingDeploymentPlan,
    records::{DeployedContractRecord, DeploymentStore, ExecuteRecord, ReceiptRecord},
    solidity::{proxy_args, ConstructorArgs, EncodedCall},
    verify::ExplorerVerifier,
};

/// The name of the version-qualified implementation record of `contract`
pub fn implementation_name(contract: &str, version: &str) -> String {
    format!("{contract}{IMPLEMENTATION_INFIX}{version}")
}

/// The name of the bare proxy record of the deployment `name`
pub fn proxy_name(name: &str) -> String {
    format!("{name}{PROXY_RECORD_SUFFIX}")
}

/// A contract deployed behind a `TUPProxy`
#[derive(Clone, Debug)]
pub struct ProxiedDeployment<'a> {
    /// The name users refer to the deployment by, e.g. `River`
    pub name: &'a str,
    /// The implementation artifact, e.g. `RiverV1`
    pub contract: &'a str,
    /// The implementation version, e.g. `1_2_1`
    pub version: &'a str,
    /// The proxy administrator, usually a proxy firewall
    pub owner: Address,
    /// The initializer executed by the proxy on construction
    pub initializer: Option<EncodedCall>,
}

/// Everything a migration needs to deploy and interact with contracts on one network
pub struct DeployContext<C> {
    /// The chain client
    pub chain: C,
    /// The network deployed to
    pub network: Network,
    /// The named accounts of the network
    pub accounts: NamedAccounts,
    /// The deployment records of the network
    pub store: DeploymentStore,
    /// The compiled contract artifacts
    pub artifacts: ArtifactStore,
    /// Explorer verification, when the network supports it
    pub verifier: Option<ExplorerVerifier>,
    /// The interval at which the chain is polled while waiting on an administrator
    pub poll_interval: Duration,
}

impl<C: Chain> DeployContext<C> {
    /// Create a context without explorer verification
    pub fn new(
        chain: C,
        network: Network,
        accounts: NamedAccounts,
        store: DeploymentStore,
        artifacts: ArtifactStore,
    ) -> Self {
        Self {
            chain,
            network,
            accounts,
            store,
            artifacts,
            verifier: None,
            poll_interval: ADMIN_POLL_INTERVAL,
        }
    }

    /// Verify deployed contracts with `verifier`
    pub fn with_verifier(mut self, verifier: Option<ExplorerVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Poll the chain at `interval` while waiting on an administrator
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The account sending the transactions
    pub fn deployer(&self) -> Address {
        self.chain.deployer()
    }

    /// Start a deployment plan at the deployer's pending nonce
    pub async fn plan(&self) -> Result<PendingDeploymentPlan, ScriptError> {
        let nonce = self.chain.nonce().await?;
        Ok(PendingDeploymentPlan::new(self.deployer(), nonce))
    }

    /// Whether an implementation of `contract` at `version` is already
    /// deployed and will be reused by [`Self::deploy_proxied`]
    pub fn implementation_reusable(
        &self,
        contract: &str,
        version: &str,
    ) -> Result<bool, ScriptError> {
        let name = implementation_name(contract, version);
        Ok(self
            .reusable(&name, contract, &ConstructorArgs::none())?
            .is_some())
    }

    /// The existing record of `name`, if it is a successful deployment of
    /// `contract` with the same constructor arguments
    fn reusable(
        &self,
        name: &str,
        contract: &str,
        args: &ConstructorArgs,
    ) -> Result<Option<DeployedContractRecord>, ScriptError> {
        Ok(self.store.get(name)?.filter(|record| {
            record.succeeded() && record.contract == contract && record.encoded_args == args.encoded
        }))
    }

    /// Deploy `contract` under `name`, or reuse the recorded deployment when
    /// it was made with the same constructor arguments
    pub async fn deploy_contract(
        &self,
        name: &str,
        contract: &str,
        args: ConstructorArgs,
    ) -> Result<DeployedContractRecord, ScriptError> {
        if let Some(record) = self.reusable(name, contract, &args)? {
            info!("Reusing {name} ({contract}) at {:#x}", record.address);
            return Ok(record);
        }

        let artifact = self.artifacts.load(contract)?;
        let outcome = self
            .chain
            .deploy(artifact.init_code(&args.encoded))
            .await?;
        let address = outcome.contract_address.ok_or_else(|| {
            ScriptError::ContractDeployment(format!(
                "{name}: receipt of {:#x} has no contract address",
                outcome.tx_hash
            ))
        })?;

        info!(
            "Deployed {name} ({contract}) at {address:#x} in {:#x}",
            outcome.tx_hash
        );

        let record = DeployedContractRecord {
            name: name.to_string(),
            contract: contract.to_string(),
            address,
            implementation: None,
            abi: artifact.abi,
            args: args.rendered,
            encoded_args: args.encoded,
            execute: None,
            transaction_hash: Some(outcome.tx_hash),
            receipt: Some(ReceiptRecord::success(&outcome)),
            num_deployments: 1,
        };
        self.persist(record.clone())?;

        if let Some(verifier) = &self.verifier {
            verifier.verify(&record);
        }

        Ok(record)
    }

    /// Deploy an implementation and a `TUPProxy` delegating to it.
    ///
    /// Writes the version-qualified implementation record, the bare proxy
    /// record and the merged record under `deployment.name`, which is returned.
    pub async fn deploy_proxied(
        &self,
        deployment: ProxiedDeployment<'_>,
    ) -> Result<DeployedContractRecord, ScriptError> {
        let implementation = self
            .deploy_contract(
                &implementation_name(deployment.contract, deployment.version),
                deployment.contract,
                ConstructorArgs::none(),
            )
            .await?;

        let init_data = deployment
            .initializer
            .as_ref()
            .map(|call| call.calldata.clone())
            .unwrap_or_default();
        let proxy = self
            .deploy_contract(
                &proxy_name(deployment.name),
                PROXY_CONTRACT,
                proxy_args(implementation.address, deployment.owner, init_data),
            )
            .await?;

        if let Some(existing) = self.store.get(deployment.name)? {
            if existing.succeeded()
                && existing.address == proxy.address
                && existing.implementation == Some(implementation.address)
            {
                return Ok(existing);
            }
        }

        let merged = DeployedContractRecord {
            name: deployment.name.to_string(),
            contract: deployment.contract.to_string(),
            address: proxy.address,
            implementation: Some(implementation.address),
            abi: merge_abis(&implementation.abi, &proxy.abi),
            args: proxy.args.clone(),
            encoded_args: proxy.encoded_args.clone(),
            execute: deployment.initializer.map(|call| ExecuteRecord {
                method_name: call.method_name,
                args: call.args,
            }),
            transaction_hash: proxy.transaction_hash,
            receipt: proxy.receipt.clone(),
            num_deployments: 1,
        };
        self.persist(merged.clone())?;

        Ok(merged)
    }

    /// Save a new record, superseding a previous deployment under the same
    /// name with different arguments
    fn persist(&self, record: DeployedContractRecord) -> Result<(), ScriptError> {
        if self.store.is_deployed(&record.name) {
            warn!("Redeploying {}, superseding its previous record", record.name);
            return self.store.supersede(record);
        }

        self.store.save(&record)
    }

    /// Send `call` to `to` and wait for it to be mined
    pub async fn send_call(
        &self,
        to: Address,
        call: &EncodedCall,
    ) -> Result<TxOutcome, ScriptError> {
        let outcome = self.chain.send(to, call.calldata.clone()).await?;
        info!(
            "Performed {} on {to:#x} in {:#x}",
            call.describe(),
            outcome.tx_hash
        );

        Ok(outcome)
    }

    /// Perform a read-only call and decode its return values
    pub async fn read<Call: SolCall>(
        &self,
        to: Address,
        call: Call,
    ) -> Result<Call::Return, ScriptError> {
        let calldata: Bytes = call.abi_encode().into();
        let data = self.chain.call(to, calldata).await?;

        Call::abi_decode_returns(&data, true).map_err(|e| {
            ScriptError::ContractInteraction(format!(
                "decoding {} from {to:#x}: {e}",
                Call::SIGNATURE
            ))
        })
    }
}

/// The ABI of a proxied deployment: the implementation ABI without its
/// constructor followed by the proxy ABI
pub fn merge_abis(implementation: &Value, proxy: &Value) -> Value {
    let mut entries = abi_without_constructor(implementation);
    entries.extend(abi_without_constructor(proxy));
    Value::Array(entries)
}
