//! The chain client the migrations send their transactions through

use std::{future::Future, str::FromStr};

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{TransactionReceipt, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use tracing::debug;

use crate::errors::ScriptError;

/// The outcome of a mined transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutcome {
    /// The transaction hash
    pub tx_hash: B256,
    /// The address of the created contract, for creating transactions
    pub contract_address: Option<Address>,
    /// The block the transaction was mined in
    pub block_number: Option<u64>,
}

/// A chain client sending transactions from a single deployer account.
///
/// Every sent transaction is awaited until mined, and a reverted transaction is
/// an error, so the deployer's nonce advances strictly in the order the
/// migrations send transactions.
pub trait Chain {
    /// The account sending transactions
    fn deployer(&self) -> Address;

    /// The chain id reported by the node
    fn chain_id(&self) -> impl Future<Output = Result<u64, ScriptError>> + Send;

    /// The nonce the deployer's next transaction will use
    fn nonce(&self) -> impl Future<Output = Result<u64, ScriptError>> + Send;

    /// Send a contract-creating transaction with the given init code
    fn deploy(&self, init_code: Bytes)
        -> impl Future<Output = Result<TxOutcome, ScriptError>> + Send;

    /// Send a transaction calling `to` with `calldata`
    fn send(
        &self,
        to: Address,
        calldata: Bytes,
    ) -> impl Future<Output = Result<TxOutcome, ScriptError>> + Send;

    /// Perform a read-only call against the latest block
    fn call(
        &self,
        to: Address,
        calldata: Bytes,
    ) -> impl Future<Output = Result<Bytes, ScriptError>> + Send;

    /// Read a storage slot of `address` at the latest block
    fn storage(
        &self,
        address: Address,
        slot: B256,
    ) -> impl Future<Output = Result<B256, ScriptError>> + Send;
}

/// A [`Chain`] backed by an HTTP RPC endpoint and a local private key
#[derive(Clone)]
pub struct RpcChain {
    /// The provider, with the deployer's wallet attached
    provider: DynProvider,
    /// The deployer address
    deployer: Address,
}

/// Sets up the client with which the migrations are run, from the deployer's
/// private key and the RPC url
pub fn setup_client(priv_key: &str, rpc_url: &str) -> Result<RpcChain, ScriptError> {
    let signer = PrivateKeySigner::from_str(priv_key)
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    let deployer = signer.address();

    let url = Url::parse(rpc_url)
        .map_err(|e| ScriptError::ClientInitialization(format!("invalid RPC url: {e}")))?;
    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .on_http(url)
        .erased();

    Ok(RpcChain { provider, deployer })
}

impl RpcChain {
    /// Send a transaction and wait for it to be mined, failing if it reverted
    async fn send_and_confirm(&self, tx: TransactionRequest) -> Result<TxOutcome, ScriptError> {
        let pending_tx = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        let tx_hash = *pending_tx.tx_hash();
        debug!("Sent transaction {tx_hash:#x}, awaiting receipt");

        let receipt: TransactionReceipt = pending_tx
            .get_receipt()
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        if !receipt.status() {
            return Err(ScriptError::TransactionReverted(format!("{tx_hash:#x}")));
        }

        Ok(TxOutcome {
            tx_hash: receipt.transaction_hash,
            contract_address: receipt.contract_address,
            block_number: receipt.block_number,
        })
    }
}

impl Chain for RpcChain {
    fn deployer(&self) -> Address {
        self.deployer
    }

    async fn chain_id(&self) -> Result<u64, ScriptError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))
    }

    async fn nonce(&self) -> Result<u64, ScriptError> {
        self.provider
            .get_transaction_count(self.deployer)
            .pending()
            .await
            .map_err(|e| ScriptError::NonceFetching(e.to_string()))
    }

    async fn deploy(&self, init_code: Bytes) -> Result<TxOutcome, ScriptError> {
        let tx = TransactionRequest::default()
            .with_from(self.deployer)
            .with_deploy_code(init_code);

        let outcome = self
            .send_and_confirm(tx)
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;

        if outcome.contract_address.is_none() {
            return Err(ScriptError::ContractDeployment(format!(
                "receipt of {:#x} has no contract address",
                outcome.tx_hash
            )));
        }

        Ok(outcome)
    }

    async fn send(&self, to: Address, calldata: Bytes) -> Result<TxOutcome, ScriptError> {
        let tx = TransactionRequest::default()
            .with_from(self.deployer)
            .with_to(to)
            .with_input(calldata);

        self.send_and_confirm(tx).await
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, ScriptError> {
        let tx = TransactionRequest::default().with_to(to).with_input(calldata);

        self.provider
            .call(&tx)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
    }

    async fn storage(&self, address: Address, slot: B256) -> Result<B256, ScriptError> {
        let value = self
            .provider
            .get_storage_at(address, U256::from_be_bytes(slot.0))
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        Ok(B256::from(value.to_be_bytes::<32>()))
    }
}
