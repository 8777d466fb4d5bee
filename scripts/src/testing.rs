//! An in-memory chain used to exercise the migrations in tests

use std::{collections::HashMap, sync::Mutex};

use alloy_primitives::{keccak256, Address, Bytes, B256};

use crate::{
    chain::{Chain, TxOutcome},
    errors::ScriptError,
};

/// Answers read-only calls made against the mock chain
pub(crate) type CallHandler = Box<dyn Fn(Address, &[u8]) -> Option<Bytes> + Send + Sync>;

/// The mutable state of the mock chain
#[derive(Default)]
struct MockState {
    /// The deployer's next nonce
    nonce: u64,
    /// Created contracts and their init code, in creation order
    deployments: Vec<(Address, Bytes)>,
    /// Calls sent as transactions, in sending order
    sent: Vec<(Address, Bytes)>,
    /// Storage slots set by the test
    storage: HashMap<(Address, B256), B256>,
    /// Transactions sent by this client so far
    num_sent: usize,
    /// Inject a transaction from the deployer's account by another client
    /// once this many transactions have been sent
    foreign_tx_after: Option<usize>,
}

/// A chain that creates contracts at their `CREATE` address and answers calls
/// through a test-provided handler
pub(crate) struct MockChain {
    /// The deployer account
    deployer: Address,
    /// The chain id reported
    chain_id: u64,
    /// The chain state
    state: Mutex<MockState>,
    /// The handler answering read-only calls
    call_handler: Option<CallHandler>,
}

impl MockChain {
    /// A chain with the deployer at nonce 0
    pub(crate) fn new(deployer: Address) -> Self {
        Self {
            deployer,
            chain_id: 31337,
            state: Mutex::new(MockState::default()),
            call_handler: None,
        }
    }

    /// Start the deployer at `nonce`
    pub(crate) fn with_nonce(self, nonce: u64) -> Self {
        self.state.lock().unwrap().nonce = nonce;
        self
    }

    /// Answer read-only calls with `handler`
    pub(crate) fn with_call_handler(
        mut self,
        handler: impl Fn(Address, &[u8]) -> Option<Bytes> + Send + Sync + 'static,
    ) -> Self {
        self.call_handler = Some(Box::new(handler));
        self
    }

    /// Simulate another process sending from the deployer account after
    /// `num_txs` more transactions
    pub(crate) fn interleave_foreign_tx_after(&self, num_txs: usize) {
        let mut state = self.state.lock().unwrap();
        state.foreign_tx_after = Some(state.num_sent + num_txs);
    }

    /// Set a storage slot of `address`
    pub(crate) fn set_storage(&self, address: Address, slot: B256, value: B256) {
        self.state
            .lock()
            .unwrap()
            .storage
            .insert((address, slot), value);
    }

    /// The number of contract-creating transactions sent
    pub(crate) fn num_deployments(&self) -> usize {
        self.state.lock().unwrap().deployments.len()
    }

    /// The calls sent as transactions
    pub(crate) fn sent_calls(&self) -> Vec<(Address, Bytes)> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Deploy an empty contract, returning its address
    pub(crate) async fn deploy_dummy(&self) -> Address {
        self.deploy(Bytes::new())
            .await
            .unwrap()
            .contract_address
            .unwrap()
    }

    /// Consume the next nonce, returning it
    fn next_nonce(state: &mut MockState) -> u64 {
        if state.foreign_tx_after == Some(state.num_sent) {
            state.foreign_tx_after = None;
            state.nonce += 1;
        }

        let nonce = state.nonce;
        state.nonce += 1;
        state.num_sent += 1;
        nonce
    }
}

impl Chain for MockChain {
    fn deployer(&self) -> Address {
        self.deployer
    }

    async fn chain_id(&self) -> Result<u64, ScriptError> {
        Ok(self.chain_id)
    }

    async fn nonce(&self) -> Result<u64, ScriptError> {
        Ok(self.state.lock().unwrap().nonce)
    }

    async fn deploy(&self, init_code: Bytes) -> Result<TxOutcome, ScriptError> {
        let mut state = self.state.lock().unwrap();
        let nonce = Self::next_nonce(&mut state);
        let address = self.deployer.create(nonce);
        state.deployments.push((address, init_code));

        Ok(TxOutcome {
            tx_hash: keccak256(nonce.to_be_bytes()),
            contract_address: Some(address),
            block_number: Some(nonce),
        })
    }

    async fn send(&self, to: Address, calldata: Bytes) -> Result<TxOutcome, ScriptError> {
        let mut state = self.state.lock().unwrap();
        let nonce = Self::next_nonce(&mut state);
        state.sent.push((to, calldata));

        Ok(TxOutcome {
            tx_hash: keccak256(nonce.to_be_bytes()),
            contract_address: None,
            block_number: Some(nonce),
        })
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, ScriptError> {
        self.call_handler
            .as_ref()
            .and_then(|handler| handler(to, &calldata))
            .ok_or_else(|| ScriptError::ContractInteraction(format!("no code at {to:#x}")))
    }

    async fn storage(&self, address: Address, slot: B256) -> Result<B256, ScriptError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .storage
            .get(&(address, slot))
            .copied()
            .unwrap_or_default())
    }
}
