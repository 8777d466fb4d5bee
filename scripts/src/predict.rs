//! Deterministic prediction of the addresses that future contract-creating
//! transactions of an account will produce.
//!
//! A `CREATE` deployment lands at `keccak256(rlp([sender, nonce]))[12..]`, so
//! the address of a contract that does not exist yet is known as soon as the
//! number of transactions the sender will send before it is known. The
//! migrations use this to wire circular references, e.g. a firewall that
//! guards a proxy deployed after it.

use alloy_primitives::Address;

use crate::errors::ScriptError;

/// Compute the address created by `sender`'s transaction at `nonce`
pub fn predict_address(sender: Address, nonce: u64) -> Address {
    sender.create(nonce)
}

/// Compute the address created by `sender`'s transaction `offset` transactions
/// after `current_nonce`
pub fn predict_at_offset(
    sender: Address,
    current_nonce: u64,
    offset: u64,
) -> Result<Address, ScriptError> {
    let nonce = current_nonce.checked_add(offset).ok_or_else(|| {
        ScriptError::InvalidInput(format!("nonce {current_nonce} + {offset} overflows"))
    })?;

    Ok(predict_address(sender, nonce))
}

/// Check that a deployment landed at its predicted address
pub fn assert_predicted(
    name: &str,
    predicted: Address,
    actual: Address,
) -> Result<(), ScriptError> {
    if predicted != actual {
        return Err(ScriptError::AddressMismatch {
            name: name.to_string(),
            predicted,
            actual,
        });
    }

    Ok(())
}

/// The kind of transaction a plan entry stands for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlannedKind {
    /// A single contract creation
    Contract,
    /// An implementation deployment followed by its proxy deployment.
    /// The implementation is skipped when an identical one is reused.
    Proxied {
        /// Whether an already-deployed implementation is reused
        implementation_reused: bool,
    },
    /// A transaction that creates no contract
    Transaction,
}

/// One entry of a [`PendingDeploymentPlan`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedDeployment {
    /// The deployment name, e.g. `RiverFirewall`
    pub contract_id: String,
    /// The initializer or constructor description of the entry
    pub initializer: Option<String>,
    /// The kind of transaction(s) the entry sends
    pub kind: PlannedKind,
    /// The nonce of the entry's last transaction, i.e. the one creating the
    /// contract that users interact with
    pub nonce: u64,
    /// The predicted address, for creating entries
    pub predicted_address: Option<Address>,
}

/// The ordered list of transactions a migration step is about to send from one
/// account.
///
/// Predictions are derived from each entry's position in the plan, so a step
/// declares what it will send instead of counting nonce offsets by hand. The
/// plan is only correct if the step sends exactly these transactions in this
/// order and nothing else is sent from the account meanwhile; every
/// prediction is therefore asserted again after deployment.
#[derive(Clone, Debug)]
pub struct PendingDeploymentPlan {
    /// The account sending the transactions
    sender: Address,
    /// The account's nonce when the plan was built
    base_nonce: u64,
    /// The nonce the next entry will start at
    next_nonce: u64,
    /// The planned entries, in sending order
    entries: Vec<PlannedDeployment>,
}

impl PendingDeploymentPlan {
    /// Start a plan for `sender` whose next transaction will use `base_nonce`
    pub fn new(sender: Address, base_nonce: u64) -> Self {
        Self {
            sender,
            base_nonce,
            next_nonce: base_nonce,
            entries: Vec::new(),
        }
    }

    /// Plan a single contract creation, returning its predicted address
    pub fn contract(&mut self, contract_id: &str, initializer: Option<&str>) -> Address {
        self.push(contract_id, initializer, PlannedKind::Contract, 1)
    }

    /// Plan an implementation + proxy deployment, returning the predicted
    /// address of the proxy
    pub fn proxied(
        &mut self,
        contract_id: &str,
        initializer: Option<&str>,
        implementation_reused: bool,
    ) -> Address {
        let num_txs = if implementation_reused { 1 } else { 2 };
        self.push(
            contract_id,
            initializer,
            PlannedKind::Proxied {
                implementation_reused,
            },
            num_txs,
        )
    }

    /// Plan a transaction that creates no contract
    pub fn transaction(&mut self, label: &str) {
        let nonce = self.next_nonce;
        self.next_nonce += 1;
        self.entries.push(PlannedDeployment {
            contract_id: label.to_string(),
            initializer: None,
            kind: PlannedKind::Transaction,
            nonce,
            predicted_address: None,
        });
    }

    /// Append a creating entry spanning `num_txs` transactions, the last of
    /// which creates the predicted contract
    fn push(
        &mut self,
        contract_id: &str,
        initializer: Option<&str>,
        kind: PlannedKind,
        num_txs: u64,
    ) -> Address {
        let nonce = self.next_nonce + num_txs - 1;
        self.next_nonce += num_txs;

        let predicted = predict_address(self.sender, nonce);
        self.entries.push(PlannedDeployment {
            contract_id: contract_id.to_string(),
            initializer: initializer.map(str::to_string),
            kind,
            nonce,
            predicted_address: Some(predicted),
        });

        predicted
    }

    /// The predicted address of the entry named `contract_id`
    pub fn predicted(&self, contract_id: &str) -> Option<Address> {
        self.entries
            .iter()
            .find(|entry| entry.contract_id == contract_id)
            .and_then(|entry| entry.predicted_address)
    }

    /// Assert that the entry named `contract_id` landed at `actual`
    pub fn assert_deployed(&self, contract_id: &str, actual: Address) -> Result<(), ScriptError> {
        let predicted = self.predicted(contract_id).ok_or_else(|| {
            ScriptError::InvalidInput(format!("{contract_id} is not part of the deployment plan"))
        })?;

        assert_predicted(contract_id, predicted, actual)
    }

    /// The planned entries, in sending order
    pub fn entries(&self) -> &[PlannedDeployment] {
        &self.entries
    }

    /// The account sending the planned transactions
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// The number of transactions the plan sends
    pub fn num_transactions(&self) -> u64 {
        self.next_nonce - self.base_nonce
    }

    /// The nonce the account will have once the plan is executed
    pub fn final_nonce(&self) -> u64 {
        self.next_nonce
    }
}
