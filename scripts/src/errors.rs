//! Definitions of errors that can occur during the execution of the deployment scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use alloy_primitives::Address;

/// Errors that can occur during the execution of the deployment scripts
#[derive(Debug)]
pub enum ScriptError {
    /// Error reading a deployment record
    ReadDeployments(String),
    /// Error writing a deployment record
    WriteDeployments(String),
    /// Attempted to overwrite a successful deployment record
    RecordExists(String),
    /// A deployment that a step depends on is missing
    MissingDeployment(String),
    /// Error reading or parsing a compilation artifact
    ArtifactParsing(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// Error fetching the nonce of the deployer
    NonceFetching(String),
    /// Error deploying a contract
    ContractDeployment(String),
    /// Error calling a contract method
    ContractInteraction(String),
    /// A mined transaction reverted
    TransactionReverted(String),
    /// The selected network does not allow the requested step
    InvalidNetwork(String),
    /// A named account required by a step is not configured for the network
    MissingNamedAccount(&'static str),
    /// A predicted address did not match the deployed one
    AddressMismatch {
        /// The name of the deployment
        name: String,
        /// The address computed before deployment
        predicted: Address,
        /// The address the deployment actually landed at
        actual: Address,
    },
    /// Two deployed contracts do not reference each other as expected
    CrossReferenceMismatch(String),
    /// Invalid user-provided input
    InvalidInput(String),
    /// Error writing the consolidated export
    Export(String),
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::ReadDeployments(s) => write!(f, "error reading deployments: {}", s),
            ScriptError::WriteDeployments(s) => write!(f, "error writing deployments: {}", s),
            ScriptError::RecordExists(s) => {
                write!(f, "refusing to overwrite successful deployment: {}", s)
            }
            ScriptError::MissingDeployment(s) => write!(f, "missing deployment: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::NonceFetching(s) => write!(f, "error fetching nonce: {}", s),
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::TransactionReverted(s) => write!(f, "transaction reverted: {}", s),
            ScriptError::InvalidNetwork(s) => write!(f, "invalid network: {}", s),
            ScriptError::MissingNamedAccount(s) => {
                write!(f, "named account `{}` is not configured for this network", s)
            }
            ScriptError::AddressMismatch {
                name,
                predicted,
                actual,
            } => write!(
                f,
                "invalid future {} address computation {:#x} != {:#x}",
                name, predicted, actual
            ),
            ScriptError::CrossReferenceMismatch(s) => write!(f, "invalid cross reference: {}", s),
            ScriptError::InvalidInput(s) => write!(f, "invalid input: {}", s),
            ScriptError::Export(s) => write!(f, "error exporting deployments: {}", s),
        }
    }
}

impl Error for ScriptError {}
