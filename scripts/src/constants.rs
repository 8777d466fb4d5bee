//! Constants used in the deploy scripts

use std::time::Duration;

use alloy_primitives::{b256, B256};

/// The artifact name of the upgradeable proxy contract
pub const PROXY_CONTRACT: &str = "TUPProxy";

/// The artifact name of the access-control firewall contract
pub const FIREWALL_CONTRACT: &str = "Firewall";

/// The suffix appended to a deployment name for its bare proxy record
pub const PROXY_RECORD_SUFFIX: &str = "_Proxy";

/// The infix between a contract name and the implementation version in
/// version-qualified implementation records, e.g. `RiverV1_Implementation_1_2_1`
pub const IMPLEMENTATION_INFIX: &str = "_Implementation_";

/// The implementation version deployed by the initial migrations
pub const IMPLEMENTATION_VERSION: &str = "1_2_1";

/// The TLC implementation version deployed by the initial migrations
pub const TLC_IMPLEMENTATION_VERSION: &str = "1_1_0";

/// The storage slot containing the implementation address in an EIP-1967 proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#logic-contract-address
pub const PROXY_IMPLEMENTATION_STORAGE_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// The number of bytes stored in a single storage slot
pub const NUM_BYTES_STORAGE_SLOT: usize = 32;

/// The number of bytes in an Ethereum address
pub const NUM_BYTES_ADDRESS: usize = 20;

/// The receipt status of a successful transaction
pub const RECEIPT_STATUS_SUCCESS: u8 = 1;

/// The receipt status of a reverted transaction
pub const RECEIPT_STATUS_FAILURE: u8 = 0;

/// The interval at which the chain is polled while waiting on an administrator
pub const ADMIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// The number of progress dots printed per line while polling
pub const POLL_DOTS_PER_LINE: u64 = 60;

/// The default directory holding per-network deployment records
pub const DEFAULT_DEPLOYMENTS_DIR: &str = "deployments";

/// The default directory holding compiled contract artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// The default RPC URL, a local development node
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

/// The subdirectory of a network's deployments holding firewall ABIs
pub const FIREWALL_ABIS_DIR: &str = "firewallAbis";

/// The subdirectory of a network's deployments holding combined implementation artifacts
pub const COMBINED_IMPLEMENTATIONS_DIR: &str = "combinedImplementations";

/// The suffix of combined implementation artifact files
pub const COMBINED_IMPLEMENTATIONS_SUFFIX: &str = "_combined_implementations.json";

/// The name of the firewall record whose ABI is used for firewall ABI exports
pub const FIREWALL_ABI_SOURCE: &str = "RiverFirewall";

/// The deployments whose mutating methods are reachable through a firewall
pub const FIREWALLED_CONTRACTS: [&str; 4] = ["River", "Allowlist", "Oracle", "OperatorsRegistry"];

/// The suffix of proxy firewall deployment names, e.g. `RiverProxyFirewall`
pub const PROXY_FIREWALL_SUFFIX: &str = "ProxyFirewall";

/// The number of funded validator keys events re-emitted by the
/// OperatorsRegistry migration
pub const FUNDED_KEYS_EVENT_BATCH: u64 = 1;

// -------------
// | Artifacts |
// -------------

/// The Withdraw implementation artifact
pub const WITHDRAW_CONTRACT: &str = "WithdrawV1";
/// The Allowlist implementation artifact
pub const ALLOWLIST_CONTRACT: &str = "AllowlistV1";
/// The River implementation artifact
pub const RIVER_CONTRACT: &str = "RiverV1";
/// The Oracle implementation artifact
pub const ORACLE_CONTRACT: &str = "OracleV1";
/// The OperatorsRegistry implementation artifact
pub const OPERATORS_REGISTRY_CONTRACT: &str = "OperatorsRegistryV1";
/// The ELFeeRecipient implementation artifact
pub const EL_FEE_RECIPIENT_CONTRACT: &str = "ELFeeRecipientV1";
/// The RedeemManager implementation artifact
pub const REDEEM_MANAGER_CONTRACT: &str = "RedeemManagerV1";
/// The CoverageFund implementation artifact
pub const COVERAGE_FUND_CONTRACT: &str = "CoverageFundV1";
/// The WLSETH implementation artifact
pub const WLSETH_CONTRACT: &str = "WLSETHV1";
/// The TLC implementation artifact
pub const TLC_CONTRACT: &str = "TLCV1";

// --------------
// | Deployment |
// |   names    |
// --------------

/// The Withdraw deployment name
pub const WITHDRAW: &str = "Withdraw";
/// The Allowlist deployment name
pub const ALLOWLIST: &str = "Allowlist";
/// The Allowlist firewall deployment name
pub const ALLOWLIST_FIREWALL: &str = "AllowlistFirewall";
/// The Allowlist proxy firewall deployment name
pub const ALLOWLIST_PROXY_FIREWALL: &str = "AllowlistProxyFirewall";
/// The River deployment name
pub const RIVER: &str = "River";
/// The River firewall deployment name
pub const RIVER_FIREWALL: &str = "RiverFirewall";
/// The River proxy firewall deployment name
pub const RIVER_PROXY_FIREWALL: &str = "RiverProxyFirewall";
/// The Oracle deployment name
pub const ORACLE: &str = "Oracle";
/// The Oracle firewall deployment name
pub const ORACLE_FIREWALL: &str = "OracleFirewall";
/// The Oracle proxy firewall deployment name
pub const ORACLE_PROXY_FIREWALL: &str = "OracleProxyFirewall";
/// The OperatorsRegistry deployment name
pub const OPERATORS_REGISTRY: &str = "OperatorsRegistry";
/// The OperatorsRegistry firewall deployment name
pub const OPERATORS_REGISTRY_FIREWALL: &str = "OperatorsRegistryFirewall";
/// The OperatorsRegistry proxy firewall deployment name
pub const OPERATORS_REGISTRY_PROXY_FIREWALL: &str = "OperatorsRegistryProxyFirewall";
/// The ELFeeRecipient deployment name
pub const EL_FEE_RECIPIENT: &str = "ELFeeRecipient";
/// The RedeemManager deployment name
pub const REDEEM_MANAGER: &str = "RedeemManager";
/// The RedeemManager proxy firewall deployment name
pub const REDEEM_MANAGER_PROXY_FIREWALL: &str = "RedeemManagerProxyFirewall";
/// The CoverageFund deployment name
pub const COVERAGE_FUND: &str = "CoverageFund";
/// The WLSETH deployment name
pub const WLSETH: &str = "WLSETH";
/// The TLC deployment name
pub const TLC: &str = "TLC";
/// The TLC proxy firewall deployment name
pub const TLC_PROXY_FIREWALL: &str = "TLCProxyFirewall";
