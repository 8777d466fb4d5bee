//! Definitions of Solidity functions called during deployment, and the
//! encoding of the constructors of the proxy and firewall contracts

use alloy_primitives::{Address, Bytes, FixedBytes};
use alloy_sol_types::{sol, SolCall, SolValue};
use itertools::Itertools;

sol! {
    // Proxy
    function pause() external;
    function upgradeTo(address newImplementation) external;
    function upgradeToAndCall(address newImplementation, bytes data) external payable;

    // Allowlist
    function initAllowlistV1(address admin, address allower) external;

    // River
    function initRiverV1(
        address depositContractAddress,
        address elFeeRecipientAddress,
        bytes32 withdrawalCredentials,
        address oracleAddress,
        address systemAdministratorAddress,
        address allowlistAddress,
        address operatorRegistryAddress,
        address collectorAddress,
        uint256 globalFee
    ) external;
    function initRiverV1_1(
        address redeemManager,
        uint64 epochsPerFrame,
        uint64 slotsPerEpoch,
        uint64 secondsPerSlot,
        uint64 genesisTime,
        uint64 epochsToAssumedFinality,
        uint256 annualAprUpperBound,
        uint256 relativeLowerBound,
        uint128 minDailyNetCommittableAmount,
        uint128 maxDailyRelativeCommittableAmount
    ) external;
    function setOracle(address oracleAddress) external;
    function getOracle() external view returns (address oracle);
    function getAdministrator() external view returns (address administrator);

    // Oracle
    function initOracleV1(
        address riverAddress,
        address administratorAddress,
        uint64 epochsPerFrame,
        uint64 slotsPerEpoch,
        uint64 secondsPerSlot,
        uint64 genesisTime,
        uint256 annualAprUpperBound,
        uint256 relativeLowerBound
    ) external;
    function getRiver() external view returns (address river);

    // OperatorsRegistry
    function initOperatorsRegistryV1(address admin, address river) external;
    function setOperatorLimits(
        uint256[] operatorIndexes,
        uint32[] newLimits,
        uint256 snapshotBlock
    ) external;
    function forceFundedValidatorKeysEventEmission(uint256 amountToEmit) external;

    // Satellites
    function initELFeeRecipientV1(address riverAddress) external;
    function initializeRedeemManagerV1(address river) external;
    function initializeWithdrawV1(address river) external;
    function getCredentials() external view returns (bytes32 credentials);
    function initCoverageFundV1(address riverAddress) external;
    function initWLSETHV1(address river) external;
    function initTLCV1(address account) external;
}

/// A contract call together with its human-readable rendering, kept in
/// deployment records
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedCall {
    /// The method name, e.g. `initRiverV1`
    pub method_name: String,
    /// The method signature, e.g. `initTLCV1(address)`
    pub signature: &'static str,
    /// The ABI-encoded calldata
    pub calldata: Bytes,
    /// The arguments, rendered as strings
    pub args: Vec<String>,
}

impl EncodedCall {
    /// Encode `call`, recording `args` as its rendering
    pub fn new<C: SolCall>(call: C, args: Vec<String>) -> Self {
        let method_name = C::SIGNATURE
            .split('(')
            .next()
            .unwrap_or(C::SIGNATURE)
            .to_string();

        Self {
            method_name,
            signature: C::SIGNATURE,
            calldata: call.abi_encode().into(),
            args,
        }
    }

    /// A one-line description of the call, for logs
    pub fn describe(&self) -> String {
        format!("{}({})", self.method_name, self.args.iter().join(", "))
    }
}

/// ABI-encoded constructor arguments together with their rendering
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstructorArgs {
    /// The ABI-encoded arguments, appended to the creation bytecode
    pub encoded: Bytes,
    /// The arguments, rendered as strings
    pub rendered: Vec<String>,
}

impl ConstructorArgs {
    /// A contract without constructor arguments
    pub fn none() -> Self {
        Self {
            encoded: Bytes::new(),
            rendered: Vec::new(),
        }
    }
}

/// The constructor arguments of a `Firewall` guarding `destination`:
/// `governor` may call everything, `executor` only `executor_can_call`
pub fn firewall_args(
    governor: Address,
    executor: Address,
    destination: Address,
    executor_can_call: Vec<FixedBytes<4>>,
) -> ConstructorArgs {
    let rendered = vec![
        governor.to_string(),
        executor.to_string(),
        destination.to_string(),
        format!("[{}]", executor_can_call.iter().join(",")),
    ];
    let encoded = (governor, executor, destination, executor_can_call).abi_encode_params();

    ConstructorArgs {
        encoded: encoded.into(),
        rendered,
    }
}

/// The constructor arguments of a `TUPProxy` delegating to `logic`, administered
/// by `admin` and executing `data` on construction
pub fn proxy_args(logic: Address, admin: Address, data: Bytes) -> ConstructorArgs {
    let rendered = vec![logic.to_string(), admin.to_string(), data.to_string()];
    let encoded = (logic, admin, data).abi_encode_params();

    ConstructorArgs {
        encoded: encoded.into(),
        rendered,
    }
}

/// The selector of a call, as accepted by the firewall constructor
pub fn selector<C: SolCall>() -> FixedBytes<4> {
    FixedBytes(C::SELECTOR)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::hex;

    use super::*;

    #[test]
    fn test_selectors() {
        assert_eq!(selector::<pauseCall>(), FixedBytes(hex!("8456cb59")));
        assert_eq!(selector::<upgradeToCall>(), FixedBytes(hex!("3659cfe6")));
        assert_eq!(
            selector::<upgradeToAndCallCall>(),
            FixedBytes(hex!("4f1ef286"))
        );
    }

    #[test]
    fn test_encoded_call_rendering() {
        let river = Address::repeat_byte(0x11);
        let call = EncodedCall::new(
            initWLSETHV1Call { river },
            vec![river.to_string()],
        );

        assert_eq!(call.method_name, "initWLSETHV1");
        assert_eq!(call.signature, "initWLSETHV1(address)");
        assert_eq!(&call.calldata[..4], &initWLSETHV1Call::SELECTOR);
        assert_eq!(call.describe(), format!("initWLSETHV1({river})"));
    }

    #[test]
    fn test_firewall_args_layout() {
        let args = firewall_args(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            Address::repeat_byte(3),
            vec![selector::<pauseCall>()],
        );

        // 3 addresses, array offset, array length, one bytes4 element
        assert_eq!(args.encoded.len(), 6 * 32);
        assert_eq!(&args.encoded[12..32], Address::repeat_byte(1).as_slice());
        assert_eq!(&args.encoded[5 * 32..5 * 32 + 4], &hex!("8456cb59"));
        assert_eq!(args.rendered[3], "[0x8456cb59]");
    }
}
