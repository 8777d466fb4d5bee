//! The named per-network configuration table: chain ids, named accounts and
//! protocol parameters used by the migrations

use std::{
    fmt::{self, Display},
    fs,
    path::Path,
};

use alloy_primitives::{address, Address};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::errors::ScriptError;

/// The Ethereum beacon deposit contract on mainnet, also used by networks that
/// do not configure their own
const MAINNET_DEPOSIT_CONTRACT: Address = address!("00000000219ab540356cBB839Cbe05303d7705Fa");

/// The deposit contract on the Holesky testnet
const HOLESKY_DEPOSIT_CONTRACT: Address = address!("4242424242424242424242424242424242424242");

/// The networks the migrations can target
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Network {
    /// Ethereum mainnet
    #[value(name = "mainnet")]
    Mainnet,
    /// The Holesky testnet
    #[value(name = "holesky")]
    Holesky,
    /// The development deployment on Holesky
    #[value(name = "devHolesky")]
    DevHolesky,
    /// The Hoodi testnet
    #[value(name = "hoodi")]
    Hoodi,
    /// The development deployment on Hoodi
    #[value(name = "devHoodi")]
    DevHoodi,
    /// The Sepolia testnet
    #[value(name = "sepolia")]
    Sepolia,
    /// A Tenderly virtual testnet
    #[value(name = "tenderly")]
    Tenderly,
    /// A local development node, e.g. anvil
    #[value(name = "local")]
    Local,
}

impl Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Holesky => write!(f, "holesky"),
            Network::DevHolesky => write!(f, "devHolesky"),
            Network::Hoodi => write!(f, "hoodi"),
            Network::DevHoodi => write!(f, "devHoodi"),
            Network::Sepolia => write!(f, "sepolia"),
            Network::Tenderly => write!(f, "tenderly"),
            Network::Local => write!(f, "local"),
        }
    }
}

impl Network {
    /// The chain id the RPC endpoint must report for this network.
    ///
    /// Tenderly virtual testnets use custom chain ids, so they are not checked.
    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Network::Mainnet => Some(1),
            Network::Holesky | Network::DevHolesky => Some(17000),
            Network::Hoodi | Network::DevHoodi => Some(560048),
            Network::Sepolia => Some(11155111),
            Network::Local => Some(31337),
            Network::Tenderly => None,
        }
    }

    /// Whether deployed contracts should be submitted to a block explorer
    pub fn supports_explorer_verification(&self) -> bool {
        !matches!(self, Network::Local | Network::Tenderly)
    }

    /// Check that the RPC endpoint's chain id matches this network
    pub fn check_chain_id(&self, chain_id: u64) -> Result<(), ScriptError> {
        match self.chain_id() {
            Some(expected) if expected != chain_id => Err(ScriptError::InvalidNetwork(format!(
                "{self} expects chain id {expected}, RPC reports {chain_id}"
            ))),
            _ => Ok(()),
        }
    }

    /// The protocol parameters used when initializing contracts on this network
    pub fn params(&self) -> NetworkParams {
        // River reports on short frames on devHoodi and local nodes
        let dev = NetworkParams {
            river_epochs_per_frame: 2,
            ..NetworkParams::MAINNET
        };

        match self {
            Network::Mainnet => NetworkParams::MAINNET,
            Network::Holesky => NetworkParams {
                genesis_timestamp: 1695902400,
                ..NetworkParams::MAINNET
            },
            Network::DevHolesky | Network::Tenderly => NetworkParams {
                genesis_timestamp: 1695902400,
                gross_fee: 1250,
                ..NetworkParams::MAINNET
            },
            Network::Hoodi => NetworkParams {
                genesis_timestamp: 1742213400,
                ..NetworkParams::MAINNET
            },
            Network::DevHoodi => NetworkParams {
                genesis_timestamp: 1742213400,
                ..dev
            },
            Network::Sepolia => NetworkParams {
                genesis_timestamp: 1655733600,
                ..NetworkParams::MAINNET
            },
            Network::Local => dev,
        }
    }

    /// The built-in named accounts for this network
    pub fn named_accounts(&self) -> NamedAccounts {
        match self {
            Network::Mainnet => NamedAccounts {
                governor: Some(address!("E3208Aa9d1186c1D1C8A5b76E794b2B68E6cb3a5")),
                executor: Some(address!("DE55C9dc78f985fE1502484Cb98EBfAB66A56B62")),
                proxy_administrator: Some(address!("8EE3fC0Bcd7B57429203751C5bE5fdf1AB8409f3")),
                collector: Some(address!("E3208Aa9d1186c1D1C8A5b76E794b2B68E6cb3a5")),
                tlc_mint_account: Some(address!("070cbF96cac223D88401D6227577f9FA480C57C8")),
                deposit_contract: Some(MAINNET_DEPOSIT_CONTRACT),
            },
            Network::Holesky => NamedAccounts {
                governor: Some(address!("9F84E1a8749D331C68Fb0322C9E24a5FB3334398")),
                executor: Some(address!("E22F86Be928E03D50411C588d689C0f33900bb4c")),
                proxy_administrator: Some(address!("80Cf8bD4abf6C078C313f72588720AB86d45c5E6")),
                collector: Some(address!("47f049e943ABFbd27Bb11aF3195FEc153A28598b")),
                tlc_mint_account: Some(address!("b85f6480A2BffF946Ca1874ad6E2bB55a4CF5059")),
                deposit_contract: Some(HOLESKY_DEPOSIT_CONTRACT),
            },
            Network::DevHolesky => NamedAccounts {
                governor: Some(address!("0e9eAd2FEB500DB46E6EB95b352FA4a86aC13dBE")),
                executor: Some(address!("e953E4df3dDd575D2C1E1950ec4Fa33CF89947DA")),
                proxy_administrator: Some(address!("0FdEe4562D7e6dbA05A9f892D2Be04B83f3E7579")),
                collector: Some(address!("c5DB3C539900B1A2889c37BEaE789D0EB57e8681")),
                tlc_mint_account: Some(address!("67AB27C56cDB02C6c0f8B89948350Ebbb1837577")),
                deposit_contract: Some(HOLESKY_DEPOSIT_CONTRACT),
            },
            Network::Tenderly => NamedAccounts {
                proxy_administrator: Some(address!("8EE3fC0Bcd7B57429203751C5bE5fdf1AB8409f3")),
                ..Network::DevHolesky.named_accounts()
            },
            Network::Sepolia => NamedAccounts {
                proxy_administrator: Some(address!("341C40B94bF2afBFa42573cB78f16Ee15a056238")),
                deposit_contract: Some(MAINNET_DEPOSIT_CONTRACT),
                ..NamedAccounts::default()
            },
            Network::Hoodi | Network::DevHoodi => NamedAccounts {
                deposit_contract: Some(MAINNET_DEPOSIT_CONTRACT),
                ..NamedAccounts::default()
            },
            Network::Local => NamedAccounts {
                governor: Some(address!("71c9DAb681C209bb82270906e3B49388b2C15404")),
                executor: Some(address!("71c9DAb681C209bb82270906e3B49388b2C15404")),
                proxy_administrator: Some(address!("07706A7D768054c10eB4FC9103Ea322f62831cb9")),
                collector: Some(address!("71c9DAb681C209bb82270906e3B49388b2C15404")),
                tlc_mint_account: Some(address!("7932EdA85E33D8e13f7C110ACBEb4a5A8B53dda9")),
                deposit_contract: Some(MAINNET_DEPOSIT_CONTRACT),
            },
        }
    }
}

/// Protocol parameters passed to the initializers
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NetworkParams {
    /// The beacon chain genesis timestamp
    pub genesis_timestamp: u64,
    /// The number of epochs in a reporting frame of the Oracle
    pub oracle_epochs_per_frame: u64,
    /// The number of epochs in a reporting frame of River
    pub river_epochs_per_frame: u64,
    /// The number of slots in an epoch
    pub slots_per_epoch: u64,
    /// The duration of a slot in seconds
    pub seconds_per_slot: u64,
    /// The number of epochs after which an epoch is assumed final
    pub epochs_to_assumed_finality: u64,
    /// The maximum annual APR the oracle may report, in basis points
    pub annual_apr_upper_bound: u64,
    /// The maximum relative balance decrease the oracle may report, in basis points
    pub relative_lower_bound: u64,
    /// The minimum daily amount of ETH committable to deposits, in wei
    pub min_daily_net_committable: u128,
    /// The maximum daily committable amount relative to the balance, in basis points
    pub max_daily_relative_committable: u128,
    /// The fee River takes on rewards, in basis points
    pub gross_fee: u64,
}

impl NetworkParams {
    /// The parameters used on Ethereum mainnet
    pub const MAINNET: NetworkParams = NetworkParams {
        genesis_timestamp: 1606824023,
        oracle_epochs_per_frame: 225,
        river_epochs_per_frame: 225,
        slots_per_epoch: 32,
        seconds_per_slot: 12,
        epochs_to_assumed_finality: 4,
        annual_apr_upper_bound: 1000,
        relative_lower_bound: 500,
        min_daily_net_committable: 3200 * 1_000_000_000_000_000_000,
        max_daily_relative_committable: 1000,
        gross_fee: 1000,
    };
}

/// The named accounts of a network.
///
/// The deployer is not part of this table; it is the account of the private key
/// the scripts run with.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedAccounts {
    /// The protocol governor, admin of the firewalls
    pub governor: Option<Address>,
    /// The executor, allowed a subset of methods through the firewalls
    pub executor: Option<Address>,
    /// The administrator of the proxies, behind the proxy firewalls
    pub proxy_administrator: Option<Address>,
    /// The fee collector
    pub collector: Option<Address>,
    /// The account receiving the initial TLC supply
    pub tlc_mint_account: Option<Address>,
    /// The beacon chain deposit contract
    pub deposit_contract: Option<Address>,
}

/// Unwrap a named account, naming it in the error when missing
fn required(account: Option<Address>, name: &'static str) -> Result<Address, ScriptError> {
    account.ok_or(ScriptError::MissingNamedAccount(name))
}

impl NamedAccounts {
    /// The governor account
    pub fn governor(&self) -> Result<Address, ScriptError> {
        required(self.governor, "governor")
    }

    /// The executor account
    pub fn executor(&self) -> Result<Address, ScriptError> {
        required(self.executor, "executor")
    }

    /// The proxy administrator account
    pub fn proxy_administrator(&self) -> Result<Address, ScriptError> {
        required(self.proxy_administrator, "proxyAdministrator")
    }

    /// The collector account
    pub fn collector(&self) -> Result<Address, ScriptError> {
        required(self.collector, "collector")
    }

    /// The TLC mint account
    pub fn tlc_mint_account(&self) -> Result<Address, ScriptError> {
        required(self.tlc_mint_account, "tlcMintAccount")
    }

    /// The deposit contract
    pub fn deposit_contract(&self) -> Result<Address, ScriptError> {
        required(self.deposit_contract, "depositContract")
    }

    /// Overlay the accounts set in `overrides` on top of these
    pub fn with_overrides(self, overrides: NamedAccounts) -> NamedAccounts {
        NamedAccounts {
            governor: overrides.governor.or(self.governor),
            executor: overrides.executor.or(self.executor),
            proxy_administrator: overrides.proxy_administrator.or(self.proxy_administrator),
            collector: overrides.collector.or(self.collector),
            tlc_mint_account: overrides.tlc_mint_account.or(self.tlc_mint_account),
            deposit_contract: overrides.deposit_contract.or(self.deposit_contract),
        }
    }

    /// Load account overrides from a JSON file
    pub fn from_file(path: &Path) -> Result<NamedAccounts, ScriptError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ScriptError::InvalidInput(format!("reading {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| ScriptError::InvalidInput(format!("parsing {}: {}", path.display(), e)))
    }

    /// The configured accounts as `(name, address)` pairs, deployer first
    pub fn entries(&self, deployer: Option<Address>) -> Vec<(&'static str, Address)> {
        [
            ("deployer", deployer),
            ("governor", self.governor),
            ("executor", self.executor),
            ("proxyAdministrator", self.proxy_administrator),
            ("collector", self.collector),
            ("tlcMintAccount", self.tlc_mint_account),
            ("depositContract", self.deposit_contract),
        ]
        .into_iter()
        .filter_map(|(name, account)| account.map(|address| (name, address)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_precondition() {
        assert!(Network::Holesky.check_chain_id(17000).is_ok());
        assert!(matches!(
            Network::Mainnet.check_chain_id(17000),
            Err(ScriptError::InvalidNetwork(_))
        ));
        // Tenderly forks report arbitrary chain ids
        assert!(Network::Tenderly.check_chain_id(73571).is_ok());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let overrides: NamedAccounts = serde_json::from_str(
            r#"{ "governor": "0x1111111111111111111111111111111111111111" }"#,
        )
        .unwrap();
        let merged = Network::Local.named_accounts().with_overrides(overrides);

        assert_eq!(
            merged.governor().unwrap(),
            address!("1111111111111111111111111111111111111111")
        );
        assert_eq!(
            merged.executor().unwrap(),
            Network::Local.named_accounts().executor().unwrap()
        );
    }

    #[test]
    fn test_dev_params() {
        let dev_hoodi = Network::DevHoodi.params();
        assert_eq!(dev_hoodi.genesis_timestamp, 1742213400);
        assert_eq!(dev_hoodi.oracle_epochs_per_frame, 225);
        assert_eq!(dev_hoodi.river_epochs_per_frame, 2);
        assert_eq!(dev_hoodi.gross_fee, 1000);

        let dev_holesky = Network::DevHolesky.params();
        assert_eq!(dev_holesky.genesis_timestamp, 1695902400);
        assert_eq!(dev_holesky.oracle_epochs_per_frame, 225);
        assert_eq!(dev_holesky.river_epochs_per_frame, 225);
        assert_eq!(dev_holesky.gross_fee, 1250);

        assert_eq!(Network::Local.params().river_epochs_per_frame, 2);
        assert_eq!(Network::Mainnet.params(), NetworkParams::MAINNET);
    }

    #[test]
    fn test_missing_account_is_named() {
        let err = Network::Hoodi.named_accounts().governor().unwrap_err();
        assert!(err.to_string().contains("governor"));
    }
}
