//! Gateway configuration
//!
//! `Config` is the process-level configuration assembled from CLI flags and
//! environment variables. `ChainParameters` holds the immutable chain values
//! (address prefix, denominations, gas schedule) every component receives at
//! construction time.

use crate::core::currency::STAKING_DENOM;
use crate::core::Dec;
use crate::crypto::module_address;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Blockchain name reported in network identifiers
pub const BLOCKCHAIN: &str = "Kava";

/// Default chain id
pub const DEFAULT_NETWORK: &str = "kava-4";

/// Rosetta API version implemented
pub const ROSETTA_VERSION: &str = "1.4.10";

/// Node software version reported by /network/options
pub const NODE_VERSION: &str = "0.14.2";

/// Bech32 prefix of account addresses
pub const ACCOUNT_PREFIX: &str = "kava";

/// Minimum gas price accepted by validators, in the fee denom
pub const DEFAULT_MIN_GAS_PRICE: &str = "0.001";

/// Gas charged for a message type without an explicit estimate
pub const DEFAULT_MSG_GAS: u64 = 200_000;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid mode: {0} (expected online or offline)")]
    InvalidMode(String),
    #[error("Missing {0} for online mode")]
    MissingUrl(&'static str),
    #[error("Invalid URL {0}: expected an http:// or https:// endpoint")]
    InvalidUrl(String),
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),
}

/// Whether the gateway may reach a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Online,
    Offline,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "online" => Ok(Mode::Online),
            "offline" => Ok(Mode::Offline),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Online => write!(f, "online"),
            Mode::Offline => write!(f, "offline"),
        }
    }
}

/// Immutable chain values shared by every component
#[derive(Debug, Clone, PartialEq)]
pub struct ChainParameters {
    pub blockchain: String,
    pub chain_id: String,
    pub account_prefix: String,
    pub staking_denom: String,
    pub fee_denom: String,
    pub min_gas_price: Dec,
    /// Gas estimate per message type
    pub msg_gas: BTreeMap<String, u64>,
    pub fee_collector: String,
}

impl ChainParameters {
    /// Kava mainnet-style parameters for the given chain id
    pub fn kava(chain_id: &str) -> Self {
        let mut msg_gas = BTreeMap::new();
        msg_gas.insert("cosmos-sdk/MsgSend".to_string(), 100_000);

        Self {
            blockchain: BLOCKCHAIN.to_string(),
            chain_id: chain_id.to_string(),
            account_prefix: ACCOUNT_PREFIX.to_string(),
            staking_denom: STAKING_DENOM.to_string(),
            fee_denom: STAKING_DENOM.to_string(),
            min_gas_price: Dec::from_str(DEFAULT_MIN_GAS_PRICE).unwrap_or_else(|_| Dec::zero()),
            msg_gas,
            fee_collector: module_address("fee_collector", ACCOUNT_PREFIX).unwrap_or_default(),
        }
    }

    /// Gas estimate for a message type
    pub fn gas_for(&self, msg_type: &str) -> u64 {
        self.msg_gas
            .get(msg_type)
            .copied()
            .unwrap_or(DEFAULT_MSG_GAS)
    }
}

/// Process configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub network: String,
    pub port: u16,
    /// Tendermint RPC endpoint, e.g. http://localhost:26657
    pub rpc_url: Option<String>,
    /// LCD REST endpoint, e.g. http://localhost:1317
    pub lcd_url: Option<String>,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Online,
            network: DEFAULT_NETWORK.to_string(),
            port: 8000,
            rpc_url: Some("http://localhost:26657".to_string()),
            lcd_url: Some("http://localhost:1317".to_string()),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.trim().is_empty() {
            return Err(ConfigError::InvalidNetwork(self.network.clone()));
        }
        if self.mode == Mode::Offline {
            return Ok(());
        }
        for (name, url) in [("rpc url", &self.rpc_url), ("lcd url", &self.lcd_url)] {
            match url {
                None => return Err(ConfigError::MissingUrl(name)),
                Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                    return Err(ConfigError::InvalidUrl(url.clone()))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    pub fn chain_parameters(&self) -> ChainParameters {
        ChainParameters::kava(&self.network)
    }
}
