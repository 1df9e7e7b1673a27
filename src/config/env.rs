//! Environment-variable configuration
//!
//! Resolution order for each setting:
//! 1. An explicit `OMNIWALLET_*` override (highest priority)
//! 2. The preset for `OMNIWALLET_NETWORK` (defaults to testnet)
//!
//! # Examples
//!
//! ```bash
//! export OMNIWALLET_NETWORK=testnet
//! export OMNIWALLET_CONTRACT_ID="CAE432Y727GMA7NSINQHFTENA22N7S3F4XUQZFQCZNDP74OFX4DZET24"
//!
//! # Optional fee-sponsoring relay
//! export OMNIWALLET_RELAY_URL="https://testnet.launchtube.xyz"
//! export OMNIWALLET_RELAY_TOKEN="eyJhbGciOi..."
//! ```

use std::collections::HashMap;

use super::{Config, Network, NetworkConfig, RelayConfig};
use crate::{Error, Result};

/// Environment variable names
pub mod vars {
    pub const NETWORK: &str = "OMNIWALLET_NETWORK";
    pub const RPC_URL: &str = "OMNIWALLET_RPC_URL";
    pub const HORIZON_URL: &str = "OMNIWALLET_HORIZON_URL";
    pub const NETWORK_PASSPHRASE: &str = "OMNIWALLET_NETWORK_PASSPHRASE";
    pub const CONTRACT_ID: &str = "OMNIWALLET_CONTRACT_ID";
    pub const RELAY_URL: &str = "OMNIWALLET_RELAY_URL";
    pub const RELAY_TOKEN: &str = "OMNIWALLET_RELAY_TOKEN";
    pub const SPONSOR_SECRET: &str = "OMNIWALLET_SPONSOR_SECRET";
    pub const ETH_PRIVATE_KEY: &str = "ETH_PRIVATE_KEY";
}

impl Config {
    /// Build a config from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Build a config from an explicit variable map
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let get = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();

        let network = match get(vars::NETWORK) {
            Some(name) => Network::from_name(&name)
                .ok_or_else(|| Error::Config(format!("unknown network: {}", name)))?,
            None => Network::Testnet,
        };
        tracing::debug!(network = network.name(), "Resolving network preset");

        let contract_id = get(vars::CONTRACT_ID).ok_or_else(|| {
            Error::Config(format!(
                "{} not set. Required to address the smart account.",
                vars::CONTRACT_ID
            ))
        })?;

        let mut network_config = NetworkConfig::for_network(network, contract_id);

        if let Some(url) = get(vars::RPC_URL) {
            tracing::debug!("Using {} for Soroban RPC", vars::RPC_URL);
            network_config.rpc_url = url;
        }
        if let Some(url) = get(vars::HORIZON_URL) {
            tracing::debug!("Using {} for Horizon", vars::HORIZON_URL);
            network_config.horizon_url = url;
        }
        if let Some(passphrase) = get(vars::NETWORK_PASSPHRASE) {
            tracing::debug!("Using {} override", vars::NETWORK_PASSPHRASE);
            network_config.passphrase = passphrase;
        }

        let relay = match (get(vars::RELAY_URL), get(vars::RELAY_TOKEN)) {
            (Some(url), Some(token)) => Some(RelayConfig::new(url, token)),
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!(
                    "Relay needs both {} and {}; relay submission disabled",
                    vars::RELAY_URL,
                    vars::RELAY_TOKEN
                );
                None
            }
            (None, None) => None,
        };

        let config = Config {
            network: network_config,
            relay,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: &str = "CAE432Y727GMA7NSINQHFTENA22N7S3F4XUQZFQCZNDP74OFX4DZET24";

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_to_testnet() {
        let config = Config::from_vars(env(&[(vars::CONTRACT_ID, CONTRACT)])).unwrap();
        assert_eq!(config.network.passphrase, Network::Testnet.passphrase());
        assert!(config.relay.is_none());
    }

    #[test]
    fn explicit_urls_override_preset() {
        let config = Config::from_vars(env(&[
            (vars::NETWORK, "mainnet"),
            (vars::CONTRACT_ID, CONTRACT),
            (vars::RPC_URL, "https://rpc.example.org"),
        ]))
        .unwrap();
        assert_eq!(config.network.rpc_url, "https://rpc.example.org");
        assert_eq!(config.network.passphrase, Network::Mainnet.passphrase());
    }

    #[test]
    fn missing_contract_id_fails() {
        let err = Config::from_vars(env(&[(vars::NETWORK, "testnet")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn unknown_network_fails() {
        let err = Config::from_vars(env(&[
            (vars::NETWORK, "devnet"),
            (vars::CONTRACT_ID, CONTRACT),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn relay_requires_url_and_token() {
        let config = Config::from_vars(env(&[
            (vars::CONTRACT_ID, CONTRACT),
            (vars::RELAY_URL, "https://relay.example.org"),
        ]))
        .unwrap();
        assert!(config.relay.is_none());

        let config = Config::from_vars(env(&[
            (vars::CONTRACT_ID, CONTRACT),
            (vars::RELAY_URL, "https://relay.example.org"),
            (vars::RELAY_TOKEN, "jwt"),
        ]))
        .unwrap();
        assert_eq!(config.relay.unwrap().url, "https://relay.example.org");
    }
}
