//! Configuration for the smart-account bridge
//!
//! Every component takes its settings from an explicit [`Config`] value, so
//! several networks (testnet, mainnet) can be driven from one process.

pub mod env;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use url::Url;

use crate::auth::network_id;
use crate::strkey::ContractId;
use crate::{Error, Result};

/// Base fee per operation, in stroops
pub const BASE_FEE: u32 = 100;

/// Ledgers an authorization signature stays valid for
pub const DEFAULT_LEDGERS_TO_LIVE: u32 = 5;

/// Supported Stellar networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Testnet,
    Mainnet,
    Futurenet,
}

impl Network {
    /// Passphrase whose SHA-256 is the network id
    pub fn passphrase(&self) -> &'static str {
        match self {
            Network::Testnet => "Test SDF Network ; September 2015",
            Network::Mainnet => "Public Global Stellar Network ; September 2015",
            Network::Futurenet => "Test SDF Future Network ; October 2022",
        }
    }

    /// Public Soroban RPC endpoint, where one exists
    pub fn default_rpc_url(&self) -> Option<&'static str> {
        match self {
            Network::Testnet => Some("https://soroban-testnet.stellar.org"),
            Network::Futurenet => Some("https://rpc-futurenet.stellar.org"),
            Network::Mainnet => None,
        }
    }

    pub fn default_horizon_url(&self) -> &'static str {
        match self {
            Network::Testnet => "https://horizon-testnet.stellar.org",
            Network::Mainnet => "https://horizon.stellar.org",
            Network::Futurenet => "https://horizon-futurenet.stellar.org",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
            Network::Futurenet => "futurenet",
        }
    }

    /// Parse a network name; `public` is accepted for mainnet
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "testnet" => Some(Network::Testnet),
            "mainnet" | "public" => Some(Network::Mainnet),
            "futurenet" => Some(Network::Futurenet),
            _ => None,
        }
    }
}

/// Ledger-side settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network passphrase hashed into every signature payload
    pub passphrase: String,
    /// Soroban RPC endpoint
    pub rpc_url: String,
    /// Horizon endpoint (account sequence lookups)
    pub horizon_url: String,
    /// The smart account contract (C... strkey)
    pub contract_id: String,
    /// Fee in stroops every simulation pass starts from
    #[serde(default = "default_base_fee")]
    pub base_fee: u32,
    /// Authorization validity window, in ledgers
    #[serde(default = "default_ledgers_to_live")]
    pub ledgers_to_live: u32,
    /// Upper time bound for transactions; 0 leaves it open
    #[serde(default)]
    pub tx_timeout_secs: u64,
    /// How many times to poll for a submitted transaction's status
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,
    /// Delay between status polls (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Deadline for the external signer; no deadline when unset
    #[serde(default)]
    pub signer_timeout_ms: Option<u64>,
}

fn default_base_fee() -> u32 {
    BASE_FEE
}

fn default_ledgers_to_live() -> u32 {
    DEFAULT_LEDGERS_TO_LIVE
}

fn default_poll_attempts() -> u32 {
    20
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

impl NetworkConfig {
    /// Preset endpoints for a network
    ///
    /// # Arguments
    /// * `network` - Which public network's passphrase and endpoints to use
    /// * `contract_id` - The smart account (C... strkey); there is no default
    ///
    /// Mainnet has no public Soroban RPC, so its `rpc_url` is left empty and
    /// [`NetworkConfig::validate`] fails until one is set.
    pub fn for_network(network: Network, contract_id: impl Into<String>) -> Self {
        Self {
            passphrase: network.passphrase().to_string(),
            rpc_url: network.default_rpc_url().unwrap_or_default().to_string(),
            horizon_url: network.default_horizon_url().to_string(),
            contract_id: contract_id.into(),
            base_fee: BASE_FEE,
            ledgers_to_live: DEFAULT_LEDGERS_TO_LIVE,
            tx_timeout_secs: 0,
            poll_attempts: default_poll_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
            signer_timeout_ms: None,
        }
    }

    /// Parsed smart account id
    pub fn contract(&self) -> Result<ContractId> {
        Ok(self.contract_id.parse()?)
    }

    /// SHA-256 of the passphrase
    pub fn network_id(&self) -> stellar_xdr::curr::Hash {
        network_id(&self.passphrase)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn signer_timeout(&self) -> Option<Duration> {
        self.signer_timeout_ms.map(Duration::from_millis)
    }

    /// Check endpoints parse as URLs, the contract id decodes and the
    /// validity window is non-zero
    pub fn validate(&self) -> Result<()> {
        if self.passphrase.is_empty() {
            return Err(Error::Config("network passphrase is empty".to_string()));
        }
        for (name, value) in [("rpc_url", &self.rpc_url), ("horizon_url", &self.horizon_url)] {
            Url::parse(value)
                .map_err(|e| Error::Config(format!("invalid {}: {} ({})", name, value, e)))?;
        }
        self.contract()?;
        if self.ledgers_to_live == 0 {
            return Err(Error::Config("ledgers_to_live must be positive".to_string()));
        }
        Ok(())
    }
}

/// Fee-sponsoring relay endpoint
#[derive(Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Submission endpoint (form POST of `xdr` and `fee`)
    pub url: String,
    /// Bearer token; never serialized back out
    #[serde(skip_serializing, deserialize_with = "deserialize_secret")]
    pub token: SecretString,
}

impl RelayConfig {
    /// Create a relay config
    ///
    /// # Security
    /// The token is moved into a `SecretString` straight away and only
    /// exposed when the request header is written.
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: SecretString::from(token.into()),
        }
    }
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("url", &self.url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ledger endpoints, account and fee settings
    pub network: NetworkConfig,
    /// Relay for sponsored submission; `--relay` needs one
    #[serde(default)]
    pub relay: Option<RelayConfig>,
}

impl Config {
    /// Load a JSON config file
    ///
    /// # Arguments
    /// * `path` - JSON file holding `network` and an optional `relay`
    ///
    /// The loaded config is validated before it is returned.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.network.validate()?;
        if let Some(relay) = &self.relay {
            Url::parse(&relay.url)
                .map_err(|e| Error::Config(format!("invalid relay url: {} ({})", relay.url, e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONTRACT: &str = "CAE432Y727GMA7NSINQHFTENA22N7S3F4XUQZFQCZNDP74OFX4DZET24";

    #[test]
    fn testnet_preset_is_valid() {
        let config = NetworkConfig::for_network(Network::Testnet, CONTRACT);
        assert!(config.validate().is_ok());
        assert_eq!(config.ledgers_to_live, DEFAULT_LEDGERS_TO_LIVE);
        assert_eq!(config.base_fee, BASE_FEE);
    }

    #[test]
    fn mainnet_without_rpc_url_is_rejected() {
        let config = NetworkConfig::for_network(Network::Mainnet, CONTRACT);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn malformed_contract_id_is_rejected() {
        let config = NetworkConfig::for_network(Network::Testnet, "CNOTACONTRACT");
        assert!(matches!(config.validate(), Err(Error::StrKey(_))));
    }

    #[test]
    fn loads_config_file_with_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        let json = serde_json::json!({
            "network": {
                "passphrase": Network::Testnet.passphrase(),
                "rpc_url": "https://soroban-testnet.stellar.org",
                "horizon_url": "https://horizon-testnet.stellar.org",
                "contract_id": CONTRACT
            },
            "relay": {
                "url": "https://relay.example.org",
                "token": "jwt-token"
            }
        });
        write!(file, "{}", json).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.network.base_fee, 100);
        assert_eq!(config.network.poll_attempts, 20);
        assert!(config.network.signer_timeout().is_none());
        let relay = config.relay.unwrap();
        assert_eq!(relay.token.expose_secret(), "jwt-token");
    }

    #[test]
    fn relay_token_is_redacted() {
        let relay = RelayConfig::new("https://relay.example.org", "super-secret");
        assert!(!format!("{:?}", relay).contains("super-secret"));
        let json = serde_json::to_string(&relay).unwrap();
        assert!(!json.contains("super-secret"));
    }

    #[test]
    fn two_networks_coexist() {
        let testnet = NetworkConfig::for_network(Network::Testnet, CONTRACT);
        let futurenet = NetworkConfig::for_network(Network::Futurenet, CONTRACT);
        assert_ne!(testnet.network_id(), futurenet.network_id());
    }
}
