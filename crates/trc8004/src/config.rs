//! Client configuration.
//!
//! Configuration is an explicit value. It can be built in code, parsed from
//! JSON, or read from a file; environment overrides apply only when the
//! caller asks for them with [`ClientConfig::apply_env`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trc8004_core::Address;
use trc8004_fetch::FetchConfig;

/// Environment variable naming a preferred gateway.
pub const ENV_GATEWAY: &str = "IPFS_GATEWAY_URL";

/// Environment variable selecting the network.
pub const ENV_NETWORK: &str = "TRC8004_NETWORK";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}

/// A ledger network with a public RPC endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Shasta,
    Nile,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Shasta => "shasta",
            Self::Nile => "nile",
        }
    }

    /// The public RPC endpoint for this network.
    pub fn rpc_url(self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.trongrid.io",
            Self::Shasta => "https://api.shasta.trongrid.io",
            Self::Nile => "https://nile.trongrid.io",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "shasta" => Ok(Self::Shasta),
            "nile" => Ok(Self::Nile),
            _ => Err(ConfigError::UnknownNetwork(s.to_string())),
        }
    }
}

/// Deployed registry contracts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractAddresses {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reputation: Option<Address>,
}

/// Configuration for [`RegistryClient`](crate::RegistryClient).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub network: Network,
    /// Overrides the network's RPC endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    pub contracts: ContractAddresses,
    pub fetch: FetchConfig,
}

impl ClientConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    pub fn with_contracts(mut self, contracts: ContractAddresses) -> Self {
        self.contracts = contracts;
        self
    }

    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    /// The RPC endpoint in effect.
    pub fn rpc_url(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| self.network.rpc_url())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`.
    ///
    /// [`ENV_GATEWAY`] becomes the preferred gateway; [`ENV_NETWORK`] selects
    /// the network. Empty values are ignored.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v: &String| !v.trim().is_empty());

        if let Some(network) = non_empty(ENV_NETWORK) {
            self.network = network.parse()?;
        }
        if let Some(gateway) = non_empty(ENV_GATEWAY) {
            self.fetch = self.fetch.with_preferred_gateway(gateway.trim());
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.rpc_url(), "https://api.trongrid.io");
        assert_eq!(config.contracts, ContractAddresses::default());
        assert_eq!(config.fetch, FetchConfig::default());
    }

    #[test]
    fn test_from_json() {
        let config = ClientConfig::from_json(
            r#"{
                "network": "nile",
                "contracts": {"identity": "41a614f803b6fd780986a42c78ec9c7f77e6ded13c"},
                "fetch": {"attempt_timeout_ms": 5000}
            }"#,
        )
        .unwrap();

        assert_eq!(config.network, Network::Nile);
        assert_eq!(config.rpc_url(), "https://nile.trongrid.io");
        assert!(config.contracts.identity.is_some());
        assert!(config.contracts.validation.is_none());
        assert_eq!(config.fetch.attempt_timeout_ms, 5000);
        assert_eq!(config.fetch.gateways.len(), 3);
    }

    #[test]
    fn test_unknown_network_rejected() {
        assert!(ClientConfig::from_json(r#"{"network": "ropsten"}"#).is_err());
        assert!(matches!(
            "ropsten".parse::<Network>(),
            Err(ConfigError::UnknownNetwork(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_NETWORK, "Shasta"),
            (ENV_GATEWAY, "https://gw.internal/ipfs"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::default()
            .apply_env_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.network, Network::Shasta);
        assert_eq!(config.fetch.gateways[0], "https://gw.internal/ipfs");
        assert_eq!(config.fetch.gateways.len(), 4);
    }

    #[test]
    fn test_empty_env_ignored() {
        let config = ClientConfig::default()
            .apply_env_from(|_| Some("  ".to_string()))
            .unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        std::fs::write(&path, r#"{"rpc_url": "http://localhost:9090"}"#).unwrap();

        let config = ClientConfig::from_file(&path).unwrap();
        assert_eq!(config.rpc_url(), "http://localhost:9090");

        let missing = ClientConfig::from_file(dir.path().join("absent.json"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
