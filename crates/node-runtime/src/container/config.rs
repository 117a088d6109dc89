//! # Node Configuration
//!
//! Runtime parameters for one node, loaded from `QV_*` environment variables.
//!
//! ## Security Requirements
//!
//! - Every node of a network MUST share the same `QV_ENC_KEY`; a node that
//!   generates its own key cannot read what its peers send it
//! - All timeouts have sane defaults with override capability

use std::path::PathBuf;
use std::time::Duration;

use qv_01_peer_transport::TcpTransportConfig;
use qv_02_blob_store::PathLayout;
use qv_03_replication::{ServerConfig, DEFAULT_IO_TIMEOUT, DEFAULT_RETRIEVAL_TIMEOUT};
use shared_crypto::{derive_network_key, CryptoError, SecretKey};
use thiserror::Error;

/// Environment variable names.
pub mod env_keys {
    pub const LISTEN_ADDR: &str = "QV_LISTEN_ADDR";
    pub const STORAGE_ROOT: &str = "QV_STORAGE_ROOT";
    pub const ENC_KEY: &str = "QV_ENC_KEY";
    pub const NETWORK_PASSPHRASE: &str = "QV_NETWORK_PASSPHRASE";
    pub const BOOTSTRAP_NODES: &str = "QV_BOOTSTRAP_NODES";
    pub const PATH_TRANSFORM: &str = "QV_PATH_TRANSFORM";
    pub const IO_TIMEOUT_MS: &str = "QV_IO_TIMEOUT_MS";
    pub const RETRIEVAL_TIMEOUT_MS: &str = "QV_RETRIEVAL_TIMEOUT_MS";
    pub const DIAL_TIMEOUT_MS: &str = "QV_DIAL_TIMEOUT_MS";
    pub const STREAM_TIMEOUT_MS: &str = "QV_STREAM_TIMEOUT_MS";
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The shared network key is missing.
    #[error(
        "SECURITY VIOLATION: no network key configured. \
         Set {} (64 hex chars) or {} to the same value on every node.",
        env_keys::ENC_KEY,
        env_keys::NETWORK_PASSPHRASE
    )]
    MissingEncryptionKey,

    #[error("{var}: invalid network key: {source}")]
    InvalidEncryptionKey {
        var: &'static str,
        #[source]
        source: CryptoError,
    },

    #[error("{var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Address the transport listens on, e.g. `0.0.0.0:3000`.
    pub listen_addr: String,
    /// Root directory of the local blob store.
    pub storage_root: PathBuf,
    /// Network key shared by all nodes. Generated when absent.
    pub enc_key: Option<SecretKey>,
    /// Addresses dialed at startup.
    pub bootstrap_nodes: Vec<String>,
    /// Key to path mapping of the blob store.
    pub path_layout: PathLayout,
    /// Longest a single network read or write may stall.
    pub io_timeout: Duration,
    /// How long a remote retrieval waits for peers.
    pub retrieval_timeout: Duration,
    /// Bound on establishing an outbound connection.
    pub dial_timeout: Duration,
    /// Window in which an announced stream must be opened or make progress.
    pub stream_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let transport = TcpTransportConfig::default();
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            storage_root: PathBuf::from("./qv-data"),
            enc_key: None,
            bootstrap_nodes: Vec::new(),
            path_layout: PathLayout::default(),
            io_timeout: DEFAULT_IO_TIMEOUT,
            retrieval_timeout: DEFAULT_RETRIEVAL_TIMEOUT,
            dial_timeout: transport.dial_timeout,
            stream_timeout: transport.stream_timeout,
        }
    }
}

impl NodeConfig {
    /// Load configuration from the process environment.
    ///
    /// Unset variables keep their defaults; set but malformed ones are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(addr) = get(env_keys::LISTEN_ADDR) {
            config.listen_addr = addr.trim().to_string();
        }
        if let Some(root) = get(env_keys::STORAGE_ROOT) {
            config.storage_root = PathBuf::from(root.trim());
        }
        if let Some(key) = get(env_keys::ENC_KEY) {
            let key = SecretKey::from_hex(key.trim()).map_err(|source| {
                ConfigError::InvalidEncryptionKey {
                    var: env_keys::ENC_KEY,
                    source,
                }
            })?;
            config.enc_key = Some(key);
        }
        if let Some(passphrase) = get(env_keys::NETWORK_PASSPHRASE) {
            if config.enc_key.is_some() {
                return Err(ConfigError::InvalidValue {
                    var: env_keys::NETWORK_PASSPHRASE,
                    reason: format!("conflicts with {}; set only one", env_keys::ENC_KEY),
                });
            }
            config.enc_key = Some(derive_network_key(&passphrase));
        }
        if let Some(nodes) = get(env_keys::BOOTSTRAP_NODES) {
            config.bootstrap_nodes = parse_node_list(&nodes);
        }
        if let Some(layout) = get(env_keys::PATH_TRANSFORM) {
            config.path_layout = layout
                .parse()
                .map_err(|reason| ConfigError::InvalidValue {
                    var: env_keys::PATH_TRANSFORM,
                    reason,
                })?;
        }
        if let Some(ms) = get(env_keys::IO_TIMEOUT_MS) {
            config.io_timeout = parse_millis(env_keys::IO_TIMEOUT_MS, &ms)?;
        }
        if let Some(ms) = get(env_keys::RETRIEVAL_TIMEOUT_MS) {
            config.retrieval_timeout = parse_millis(env_keys::RETRIEVAL_TIMEOUT_MS, &ms)?;
        }
        if let Some(ms) = get(env_keys::DIAL_TIMEOUT_MS) {
            config.dial_timeout = parse_millis(env_keys::DIAL_TIMEOUT_MS, &ms)?;
        }
        if let Some(ms) = get(env_keys::STREAM_TIMEOUT_MS) {
            config.stream_timeout = parse_millis(env_keys::STREAM_TIMEOUT_MS, &ms)?;
        }

        Ok(config)
    }

    /// Check values that would make the node unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                var: env_keys::LISTEN_ADDR,
                reason: "listen address is empty".to_string(),
            });
        }
        if self.storage_root.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                var: env_keys::STORAGE_ROOT,
                reason: "storage root is empty".to_string(),
            });
        }
        for (var, value) in [
            (env_keys::IO_TIMEOUT_MS, self.io_timeout),
            (env_keys::RETRIEVAL_TIMEOUT_MS, self.retrieval_timeout),
            (env_keys::DIAL_TIMEOUT_MS, self.dial_timeout),
            (env_keys::STREAM_TIMEOUT_MS, self.stream_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    var,
                    reason: "timeout must be positive".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Validate configuration for production readiness.
    ///
    /// # Returns
    ///
    /// Returns `Err` if:
    /// - [`validate`](Self::validate) fails
    /// - no network key is configured
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.enc_key.is_none() {
            return Err(ConfigError::MissingEncryptionKey);
        }
        Ok(())
    }

    /// Ensure a network key is present, generating one if needed.
    ///
    /// Returns `true` if a key was generated.
    pub fn ensure_enc_key(&mut self) -> bool {
        if self.enc_key.is_some() {
            return false;
        }
        self.enc_key = Some(SecretKey::generate());
        true
    }

    /// Replication server parameters.
    ///
    /// A missing network key is replaced by a fresh one; call
    /// [`ensure_enc_key`](Self::ensure_enc_key) first to observe it.
    pub fn server_config(&self) -> ServerConfig {
        let enc_key = self.enc_key.clone().unwrap_or_else(SecretKey::generate);
        let mut config = ServerConfig::new(enc_key, self.storage_root.clone())
            .with_bootstrap_nodes(self.bootstrap_nodes.clone())
            .with_timeouts(self.io_timeout, self.retrieval_timeout);
        config.path_layout = self.path_layout;
        config
    }

    /// Transport parameters.
    pub fn transport_config(&self) -> TcpTransportConfig {
        TcpTransportConfig {
            stream_timeout: self.stream_timeout,
            io_timeout: self.io_timeout,
            dial_timeout: self.dial_timeout,
            ..TcpTransportConfig::new(self.listen_addr.clone())
        }
    }
}

/// Split a comma separated address list, dropping empty entries.
fn parse_node_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_millis(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| ConfigError::InvalidValue {
            var,
            reason: format!("expected milliseconds, got {raw:?}: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = NodeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
        assert_eq!(config.io_timeout, DEFAULT_IO_TIMEOUT);
        assert_eq!(config.retrieval_timeout, DEFAULT_RETRIEVAL_TIMEOUT);
        assert_eq!(config.path_layout, PathLayout::ContentAddressed);
        assert!(config.enc_key.is_none());
        assert!(config.bootstrap_nodes.is_empty());
    }

    #[test]
    fn test_overrides() {
        let key = SecretKey::generate();
        let hex = key.to_hex();
        let config = NodeConfig::from_lookup(lookup(&[
            (env_keys::LISTEN_ADDR, "127.0.0.1:4000"),
            (env_keys::STORAGE_ROOT, "/tmp/qv"),
            (env_keys::ENC_KEY, hex.as_str()),
            (env_keys::BOOTSTRAP_NODES, " 10.0.0.1:3000, ,10.0.0.2:3000,"),
            (env_keys::PATH_TRANSFORM, "plain"),
            (env_keys::IO_TIMEOUT_MS, "2500"),
            (env_keys::RETRIEVAL_TIMEOUT_MS, "750"),
        ]))
        .unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:4000");
        assert_eq!(config.storage_root, PathBuf::from("/tmp/qv"));
        assert_eq!(config.enc_key.as_ref().map(SecretKey::to_hex), Some(hex));
        assert_eq!(config.bootstrap_nodes, vec!["10.0.0.1:3000", "10.0.0.2:3000"]);
        assert_eq!(config.path_layout, PathLayout::Plain);
        assert_eq!(config.io_timeout, Duration::from_millis(2500));
        assert_eq!(config.retrieval_timeout, Duration::from_millis(750));
    }

    #[test]
    fn test_passphrase_derives_shared_key() {
        let a = NodeConfig::from_lookup(lookup(&[(env_keys::NETWORK_PASSPHRASE, "open sesame")]))
            .unwrap();
        let b = NodeConfig::from_lookup(lookup(&[(env_keys::NETWORK_PASSPHRASE, "open sesame")]))
            .unwrap();
        assert!(a.enc_key.is_some());
        assert_eq!(a.enc_key, b.enc_key);

        let key = SecretKey::generate().to_hex();
        let both = NodeConfig::from_lookup(lookup(&[
            (env_keys::ENC_KEY, key.as_str()),
            (env_keys::NETWORK_PASSPHRASE, "open sesame"),
        ]));
        assert!(matches!(
            both,
            Err(ConfigError::InvalidValue { var, .. }) if var == env_keys::NETWORK_PASSPHRASE
        ));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = NodeConfig::from_lookup(lookup(&[
            (env_keys::ENC_KEY, "  "),
            (env_keys::LISTEN_ADDR, ""),
        ]))
        .unwrap();
        assert!(config.enc_key.is_none());
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_malformed_values_rejected() {
        let bad_key = NodeConfig::from_lookup(lookup(&[(env_keys::ENC_KEY, "abcd")]));
        assert!(matches!(
            bad_key,
            Err(ConfigError::InvalidEncryptionKey { .. })
        ));

        let bad_layout = NodeConfig::from_lookup(lookup(&[(env_keys::PATH_TRANSFORM, "nested")]));
        assert!(matches!(
            bad_layout,
            Err(ConfigError::InvalidValue { var, .. }) if var == env_keys::PATH_TRANSFORM
        ));

        let bad_timeout = NodeConfig::from_lookup(lookup(&[(env_keys::IO_TIMEOUT_MS, "10s")]));
        assert!(matches!(
            bad_timeout,
            Err(ConfigError::InvalidValue { var, .. }) if var == env_keys::IO_TIMEOUT_MS
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = NodeConfig {
            retrieval_timeout: Duration::ZERO,
            ..NodeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { var, .. }) if var == env_keys::RETRIEVAL_TIMEOUT_MS
        ));
    }

    #[test]
    fn test_production_requires_key() {
        let mut config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert!(matches!(
            config.validate_for_production(),
            Err(ConfigError::MissingEncryptionKey)
        ));

        assert!(config.ensure_enc_key());
        assert!(!config.ensure_enc_key());
        assert!(config.validate_for_production().is_ok());
    }

    #[test]
    fn test_component_configs() {
        let mut config = NodeConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            bootstrap_nodes: vec!["127.0.0.1:9".to_string()],
            dial_timeout: Duration::from_millis(300),
            io_timeout: Duration::from_millis(1500),
            ..NodeConfig::default()
        };
        config.ensure_enc_key();

        let server = config.server_config();
        assert_eq!(server.bootstrap_nodes, config.bootstrap_nodes);
        assert_eq!(server.storage_root, config.storage_root);
        assert_eq!(
            server.enc_key.to_hex(),
            config.enc_key.as_ref().map(SecretKey::to_hex).unwrap()
        );

        let transport = config.transport_config();
        assert_eq!(transport.listen_addr, "127.0.0.1:0");
        assert_eq!(transport.dial_timeout, Duration::from_millis(300));
        // One stall bound for both the transport and the server.
        assert_eq!(transport.io_timeout, Duration::from_millis(1500));
        assert_eq!(server.io_timeout, Duration::from_millis(1500));
    }
}
