//! Configuration module for agentpay-server.
//!
//! Handles loading configuration from the TOML file, applying CLI and
//! environment overrides, validating the result and converting it into the
//! core runtime configuration.

pub mod file;

use crate::config::file::{FileConfig, NetworkKind};
use agentpay_core::config::{AgentConfig, LedgerNetwork, OperatorConfig, TopicsConfig};
use agentpay_core::registry::MerchantRegistry;
use agentpay_core::units::UnitConverter;
use agentpay_sdk::objects::{AccountId, Merchant, TopicId};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("invalid url: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Values taken from the command line or the environment. They win over
/// the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<SocketAddr>,
    pub network: Option<NetworkKind>,
    pub gateway_url: Option<Url>,
    pub account_id: Option<AccountId>,
    pub private_key: Option<String>,
    pub trigger_topic: Option<TopicId>,
    pub confirmation_topic: Option<TopicId>,
    pub feed_port: Option<u16>,
    pub audit_log: Option<PathBuf>,
}

impl Overrides {
    fn apply(&self, config: &mut FileConfig) {
        if let Some(listen) = self.listen {
            config.server.listen = Some(listen);
        }
        if let Some(network) = self.network {
            config.ledger.network = network;
        }
        if let Some(url) = &self.gateway_url {
            config.ledger.gateway_url = Some(url.clone());
        }
        if let Some(account_id) = self.account_id {
            config.operator.account_id = account_id;
        }
        if let Some(key) = &self.private_key {
            config.operator.private_key = Some(key.clone());
        }
        if let Some(topic) = self.trigger_topic {
            config.topics.trigger = topic;
        }
        if let Some(topic) = self.confirmation_topic {
            config.topics.confirmation = topic;
        }
        if let Some(port) = self.feed_port {
            config.feed.port = port;
        }
        if let Some(path) = &self.audit_log {
            config.audit.path = path.clone();
        }
    }
}

/// Fully validated configuration.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub seed_demo_deposits: bool,
    pub agent: AgentConfig,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    overrides: Overrides,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, overrides: Overrides) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            overrides,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file (a missing file means all defaults)
    /// 2. Apply CLI and environment overrides
    /// 3. Validate and convert into the runtime configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "Config file {:?} not found, using defaults",
                    self.config_path
                );
                FileConfig::default()
            }
            Err(e) => return Err(e.into()),
        };

        self.overrides.apply(&mut file_config);
        build_loaded_config(file_config)
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.topics.trigger == config.topics.confirmation {
        return Err(ConfigError::ValidationError(format!(
            "trigger and confirmation topics must differ (both are {})",
            config.topics.trigger
        )));
    }
    if config.watcher.poll_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "watcher.poll_interval_secs must be greater than zero".to_string(),
        ));
    }
    if config.http.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "http.timeout_secs must be greater than zero".to_string(),
        ));
    }
    if config
        .operator
        .private_key
        .as_deref()
        .is_none_or(|key| key.trim().is_empty())
    {
        return Err(ConfigError::ValidationError(
            "operator private key is required (operator.private_key or AGENTPAY_PRIVATE_KEY)"
                .to_string(),
        ));
    }
    if config.ledger.network == NetworkKind::Gateway && config.ledger.gateway_url.is_none() {
        return Err(ConfigError::ValidationError(
            "ledger.gateway_url is required when network = \"gateway\"".to_string(),
        ));
    }
    if let Some((token, _)) = config.units.iter().find(|(_, rate)| **rate == 0) {
        return Err(ConfigError::ValidationError(format!(
            "conversion rate of {token} must be greater than zero"
        )));
    }

    let mut ids = HashSet::new();
    for merchant in &config.merchants {
        if !ids.insert(merchant.id.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "merchant {} is listed twice",
                merchant.id
            )));
        }
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
    validate(&file_config)?;

    let listen = file_config
        .server
        .listen
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], file_config.feed.port)));
    let feed_url = match file_config.feed.url {
        Some(url) => url,
        None => Url::parse(&format!("http://127.0.0.1:{}", listen.port()))?,
    };

    let network = match (file_config.ledger.network, file_config.ledger.gateway_url) {
        (NetworkKind::Gateway, Some(url)) => LedgerNetwork::Gateway { url },
        _ => LedgerNetwork::Local,
    };

    let units = if file_config.units.is_empty() {
        UnitConverter::default()
    } else {
        UnitConverter::new(
            file_config
                .units
                .into_iter()
                .map(|(token, rate)| (token, Decimal::from(rate))),
        )
    };

    let merchants = if file_config.merchants.is_empty() {
        MerchantRegistry::default_merchants()
    } else {
        file_config
            .merchants
            .into_iter()
            .map(|m| Merchant {
                id: m.id,
                ledger_account_id: m.ledger_account_id,
                name: m.name,
                is_active: m.is_active,
            })
            .collect()
    };

    let private_key = file_config
        .operator
        .private_key
        .unwrap_or_default()
        .into_bytes()
        .into_boxed_slice();

    Ok(LoadedConfig {
        listen,
        seed_demo_deposits: file_config.feed.seed_demo_deposits,
        agent: AgentConfig {
            network,
            operator: OperatorConfig {
                account_id: file_config.operator.account_id,
                private_key,
                initial_balance: file_config.operator.initial_balance,
            },
            topics: TopicsConfig {
                trigger: file_config.topics.trigger,
                confirmation: file_config.topics.confirmation,
            },
            feed_url,
            poll_interval: Duration::from_secs(file_config.watcher.poll_interval_secs),
            audit_log: file_config.audit.path,
            http_timeout: Duration::from_secs(file_config.http.timeout_secs),
            units,
            merchants,
        },
    })
}

/// Get the database URL from the environment, if one is configured.
pub fn get_database_url() -> Option<String> {
    std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| !url.is_empty())
}
