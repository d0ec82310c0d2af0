//! TOML file configuration structures.
//!
//! These structs directly map to the `agentpay.toml` file format. Every
//! section is optional; missing keys fall back to the sandbox defaults.

use agentpay_sdk::objects::{AccountId, TopicId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub ledger: LedgerConfig,
    pub operator: OperatorConfig,
    pub topics: TopicsConfig,
    pub feed: FeedConfig,
    pub watcher: WatcherConfig,
    pub http: HttpConfig,
    pub audit: AuditConfig,
    /// Tiny units credited per whole token, keyed by token symbol.
    pub units: BTreeMap<String, u64>,
    /// Initial merchant registry. Empty means the built-in demo merchants.
    pub merchants: Vec<MerchantConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address. Defaults to `0.0.0.0:{feed.port}`.
    pub listen: Option<SocketAddr>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    #[default]
    Local,
    Gateway,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub network: NetworkKind,
    /// Required when `network = "gateway"`.
    pub gateway_url: Option<Url>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    pub account_id: AccountId,
    /// Signing key for gateway writes. Usually supplied through
    /// `AGENTPAY_PRIVATE_KEY` rather than written to the file.
    pub private_key: Option<String>,
    /// Sandbox only: tiny units the operator account starts with.
    pub initial_balance: i64,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            account_id: AccountId::new(0, 0, 1001),
            private_key: None,
            initial_balance: 100_000_000_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicsConfig {
    pub trigger: TopicId,
    pub confirmation: TopicId,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            trigger: TopicId::new(0, 0, 789012),
            confirmation: TopicId::new(0, 0, 789013),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub port: u16,
    /// Where the watcher polls. Defaults to this server.
    pub url: Option<Url>,
    pub seed_demo_deposits: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            url: None,
            seed_demo_deposits: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub poll_interval_secs: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./agent_logs.txt"),
        }
    }
}

/// One `[[merchants]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantConfig {
    pub id: String,
    pub ledger_account_id: AccountId,
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:4000"

[ledger]
network = "gateway"
gateway_url = "https://ledger.example.com"

[operator]
account_id = "0.0.5005"
private_key = "operator-secret"
initial_balance = 42

[topics]
trigger = "0.0.1"
confirmation = "0.0.2"

[feed]
port = 3100
url = "http://feed.internal:3100"
seed_demo_deposits = false

[watcher]
poll_interval_secs = 2

[http]
timeout_secs = 5

[audit]
path = "/var/log/agentpay/audit.jsonl"

[units]
USDC = 100000000
DAI = 50000000

[[merchants]]
id = "merchant_001"
ledger_account_id = "0.0.123456"
name = "Coffee Shop Downtown"

[[merchants]]
id = "merchant_002"
ledger_account_id = "0.0.123457"
name = "Tech Store Central"
is_active = false
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.unwrap().port(), 4000);
        assert_eq!(config.ledger.network, NetworkKind::Gateway);
        assert_eq!(config.operator.account_id, AccountId::new(0, 0, 5005));
        assert_eq!(config.operator.private_key.as_deref(), Some("operator-secret"));
        assert_eq!(config.topics.confirmation, TopicId::new(0, 0, 2));
        assert!(!config.feed.seed_demo_deposits);
        assert_eq!(config.watcher.poll_interval_secs, 2);
        assert_eq!(config.units.get("DAI"), Some(&50_000_000));
        assert_eq!(config.merchants.len(), 2);
        assert!(config.merchants[0].is_active);
        assert!(!config.merchants[1].is_active);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.ledger.network, NetworkKind::Local);
        assert_eq!(config.operator.account_id, AccountId::new(0, 0, 1001));
        assert_eq!(config.topics.trigger, TopicId::new(0, 0, 789012));
        assert_eq!(config.topics.confirmation, TopicId::new(0, 0, 789013));
        assert_eq!(config.feed.port, 3000);
        assert!(config.feed.seed_demo_deposits);
        assert_eq!(config.watcher.poll_interval_secs, 10);
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.audit.path, PathBuf::from("./agent_logs.txt"));
        assert!(config.merchants.is_empty());
    }

    #[test]
    fn test_invalid_account_id_rejected() {
        let toml_str = r#"
[[merchants]]
id = "merchant_001"
ledger_account_id = "not-an-account"
name = "Broken"
"#;
        assert!(toml::from_str::<FileConfig>(toml_str).is_err());
    }
}
