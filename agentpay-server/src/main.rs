//! Agentpay Server
//!
//! Runs the deposit-to-settlement pipeline: the deposit feed, the watcher
//! that turns deposits into settlement triggers, and the executor that pays
//! merchants on the ledger and publishes confirmations.

mod api;
mod config;
mod deposits;
mod replay;
mod server;
mod shutdown;
mod state;

use agentpay_core::audit::AuditLog;
use agentpay_core::config::{AgentConfig, LedgerNetwork};
use agentpay_core::framework::DatabaseProcessor;
use agentpay_core::idempotency::{
    EXECUTOR_SCOPE, IdempotencyStore, MemoryIdempotencyStore, PgIdempotencyStore, WATCHER_SCOPE,
};
use agentpay_core::ledger::{
    GatewayLedger, LocalLedger, SettlementLedger, TopicPublisher, TopicSubscriber,
};
use agentpay_core::processors::{DepositWatcher, SettlementExecutor};
use agentpay_core::registry::MerchantRegistry;
use agentpay_core::stats::AgentStats;
use agentpay_sdk::client::{FeedClient, GatewayClient};
use agentpay_sdk::objects::{AccountId, TopicId};
use agentpay_sdk::signature::OperatorKey;
use clap::Parser;
use config::file::NetworkKind;
use config::{ConfigLoader, Overrides, get_database_url};
use deposits::DepositBook;
use replay::SeenSignatures;
use server::{build_router, run_server};
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Agentpay - automated merchant settlement for stablecoin deposits
#[derive(Parser, Debug)]
#[command(name = "agentpay-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./agentpay.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,

    /// Ledger network (`local` sandbox or a remote `gateway`)
    #[arg(long, env = "AGENTPAY_NETWORK", value_enum)]
    network: Option<NetworkKind>,

    /// Root URL of the ledger gateway
    #[arg(long, env = "AGENTPAY_GATEWAY_URL")]
    gateway_url: Option<Url>,

    /// Operator account paying settlements (e.g., 0.0.1001)
    #[arg(long, env = "AGENTPAY_ACCOUNT_ID")]
    account_id: Option<AccountId>,

    /// Operator private key used to sign ledger writes
    #[arg(long, env = "AGENTPAY_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Topic carrying settlement triggers
    #[arg(long, env = "AGENTPAY_TRIGGER_TOPIC_ID")]
    trigger_topic: Option<TopicId>,

    /// Topic carrying settlement confirmations
    #[arg(long, env = "AGENTPAY_CONFIRMATION_TOPIC_ID")]
    confirmation_topic: Option<TopicId>,

    /// Port of the deposit feed (and the default listen port)
    #[arg(long, env = "AGENTPAY_FEED_PORT")]
    feed_port: Option<u16>,

    /// Path of the settlement audit log
    #[arg(long, env = "AGENTPAY_AUDIT_LOG")]
    audit_log: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            listen: self.listen,
            network: self.network,
            gateway_url: self.gateway_url.clone(),
            account_id: self.account_id,
            private_key: self.private_key.clone(),
            trigger_topic: self.trigger_topic,
            confirmation_topic: self.confirmation_topic,
            feed_port: self.feed_port,
            audit_log: self.audit_log.clone(),
        }
    }
}

/// The three ledger seams plus the sandbox, when one runs in process.
struct Ledger {
    publisher: Arc<dyn TopicPublisher>,
    subscriber: Arc<dyn TopicSubscriber>,
    settlement: Arc<dyn SettlementLedger>,
    sandbox: Option<Arc<LocalLedger>>,
}

/// With `durable_claims`, a gateway subscription replays the trigger topic
/// from its start and relies on the executor's claims to skip settled deposits.
fn build_ledger(config: &AgentConfig, http: reqwest::Client, durable_claims: bool) -> Ledger {
    match &config.network {
        LedgerNetwork::Local => {
            let ledger = Arc::new(LocalLedger::with_funded_account(
                [config.topics.trigger, config.topics.confirmation],
                config.operator.account_id,
                config.operator.initial_balance,
            ));
            Ledger {
                publisher: ledger.clone(),
                subscriber: ledger.clone(),
                settlement: ledger.clone(),
                sandbox: Some(ledger),
            }
        }
        LedgerNetwork::Gateway { url } => {
            let client = GatewayClient::new(url.clone(), config.operator.private_key_bytes())
                .with_http_client(http);
            let mut ledger = GatewayLedger::new(client, config.poll_interval);
            if durable_claims {
                ledger = ledger.replaying_history();
            }
            let ledger = Arc::new(ledger);
            Ledger {
                publisher: ledger.clone(),
                subscriber: ledger.clone(),
                settlement: ledger,
                sandbox: None,
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting agentpay-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = ConfigLoader::new(&args.config, args.overrides());
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    let listen_addr = loaded_config.listen;
    let agent = loaded_config.agent;
    tracing::info!(
        network = %agent.network,
        operator = %agent.operator.account_id,
        trigger_topic = %agent.topics.trigger,
        confirmation_topic = %agent.topics.confirmation,
        "Configuration loaded from {:?}",
        args.config
    );

    // Idempotency stores: Postgres when DATABASE_URL is set, memory otherwise
    let db_pool = match get_database_url() {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&database_url)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to connect to database: {}", e);
                    e
                })?;
            tracing::info!("Database connection established");

            if args.migrate {
                tracing::info!("Running database migrations...");
                sqlx::migrate!("../migrations").run(&pool).await.map_err(|e| {
                    tracing::error!("Failed to run migrations: {}", e);
                    e
                })?;
                tracing::info!("Migrations completed successfully");
            }
            Some(pool)
        }
        None => {
            if args.migrate {
                tracing::warn!("--migrate ignored: DATABASE_URL is not set");
            }
            tracing::warn!("DATABASE_URL not set, processed deposits are kept in memory only");
            None
        }
    };
    let (processed, settled): (Arc<dyn IdempotencyStore>, Arc<dyn IdempotencyStore>) =
        match &db_pool {
            Some(pool) => (
                Arc::new(PgIdempotencyStore::new(
                    DatabaseProcessor { pool: pool.clone() },
                    WATCHER_SCOPE,
                )),
                Arc::new(PgIdempotencyStore::new(
                    DatabaseProcessor { pool: pool.clone() },
                    EXECUTOR_SCOPE,
                )),
            ),
            None => (
                Arc::new(MemoryIdempotencyStore::new()),
                Arc::new(MemoryIdempotencyStore::new()),
            ),
        };

    // Shared HTTP client with the configured timeout
    let http = reqwest::Client::builder()
        .timeout(agent.http_timeout)
        .build()?;

    let ledger = build_ledger(&agent, http.clone(), db_pool.is_some());
    let stats = Arc::new(AgentStats::default());
    let registry = Arc::new(RwLock::new(MerchantRegistry::new(agent.merchants.clone())));
    let audit = Arc::new(AuditLog::new(agent.audit_log.clone()));
    let deposits = if loaded_config.seed_demo_deposits {
        DepositBook::with_demo_deposits()
    } else {
        DepositBook::new()
    };

    // Create application state
    let state = AppState {
        deposits: Arc::new(deposits),
        registry: registry.clone(),
        stats: stats.clone(),
        audit: audit.clone(),
        ledger: ledger.sandbox.clone(),
        operator_key: OperatorKey::new(agent.operator.private_key_bytes()),
        operator_account: agent.operator.account_id,
        seen_signatures: Arc::new(SeenSignatures::new()),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Subscribe before the watcher can publish its first trigger
    let triggers = ledger.subscriber.subscribe(agent.topics.trigger).await?;
    let executor = SettlementExecutor::new(
        registry,
        ledger.settlement.clone(),
        ledger.publisher.clone(),
        settled,
        agent.units.clone(),
        audit,
        agent.executor(),
        stats.clone(),
    );
    let executor_handle = tokio::spawn(executor.run(triggers, shutdown_rx.clone()));

    let watcher = DepositWatcher::new(
        Arc::new(FeedClient::new(agent.feed_url.clone()).with_http_client(http)),
        ledger.publisher.clone(),
        processed,
        agent.watcher(),
        stats,
    );

    // Build the router and bind before the watcher polls its own feed
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    let watcher_handle = tokio::spawn(watcher.run(shutdown_rx));

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(listener, router).await;

    // Stop the agents
    tracing::info!("Stopping agents...");
    let _ = shutdown_tx.send(true);
    if let Err(e) = watcher_handle.await {
        tracing::error!(error = %e, "DepositWatcher task failed");
    }
    if let Err(e) = executor_handle.await {
        tracing::error!(error = %e, "SettlementExecutor task failed");
    }

    // Close database connections gracefully
    if let Some(pool) = db_pool {
        tracing::info!("Closing database connections...");
        pool.close().await;
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
