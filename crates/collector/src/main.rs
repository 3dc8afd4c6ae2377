#![forbid(unsafe_code)]

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use shopfloor_collector::store::SurrealConnector;
use shopfloor_collector::{
    Collector, CollectorConfig, CollectorCycle, Endpoint, HttpDeviceReader, StoreConfig,
};
use tracing::info;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(
    name = "shopfloor-collector",
    version,
    about = "Collects machine telemetry into the store"
)]
struct Cli {
    /// Machine endpoints, `URL` or `ID=URL`.
    #[arg(required = true, num_args = 1..)]
    endpoints: Vec<Endpoint>,

    #[arg(long, default_value_t = 10)]
    interval_seconds: u64,

    /// Per-endpoint read timeout.
    #[arg(long, default_value_t = 5000)]
    read_timeout_ms: u64,

    /// Connection attempts before giving up at startup.
    #[arg(long, default_value_t = 10)]
    store_attempts: u32,

    #[arg(long, default_value_t = 5)]
    store_retry_delay_seconds: u64,

    /// SurrealDB endpoint, e.g. ws://db:8000.
    #[arg(long, env = "DB_HOST")]
    db_host: String,

    #[arg(long, env = "DB_USER", default_value = "")]
    db_user: String,

    #[arg(long, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    db_password: String,

    #[arg(long, env = "DB_NAME")]
    db_name: String,

    #[arg(long, env = "DB_NAMESPACE", default_value = "shopfloor")]
    db_namespace: String,

    #[arg(long, default_value = "info")]
    log: String,
}

impl Cli {
    fn into_config(self) -> CollectorConfig {
        CollectorConfig {
            endpoints: self.endpoints,
            interval: Duration::from_secs(self.interval_seconds.max(1)),
            read_timeout: Duration::from_millis(self.read_timeout_ms.max(1)),
            store_attempts: self.store_attempts,
            store_retry_delay: Duration::from_secs(self.store_retry_delay_seconds),
            store: StoreConfig {
                endpoint: self.db_host,
                namespace: self.db_namespace,
                database: self.db_name,
                username: self.db_user,
                password: self.db_password,
            },
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&cli.log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.into_config();
    info!(
        endpoints = config.endpoints.len(),
        store = %config.store.endpoint,
        interval_s = config.interval.as_secs(),
        "starting collector"
    );

    let connector = SurrealConnector::new(config.store.clone());
    let gateway = config
        .readiness_gate()
        .open(&connector)
        .await
        .context("persistence store unavailable")?;

    let cycle = CollectorCycle::new(
        config.endpoints.clone(),
        HttpDeviceReader::new(),
        config.read_timeout,
    );
    Collector::new(cycle, gateway)
        .run(config.interval, shutdown_signal())
        .await;

    info!("collector stopped");
    Ok(())
}
