#![forbid(unsafe_code)]

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use shopfloor_core::AgentOrder;
use shopfloor_simulator::{build, http, SimulatorConfig};
use tracing::info;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "shopfloor-simulator", version, about = "Simulated CNC machine")]
struct Cli {
    /// Machine identifier, also the object name on the channel.
    machine_id: String,

    /// Address to serve the device access channel on.
    listen: SocketAddr,

    #[arg(long, default_value_t = 1000)]
    tick_ms: u64,

    /// Seed for a reproducible run.
    #[arg(long)]
    seed: Option<u64>,

    /// operator-first or technician-first.
    #[arg(long, default_value = "operator-first")]
    agent_order: AgentOrder,

    #[arg(long, default_value = "info")]
    log: String,
}

impl Cli {
    fn into_config(self) -> SimulatorConfig {
        SimulatorConfig {
            machine_id: self.machine_id,
            listen: self.listen,
            tick: Duration::from_millis(self.tick_ms.max(1)),
            seed: self.seed,
            agent_order: self.agent_order,
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
    let (space, sim) = build(&config).context("register machine object")?;

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("bind {}", config.listen))?;
    info!(
        machine = %config.machine_id,
        listen = %config.listen,
        tick_ms = config.tick.as_millis() as u64,
        seed = ?config.seed,
        "simulator listening"
    );

    let server = axum::serve(listener, http::router(space))
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    tokio::select! {
        res = sim.run(config.tick) => {
            res.context("simulation loop stopped")?;
        }
        res = server => {
            res.context("server error")?;
            info!("shutdown complete");
        }
    }

    Ok(())
}
