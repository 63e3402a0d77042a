//! CLI entry point for the BH1750 acquisition driver.
//!
//! Loads configuration, performs module initialization (adapter + device
//! handle + driver registration), drives the bind callback in place of a
//! host discovery mechanism, and samples until interrupted. On ctrl-c the
//! sampler is stopped and joined and all bus resources are released in
//! reverse acquisition order.
//!
//! The binary runs against the simulated bus; on a real platform the
//! `I2cBus` and `DriverRegistry` implementations would be supplied by the
//! host's bus-management subsystem.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use bh1750_daq::{Bh1750Driver, DriverConfig, SimBus, SimRegistry};

#[derive(Parser)]
#[command(name = "bh1750-daq")]
#[command(about = "BH1750 ambient light acquisition driver", long_about = None)]
struct Cli {
    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fixed two-byte payload returned by the simulated sensor, e.g. 012C
    #[arg(long, default_value = "012C", value_parser = parse_payload)]
    payload: u16,
}

fn parse_payload(s: &str) -> std::result::Result<u16, String> {
    u16::from_str_radix(s, 16).map_err(|e| format!("invalid hex payload: {e}"))
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = DriverConfig::load(cli.config.as_deref())?;
    init_tracing(&config.log_level);

    let payload = cli.payload.to_be_bytes();
    let bus = Arc::new(SimBus::new().with_bus(config.bus).with_payload(payload));
    let registry = Arc::new(SimRegistry::new());

    let mut driver = Bh1750Driver::initialize(bus, registry, &config).await?;
    // Stand-in for platform discovery: bind immediately.
    driver.probe().await?;

    tokio::signal::ctrl_c().await?;

    driver.remove().await;
    driver.teardown().await;
    Ok(())
}
