//! Configuration management.
//!
//! `DriverConfig` carries the few knobs the module exposes: which bus
//! index to attach to, the 7-bit device address, and the log level.
//! Values come from an optional TOML file layered under `BH1750_*`
//! environment overrides; everything defaults to the stock BH1750 wiring
//! (bus 1, address 0x23).

use config::Config;
use serde::Deserialize;
use std::path::Path;

use crate::error::SensorResult;

/// Default 7-bit I2C address of the BH1750.
pub const BH1750_ADDR: u8 = 0x23;

/// Runtime configuration for the driver module.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DriverConfig {
    /// Bus index handed to the bus provider's adapter lookup.
    pub bus: u8,
    /// 7-bit device address on that bus.
    pub address: u8,
    /// Log level filter for the binary's tracing subscriber.
    pub log_level: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            bus: 1,
            address: BH1750_ADDR,
            log_level: "info".to_string(),
        }
    }
}

impl DriverConfig {
    /// Load configuration from an optional TOML file plus `BH1750_*`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> SensorResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("BH1750").try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
