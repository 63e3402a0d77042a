//! Custom error types for the driver.
//!
//! This module defines the primary error type, `SensorError`, using the
//! `thiserror` crate. The three acquisition variants are fatal to module
//! initialization and abort startup after the controller has rolled back
//! everything already acquired. `WorkerStartFailed` is fatal to a single
//! bind attempt but not to the module. `Bus` errors raised during a polling
//! cycle are recovered locally by the sampler and never propagated.

use thiserror::Error;

/// Convenience alias for results using the driver error type.
pub type SensorResult<T> = std::result::Result<T, SensorError>;

/// Errors raised across the driver lifecycle and polling loop.
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum SensorError {
    #[error("no I2C adapter available at bus index {0}")]
    AdapterUnavailable(u8),

    #[error("could not create device at address {address:#04x} on bus {bus}")]
    DeviceCreationFailed { bus: u8, address: u8 },

    #[error("driver registration failed: {0}")]
    DriverRegistrationFailed(String),

    #[error("sampler worker could not be started: {0}")]
    WorkerStartFailed(String),

    #[error("bus transaction failed: {0}")]
    Bus(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_unavailable_names_the_bus_index() {
        let err = SensorError::AdapterUnavailable(4);
        assert_eq!(err.to_string(), "no I2C adapter available at bus index 4");
    }

    #[test]
    fn device_creation_failed_formats_address_as_hex() {
        let err = SensorError::DeviceCreationFailed {
            bus: 1,
            address: 0x23,
        };
        assert!(err.to_string().contains("0x23"));
        assert!(err.to_string().contains("bus 1"));
    }

    #[test]
    fn config_error_converts_via_from() {
        let cfg_err = config::ConfigError::Message("bad value".into());
        let err: SensorError = cfg_err.into();
        match err {
            SensorError::Config(_) => {}
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
