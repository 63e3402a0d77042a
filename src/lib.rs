//! # BH1750 Acquisition Driver
//!
//! This crate implements a single-sensor acquisition driver for the BH1750
//! ambient light sensor. It attaches to the sensor over a two-wire
//! synchronous (I2C) bus, binds a device handle, and continuously samples
//! the sensor at a fixed cadence, decoding raw register bytes into a 16-bit
//! light intensity value and publishing it to subscribers.
//!
//! ## Crate Structure
//!
//! - **`bus`**: The `I2cBus` trait — the contract consumed from the host's
//!   bus-management subsystem (adapter lookup, device binding, raw
//!   read/write) — plus the opaque `AdapterRef`/`DeviceHandle` tokens.
//! - **`registry`**: The `DriverRegistry` trait and `DeviceIdentity`
//!   descriptor used to match the driver to discovered hardware.
//! - **`driver`**: `Bh1750Driver`, the device lifecycle controller. Owns
//!   the bind/unbind state machine, sequences resource acquisition and
//!   release, and starts/stops the sampler.
//! - **`sampler`**: The background polling worker: one bus transaction per
//!   cycle, big-endian decode, cooperative cancellation.
//! - **`sim`**: Simulated bus and registry implementations with failure
//!   injection and call logging, used by the binary and the test suite.
//! - **`config`**: `DriverConfig` loaded from TOML files and environment
//!   overrides.
//! - **`error`**: The `SensorError` taxonomy for centralized error
//!   handling.

pub mod bus;
pub mod config;
pub mod driver;
pub mod error;
pub mod registry;
pub mod sampler;
pub mod sim;

pub use bus::{AdapterRef, DeviceHandle, I2cBus};
pub use config::DriverConfig;
pub use driver::{Bh1750Driver, BindState, DRIVER_NAME};
pub use error::{SensorError, SensorResult};
pub use registry::{DeviceIdentity, DriverRegistry};
pub use sampler::{decode_sample, LightSample, POLL_INTERVAL};
pub use sim::{SimBus, SimRegistry};
