//! Platform driver-matching seam.
//!
//! The host platform discovers devices and matches them against registered
//! driver identities according to its own policy; the driver only exposes
//! an identity descriptor and the `probe`/`remove` callbacks on
//! [`crate::Bh1750Driver`]. This module defines the registration side of
//! that contract.

use async_trait::async_trait;

use crate::error::SensorResult;

/// Static pairing of a symbolic driver name and a 7-bit device address,
/// used to match the driver to hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Symbolic driver name, e.g. `"BH1750"`.
    pub name: &'static str,
    /// 7-bit device address on the bus.
    pub address: u8,
}

impl DeviceIdentity {
    /// Build an identity descriptor.
    pub fn new(name: &'static str, address: u8) -> Self {
        Self { name, address }
    }
}

/// Registration mechanism of the host platform.
///
/// Registered once per module load and unregistered at teardown. The
/// platform invokes the driver's bind callbacks when a device matching a
/// registered identity appears or disappears; the driver does not control
/// when that happens.
#[async_trait]
pub trait DriverRegistry: Send + Sync {
    /// Register `identity` with the platform matching mechanism.
    async fn register(&self, identity: &DeviceIdentity) -> SensorResult<()>;

    /// Remove a previously registered identity.
    async fn unregister(&self, identity: &DeviceIdentity);
}
