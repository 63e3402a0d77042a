//! Two-wire bus provider contract.
//!
//! The host platform's bus-management subsystem is an external
//! collaborator; this module defines the only surface the driver consumes
//! from it: obtaining an addressable adapter reference by index, binding a
//! device handle to a 7-bit address on that adapter, blocking raw
//! read/write on the handle, and the matching release primitives.
//!
//! Handles are opaque tokens issued by the provider. The lifecycle
//! controller owns them exclusively: an adapter reference is released
//! exactly once, a device handle is created after its adapter exists and
//! destroyed before the adapter is released, and a handle is never used for
//! a transaction outside that window.

use async_trait::async_trait;

use crate::error::SensorResult;

/// Opaque reference to a physical bus instance, issued by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdapterRef(u32);

impl AdapterRef {
    /// Wrap a provider-issued token.
    pub fn new(token: u32) -> Self {
        Self(token)
    }

    /// The raw provider token.
    pub fn token(self) -> u32 {
        self.0
    }
}

/// Opaque handle bound to a specific device address on a specific adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(u32);

impl DeviceHandle {
    /// Wrap a provider-issued token.
    pub fn new(token: u32) -> Self {
        Self(token)
    }

    /// The raw provider token.
    pub fn token(self) -> u32 {
        self.0
    }
}

/// Contract consumed from the host bus subsystem.
///
/// Implementations must be shareable across tasks: the lifecycle controller
/// holds the provider for acquisition/release while the sampler task uses
/// it for per-cycle transactions.
#[async_trait]
pub trait I2cBus: Send + Sync {
    /// Obtain the adapter at `index`.
    ///
    /// Fails with [`crate::SensorError::AdapterUnavailable`] when no bus
    /// exists at that index.
    async fn get_adapter(&self, index: u8) -> SensorResult<AdapterRef>;

    /// Bind a device handle to `address` (7-bit) on `adapter`.
    async fn create_device(&self, adapter: AdapterRef, address: u8) -> SensorResult<DeviceHandle>;

    /// Blocking raw read into `buf`. Returns the number of bytes read,
    /// which may be short of `buf.len()`.
    async fn read(&self, device: DeviceHandle, buf: &mut [u8]) -> SensorResult<usize>;

    /// Blocking raw write of `bytes` to the device.
    async fn write(&self, device: DeviceHandle, bytes: &[u8]) -> SensorResult<()>;

    /// Destroy a device handle. The handle must not be used afterwards.
    async fn destroy_device(&self, device: DeviceHandle);

    /// Release an adapter reference. All device handles on the adapter must
    /// already be destroyed.
    async fn release_adapter(&self, adapter: AdapterRef);
}
