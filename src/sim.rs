//! Simulated bus and registry for testing.
//!
//! These implement the [`I2cBus`] and [`DriverRegistry`] contracts without
//! physical hardware. They provide:
//! - Programmable read payloads
//! - Controllable one-shot failure injection
//! - Call logging and live-handle accounting for test verification
//!
//! The binary also runs against [`SimBus`], standing in for the host bus
//! subsystem the driver would consume on a real platform.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::info;

use crate::bus::{AdapterRef, DeviceHandle, I2cBus};
use crate::error::{SensorError, SensorResult};
use crate::registry::{DeviceIdentity, DriverRegistry};

#[derive(Debug)]
struct SimBusState {
    /// Bus indexes that exist on this simulated host.
    buses: HashSet<u8>,
    next_token: u32,
    /// Live adapter token -> bus index.
    adapters: HashMap<u32, u8>,
    /// Live device token -> (adapter token, address).
    devices: HashMap<u32, (u32, u8)>,
    /// Bytes returned by every read.
    payload: Vec<u8>,
    read_count: u64,
}

/// Simulated two-wire bus.
///
/// # Example
///
/// ```
/// use bh1750_daq::{I2cBus, SimBus};
///
/// # tokio_test::block_on(async {
/// let bus = SimBus::new().with_payload([0x01, 0x2C]);
/// let adapter = bus.get_adapter(1).await.unwrap();
/// let device = bus.create_device(adapter, 0x23).await.unwrap();
///
/// let mut buf = [0u8; 2];
/// assert_eq!(bus.read(device, &mut buf).await.unwrap(), 2);
/// assert_eq!(buf, [0x01, 0x2C]);
/// # })
/// ```
pub struct SimBus {
    state: Mutex<SimBusState>,
    fail_next_create: AtomicBool,
    fail_next_read: AtomicBool,
    fail_next_write: AtomicBool,
    call_log: Mutex<Vec<String>>,
}

impl SimBus {
    /// Create a simulated host with a single bus at index 1.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimBusState {
                buses: HashSet::from([1]),
                next_token: 1,
                adapters: HashMap::new(),
                devices: HashMap::new(),
                payload: vec![0x00, 0x00],
                read_count: 0,
            }),
            fail_next_create: AtomicBool::new(false),
            fail_next_read: AtomicBool::new(false),
            fail_next_write: AtomicBool::new(false),
            call_log: Mutex::new(Vec::new()),
        }
    }

    /// Add another bus index to the simulated host.
    pub fn with_bus(self, index: u8) -> Self {
        self.lock_state().buses.insert(index);
        self
    }

    /// Set the bytes returned by every subsequent read.
    pub fn with_payload(self, payload: impl Into<Vec<u8>>) -> Self {
        self.lock_state().payload = payload.into();
        self
    }

    /// Replace the read payload on a live bus.
    pub fn set_payload(&self, payload: impl Into<Vec<u8>>) {
        self.lock_state().payload = payload.into();
    }

    /// Fail the next `create_device` call.
    pub fn fail_next_create_device(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }

    /// Fail the next `read` call.
    pub fn fail_next_read(&self) {
        self.fail_next_read.store(true, Ordering::SeqCst);
    }

    /// Fail the next `write` call.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Number of read transactions attempted so far.
    pub fn read_count(&self) -> u64 {
        self.lock_state().read_count
    }

    /// Number of adapter references currently held.
    pub fn live_adapters(&self) -> usize {
        self.lock_state().adapters.len()
    }

    /// Number of device handles currently bound.
    pub fn live_devices(&self) -> usize {
        self.lock_state().devices.len()
    }

    /// Copy of the call log for verification.
    pub fn call_log(&self) -> Vec<String> {
        match self.call_log.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SimBusState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn log_call(&self, call: String) {
        match self.call_log.lock() {
            Ok(mut log) => log.push(call),
            Err(poisoned) => poisoned.into_inner().push(call),
        }
    }
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl I2cBus for SimBus {
    async fn get_adapter(&self, index: u8) -> SensorResult<AdapterRef> {
        self.log_call(format!("get_adapter({index})"));

        let mut state = self.lock_state();
        if !state.buses.contains(&index) {
            return Err(SensorError::AdapterUnavailable(index));
        }

        let token = state.next_token;
        state.next_token += 1;
        state.adapters.insert(token, index);
        Ok(AdapterRef::new(token))
    }

    async fn create_device(&self, adapter: AdapterRef, address: u8) -> SensorResult<DeviceHandle> {
        self.log_call(format!("create_device({address:#04x})"));

        let mut state = self.lock_state();
        let bus = *state
            .adapters
            .get(&adapter.token())
            .ok_or_else(|| SensorError::Bus("unknown adapter reference".into()))?;

        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(SensorError::DeviceCreationFailed { bus, address });
        }

        let token = state.next_token;
        state.next_token += 1;
        state.devices.insert(token, (adapter.token(), address));
        Ok(DeviceHandle::new(token))
    }

    async fn read(&self, device: DeviceHandle, buf: &mut [u8]) -> SensorResult<usize> {
        self.log_call("read".into());

        let mut state = self.lock_state();
        state.read_count += 1;

        if !state.devices.contains_key(&device.token()) {
            return Err(SensorError::Bus("read on destroyed device handle".into()));
        }
        if self.fail_next_read.swap(false, Ordering::SeqCst) {
            return Err(SensorError::Bus("injected read failure".into()));
        }

        let n = state.payload.len().min(buf.len());
        buf[..n].copy_from_slice(&state.payload[..n]);
        Ok(n)
    }

    async fn write(&self, device: DeviceHandle, bytes: &[u8]) -> SensorResult<()> {
        self.log_call(format!("write({bytes:#04x?})"));

        let state = self.lock_state();
        if !state.devices.contains_key(&device.token()) {
            return Err(SensorError::Bus("write on destroyed device handle".into()));
        }
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(SensorError::Bus("injected write failure".into()));
        }
        Ok(())
    }

    async fn destroy_device(&self, device: DeviceHandle) {
        self.log_call("destroy_device".into());
        self.lock_state().devices.remove(&device.token());
    }

    async fn release_adapter(&self, adapter: AdapterRef) {
        self.log_call("release_adapter".into());
        self.lock_state().adapters.remove(&adapter.token());
    }
}

/// Simulated platform registry.
pub struct SimRegistry {
    registered: Mutex<Vec<String>>,
    fail_next: AtomicBool,
}

impl SimRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            registered: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Fail the next `register` call.
    pub fn fail_next_register(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Whether a driver with `name` is currently registered.
    pub fn is_registered(&self, name: &str) -> bool {
        match self.registered.lock() {
            Ok(names) => names.iter().any(|n| n == name),
            Err(poisoned) => poisoned.into_inner().iter().any(|n| n == name),
        }
    }
}

impl Default for SimRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DriverRegistry for SimRegistry {
    async fn register(&self, identity: &DeviceIdentity) -> SensorResult<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(SensorError::DriverRegistrationFailed(format!(
                "injected registration failure for '{}'",
                identity.name
            )));
        }

        match self.registered.lock() {
            Ok(mut names) => names.push(identity.name.to_string()),
            Err(poisoned) => poisoned.into_inner().push(identity.name.to_string()),
        }
        info!(driver = identity.name, "driver registered");
        Ok(())
    }

    async fn unregister(&self, identity: &DeviceIdentity) {
        match self.registered.lock() {
            Ok(mut names) => names.retain(|n| n != identity.name),
            Err(poisoned) => poisoned.into_inner().retain(|n| n != identity.name),
        }
        info!(driver = identity.name, "driver unregistered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn adapter_lookup_fails_for_missing_bus() {
        let bus = SimBus::new();
        match bus.get_adapter(7).await {
            Err(SensorError::AdapterUnavailable(7)) => {}
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        assert_eq!(bus.live_adapters(), 0);
    }

    #[tokio::test]
    async fn create_failure_is_one_shot() {
        let bus = SimBus::new();
        let adapter = bus.get_adapter(1).await.unwrap();

        bus.fail_next_create_device();
        assert!(bus.create_device(adapter, 0x23).await.is_err());

        // The failure flag is consumed; the next attempt succeeds.
        assert!(bus.create_device(adapter, 0x23).await.is_ok());
        assert_eq!(bus.live_devices(), 1);
    }

    #[tokio::test]
    async fn read_returns_payload_and_counts() {
        let bus = SimBus::new().with_payload([0xAB, 0xCD]);
        let adapter = bus.get_adapter(1).await.unwrap();
        let device = bus.create_device(adapter, 0x23).await.unwrap();

        let mut buf = [0u8; 2];
        assert_eq!(bus.read(device, &mut buf).await.unwrap(), 2);
        assert_eq!(buf, [0xAB, 0xCD]);
        assert_eq!(bus.read_count(), 1);
    }

    #[tokio::test]
    async fn short_payload_gives_short_read() {
        let bus = SimBus::new().with_payload([0x42]);
        let adapter = bus.get_adapter(1).await.unwrap();
        let device = bus.create_device(adapter, 0x23).await.unwrap();

        let mut buf = [0u8; 2];
        assert_eq!(bus.read(device, &mut buf).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn transactions_fail_on_destroyed_handle() {
        let bus = SimBus::new();
        let adapter = bus.get_adapter(1).await.unwrap();
        let device = bus.create_device(adapter, 0x23).await.unwrap();
        bus.destroy_device(device).await;

        let mut buf = [0u8; 2];
        assert!(bus.read(device, &mut buf).await.is_err());
        assert!(bus.write(device, &[0x10]).await.is_err());
    }

    #[tokio::test]
    async fn call_log_records_order() {
        let bus = SimBus::new();
        let adapter = bus.get_adapter(1).await.unwrap();
        let device = bus.create_device(adapter, 0x23).await.unwrap();
        bus.destroy_device(device).await;
        bus.release_adapter(adapter).await;

        let log = bus.call_log();
        assert_eq!(log[0], "get_adapter(1)");
        assert_eq!(log[1], "create_device(0x23)");
        assert_eq!(log[2], "destroy_device");
        assert_eq!(log[3], "release_adapter");
    }

    #[tokio::test]
    async fn registry_failure_is_one_shot() {
        let registry = SimRegistry::new();
        let identity = DeviceIdentity::new("BH1750", 0x23);

        registry.fail_next_register();
        assert!(registry.register(&identity).await.is_err());
        assert!(!registry.is_registered("BH1750"));

        registry.register(&identity).await.unwrap();
        assert!(registry.is_registered("BH1750"));

        registry.unregister(&identity).await;
        assert!(!registry.is_registered("BH1750"));
    }
}
