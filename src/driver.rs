//! Device lifecycle controller.
//!
//! `Bh1750Driver` sequences acquisition and release of bus resources and
//! the sampler worker so that no resource is used outside its valid window.
//! Acquisition order is adapter reference → device handle → driver
//! registration → sampler; release always happens in the reverse order, and
//! every failure path in [`Bh1750Driver::initialize`] unwinds the subset
//! already acquired before returning, so a failed load leaves zero
//! resources held.
//!
//! Bind and unbind are modelled as an explicit state machine
//! ([`BindState`]) driven by the platform's `probe`/`remove` callbacks, so
//! the controller's behavior is independent of the mechanism that invokes
//! them.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::bus::{AdapterRef, DeviceHandle, I2cBus};
use crate::config::DriverConfig;
use crate::error::{SensorError, SensorResult};
use crate::registry::{DeviceIdentity, DriverRegistry};
use crate::sampler::{LightSample, Sampler, POLL_INTERVAL};

/// Symbolic driver name registered with the platform.
pub const DRIVER_NAME: &str = "BH1750";

/// Bind state machine driven by the platform's `probe`/`remove` callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindState {
    /// No device bound; no sampler running.
    Unbound,
    /// A bind is in progress.
    Binding,
    /// Device bound; sampler running.
    Bound,
    /// An unbind is in progress; the sampler is being stopped and joined.
    Unbinding,
}

/// Lifecycle controller for the BH1750 sensor.
pub struct Bh1750Driver {
    bus: Arc<dyn I2cBus>,
    registry: Arc<dyn DriverRegistry>,
    identity: DeviceIdentity,
    adapter: Option<AdapterRef>,
    device: Option<DeviceHandle>,
    registered: bool,
    state: BindState,
    poll_interval: Duration,
    sampler_task: Option<JoinHandle<()>>,
    shutdown_tx: Option<watch::Sender<bool>>,
    sample_tx: watch::Sender<Option<LightSample>>,
}

impl Bh1750Driver {
    /// Module initialization: acquire the adapter, bind the device handle,
    /// and register the driver identity with the platform.
    ///
    /// Each acquisition failure aborts startup after releasing everything
    /// already acquired, in reverse acquisition order.
    pub async fn initialize(
        bus: Arc<dyn I2cBus>,
        registry: Arc<dyn DriverRegistry>,
        config: &DriverConfig,
    ) -> SensorResult<Self> {
        let adapter = match bus.get_adapter(config.bus).await {
            Ok(adapter) => adapter,
            Err(e) => {
                error!(bus = config.bus, error = %e, "could not get I2C adapter");
                return Err(e);
            }
        };

        let device = match bus.create_device(adapter, config.address).await {
            Ok(device) => device,
            Err(e) => {
                error!(address = config.address, error = %e, "could not create I2C device");
                bus.release_adapter(adapter).await;
                return Err(e);
            }
        };

        let identity = DeviceIdentity::new(DRIVER_NAME, config.address);
        if let Err(e) = registry.register(&identity).await {
            error!(driver = identity.name, error = %e, "could not register I2C driver");
            bus.destroy_device(device).await;
            bus.release_adapter(adapter).await;
            return Err(e);
        }

        info!(
            bus = config.bus,
            address = config.address,
            "BH1750 module initialized"
        );

        let (sample_tx, _) = watch::channel(None);
        Ok(Self {
            bus,
            registry,
            identity,
            adapter: Some(adapter),
            device: Some(device),
            registered: true,
            state: BindState::Unbound,
            poll_interval: POLL_INTERVAL,
            sampler_task: None,
            shutdown_tx: None,
            sample_tx,
        })
    }

    /// Override the polling cadence. Used by tests to shrink the interval;
    /// production binds always run at [`POLL_INTERVAL`].
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Platform bind callback: start exactly one sampler worker bound to
    /// the device handle.
    pub async fn probe(&mut self) -> SensorResult<()> {
        if self.state != BindState::Unbound || self.sampler_task.is_some() {
            return Err(SensorError::WorkerStartFailed(format!(
                "cannot bind in state {:?}",
                self.state
            )));
        }
        let device = self
            .device
            .ok_or_else(|| SensorError::WorkerStartFailed("no device handle bound".into()))?;

        self.state = BindState::Binding;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sampler = Sampler::new(
            Arc::clone(&self.bus),
            device,
            self.poll_interval,
            self.sample_tx.clone(),
        );
        self.sampler_task = Some(tokio::spawn(sampler.run(shutdown_rx)));
        self.shutdown_tx = Some(shutdown_tx);
        self.state = BindState::Bound;

        info!("BH1750 probe successful");
        Ok(())
    }

    /// Platform unbind callback: request the sampler to stop and wait
    /// until it has exited. A no-op when no sampler is running.
    pub async fn remove(&mut self) {
        if self.state != BindState::Bound {
            return;
        }
        self.state = BindState::Unbinding;

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.sampler_task.take() {
            let _ = task.await;
        }

        self.state = BindState::Unbound;
        info!("BH1750 sampler stopped");
    }

    /// Module teardown: stop a still-running sampler, then release all
    /// held resources in reverse acquisition order.
    pub async fn teardown(mut self) {
        self.remove().await;

        if self.registered {
            self.registry.unregister(&self.identity).await;
            self.registered = false;
        }
        if let Some(device) = self.device.take() {
            self.bus.destroy_device(device).await;
        }
        if let Some(adapter) = self.adapter.take() {
            self.bus.release_adapter(adapter).await;
        }

        info!("BH1750 module removed");
    }

    /// Current bind state.
    pub fn state(&self) -> BindState {
        self.state
    }

    /// Subscribe to published samples. The receiver holds `None` until the
    /// first successful read after a bind.
    pub fn subscribe(&self) -> watch::Receiver<Option<LightSample>> {
        self.sample_tx.subscribe()
    }

    /// The most recent successful reading, if any.
    pub fn latest(&self) -> Option<LightSample> {
        *self.sample_tx.borrow()
    }
}
