//! Background polling worker.
//!
//! The sampler performs one bus transaction per cycle: read exactly two
//! bytes from the sensor, decode them high-byte-first into a 16-bit light
//! intensity value, publish it through the watch channel, and wait out the
//! rest of the interval. The inter-cycle wait selects against the shutdown
//! signal, so a stop request is observed near-immediately rather than after
//! a full interval.
//!
//! A failed cycle (bus error, short read) is logged and the loop continues
//! without updating the published sample; transient bus errors are expected
//! to self-heal at the next poll. There is no retry/backoff policy beyond
//! "try again next cycle" and no escalation to a fatal state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::bus::{DeviceHandle, I2cBus};

/// Fixed sampling cadence.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// BH1750 opcode: continuously measure at 1 lx resolution.
pub const CONTINUOUS_HIGH_RES: u8 = 0x10;

/// Combine two raw sensor bytes, high byte first, into the 16-bit reading.
pub fn decode_sample(bytes: [u8; 2]) -> u16 {
    (u16::from(bytes[0]) << 8) | u16::from(bytes[1])
}

/// The most recently decoded reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LightSample {
    /// Raw 16-bit combined register value.
    pub raw: u16,
    /// When the reading was decoded.
    pub timestamp: DateTime<Utc>,
}

/// Polling worker bound to one device handle.
///
/// Created by the lifecycle controller on a successful bind; at most one
/// exists per device handle. The worker has exclusive use of the handle for
/// bus transactions while it runs.
pub(crate) struct Sampler {
    bus: Arc<dyn I2cBus>,
    device: DeviceHandle,
    interval: Duration,
    sample_tx: watch::Sender<Option<LightSample>>,
}

impl Sampler {
    pub(crate) fn new(
        bus: Arc<dyn I2cBus>,
        device: DeviceHandle,
        interval: Duration,
        sample_tx: watch::Sender<Option<LightSample>>,
    ) -> Self {
        Self {
            bus,
            device,
            interval,
            sample_tx,
        }
    }

    /// Read-decode-publish loop. Exits when `shutdown_rx` flips to `true`
    /// or its sender is dropped.
    pub(crate) async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut configured = false;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            // Put the sensor into continuous measurement mode once; a
            // failed write is retried on the next cycle like any other
            // transient bus error.
            if !configured {
                match self.bus.write(self.device, &[CONTINUOUS_HIGH_RES]).await {
                    Ok(()) => configured = true,
                    Err(e) => warn!(error = %e, "could not configure measurement mode"),
                }
            }

            let mut buf = [0u8; 2];
            match self.bus.read(self.device, &mut buf).await {
                Ok(2) => {
                    let sample = LightSample {
                        raw: decode_sample(buf),
                        timestamp: Utc::now(),
                    };
                    info!(raw = sample.raw, "BH1750 light intensity");
                    // send_replace stores the value even with no receivers;
                    // the latest sample must survive without subscribers.
                    self.sample_tx.send_replace(Some(sample));
                }
                Ok(n) => error!(bytes = n, "short read from sensor"),
                Err(e) => error!(error = %e, "I2C read failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        debug!("sampler worker exited");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimBus;

    #[test]
    fn decode_combines_high_byte_first() {
        assert_eq!(decode_sample([0x00, 0x00]), 0);
        assert_eq!(decode_sample([0xFF, 0xFF]), 65535);
        assert_eq!(decode_sample([0x01, 0x00]), 256);
        assert_eq!(decode_sample([0x01, 0x2C]), 300);
    }

    async fn spawn_sampler(
        bus: Arc<SimBus>,
    ) -> (
        watch::Receiver<Option<LightSample>>,
        watch::Sender<bool>,
        tokio::task::JoinHandle<()>,
    ) {
        let adapter = bus.get_adapter(1).await.unwrap();
        let device = bus.create_device(adapter, 0x23).await.unwrap();

        let (sample_tx, sample_rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sampler = Sampler::new(bus, device, Duration::from_millis(20), sample_tx);
        let task = tokio::spawn(sampler.run(shutdown_rx));
        (sample_rx, shutdown_tx, task)
    }

    #[tokio::test]
    async fn publishes_decoded_sample_within_one_interval() {
        let bus = Arc::new(SimBus::new().with_payload([0x01, 0x2C]));
        let (mut sample_rx, shutdown_tx, task) = spawn_sampler(bus.clone()).await;

        tokio::time::timeout(Duration::from_millis(100), sample_rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sample_rx.borrow().as_ref().map(|s| s.raw), Some(300));

        // Measurement mode was configured before the first read.
        let log = bus.call_log();
        let write_pos = log.iter().position(|c| c.starts_with("write")).unwrap();
        let read_pos = log.iter().position(|c| c == "read").unwrap();
        assert!(write_pos < read_pos);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn failed_cycle_does_not_stop_the_loop() {
        let bus = Arc::new(SimBus::new().with_payload([0x00, 0x2A]));
        bus.fail_next_read();
        let (mut sample_rx, shutdown_tx, task) = spawn_sampler(bus.clone()).await;

        // First cycle fails; the next one still executes and publishes.
        tokio::time::timeout(Duration::from_millis(200), sample_rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sample_rx.borrow().as_ref().map(|s| s.raw), Some(42));
        assert!(bus.read_count() >= 2);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn short_read_leaves_sample_unchanged() {
        let bus = Arc::new(SimBus::new().with_payload([0x42]));
        let (sample_rx, shutdown_tx, task) = spawn_sampler(bus.clone()).await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(sample_rx.borrow().is_none());
        assert!(bus.read_count() >= 2);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn stop_is_observed_mid_sleep() {
        let bus = Arc::new(SimBus::new());
        let adapter = bus.get_adapter(1).await.unwrap();
        let device = bus.create_device(adapter, 0x23).await.unwrap();

        let (sample_tx, _sample_rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        // Long interval: exit must come from the shutdown signal, not the sleep.
        let sampler = Sampler::new(bus, device, Duration::from_secs(5), sample_tx);
        let task = tokio::spawn(sampler.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(30)).await;
        let start = std::time::Instant::now();
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_millis(500), task)
            .await
            .unwrap()
            .unwrap();
        assert!(start.elapsed() < Duration::from_millis(200));
    }
}
