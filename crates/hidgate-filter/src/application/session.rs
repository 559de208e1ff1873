//! The filter session: the one object that owns all cross-device state.
//!
//! A session holds the device registry and the detection handshake, and
//! exposes the operations the control surface dispatches to. It exists so
//! that nothing in the system lives in ambient globals: the daemon creates
//! one session per device class and passes it by reference into the
//! transport layer and into each device's input callback.
//!
//! # The two call contexts
//!
//! [`FilterSession::handle_input`] is the hot path. The underlying device
//! stack calls it synchronously once per packet batch, potentially at a
//! priority where blocking is not an option. It takes exactly two short
//! locks, the detection slot (a flag flip) and the device's rule store
//! (rule evaluation), and performs the upstream delivery outside both.
//!
//! Everything else here is the administrative path: infrequent, allowed to
//! wait on locks, never allowed to make the hot path wait on I/O in return.

use std::sync::Arc;

use hidgate_core::error::ControlError;
use hidgate_core::packet::InputPacket;
use tracing::{debug, info, trace};

use super::detect::DetectionHandshake;
use super::device::{DeviceContext, InputSink};
use super::engine;
use super::registry::DeviceRegistry;

/// Process-wide state for one class of filtered devices.
pub struct FilterSession<P: InputPacket> {
    registry: DeviceRegistry<P>,
    detection: DetectionHandshake<P>,
}

impl<P: InputPacket> FilterSession<P> {
    pub fn new() -> Self {
        Self {
            registry: DeviceRegistry::new(),
            detection: DetectionHandshake::new(),
        }
    }

    /// The device registry (membership + active id).
    pub fn registry(&self) -> &DeviceRegistry<P> {
        &self.registry
    }

    /// The shared detection handshake.
    pub fn detection(&self) -> &DetectionHandshake<P> {
        &self.detection
    }

    // ── Device lifecycle ──────────────────────────────────────────────────────

    /// Registers a newly arrived physical device and returns its context.
    ///
    /// `attributes` is the device's one-time static attribute snapshot,
    /// served verbatim by GetAttributes. The first attach brings the
    /// administrative surface up.
    pub fn attach(&self, attributes: Vec<u8>) -> Arc<DeviceContext<P>> {
        let device = Arc::new(DeviceContext::new(attributes));
        let id = self.registry.attach(device.clone());
        if id == 0 {
            info!("first device attached; administrative surface up");
        }
        device
    }

    /// Unregisters a departing device.
    ///
    /// The last detach tears the administrative surface down with it: any
    /// parked detection request is dropped, and the device's rule buffers go
    /// away when the final reference to its context does.
    pub fn detach(&self, device: &Arc<DeviceContext<P>>) {
        if self.registry.detach(device) && self.registry.is_empty() {
            self.detection.reset();
            info!("last device detached; administrative surface torn down");
        }
    }

    // ── Hot path ──────────────────────────────────────────────────────────────

    /// Processes one batch of packets freshly produced by `device` and
    /// forwards the survivors upstream.
    ///
    /// Returns the total packets consumed: packets dropped by filtering plus
    /// packets the upstream sink took. Dropped packets must be counted even
    /// though they are never forwarded — the producing device retires them
    /// either way.
    pub fn handle_input(&self, device: &Arc<DeviceContext<P>>, mut batch: Vec<P>) -> usize {
        // Detection first: any batch from any device resolves an armed
        // handshake, before filtering can swallow the evidence.
        self.detection.resolve(device);

        let dropped = device.with_rules(|store| engine::apply(store, &mut batch));

        if batch.is_empty() {
            // Fully filtered (or empty to begin with): nothing to forward.
            return dropped;
        }

        let Some(sink) = device.upstream() else {
            // No consumer connected yet; input produced this early has
            // nowhere to go. Count only what filtering retired.
            debug!("batch dropped: no upstream consumer connected");
            return dropped;
        };

        let forwarded = sink.deliver(&batch);
        trace!(dropped, forwarded, "batch forwarded");
        dropped + forwarded
    }

    // ── Administrative operations ─────────────────────────────────────────────

    /// The device administrative operations currently target.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::NoDeviceAvailable`] when the registry is
    /// empty.
    pub fn active_device(&self) -> Result<Arc<DeviceContext<P>>, ControlError> {
        self.registry.active().ok_or(ControlError::NoDeviceAvailable)
    }

    /// Injects a pre-built batch through the active device's upstream
    /// callback, bypassing filter and modify evaluation entirely.
    ///
    /// Returns the number of packets the upstream consumer took.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::InvalidRequest`] when there is no active
    /// device or it has no upstream connection to deliver through.
    pub fn insert_packets(&self, batch: &[P]) -> Result<usize, ControlError> {
        let device = self.registry.active().ok_or(ControlError::InvalidRequest)?;
        let sink = device.upstream().ok_or(ControlError::InvalidRequest)?;
        let consumed = sink.deliver(batch);
        debug!(count = batch.len(), consumed, "packets injected");
        Ok(consumed)
    }

    /// Parks until any device observes input, then reports (and activates)
    /// the device that produced it.
    ///
    /// The id is resolved against the registry on this task, after the hot
    /// path has already moved on; a device that detaches between resolution
    /// and delivery is reported by the standing active id instead, and the
    /// value is not re-validated afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::NoDeviceAvailable`] when no devices are
    /// attached (or the surface is torn down while parked) and
    /// [`ControlError::OperationInProgress`] when a detection is already
    /// armed.
    pub async fn detect_device_id(&self) -> Result<u16, ControlError> {
        if self.registry.is_empty() {
            return Err(ControlError::NoDeviceAvailable);
        }
        let rx = self.detection.arm()?;
        let device = rx.await.map_err(|_| ControlError::NoDeviceAvailable)?;
        let id = self.registry.activate_matching(&device);
        info!(id, "input device detected");
        Ok(id)
    }
}

impl<P: InputPacket> Default for FilterSession<P> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
