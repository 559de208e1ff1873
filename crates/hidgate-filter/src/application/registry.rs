//! Ordered collection of attached devices plus the active device id.
//!
//! One registry-wide lock guards membership and the active id together.
//! Lock ordering: when both the registry lock and a device's rule lock are
//! needed, the registry lock is taken first and released before the device
//! lock is acquired; it is never nested inside a device lock.

use std::sync::{Arc, Mutex};

use hidgate_core::error::ControlError;
use hidgate_core::packet::InputPacket;
use hidgate_core::protocol::ops::DeviceQuery;
use tracing::debug;

use super::device::DeviceContext;

struct RegistryInner<P: InputPacket> {
    devices: Vec<Arc<DeviceContext<P>>>,
    active_id: u16,
}

/// Registry of every attached filter device, indexed by small integer id.
///
/// Ids are positional: attach appends at the tail (id = previous count) and
/// detach shifts later devices down, so an id is only stable while the
/// membership is. The active id is clamped back into range whenever a
/// removal would strand it.
pub struct DeviceRegistry<P: InputPacket> {
    inner: Mutex<RegistryInner<P>>,
}

impl<P: InputPacket> DeviceRegistry<P> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                devices: Vec::new(),
                active_id: 0,
            }),
        }
    }

    /// Appends `device`; returns its id (the previous count).
    pub fn attach(&self, device: Arc<DeviceContext<P>>) -> u16 {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        let id = inner.devices.len() as u16;
        inner.devices.push(device);
        debug!(id, count = inner.devices.len(), "device attached");
        id
    }

    /// Removes `device` by identity. Returns `true` if it was present.
    ///
    /// The active id is clamped so the `[0, count)` invariant holds for the
    /// devices that remain.
    pub fn detach(&self, device: &Arc<DeviceContext<P>>) -> bool {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        let before = inner.devices.len();
        inner.devices.retain(|d| !Arc::ptr_eq(d, device));
        let removed = inner.devices.len() != before;
        if removed {
            let count = inner.devices.len() as u16;
            if inner.active_id >= count {
                inner.active_id = count.saturating_sub(1);
            }
            debug!(count, "device detached");
        }
        removed
    }

    /// Number of attached devices.
    pub fn count(&self) -> u16 {
        self.inner.lock().expect("registry lock poisoned").devices.len() as u16
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// The device at `id`, if any.
    pub fn get(&self, id: u16) -> Option<Arc<DeviceContext<P>>> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner.devices.get(id as usize).cloned()
    }

    /// The device administrative operations currently target.
    pub fn active(&self) -> Option<Arc<DeviceContext<P>>> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner.devices.get(inner.active_id as usize).cloned()
    }

    /// Sets the active id.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::InvalidParameter`] when `id` is out of range,
    /// including any id while the registry is empty (in which case the
    /// active id also resets to 0, as the original control surface did).
    pub fn set_active_id(&self, id: u16) -> Result<(), ControlError> {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        let count = inner.devices.len() as u16;
        if count == 0 {
            inner.active_id = 0;
            return Err(ControlError::InvalidParameter);
        }
        if id >= count {
            return Err(ControlError::InvalidParameter);
        }
        inner.active_id = id;
        Ok(())
    }

    /// Active id and device count, read under one lock acquisition.
    pub fn query(&self) -> DeviceQuery {
        let inner = self.inner.lock().expect("registry lock poisoned");
        DeviceQuery {
            active_id: inner.active_id,
            count: inner.devices.len() as u16,
        }
    }

    /// Resolves `device` to its current id and makes it active, in one
    /// critical section.
    ///
    /// If the device has already detached, the current active id is reported
    /// instead — the id is deliberately not re-validated beyond that, which
    /// reproduces the detection race of the original (see DESIGN.md).
    pub fn activate_matching(&self, device: &Arc<DeviceContext<P>>) -> u16 {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        let id = inner
            .devices
            .iter()
            .position(|d| Arc::ptr_eq(d, device))
            .map(|i| i as u16)
            .unwrap_or(inner.active_id);
        inner.active_id = id;
        id
    }
}

impl<P: InputPacket> Default for DeviceRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
