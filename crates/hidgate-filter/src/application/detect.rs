//! Single-flight device-detection handshake.
//!
//! One instance is shared across all devices of a session. `arm` parks an
//! administrative request; the first packet batch any device's engine sees
//! resolves it. The hot path only flips the armed flag and hands the
//! originating device to a oneshot channel — copying the result out and
//! completing the request happens on the administrative task, never under
//! the packet-processing lock.

use std::sync::{Arc, Mutex};

use hidgate_core::error::ControlError;
use hidgate_core::packet::InputPacket;
use tokio::sync::oneshot;
use tracing::debug;

use super::device::DeviceContext;

struct Slot<P: InputPacket> {
    armed: bool,
    waiter: Option<oneshot::Sender<Arc<DeviceContext<P>>>>,
}

/// Shared one-shot "which device produces the next input" state.
pub struct DetectionHandshake<P: InputPacket> {
    slot: Mutex<Slot<P>>,
}

impl<P: InputPacket> DetectionHandshake<P> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                armed: false,
                waiter: None,
            }),
        }
    }

    /// Arms the handshake and returns the receiver the parked request waits
    /// on.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::OperationInProgress`] while a previous arm is
    /// still unresolved.
    pub fn arm(&self) -> Result<oneshot::Receiver<Arc<DeviceContext<P>>>, ControlError> {
        let mut slot = self.slot.lock().expect("detection lock poisoned");
        if slot.armed {
            return Err(ControlError::OperationInProgress);
        }
        let (tx, rx) = oneshot::channel();
        slot.armed = true;
        slot.waiter = Some(tx);
        debug!("detection armed");
        Ok(rx)
    }

    /// Hot-path resolution: if armed, disarms and hands `device` to the
    /// waiter. Nothing but a flag flip and a channel send happens here.
    pub fn resolve(&self, device: &Arc<DeviceContext<P>>) {
        let waiter = {
            let mut slot = self.slot.lock().expect("detection lock poisoned");
            if !slot.armed {
                return;
            }
            // Disarm before delivery so the next batch cannot race a second
            // resolution against the same waiter.
            slot.armed = false;
            slot.waiter.take()
        };
        if let Some(tx) = waiter {
            // The receiver may already be gone; resolution is best-effort.
            let _ = tx.send(device.clone());
        }
    }

    /// Whether a detection request is currently parked.
    pub fn is_armed(&self) -> bool {
        self.slot.lock().expect("detection lock poisoned").armed
    }

    /// Drops any parked request. Called when the last device detaches and
    /// the administrative surface goes down with it.
    pub fn reset(&self) {
        let mut slot = self.slot.lock().expect("detection lock poisoned");
        slot.armed = false;
        slot.waiter = None;
    }
}

impl<P: InputPacket> Default for DetectionHandshake<P> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
