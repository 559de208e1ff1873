//! Per-device context: rule state, cached attributes, and the upstream
//! connection installed by the input class consumer.

use std::sync::{Arc, Mutex};

use hidgate_core::error::ControlError;
use hidgate_core::packet::InputPacket;
use tracing::debug;

use super::rule_store::RuleStore;

/// The upstream consumer callback a device forwards its finished batches to.
///
/// This is the seam to the external input class service: the real
/// implementation hands packets to the OS input stack, tests record them.
/// `deliver` returns the number of packets the consumer took. The hot path
/// calls it synchronously, so implementations must not block.
pub trait InputSink<P>: Send + Sync {
    /// Delivers a finished batch upstream; returns packets consumed.
    fn deliver(&self, packets: &[P]) -> usize;
}

/// State owned by one attached filter device.
///
/// The rule store is guarded by its own mutex — the narrowest lock in the
/// system, taken by the hot path for the duration of rule evaluation only.
/// The upstream slot is set exactly once; a second connect attempt is a
/// sharing violation, mirroring the single-connection contract of the
/// device class interface.
pub struct DeviceContext<P: InputPacket> {
    rules: Mutex<RuleStore>,
    attributes: Vec<u8>,
    upstream: Mutex<Option<Arc<dyn InputSink<P>>>>,
}

impl<P: InputPacket> DeviceContext<P> {
    /// Creates a context for a newly attached device with its one-time
    /// attribute snapshot.
    pub fn new(attributes: Vec<u8>) -> Self {
        Self {
            rules: Mutex::new(RuleStore::new()),
            attributes,
            upstream: Mutex::new(None),
        }
    }

    /// Runs `f` with the rule store locked. All rule reads and
    /// read-modify-writes go through here so the critical section always
    /// spans the whole operation.
    pub fn with_rules<R>(&self, f: impl FnOnce(&mut RuleStore) -> R) -> R {
        let mut store = self.rules.lock().expect("rule store lock poisoned");
        f(&mut store)
    }

    /// Installs the upstream consumer callback.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::SharingViolation`] if a connection is already
    /// established.
    pub fn connect(&self, sink: Arc<dyn InputSink<P>>) -> Result<(), ControlError> {
        let mut slot = self.upstream.lock().expect("upstream lock poisoned");
        if slot.is_some() {
            return Err(ControlError::SharingViolation);
        }
        debug!("upstream consumer connected");
        *slot = Some(sink);
        Ok(())
    }

    /// The upstream sink, if connected.
    pub fn upstream(&self) -> Option<Arc<dyn InputSink<P>>> {
        self.upstream.lock().expect("upstream lock poisoned").clone()
    }

    /// The attribute blob cached at attach time, served verbatim.
    pub fn attributes(&self) -> &[u8] {
        &self.attributes
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use hidgate_core::packet::KeyboardPacket;
    use std::sync::Mutex as StdMutex;

    struct NullSink;

    impl InputSink<KeyboardPacket> for NullSink {
        fn deliver(&self, packets: &[KeyboardPacket]) -> usize {
            packets.len()
        }
    }

    #[test]
    fn test_second_connect_is_a_sharing_violation() {
        // Arrange
        let device = DeviceContext::<KeyboardPacket>::new(Vec::new());

        // Act
        let first = device.connect(Arc::new(NullSink));
        let second = device.connect(Arc::new(NullSink));

        // Assert
        assert!(first.is_ok());
        assert_eq!(second, Err(ControlError::SharingViolation));
    }

    #[test]
    fn test_upstream_is_none_before_connect() {
        let device = DeviceContext::<KeyboardPacket>::new(Vec::new());
        assert!(device.upstream().is_none());
    }

    #[test]
    fn test_attributes_are_served_verbatim() {
        let blob = vec![1u8, 2, 3, 4];
        let device = DeviceContext::<KeyboardPacket>::new(blob.clone());
        assert_eq!(device.attributes(), &blob[..]);
    }

    #[test]
    fn test_with_rules_spans_a_whole_read_modify_write() {
        // A recording sink is overkill here; what matters is that one closure
        // observes and mutates the store without the lock being released.
        let device = DeviceContext::<KeyboardPacket>::new(Vec::new());
        let observed = StdMutex::new(Vec::new());

        device.with_rules(|store| {
            observed.lock().unwrap().push(store.modify().len());
            store.add_modify_rule(hidgate_core::rules::ModifyRule {
                flag_predicates: 0xFFFF,
                from_code: 1,
                to_code: 2,
            });
            observed.lock().unwrap().push(store.modify().len());
        });

        assert_eq!(*observed.lock().unwrap(), vec![0, 1]);
    }
}
