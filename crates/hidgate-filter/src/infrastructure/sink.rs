//! Upstream sink implementations for the daemon.
//!
//! In a real deployment the upstream consumer is the OS input class service;
//! the daemon stands in a [`LoggingSink`] so injected and simulated traffic
//! is visible in the log.

use hidgate_core::packet::InputPacket;
use tracing::info;

use crate::application::device::InputSink;

/// Logs every delivered batch and consumes it whole.
pub struct LoggingSink {
    name: String,
}

impl LoggingSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl<P: InputPacket + std::fmt::Debug> InputSink<P> for LoggingSink {
    fn deliver(&self, packets: &[P]) -> usize {
        for packet in packets {
            info!(device = %self.name, ?packet, "upstream delivery");
        }
        packets.len()
    }
}
