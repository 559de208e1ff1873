//! # hidgate-client
//!
//! Thin administrative client for the hidgate filter: typed wrappers for
//! the nine control operations, speaking the binary protocol from
//! `hidgate-core` over a pluggable [`ControlTransport`].
//!
//! The library is deliberately marshalling-only — rule semantics live on
//! the filter side; this crate just moves well-formed frames.

pub mod client;
pub mod transport;

pub use client::{ClientError, ControlClient};
#[cfg(unix)]
pub use transport::UnixTransport;
pub use transport::ControlTransport;
