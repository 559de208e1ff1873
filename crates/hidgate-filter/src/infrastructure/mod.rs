//! Infrastructure adapters around the application core.
//!
//! - **`control`** – Maps operation codes and raw payload bytes onto session
//!   operations, honoring the caller-reported output capacity.
//! - **`config`** – TOML daemon configuration.
//! - **`sink`** – Upstream sink implementations for the daemon.
//! - **`server`** – Unix-socket control transport (dev harness; the real
//!   transport is whatever the host plumbing provides).

pub mod config;
pub mod control;
#[cfg(unix)]
pub mod server;
pub mod sink;
