//! hidgate-filter library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the daemon entry point in `main.rs` share the same module tree.

pub mod application;
pub mod infrastructure;

pub use application::device::{DeviceContext, InputSink};
pub use application::session::FilterSession;
