//! # hidgate-core
//!
//! Shared library for hidgate containing the input packet model, the
//! filter/modify rule model, device attribute records, the administrative
//! error taxonomy, and the binary control-protocol codec.
//!
//! This crate is used by both the filter engine and the administrative
//! client. It has zero dependencies on OS APIs, sockets, or async runtimes.
//!
//! # Architecture overview
//!
//! hidgate is a HID input-pipeline filter: it sits between a physical
//! keyboard/mouse device stack and the system's input consumer, sees every
//! packet batch on its way upstream, and can drop packets, rewrite their
//! codes, or inject synthetic ones. An out-of-process administrative client
//! selects which attached device the rules target and manages the rule sets
//! over a small binary protocol.
//!
//! This crate defines:
//!
//! - **`packet`** – The fixed-layout keyboard and mouse event records, the
//!   raw-to-predicate flag translation, and the [`InputPacket`] trait the
//!   filter engine is generic over.
//! - **`rules`** – Filter and modify rule records and the per-device
//!   [`FilterConfig`].
//! - **`attributes`** – Static device attribute records, cached once per
//!   device and served verbatim to administrative callers.
//! - **`protocol`** – Operation codes and the hand-rolled little-endian
//!   codec for request/response frames and rule/packet payloads.
//! - **`error`** – The [`ControlError`] taxonomy and its wire status codes.

pub mod attributes;
pub mod error;
pub mod packet;
pub mod protocol;
pub mod rules;

// Re-export the most-used types at the crate root so callers can write
// `hidgate_core::FilterRule` instead of `hidgate_core::rules::FilterRule`.
pub use attributes::{KeyboardAttributes, MouseAttributes};
pub use error::{ControlError, STATUS_SUCCESS};
pub use packet::{translate_flags, InputPacket, KeyboardPacket, MousePacket};
pub use protocol::codec::ProtocolError;
pub use protocol::ops::{ControlOp, DeviceQuery};
pub use rules::{FilterConfig, FilterMode, FilterRule, ModifyRule};
