//! Application layer of the filter engine.
//!
//! Everything here is pure in-process state and logic: no sockets, no file
//! system, no async. The two call contexts that meet in this layer are the
//! hot input-delivery path (synchronous, once per packet batch, must never
//! block) and the administrative handlers (infrequent, may wait on locks).
//!
//! # Sub-modules
//!
//! - **`rule_store`** – Per-device filter configuration and modify rule list
//!   with snapshot/replace and idempotent add/remove semantics.
//! - **`engine`** – The hot-path transform: drops and rewrites packets in a
//!   batch under a device's rule store.
//! - **`device`** – Per-device context: rule store, cached attributes, and
//!   the upstream sink installed at connect time.
//! - **`registry`** – Ordered collection of attached devices plus the active
//!   device id, behind one registry-wide lock.
//! - **`detect`** – Single-flight "which device produces the next input"
//!   handshake.
//! - **`session`** – The owning object that ties the above together and
//!   exposes the operations the control surface dispatches to.

pub mod detect;
pub mod device;
pub mod engine;
pub mod registry;
pub mod rule_store;
pub mod session;
