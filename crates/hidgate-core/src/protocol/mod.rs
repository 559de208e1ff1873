//! Control protocol: operation codes and the binary codec.

pub mod codec;
pub mod ops;

pub use codec::ProtocolError;
pub use ops::{ControlOp, DeviceQuery};
