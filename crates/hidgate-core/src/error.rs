//! The administrative error taxonomy shared by the filter and its clients.
//!
//! Every control operation resolves to either success or one of these
//! variants; the wire carries them as a `u16` status so out-of-process
//! callers see the same taxonomy the in-process API returns. The hot input
//! path never surfaces errors at all — a bad configuration degrades to
//! "drop nothing extra", never to aborted input delivery.

use thiserror::Error;

/// Wire status for a successful control operation.
pub const STATUS_SUCCESS: u16 = 0x0000;

/// Failure taxonomy for administrative control operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    /// Caller-supplied buffer cannot hold the declared or required payload.
    #[error("buffer too small for the declared payload")]
    BufferTooSmall,

    /// Storage for a rule list could not be allocated; no partial mutation.
    #[error("insufficient resources for rule storage")]
    InsufficientResources,

    /// Out-of-range device id or structurally invalid request shape.
    #[error("invalid parameter")]
    InvalidParameter,

    /// The operation targets the active device but the registry is empty.
    #[error("no filter device available")]
    NoDeviceAvailable,

    /// A detection request is already armed.
    #[error("a detection request is already in progress")]
    OperationInProgress,

    /// A second upstream connection was attempted on a connected device.
    #[error("upstream connection already established")]
    SharingViolation,

    /// The request cannot be serviced in the current device state.
    #[error("invalid device request")]
    InvalidRequest,
}

impl ControlError {
    /// Stable status code carried on the wire.
    pub fn status_code(&self) -> u16 {
        match self {
            ControlError::BufferTooSmall => 0x0001,
            ControlError::InsufficientResources => 0x0002,
            ControlError::InvalidParameter => 0x0003,
            ControlError::NoDeviceAvailable => 0x0004,
            ControlError::OperationInProgress => 0x0005,
            ControlError::SharingViolation => 0x0006,
            ControlError::InvalidRequest => 0x0007,
        }
    }

    /// Maps a wire status back to the taxonomy. `Ok(())` for
    /// [`STATUS_SUCCESS`], `Err(None)` for a status this build does not know.
    pub fn from_status(status: u16) -> Result<(), Option<ControlError>> {
        match status {
            STATUS_SUCCESS => Ok(()),
            0x0001 => Err(Some(ControlError::BufferTooSmall)),
            0x0002 => Err(Some(ControlError::InsufficientResources)),
            0x0003 => Err(Some(ControlError::InvalidParameter)),
            0x0004 => Err(Some(ControlError::NoDeviceAvailable)),
            0x0005 => Err(Some(ControlError::OperationInProgress)),
            0x0006 => Err(Some(ControlError::SharingViolation)),
            0x0007 => Err(Some(ControlError::InvalidRequest)),
            _ => Err(None),
        }
    }
}
