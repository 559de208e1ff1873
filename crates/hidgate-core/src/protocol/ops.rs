//! Control-surface operation codes and small fixed-shape payload types.

use serde::{Deserialize, Serialize};

/// The nine administrative operations, keyed by their wire codes.
///
/// Codes are the function indices of the original control interface and are
/// part of the wire contract; do not renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum ControlOp {
    /// Read the cached static attributes of the active device.
    GetAttributes = 0x0800,
    /// Inject a pre-built packet batch through the active device's upstream
    /// callback, bypassing filter and modify evaluation.
    InsertPackets = 0x0801,
    /// Select which device subsequent rule operations target.
    SetActiveDevice = 0x0802,
    /// Query the active device id and the device count.
    GetDevices = 0x0803,
    /// Park until any device observes input, then report that device's id.
    DetectDeviceId = 0x0804,
    /// Replace the active device's filter configuration.
    SetFilter = 0x0805,
    /// Snapshot the active device's filter configuration.
    GetFilter = 0x0806,
    /// Replace the active device's modify rule list.
    SetModify = 0x0807,
    /// Snapshot the active device's modify rule list.
    GetModify = 0x0808,
}

impl TryFrom<u16> for ControlOp {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, ()> {
        match value {
            0x0800 => Ok(ControlOp::GetAttributes),
            0x0801 => Ok(ControlOp::InsertPackets),
            0x0802 => Ok(ControlOp::SetActiveDevice),
            0x0803 => Ok(ControlOp::GetDevices),
            0x0804 => Ok(ControlOp::DetectDeviceId),
            0x0805 => Ok(ControlOp::SetFilter),
            0x0806 => Ok(ControlOp::GetFilter),
            0x0807 => Ok(ControlOp::SetModify),
            0x0808 => Ok(ControlOp::GetModify),
            _ => Err(()),
        }
    }
}

/// GetDevices reply: the active id plus the number of attached devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceQuery {
    /// Id of the device administrative operations currently target.
    pub active_id: u16,
    /// Number of attached filter devices.
    pub count: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_op_codes_round_trip() {
        let ops = [
            ControlOp::GetAttributes,
            ControlOp::InsertPackets,
            ControlOp::SetActiveDevice,
            ControlOp::GetDevices,
            ControlOp::DetectDeviceId,
            ControlOp::SetFilter,
            ControlOp::GetFilter,
            ControlOp::SetModify,
            ControlOp::GetModify,
        ];
        for op in ops {
            assert_eq!(ControlOp::try_from(op as u16), Ok(op));
        }
    }

    #[test]
    fn test_unknown_op_code_is_rejected() {
        assert!(ControlOp::try_from(0x0809).is_err());
        assert!(ControlOp::try_from(0x0000).is_err());
    }
}
