//! Typed wrappers for the nine control operations.

use hidgate_core::attributes::KeyboardAttributes;
use hidgate_core::error::ControlError;
use hidgate_core::packet::InputPacket;
use hidgate_core::protocol::codec::{
    self, FILTER_RULE_SIZE, MODIFY_RULE_SIZE,
};
use hidgate_core::protocol::ops::{ControlOp, DeviceQuery};
use hidgate_core::rules::{FilterConfig, FilterMode, FilterRule, ModifyRule};
use hidgate_core::ProtocolError;
use thiserror::Error;

use crate::transport::ControlTransport;

/// Errors surfaced to administrative callers.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport failed underneath the protocol.
    #[error("transport I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// A frame or payload violated the wire protocol.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// The filter rejected the operation.
    #[error("operation failed: {0}")]
    Operation(#[from] ControlError),

    /// The filter returned a status this build does not know.
    #[error("unknown status code 0x{0:04X}")]
    UnknownStatus(u16),
}

fn check_status(status: u16) -> Result<(), ClientError> {
    match ControlError::from_status(status) {
        Ok(()) => Ok(()),
        Err(Some(err)) => Err(ClientError::Operation(err)),
        Err(None) => Err(ClientError::UnknownStatus(status)),
    }
}

/// Administrative client over any [`ControlTransport`].
pub struct ControlClient<T: ControlTransport> {
    transport: T,
}

impl<T: ControlTransport> ControlClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Queries the active device id and the device count.
    pub async fn get_devices(&mut self) -> Result<DeviceQuery, ClientError> {
        let (status, payload) = self.transport.call(ControlOp::GetDevices, 4, &[]).await?;
        check_status(status)?;
        Ok(codec::decode_device_query(&payload)?)
    }

    /// Selects which device subsequent rule operations target.
    pub async fn set_active_device(&mut self, id: u16) -> Result<(), ClientError> {
        let (status, _) = self
            .transport
            .call(ControlOp::SetActiveDevice, 0, &codec::encode_device_id(id))
            .await?;
        check_status(status)
    }

    /// Parks until any device produces input; returns that device's id.
    ///
    /// The call stays pending indefinitely if no input ever arrives — there
    /// is no timeout in the protocol.
    pub async fn detect_device_id(&mut self) -> Result<u16, ClientError> {
        let (status, payload) = self
            .transport
            .call(ControlOp::DetectDeviceId, 2, &[])
            .await?;
        check_status(status)?;
        Ok(codec::decode_device_id(&payload)?)
    }

    /// Replaces the active device's filter configuration.
    pub async fn set_filter(&mut self, config: &FilterConfig) -> Result<(), ClientError> {
        let (status, _) = self
            .transport
            .call(ControlOp::SetFilter, 0, &codec::encode_filter_request(config))
            .await?;
        check_status(status)
    }

    /// Snapshots the active device's filter configuration, with room for up
    /// to `max_rules` rule records.
    ///
    /// The middle element of the result is the mode-dependent header field:
    /// the *true* rule count in `FlagAndScanCode` mode (reissue with a
    /// larger `max_rules` if it exceeds the returned list), the flag mask in
    /// `Flags` mode.
    pub async fn get_filter(
        &mut self,
        max_rules: u16,
    ) -> Result<(FilterMode, u16, Vec<FilterRule>), ClientError> {
        let capacity = 4 + max_rules as u32 * FILTER_RULE_SIZE as u32;
        let (status, payload) = self
            .transport
            .call(ControlOp::GetFilter, capacity, &[])
            .await?;
        check_status(status)?;
        Ok(codec::decode_filter_snapshot(&payload)?)
    }

    /// Replaces the active device's modify rule list.
    pub async fn set_modify(&mut self, rules: &[ModifyRule]) -> Result<(), ClientError> {
        let (status, _) = self
            .transport
            .call(ControlOp::SetModify, 0, &codec::encode_modify_request(rules))
            .await?;
        check_status(status)
    }

    /// Snapshots the active device's modify list; returns the true count and
    /// a prefix of at most `max_rules` rules.
    pub async fn get_modify(
        &mut self,
        max_rules: u16,
    ) -> Result<(u16, Vec<ModifyRule>), ClientError> {
        let capacity = 2 + max_rules as u32 * MODIFY_RULE_SIZE as u32;
        let (status, payload) = self
            .transport
            .call(ControlOp::GetModify, capacity, &[])
            .await?;
        check_status(status)?;
        Ok(codec::decode_modify_snapshot(&payload)?)
    }

    /// Injects a packet batch as if the active device had produced it.
    /// Injected packets bypass filter and modify evaluation.
    pub async fn insert_packets<P: InputPacket>(
        &mut self,
        packets: &[P],
    ) -> Result<(), ClientError> {
        let (status, _) = self
            .transport
            .call(ControlOp::InsertPackets, 0, &codec::encode_packets(packets))
            .await?;
        check_status(status)
    }

    /// Reads the active device's raw attribute blob.
    pub async fn get_attributes_raw(&mut self, capacity: u32) -> Result<Vec<u8>, ClientError> {
        let (status, payload) = self
            .transport
            .call(ControlOp::GetAttributes, capacity, &[])
            .await?;
        check_status(status)?;
        Ok(payload)
    }

    /// Reads the active device's attributes as a keyboard record.
    pub async fn get_keyboard_attributes(&mut self) -> Result<KeyboardAttributes, ClientError> {
        let blob = self
            .get_attributes_raw(KeyboardAttributes::ENCODED_SIZE as u32)
            .await?;
        Ok(KeyboardAttributes::decode(&blob)?)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
