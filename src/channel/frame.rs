//! Control message framing
//!
//! Each message is `opcode (1) | length (2, host order) | payload`, received
//! in one call. The length field comes from the other side of a trust
//! boundary and is checked against what actually arrived before the payload
//! is looked at.

use super::ancillary::Ancillary;
use super::command::{command_name, Command};
use crate::error::ExitReason;

/// Opcode byte plus length field
pub const HEADER_SIZE: usize = 3;

/// Capacity of the payload buffer
pub const CMD_PAYLOAD_MAX: usize = 1536;

/// Fixed payload buffer reused across receives
pub type PayloadBuffer = [u8; CMD_PAYLOAD_MAX];

/// Check a received frame and return the usable payload length.
///
/// `received` is the total byte count returned by the receive call,
/// header included. A frame shorter than the header cannot carry a length
/// it can be held to, so it is rejected the same way.
///
/// # Errors
///
/// Returns `ExitReason::MalformedFrame` if `declared` exceeds the bytes
/// received after the header or the payload capacity.
pub fn validate_frame(opcode: u8, declared: u16, received: usize) -> Result<usize, ExitReason> {
    let declared_len = usize::from(declared);
    let available = received.checked_sub(HEADER_SIZE);

    match available {
        Some(available) if declared_len <= available && declared_len <= CMD_PAYLOAD_MAX => {
            Ok(declared_len)
        }
        _ => Err(ExitReason::malformed(
            command_name(opcode),
            received.saturating_sub(HEADER_SIZE),
            declared,
        )),
    }
}

/// One validated message from the main process
#[derive(Debug)]
pub struct IncomingMessage<'a> {
    opcode: u8,
    declared_length: u16,
    payload: &'a [u8],
    ancillary: Ancillary,
}

impl<'a> IncomingMessage<'a> {
    /// Build a message from raw parts, validating the length field.
    ///
    /// `payload` is the full receive buffer; only the declared prefix is kept.
    ///
    /// # Errors
    ///
    /// Returns `ExitReason::MalformedFrame` if the length does not hold up.
    /// The ancillary data is dropped (closing any descriptor) in that case.
    pub fn new(
        opcode: u8,
        declared_length: u16,
        received: usize,
        payload: &'a [u8],
        ancillary: Ancillary,
    ) -> Result<Self, ExitReason> {
        let len = validate_frame(opcode, declared_length, received)?;
        let payload = payload.get(..len).ok_or_else(|| {
            ExitReason::malformed(command_name(opcode), payload.len(), declared_length)
        })?;

        Ok(Self {
            opcode,
            declared_length,
            payload,
            ancillary,
        })
    }

    /// Raw opcode byte
    #[must_use]
    pub const fn opcode(&self) -> u8 {
        self.opcode
    }

    /// Decoded command, `None` if the opcode is unknown
    #[must_use]
    pub const fn command(&self) -> Option<Command> {
        Command::from_opcode(self.opcode)
    }

    /// Declared payload length
    #[must_use]
    pub const fn declared_length(&self) -> u16 {
        self.declared_length
    }

    /// Payload, limited to the declared length
    #[must_use]
    pub const fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Take the ancillary data out of the message
    pub fn take_ancillary(&mut self) -> Ancillary {
        std::mem::take(&mut self.ancillary)
    }
}
