//! Command dispatch
//!
//! Routes a validated message to its handler. Nothing decoded from the
//! payload escapes this module as an error: a message either ends the
//! worker (`ExitReason`) or is handled, possibly by discarding what it
//! carried.

use tracing::{debug, error};

use crate::channel::{Ancillary, Command, IncomingMessage};
use crate::error::{ExitReason, HandoverError};
use crate::handover::{HandoverOutcome, UdpHandover};
use crate::transport::{DtlsSession, UdpHandoverAnnouncement};

/// Result of a command that did not end the worker
#[derive(Debug)]
pub enum CommandOutcome {
    /// A donated descriptor went through the hand-off state machine
    Handover(HandoverOutcome),
    /// The hand-off was abandoned; existing transport untouched
    Discarded(HandoverError),
}

/// Dispatch one message.
///
/// # Errors
///
/// - `ExitReason::Terminated` for `TERMINATE`
/// - `ExitReason::UnknownCommand` for any opcode outside the command set
pub fn dispatch<S: DtlsSession + ?Sized>(
    mut message: IncomingMessage<'_>,
    udp: &mut UdpHandover,
    session: Option<&mut S>,
    record_buf: &mut [u8],
) -> Result<CommandOutcome, ExitReason> {
    match message.command() {
        Some(Command::Terminate) => Err(ExitReason::Terminated),
        Some(Command::UdpFd) => Ok(handle_udp_fd(&mut message, udp, session, record_buf)),
        None => {
            error!("unknown CMD 0x{:x}", message.opcode());
            Err(ExitReason::UnknownCommand(message.opcode()))
        }
    }
}

fn handle_udp_fd<S: DtlsSession + ?Sized>(
    message: &mut IncomingMessage<'_>,
    udp: &mut UdpHandover,
    session: Option<&mut S>,
    record_buf: &mut [u8],
) -> CommandOutcome {
    // An undecodable payload is handled as a client hello, which adopts the
    // descriptor without touching an established session.
    let announcement = UdpHandoverAnnouncement::decode_payload(message.payload());
    if announcement.is_none() {
        debug!(
            "UDP fd payload of {} bytes did not decode, assuming client hello",
            message.payload().len()
        );
    }

    match message.take_ancillary() {
        Ancillary::Descriptor(fd) => {
            match udp.accept_donation(session, fd, announcement, record_buf) {
                Ok(outcome) => CommandOutcome::Handover(outcome),
                Err(e) => CommandOutcome::Discarded(e),
            }
        }
        Ancillary::Malformed(reason) => {
            error!("received UDP fd message of wrong type: {}", reason);
            udp.reject_ancillary(session.is_some());
            CommandOutcome::Discarded(HandoverError::malformed(reason))
        }
        Ancillary::None => {
            error!("could not receive peer's UDP fd");
            CommandOutcome::Discarded(HandoverError::MissingDescriptor)
        }
    }
}
