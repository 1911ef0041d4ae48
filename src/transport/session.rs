//! DTLS session capability consumed by the worker
//!
//! The record layer lives outside this crate. The worker only needs to
//! re-point the session at a transport and ask it for one record.

use super::binding::TransportBinding;
use crate::error::RecordError;

/// A live DTLS session as seen by the hand-off logic
pub trait DtlsSession {
    /// The transport the session currently reads from
    fn transport(&self) -> TransportBinding;

    /// Attach the session to another transport
    fn set_transport(&mut self, binding: TransportBinding);

    /// Read and decrypt at most one record into `buf` without blocking.
    ///
    /// # Errors
    ///
    /// `RecordError::WouldBlock` when no record is available (including a
    /// datagram that was read but silently discarded), `RecordError::Decrypt`
    /// when a record fails authentication.
    fn recv_record(&mut self, buf: &mut [u8]) -> Result<usize, RecordError>;
}
