//! Trial decrypt of a candidate descriptor
//!
//! Before a re-homed descriptor replaces the active transport, the live
//! session is pointed at it and asked for exactly one record. Only a peer
//! holding the session keys can produce a record that decrypts. The
//! session's previous binding is put back on every exit path.

use std::os::fd::AsRawFd;

use tracing::{debug, trace};

use super::state::UdpState;
use crate::error::RecordError;
use crate::transport::{DtlsSession, TransportBinding, TransportFd, UdpHandoverAnnouncement};

/// Result of probing a candidate descriptor
#[derive(Debug)]
pub enum TrialOutcome {
    /// A record decrypted; carries the binding as left by the read
    Verified(TransportBinding),
    /// No record, or one that failed to decrypt
    Rejected(RecordError),
    /// No live session to validate against, or validation not expected
    Skipped,
}

/// Session attached to a candidate transport for the duration of a trial
///
/// The binding saved at construction is restored when the guard drops.
pub struct TransportSwap<'s, S: DtlsSession + ?Sized> {
    session: &'s mut S,
    saved: Option<TransportBinding>,
}

impl<'s, S: DtlsSession + ?Sized> TransportSwap<'s, S> {
    /// Save the current binding and attach `candidate`
    pub fn attach(session: &'s mut S, candidate: TransportBinding) -> Self {
        let saved = session.transport();
        session.set_transport(candidate);
        Self {
            session,
            saved: Some(saved),
        }
    }

    /// The session, currently reading from the candidate
    pub fn session(&mut self) -> &mut S {
        self.session
    }

    /// Restore the saved binding and return the candidate binding as the
    /// trial left it.
    #[must_use]
    pub fn release(self) -> TransportBinding {
        self.session.transport()
    }
}

impl<S: DtlsSession + ?Sized> Drop for TransportSwap<'_, S> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.session.set_transport(saved);
        }
    }
}

/// Probe `candidate` with one non-blocking record read through `session`.
///
/// Validation only runs when a session exists and the transport is
/// `Active`; otherwise the outcome is `Skipped`. `record_buf` receives the
/// decrypted record, if any.
pub fn trial_decrypt<S: DtlsSession + ?Sized>(
    session: Option<&mut S>,
    state: UdpState,
    candidate: &TransportFd,
    announcement: Option<&UdpHandoverAnnouncement>,
    record_buf: &mut [u8],
) -> TrialOutcome {
    let Some(session) = session else {
        trace!("no DTLS session, skipping trial decrypt");
        return TrialOutcome::Skipped;
    };
    if state != UdpState::Active {
        trace!("UDP state {:?}, skipping trial decrypt", state);
        return TrialOutcome::Skipped;
    }

    let binding = TransportBinding::new(
        candidate.as_raw_fd(),
        announcement.and_then(UdpHandoverAnnouncement::first_datagram),
    );

    let mut swap = TransportSwap::attach(session, binding);
    let result = swap.session().recv_record(record_buf);

    match result {
        Ok(n) if n > 0 => {
            debug!(fd = candidate.as_raw_fd(), bytes = n, "trial decrypt succeeded");
            TrialOutcome::Verified(swap.release())
        }
        Ok(_) => TrialOutcome::Rejected(RecordError::WouldBlock),
        Err(e) => TrialOutcome::Rejected(e),
    }
}
