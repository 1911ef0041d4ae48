//! UDP transport hand-off state machine
//!
//! Owns the active transport descriptor and decides, for every donated
//! descriptor, whether it becomes the active transport or is closed.
//!
//! ```text
//!            hello                     trial verified
//!  WaitFd ───────────▶ Setup   Active ───────────────▶ Active (new fd)
//!     │                          │
//!     │ malformed ancillary,     │ trial rejected
//!     │ session, no fd           ▼
//!     ▼                        Active (old fd, candidate closed)
//!  Disabled
//! ```

use std::fmt;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use tracing::{debug, info, warn};

use super::trial::{trial_decrypt, TrialOutcome};
use crate::error::HandoverError;
use crate::transport::{DtlsSession, TransportBinding, TransportFd, UdpHandoverAnnouncement};

/// UDP (DTLS) transport state of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UdpState {
    /// No UDP transport wanted, or hand-off abandoned
    Disabled,
    /// Waiting for the main process to donate a descriptor
    WaitFd,
    /// Client hello descriptor adopted, DTLS handshake pending
    Setup,
    /// Validated transport in place
    Active,
}

impl fmt::Display for UdpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disabled => "disabled",
            Self::WaitFd => "wait-fd",
            Self::Setup => "setup",
            Self::Active => "active",
        };
        f.write_str(name)
    }
}

/// The committed UDP transport: descriptor and the announcement it came with
#[derive(Debug, Default)]
pub struct ActiveTransport {
    fd: Option<TransportFd>,
    announcement: Option<UdpHandoverAnnouncement>,
}

impl ActiveTransport {
    /// Raw descriptor number, `None` if no transport is committed
    #[must_use]
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.fd.as_ref().map(AsRawFd::as_raw_fd)
    }

    /// Whether a descriptor is committed
    #[must_use]
    pub const fn is_some(&self) -> bool {
        self.fd.is_some()
    }

    /// Announcement the committed descriptor arrived with
    #[must_use]
    pub const fn announcement(&self) -> Option<&UdpHandoverAnnouncement> {
        self.announcement.as_ref()
    }

    /// Install a new transport, returning the previous one still open
    fn replace(
        &mut self,
        fd: TransportFd,
        announcement: Option<UdpHandoverAnnouncement>,
    ) -> Self {
        debug_assert_ne!(self.raw_fd(), Some(fd.as_raw_fd()));
        Self {
            fd: self.fd.replace(fd),
            announcement: std::mem::replace(&mut self.announcement, announcement),
        }
    }
}

/// What happened to a donated descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoverOutcome {
    /// The descriptor is now the active transport
    Adopted {
        /// State after adoption
        state: UdpState,
        /// Whether a trial decrypt vouched for it
        validated: bool,
    },
    /// Trial decrypt failed; the descriptor was closed
    Rejected,
}

/// Hand-off state machine
#[derive(Debug)]
pub struct UdpHandover {
    state: UdpState,
    active: ActiveTransport,
}

impl UdpHandover {
    /// Start in `initial` with no transport
    #[must_use]
    pub fn new(initial: UdpState) -> Self {
        let state = if initial == UdpState::Active {
            // Active needs a descriptor
            UdpState::WaitFd
        } else {
            initial
        };
        Self {
            state,
            active: ActiveTransport::default(),
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> UdpState {
        self.state
    }

    /// Committed transport
    #[must_use]
    pub const fn active(&self) -> &ActiveTransport {
        &self.active
    }

    /// Binding for a session attached after the transport was committed.
    ///
    /// Replays the announcement's datagram, which the main process already
    /// took off the socket.
    #[must_use]
    pub fn binding(&self) -> TransportBinding {
        match self.active.raw_fd() {
            Some(fd) => TransportBinding::new(
                fd,
                self.active
                    .announcement()
                    .and_then(UdpHandoverAnnouncement::first_datagram),
            ),
            None => TransportBinding::unbound(),
        }
    }

    /// Record that the DTLS handshake on the adopted transport completed.
    ///
    /// Returns `false` (state unchanged) if no descriptor is committed.
    pub fn mark_established(&mut self) -> bool {
        if !self.active.is_some() {
            return false;
        }
        self.state = UdpState::Active;
        true
    }

    /// Handle a donated descriptor.
    ///
    /// `announcement` is `None` when the payload did not decode; it is then
    /// handled as an initial hello. The descriptor is either adopted or
    /// closed before this returns.
    ///
    /// # Errors
    ///
    /// Returns `HandoverError::NonBlocking` if the descriptor cannot be made
    /// non-blocking. It is closed and the state is unchanged.
    pub fn accept_donation<S: DtlsSession + ?Sized>(
        &mut self,
        mut session: Option<&mut S>,
        fd: OwnedFd,
        announcement: Option<UdpHandoverAnnouncement>,
        record_buf: &mut [u8],
    ) -> Result<HandoverOutcome, HandoverError> {
        if self.state != UdpState::WaitFd || self.active.is_some() {
            debug!(state = %self.state, "received another UDP fd");
        }

        let is_hello = announcement
            .as_ref()
            .map_or(true, UdpHandoverAnnouncement::is_initial_hello);

        let candidate = TransportFd::from_donated(fd).inspect_err(|e| {
            warn!("discarding donated UDP fd: {}", e);
        })?;

        if is_hello {
            let binding = TransportBinding::new(
                candidate.as_raw_fd(),
                announcement
                    .as_ref()
                    .and_then(UdpHandoverAnnouncement::first_datagram),
            );
            self.commit(session, candidate, announcement, binding, UdpState::Setup);
            return Ok(HandoverOutcome::Adopted {
                state: UdpState::Setup,
                validated: false,
            });
        }

        let outcome = trial_decrypt(
            session.as_deref_mut(),
            self.state,
            &candidate,
            announcement.as_ref(),
            record_buf,
        );

        match outcome {
            TrialOutcome::Verified(binding) => {
                self.commit(session, candidate, announcement, binding, UdpState::Active);
                Ok(HandoverOutcome::Adopted {
                    state: UdpState::Active,
                    validated: true,
                })
            }
            TrialOutcome::Skipped => {
                let binding = TransportBinding::new(
                    candidate.as_raw_fd(),
                    announcement
                        .as_ref()
                        .and_then(UdpHandoverAnnouncement::first_datagram),
                );
                let state = self.state;
                self.commit(session, candidate, announcement, binding, state);
                Ok(HandoverOutcome::Adopted {
                    state,
                    validated: false,
                })
            }
            TrialOutcome::Rejected(reason) => {
                info!(
                    "received UDP fd message but its session has invalid data: {}",
                    reason
                );
                drop(candidate);
                Ok(HandoverOutcome::Rejected)
            }
        }
    }

    /// Handle a `UDP_FD` message whose ancillary data was unusable.
    ///
    /// With a live session and nothing committed there is no point waiting
    /// for another hand-off, so UDP is disabled.
    pub fn reject_ancillary(&mut self, session_present: bool) -> UdpState {
        if session_present && !self.active.is_some() {
            info!("no UDP transport to fall back to, disabling UDP");
            self.state = UdpState::Disabled;
        }
        self.state
    }

    /// Adopt `fd`, re-point the session, then close the previous transport
    fn commit<S: DtlsSession + ?Sized>(
        &mut self,
        session: Option<&mut S>,
        fd: TransportFd,
        announcement: Option<UdpHandoverAnnouncement>,
        binding: TransportBinding,
        state: UdpState,
    ) {
        let raw = fd.as_raw_fd();
        let previous = self.active.replace(fd, announcement);
        if let Some(session) = session {
            session.set_transport(binding);
        }
        self.state = state;

        if let Some(old) = previous.raw_fd() {
            debug!(old_fd = old, new_fd = raw, "retiring previous UDP fd");
        }
        drop(previous);

        debug!(fd = raw, state = %state, "received new UDP fd and connected to peer");
    }
}
