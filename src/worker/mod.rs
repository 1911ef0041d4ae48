//! Worker process context and command loop
//!
//! A [`Worker`] is created once per client connection. It owns the control
//! channel, the fixed receive buffers, the DTLS session (once one exists)
//! and the UDP hand-off state, and is driven by a single-threaded loop that
//! blocks on the control channel.

mod dispatch;
mod setup;

use std::time::Duration;

use tracing::{debug, error, info, trace};

pub use dispatch::{dispatch, CommandOutcome};
pub use setup::prepare_process;

use crate::channel::{ControlChannel, PayloadBuffer, CMD_PAYLOAD_MAX};
use crate::config::ControlConfig;
use crate::error::ExitReason;
use crate::handover::{UdpHandover, UdpState};
use crate::transport::DtlsSession;

/// Per-worker state, alive for the whole worker process
pub struct Worker {
    channel: ControlChannel,
    payload: PayloadBuffer,
    record_buf: Box<[u8]>,
    session: Option<Box<dyn DtlsSession>>,
    udp: UdpHandover,
    poll_timeout: Duration,
}

impl Worker {
    /// Create the worker context around a connected control channel
    #[must_use]
    pub fn new(channel: ControlChannel, config: &ControlConfig) -> Self {
        let initial = if config.udp_enabled {
            UdpState::WaitFd
        } else {
            UdpState::Disabled
        };

        Self {
            channel,
            payload: [0; CMD_PAYLOAD_MAX],
            record_buf: vec![0; config.record_buffer_size].into_boxed_slice(),
            session: None,
            udp: UdpHandover::new(initial),
            poll_timeout: config.poll_timeout(),
        }
    }

    /// Attach the DTLS session, bound to the current UDP transport if any
    pub fn attach_session(&mut self, mut session: Box<dyn DtlsSession>) {
        session.set_transport(self.udp.binding());
        self.session = Some(session);
    }

    /// Builder form of [`Worker::attach_session`]
    #[must_use]
    pub fn with_session(mut self, session: Box<dyn DtlsSession>) -> Self {
        self.attach_session(session);
        self
    }

    /// The DTLS session, if attached
    #[must_use]
    pub fn session(&self) -> Option<&dyn DtlsSession> {
        self.session.as_deref()
    }

    /// UDP hand-off state
    #[must_use]
    pub const fn udp(&self) -> &UdpHandover {
        &self.udp
    }

    /// Mutable UDP hand-off state, for the handshake layer
    pub fn udp_mut(&mut self) -> &mut UdpHandover {
        &mut self.udp
    }

    /// Receive and dispatch exactly one command.
    ///
    /// # Errors
    ///
    /// Returns the `ExitReason` when the worker must stop.
    pub fn handle_command(&mut self) -> Result<CommandOutcome, ExitReason> {
        let Self {
            channel,
            payload,
            record_buf,
            session,
            udp,
            ..
        } = self;

        let message = channel.recv(payload)?;
        let outcome = dispatch(message, udp, session.as_deref_mut(), record_buf)?;

        trace!(?outcome, state = %udp.state(), "command handled");
        Ok(outcome)
    }

    /// Serve commands until the worker has to stop.
    ///
    /// Blocks on the control channel, waking up every poll timeout.
    pub fn run(&mut self) -> ExitReason {
        info!(state = %self.udp.state(), "worker serving control channel");

        loop {
            match self.channel.wait_readable(self.poll_timeout) {
                Ok(true) => {
                    if let Err(reason) = self.handle_command() {
                        info!(code = reason.exit_code(), "worker exiting: {}", reason);
                        return reason;
                    }
                }
                Ok(false) => {
                    debug!("control channel idle");
                }
                Err(e) => {
                    error!("cannot poll command socket: {}", e);
                    return ExitReason::ReceiveFailed(e);
                }
            }
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("channel", &self.channel)
            .field("session", &self.session.is_some())
            .field("udp", &self.udp)
            .field("poll_timeout", &self.poll_timeout)
            .finish_non_exhaustive()
    }
}
