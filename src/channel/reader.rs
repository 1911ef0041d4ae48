//! Control channel receive side
//!
//! One `recvmsg(2)` per message: the opcode, the length field and the
//! payload land in three fixed iovecs, and the donated descriptor (if any)
//! arrives in the same call as ancillary data.

use std::io;
use std::mem;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::ptr;
use std::time::Duration;

use tracing::{debug, error};

use super::ancillary::{extract_descriptor, Ancillary, ControlBuffer};
use super::command::command_name;
use super::frame::{IncomingMessage, PayloadBuffer};
use crate::error::ExitReason;

/// Worker end of the control channel to the main process
///
/// Owns the descriptor; dropping the channel closes it.
#[derive(Debug)]
pub struct ControlChannel {
    fd: OwnedFd,
}

impl ControlChannel {
    /// Wrap an already connected descriptor
    #[must_use]
    pub const fn new(fd: OwnedFd) -> Self {
        Self { fd }
    }

    /// Wait until a message (or closure) is pending.
    ///
    /// Returns `Ok(false)` on timeout or when interrupted by a signal.
    ///
    /// # Errors
    ///
    /// Returns the `poll(2)` error for anything else.
    #[allow(clippy::cast_possible_truncation)] // timeout is clamped to i32::MAX
    pub fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.fd.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as libc::c_int;

        let n = unsafe { libc::poll(&raw mut pfd, 1, timeout_ms) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }

        // POLLHUP/POLLERR also count: the next receive reports them
        Ok(n > 0 && pfd.revents != 0)
    }

    /// Receive and validate one message.
    ///
    /// `payload` is the worker's fixed receive buffer; the returned message
    /// borrows the declared prefix of it.
    ///
    /// # Errors
    ///
    /// - `ExitReason::ParentClosed` when zero bytes arrive
    /// - `ExitReason::ReceiveFailed` for any other receive failure
    /// - `ExitReason::MalformedFrame` when the length field does not hold up
    #[allow(clippy::cast_sign_loss)] // n is positive after the error checks
    pub fn recv<'a>(&self, payload: &'a mut PayloadBuffer) -> Result<IncomingMessage<'a>, ExitReason> {
        let mut opcode = [0u8; 1];
        let mut length = [0u8; 2];
        let mut control = ControlBuffer::new();

        let mut iov = [
            libc::iovec {
                iov_base: opcode.as_mut_ptr().cast::<libc::c_void>(),
                iov_len: opcode.len(),
            },
            libc::iovec {
                iov_base: length.as_mut_ptr().cast::<libc::c_void>(),
                iov_len: length.len(),
            },
            libc::iovec {
                iov_base: payload.as_mut_ptr().cast::<libc::c_void>(),
                iov_len: payload.len(),
            },
        ];

        let mut msg: libc::msghdr = unsafe { mem::zeroed() };
        msg.msg_iov = iov.as_mut_ptr();
        msg.msg_iovlen = iov.len() as _;
        msg.msg_control = control.as_mut_ptr();
        msg.msg_controllen = ControlBuffer::control_len() as _;

        let n = loop {
            // donated descriptors must not leak into anything the worker execs
            let n = unsafe {
                libc::recvmsg(
                    self.fd.as_raw_fd(),
                    ptr::addr_of_mut!(msg),
                    libc::MSG_CMSG_CLOEXEC,
                )
            };
            if n >= 0 {
                break n as usize;
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                error!("cannot obtain data from command socket: {}", err);
                return Err(ExitReason::ReceiveFailed(err));
            }
        };

        if n == 0 {
            error!("parent terminated");
            return Err(ExitReason::ParentClosed);
        }

        // Take ownership of any donated descriptor before validating, so a
        // rejected frame still closes it.
        let ancillary: Ancillary = unsafe { extract_descriptor(&msg) };

        let opcode = opcode[0];
        let declared = u16::from_ne_bytes(length);

        match IncomingMessage::new(opcode, declared, n, &payload[..], ancillary) {
            Ok(message) => {
                debug!(
                    "worker received message {} of {} bytes",
                    command_name(opcode),
                    declared
                );
                Ok(message)
            }
            Err(reason) => {
                debug!("worker received {}", reason);
                Err(reason)
            }
        }
    }
}

impl AsFd for ControlChannel {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for ControlChannel {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl From<OwnedFd> for ControlChannel {
    fn from(fd: OwnedFd) -> Self {
        Self::new(fd)
    }
}
