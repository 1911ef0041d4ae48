//! What a DTLS session reads its datagrams from

use std::io;
use std::os::fd::RawFd;

use bytes::Bytes;

use crate::error::RecordError;

/// The transport a session is currently attached to
///
/// `fd` is a borrowed raw descriptor: the binding never closes it. The
/// handover state machine owns the descriptor and keeps the binding in step
/// with it. `pending` is a datagram the main process already consumed from
/// the socket; it is handed to the session before the descriptor is read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportBinding {
    fd: Option<RawFd>,
    pending: Option<Bytes>,
}

impl TransportBinding {
    /// A binding with no descriptor
    #[must_use]
    pub const fn unbound() -> Self {
        Self {
            fd: None,
            pending: None,
        }
    }

    /// Bind to `fd`, replaying `pending` first if present
    #[must_use]
    pub fn new(fd: RawFd, pending: Option<Bytes>) -> Self {
        Self {
            fd: Some(fd),
            pending: pending.filter(|data| !data.is_empty()),
        }
    }

    /// Descriptor the session reads from
    #[must_use]
    pub const fn fd(&self) -> Option<RawFd> {
        self.fd
    }

    /// Datagram waiting to be replayed
    #[must_use]
    pub const fn pending(&self) -> Option<&Bytes> {
        self.pending.as_ref()
    }

    /// Whether a descriptor is bound
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.fd.is_some()
    }
}

/// Read one datagram for a session: the pending datagram if any, otherwise
/// one non-blocking `recv` on the bound descriptor.
///
/// Datagrams longer than `buf` are truncated, as with `recv(2)`.
///
/// # Errors
///
/// - `RecordError::Unbound` when nothing is bound
/// - `RecordError::WouldBlock` when the descriptor has nothing queued
/// - `RecordError::Io` for any other `recv(2)` error
#[allow(clippy::cast_sign_loss)] // n is non-negative after the error check
pub fn pull_datagram(binding: &mut TransportBinding, buf: &mut [u8]) -> Result<usize, RecordError> {
    if let Some(data) = binding.pending.take() {
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        return Ok(n);
    }

    let fd = binding.fd.ok_or(RecordError::Unbound)?;

    let n = unsafe {
        libc::recv(
            fd,
            buf.as_mut_ptr().cast::<libc::c_void>(),
            buf.len(),
            libc::MSG_DONTWAIT,
        )
    };
    if n < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::WouldBlock {
            return Err(RecordError::WouldBlock);
        }
        return Err(RecordError::Io(err));
    }
    Ok(n as usize)
}
