//! Owned UDP transport descriptor

use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};

use socket2::SockRef;

use crate::error::HandoverError;

/// A donated datagram descriptor, owned and non-blocking
///
/// Closing happens exactly once, when the value is dropped. Whoever holds
/// the `TransportFd` holds close authority over the descriptor.
#[derive(Debug)]
pub struct TransportFd {
    fd: OwnedFd,
}

impl TransportFd {
    /// Take ownership of a donated descriptor and switch it to non-blocking.
    ///
    /// # Errors
    ///
    /// Returns `HandoverError::NonBlocking` if `O_NONBLOCK` cannot be set;
    /// the descriptor is closed in that case.
    pub fn from_donated(fd: OwnedFd) -> Result<Self, HandoverError> {
        SockRef::from(&fd)
            .set_nonblocking(true)
            .map_err(HandoverError::NonBlocking)?;
        Ok(Self { fd })
    }
}

impl AsFd for TransportFd {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for TransportFd {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}
