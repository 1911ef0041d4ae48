//! UDP transport primitives for the DTLS channel
//!
//! - [`TransportFd`]: an owned, non-blocking donated descriptor
//! - [`TransportBinding`]: the descriptor a session is attached to, plus a
//!   datagram to replay before reading it
//! - [`DtlsSession`]: the session capability the worker drives
//! - [`UdpHandoverAnnouncement`]: the decoded `UDP_FD` payload

mod announcement;
mod binding;
mod fd;
mod session;

pub use announcement::UdpHandoverAnnouncement;
pub use binding::{pull_datagram, TransportBinding};
pub use fd::TransportFd;
pub use session::DtlsSession;
