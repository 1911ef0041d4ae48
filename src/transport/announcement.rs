//! UDP hand-off announcement carried in the `UDP_FD` payload
//!
//! Protobuf schema:
//!
//! ```text
//! message udp_fd_msg {
//!     required bool hello = 1 [default = true];
//!     required bytes data = 2;
//! }
//! ```

use bytes::Bytes;
use prost::Message;

/// Decoded `UDP_FD` payload
#[derive(Clone, PartialEq, Message)]
pub struct UdpHandoverAnnouncement {
    /// Descriptor belongs to a brand-new client hello, not a re-homed session
    #[prost(bool, required, tag = "1", default = "true")]
    pub hello: bool,

    /// Datagram the main process already read from the descriptor
    #[prost(bytes = "bytes", required, tag = "2")]
    pub data: Bytes,
}

impl UdpHandoverAnnouncement {
    /// Announcement for a fresh client hello
    #[must_use]
    pub fn initial_hello(data: impl Into<Bytes>) -> Self {
        Self {
            hello: true,
            data: data.into(),
        }
    }

    /// Announcement for an existing session moving to a new descriptor
    #[must_use]
    pub fn rehome(data: impl Into<Bytes>) -> Self {
        Self {
            hello: false,
            data: data.into(),
        }
    }

    /// Decode a `UDP_FD` payload, `None` if it is not a valid record
    #[must_use]
    pub fn decode_payload(payload: &[u8]) -> Option<Self> {
        Self::decode(payload).ok()
    }

    /// Encode for the wire (used by the main process side and tests)
    #[must_use]
    pub fn to_payload(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    /// Whether this is an initial client hello
    #[must_use]
    pub const fn is_initial_hello(&self) -> bool {
        self.hello
    }

    /// The already-consumed datagram, if any
    #[must_use]
    pub fn first_datagram(&self) -> Option<Bytes> {
        (!self.data.is_empty()).then(|| self.data.clone())
    }
}
