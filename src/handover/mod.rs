//! UDP transport hand-off
//!
//! The main process re-homes a client's datagram path by donating a new
//! descriptor. [`UdpHandover`] decides whether it replaces the active
//! transport; for an established session it first runs [`trial_decrypt`]
//! so that only a descriptor carrying the session peer's traffic is
//! trusted.

mod state;
mod trial;

pub use state::{ActiveTransport, HandoverOutcome, UdpHandover, UdpState};
pub use trial::{trial_decrypt, TransportSwap, TrialOutcome};
