//! Integration tests for tunnel-worker
//!
//! Every test drives a real worker over a `SOCK_SEQPACKET` control channel,
//! with descriptors passed as `SCM_RIGHTS` the way the main process sends
//! them.
//!
//! # Test Organization
//!
//! - `common`: Channel, sender and session fixtures
//! - `dispatch`: Framing, termination and the command loop
//! - `handover`: UDP descriptor hand-off and trial decrypt
//! - `security`: Fuzzed frames and length boundaries

pub mod dispatch;
pub mod security;
