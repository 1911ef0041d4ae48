//! tunnel-worker: per-client worker of a multi-process VPN server
//!
//! The main process accepts a client, forks a worker and keeps a
//! `SOCK_SEQPACKET` control channel to it. Over that channel it sends
//! commands and, for the DTLS data path, donates UDP descriptors as
//! `SCM_RIGHTS` ancillary data. This crate is the worker side of that
//! channel.
//!
//! # Architecture
//!
//! ```text
//! main process ──SEQPACKET──► ControlChannel::recv ──► dispatch
//!                                                        │
//!                         TERMINATE / unknown ◄──────────┤ (ExitReason)
//!                                                        │
//!                                     UDP_FD ──► UdpHandover ──► trial_decrypt
//!                                                        │
//!                                                DtlsSession::set_transport
//! ```
//!
//! # Modules
//!
//! - [`channel`]: Framing, validation and descriptor extraction
//! - [`handover`]: UDP hand-off state machine and trial decrypt
//! - [`transport`]: Donated descriptors, session bindings, announcements
//! - [`worker`]: Worker context, dispatcher and command loop
//! - [`config`]: Configuration types and loading
//! - [`net`]: Tunnel MTU discovery
//! - [`sigstack`]: Alternate signal stack
//! - [`error`]: Error types

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod channel;
pub mod config;
pub mod error;
pub mod handover;
pub mod net;
pub mod sigstack;
pub mod transport;
pub mod worker;

// Re-export commonly used types at the crate root
pub use channel::{Ancillary, Command, ControlChannel, IncomingMessage};
pub use config::WorkerConfig;
pub use error::{ConfigError, ExitReason, HandoverError, NetError, RecordError, SetupError, WorkerError};
pub use handover::{HandoverOutcome, UdpHandover, UdpState};
pub use transport::{DtlsSession, TransportBinding, UdpHandoverAnnouncement};
pub use worker::{prepare_process, CommandOutcome, Worker};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
