//! Error types for tunnel-worker
//!
//! This module defines the error hierarchy for the worker control plane.
//! Errors are categorized by subsystem and carry a recovery classification:
//! anything that corrupts the control channel ends the worker, anything tied
//! to a single donated descriptor is dropped and the worker keeps serving.

use std::io;

use thiserror::Error;

/// Top-level error type for tunnel-worker
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Configuration errors (file parsing, validation)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The worker must stop serving
    #[error("Worker exit: {0}")]
    Exit(#[from] ExitReason),

    /// UDP hand-off anomalies
    #[error("Hand-off error: {0}")]
    Handover(#[from] HandoverError),

    /// Interface discovery errors
    #[error("Network error: {0}")]
    Net(#[from] NetError),

    /// Process setup errors
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    /// I/O errors not covered by other categories
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl WorkerError {
    /// Check if this error is recoverable (the worker can keep serving)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(e) => e.is_recoverable(),
            Self::Exit(_) => false,
            Self::Handover(e) => e.is_recoverable(),
            Self::Net(e) => e.is_recoverable(),
            Self::Setup(_) => false,
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
            ),
        }
    }
}

/// Reasons for ending the worker process
///
/// Every variant is fatal. Each maps to its own process exit code so the
/// main process can tell a vanished parent from a protocol violation.
#[derive(Debug, Error)]
pub enum ExitReason {
    /// Main process closed its end of the control channel
    #[error("parent terminated")]
    ParentClosed,

    /// Explicit terminate command
    #[error("terminate requested by main process")]
    Terminated,

    /// Declared payload length exceeds what was actually received
    #[error("invalid message {command} of {received} bytes that claims to be {declared}")]
    MalformedFrame {
        command: String,
        received: usize,
        declared: u16,
    },

    /// Opcode outside the known command set
    #[error("unknown command 0x{0:x}")]
    UnknownCommand(u8),

    /// Receive on the control channel failed for a reason other than closure
    #[error("cannot obtain data from command socket: {0}")]
    ReceiveFailed(#[source] io::Error),
}

impl ExitReason {
    /// Process exit code for this reason
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Terminated => 0,
            Self::ReceiveFailed(_) => 1,
            Self::ParentClosed => 2,
            Self::MalformedFrame { .. } => 3,
            Self::UnknownCommand(_) => 4,
        }
    }

    /// Create a malformed frame reason
    pub fn malformed(command: impl Into<String>, received: usize, declared: u16) -> Self {
        Self::MalformedFrame {
            command: command.into(),
            received,
            declared,
        }
    }
}

/// UDP descriptor hand-off anomalies
///
/// None of these end the worker; the offending descriptor or record is
/// discarded and the current transport is kept.
#[derive(Debug, Error)]
pub enum HandoverError {
    /// `UDP_FD` arrived without any ancillary data
    #[error("could not receive peer's UDP fd")]
    MissingDescriptor,

    /// Ancillary data present but not a single `SCM_RIGHTS` descriptor
    #[error("received UDP fd message of wrong type: {0}")]
    MalformedAncillary(String),

    /// The donated descriptor could not be switched to non-blocking mode
    #[error("cannot set donated descriptor non-blocking: {0}")]
    NonBlocking(#[source] io::Error),
}

impl HandoverError {
    /// Hand-off errors never stop the worker
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        true
    }

    /// Create a malformed ancillary error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedAncillary(reason.into())
    }
}

/// Errors from a single DTLS record read
#[derive(Debug, Error)]
pub enum RecordError {
    /// Nothing to read right now (or the record was silently discarded)
    #[error("no record available")]
    WouldBlock,

    /// The record did not authenticate under the session keys
    #[error("record decryption failed: {0}")]
    Decrypt(String),

    /// The transport has no descriptor bound
    #[error("no transport bound to session")]
    Unbound,

    /// Transport I/O failure
    #[error("record I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RecordError {
    /// Check if the read could succeed on a later attempt
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::WouldBlock => true,
            Self::Decrypt(_) => true,
            Self::Unbound => false,
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
            ),
        }
    }

    /// Create a decrypt error
    pub fn decrypt(reason: impl Into<String>) -> Self {
        Self::Decrypt(reason.into())
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found or inaccessible
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Validation error (invalid values)
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// Environment variable error
    #[error("Environment variable error: {name}: {reason}")]
    EnvError { name: String, reason: String },

    /// I/O error while reading config
    #[error("I/O error reading configuration: {0}")]
    IoError(#[from] io::Error),
}

impl ConfigError {
    /// Config errors are not recoverable without operator intervention
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        false
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }
}

/// Interface discovery errors
#[derive(Debug, Error)]
pub enum NetError {
    /// Neither an IPv4 nor an IPv6 address is assigned to the tunnel
    #[error("no IPv4 or IPv6 address assigned to {interface}")]
    NoAddress { interface: String },

    /// Interface name does not fit `IFNAMSIZ`
    #[error("invalid interface name: {0}")]
    InvalidInterface(String),

    /// Socket or ioctl failure
    #[error("network I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl NetError {
    /// Check if this error is recoverable
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::NoAddress { .. } => false,
            Self::InvalidInterface(_) => false,
            Self::IoError(e) => matches!(e.kind(), io::ErrorKind::Interrupted),
        }
    }
}

/// Process setup errors (run once before the worker serves)
#[derive(Debug, Error)]
pub enum SetupError {
    /// Could not map memory for the signal stack
    #[error("could not allocate memory for signal stack: {0}")]
    StackAllocation(#[source] io::Error),

    /// `sigaltstack(2)` failed
    #[error("sigaltstack: {0}")]
    SigAltStack(#[source] io::Error),
}

/// Type alias for Result with WorkerError
pub type Result<T> = std::result::Result<T, WorkerError>;
