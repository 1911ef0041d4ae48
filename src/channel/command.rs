//! Command opcodes understood by the worker

use std::fmt;

/// Opcode: main process donates a UDP descriptor
pub const CMD_UDP_FD: u8 = 10;

/// Opcode: main process asks the worker to exit
pub const CMD_TERMINATE: u8 = 12;

/// Commands the worker accepts from the main process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// New UDP transport descriptor, with a `UdpHandoverAnnouncement` payload
    UdpFd,
    /// Exit immediately, no payload
    Terminate,
}

impl Command {
    /// Decode an opcode byte; `None` for anything outside the command set
    #[must_use]
    pub const fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            CMD_UDP_FD => Some(Self::UdpFd),
            CMD_TERMINATE => Some(Self::Terminate),
            _ => None,
        }
    }

    /// Wire value of this command
    #[must_use]
    pub const fn opcode(self) -> u8 {
        match self {
            Self::UdpFd => CMD_UDP_FD,
            Self::Terminate => CMD_TERMINATE,
        }
    }

    /// Name used in log lines
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UdpFd => "udp fd",
            Self::Terminate => "terminate",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Log name for a raw opcode, including unknown ones
#[must_use]
pub fn command_name(opcode: u8) -> &'static str {
    Command::from_opcode(opcode).map_or("unknown", Command::name)
}
