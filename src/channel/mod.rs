//! Control channel between the main process and a worker
//!
//! The main process writes small binary frames to a local socket:
//!
//! | field | size | meaning |
//! |-------|------|---------|
//! | opcode | 1 byte | command selector |
//! | length | 2 bytes, host order | declared payload length |
//! | payload | up to [`CMD_PAYLOAD_MAX`] | command body |
//! | ancillary | 0 or 1 descriptor | `SCM_RIGHTS` |
//!
//! Both processes run on the same host, so the length field is in native
//! byte order.
//!
//! # Example
//!
//! ```no_run
//! use std::os::fd::{FromRawFd, OwnedFd};
//! use tunnel_worker::channel::{ControlChannel, CMD_PAYLOAD_MAX};
//!
//! let fd = unsafe { OwnedFd::from_raw_fd(3) };
//! let channel = ControlChannel::new(fd);
//! let mut payload = [0u8; CMD_PAYLOAD_MAX];
//! let message = channel.recv(&mut payload).expect("main process went away");
//! println!("opcode {}", message.opcode());
//! ```

mod ancillary;
mod command;
mod frame;
mod reader;

pub use ancillary::Ancillary;
pub use command::{command_name, Command, CMD_TERMINATE, CMD_UDP_FD};
pub use frame::{validate_frame, IncomingMessage, PayloadBuffer, CMD_PAYLOAD_MAX, HEADER_SIZE};
pub use reader::ControlChannel;
