//! Ancillary data carried next to a control message
//!
//! The main process donates at most one descriptor per message via
//! `SCM_RIGHTS`. Control data is accepted only when the first header is
//! exactly one descriptor long and tagged `SOL_SOCKET`/`SCM_RIGHTS`.

use std::mem;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use std::ptr;

use tracing::warn;

/// Bytes reserved for control data; only `CMSG_SPACE(sizeof(int))` is offered to the kernel
const CONTROL_BUFFER_CAPACITY: usize = 64;

/// Size of one descriptor in an `SCM_RIGHTS` record
#[allow(clippy::cast_possible_truncation)]
const FD_SIZE: libc::c_uint = mem::size_of::<libc::c_int>() as libc::c_uint;

/// Ancillary content of one received message
#[derive(Debug, Default)]
pub enum Ancillary {
    /// No control data arrived
    #[default]
    None,
    /// Exactly one donated descriptor, now owned by the receiver
    Descriptor(OwnedFd),
    /// Control data that is not a single `SCM_RIGHTS` descriptor
    Malformed(String),
}

/// Control message buffer with `cmsghdr` alignment
#[repr(C)]
pub(crate) union ControlBuffer {
    _header: libc::cmsghdr,
    bytes: [u8; CONTROL_BUFFER_CAPACITY],
}

impl ControlBuffer {
    pub(crate) const fn new() -> Self {
        Self {
            bytes: [0; CONTROL_BUFFER_CAPACITY],
        }
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut libc::c_void {
        ptr::from_mut(self).cast::<libc::c_void>()
    }

    /// Length offered to `recvmsg`: room for exactly one descriptor
    pub(crate) fn control_len() -> usize {
        let len = unsafe { libc::CMSG_SPACE(FD_SIZE) } as usize;
        debug_assert!(len <= CONTROL_BUFFER_CAPACITY);
        len
    }
}

/// `cmsg_len` of a record carrying exactly one descriptor
pub(crate) fn single_descriptor_len() -> usize {
    unsafe { libc::CMSG_LEN(FD_SIZE) as usize }
}

/// Extract the donated descriptor from a received `msghdr`.
///
/// Descriptors that arrived inside a rejected `SCM_RIGHTS` record are
/// closed here, so nothing the kernel installed is leaked.
///
/// # Safety
///
/// `msg` must be the header just filled in by `recvmsg`, with `msg_control`
/// pointing at a live buffer of at least `msg_controllen` bytes.
#[allow(clippy::cast_ptr_alignment)] // CMSG_DATA is read unaligned
#[allow(clippy::useless_conversion)] // cmsg_len is socklen_t on some libcs
pub(crate) unsafe fn extract_descriptor(msg: &libc::msghdr) -> Ancillary {
    let truncated = (msg.msg_flags & libc::MSG_CTRUNC) != 0;

    let cmsg = unsafe { libc::CMSG_FIRSTHDR(msg) };
    if cmsg.is_null() {
        if truncated {
            return Ancillary::Malformed("control data truncated".into());
        }
        return Ancillary::None;
    }

    let header = unsafe { &*cmsg };
    let is_rights = header.cmsg_level == libc::SOL_SOCKET && header.cmsg_type == libc::SCM_RIGHTS;
    let cmsg_len = usize::try_from(header.cmsg_len).unwrap_or(usize::MAX);

    if !is_rights {
        return Ancillary::Malformed(format!(
            "level {} type {} is not SCM_RIGHTS",
            header.cmsg_level, header.cmsg_type
        ));
    }

    if cmsg_len == single_descriptor_len() && !truncated {
        let data = unsafe { libc::CMSG_DATA(cmsg) };
        if data.is_null() {
            return Ancillary::Malformed("SCM_RIGHTS without data".into());
        }
        let fd = unsafe { ptr::read_unaligned(data.cast::<RawFd>()) };
        if fd < 0 {
            return Ancillary::Malformed(format!("invalid descriptor {fd}"));
        }
        return Ancillary::Descriptor(unsafe { OwnedFd::from_raw_fd(fd) });
    }

    let closed = unsafe { close_rights(msg, cmsg, cmsg_len) };
    if closed > 0 {
        warn!("closed {} descriptors from a rejected SCM_RIGHTS record", closed);
    }

    Ancillary::Malformed(format!(
        "SCM_RIGHTS record of {cmsg_len} bytes, expected {}{}",
        single_descriptor_len(),
        if truncated { " (truncated)" } else { "" }
    ))
}

/// Close every descriptor in an `SCM_RIGHTS` record that fits in the buffer
unsafe fn close_rights(msg: &libc::msghdr, cmsg: *const libc::cmsghdr, cmsg_len: usize) -> usize {
    let data = unsafe { libc::CMSG_DATA(cmsg) };
    if data.is_null() {
        return 0;
    }

    let header_len = unsafe { libc::CMSG_LEN(0) } as usize;
    let declared = cmsg_len.saturating_sub(header_len) / FD_SIZE as usize;

    let offset = (data as usize).saturating_sub(msg.msg_control as usize);
    let controllen = usize::try_from(msg.msg_controllen).unwrap_or(0);
    let available = controllen.saturating_sub(offset) / FD_SIZE as usize;

    let mut closed = 0;
    for i in 0..declared.min(available) {
        let fd = unsafe { ptr::read_unaligned(data.add(i * FD_SIZE as usize).cast::<RawFd>()) };
        if fd >= 0 {
            drop(unsafe { OwnedFd::from_raw_fd(fd) });
            closed += 1;
        }
    }
    closed
}
