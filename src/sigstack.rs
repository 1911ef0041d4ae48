//! Alternate signal stack
//!
//! Lets a fatal-signal handler run after a stack overflow. The stack is
//! mapped once and stays mapped for the life of the process.

use std::io;
use std::ptr;

use tracing::debug;

use crate::error::SetupError;

/// Map a `SIGSTKSZ` stack and install it for the calling thread.
///
/// # Errors
///
/// - `SetupError::StackAllocation` if `mmap(2)` fails
/// - `SetupError::SigAltStack` if `sigaltstack(2)` fails; the mapping is
///   released in that case
pub fn install_alt_stack() -> Result<(), SetupError> {
    install_alt_stack_with_size(libc::SIGSTKSZ)
}

/// Map and install a stack of `size` bytes.
pub(crate) fn install_alt_stack_with_size(size: usize) -> Result<(), SetupError> {
    // SAFETY: anonymous private mapping, no fd involved
    let base = unsafe {
        libc::mmap(
            ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_STACK,
            -1,
            0,
        )
    };
    if base == libc::MAP_FAILED {
        return Err(SetupError::StackAllocation(io::Error::last_os_error()));
    }

    let stack = libc::stack_t {
        ss_sp: base,
        ss_flags: 0,
        ss_size: size,
    };

    // SAFETY: `stack` describes the mapping above, which is never unmapped
    // once installed
    if unsafe { libc::sigaltstack(&raw const stack, ptr::null_mut()) } < 0 {
        let err = io::Error::last_os_error();
        // SAFETY: mapping created above and not installed
        unsafe { libc::munmap(base, size) };
        return Err(SetupError::SigAltStack(err));
    }

    debug!(size, "alternate signal stack installed");
    Ok(())
}
