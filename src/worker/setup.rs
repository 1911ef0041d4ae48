//! One-time process setup before the worker serves

use tracing::info;

use crate::config::NetworkConfig;
use crate::error::Result;
use crate::net::{complete_vpn_info, VpnInfo};
use crate::sigstack;

/// Install the alternate signal stack and complete the tunnel device info.
///
/// Any failure here is fatal: the worker must not serve the control channel
/// without its signal stack or with an unusable tunnel device.
///
/// # Errors
///
/// - `WorkerError::Setup` if the signal stack cannot be installed
/// - `WorkerError::Net` if the tunnel device has no address
pub fn prepare_process(network: &NetworkConfig, vpn: Option<&mut VpnInfo>) -> Result<()> {
    prepare(libc::SIGSTKSZ, network, vpn)
}

fn prepare(stack_size: usize, network: &NetworkConfig, vpn: Option<&mut VpnInfo>) -> Result<()> {
    sigstack::install_alt_stack_with_size(stack_size)?;

    if let Some(vpn) = vpn {
        complete_vpn_info(network, vpn)?;
        info!(interface = %vpn.name, mtu = vpn.mtu, "tunnel device ready");
    }

    Ok(())
}
