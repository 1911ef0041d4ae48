//! Tunnel interface MTU discovery

use std::mem;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::os::fd::AsRawFd;

use socket2::{Domain, Socket, Type};
use tracing::{debug, info};

use crate::config::NetworkConfig;
use crate::error::NetError;

/// MTU assumed when neither the configuration nor the interface gives one
pub const DEFAULT_MTU: u32 = 1500;

/// `struct ifreq` restricted to the name and the `ifr_mtu` member
#[repr(C)]
struct IfreqMtu {
    name: [libc::c_char; libc::IFNAMSIZ],
    mtu: libc::c_int,
    // the kernel copies the whole union
    _pad: [u8; 20],
}

/// Addresses and MTU of the tunnel device serving this client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VpnInfo {
    /// Interface name, e.g. `vpns0`
    pub name: String,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
    /// Filled in by [`complete_vpn_info`]
    pub mtu: u32,
}

impl VpnInfo {
    /// Create an entry with no MTU yet
    #[must_use]
    pub fn new(name: impl Into<String>, ipv4: Option<Ipv4Addr>, ipv6: Option<Ipv6Addr>) -> Self {
        Self {
            name: name.into(),
            ipv4,
            ipv6,
            mtu: 0,
        }
    }
}

/// Query the MTU of `name` with `SIOCGIFMTU`.
///
/// # Errors
///
/// - `NetError::InvalidInterface` if the name is empty or too long
/// - `NetError::IoError` if the socket or the ioctl fails (e.g. `ENODEV`)
pub fn interface_mtu(name: &str) -> Result<u32, NetError> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() >= libc::IFNAMSIZ || bytes.contains(&0) {
        return Err(NetError::InvalidInterface(name.to_string()));
    }

    // SAFETY: IfreqMtu is plain old data; all-zero is a valid value
    let mut req: IfreqMtu = unsafe { mem::zeroed() };
    for (dst, &src) in req.name.iter_mut().zip(bytes) {
        *dst = src as libc::c_char;
    }

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, None)?;

    // SAFETY: valid socket fd and a properly sized ifreq
    let ret = unsafe {
        libc::ioctl(
            socket.as_raw_fd(),
            libc::SIOCGIFMTU as _,
            std::ptr::from_mut(&mut req),
        )
    };
    if ret < 0 {
        return Err(NetError::IoError(std::io::Error::last_os_error()));
    }

    u32::try_from(req.mtu).map_err(|_| {
        NetError::IoError(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("negative MTU {} reported for {name}", req.mtu),
        ))
    })
}

/// Fill in the MTU of `info`.
///
/// The configured MTU wins when non-zero; otherwise the interface is
/// queried, falling back to [`DEFAULT_MTU`].
///
/// # Errors
///
/// Returns `NetError::NoAddress` if the tunnel has neither address family.
pub fn complete_vpn_info(config: &NetworkConfig, info: &mut VpnInfo) -> Result<(), NetError> {
    if info.ipv4.is_none() && info.ipv6.is_none() {
        return Err(NetError::NoAddress {
            interface: info.name.clone(),
        });
    }

    if config.mtu != 0 {
        info.mtu = config.mtu;
        return Ok(());
    }

    info.mtu = match interface_mtu(&info.name) {
        Ok(mtu) if mtu > 0 => mtu,
        Ok(_) => {
            info!("interface {} reports zero MTU, using {}", info.name, DEFAULT_MTU);
            DEFAULT_MTU
        }
        Err(e) => {
            info!("cannot obtain MTU of {} ({}), using {}", info.name, e, DEFAULT_MTU);
            DEFAULT_MTU
        }
    };
    debug!(interface = %info.name, mtu = info.mtu, "tunnel MTU");

    Ok(())
}
