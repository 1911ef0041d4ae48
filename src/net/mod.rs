//! Tunnel device helpers

mod mtu;

pub use mtu::{complete_vpn_info, interface_mtu, VpnInfo, DEFAULT_MTU};
