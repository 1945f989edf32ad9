//! Local network addressing.
//!
//! Works out which address other devices on the LAN should use to reach the
//! server, so the printed URL and QR code point somewhere reachable.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use tracing::debug;

/// Routable address used only to pick an outbound interface. Nothing is sent.
const PROBE_ADDR: (Ipv4Addr, u16) = (Ipv4Addr::new(10, 254, 254, 254), 1);

/// Best-effort LAN address of this machine.
///
/// Connects a UDP socket towards a private address and reads back the local
/// address the OS chose. Falls back to loopback if no route exists.
pub fn local_ip() -> IpAddr {
    match probe_local_ip() {
        Ok(ip) => ip,
        Err(e) => {
            debug!("Could not determine LAN address, using loopback: {}", e);
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

fn probe_local_ip() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect(PROBE_ADDR)?;
    Ok(socket.local_addr()?.ip())
}

/// Address clients should use for a server bound to `bound`.
///
/// A wildcard bind is replaced by the LAN address; a specific bind address
/// is used as is.
pub fn advertised_addr(bound: SocketAddr) -> SocketAddr {
    if bound.ip().is_unspecified() {
        SocketAddr::new(local_ip(), bound.port())
    } else {
        bound
    }
}

/// `http://` URL for an address, bracketing IPv6 hosts.
pub fn share_url(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}
