//! Local port and address discovery used to compute listener defaults.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, UdpSocket};

/// Find an available port in the given inclusive range.
pub fn find_available_port(start: u16, end: u16) -> Option<u16> {
    (start..=end).find(|&port| is_port_available(port))
}

/// Check if a port is available for binding on all interfaces.
pub fn is_port_available(port: u16) -> bool {
    is_addr_available(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
}

/// Check if a socket address is available for binding.
pub fn is_addr_available(addr: SocketAddr) -> bool {
    TcpListener::bind(addr).is_ok()
}

/// Detect the local IP address used for outbound connections.
///
/// A UDP socket is "connected" to a public address so the OS picks the
/// outbound interface. No data is sent.
pub fn detect_local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let local_addr = socket.local_addr().ok()?;
    Some(local_addr.ip())
}
