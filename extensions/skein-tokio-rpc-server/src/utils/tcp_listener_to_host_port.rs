use std::io::Result;
use std::net::IpAddr;
use tokio::net::TcpListener;

/// The address a listener is actually bound to, useful after binding port 0.
pub fn tcp_listener_to_host_port(listener: &TcpListener) -> Result<(IpAddr, u16)> {
    let addr = listener.local_addr()?;
    Ok((addr.ip(), addr.port()))
}
