//! TCP reachability probe.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(250);
const MAX_TIMEOUT: Duration = Duration::from_secs(30);

/// Clamps a probe timeout to `[1ms, 30s]`; zero means "use the default".
pub fn clamp_timeout(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        DEFAULT_TIMEOUT
    } else {
        timeout.min(MAX_TIMEOUT)
    }
}

/// True when a TCP connection to `host:port` can be established within the
/// clamped timeout. Port 0 never touches the network.
pub fn check_port_listening(host: &str, port: u16, timeout: Duration) -> bool {
    if host.is_empty() || port == 0 {
        return false;
    }

    let timeout = clamp_timeout(timeout);
    let addrs = match (host, port).to_socket_addrs() {
        Ok(addrs) => addrs,
        Err(_) => return false,
    };

    for addr in addrs {
        if TcpStream::connect_timeout(&addr, timeout).is_ok() {
            return true;
        }
    }
    false
}
