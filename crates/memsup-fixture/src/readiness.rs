//! Waiting for a launched server to accept connections.
//!
//! A clean launch only means the server did not complain on stderr. Tests
//! that need a live server call [`wait_until_listening`] afterwards.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use memsup_common::{LaunchError, LaunchResult};
use tracing::debug;

/// Delay between connection attempts.
pub const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Retries a TCP connect to `addr` until it succeeds or `timeout` passes.
pub fn wait_until_listening<A: ToSocketAddrs>(addr: A, timeout: Duration) -> LaunchResult<()> {
    let addrs: Vec<SocketAddr> = addr
        .to_socket_addrs()
        .map_err(|e| LaunchError::not_ready(format!("unresolved address ({})", e), 0))?
        .collect();
    let shown = addrs
        .iter()
        .map(SocketAddr::to_string)
        .collect::<Vec<_>>()
        .join(",");

    let start = Instant::now();
    loop {
        for candidate in &addrs {
            let remaining = timeout.saturating_sub(start.elapsed()).max(POLL_INTERVAL);
            if TcpStream::connect_timeout(candidate, remaining.min(Duration::from_secs(1))).is_ok() {
                debug!("{} accepting connections after {:?}", candidate, start.elapsed());
                return Ok(());
            }
        }

        if start.elapsed() >= timeout {
            return Err(LaunchError::not_ready(shown, start.elapsed().as_millis()));
        }
        thread::sleep(POLL_INTERVAL);
    }
}
