//! Readiness notification for the service manager.
//!
//! Implements the systemd `sd_notify` datagram protocol. When `NOTIFY_SOCKET`
//! is not set every notification is a no-op, so the agent runs the same way
//! outside of systemd.

use nix::time::{clock_gettime, ClockId};
use std::io;
use std::os::unix::net::UnixDatagram;
use std::path::PathBuf;

pub const NOTIFY_SOCKET_ENV: &str = "NOTIFY_SOCKET";

/// Lifecycle states reported to the service manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Reloading,
    Stopping,
}

/// Best-effort lifecycle notification sink.
pub trait ReadinessNotifier: Send + Sync {
    fn notify(&self, state: Readiness) -> io::Result<()>;
}

/// Microseconds on `CLOCK_MONOTONIC`, as systemd expects in `MONOTONIC_USEC`.
fn monotonic_usec() -> io::Result<u64> {
    let ts = clock_gettime(ClockId::CLOCK_MONOTONIC).map_err(io::Error::from)?;
    Ok(ts.tv_sec() as u64 * 1_000_000 + ts.tv_nsec() as u64 / 1_000)
}

/// Protocol message for a state.
pub fn message(state: Readiness) -> io::Result<String> {
    Ok(match state {
        Readiness::Ready => "READY=1".to_string(),
        Readiness::Stopping => "STOPPING=1".to_string(),
        Readiness::Reloading => format!("RELOADING=1\nMONOTONIC_USEC={}", monotonic_usec()?),
    })
}

/// Sends notifications to the socket named by `NOTIFY_SOCKET`.
#[derive(Debug, Clone, Default)]
pub struct SystemdNotifier {
    socket: Option<String>,
}

impl SystemdNotifier {
    /// Reads the socket path from the environment.
    pub fn from_env() -> Self {
        Self {
            socket: std::env::var(NOTIFY_SOCKET_ENV).ok().filter(|s| !s.is_empty()),
        }
    }

    pub fn with_socket(socket: impl Into<String>) -> Self {
        Self {
            socket: Some(socket.into()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.socket.is_some()
    }

    fn send(&self, socket: &str, payload: &[u8]) -> io::Result<()> {
        let sock = UnixDatagram::unbound()?;
        if let Some(name) = socket.strip_prefix('@') {
            send_abstract(&sock, name, payload)
        } else {
            sock.send_to(payload, PathBuf::from(socket)).map(|_| ())
        }
    }
}

#[cfg(target_os = "linux")]
fn send_abstract(sock: &UnixDatagram, name: &str, payload: &[u8]) -> io::Result<()> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    let addr = SocketAddr::from_abstract_name(name.as_bytes())?;
    sock.send_to_addr(payload, &addr).map(|_| ())
}

#[cfg(not(target_os = "linux"))]
fn send_abstract(_sock: &UnixDatagram, _name: &str, _payload: &[u8]) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "abstract notify sockets are only supported on linux",
    ))
}

impl ReadinessNotifier for SystemdNotifier {
    fn notify(&self, state: Readiness) -> io::Result<()> {
        let Some(socket) = self.socket.as_deref() else {
            return Ok(());
        };
        self.send(socket, message(state)?.as_bytes())
    }
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ReadinessNotifier for NoopNotifier {
    fn notify(&self, _state: Readiness) -> io::Result<()> {
        Ok(())
    }
}
