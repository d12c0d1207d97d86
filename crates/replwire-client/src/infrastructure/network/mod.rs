//! Network infrastructure for the client application.
//!
//! Owns the TCP connection to the REPL server and the event loop that drives
//! it.
//!
//! Architecture:
//! - [`OutboundQueue`] is the only state shared with the input thread.  The
//!   input thread pushes messages; the event loop pops them.
//! - [`Connection`] owns the socket (behind the [`Transport`] trait), the
//!   inbound accumulation buffer, and the lifecycle state.  Every transport
//!   error is handled here by closing the connection.
//! - [`EventLoop`] waits for readiness on its registered [`Pollable`]s and
//!   dispatches to their handlers until none are left.
//! - Decoded responses go to a [`ResponseSink`] (stdout in production).

use std::net::SocketAddr;

use thiserror::Error;

pub mod connection;
pub mod event_loop;
pub mod mock;
pub mod queue;
pub mod sink;
pub mod transport;

pub use connection::{Connection, ConnectionConfig, ConnectionStats, MAX_CHUNK_SIZE};
pub use event_loop::{EventLoop, Pollable, ShutdownHandle};
pub use queue::{Outbound, OutboundQueue};
pub use sink::{ResponseSink, WriterSink};
pub use transport::{Readiness, Transport};

/// Errors that can occur in the client network layer.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// TCP connection to the REPL server failed.
    #[error("failed to connect to REPL server at {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// A read on the established connection failed.
    #[error("read error: {0}")]
    Read(#[source] std::io::Error),
    /// A write on the established connection failed.
    #[error("write error: {0}")]
    Write(#[source] std::io::Error),
    /// The operation needs an open connection.
    #[error("connection is not open")]
    Closed,
}

/// Formats a host/port pair for logs and errors, bracketing IPv6 literals.
pub(crate) fn display_addr(host: &str, port: u16) -> String {
    match host.parse::<std::net::IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port).to_string(),
        Err(_) => format!("{host}:{port}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
