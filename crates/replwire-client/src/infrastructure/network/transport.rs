//! Byte transport abstraction under [`Connection`](super::Connection).
//!
//! The production implementation is `tokio::net::TcpStream`: readiness comes
//! from `TcpStream::ready`, and the actual I/O uses the non-blocking
//! `try_read` / `try_write` calls, which return `WouldBlock` instead of
//! waiting.  Tests use [`MockTransport`](super::mock::MockTransport).

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, Interest};
use tokio::net::TcpStream;

/// Which operations a transport can make progress on right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    /// Data is available, or the peer has closed its write side.
    pub readable: bool,
    /// The send buffer has room.
    pub writable: bool,
}

impl Readiness {
    pub const NONE: Readiness = Readiness { readable: false, writable: false };
    pub const READABLE: Readiness = Readiness { readable: true, writable: false };

    pub fn is_none(self) -> bool {
        !self.readable && !self.writable
    }
}

/// Non-blocking byte stream.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Waits until at least one operation in `interest` can make progress.
    async fn ready(&self, interest: Interest) -> io::Result<Readiness>;

    /// Reads into `buf` without waiting.  `Ok(0)` means end of stream.
    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes from `buf` without waiting; may accept fewer bytes than given.
    fn try_write(&self, buf: &[u8]) -> io::Result<usize>;

    /// Closes the write half so the peer sees end of stream.
    async fn shutdown_write(&mut self) -> io::Result<()>;
}

#[async_trait]
impl Transport for TcpStream {
    async fn ready(&self, interest: Interest) -> io::Result<Readiness> {
        let ready = TcpStream::ready(self, interest).await?;
        Ok(Readiness {
            readable: ready.is_readable() || ready.is_read_closed(),
            writable: ready.is_writable() || ready.is_write_closed(),
        })
    }

    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        TcpStream::try_read(self, buf)
    }

    fn try_write(&self, buf: &[u8]) -> io::Result<usize> {
        TcpStream::try_write(self, buf)
    }

    async fn shutdown_write(&mut self) -> io::Result<()> {
        AsyncWriteExt::shutdown(self).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
