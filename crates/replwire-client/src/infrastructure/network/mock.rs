//! In-memory transport and sink for tests.
//!
//! [`MockTransport`] replaces the TCP socket with a script: reads return the
//! queued chunks one per call, and writes are recorded so assertions can see
//! exactly which bytes went out and in how many calls.  Clones share state,
//! so a test keeps one handle while the [`Connection`](super::Connection)
//! owns the other.
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.push_read(b"PO");
//! transport.push_read(b"NG\x04");
//! connection.attach(transport.clone());
//! connection.on_readable();
//! connection.on_readable();
//! assert_eq!(sink.messages(), vec![Message::new("PONG").unwrap()]);
//! ```

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use replwire_core::Message;
use tokio::io::Interest;

use super::sink::ResponseSink;
use super::transport::{Readiness, Transport};

/// One scripted result for `try_read`.
#[derive(Debug)]
enum ReadStep {
    Data(Vec<u8>),
    Eof,
    Error(io::ErrorKind),
}

#[derive(Debug, Default)]
struct MockState {
    reads: VecDeque<ReadStep>,
    written: Vec<u8>,
    write_calls: Vec<Vec<u8>>,
    /// Most bytes a single `try_write` accepts; `None` accepts everything.
    write_limit: Option<usize>,
    /// Error returned by every `try_write` while set.
    write_error: Option<io::ErrorKind>,
    /// Error returned by every `ready` while set.
    ready_error: Option<io::ErrorKind>,
    eof_delivered: bool,
    write_shut_down: bool,
}

/// Scripted [`Transport`] for unit tests.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `bytes` to be returned by one future `try_read`.
    pub fn push_read(&self, bytes: &[u8]) {
        self.lock().reads.push_back(ReadStep::Data(bytes.to_vec()));
    }

    /// Queues an end-of-stream (`Ok(0)`) read.
    pub fn push_eof(&self) {
        self.lock().reads.push_back(ReadStep::Eof);
    }

    /// Queues a failing read.
    pub fn push_read_error(&self, kind: io::ErrorKind) {
        self.lock().reads.push_back(ReadStep::Error(kind));
    }

    /// Caps how many bytes each `try_write` accepts.  `Some(0)` simulates a
    /// transport that accepts nothing.
    pub fn set_write_limit(&self, limit: Option<usize>) {
        self.lock().write_limit = limit;
    }

    /// Makes every subsequent `try_write` fail with `kind`.
    pub fn fail_writes(&self, kind: io::ErrorKind) {
        self.lock().write_error = Some(kind);
    }

    /// Makes every subsequent `ready` fail with `kind`.  Reads keep following
    /// their script.
    pub fn fail_ready(&self, kind: io::ErrorKind) {
        self.lock().ready_error = Some(kind);
    }

    /// All bytes accepted so far, concatenated.
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Bytes accepted by each individual `try_write` call.
    pub fn write_calls(&self) -> Vec<Vec<u8>> {
        self.lock().write_calls.clone()
    }

    pub fn is_write_shut_down(&self) -> bool {
        self.lock().write_shut_down
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn ready(&self, interest: Interest) -> io::Result<Readiness> {
        let readiness = {
            let state = self.lock();
            if let Some(kind) = state.ready_error {
                return Err(io::Error::from(kind));
            }
            Readiness {
                readable: interest.is_readable()
                    && (!state.reads.is_empty() || state.eof_delivered),
                writable: interest.is_writable(),
            }
        };
        if readiness.is_none() {
            // Nothing scripted: behave like an idle socket.
            std::future::pending::<()>().await;
        }
        Ok(readiness)
    }

    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.lock();
        match state.reads.pop_front() {
            Some(ReadStep::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    // The caller's buffer was smaller than the scripted chunk.
                    state.reads.push_front(ReadStep::Data(data.split_off(n)));
                }
                Ok(n)
            }
            Some(ReadStep::Eof) => {
                state.eof_delivered = true;
                Ok(0)
            }
            Some(ReadStep::Error(kind)) => Err(io::Error::from(kind)),
            None if state.eof_delivered => Ok(0),
            None => Err(io::Error::from(io::ErrorKind::WouldBlock)),
        }
    }

    fn try_write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock();
        if let Some(kind) = state.write_error {
            return Err(io::Error::from(kind));
        }
        let n = state.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        state.written.extend_from_slice(&buf[..n]);
        state.write_calls.push(buf[..n].to_vec());
        Ok(n)
    }

    async fn shutdown_write(&mut self) -> io::Result<()> {
        self.lock().write_shut_down = true;
        Ok(())
    }
}

/// [`ResponseSink`] that keeps every delivered message.  Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ResponseSink for MemorySink {
    fn deliver(&mut self, message: &Message) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
