//! A single REPL connection: socket, outbound queue, inbound buffer, state.
//!
//! The connection never blocks.  The event loop calls [`Connection::on_readable`]
//! and [`Connection::on_writable`] only after the transport reported
//! readiness, and both handlers move at most `chunk_size` bytes.
//!
//! Every transport failure is absorbed here: the connection moves to
//! `Closing`, releases the socket, and ends up `Closed`.  The event loop's
//! only job afterwards is to drop it.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use replwire_core::{contains_terminator, decode, split_frames, ConnectionState, Message};
use tokio::io::Interest;
use tokio::net::TcpStream;
use tracing::{debug, error, info, info_span, warn, Span};
use uuid::Uuid;

use super::event_loop::Pollable;
use super::queue::{Outbound, OutboundQueue};
use super::sink::ResponseSink;
use super::transport::{Readiness, Transport};
use super::{display_addr, NetworkError};

/// Largest `chunk_size` a connection will use; the read buffer is allocated
/// up front at this size.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Tuning for a [`Connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Most bytes moved by one read or one write call, between 1 and
    /// [`MAX_CHUNK_SIZE`].
    pub chunk_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { chunk_size: 1024 }
    }
}

/// Traffic counters, logged when the connection closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
}

/// One connection to a REPL server.
pub struct Connection<T> {
    id: Uuid,
    span: Span,
    config: ConnectionConfig,
    state: ConnectionState,
    transport: Option<T>,
    queue: OutboundQueue,
    inbound: Vec<u8>,
    read_buf: Vec<u8>,
    sink: Box<dyn ResponseSink>,
    stats: ConnectionStats,
    write_shut_down: bool,
    /// Set when the transport's readiness check failed.
    ready_failed: AtomicBool,
}

impl<T: Transport> Connection<T> {
    /// Creates a connection in the `Connecting` state with no socket yet.
    ///
    /// `queue` is the outbound queue; hand a clone of it to whatever
    /// produces messages.  `chunk_size` is clamped to `1..=MAX_CHUNK_SIZE`.
    pub fn new(config: ConnectionConfig, queue: OutboundQueue, sink: Box<dyn ResponseSink>) -> Self {
        let id = Uuid::new_v4();
        let chunk_size = config.chunk_size.clamp(1, MAX_CHUNK_SIZE);
        Self {
            id,
            span: info_span!("connection", id = %id),
            config: ConnectionConfig { chunk_size },
            state: ConnectionState::Connecting,
            transport: None,
            queue,
            inbound: Vec::new(),
            read_buf: vec![0; chunk_size],
            sink,
            stats: ConnectionStats::default(),
            write_shut_down: false,
            ready_failed: AtomicBool::new(false),
        }
    }

    /// Completes the connect with an already-connected transport:
    /// `Connecting -> Open`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Closed`] if the connection has left the
    /// `Connecting` state.
    pub fn attach(&mut self, transport: T) -> Result<(), NetworkError> {
        if self.state != ConnectionState::Connecting {
            return Err(NetworkError::Closed);
        }
        self.transport = Some(transport);
        self.set_state(ConnectionState::Open);
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn stats(&self) -> ConnectionStats {
        self.stats
    }

    /// Bytes received since the last complete message.
    pub fn pending_inbound(&self) -> &[u8] {
        &self.inbound
    }

    /// Appends `msg` to the outbound queue.
    ///
    /// Equivalent to `queue.push_back(msg)` on any clone of the queue, which
    /// is how the input thread enqueues without touching the connection.
    pub fn enqueue(&self, msg: Message) {
        self.queue.push_back(msg);
    }

    /// True iff the connection is open and has something to send.
    pub fn is_writable(&self) -> bool {
        self.state == ConnectionState::Open && !self.queue.is_empty()
    }

    /// True while there is a socket to read from.
    pub fn is_readable(&self) -> bool {
        self.transport.is_some() && !self.state.is_closed()
    }

    /// Sends up to `chunk_size` bytes of the message at the head of the queue.
    ///
    /// A frame that does not fit goes back to the head of the queue with its
    /// progress recorded, so the next call continues where this one stopped.
    pub fn on_writable(&mut self) {
        let _enter = self.span.clone().entered();
        if self.state != ConnectionState::Open {
            return;
        }
        let Some(transport) = self.transport.as_ref() else {
            return;
        };
        let Some(entry) = self.queue.pop_front() else {
            return;
        };

        let (frame, sent) = entry.into_frame();
        let end = frame.len().min(sent + self.config.chunk_size);

        match transport.try_write(&frame[sent..end]) {
            Ok(0) => {
                error!("transport accepted zero bytes; closing");
                self.queue.push_front(Outbound::Partial { frame, sent });
                self.begin_close();
            }
            Ok(n) => {
                let sent = sent + n;
                self.stats.bytes_sent += n as u64;
                debug!(bytes = n, remaining = frame.len() - sent, "wrote");
                if sent < frame.len() {
                    self.queue.push_front(Outbound::Partial { frame, sent });
                } else {
                    self.stats.messages_sent += 1;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                self.queue.push_front(Outbound::Partial { frame, sent });
            }
            Err(e) => {
                error!("{}", NetworkError::Write(e));
                self.queue.push_front(Outbound::Partial { frame, sent });
                self.begin_close();
            }
        }
    }

    /// Reads up to `chunk_size` bytes and delivers every message they complete.
    pub fn on_readable(&mut self) {
        let _enter = self.span.clone().entered();
        if !self.is_readable() {
            return;
        }
        if self.ready_failed.load(Ordering::Acquire) {
            error!("transport readiness failed; closing");
            self.begin_close();
            return;
        }
        let Some(transport) = self.transport.as_ref() else {
            return;
        };

        match transport.try_read(&mut self.read_buf) {
            Ok(0) => {
                info!("server closed the connection");
                self.begin_close();
            }
            Ok(n) => {
                self.stats.bytes_received += n as u64;
                self.inbound.extend_from_slice(&self.read_buf[..n]);
                debug!(bytes = n, buffered = self.inbound.len(), "read");
                if contains_terminator(&self.inbound) {
                    self.drain_messages();
                } else {
                    debug!("awaiting more data");
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => {
                error!("{}", NetworkError::Read(e));
                self.begin_close();
            }
        }
    }

    /// Releases the socket and moves to `Closed`.  Idempotent.
    ///
    /// Bytes of an unterminated message still in the inbound buffer are
    /// printed as they are, with a warning, rather than silently lost.
    pub fn close(&mut self) {
        let _enter = self.span.clone().entered();
        if self.state.is_closed() {
            return;
        }
        self.set_state(ConnectionState::Closing);

        if !self.inbound.is_empty() {
            warn!(
                bytes = self.inbound.len(),
                "connection closed mid-message; printing unterminated data"
            );
            let partial = decode(&std::mem::take(&mut self.inbound));
            if !partial.is_empty() {
                self.sink.deliver(&partial);
            }
        }
        if !self.queue.is_empty() {
            warn!(pending = self.queue.len(), "closing with unsent messages");
        }

        self.transport = None;
        self.set_state(ConnectionState::Closed);
        info!(
            bytes_sent = self.stats.bytes_sent,
            bytes_received = self.stats.bytes_received,
            messages_sent = self.stats.messages_sent,
            messages_received = self.stats.messages_received,
            "connection closed"
        );
    }

    /// Half-closes the socket once the producer is done and the queue is empty.
    ///
    /// The server answers end-of-stream by closing its side, which the next
    /// read observes as EOF; that is how a piped session ends on its own.
    pub async fn finish_output(&mut self) {
        if self.write_shut_down
            || self.state != ConnectionState::Open
            || !self.queue.is_input_finished()
            || !self.queue.is_empty()
        {
            return;
        }
        let Some(transport) = self.transport.as_mut() else {
            return;
        };

        self.write_shut_down = true;
        match transport.shutdown_write().await {
            Ok(()) => {
                let _enter = self.span.clone().entered();
                debug!("input finished; write side shut down");
            }
            Err(e) => {
                let _enter = self.span.clone().entered();
                error!("{}", NetworkError::Write(e));
                self.begin_close();
            }
        }
    }

    /// Waits until the transport can make progress on what this connection
    /// currently wants, or until new outbound work arrives.
    ///
    /// A failed readiness check is recorded and reported as readable; the
    /// next [`Connection::on_readable`] then closes the connection.
    pub async fn wait_ready(&self) -> Readiness {
        let Some(transport) = self.transport.as_ref() else {
            // Never registered with a socket: nothing will ever happen.
            return std::future::pending().await;
        };

        let writable = self.is_writable();
        let interest = if writable {
            Interest::READABLE | Interest::WRITABLE
        } else {
            Interest::READABLE
        };

        tokio::select! {
            ready = transport.ready(interest) => match ready {
                Ok(readiness) => readiness,
                Err(e) => {
                    error!(parent: &self.span, "readiness check failed: {e}");
                    self.ready_failed.store(true, Ordering::Release);
                    Readiness::READABLE
                }
            },
            _ = self.queue.notified(), if !writable => Readiness::NONE,
        }
    }

    fn drain_messages(&mut self) {
        let (messages, consumed) = split_frames(&self.inbound);
        self.inbound.drain(..consumed);
        for message in &messages {
            debug!(bytes = message.len(), "message received");
            self.sink.deliver(message);
        }
        self.stats.messages_received += messages.len() as u64;
    }

    fn begin_close(&mut self) {
        self.set_state(ConnectionState::Closing);
        self.close();
    }

    fn set_state(&mut self, next: ConnectionState) {
        match self.state.transition(next) {
            Ok(state) => {
                if state != self.state {
                    debug!(from = %self.state, to = %state, "state change");
                }
                self.state = state;
            }
            Err(e) => warn!("{e}"),
        }
    }
}

impl Connection<TcpStream> {
    /// Connects to `host:port` and moves `Connecting -> Open`.
    ///
    /// On failure the connection is `Closed` and the error is returned to
    /// the caller; there is no retry.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::ConnectFailed`] if the TCP connect fails, or
    /// [`NetworkError::Closed`] if this connection was already used.
    pub async fn open(&mut self, host: &str, port: u16) -> Result<(), NetworkError> {
        if self.state != ConnectionState::Connecting {
            return Err(NetworkError::Closed);
        }
        let addr = display_addr(host, port);
        debug!(parent: &self.span, %addr, "connecting");

        match TcpStream::connect((host, port)).await {
            Ok(stream) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!(parent: &self.span, "could not set TCP_NODELAY: {e}");
                }
                info!(parent: &self.span, %addr, "connected");
                self.attach(stream)
            }
            Err(source) => {
                self.set_state(ConnectionState::Closed);
                Err(NetworkError::ConnectFailed { addr, source })
            }
        }
    }
}

#[async_trait]
impl<T: Transport + 'static> Pollable for Connection<T> {
    fn id(&self) -> Uuid {
        self.id
    }

    fn is_readable(&self) -> bool {
        Connection::is_readable(self)
    }

    fn is_writable(&self) -> bool {
        Connection::is_writable(self)
    }

    fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    fn on_readable(&mut self) {
        Connection::on_readable(self)
    }

    fn on_writable(&mut self) {
        Connection::on_writable(self)
    }

    fn close(&mut self) {
        Connection::close(self)
    }

    async fn wait_ready(&self) -> Readiness {
        Connection::wait_ready(self).await
    }

    async fn finish_output(&mut self) {
        Connection::finish_output(self).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
