//! The single coordinator that waits for readiness and dispatches handlers.
//!
//! ```text
//! loop {
//!     drop Closed connections; stop if none left
//!     let each connection half-close if its producer is done
//!     wait for: any connection ready | shutdown
//!     dispatch on_readable / on_writable to the ready one
//! }
//! ```
//!
//! A handler may close its own connection.  Dispatch re-checks state before
//! each call, and removal only happens at the top of the next iteration, so
//! no connection is touched after it closed and none is removed while a
//! borrow of the set is live.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::select_all;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use super::transport::Readiness;

/// Something the event loop can drive.
#[async_trait]
pub trait Pollable: Send + Sync {
    fn id(&self) -> Uuid;
    fn is_readable(&self) -> bool;
    fn is_writable(&self) -> bool;
    fn is_closed(&self) -> bool;
    fn on_readable(&mut self);
    fn on_writable(&mut self);
    fn close(&mut self);

    /// Resolves when the object can make progress, or when its interest set
    /// may have changed (returning [`Readiness::NONE`]).
    async fn wait_ready(&self) -> Readiness;

    /// Hook run once per iteration before waiting.
    async fn finish_output(&mut self) {}
}

/// Asks a running [`EventLoop`] to close everything and return.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Drives a set of [`Pollable`]s until all of them are closed.
pub struct EventLoop {
    connections: Vec<Box<dyn Pollable>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            connections: Vec::new(),
            shutdown_tx: Arc::new(tx),
            shutdown_rx: rx,
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    pub fn register(&mut self, connection: Box<dyn Pollable>) {
        debug!(id = %connection.id(), "registered");
        self.connections.push(connection);
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Runs until every registered connection is closed or shutdown is
    /// triggered.  On shutdown, every remaining connection is closed first.
    pub async fn run(&mut self) {
        loop {
            self.deregister_closed();
            if self.connections.is_empty() {
                debug!("no connections left");
                break;
            }

            for connection in &mut self.connections {
                connection.finish_output().await;
            }
            self.deregister_closed();
            if self.connections.is_empty() {
                break;
            }

            if *self.shutdown_rx.borrow_and_update() {
                self.close_all();
                break;
            }

            let woke = {
                let waits = self.connections.iter().map(|c| c.wait_ready());
                tokio::select! {
                    (readiness, index, _) = select_all(waits) => Some((index, readiness)),
                    _ = self.shutdown_rx.changed() => None,
                }
            };

            match woke {
                Some((index, readiness)) => dispatch(self.connections[index].as_mut(), readiness),
                None => {
                    info!("shutdown requested");
                    self.close_all();
                    break;
                }
            }
        }
    }

    fn deregister_closed(&mut self) {
        self.connections.retain(|c| {
            let keep = !c.is_closed();
            if !keep {
                debug!(id = %c.id(), "deregistered");
            }
            keep
        });
    }

    fn close_all(&mut self) {
        for connection in &mut self.connections {
            connection.close();
        }
        self.connections.clear();
    }
}

fn dispatch(connection: &mut dyn Pollable, readiness: Readiness) {
    if readiness.readable && connection.is_readable() {
        connection.on_readable();
    }
    if readiness.writable && !connection.is_closed() && connection.is_writable() {
        connection.on_writable();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use replwire_core::Message;

    use super::*;
    use crate::infrastructure::network::connection::{Connection, ConnectionConfig};
    use crate::infrastructure::network::mock::{MemorySink, MockTransport};
    use crate::infrastructure::network::queue::OutboundQueue;

    fn msg(s: &str) -> Message {
        Message::new(s).unwrap()
    }

    fn mock_connection(
        transport: &MockTransport,
        sink: &MemorySink,
        queue: &OutboundQueue,
    ) -> Box<dyn Pollable> {
        let mut conn = Connection::new(
            ConnectionConfig::default(),
            queue.clone(),
            Box::new(sink.clone()),
        );
        conn.attach(transport.clone()).unwrap();
        Box::new(conn)
    }

    /// A pollable that closes itself from inside its read handler.
    struct SelfClosing {
        closed: bool,
        reads: u32,
    }

    #[async_trait]
    impl Pollable for SelfClosing {
        fn id(&self) -> Uuid {
            Uuid::nil()
        }
        fn is_readable(&self) -> bool {
            !self.closed
        }
        fn is_writable(&self) -> bool {
            !self.closed
        }
        fn is_closed(&self) -> bool {
            self.closed
        }
        fn on_readable(&mut self) {
            self.reads += 1;
            self.close();
        }
        fn on_writable(&mut self) {
            panic!("on_writable must not run after the connection closed itself");
        }
        fn close(&mut self) {
            self.closed = true;
        }
        async fn wait_ready(&self) -> Readiness {
            Readiness { readable: true, writable: true }
        }
    }

    #[tokio::test]
    async fn test_run_with_no_connections_returns_immediately() {
        let mut event_loop = EventLoop::new();
        event_loop.run().await;
        assert!(event_loop.is_empty());
    }

    #[tokio::test]
    async fn test_zero_byte_read_deregisters_connection() {
        // Arrange
        let transport = MockTransport::new();
        transport.push_eof();
        let mut event_loop = EventLoop::new();
        event_loop.register(mock_connection(&transport, &MemorySink::new(), &OutboundQueue::new()));

        // Act
        tokio::time::timeout(Duration::from_secs(1), event_loop.run())
            .await
            .expect("loop must end once the connection closes");

        // Assert
        assert!(event_loop.is_empty());
    }

    #[tokio::test]
    async fn test_readiness_failure_ends_the_loop() {
        // Arrange: ready() errors while try_read would block forever
        let transport = MockTransport::new();
        transport.fail_ready(std::io::ErrorKind::ConnectionReset);
        let mut event_loop = EventLoop::new();
        event_loop.register(mock_connection(&transport, &MemorySink::new(), &OutboundQueue::new()));

        // Act
        tokio::time::timeout(Duration::from_secs(1), event_loop.run())
            .await
            .expect("a failing transport must close instead of spinning");

        // Assert
        assert!(event_loop.is_empty());
    }

    #[tokio::test]
    async fn test_sends_queue_then_prints_reply_then_stops_on_eof() {
        // Arrange
        let transport = MockTransport::new();
        let sink = MemorySink::new();
        let queue = OutboundQueue::new();
        queue.push_back(msg("(+ 1 2)"));
        transport.push_read(b"3\x04");
        transport.push_eof();
        let mut event_loop = EventLoop::new();
        event_loop.register(mock_connection(&transport, &sink, &queue));

        // Act
        tokio::time::timeout(Duration::from_secs(1), event_loop.run())
            .await
            .expect("loop must finish");

        // Assert
        assert_eq!(transport.written(), b"(+ 1 2)\x04");
        assert_eq!(sink.messages(), vec![msg("3")]);
    }

    #[tokio::test]
    async fn test_self_closing_connection_is_not_touched_again() {
        let mut event_loop = EventLoop::new();
        event_loop.register(Box::new(SelfClosing { closed: false, reads: 0 }));

        tokio::time::timeout(Duration::from_secs(1), event_loop.run())
            .await
            .expect("loop must end");

        assert!(event_loop.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_closes_idle_connection() {
        // Arrange: an idle connection never becomes ready on its own
        let transport = MockTransport::new();
        let mut event_loop = EventLoop::new();
        let shutdown = event_loop.shutdown_handle();
        event_loop.register(mock_connection(&transport, &MemorySink::new(), &OutboundQueue::new()));

        // Act
        let trigger = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            shutdown.trigger();
        };
        let run = tokio::time::timeout(Duration::from_secs(1), event_loop.run());
        let (result, ()) = tokio::join!(run, trigger);

        // Assert
        assert!(result.is_ok(), "shutdown must end the loop");
        assert!(event_loop.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_before_run_closes_everything() {
        let mut event_loop = EventLoop::new();
        event_loop.shutdown_handle().trigger();
        event_loop.register(mock_connection(
            &MockTransport::new(),
            &MemorySink::new(),
            &OutboundQueue::new(),
        ));

        event_loop.run().await;

        assert!(event_loop.is_empty());
    }

    #[tokio::test]
    async fn test_input_end_half_closes_after_queue_drains() {
        // Arrange
        let transport = MockTransport::new();
        let queue = OutboundQueue::new();
        queue.push_back(msg("bye"));
        queue.finish_input();
        let mut event_loop = EventLoop::new();
        let shutdown = event_loop.shutdown_handle();
        event_loop.register(mock_connection(&transport, &MemorySink::new(), &queue));

        // Act: once the half-close happens the server would reply with EOF
        let server = async {
            while !transport.is_write_shut_down() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            transport.push_eof();
            // The mock's ready() was parked before the EOF was scripted.
            shutdown.trigger();
        };
        let run = tokio::time::timeout(Duration::from_secs(1), event_loop.run());
        let (result, ()) = tokio::join!(run, server);

        // Assert
        assert!(result.is_ok());
        assert_eq!(transport.written(), b"bye\x04");
        assert!(transport.is_write_shut_down());
    }
}
