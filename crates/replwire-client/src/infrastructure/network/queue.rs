//! Outbound message queue shared between the input thread and the event loop.
//!
//! A `Mutex<VecDeque>` is enough here: traffic is a few messages per
//! keystroke burst, and the lock is held only for a push or a pop.  A
//! [`Notify`] wakes the event loop when the queue goes from idle to busy so
//! it can start waiting for write readiness.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use replwire_core::{encode, Message};
use tokio::sync::Notify;

/// One queued unit of outbound work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A message that has not been touched yet.
    Fresh(Message),
    /// An encoded frame of which the first `sent` bytes are already on the
    /// wire.  Never re-encoded, so its single terminator is sent exactly once.
    Partial { frame: Vec<u8>, sent: usize },
}

impl Outbound {
    /// Returns the encoded frame and how much of it has been sent.
    pub fn into_frame(self) -> (Vec<u8>, usize) {
        match self {
            Outbound::Fresh(msg) => (encode(&msg), 0),
            Outbound::Partial { frame, sent } => (frame, sent),
        }
    }
}

#[derive(Default)]
struct QueueInner {
    entries: Mutex<VecDeque<Outbound>>,
    notify: Notify,
    input_finished: AtomicBool,
}

/// FIFO of pending outbound messages.  Cheap to clone; clones share the queue.
#[derive(Clone, Default)]
pub struct OutboundQueue {
    inner: Arc<QueueInner>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `msg` to the back of the queue and wakes the event loop.
    ///
    /// Safe to call from any thread.
    pub fn push_back(&self, msg: Message) {
        self.entries().push_back(Outbound::Fresh(msg));
        self.inner.notify.notify_one();
    }

    /// Puts `entry` back at the head of the queue, ahead of everything else.
    ///
    /// Used for the unsent remainder of a frame so it goes out before any
    /// message queued after it.
    pub fn push_front(&self, entry: Outbound) {
        self.entries().push_front(entry);
    }

    pub fn pop_front(&self) -> Option<Outbound> {
        self.entries().pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Marks the producer side as done: nothing more will be pushed.
    pub fn finish_input(&self) {
        self.inner.input_finished.store(true, Ordering::Release);
        self.inner.notify.notify_one();
    }

    pub fn is_input_finished(&self) -> bool {
        self.inner.input_finished.load(Ordering::Acquire)
    }

    /// Resolves after the next [`push_back`](Self::push_back) or
    /// [`finish_input`](Self::finish_input).
    ///
    /// A wake-up issued while nobody was waiting is remembered, so a push
    /// that races with the caller's emptiness check is never lost.
    pub async fn notified(&self) {
        self.inner.notify.notified().await;
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<Outbound>> {
        // A panic while holding this lock cannot leave the deque half-updated.
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
