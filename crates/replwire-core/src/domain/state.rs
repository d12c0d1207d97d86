//! Connection lifecycle state machine.
//!
//! ```text
//! Connecting ──► Open ──► Closing ──► Closed
//!      │                                ▲
//!      └────────── (connect failed) ────┘
//! ```
//!
//! States only ever move to the right.  A connection that has reached
//! `Closed` is finished; reconnecting means building a new one.

use std::fmt;

use thiserror::Error;

/// Lifecycle of a single REPL connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConnectionState {
    /// Socket created, connect in flight.
    Connecting,
    /// Connected; reads and writes are serviced.
    Open,
    /// Shutdown requested (peer EOF, transport error, or local request).
    Closing,
    /// Socket released.  Terminal.
    Closed,
}

/// Returned when a caller asks for a backwards or otherwise illegal move.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal connection state transition {from} -> {to}")]
pub struct TransitionError {
    pub from: ConnectionState,
    pub to: ConnectionState,
}

impl ConnectionState {
    /// Whether `self -> next` is a legal move.
    ///
    /// Staying in the same state is allowed so that repeated close requests
    /// are harmless.  `Connecting -> Closing` is allowed for a connect that
    /// is abandoned before it completes.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Connecting)
                | (Connecting, Open)
                | (Connecting, Closing)
                | (Connecting, Closed)
                | (Open, Open)
                | (Open, Closing)
                | (Open, Closed)
                | (Closing, Closing)
                | (Closing, Closed)
                | (Closed, Closed)
        )
    }

    /// Returns `next` if the move is legal.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] for any move back to an earlier state.
    pub fn transition(self, next: ConnectionState) -> Result<ConnectionState, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            tracing::trace!(from = %self, to = %next, "rejected state transition");
            Err(TransitionError { from: self, to: next })
        }
    }

    pub fn is_closed(self) -> bool {
        self == ConnectionState::Closed
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
