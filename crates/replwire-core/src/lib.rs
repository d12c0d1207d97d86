//! # replwire-core
//!
//! Shared library for replwire, a line-oriented client for remote REPL
//! servers that delimit messages with a single `0x04` (EOT) byte.
//!
//! This crate has no dependencies on sockets, terminals, or an async runtime.
//!
//! - **`protocol`** – the framer.  A message goes on the wire as its raw
//!   bytes followed by one terminator; the receiving side splits an
//!   accumulated buffer at terminators.
//!
//! - **`domain`** – the [`Message`] newtype, which guarantees its payload
//!   never contains the terminator, and the [`ConnectionState`] lifecycle.

pub mod domain;
pub mod protocol;

pub use domain::message::{FramingError, Message};
pub use domain::state::{ConnectionState, TransitionError};
pub use protocol::framer::{contains_terminator, decode, encode, split_frames, TERMINATOR};
