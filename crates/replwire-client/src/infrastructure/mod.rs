//! Infrastructure layer for the client.
//!
//! Everything that touches the outside world: the TCP socket, stdin, and the
//! configuration file.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `replwire_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`network`** – the connection to the REPL server, its outbound queue,
//!   the readiness-driven event loop, and the sink that prints responses.
//!   `mock` provides a scripted transport for tests.
//!
//! - **`input_source`** – the OS thread that reads stdin and feeds the
//!   outbound queue.
//!
//! - **`storage`** – TOML configuration loading.

pub mod input_source;
pub mod network;
pub mod storage;
