//! replwire-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does replwire do?
//!
//! It is an interactive client for a remote REPL server that speaks a very
//! small protocol: each message is its raw bytes followed by one `0x04`
//! (EOT) byte, in both directions.
//!
//! 1. Connects to the server over TCP.
//! 2. Reads lines from stdin on a dedicated thread and groups them into
//!    complete forms.
//! 3. Sends each form, framed, in the order it was typed.
//! 4. Prints each framed response as it arrives.
//! 5. Exits when the server closes the connection or on Ctrl-C.

/// Application layer: input composition rules.
pub mod application;

/// Infrastructure layer: network, stdin, configuration.
pub mod infrastructure;
