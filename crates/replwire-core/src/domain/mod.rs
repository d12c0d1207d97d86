//! Domain types shared by every replwire component.
//!
//! Nothing in here performs I/O.  The client crate builds its socket handling
//! on top of these types, and they can be tested on any platform without a
//! network.

/// Terminator-free payloads.
pub mod message;

/// Connection lifecycle.
pub mod state;
