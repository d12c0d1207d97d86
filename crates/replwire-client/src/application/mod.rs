//! Application layer use cases for the client.
//!
//! - **`compose_input`** – decides when the lines typed so far form one
//!   complete unit to send.  Pure logic; the input thread feeds it lines and
//!   enqueues what it returns.

pub mod compose_input;

pub use compose_input::{BlockComposer, InputMode};
