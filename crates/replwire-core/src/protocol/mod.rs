//! Wire protocol: EOT-delimited framing.

pub mod framer;

pub use framer::{contains_terminator, decode, encode, split_frames, TERMINATOR};
