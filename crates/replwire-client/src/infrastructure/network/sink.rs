//! Output side of the connection: where decoded responses go.

use std::io::{self, Write};

use replwire_core::Message;
use tracing::warn;

/// Receives every decoded server response, in arrival order.
#[cfg_attr(test, mockall::automock)]
pub trait ResponseSink: Send + Sync {
    fn deliver(&mut self, message: &Message);
}

/// Writes each response as text to a [`Write`]r, one response per line.
///
/// Invalid UTF-8 is replaced rather than rejected; a REPL printing binary
/// garbage should still be readable.
pub struct WriterSink<W> {
    out: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_message(&mut self, message: &Message) -> io::Result<()> {
        let text = message.to_text_lossy();
        self.out.write_all(text.as_bytes())?;
        if !text.ends_with('\n') {
            self.out.write_all(b"\n")?;
        }
        self.out.flush()
    }
}

impl WriterSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send + Sync> ResponseSink for WriterSink<W> {
    fn deliver(&mut self, message: &Message) {
        if let Err(e) = self.write_message(message) {
            warn!("failed to print response: {e}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
