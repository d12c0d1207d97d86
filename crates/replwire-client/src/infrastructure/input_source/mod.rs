//! Input source: the thread that reads what the user types.
//!
//! Reading stdin blocks, so it runs on its own OS thread rather than inside
//! the event loop.  The thread reads lines, lets a [`BlockComposer`] decide
//! when a unit is complete, and pushes each unit onto the [`OutboundQueue`].
//! The queue is the only thing it shares with the event loop.
//!
//! When input ends (EOF or [`InputSource::stop`]), the thread marks the queue
//! input-finished.  That happens on every exit path, including errors, so the
//! event loop can always half-close the connection once the queue drains.
//!
//! # Stopping
//!
//! `stop()` sets a flag the thread checks between reads.  A thread parked
//! inside a blocking stdin read cannot be interrupted portably;
//! [`InputSource::shutdown`] therefore joins a finished thread and detaches
//! one that is still blocked.  The process exit reclaims it.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use replwire_core::{FramingError, Message};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::compose_input::BlockComposer;
use crate::infrastructure::network::OutboundQueue;

/// Errors produced by the input thread.
#[derive(Debug, Error)]
pub enum InputError {
    /// Reading input or writing the prompt failed.
    #[error("input I/O error: {0}")]
    Io(#[from] io::Error),
    /// A unit could not be sent because it contains the message terminator.
    #[error("input not sent: {0}")]
    Framing(#[from] FramingError),
    /// The input thread panicked.
    #[error("input thread panicked")]
    Panicked,
}

/// What the input thread did before it ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSummary {
    pub lines_read: u64,
    pub messages_queued: u64,
    pub rejected: u64,
}

/// Handle to a running input thread.
pub struct InputSource {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Result<InputSummary, InputError>>,
}

impl InputSource {
    /// Starts the input thread.
    ///
    /// `prompt`, when set, is written to `prompt_out` before each fresh unit.
    /// Rejected units are reported on `prompt_out` as well.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::Io`] if the OS refuses to create the thread.
    pub fn spawn<R, W>(
        reader: R,
        mut prompt_out: W,
        mut composer: BlockComposer,
        prompt: Option<String>,
        queue: OutboundQueue,
    ) -> Result<Self, InputError>
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("replwire-input".to_string())
            .spawn(move || {
                read_input(
                    reader,
                    &mut prompt_out,
                    &mut composer,
                    prompt.as_deref(),
                    &queue,
                    &thread_stop,
                )
            })?;
        Ok(Self { stop, handle })
    }

    /// Asks the thread to stop after its current read.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the thread and returns its summary.
    ///
    /// # Errors
    ///
    /// Returns the thread's own error, or [`InputError::Panicked`].
    pub fn join(self) -> Result<InputSummary, InputError> {
        self.handle.join().map_err(|_| InputError::Panicked)?
    }

    /// Stops the thread, joining it if it already ended.
    ///
    /// Returns `None` when the thread was still blocked on a read and has
    /// been detached.
    pub fn shutdown(self) -> Option<Result<InputSummary, InputError>> {
        self.stop();
        if self.is_finished() {
            Some(self.join())
        } else {
            debug!("input thread still blocked on read; detaching");
            None
        }
    }
}

/// Marks the queue input-finished when dropped.
struct FinishOnDrop<'a>(&'a OutboundQueue);

impl Drop for FinishOnDrop<'_> {
    fn drop(&mut self) {
        self.0.finish_input();
    }
}

/// The input thread's body.  Runs until EOF, a stop request, or an I/O error.
pub(crate) fn read_input<R: BufRead, W: Write>(
    mut reader: R,
    out: &mut W,
    composer: &mut BlockComposer,
    prompt: Option<&str>,
    queue: &OutboundQueue,
    stop: &AtomicBool,
) -> Result<InputSummary, InputError> {
    let _finish = FinishOnDrop(queue);
    let mut summary = InputSummary::default();
    let mut line = Vec::new();

    loop {
        if stop.load(Ordering::Acquire) {
            debug!("input stop requested");
            break;
        }
        if composer.is_idle() {
            if let Some(prompt) = prompt {
                out.write_all(prompt.as_bytes())?;
                out.flush()?;
            }
        }

        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            debug!("end of input");
            break;
        }
        if stop.load(Ordering::Acquire) {
            // Stopped while blocked; drop the line rather than send it late.
            break;
        }
        summary.lines_read += 1;

        let text = String::from_utf8_lossy(&line);
        if let Some(unit) = composer.push_line(&text) {
            submit(&unit, out, queue, &mut summary)?;
        }
    }

    if let Some(unit) = composer.finish() {
        debug!("flushing unfinished block at end of input");
        submit(&unit, out, queue, &mut summary)?;
    }

    info!(
        lines = summary.lines_read,
        queued = summary.messages_queued,
        rejected = summary.rejected,
        "input finished"
    );
    Ok(summary)
}

/// Queues one unit.  Blank units are skipped; units containing the
/// terminator are reported and skipped.
fn submit<W: Write>(
    unit: &str,
    out: &mut W,
    queue: &OutboundQueue,
    summary: &mut InputSummary,
) -> io::Result<()> {
    let trimmed = unit.trim();
    if trimmed.is_empty() {
        return Ok(());
    }

    match Message::new(trimmed) {
        Ok(msg) => {
            debug!(bytes = msg.len(), "queued");
            queue.push_back(msg);
            summary.messages_queued += 1;
        }
        Err(e) => {
            let err = InputError::from(e);
            warn!("{err}");
            writeln!(out, "{err}")?;
            out.flush()?;
            summary.rejected += 1;
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
