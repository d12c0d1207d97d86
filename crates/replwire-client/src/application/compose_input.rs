//! Turns raw input lines into complete units to send to the REPL.
//!
//! # Modes
//!
//! - **`line`** – every line is a unit.  Suits line-oriented interpreters.
//! - **`balanced`** – lines accumulate until every `(`, `[` and `{` has been
//!   closed, so a multi-line form is sent as one message.  Delimiters inside
//!   string literals, after a `;` comment marker, or escaped as a character
//!   literal (`\(`) do not count.  A closer that does not match its opener
//!   ends the unit too; the server reports the syntax error.
//!
//! End of input flushes whatever is pending, balanced or not.

use serde::{Deserialize, Serialize};

/// How input lines are grouped into messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// One message per line.
    Line,
    /// One message per bracket-balanced form.
    #[default]
    Balanced,
}

/// Accumulates lines and yields complete units.
#[derive(Debug, Default)]
pub struct BlockComposer {
    mode: InputMode,
    pending: String,
}

impl BlockComposer {
    pub fn new(mode: InputMode) -> Self {
        Self {
            mode,
            pending: String::new(),
        }
    }

    /// True when no partial unit is being held.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Adds one line (with or without its trailing newline).  Returns the
    /// completed unit, if this line completed one.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        match self.mode {
            InputMode::Line => Some(line.to_string()),
            InputMode::Balanced => {
                self.pending.push_str(line);
                if is_balanced(&self.pending) {
                    Some(std::mem::take(&mut self.pending))
                } else {
                    None
                }
            }
        }
    }

    /// Returns whatever is pending at end of input.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

/// Whether `code` forms a complete unit in balanced mode.
pub fn is_balanced(code: &str) -> bool {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut chars = code.chars();

    while let Some(c) = chars.next() {
        if in_string {
            match c {
                '\\' => {
                    chars.next();
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '\\' => {
                chars.next();
            }
            ';' => {
                // Comment runs to end of line.
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        break;
                    }
                }
            }
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => match stack.pop() {
                Some(open) if closes(open, c) => {}
                // Mismatched or stray closer: hand it to the server as is.
                _ => return true,
            },
            _ => {}
        }
    }

    stack.is_empty() && !in_string
}

fn closes(open: char, close: char) -> bool {
    matches!((open, close), ('(', ')') | ('[', ']') | ('{', '}'))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
