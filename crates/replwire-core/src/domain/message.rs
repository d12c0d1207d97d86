//! The [`Message`] type: one logical unit of REPL traffic.
//!
//! A message is an opaque run of bytes, typically UTF-8 source code going
//! out or printed results coming back.  The wire protocol has no escaping,
//! so the only rule a message must follow is that it never contains the
//! terminator byte.  [`Message::new`] enforces that rule once, at the edge,
//! which lets the framer treat encoding as infallible.

use std::fmt;

use thiserror::Error;

use crate::protocol::framer::TERMINATOR;

/// Errors raised while building a [`Message`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// The payload contains the terminator byte, which the protocol cannot
    /// carry without splitting the message in two.
    #[error("payload contains the 0x04 terminator at byte {position}")]
    EmbeddedTerminator { position: usize },
}

/// A terminator-free payload.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Message {
    bytes: Vec<u8>,
}

impl Message {
    /// Wraps `bytes` as a message.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::EmbeddedTerminator`] if `bytes` contains
    /// [`TERMINATOR`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use replwire_core::Message;
    ///
    /// let msg = Message::new(b"(+ 1 2)".to_vec()).unwrap();
    /// assert_eq!(msg.as_bytes(), b"(+ 1 2)");
    /// assert!(Message::new(vec![b'a', 0x04]).is_err());
    /// ```
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, FramingError> {
        let bytes = bytes.into();
        match bytes.iter().position(|&b| b == TERMINATOR) {
            Some(position) => Err(FramingError::EmbeddedTerminator { position }),
            None => Ok(Self { bytes }),
        }
    }

    /// Builds a message from bytes already known to be terminator-free.
    ///
    /// Only the framer calls this, on slices it has just split at
    /// terminator boundaries.
    pub(crate) fn from_clean(bytes: Vec<u8>) -> Self {
        debug_assert!(!bytes.contains(&TERMINATOR));
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Renders the payload as text, replacing invalid UTF-8 sequences.
    pub fn to_text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl TryFrom<&str> for Message {
    type Error = FramingError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.as_bytes())
    }
}

impl TryFrom<String> for Message {
    type Error = FramingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value.into_bytes())
    }
}

impl AsRef<[u8]> for Message {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Message")
            .field(&String::from_utf8_lossy(&self.bytes))
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_plain_text() {
        // Arrange / Act
        let msg = Message::new("PING").unwrap();

        // Assert
        assert_eq!(msg.as_bytes(), b"PING");
        assert_eq!(msg.len(), 4);
    }

    #[test]
    fn test_new_rejects_embedded_terminator_with_position() {
        // Arrange
        let payload = vec![b'a', b'b', TERMINATOR, b'c'];

        // Act
        let err = Message::new(payload).unwrap_err();

        // Assert
        assert_eq!(err, FramingError::EmbeddedTerminator { position: 2 });
    }

    #[test]
    fn test_empty_message_is_allowed() {
        let msg = Message::new(Vec::new()).unwrap();
        assert!(msg.is_empty());
    }

    #[test]
    fn test_try_from_str_and_string_agree() {
        let a = Message::try_from("(println 1)").unwrap();
        let b = Message::try_from(String::from("(println 1)")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_to_text_lossy_replaces_invalid_utf8() {
        // Arrange: 0xFF is never valid UTF-8
        let msg = Message::new(vec![b'o', b'k', 0xFF]).unwrap();

        // Act
        let text = msg.to_text_lossy();

        // Assert
        assert!(text.starts_with("ok"));
        assert!(text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_debug_shows_text_payload() {
        let msg = Message::new("nil").unwrap();
        assert_eq!(format!("{msg:?}"), "Message(\"nil\")");
    }
}
