//! EOT-delimited framing for the REPL wire protocol.
//!
//! Wire format:
//! ```text
//! [payload:N][0x04]
//! ```
//! There is no length prefix and no escaping.  Either side may send several
//! frames back-to-back, so a single read can carry any number of complete
//! frames followed by the start of another one.
//!
//! The functions here are pure: they never touch a socket and never fail.
//! Deciding what to do with a frame that never completes belongs to the
//! connection that owns the inbound buffer.

use crate::domain::message::Message;

/// ASCII "End of Transmission", the message terminator.
pub const TERMINATOR: u8 = 0x04;

/// Encodes `msg` as wire bytes: the payload followed by one terminator.
///
/// # Examples
///
/// ```rust
/// use replwire_core::{encode, Message};
///
/// let msg = Message::new("PING").unwrap();
/// assert_eq!(encode(&msg), b"PING\x04");
/// ```
pub fn encode(msg: &Message) -> Vec<u8> {
    let mut buf = Vec::with_capacity(msg.len() + 1);
    buf.extend_from_slice(msg.as_bytes());
    buf.push(TERMINATOR);
    buf
}

/// Reports whether `buf` holds at least one terminator.
pub fn contains_terminator(buf: &[u8]) -> bool {
    buf.contains(&TERMINATOR)
}

/// Strips terminator bytes from both edges of `buf` and returns the rest.
///
/// `buf` must hold at most one frame.  A terminator between payload bytes
/// means the caller passed several frames, which is a caller error: use
/// [`split_frames`] for such buffers.  `decode` still returns a valid
/// [`Message`] in that case by dropping the interior terminators, and logs
/// a warning.
///
/// # Examples
///
/// ```rust
/// use replwire_core::{decode, encode, Message};
///
/// let msg = Message::new("PONG").unwrap();
/// assert_eq!(decode(&encode(&msg)), msg);
/// ```
pub fn decode(buf: &[u8]) -> Message {
    let start = buf.iter().position(|&b| b != TERMINATOR).unwrap_or(buf.len());
    let end = buf
        .iter()
        .rposition(|&b| b != TERMINATOR)
        .map_or(start, |i| i + 1);
    let trimmed = &buf[start..end];

    if contains_terminator(trimmed) {
        tracing::warn!(
            bytes = trimmed.len(),
            "decode given more than one frame; dropping interior terminators"
        );
        Message::from_clean(trimmed.iter().copied().filter(|&b| b != TERMINATOR).collect())
    } else {
        Message::from_clean(trimmed.to_vec())
    }
}

/// Extracts every complete frame from the front of `buf`.
///
/// Returns the decoded messages in arrival order and the number of bytes
/// consumed, which is the offset just past the last terminator (0 if there
/// is none).  Bytes after that offset are the start of an incomplete frame
/// and must be kept for the next read.
///
/// Empty frames (two terminators in a row) carry nothing and are skipped.
///
/// # Examples
///
/// ```rust
/// use replwire_core::split_frames;
///
/// let (msgs, consumed) = split_frames(b"one\x04two\x04thr");
/// assert_eq!(msgs.len(), 2);
/// assert_eq!(msgs[1].as_bytes(), b"two");
/// assert_eq!(consumed, 8);
/// ```
pub fn split_frames(buf: &[u8]) -> (Vec<Message>, usize) {
    let Some(last) = buf.iter().rposition(|&b| b == TERMINATOR) else {
        return (Vec::new(), 0);
    };

    let messages = buf[..last]
        .split(|&b| b == TERMINATOR)
        .filter(|segment| !segment.is_empty())
        .map(|segment| Message::from_clean(segment.to_vec()))
        .collect();

    (messages, last + 1)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(s: &str) -> Message {
        Message::new(s).expect("test payload must be terminator-free")
    }

    #[test]
    fn test_encode_appends_single_terminator() {
        // Arrange
        let m = msg("PING");

        // Act
        let bytes = encode(&m);

        // Assert
        assert_eq!(bytes, vec![b'P', b'I', b'N', b'G', 0x04]);
    }

    #[test]
    fn test_encode_empty_message_is_lone_terminator() {
        assert_eq!(encode(&Message::default()), vec![TERMINATOR]);
    }

    #[test]
    fn test_contains_terminator() {
        assert!(!contains_terminator(b""));
        assert!(!contains_terminator(b"PO"));
        assert!(contains_terminator(b"NG\x04"));
        assert!(contains_terminator(b"\x04"));
    }

    #[test]
    fn test_decode_strips_edge_terminators() {
        assert_eq!(decode(b"\x04\x04abc\x04\x04"), msg("abc"));
    }

    #[test]
    fn test_decode_without_terminator_returns_input() {
        assert_eq!(decode(b"partial"), msg("partial"));
    }

    #[test]
    fn test_decode_of_only_terminators_is_empty() {
        assert!(decode(b"\x04\x04\x04").is_empty());
        assert!(decode(b"").is_empty());
    }

    #[test]
    fn test_decode_drops_interior_terminators() {
        // Act
        let m = decode(b"a\x04b");

        // Assert – the result must still be a valid message
        assert_eq!(m, msg("ab"));
    }

    #[test]
    fn test_multi_frame_buffer_needs_split_frames_not_decode() {
        // Arrange
        let buf = b"a\x04b\x04";

        // Act
        let (frames, consumed) = split_frames(buf);

        // Assert: decode collapses the frames, split_frames keeps them apart
        assert_eq!(frames, vec![msg("a"), msg("b")]);
        assert_eq!(consumed, buf.len());
        assert_eq!(decode(buf), msg("ab"));
    }

    #[test]
    fn test_split_frames_returns_nothing_without_terminator() {
        let (msgs, consumed) = split_frames(b"PO");
        assert!(msgs.is_empty());
        assert_eq!(consumed, 0);
    }

    #[test]
    fn test_split_frames_two_messages_in_order() {
        // Arrange
        let buf = b"first\x04second\x04";

        // Act
        let (msgs, consumed) = split_frames(buf);

        // Assert
        assert_eq!(msgs, vec![msg("first"), msg("second")]);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn test_split_frames_keeps_trailing_partial() {
        // Arrange
        let buf = b"done\x04pend";

        // Act
        let (msgs, consumed) = split_frames(buf);

        // Assert
        assert_eq!(msgs, vec![msg("done")]);
        assert_eq!(&buf[consumed..], b"pend");
    }

    #[test]
    fn test_split_frames_skips_empty_frames() {
        let (msgs, consumed) = split_frames(b"\x04a\x04\x04b\x04");
        assert_eq!(msgs, vec![msg("a"), msg("b")]);
        assert_eq!(consumed, 6);
    }

    #[test]
    fn test_round_trip_binary_payload() {
        // Arrange: every byte value except the terminator
        let payload: Vec<u8> = (0u8..=255).filter(|&b| b != TERMINATOR).collect();
        let m = Message::new(payload).unwrap();

        // Act
        let (msgs, consumed) = split_frames(&encode(&m));

        // Assert
        assert_eq!(msgs, vec![m.clone()]);
        assert_eq!(consumed, m.len() + 1);
    }
}
