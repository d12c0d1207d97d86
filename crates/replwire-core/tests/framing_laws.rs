//! Integration tests for the replwire-core framer.
//!
//! These exercise the public API the way the client crate uses it: encode
//! outgoing messages, accumulate incoming bytes in arbitrary chunks, and
//! split the accumulated buffer into messages.

use replwire_core::{
    contains_terminator, decode, encode, split_frames, FramingError, Message, TERMINATOR,
};

fn msg(s: &str) -> Message {
    Message::new(s).expect("fixture must be terminator-free")
}

/// Feeds `wire` to a receiver in chunks of `chunk` bytes, keeping the
/// unconsumed tail between reads the way a connection does.
fn receive_in_chunks(wire: &[u8], chunk: usize) -> Vec<Message> {
    let mut inbound = Vec::new();
    let mut out = Vec::new();
    for piece in wire.chunks(chunk) {
        inbound.extend_from_slice(piece);
        if contains_terminator(&inbound) {
            let (msgs, consumed) = split_frames(&inbound);
            out.extend(msgs);
            inbound.drain(..consumed);
        }
    }
    assert!(inbound.is_empty(), "no bytes may be left over");
    out
}

#[test]
fn test_round_trip_law_for_representative_payloads() {
    let payloads: [&[u8]; 6] = [
        b"",
        b"PING",
        b"(defn f [x] (* x x))",
        b"line one\nline two\n",
        "unicode: \u{3bb} \u{2192}".as_bytes(),
        &[0x00, 0x01, 0x02, 0x03, 0x05, 0xFF],
    ];

    for payload in payloads {
        let m = Message::new(payload).unwrap();
        assert_eq!(decode(&encode(&m)), m, "round trip failed for {m:?}");
    }
}

#[test]
fn test_chunking_is_transparent() {
    // Arrange
    let originals = vec![msg("(+ 1 2)"), msg("(str \"a\" \"b\")"), msg("nil")];
    let wire: Vec<u8> = originals.iter().flat_map(encode).collect();

    // Act / Assert – every chunk size yields the same sequence of messages
    for chunk in 1..=wire.len() {
        assert_eq!(receive_in_chunks(&wire, chunk), originals, "chunk size {chunk}");
    }
}

#[test]
fn test_pong_split_across_two_reads_yields_one_message() {
    // Arrange
    let mut inbound = Vec::new();

    // Act – first read carries no terminator
    inbound.extend_from_slice(b"PO");
    assert!(!contains_terminator(&inbound));

    inbound.extend_from_slice(b"NG\x04");
    let (msgs, consumed) = split_frames(&inbound);

    // Assert
    assert_eq!(msgs, vec![msg("PONG")]);
    assert_eq!(consumed, inbound.len());
}

#[test]
fn test_terminator_in_payload_is_rejected_not_truncated() {
    let err = Message::new(vec![b'x', TERMINATOR, b'y']).unwrap_err();
    assert_eq!(err, FramingError::EmbeddedTerminator { position: 1 });
}
