//! Streaming UTF-8 validation.
//!
//! Strings cross the wire as length-prefixed byte runs and must be validated
//! without a contiguous `str` scan: the validator is a byte-at-a-time DFA
//! (Hoehrmann's automaton) that can be fed any slicing of the input. The
//! codec drives it in fixed 4-byte chunks, zero-padding the final short
//! chunk, so validation never reads past the declared length. A sequence
//! truncated at the declared length runs into the pad zeroes and is rejected
//! as an incomplete multi-byte sequence.
//!
//! The automaton rejects overlong encodings, surrogate halves, and bytes
//! outside the Unicode scalar value range.

/// Chunk size the codec feeds the validator with.
pub const CHUNK: usize = 4;

const ACCEPT: u8 = 0;
const REJECT: u8 = 12;

/// Byte-class table (first 256 entries) followed by the state transition
/// table, per Hoehrmann's "Flexible and Economical UTF-8 Decoder".
#[rustfmt::skip]
const UTF8_DFA: [u8; 364] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9,
    7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7,
    7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7,
    8, 8, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    10, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 4, 3, 3,
    11, 6, 6, 6, 5, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8,
    0, 12, 24, 36, 60, 96, 84, 12, 12, 12, 48, 72,
    12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12,
    12, 0, 12, 12, 12, 12, 12, 0, 12, 0, 12, 12,
    12, 24, 12, 12, 12, 12, 12, 24, 12, 24, 12, 12,
    12, 12, 12, 12, 12, 12, 12, 24, 12, 12, 12, 12,
    12, 24, 12, 12, 12, 12, 12, 12, 12, 24, 12, 12,
    12, 12, 12, 12, 12, 12, 12, 36, 12, 36, 12, 12,
    12, 36, 12, 12, 12, 12, 12, 36, 12, 36, 12, 12,
    12, 36, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12,
];

/// Incremental UTF-8 validator.
///
/// Feed bytes with [`push`](Self::push) in any slicing; call
/// [`is_complete`](Self::is_complete) at the end to catch input that stops
/// mid-sequence.
#[derive(Debug, Clone, Copy)]
pub struct Utf8Validator {
    state: u8,
}

impl Utf8Validator {
    pub const fn new() -> Self {
        Self { state: ACCEPT }
    }

    /// Consume a chunk. Returns `false` once the input is known invalid.
    pub fn push(&mut self, chunk: &[u8]) -> bool {
        for &byte in chunk {
            let class = UTF8_DFA[byte as usize];
            self.state = UTF8_DFA[256 + self.state as usize + class as usize];
            if self.state == REJECT {
                return false;
            }
        }
        true
    }

    /// True when every started sequence has been completed.
    pub fn is_complete(&self) -> bool {
        self.state == ACCEPT
    }
}

impl Default for Utf8Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a whole byte run the way the wire codec does: fixed 4-byte
/// chunks, final short chunk zero-padded.
pub fn validate_chunked(bytes: &[u8]) -> bool {
    let mut validator = Utf8Validator::new();

    let mut chunks = bytes.chunks_exact(CHUNK);
    for chunk in &mut chunks {
        if !validator.push(chunk) {
            return false;
        }
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut padded = [0u8; CHUNK];
        padded[..tail.len()].copy_from_slice(tail);
        if !validator.push(&padded) {
            return false;
        }
    }

    validator.is_complete()
}
